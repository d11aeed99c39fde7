//! Precomputed product similarity matrix
//!
//! The matrix is produced offline and loaded as an opaque artifact. Entry
//! (i, j) is the similarity of product i to product j, where i and j are
//! ordinal positions in the product table. Storage is dense and row-major.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    dim: usize,
    scores: Vec<f32>,
    version: Option<String>,
}

/// On-disk JSON shapes: a versioned envelope or a bare array of rows.
#[derive(Deserialize)]
#[serde(untagged)]
enum MatrixArtifact {
    Envelope {
        #[serde(default)]
        version: Option<String>,
        scores: Vec<Vec<f32>>,
    },
    Bare(Vec<Vec<f32>>),
}

impl SimilarityMatrix {
    /// Build from rows, rejecting ragged, non-square or non-finite input.
    pub fn from_rows(rows: Vec<Vec<f32>>, version: Option<String>) -> Result<Self> {
        let dim = rows.len();
        let mut scores = Vec::with_capacity(dim * dim);

        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != dim {
                return Err(Error::invalid_format(format!(
                    "similarity matrix is not square: row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    dim
                )));
            }
            if let Some(j) = row.iter().position(|v| !v.is_finite()) {
                return Err(Error::invalid_format(format!(
                    "similarity matrix has a non-finite value at ({}, {})",
                    i, j
                )));
            }
            scores.extend(row);
        }

        Ok(Self {
            dim,
            scores,
            version,
        })
    }

    /// Load from `.json` (envelope or bare rows) or `.csv` (headerless rows).
    #[instrument]
    pub fn load(path: &Path) -> Result<Self> {
        let path_str = path.display().to_string();
        let file = File::open(path).map_err(|e| Error::io(path_str.clone(), e))?;

        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

        let matrix = if is_csv {
            Self::from_rows(read_csv_rows(file)?, None)?
        } else {
            let reader = std::io::BufReader::new(file);
            match serde_json::from_reader::<_, MatrixArtifact>(reader)? {
                MatrixArtifact::Envelope { version, scores } => Self::from_rows(scores, version)?,
                MatrixArtifact::Bare(scores) => Self::from_rows(scores, None)?,
            }
        };

        info!(
            "Loaded {}x{} similarity matrix from {} (version: {})",
            matrix.dim,
            matrix.dim,
            path_str,
            matrix.version().unwrap_or("unversioned")
        );
        Ok(matrix)
    }

    /// Row and column count
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Similarities of product `i` to every product, or `None` past the bound.
    pub fn row(&self, i: usize) -> Option<&[f32]> {
        if i >= self.dim {
            return None;
        }
        let start = i * self.dim;
        Some(&self.scores[start..start + self.dim])
    }

    pub fn score(&self, i: usize, j: usize) -> Option<f32> {
        self.row(i).and_then(|row| row.get(j).copied())
    }
}

fn read_csv_rows(file: File) -> Result<Vec<Vec<f32>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let row = record
            .iter()
            .map(|field| {
                field.parse::<f32>().map_err(|e| {
                    Error::invalid_format(format!(
                        "similarity matrix row {}: invalid score '{}': {}",
                        i, field, e
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_row_access() {
        let m = SimilarityMatrix::from_rows(
            vec![vec![1.0, 0.5], vec![0.5, 1.0]],
            Some("v1".to_string()),
        )
        .unwrap();
        assert_eq!(m.dim(), 2);
        assert_eq!(m.row(1), Some(&[0.5, 1.0][..]));
        assert_eq!(m.row(2), None);
        assert_eq!(m.score(0, 1), Some(0.5));
        assert_eq!(m.version(), Some("v1"));
    }

    #[test]
    fn test_rejects_non_square() {
        let err = SimilarityMatrix::from_rows(vec![vec![1.0, 0.2, 0.3], vec![0.2, 1.0, 0.1]], None)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFormat { .. }));
    }

    #[test]
    fn test_rejects_nan() {
        let err = SimilarityMatrix::from_rows(vec![vec![1.0, f32::NAN], vec![0.2, 1.0]], None)
            .unwrap_err();
        assert!(err.to_string().contains("non-finite"));
    }

    #[test]
    fn test_load_json_envelope_and_bare() {
        let mut envelope = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(envelope, r#"{{"version": "2024-12", "scores": [[1.0, 0.3], [0.3, 1.0]]}}"#)
            .unwrap();
        let m = SimilarityMatrix::load(envelope.path()).unwrap();
        assert_eq!(m.version(), Some("2024-12"));
        assert_eq!(m.score(1, 0), Some(0.3));

        let mut bare = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(bare, "[[1.0]]").unwrap();
        let m = SimilarityMatrix::load(bare.path()).unwrap();
        assert_eq!(m.dim(), 1);
        assert_eq!(m.version(), None);
    }

    #[test]
    fn test_load_csv() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "1.0, 0.9, 0.2").unwrap();
        writeln!(file, "0.9, 1.0, 0.4").unwrap();
        writeln!(file, "0.2, 0.4, 1.0").unwrap();
        let m = SimilarityMatrix::load(file.path()).unwrap();
        assert_eq!(m.dim(), 3);
        assert_eq!(m.row(0), Some(&[1.0, 0.9, 0.2][..]));
    }

    #[test]
    fn test_load_missing_file() {
        let err = SimilarityMatrix::load(Path::new("/nonexistent/similarity.json")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
