//! A small ordered table keyed by relation name.
//!
//! Stands in for the data-frame joins of the feature stages: one ordered
//! index column plus named value columns, serializable to CSV with a
//! header row.

use crate::error::{PipelineError, PipelineResult};
use indexmap::IndexMap;
use std::fmt;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    index_name: String,
    index: Vec<String>,
    columns: IndexMap<String, Vec<CellValue>>,
}

impl FeatureTable {
    pub fn new(index_name: impl Into<String>, index: Vec<String>) -> Self {
        Self {
            index_name: index_name.into(),
            index,
            columns: IndexMap::new(),
        }
    }

    pub fn index(&self) -> &[String] {
        &self.index
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<CellValue>,
    ) -> PipelineResult<()> {
        let name = name.into();
        if values.len() != self.index.len() {
            return Err(PipelineError::Arithmetic {
                reason: format!(
                    "column '{name}' has {} values for {} index entries",
                    values.len(),
                    self.index.len()
                ),
            });
        }
        self.columns.insert(name, values);
        Ok(())
    }

    pub fn get(&self, row: &str, column: &str) -> Option<&CellValue> {
        let row_index = self.index.iter().position(|r| r == row)?;
        self.columns.get(column)?.get(row_index)
    }

    /// Append another table's columns, aligning rows by index value.
    /// Rows absent from `other` get empty cells.
    pub fn join(&mut self, other: &FeatureTable) -> PipelineResult<()> {
        for (name, _) in other.columns.iter() {
            let values: Vec<CellValue> = self
                .index
                .iter()
                .map(|row| {
                    other
                        .get(row, name)
                        .cloned()
                        .unwrap_or_else(|| CellValue::Text(String::new()))
                })
                .collect();
            self.push_column(name.clone(), values)?;
        }
        Ok(())
    }

    /// Serialize as CSV with a header row.
    pub fn write_csv<W: Write>(&self, writer: W, path: &Path) -> PipelineResult<()> {
        let to_error = |e: csv::Error| PipelineError::FileWrite {
            path: path.to_path_buf(),
            source: std::io::Error::other(e),
        };

        let mut csv_writer = csv::Writer::from_writer(writer);
        let mut header = vec![self.index_name.clone()];
        header.extend(self.columns.keys().cloned());
        csv_writer.write_record(&header).map_err(to_error)?;

        for (row_index, row) in self.index.iter().enumerate() {
            let mut record = vec![row.clone()];
            for values in self.columns.values() {
                record.push(values[row_index].to_string());
            }
            csv_writer.write_record(&record).map_err(to_error)?;
        }
        csv_writer.flush().map_err(|e| PipelineError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }

    /// Write the table to a file.
    pub fn save(&self, path: &Path) -> PipelineResult<()> {
        let file = std::fs::File::create(path).map_err(|e| PipelineError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.write_csv(file, path)
    }
}
