use camino::{Utf8Path, Utf8PathBuf};
use csv::{ReaderBuilder, StringRecord, Trim};

use crate::error::CatalogError;

#[derive(Debug, Clone)]
pub struct MetadataSheet {
    path: Utf8PathBuf,
    headers: Vec<String>,
    rows: Vec<StringRecord>,
}

impl MetadataSheet {
    pub fn load(path: &Utf8Path) -> Result<Self, CatalogError> {
        if !path.as_std_path().is_file() {
            return Err(CatalogError::MetadataNotFound(path.to_path_buf()));
        }
        let parse_err = |err: csv::Error| CatalogError::MetadataParse {
            path: path.to_path_buf(),
            message: err.to_string(),
        };

        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .trim(Trim::All)
            .from_path(path.as_std_path())
            .map_err(parse_err)?;
        let headers = reader
            .headers()
            .map_err(parse_err)?
            .iter()
            .map(str::to_string)
            .collect();
        let rows = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(parse_err)?;

        Ok(Self {
            path: path.to_path_buf(),
            headers,
            rows,
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn sample_ids(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| row.get(0))
            .map(str::to_string)
            .collect()
    }

    pub fn filter(&self, column: &str, value: &str) -> Result<Vec<String>, CatalogError> {
        let idx = self.column_index(column)?;
        Ok(self
            .rows
            .iter()
            .filter(|row| row.get(idx) == Some(value))
            .filter_map(|row| row.get(0))
            .map(str::to_string)
            .collect())
    }

    pub fn unique_values(&self, column: &str) -> Result<Vec<String>, CatalogError> {
        let idx = self.column_index(column)?;
        let mut values: Vec<String> = Vec::new();
        for value in self.rows.iter().filter_map(|row| row.get(idx)) {
            if !values.iter().any(|seen| seen == value) {
                values.push(value.to_string());
            }
        }
        Ok(values)
    }

    fn column_index(&self, column: &str) -> Result<usize, CatalogError> {
        self.headers
            .iter()
            .position(|header| header == column)
            .ok_or_else(|| CatalogError::MetadataColumnNotFound {
                column: column.to_string(),
                path: self.path.clone(),
            })
    }
}

pub fn filter_by_metadata(
    path: &Utf8Path,
    column: &str,
    value: &str,
) -> Result<Vec<String>, CatalogError> {
    MetadataSheet::load(path)?.filter(column, value)
}
