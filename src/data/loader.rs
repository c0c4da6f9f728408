//! CSV Data Loader Module
//! Reads raw CSV cells with Polars; no header interpretation, every cell a string.

use polars::prelude::*;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV {path}: {source}")]
    CsvError {
        path: String,
        #[source]
        source: PolarsError,
    },
    #[error("Failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Raw cells of one CSV row
pub type RawRow = Vec<Option<String>>;

/// Result of a full read
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedCsv {
    /// File contained no rows at all
    Empty,
    /// Every row including the header row, row-major
    Rows(Vec<RawRow>),
}

/// Reads CSV files as untyped string grids.
pub struct CsvLoader;

impl CsvLoader {
    /// Read only the first row of the file.
    pub fn read_header(path: &Path) -> Result<RawRow, LoaderError> {
        match Self::read_grid(path, Some(1))? {
            LoadedCsv::Rows(mut rows) if !rows.is_empty() => Ok(rows.swap_remove(0)),
            _ => Ok(Vec::new()),
        }
    }

    /// Worm names offered for exclusion: header cells after the first, deduplicated.
    pub fn discover_worms(path: &Path) -> Result<Vec<String>, LoaderError> {
        let header = Self::read_header(path)?;
        let mut worms: Vec<String> = Vec::new();
        for name in header.into_iter().skip(1).flatten() {
            if !worms.contains(&name) {
                worms.push(name);
            }
        }
        debug!("{} worms in {}", worms.len(), path.display());
        Ok(worms)
    }

    /// Read every row of the file.
    pub fn read_table(path: &Path) -> Result<LoadedCsv, LoaderError> {
        Self::read_grid(path, None)
    }

    fn read_grid(path: &Path, n_rows: Option<usize>) -> Result<LoadedCsv, LoaderError> {
        let to_err = |source: PolarsError| LoaderError::CsvError {
            path: path.display().to_string(),
            source,
        };

        // Zero-length files never reach the parser
        let metadata = std::fs::metadata(path).map_err(|source| LoaderError::Io {
            path: path.display().to_string(),
            source,
        })?;
        if metadata.len() == 0 {
            return Ok(LoadedCsv::Empty);
        }

        // Schema length 0 reads every column as String
        let result = LazyCsvReader::new(path)
            .with_has_header(false)
            .with_infer_schema_length(Some(0))
            .with_truncate_ragged_lines(true)
            .with_n_rows(n_rows)
            .finish()
            .and_then(|lazy| lazy.collect());

        let df = match result {
            Ok(df) => df,
            Err(e) if is_no_data(&e) => return Ok(LoadedCsv::Empty),
            Err(e) => return Err(to_err(e)),
        };

        if df.height() == 0 {
            return Ok(LoadedCsv::Empty);
        }

        let mut rows: Vec<RawRow> = vec![Vec::with_capacity(df.width()); df.height()];
        for column in df.get_columns() {
            let values = column.str().map_err(to_err)?;
            for (row, value) in rows.iter_mut().zip(values.into_iter()) {
                row.push(value.map(|s| s.to_string()));
            }
        }

        Ok(LoadedCsv::Rows(rows))
    }
}

/// Scans wrap the no-data error in context, so look through it.
fn is_no_data(err: &PolarsError) -> bool {
    match err {
        PolarsError::NoData(_) => true,
        PolarsError::Context { error, .. } => is_no_data(error),
        _ => false,
    }
}
