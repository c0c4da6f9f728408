//! Merge Module
//! Column-wise concatenation of worm CSVs aligned by row index.

use super::loader::{CsvLoader, LoadedCsv, LoaderError, RawRow};
use super::selection::Exclusions;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Please add at least one CSV file.")]
    NoFiles,
    #[error(transparent)]
    Load(#[from] LoaderError),
}

/// Events reported while merging
#[derive(Debug, Clone, PartialEq)]
pub enum MergeEvent {
    Progress(f32, String),
    Warning(String),
}

/// One output row keyed by its source row index
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub index: usize,
    pub cells: Vec<Option<String>>,
}

/// A header row plus indexed data rows. Header names may repeat.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Worksheet {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Worksheet {
    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Build one file's contribution.
    ///
    /// `header` is the file's first row and `rows` the full read. The header
    /// line stays in the data as row 0, so every file repeats its worm names
    /// under the reapplied headers. The leading column is dropped, remaining
    /// columns are labelled from the header and excluded labels are filtered
    /// out. Rows are indexed from 0 in file order.
    pub fn from_source(header: &[Option<String>], rows: &[RawRow], exclusions: &Exclusions) -> Self {
        let labels: Vec<String> = header
            .iter()
            .skip(1)
            .map(|cell| cell.clone().unwrap_or_default())
            .collect();

        // Source positions of the kept columns
        let kept: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, label)| !exclusions.contains(*label))
            .map(|(i, _)| i + 1)
            .collect();

        let headers = kept.iter().map(|&i| labels[i - 1].clone()).collect();
        let rows = rows
            .iter()
            .enumerate()
            .map(|(index, raw)| Row {
                index,
                cells: kept
                    .iter()
                    .map(|&i| raw.get(i).cloned().flatten())
                    .collect(),
            })
            .collect();

        Self { headers, rows }
    }
}

/// Place tables side by side, aligning rows on their index.
///
/// Output rows follow first-seen index order. The k-th row carrying a given
/// index in one table lines up with the k-th such row in every other table;
/// a table with no such row leaves its cells empty.
pub fn concat_columns(tables: Vec<Worksheet>) -> Worksheet {
    let width: usize = tables.iter().map(Worksheet::width).sum();
    let mut headers = Vec::with_capacity(width);
    let mut rows: Vec<Row> = Vec::new();
    let mut positions: HashMap<usize, Vec<usize>> = HashMap::new();

    for table in tables {
        let offset = headers.len();
        let mut seen: HashMap<usize, usize> = HashMap::new();

        for row in table.rows {
            let occurrence = seen.entry(row.index).or_insert(0);
            let slots = positions.entry(row.index).or_default();
            let pos = match slots.get(*occurrence) {
                Some(&pos) => pos,
                None => {
                    rows.push(Row {
                        index: row.index,
                        cells: vec![None; width],
                    });
                    slots.push(rows.len() - 1);
                    rows.len() - 1
                }
            };
            *occurrence += 1;

            for (j, cell) in row.cells.into_iter().enumerate() {
                rows[pos].cells[offset + j] = cell;
            }
        }

        headers.extend(table.headers);
    }

    Worksheet { headers, rows }
}

/// Drop rows whose index was already seen, keeping the first.
pub fn dedup_rows(mut sheet: Worksheet) -> Worksheet {
    let mut seen = HashSet::new();
    let before = sheet.rows.len();
    sheet.rows.retain(|row| seen.insert(row.index));
    if sheet.rows.len() != before {
        debug!("dropped {} duplicate rows", before - sheet.rows.len());
    }
    sheet
}

/// Merged sheet plus the files skipped as empty
#[derive(Debug)]
pub struct MergeOutcome {
    pub sheet: Worksheet,
    pub skipped: Vec<PathBuf>,
}

/// Read, filter, concatenate and deduplicate the selected files.
///
/// Progress covers 0-50%; the remaining half belongs to the writer.
pub fn merge_files<F>(entries: &[(PathBuf, Exclusions)], mut report: F) -> Result<MergeOutcome, MergeError>
where
    F: FnMut(MergeEvent),
{
    if entries.is_empty() {
        return Err(MergeError::NoFiles);
    }

    report(MergeEvent::Progress(0.0, "Reading CSV files...".to_string()));

    // Header read and full read per file, files in parallel
    let loaded: Vec<(RawRow, LoadedCsv)> = entries
        .par_iter()
        .map(|(path, _)| -> Result<_, LoaderError> {
            Ok((CsvLoader::read_header(path)?, CsvLoader::read_table(path)?))
        })
        .collect::<Result<_, _>>()?;

    let total = entries.len();
    let mut tables = Vec::with_capacity(total);
    let mut skipped = Vec::new();

    for (idx, ((path, exclusions), (header, table))) in entries.iter().zip(loaded).enumerate() {
        match table {
            LoadedCsv::Empty => {
                warn!("{} is empty, skipped", path.display());
                report(MergeEvent::Warning(format!(
                    "CSV file {} is empty.",
                    path.display()
                )));
                skipped.push(path.clone());
            }
            LoadedCsv::Rows(rows) => {
                let sheet = Worksheet::from_source(&header, &rows, exclusions);
                debug!(
                    "{}: {} columns kept, {} rows",
                    path.display(),
                    sheet.width(),
                    sheet.height()
                );
                tables.push(sheet);
            }
        }

        let progress = (idx + 1) as f32 / total as f32 * 50.0;
        report(MergeEvent::Progress(
            progress,
            format!("Processed {}/{} files", idx + 1, total),
        ));
    }

    let sheet = dedup_rows(concat_columns(tables));
    info!(
        "merged {} files into {} columns x {} rows",
        total - skipped.len(),
        sheet.width(),
        sheet.height()
    );

    Ok(MergeOutcome { sheet, skipped })
}
