//! File Selection Module
//! Ordered list of chosen CSV files and the worms excluded from each.

use crate::config::Config;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug, PartialEq)]
pub enum SelectionError {
    #[error("No CSV file selected")]
    NoSelection,
}

#[derive(Error, Debug, PartialEq)]
pub enum SearchError {
    #[error("Results folder not located in {0}.")]
    ResultsFolderMissing(String),
    #[error("{file} not found in {folder}.")]
    FileMissing { file: String, folder: String },
}

impl SearchError {
    /// Dialog title for this failure
    pub fn title(&self) -> &'static str {
        match self {
            SearchError::ResultsFolderMissing(_) => "Results Folder Not Found",
            SearchError::FileMissing { .. } => "Lethargus CSV Not Found",
        }
    }
}

/// Worm names excluded from one file
pub type Exclusions = BTreeSet<String>;

/// Selected files in insertion order with per-file exclusions.
#[derive(Debug, Default, Clone)]
pub struct FileSelection {
    paths: Vec<PathBuf>,
    exclusions: HashMap<PathBuf, Exclusions>,
}

impl FileSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a file. Returns false if it is already selected.
    pub fn add(&mut self, path: PathBuf) -> bool {
        if self.exclusions.contains_key(&path) {
            return false;
        }
        info!("selected {}", path.display());
        self.exclusions.insert(path.clone(), Exclusions::new());
        self.paths.push(path);
        true
    }

    /// Remove the file at `index` together with its exclusions.
    pub fn remove(&mut self, index: usize) -> Result<PathBuf, SelectionError> {
        if index >= self.paths.len() {
            return Err(SelectionError::NoSelection);
        }
        let path = self.paths.remove(index);
        self.exclusions.remove(&path);
        info!("removed {}", path.display());
        Ok(path)
    }

    pub fn set_exclusions(&mut self, path: &Path, worms: Exclusions) -> Result<(), SelectionError> {
        let entry = self
            .exclusions
            .get_mut(path)
            .ok_or(SelectionError::NoSelection)?;
        info!("{} worms excluded from {}", worms.len(), path.display());
        *entry = worms;
        Ok(())
    }

    pub fn exclusions(&self, path: &Path) -> Exclusions {
        self.exclusions.get(path).cloned().unwrap_or_default()
    }

    pub fn get(&self, index: usize) -> Option<&PathBuf> {
        self.paths.get(index)
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Snapshot of (path, exclusions) in selection order.
    pub fn entries(&self) -> Vec<(PathBuf, Exclusions)> {
        self.paths
            .iter()
            .map(|p| (p.clone(), self.exclusions(p)))
            .collect()
    }
}

/// Locate `<folder>/<results_dir>/<lethargus_file>`.
pub fn find_lethargus(folder: &Path, config: &Config) -> Result<PathBuf, SearchError> {
    let results = folder.join(&config.results_dir);
    if !results.is_dir() {
        return Err(SearchError::ResultsFolderMissing(
            folder.display().to_string(),
        ));
    }

    let csv = results.join(&config.lethargus_file);
    if !csv.is_file() {
        return Err(SearchError::FileMissing {
            file: config.lethargus_file.clone(),
            folder: results.display().to_string(),
        });
    }
    Ok(csv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn worms(names: &[&str]) -> Exclusions {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn add_keeps_order_and_rejects_duplicates() {
        let mut sel = FileSelection::new();
        assert!(sel.add(PathBuf::from("b.csv")));
        assert!(sel.add(PathBuf::from("a.csv")));
        assert!(!sel.add(PathBuf::from("b.csv")));

        assert_eq!(sel.paths(), &[PathBuf::from("b.csv"), PathBuf::from("a.csv")]);
        assert!(sel.exclusions(Path::new("a.csv")).is_empty());
    }

    #[test]
    fn remove_drops_exclusions() {
        let mut sel = FileSelection::new();
        sel.add(PathBuf::from("a.csv"));
        sel.set_exclusions(Path::new("a.csv"), worms(&["w1"])).unwrap();

        assert_eq!(sel.remove(0).unwrap(), PathBuf::from("a.csv"));
        assert!(sel.is_empty());
        assert!(sel.exclusions(Path::new("a.csv")).is_empty());
        assert_eq!(sel.remove(0), Err(SelectionError::NoSelection));
    }

    #[test]
    fn exclusions_only_for_selected_files() {
        let mut sel = FileSelection::new();
        sel.add(PathBuf::from("a.csv"));
        assert_eq!(
            sel.set_exclusions(Path::new("other.csv"), worms(&["w1"])),
            Err(SelectionError::NoSelection)
        );

        sel.set_exclusions(Path::new("a.csv"), worms(&["w2", "w1"])).unwrap();
        let entries = sel.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].1, worms(&["w1", "w2"]));
    }

    #[test]
    fn lethargus_search() {
        let config = Config::default();
        let dir = tempdir().unwrap();

        assert_eq!(
            find_lethargus(dir.path(), &config),
            Err(SearchError::ResultsFolderMissing(dir.path().display().to_string()))
        );

        let results = dir.path().join("results");
        fs::create_dir(&results).unwrap();
        let err = find_lethargus(dir.path(), &config).unwrap_err();
        assert_eq!(err.title(), "Lethargus CSV Not Found");
        assert!(err.to_string().starts_with("Lethargus_dataframe.csv not found"));

        let csv = results.join("Lethargus_dataframe.csv");
        fs::write(&csv, "a,b\n").unwrap();
        assert_eq!(find_lethargus(dir.path(), &config), Ok(csv));
    }
}
