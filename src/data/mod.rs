//! Data module - CSV loading, file selection and merging

mod loader;
mod merger;
mod selection;

pub use loader::CsvLoader;
pub use merger::{merge_files, MergeEvent, Row, Worksheet};
pub use selection::{find_lethargus, Exclusions, FileSelection, SelectionError};
