//! Worm Merger Main Application
//! Main window wiring file selection, worm exclusion and the background merge.

use crate::config::Config;
use crate::data::{
    find_lethargus, merge_files, CsvLoader, Exclusions, FileSelection, MergeEvent, SelectionError,
};
use crate::gui::{ControlPanel, ControlPanelAction, ExclusionWindow};
use crate::xlsx::XlsxWriter;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread;
use tracing::{error, info, warn};

/// Merge result from background thread
#[derive(Debug)]
enum MergeResult {
    Progress(f32, String),
    Warning(String),
    Complete { path: PathBuf, skipped: usize },
    Error(String),
}

impl MergeResult {
    fn is_final(&self) -> bool {
        matches!(self, MergeResult::Complete { .. } | MergeResult::Error(_))
    }
}

/// Collect pending results. A worker that hangs up without a final
/// result (e.g. it panicked) yields an `Error`. Returns whether the
/// receiver is still needed.
fn drain_results(rx: &Receiver<MergeResult>) -> (Vec<MergeResult>, bool) {
    let mut results = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(result) => {
                let done = result.is_final();
                results.push(result);
                if done {
                    return (results, false);
                }
            }
            Err(TryRecvError::Empty) => return (results, true),
            Err(TryRecvError::Disconnected) => {
                results.push(MergeResult::Error(
                    "merge stopped unexpectedly".to_string(),
                ));
                return (results, false);
            }
        }
    }
}

/// Status line after a successful write
fn success_message(path: &Path, skipped: usize) -> String {
    let mut message = format!("Excel file created successfully as {}", path.display());
    if skipped > 0 {
        message.push_str(&format!(" ({} empty file(s) skipped)", skipped));
    }
    message
}

/// Main application window.
pub struct MergerApp {
    config: Config,
    selection: FileSelection,
    control_panel: ControlPanel,
    exclusion_window: Option<ExclusionWindow>,

    // Async merge
    merge_rx: Option<Receiver<MergeResult>>,
    is_merging: bool,
}

impl MergerApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: Config) -> Self {
        Self {
            control_panel: ControlPanel::new(&config.default_output_name),
            config,
            selection: FileSelection::new(),
            exclusion_window: None,
            merge_rx: None,
            is_merging: false,
        }
    }

    fn show_warning(title: &str, message: &str) {
        warn!("{}: {}", title, message);
        rfd::MessageDialog::new()
            .set_level(rfd::MessageLevel::Warning)
            .set_title(title)
            .set_description(message)
            .set_buttons(rfd::MessageButtons::Ok)
            .show();
    }

    fn show_info(title: &str, message: &str) {
        rfd::MessageDialog::new()
            .set_level(rfd::MessageLevel::Info)
            .set_title(title)
            .set_description(message)
            .set_buttons(rfd::MessageButtons::Ok)
            .show();
    }

    fn add_file(&mut self, path: PathBuf) {
        let name = path.display().to_string();
        if self.selection.add(path) {
            self.control_panel.selected = Some(self.selection.len() - 1);
            self.control_panel.set_progress(0.0, &format!("Added {}", name));
        } else {
            self.control_panel
                .set_progress(0.0, &format!("{} is already in the list", name));
        }
    }

    /// Handle CSV file selection
    fn handle_add_csv(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV files", &["csv"])
            .pick_file()
        {
            self.add_file(path);
        }
    }

    /// Look for the Lethargus dataframe under a chosen folder
    fn handle_search_lethargus(&mut self) {
        let Some(folder) = rfd::FileDialog::new()
            .set_title("Select Folder")
            .pick_folder()
        else {
            return;
        };

        match find_lethargus(&folder, &self.config) {
            Ok(path) => self.add_file(path),
            Err(e) => Self::show_warning(e.title(), &e.to_string()),
        }
    }

    fn handle_remove_csv(&mut self) {
        let removed = self
            .control_panel
            .selected
            .ok_or(SelectionError::NoSelection)
            .and_then(|idx| self.selection.remove(idx));

        match removed {
            Ok(path) => {
                if self
                    .exclusion_window
                    .as_ref()
                    .is_some_and(|w| w.path() == path.as_path())
                {
                    self.exclusion_window = None;
                }
                self.control_panel.clamp_selection(self.selection.len());
                self.control_panel
                    .set_progress(0.0, &format!("Removed {}", path.display()));
            }
            Err(_) => Self::show_warning("Warning", "Please select a CSV file to remove."),
        }
    }

    /// Read the selected file's header row and open the exclusion window
    fn handle_exclude_worms(&mut self) {
        let Some(path) = self
            .control_panel
            .selected
            .and_then(|idx| self.selection.get(idx))
            .cloned()
        else {
            Self::show_warning("Warning", "Please select a CSV file to exclude worms.");
            return;
        };

        match CsvLoader::discover_worms(&path) {
            Ok(worms) => {
                let current = self.selection.exclusions(&path);
                self.exclusion_window = Some(ExclusionWindow::new(path, worms, &current));
            }
            Err(e) => {
                error!("worm discovery failed: {}", e);
                Self::show_warning("Warning", &e.to_string());
            }
        }
    }

    fn save_exclusions(&mut self, worms: Exclusions) {
        let Some(window) = self.exclusion_window.take() else {
            return;
        };
        let path = window.path().to_path_buf();
        let count = worms.len();
        if self.selection.set_exclusions(&path, worms).is_ok() {
            self.control_panel.set_progress(
                0.0,
                &format!("{} worms excluded from {}", count, path.display()),
            );
        }
    }

    /// Output file name from the entry box, with .xlsx appended when missing
    fn suggested_file_name(&self) -> String {
        let name = self.control_panel.output_name.trim();
        let name = if name.is_empty() {
            self.config.default_output_name.as_str()
        } else {
            name
        };
        if name.to_lowercase().ends_with(".xlsx") {
            name.to_string()
        } else {
            format!("{}.xlsx", name)
        }
    }

    /// Ask for an output path and start the merge in a background thread
    fn start_merge(&mut self) {
        if self.selection.is_empty() {
            Self::show_warning("Warning", "Please add at least one CSV file.");
            return;
        }

        let Some(mut output_path) = rfd::FileDialog::new()
            .add_filter("Excel files", &["xlsx"])
            .set_title("Save As")
            .set_file_name(self.suggested_file_name())
            .save_file()
        else {
            return; // User cancelled
        };
        if output_path.extension().is_none() {
            output_path.set_extension("xlsx");
        }

        let entries = self.selection.entries();
        let sheet_name = self.config.sheet_name.clone();

        let (tx, rx) = channel();
        self.merge_rx = Some(rx);
        self.is_merging = true;
        self.control_panel.merge_enabled = false;
        self.control_panel.set_progress(0.0, "Merging...");
        info!("merging {} files into {}", entries.len(), output_path.display());

        thread::spawn(move || {
            Self::run_merge(tx, entries, output_path, sheet_name);
        });
    }

    /// Run merge and write (called from background thread)
    fn run_merge(
        tx: Sender<MergeResult>,
        entries: Vec<(PathBuf, Exclusions)>,
        output_path: PathBuf,
        sheet_name: String,
    ) {
        let outcome = merge_files(&entries, |event| {
            let _ = tx.send(match event {
                MergeEvent::Progress(p, status) => MergeResult::Progress(p, status),
                MergeEvent::Warning(message) => MergeResult::Warning(message),
            });
        });

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                let _ = tx.send(MergeResult::Error(e.to_string()));
                return;
            }
        };

        let skipped = outcome.skipped.len();
        if skipped > 0 {
            warn!("{} empty files skipped", skipped);
        }

        let _ = tx.send(MergeResult::Progress(
            75.0,
            "Writing Excel file...".to_string(),
        ));

        match XlsxWriter::write(&outcome.sheet, &output_path, &sheet_name) {
            Ok(()) => {
                let _ = tx.send(MergeResult::Progress(100.0, "Done".to_string()));
                let _ = tx.send(MergeResult::Complete {
                    path: output_path,
                    skipped,
                });
            }
            Err(e) => {
                let _ = tx.send(MergeResult::Error(e.to_string()));
            }
        }
    }

    /// Check for merge results
    fn check_merge_results(&mut self) {
        // Take the receiver temporarily to avoid borrow issues
        let rx = self.merge_rx.take();
        if let Some(rx) = rx {
            let (results, should_keep_receiver) = drain_results(&rx);

            for result in results {
                match result {
                    MergeResult::Progress(progress, status) => {
                        self.control_panel.set_progress(progress, &status);
                    }
                    MergeResult::Warning(message) => {
                        Self::show_warning("Warning", &message);
                    }
                    MergeResult::Complete { path, skipped } => {
                        let message = success_message(&path, skipped);
                        info!("{}", message);
                        // Bar resets once the file is written
                        self.control_panel.set_progress(0.0, &message);
                        self.control_panel.result_path = Some(path);
                        self.finish_merge();
                        Self::show_info("Success", &message);
                    }
                    MergeResult::Error(message) => {
                        error!("merge failed: {}", message);
                        self.control_panel
                            .set_progress(0.0, &format!("Error: {}", message));
                        self.finish_merge();
                        Self::show_warning("Warning", &message);
                    }
                }
            }

            // Put receiver back if still needed
            if should_keep_receiver {
                self.merge_rx = Some(rx);
            }
        }
    }

    fn finish_merge(&mut self) {
        self.is_merging = false;
        self.control_panel.merge_enabled = true;
    }

    fn handle_open_result(&mut self) {
        if let Some(path) = &self.control_panel.result_path {
            if let Err(e) = open::that(path) {
                error!("failed to open {}: {}", path.display(), e);
                self.control_panel
                    .set_progress(0.0, &format!("Error: cannot open {}", path.display()));
            }
        }
    }
}

impl eframe::App for MergerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Check for background results
        self.check_merge_results();

        // Request repaint while merging
        if self.is_merging {
            ctx.request_repaint();
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                let action = self.control_panel.show(ui, &self.selection);

                match action {
                    ControlPanelAction::AddCsv => self.handle_add_csv(),
                    ControlPanelAction::SearchLethargus => self.handle_search_lethargus(),
                    ControlPanelAction::ExcludeWorms => self.handle_exclude_worms(),
                    ControlPanelAction::RemoveCsv => self.handle_remove_csv(),
                    ControlPanelAction::Merge => {
                        if !self.is_merging {
                            self.start_merge();
                        }
                    }
                    ControlPanelAction::OpenResult => self.handle_open_result(),
                    ControlPanelAction::None => {}
                }
            });
        });

        if let Some(window) = self.exclusion_window.as_mut() {
            if let Some(worms) = window.show(ctx) {
                self.save_exclusions(worms);
            } else if !window.is_open() {
                self.exclusion_window = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_results_keep_the_receiver() {
        let (tx, rx) = channel();
        tx.send(MergeResult::Progress(10.0, "Reading".to_string()))
            .unwrap();

        let (results, keep) = drain_results(&rx);
        assert_eq!(results.len(), 1);
        assert!(keep);
        drop(tx);
    }

    #[test]
    fn final_result_releases_the_receiver() {
        let (tx, rx) = channel();
        tx.send(MergeResult::Complete {
            path: PathBuf::from("out.xlsx"),
            skipped: 0,
        })
        .unwrap();
        drop(tx);

        let (results, keep) = drain_results(&rx);
        assert!(!keep);
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], MergeResult::Complete { .. }));
    }

    #[test]
    fn panicked_worker_ends_the_merge() {
        let (tx, rx) = channel::<MergeResult>();
        let worker = thread::spawn(move || {
            let _ = tx.send(MergeResult::Progress(5.0, "Reading".to_string()));
            panic!("worker died");
        });
        assert!(worker.join().is_err());

        let (results, keep) = drain_results(&rx);
        assert!(!keep);
        assert!(matches!(results[0], MergeResult::Progress(..)));
        assert!(matches!(
            results.last(),
            Some(MergeResult::Error(message)) if message == "merge stopped unexpectedly"
        ));
    }

    #[test]
    fn success_message_counts_skipped_files() {
        let path = Path::new("out.xlsx");
        assert_eq!(
            success_message(path, 0),
            "Excel file created successfully as out.xlsx"
        );
        assert_eq!(
            success_message(path, 2),
            "Excel file created successfully as out.xlsx (2 empty file(s) skipped)"
        );
    }
}
