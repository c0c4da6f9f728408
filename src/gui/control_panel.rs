//! Control Panel Widget
//! Output name, file list, action buttons and progress.

use crate::data::FileSelection;
use egui::{Color32, RichText, ScrollArea};
use std::path::PathBuf;

/// Main panel with file selection and merge controls.
pub struct ControlPanel {
    pub output_name: String,
    pub selected: Option<usize>,
    pub progress: f32,
    pub status: String,
    /// Last workbook written, enables "Open Result"
    pub result_path: Option<PathBuf>,
    pub merge_enabled: bool,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self {
            output_name: String::new(),
            selected: None,
            progress: 0.0,
            status: "Ready".to_string(),
            result_path: None,
            merge_enabled: true,
        }
    }
}

impl ControlPanel {
    pub fn new(output_name: &str) -> Self {
        Self {
            output_name: output_name.to_string(),
            ..Self::default()
        }
    }

    /// Keep the selection pointing at a valid row after removals
    pub fn clamp_selection(&mut self, len: usize) {
        self.selected = match self.selected {
            Some(_) if len == 0 => None,
            Some(i) if i >= len => Some(len - 1),
            other => other,
        };
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui, files: &FileSelection) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        // Title
        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("🐛 CSV to Excel Merger")
                    .size(22.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Output Section =====
        ui.horizontal(|ui| {
            ui.label("Output Excel File Name:");
            ui.add(egui::TextEdit::singleline(&mut self.output_name).desired_width(220.0));
        });

        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Files Section =====
        ui.label(RichText::new("📁 CSV Files").size(14.0).strong());
        ui.add_space(5.0);

        ui.horizontal(|ui| {
            ui.vertical(|ui| {
                if ui.button("➕ Add CSV").clicked() {
                    action = ControlPanelAction::AddCsv;
                }
                if ui.button("🔍 Lethargus Searcher").clicked() {
                    action = ControlPanelAction::SearchLethargus;
                }
                if ui.button("🚫 Exclude Worms").clicked() {
                    action = ControlPanelAction::ExcludeWorms;
                }
                if ui.button("➖ Remove CSV").clicked() {
                    action = ControlPanelAction::RemoveCsv;
                }
            });

            ui.add_space(10.0);

            egui::Frame::none()
                .fill(ui.visuals().widgets.noninteractive.bg_fill)
                .rounding(5.0)
                .inner_margin(5.0)
                .show(ui, |ui| {
                    ui.set_min_width(ui.available_width());
                    ScrollArea::vertical()
                        .max_height(180.0)
                        .auto_shrink([false, false])
                        .show(ui, |ui| {
                            if files.is_empty() {
                                ui.label(RichText::new("No files selected").color(Color32::GRAY));
                            }
                            for (i, path) in files.paths().iter().enumerate() {
                                let excluded = files.exclusions(path).len();
                                let mut text = path.display().to_string();
                                if excluded > 0 {
                                    text.push_str(&format!("  ({} excluded)", excluded));
                                }
                                if ui
                                    .selectable_label(self.selected == Some(i), text)
                                    .clicked()
                                {
                                    self.selected = Some(i);
                                }
                            }
                        });
                });
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Action Buttons =====
        ui.vertical_centered(|ui| {
            ui.add_enabled_ui(self.merge_enabled, |ui| {
                let button = egui::Button::new(RichText::new("▶ Merge").size(16.0))
                    .min_size(egui::vec2(200.0, 35.0));
                if ui.add(button).clicked() {
                    action = ControlPanelAction::Merge;
                }
            });

            ui.add_space(8.0);

            ui.add_enabled_ui(self.result_path.is_some(), |ui| {
                let open_button = egui::Button::new(RichText::new("📄 Open Result").size(14.0))
                    .min_size(egui::vec2(150.0, 30.0));
                if ui.add(open_button).clicked() {
                    action = ControlPanelAction::OpenResult;
                }
            });
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Progress Section =====
        ui.add(
            egui::ProgressBar::new(self.progress / 100.0)
                .show_percentage()
                .animate(self.progress > 0.0 && self.progress < 100.0),
        );

        ui.add_space(5.0);

        let status_color = if self.status.starts_with("Error") {
            Color32::from_rgb(220, 53, 69)
        } else if self.status.starts_with("Excel file created") {
            Color32::from_rgb(40, 167, 69)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));

        action
    }

    /// Set progress and status
    pub fn set_progress(&mut self, progress: f32, status: &str) {
        self.progress = progress;
        self.status = status.to_string();
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    AddCsv,
    SearchLethargus,
    ExcludeWorms,
    RemoveCsv,
    Merge,
    OpenResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_follows_removals() {
        let mut panel = ControlPanel::new("merged.xlsx");
        panel.selected = Some(2);
        panel.clamp_selection(2);
        assert_eq!(panel.selected, Some(1));
        panel.clamp_selection(0);
        assert_eq!(panel.selected, None);
    }
}
