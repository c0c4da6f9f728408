//! Exclude Worms Window
//! One checkbox per worm found in a file's header row.

use crate::data::Exclusions;
use egui::{RichText, ScrollArea};
use std::path::{Path, PathBuf};

/// Floating window editing the exclusions of one file.
pub struct ExclusionWindow {
    path: PathBuf,
    worms: Vec<String>,
    checked: Vec<bool>,
    open: bool,
}

impl ExclusionWindow {
    /// Pre-checks worms already excluded for this file.
    pub fn new(path: PathBuf, worms: Vec<String>, current: &Exclusions) -> Self {
        let checked = worms.iter().map(|w| current.contains(w)).collect();
        Self {
            path,
            worms,
            checked,
            open: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Currently ticked worms
    pub fn selected(&self) -> Exclusions {
        self.worms
            .iter()
            .zip(&self.checked)
            .filter(|(_, &c)| c)
            .map(|(w, _)| w.clone())
            .collect()
    }

    /// Draw the window. Returns the chosen exclusions once "Exclude Selected" is pressed.
    pub fn show(&mut self, ctx: &egui::Context) -> Option<Exclusions> {
        let mut saved = None;
        let mut open = self.open;

        egui::Window::new("Exclude Worms")
            .open(&mut open)
            .collapsible(false)
            .resizable(true)
            .default_width(280.0)
            .show(ctx, |ui| {
                let name = self
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                ui.label(RichText::new(name).size(12.0).strong());
                ui.label("Select worms to exclude:");
                ui.add_space(5.0);

                ScrollArea::vertical().max_height(300.0).show(ui, |ui| {
                    if self.worms.is_empty() {
                        ui.label("No worms found in header row");
                    }
                    for (worm, checked) in self.worms.iter().zip(self.checked.iter_mut()) {
                        ui.checkbox(checked, worm);
                    }
                });

                ui.add_space(5.0);
                ui.horizontal(|ui| {
                    if ui.small_button("Select All").clicked() {
                        self.checked.iter_mut().for_each(|v| *v = true);
                    }
                    if ui.small_button("Clear All").clicked() {
                        self.checked.iter_mut().for_each(|v| *v = false);
                    }
                });

                ui.add_space(10.0);
                ui.vertical_centered(|ui| {
                    if ui.button("Exclude Selected").clicked() {
                        saved = Some(self.selected());
                    }
                });
            });

        self.open = open && saved.is_none();
        saved
    }
}
