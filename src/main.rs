//! Worm Merger - CSV to Excel Merger
//!
//! Picks worm result CSV files, excludes chosen worms per file and merges
//! them side by side into one Excel workbook.

mod config;
mod data;
mod gui;
mod xlsx;

use anyhow::anyhow;
use config::Config;
use eframe::egui;
use gui::MergerApp;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> anyhow::Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let config = Config::load();
    info!("startup");

    // Configure native options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window_width, config.window_height])
            .with_min_inner_size([640.0, 420.0])
            .with_title("CSV to Excel Merger"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "CSV to Excel Merger",
        options,
        Box::new(|cc| Ok(Box::new(MergerApp::new(cc, config)))),
    )
    .map_err(|e| anyhow!("GUI error: {}", e))
}
