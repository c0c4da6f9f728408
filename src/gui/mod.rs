//! GUI module - User interface components

mod app;
mod control_panel;
mod exclusion_window;

pub use app::MergerApp;
pub use control_panel::{ControlPanel, ControlPanelAction};
pub use exclusion_window::ExclusionWindow;
