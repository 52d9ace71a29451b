//! Terminal UI components.
//!
//! This module contains all UI-related code including:
//! - [`viewport`]: Scroll position and visible range management
//! - [`style`]: Theming and colors
//! - the sidebar panes, document pane, status bars and overlays

pub mod style;
pub mod viewport;

mod overlays;
mod render;
mod sidebar;
mod status;

pub use render::{document_content_width, footer_rows, render, sidebar_width, split_main_columns};

pub const DOCUMENT_LEFT_PADDING: u16 = 2;
pub const SIDEBAR_WIDTH_PERCENT: u16 = 30;
pub const DOC_WIDTH_PERCENT: u16 = 70;
