// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. toc::TocNode)
    clippy::module_name_repetitions
)]

//! # docshelf
//!
//! A terminal viewer for static markdown documentation sites.
//!
//! docshelf browses a site published as markdown files plus a JSON directory
//! index, either over HTTP or from a local directory, with:
//! - A foldable file tree of the site
//! - A foldable outline of the open document that follows scrolling
//! - Routes with heading anchors and back/forward history
//! - In-page search
//!
//! ## Architecture
//!
//! docshelf uses The Elm Architecture (TEA) pattern:
//! - **Model**: Application state
//! - **Message**: Events and actions
//! - **Update**: Pure state transitions, with fetches queued as effects
//! - **View**: Render to terminal
//!
//! ## Modules
//!
//! - [`app`]: Main application loop and state
//! - [`toc`]: File tree and outline: nodes, folding, rows, scroll spy
//! - [`index`]: Directory index parsing
//! - [`fetch`]: Fetching the index and documents
//! - [`route`]: Route fragments and history
//! - [`session`]: Last opened document
//! - [`document`]: Markdown parsing and rendering
//! - [`search`]: Search functionality
//! - [`ui`]: Terminal UI components
//! - [`config`]: Saved defaults

pub mod app;
pub mod config;
pub mod document;
pub mod fetch;
pub mod index;
pub mod route;
pub mod search;
pub mod session;
pub mod toc;
pub mod ui;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::app::{App, Message, Model};
    pub use crate::document::Document;
    pub use crate::route::{Route, Router};
    pub use crate::toc::{Mount, Tree};
    pub use crate::ui::viewport::Viewport;
}
