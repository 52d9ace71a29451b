//! Application state and main event loop.
//!
//! This module implements The Elm Architecture (TEA):
//! - [`Model`]: The complete application state
//! - [`Message`]: All possible events and actions
//! - [`update`]: State transitions, queuing effects instead of performing them
//! - [`App::run`]: Main event loop with rendering and effect execution

mod effects;
mod event_loop;
mod input;
mod model;
mod sidebar;
mod update;

pub use model::{DocState, Effect, IndexState, Model, NARROW_TERMINAL_WIDTH, ToastLevel};
pub use sidebar::{Pane, SidebarView};
pub use update::{Message, update};

use std::path::PathBuf;
use std::sync::Arc;

use crate::fetch::{DEFAULT_CONTENT_ROOT, Fetcher, fetcher_for_site};
use crate::route::Route;
use crate::session::{SessionStore, last_path_key};

/// Main application struct that owns the session and runs the event loop.
pub struct App {
    site: String,
    fetcher: Arc<dyn Fetcher>,
    session: SessionStore,
    route: Option<String>,
    doc: Option<String>,
    index_location: Option<String>,
    content_root: String,
    outline_levels: usize,
    sidebar_hidden: bool,
    config_global_path: Option<PathBuf>,
    config_local_path: Option<PathBuf>,
}

impl App {
    /// Create an application browsing `site`, a base URL or a directory.
    pub fn new(site: impl Into<String>) -> Self {
        let site = site.into();
        Self {
            fetcher: fetcher_for_site(&site),
            site,
            session: SessionStore::in_memory(),
            route: None,
            doc: None,
            index_location: None,
            content_root: DEFAULT_CONTENT_ROOT.to_string(),
            outline_levels: 0,
            sidebar_hidden: false,
            config_global_path: None,
            config_local_path: None,
        }
    }

    /// Fetch through `fetcher` instead of the one picked from the site.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Remember the last document in `session`.
    #[must_use]
    pub fn with_session(mut self, session: SessionStore) -> Self {
        self.session = session;
        self
    }

    /// Start at an address fragment such as `doc=guide.md&anchor=setup`.
    #[must_use]
    pub fn with_route(mut self, fragment: Option<String>) -> Self {
        self.route = fragment;
        self
    }

    /// Start at a document path.
    #[must_use]
    pub fn with_doc(mut self, path: Option<String>) -> Self {
        self.doc = path;
        self
    }

    /// Try this index location before the defaults.
    #[must_use]
    pub fn with_index_location(mut self, location: Option<String>) -> Self {
        self.index_location = location;
        self
    }

    #[must_use]
    pub fn with_content_root(mut self, root: impl Into<String>) -> Self {
        self.content_root = root.into();
        self
    }

    /// Outline levels expanded when a document opens.
    #[must_use]
    pub const fn with_outline_levels(mut self, levels: usize) -> Self {
        self.outline_levels = levels;
        self
    }

    /// Start with the sidebar hidden.
    #[must_use]
    pub const fn with_sidebar_hidden(mut self, hidden: bool) -> Self {
        self.sidebar_hidden = hidden;
        self
    }

    /// Set config paths to show in help.
    #[must_use]
    pub fn with_config_paths(
        mut self,
        global_path: Option<PathBuf>,
        local_path: Option<PathBuf>,
    ) -> Self {
        self.config_global_path = global_path;
        self.config_local_path = local_path;
        self
    }

    /// The document to open first: an explicit route, then an explicit
    /// path, then the last document of the previous session.
    pub fn initial_route(&self) -> Option<Route> {
        self.route
            .as_deref()
            .and_then(Route::parse)
            .or_else(|| self.doc.clone().map(|path| Route::new(path, None)))
            .or_else(|| {
                self.session
                    .get(&self.last_path_key())
                    .map(|path| Route::new(path, None))
            })
    }

    /// Session key holding the last document opened on this site.
    pub fn last_path_key(&self) -> String {
        last_path_key(&self.fetcher.describe())
    }
}
