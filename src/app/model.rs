use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::document::{Document, LinkRef};
use crate::fetch::{DEFAULT_CONTENT_ROOT, FetchError, FetchOutcome, FetchRequest, resolve_content_path};
use crate::index::{IndexEntry, count_files};
use crate::route::{Route, Router};
use crate::search::SearchState;
use crate::toc::{MountPoint, NodeKind, Placeholder, ScrollSpy, Tree, build_file_tree, build_outline};
use crate::ui::viewport::Viewport;

use super::sidebar::{Pane, SidebarView};

/// Terminals narrower than this start with the sidebar hidden.
pub const NARROW_TERMINAL_WIDTH: u16 = 60;

const TOAST_DURATION: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
struct Toast {
    level: ToastLevel,
    message: String,
    expires_at: Instant,
}

/// Where the directory index stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexState {
    Loading,
    Ready { location: String, files: usize },
    Unavailable(String),
}

/// Where the document pane stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocState {
    /// Nothing requested yet
    Empty,
    Loading { path: String },
    Loaded { path: String },
    Failed { path: String, error: String },
}

/// Work for the runtime to carry out after an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Fetch(FetchRequest),
    /// Remember the path as the last opened document
    RememberPath(String),
}

/// The complete application state.
///
/// All state lives here; the runtime only executes the queued [`Effect`]s.
pub struct Model {
    /// The rendered document currently on screen
    pub document: Document,
    /// Scroll position in the document pane
    pub viewport: Viewport,
    /// File tree pane
    pub files: Pane,
    /// Page outline pane
    pub outline: Pane,
    pub spy: ScrollSpy,
    pub sidebar_view: SidebarView,
    pub sidebar_visible: bool,
    /// Keyboard focus: true = sidebar, false = document
    pub sidebar_focused: bool,
    pub index_state: IndexState,
    pub doc_state: DocState,
    /// The route whose document should end up on screen
    pub wanted: Option<Route>,
    pub router: Router,
    /// Prefix prepended to index paths when fetching documents
    pub content_root: String,
    /// Outline levels expanded when a document opens
    pub outline_levels: usize,
    /// Site being browsed, for display
    pub site_label: String,
    pub search: Option<SearchState>,
    /// File filter query while it is being typed
    pub filter_prompt: Option<String>,
    /// Route fragment while it is being typed
    pub route_prompt: Option<String>,
    /// Links offered by the quick-follow picker
    pub link_picker_items: Vec<LinkRef>,
    pub help_visible: bool,
    /// Global config path shown in help
    pub config_global_path: Option<PathBuf>,
    /// Local override path shown in help
    pub config_local_path: Option<PathBuf>,
    pub should_quit: bool,
    toast: Option<Toast>,
    effects: Vec<Effect>,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("site", &self.site_label)
            .field("doc_state", &self.doc_state)
            .field("index_state", &self.index_state)
            .field("sidebar_view", &self.sidebar_view)
            .field("spy", &self.spy.mode())
            .finish_non_exhaustive()
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new((80, 24))
    }
}

/// `(id, line)` for every heading node, the scroll spy's targets.
fn spy_targets(tree: &Tree) -> Vec<(String, usize)> {
    tree.nodes()
        .iter()
        .filter_map(|node| node.heading_line().map(|line| (node.id().to_string(), line)))
        .collect()
}

impl Model {
    /// Create a model for a terminal of `(width, height)` cells.
    pub fn new(terminal_size: (u16, u16)) -> Self {
        let (width, height) = terminal_size;
        let mut model = Self {
            document: Document::empty(),
            viewport: Viewport::new(width, height.saturating_sub(1), 0),
            files: Pane::new(MountPoint::FilePane, Placeholder::Loading),
            outline: Pane::new(MountPoint::OutlinePane, Placeholder::NoDocument),
            spy: ScrollSpy::new(),
            sidebar_view: SidebarView::Files,
            sidebar_visible: width >= NARROW_TERMINAL_WIDTH,
            sidebar_focused: false,
            index_state: IndexState::Loading,
            doc_state: DocState::Empty,
            wanted: None,
            router: Router::new(),
            content_root: DEFAULT_CONTENT_ROOT.to_string(),
            outline_levels: 0,
            site_label: String::new(),
            search: None,
            filter_prompt: None,
            route_prompt: None,
            link_picker_items: Vec::new(),
            help_visible: false,
            config_global_path: None,
            config_local_path: None,
            should_quit: false,
            toast: None,
            effects: Vec::new(),
        };
        model.resize_panes();
        model
    }

    /// Request the directory index and the initial document, if any.
    ///
    /// Without an initial route the first file of the index is opened once
    /// it arrives.
    pub fn begin(&mut self, initial: Option<Route>, index_candidates: Vec<String>) {
        self.index_state = IndexState::Loading;
        self.files.show_placeholder(Placeholder::Loading);
        self.effects.push(Effect::Fetch(FetchRequest::Index {
            candidates: index_candidates,
        }));
        if let Some(route) = initial {
            self.open_document(route);
        }
        self.refresh_sidebar();
    }

    /// Drain the effects queued since the last call.
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    pub fn pending_effects(&self) -> &[Effect] {
        &self.effects
    }

    /// Path of the document on screen or on its way.
    pub fn current_path(&self) -> Option<&str> {
        self.wanted.as_ref().map(|route| route.path.as_str())
    }

    pub const fn active_pane(&self) -> &Pane {
        match self.sidebar_view {
            SidebarView::Files => &self.files,
            SidebarView::Outline => &self.outline,
        }
    }

    pub(super) const fn pane_mut(&mut self, view: SidebarView) -> &mut Pane {
        match view {
            SidebarView::Files => &mut self.files,
            SidebarView::Outline => &mut self.outline,
        }
    }

    pub(super) fn show_toast(&mut self, level: ToastLevel, message: impl Into<String>) {
        self.toast = Some(Toast {
            level,
            message: message.into(),
            expires_at: Instant::now() + TOAST_DURATION,
        });
    }

    pub(super) fn expire_toast(&mut self, now: Instant) -> bool {
        if self
            .toast
            .as_ref()
            .is_some_and(|toast| toast.expires_at <= now)
        {
            self.toast = None;
            return true;
        }
        false
    }

    pub fn active_toast(&self) -> Option<(&str, ToastLevel)> {
        self.toast
            .as_ref()
            .map(|toast| (toast.message.as_str(), toast.level))
    }

    pub const fn link_picker_active(&self) -> bool {
        !self.link_picker_items.is_empty()
    }

    /// Width the document is laid out at.
    pub(super) fn layout_width(&self) -> u16 {
        crate::ui::document_content_width(self.viewport.width(), self.sidebar_visible)
    }

    /// Size both sidebar panes to the current terminal.
    pub(super) fn resize_panes(&mut self) {
        let width = crate::ui::sidebar_width(self.viewport.width());
        // The sidebar spans the status row too, minus its top and bottom border.
        let rows = self.viewport.height().saturating_sub(1);
        self.files.resize(width, rows);
        self.outline.resize(width, rows);
    }

    // Navigation

    /// Open `route`, recording it in the history.
    pub(super) fn open_document(&mut self, route: Route) {
        self.router.push(route.clone());
        self.load_route(route);
    }

    /// Load `route` without touching the history.
    fn load_route(&mut self, route: Route) {
        let location = resolve_content_path(&route.path, &self.content_root);
        debug!(path = %route.path, %location, "document requested");
        self.doc_state = DocState::Loading {
            path: route.path.clone(),
        };
        self.effects.push(Effect::Fetch(FetchRequest::Document {
            path: route.path.clone(),
            anchor: route.anchor.clone(),
            location,
        }));
        self.effects.push(Effect::RememberPath(route.path.clone()));
        self.reveal_file(&route.path);
        self.wanted = Some(route);
    }

    /// Show `route`, which the history already points at.
    ///
    /// A route into the document already on screen only moves to its anchor.
    /// A route into the document still on its way only replaces the wanted
    /// route, so its anchor applies once the pending fetch lands.
    pub(super) fn show_route(&mut self, route: Route) {
        match &self.doc_state {
            DocState::Loaded { path } if *path == route.path => {}
            DocState::Loading { path } if *path == route.path => {
                debug!(path = %route.path, "route into pending document");
                self.wanted = Some(route);
                return;
            }
            _ => {
                self.load_route(route);
                return;
            }
        }
        match route.anchor.as_deref() {
            Some(anchor) => {
                if let Some(id) = self.outline_id_for_anchor(anchor) {
                    self.pin_heading(&id);
                }
            }
            None => self.viewport.go_to_top(),
        }
        self.wanted = Some(route);
    }

    /// Follow a link from the document.
    pub(super) fn follow_link(&mut self, url: &str) {
        if let Some(target) = url.strip_prefix('#') {
            match self.outline_id_for_anchor(target) {
                Some(id) => {
                    self.pin_heading(&id);
                }
                None => self.show_toast(ToastLevel::Warning, format!("No heading #{target}")),
            }
            return;
        }
        if url.contains("://") || url.starts_with("mailto:") {
            self.show_toast(ToastLevel::Info, format!("External link: {url}"));
            return;
        }
        let Some(current) = self.current_path() else {
            return;
        };
        match Route::resolve_link(current, url) {
            Some(route) if Some(route.path.as_str()) == self.current_path() => {
                self.router.push(route.clone());
                self.show_route(route);
            }
            Some(route) => self.open_document(route),
            None => self.show_toast(ToastLevel::Warning, format!("Cannot open link: {url}")),
        }
    }

    /// Act on a sidebar entry: open a file, fold a directory, pin a heading.
    pub(super) fn activate(&mut self, view: SidebarView, id: &str) {
        let pane = match view {
            SidebarView::Files => &self.files,
            SidebarView::Outline => &self.outline,
        };
        let Some(node) = pane.tree.node(id) else {
            debug!(id, ?view, "activate ignored: unknown node");
            return;
        };
        match node.kind().clone() {
            NodeKind::Directory => {
                self.files.tree.toggle(id);
                self.files.select(id);
            }
            NodeKind::File { path } => {
                self.files.select(id);
                self.open_document(Route::new(path, None));
            }
            NodeKind::Heading { .. } => {
                self.pin_heading(id);
            }
        }
    }

    /// Flip the fold state of `id` in the pane for `view`.
    pub(super) fn toggle_fold(&mut self, view: SidebarView, id: &str) {
        let pane = self.pane_mut(view);
        if pane.tree.toggle(id) {
            pane.select(id);
        }
    }

    /// Expand or collapse everything in the shown pane, following its label.
    pub(super) fn toggle_all(&mut self) {
        let pane = self.pane_mut(self.sidebar_view);
        match pane.tree.all_expanded() {
            Some(true) => pane.tree.collapse_all(),
            Some(false) => pane.tree.expand_all(),
            None => {}
        }
    }

    /// Narrow the file tree to `query` and keep it as the prompt text.
    pub(super) fn filter_files(&mut self, query: String) {
        self.files.apply_filter(&query);
        self.filter_prompt = Some(query);
    }

    /// Close the filter prompt and show the whole file tree again, with the
    /// current document still revealed.
    pub(super) fn clear_file_filter(&mut self) {
        self.filter_prompt = None;
        self.files.clear_filter();
        if let Some(path) = self.current_path().map(str::to_string) {
            self.reveal_file(&path);
        }
    }

    pub(super) fn show_sidebar_view(&mut self, view: SidebarView) {
        if view == SidebarView::Files && self.sidebar_view == SidebarView::Outline {
            self.spy.unlock();
        }
        self.sidebar_view = view;
        self.sidebar_visible = true;
    }

    /// Pin heading `id`: reveal it, highlight it, scroll to it and record
    /// the anchor in the route.
    pub(super) fn pin_heading(&mut self, id: &str) -> bool {
        let Some(line) = self.outline.tree.node(id).and_then(|node| node.heading_line()) else {
            debug!(id, "pin ignored: unknown heading");
            return false;
        };
        self.outline.tree.reveal(id);
        self.spy.pin(id);
        self.viewport.go_to_line(line);
        self.outline.sync(Some(id));
        self.outline.select(id);
        if let Some(current) = self.router.current() {
            let route = Route::new(current.path.clone(), Some(id.to_string()));
            self.router.replace(route.clone());
            self.wanted = Some(route);
        }
        true
    }

    /// Outline node for an anchor: an exact id, else the heading the
    /// document resolves it to.
    pub(super) fn outline_id_for_anchor(&self, anchor: &str) -> Option<String> {
        let anchor = anchor.trim_start_matches('#');
        if self.outline.tree.contains(anchor) {
            return Some(anchor.to_string());
        }
        let line = self.document.resolve_internal_anchor(anchor)?;
        self.outline
            .tree
            .nodes()
            .iter()
            .find(|node| node.heading_line() == Some(line))
            .map(|node| node.id().to_string())
    }

    /// File tree node for a document path, comparing fetch locations.
    fn file_node_id(&self, path: &str) -> Option<String> {
        let wanted = resolve_content_path(path, &self.content_root);
        self.files
            .tree
            .nodes()
            .iter()
            .find(|node| {
                node.file_path()
                    .is_some_and(|p| resolve_content_path(p, &self.content_root) == wanted)
            })
            .map(|node| node.id().to_string())
    }

    fn reveal_file(&mut self, path: &str) {
        if let Some(id) = self.file_node_id(path) {
            self.files.tree.reveal(&id);
            self.files.sync(Some(&id));
            self.files.select(&id);
        }
    }

    // Fetch results

    /// Apply a completed fetch.
    ///
    /// A document result counts only if its path is still the wanted one;
    /// anything else was superseded by a later navigation and is dropped.
    pub(super) fn apply_fetch(&mut self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Index(Ok((location, entries))) => self.install_index(location, &entries),
            FetchOutcome::Index(Err(err)) => {
                warn!(%err, "directory index unavailable");
                let reason = err.to_string();
                self.files
                    .show_placeholder(Placeholder::DirectoryUnavailable(reason.clone()));
                self.index_state = IndexState::Unavailable(reason);
            }
            FetchOutcome::Document { path, result, .. } => {
                if self.current_path() != Some(path.as_str()) {
                    debug!(%path, wanted = ?self.current_path(), "discarding stale document");
                    return;
                }
                match result {
                    Ok(text) => self.install_document(&path, &text),
                    Err(err) => self.fail_document(&path, &err),
                }
            }
        }
    }

    fn install_index(&mut self, location: String, entries: &[IndexEntry]) {
        let files = count_files(entries);
        info!(%location, files, "directory index ready");
        self.files
            .install(build_file_tree(entries), Placeholder::NoDocuments);
        self.index_state = IndexState::Ready { location, files };

        if let Some(path) = self.current_path().map(str::to_string) {
            self.reveal_file(&path);
            return;
        }
        let first = self
            .files
            .tree
            .first_file()
            .and_then(|node| node.file_path())
            .map(str::to_string);
        if let Some(path) = first {
            debug!(%path, "opening first document");
            self.open_document(Route::new(path, None));
        }
    }

    fn install_document(&mut self, path: &str, text: &str) {
        let document = Document::parse_with_layout(text, self.layout_width());
        info!(
            %path,
            lines = document.line_count(),
            headings = document.headings().len(),
            "document loaded"
        );
        self.document = document;
        self.viewport.set_total_lines(self.document.line_count());
        self.viewport.go_to_top();
        self.doc_state = DocState::Loaded {
            path: path.to_string(),
        };
        self.link_picker_items.clear();
        if let Some(search) = self.search.as_mut() {
            search.refresh(&self.document);
        }

        self.spy.reset();
        self.rebuild_outline();
        self.reveal_file(path);

        let anchor = self.wanted.as_ref().and_then(|route| route.anchor.clone());
        if let Some(anchor) = anchor {
            match self.outline_id_for_anchor(&anchor) {
                Some(id) => {
                    self.pin_heading(&id);
                }
                None => {
                    debug!(%anchor, "deep link anchor not found");
                    self.show_toast(ToastLevel::Warning, format!("No heading #{anchor}"));
                }
            }
        }
    }

    fn fail_document(&mut self, path: &str, err: &FetchError) {
        warn!(%path, %err, "document failed to load");
        self.document = Document::empty();
        self.viewport.set_total_lines(0);
        self.doc_state = DocState::Failed {
            path: path.to_string(),
            error: err.to_string(),
        };
        self.link_picker_items.clear();
        self.spy.reset();
        self.outline
            .show_placeholder(Placeholder::DocumentFailed(path.to_string()));
        self.show_toast(ToastLevel::Error, format!("Failed to load {path}"));
    }

    /// Build a fresh outline for the current document and remount the spy.
    fn rebuild_outline(&mut self) {
        let mut tree = build_outline(self.document.headings());
        tree.expand_to_depth(self.outline_levels);
        let targets = spy_targets(&tree);
        self.outline.install(tree, Placeholder::NoHeadings);
        if self.spy.mount(targets).is_none() {
            debug!("document has no headings; scroll spy not mounted");
        }
    }

    /// Lay the document out again at the current width.
    ///
    /// The outline is rebuilt for the new line numbers with its fold state,
    /// selection and pin carried over.
    pub(super) fn reflow(&mut self) {
        if !matches!(self.doc_state, DocState::Loaded { .. }) {
            return;
        }
        let old_total = self.document.line_count().max(1);
        let old_offset = self.viewport.offset();
        let document = Document::parse_with_layout(self.document.source(), self.layout_width());
        self.document = document;
        self.viewport.set_total_lines(self.document.line_count());
        self.viewport
            .go_to_line(old_offset * self.document.line_count() / old_total);

        let expanded: Vec<String> = self
            .outline
            .tree
            .nodes()
            .iter()
            .filter(|node| node.is_expanded())
            .map(|node| node.id().to_string())
            .collect();
        let selected = self.outline.selected.clone();
        let mut tree = build_outline(self.document.headings());
        for id in &expanded {
            tree.expand(id);
        }
        let targets = spy_targets(&tree);
        self.outline.install(tree, Placeholder::NoHeadings);
        self.outline.selected = selected;
        self.spy.mount(targets);
        if let Some(search) = self.search.as_mut() {
            search.refresh(&self.document);
        }
    }

    /// Feed the viewport to the scroll spy, then project both trees.
    pub(super) fn refresh_sidebar(&mut self) {
        let report = self
            .spy
            .observer()
            .map(|observer| observer.observe(self.viewport.visible_range()));
        if let Some(report) = report
            && self.spy.on_intersections(&report)
            && !self.sidebar_focused
            && let Some(active) = self.spy.active().map(str::to_string)
        {
            self.outline.selected = Some(active);
        }

        let active_heading = self.spy.active().map(str::to_string);
        self.outline.sync(active_heading.as_deref());
        if let Some(id) = active_heading.as_deref()
            && !self.sidebar_focused
            && let Some(pos) = self.outline.mount.visible_position(id)
        {
            self.outline.scroll.reveal_line(pos);
        }

        let active_file = self
            .current_path()
            .map(str::to_string)
            .and_then(|path| self.file_node_id(&path));
        self.files.sync(active_file.as_deref());
    }

    /// Links on screen, for the quick-follow picker.
    pub fn visible_links(&self) -> Vec<LinkRef> {
        self.document
            .links_in(self.viewport.visible_range())
            .cloned()
            .collect()
    }
}
