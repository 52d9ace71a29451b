use tracing::debug;

use crate::toc::{Mount, MountPoint, Node, Placeholder, Tree, sync};
use crate::ui::viewport::Viewport;

/// Which tree the sidebar shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SidebarView {
    #[default]
    Files,
    Outline,
}

/// One sidebar pane: a tree, its rows, the keyboard selection and the
/// scroll position over the visible rows.
#[derive(Debug, Clone)]
pub struct Pane {
    pub tree: Tree,
    pub mount: Mount,
    /// Node id under the keyboard cursor
    pub selected: Option<String>,
    pub scroll: Viewport,
    /// Query narrowing the rows, while a filter applies
    pub filter: Option<String>,
    /// Fold state from before the filter opened directories
    saved_folds: Option<Vec<String>>,
}

impl Pane {
    pub fn new(point: MountPoint, placeholder: Placeholder) -> Self {
        Self {
            tree: Tree::new(point),
            mount: Mount::placeholder(point, placeholder),
            selected: None,
            scroll: Viewport::default(),
            filter: None,
            saved_folds: None,
        }
    }

    /// Replace the tree, discarding the old rows and selection.
    pub fn install(&mut self, mut tree: Tree, empty: Placeholder) {
        if !tree.bind_listeners() {
            debug!(mount = ?tree.mount(), "listeners already bound");
        }
        self.mount = Mount::for_tree(&tree, empty);
        self.tree = tree;
        self.selected = None;
        self.filter = None;
        self.saved_folds = None;
        self.scroll.go_to_top();
    }

    /// Show `placeholder` instead of any rows.
    pub fn show_placeholder(&mut self, placeholder: Placeholder) {
        let point = self.tree.mount();
        self.tree = Tree::new(point);
        self.mount = Mount::placeholder(point, placeholder);
        self.selected = None;
        self.filter = None;
        self.saved_folds = None;
        self.scroll.go_to_top();
    }

    /// Narrow the rows to files whose title or path contains `query`,
    /// opening the directories above each hit. A blank query clears the
    /// filter. Returns the number of hits.
    pub fn apply_filter(&mut self, query: &str) -> usize {
        let query = query.trim();
        if query.is_empty() {
            self.clear_filter();
            return 0;
        }
        // Each query starts from the folds as they were before filtering.
        let saved = self
            .saved_folds
            .get_or_insert_with(|| self.tree.expanded_ids());
        self.tree.restore_expanded(saved);
        let hits = self.tree.filter_hits(query);
        for hit in &hits {
            self.tree.reveal(hit);
        }
        debug!(query, hits = hits.len(), "file filter applied");
        self.mount.set_filter(Some(self.tree.filter_keep(&hits)));
        self.filter = Some(query.to_string());
        self.scroll.go_to_top();
        hits.len()
    }

    /// Drop the filter and put the fold state back as it was.
    pub fn clear_filter(&mut self) {
        if let Some(saved) = self.saved_folds.take() {
            self.tree.restore_expanded(&saved);
        }
        self.mount.set_filter(None);
        self.filter = None;
    }

    /// Project the tree onto the rows, highlighting `active`.
    pub fn sync(&mut self, active: Option<&str>) {
        sync(&self.tree, &mut self.mount, active);
        let visible = self.visible_ids();
        self.scroll.set_total_lines(visible.len());
        if let Some(selected) = self.selected.clone()
            && !visible.contains(&selected)
        {
            // The selection was folded away: fall back to its nearest shown ancestor.
            self.selected = self
                .tree
                .ancestors(&selected)
                .into_iter()
                .find(|id| visible.iter().any(|v| v == id))
                .map(str::to_string);
        }
    }

    pub fn visible_ids(&self) -> Vec<String> {
        self.mount
            .visible_rows()
            .iter()
            .map(|row| row.node_id().to_string())
            .collect()
    }

    pub fn selected_node(&self) -> Option<&Node> {
        self.selected.as_deref().and_then(|id| self.tree.node(id))
    }

    /// Select `id` and scroll it into view.
    pub fn select(&mut self, id: &str) {
        if !self.tree.contains(id) {
            debug!(id, "select ignored: unknown node");
            return;
        }
        self.selected = Some(id.to_string());
        if let Some(pos) = self.mount.visible_position(id) {
            self.scroll.reveal_line(pos);
        }
    }

    /// Move the selection by `delta` visible rows, clamped at both ends.
    pub fn move_selection(&mut self, delta: isize) {
        let visible = self.visible_ids();
        if visible.is_empty() {
            return;
        }
        let current = self
            .selected
            .as_ref()
            .and_then(|id| visible.iter().position(|v| v == id));
        let next = match current {
            None => 0,
            Some(pos) => pos.saturating_add_signed(delta).min(visible.len() - 1),
        };
        self.selected = Some(visible[next].clone());
        self.scroll.reveal_line(next);
    }

    /// Number of rows the pane can show at once.
    pub fn resize(&mut self, width: u16, rows: u16) {
        self.scroll.resize(width, rows);
        if let Some(pos) = self
            .selected
            .as_deref()
            .and_then(|id| self.mount.visible_position(id))
        {
            self.scroll.reveal_line(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::HeadingRef;
    use crate::toc::build_outline;

    fn pane() -> Pane {
        let heading = |level: u8, text: &str, line: usize| HeadingRef {
            level,
            text: text.to_string(),
            line,
            id: None,
        };
        let mut pane = Pane::new(MountPoint::OutlinePane, Placeholder::NoDocument);
        pane.install(
            build_outline(&[
                heading(1, "A", 0),
                heading(2, "B", 2),
                heading(2, "C", 4),
                heading(1, "D", 6),
            ]),
            Placeholder::NoHeadings,
        );
        pane.resize(20, 10);
        pane.sync(None);
        pane
    }

    #[test]
    fn test_install_binds_listeners_once() {
        let pane = pane();
        assert!(pane.tree.listeners_bound());
        assert_eq!(pane.visible_ids(), vec!["a", "d"]);
    }

    #[test]
    fn test_move_selection_walks_visible_rows() {
        let mut pane = pane();
        pane.move_selection(1);
        assert_eq!(pane.selected.as_deref(), Some("a"));
        pane.move_selection(1);
        assert_eq!(pane.selected.as_deref(), Some("d"));
        pane.move_selection(5);
        assert_eq!(pane.selected.as_deref(), Some("d"));
        pane.move_selection(-9);
        assert_eq!(pane.selected.as_deref(), Some("a"));
    }

    #[test]
    fn test_folding_away_selection_falls_back_to_ancestor() {
        let mut pane = pane();
        pane.tree.expand("a");
        pane.sync(None);
        pane.select("c");
        pane.tree.collapse("a");
        pane.sync(None);
        assert_eq!(pane.selected.as_deref(), Some("a"));
    }

    #[test]
    fn test_placeholder_clears_rows() {
        let mut pane = pane();
        pane.show_placeholder(Placeholder::DocumentFailed("x.md".to_string()));
        pane.sync(None);
        assert!(pane.visible_ids().is_empty());
        assert!(pane.selected.is_none());
        assert_eq!(
            pane.mount.placeholder_content(),
            Some(&Placeholder::DocumentFailed("x.md".to_string()))
        );
    }
}
