//! Expand/collapse engine.
//!
//! Pure mutations of the `expanded` flags on a [`Tree`]. Nothing here knows
//! how rows are drawn; the synchronizer projects the result afterwards.

use tracing::debug;

use super::node::Tree;

impl Tree {
    /// Flip a node's expanded state.
    ///
    /// Collapsing clears `expanded` on the whole subtree; expanding leaves the
    /// descendants' own flags alone, so only direct children become visible.
    /// Leaves and unknown ids are a no-op. Returns whether anything changed.
    pub fn toggle(&mut self, id: &str) -> bool {
        let Some(idx) = self.index_of(id) else {
            debug!(id, "toggle ignored: unknown node");
            return false;
        };
        if !self.node_at(idx).has_children() {
            return false;
        }
        let now_expanded = !self.node_at(idx).is_expanded();
        self.node_at_mut(idx).set_expanded(now_expanded);
        if !now_expanded {
            for child in self.descendant_indices(idx) {
                self.node_at_mut(child).set_expanded(false);
            }
        }
        true
    }

    /// Expand one node without touching anything else.
    pub fn expand(&mut self, id: &str) -> bool {
        match self.index_of(id) {
            Some(idx) if !self.node_at(idx).is_expanded() => self.toggle(id),
            _ => false,
        }
    }

    /// Collapse one node (and therefore its subtree).
    pub fn collapse(&mut self, id: &str) -> bool {
        match self.index_of(id) {
            Some(idx) if self.node_at(idx).is_expanded() => self.toggle(id),
            _ => false,
        }
    }

    /// Set every foldable node to `expanded` in one pass.
    pub fn set_all_expanded(&mut self, expanded: bool) {
        for idx in 0..self.len() {
            self.node_at_mut(idx).set_expanded(expanded);
        }
    }

    pub fn expand_all(&mut self) {
        self.set_all_expanded(true);
    }

    pub fn collapse_all(&mut self) {
        self.set_all_expanded(false);
    }

    /// Whether every foldable node is expanded. `None` when nothing can fold.
    pub fn all_expanded(&self) -> Option<bool> {
        let mut foldable = self.nodes().iter().filter(|n| n.has_children()).peekable();
        foldable.peek()?;
        Some(foldable.all(super::node::Node::is_expanded))
    }

    /// A node is visible iff it is a root, or its parent is visible and expanded.
    ///
    /// Unknown ids are reported as not visible.
    pub fn is_visible(&self, id: &str) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        let mut cursor = self.node_at(idx).parent_index();
        while let Some(parent) = cursor {
            let node = self.node_at(parent);
            if !node.is_expanded() {
                return false;
            }
            cursor = node.parent_index();
        }
        true
    }

    /// Visibility of every node, indexed like [`Tree::nodes`].
    ///
    /// Computed in one forward pass, relying on parents preceding children.
    pub fn visibility(&self) -> Vec<bool> {
        let mut visible = vec![false; self.len()];
        for (idx, node) in self.nodes().iter().enumerate() {
            visible[idx] = match node.parent_index() {
                None => true,
                Some(parent) => visible[parent] && self.node_at(parent).is_expanded(),
            };
        }
        visible
    }

    /// Ids of the visible nodes in display order.
    pub fn visible_ids(&self) -> Vec<&str> {
        let visible = self.visibility();
        self.preorder()
            .into_iter()
            .filter(|&idx| visible[idx])
            .map(|idx| self.node_at(idx).id())
            .collect()
    }

    /// Expand every ancestor of `id` so it becomes visible.
    ///
    /// Siblings keep their state and the node itself is not expanded.
    /// Returns whether anything changed.
    pub fn reveal(&mut self, id: &str) -> bool {
        let Some(idx) = self.index_of(id) else {
            debug!(id, "reveal ignored: unknown node");
            return false;
        };
        let mut changed = false;
        let mut cursor = self.node_at(idx).parent_index();
        while let Some(parent) = cursor {
            changed |= self.node_at_mut(parent).set_expanded(true);
            cursor = self.node_at(parent).parent_index();
        }
        changed
    }

    /// Initial fold policy: expand foldable nodes shallower than `levels`.
    ///
    /// `levels == 0` leaves everything collapsed so only roots show.
    pub fn expand_to_depth(&mut self, levels: usize) {
        for idx in 0..self.len() {
            let expand = self.node_at(idx).depth() < levels;
            self.node_at_mut(idx).set_expanded(expand);
        }
    }
}
