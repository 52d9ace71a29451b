//! Node model shared by the file tree and the page outline.

use std::collections::HashMap;

/// The sidebar pane a tree renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MountPoint {
    /// Documents and directories from the site index
    FilePane,
    /// Headings of the open document
    OutlinePane,
}

/// What a node stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A directory from the site index
    Directory,
    /// A document leaf; `path` is the index path used to fetch it
    File { path: String },
    /// A heading in the rendered document, located at `line`
    Heading { line: usize },
}

/// One entry in a hierarchical tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    id: String,
    parent_id: Option<String>,
    parent: Option<usize>,
    level: u8,
    depth: usize,
    has_children: bool,
    expanded: bool,
    children: Vec<String>,
    label: String,
    kind: NodeKind,
}

impl Node {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    /// Heading level (1-6) for outline nodes, 0 for file tree nodes.
    pub const fn level(&self) -> u8 {
        self.level
    }

    /// Logical nesting depth: 0 for roots, +1 per generation.
    pub const fn depth(&self) -> usize {
        self.depth
    }

    pub const fn has_children(&self) -> bool {
        self.has_children
    }

    /// Whether the node is expanded. Always false for leaves.
    pub const fn is_expanded(&self) -> bool {
        self.has_children && self.expanded
    }

    pub fn children(&self) -> &[String] {
        &self.children
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub const fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// The document path for file leaves.
    pub fn file_path(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::File { path } => Some(path),
            _ => None,
        }
    }

    /// The rendered line for heading nodes.
    pub const fn heading_line(&self) -> Option<usize> {
        match self.kind {
            NodeKind::Heading { line } => Some(line),
            _ => None,
        }
    }

    pub(super) const fn parent_index(&self) -> Option<usize> {
        self.parent
    }

    pub(super) const fn set_expanded(&mut self, expanded: bool) -> bool {
        let target = self.has_children && expanded;
        let changed = self.expanded != target;
        self.expanded = target;
        changed
    }
}

/// A complete hierarchy instance (file tree or page outline).
///
/// Nodes are stored in insertion order and looked up through `by_id`.
/// Parents are always inserted before their children, so a single forward
/// pass over `nodes` sees every parent before any descendant.
#[derive(Debug, Clone)]
pub struct Tree {
    mount: MountPoint,
    nodes: Vec<Node>,
    by_id: HashMap<String, usize>,
    root_ids: Vec<String>,
    listeners_bound: bool,
}

impl Tree {
    /// Create an empty tree that renders into `mount`.
    pub fn new(mount: MountPoint) -> Self {
        Self {
            mount,
            nodes: Vec::new(),
            by_id: HashMap::new(),
            root_ids: Vec::new(),
            listeners_bound: false,
        }
    }

    pub const fn mount(&self) -> MountPoint {
        self.mount
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn root_ids(&self) -> &[String] {
        &self.root_ids
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.by_id.get(id).map(|&idx| &self.nodes[idx])
    }

    pub(super) fn index_of(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub(super) fn node_at(&self, idx: usize) -> &Node {
        &self.nodes[idx]
    }

    pub(super) fn node_at_mut(&mut self, idx: usize) -> &mut Node {
        &mut self.nodes[idx]
    }

    /// Append a node under `parent_id` (or as a root).
    ///
    /// Returns false without modifying the tree when `id` is already taken or
    /// the parent does not exist.
    pub fn push(
        &mut self,
        id: impl Into<String>,
        parent_id: Option<&str>,
        level: u8,
        label: impl Into<String>,
        kind: NodeKind,
    ) -> bool {
        let id = id.into();
        if self.by_id.contains_key(&id) {
            return false;
        }
        let parent = match parent_id {
            Some(pid) => match self.by_id.get(pid) {
                Some(&idx) => Some(idx),
                None => return false,
            },
            None => None,
        };
        let depth = parent.map_or(0, |idx| self.nodes[idx].depth + 1);
        let idx = self.nodes.len();
        if let Some(pidx) = parent {
            let parent_node = &mut self.nodes[pidx];
            parent_node.children.push(id.clone());
            parent_node.has_children = true;
        } else {
            self.root_ids.push(id.clone());
        }
        self.by_id.insert(id.clone(), idx);
        self.nodes.push(Node {
            id,
            parent_id: parent_id.map(str::to_string),
            parent,
            level,
            depth,
            has_children: false,
            expanded: false,
            children: Vec::new(),
            label: label.into(),
            kind,
        });
        true
    }

    /// Ancestor ids of `id`, nearest first. Empty for roots and unknown ids.
    pub fn ancestors(&self, id: &str) -> Vec<&str> {
        let mut out = Vec::new();
        let mut cursor = self.index_of(id).and_then(|idx| self.nodes[idx].parent);
        while let Some(idx) = cursor {
            out.push(self.nodes[idx].id.as_str());
            cursor = self.nodes[idx].parent;
        }
        out
    }

    /// Indices of every descendant of the node at `idx`, via an explicit stack.
    pub(super) fn descendant_indices(&self, idx: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.child_indices(idx).collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.child_indices(next));
        }
        out
    }

    pub(super) fn child_indices(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.nodes[idx]
            .children
            .iter()
            .filter_map(|child| self.by_id.get(child).copied())
    }

    /// Node indices in display (pre-)order: each node followed by its subtree.
    pub(super) fn preorder(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<usize> = self
            .root_ids
            .iter()
            .rev()
            .filter_map(|id| self.by_id.get(id).copied())
            .collect();
        while let Some(idx) = stack.pop() {
            out.push(idx);
            let children: Vec<usize> = self.child_indices(idx).collect();
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Mark this tree's input handlers as wired.
    ///
    /// Returns true only on the first call for this tree instance; callers
    /// register handlers only when it does.
    pub const fn bind_listeners(&mut self) -> bool {
        if self.listeners_bound {
            return false;
        }
        self.listeners_bound = true;
        true
    }

    pub const fn listeners_bound(&self) -> bool {
        self.listeners_bound
    }

    /// First file leaf in document order.
    pub fn first_file(&self) -> Option<&Node> {
        self.preorder()
            .into_iter()
            .map(|idx| &self.nodes[idx])
            .find(|node| node.file_path().is_some())
    }

    /// The file leaf whose index path equals `path`.
    pub fn find_file(&self, path: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.file_path() == Some(path))
    }

    /// Check the structural invariants: parents resolve, `children` mirrors
    /// `parent_id`, and depth grows by exactly one per edge.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violated invariant.
    pub fn validate(&self) -> Result<(), String> {
        for (idx, node) in self.nodes.iter().enumerate() {
            match node.parent {
                Some(pidx) => {
                    let parent = self
                        .nodes
                        .get(pidx)
                        .ok_or_else(|| format!("{}: dangling parent", node.id))?;
                    if node.parent_id.as_deref() != Some(parent.id.as_str()) {
                        return Err(format!("{}: parent id mismatch", node.id));
                    }
                    if parent.children.iter().filter(|c| **c == node.id).count() != 1 {
                        return Err(format!("{}: not listed exactly once by parent", node.id));
                    }
                    if node.depth != parent.depth + 1 {
                        return Err(format!("{}: depth {} under {}", node.id, node.depth, parent.depth));
                    }
                }
                None => {
                    if node.depth != 0 || !self.root_ids.contains(&node.id) {
                        return Err(format!("{}: malformed root", node.id));
                    }
                }
            }
            for child in &node.children {
                let cidx = self
                    .by_id
                    .get(child)
                    .ok_or_else(|| format!("{}: unknown child {child}", node.id))?;
                if self.nodes[*cidx].parent != Some(idx) {
                    return Err(format!("{child}: orphaned from {}", node.id));
                }
            }
            if node.has_children == node.children.is_empty() {
                return Err(format!("{}: has_children disagrees with children", node.id));
            }
        }
        Ok(())
    }
}
