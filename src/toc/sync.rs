//! Projection of tree state onto sidebar rows.
//!
//! A [`Mount`] is the render target for one pane: one [`RowElement`] per
//! node, laid out in display order. [`sync`] writes every attribute from the
//! model and never reads row state back, so repeated passes without a model
//! change leave the mount byte-for-byte identical.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::node::{MountPoint, Tree};

/// Columns of indentation per depth step.
pub const INDENT_STEP: u16 = 2;

/// Fold indicator drawn in front of each row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldIcon {
    /// Pointing right
    Collapsed,
    /// Pointing down
    Expanded,
    /// Empty slot of the same width, for rows that cannot fold
    Blank,
}

impl FoldIcon {
    pub const fn glyph(self) -> &'static str {
        match self {
            Self::Collapsed => "▸ ",
            Self::Expanded => "▾ ",
            Self::Blank => "  ",
        }
    }

    /// Width of the icon slot in columns.
    pub const SLOT_WIDTH: u16 = 2;
}

/// Label of the pane-wide expand/collapse control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAllLabel {
    ExpandAll,
    CollapseAll,
    /// Nothing in the tree can fold
    Unavailable,
}

impl ToggleAllLabel {
    pub const fn text(self) -> &'static str {
        match self {
            Self::ExpandAll => "expand all",
            Self::CollapseAll => "collapse all",
            Self::Unavailable => "",
        }
    }
}

/// Explanatory content shown instead of rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    /// Index or document still loading
    Loading,
    /// The index loaded but lists no documents
    NoDocuments,
    /// Every index location failed
    DirectoryUnavailable(String),
    /// The document has no headings
    NoHeadings,
    /// The document failed to load, so there is no outline
    DocumentFailed(String),
    /// No document is open yet
    NoDocument,
}

impl Placeholder {
    pub fn message(&self) -> String {
        match self {
            Self::Loading => "Loading…".to_string(),
            Self::NoDocuments => "The directory index lists no documents.".to_string(),
            Self::DirectoryUnavailable(reason) => format!("Directory unavailable: {reason}"),
            Self::NoHeadings => "This document has no headings.".to_string(),
            Self::DocumentFailed(path) => format!("No outline: {path} failed to load."),
            Self::NoDocument => "Open a document to see its outline.".to_string(),
        }
    }
}

/// Visual state of one node's row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowElement {
    node_id: String,
    label: String,
    /// Hidden unless every ancestor is expanded
    pub hidden: bool,
    pub icon: FoldIcon,
    /// Whether the fold icon reacts to clicks
    pub interactive: bool,
    /// Columns of indentation applied to the content, not the highlight
    pub indent: u16,
    /// Highlighted as the current entry
    pub active: bool,
    /// Left out by the file filter
    pub filtered: bool,
    /// For directories: visibility of the children container
    pub children_hidden: Option<bool>,
    /// One past the last row of this row's subtree
    subtree_end: usize,
}

impl RowElement {
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Render target for one tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    point: MountPoint,
    rows: Vec<RowElement>,
    index: HashMap<String, usize>,
    toggle_all: ToggleAllLabel,
    placeholder: Option<Placeholder>,
    /// Ids the file filter keeps; `None` when no filter applies
    filter: Option<HashSet<String>>,
}

impl Mount {
    /// A mount showing only `placeholder`.
    pub fn placeholder(point: MountPoint, placeholder: Placeholder) -> Self {
        Self {
            point,
            rows: Vec::new(),
            index: HashMap::new(),
            toggle_all: ToggleAllLabel::Unavailable,
            placeholder: Some(placeholder),
            filter: None,
        }
    }

    /// Create one row per node in display order.
    ///
    /// Rows start hidden; call [`sync`] to project the tree state.
    pub fn for_tree(tree: &Tree, empty: Placeholder) -> Self {
        if tree.is_empty() {
            return Self::placeholder(tree.mount(), empty);
        }
        let order = tree.preorder();
        let mut rows = Vec::with_capacity(order.len());
        let mut index = HashMap::with_capacity(order.len());
        for (pos, &idx) in order.iter().enumerate() {
            let node = tree.node_at(idx);
            index.insert(node.id().to_string(), pos);
            rows.push(RowElement {
                node_id: node.id().to_string(),
                label: node.label().to_string(),
                hidden: true,
                icon: FoldIcon::Blank,
                interactive: false,
                indent: 0,
                active: false,
                filtered: false,
                children_hidden: None,
                subtree_end: pos + 1,
            });
        }
        // Pre-order makes every subtree contiguous; its end is the first later
        // row whose depth is not deeper.
        let depths: Vec<usize> = order.iter().map(|&idx| tree.node_at(idx).depth()).collect();
        let mut open: Vec<usize> = Vec::new();
        for pos in 0..=rows.len() {
            let depth = depths.get(pos).copied();
            while let Some(&top) = open.last() {
                if depth.is_some_and(|d| d > depths[top]) {
                    break;
                }
                rows[top].subtree_end = pos;
                open.pop();
            }
            if depth.is_some() {
                open.push(pos);
            }
        }
        Self {
            point: tree.mount(),
            rows,
            index,
            toggle_all: ToggleAllLabel::Unavailable,
            placeholder: None,
            filter: None,
        }
    }

    pub const fn point(&self) -> MountPoint {
        self.point
    }

    pub fn rows(&self) -> &[RowElement] {
        &self.rows
    }

    pub fn row(&self, node_id: &str) -> Option<&RowElement> {
        self.index.get(node_id).map(|&pos| &self.rows[pos])
    }

    pub const fn toggle_all_label(&self) -> ToggleAllLabel {
        self.toggle_all
    }

    pub const fn placeholder_content(&self) -> Option<&Placeholder> {
        self.placeholder.as_ref()
    }

    /// Keep only the rows in `keep` on the next [`sync`]; `None` keeps all.
    pub fn set_filter(&mut self, keep: Option<HashSet<String>>) {
        self.filter = keep;
    }

    pub const fn is_filtered(&self) -> bool {
        self.filter.is_some()
    }

    /// Rows a reader can see, in display order.
    ///
    /// A directory whose children container is hidden is skipped over in one
    /// step instead of inspecting each descendant.
    pub fn visible_rows(&self) -> Vec<&RowElement> {
        let mut out = Vec::new();
        let mut pos = 0;
        while pos < self.rows.len() {
            let row = &self.rows[pos];
            if row.hidden || row.filtered {
                pos += 1;
                continue;
            }
            out.push(row);
            pos = if row.children_hidden == Some(true) {
                row.subtree_end
            } else {
                pos + 1
            };
        }
        out
    }

    /// Position of `node_id` among the visible rows.
    pub fn visible_position(&self, node_id: &str) -> Option<usize> {
        self.visible_rows()
            .iter()
            .position(|row| row.node_id == node_id)
    }
}

/// Write the tree's state into `mount`.
///
/// `active` names the single highlighted entry, if any.
pub fn sync(tree: &Tree, mount: &mut Mount, active: Option<&str>) {
    if mount.placeholder.is_some() {
        return;
    }
    let visibility = tree.visibility();
    for (idx, node) in tree.nodes().iter().enumerate() {
        let Some(&pos) = mount.index.get(node.id()) else {
            debug!(id = node.id(), "sync skipped: node has no row");
            continue;
        };
        let filtered = mount
            .filter
            .as_ref()
            .is_some_and(|keep| !keep.contains(node.id()));
        let row = &mut mount.rows[pos];
        row.hidden = !visibility[idx];
        row.filtered = filtered;
        row.icon = match (node.has_children(), node.is_expanded()) {
            (false, _) => FoldIcon::Blank,
            (true, false) => FoldIcon::Collapsed,
            (true, true) => FoldIcon::Expanded,
        };
        row.interactive = node.has_children();
        row.indent = u16::try_from(node.depth())
            .unwrap_or(u16::MAX)
            .saturating_mul(INDENT_STEP);
        row.active = active == Some(node.id());
        row.children_hidden = match (mount.point, node.kind()) {
            (MountPoint::FilePane, super::node::NodeKind::Directory) => {
                Some(!node.is_expanded())
            }
            _ => None,
        };
    }
    mount.toggle_all = match tree.all_expanded() {
        None => ToggleAllLabel::Unavailable,
        Some(true) => ToggleAllLabel::CollapseAll,
        Some(false) => ToggleAllLabel::ExpandAll,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::HeadingRef;
    use crate::index::IndexEntry;
    use crate::toc::{build_file_tree, build_outline};

    fn outline() -> Tree {
        let heading = |level: u8, text: &str, line: usize| HeadingRef {
            level,
            text: text.to_string(),
            line,
            id: None,
        };
        build_outline(&[
            heading(1, "A", 0),
            heading(2, "B", 2),
            heading(2, "C", 4),
            heading(1, "D", 6),
        ])
    }

    fn visible_labels(mount: &Mount) -> Vec<&str> {
        mount.visible_rows().iter().map(|row| row.label()).collect()
    }

    #[test]
    fn test_sync_projects_initial_state() {
        let tree = outline();
        let mut mount = Mount::for_tree(&tree, Placeholder::NoHeadings);
        sync(&tree, &mut mount, None);

        assert_eq!(visible_labels(&mount), vec!["A", "D"]);
        let a = mount.row("a").unwrap();
        assert_eq!(a.icon, FoldIcon::Collapsed);
        assert!(a.interactive);
        assert_eq!(a.indent, 0);
        let b = mount.row("b").unwrap();
        assert!(b.hidden);
        assert_eq!(b.icon, FoldIcon::Blank);
        assert!(!b.interactive);
        assert_eq!(b.indent, INDENT_STEP);
        assert_eq!(mount.toggle_all_label(), ToggleAllLabel::ExpandAll);
    }

    #[test]
    fn test_fold_click_scenario() {
        let mut tree = outline();
        let mut mount = Mount::for_tree(&tree, Placeholder::NoHeadings);

        tree.toggle("a");
        sync(&tree, &mut mount, None);
        assert_eq!(visible_labels(&mount), vec!["A", "B", "C", "D"]);
        assert_eq!(mount.row("a").unwrap().icon, FoldIcon::Expanded);
        assert_eq!(mount.toggle_all_label(), ToggleAllLabel::CollapseAll);

        tree.toggle("a");
        sync(&tree, &mut mount, None);
        assert_eq!(visible_labels(&mount), vec!["A", "D"]);
        assert!(!tree.node("b").unwrap().is_expanded());
        assert!(!tree.node("c").unwrap().is_expanded());
    }

    #[test]
    fn test_sync_is_idempotent() {
        let mut tree = outline();
        tree.toggle("a");
        let mut mount = Mount::for_tree(&tree, Placeholder::NoHeadings);
        sync(&tree, &mut mount, Some("c"));
        let first = mount.clone();
        sync(&tree, &mut mount, Some("c"));
        sync(&tree, &mut mount, Some("c"));
        assert_eq!(mount, first);
    }

    #[test]
    fn test_only_one_row_active() {
        let tree = outline();
        let mut mount = Mount::for_tree(&tree, Placeholder::NoHeadings);
        sync(&tree, &mut mount, Some("b"));
        sync(&tree, &mut mount, Some("d"));
        let active: Vec<&str> = mount
            .rows()
            .iter()
            .filter(|row| row.active)
            .map(RowElement::node_id)
            .collect();
        assert_eq!(active, vec!["d"]);
    }

    #[test]
    fn test_empty_tree_mounts_placeholder() {
        let tree = build_outline(&[]);
        let mut mount = Mount::for_tree(&tree, Placeholder::NoHeadings);
        sync(&tree, &mut mount, None);
        assert_eq!(mount.placeholder_content(), Some(&Placeholder::NoHeadings));
        assert!(mount.visible_rows().is_empty());
    }

    #[test]
    fn test_directory_children_container_follows_expanded() {
        let entries = vec![
            IndexEntry::Directory {
                name: "guide".to_string(),
                children: vec![
                    IndexEntry::Directory {
                        name: "deep".to_string(),
                        children: vec![IndexEntry::File {
                            name: "x.md".to_string(),
                            title: None,
                            path: "guide/deep/x.md".to_string(),
                        }],
                    },
                    IndexEntry::File {
                        name: "y.md".to_string(),
                        title: None,
                        path: "guide/y.md".to_string(),
                    },
                ],
            },
            IndexEntry::File {
                name: "z.md".to_string(),
                title: None,
                path: "z.md".to_string(),
            },
        ];
        let mut tree = build_file_tree(&entries);
        let mut mount = Mount::for_tree(&tree, Placeholder::NoDocuments);
        sync(&tree, &mut mount, None);
        assert_eq!(mount.row("entry-0").unwrap().children_hidden, Some(true));
        assert_eq!(mount.row("entry-4").unwrap().children_hidden, None);
        assert_eq!(visible_labels(&mount), vec!["guide", "z"]);

        tree.toggle("entry-0");
        sync(&tree, &mut mount, None);
        assert_eq!(visible_labels(&mount), vec!["guide", "deep", "y", "z"]);

        tree.toggle("entry-1");
        sync(&tree, &mut mount, Some("entry-2"));
        assert_eq!(visible_labels(&mount), vec!["guide", "deep", "x", "y", "z"]);
        assert_eq!(mount.visible_position("entry-2"), Some(2));
    }

    #[test]
    fn test_filter_hides_rows_outside_the_kept_set() {
        let entries = vec![
            IndexEntry::Directory {
                name: "guide".to_string(),
                children: vec![
                    IndexEntry::Directory {
                        name: "deep".to_string(),
                        children: vec![IndexEntry::File {
                            name: "x.md".to_string(),
                            title: None,
                            path: "guide/deep/x.md".to_string(),
                        }],
                    },
                    IndexEntry::File {
                        name: "y.md".to_string(),
                        title: None,
                        path: "guide/y.md".to_string(),
                    },
                ],
            },
            IndexEntry::File {
                name: "z.md".to_string(),
                title: None,
                path: "z.md".to_string(),
            },
        ];
        let mut tree = build_file_tree(&entries);
        let mut mount = Mount::for_tree(&tree, Placeholder::NoDocuments);
        let hits = tree.filter_hits("x.md");
        assert_eq!(hits, vec!["entry-2".to_string()]);
        tree.reveal("entry-2");
        mount.set_filter(Some(tree.filter_keep(&hits)));
        sync(&tree, &mut mount, None);
        assert!(mount.is_filtered());
        assert_eq!(visible_labels(&mount), vec!["guide", "deep", "x"]);
        assert!(mount.row("entry-3").unwrap().filtered);
        assert!(!mount.row("entry-3").unwrap().hidden);

        mount.set_filter(None);
        sync(&tree, &mut mount, None);
        assert_eq!(visible_labels(&mount), vec!["guide", "deep", "x", "y", "z"]);
    }
}
