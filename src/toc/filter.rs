//! Title and path filter for the file tree.
//!
//! Matching files stay, together with the directories above them; every
//! other row is marked filtered by [`super::sync`].

use std::collections::HashSet;

use super::node::Tree;

impl Tree {
    /// Ids of the file leaves whose label or path contains `query`,
    /// ignoring case, in display order.
    ///
    /// A blank query matches nothing.
    pub fn filter_hits(&self, query: &str) -> Vec<String> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.preorder()
            .into_iter()
            .map(|idx| self.node_at(idx))
            .filter(|node| {
                node.file_path().is_some_and(|path| {
                    node.label().to_lowercase().contains(&needle)
                        || path.to_lowercase().contains(&needle)
                })
            })
            .map(|node| node.id().to_string())
            .collect()
    }

    /// Ids a filter keeps: every hit plus each of its ancestors.
    pub fn filter_keep(&self, hits: &[String]) -> HashSet<String> {
        let mut keep = HashSet::with_capacity(hits.len());
        for hit in hits {
            keep.extend(self.ancestors(hit).into_iter().map(str::to_string));
            keep.insert(hit.clone());
        }
        keep
    }

    /// Ids of the expanded nodes, for restoring the fold state later.
    pub fn expanded_ids(&self) -> Vec<String> {
        self.nodes()
            .iter()
            .filter(|node| node.is_expanded())
            .map(|node| node.id().to_string())
            .collect()
    }

    /// Collapse everything, then expand exactly `ids`.
    pub fn restore_expanded(&mut self, ids: &[String]) {
        self.collapse_all();
        for id in ids {
            self.expand(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::index::IndexEntry;
    use crate::toc::build_file_tree;

    use super::*;

    fn file(path: &str, title: Option<&str>) -> IndexEntry {
        IndexEntry::File {
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            title: title.map(str::to_string),
            path: path.to_string(),
        }
    }

    fn dir(name: &str, children: Vec<IndexEntry>) -> IndexEntry {
        IndexEntry::Directory {
            name: name.to_string(),
            children,
        }
    }

    fn site() -> Tree {
        build_file_tree(&[
            dir(
                "guide",
                vec![
                    file("guide/install.md", Some("Installing")),
                    dir("advanced", vec![file("guide/advanced/tuning.md", Some("Tuning"))]),
                ],
            ),
            file("faq.md", Some("FAQ")),
        ])
    }

    fn id_of(tree: &Tree, path: &str) -> String {
        tree.find_file(path).unwrap().id().to_string()
    }

    #[test]
    fn test_hits_match_title_or_path_ignoring_case() {
        let tree = site();
        assert_eq!(tree.filter_hits("TUN"), vec![id_of(&tree, "guide/advanced/tuning.md")]);
        assert_eq!(tree.filter_hits("advanced/"), vec![id_of(&tree, "guide/advanced/tuning.md")]);
        assert_eq!(tree.filter_hits("faq"), vec![id_of(&tree, "faq.md")]);
        assert!(tree.filter_hits("   ").is_empty());
        assert!(tree.filter_hits("nothing").is_empty());
    }

    #[test]
    fn test_directories_are_never_hits() {
        let tree = site();
        let hits = tree.filter_hits("guide");
        assert_eq!(
            hits,
            vec![
                id_of(&tree, "guide/install.md"),
                id_of(&tree, "guide/advanced/tuning.md"),
            ]
        );
    }

    #[test]
    fn test_keep_includes_every_ancestor_of_a_nested_hit() {
        let tree = site();
        let tuning = id_of(&tree, "guide/advanced/tuning.md");
        let keep = tree.filter_keep(std::slice::from_ref(&tuning));
        let ancestors: Vec<String> = tree
            .ancestors(&tuning)
            .into_iter()
            .map(str::to_string)
            .collect();
        assert_eq!(ancestors.len(), 2);
        assert_eq!(keep.len(), 3);
        assert!(keep.contains(&tuning));
        assert!(ancestors.iter().all(|id| keep.contains(id)));
        assert!(!keep.contains(&id_of(&tree, "faq.md")));
    }

    #[test]
    fn test_restore_expanded_round_trips_fold_state() {
        let mut tree = site();
        let tuning = id_of(&tree, "guide/advanced/tuning.md");
        let saved = tree.expanded_ids();
        assert!(saved.is_empty());

        tree.reveal(&tuning);
        assert!(tree.is_visible(&tuning));
        tree.restore_expanded(&saved);
        assert!(!tree.is_visible(&tuning));
        assert_eq!(tree.expanded_ids(), saved);
    }
}
