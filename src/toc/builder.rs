//! Tree construction from the site index and from rendered headings.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::node::{MountPoint, NodeKind, Tree};
use crate::document::HeadingRef;
use crate::index::IndexEntry;

/// Ordinal prefixes such as `01.`, `2-`, `3_`, `4 `, `5)`, `6、`, `03）`.
static ORDINAL_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,6}[.\-_ )、）]\s*").expect("valid ordinal regex"));

/// Markdown extensions removed from file display names.
const MARKDOWN_EXTENSIONS: &[&str] = &[".md", ".markdown"];

/// Strip up to two leading ordinal prefixes from a directory or file name.
///
/// Falls back to the trimmed input if stripping would leave nothing.
pub fn strip_ordinal_prefix(name: &str) -> String {
    let mut rest = name.trim();
    for _ in 0..2 {
        match ORDINAL_PREFIX.find(rest) {
            Some(m) if m.end() < rest.len() => rest = rest[m.end()..].trim_start(),
            _ => break,
        }
    }
    rest.to_string()
}

/// Display name for a file: ordinal prefix and markdown extension removed.
pub fn file_display_name(file_name: &str) -> String {
    let stripped = strip_ordinal_prefix(file_name);
    for ext in MARKDOWN_EXTENSIONS {
        let cut = stripped.len().saturating_sub(ext.len());
        if cut > 0
            && stripped
                .get(cut..)
                .is_some_and(|tail| tail.eq_ignore_ascii_case(ext))
        {
            return stripped[..cut].to_string();
        }
    }
    stripped
}

/// Normalize heading text into an identifier.
///
/// Lowercases, turns every run of whitespace or punctuation into a single
/// `-`, and trims separators at both ends. Letters and digits from any
/// script are kept.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_separator = false;
    for ch in text.trim().chars() {
        if ch.is_alphanumeric() || ch == '_' {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_separator = true;
        }
    }
    if slug.is_empty() {
        "section".to_string()
    } else {
        slug
    }
}

/// Hands out identifiers that are unique within one build.
#[derive(Debug, Default)]
pub struct IdAllocator {
    used: HashSet<String>,
}

impl IdAllocator {
    /// Claim `base`, or `base-2`, `base-3`, ... if it is taken.
    pub fn claim(&mut self, base: &str) -> String {
        if self.used.insert(base.to_string()) {
            return base.to_string();
        }
        let mut n = 2usize;
        loop {
            let candidate = format!("{base}-{n}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Build the file tree from index entries.
///
/// Every directory and file becomes a node; ids are sequential in document
/// order. Only directories with at least one entry can fold.
pub fn build_file_tree(entries: &[IndexEntry]) -> Tree {
    let mut tree = Tree::new(MountPoint::FilePane);
    let mut next_id = 0usize;
    let mut stack: Vec<(&IndexEntry, Option<String>)> =
        entries.iter().rev().map(|entry| (entry, None)).collect();

    while let Some((entry, parent)) = stack.pop() {
        let id = format!("entry-{next_id}");
        next_id += 1;
        match entry {
            IndexEntry::Directory { name, children } => {
                tree.push(
                    id.clone(),
                    parent.as_deref(),
                    0,
                    strip_ordinal_prefix(name),
                    NodeKind::Directory,
                );
                stack.extend(children.iter().rev().map(|child| (child, Some(id.clone()))));
            }
            IndexEntry::File { name, title, path } => {
                let label = title
                    .as_deref()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map_or_else(|| file_display_name(name), str::to_string);
                tree.push(
                    id,
                    parent.as_deref(),
                    0,
                    label,
                    NodeKind::File { path: path.clone() },
                );
            }
        }
    }
    tree
}

/// Build the page outline from headings in document order.
///
/// A heading nests under the closest preceding heading with a strictly lower
/// level, so depth reflects logical nesting rather than the raw H-number.
pub fn build_outline(headings: &[HeadingRef]) -> Tree {
    let mut tree = Tree::new(MountPoint::OutlinePane);
    let mut ids = IdAllocator::default();
    let mut stack: Vec<(u8, String)> = Vec::new();

    for heading in headings {
        let level = heading.level.clamp(1, 6);
        while stack.last().is_some_and(|(open, _)| *open >= level) {
            stack.pop();
        }
        let base = heading
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map_or_else(|| slugify(&heading.text), str::to_string);
        let id = ids.claim(&base);
        let parent = stack.last().map(|(_, id)| id.as_str());
        tree.push(
            id.clone(),
            parent,
            level,
            heading.text.clone(),
            NodeKind::Heading { line: heading.line },
        );
        stack.push((level, id));
    }
    tree
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(level: u8, text: &str, line: usize) -> HeadingRef {
        HeadingRef {
            level,
            text: text.to_string(),
            line,
            id: None,
        }
    }

    #[test]
    fn test_strip_ordinal_prefix_fullwidth_paren() {
        assert_eq!(strip_ordinal_prefix("03）第一章"), "第一章");
    }

    #[test]
    fn test_strip_ordinal_prefix_applies_at_most_twice() {
        assert_eq!(strip_ordinal_prefix("1. 2. 3. Title"), "3. Title");
        assert_eq!(strip_ordinal_prefix("01-Intro"), "Intro");
        assert_eq!(strip_ordinal_prefix("2024 Report"), "Report");
        assert_eq!(strip_ordinal_prefix("2024Report"), "2024Report");
        assert_eq!(strip_ordinal_prefix("1234567. Too long"), "1234567. Too long");
    }

    #[test]
    fn test_strip_ordinal_prefix_keeps_name_when_nothing_left() {
        assert_eq!(strip_ordinal_prefix("12."), "12.");
    }

    #[test]
    fn test_file_display_name_strips_prefix_and_extension() {
        assert_eq!(file_display_name("02-intro.md"), "intro");
        assert_eq!(file_display_name("guide.markdown"), "guide");
        assert_eq!(file_display_name("notes.txt"), "notes.txt");
    }

    #[test]
    fn test_slugify_collapses_punctuation() {
        assert_eq!(slugify("  Hello, World!  "), "hello-world");
        assert_eq!(slugify("A -- B"), "a-b");
        assert_eq!(slugify("第一章 总则"), "第一章-总则");
        assert_eq!(slugify("!!!"), "section");
    }

    #[test]
    fn test_duplicate_heading_ids_are_suffixed() {
        let headings = vec![h(2, "Intro", 0), h(2, "Intro", 3), h(2, "Intro", 6)];
        let tree = build_outline(&headings);
        assert_eq!(tree.root_ids(), ["intro", "intro-2", "intro-3"]);
    }

    #[test]
    fn test_explicit_heading_id_is_reused() {
        let mut first = h(1, "Overview", 0);
        first.id = Some("top".to_string());
        let tree = build_outline(&[first, h(2, "Top", 2)]);
        assert!(tree.contains("top"));
        assert!(tree.contains("top-2"));
    }

    #[test]
    fn test_outline_nesting_scenario() {
        let headings = vec![h(1, "A", 0), h(2, "B", 2), h(2, "C", 4), h(1, "D", 6)];
        let tree = build_outline(&headings);
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.root_ids(), ["a", "d"]);
        assert_eq!(tree.node("a").unwrap().children(), ["b", "c"]);
        assert!(!tree.node("b").unwrap().has_children());
        assert!(!tree.node("c").unwrap().has_children());
        assert_eq!(tree.visible_ids(), vec!["a", "d"]);
        tree.validate().unwrap();
    }

    #[test]
    fn test_outline_depth_ignores_level_jumps() {
        let headings = vec![h(1, "Top", 0), h(4, "Deep", 2), h(2, "Mid", 4), h(3, "Low", 6)];
        let tree = build_outline(&headings);
        assert_eq!(tree.node("deep").unwrap().depth(), 1);
        assert_eq!(tree.node("deep").unwrap().level(), 4);
        assert_eq!(tree.node("mid").unwrap().parent_id(), Some("top"));
        assert_eq!(tree.node("low").unwrap().parent_id(), Some("mid"));
        assert_eq!(tree.node("low").unwrap().depth(), 2);
    }

    #[test]
    fn test_outline_starting_below_h1() {
        let headings = vec![h(3, "Late", 0), h(2, "Early", 2)];
        let tree = build_outline(&headings);
        assert_eq!(tree.root_ids(), ["late", "early"]);
    }

    #[test]
    fn test_empty_sources_yield_empty_trees() {
        assert!(build_outline(&[]).is_empty());
        assert!(build_file_tree(&[]).root_ids().is_empty());
    }

    #[test]
    fn test_file_tree_ids_and_labels() {
        let entries = vec![
            IndexEntry::Directory {
                name: "01. Guide".to_string(),
                children: vec![IndexEntry::File {
                    name: "02-intro.md".to_string(),
                    title: None,
                    path: "content/guide/02-intro.md".to_string(),
                }],
            },
            IndexEntry::Directory {
                name: "Empty".to_string(),
                children: Vec::new(),
            },
            IndexEntry::File {
                name: "faq.md".to_string(),
                title: Some("Questions".to_string()),
                path: "content/faq.md".to_string(),
            },
        ];
        let tree = build_file_tree(&entries);
        assert_eq!(tree.root_ids(), ["entry-0", "entry-2", "entry-3"]);
        let guide = tree.node("entry-0").unwrap();
        assert_eq!(guide.label(), "Guide");
        assert!(guide.has_children());
        let intro = tree.node("entry-1").unwrap();
        assert_eq!(intro.label(), "intro");
        assert_eq!(intro.file_path(), Some("content/guide/02-intro.md"));
        assert!(!tree.node("entry-2").unwrap().has_children());
        assert_eq!(tree.node("entry-3").unwrap().label(), "Questions");
        tree.validate().unwrap();
    }
}
