//! Directory index parsing.
//!
//! Sites publish their document list either as a nested tree of directory
//! and file entries or as a flat list of files with slash-separated paths.
//! Both are normalised into [`IndexEntry`] trees; flat lists are grouped into
//! directories by shared path prefix, in first-seen order.

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// One entry of a normalised directory index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexEntry {
    Directory {
        name: String,
        children: Vec<IndexEntry>,
    },
    File {
        /// File name as published, used for display when there is no title
        name: String,
        title: Option<String>,
        /// Path used to fetch the document
        path: String,
    },
}

/// Index loading errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// The resource is not valid JSON.
    #[error("index is not valid JSON: {0}")]
    Malformed(String),

    /// Valid JSON, but neither a tree nor a document list.
    #[error("unrecognised index shape: {0}")]
    Shape(String),

    /// Every candidate location failed.
    #[error("no directory index found (tried {tried}): {last}")]
    Unavailable { tried: String, last: String },
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(rename = "type")]
    kind: Option<String>,
    name: Option<String>,
    title: Option<String>,
    path: Option<String>,
    children: Option<Vec<RawEntry>>,
    leaf: Option<bool>,
}

impl RawEntry {
    fn is_directory(&self) -> bool {
        match self.kind.as_deref() {
            Some("dir" | "directory") => true,
            Some(_) => false,
            None => self.leaf != Some(true) && self.children.is_some(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawIndex {
    List(Vec<RawEntry>),
    Docs { docs: Vec<RawEntry> },
    Root { children: Vec<RawEntry> },
}

/// Parse index JSON into normalised entries.
///
/// # Errors
///
/// Returns [`IndexError::Malformed`] for invalid JSON and
/// [`IndexError::Shape`] for JSON that is neither a list nor a tree root.
pub fn parse_index(text: &str) -> Result<Vec<IndexEntry>, IndexError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|err| IndexError::Malformed(err.to_string()))?;
    let raw: RawIndex = serde_json::from_value(value).map_err(|_| {
        IndexError::Shape("expected an array, {\"docs\": [...]} or an object with children".into())
    })?;
    let entries = match raw {
        RawIndex::List(list) | RawIndex::Docs { docs: list } | RawIndex::Root { children: list } => {
            list
        }
    };
    if entries.iter().any(RawEntry::is_directory) {
        Ok(convert_nested(entries))
    } else {
        Ok(assemble_flat(entries))
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').find(|part| !part.is_empty()).unwrap_or(path)
}

fn convert_nested(entries: Vec<RawEntry>) -> Vec<IndexEntry> {
    entries
        .into_iter()
        .filter_map(|entry| {
            if entry.is_directory() {
                let name = entry
                    .name
                    .or(entry.title)
                    .or_else(|| entry.path.as_deref().map(|p| last_segment(p).to_string()))
                    .unwrap_or_default();
                let children = convert_nested(entry.children.unwrap_or_default());
                return Some(IndexEntry::Directory { name, children });
            }
            let Some(path) = entry.path.filter(|p| !p.trim().is_empty()) else {
                debug!(name = ?entry.name, "index entry without path skipped");
                return None;
            };
            let name = entry
                .name
                .unwrap_or_else(|| last_segment(&path).to_string());
            Some(IndexEntry::File {
                name,
                title: entry.title,
                path,
            })
        })
        .collect()
}

/// Directory under construction while grouping a flat list.
#[derive(Default)]
struct PendingDir {
    name: String,
    slots: Vec<Slot>,
}

enum Slot {
    Dir(usize),
    File(IndexEntry),
}

fn clean_path(path: &str) -> &str {
    let path = path.strip_prefix("./").unwrap_or(path);
    path.strip_prefix('/').unwrap_or(path)
}

/// Group a flat file list into directories by shared path prefix.
fn assemble_flat(entries: Vec<RawEntry>) -> Vec<IndexEntry> {
    // Slot 0 is the synthetic root.
    let mut dirs = vec![PendingDir::default()];
    let mut by_path: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        let Some(raw_path) = entry.path.as_deref().filter(|p| !p.trim().is_empty()) else {
            debug!(title = ?entry.title, "flat index entry without path skipped");
            continue;
        };
        let path = clean_path(raw_path).to_string();
        let mut parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        let file_name = parts.pop().unwrap_or_default().to_string();

        let mut parent = 0;
        let mut prefix = String::new();
        for part in parts {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(part);
            parent = if let Some(&idx) = by_path.get(&prefix) {
                idx
            } else {
                let idx = dirs.len();
                dirs.push(PendingDir {
                    name: part.to_string(),
                    slots: Vec::new(),
                });
                dirs[parent].slots.push(Slot::Dir(idx));
                by_path.insert(prefix.clone(), idx);
                idx
            };
        }

        let name = entry.name.unwrap_or(file_name);
        dirs[parent].slots.push(Slot::File(IndexEntry::File {
            name,
            title: entry.title,
            path,
        }));
    }

    finish_dir(&mut dirs, 0)
}

fn finish_dir(dirs: &mut [PendingDir], idx: usize) -> Vec<IndexEntry> {
    let slots = std::mem::take(&mut dirs[idx].slots);
    slots
        .into_iter()
        .map(|slot| match slot {
            Slot::File(file) => file,
            Slot::Dir(child) => IndexEntry::Directory {
                name: std::mem::take(&mut dirs[child].name),
                children: finish_dir(dirs, child),
            },
        })
        .collect()
}

/// Number of file entries in the index.
pub fn count_files(entries: &[IndexEntry]) -> usize {
    let mut count = 0;
    let mut stack: Vec<&IndexEntry> = entries.iter().collect();
    while let Some(entry) = stack.pop() {
        match entry {
            IndexEntry::Directory { children, .. } => stack.extend(children),
            IndexEntry::File { .. } => count += 1,
        }
    }
    count
}
