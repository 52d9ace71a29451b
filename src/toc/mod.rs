//! Hierarchical table of contents: the file tree and the page outline.
//!
//! Both trees share one node model ([`Tree`]). The fold engine mutates
//! `expanded` flags, [`sync`] projects the result onto a [`Mount`], and the
//! [`ScrollSpy`] decides which outline entry is highlighted. A file filter
//! narrows the file tree's rows to matching titles and paths.

mod builder;
mod filter;
mod fold;
mod node;
mod spy;
mod sync;

pub use builder::{
    IdAllocator, build_file_tree, build_outline, file_display_name, slugify, strip_ordinal_prefix,
};
pub use node::{MountPoint, Node, NodeKind, Tree};
pub use spy::{HeadingObserver, Intersection, IntersectionReport, ScrollSpy, SpyMode};
pub use sync::{FoldIcon, INDENT_STEP, Mount, Placeholder, RowElement, ToggleAllLabel, sync};
