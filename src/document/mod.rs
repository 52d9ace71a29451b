//! Markdown document rendering.
//!
//! Parses markdown with comrak and lays it out as styled, wrapped lines.
//! Headings are reported with the line they landed on so the outline can be
//! built from the rendered result and the viewport can scroll to them.

mod parser;
mod types;

pub use parser::{parse, parse_with_layout, split_heading_id};
pub use types::{Document, HeadingRef, InlineSpan, InlineStyle, LineType, LinkRef, RenderedLine};
