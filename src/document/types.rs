//! Core document types.

/// A rendered markdown document.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Original source text
    source: String,
    /// Rendered lines for display
    lines: Vec<RenderedLine>,
    /// Headings in document order
    headings: Vec<HeadingRef>,
    /// Links in document order
    links: Vec<LinkRef>,
}

impl Document {
    /// Create an empty document.
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) const fn from_parts(
        source: String,
        lines: Vec<RenderedLine>,
        headings: Vec<HeadingRef>,
        links: Vec<LinkRef>,
    ) -> Self {
        Self {
            source,
            lines,
            headings,
            links,
        }
    }

    /// Get the total number of rendered lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Get all headings in document order.
    pub fn headings(&self) -> &[HeadingRef] {
        &self.headings
    }

    /// Get all link references.
    pub fn links(&self) -> &[LinkRef] {
        &self.links
    }

    /// Get the source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Get a specific rendered line by index.
    pub fn line_at(&self, index: usize) -> Option<&RenderedLine> {
        self.lines.get(index)
    }

    pub fn lines(&self) -> &[RenderedLine] {
        &self.lines
    }

    /// Lines from `offset` to `offset + count`.
    pub fn visible_lines(&self, offset: usize, count: usize) -> Vec<&RenderedLine> {
        self.lines.iter().skip(offset).take(count).collect()
    }

    /// Line of the heading matching `anchor`, by explicit id or by the
    /// slug of its text.
    pub fn resolve_internal_anchor(&self, anchor: &str) -> Option<usize> {
        let target = anchor.trim().trim_start_matches('#');
        if target.is_empty() {
            return None;
        }
        let normalized = crate::toc::slugify(target);
        self.headings.iter().find_map(|h| {
            if h.id.as_deref() == Some(target) || crate::toc::slugify(&h.text) == normalized {
                Some(h.line)
            } else {
                None
            }
        })
    }

    /// Links whose rendered line falls in `range`.
    pub fn links_in(&self, range: std::ops::Range<usize>) -> impl Iterator<Item = &LinkRef> {
        self.links.iter().filter(move |link| range.contains(&link.line))
    }
}

/// A single rendered line with styling information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLine {
    content: String,
    line_type: LineType,
    spans: Vec<InlineSpan>,
}

impl RenderedLine {
    pub const fn new(content: String, line_type: LineType) -> Self {
        Self {
            content,
            line_type,
            spans: Vec::new(),
        }
    }

    pub const fn with_spans(content: String, line_type: LineType, spans: Vec<InlineSpan>) -> Self {
        Self {
            content,
            line_type,
            spans,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub const fn line_type(&self) -> &LineType {
        &self.line_type
    }

    /// Inline spans, if the line carries styling.
    pub fn spans(&self) -> Option<&[InlineSpan]> {
        if self.spans.is_empty() {
            None
        } else {
            Some(&self.spans)
        }
    }
}

/// Inline style flags for a text span.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InlineStyle {
    pub emphasis: bool,
    pub strong: bool,
    pub code: bool,
    pub strikethrough: bool,
    pub link: bool,
}

/// A styled inline span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineSpan {
    text: String,
    style: InlineStyle,
}

impl InlineSpan {
    pub const fn new(text: String, style: InlineStyle) -> Self {
        Self { text, style }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub const fn style(&self) -> InlineStyle {
        self.style
    }
}

/// Type of a rendered line, used for styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineType {
    Paragraph,
    /// Heading with level (1-6)
    Heading(u8),
    CodeBlock,
    BlockQuote,
    /// List item with nesting level
    ListItem(usize),
    Table,
    HorizontalRule,
    Empty,
}

/// Reference to a heading in the rendered document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingRef {
    /// Heading level (1-6)
    pub level: u8,
    /// Heading text, without any `{#id}` suffix
    pub text: String,
    /// Line number in rendered document
    pub line: usize,
    /// Identifier given in the source with `{#id}`
    pub id: Option<String>,
}

/// Reference to a link in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRef {
    pub text: String,
    pub url: String,
    /// First rendered line of the enclosing block
    pub line: usize,
}

impl LinkRef {
    /// The heading id for in-document links such as `#setup`.
    pub fn fragment_target(&self) -> Option<&str> {
        self.url.strip_prefix('#').filter(|id| !id.is_empty())
    }

    /// Whether the link leaves the site.
    pub fn is_external(&self) -> bool {
        self.url.contains("://") || self.url.starts_with("mailto:")
    }
}
