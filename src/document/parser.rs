//! Markdown rendering with comrak.

use comrak::nodes::{AstNode, ListDelimType, ListType, NodeValue, TableAlignment};
use comrak::{Arena, Options, parse_document};
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::types::{Document, HeadingRef, InlineSpan, InlineStyle, LineType, LinkRef, RenderedLine};

/// Trailing `{#custom-id}` on a heading.
static HEADING_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\{#([^\s{}]+)\}\s*$").expect("valid heading id regex"));

const DEFAULT_WIDTH: u16 = 80;
const CODE_RIGHT_PADDING: usize = 3;

impl Document {
    /// Render markdown at the default width.
    ///
    /// ```
    /// use docshelf::document::Document;
    ///
    /// let doc = Document::parse("# Hello\n\nWorld");
    /// assert_eq!(doc.headings().len(), 1);
    /// ```
    pub fn parse(source: &str) -> Self {
        parse(source)
    }

    /// Render markdown wrapped to `width` columns.
    pub fn parse_with_layout(source: &str, width: u16) -> Self {
        parse_with_layout(source, width)
    }
}

/// Render markdown at the default width.
pub fn parse(source: &str) -> Document {
    parse_with_layout(source, DEFAULT_WIDTH)
}

/// Render markdown wrapped to `width` columns.
///
/// Headings are recorded only after their line has been emitted, so every
/// [`HeadingRef::line`] points into the finished line list.
pub fn parse_with_layout(source: &str, width: u16) -> Document {
    let arena = Arena::new();
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.footnotes = true;
    let root = parse_document(&arena, source, &options);

    let mut renderer = Renderer {
        lines: Vec::new(),
        headings: Vec::new(),
        links: Vec::new(),
        wrap_width: usize::from(width.max(1)),
    };
    renderer.block(root, 0, None);
    while renderer
        .lines
        .last()
        .is_some_and(|line| *line.line_type() == LineType::Empty)
    {
        renderer.lines.pop();
    }

    Document::from_parts(
        source.to_string(),
        renderer.lines,
        renderer.headings,
        renderer.links,
    )
}

/// Split a trailing `{#id}` off heading text.
pub fn split_heading_id(text: &str) -> (String, Option<String>) {
    match HEADING_ID.captures(text) {
        Some(caps) => {
            let start = caps.get(0).map_or(text.len(), |m| m.start());
            let id = caps.get(1).map(|m| m.as_str().to_string());
            (text[..start].trim().to_string(), id)
        }
        None => (text.trim().to_string(), None),
    }
}

struct Renderer {
    lines: Vec<RenderedLine>,
    headings: Vec<HeadingRef>,
    links: Vec<LinkRef>,
    wrap_width: usize,
}

impl Renderer {
    fn push(&mut self, content: String, line_type: LineType) {
        self.lines.push(RenderedLine::new(content, line_type));
    }

    fn blank(&mut self) {
        self.push(String::new(), LineType::Empty);
    }

    fn push_wrapped(&mut self, spans: &[InlineSpan], line_type: LineType, first: &str, next: &str) {
        for line_spans in wrap_spans(spans, self.wrap_width, first, next) {
            let content = spans_to_string(&line_spans);
            self.lines
                .push(RenderedLine::with_spans(content, line_type, line_spans));
        }
    }

    fn block<'a>(&mut self, node: &'a AstNode<'a>, depth: usize, list_marker: Option<&str>) {
        match &node.data.borrow().value {
            NodeValue::Heading(heading) => {
                let (text, id) = split_heading_id(&extract_text(node));
                if !self.lines.is_empty() {
                    ensure_trailing_empty_lines(&mut self.lines, 1);
                }
                let line = self.lines.len();
                let prefix = "#".repeat(usize::from(heading.level));
                self.push(format!("{prefix} {text}"), LineType::Heading(heading.level));
                self.blank();
                collect_links(node, line, &mut self.links);
                self.headings.push(HeadingRef {
                    level: heading.level,
                    text,
                    line,
                    id,
                });
            }

            NodeValue::Paragraph => {
                collect_links(node, self.lines.len(), &mut self.links);
                let spans = collect_inline_spans(node);
                self.push_wrapped(&spans, LineType::Paragraph, "", "");
                self.blank();
            }

            NodeValue::CodeBlock(code_block) => {
                let language = code_block
                    .info
                    .split_whitespace()
                    .next()
                    .map(ToString::to_string);
                let literal = code_block.literal.clone();
                self.code_block(language.as_deref(), &literal);
                self.blank();
            }

            NodeValue::List(list) => {
                let list_depth = depth + 1;
                let delimiter = match list.delimiter {
                    ListDelimType::Paren => ')',
                    ListDelimType::Period => '.',
                };
                let items = node.children().count();
                let number_width = (list.start + items.saturating_sub(1)).to_string().len();
                for (index, child) in node.children().enumerate() {
                    let marker = match list.list_type {
                        ListType::Bullet => "• ".to_string(),
                        ListType::Ordered => {
                            format!("{:>number_width$}{delimiter} ", list.start + index)
                        }
                    };
                    self.block(child, list_depth, Some(&marker));
                }
                if depth == 0 {
                    self.blank();
                }
            }

            NodeValue::Item(_) | NodeValue::TaskItem(_) => self.list_item(node, depth, list_marker),

            NodeValue::BlockQuote => {
                self.blockquote(node, 1);
                self.blank();
            }

            NodeValue::ThematicBreak => {
                let rule = "─".repeat(self.wrap_width.min(40));
                self.push(rule, LineType::HorizontalRule);
                self.blank();
            }

            NodeValue::Table(_) => {
                for line in render_table(node, self.wrap_width) {
                    self.push(line, LineType::Table);
                }
                self.blank();
            }

            NodeValue::HtmlBlock(html) => {
                let literal = html.literal.clone();
                for raw in literal.lines().filter(|l| !l.trim().is_empty()) {
                    self.push(raw.to_string(), LineType::Paragraph);
                }
            }

            NodeValue::FootnoteDefinition(def) => {
                let label = format!("[^{}]: ", def.name);
                let continuation = " ".repeat(label.len());
                let spans = collect_inline_spans(node);
                self.push_wrapped(&spans, LineType::Paragraph, &label, &continuation);
                self.blank();
            }

            _ => {
                for child in node.children() {
                    self.block(child, depth, list_marker);
                }
            }
        }
    }

    fn list_item<'a>(&mut self, node: &'a AstNode<'a>, depth: usize, list_marker: Option<&str>) {
        let indent = "  ".repeat(depth.saturating_sub(1));
        let marker = match &node.data.borrow().value {
            NodeValue::TaskItem(symbol) => {
                if symbol.is_some() { "✓ " } else { "□ " }.to_string()
            }
            _ => list_marker.unwrap_or("- ").to_string(),
        };
        let first = format!("{indent}{marker}");
        let next = format!("{indent}{}", " ".repeat(marker.chars().count()));
        let mut rendered_any = false;

        for child in node.children() {
            let is_text_block = matches!(child.data.borrow().value, NodeValue::Paragraph);
            if is_text_block {
                collect_links(child, self.lines.len(), &mut self.links);
                let spans = collect_inline_spans(child);
                let prefix = if rendered_any { &next } else { &first };
                self.push_wrapped(&spans, LineType::ListItem(depth), prefix, &next);
                rendered_any = true;
            } else {
                self.block(child, depth, None);
            }
        }

        if !rendered_any {
            self.push(first, LineType::ListItem(depth));
        }
    }

    fn blockquote<'a>(&mut self, node: &'a AstNode<'a>, quote_depth: usize) {
        let prefix = format!("  {}", "│ ".repeat(quote_depth));
        for child in node.children() {
            let (is_quote, is_paragraph) = {
                let value = &child.data.borrow().value;
                (
                    matches!(value, NodeValue::BlockQuote),
                    matches!(value, NodeValue::Paragraph),
                )
            };
            if is_quote {
                self.blockquote(child, quote_depth + 1);
                continue;
            }
            collect_links(child, self.lines.len(), &mut self.links);
            let spans = if is_paragraph {
                collect_inline_spans(child)
            } else {
                vec![InlineSpan::new(
                    extract_text(child).replace('\n', " "),
                    InlineStyle::default(),
                )]
            };
            self.push_wrapped(&spans, LineType::BlockQuote, &prefix, &prefix);
        }
    }

    fn code_block(&mut self, language: Option<&str>, literal: &str) {
        let content_width = literal
            .lines()
            .map(display_width)
            .max()
            .unwrap_or(0)
            .min(self.wrap_width.saturating_sub(4).max(1));
        let label = format!(" {} ", language.unwrap_or("code"));
        let inner = content_width + 2 + CODE_RIGHT_PADDING;
        let label = truncate_text(&label, inner);
        self.push(
            format!("┌{label}{}┐", "─".repeat(inner.saturating_sub(display_width(&label)))),
            LineType::CodeBlock,
        );

        let code_style = InlineStyle {
            code: true,
            ..InlineStyle::default()
        };
        for raw in literal.lines() {
            let text = truncate_text(raw, content_width);
            let padding = " ".repeat(content_width.saturating_sub(display_width(&text)) + CODE_RIGHT_PADDING);
            let spans = vec![
                InlineSpan::new("│ ".to_string(), InlineStyle::default()),
                InlineSpan::new(text, code_style),
                InlineSpan::new(format!("{padding} │"), InlineStyle::default()),
            ];
            let content = spans_to_string(&spans);
            self.lines
                .push(RenderedLine::with_spans(content, LineType::CodeBlock, spans));
        }
        self.push(format!("└{}┘", "─".repeat(inner)), LineType::CodeBlock);
    }
}

fn ensure_trailing_empty_lines(lines: &mut Vec<RenderedLine>, count: usize) {
    let existing = lines
        .iter()
        .rev()
        .take_while(|line| matches!(line.line_type(), LineType::Empty))
        .count();
    for _ in existing..count {
        lines.push(RenderedLine::new(String::new(), LineType::Empty));
    }
}

fn render_table<'a>(table_node: &'a AstNode<'a>, wrap_width: usize) -> Vec<String> {
    let alignments = match &table_node.data.borrow().value {
        NodeValue::Table(table) => table.alignments.clone(),
        _ => Vec::new(),
    };
    let mut has_header = false;
    let mut rows: Vec<Vec<String>> = Vec::new();
    for row_node in table_node.children() {
        match row_node.data.borrow().value {
            NodeValue::TableRow(header) => has_header |= header,
            _ => continue,
        }
        rows.push(
            row_node
                .children()
                .map(|cell| {
                    extract_text(cell)
                        .split_whitespace()
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect(),
        );
    }

    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return Vec::new();
    }
    let mut widths = vec![1usize; columns];
    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(display_width(cell));
        }
    }
    // A row is 1 + sum(width + 3) columns wide; shrink the widest column
    // until it fits.
    let max_width = wrap_width.max(4);
    while 1 + widths.iter().sum::<usize>() + 3 * columns > max_width {
        let Some((widest, &width)) = widths.iter().enumerate().max_by_key(|(_, w)| **w) else {
            break;
        };
        if width <= 1 {
            break;
        }
        widths[widest] -= 1;
    }

    let border = |left: char, middle: char, right: char| {
        let inner: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
        format!("{left}{}{right}", inner.join(&middle.to_string()))
    };

    let mut out = vec![border('┌', '┬', '┐')];
    for (idx, row) in rows.iter().enumerate() {
        let mut line = String::from("│");
        for (col, width) in widths.iter().enumerate() {
            let cell = truncate_text(row.get(col).map_or("", String::as_str), *width);
            let padding = width.saturating_sub(display_width(&cell));
            let (left, right) = match alignments.get(col).copied().unwrap_or(TableAlignment::None) {
                TableAlignment::Right => (padding, 0),
                TableAlignment::Center => (padding / 2, padding - padding / 2),
                TableAlignment::Left | TableAlignment::None => (0, padding),
            };
            line.push_str(&format!(" {}{cell}{} │", " ".repeat(left), " ".repeat(right)));
        }
        out.push(line);
        if has_header && idx == 0 {
            out.push(border('├', '┼', '┤'));
        }
    }
    out.push(border('└', '┴', '┘'));
    out
}

fn truncate_text(text: &str, max_width: usize) -> String {
    let mut out = String::new();
    let mut width = 0usize;
    for ch in text.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if width + ch_width > max_width {
            break;
        }
        out.push(ch);
        width += ch_width;
    }
    out
}

fn display_width(text: &str) -> usize {
    UnicodeWidthStr::width(text)
}

fn extract_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut text = String::new();
    extract_text_recursive(node, &mut text);
    text
}

fn extract_text_recursive<'a>(node: &'a AstNode<'a>, text: &mut String) {
    match &node.data.borrow().value {
        NodeValue::Text(t) => text.push_str(t),
        NodeValue::Code(c) => text.push_str(&c.literal),
        NodeValue::FootnoteReference(reference) => {
            text.push_str(&format!("[^{}]", reference.name));
        }
        NodeValue::SoftBreak | NodeValue::LineBreak => text.push(' '),
        _ => {
            for child in node.children() {
                extract_text_recursive(child, text);
            }
        }
    }
}

fn collect_inline_spans<'a>(node: &'a AstNode<'a>) -> Vec<InlineSpan> {
    let mut spans = Vec::new();
    collect_inline_spans_recursive(node, InlineStyle::default(), &mut spans);
    spans
}

fn collect_inline_spans_recursive<'a>(
    node: &'a AstNode<'a>,
    style: InlineStyle,
    spans: &mut Vec<InlineSpan>,
) {
    let mut next = style;
    match &node.data.borrow().value {
        NodeValue::List(_) | NodeValue::Item(_) => return,
        NodeValue::Text(t) => {
            spans.push(InlineSpan::new(t.clone(), style));
            return;
        }
        NodeValue::Code(code) => {
            let code_style = InlineStyle {
                code: true,
                link: style.link,
                ..InlineStyle::default()
            };
            spans.push(InlineSpan::new(code.literal.clone(), code_style));
            return;
        }
        NodeValue::Image(image) => {
            let alt = extract_text(node);
            let label = if alt.is_empty() { image.url.clone() } else { alt };
            spans.push(InlineSpan::new(format!("[Image: {label}]"), style));
            return;
        }
        NodeValue::FootnoteReference(reference) => {
            spans.push(InlineSpan::new(format!("[^{}]", reference.name), style));
            return;
        }
        NodeValue::SoftBreak | NodeValue::LineBreak => {
            spans.push(InlineSpan::new(" ".to_string(), style));
            return;
        }
        NodeValue::Emph => next.emphasis = true,
        NodeValue::Strong => next.strong = true,
        NodeValue::Strikethrough => next.strikethrough = true,
        NodeValue::Link(_) => next.link = true,
        _ => {}
    }
    for child in node.children() {
        collect_inline_spans_recursive(child, next, spans);
    }
}

fn collect_links<'a>(node: &'a AstNode<'a>, line: usize, links: &mut Vec<LinkRef>) {
    if let NodeValue::Link(link) = &node.data.borrow().value {
        links.push(LinkRef {
            text: extract_text(node),
            url: link.url.clone(),
            line,
        });
        return;
    }
    for child in node.children() {
        collect_links(child, line, links);
    }
}

fn wrap_spans(
    spans: &[InlineSpan],
    width: usize,
    prefix_first: &str,
    prefix_next: &str,
) -> Vec<Vec<InlineSpan>> {
    let start_line = |prefix: &str| -> (Vec<InlineSpan>, usize) {
        if prefix.is_empty() {
            (Vec::new(), 0)
        } else {
            (
                vec![InlineSpan::new(prefix.to_string(), InlineStyle::default())],
                display_width(prefix),
            )
        }
    };

    let mut lines: Vec<Vec<InlineSpan>> = Vec::new();
    let (mut current, mut current_width) = start_line(prefix_first);
    let mut has_word = false;

    for token in spans.iter().flat_map(split_inline_tokens) {
        let token_width = display_width(token.text());
        let token_is_ws = token.text().chars().all(char::is_whitespace);

        if current_width + token_width > width && has_word {
            lines.push(std::mem::take(&mut current));
            (current, current_width) = start_line(prefix_next);
            has_word = false;
        }
        if token_is_ws && !has_word {
            continue;
        }
        current_width += token_width;
        current.push(token);
        has_word = true;
    }

    lines.push(current);
    lines
}

fn split_inline_tokens(span: &InlineSpan) -> Vec<InlineSpan> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut ws_state: Option<bool> = None;

    for ch in span.text().chars() {
        let is_ws = ch.is_whitespace();
        if ws_state.is_some_and(|state| state != is_ws) {
            out.push(InlineSpan::new(std::mem::take(&mut buf), span.style()));
        }
        buf.push(ch);
        ws_state = Some(is_ws);
    }
    if !buf.is_empty() {
        out.push(InlineSpan::new(buf, span.style()));
    }
    out
}

fn spans_to_string(spans: &[InlineSpan]) -> String {
    spans.iter().map(InlineSpan::text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_document() {
        let doc = parse("");
        assert_eq!(doc.line_count(), 0);
        assert!(doc.headings().is_empty());
    }

    #[test]
    fn test_heading_lines_point_at_heading_rows() {
        let doc = parse("# A\n\ntext\n\n## B\n\nmore\n\n## C\n\n# D\n");
        let levels: Vec<u8> = doc.headings().iter().map(|h| h.level).collect();
        assert_eq!(levels, vec![1, 2, 2, 1]);
        for heading in doc.headings() {
            let line = doc.line_at(heading.line).unwrap();
            assert_eq!(*line.line_type(), LineType::Heading(heading.level));
            assert!(line.content().ends_with(&heading.text));
        }
    }

    #[test]
    fn test_heading_custom_id_is_extracted() {
        let doc = parse("## Install steps {#setup}\n");
        let heading = &doc.headings()[0];
        assert_eq!(heading.text, "Install steps");
        assert_eq!(heading.id.as_deref(), Some("setup"));
        assert_eq!(doc.line_at(0).unwrap().content(), "## Install steps");
    }

    #[test]
    fn test_split_heading_id_without_suffix() {
        assert_eq!(split_heading_id("  Plain  "), ("Plain".to_string(), None));
        assert_eq!(
            split_heading_id("Braces {not an id}"),
            ("Braces {not an id}".to_string(), None)
        );
    }

    #[test]
    fn test_heading_inline_code_keeps_text() {
        let doc = parse("# Using `cargo`\n");
        assert_eq!(doc.headings()[0].text, "Using cargo");
    }

    #[test]
    fn test_paragraph_wraps_to_width() {
        let doc = parse_with_layout("one two three four five six seven", 10);
        let paragraph: Vec<&str> = doc
            .lines()
            .iter()
            .filter(|l| *l.line_type() == LineType::Paragraph)
            .map(RenderedLine::content)
            .collect();
        assert!(paragraph.len() > 1);
        assert!(paragraph.iter().all(|l| display_width(l) <= 10));
    }

    #[test]
    fn test_links_are_collected_with_lines() {
        let doc = parse("# Top\n\nSee [below](#art-1) and [next](guide/next.md).\n");
        let urls: Vec<&str> = doc.links().iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["#art-1", "guide/next.md"]);
        let line = doc.links()[0].line;
        assert!(doc.line_at(line).unwrap().content().contains("below"));
    }

    #[test]
    fn test_code_block_renders_frame() {
        let doc = parse("```rust\nfn main() {}\n```");
        let contents: Vec<&str> = doc.lines().iter().map(RenderedLine::content).collect();
        assert!(contents[0].starts_with("┌ rust "));
        assert!(contents[1].starts_with("│ fn main() {}"));
        assert!(contents[2].starts_with('└'));
        assert!(!contents.iter().any(|l| l.contains("```")));
    }

    #[test]
    fn test_lists_and_tasks() {
        let doc = parse("1. first\n2. second\n\n- [x] done\n- [ ] todo\n");
        let items: Vec<&str> = doc
            .lines()
            .iter()
            .filter(|l| matches!(l.line_type(), LineType::ListItem(_)))
            .map(RenderedLine::content)
            .collect();
        assert_eq!(items, vec!["1. first", "2. second", "✓ done", "□ todo"]);
    }

    #[test]
    fn test_table_respects_layout_width() {
        let md = "| Name | Description |\n|---|---|\n| a | a very long description that will not fit |\n";
        let doc = parse_with_layout(md, 30);
        let rows: Vec<&RenderedLine> = doc
            .lines()
            .iter()
            .filter(|l| *l.line_type() == LineType::Table)
            .collect();
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|l| display_width(l.content()) <= 30));
    }

    #[test]
    fn test_blockquote_prefix() {
        let doc = parse("> quoted\n");
        assert_eq!(doc.line_at(0).unwrap().content(), "  │ quoted");
        assert_eq!(*doc.line_at(0).unwrap().line_type(), LineType::BlockQuote);
    }
}
