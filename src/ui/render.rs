use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph, Wrap};

use crate::app::{DocState, Model};

use super::{DOC_WIDTH_PERCENT, DOCUMENT_LEFT_PADDING, SIDEBAR_WIDTH_PERCENT, overlays, sidebar, status};

pub fn split_main_columns(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(SIDEBAR_WIDTH_PERCENT),
            Constraint::Percentage(DOC_WIDTH_PERCENT),
        ])
        .split(area)
}

pub fn document_content_width(total_width: u16, sidebar_visible: bool) -> u16 {
    let area = Rect::new(0, 0, total_width, 1);
    let doc_width = if sidebar_visible {
        split_main_columns(area)[1].width
    } else {
        total_width
    };
    doc_width.saturating_sub(DOCUMENT_LEFT_PADDING).max(1)
}

/// Inner width of the sidebar block.
pub fn sidebar_width(total_width: u16) -> u16 {
    split_main_columns(Rect::new(0, 0, total_width, 1))[0]
        .width
        .saturating_sub(2)
}

/// Rows under the document taken by the status, search and toast bars.
pub fn footer_rows(model: &Model) -> u16 {
    1 + u16::from(model.search.is_some()) + u16::from(model.active_toast().is_some())
}

/// Render the complete UI.
pub fn render(model: &Model, frame: &mut Frame) {
    let area = frame.area();

    if model.sidebar_visible {
        let chunks = split_main_columns(area);
        sidebar::render_sidebar(model, frame, chunks[0]);
        render_document_column(model, frame, chunks[1]);
    } else {
        render_document_column(model, frame, area);
    }

    if model.help_visible {
        overlays::render_help_overlay(model, frame, area);
    } else if model.link_picker_active() {
        overlays::render_link_picker_overlay(model, frame, area);
    }
}

fn render_document_column(model: &Model, frame: &mut Frame, area: Rect) {
    let search_active = model.search.is_some();
    let toast_active = model.active_toast().is_some();
    let doc_area = Rect {
        height: area.height.saturating_sub(footer_rows(model)),
        ..area
    };
    let bar = |from_bottom: u16| Rect {
        y: area.y + area.height.saturating_sub(from_bottom),
        height: 1,
        ..area
    };

    frame.render_widget(Clear, doc_area);
    match &model.doc_state {
        DocState::Failed { path, error } => render_failure_panel(frame, doc_area, path, error),
        DocState::Loading { path } if model.document.line_count() == 0 => {
            render_notice(frame, doc_area, &format!("Loading {path}…"));
        }
        DocState::Empty => render_notice(frame, doc_area, "Select a document in the sidebar."),
        _ => render_document(model, frame, doc_area),
    }

    if toast_active {
        status::render_toast_bar(model, frame, bar(1 + 1 + u16::from(search_active)));
    }
    if search_active {
        status::render_search_bar(model, frame, bar(2));
    }
    status::render_status_bar(model, frame, bar(1));
}

fn render_document(model: &Model, frame: &mut Frame, area: Rect) {
    let offset = model.viewport.offset();
    let query = model
        .search
        .as_ref()
        .map(|search| search.query().trim())
        .filter(|q| q.chars().count() >= crate::search::MIN_INCREMENTAL_QUERY);
    let current_match = model.search.as_ref().and_then(|s| s.current_line());

    let content: Vec<Line> = model
        .document
        .visible_lines(offset, area.height as usize)
        .into_iter()
        .enumerate()
        .map(|(idx, line)| {
            let line_style = super::style::style_for_line_type(line.line_type());
            let mut spans: Vec<Span<'static>> = match line.spans() {
                Some(spans) => spans
                    .iter()
                    .map(|span| {
                        Span::styled(
                            span.text().to_string(),
                            super::style::style_for_inline(line_style, span.style()),
                        )
                    })
                    .collect(),
                None => vec![Span::styled(line.content().to_string(), line_style)],
            };
            if let Some(query) = query {
                let current = current_match == Some(offset + idx);
                spans = highlight_spans(&spans, query, current);
            }
            Line::from(spans)
        })
        .collect();

    let block = Block::default()
        .borders(Borders::NONE)
        .padding(Padding::left(DOCUMENT_LEFT_PADDING));
    frame.render_widget(Paragraph::new(content).block(block), area);
}

fn render_notice(frame: &mut Frame, area: Rect, text: &str) {
    let block = Block::default()
        .borders(Borders::NONE)
        .padding(Padding::new(DOCUMENT_LEFT_PADDING, 1, 1, 0));
    let notice = Paragraph::new(text.to_string())
        .style(super::style::notice_style())
        .wrap(Wrap { trim: true })
        .block(block);
    frame.render_widget(notice, area);
}

/// Failure panel naming the document and the underlying error.
fn render_failure_panel(frame: &mut Frame, area: Rect, path: &str, error: &str) {
    let lines = vec![
        Line::from(vec![
            Span::styled("Document: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(path.to_string()),
        ]),
        Line::raw(""),
        Line::raw(error.to_string()),
        Line::raw(""),
        Line::styled(
            "Pick the document again to retry.",
            super::style::notice_style(),
        ),
    ];
    let block = Block::default()
        .title("Failed to load")
        .borders(Borders::ALL)
        .border_style(super::style::error_style())
        .padding(Padding::uniform(1));
    let panel = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(block);
    let width = area.width.saturating_sub(DOCUMENT_LEFT_PADDING * 2).max(1);
    let height = area.height.min(9);
    let rect = Rect::new(area.x + DOCUMENT_LEFT_PADDING, area.y + 1, width, height)
        .intersection(area);
    frame.render_widget(panel, rect);
}

fn highlight_spans(spans: &[Span<'static>], query: &str, current: bool) -> Vec<Span<'static>> {
    let needle = query.to_lowercase();
    let hit_style = |base: Style| {
        if current {
            base.bg(Color::LightRed).fg(Color::Black)
        } else {
            base.bg(Color::Yellow).fg(Color::Black)
        }
    };
    let mut out = Vec::new();
    for span in spans {
        let text = span.content.to_string();
        // Byte offsets from the lowered copy are only safe to reuse when
        // lowering kept every length.
        let lower = text.to_lowercase();
        if lower.len() != text.len() {
            out.push(span.clone());
            continue;
        }
        let mut cursor = 0usize;
        while let Some(rel) = lower[cursor..].find(&needle) {
            let start = cursor + rel;
            let end = start + needle.len();
            if start > cursor {
                out.push(Span::styled(text[cursor..start].to_string(), span.style));
            }
            out.push(Span::styled(text[start..end].to_string(), hit_style(span.style)));
            cursor = end;
        }
        if cursor < text.len() {
            out.push(Span::styled(text[cursor..].to_string(), span.style));
        }
    }
    out
}
