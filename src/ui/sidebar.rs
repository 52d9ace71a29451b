use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::app::{Model, Pane, SidebarView};
use crate::toc::{NodeKind, RowElement, ToggleAllLabel};

use super::style;

pub fn render_sidebar(model: &Model, frame: &mut Frame, area: Rect) {
    let pane = model.active_pane();

    let border_style = if model.sidebar_focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(tab_line(model.sidebar_view));
    let label = pane.mount.toggle_all_label();
    if label != ToggleAllLabel::Unavailable {
        block = block.title_bottom(
            Line::styled(format!(" {} ", label.text()), style::control_style()).right_aligned(),
        );
    }
    if let Some(title) = filter_title(model) {
        block = block.title_bottom(title);
    }
    let inner = block.inner(area);
    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    if let Some(placeholder) = pane.mount.placeholder_content() {
        let text = Paragraph::new(placeholder.message())
            .style(style::notice_style())
            .wrap(Wrap { trim: true });
        frame.render_widget(text, inner);
        return;
    }

    let rows = pane.mount.visible_rows();
    if rows.is_empty()
        && let Some(query) = pane.filter.as_deref()
    {
        let text = Paragraph::new(format!("No files match \"{query}\"."))
            .style(style::notice_style())
            .wrap(Wrap { trim: true });
        frame.render_widget(text, inner);
        return;
    }
    let offset = pane.scroll.offset();
    for (idx, row) in rows
        .iter()
        .skip(offset)
        .take(inner.height as usize)
        .enumerate()
    {
        #[allow(clippy::cast_possible_truncation)]
        let row_area = Rect::new(inner.x, inner.y + idx as u16, inner.width, 1);
        let selected = model.sidebar_focused && pane.selected.as_deref() == Some(row.node_id());
        frame.render_widget(Paragraph::new(row_line(pane, row, selected)), row_area);
        // The highlight covers the whole row, indentation included.
        if row.active {
            frame.buffer_mut().set_style(row_area, style::active_row_style());
        }
    }
}

/// Bottom-left title for the file filter: the prompt while typing, the
/// applied query otherwise.
fn filter_title(model: &Model) -> Option<Line<'static>> {
    if model.sidebar_view != SidebarView::Files {
        return None;
    }
    let text = match (model.filter_prompt.as_deref(), model.files.filter.as_deref()) {
        (Some(prompt), _) => format!(" filter: {prompt}_ "),
        (None, Some(query)) => format!(" filter: {query} "),
        (None, None) => return None,
    };
    Some(Line::styled(text, style::control_style()).left_aligned())
}

fn tab_line(view: SidebarView) -> Line<'static> {
    let tab = |name: &'static str, on: bool| {
        if on {
            Span::styled(format!(" {name} "), style::active_tab_style())
        } else {
            Span::styled(format!(" {name} "), style::notice_style())
        }
    };
    Line::from(vec![
        tab("Files", view == SidebarView::Files),
        Span::raw("|"),
        tab("Outline", view == SidebarView::Outline),
    ])
}

fn row_line(pane: &Pane, row: &RowElement, selected: bool) -> Line<'static> {
    let label_style = match pane.tree.node(row.node_id()).map(|node| node.kind()) {
        Some(NodeKind::Directory) => style::directory_style(),
        _ => Style::default(),
    };
    let label_style = if selected {
        label_style.add_modifier(Modifier::REVERSED)
    } else {
        label_style
    };
    Line::from(vec![
        Span::raw(" ".repeat(row.indent as usize)),
        Span::styled(row.icon.glyph(), style::fold_icon_style()),
        Span::styled(row.label().to_string(), label_style),
    ])
}
