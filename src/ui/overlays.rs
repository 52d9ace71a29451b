use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph};

use crate::app::Model;

pub fn link_picker_rect(area: Rect, items_len: usize) -> Rect {
    let popup_width = area.width.saturating_sub(16).max(44);
    // At most nine links are offered
    #[allow(clippy::cast_possible_truncation)]
    let needed_rows = (items_len as u16 * 2) + 5;
    let popup_height = needed_rows.min(area.height.saturating_sub(4).max(8));
    centered_popup_rect(popup_width, popup_height, area)
}

pub fn render_link_picker_overlay(model: &Model, frame: &mut Frame, area: Rect) {
    let items = &model.link_picker_items;
    if items.is_empty() {
        return;
    }
    let popup = link_picker_rect(area, items.len());

    let mut lines: Vec<Line> = Vec::new();
    for (idx, link) in items.iter().enumerate() {
        let title = if link.text.trim().is_empty() {
            "(untitled link)"
        } else {
            link.text.as_str()
        };
        lines.push(Line::from(vec![
            Span::raw("   "),
            Span::styled(
                format!("{}: ", idx + 1),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                title.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]));
        let target = if link.is_external() {
            format!("{} (external)", link.url)
        } else {
            link.url.clone()
        };
        lines.push(Line::from(vec![
            Span::raw("      "),
            Span::styled(target, Style::default().fg(Color::Cyan)),
        ]));
    }
    lines.push(Line::raw(" "));
    lines.push(Line::from(vec![
        Span::raw("   "),
        Span::styled(
            "1-9 follow · any other key cancels",
            Style::default().fg(Color::Indexed(245)),
        ),
    ]));

    let block = Block::default()
        .title("Links on screen")
        .borders(Borders::ALL)
        .padding(Padding::uniform(1))
        .style(Style::default().bg(Color::Black).fg(Color::White));
    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

pub(super) fn help_lines(model: &Model) -> Vec<Line<'static>> {
    let global_cfg = model
        .config_global_path
        .as_ref()
        .map_or_else(|| "<unknown>".to_string(), |p| p.display().to_string());
    let local_cfg = model
        .config_local_path
        .as_ref()
        .map_or_else(|| "<none>".to_string(), |p| p.display().to_string());

    let section_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::styled("Document", section_style));
    lines.push(Line::raw("  j/k or Up/Down      Scroll"));
    lines.push(Line::raw("  Space/PageDown      Page down"));
    lines.push(Line::raw("  b/PageUp            Page up"));
    lines.push(Line::raw("  Ctrl-d / Ctrl-u     Half page"));
    lines.push(Line::raw("  g / G               Top / bottom"));
    lines.push(Line::raw("  o                   Follow a link on screen (1-9)"));
    lines.push(Line::raw("  [ / ]               Back / forward"));
    lines.push(Line::raw("  :                   Open a route (doc=path&anchor=id)"));
    lines.push(Line::raw(""));

    lines.push(Line::styled("Search", section_style));
    lines.push(Line::raw("  /                   Start search"));
    lines.push(Line::raw("  Enter               Submit"));
    lines.push(Line::raw("  n / N               Next / previous match"));
    lines.push(Line::raw("  Esc                 Clear search"));
    lines.push(Line::raw(""));

    lines.push(Line::styled("Sidebar", section_style));
    lines.push(Line::raw("  t                   Show / hide sidebar"));
    lines.push(Line::raw("  f / O               Files / outline"));
    lines.push(Line::raw("  Tab                 Switch focus"));
    lines.push(Line::raw("  j/k, Enter          Move, open"));
    lines.push(Line::raw("  h / l               Collapse / expand"));
    lines.push(Line::raw("  Space               Toggle fold"));
    lines.push(Line::raw("  a                   Expand / collapse all"));
    lines.push(Line::raw("  F                   Filter files by title or path (Esc clears)"));
    lines.push(Line::raw("  Mouse               Click arrows to fold, labels to open"));
    lines.push(Line::raw(""));

    lines.push(Line::styled("Other", section_style));
    lines.push(Line::raw("  q / Ctrl-c / Ctrl-q Quit"));
    lines.push(Line::raw("  ? / F1              Toggle help"));
    lines.push(Line::raw("  Ctrl-l              Redraw"));
    lines.push(Line::raw(""));

    lines.push(Line::styled("Config", section_style));
    lines.push(Line::raw(format!("  Global: {global_cfg}")));
    lines.push(Line::raw(format!("  Local override: {local_cfg}")));

    lines
}

pub fn render_help_overlay(model: &Model, frame: &mut Frame, area: Rect) {
    let popup_width = area.width.saturating_sub(12).max(48);
    let popup_height = area.height.saturating_sub(4).max(12);
    let popup = centered_popup_rect(popup_width, popup_height, area);

    let block = Block::default()
        .title("Help")
        .borders(Borders::ALL)
        .padding(Padding::uniform(1))
        .style(Style::default().bg(Color::Black).fg(Color::White));

    frame.render_widget(Clear, popup);
    frame.render_widget(block, popup);

    // Inner area: border(1) + padding(1) on each side
    let inner = Rect::new(
        popup.x + 2,
        popup.y + 2,
        popup.width.saturating_sub(4),
        popup.height.saturating_sub(4),
    );

    // Reserve the last row for the footer hint
    let content_height = inner.height.saturating_sub(1);
    let lines: Vec<Line> = help_lines(model)
        .into_iter()
        .take(content_height as usize)
        .collect();
    let content_area = Rect::new(inner.x, inner.y, inner.width, content_height);
    frame.render_widget(Paragraph::new(lines), content_area);

    let footer_area = Rect::new(inner.x, inner.y + content_height, inner.width, 1);
    let footer = Line::styled("Any key closes", Style::default().fg(Color::Indexed(245)));
    frame.render_widget(Paragraph::new(footer), footer_area);
}

fn centered_popup_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(w) / 2);
    let y = area.y + (area.height.saturating_sub(h) / 2);
    Rect::new(x, y, w, h)
}
