use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::app::{DocState, IndexState, Model, ToastLevel};
use crate::toc::SpyMode;

pub fn render_search_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let Some(search) = model.search.as_ref() else {
        return;
    };
    let query = search.query();
    let match_info = if query.trim().is_empty() {
        String::new()
    } else if let Some((current, total)) = search.position() {
        format!("  [{current}/{total}]")
    } else {
        "  [no matches]".to_string()
    };
    let hint = if search.is_editing() {
        "Enter: search  Esc: clear"
    } else {
        "n/N: next/prev  Esc: clear"
    };
    let text = format!("/{query}{match_info}  {hint}");
    let bar = Paragraph::new(text).style(Style::default().bg(Color::Blue).fg(Color::White));
    frame.render_widget(bar, area);
}

pub fn render_status_bar(model: &Model, frame: &mut Frame, area: Rect) {
    frame.render_widget(
        Paragraph::new(status_text(model))
            .style(Style::default().bg(Color::DarkGray).fg(Color::White)),
        area,
    );
}

pub(super) fn status_text(model: &Model) -> String {
    if let Some(prompt) = model.route_prompt.as_deref() {
        return format!(" :{prompt}_  Enter: open route  Esc: cancel");
    }
    let location = match &model.doc_state {
        DocState::Empty => model.site_label.clone(),
        DocState::Loading { path } => format!("{path} (loading)"),
        DocState::Loaded { .. } => model.router.fragment(),
        DocState::Failed { path, .. } => format!("{path} (failed)"),
    };

    let percent = model.viewport.scroll_percent();
    let total = model.viewport.total_lines();
    let line = if total == 0 {
        0
    } else {
        model.viewport.offset() + 1
    };
    let line_info = format!("Line {line}/{total}");

    let spy = match model.spy.mode() {
        SpyMode::Following => "",
        SpyMode::Locked => " [pinned]",
    };
    let index = match model.index_state {
        IndexState::Loading => " [index loading]",
        IndexState::Unavailable(_) => " [no index]",
        IndexState::Ready { .. } => "",
    };

    format!(" {location}  [{percent}%]  {line_info}{spy}{index}  ?:help")
}

pub fn render_toast_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let Some((message, level)) = model.active_toast() else {
        return;
    };
    let (prefix, style) = match level {
        ToastLevel::Info => (
            "[info]",
            Style::default().bg(Color::DarkGray).fg(Color::White),
        ),
        ToastLevel::Warning => (
            "[warn]",
            Style::default().bg(Color::Yellow).fg(Color::Black),
        ),
        ToastLevel::Error => ("[error]", Style::default().bg(Color::Red).fg(Color::White)),
    };
    let toast = Paragraph::new(format!("{prefix} {message}")).style(style);
    frame.render_widget(toast, area);
}
