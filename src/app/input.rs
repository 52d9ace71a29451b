use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::Frame;
use ratatui::layout::Rect;
use unicode_width::UnicodeWidthStr;

use crate::app::{App, Message, Model, SidebarView};
use crate::document::LinkRef;
use crate::toc::{FoldIcon, ToggleAllLabel};

use super::event_loop::ResizeDebouncer;

impl App {
    pub(super) fn handle_event(
        event: Event,
        model: &Model,
        now_ms: u64,
        resize_debouncer: &mut ResizeDebouncer,
    ) -> Option<Message> {
        match event {
            Event::Key(key) => Self::handle_key(key, model),
            Event::Mouse(mouse) => Self::handle_mouse(mouse, model),
            Event::Resize(w, h) => {
                resize_debouncer.queue(w, h, now_ms);
                None
            }
            _ => None,
        }
    }

    pub(super) fn handle_key(key: KeyEvent, model: &Model) -> Option<Message> {
        if model.help_visible {
            return Some(Message::HideHelp);
        }

        if model.link_picker_active() {
            return match key.code {
                KeyCode::Char(c) if c.is_ascii_digit() && c != '0' => {
                    u8::try_from(c).ok().map(|b| Message::SelectVisibleLink(b - b'0'))
                }
                _ => Some(Message::CancelVisibleLinkPicker),
            };
        }

        if let Some(fragment) = model.route_prompt.as_deref() {
            return match key.code {
                KeyCode::Esc => Some(Message::CancelRoutePrompt),
                KeyCode::Enter => Some(Message::Navigate(fragment.to_string())),
                KeyCode::Backspace => {
                    let mut next = fragment.to_string();
                    next.pop();
                    Some(Message::RouteInput(next))
                }
                KeyCode::Char(c)
                    if !key.modifiers.contains(KeyModifiers::CONTROL)
                        && !key.modifiers.contains(KeyModifiers::ALT) =>
                {
                    let mut next = fragment.to_string();
                    next.push(c);
                    Some(Message::RouteInput(next))
                }
                _ => None,
            };
        }

        if let Some(query) = model.filter_prompt.as_deref() {
            return match key.code {
                KeyCode::Esc => Some(Message::ClearFileFilter),
                KeyCode::Enter => Some(Message::SubmitFileFilter),
                KeyCode::Backspace => {
                    let mut next = query.to_string();
                    next.pop();
                    Some(Message::FileFilterInput(next))
                }
                KeyCode::Char(c)
                    if !key.modifiers.contains(KeyModifiers::CONTROL)
                        && !key.modifiers.contains(KeyModifiers::ALT) =>
                {
                    let mut next = query.to_string();
                    next.push(c);
                    Some(Message::FileFilterInput(next))
                }
                _ => None,
            };
        }

        if let Some(search) = model.search.as_ref().filter(|s| s.is_editing()) {
            return match key.code {
                KeyCode::Esc => Some(Message::ClearSearch),
                KeyCode::Enter => Some(Message::SubmitSearch),
                KeyCode::Backspace => {
                    let mut next = search.query().to_string();
                    next.pop();
                    Some(Message::SearchInput(next))
                }
                KeyCode::Char(c)
                    if !key.modifiers.contains(KeyModifiers::CONTROL)
                        && !key.modifiers.contains(KeyModifiers::ALT) =>
                {
                    let mut next = search.query().to_string();
                    next.push(c);
                    Some(Message::SearchInput(next))
                }
                _ => None,
            };
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c' | 'q') => Some(Message::Quit),
                KeyCode::Char('d') => Some(Message::HalfPageDown),
                KeyCode::Char('u') => Some(Message::HalfPageUp),
                KeyCode::Char('l') => Some(Message::Redraw),
                _ => None,
            };
        }

        // Keys shared by both focus modes
        match key.code {
            KeyCode::Char('q') => return Some(Message::Quit),
            KeyCode::Char('?') | KeyCode::F(1) => return Some(Message::ToggleHelp),
            KeyCode::Char('t') => return Some(Message::ToggleSidebar),
            KeyCode::Char('f') => return Some(Message::ShowFiles),
            KeyCode::Char('F') => return Some(Message::StartFileFilter),
            KeyCode::Char(':') => return Some(Message::StartRoutePrompt),
            KeyCode::Char('o') if model.sidebar_focused => return Some(Message::ShowOutline),
            KeyCode::Char('O') => return Some(Message::ShowOutline),
            KeyCode::Char('a') => return Some(Message::ToggleAll),
            KeyCode::Char('[') => return Some(Message::HistoryBack),
            KeyCode::Char(']') => return Some(Message::HistoryForward),
            KeyCode::Tab | KeyCode::BackTab if model.sidebar_visible => {
                return Some(Message::SwitchFocus);
            }
            _ => {}
        }

        if model.sidebar_focused && model.sidebar_visible {
            return match key.code {
                KeyCode::Char('j') | KeyCode::Down => Some(Message::SidebarDown),
                KeyCode::Char('k') | KeyCode::Up => Some(Message::SidebarUp),
                KeyCode::Char('h') | KeyCode::Left => Some(Message::SidebarCollapse),
                KeyCode::Char('l') | KeyCode::Right => Some(Message::SidebarExpand),
                KeyCode::Char(' ') => Some(Message::SidebarToggleFold),
                KeyCode::Enter => Some(Message::SidebarActivate),
                KeyCode::Esc
                    if model.sidebar_view == SidebarView::Files && model.files.filter.is_some() =>
                {
                    Some(Message::ClearFileFilter)
                }
                KeyCode::Esc => Some(Message::SwitchFocus),
                _ => None,
            };
        }

        match key.code {
            KeyCode::Char('j') | KeyCode::Down => model
                .viewport
                .can_scroll_down()
                .then_some(Message::ScrollDown(1)),
            KeyCode::Char('k') | KeyCode::Up => {
                model.viewport.can_scroll_up().then_some(Message::ScrollUp(1))
            }
            KeyCode::Char(' ') | KeyCode::PageDown => {
                model.viewport.can_scroll_down().then_some(Message::PageDown)
            }
            KeyCode::Char('b') | KeyCode::PageUp => {
                model.viewport.can_scroll_up().then_some(Message::PageUp)
            }
            KeyCode::Char('g') | KeyCode::Home => Some(Message::GoToTop),
            KeyCode::Char('G') | KeyCode::End => Some(Message::GoToBottom),
            KeyCode::Char('o') => Some(Message::OpenVisibleLinks),
            KeyCode::Char('/') => Some(Message::StartSearch),
            KeyCode::Char('n') if model.search.is_some() => Some(Message::NextMatch),
            KeyCode::Char('N') if model.search.is_some() => Some(Message::PrevMatch),
            KeyCode::Esc if model.search.is_some() => Some(Message::ClearSearch),
            _ => None,
        }
    }

    pub(super) fn handle_mouse(mouse: MouseEvent, model: &Model) -> Option<Message> {
        if model.help_visible {
            return None;
        }
        let released = matches!(mouse.kind, MouseEventKind::Up(MouseButton::Left));
        if model.link_picker_active() {
            return released.then_some(Message::CancelVisibleLinkPicker);
        }

        let total = Rect::new(
            0,
            0,
            model.viewport.width(),
            model.viewport.height().saturating_add(1),
        );
        let (sidebar_area, doc_area) = if model.sidebar_visible {
            let chunks = crate::ui::split_main_columns(total);
            (Some(chunks[0]), chunks[1])
        } else {
            (None, total)
        };

        if let Some(area) = sidebar_area.filter(|a| point_in_rect(mouse.column, mouse.row, *a)) {
            return match mouse.kind {
                MouseEventKind::ScrollDown => Some(Message::SidebarScrollDown),
                MouseEventKind::ScrollUp => Some(Message::SidebarScrollUp),
                // Only the release acts, so one physical click is one action.
                MouseEventKind::Up(MouseButton::Left) => sidebar_click(model, area, mouse),
                _ => None,
            };
        }

        let doc_area = Rect {
            height: doc_area
                .height
                .saturating_sub(crate::ui::footer_rows(model)),
            ..doc_area
        };
        match mouse.kind {
            MouseEventKind::ScrollDown => model
                .viewport
                .can_scroll_down()
                .then_some(Message::ScrollDown(3)),
            MouseEventKind::ScrollUp => model.viewport.can_scroll_up().then_some(Message::ScrollUp(3)),
            MouseEventKind::Up(MouseButton::Left)
                if point_in_rect(mouse.column, mouse.row, doc_area) =>
            {
                let line = model.viewport.offset() + usize::from(mouse.row - doc_area.y);
                let col = usize::from(
                    mouse
                        .column
                        .saturating_sub(doc_area.x + crate::ui::DOCUMENT_LEFT_PADDING),
                );
                link_at_column(model, line, col).map(|link| Message::FollowLink(link.url))
            }
            _ => None,
        }
    }

    pub(super) fn view(model: &Model, frame: &mut Frame) {
        crate::ui::render(model, frame);
    }
}

/// Map a click inside the sidebar block to a message.
///
/// The top border holds the pane tabs, the bottom border the toggle-all
/// control, and each inner row is one visible entry: its fold icon slot
/// folds, the rest of the row activates.
fn sidebar_click(model: &Model, area: Rect, mouse: MouseEvent) -> Option<Message> {
    let view = model.sidebar_view;
    let pane = model.active_pane();
    if mouse.row == area.y {
        let middle = area.x + area.width / 2;
        return Some(if mouse.column < middle {
            Message::ShowFiles
        } else {
            Message::ShowOutline
        });
    }
    if mouse.row + 1 >= area.y + area.height {
        return (pane.mount.toggle_all_label() != ToggleAllLabel::Unavailable)
            .then_some(Message::ToggleAll);
    }
    if !pane.tree.listeners_bound() {
        return None;
    }
    let row_idx = pane.scroll.offset() + usize::from(mouse.row - area.y - 1);
    let rows = pane.mount.visible_rows();
    let row = rows.get(row_idx)?;
    let icon_start = area.x + 1 + row.indent;
    let icon_end = icon_start + FoldIcon::SLOT_WIDTH;
    let id = row.node_id().to_string();
    if row.interactive && mouse.column >= icon_start && mouse.column < icon_end {
        Some(Message::FoldClick(view, id))
    } else {
        Some(Message::EntryClick(view, id))
    }
}

const fn point_in_rect(col: u16, row: u16, rect: Rect) -> bool {
    col >= rect.x && col < rect.x + rect.width && row >= rect.y && row < rect.y + rect.height
}

/// The link drawn at display column `col` of rendered line `line`.
///
/// Links are recorded against the first line of their block, so the
/// candidate is the closest link at or above the line whose text contains
/// the clicked fragment.
fn link_at_column(model: &Model, line: usize, col: usize) -> Option<LinkRef> {
    let spans = model.document.line_at(line)?.spans()?;
    let mut start = 0usize;
    for span in spans {
        let width = span.text().width();
        if col >= start && col < start + width {
            if !span.style().link {
                return None;
            }
            let fragment = span.text().trim();
            return model
                .document
                .links()
                .iter()
                .filter(|link| link.line <= line && link.text.contains(fragment))
                .max_by_key(|link| link.line)
                .cloned();
        }
        start += width;
    }
    None
}
