use tracing::debug;

use crate::app::Model;
use crate::app::model::ToastLevel;
use crate::fetch::FetchOutcome;
use crate::route::Route;
use crate::search::SearchState;
use crate::toc::NodeKind;

use super::sidebar::SidebarView;

/// All possible events and actions in the application.
///
/// These represent user input, completed fetches and internal actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    // Document navigation
    /// Scroll up by n lines
    ScrollUp(usize),
    /// Scroll down by n lines
    ScrollDown(usize),
    PageUp,
    PageDown,
    HalfPageUp,
    HalfPageDown,
    GoToTop,
    GoToBottom,

    // Sidebar
    /// Show or hide the sidebar
    ToggleSidebar,
    /// Show the file tree
    ShowFiles,
    /// Show the page outline
    ShowOutline,
    /// Switch keyboard focus between sidebar and document
    SwitchFocus,
    /// Move the selection up one visible row
    SidebarUp,
    /// Move the selection down one visible row
    SidebarDown,
    SidebarScrollUp,
    SidebarScrollDown,
    /// Collapse the selected entry, or step to its parent
    SidebarCollapse,
    /// Expand the selected entry, or step into its first child
    SidebarExpand,
    /// Flip the selected entry's fold state
    SidebarToggleFold,
    /// Open, fold or pin the selected entry
    SidebarActivate,
    /// Expand or collapse the whole shown tree
    ToggleAll,
    /// Open the file filter prompt
    StartFileFilter,
    /// Update the file filter being typed
    FileFilterInput(String),
    /// Close the prompt, keep the filter and focus the file tree
    SubmitFileFilter,
    /// Drop the file filter
    ClearFileFilter,
    /// Fold icon clicked
    FoldClick(SidebarView, String),
    /// Entry label clicked
    EntryClick(SidebarView, String),

    // Links and routing
    /// Offer the links on screen (or follow the only one)
    OpenVisibleLinks,
    /// Follow numbered link in the picker
    SelectVisibleLink(u8),
    CancelVisibleLinkPicker,
    /// Follow a link target from the document
    FollowLink(String),
    /// The address fragment changed
    Navigate(String),
    /// Open the prompt for typing a route fragment
    StartRoutePrompt,
    /// Update the route fragment being typed
    RouteInput(String),
    CancelRoutePrompt,
    HistoryBack,
    HistoryForward,
    /// A background fetch finished
    FetchCompleted(FetchOutcome),

    // Search
    StartSearch,
    /// Update the query being typed
    SearchInput(String),
    /// Run the query, however short, and close the prompt
    SubmitSearch,
    NextMatch,
    PrevMatch,
    ClearSearch,

    // Window
    ToggleHelp,
    HideHelp,
    /// Terminal resized
    Resize(u16, u16),
    Redraw,
    Quit,
}

/// Update the model based on a message.
///
/// All state transitions happen here. Work that leaves the process is
/// queued on the model as effects for the runtime to execute.
pub fn update(mut model: Model, msg: Message) -> Model {
    match msg {
        Message::ScrollUp(n) => model.viewport.scroll_up(n),
        Message::ScrollDown(n) => model.viewport.scroll_down(n),
        Message::PageUp => model.viewport.page_up(),
        Message::PageDown => model.viewport.page_down(),
        Message::HalfPageUp => model.viewport.half_page_up(),
        Message::HalfPageDown => model.viewport.half_page_down(),
        Message::GoToTop => model.viewport.go_to_top(),
        Message::GoToBottom => model.viewport.go_to_bottom(),

        Message::ToggleSidebar => {
            model.sidebar_visible = !model.sidebar_visible;
            if !model.sidebar_visible {
                model.sidebar_focused = false;
            }
            model.reflow();
        }
        Message::ShowFiles => show_view(&mut model, SidebarView::Files),
        Message::ShowOutline => show_view(&mut model, SidebarView::Outline),
        Message::SwitchFocus => {
            if model.sidebar_visible {
                model.sidebar_focused = !model.sidebar_focused;
                if model.sidebar_focused {
                    ensure_selection(&mut model);
                }
            }
        }
        Message::SidebarUp => model.pane_mut(model.sidebar_view).move_selection(-1),
        Message::SidebarDown => model.pane_mut(model.sidebar_view).move_selection(1),
        Message::SidebarScrollUp => model.pane_mut(model.sidebar_view).scroll.scroll_up(3),
        Message::SidebarScrollDown => model.pane_mut(model.sidebar_view).scroll.scroll_down(3),
        Message::SidebarCollapse => collapse_or_ascend(&mut model),
        Message::SidebarExpand => expand_or_descend(&mut model),
        Message::SidebarToggleFold => {
            if let Some(id) = model.active_pane().selected.clone() {
                model.toggle_fold(model.sidebar_view, &id);
            }
        }
        Message::SidebarActivate => {
            if let Some(id) = model.active_pane().selected.clone() {
                model.activate(model.sidebar_view, &id);
            }
        }
        Message::ToggleAll => model.toggle_all(),
        Message::StartFileFilter => {
            model.filter_prompt = Some(model.files.filter.clone().unwrap_or_default());
            show_view(&mut model, SidebarView::Files);
        }
        Message::FileFilterInput(query) => model.filter_files(query),
        Message::SubmitFileFilter => {
            model.filter_prompt = None;
            if model.sidebar_visible {
                model.sidebar_focused = true;
                // Rows must reflect the filter before picking a selection.
                model.refresh_sidebar();
                let first_hit = model
                    .files
                    .filter
                    .as_deref()
                    .and_then(|query| model.files.tree.filter_hits(query).into_iter().next());
                match first_hit {
                    Some(id) => model.files.select(&id),
                    None => ensure_selection(&mut model),
                }
            }
        }
        Message::ClearFileFilter => model.clear_file_filter(),
        Message::FoldClick(view, id) => model.toggle_fold(view, &id),
        Message::EntryClick(view, id) => model.activate(view, &id),

        Message::OpenVisibleLinks => {
            let mut visible = model.visible_links();
            visible.truncate(9);
            match visible.len() {
                0 => model.show_toast(ToastLevel::Info, "No visible links"),
                1 => model.follow_link(&visible[0].url),
                _ => model.link_picker_items = visible,
            }
        }
        Message::SelectVisibleLink(index) => {
            let picked = usize::from(index)
                .checked_sub(1)
                .and_then(|idx| model.link_picker_items.get(idx))
                .map(|link| link.url.clone());
            model.link_picker_items.clear();
            if let Some(url) = picked {
                model.follow_link(&url);
            }
        }
        Message::CancelVisibleLinkPicker => model.link_picker_items.clear(),
        Message::FollowLink(url) => model.follow_link(&url),
        Message::Navigate(fragment) => {
            model.route_prompt = None;
            match model.router.navigate(&fragment) {
                Some(route) => model.show_route(route),
                None if !fragment.trim().is_empty() && Route::parse(&fragment).is_none() => {
                    model.show_toast(ToastLevel::Warning, format!("Not a route: {fragment}"));
                }
                None => {}
            }
        }
        Message::StartRoutePrompt => model.route_prompt = Some(model.router.fragment()),
        Message::RouteInput(fragment) => model.route_prompt = Some(fragment),
        Message::CancelRoutePrompt => model.route_prompt = None,
        Message::HistoryBack => match model.router.back() {
            Some(route) => model.show_route(route),
            None => model.show_toast(ToastLevel::Info, "No earlier page"),
        },
        Message::HistoryForward => match model.router.forward() {
            Some(route) => model.show_route(route),
            None => model.show_toast(ToastLevel::Info, "No later page"),
        },
        Message::FetchCompleted(outcome) => model.apply_fetch(outcome),

        Message::StartSearch => model.search = Some(SearchState::start()),
        Message::SearchInput(query) => {
            let line = model
                .search
                .as_mut()
                .and_then(|search| search.set_query(&model.document, query, false));
            if let Some(line) = line {
                model.viewport.go_to_line(line);
            }
        }
        Message::SubmitSearch => {
            let line = model.search.as_mut().and_then(|search| {
                search.finish_editing();
                let query = search.query().to_string();
                search.set_query(&model.document, query, true)
            });
            match line {
                Some(line) => model.viewport.go_to_line(line),
                None if model.search.is_some() => {
                    model.show_toast(ToastLevel::Info, "No matches");
                }
                None => {}
            }
        }
        Message::NextMatch => {
            if let Some(line) = model.search.as_mut().and_then(SearchState::next_match) {
                model.viewport.go_to_line(line);
            }
        }
        Message::PrevMatch => {
            if let Some(line) = model.search.as_mut().and_then(SearchState::prev_match) {
                model.viewport.go_to_line(line);
            }
        }
        Message::ClearSearch => model.search = None,

        Message::ToggleHelp => model.help_visible = !model.help_visible,
        Message::HideHelp => model.help_visible = false,
        Message::Resize(width, height) => {
            model.viewport.resize(width, height.saturating_sub(1));
            model.resize_panes();
            model.reflow();
        }
        Message::Redraw => {}
        Message::Quit => model.should_quit = true,
    }

    model.refresh_sidebar();
    model
}

fn show_view(model: &mut Model, view: SidebarView) {
    model.show_sidebar_view(view);
    if model.sidebar_focused {
        ensure_selection(model);
    }
    model.reflow();
}

/// Give the shown pane a selection: the highlighted entry if there is one,
/// otherwise the first visible row.
fn ensure_selection(model: &mut Model) {
    let view = model.sidebar_view;
    if model.active_pane().selected.is_some() {
        return;
    }
    let highlighted = model
        .active_pane()
        .mount
        .visible_rows()
        .iter()
        .find(|row| row.active)
        .map(|row| row.node_id().to_string());
    let pane = model.pane_mut(view);
    match highlighted {
        Some(id) => pane.select(&id),
        None => pane.move_selection(0),
    }
}

fn collapse_or_ascend(model: &mut Model) {
    let view = model.sidebar_view;
    let pane = model.pane_mut(view);
    let Some(node) = pane.selected_node() else {
        return;
    };
    let id = node.id().to_string();
    if node.is_expanded() {
        pane.tree.collapse(&id);
    } else if let Some(parent) = node.parent_id().map(str::to_string) {
        pane.select(&parent);
    } else {
        debug!(%id, "already at a root");
    }
}

fn expand_or_descend(model: &mut Model) {
    let view = model.sidebar_view;
    let pane = model.pane_mut(view);
    let Some(node) = pane.selected_node() else {
        return;
    };
    let id = node.id().to_string();
    let collapsed = node.has_children() && !node.is_expanded();
    let first_child = node.children().first().cloned();
    let openable = matches!(node.kind(), NodeKind::Heading { .. } | NodeKind::File { .. });
    if collapsed {
        pane.tree.expand(&id);
    } else if let Some(child) = first_child {
        // The child's row only becomes visible on sync.
        pane.sync(None);
        pane.select(&child);
    } else if openable {
        model.activate(view, &id);
    }
}
