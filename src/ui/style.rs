//! Colors for rendered markdown and the sidebar.
//!
//! Uses ANSI colors so the terminal's own palette decides the final look.

use ratatui::style::{Color, Modifier, Style};

use crate::document::{InlineStyle, LineType};

/// Get the style for a given line type.
pub fn style_for_line_type(line_type: &LineType) -> Style {
    match line_type {
        LineType::Heading(1) => Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        LineType::Heading(2) => Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD),
        LineType::Heading(3) => Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
        LineType::Heading(4) => Style::default()
            .fg(Color::Blue)
            .add_modifier(Modifier::BOLD),
        LineType::Heading(5) => Style::default()
            .fg(Color::Magenta)
            .add_modifier(Modifier::BOLD),
        LineType::Heading(_) => Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),

        LineType::CodeBlock => Style::default()
            .fg(Color::Indexed(245))
            .add_modifier(Modifier::DIM),

        LineType::BlockQuote => Style::default()
            .fg(Color::Blue)
            .add_modifier(Modifier::ITALIC),

        LineType::HorizontalRule => Style::default()
            .fg(Color::Indexed(240))
            .add_modifier(Modifier::DIM),

        LineType::ListItem(_) | LineType::Table | LineType::Paragraph | LineType::Empty => {
            Style::default()
        }
    }
}

/// Get the style for an inline span, merged with a base line style.
pub fn style_for_inline(base: Style, inline: InlineStyle) -> Style {
    let mut style = base;

    if inline.emphasis {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if inline.strong {
        style = style.add_modifier(Modifier::BOLD);
    }
    if inline.strikethrough {
        style = style.add_modifier(Modifier::CROSSED_OUT);
    }
    if inline.link {
        style = style
            .fg(Color::LightBlue)
            .add_modifier(Modifier::UNDERLINED);
    }
    if inline.code {
        style = style.fg(Color::Red).add_modifier(Modifier::BOLD);
    }

    style
}

/// Background of the highlighted sidebar row.
pub fn active_row_style() -> Style {
    Style::default()
        .bg(Color::Indexed(237))
        .add_modifier(Modifier::BOLD)
}

pub fn active_tab_style() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(Color::Cyan)
        .add_modifier(Modifier::BOLD)
}

pub fn directory_style() -> Style {
    Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD)
}

pub fn fold_icon_style() -> Style {
    Style::default().fg(Color::Indexed(245))
}

pub fn control_style() -> Style {
    Style::default().fg(Color::Yellow)
}

/// Dim text for placeholders and hints.
pub fn notice_style() -> Style {
    Style::default().fg(Color::Indexed(245))
}

pub fn error_style() -> Style {
    Style::default().fg(Color::Red)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_styles_are_bold() {
        for level in 1..=6 {
            let style = style_for_line_type(&LineType::Heading(level));
            assert!(style.add_modifier.contains(Modifier::BOLD));
        }
    }

    #[test]
    fn test_first_heading_is_underlined() {
        let style = style_for_line_type(&LineType::Heading(1));
        assert!(style.add_modifier.contains(Modifier::UNDERLINED));
    }

    #[test]
    fn test_paragraph_style_is_default() {
        assert_eq!(style_for_line_type(&LineType::Paragraph), Style::default());
    }

    #[test]
    fn test_link_style_is_underlined() {
        let inline = InlineStyle {
            link: true,
            ..InlineStyle::default()
        };
        let style = style_for_inline(Style::default(), inline);
        assert!(style.add_modifier.contains(Modifier::UNDERLINED));
        assert_eq!(style.fg, Some(Color::LightBlue));
    }

    #[test]
    fn test_inline_modifiers_stack_on_base() {
        let base = style_for_line_type(&LineType::BlockQuote);
        let inline = InlineStyle {
            strong: true,
            emphasis: true,
            ..InlineStyle::default()
        };
        let style = style_for_inline(base, inline);
        assert!(style.add_modifier.contains(Modifier::BOLD));
        assert!(style.add_modifier.contains(Modifier::ITALIC));
        assert_eq!(style.fg, Some(Color::Blue));
    }
}
