use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Paragraph, Wrap};

use crate::Config;
use crate::tui::widgets::color::parse_color;

const SEPARATOR: &str = " • ";
const ELLIPSIS: &str = "...";

pub fn render_status_bar(
    f: &mut Frame,
    area: Rect,
    message: Option<&String>,
    key_hints: &[String],
    config: &Config,
) {
    let active_theme = config.get_active_theme();
    let max_width = area.width as usize;

    let (content, style) = match message {
        Some(msg) => (
            truncate(msg, max_width),
            Style::default()
                .fg(parse_color(&active_theme.highlight_fg))
                .bg(parse_color(&active_theme.highlight_bg))
                .add_modifier(Modifier::BOLD),
        ),
        None => (
            fit_hints(key_hints, max_width),
            Style::default()
                .fg(parse_color(&active_theme.fg))
                .bg(parse_color(&active_theme.bg)),
        ),
    };

    let paragraph = Paragraph::new(content)
        .style(style)
        .wrap(Wrap { trim: true });

    f.render_widget(paragraph, area);
}

fn truncate(text: &str, max_width: usize) -> String {
    if text.chars().count() <= max_width {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_width.saturating_sub(ELLIPSIS.len())).collect();
    kept + ELLIPSIS
}

/// As many hints as fit, with an ellipsis when some were dropped
pub fn fit_hints(key_hints: &[String], max_width: usize) -> String {
    let mut text = String::new();
    for (i, hint) in key_hints.iter().enumerate() {
        let current_len = text.chars().count();
        let would_be_len = if i == 0 {
            hint.chars().count()
        } else {
            current_len + SEPARATOR.chars().count() + hint.chars().count()
        };

        if would_be_len > max_width {
            if text.is_empty() {
                return truncate(hint, max_width);
            }
            if current_len + ELLIPSIS.len() <= max_width {
                text.push_str(ELLIPSIS);
            } else {
                text = truncate(&text, max_width);
            }
            break;
        }

        if i > 0 {
            text.push_str(SEPARATOR);
        }
        text.push_str(hint);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hints() -> Vec<String> {
        vec!["q: Quit".to_string(), "r: Refresh".to_string(), "F1: Help".to_string()]
    }

    #[test]
    fn all_hints_fit_on_wide_bar() {
        assert_eq!(fit_hints(&hints(), 80), "q: Quit • r: Refresh • F1: Help");
    }

    #[test]
    fn overflow_ends_with_ellipsis() {
        let text = fit_hints(&hints(), 24);
        assert_eq!(text, "q: Quit • r: Refresh...");
        assert!(text.chars().count() <= 24);
    }

    #[test]
    fn long_first_hint_is_cut() {
        let text = fit_hints(&["abcdefghijkl".to_string()], 8);
        assert_eq!(text, "abcde...");
    }
}
