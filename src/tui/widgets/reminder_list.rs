use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use crate::Config;
use crate::tui::widgets::color::{parse_color, time_status_color};
use crate::utils::format_key_binding_for_display;
use crate::views::{DashboardController, DashboardView, ReminderCard};

const TITLE: &str = "Today's Pill Reminders";

pub fn render_reminder_list(
    f: &mut Frame,
    area: Rect,
    view: &DashboardView,
    list_state: &mut ListState,
    config: &Config,
) {
    let theme = config.get_active_theme();
    let fg_color = parse_color(&theme.fg);
    let bg_color = parse_color(&theme.bg);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(TITLE)
        .style(Style::default().fg(fg_color).bg(bg_color));

    let placeholder = |lines: Vec<Line<'static>>| {
        Paragraph::new(lines)
            .block(block.clone())
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
    };

    match view {
        DashboardView::Loading => {
            f.render_widget(placeholder(vec![Line::from("Loading reminders...")]), area);
        }
        DashboardView::Failed { message, timed_out } => {
            f.render_widget(placeholder(failure_lines(message, *timed_out, config)), area);
        }
        DashboardView::Empty => {
            let lines = vec![
                Line::styled(
                    DashboardController::EMPTY_TITLE,
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Line::from(DashboardController::EMPTY_MESSAGE),
            ];
            f.render_widget(placeholder(lines), area);
        }
        DashboardView::Cards(cards) => {
            let max_width = area.width.saturating_sub(4) as usize;
            let items: Vec<ListItem> = cards
                .iter()
                .map(|card| card_item(card, max_width, config))
                .collect();

            let list = List::new(items)
                .block(block)
                .highlight_style(
                    Style::default()
                        .fg(parse_color(&theme.highlight_fg))
                        .bg(parse_color(&theme.highlight_bg)),
                )
                .highlight_symbol("> ");
            f.render_stateful_widget(list, area, list_state);
        }
    }
}

/// Error text, a timeout note when the server never answered, and the retry key
pub fn failure_lines(message: &str, timed_out: bool, config: &Config) -> Vec<Line<'static>> {
    let theme = config.get_active_theme();
    let mut lines = vec![Line::styled(
        message.to_string(),
        Style::default().fg(parse_color(&theme.error)),
    )];
    if timed_out {
        lines.push(Line::styled(
            format!("No answer within {}s.", config.api.timeout_secs),
            Style::default().fg(parse_color(&theme.warning)),
        ));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(format!(
        "Press {} to try again",
        format_key_binding_for_display(&config.key_bindings.refresh)
    )));
    lines
}

/// Name and status on the first line, dose details below
fn card_item(card: &ReminderCard, max_width: usize, config: &Config) -> ListItem<'static> {
    let theme = config.get_active_theme();
    let status_style = Style::default()
        .fg(time_status_color(card.status, &theme))
        .add_modifier(Modifier::BOLD);

    let first = Line::from(vec![
        Span::styled(format!("{} ", card.status.icon()), status_style),
        Span::styled(card.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!("  {}  ", card.time)),
        Span::styled(format!("[{}]", card.status.label()), status_style),
    ]);

    let mut details = Vec::new();
    if let Some(dosage) = &card.dosage {
        details.push(format!("Dosage: {}", dosage));
    }
    if let Some(instructions) = &card.instructions {
        details.push(format!("Instructions: {}", instructions));
    }

    let mut lines = vec![first];
    if !details.is_empty() {
        let mut second = format!("   {}", details.join(" | "));
        if second.chars().count() > max_width {
            second = second.chars().take(max_width.saturating_sub(3)).collect::<String>() + "...";
        }
        lines.push(Line::from(second));
    }
    ListItem::new(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(lines: &[Line]) -> Vec<String> {
        lines.iter().map(|line| line.to_string()).collect()
    }

    #[test]
    fn timeout_adds_a_wait_note_before_the_retry_hint() {
        let config = Config::default();
        let lines = failure_lines("Failed.", true, &config);
        assert_eq!(
            text(&lines),
            vec!["Failed.", "No answer within 10s.", "", "Press r to try again"]
        );

        let lines = failure_lines("Failed.", false, &config);
        assert_eq!(text(&lines), vec!["Failed.", "", "Press r to try again"]);
    }
}
