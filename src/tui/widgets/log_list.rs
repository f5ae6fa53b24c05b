use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, List, ListItem, ListState, Paragraph, Scrollbar, ScrollbarOrientation,
    ScrollbarState, Wrap,
};

use crate::Config;
use crate::tui::widgets::color::{badge_color, parse_color};
use crate::tui::widgets::reminder_list::failure_lines;
use crate::utils::format_key_binding_for_display;
use crate::views::LogsView;
use crate::views::logs::LogRow;

pub fn render_log_list(
    f: &mut Frame,
    area: Rect,
    view: &LogsView,
    list_state: &mut ListState,
    config: &Config,
) {
    let theme = config.get_active_theme();
    let fg_color = parse_color(&theme.fg);
    let bg_color = parse_color(&theme.bg);
    let title = if view.loading {
        "Dispensing Logs".to_string()
    } else {
        format!("Dispensing Logs ({})", view.count_label())
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .style(Style::default().fg(fg_color).bg(bg_color));

    let kb = &config.key_bindings;
    let placeholder = |lines: Vec<Line<'static>>| {
        Paragraph::new(lines)
            .block(block.clone())
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
    };

    if view.loading {
        f.render_widget(placeholder(vec![Line::from("Loading logs...")]), area);
        return;
    }
    if let Some(failure) = &view.failure {
        let lines = failure_lines(&failure.message(), failure.timed_out, config);
        f.render_widget(placeholder(lines), area);
        return;
    }
    if let Some(empty) = &view.empty {
        let mut lines = vec![Line::from(empty.message.clone())];
        if empty.offer_clear_filter {
            lines.push(Line::from(""));
            lines.push(Line::from(format!(
                "Press {} to show all logs",
                format_key_binding_for_display(&kb.clear_filter)
            )));
        }
        f.render_widget(placeholder(lines), area);
        return;
    }

    let max_width = area.width.saturating_sub(4) as usize;
    let items: Vec<ListItem> = view
        .rows
        .iter()
        .map(|row| row_item(row, max_width, config))
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

    // Rows are several lines tall; the bar tracks the selected entry
    if view.rows.len() > 1 {
        let mut scrollbar_state =
            ScrollbarState::new(view.rows.len()).position(list_state.selected().unwrap_or(0));
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(None)
            .end_symbol(None);
        f.render_stateful_widget(scrollbar, area, &mut scrollbar_state);
    }
}

fn row_item(row: &LogRow, max_width: usize, config: &Config) -> ListItem<'static> {
    let theme = config.get_active_theme();
    let badge_style = Style::default()
        .fg(badge_color(row.badge.kind, &theme))
        .add_modifier(Modifier::BOLD);

    let first = Line::from(vec![
        Span::styled(format!("{} {}", row.badge.kind.icon(), row.badge.text), badge_style),
        Span::raw("  "),
        Span::styled(
            row.pill_name.clone().unwrap_or_else(|| "Unknown pill".to_string()),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("  {} {}", row.date, row.time)),
    ]);

    let mut meta = Vec::new();
    if let Some(id) = &row.id {
        meta.push(format!("#{}", id));
    }
    if let Some(user) = &row.user_id {
        meta.push(format!("User: {}", user));
    }
    if let Some(device) = &row.device_id {
        meta.push(format!("Device: {}", device));
    }
    meta.push(format!("Logged {}", row.logged));

    let mut lines = vec![first, Line::from(clip(&format!("   {}", meta.join(" | ")), max_width))];
    if let Some(notes) = &row.notes {
        lines.push(Line::styled(
            clip(&format!("   Notes: {}", notes), max_width),
            Style::default().add_modifier(Modifier::ITALIC),
        ));
    }
    ListItem::new(lines)
}

fn clip(text: &str, max_width: usize) -> String {
    if text.chars().count() > max_width {
        text.chars().take(max_width.saturating_sub(3)).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
