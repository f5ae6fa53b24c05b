use chrono::{Local, NaiveDateTime};
use ratatui::Frame;
use ratatui::layout::Alignment;
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders};

use crate::tui::app::{Mode, Tab};
use crate::tui::widgets::{
    color::parse_color, help::render_help, log_list::render_log_list,
    reminder_list::render_reminder_list, status_bar::render_status_bar,
    summary_box::render_summary_box, tabs::render_tabs, user_form::render_user_form,
};
use crate::tui::{App, Layout};
use crate::utils::format_key_binding_for_display as key;
use crate::views::{DashboardView, TimeStatus};

pub fn render(f: &mut Frame, app: &mut App, layout: &Layout) {
    let now = Local::now().naive_local();

    let active_theme = app.config.get_active_theme();
    let outer_block = Block::default()
        .borders(Borders::ALL)
        .title("MediTrack+")
        .title_alignment(Alignment::Center)
        .style(
            Style::default()
                .fg(parse_color(&active_theme.fg))
                .bg(parse_color(&active_theme.bg)),
        );
    f.render_widget(outer_block, f.area());

    render_tabs(f, layout.tabs_area, app.ui.current_tab, &app.config);

    match app.ui.current_tab {
        Tab::Dashboard => {
            let view = app.dashboard.view(now);
            render_reminder_list(f, layout.main_area, &view, &mut app.ui.reminder_list, &app.config);
        }
        Tab::Logs => {
            let view = app.logs.view(now);
            render_log_list(f, layout.main_area, &view, &mut app.ui.log_list, &app.config);
        }
        Tab::Users => {
            let editing = app.ui.mode == Mode::Form;
            render_user_form(f, layout.main_area, &app.users, editing, &app.config);
        }
    }

    let (title, text) = summary(app, now);
    render_summary_box(f, layout.summary_area, title, &text, &app.config);

    // Overlay after normal content
    if app.ui.mode == Mode::Help {
        render_help(f, f.area(), &app.config);
    }

    let key_hints = get_key_hints(app);
    render_status_bar(f, layout.status_area, app.status.message.as_ref(), &key_hints, &app.config);
}

/// Title and one-line text for the box under the current view
pub fn summary(app: &App, now: NaiveDateTime) -> (&'static str, String) {
    match app.ui.current_tab {
        Tab::Dashboard => {
            let text = match app.dashboard.view(now) {
                DashboardView::Loading => "Loading...".to_string(),
                DashboardView::Failed { .. } => "Reminders unavailable".to_string(),
                DashboardView::Empty => "0 reminders today".to_string(),
                DashboardView::Cards(cards) => {
                    let count = |status| cards.iter().filter(|c| c.status == status).count();
                    format!(
                        "{} reminders today | {} overdue | {} due soon",
                        cards.len(),
                        count(TimeStatus::Overdue),
                        count(TimeStatus::Upcoming)
                    )
                }
            };
            ("Today", text)
        }
        Tab::Logs => {
            let view = app.logs.view(now);
            let mut text = format!(
                "Filter: {} | Sort: {}",
                app.logs.filter().label(),
                app.logs.sort().label()
            );
            if !view.loading && view.failure.is_none() {
                text.push_str(&format!(" | {}", view.count_label()));
            }
            ("Filters", text)
        }
        Tab::Users => {
            let problems = app.users.errors().count();
            let text = if problems > 0 {
                format!("{} problem(s) to fix", problems)
            } else {
                "Fields marked * are required".to_string()
            };
            ("New user", text)
        }
    }
}

fn get_key_hints(app: &App) -> Vec<String> {
    let kb = &app.config.key_bindings;
    match app.ui.mode {
        Mode::Help => vec![format!("Esc or {}: Exit help", key(&kb.help))],
        Mode::Form => vec![
            format!("{}: Create", key(&kb.submit)),
            format!("{}/{}: Next/previous field", key(&kb.next_field), key(&kb.previous_field)),
            format!("{}: Clear", key(&kb.clear_form)),
            format!("{}: Leave form", key(&kb.leave_form)),
            format!("{}: Help", key(&kb.help)),
        ],
        Mode::View => {
            let mut hints = vec![
                format!("{}: Quit", key(&kb.quit)),
                format!("{}/{}: Switch view", key(&kb.tab_left), key(&kb.tab_right)),
                format!("{}: Refresh", key(&kb.refresh)),
            ];
            match app.ui.current_tab {
                Tab::Dashboard => {
                    hints.push(format!("{}: Taken", key(&kb.mark_taken)));
                    hints.push(format!("{}: Snooze", key(&kb.snooze)));
                }
                Tab::Logs => {
                    hints.push(format!("{}: Filter", key(&kb.cycle_filter)));
                    hints.push(format!("{}: Sort", key(&kb.toggle_sort)));
                    hints.push(format!("{}: Clear filter", key(&kb.clear_filter)));
                }
                Tab::Users => {
                    hints.push(format!("{}: Edit form", key(&kb.submit)));
                }
            }
            hints.push(format!("{}: Help", key(&kb.help)));
            hints
        }
    }
}
