use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Flex, Layout, Rect};
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::Config;
use crate::tui::widgets::color::parse_color;
use crate::utils::format_key_binding_for_display as key;

pub fn render_help(f: &mut Frame, area: Rect, config: &Config) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);

    let popup_area = popup_area(area, 60, 70);
    // Keep the view underneath from showing through
    f.render_widget(Clear, popup_area);

    let paragraph = Paragraph::new(build_help_text(config))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help - Key Bindings")
                .title_alignment(Alignment::Center)
                .style(Style::default().fg(fg_color).bg(bg_color)),
        )
        .style(Style::default().fg(fg_color).bg(bg_color))
        .wrap(Wrap { trim: true });

    f.render_widget(paragraph, popup_area);
}

/// Centered rect taking the given percentages of `area`
fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::vertical([Constraint::Percentage(percent_y)]).flex(Flex::Center);
    let horizontal = Layout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center);
    let [area] = vertical.areas(area);
    let [area] = horizontal.areas(area);
    area
}

pub fn build_help_text(config: &Config) -> String {
    let kb = &config.key_bindings;
    let mut text = String::new();

    text.push_str("Navigation:\n");
    text.push_str(&format!("  {} / {}: Previous / next view\n", key(&kb.tab_left), key(&kb.tab_right)));
    text.push_str(&format!(
        "  {} / {} / {}: Dashboard / Logs / Users\n",
        key(&kb.tab_1),
        key(&kb.tab_2),
        key(&kb.tab_3)
    ));
    text.push_str(&format!("  {} / {}: Move selection\n", key(&kb.list_up), key(&kb.list_down)));
    text.push_str(&format!("  {}: Refresh current view\n", key(&kb.refresh)));
    text.push('\n');

    text.push_str("Dashboard:\n");
    text.push_str(&format!("  {}: Mark reminder as taken\n", key(&kb.mark_taken)));
    text.push_str(&format!("  {}: Snooze reminder\n", key(&kb.snooze)));
    text.push('\n');

    text.push_str("Logs:\n");
    text.push_str(&format!("  {}: Cycle status filter\n", key(&kb.cycle_filter)));
    text.push_str(&format!("  {}: Toggle newest / oldest first\n", key(&kb.toggle_sort)));
    text.push_str(&format!("  {}: Clear filter\n", key(&kb.clear_filter)));
    text.push('\n');

    text.push_str("Users:\n");
    text.push_str(&format!(
        "  {} / {}: Next / previous field\n",
        key(&kb.next_field),
        key(&kb.previous_field)
    ));
    text.push_str(&format!("  {}: Create user\n", key(&kb.submit)));
    text.push_str(&format!("  {}: Clear form\n", key(&kb.clear_form)));
    text.push_str(&format!("  {}: Leave form\n", key(&kb.leave_form)));
    text.push('\n');

    text.push_str("General:\n");
    text.push_str(&format!("  {}: Quit\n", key(&kb.quit)));
    text.push_str(&format!("  {}: Show/hide help\n", key(&kb.help)));

    text
}
