use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::Config;
use crate::tui::widgets::color::parse_color;
use crate::views::users::BannerKind;
use crate::views::{CreateUserForm, Field};

const CURSOR: &str = "█";

/// Create-user form. `editing` is true while keystrokes go into the form.
pub fn render_user_form(f: &mut Frame, area: Rect, form: &CreateUserForm, editing: bool, config: &Config) {
    if area.width < 2 || area.height < 2 {
        return;
    }

    let theme = config.get_active_theme();
    let fg_color = parse_color(&theme.fg);
    let bg_color = parse_color(&theme.bg);
    let error_color = parse_color(&theme.error);
    let highlight_style = Style::default()
        .bg(parse_color(&theme.highlight_bg))
        .fg(parse_color(&theme.highlight_fg));
    let inactive_field_style = Style::default().fg(fg_color).add_modifier(Modifier::DIM);

    let outer = Block::default()
        .borders(Borders::ALL)
        .title("Create New User")
        .style(Style::default().fg(fg_color).bg(bg_color));
    let inner = outer.inner(area);
    f.render_widget(outer, area);

    // Banner line, then each field grows by its error count
    let mut constraints = vec![Constraint::Length(1)];
    constraints.extend(
        Field::ALL
            .iter()
            .map(|field| Constraint::Length(3 + form.errors().get(*field).len() as u16)),
    );
    constraints.push(Constraint::Min(0));
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    let banner = if form.is_submitting() {
        Line::styled("Creating user...", Style::default().add_modifier(Modifier::ITALIC))
    } else if let Some(banner) = form.banner() {
        let color = match banner.kind {
            BannerKind::Success => parse_color(&theme.success),
            BannerKind::Error => error_color,
        };
        Line::styled(
            banner.message.clone(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )
    } else {
        Line::from("")
    };
    f.render_widget(Paragraph::new(banner).wrap(Wrap { trim: true }), rows[0]);

    for (i, field) in Field::ALL.iter().enumerate() {
        let active = editing && form.focus() == *field;
        let style = if active { highlight_style } else { inactive_field_style };

        let mut lines = vec![Line::styled(display_value(form, *field, active), style)];
        lines.extend(
            form.errors()
                .get(*field)
                .iter()
                .map(|message| Line::styled(format!("• {}", message), Style::default().fg(error_color))),
        );

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(format!("{} *", field.label())));
        f.render_widget(paragraph, rows[i + 1]);
    }
}

/// Field text as drawn; the password is masked
pub fn display_value(form: &CreateUserForm, field: Field, active: bool) -> String {
    let value = form.value(field);
    let mut text = match field {
        Field::Password => "*".repeat(value.chars().count()),
        _ => value.to_string(),
    };
    if active {
        text.push_str(CURSOR);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_is_masked_and_cursor_follows_focus() {
        let mut form = CreateUserForm::new();
        form.set_field(Field::Username, "bob");
        form.set_field(Field::Password, "Secret1!");

        assert_eq!(display_value(&form, Field::Username, true), "bob█");
        assert_eq!(display_value(&form, Field::Password, false), "********");
        assert_eq!(display_value(&form, Field::Email, false), "");
    }
}
