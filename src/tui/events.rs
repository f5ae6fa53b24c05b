use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    size as terminal_size,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use std::io;
use std::time::Duration;

use crate::config::KeyBindings;
use crate::tui::App;
use crate::tui::app::{Mode, Tab};
use crate::tui::error::TuiError;
use crate::tui::layout::Layout;
use crate::utils::{ParsedKeyBinding, has_primary_modifier, parse_key_binding};

const POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Guard that restores the terminal even on panic, so a crash never leaves
/// the user's shell in raw mode or on the alternate screen.
struct TerminalGuard {
    raw_mode_enabled: bool,
    alternate_screen_enabled: bool,
}

impl TerminalGuard {
    fn new() -> Result<Self, TuiError> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(Self {
            raw_mode_enabled: true,
            alternate_screen_enabled: true,
        })
    }

    /// Restore on normal exit; the guard does nothing on drop afterwards
    fn restore(&mut self) -> Result<(), TuiError> {
        if self.raw_mode_enabled {
            disable_raw_mode()?;
            self.raw_mode_enabled = false;
        }
        if self.alternate_screen_enabled {
            execute!(io::stdout(), LeaveAlternateScreen)?;
            self.alternate_screen_enabled = false;
        }
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        // Already cleaning up; errors are ignored
        if self.raw_mode_enabled {
            let _ = disable_raw_mode();
        }
        if self.alternate_screen_enabled {
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
        }
    }
}

/// Key bindings parsed once from the config
#[derive(Debug, Clone)]
pub struct KeyMap {
    pub quit: ParsedKeyBinding,
    pub refresh: ParsedKeyBinding,
    pub help: ParsedKeyBinding,
    pub tab_left: ParsedKeyBinding,
    pub tab_right: ParsedKeyBinding,
    pub tab_1: ParsedKeyBinding,
    pub tab_2: ParsedKeyBinding,
    pub tab_3: ParsedKeyBinding,
    pub list_up: ParsedKeyBinding,
    pub list_down: ParsedKeyBinding,
    pub cycle_filter: ParsedKeyBinding,
    pub toggle_sort: ParsedKeyBinding,
    pub clear_filter: ParsedKeyBinding,
    pub mark_taken: ParsedKeyBinding,
    pub snooze: ParsedKeyBinding,
    pub next_field: ParsedKeyBinding,
    pub previous_field: ParsedKeyBinding,
    pub submit: ParsedKeyBinding,
    pub clear_form: ParsedKeyBinding,
    pub leave_form: ParsedKeyBinding,
}

impl KeyMap {
    pub fn from_bindings(bindings: &KeyBindings) -> Result<Self, TuiError> {
        let parse = |name: &str, value: &str| {
            parse_key_binding(value).map_err(|e| TuiError::KeyBindingError(format!("{}: {}", name, e)))
        };
        Ok(Self {
            quit: parse("quit", &bindings.quit)?,
            refresh: parse("refresh", &bindings.refresh)?,
            help: parse("help", &bindings.help)?,
            tab_left: parse("tab_left", &bindings.tab_left)?,
            tab_right: parse("tab_right", &bindings.tab_right)?,
            tab_1: parse("tab_1", &bindings.tab_1)?,
            tab_2: parse("tab_2", &bindings.tab_2)?,
            tab_3: parse("tab_3", &bindings.tab_3)?,
            list_up: parse("list_up", &bindings.list_up)?,
            list_down: parse("list_down", &bindings.list_down)?,
            cycle_filter: parse("cycle_filter", &bindings.cycle_filter)?,
            toggle_sort: parse("toggle_sort", &bindings.toggle_sort)?,
            clear_filter: parse("clear_filter", &bindings.clear_filter)?,
            mark_taken: parse("mark_taken", &bindings.mark_taken)?,
            snooze: parse("snooze", &bindings.snooze)?,
            next_field: parse("next_field", &bindings.next_field)?,
            previous_field: parse("previous_field", &bindings.previous_field)?,
            submit: parse("submit", &bindings.submit)?,
            clear_form: parse("clear_form", &bindings.clear_form)?,
            leave_form: parse("leave_form", &bindings.leave_form)?,
        })
    }
}

pub fn run_event_loop(mut app: App) -> Result<(), TuiError> {
    // Check size before entering the alternate screen so the message is visible
    let (width, height) = terminal_size()?;
    let min_width_with_border = Layout::MIN_WIDTH + 2;
    let min_height_with_border = Layout::MIN_HEIGHT + 2;
    if width < min_width_with_border || height < min_height_with_border {
        return Err(TuiError::RenderError(format!(
            "Terminal size too small. Current: {}x{}, Minimum required: {}x{}. Please resize your terminal window.",
            width, height, min_width_with_border, min_height_with_border
        )));
    }

    let mut guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    app.start();
    tracing::info!(base_url = %app.api.http().base_url(), "dashboard started");

    loop {
        app.check_status_message_timeout();
        app.drain_completions();

        let size = terminal.size()?;
        let terminal_rect = Rect::new(0, 0, size.width, size.height);
        terminal.draw(|f| {
            let layout = Layout::calculate(terminal_rect);
            crate::tui::render::render(f, &mut app, &layout);
        })?;

        if event::poll(POLL_INTERVAL)? {
            match event::read()? {
                // Press only; Windows also reports releases
                Event::Key(key_event) if key_event.kind == KeyEventKind::Press => {
                    if handle_key_event(&mut app, key_event)? {
                        break;
                    }
                }
                // Redrawn on the next iteration
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    guard.restore()?;
    tracing::info!("dashboard closed");
    Ok(())
}

/// Returns `Ok(true)` when the user asked to quit.
pub fn handle_key_event(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    match app.ui.mode {
        Mode::Help => handle_help_mode(app, key_event),
        Mode::Form => handle_form_mode(app, key_event),
        Mode::View => handle_view_mode(app, key_event),
    }
}

fn handle_help_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    if key_event.code == KeyCode::Esc || app.keys.help.matches(&key_event) {
        app.exit_help_mode();
    }
    Ok(false)
}

fn handle_form_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    let keys = &app.keys;

    if keys.help.matches(&key_event) {
        app.enter_help_mode();
    } else if keys.leave_form.matches(&key_event) {
        app.exit_form_mode();
    } else if keys.submit.matches(&key_event) {
        app.submit_user_form();
    } else if keys.clear_form.matches(&key_event) {
        app.clear_user_form();
    } else if keys.next_field.matches(&key_event) || key_event.code == KeyCode::Down {
        app.users.focus_next();
    } else if keys.previous_field.matches(&key_event) || key_event.code == KeyCode::Up {
        app.users.focus_previous();
    } else {
        match key_event.code {
            KeyCode::Backspace => app.users.pop_char(),
            KeyCode::Char(c) if !has_primary_modifier(key_event.modifiers) => app.users.push_char(c),
            _ => {}
        }
    }
    Ok(false)
}

fn handle_view_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    if handle_global_key_bindings(app, key_event) {
        return Ok(app.keys.quit.matches(&key_event));
    }

    let keys = &app.keys;
    match app.ui.current_tab {
        Tab::Dashboard => {
            if keys.mark_taken.matches(&key_event) {
                app.mark_selected_taken();
            } else if keys.snooze.matches(&key_event) {
                app.snooze_selected();
            }
        }
        Tab::Logs => {
            if keys.cycle_filter.matches(&key_event) {
                app.cycle_log_filter();
            } else if keys.toggle_sort.matches(&key_event) {
                app.toggle_log_sort();
            } else if keys.clear_filter.matches(&key_event) {
                app.clear_log_filter();
            }
        }
        Tab::Users => {
            if keys.submit.matches(&key_event) || keys.next_field.matches(&key_event) {
                app.enter_form_mode();
            }
        }
    }
    Ok(false)
}

/// Keys that mean the same thing on every tab. Returns true when handled.
fn handle_global_key_bindings(app: &mut App, key_event: KeyEvent) -> bool {
    let keys = &app.keys;

    if keys.quit.matches(&key_event) {
        return true;
    }
    if keys.help.matches(&key_event) {
        app.enter_help_mode();
    } else if keys.refresh.matches(&key_event) {
        app.refresh_current_tab();
    } else if keys.tab_left.matches(&key_event) {
        app.previous_tab();
    } else if keys.tab_right.matches(&key_event) {
        app.next_tab();
    } else if keys.tab_1.matches(&key_event) {
        app.switch_tab(Tab::Dashboard);
    } else if keys.tab_2.matches(&key_event) {
        app.switch_tab(Tab::Logs);
    } else if keys.tab_3.matches(&key_event) {
        app.switch_tab(Tab::Users);
    } else if keys.list_down.matches(&key_event) || key_event.code == KeyCode::Down {
        app.select_next();
    } else if keys.list_up.matches(&key_event) || key_event.code == KeyCode::Up {
        app.select_previous();
    } else {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;
    use crate::api::{HttpClient, MedTrackApi};
    use crate::views::LogFilter;
    use crate::views::users::Field;
    use crossterm::event::KeyModifiers;
    use tokio::runtime::Handle;

    fn app() -> App {
        let http = HttpClient::new("http://127.0.0.1:9", std::time::Duration::from_secs(1))
            .unwrap()
            .without_observers();
        App::new(Config::default(), MedTrackApi::new(http), Handle::current()).unwrap()
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        handle_key_event(app, KeyEvent::new(code, KeyModifiers::NONE)).unwrap()
    }

    fn type_str(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[tokio::test]
    async fn quit_only_from_view_mode() {
        let mut app = app();
        assert!(press(&mut app, KeyCode::Char('q')));

        app.switch_tab(Tab::Users);
        assert!(!press(&mut app, KeyCode::Char('q')));
        assert_eq!(app.users.input().username, "q");
    }

    #[tokio::test]
    async fn number_keys_jump_between_tabs() {
        let mut app = app();
        press(&mut app, KeyCode::Char('2'));
        assert_eq!(app.ui.current_tab, Tab::Logs);
        assert!(app.logs.state().is_loading());

        press(&mut app, KeyCode::Left);
        assert_eq!(app.ui.current_tab, Tab::Dashboard);
        press(&mut app, KeyCode::Left);
        assert_eq!(app.ui.current_tab, Tab::Dashboard);

        press(&mut app, KeyCode::Char('3'));
        assert_eq!(app.ui.current_tab, Tab::Users);
        assert_eq!(app.ui.mode, Mode::Form);
    }

    #[tokio::test]
    async fn refresh_starts_a_new_generation() {
        let mut app = app();
        app.switch_tab(Tab::Logs);
        let before = app.logs.state().generation();
        press(&mut app, KeyCode::Char('r'));
        assert_eq!(app.logs.state().generation(), before + 1);
    }

    #[tokio::test]
    async fn log_keys_only_apply_on_logs_tab() {
        let mut app = app();
        press(&mut app, KeyCode::Char('f'));
        assert_eq!(app.logs.filter(), LogFilter::All);

        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Char('f'));
        assert_eq!(app.logs.filter(), LogFilter::Dispensed);
        press(&mut app, KeyCode::Char('c'));
        assert_eq!(app.logs.filter(), LogFilter::All);
    }

    #[tokio::test]
    async fn form_keys_edit_move_and_clear() {
        let mut app = app();
        press(&mut app, KeyCode::Char('3'));
        type_str(&mut app, "bobx");
        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Tab);
        type_str(&mut app, "bob@x.com");
        assert_eq!(app.users.value(Field::Username), "bob");
        assert_eq!(app.users.value(Field::Email), "bob@x.com");

        handle_key_event(&mut app, KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT)).unwrap();
        assert_eq!(app.users.focus(), Field::Username);

        handle_key_event(&mut app, KeyEvent::new(KeyCode::Char('l'), KeyModifiers::CONTROL)).unwrap();
        assert_eq!(app.users.value(Field::Email), "");

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.ui.mode, Mode::View);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.ui.mode, Mode::Form);
    }

    #[tokio::test]
    async fn help_opens_and_closes() {
        let mut app = app();
        press(&mut app, KeyCode::F(1));
        assert_eq!(app.ui.mode, Mode::Help);
        assert!(!press(&mut app, KeyCode::Char('q')));
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.ui.mode, Mode::View);
    }

    #[test]
    fn bad_binding_is_reported_by_name() {
        let bindings = KeyBindings {
            refresh: "Hyper+r".to_string(),
            ..KeyBindings::default()
        };
        let err = KeyMap::from_bindings(&bindings).unwrap_err();
        assert!(err.to_string().contains("refresh"));
    }
}
