use crate::Config;
use crate::api::{ApiResult, MedTrackApi};
use crate::models::{Listing, Log, Reminder};
use crate::tui::error::TuiError;
use crate::tui::events::KeyMap;
use crate::views::{CreateUserForm, DashboardController, Generation, LogsController};
use ratatui::widgets::ListState;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

const SNOOZE_MINUTES: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Dashboard,
    Logs,
    Users,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Dashboard, Tab::Logs, Tab::Users];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Dashboard => "Dashboard",
            Tab::Logs => "Logs",
            Tab::Users => "Users",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Tab::Dashboard => 0,
            Tab::Logs => 1,
            Tab::Users => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    View,
    /// Keystrokes go into the create-user form
    Form,
    Help,
}

#[derive(Debug, Clone)]
pub struct UiState {
    pub current_tab: Tab,
    pub mode: Mode,
    pub reminder_list: ListState,
    pub log_list: ListState,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            current_tab: Tab::Dashboard,
            mode: Mode::View,
            reminder_list: ListState::default(),
            log_list: ListState::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatusState {
    pub message: Option<String>,
    pub message_time: Option<Instant>,
}

/// Result of a background request, applied on the UI thread.
#[derive(Debug)]
pub enum Completion {
    Reminders {
        generation: Generation,
        result: ApiResult<Listing<Reminder>>,
    },
    Logs {
        generation: Generation,
        result: ApiResult<Listing<Log>>,
    },
    UserCreated(ApiResult<Value>),
}

pub struct App {
    pub config: Config,
    pub keys: KeyMap,
    pub api: Arc<MedTrackApi>,

    // One controller per view
    pub dashboard: DashboardController,
    pub logs: LogsController,
    pub users: CreateUserForm,

    pub ui: UiState,
    pub status: StatusState,

    runtime: Handle,
    completions_tx: UnboundedSender<Completion>,
    completions_rx: UnboundedReceiver<Completion>,
}

impl App {
    pub fn new(config: Config, api: MedTrackApi, runtime: Handle) -> Result<Self, TuiError> {
        let keys = KeyMap::from_bindings(&config.key_bindings)?;
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Ok(Self {
            config,
            keys,
            api: Arc::new(api),
            dashboard: DashboardController::new(),
            logs: LogsController::new(),
            users: CreateUserForm::new(),
            ui: UiState::default(),
            status: StatusState::default(),
            runtime,
            completions_tx,
            completions_rx,
        })
    }

    /// Loads the initial tab.
    pub fn start(&mut self) {
        self.switch_tab(self.ui.current_tab);
    }

    /// Switch tabs. Dashboard and Logs fetch on every entry.
    pub fn switch_tab(&mut self, new_tab: Tab) {
        self.ui.current_tab = new_tab;
        match new_tab {
            Tab::Dashboard => {
                self.ui.mode = Mode::View;
                self.refresh_dashboard();
            }
            Tab::Logs => {
                self.ui.mode = Mode::View;
                self.refresh_logs();
            }
            Tab::Users => {
                self.ui.mode = Mode::Form;
            }
        }
    }

    pub fn next_tab(&mut self) {
        match self.ui.current_tab {
            Tab::Dashboard => self.switch_tab(Tab::Logs),
            Tab::Logs => self.switch_tab(Tab::Users),
            Tab::Users => {}
        }
    }

    pub fn previous_tab(&mut self) {
        match self.ui.current_tab {
            Tab::Dashboard => {}
            Tab::Logs => self.switch_tab(Tab::Dashboard),
            Tab::Users => self.switch_tab(Tab::Logs),
        }
    }

    /// Refresh / retry for the current tab.
    pub fn refresh_current_tab(&mut self) {
        match self.ui.current_tab {
            Tab::Dashboard => self.refresh_dashboard(),
            Tab::Logs => self.refresh_logs(),
            Tab::Users => {}
        }
    }

    pub fn refresh_dashboard(&mut self) {
        let generation = self.dashboard.begin_refresh();
        let api = Arc::clone(&self.api);
        let tx = self.completions_tx.clone();
        self.runtime.spawn(async move {
            let result = api.get_reminders(None).await;
            let _ = tx.send(Completion::Reminders { generation, result });
        });
    }

    pub fn refresh_logs(&mut self) {
        let generation = self.logs.begin_refresh();
        let api = Arc::clone(&self.api);
        let tx = self.completions_tx.clone();
        self.runtime.spawn(async move {
            let result = api.get_logs(None).await;
            let _ = tx.send(Completion::Logs { generation, result });
        });
    }

    /// Validates locally and, if the form is valid and idle, sends it.
    pub fn submit_user_form(&mut self) {
        if self.users.is_submitting() {
            return;
        }
        let Some(input) = self.users.begin_submit() else {
            let problems = self.users.errors().count();
            self.set_status_message(format!("Please fix {} problem(s) in the form", problems));
            return;
        };
        let api = Arc::clone(&self.api);
        let tx = self.completions_tx.clone();
        self.runtime.spawn(async move {
            let result = api.create_user(&input).await;
            let _ = tx.send(Completion::UserCreated(result));
        });
    }

    pub fn clear_user_form(&mut self) {
        self.users.clear();
    }

    /// Applies every completion that has arrived since the last frame.
    pub fn drain_completions(&mut self) {
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.apply_completion(completion);
        }
    }

    pub fn apply_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Reminders { generation, result } => {
                if self.dashboard.complete(generation, result) {
                    let len = self.dashboard.state().items().len();
                    clamp_selection(&mut self.ui.reminder_list, len);
                }
            }
            Completion::Logs { generation, result } => {
                if self.logs.complete(generation, result) {
                    self.clamp_log_selection();
                }
            }
            Completion::UserCreated(result) => {
                // The banner carries the outcome; the status bar echoes it.
                let _ = self.users.complete_submit(result);
                let message = self.users.banner().map(|banner| banner.message.clone());
                if let Some(message) = message {
                    self.set_status_message(message);
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) async fn next_completion(&mut self) -> Option<Completion> {
        self.completions_rx.recv().await
    }

    // Selection

    pub fn select_next(&mut self) {
        match self.ui.current_tab {
            Tab::Dashboard => {
                let len = self.dashboard.state().items().len();
                step_selection(&mut self.ui.reminder_list, len, 1);
            }
            Tab::Logs => {
                let len = self.logs.visible().len();
                step_selection(&mut self.ui.log_list, len, 1);
            }
            Tab::Users => self.users.focus_next(),
        }
    }

    pub fn select_previous(&mut self) {
        match self.ui.current_tab {
            Tab::Dashboard => {
                let len = self.dashboard.state().items().len();
                step_selection(&mut self.ui.reminder_list, len, -1);
            }
            Tab::Logs => {
                let len = self.logs.visible().len();
                step_selection(&mut self.ui.log_list, len, -1);
            }
            Tab::Users => self.users.focus_previous(),
        }
    }

    pub fn selected_reminder(&self) -> Option<&Reminder> {
        self.ui
            .reminder_list
            .selected()
            .and_then(|i| self.dashboard.state().items().get(i))
    }

    /// Acknowledged locally only; nothing is sent to the backend.
    pub fn mark_selected_taken(&mut self) {
        let message = match self.selected_reminder() {
            Some(reminder) => format!("Marked {} as taken", reminder.display_name()),
            None => "No reminder selected".to_string(),
        };
        self.set_status_message(message);
    }

    /// Acknowledged locally only; nothing is sent to the backend.
    pub fn snooze_selected(&mut self) {
        let message = match self.selected_reminder() {
            Some(reminder) => format!(
                "Snoozed {} for {} minutes",
                reminder.display_name(),
                SNOOZE_MINUTES
            ),
            None => "No reminder selected".to_string(),
        };
        self.set_status_message(message);
    }

    // Log filter / sort never refetch

    pub fn cycle_log_filter(&mut self) {
        self.logs.cycle_filter();
        self.ui.log_list.select(None);
        self.clamp_log_selection();
        self.set_status_message(format!("Filter: {}", self.logs.filter().label()));
    }

    pub fn toggle_log_sort(&mut self) {
        self.logs.toggle_sort();
        self.ui.log_list.select(None);
        self.clamp_log_selection();
        self.set_status_message(format!("Sort: {}", self.logs.sort().label()));
    }

    pub fn clear_log_filter(&mut self) {
        self.logs.clear_filter();
        self.clamp_log_selection();
        self.set_status_message("Filter cleared".to_string());
    }

    fn clamp_log_selection(&mut self) {
        let len = self.logs.visible().len();
        clamp_selection(&mut self.ui.log_list, len);
    }

    // Modes

    pub fn enter_help_mode(&mut self) {
        self.ui.mode = Mode::Help;
    }

    /// Back to the form on the Users tab, otherwise back to viewing.
    pub fn exit_help_mode(&mut self) {
        self.ui.mode = if self.ui.current_tab == Tab::Users {
            Mode::Form
        } else {
            Mode::View
        };
    }

    pub fn enter_form_mode(&mut self) {
        if self.ui.current_tab == Tab::Users {
            self.ui.mode = Mode::Form;
        }
    }

    pub fn exit_form_mode(&mut self) {
        self.ui.mode = Mode::View;
    }

    // Status bar

    pub fn set_status_message(&mut self, message: String) {
        self.status.message = Some(message);
        self.status.message_time = Some(Instant::now());
    }

    pub fn clear_status_message(&mut self) {
        self.status.message = None;
        self.status.message_time = None;
    }

    /// Auto-clear the status message after 3 seconds
    pub fn check_status_message_timeout(&mut self) {
        const STATUS_MESSAGE_TIMEOUT_SECS: u64 = 3;
        if let Some(time) = self.status.message_time {
            if time.elapsed().as_secs() >= STATUS_MESSAGE_TIMEOUT_SECS {
                self.clear_status_message();
            }
        }
    }
}

/// Keeps a selection inside `0..len`, selecting the first row when nothing is.
fn clamp_selection(state: &mut ListState, len: usize) {
    if len == 0 {
        state.select(None);
        return;
    }
    let index = state.selected().unwrap_or(0).min(len - 1);
    state.select(Some(index));
}

fn step_selection(state: &mut ListState, len: usize, delta: isize) {
    if len == 0 {
        state.select(None);
        return;
    }
    let current = state.selected().unwrap_or(0) as isize;
    let next = (current + delta).clamp(0, len as isize - 1);
    state.select(Some(next as usize));
}
