use chrono::{Duration, NaiveDateTime, NaiveTime};

use crate::api::{ApiError, MedTrackApi};
use crate::models::{Listing, Reminder};
use crate::views::fetch::{FetchState, Generation};

/// Urgency of a reminder relative to the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeStatus {
    Overdue,
    Upcoming,
    Scheduled,
}

impl TimeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeStatus::Overdue => "overdue",
            TimeStatus::Upcoming => "upcoming",
            TimeStatus::Scheduled => "scheduled",
        }
    }

    /// Badge text shown on the card.
    pub fn label(&self) -> &'static str {
        match self {
            TimeStatus::Overdue => "Overdue",
            TimeStatus::Upcoming => "Soon",
            TimeStatus::Scheduled => "Scheduled",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            TimeStatus::Overdue => "⏰",
            TimeStatus::Upcoming => "🔔",
            TimeStatus::Scheduled => "📅",
        }
    }
}

const UPCOMING_WINDOW_MINUTES: i64 = 60;

const TIME_FORMATS: &[&str] = &["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M:%S %p"];

/// Parses a time of day such as `08:00`, `20:15:30` or `8:05 PM`.
pub fn parse_time_of_day(time: &str) -> Option<NaiveTime> {
    let time = time.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(time, fmt).ok())
}

/// Classifies `time` (a time of day on `now`'s date) against `now`.
/// Unparseable input is `Scheduled`.
pub fn time_status(time: &str, now: NaiveDateTime) -> TimeStatus {
    let Some(time_of_day) = parse_time_of_day(time) else {
        return TimeStatus::Scheduled;
    };
    let due = now.date().and_time(time_of_day);

    if due < now {
        TimeStatus::Overdue
    } else if due - now <= Duration::minutes(UPCOMING_WINDOW_MINUTES) {
        TimeStatus::Upcoming
    } else {
        TimeStatus::Scheduled
    }
}

/// 12-hour `HH:MM AM/PM`; the input comes back unchanged if it does not parse.
pub fn format_time(time: &str) -> String {
    match parse_time_of_day(time) {
        Some(t) => t.format("%I:%M %p").to_string(),
        None => time.to_string(),
    }
}

/// Everything a reminder card shows, derived once per render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderCard {
    pub name: String,
    pub time: String,
    pub status: TimeStatus,
    pub dosage: Option<String>,
    pub instructions: Option<String>,
}

impl ReminderCard {
    pub fn from_reminder(reminder: &Reminder, now: NaiveDateTime) -> Self {
        let raw_time = reminder.time.as_deref().unwrap_or_default();
        Self {
            name: reminder.display_name().to_string(),
            time: format_time(raw_time),
            status: time_status(raw_time, now),
            dosage: reminder.dosage.clone().filter(|s| !s.is_empty()),
            instructions: reminder.instructions.clone().filter(|s| !s.is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardView {
    Loading,
    Failed { message: String, timed_out: bool },
    Empty,
    Cards(Vec<ReminderCard>),
}

pub struct DashboardController {
    state: FetchState<Reminder>,
}

impl DashboardController {
    pub const FAILURE_MESSAGE: &'static str = "Failed to fetch pill reminders. Please try again later.";
    pub const EMPTY_TITLE: &'static str = "No Reminders Today";
    pub const EMPTY_MESSAGE: &'static str = "You don't have any pill reminders scheduled for today.";

    pub fn new() -> Self {
        Self {
            state: FetchState::new(Self::FAILURE_MESSAGE),
        }
    }

    /// Start of a load (on entry or refresh).
    pub fn begin_refresh(&mut self) -> Generation {
        self.state.begin()
    }

    pub fn complete(&mut self, generation: Generation, result: Result<Listing<Reminder>, ApiError>) -> bool {
        self.state.complete(generation, result.map(Listing::into_vec))
    }

    /// Full load cycle awaited in place.
    pub async fn refresh(&mut self, api: &MedTrackApi) {
        let generation = self.begin_refresh();
        let result = api.get_reminders(None).await;
        self.complete(generation, result);
    }

    pub fn state(&self) -> &FetchState<Reminder> {
        &self.state
    }

    pub fn cards(&self, now: NaiveDateTime) -> Vec<ReminderCard> {
        self.state
            .items()
            .iter()
            .map(|r| ReminderCard::from_reminder(r, now))
            .collect()
    }

    pub fn view(&self, now: NaiveDateTime) -> DashboardView {
        if self.state.is_loading() {
            return DashboardView::Loading;
        }
        if let Some(failure) = self.state.failure() {
            return DashboardView::Failed {
                message: failure.message(),
                timed_out: failure.timed_out,
            };
        }
        let cards = self.cards(now);
        if cards.is_empty() {
            DashboardView::Empty
        } else {
            DashboardView::Cards(cards)
        }
    }
}

impl Default for DashboardController {
    fn default() -> Self {
        Self::new()
    }
}
