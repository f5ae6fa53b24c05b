use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use clap::ValueEnum;
use serde_json::Value;
use std::cmp::Ordering;

use crate::api::{ApiError, MedTrackApi};
use crate::models::{Listing, Log, boolean_like};
use crate::views::fetch::{FetchState, Generation, LoadFailure};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFilter {
    #[default]
    All,
    Dispensed,
    NotDispensed,
}

impl LogFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFilter::All => "all",
            LogFilter::Dispensed => "dispensed",
            LogFilter::NotDispensed => "not-dispensed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LogFilter::All => "All Logs",
            LogFilter::Dispensed => "Dispensed Only",
            LogFilter::NotDispensed => "Not Dispensed Only",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            LogFilter::All => LogFilter::Dispensed,
            LogFilter::Dispensed => LogFilter::NotDispensed,
            LogFilter::NotDispensed => LogFilter::All,
        }
    }

    pub fn matches(&self, log: &Log) -> bool {
        match self {
            LogFilter::All => true,
            LogFilter::Dispensed => boolean_like(&log.pill_dispensed) == Some(true),
            LogFilter::NotDispensed => boolean_like(&log.pill_dispensed) == Some(false),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn label(&self) -> &'static str {
        match self {
            SortOrder::Asc => "Oldest First",
            SortOrder::Desc => "Newest First",
        }
    }

    pub fn toggle(&self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeKind {
    Success,
    Error,
    Warning,
}

impl BadgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeKind::Success => "success",
            BadgeKind::Error => "error",
            BadgeKind::Warning => "warning",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            BadgeKind::Success => "✅",
            BadgeKind::Error => "❌",
            BadgeKind::Warning => "⚠️",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusBadge {
    pub text: &'static str,
    pub kind: BadgeKind,
}

pub fn status_badge(pill_dispensed: &Value) -> StatusBadge {
    match boolean_like(pill_dispensed) {
        Some(true) => StatusBadge {
            text: "Dispensed",
            kind: BadgeKind::Success,
        },
        Some(false) => StatusBadge {
            text: "Not Dispensed",
            kind: BadgeKind::Error,
        },
        None => StatusBadge {
            text: "Unknown",
            kind: BadgeKind::Warning,
        },
    }
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// ISO-ish datetime in local time. Offsets are converted to local.
pub fn parse_log_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// `("Mar 4, 2024", "08:05 AM")`, or `("Invalid Date", "Invalid Time")`.
pub fn format_date_time(raw: Option<&str>) -> (String, String) {
    match raw.and_then(parse_log_datetime) {
        Some(dt) => (
            dt.format("%b %-d, %Y").to_string(),
            dt.format("%I:%M %p").to_string(),
        ),
        None => ("Invalid Date".to_string(), "Invalid Time".to_string()),
    }
}

/// "Logged …" age relative to `now`.
pub fn relative_age(raw: Option<&str>, now: NaiveDateTime) -> String {
    let Some(at) = raw.and_then(parse_log_datetime) else {
        return "recently".to_string();
    };
    let elapsed = now - at;
    let plural = |n: i64, unit: &str| {
        if n == 1 {
            format!("1 {} ago", unit)
        } else {
            format!("{} {}s ago", n, unit)
        }
    };
    if elapsed.num_minutes() < 1 {
        "just now".to_string()
    } else if elapsed.num_hours() < 1 {
        plural(elapsed.num_minutes(), "minute")
    } else if elapsed.num_days() < 1 {
        plural(elapsed.num_hours(), "hour")
    } else {
        plural(elapsed.num_days(), "day")
    }
}

pub fn filter_logs<'a>(logs: &'a [Log], filter: LogFilter) -> Vec<&'a Log> {
    logs.iter().filter(|log| filter.matches(log)).collect()
}

/// Stable sort on `time ?? timestamp`. Undated entries come first when
/// ascending and last when descending.
pub fn sort_logs(logs: &mut [&Log], order: SortOrder) {
    let key = |log: &Log| log.logged_at().and_then(parse_log_datetime);
    logs.sort_by(|a, b| {
        let ordering: Ordering = key(a).cmp(&key(b));
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

/// One rendered log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRow {
    pub id: Option<String>,
    pub user_id: Option<String>,
    pub pill_name: Option<String>,
    pub badge: StatusBadge,
    pub date: String,
    pub time: String,
    pub notes: Option<String>,
    pub device_id: Option<String>,
    pub logged: String,
}

impl LogRow {
    pub fn from_log(log: &Log, now: NaiveDateTime) -> Self {
        let (date, time) = format_date_time(log.logged_at());
        Self {
            id: log.id.as_ref().map(ToString::to_string),
            user_id: log.user_id.as_ref().map(ToString::to_string),
            pill_name: log.pill_name.clone().filter(|s| !s.is_empty()),
            badge: status_badge(&log.pill_dispensed),
            date,
            time,
            notes: log.notes.clone().filter(|s| !s.is_empty()),
            device_id: log.device_id.clone().filter(|s| !s.is_empty()),
            logged: relative_age(log.logged_at(), now),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyState {
    pub message: String,
    /// A filter is hiding logs; offer a one-step reset.
    pub offer_clear_filter: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogsView {
    pub loading: bool,
    pub failure: Option<LoadFailure>,
    pub rows: Vec<LogRow>,
    pub shown: usize,
    pub total: usize,
    pub empty: Option<EmptyState>,
}

impl LogsView {
    pub fn count_label(&self) -> String {
        format!("{} of {} logs", self.shown, self.total)
    }
}

pub struct LogsController {
    state: FetchState<Log>,
    filter: LogFilter,
    sort: SortOrder,
}

impl LogsController {
    pub const FAILURE_MESSAGE: &'static str = "Failed to fetch dispensing logs. Please try again later.";
    pub const NO_LOGS_MESSAGE: &'static str = "No dispensing logs are available yet.";

    pub fn new() -> Self {
        Self {
            state: FetchState::new(Self::FAILURE_MESSAGE),
            filter: LogFilter::default(),
            sort: SortOrder::default(),
        }
    }

    pub fn begin_refresh(&mut self) -> Generation {
        self.state.begin()
    }

    pub fn complete(&mut self, generation: Generation, result: Result<Listing<Log>, ApiError>) -> bool {
        self.state.complete(generation, result.map(Listing::into_vec))
    }

    pub async fn refresh(&mut self, api: &MedTrackApi) {
        let generation = self.begin_refresh();
        let result = api.get_logs(None).await;
        self.complete(generation, result);
    }

    pub fn state(&self) -> &FetchState<Log> {
        &self.state
    }

    pub fn filter(&self) -> LogFilter {
        self.filter
    }

    pub fn sort(&self) -> SortOrder {
        self.sort
    }

    // Filter and sort only change what is derived from the fetched list.

    pub fn set_filter(&mut self, filter: LogFilter) {
        self.filter = filter;
    }

    pub fn cycle_filter(&mut self) {
        self.filter = self.filter.next();
    }

    pub fn clear_filter(&mut self) {
        self.filter = LogFilter::All;
    }

    pub fn set_sort(&mut self, sort: SortOrder) {
        self.sort = sort;
    }

    pub fn toggle_sort(&mut self) {
        self.sort = self.sort.toggle();
    }

    /// Filtered then sorted references into the fetched list.
    pub fn visible(&self) -> Vec<&Log> {
        let mut visible = filter_logs(self.state.items(), self.filter);
        sort_logs(&mut visible, self.sort);
        visible
    }

    pub fn view(&self, now: NaiveDateTime) -> LogsView {
        let visible = self.visible();
        let rows: Vec<LogRow> = visible.iter().map(|log| LogRow::from_log(log, now)).collect();
        let empty = if rows.is_empty() && !self.state.is_loading() {
            Some(self.empty_state())
        } else {
            None
        };
        LogsView {
            loading: self.state.is_loading(),
            failure: self.state.failure().cloned(),
            shown: rows.len(),
            total: self.state.items().len(),
            rows,
            empty,
        }
    }

    fn empty_state(&self) -> EmptyState {
        match self.filter {
            LogFilter::All => EmptyState {
                message: Self::NO_LOGS_MESSAGE.to_string(),
                offer_clear_filter: false,
            },
            filter => EmptyState {
                message: format!(
                    "No logs found for the selected filter: {}.",
                    filter.as_str().replace('-', " ")
                ),
                offer_clear_filter: true,
            },
        }
    }
}

impl Default for LogsController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn log(id: i64, dispensed: Value, at: Option<&str>) -> Log {
        Log {
            id: Some(id.into()),
            user_id: Some(1.into()),
            timestamp: at.map(str::to_string),
            pill_dispensed: dispensed,
            ..Default::default()
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn sample() -> Vec<Log> {
        vec![
            log(1, json!(true), Some("2024-03-01T08:00:00")),
            log(2, json!("no"), Some("2024-03-03T08:00:00")),
            log(3, json!("maybe"), Some("2024-03-02T08:00:00")),
            log(4, json!("1"), Some("2024-03-04T08:00:00")),
            log(5, json!(0), None),
        ]
    }

    fn ids(logs: &[&Log]) -> Vec<String> {
        logs.iter()
            .map(|l| l.id.as_ref().map(ToString::to_string).unwrap_or_default())
            .collect()
    }

    #[test]
    fn badge_for_truthy_falsy_and_unknown() {
        for v in [json!(true), json!("true"), json!("yes"), json!("1")] {
            assert_eq!(
                status_badge(&v),
                StatusBadge { text: "Dispensed", kind: BadgeKind::Success }
            );
        }
        for v in [json!(false), json!("false"), json!("no"), json!("0")] {
            assert_eq!(
                status_badge(&v),
                StatusBadge { text: "Not Dispensed", kind: BadgeKind::Error }
            );
        }
        for v in [Value::Null, json!("pending"), json!([])] {
            assert_eq!(status_badge(&v).kind, BadgeKind::Warning);
            assert_eq!(status_badge(&v).text, "Unknown");
        }
    }

    #[test]
    fn dispensed_and_not_dispensed_do_not_overlap() {
        let logs = sample();
        let dispensed = filter_logs(&logs, LogFilter::Dispensed);
        let not_dispensed = filter_logs(&logs, LogFilter::NotDispensed);
        let all = filter_logs(&logs, LogFilter::All);

        assert_eq!(ids(&dispensed), vec!["1", "4"]);
        assert_eq!(ids(&not_dispensed), vec!["2", "5"]);
        assert_eq!(all.len(), logs.len());
        assert!(dispensed.iter().all(|d| !not_dispensed.contains(d)));
    }

    #[test]
    fn desc_reversed_equals_asc() {
        let logs: Vec<Log> = sample().into_iter().filter(|l| l.timestamp.is_some()).collect();
        let mut asc: Vec<&Log> = logs.iter().collect();
        sort_logs(&mut asc, SortOrder::Asc);
        let mut desc: Vec<&Log> = logs.iter().collect();
        sort_logs(&mut desc, SortOrder::Desc);
        desc.reverse();

        assert_eq!(ids(&asc), vec!["1", "3", "2", "4"]);
        assert_eq!(ids(&asc), ids(&desc));
    }

    #[test]
    fn undated_logs_sort_to_the_old_end() {
        let logs = sample();
        let mut asc: Vec<&Log> = logs.iter().collect();
        sort_logs(&mut asc, SortOrder::Asc);
        assert_eq!(ids(&asc)[0], "5");

        let mut desc: Vec<&Log> = logs.iter().collect();
        sort_logs(&mut desc, SortOrder::Desc);
        assert_eq!(ids(&desc).last().map(String::as_str), Some("5"));
    }

    #[test]
    fn time_field_wins_for_sorting() {
        let mut early = log(1, json!(true), Some("2024-03-05T08:00:00"));
        early.time = Some("2024-01-01T08:00:00".to_string());
        let late = log(2, json!(true), Some("2024-02-01T08:00:00"));
        let logs = vec![late, early];
        let mut asc: Vec<&Log> = logs.iter().collect();
        sort_logs(&mut asc, SortOrder::Asc);
        assert_eq!(ids(&asc), vec!["1", "2"]);
    }

    #[test]
    fn formats_dates_or_reports_invalid() {
        assert_eq!(
            format_date_time(Some("2024-03-04T08:05:00")),
            ("Mar 4, 2024".to_string(), "08:05 AM".to_string())
        );
        assert_eq!(
            format_date_time(Some("2024-03-04 17:30:12.123456")),
            ("Mar 4, 2024".to_string(), "05:30 PM".to_string())
        );
        assert_eq!(
            format_date_time(Some("yesterday")),
            ("Invalid Date".to_string(), "Invalid Time".to_string())
        );
        assert_eq!(
            format_date_time(None),
            ("Invalid Date".to_string(), "Invalid Time".to_string())
        );
    }

    #[test]
    fn relative_age_buckets() {
        assert_eq!(relative_age(Some("2024-03-04T11:59:30"), now()), "just now");
        assert_eq!(relative_age(Some("2024-03-04T11:59:00"), now()), "1 minute ago");
        assert_eq!(relative_age(Some("2024-03-04T11:15:00"), now()), "45 minutes ago");
        assert_eq!(relative_age(Some("2024-03-04T09:00:00"), now()), "3 hours ago");
        assert_eq!(relative_age(Some("2024-03-01T12:00:00"), now()), "3 days ago");
        assert_eq!(relative_age(Some("garbage"), now()), "recently");
    }

    #[test]
    fn filter_and_sort_never_touch_the_fetch_state() {
        let mut controller = LogsController::new();
        let g = controller.begin_refresh();
        controller.complete(g, Ok(Listing(sample())));
        let generation = controller.state().generation();

        controller.set_filter(LogFilter::Dispensed);
        controller.toggle_sort();
        controller.cycle_filter();

        assert_eq!(controller.state().generation(), generation);
        assert_eq!(controller.filter(), LogFilter::NotDispensed);
        assert_eq!(controller.sort(), SortOrder::Asc);
        assert_eq!(ids(&controller.visible()), vec!["5", "2"]);
    }

    #[test]
    fn count_reports_filtered_of_total() {
        let mut controller = LogsController::new();
        let g = controller.begin_refresh();
        controller.complete(g, Ok(Listing(sample())));
        controller.set_filter(LogFilter::Dispensed);

        let view = controller.view(now());
        assert_eq!(view.count_label(), "2 of 5 logs");
        assert_eq!(view.rows[0].id.as_deref(), Some("4"));
        assert_eq!(view.rows[0].badge.kind, BadgeKind::Success);
        assert!(view.empty.is_none());
    }

    #[test]
    fn empty_messages_distinguish_filter_from_no_data() {
        let mut controller = LogsController::new();
        let g = controller.begin_refresh();
        controller.complete(g, Ok(Listing(vec![])));

        let view = controller.view(now());
        assert_eq!(
            view.empty,
            Some(EmptyState {
                message: "No dispensing logs are available yet.".to_string(),
                offer_clear_filter: false,
            })
        );

        let g = controller.begin_refresh();
        controller.complete(g, Ok(Listing(vec![log(1, json!(true), None)])));
        controller.set_filter(LogFilter::NotDispensed);
        let view = controller.view(now());
        assert_eq!(
            view.empty,
            Some(EmptyState {
                message: "No logs found for the selected filter: not dispensed.".to_string(),
                offer_clear_filter: true,
            })
        );

        controller.clear_filter();
        assert_eq!(controller.view(now()).shown, 1);
    }
}
