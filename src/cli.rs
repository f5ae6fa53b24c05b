use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::io::Write;
use std::str::FromStr;
use thiserror::Error;

use crate::api::{ApiError, MedTrackApi};
use crate::models::{DispenseRequest, RecordId};
use crate::views::users::Field;
use crate::views::{
    CreateUserForm, DashboardController, DashboardView, LogFilter, LogsController, SortOrder,
    SubmitError,
};

#[derive(Parser)]
#[command(name = "meditrack")]
#[command(about = "MediTrack+ - terminal dashboard for a medication dispenser")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (separate dev config and log directory)
    #[arg(long)]
    pub dev: bool,

    /// Backend base URL, overrides the config file
    #[arg(long, env = "MEDITRACK_API_URL")]
    pub api_url: Option<String>,

    /// Request timeout in seconds, overrides the config file
    #[arg(long, env = "MEDITRACK_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch interactive TUI (default if no subcommand)
    Tui,
    /// Check that the backend is reachable
    Health,
    /// Look up an RFID card UID
    CheckUid {
        uid: String,
    },
    /// Print today's reminders with their time status
    Reminders {
        /// Only reminders for this user
        #[arg(long, value_parser = RecordId::from_str)]
        user: Option<RecordId>,
    },
    /// Print dispensing logs
    Logs {
        #[arg(long, value_enum, default_value_t = LogFilter::All)]
        filter: LogFilter,
        #[arg(long, value_enum, default_value_t = SortOrder::Desc)]
        sort: SortOrder,
        /// Only logs for this user
        #[arg(long, value_parser = RecordId::from_str)]
        user: Option<RecordId>,
    },
    /// Validate and create a user
    AddUser {
        username: String,
        email: String,
        password: String,
    },
    /// Record a dispensing event
    Dispense {
        #[arg(long, value_parser = RecordId::from_str)]
        user: RecordId,
        #[arg(long, value_parser = RecordId::from_str)]
        pill: Option<RecordId>,
        #[arg(long)]
        device: Option<String>,
    },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Submit(#[from] SubmitError),
    #[error("{0}")]
    Load(String),
    #[error("{0}")]
    Unreachable(String),
    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

/// Handle the health command
pub async fn handle_health(api: &MedTrackApi, out: &mut impl Write) -> Result<(), CliError> {
    let report = api.test_connection().await;
    if report.success {
        writeln!(out, "✅ {} ({})", report.message, api.http().base_url())?;
        Ok(())
    } else {
        Err(CliError::Unreachable(report.message))
    }
}

/// Handle the check-uid command
pub async fn handle_check_uid(api: &MedTrackApi, uid: &str, out: &mut impl Write) -> Result<(), CliError> {
    let result = api.check_uid(uid).await?;
    let shown = match &result {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    writeln!(out, "UID {}: {}", uid, shown)?;
    Ok(())
}

/// Handle the reminders command
pub async fn handle_reminders(
    api: &MedTrackApi,
    user: Option<&RecordId>,
    now: NaiveDateTime,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let mut dashboard = DashboardController::new();
    let generation = dashboard.begin_refresh();
    let result = api.get_reminders(user).await;
    dashboard.complete(generation, result);

    match dashboard.view(now) {
        DashboardView::Loading => {}
        DashboardView::Failed { message, .. } => return Err(CliError::Load(message)),
        DashboardView::Empty => {
            writeln!(out, "{}", DashboardController::EMPTY_TITLE)?;
            writeln!(out, "{}", DashboardController::EMPTY_MESSAGE)?;
        }
        DashboardView::Cards(cards) => {
            for card in cards {
                write!(
                    out,
                    "{} {:<8}  {:<24} [{}]",
                    card.status.icon(),
                    card.time,
                    card.name,
                    card.status.label()
                )?;
                if let Some(dosage) = &card.dosage {
                    write!(out, "  {}", dosage)?;
                }
                writeln!(out)?;
                if let Some(instructions) = &card.instructions {
                    writeln!(out, "    {}", instructions)?;
                }
            }
        }
    }
    Ok(())
}

/// Handle the logs command
pub async fn handle_logs(
    api: &MedTrackApi,
    filter: LogFilter,
    sort: SortOrder,
    user: Option<&RecordId>,
    now: NaiveDateTime,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let mut logs = LogsController::new();
    logs.set_filter(filter);
    logs.set_sort(sort);

    let generation = logs.begin_refresh();
    let result = match user {
        Some(user) => api.get_logs_by_user(user).await,
        None => api.get_logs(None).await,
    };
    logs.complete(generation, result);

    let view = logs.view(now);
    if let Some(failure) = &view.failure {
        return Err(CliError::Load(failure.message()));
    }

    writeln!(out, "{} | {} | {}", filter.label(), sort.label(), view.count_label())?;
    if let Some(empty) = &view.empty {
        writeln!(out, "{}", empty.message)?;
        return Ok(());
    }
    for row in &view.rows {
        writeln!(
            out,
            "{} {:<13} {} {}  user {}  {}  (Logged {})",
            row.badge.kind.icon(),
            row.badge.text,
            row.date,
            row.time,
            row.user_id.as_deref().unwrap_or("-"),
            row.pill_name.as_deref().unwrap_or(""),
            row.logged
        )?;
        if let Some(notes) = &row.notes {
            writeln!(out, "    {}", notes)?;
        }
    }
    Ok(())
}

/// Handle the add-user command
pub async fn handle_add_user(
    api: &MedTrackApi,
    username: String,
    email: String,
    password: String,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let mut form = CreateUserForm::new();
    form.set_field(Field::Username, username);
    form.set_field(Field::Email, email);
    form.set_field(Field::Password, password);

    match form.submit(api).await {
        Ok(()) => {
            writeln!(out, "{}", CreateUserForm::SUCCESS_MESSAGE)?;
            Ok(())
        }
        Err(SubmitError::Validation(errors)) => {
            for field in Field::ALL {
                for message in errors.get(field) {
                    writeln!(out, "{}: {}", field.label(), message)?;
                }
            }
            Err(SubmitError::Validation(errors).into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Handle the dispense command
pub async fn handle_dispense(
    api: &MedTrackApi,
    request: DispenseRequest,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let response = api.dispense_pill(&request).await?;
    writeln!(out, "Dispense recorded for user {}", request.user_id)?;
    if !response.is_null() {
        let pretty = serde_json::to_string_pretty(&response).unwrap_or_else(|_| response.to_string());
        writeln!(out, "{}", pretty)?;
    }
    Ok(())
}
