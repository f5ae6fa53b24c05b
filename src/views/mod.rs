pub mod dashboard;
pub mod fetch;
pub mod logs;
pub mod users;

pub use dashboard::{DashboardController, DashboardView, ReminderCard, TimeStatus};
pub use fetch::{FetchState, Generation, LoadFailure, Phase};
pub use logs::{LogFilter, LogsController, LogsView, SortOrder, StatusBadge};
pub use users::{CreateUserForm, Field, FieldErrors, SubmitError};
