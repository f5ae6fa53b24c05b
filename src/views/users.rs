use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;

use crate::api::{ApiError, ApiResult, MedTrackApi};
use crate::models::UserInput;

static USERNAME_PATTERN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$"));
static EMAIL_PATTERN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$"));

fn is_match(pattern: &LazyLock<Result<Regex, regex::Error>>, value: &str) -> bool {
    pattern.as_ref().is_ok_and(|re| re.is_match(value))
}

const USERNAME_MIN: usize = 3;
const PASSWORD_MIN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Field {
    #[default]
    Username,
    Email,
    Password,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Username, Field::Email, Field::Password];

    pub fn label(&self) -> &'static str {
        match self {
            Field::Username => "Username",
            Field::Email => "Email Address",
            Field::Password => "Password",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Field::Username => Field::Email,
            Field::Email => Field::Password,
            Field::Password => Field::Username,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Field::Username => Field::Password,
            Field::Email => Field::Username,
            Field::Password => Field::Email,
        }
    }
}

/// Every violated rule, per field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub username: Vec<String>,
    pub email: Vec<String>,
    pub password: Vec<String>,
}

impl FieldErrors {
    pub fn get(&self, field: Field) -> &[String] {
        match field {
            Field::Username => &self.username,
            Field::Email => &self.email,
            Field::Password => &self.password,
        }
    }

    fn get_mut(&mut self, field: Field) -> &mut Vec<String> {
        match field {
            Field::Username => &mut self.username,
            Field::Email => &mut self.email,
            Field::Password => &mut self.password,
        }
    }

    pub fn clear(&mut self, field: Field) {
        self.get_mut(field).clear();
    }

    pub fn is_empty(&self) -> bool {
        Field::ALL.iter().all(|f| self.get(*f).is_empty())
    }

    pub fn count(&self) -> usize {
        Field::ALL.iter().map(|f| self.get(*f).len()).sum()
    }
}

pub fn validate_username(username: &str) -> Vec<String> {
    if username.trim().is_empty() {
        return vec!["Username is required".to_string()];
    }
    let mut errors = Vec::new();
    if username.chars().count() < USERNAME_MIN {
        errors.push(format!("Username must be at least {USERNAME_MIN} characters long"));
    }
    if !is_match(&USERNAME_PATTERN, username) {
        errors.push("Username can only contain letters, numbers, and underscores".to_string());
    }
    errors
}

pub fn validate_email(email: &str) -> Vec<String> {
    if email.trim().is_empty() {
        return vec!["Email is required".to_string()];
    }
    if is_match(&EMAIL_PATTERN, email) {
        Vec::new()
    } else {
        vec!["Please enter a valid email address".to_string()]
    }
}

pub fn validate_password(password: &str) -> Vec<String> {
    if password.is_empty() {
        return vec!["Password is required".to_string()];
    }
    let mut errors = Vec::new();
    if password.chars().count() < PASSWORD_MIN {
        errors.push(format!("Password must be at least {PASSWORD_MIN} characters long"));
    }
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_lower && has_upper && has_digit) {
        errors.push(
            "Password must contain at least one uppercase letter, one lowercase letter, and one number"
                .to_string(),
        );
    }
    errors
}

/// Validates all three fields independently.
pub fn validate(input: &UserInput) -> Result<(), FieldErrors> {
    let errors = FieldErrors {
        username: validate_username(&input.username),
        email: validate_email(&input.email),
        password: validate_password(&input.password),
    };
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Please fix the {} highlighted problem(s).", .0.count())]
    Validation(FieldErrors),
    #[error("User already exists or invalid data provided.")]
    InvalidData,
    #[error("Username or email already taken.")]
    Conflict,
    #[error("Failed to create user. Please try again later.")]
    Failed(#[source] ApiError),
}

impl From<ApiError> for SubmitError {
    fn from(error: ApiError) -> Self {
        match error.status() {
            Some(400) => SubmitError::InvalidData,
            Some(409) => SubmitError::Conflict,
            _ => SubmitError::Failed(error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
}

/// Create-user form state.
#[derive(Debug, Default)]
pub struct CreateUserForm {
    input: UserInput,
    errors: FieldErrors,
    banner: Option<Banner>,
    submitting: bool,
    focus: Field,
}

impl CreateUserForm {
    pub const SUCCESS_MESSAGE: &'static str = "User created successfully!";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self) -> &UserInput {
        &self.input
    }

    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Username => &self.input.username,
            Field::Email => &self.input.email,
            Field::Password => &self.input.password,
        }
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn focus(&self) -> Field {
        self.focus
    }

    pub fn set_focus(&mut self, field: Field) {
        self.focus = field;
    }

    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn focus_previous(&mut self) {
        self.focus = self.focus.previous();
    }

    /// Replaces a field. Clears that field's errors and a stale success banner.
    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::Username => self.input.username = value,
            Field::Email => self.input.email = value,
            Field::Password => self.input.password = value,
        }
        self.touched(field);
    }

    pub fn push_char(&mut self, c: char) {
        let field = self.focus;
        match field {
            Field::Username => self.input.username.push(c),
            Field::Email => self.input.email.push(c),
            Field::Password => self.input.password.push(c),
        }
        self.touched(field);
    }

    pub fn pop_char(&mut self) {
        let field = self.focus;
        let popped = match field {
            Field::Username => self.input.username.pop(),
            Field::Email => self.input.email.pop(),
            Field::Password => self.input.password.pop(),
        };
        if popped.is_some() {
            self.touched(field);
        }
    }

    fn touched(&mut self, field: Field) {
        self.errors.clear(field);
        if matches!(self.banner, Some(Banner { kind: BannerKind::Success, .. })) {
            self.banner = None;
        }
    }

    /// Resets fields, errors and banner.
    pub fn clear(&mut self) {
        let submitting = self.submitting;
        *self = Self::default();
        self.submitting = submitting;
    }

    /// Validates and marks the form in flight. `None` means nothing should be
    /// sent: either a submit is already running or validation failed, in
    /// which case the per-field errors are now set.
    pub fn begin_submit(&mut self) -> Option<UserInput> {
        if self.submitting {
            tracing::debug!("submit ignored, one is already in flight");
            return None;
        }
        match validate(&self.input) {
            Ok(()) => {
                self.errors = FieldErrors::default();
                self.submitting = true;
                Some(self.input.clone())
            }
            Err(errors) => {
                self.errors = errors;
                None
            }
        }
    }

    pub fn complete_submit(&mut self, result: ApiResult<Value>) -> Result<(), SubmitError> {
        self.submitting = false;
        match result {
            Ok(_) => {
                tracing::info!(username = %self.input.username, "user created");
                self.input = UserInput::default();
                self.errors = FieldErrors::default();
                self.focus = Field::Username;
                self.banner = Some(Banner {
                    kind: BannerKind::Success,
                    message: Self::SUCCESS_MESSAGE.to_string(),
                });
                Ok(())
            }
            Err(error) => {
                tracing::warn!(error = %error, "user creation failed");
                let error = SubmitError::from(error);
                self.banner = Some(Banner {
                    kind: BannerKind::Error,
                    message: error.to_string(),
                });
                Err(error)
            }
        }
    }

    /// Validate, send and apply the outcome in one step.
    pub async fn submit(&mut self, api: &MedTrackApi) -> Result<(), SubmitError> {
        let Some(input) = self.begin_submit() else {
            return Err(SubmitError::Validation(self.errors.clone()));
        };
        let result = api.create_user(&input).await;
        self.complete_submit(result)
    }
}
