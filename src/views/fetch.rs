use crate::api::ApiError;

/// Where a fetch-on-entry view is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Ready,
    Failed,
}

/// A failed load: the view's fixed sentence plus the classified cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    pub summary: &'static str,
    pub cause: String,
    pub timed_out: bool,
}

impl LoadFailure {
    pub fn new(summary: &'static str, error: &ApiError) -> Self {
        Self {
            summary,
            cause: error.user_message(),
            timed_out: error.is_timeout(),
        }
    }

    pub fn message(&self) -> String {
        format!("{} {}", self.summary, self.cause)
    }
}

/// Generation handed out by [`FetchState::begin`]; only the latest one may land.
pub type Generation = u64;

/// List + loading flag + error, shared by the dashboard and logs views.
///
/// Every `begin` bumps the generation. A completion carrying an older
/// generation is dropped, so a slow response to an earlier refresh can never
/// overwrite a newer one.
#[derive(Debug, Clone)]
pub struct FetchState<T> {
    items: Vec<T>,
    phase: Phase,
    failure: Option<LoadFailure>,
    generation: Generation,
    failure_summary: &'static str,
}

impl<T> FetchState<T> {
    pub fn new(failure_summary: &'static str) -> Self {
        Self {
            items: Vec::new(),
            phase: Phase::Idle,
            failure: None,
            generation: 0,
            failure_summary,
        }
    }

    /// Enters `Loading` and clears the previous error. Items from the last
    /// successful load stay visible until the new result arrives.
    pub fn begin(&mut self) -> Generation {
        self.generation += 1;
        self.phase = Phase::Loading;
        self.failure = None;
        self.generation
    }

    /// Applies a completed load. Returns `false` if it was stale and ignored.
    pub fn complete(&mut self, generation: Generation, result: Result<Vec<T>, ApiError>) -> bool {
        if generation != self.generation {
            tracing::debug!(generation, latest = self.generation, "discarding stale response");
            return false;
        }
        match result {
            Ok(items) => {
                self.items = items;
                self.phase = Phase::Ready;
            }
            Err(error) => {
                tracing::warn!(error = %error, "load failed");
                self.failure = Some(LoadFailure::new(self.failure_summary, &error));
                self.phase = Phase::Failed;
            }
        }
        true
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn failure(&self) -> Option<&LoadFailure> {
        self.failure.as_ref()
    }

    /// A retry action is offered whenever the last load failed.
    pub fn can_retry(&self) -> bool {
        self.phase == Phase::Failed
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_error() -> ApiError {
        ApiError::Server { path: "/reminders".to_string() }
    }

    #[test]
    fn walks_idle_loading_ready() {
        let mut state: FetchState<u32> = FetchState::new("Failed.");
        assert_eq!(state.phase(), Phase::Idle);

        let g = state.begin();
        assert!(state.is_loading());
        assert!(state.complete(g, Ok(vec![1, 2])));
        assert_eq!(state.phase(), Phase::Ready);
        assert_eq!(state.items(), &[1, 2]);
        assert!(state.failure().is_none());
    }

    #[test]
    fn failure_clears_loading_and_offers_retry() {
        let mut state: FetchState<u32> = FetchState::new("Failed to fetch.");
        let g = state.begin();
        state.complete(g, Err(server_error()));

        assert!(!state.is_loading());
        assert!(state.can_retry());
        let failure = state.failure().unwrap();
        assert_eq!(
            failure.message(),
            "Failed to fetch. Server error. Please try again later."
        );

        let g = state.begin();
        assert!(state.failure().is_none());
        state.complete(g, Ok(vec![]));
        assert_eq!(state.phase(), Phase::Ready);
    }

    #[test]
    fn stale_completion_is_discarded() {
        let mut state: FetchState<u32> = FetchState::new("Failed.");
        let first = state.begin();
        let second = state.begin();

        assert!(state.complete(second, Ok(vec![2])));
        assert!(!state.complete(first, Err(server_error())));
        assert_eq!(state.phase(), Phase::Ready);
        assert_eq!(state.items(), &[2]);
    }
}
