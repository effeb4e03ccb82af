//! Top-level fallback for unexpected errors
//!
//! Expected failures (listing, uploads, broken previews) are handled where
//! they occur. Anything else ends up here and is shown as a full-screen
//! fallback that offers a reload or a way home.

use serde::Serialize;
use tracing::error;

use crate::config::Environment;

pub const FALLBACK_TITLE: &str = "Oops! Something went wrong";
pub const FALLBACK_MESSAGE: &str =
    "We're sorry, but something unexpected happened. Please try refreshing the page.";

/// Destination for unexpected errors in production builds
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &(dyn std::error::Error + 'static));
}

/// Reports through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, err: &(dyn std::error::Error + 'static)) {
        error!(error = %err, "unexpected error");
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FallbackAction {
    Reload,
    ReturnHome(&'static str),
}

/// Full-screen fallback shown after an unexpected error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackScreen {
    pub title: &'static str,
    pub message: &'static str,
    /// Error text, only filled in development builds
    pub details: Option<String>,
    pub actions: Vec<FallbackAction>,
}

impl FallbackScreen {
    pub fn new(err: &(dyn std::error::Error + 'static), environment: Environment) -> Self {
        Self {
            title: FALLBACK_TITLE,
            message: FALLBACK_MESSAGE,
            details: environment.is_development().then(|| err.to_string()),
            actions: vec![FallbackAction::Reload, FallbackAction::ReturnHome("/")],
        }
    }
}

/// Logs the error in development or forwards it to `reporter` in
/// production, then builds the fallback screen.
pub fn catch_unexpected(
    err: &(dyn std::error::Error + 'static),
    environment: Environment,
    reporter: &dyn ErrorReporter,
) -> FallbackScreen {
    if environment.is_development() {
        error!(error = %err, "error caught by fallback");
    } else {
        reporter.report(err);
    }
    FallbackScreen::new(err, environment)
}
