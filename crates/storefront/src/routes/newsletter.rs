//! Newsletter signup route handlers (HTMX fragments).
//!
//! The form re-validates on input so the submit button is disabled exactly
//! while the address is malformed. Submission records the subscriber and their
//! email consent with the marketing platform and only reports success once
//! both calls were acknowledged.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use cafe_jalu_core::Email;
use serde::Deserialize;
use tracing::instrument;

use crate::error::AppError;
use crate::services::marketing::record_newsletter_consent;
use crate::state::AppState;

/// Shown when the submitted address does not parse.
pub const INVALID_EMAIL_MESSAGE: &str = "Please enter a valid email address.";

/// Shown when the marketing platform did not acknowledge the signup.
pub const FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

// =============================================================================
// Signup State
// =============================================================================

/// Where a signup form is in its lifecycle. Exactly one state is current.
///
/// `Waiting` is shown client-side while the request is in flight
/// (`hx-disabled-elt` + `htmx-indicator`); the server renders the others.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignupState {
    #[default]
    Idle,
    Waiting,
    Submitted,
    Error,
}

impl SignupState {
    /// Input and button are only usable before submission or after a failure.
    #[must_use]
    pub const fn accepts_input(self) -> bool {
        matches!(self, Self::Idle | Self::Error)
    }

    /// A submission starts. No-op unless input is accepted.
    #[must_use]
    pub const fn begin(self) -> Self {
        if self.accepts_input() {
            Self::Waiting
        } else {
            self
        }
    }

    /// The marketing calls settled. No-op unless waiting.
    #[must_use]
    pub const fn finish(self, acknowledged: bool) -> Self {
        match self {
            Self::Waiting if acknowledged => Self::Submitted,
            Self::Waiting => Self::Error,
            other => other,
        }
    }

    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(self, Self::Error)
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Newsletter form data.
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub email: String,
}

/// The signup form (Idle and Error states).
#[derive(Template, WebTemplate)]
#[template(path = "newsletter/form.html")]
pub struct NewsletterFormTemplate {
    pub email: String,
    pub disabled: bool,
    pub message: Option<&'static str>,
}

impl NewsletterFormTemplate {
    /// Form for `state` with `email` prefilled.
    #[must_use]
    pub fn new(email: &str, state: SignupState) -> Self {
        Self {
            email: email.to_string(),
            disabled: !state.accepts_input() || !Email::is_valid(email),
            message: state.is_error().then_some(FAILURE_MESSAGE),
        }
    }

    /// Form re-rendered with a validation message.
    #[must_use]
    pub fn invalid(email: &str) -> Self {
        Self {
            message: Some(INVALID_EMAIL_MESSAGE),
            ..Self::new(email, SignupState::Idle)
        }
    }
}

/// Submit button alone, swapped in by `/newsletter/validate`.
#[derive(Template, WebTemplate)]
#[template(path = "newsletter/submit_button.html")]
pub struct SubmitButtonTemplate {
    pub disabled: bool,
}

/// Confirmation that replaces the form (Submitted state).
#[derive(Template, WebTemplate)]
#[template(path = "newsletter/success.html")]
pub struct SignupSuccessTemplate;

// =============================================================================
// Handlers
// =============================================================================

/// Re-validate the address as the visitor types (HTMX).
///
/// Returns the submit button, disabled exactly when the address is malformed.
pub async fn validate(Form(form): Form<SignupForm>) -> SubmitButtonTemplate {
    SubmitButtonTemplate {
        disabled: !Email::is_valid(&form.email),
    }
}

/// Subscribe to the newsletter (HTMX).
///
/// Malformed input gets 422 and the form with a message. Otherwise the
/// subscriber is identified and their consent tracked; the confirmation is
/// only rendered once both calls were acknowledged.
///
/// # Errors
///
/// Returns an error only if a fragment fails to render.
#[instrument(skip(state, form))]
pub async fn subscribe(
    State(state): State<AppState>,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    let email = match Email::parse(&form.email) {
        Ok(email) => email,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected newsletter address");
            let html = NewsletterFormTemplate::invalid(&form.email).render()?;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, axum::response::Html(html)).into_response());
        }
    };

    let signup = SignupState::Idle.begin();
    let data_source = &state.config().newsletter.data_source;

    let result = record_newsletter_consent(state.marketing().as_ref(), &email, data_source).await;
    if let Err(e) = &result {
        tracing::warn!(error = %e, "Newsletter signup was not acknowledged");
    }

    let response = match signup.finish(result.is_ok()) {
        SignupState::Submitted => SignupSuccessTemplate.into_response(),
        other => NewsletterFormTemplate::new(email.as_str(), other).into_response(),
    };
    Ok(response)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        assert_eq!(SignupState::Idle.begin(), SignupState::Waiting);
        assert_eq!(SignupState::Waiting.finish(true), SignupState::Submitted);
        assert_eq!(SignupState::Waiting.finish(false), SignupState::Error);
        assert_eq!(SignupState::Error.begin(), SignupState::Waiting);
    }

    #[test]
    fn test_terminal_and_waiting_states_ignore_events() {
        assert_eq!(SignupState::Submitted.begin(), SignupState::Submitted);
        assert_eq!(SignupState::Waiting.begin(), SignupState::Waiting);
        assert_eq!(SignupState::Idle.finish(true), SignupState::Idle);
        assert!(!SignupState::Waiting.accepts_input());
        assert!(!SignupState::Submitted.accepts_input());
    }

    #[test]
    fn test_button_disabled_exactly_when_email_invalid() {
        for (input, valid) in [
            ("user@example.com", true),
            ("User.Name@Example.co.uk", true),
            ("user@", false),
            ("@example.com", false),
            ("", false),
            ("user@example", false),
        ] {
            let form = NewsletterFormTemplate::new(input, SignupState::Idle);
            assert_eq!(form.disabled, !valid, "input {input:?}");

            let html = SubmitButtonTemplate { disabled: !valid }.render().unwrap();
            assert_eq!(html.contains("disabled"), !valid, "input {input:?}");
        }
    }

    #[test]
    fn test_form_renders_validation_hooks() {
        let html = NewsletterFormTemplate::new("", SignupState::Idle)
            .render()
            .unwrap();
        assert!(html.contains(r#"hx-post="/newsletter""#));
        assert!(html.contains(r#"hx-post="/newsletter/validate""#));
        assert!(html.contains(r#"hx-trigger="input changed delay:150ms""#));
        assert!(html.contains(r#"id="newsletter-submit""#));
        assert!(html.contains("Sign up for our newsletter"));
    }

    #[test]
    fn test_error_state_form_is_enabled_with_message() {
        let form = NewsletterFormTemplate::new("guest@example.com", SignupState::Error);
        assert!(!form.disabled);
        assert_eq!(form.message, Some(FAILURE_MESSAGE));
        let html = form.render().unwrap();
        assert!(html.contains(FAILURE_MESSAGE));
        assert!(html.contains(r#"value="guest@example.com""#));
    }

    #[test]
    fn test_success_replaces_input() {
        let html = SignupSuccessTemplate.render().unwrap();
        assert!(html.contains("Merci!"));
        assert!(html.contains("Check your email for updates"));
        assert!(!html.contains("<input"));
    }
}
