use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Method;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use congregate_datasets::{Datasets, ReferenceRecord};
use congregate_types::api::SubmissionPayload;

use crate::error::{FieldError, RequestError};
use crate::normalize::normalize;
use crate::pipeline::{RequestPipeline, cancellable};
use crate::schema::{EffectiveSchema, FieldValue, RawInput, RegistrationMode, compose, fields, validate};
use crate::ui::{Navigator, Notification, Notifier, Route};

pub const USERS_PATH: &str = "/api/v2/users";

const FAILED_TITLE: &str = "Register Failed!";

/// Form state for a registration. Each field has one stored value; labels
/// for coded fields are derived from the datasets on demand.
#[derive(Debug, Clone)]
pub struct RegistrationForm {
    mode: RegistrationMode,
    values: RawInput,
}

impl Default for RegistrationForm {
    fn default() -> Self {
        let mut values = RawInput::new();
        for name in [
            fields::NAME,
            fields::EMAIL,
            fields::PHONE_NUMBER,
            fields::PASSWORD,
            fields::DEPARTMENT,
            fields::CAMPUS,
            fields::KKJ,
        ] {
            values.insert(name.to_string(), FieldValue::Text(String::new()));
        }
        values.insert(fields::KOM.to_string(), FieldValue::Bool(false));
        values.insert(fields::BAPTIS.to_string(), FieldValue::Bool(false));
        Self {
            mode: RegistrationMode::Member,
            values,
        }
    }
}

impl RegistrationForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> RegistrationMode {
        self.mode
    }

    /// Switches mode. Stored values are kept; fields outside the new schema
    /// simply stop being validated.
    pub fn set_mode(&mut self, mode: RegistrationMode) {
        self.mode = mode;
    }

    pub fn schema(&self) -> EffectiveSchema {
        compose(self.mode)
    }

    pub fn set(&mut self, name: &str, value: FieldValue) {
        self.values.insert(name.to_string(), value);
    }

    pub fn set_text(&mut self, name: &str, value: impl Into<String>) {
        self.set(name, FieldValue::Text(value.into()));
    }

    pub fn set_date(&mut self, name: &str, value: NaiveDate) {
        self.set(name, FieldValue::Date(value));
    }

    pub fn set_flag(&mut self, name: &str, value: bool) {
        self.set(name, FieldValue::Bool(value));
    }

    pub fn clear(&mut self, name: &str) {
        self.values.remove(name);
    }

    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(FieldValue::Text(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    pub fn select_department(&mut self, code: &str) {
        self.set_text(fields::DEPARTMENT, code.to_uppercase());
    }

    pub fn select_campus(&mut self, code: &str) {
        self.set_text(fields::CAMPUS, code.to_uppercase());
    }

    pub fn select_cool(&mut self, number: i64) {
        self.set(fields::COOL, FieldValue::Number(number));
    }

    pub fn department_label<'a>(&self, datasets: &'a Datasets) -> Option<&'a str> {
        self.text(fields::DEPARTMENT)
            .map(|code| datasets.department.resolve_label(code))
    }

    pub fn campus_label<'a>(&self, datasets: &'a Datasets) -> Option<&'a str> {
        self.text(fields::CAMPUS)
            .map(|code| datasets.campus.resolve_label(code))
    }

    /// The selected COOL record, carrying its category and leader.
    pub fn selected_cool<'a>(&self, datasets: &'a Datasets) -> Option<&'a ReferenceRecord> {
        match self.values.get(fields::COOL) {
            Some(FieldValue::Number(n)) => datasets.cool.get(&n.to_string()),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<crate::schema::ValidatedValues, Vec<FieldError>> {
        validate(&self.schema(), &self.values)
    }

    /// Validates and normalizes in one step.
    pub fn payload(&self) -> Result<SubmissionPayload, Vec<FieldError>> {
        let values = self.validate()?;
        Ok(normalize(&values, self.mode))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Registered,
    Invalid(Vec<FieldError>),
    Rejected,
    Discarded,
}

pub struct RegistrationView {
    pub form: RegistrationForm,
    pipeline: Arc<RequestPipeline>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    redirect_delay: Duration,
    cancel: CancellationToken,
    submitting: bool,
    field_errors: Vec<FieldError>,
}

impl RegistrationView {
    pub fn new(
        pipeline: Arc<RequestPipeline>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let redirect_delay = pipeline.config().redirect_delay;
        Self {
            form: RegistrationForm::new(),
            pipeline,
            notifier,
            navigator,
            redirect_delay,
            cancel: CancellationToken::new(),
            submitting: false,
            field_errors: Vec::new(),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn field_errors(&self) -> &[FieldError] {
        &self.field_errors
    }

    /// First error for `field`, for display under the input.
    pub fn error_for(&self, field: &str) -> Option<&str> {
        self.field_errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.reason.as_str())
    }

    pub fn abort_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn unmount(&self) {
        self.cancel.cancel();
    }

    pub async fn submit(&mut self) -> SubmitOutcome {
        let payload = match self.form.payload() {
            Ok(payload) => payload,
            Err(errors) => {
                debug!(count = errors.len(), "Registration form invalid");
                self.field_errors = errors.clone();
                return SubmitOutcome::Invalid(errors);
            }
        };
        self.field_errors.clear();
        self.submitting = true;

        let result = cancellable(
            &self.cancel,
            self.pipeline
                .send_public(Method::POST, USERS_PATH, Some(&payload)),
        )
        .await;

        if matches!(result, Err(RequestError::Cancelled)) {
            debug!("Registration view unmounted, dropping response");
            return SubmitOutcome::Discarded;
        }
        self.submitting = false;

        match result {
            Ok(_) => {
                info!("Registration succeeded");
                self.notifier.notify(Notification::success(
                    "Sign up Successful!",
                    "Redirecting to the log in page...",
                ));
                tokio::select! {
                    _ = self.cancel.cancelled() => return SubmitOutcome::Registered,
                    _ = tokio::time::sleep(self.redirect_delay) => {}
                }
                self.navigator.redirect(Route::Login);
                SubmitOutcome::Registered
            }
            Err(e) => {
                warn!("Registration failed: {}", e);
                self.notifier
                    .notify(Notification::error(FAILED_TITLE, e.user_message()));
                SubmitOutcome::Rejected
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_member_form() -> RegistrationForm {
        let mut form = RegistrationForm::new();
        form.set_text(fields::NAME, "Jane Doe");
        form.set_text(fields::EMAIL, "jane@example.com");
        form.set_text(fields::PHONE_NUMBER, "081234567890");
        form.set_text(fields::PLACE_OF_BIRTH, "Jakarta");
        form.set_date(fields::DATE_OF_BIRTH, NaiveDate::from_ymd_opt(1995, 3, 14).unwrap());
        form.set_text(fields::PASSWORD, "hunter22");
        form
    }

    #[test]
    fn test_defaults_fail_like_empty_inputs() {
        let errors = RegistrationForm::new().validate().unwrap_err();
        let names: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            names,
            vec![
                fields::NAME,
                fields::EMAIL,
                fields::PHONE_NUMBER,
                fields::PLACE_OF_BIRTH,
                fields::DATE_OF_BIRTH,
                fields::PASSWORD,
            ]
        );
    }

    #[test]
    fn test_mode_switch_keeps_values() {
        let mut form = filled_member_form();
        form.set_mode(RegistrationMode::Worker);
        form.set_text(fields::GENDER, "Female");
        form.select_department("mus");
        assert!(form.validate().is_err());

        form.set_mode(RegistrationMode::Member);
        let values = form.validate().unwrap();
        assert_eq!(values.text(fields::NAME), Some("Jane Doe"));
        assert!(values.get(fields::GENDER).is_none());

        // worker values survive the round trip
        form.set_mode(RegistrationMode::Worker);
        assert_eq!(form.value(fields::GENDER), Some(&FieldValue::Text("Female".into())));
        assert_eq!(form.value(fields::DEPARTMENT), Some(&FieldValue::Text("MUS".into())));
    }

    #[test]
    fn test_derived_labels() {
        let ds = Datasets::embedded().unwrap();
        let mut form = RegistrationForm::new();
        assert_eq!(form.department_label(&ds), None);

        form.select_department("kids");
        form.select_campus("bks");
        form.select_cool(102);
        assert_eq!(form.department_label(&ds), Some("Kids Ministry"));
        assert_eq!(form.campus_label(&ds), Some("Bekasi"));
        let cool = form.selected_cool(&ds).unwrap();
        assert_eq!(cool.label, "Bekasi Youth 2");
        assert_eq!(cool.category.as_deref(), Some("Youth"));

        form.select_campus("nowhere");
        assert_eq!(form.campus_label(&ds), Some("Unknown"));
    }

    #[test]
    fn test_member_payload_ignores_stale_worker_values() {
        let mut form = filled_member_form();
        form.set_flag(fields::KOM, true);
        form.select_cool(101);
        let payload = form.payload().unwrap();
        assert_eq!(payload.user_types, vec!["user"]);
        assert!(!payload.is_kom100);
        assert_eq!(payload.cool_id, None);
    }
}
