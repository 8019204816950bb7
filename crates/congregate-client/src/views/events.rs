use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Method;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use congregate_datasets::Datasets;
use congregate_types::api::EventsResponse;
use congregate_types::models::{AvailabilityStatus, EventRecord, EventStatus};

use crate::error::RequestError;
use crate::pipeline::RequestPipeline;
use crate::ui::{Navigator, Notification, Notifier, Route};

pub const EVENTS_PATH: &str = "/api/v2/events";

const INTERNAL_TOPIC: &str = "internal";
const DATE_FORMAT: &str = "%d %b %Y, %H:%M";

/// A button on an event card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub label: &'static str,
    pub route: Option<Route>,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationWindow {
    pub opens: Option<String>,
    pub closes: Option<String>,
}

/// Display model for one event, derived from an [`EventRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventCard {
    pub code: String,
    pub title: String,
    pub availability: AvailabilityStatus,
    pub badge: &'static str,
    pub description: String,
    pub registration_window: Option<RegistrationWindow>,
    pub internal_registration: Action,
    pub primary: Option<Action>,
}

fn format_timestamp(ts: Option<DateTime<Utc>>) -> Option<String> {
    ts.map(|t| t.format(DATE_FORMAT).to_string())
}

impl EventCard {
    pub fn from_record(event: &EventRecord, datasets: &Datasets) -> Self {
        let campuses = datasets.campus.resolve_joined_labels(event.allowed_campuses.as_slice());

        let registration_window = event.has_topic(INTERNAL_TOPIC).then(|| RegistrationWindow {
            opens: format_timestamp(event.register_start_at),
            closes: format_timestamp(event.register_end_at),
        });

        let primary = match event.status {
            EventStatus::Active => Some(Action {
                label: "Register Now!",
                route: Some(Route::Event(event.code.clone())),
                enabled: true,
            }),
            EventStatus::Walkin => Some(Action {
                label: "Walk-in : Register On Site",
                route: None,
                enabled: false,
            }),
            EventStatus::Other => None,
        };

        Self {
            code: event.code.clone(),
            title: event.title.clone(),
            availability: event.availability_status,
            badge: event.availability_status.as_str(),
            description: format!(
                "This is a {} event allowed for {}.",
                event.allowed_for, campuses
            ),
            registration_window,
            internal_registration: Action {
                label: "Register for Homebase",
                route: Some(Route::EventInternal(event.code.clone())),
                enabled: event.availability_status != AvailabilityStatus::Soon,
            },
            primary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(usize),
    /// The session was gone; the user is being sent to login.
    SignedOut,
    Failed,
    /// The view was unmounted first; nothing was applied.
    Discarded,
}

/// Lists events for the signed-in user.
pub struct EventsView {
    pipeline: Arc<RequestPipeline>,
    datasets: Arc<Datasets>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    cancel: CancellationToken,
    loading: bool,
    events: Vec<EventRecord>,
}

impl EventsView {
    pub fn new(
        pipeline: Arc<RequestPipeline>,
        datasets: Arc<Datasets>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            pipeline,
            datasets,
            notifier,
            navigator,
            cancel: CancellationToken::new(),
            loading: true,
            events: Vec::new(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    pub fn cards(&self) -> Vec<EventCard> {
        self.events
            .iter()
            .map(|e| EventCard::from_record(e, &self.datasets))
            .collect()
    }

    /// Handle that unmounts the view from elsewhere.
    pub fn abort_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn unmount(&self) {
        self.cancel.cancel();
    }

    pub async fn load(&mut self) -> LoadOutcome {
        if self.cancel.is_cancelled() {
            return LoadOutcome::Discarded;
        }
        self.loading = true;

        let result = self
            .pipeline
            .call_cancellable::<EventsResponse, ()>(&self.cancel, Method::GET, EVENTS_PATH, None)
            .await;

        let outcome = match result {
            Ok(response) => {
                info!(count = response.data.len(), "Events loaded");
                self.events = response.data;
                LoadOutcome::Loaded(self.events.len())
            }
            Err(RequestError::Cancelled) => {
                debug!("Events view unmounted, dropping response");
                return LoadOutcome::Discarded;
            }
            Err(RequestError::Auth) => {
                self.events.clear();
                LoadOutcome::SignedOut
            }
            Err(e) => {
                warn!("Error fetching events: {}", e);
                self.events.clear();
                self.notifier
                    .notify(Notification::error("Failed to fetch events", e.user_message()));
                LoadOutcome::Failed
            }
        };
        self.loading = false;
        outcome
    }

    /// Follows a card action. Disabled or route-less actions do nothing.
    pub fn activate(&self, action: &Action) -> bool {
        match (&action.route, action.enabled) {
            (Some(route), true) => {
                self.navigator.redirect(route.clone());
                true
            }
            _ => false,
        }
    }
}
