//! Boundaries to the navigation and notification layers.

use std::fmt;
use std::time::Duration;

pub const LOGIN_PATH: &str = "/login/v2";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Event(String),
    EventInternal(String),
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Self::Login => LOGIN_PATH.to_string(),
            Self::Event(code) => format!("/events/{}", code),
            Self::EventInternal(code) => format!("/events/{}/internal", code),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Moves the user to another screen.
pub trait Navigator: Send + Sync {
    fn redirect(&self, route: Route);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Error,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub tone: Tone,
    pub duration: Duration,
}

impl Notification {
    pub fn success(title: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
            tone: Tone::Success,
            duration: Duration::from_millis(1500),
        }
    }

    pub fn error(title: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
            tone: Tone::Error,
            duration: Duration::from_millis(3000),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Notifier that writes to the `tracing` log.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, n: Notification) {
        match n.tone {
            Tone::Success => tracing::info!(title = %n.title, "{}", n.description),
            Tone::Error => tracing::warn!(title = %n.title, "{}", n.description),
        }
    }
}

/// Navigator that only logs where the user would be sent.
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn redirect(&self, route: Route) {
        tracing::info!(route = %route, "Redirect");
    }
}
