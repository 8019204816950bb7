use serde::{Deserialize, Serialize};

use crate::models::EventRecord;

/// Status string the backend uses when a user with the same email or phone
/// number is already registered.
pub const ALREADY_EXISTS: &str = "ALREADY_EXISTS";

// -- Envelopes --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

pub type EventsResponse = DataEnvelope<Vec<EventRecord>>;

/// Error body returned with non-2xx responses. Both fields are optional
/// because the backend omits them on some failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn is_already_exists(&self) -> bool {
        self.status.as_deref() == Some(ALREADY_EXISTS)
    }
}

// -- Registration --

/// Wire body of `POST /api/v2/users`. The field set is fixed for every
/// registration mode; fields a mode doesn't use carry their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub name: String,
    pub phone_number: String,
    pub email: String,
    pub password: String,
    pub user_types: Vec<String>,
    pub campus_code: String,
    pub place_of_birth: String,
    /// `YYYY-MM-DD`, or `null` when no date was given.
    pub date_of_birth: Option<String>,
    pub address: String,
    pub gender: String,
    #[serde(rename = "department_code")]
    pub department_code: String,
    pub kkj_number: String,
    pub jemaat_id: String,
    pub is_kom100: bool,
    pub is_baptized: bool,
    pub marital_status: String,
    #[serde(rename = "coolID")]
    pub cool_id: Option<i64>,
}

// -- Token refresh --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

pub type RefreshResponse = DataEnvelope<TokenPair>;

/// The subset of access-token claims the client reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>,
    pub exp: usize,
}
