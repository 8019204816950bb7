pub mod config;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod schema;
pub mod session;
pub mod ui;
pub mod views;

pub use config::ClientConfig;
pub use error::{FieldError, RequestError};
pub use pipeline::RequestPipeline;
pub use schema::RegistrationMode;
pub use session::{SessionGuard, SessionState};
