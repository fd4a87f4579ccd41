//! Client core for the student activity registration and check-in backend.
//!
//! # Overview
//! Every call runs through one `Pipeline`: the base address is picked from
//! the page host, a bearer token is attached from the credential store,
//! requests and responses are logged, and both transport failures and
//! non-200 envelope codes come back as `Err(ApiError)` after the user has
//! been notified.
//!
//! # Design
//! - The pipeline is sans-IO; a `Transport` executes the round trip.
//!   `UreqTransport` (feature `ureq`, on by default) is the bundled one.
//! - Page host, credential storage and notifications are reached through an
//!   explicit `Environment` rather than globals.
//! - Filters form an ordered middleware list (`middleware::Chain`).
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod base_url;
pub mod client;
pub mod config;
pub mod env;
pub mod envelope;
pub mod error;
pub mod http;
pub mod image;
pub mod middleware;
pub mod pipeline;
pub mod transport;
pub mod types;

pub use base_url::BaseUrl;
pub use client::StudentClient;
pub use config::PipelineConfig;
pub use env::{
    CredentialStore, Environment, HostContext, JsonFileCredentials, LogNotifier,
    MemoryCredentials, Notifier, RecordingNotifier, StaticHost,
};
pub use envelope::Envelope;
pub use error::{ApiError, ConfigError, CredentialError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use image::format_image_url;
pub use pipeline::Pipeline;
pub use transport::Transport;
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
pub use types::{
    Activity, ActivityQuery, CheckInForm, CheckInTokenInfo, Registration, RegistrationForm,
    RegistrationQuery, StudentRecordQuery, TokenCheckIn,
};
