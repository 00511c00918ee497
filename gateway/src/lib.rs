//! # Research Monitor Gateway
//!
//! Authenticated client for the OpenAIRE graph API.
//!
//! - **`auth`**: client-credentials token exchange and caching
//! - **`client`**: authenticated GETs with a single retry after a 401
//! - **`request_log`**: structured JSON log entry for every HTTP attempt
//! - **`log_sink`**: append-only log streams with one file per day
//! - **`payload`**: paginated vs. generic response payloads
//! - **`openaire`**: organization, publication and data-source queries

#[macro_use]
extern crate tracing;

pub mod auth;
pub mod client;
pub mod error;
pub mod log_sink;
pub mod openaire;
pub mod payload;
pub mod request_log;

pub use auth::AccessToken;
pub use client::{
    ClientCredentials,
    GatewayClient,
};
pub use error::{
    AuthError,
    RequestError,
};
pub use log_sink::DailyLogSink;
pub use openaire::{
    DateFilter,
    OPENORGS_PREFIX,
};
pub use payload::{
    PaginatedResults,
    Payload,
};
pub use request_log::{
    RequestContext,
    RequestLog,
    RequestLogEntry,
};
