//! Client for handing payloads off to a remote content-addressed pinning
//! service, tolerating transient network failure.
//!
//! The client retries with exponential backoff and, when a *file* upload
//! exhausts its budget, records the failure durably via `pinq_store` so
//! an operator can retry it later. JSON payload failures propagate
//! without a record; the recovery tooling only understands file entries.

mod backend;
mod cid;
mod client;
mod retry;

pub use backend::{HttpBackend, PinBackend};
pub use cid::{Cid, extract_cid};
pub use client::PinClient;
pub use retry::RetryPolicy;

use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PinError {
    #[error("got HTTP {0} with content '{1}'")]
    HttpFailWithBody(u16, String),

    #[error("all {attempts} pin attempts failed")]
    Exhausted {
        attempts: u32,
        #[source]
        source: Box<PinError>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

pub type PinResult<T> = Result<T, PinError>;
