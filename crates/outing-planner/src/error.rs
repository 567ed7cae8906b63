//! Unified planner error type.
//!
//! Only fatal conditions live here: a failed fetch or login aborts the
//! enclosing computation and propagates to the orchestrator. Expected
//! "no match" verdicts (no common day, no slot, no plan) are ordinary values
//! on the outcome enums, never errors.

use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum PlanError {
    /// The request never produced a usable response (connect, body or decode
    /// failure).
    #[error("request to {url} failed: {source}")]
    Fetch {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered, but not with a success status.
    #[error("{url} answered HTTP {status}")]
    HttpStatus { url: Url, status: StatusCode },

    /// The login POST did not come back as the expected redirect. Fatal for
    /// the session; never retried.
    #[error("login at {url} did not redirect as expected (HTTP {status})")]
    Authentication { url: Url, status: StatusCode },

    /// The seed page carries no link for one of the required sections.
    #[error("no link matching \"{section}\" on the seed page")]
    MissingSection { section: &'static str },

    /// A scraped page did not have the structure the backend promises.
    #[error("unexpected page structure at {url}: {what}")]
    PageFormat { url: String, what: String },

    /// A booking was submitted before slot discovery armed the CSRF token.
    #[error("booking submitted without a discovered CSRF token")]
    MissingCsrfToken,

    /// Two URL fragments from the scraped pages did not combine into a URL.
    #[error("\"{url}\" is not a valid URL")]
    InvalidUrl { url: String },

    /// The HTTP client itself could not be constructed.
    #[error("failed to construct HTTP client: {source}")]
    Client { source: reqwest::Error },
}

pub type PlanResult<T> = Result<T, PlanError>;
