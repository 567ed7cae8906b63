//! HTTP plumbing shared by every scraping component.

use reqwest::Client;
use scraper::Selector;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::{PlanError, PlanResult};

/// Shared client for plain page and JSON GETs.
///
/// Login and booking POSTs do not go through here; they need their own
/// redirect-disabled client, owned by `BookingSession`.
#[derive(Debug, Clone, Default)]
pub struct PageClient {
    http: Client,
}

impl PageClient {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
        }
    }

    /// GET a page and return its body. Any non-success status aborts the
    /// enclosing computation.
    pub async fn fetch_html(&self, url: &Url) -> PlanResult<String> {
        debug!(url = %url, "fetching page");
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|source| PlanError::Fetch {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlanError::HttpStatus {
                url: url.clone(),
                status,
            });
        }

        response.text().await.map_err(|source| PlanError::Fetch {
            url: url.clone(),
            source,
        })
    }

    /// GET a JSON endpoint and deserialize its body.
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &Url) -> PlanResult<T> {
        debug!(url = %url, "querying endpoint");
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|source| PlanError::Fetch {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlanError::HttpStatus {
                url: url.clone(),
                status,
            });
        }

        response.json().await.map_err(|source| PlanError::Fetch {
            url: url.clone(),
            source,
        })
    }
}

/// Join a path tail onto a base the way the scraped backends expect it:
/// literal concatenation, normalised to exactly one `/` between the parts.
pub(crate) fn concat_url(base: &Url, tail: &str) -> PlanResult<Url> {
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        tail.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|_| PlanError::InvalidUrl { url: joined })
}

/// Compile a static CSS selector. All selectors in this crate are literals,
/// so a parse failure is a programming error.
pub(crate) fn css(selector: &'static str) -> Selector {
    Selector::parse(selector).expect("static css selector")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_url_normalises_slashes() {
        let base = Url::parse("http://example.com/dinner/").unwrap();
        assert_eq!(
            concat_url(&base, "login").unwrap().as_str(),
            "http://example.com/dinner/login"
        );
        assert_eq!(
            concat_url(&base, "/login/booking").unwrap().as_str(),
            "http://example.com/dinner/login/booking"
        );

        let bare = Url::parse("http://example.com/dinner").unwrap();
        assert_eq!(
            concat_url(&bare, "login").unwrap().as_str(),
            "http://example.com/dinner/login"
        );
    }
}
