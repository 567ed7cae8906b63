//! Authenticated booking protocol against the restaurant system.
//!
//! One `BookingSession` owns one server-side session: the login cookie and
//! the CSRF token it captures are only valid for the logical booking attempt
//! that created them. State is threaded as an explicit `SessionState` value
//! through `login` -> `discover_slots` -> `book_slot`; nothing is mutated in
//! place, so a given state value always reproduces the same request.
//! Concurrent plan attempts must each run through their own session.

use reqwest::header::{COOKIE, LOCATION, SET_COOKIE};
use reqwest::redirect::Policy;
use reqwest::{Client, Response, StatusCode};
use scraper::Html;
use tracing::{debug, warn};
use url::Url;

use crate::error::{PlanError, PlanResult};
use crate::fetch::{concat_url, css};
use crate::plan::{BookingCode, DinnerWindow, Weekday};

/// Login credentials for the restaurant system.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Where in the login -> discover -> book protocol a session is.
///
/// `Unauthenticated` and `Authenticating` are passed through inside `login`;
/// a login that does not redirect surfaces as `PlanError::Authentication`
/// (the `LoginFailed` leg) instead of a state value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Unauthenticated,
    Authenticating,
    Authenticated,
    SlotsDiscovered,
    Booked,
    BookingFailed,
    LoginFailed,
}

/// Session state captured from the restaurant backend.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub phase: SessionPhase,
    cookie: String,
    csrf_token: Option<String>,
    booking_url: Url,
}

impl SessionState {
    pub fn booking_url(&self) -> &Url {
        &self.booking_url
    }

    /// The anti-forgery token parsed from the booking page, once slot
    /// discovery has run.
    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }
}

/// The slot-discovery verdict for one (day, earliest hour) query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotOutcome {
    /// No bookable slot exists on the requested day at all.
    NoSlotForDay,
    /// The day has slots, but none at or after the requested hour.
    NoSlotThatLate,
    /// Qualifying one-hour windows, earliest first.
    Windows(Vec<DinnerWindow>),
}

/// The verdict of a booking submission.
///
/// A rejected submission is reported and never retried: a second silent
/// attempt against a live booking system risks a duplicate reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingOutcome {
    Booked,
    Failed { status: StatusCode },
}

/// One authenticated interaction with the restaurant system: login, slot
/// discovery, slot reservation.
pub struct BookingSession {
    http: Client,
}

impl BookingSession {
    /// Create a session with its own redirect-disabled HTTP client. The
    /// login and booking responses are redirects whose headers must be read,
    /// not followed.
    pub fn new() -> PlanResult<Self> {
        let http = Client::builder()
            .redirect(Policy::none())
            .build()
            .map_err(|source| PlanError::Client { source })?;
        Ok(Self { http })
    }

    /// Log in to the restaurant system.
    ///
    /// The backend answers a successful form login with a redirect; the
    /// session cookie and the redirect target make up the authenticated
    /// state. Any non-redirect answer, or a redirect missing either header,
    /// is an authentication failure, fatal for this session.
    pub async fn login(
        &self,
        base_url: &Url,
        credentials: &Credentials,
    ) -> PlanResult<SessionState> {
        let login_url = concat_url(base_url, "login")?;
        debug!(url = %login_url, phase = ?SessionPhase::Authenticating, "logging in");

        let response = self
            .http
            .post(login_url.clone())
            .form(&[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
                ("submit", "login"),
            ])
            .send()
            .await
            .map_err(|source| PlanError::Fetch {
                url: login_url.clone(),
                source,
            })?;

        let status = response.status();
        let location = header_value(&response, LOCATION);
        let set_cookie = header_value(&response, SET_COOKIE);

        let (Some(location), Some(set_cookie)) = (location, set_cookie) else {
            warn!(%status, phase = ?SessionPhase::LoginFailed, "login response missing redirect headers");
            return Err(PlanError::Authentication {
                url: login_url,
                status,
            });
        };
        if !status.is_redirection() {
            warn!(%status, phase = ?SessionPhase::LoginFailed, "login did not redirect");
            return Err(PlanError::Authentication {
                url: login_url,
                status,
            });
        }

        let booking_url = concat_url(base_url, &location)?;
        debug!(url = %booking_url, "authenticated");

        Ok(SessionState {
            phase: SessionPhase::Authenticated,
            cookie: session_cookie(&set_cookie),
            csrf_token: None,
            booking_url,
        })
    }

    /// Fetch the authenticated booking page, capture its CSRF token and
    /// decode the offered slots into windows for `day` at or after
    /// `min_hour`.
    pub async fn discover_slots(
        &self,
        state: SessionState,
        day: &Weekday,
        min_hour: u8,
    ) -> PlanResult<(SessionState, SlotOutcome)> {
        let url = state.booking_url.clone();
        let response = self
            .http
            .get(url.clone())
            .header(COOKIE, state.cookie.as_str())
            .send()
            .await
            .map_err(|source| PlanError::Fetch {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlanError::HttpStatus { url, status });
        }
        let body = response.text().await.map_err(|source| PlanError::Fetch {
            url: url.clone(),
            source,
        })?;

        let page = parse_booking_page(&body, &url)?;
        let outcome = filter_slots(&page.codes, day, min_hour);
        debug!(day = %day, min_hour, outcome = ?outcome, "slots discovered");

        let state = SessionState {
            phase: SessionPhase::SlotsDiscovered,
            csrf_token: Some(page.csrf_token),
            ..state
        };
        Ok((state, outcome))
    }

    /// Submit a reservation for one window. Exactly one attempt is made;
    /// anything but HTTP 200 is reported as a failed booking.
    pub async fn book_slot(
        &self,
        state: SessionState,
        day: &Weekday,
        window: &DinnerWindow,
    ) -> PlanResult<(SessionState, BookingOutcome)> {
        let Some(csrf_token) = state.csrf_token.clone() else {
            return Err(PlanError::MissingCsrfToken);
        };
        let Some(code) = BookingCode::new(day, window.start_hour()) else {
            return Err(PlanError::PageFormat {
                url: state.booking_url.to_string(),
                what: format!("day label \"{day}\" cannot form a booking code"),
            });
        };

        let url = state.booking_url.clone();
        let response = self
            .http
            .post(url.clone())
            .header(COOKIE, state.cookie.as_str())
            .form(&[
                ("group1", code.encode().as_str()),
                ("csrf_token", csrf_token.as_str()),
            ])
            .send()
            .await
            .map_err(|source| PlanError::Fetch { url, source })?;

        let status = response.status();
        let (phase, outcome) = if status == StatusCode::OK {
            (SessionPhase::Booked, BookingOutcome::Booked)
        } else {
            warn!(%status, "booking submission rejected; book manually");
            (SessionPhase::BookingFailed, BookingOutcome::Failed { status })
        };
        Ok((SessionState { phase, ..state }, outcome))
    }
}

/// The parts of the booking page the protocol needs.
#[derive(Debug)]
struct BookingPage {
    csrf_token: String,
    codes: Vec<BookingCode>,
}

/// Parse the hidden CSRF field and the slot inputs out of the booking page.
/// Slot values that do not decode as booking codes are skipped.
fn parse_booking_page(html: &str, url: &Url) -> PlanResult<BookingPage> {
    let document = Html::parse_document(html);

    let csrf_token = document
        .select(&css("input[name=\"csrf_token\"]"))
        .next()
        .and_then(|input| input.value().attr("value"))
        .map(str::to_string)
        .ok_or_else(|| PlanError::PageFormat {
            url: url.to_string(),
            what: "no hidden csrf_token field".to_string(),
        })?;

    let mut codes = Vec::new();
    for input in document.select(&css("input[name=\"group1\"]")) {
        let Some(value) = input.value().attr("value") else {
            continue;
        };
        match BookingCode::parse(value) {
            Some(code) => codes.push(code),
            None => warn!(value, "skipping undecodable slot code"),
        }
    }

    Ok(BookingPage { csrf_token, codes })
}

/// Filter decoded slot codes to the requested day, then to the hour floor.
fn filter_slots(codes: &[BookingCode], day: &Weekday, min_hour: u8) -> SlotOutcome {
    let day_codes: Vec<&BookingCode> =
        codes.iter().filter(|code| code.matches_day(day)).collect();
    if day_codes.is_empty() {
        return SlotOutcome::NoSlotForDay;
    }

    let mut windows: Vec<DinnerWindow> = day_codes
        .into_iter()
        .filter(|code| code.hour() >= min_hour)
        .map(DinnerWindow::from)
        .collect();
    if windows.is_empty() {
        return SlotOutcome::NoSlotThatLate;
    }

    windows.sort();
    windows.dedup();
    SlotOutcome::Windows(windows)
}

/// The `name=value` pair of a `Set-Cookie` header, without its attributes.
/// Replaying attributes like `Path` in a `Cookie` header would be malformed.
fn session_cookie(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_string()
}

fn header_value(response: &Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
