//! End-to-end tests against an in-process fixture of the three web systems.
//!
//! The fixture serves a seed page, two participant calendars, a cinema with
//! a form-driven check endpoint, and a restaurant that requires the full
//! login -> cookie -> CSRF protocol. It keeps a booking-POST counter so the
//! no-retry guarantee can be observed, and a couple of toggles to produce
//! the conflict and no-slot scenarios.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use chrono::NaiveTime;
use serde::Deserialize;
use url::Url;

use outing_planner::{
    BookingOutcome, BookingSession, Credentials, DinnerWindow, MatchPolicy, Plan, PlanError,
    PlanMatcher, PlanOutcome, PlannerConfig, SessionPhase, SlotOutcome, Weekday,
};

const SESSION_COOKIE: &str = "sessionid=fixture123";
const CSRF_TOKEN: &str = "tok-e2e-411";

#[derive(Clone, Default)]
struct FixtureState {
    booking_posts: Arc<AtomicUsize>,
    fail_bookings: bool,
    conflicting_calendars: bool,
    early_slots_only: bool,
}

async fn seed_page() -> Html<&'static str> {
    Html(
        r#"<html><body>
          <a href="/calendar/">Shared calendar</a>
          <a href="/cinema/">Cinema</a>
          <a href="/dinner/">Dinner at Zekes</a>
        </body></html>"#,
    )
}

async fn calendar_index() -> Html<&'static str> {
    Html(
        r#"<html><body>
          <a href="ann.html">Ann</a>
          <a href="bob.html">Bob</a>
        </body></html>"#,
    )
}

async fn ann_calendar() -> Html<&'static str> {
    Html(
        r#"<table>
          <tr><th>Friday</th><th>Saturday</th><th>Sunday</th></tr>
          <tr><td>busy</td><td>ok</td><td>-</td></tr>
        </table>"#,
    )
}

async fn bob_calendar(State(state): State<FixtureState>) -> Html<&'static str> {
    if state.conflicting_calendars {
        // Free on Friday only, while Ann is free on Saturday only.
        Html(
            r#"<table>
              <tr><th>Friday</th><th>Saturday</th><th>Sunday</th></tr>
              <tr><td>ok</td><td>busy</td><td>busy</td></tr>
            </table>"#,
        )
    } else {
        Html(
            r#"<table>
              <tr><th>Friday</th><th>Saturday</th><th>Sunday</th></tr>
              <tr><td>ok</td><td> OK </td><td>busy</td></tr>
            </table>"#,
        )
    }
}

async fn cinema_page() -> Html<&'static str> {
    Html(
        r#"<html><body><form>
          <select name="day">
            <option value="">Choose a day</option>
            <option value="05">Friday</option>
            <option value="06">Saturday</option>
          </select>
          <select name="movie">
            <option value="">Pick a movie</option>
            <option value="01">The Flying Deuces</option>
            <option value="02">Keeping up with the Joneses</option>
          </select>
          <button id="check">Check</button>
        </form></body></html>"#,
    )
}

#[derive(Deserialize)]
struct CheckQuery {
    day: String,
    movie: String,
}

async fn check(Query(query): Query<CheckQuery>) -> Json<serde_json::Value> {
    let records = match (query.day.as_str(), query.movie.as_str()) {
        ("06", "02") => serde_json::json!([{"status": 1, "time": "19:00"}]),
        ("06", "01") => serde_json::json!([{"status": 0, "time": "19:00"}]),
        _ => serde_json::json!([]),
    };
    Json(records)
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
    submit: String,
}

async fn login(Form(form): Form<LoginForm>) -> impl IntoResponse {
    if form.username == "zeke" && form.password == "coys" && form.submit == "login" {
        (
            StatusCode::FOUND,
            [
                (header::LOCATION, "login/booking"),
                (
                    header::SET_COOKIE,
                    "sessionid=fixture123; Path=/; HttpOnly",
                ),
            ],
            "",
        )
            .into_response()
    } else {
        // Wrong credentials land back on the login page with a 200.
        (StatusCode::OK, "login failed").into_response()
    }
}

fn has_session_cookie(headers: &HeaderMap) -> bool {
    headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        == Some(SESSION_COOKIE)
}

async fn booking_page(
    State(state): State<FixtureState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !has_session_cookie(&headers) {
        return (StatusCode::FORBIDDEN, Html("")).into_response();
    }
    let slots = if state.early_slots_only {
        r#"<input type="radio" name="group1" value="fri20" />
           <input type="radio" name="group1" value="sat14" />"#
    } else {
        r#"<input type="radio" name="group1" value="fri20" />
           <input type="radio" name="group1" value="sat14" />
           <input type="radio" name="group1" value="sat21" />"#
    };
    Html(format!(
        r#"<html><body><form method="post">
          <input type="hidden" name="csrf_token" value="{CSRF_TOKEN}" />
          {slots}
        </form></body></html>"#
    ))
    .into_response()
}

#[derive(Deserialize)]
struct BookingForm {
    group1: String,
    csrf_token: String,
}

async fn submit_booking(
    State(state): State<FixtureState>,
    headers: HeaderMap,
    Form(form): Form<BookingForm>,
) -> StatusCode {
    state.booking_posts.fetch_add(1, Ordering::SeqCst);
    if !has_session_cookie(&headers) || form.csrf_token != CSRF_TOKEN {
        return StatusCode::FORBIDDEN;
    }
    if form.group1.len() != 5 {
        return StatusCode::BAD_REQUEST;
    }
    if state.fail_bookings {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    }
}

fn fixture_router(state: FixtureState) -> Router {
    Router::new()
        .route("/start/", get(seed_page))
        .route("/calendar/", get(calendar_index))
        .route("/calendar/ann.html", get(ann_calendar))
        .route("/calendar/bob.html", get(bob_calendar))
        .route("/cinema/", get(cinema_page))
        .route("/cinema/check", get(check))
        .route("/dinner/login", post(login))
        .route("/dinner/login/booking", get(booking_page).post(submit_booking))
        .with_state(state)
}

/// Serve the fixture on an ephemeral port and return its base URL.
async fn spawn_fixture(state: FixtureState) -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, fixture_router(state)).await.unwrap();
    });
    Url::parse(&format!("http://{addr}/")).unwrap()
}

fn credentials() -> Credentials {
    Credentials {
        username: "zeke".to_string(),
        password: "coys".to_string(),
    }
}

fn matcher() -> PlanMatcher {
    PlanMatcher::new(PlannerConfig {
        credentials: credentials(),
        policy: MatchPolicy::default(),
    })
}

#[tokio::test]
async fn test_finds_the_saturday_plan() {
    let base = spawn_fixture(FixtureState::default()).await;
    let seed = base.join("start/").unwrap();

    let outcome = matcher().find_plans(&seed).await.unwrap();

    let expected = Plan {
        day: Weekday::new("Saturday"),
        movie_title: "Keeping up with the Joneses".to_string(),
        movie_start: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
        dinner_window: DinnerWindow::new(21).unwrap(),
    };
    assert_eq!(outcome, PlanOutcome::Plans(vec![expected]));
}

#[tokio::test]
async fn test_reports_no_common_day() {
    let base = spawn_fixture(FixtureState {
        conflicting_calendars: true,
        ..FixtureState::default()
    })
    .await;
    let seed = base.join("start/").unwrap();

    let outcome = matcher().find_plans(&seed).await.unwrap();
    assert_eq!(outcome, PlanOutcome::NoCommonDay);
}

#[tokio::test]
async fn test_reports_no_plan_when_dinner_is_too_early() {
    let base = spawn_fixture(FixtureState {
        early_slots_only: true,
        ..FixtureState::default()
    })
    .await;
    let seed = base.join("start/").unwrap();

    let outcome = matcher().find_plans(&seed).await.unwrap();
    assert_eq!(outcome, PlanOutcome::NoPlanFound);
}

#[tokio::test]
async fn test_books_the_first_plan() {
    let state = FixtureState::default();
    let posts = state.booking_posts.clone();
    let base = spawn_fixture(state).await;
    let seed = base.join("start/").unwrap();

    let matcher = matcher();
    let PlanOutcome::Plans(plans) = matcher.find_plans(&seed).await.unwrap() else {
        panic!("expected plans");
    };

    let outcome = matcher.book_plan(&seed, &plans[0]).await.unwrap();
    assert_eq!(outcome, BookingOutcome::Booked);
    assert_eq!(posts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_login_without_redirect_is_an_authentication_error() {
    let base = spawn_fixture(FixtureState::default()).await;
    let dinner = base.join("dinner/").unwrap();

    let session = BookingSession::new().unwrap();
    let wrong = Credentials {
        username: "zeke".to_string(),
        password: "wrong".to_string(),
    };
    let error = session.login(&dinner, &wrong).await.unwrap_err();
    assert!(matches!(
        error,
        PlanError::Authentication { status, .. } if status == StatusCode::OK
    ));
}

#[tokio::test]
async fn test_session_phases_and_discovery_outcomes() {
    let base = spawn_fixture(FixtureState::default()).await;
    let dinner = base.join("dinner/").unwrap();
    let saturday = Weekday::new("Saturday");

    let session = BookingSession::new().unwrap();
    let state = session.login(&dinner, &credentials()).await.unwrap();
    assert_eq!(state.phase, SessionPhase::Authenticated);
    assert_eq!(state.csrf_token(), None);

    let (discovered, outcome) = session
        .discover_slots(state.clone(), &saturday, 21)
        .await
        .unwrap();
    assert_eq!(discovered.phase, SessionPhase::SlotsDiscovered);
    assert_eq!(discovered.csrf_token(), Some(CSRF_TOKEN));
    assert_eq!(
        outcome,
        SlotOutcome::Windows(vec![DinnerWindow::new(21).unwrap()])
    );

    let (_state, outcome) = session
        .discover_slots(state.clone(), &saturday, 22)
        .await
        .unwrap();
    assert_eq!(outcome, SlotOutcome::NoSlotThatLate);

    let (_state, outcome) = session
        .discover_slots(state.clone(), &Weekday::new("Sunday"), 0)
        .await
        .unwrap();
    assert_eq!(outcome, SlotOutcome::NoSlotForDay);
}

#[tokio::test]
async fn test_booking_before_discovery_is_rejected() {
    let base = spawn_fixture(FixtureState::default()).await;
    let dinner = base.join("dinner/").unwrap();

    let session = BookingSession::new().unwrap();
    let state = session.login(&dinner, &credentials()).await.unwrap();

    let error = session
        .book_slot(
            state,
            &Weekday::new("Saturday"),
            &DinnerWindow::new(21).unwrap(),
        )
        .await
        .unwrap_err();
    assert!(matches!(error, PlanError::MissingCsrfToken));
}

#[tokio::test]
async fn test_failed_booking_is_not_retried() {
    let state = FixtureState {
        fail_bookings: true,
        ..FixtureState::default()
    };
    let posts = state.booking_posts.clone();
    let base = spawn_fixture(state).await;
    let dinner = base.join("dinner/").unwrap();
    let saturday = Weekday::new("Saturday");

    let session = BookingSession::new().unwrap();
    let state = session.login(&dinner, &credentials()).await.unwrap();
    let (state, _outcome) = session.discover_slots(state, &saturday, 21).await.unwrap();

    let (state, outcome) = session
        .book_slot(state, &saturday, &DinnerWindow::new(21).unwrap())
        .await
        .unwrap();
    assert_eq!(state.phase, SessionPhase::BookingFailed);
    assert_eq!(
        outcome,
        BookingOutcome::Failed {
            status: StatusCode::INTERNAL_SERVER_ERROR
        }
    );
    assert_eq!(posts.load(Ordering::SeqCst), 1, "no retry may be issued");
}
