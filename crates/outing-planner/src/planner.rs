//! Plan orchestration: correlate the calendar, cinema and restaurant sources
//! into day plans.
//!
//! Batched lookups run concurrently, and every batch result is re-associated
//! with its originating request by day identity. Nothing is correlated by
//! array position: the number of showings and windows per day varies, so
//! positional pairing would silently mismatch them.

use std::collections::HashMap;

use futures::future::join_all;
use tracing::{debug, info};
use url::Url;

use crate::booking::{BookingOutcome, BookingSession, Credentials, SlotOutcome};
use crate::calendar;
use crate::cinema;
use crate::error::{PlanError, PlanResult};
use crate::fetch::PageClient;
use crate::links;
use crate::plan::{DinnerWindow, Plan, Showing, Weekday};

/// Path substrings identifying the seed page's section links.
const CALENDAR_PATTERN: &str = "calendar";
const CINEMA_PATTERN: &str = "cinema";
const RESTAURANT_PATTERN: &str = "dinner";

/// How a movie and a dinner slot are allowed to combine.
#[derive(Debug, Clone, Copy)]
pub struct MatchPolicy {
    /// Hours between a movie's start and the earliest acceptable dinner.
    pub dinner_buffer_hours: u8,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            dinner_buffer_hours: 2,
        }
    }
}

impl MatchPolicy {
    /// Earliest dinner hour acceptable after a showing, or None when the
    /// showing runs too late for any same-day hour to qualify.
    fn earliest_dinner_hour(&self, showing: &Showing) -> Option<u8> {
        let hour = showing.start_hour().checked_add(self.dinner_buffer_hours)?;
        (hour <= 23).then_some(hour)
    }
}

/// Configuration for a planning run.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub credentials: Credentials,
    pub policy: MatchPolicy,
}

/// The overall verdict of a planning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    /// At least one workable day, in common-day order.
    Plans(Vec<Plan>),
    /// The participants share no free weekday.
    NoCommonDay,
    /// Common days exist, but no day has a movie/dinner combination.
    NoPlanFound,
}

/// Section URLs discovered from the seed page.
struct SectionUrls {
    calendar: Url,
    cinema: Url,
    restaurant: Url,
}

/// Orchestrates the calendar, cinema and restaurant sources into day plans.
pub struct PlanMatcher {
    http: PageClient,
    config: PlannerConfig,
}

impl PlanMatcher {
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            http: PageClient::new(),
            config,
        }
    }

    /// Compute every workable (day, movie, dinner) plan reachable from the
    /// seed page.
    pub async fn find_plans(&self, seed_url: &Url) -> PlanResult<PlanOutcome> {
        let sections = self.discover_sections(seed_url).await?;

        // The calendar section links one page per participant.
        let calendar_pages = links::discover_links(&self.http, &sections.calendar).await?;
        let common_days = calendar::common_free_days(&self.http, &calendar_pages).await?;
        if common_days.is_empty() {
            info!("no weekday works for every participant");
            return Ok(PlanOutcome::NoCommonDay);
        }
        info!(
            days = ?common_days.iter().map(Weekday::label).collect::<Vec<_>>(),
            "common free days"
        );

        let showings_by_day = self.collect_showings(&common_days, &sections.cinema).await?;
        let windows_by_day = self
            .collect_windows(&showings_by_day, &sections.restaurant)
            .await?;

        let plans = match_plans(
            &common_days,
            &showings_by_day,
            &windows_by_day,
            self.config.policy,
        );
        if plans.is_empty() {
            info!("no day has a matching movie and dinner slot");
            Ok(PlanOutcome::NoPlanFound)
        } else {
            Ok(PlanOutcome::Plans(plans))
        }
    }

    /// Execute the reservation for a computed plan through one fresh
    /// session: login, re-discover (arming the CSRF token), book. A rejected
    /// submission comes back as `BookingOutcome::Failed` and is never
    /// retried.
    pub async fn book_plan(&self, seed_url: &Url, plan: &Plan) -> PlanResult<BookingOutcome> {
        let sections = self.discover_sections(seed_url).await?;

        let session = BookingSession::new()?;
        let state = session
            .login(&sections.restaurant, &self.config.credentials)
            .await?;
        let (state, _slots) = session
            .discover_slots(state, &plan.day, plan.dinner_window.start_hour())
            .await?;
        let (_state, outcome) = session
            .book_slot(state, &plan.day, &plan.dinner_window)
            .await?;
        Ok(outcome)
    }

    /// Resolve the three section URLs from the seed page's links.
    async fn discover_sections(&self, seed_url: &Url) -> PlanResult<SectionUrls> {
        let links = links::discover_links(&self.http, seed_url).await?;
        Ok(SectionUrls {
            calendar: section_link(&links, CALENDAR_PATTERN)?,
            cinema: section_link(&links, CINEMA_PATTERN)?,
            restaurant: section_link(&links, RESTAURANT_PATTERN)?,
        })
    }

    /// Fetch showings for every common day concurrently, keyed by day.
    async fn collect_showings(
        &self,
        days: &[Weekday],
        cinema_url: &Url,
    ) -> PlanResult<HashMap<Weekday, Vec<Showing>>> {
        let queries = days.iter().map(|day| async move {
            let showings = cinema::available_showings(&self.http, day, cinema_url).await?;
            Ok::<_, PlanError>((day.clone(), showings))
        });

        let mut by_day = HashMap::new();
        for result in join_all(queries).await {
            let (day, showings) = result?;
            by_day.insert(day, showings);
        }
        Ok(by_day)
    }

    /// Discover dinner windows for every showing concurrently, keyed by day.
    ///
    /// Cookie and CSRF state are tied to one server-side session, so every
    /// concurrent lookup runs through its own `BookingSession`. Only
    /// structured window results are collected; per-day misses are expected
    /// and logged, while fetch or login failures abort the batch.
    async fn collect_windows(
        &self,
        showings_by_day: &HashMap<Weekday, Vec<Showing>>,
        restaurant_url: &Url,
    ) -> PlanResult<HashMap<Weekday, Vec<DinnerWindow>>> {
        let queries = showings_by_day
            .values()
            .flatten()
            .filter_map(|showing| {
                let min_hour = self.config.policy.earliest_dinner_hour(showing)?;
                Some(async move {
                    let session = BookingSession::new()?;
                    let state = session
                        .login(restaurant_url, &self.config.credentials)
                        .await?;
                    let (_state, outcome) =
                        session.discover_slots(state, &showing.day, min_hour).await?;
                    Ok::<_, PlanError>((showing.day.clone(), outcome))
                })
            });

        let mut by_day: HashMap<Weekday, Vec<DinnerWindow>> = HashMap::new();
        for result in join_all(queries).await {
            let (day, outcome) = result?;
            match outcome {
                SlotOutcome::Windows(windows) => {
                    by_day.entry(day).or_default().extend(windows);
                }
                SlotOutcome::NoSlotForDay => debug!(day = %day, "no dinner slot for day"),
                SlotOutcome::NoSlotThatLate => debug!(day = %day, "no dinner slot late enough"),
            }
        }
        for windows in by_day.values_mut() {
            windows.sort();
            windows.dedup();
        }
        Ok(by_day)
    }
}

fn section_link(links: &[Url], pattern: &'static str) -> PlanResult<Url> {
    links
        .iter()
        .find(|url| url.path().contains(pattern))
        .cloned()
        .ok_or(PlanError::MissingSection { section: pattern })
}

/// Pair showings with dinner windows, keyed by day identity.
///
/// A showing qualifies when some window on the same day starts at or after
/// its dinner threshold. Each qualifying day yields one plan, built from its
/// earliest qualifying showing and that showing's earliest window.
fn match_plans(
    days: &[Weekday],
    showings_by_day: &HashMap<Weekday, Vec<Showing>>,
    windows_by_day: &HashMap<Weekday, Vec<DinnerWindow>>,
    policy: MatchPolicy,
) -> Vec<Plan> {
    let mut plans = Vec::new();
    for day in days {
        let Some(showings) = showings_by_day.get(day) else {
            continue;
        };
        let Some(windows) = windows_by_day.get(day) else {
            continue;
        };

        let mut candidates: Vec<(&Showing, DinnerWindow)> = showings
            .iter()
            .filter_map(|showing| {
                let threshold = policy.earliest_dinner_hour(showing)?;
                let window = windows
                    .iter()
                    .filter(|window| window.start_hour() >= threshold)
                    .min()?;
                Some((showing, *window))
            })
            .collect();

        candidates.sort_by_key(|(showing, _)| showing.start);
        if let Some((showing, window)) = candidates.first() {
            plans.push(Plan {
                day: day.clone(),
                movie_title: showing.movie_title.clone(),
                movie_start: showing.start,
                dinner_window: *window,
            });
        }
    }
    plans
}
