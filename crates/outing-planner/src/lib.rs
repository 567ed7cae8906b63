//! Outing planner - coordinate a shared availability calendar, a cinema and a
//! restaurant booking system into a day/movie/dinner plan for a whole group.
//!
//! The planning pipeline:
//! 1. Discover the calendar/cinema/restaurant sections from a seed page
//! 2. Intersect per-participant calendars into the common free weekdays
//! 3. Collect bookable showings for every common day
//! 4. Discover dinner windows per showing through authenticated sessions
//! 5. Match showings to windows by day and emit one plan per workable day

pub mod booking;
pub mod calendar;
pub mod cinema;
pub mod error;
pub mod fetch;
pub mod links;
pub mod plan;
pub mod planner;

pub use booking::{
    BookingOutcome, BookingSession, Credentials, SessionPhase, SessionState, SlotOutcome,
};
pub use error::{PlanError, PlanResult};
pub use plan::{BookingCode, DinnerWindow, Plan, Showing, Weekday};
pub use planner::{MatchPolicy, PlanMatcher, PlanOutcome, PlannerConfig};
