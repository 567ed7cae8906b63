//! Showtime discovery against the cinema's form-driven backend.
//!
//! The cinema page carries a day-selection and a movie-selection form; the
//! backend's check endpoint answers a (day code, movie code) query with slot
//! records. Day and movie codes are internal to the backend, so both are
//! resolved from the form options by their visible labels.

use chrono::NaiveTime;
use futures::future::join_all;
use scraper::Html;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::{PlanError, PlanResult};
use crate::fetch::{concat_url, css, PageClient};
use crate::plan::{Showing, Weekday};

/// Status flag the check endpoint uses for a bookable slot.
const BOOKABLE: u8 = 1;

/// One record returned by the check endpoint.
#[derive(Debug, Deserialize)]
struct SlotRecord {
    status: u8,
    #[serde(default)]
    time: Option<String>,
}

/// An `<option>` parsed from one of the cinema page's selection forms.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SelectOption {
    code: String,
    label: String,
}

/// All movies with a bookable showing on `day`.
///
/// Every movie is queried concurrently; results are flattened into one list,
/// each showing tagged with the requested day and the movie's display title
/// (never the backend code). A day the cinema does not offer yields an empty
/// list.
pub async fn available_showings(
    client: &PageClient,
    day: &Weekday,
    cinema_url: &Url,
) -> PlanResult<Vec<Showing>> {
    let html = client.fetch_html(cinema_url).await?;
    let (day_options, movie_options) = parse_forms(&html, cinema_url)?;

    let Some(day_code) = day_options
        .iter()
        .find(|option| Weekday::new(option.label.as_str()) == *day)
        .map(|option| option.code.clone())
    else {
        debug!(day = %day, "cinema offers no option for day");
        return Ok(Vec::new());
    };

    let queries = movie_options.iter().map(|movie| {
        let day_code = day_code.as_str();
        async move {
            let records = check_showings(client, cinema_url, day_code, &movie.code).await?;
            Ok::<_, PlanError>((movie.label.clone(), records))
        }
    });

    let mut showings = Vec::new();
    for result in join_all(queries).await {
        let (title, records) = result?;
        for record in records {
            if record.status != BOOKABLE {
                continue;
            }
            let Some(raw) = record.time else {
                continue;
            };
            match NaiveTime::parse_from_str(&raw, "%H:%M") {
                Ok(start) => showings.push(Showing {
                    day: day.clone(),
                    movie_title: title.clone(),
                    start,
                }),
                Err(error) => warn!(time = %raw, %error, "skipping unparseable showtime"),
            }
        }
    }

    debug!(day = %day, count = showings.len(), "bookable showings");
    Ok(showings)
}

/// Query the check endpoint for one (day, movie) pair.
async fn check_showings(
    client: &PageClient,
    cinema_url: &Url,
    day_code: &str,
    movie_code: &str,
) -> PlanResult<Vec<SlotRecord>> {
    let mut url = concat_url(cinema_url, "check")?;
    url.query_pairs_mut()
        .append_pair("day", day_code)
        .append_pair("movie", movie_code);
    client.fetch_json(&url).await
}

/// Parse the day and movie selection forms from the cinema page.
fn parse_forms(html: &str, url: &Url) -> PlanResult<(Vec<SelectOption>, Vec<SelectOption>)> {
    let document = Html::parse_document(html);
    let day_options = select_options(&document, css("select[name=\"day\"] option"));
    let movie_options = select_options(&document, css("select[name=\"movie\"] option"));

    if day_options.is_empty() || movie_options.is_empty() {
        return Err(PlanError::PageFormat {
            url: url.to_string(),
            what: "missing day or movie selection form".to_string(),
        });
    }
    Ok((day_options, movie_options))
}

/// Collect `(value, label)` pairs from option elements. Options with an
/// empty value are placeholders and are skipped.
fn select_options(document: &Html, selector: scraper::Selector) -> Vec<SelectOption> {
    document
        .select(&selector)
        .filter_map(|option| {
            let code = option.value().attr("value")?.trim().to_string();
            if code.is_empty() {
                return None;
            }
            let label = option.text().collect::<String>().trim().to_string();
            Some(SelectOption { code, label })
        })
        .collect()
}
