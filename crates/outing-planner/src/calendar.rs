//! Common availability across participant calendars.

use std::collections::HashMap;

use futures::future::join_all;
use scraper::{ElementRef, Html};
use tracing::debug;
use url::Url;

use crate::error::PlanResult;
use crate::fetch::{css, PageClient};
use crate::plan::Weekday;

/// Status cell text that marks a weekday as free.
const FREE_SENTINEL: &str = "ok";

/// Compute the weekdays on which every participant is free.
///
/// All calendar pages are fetched concurrently; the first fetch failure
/// aborts the whole computation and partial results are discarded. A weekday
/// is common iff every page marks it free; a page with no entry for some
/// weekday counts as unavailable on it.
pub async fn common_free_days(
    client: &PageClient,
    calendar_pages: &[Url],
) -> PlanResult<Vec<Weekday>> {
    let bodies = join_all(calendar_pages.iter().map(|url| client.fetch_html(url))).await;

    let mut per_page = Vec::with_capacity(bodies.len());
    for body in bodies {
        let free = free_days(&body?);
        debug!(days = ?free.iter().map(Weekday::label).collect::<Vec<_>>(), "free days on calendar");
        per_page.push(free);
    }
    Ok(intersect_free_days(&per_page))
}

/// Weekdays marked free on one calendar page, in header order, deduplicated.
///
/// The header `<th>` cells carry the weekday labels and the `<td>` cell at
/// the same index carries the status; whatever labels the header uses are
/// taken as the weekday identifiers.
fn free_days(html: &str) -> Vec<Weekday> {
    let document = Html::parse_document(html);
    let headers = css("th");
    let cells = css("td");

    let statuses: Vec<ElementRef<'_>> = document.select(&cells).collect();

    let mut free = Vec::new();
    for (index, header) in document.select(&headers).enumerate() {
        let Some(status) = statuses.get(index) else {
            continue;
        };
        if cell_text(status).to_lowercase() == FREE_SENTINEL {
            let day = Weekday::new(cell_text(&header));
            if !free.contains(&day) {
                free.push(day);
            }
        }
    }
    free
}

fn cell_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Intersect the per-page free-day lists: a day survives iff it appears in
/// every list. Days keep their first-seen order.
fn intersect_free_days(per_page: &[Vec<Weekday>]) -> Vec<Weekday> {
    let mut order: Vec<Weekday> = Vec::new();
    let mut counts: HashMap<Weekday, usize> = HashMap::new();

    for free in per_page {
        for day in free {
            if !counts.contains_key(day) {
                order.push(day.clone());
            }
            *counts.entry(day.clone()).or_insert(0) += 1;
        }
    }

    order.retain(|day| counts[day] == per_page.len());
    order
}
