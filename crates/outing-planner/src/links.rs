//! Link discovery: single-pass extraction of a page's hyperlinks.

use std::collections::BTreeSet;

use scraper::Html;
use tracing::debug;
use url::Url;

use crate::error::PlanResult;
use crate::fetch::{css, PageClient};

/// Fetch a page and return every hyperlink target as an absolute URL,
/// deduplicated and sorted.
pub async fn discover_links(client: &PageClient, page_url: &Url) -> PlanResult<Vec<Url>> {
    let html = client.fetch_html(page_url).await?;
    let links = extract_links(&html, page_url);
    debug!(url = %page_url, count = links.len(), "links discovered");
    Ok(links)
}

/// Resolve all `<a href>` targets against the page URL. Targets that do not
/// combine into a URL are dropped.
fn extract_links(html: &str, base: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let anchors = css("a[href]");

    let mut seen = BTreeSet::new();
    for anchor in document.select(&anchors) {
        if let Some(href) = anchor.value().attr("href") {
            if let Ok(resolved) = base.join(href) {
                seen.insert(resolved);
            }
        }
    }
    seen.into_iter().collect()
}
