// src/ingest/rss.rs
//! RSS parsing and normalization into `NewsRecord` skeletons.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::{OffsetDateTime, UtcOffset};

use crate::config::CrawlerConfig;
use crate::ingest::{normalize_text, truncate_chars};
use crate::record::{fingerprint, NewsRecord};

/// Company tag on a freshly normalized record, pending classification.
pub const COMPANY_PENDING: &str = "待分类";

const EXCERPT_MAX_CHARS: usize = 200;
const SUMMARY_MAX_CHARS: usize = 300;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
pub struct Item {
    pub title: Option<String>,
    pub link: Option<String>,
    #[serde(rename = "pubDate")]
    pub pub_date: Option<String>,
    #[serde(rename = "dc:date")]
    pub dc_date: Option<String>,
    pub description: Option<String>,
}

/// Parse raw feed XML into items.
pub fn parse_feed(xml: &str) -> Result<Vec<Item>> {
    let rss: Rss = from_str(xml).context("parsing rss xml")?;
    Ok(rss.channel.items)
}

/// Parse, normalize and window-filter one source's feed content.
/// Capture times are taken per record, so they are non-decreasing within
/// the run.
pub fn records_from_xml(
    xml: &str,
    source_name: &str,
    crawler: &CrawlerConfig,
) -> Result<Vec<NewsRecord>> {
    let items = parse_feed(xml)?;
    let cutoff = if crawler.days_to_fetch > 0 {
        Some(Utc::now() - Duration::days(crawler.days_to_fetch))
    } else {
        None
    };

    let mut out = Vec::new();
    for item in items.iter().take(crawler.max_items_per_source) {
        let Some(record) = to_record(item, source_name) else {
            continue;
        };
        // Entries with an unparseable date fell back to "now" and stay in.
        if let Some(cutoff) = cutoff {
            if record.publish_time < cutoff {
                continue;
            }
        }
        out.push(record);
    }
    Ok(out)
}

/// Map one feed item to a record skeleton. Returns `None` for items with
/// no usable title.
pub fn to_record(item: &Item, source_name: &str) -> Option<NewsRecord> {
    let title = normalize_text(item.title.as_deref().unwrap_or_default());
    if title.is_empty() {
        return None;
    }

    let url = item.link.as_deref().unwrap_or_default().trim().to_string();
    let body = normalize_text(item.description.as_deref().unwrap_or_default());

    let now = Utc::now();
    let publish_time = publish_time_of(item).unwrap_or(now);

    Some(NewsRecord {
        id: fingerprint(if url.is_empty() { &title } else { &url }),
        title,
        url,
        source: source_name.to_string(),
        company: COMPANY_PENDING.to_string(),
        publish_time,
        capture_time: now,
        excerpt: truncate_chars(&body, EXCERPT_MAX_CHARS),
        summary: truncate_chars(&body, SUMMARY_MAX_CHARS),
        is_hr_related: false,
        hr_category: None,
        keywords: Vec::new(),
    })
}

/// First parsable time field wins: `pubDate` (RFC 2822), then `dc:date`
/// (RFC 3339). Callers fall back to the capture time.
fn publish_time_of(item: &Item) -> Option<DateTime<Utc>> {
    item.pub_date
        .as_deref()
        .and_then(parse_feed_datetime)
        .or_else(|| item.dc_date.as_deref().and_then(parse_feed_datetime))
}

fn parse_feed_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let odt = OffsetDateTime::parse(raw.trim(), &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(raw.trim(), &Rfc3339))
        .ok()?;
    DateTime::from_timestamp(odt.to_offset(UtcOffset::UTC).unix_timestamp(), 0)
}
