// src/ingest/mod.rs
pub mod fetch;
pub mod rss;

use crate::config::AppConfig;
use crate::ingest::fetch::Fetcher;
use crate::record::NewsRecord;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::HashSet;

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_entries_total", "Entries parsed from feed sources.");
        describe_counter!("ingest_kept_total", "Records kept after normalization.");
        describe_counter!("ingest_dedup_total", "Records removed by title dedup.");
        describe_counter!("ingest_source_errors_total", "Source fetch/parse errors.");
    });
}

/// Normalize free text from a feed: HTML entity decode, strip tags,
/// collapse whitespace, trim.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

/// Title fingerprint for intra-batch dedup: lowercase, then drop everything
/// that is neither a word character nor CJK.
pub fn normalize_title(title: &str) -> String {
    static RE_KEEP: OnceCell<Regex> = OnceCell::new();
    let re = RE_KEEP.get_or_init(|| Regex::new(r"[^\w\x{4e00}-\x{9fff}]").unwrap());
    re.replace_all(&title.to_lowercase(), "").to_string()
}

/// Char-bounded truncation; CJK-safe.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        s.chars().take(max).collect()
    } else {
        s.to_string()
    }
}

/// Intra-batch dedup: first occurrence of a normalized title wins.
/// Returns (kept, removed_count).
pub fn dedup_by_title(records: Vec<NewsRecord>) -> (Vec<NewsRecord>, usize) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut kept = Vec::with_capacity(records.len());
    let mut removed = 0usize;

    for record in records {
        if seen.insert(normalize_title(&record.title)) {
            kept.push(record);
        } else {
            removed += 1;
        }
    }

    (kept, removed)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct IngestStats {
    pub fetched: usize,
    pub kept: usize,
    pub deduped: usize,
    pub source_errors: usize,
}

/// Fetch every enabled source once, normalize into record skeletons, and
/// dedup across the batch. One failing source never aborts the others: the
/// error is logged and counted, and that source contributes zero records.
pub async fn run_once(cfg: &AppConfig, fetcher: &Fetcher) -> (Vec<NewsRecord>, IngestStats) {
    ensure_metrics_described();

    let mut stats = IngestStats::default();
    let mut batch = Vec::new();

    for source in cfg.enabled_sources() {
        match fetcher.fetch_source(source).await {
            Ok(xml) => match rss::records_from_xml(&xml, &source.name, &cfg.crawler) {
                Ok(mut records) => {
                    tracing::info!(source = %source.name, count = records.len(), "source parsed");
                    counter!("ingest_entries_total").increment(records.len() as u64);
                    stats.fetched += records.len();
                    batch.append(&mut records);
                }
                Err(e) => {
                    tracing::warn!(error = ?e, source = %source.name, "feed parse error");
                    counter!("ingest_source_errors_total").increment(1);
                    stats.source_errors += 1;
                }
            },
            Err(e) => {
                tracing::warn!(error = ?e, source = %source.name, "source fetch error");
                counter!("ingest_source_errors_total").increment(1);
                stats.source_errors += 1;
            }
        }

        // Fixed pause between sources so we do not hammer the hosts.
        fetcher.pause().await;
    }

    let (kept, removed) = dedup_by_title(batch);
    stats.kept = kept.len();
    stats.deduped = removed;
    counter!("ingest_kept_total").increment(kept.len() as u64);
    counter!("ingest_dedup_total").increment(removed as u64);

    (kept, stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_strips_tags_and_entities() {
        let s = "  <p>小米汽车&nbsp;今日宣布</p>\n<b>扩招</b>  ";
        assert_eq!(normalize_text(s), "小米汽车 今日宣布 扩招");
    }

    #[test]
    fn normalize_title_drops_case_space_punct() {
        assert_eq!(
            normalize_title(" Company X Hires CHO! "),
            normalize_title("company x hires cho")
        );
        assert_eq!(normalize_title("小米汽车，启动“校招”"), "小米汽车启动校招");
    }

    #[test]
    fn truncate_is_char_based() {
        assert_eq!(truncate_chars("小米汽车启动校招", 4), "小米汽车");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
