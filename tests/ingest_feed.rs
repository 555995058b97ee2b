// tests/ingest_feed.rs
// Feed fixture → record skeletons: window filter, per-source cap, id hashing.

use auto_hr_monitor::config::CrawlerConfig;
use auto_hr_monitor::ingest::rss::records_from_xml;
use auto_hr_monitor::record::fingerprint;

const FEED: &str = include_str!("fixtures/auto_feed.xml");

fn crawler() -> CrawlerConfig {
    // Empty TOML exercises every serde default.
    toml::from_str("").unwrap()
}

#[test]
fn fixture_parses_and_windows_out_stale_items() {
    let records = records_from_xml(FEED, "36氪", &crawler()).unwrap();
    // Five items in the fixture; the 2020 one falls outside the 7-day window.
    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|r| r.source == "36氪"));
    assert!(records.iter().all(|r| !r.title.is_empty()));
}

#[test]
fn ids_hash_the_link() {
    let records = records_from_xml(FEED, "36氪", &crawler()).unwrap();
    let xiaomi = records
        .iter()
        .find(|r| r.url == "https://x.com/a")
        .expect("fixture entry present");
    assert_eq!(xiaomi.id, fingerprint("https://x.com/a"));
    assert_eq!(xiaomi.title, "小米汽车启动2025校招，offer量创新高");
    assert_eq!(xiaomi.excerpt, "小米汽车今日宣布...");
}

#[test]
fn per_source_cap_limits_the_batch() {
    let mut cfg = crawler();
    cfg.max_items_per_source = 2;
    let records = records_from_xml(FEED, "36氪", &cfg).unwrap();
    assert_eq!(records.len(), 2);
}

#[test]
fn capture_times_are_monotonic_within_a_run() {
    let records = records_from_xml(FEED, "36氪", &crawler()).unwrap();
    for pair in records.windows(2) {
        assert!(pair[0].capture_time <= pair[1].capture_time);
    }
}
