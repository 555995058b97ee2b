// tests/pipeline_e2e.rs
// Fixture feed → normalize → dedup → heuristic classify → store merge →
// weekly digest, against the shipped configuration.

use auto_hr_monitor::classify::Classifier;
use auto_hr_monitor::config::AppConfig;
use auto_hr_monitor::digest::build_weekly_digest;
use auto_hr_monitor::ingest::dedup_by_title;
use auto_hr_monitor::ingest::rss::records_from_xml;
use auto_hr_monitor::record::fingerprint;
use auto_hr_monitor::store::NewsStore;

const FEED: &str = include_str!("fixtures/auto_feed.xml");

#[tokio::test]
async fn feed_to_digest_heuristic_run() {
    let cfg = AppConfig::load_from_file("config/monitor.toml").unwrap();

    // Ingest: parse + window, then intra-batch title dedup.
    let batch = records_from_xml(FEED, "36氪", &cfg.crawler).unwrap();
    assert_eq!(batch.len(), 4);
    let (mut records, removed) = dedup_by_title(batch);
    assert_eq!(removed, 1);
    assert_eq!(records.len(), 3);

    // Classify with the heuristic strategy.
    let classifier = Classifier::new(&cfg, None);
    for record in &mut records {
        classifier.classify(record).await;
    }

    let xiaomi = records.iter().find(|r| r.url == "https://x.com/a").unwrap();
    assert_eq!(xiaomi.id, fingerprint("https://x.com/a"));
    assert_eq!(xiaomi.company, "小米汽车");
    assert!(xiaomi.is_hr_related);
    assert_eq!(xiaomi.hr_category.as_deref(), Some("招聘与人才"));
    assert!(xiaomi.keywords.iter().any(|k| k == "校招"));

    let nio = records.iter().find(|r| r.url == "https://x.com/c").unwrap();
    assert_eq!(nio.company, "蔚来汽车");
    assert!(nio.is_hr_related);
    assert_eq!(nio.hr_category.as_deref(), Some("薪酬福利"));

    let tech = records.iter().find(|r| r.url == "https://x.com/b").unwrap();
    assert!(!tech.is_hr_related);
    assert_eq!(tech.hr_category, None);
    assert!(tech.keywords.is_empty());

    // Persist only relevant records, as the crawl run does.
    let dir = tempfile::tempdir().unwrap();
    let store = NewsStore::new(dir.path().join("news.json"), cfg.crawler.max_records);
    let relevant: Vec<_> = records.into_iter().filter(|r| r.is_hr_related).collect();
    assert_eq!(store.merge(&relevant).unwrap(), 2);
    // A second run with the same feed adds nothing.
    assert_eq!(store.merge(&relevant).unwrap(), 0);

    // The freshly captured records show up in this week's digest.
    let stored = store.load_all().unwrap();
    let digest = build_weekly_digest(&stored, None).await;
    assert!(digest
        .top_events
        .iter()
        .any(|e| e.title == "小米汽车启动2025校招，offer量创新高"));
    assert!(digest
        .company_updates
        .iter()
        .any(|u| u.company == "小米汽车" && u.count == 1));
}
