// tests/ingest_dedup.rs
use auto_hr_monitor::ingest::{dedup_by_title, normalize_title};
use auto_hr_monitor::record::{fingerprint, NewsRecord};
use chrono::Utc;

fn record(title: &str, url: &str) -> NewsRecord {
    NewsRecord {
        id: fingerprint(url),
        title: title.to_string(),
        url: url.to_string(),
        source: "36氪".into(),
        company: "待分类".into(),
        publish_time: Utc::now(),
        capture_time: Utc::now(),
        excerpt: String::new(),
        summary: String::new(),
        is_hr_related: false,
        hr_category: None,
        keywords: Vec::new(),
    }
}

#[test]
fn case_space_punct_variants_are_duplicates() {
    let batch = vec![
        record("Company X Hires CHO", "https://x.com/1"),
        record(" company x hires cho! ", "https://x.com/2"),
    ];
    let (kept, removed) = dedup_by_title(batch);
    assert_eq!(kept.len(), 1);
    assert_eq!(removed, 1);
    // First occurrence wins.
    assert_eq!(kept[0].url, "https://x.com/1");
}

#[test]
fn cjk_titles_normalize_the_same_way() {
    let batch = vec![
        record("小米汽车启动2025校招，offer量创新高", "https://x.com/a"),
        record(" 小米汽车启动2025校招，OFFER量创新高！ ", "https://x.com/b"),
        record("蔚来发布年终奖方案", "https://x.com/c"),
    ];
    let (kept, removed) = dedup_by_title(batch);
    assert_eq!(kept.len(), 2);
    assert_eq!(removed, 1);
}

#[test]
fn distinct_titles_survive() {
    let batch = vec![
        record("特斯拉上海工厂扩招", "https://x.com/1"),
        record("特斯拉柏林工厂扩招", "https://x.com/2"),
    ];
    let (kept, removed) = dedup_by_title(batch);
    assert_eq!(kept.len(), 2);
    assert_eq!(removed, 0);
    assert_ne!(normalize_title(&kept[0].title), normalize_title(&kept[1].title));
}
