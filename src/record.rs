// src/record.rs
//! Canonical news record plus the content fingerprint used as its id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One monitored news item. This is the unit the store persists and the
/// dashboard reads; field names match the JSON documents on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsRecord {
    /// Deterministic hash of the url (or title when the url is absent).
    pub id: String,
    pub title: String,
    pub url: String,
    /// Feed/site name the item came from.
    pub source: String,
    /// Tracked company name, the industry label, or "其他" / "待分类".
    pub company: String,
    pub publish_time: DateTime<Utc>,
    /// Ingestion timestamp; the store sorts and truncates by this field.
    pub capture_time: DateTime<Utc>,
    /// Raw truncated excerpt of the feed entry (<= 200 chars).
    #[serde(rename = "abstract")]
    pub excerpt: String,
    /// Generated or passed-through summary (<= 300 chars).
    pub summary: String,
    pub is_hr_related: bool,
    pub hr_category: Option<String>,
    /// At most 5, in match/extraction order.
    pub keywords: Vec<String>,
}

/// Ephemeral classifier output, merged onto a record and never persisted
/// on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub is_hr_related: bool,
    pub category: Option<String>,
    pub summary: Option<String>,
    pub keywords: Vec<String>,
}

impl NewsRecord {
    /// Merge a classification result onto the record.
    ///
    /// Invariant: an irrelevant record carries no category and no keywords,
    /// whatever the classifier handed back.
    pub fn apply(&mut self, c: Classification) {
        self.is_hr_related = c.is_hr_related;
        if c.is_hr_related {
            self.hr_category = c.category;
            self.keywords = c.keywords;
            self.keywords.truncate(5);
            if let Some(summary) = c.summary {
                self.summary = summary;
            }
        } else {
            self.hr_category = None;
            self.keywords = Vec::new();
        }
    }
}

/// Stable content fingerprint: SHA-256 over the seed, first 16 hex chars.
/// Same input always yields the same id across runs.
pub fn fingerprint(seed: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(seed.as_bytes());
    let mut out = String::with_capacity(16);
    for b in digest.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record() -> NewsRecord {
        NewsRecord {
            id: fingerprint("https://example.com/a"),
            title: "title".into(),
            url: "https://example.com/a".into(),
            source: "36氪".into(),
            company: "待分类".into(),
            publish_time: Utc::now(),
            capture_time: Utc::now(),
            excerpt: "excerpt".into(),
            summary: "summary".into(),
            is_hr_related: false,
            hr_category: None,
            keywords: Vec::new(),
        }
    }

    #[test]
    fn fingerprint_is_deterministic() {
        assert_eq!(fingerprint("https://x.com/a"), fingerprint("https://x.com/a"));
        assert_ne!(fingerprint("https://x.com/a"), fingerprint("https://x.com/b"));
        assert_eq!(fingerprint("https://x.com/a").len(), 16);
    }

    #[test]
    fn irrelevant_classification_clears_category_and_keywords() {
        let mut r = record();
        r.apply(Classification {
            is_hr_related: false,
            category: Some("招聘与人才".into()),
            summary: None,
            keywords: vec!["招聘".into()],
        });
        assert!(!r.is_hr_related);
        assert_eq!(r.hr_category, None);
        assert!(r.keywords.is_empty());
    }

    #[test]
    fn relevant_classification_caps_keywords_at_five() {
        let mut r = record();
        r.apply(Classification {
            is_hr_related: true,
            category: Some("招聘与人才".into()),
            summary: Some("新摘要".into()),
            keywords: (0..7).map(|i| format!("k{i}")).collect(),
        });
        assert!(r.is_hr_related);
        assert_eq!(r.keywords.len(), 5);
        assert_eq!(r.summary, "新摘要");
    }

    #[test]
    fn serializes_abstract_field_name() {
        let v = serde_json::to_value(record()).unwrap();
        assert!(v.get("abstract").is_some());
        assert!(v.get("excerpt").is_none());
    }
}
