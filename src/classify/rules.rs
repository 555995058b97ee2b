// src/classify/rules.rs
//! Keyword heuristics: company attribution, HR relevance scoring and
//! category scoring. All matching is case-insensitive substring search
//! over title + summary, the same text the AI prompts see.

use crate::config::{AppConfig, CategoryRule};

/// Company label when neither a tracked company nor the industry matches.
pub const COMPANY_OTHER: &str = "其他";
/// Category label when no configured category scores above zero.
pub const CATEGORY_OTHER: &str = "其他";

/// Relevance evidence collected in one pass over the keyword list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelevanceSignal {
    /// 3 points per keyword hit in the title, 1 per hit in the summary.
    pub score: u32,
    /// At least one HR keyword appeared in the title.
    pub title_hit: bool,
    /// Matched keywords in configured order, capped at 5.
    pub matched: Vec<String>,
}

/// First configured company whose alias matches wins; the configured order
/// is the priority order. Falls back to the industry label, then "其他".
pub fn attribute_company(cfg: &AppConfig, title: &str, summary: &str) -> String {
    let content = format!("{} {}", title.to_lowercase(), summary.to_lowercase());

    for company in cfg.enabled_companies() {
        if company
            .keywords
            .iter()
            .any(|kw| content.contains(&kw.to_lowercase()))
        {
            return company.name.clone();
        }
    }

    if cfg
        .industry
        .keywords
        .iter()
        .any(|kw| content.contains(&kw.to_lowercase()))
    {
        return cfg.industry.label.clone();
    }

    COMPANY_OTHER.to_string()
}

pub fn relevance_signal(hr_keywords: &[String], title: &str, summary: &str) -> RelevanceSignal {
    let title_lc = title.to_lowercase();
    let summary_lc = summary.to_lowercase();

    let mut signal = RelevanceSignal::default();
    for kw in hr_keywords {
        let kw_lc = kw.to_lowercase();
        if title_lc.contains(&kw_lc) {
            signal.score += 3;
            signal.title_hit = true;
        } else if summary_lc.contains(&kw_lc) {
            signal.score += 1;
        } else {
            continue;
        }
        if signal.matched.len() < 5 {
            signal.matched.push(kw.clone());
        }
    }
    signal
}

/// Distinct generic-technology terms appearing in the title.
pub fn tech_term_hits(tech_keywords: &[String], title: &str) -> usize {
    let title_lc = title.to_lowercase();
    tech_keywords
        .iter()
        .filter(|kw| title_lc.contains(&kw.to_lowercase()))
        .count()
}

/// Relevance decision. Base rule: score >= 2, or any keyword in the title.
/// The tech-term override is applied last and also defeats a title hit:
/// two or more technology terms in the title with a score below 3 mark the
/// item as a tech article that merely shares vocabulary with HR news.
pub fn is_relevant(signal: &RelevanceSignal, tech_hits: usize) -> bool {
    let mut relevant = signal.score >= 2 || signal.title_hit;
    if tech_hits >= 2 && signal.score < 3 {
        relevant = false;
    }
    relevant
}

/// Count-based category pick: aggregate occurrence count of each category's
/// keywords over title + summary; strictly highest wins, ties fall to the
/// first declared category. `None` when nothing scores.
pub fn categorize<'a>(
    categories: &'a [CategoryRule],
    title: &str,
    summary: &str,
) -> Option<&'a str> {
    let content = format!("{} {}", title.to_lowercase(), summary.to_lowercase());

    let mut best: Option<(&str, usize)> = None;
    for category in categories {
        let count: usize = category
            .keywords
            .iter()
            .map(|kw| content.matches(&kw.to_lowercase()).count())
            .sum();
        if count > 0 && best.map_or(true, |(_, c)| count > c) {
            best = Some((&category.name, count));
        }
    }
    best.map(|(name, _)| name)
}
