// src/classify/mod.rs
//! Per-record classification: company attribution, HR relevance, category,
//! summary and keywords. Strategy is layered — keyword rules first, an AI
//! call when a generator is configured, and a silent fall back to the rules
//! whenever the service misbehaves. No classification failure aborts a
//! batch.

pub mod ai_adapter;
pub mod rules;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;

use crate::classify::ai_adapter::{DynGenerator, TextGenerator};
use crate::classify::rules::{RelevanceSignal, CATEGORY_OTHER};
use crate::config::AppConfig;
use crate::record::{Classification, NewsRecord};

/// Reuse the feed excerpt verbatim as the summary below this length.
const SHORT_EXCERPT_CHARS: usize = 150;
/// Placeholder when neither the feed nor the AI produced a summary.
const EMPTY_SUMMARY: &str = "暂无摘要";

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("classify_records_total", "Records classified.");
        describe_counter!("classify_relevant_total", "Records marked HR-relevant.");
        describe_counter!(
            "classify_ai_fallback_total",
            "AI calls that degraded to the heuristic path."
        );
    });
}

pub struct Classifier<'a> {
    cfg: &'a AppConfig,
    generator: Option<DynGenerator>,
}

impl<'a> Classifier<'a> {
    /// `generator = None` selects the pure heuristic strategy.
    pub fn new(cfg: &'a AppConfig, generator: Option<DynGenerator>) -> Self {
        ensure_metrics_described();
        Self { cfg, generator }
    }

    /// Classify one record in place: attribution always runs, the remaining
    /// stages only for relevant records.
    pub async fn classify(&self, record: &mut NewsRecord) {
        counter!("classify_records_total").increment(1);

        record.company = rules::attribute_company(self.cfg, &record.title, &record.summary);

        let signal =
            rules::relevance_signal(&self.cfg.hr_keywords, &record.title, &record.summary);
        let relevant = self.decide_relevance(record, &signal).await;

        if !relevant {
            record.apply(Classification {
                is_hr_related: false,
                category: None,
                summary: None,
                keywords: Vec::new(),
            });
            return;
        }
        counter!("classify_relevant_total").increment(1);

        let category = self.pick_category(record).await;
        let summary = self.summarize(record).await;
        let keywords = self.extract_keywords(record, &signal).await;

        record.apply(Classification {
            is_hr_related: true,
            category: Some(category),
            summary,
            keywords,
        });
    }

    async fn decide_relevance(&self, record: &NewsRecord, signal: &RelevanceSignal) -> bool {
        let heuristic = rules::is_relevant(
            signal,
            rules::tech_term_hits(&self.cfg.tech_keywords, &record.title),
        );

        let Some(generator) = &self.generator else {
            return heuristic;
        };

        let prompt = format!(
            "请判断以下新闻是否与人力资源管理相关。\n\n\
             新闻标题：{}\n新闻摘要：{}\n\n\
             人力资源相关包括：招聘、薪酬福利、培训发展、组织架构调整、企业文化、员工关系、劳动法规等。\n\n\
             请只回答\"是\"或\"否\"，不要其他解释。",
            record.title, record.excerpt
        );

        match generator.generate(&prompt, 0.1).await {
            Ok(reply) => reply.contains('是'),
            Err(e) => {
                tracing::warn!(error = ?e, id = %record.id, "ai relevance check failed, using heuristic");
                counter!("classify_ai_fallback_total").increment(1);
                heuristic
            }
        }
    }

    /// Category for a relevant record. The AI answer is only trusted when it
    /// resolves to a configured category name, exact or by substring; any
    /// other text takes the keyword-count fallback, never a guess.
    async fn pick_category(&self, record: &NewsRecord) -> String {
        if let Some(generator) = &self.generator {
            let listing = self
                .cfg
                .hr_categories
                .iter()
                .enumerate()
                .map(|(i, c)| format!("{}. {}", i + 1, c.name))
                .collect::<Vec<_>>()
                .join("\n");

            let prompt = format!(
                "请将以下新闻分类到最合适的人力资源模块中。\n\n\
                 新闻标题：{}\n新闻摘要：{}\n\n\
                 可选分类：\n{listing}\n\n\
                 请只回答分类名称，不要其他解释。如果涉及多个分类，请选择最主要的一个。",
                record.title, record.excerpt
            );

            match generator.generate(&prompt, 0.1).await {
                Ok(reply) => {
                    if let Some(name) = self.resolve_category(&reply) {
                        return name;
                    }
                    tracing::warn!(reply = %reply, id = %record.id, "unrecognized ai category, using keyword fallback");
                    counter!("classify_ai_fallback_total").increment(1);
                }
                Err(e) => {
                    tracing::warn!(error = ?e, id = %record.id, "ai category call failed, using keyword fallback");
                    counter!("classify_ai_fallback_total").increment(1);
                }
            }
        }

        rules::categorize(&self.cfg.hr_categories, &record.title, &record.summary)
            .unwrap_or(CATEGORY_OTHER)
            .to_string()
    }

    fn resolve_category(&self, reply: &str) -> Option<String> {
        let reply = reply.trim();
        for category in &self.cfg.hr_categories {
            if category.name == reply {
                return Some(category.name.clone());
            }
        }
        for category in &self.cfg.hr_categories {
            if reply.contains(&category.name) {
                return Some(category.name.clone());
            }
        }
        None
    }

    /// `None` leaves the pass-through summary on the record untouched.
    async fn summarize(&self, record: &NewsRecord) -> Option<String> {
        let excerpt = record.excerpt.trim();
        if !excerpt.is_empty() && excerpt.chars().count() < SHORT_EXCERPT_CHARS {
            return Some(excerpt.to_string());
        }

        let Some(generator) = &self.generator else {
            if record.summary.trim().is_empty() {
                return Some(EMPTY_SUMMARY.to_string());
            }
            return None;
        };

        let prompt = format!(
            "请为以下汽车行业HR新闻生成一个简洁的摘要（50字以内），重点突出：\n\
             1. 涉及哪家公司\n2. 发生了什么HR相关的事情\n3. 对行业的影响或意义\n\n\
             新闻标题：{}\n原始摘要：{excerpt}\n\n\
             请直接输出摘要，不要前缀说明。",
            record.title
        );

        match generator.generate(&prompt, 0.7).await {
            Ok(reply) => Some(reply),
            Err(e) => {
                tracing::warn!(error = ?e, id = %record.id, "ai summary failed, keeping raw excerpt");
                counter!("classify_ai_fallback_total").increment(1);
                if excerpt.is_empty() {
                    Some(EMPTY_SUMMARY.to_string())
                } else {
                    Some(excerpt.to_string())
                }
            }
        }
    }

    async fn extract_keywords(&self, record: &NewsRecord, signal: &RelevanceSignal) -> Vec<String> {
        let Some(generator) = &self.generator else {
            return signal.matched.clone();
        };

        let prompt = format!(
            "请从以下新闻中提取3-5个关键词。\n\n\
             标题：{}\n摘要：{}\n\n\
             请只输出关键词，用逗号分隔，不要其他解释。\n\
             例如：招聘,高薪,人才竞争",
            record.title, record.summary
        );

        match generator.generate(&prompt, 0.5).await {
            Ok(reply) => {
                let keywords: Vec<String> = reply
                    .split([',', '，'])
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .take(5)
                    .map(str::to_string)
                    .collect();
                if keywords.is_empty() {
                    signal.matched.clone()
                } else {
                    keywords
                }
            }
            Err(e) => {
                tracing::warn!(error = ?e, id = %record.id, "ai keyword extraction failed, keeping matched keywords");
                counter!("classify_ai_fallback_total").increment(1);
                signal.matched.clone()
            }
        }
    }
}
