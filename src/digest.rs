// src/digest.rs
//! Weekly rollup over the stored records: top events, per-company counts
//! and trend lines. Rule-based generation always works; the AI path builds
//! the same shape from one structured-completion call and falls back to the
//! rules on any call or parse failure.

use chrono::{Datelike, DateTime, Duration, Local, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::ai_adapter::{strip_code_fences, DynGenerator, TextGenerator};
use crate::record::NewsRecord;

/// Records serialized into the AI prompt, at most.
const AI_PROMPT_RECORDS: usize = 20;
const CATEGORY_UNTAGGED: &str = "其他";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyDigest {
    pub summary: String,
    pub top_events: Vec<TopEvent>,
    pub company_updates: Vec<CompanyUpdate>,
    pub trends: Vec<String>,
    pub insight: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopEvent {
    pub title: String,
    pub company: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyUpdate {
    pub company: String,
    pub count: usize,
    /// Most recent title for that company this week.
    pub latest: String,
}

/// Shape requested from the AI service.
#[derive(Debug, Deserialize)]
struct AiDigest {
    summary: String,
    #[serde(default)]
    top_events: Vec<AiEvent>,
    #[serde(default)]
    trends: Vec<String>,
    #[serde(default)]
    insight: String,
}

#[derive(Debug, Deserialize)]
struct AiEvent {
    title: String,
    #[serde(default)]
    company: String,
    #[serde(default)]
    impact: String,
}

/// Build the current week's digest (Monday 00:00 local to now).
pub async fn build_weekly_digest(
    records: &[NewsRecord],
    generator: Option<&DynGenerator>,
) -> WeeklyDigest {
    let week = filter_current_week(records);
    if week.is_empty() {
        return empty_digest();
    }

    if let Some(generator) = generator {
        match ai_digest(&week, generator.as_ref()).await {
            Ok(digest) => return digest,
            Err(e) => {
                tracing::warn!(error = ?e, "ai digest failed, using rule-based digest");
            }
        }
    }

    rule_digest(&week)
}

/// Monday 00:00 of the current local week.
fn week_start_local() -> DateTime<Local> {
    let now = Local::now();
    let monday = now.date_naive() - Duration::days(now.weekday().num_days_from_monday() as i64);
    monday
        .and_time(NaiveTime::MIN)
        .and_local_timezone(Local)
        .earliest()
        .unwrap_or(now)
}

pub fn filter_current_week(records: &[NewsRecord]) -> Vec<&NewsRecord> {
    let start: DateTime<Utc> = week_start_local().with_timezone(&Utc);
    let mut week: Vec<&NewsRecord> = records
        .iter()
        .filter(|r| r.capture_time >= start)
        .collect();
    week.sort_by(|a, b| b.capture_time.cmp(&a.capture_time));
    week
}

fn empty_digest() -> WeeklyDigest {
    WeeklyDigest {
        summary: "本周暂无重要HR动态".to_string(),
        top_events: Vec::new(),
        company_updates: Vec::new(),
        trends: Vec::new(),
        insight: "数据收集中，敬请期待下周精彩内容。".to_string(),
    }
}

/// Template-based digest. `week` must be sorted newest first.
pub fn rule_digest(week: &[&NewsRecord]) -> WeeklyDigest {
    let top_events = week
        .iter()
        .take(3)
        .map(|r| TopEvent {
            title: r.title.clone(),
            company: r.company.clone(),
            category: Some(
                r.hr_category
                    .clone()
                    .unwrap_or_else(|| CATEGORY_UNTAGGED.to_string()),
            ),
            summary: if r.summary.is_empty() {
                "暂无摘要".to_string()
            } else {
                r.summary.clone()
            },
        })
        .collect();

    let company_counts = count_by(week.iter().map(|r| r.company.as_str()));
    let company_updates = company_counts
        .iter()
        .take(5)
        .map(|(company, count)| CompanyUpdate {
            company: company.clone(),
            count: *count,
            latest: week
                .iter()
                .find(|r| &r.company == company)
                .map(|r| r.title.clone())
                .unwrap_or_default(),
        })
        .collect();

    let category_counts = count_by(
        week.iter()
            .map(|r| r.hr_category.as_deref().unwrap_or(CATEGORY_UNTAGGED)),
    );

    let mut trends = Vec::new();
    if let Some((category, count)) = category_counts.first() {
        trends.push(format!("{category}成为本周热点，共{count}条相关新闻"));
    }
    if let Some((company, count)) = company_counts.first() {
        trends.push(format!("{company}动作频繁，本周发布{count}条HR相关信息"));
    }

    WeeklyDigest {
        summary: format!("本周汽车行业HR动态活跃，共{}条重要信息", week.len()),
        top_events,
        company_updates,
        trends,
        insight: format!(
            "本周共监测到{}条HR动态，{}家公司有新动作。",
            week.len(),
            company_counts.len()
        ),
    }
}

/// Occurrence counts sorted by count descending; ties keep first-seen
/// order, so the most recent item wins a tie in a newest-first list.
fn count_by<'a, I: Iterator<Item = &'a str>>(items: I) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for item in items {
        match counts.iter_mut().find(|(name, _)| name == item) {
            Some((_, count)) => *count += 1,
            None => counts.push((item.to_string(), 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

async fn ai_digest(week: &[&NewsRecord], generator: &dyn TextGenerator) -> anyhow::Result<WeeklyDigest> {
    let mut listing = String::new();
    for (i, r) in week.iter().take(AI_PROMPT_RECORDS).enumerate() {
        listing.push_str(&format!(
            "{}. 【{}】{}\n   {}\n\n",
            i + 1,
            r.company,
            r.title,
            r.summary
        ));
    }

    let prompt = format!(
        "请分析以下本周汽车行业HR新闻，生成一份简洁的大事记总结。\n\n\
         本周新闻：\n{listing}\n\
         请按以下格式输出JSON：\n\
         {{\n\
           \"summary\": \"一句话总结本周整体情况（30字以内）\",\n\
           \"top_events\": [\n\
             {{\"title\": \"事件标题\", \"company\": \"公司\", \"impact\": \"影响分析\"}}\n\
           ],\n\
           \"trends\": [\"趋势1\", \"趋势2\", \"趋势3\"],\n\
           \"insight\": \"一句话洞察（50字以内，给HR从业者的启示）\"\n\
         }}\n\n\
         要求：\n\
         1. top_events选择3个最重要的事件\n\
         2. trends总结3个关键趋势\n\
         3. 语言专业、简洁\n\
         4. 只输出JSON，不要其他内容"
    );

    let reply = generator.generate(&prompt, 0.7).await?;
    let parsed: AiDigest = serde_json::from_str(strip_code_fences(&reply))
        .map_err(|e| anyhow::anyhow!("unparseable ai digest reply: {e}"))?;

    // Company breakdown stays rule-computed; the AI only narrates.
    let company_counts = count_by(week.iter().map(|r| r.company.as_str()));
    let company_updates = company_counts
        .iter()
        .take(5)
        .map(|(company, count)| CompanyUpdate {
            company: company.clone(),
            count: *count,
            latest: week
                .iter()
                .find(|r| &r.company == company)
                .map(|r| r.title.clone())
                .unwrap_or_default(),
        })
        .collect();

    Ok(WeeklyDigest {
        summary: parsed.summary,
        top_events: parsed
            .top_events
            .into_iter()
            .take(3)
            .map(|e| TopEvent {
                title: e.title,
                company: e.company,
                category: None,
                summary: e.impact,
            })
            .collect(),
        company_updates,
        trends: parsed.trends,
        insight: parsed.insight,
    })
}
