//! News analysis.
//!
//! Each [`ParsedItem`] becomes an [`ItemDigest`] (score, category, key
//! points, importance), and all digests for a date fold into one
//! [`AnalysisRecord`].

use std::collections::BTreeMap;

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

use crate::config::AnalysisSettings;
use crate::lexicon;
use crate::models::{
    round4, AnalysisRecord, EntityStat, Importance, ItemDigest, ParsedItem, SentimentLabel,
};

/// Placeholder text for sections without data.
pub const NO_DATA: &str = "暂无数据";

/// Number of hot sectors kept on a record.
const HOT_SECTORS: usize = 5;

/// Categories that carry more weight when assessing importance.
const WEIGHTY_CATEGORIES: [&str; 2] = ["宏观政策", "公司公告"];

pub fn analyze_item(item: &ParsedItem, settings: &AnalysisSettings) -> ItemDigest {
    let score = round4(lexicon::sentiment_score(&item.body));
    let category = lexicon::classify(&item.body).to_string();
    let key_points = lexicon::key_points(&item.body, settings.max_key_points);
    let summary = summarize(&item.title, &key_points, settings.summary_points);
    let importance = assess_importance(score, item.mentions.len(), &category);

    ItemDigest {
        source: item.key.clone(),
        title: item.title.clone(),
        summary,
        sentiment_score: score,
        sentiment: SentimentLabel::from_score(score),
        category,
        importance,
        key_points,
        entities: item.mentions.iter().map(|m| m.name.clone()).collect(),
        sectors: item.sectors.clone(),
    }
}

/// `title。point；point。`, or just the title when there are no key points.
pub fn summarize(title: &str, key_points: &[String], n: usize) -> String {
    if key_points.is_empty() || n == 0 {
        return title.to_string();
    }
    let points: Vec<&str> = key_points.iter().take(n).map(String::as_str).collect();
    format!("{}。{}。", title, points.join("；"))
}

/// Score sentiment extremity, entity count and category weight.
pub fn assess_importance(score: f64, entity_count: usize, category: &str) -> Importance {
    let mut points = 0;
    if !(0.2..=0.8).contains(&score) {
        points += 2;
    } else if !(0.3..=0.7).contains(&score) {
        points += 1;
    }
    if entity_count >= 3 {
        points += 2;
    } else if entity_count >= 1 {
        points += 1;
    }
    if WEIGHTY_CATEGORIES.contains(&category) {
        points += 1;
    }
    match points {
        p if p >= 4 => Importance::High,
        p if p >= 2 => Importance::Medium,
        _ => Importance::Low,
    }
}

/// Advice paragraph for a record.
pub fn recommendation(sentiment: SentimentLabel, hot_sectors: &[String]) -> String {
    let mut lines = vec![match sentiment {
        SentimentLabel::Positive => "市场情绪偏暖，可适当关注热点板块机会。".to_string(),
        SentimentLabel::Negative => "市场情绪偏冷，建议保持谨慎，控制仓位。".to_string(),
        SentimentLabel::Neutral => "市场情绪中性，建议保持观望，等待明确信号。".to_string(),
    }];
    if !hot_sectors.is_empty() {
        let top: Vec<&str> = hot_sectors.iter().take(3).map(String::as_str).collect();
        lines.push(format!("重点关注行业：{}。", top.join(" / ")));
    }
    lines.join("\n")
}

/// SHA-256 over `(key, text)` pairs in key order.
pub fn input_digest<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut files: Vec<(&str, &str)> = files.into_iter().collect();
    files.sort_by(|a, b| a.0.cmp(b.0));
    let mut hasher = Sha256::new();
    for (key, text) in files {
        hasher.update(key.as_bytes());
        hasher.update([0u8]);
        hasher.update(text.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// Sectors ordered by the number of items touching them.
fn hot_sectors(digests: &[ItemDigest]) -> Vec<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for d in digests {
        for s in &d.sectors {
            match counts.iter_mut().find(|(name, _)| name == s) {
                Some(entry) => entry.1 += 1,
                None => counts.push((s.as_str(), 1)),
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(HOT_SECTORS)
        .map(|(s, _)| s.to_string())
        .collect()
}

struct EntityAcc {
    code: Option<String>,
    sector: String,
    mentions: u32,
    items: u32,
    weighted: f64,
}

fn aggregate_entities(items: &[ParsedItem], digests: &[ItemDigest]) -> Vec<EntityStat> {
    let mut acc: BTreeMap<&str, EntityAcc> = BTreeMap::new();
    for (item, digest) in items.iter().zip(digests) {
        for m in &item.mentions {
            let e = acc.entry(m.name.as_str()).or_insert_with(|| EntityAcc {
                code: m.code.clone(),
                sector: m.sector.clone(),
                mentions: 0,
                items: 0,
                weighted: 0.0,
            });
            e.mentions += m.count;
            e.items += 1;
            e.weighted += digest.sentiment_score * f64::from(m.count);
        }
    }
    let mut stats: Vec<EntityStat> = acc
        .into_iter()
        .map(|(name, e)| EntityStat {
            name: name.to_string(),
            code: e.code,
            sector: e.sector,
            mentions: e.mentions,
            items: e.items,
            sentiment: if e.mentions == 0 {
                0.5
            } else {
                round4(e.weighted / f64::from(e.mentions))
            },
        })
        .collect();
    stats.sort_by(|a, b| b.mentions.cmp(&a.mentions).then_with(|| a.name.cmp(&b.name)));
    stats
}

/// Fold a date's parsed items into one record.
pub fn analyze(
    date: NaiveDate,
    items: &[ParsedItem],
    settings: &AnalysisSettings,
    input_digest: String,
) -> AnalysisRecord {
    let digests: Vec<ItemDigest> = items.iter().map(|i| analyze_item(i, settings)).collect();

    let score = if digests.is_empty() {
        0.5
    } else {
        round4(digests.iter().map(|d| d.sentiment_score).sum::<f64>() / digests.len() as f64)
    };
    let sentiment = SentimentLabel::from_score(score);
    let hot = hot_sectors(&digests);
    let entities = aggregate_entities(items, &digests);
    let importance = digests
        .iter()
        .map(|d| d.importance)
        .max()
        .unwrap_or(Importance::Low);

    let summary = if digests.is_empty() {
        NO_DATA.to_string()
    } else {
        let sectors = if hot.is_empty() {
            "无明显热点".to_string()
        } else {
            hot.join("、")
        };
        format!(
            "共分析 {} 条资讯，整体情绪{}，热门行业：{}。",
            digests.len(),
            sentiment.mood(),
            sectors
        )
    };

    AnalysisRecord {
        date,
        summary,
        sentiment_score: score,
        sentiment,
        recommendation: recommendation(sentiment, &hot),
        entities,
        hot_sectors: hot,
        items: digests,
        importance,
        input_digest,
    }
}
