//! Stock screening.
//!
//! A read-only projection of an [`AnalysisRecord`]'s entity statistics
//! through a [`ScreeningPolicy`]. Filters, in order:
//!
//! 1. special-treatment names (`ST`, `*ST` prefixes) are dropped;
//! 2. `mentions >= min_mentions`;
//! 3. `sentiment >= sentiment_threshold`;
//! 4. sector is on the allow-list;
//! 5. sector equals the requested filter, when one is given.
//!
//! Survivors are ordered by sentiment desc, mentions desc, name asc, code
//! asc, so identical input always yields identical ordering.

use std::cmp::Ordering;

use chrono::NaiveDate;
use tracing::warn;

use crate::config::ScreeningPolicy;
use crate::models::{AnalysisRecord, Candidate, EntityStat, ItemDigest, Level, ScreeningResult};

/// Summaries kept per candidate.
pub const KEY_NEWS_LIMIT: usize = 3;

/// Recommendation score in `0..=100`, rounded to two decimals.
///
/// Up to 30 points for mentions, 40 for sentiment, and 10 per focus sector
/// the entity's news touches, capped at 30.
pub fn candidate_score(mentions: u32, sentiment: f64, focus_matches: usize) -> f64 {
    let mention_part = f64::from(mentions.saturating_mul(10).min(30));
    let focus_part = (focus_matches.min(3) * 10) as f64;
    let raw = mention_part + sentiment.clamp(0.0, 1.0) * 40.0 + focus_part;
    (raw * 100.0).round() / 100.0
}

/// Exchange of a six-digit A-share code: `6…` Shanghai, `0…`/`3…`
/// Shenzhen, anything else Beijing.
pub fn market_of(code: &str) -> Option<&'static str> {
    if code.len() != 6 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(match code.as_bytes()[0] {
        b'6' => "上海",
        b'0' | b'3' => "深圳",
        _ => "北交所",
    })
}

/// Build a candidate from an entity's statistics and the items that
/// mention it. Focus sectors are the allow-listed sectors of those items.
pub fn candidate_from_stat(
    stat: &EntityStat,
    items: &[ItemDigest],
    policy: &ScreeningPolicy,
) -> Candidate {
    let mut focus_sectors: Vec<String> = Vec::new();
    let mut key_news = Vec::new();
    for item in items.iter().filter(|i| i.entities.contains(&stat.name)) {
        for sector in &item.sectors {
            if policy.allows_sector(sector) && !focus_sectors.contains(sector) {
                focus_sectors.push(sector.clone());
            }
        }
        if key_news.len() < KEY_NEWS_LIMIT && !item.summary.is_empty() {
            key_news.push(item.summary.clone());
        }
    }
    focus_sectors.sort();

    let score = candidate_score(stat.mentions, stat.sentiment, focus_sectors.len());
    Candidate {
        entity: stat.name.clone(),
        code: stat.code.clone(),
        market: stat.code.as_deref().and_then(market_of).map(str::to_string),
        sector: stat.sector.clone(),
        mention_count: stat.mentions,
        item_count: stat.items,
        sentiment_score: stat.sentiment,
        score,
        level: Level::from_score(score),
        focus_sectors,
        key_news,
    }
}

/// Whether a candidate passes the policy and the optional sector filter.
pub fn admits(policy: &ScreeningPolicy, sector_filter: Option<&str>, c: &Candidate) -> bool {
    !policy.is_excluded(&c.entity)
        && c.mention_count >= policy.min_mentions
        && c.sentiment_score >= policy.sentiment_threshold
        && policy.allows_sector(&c.sector)
        && sector_filter.map_or(true, |s| s == c.sector)
}

pub fn compare(a: &Candidate, b: &Candidate) -> Ordering {
    b.sentiment_score
        .total_cmp(&a.sentiment_score)
        .then_with(|| b.mention_count.cmp(&a.mention_count))
        .then_with(|| a.entity.cmp(&b.entity))
        .then_with(|| a.code.cmp(&b.code))
}

/// Filter and rank candidates.
pub fn select(
    candidates: impl IntoIterator<Item = Candidate>,
    policy: &ScreeningPolicy,
    sector_filter: Option<&str>,
) -> Vec<Candidate> {
    let mut out: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| admits(policy, sector_filter, c))
        .collect();
    out.sort_by(compare);
    out
}

/// Result of one screening pass plus anything worth telling the user.
#[derive(Debug, Clone)]
pub struct Screening {
    pub result: ScreeningResult,
    pub warnings: Vec<String>,
    /// The sector filter is off the allow-list; nothing should be written.
    pub rejected: bool,
}

/// Screen one date. A missing record yields an empty result; a sector
/// filter outside the allow-list yields a rejected, empty one.
pub fn screen(
    date: NaiveDate,
    record: Option<&AnalysisRecord>,
    policy: &ScreeningPolicy,
    sector_filter: Option<&str>,
) -> Screening {
    let mut result = ScreeningResult::empty(date, policy, sector_filter);
    let mut warnings = Vec::new();

    if let Some(sector) = sector_filter {
        if !policy.allows_sector(sector) {
            let msg = format!(
                "sector '{}' is not on the screening allow-list ({})",
                sector,
                policy.sectors.join(", ")
            );
            warn!(%date, sector, "sector filter outside allow-list");
            warnings.push(msg);
            return Screening {
                result,
                warnings,
                rejected: true,
            };
        }
    }

    match record {
        Some(record) => {
            result.candidates = select(
                record
                    .entities
                    .iter()
                    .map(|stat| candidate_from_stat(stat, &record.items, policy)),
                policy,
                sector_filter,
            );
        }
        None => warnings.push(format!("no analysis record for {}", date)),
    }
    Screening {
        result,
        warnings,
        rejected: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::config::{AnalysisSettings, EntityDef};
    use crate::parser::{parse_item, EntityCatalog};

    fn stat(name: &str, sector: &str, mentions: u32, sentiment: f64) -> EntityStat {
        EntityStat {
            name: name.to_string(),
            code: None,
            sector: sector.to_string(),
            mentions,
            items: 1,
            sentiment,
        }
    }

    fn record(entities: Vec<EntityStat>) -> AnalysisRecord {
        let mut rec = analyze(
            NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            &[],
            &AnalysisSettings::default(),
            String::new(),
        );
        rec.entities = entities;
        rec
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
    }

    #[test]
    fn policy_filters_apply() {
        let rec = record(vec![
            stat("A", "新能源", 3, 0.9),
            stat("B", "新能源", 1, 0.9),
            stat("C", "新能源", 5, 0.5),
            stat("D", "地产", 5, 0.9),
            stat("*ST某", "新能源", 5, 0.9),
        ]);
        let s = screen(date(), Some(&rec), &ScreeningPolicy::default(), None);
        let names: Vec<&str> = s.result.candidates.iter().map(|c| c.entity.as_str()).collect();
        assert_eq!(names, vec!["A"]);
        assert!(s.result.violations().is_empty());
    }

    #[test]
    fn ordering_is_total_and_deterministic() {
        let rec = record(vec![
            stat("乙", "半导体", 2, 0.8),
            stat("甲", "半导体", 2, 0.8),
            stat("丙", "消费", 4, 0.8),
            stat("丁", "金融", 2, 1.0),
        ]);
        let policy = ScreeningPolicy::default();
        let first = screen(date(), Some(&rec), &policy, None).result.candidates;
        let names: Vec<&str> = first.iter().map(|c| c.entity.as_str()).collect();
        assert_eq!(names, vec!["丁", "丙", "乙", "甲"]);
        for _ in 0..5 {
            assert_eq!(screen(date(), Some(&rec), &policy, None).result.candidates, first);
        }
    }

    #[test]
    fn sector_filter_restricts() {
        let rec = record(vec![
            stat("A", "新能源", 3, 0.9),
            stat("B", "半导体", 3, 0.9),
        ]);
        let s = screen(date(), Some(&rec), &ScreeningPolicy::default(), Some("半导体"));
        assert_eq!(s.result.candidates.len(), 1);
        assert!(s.result.candidates.iter().all(|c| c.sector == "半导体"));
        assert!(s.warnings.is_empty());
    }

    #[test]
    fn unknown_sector_filter_warns() {
        let rec = record(vec![stat("A", "地产", 3, 0.9)]);
        let s = screen(date(), Some(&rec), &ScreeningPolicy::default(), Some("地产"));
        assert!(s.result.candidates.is_empty());
        assert_eq!(s.warnings.len(), 1);
        assert!(s.rejected);
    }

    #[test]
    fn missing_record_is_empty_not_error() {
        let s = screen(date(), None, &ScreeningPolicy::default(), None);
        assert!(s.result.candidates.is_empty());
        assert_eq!(s.result.date, date());
    }

    fn digest(summary: &str, entities: &[&str], sectors: &[&str]) -> ItemDigest {
        ItemDigest {
            source: "2026-01-05-a.md".into(),
            title: summary.into(),
            summary: summary.into(),
            sentiment_score: 0.8,
            sentiment: crate::models::SentimentLabel::Positive,
            category: "行业动态".into(),
            importance: crate::models::Importance::Low,
            key_points: Vec::new(),
            entities: entities.iter().map(|s| s.to_string()).collect(),
            sectors: sectors.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn score_and_level() {
        let policy = ScreeningPolicy::default();
        assert!((candidate_score(3, 1.0, 3) - 100.0).abs() < 1e-9);
        assert!((candidate_score(2, 0.75, 1) - 60.0).abs() < 1e-9);
        assert!((candidate_score(2, 0.75, 9) - 80.0).abs() < 1e-9);
        let items = [digest("A 新品热销", &["A"], &["消费"])];
        let a = stat("A", "消费", 3, 0.75);
        assert_eq!(candidate_from_stat(&a, &[], &policy).level, Level::Moderate);
        assert_eq!(candidate_from_stat(&a, &items, &policy).level, Level::Strong);
        let b = stat("A", "消费", 1, 0.5);
        assert_eq!(candidate_from_stat(&b, &items, &policy).level, Level::Watch);
    }

    #[test]
    fn focus_sectors_raise_the_score() {
        let policy = ScreeningPolicy::default();
        let s = stat("A", "新能源", 3, 0.75);
        let items = [
            digest("一", &["A"], &["新能源", "地产"]),
            digest("二", &["A", "B"], &["半导体"]),
            digest("三", &["B"], &["消费"]),
        ];
        let c = candidate_from_stat(&s, &items, &policy);
        // 地产 is off the allow-list and 消费 belongs to an item without A.
        assert_eq!(c.focus_sectors, vec!["半导体", "新能源"]);
        assert!((c.score - 80.0).abs() < 1e-9);
        assert_eq!(c.key_news, vec!["一", "二"]);
    }

    #[test]
    fn key_news_is_capped() {
        let items: Vec<ItemDigest> = ["一", "二", "三", "四"]
            .iter()
            .map(|t| digest(t, &["A"], &[]))
            .collect();
        let s = stat("A", "新能源", 4, 0.9);
        let c = candidate_from_stat(&s, &items, &ScreeningPolicy::default());
        assert_eq!(c.key_news, vec!["一", "二", "三"]);
    }

    #[test]
    fn markets_by_code_prefix() {
        assert_eq!(market_of("600519"), Some("上海"));
        assert_eq!(market_of("000001"), Some("深圳"));
        assert_eq!(market_of("300750"), Some("深圳"));
        assert_eq!(market_of("830799"), Some("北交所"));
        assert_eq!(market_of("60051"), None);
        assert_eq!(market_of("HK0700"), None);

        let mut s = stat("A", "新能源", 3, 0.9);
        s.code = Some("300750".into());
        let c = candidate_from_stat(&s, &[], &ScreeningPolicy::default());
        assert_eq!(c.market.as_deref(), Some("深圳"));
    }

    #[test]
    fn three_mentions_example_passes() {
        let catalog = EntityCatalog::new(&[EntityDef::new("某新能源公司", "新能源")]);
        let item = parse_item(
            "2026-01-05-新能源.md",
            "# 某新能源公司业绩超预期\n某新能源公司发布业绩预告，净利润增长。某新能源公司订单突破新高。",
            &catalog,
            &[],
        )
        .unwrap();
        let rec = analyze(date(), &[item], &AnalysisSettings::default(), String::new());
        let s = screen(date(), Some(&rec), &ScreeningPolicy::default(), None);
        let c = &s.result.candidates[0];
        assert_eq!(c.entity, "某新能源公司");
        assert_eq!(c.mention_count, 3);
        assert!(c.sentiment_score >= 0.6);
    }
}
