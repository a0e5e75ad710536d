//! Weekly and monthly aggregation.
//!
//! A [`Period`] is an inclusive date range. [`aggregate`] folds the daily
//! analysis records and screening results that fall inside it into a
//! [`PeriodDigest`]; days without files simply contribute nothing.

use chrono::{Datelike, Duration, NaiveDate};

use crate::config::ScreeningPolicy;
use crate::error::PipelineError;
use crate::models::{
    round4, AnalysisRecord, Candidate, Importance, Level, ScreeningResult, SentimentLabel,
};
use crate::naming::{self, ReportKind};
use crate::screener;

/// Highlights listed in a period report.
const MAX_HIGHLIGHTS: usize = 10;
/// Sectors listed in a period report.
const MAX_SECTORS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodKind {
    Weekly,
    Monthly,
}

impl PeriodKind {
    pub fn report_kind(&self) -> ReportKind {
        match self {
            PeriodKind::Weekly => ReportKind::Weekly,
            PeriodKind::Monthly => ReportKind::Monthly,
        }
    }

    /// `周` or `月`, used in section headings.
    pub fn unit(&self) -> &'static str {
        match self {
            PeriodKind::Weekly => "周",
            PeriodKind::Monthly => "月",
        }
    }
}

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub kind: PeriodKind,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Monday of the week containing `day`.
pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(i64::from(day.weekday().num_days_from_monday()))
}

impl Period {
    /// An explicit weekly range; `start > end` is rejected.
    pub fn weekly(start: NaiveDate, end: NaiveDate) -> Result<Self, PipelineError> {
        if start > end {
            return Err(PipelineError::InvalidArgs(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        Ok(Self {
            kind: PeriodKind::Weekly,
            start,
            end,
        })
    }

    /// Monday of `today`'s week through `today`.
    pub fn current_week(today: NaiveDate) -> Self {
        Self {
            kind: PeriodKind::Weekly,
            start: week_start(today),
            end: today,
        }
    }

    /// A calendar month.
    pub fn month(year: i32, month: u32) -> Result<Self, PipelineError> {
        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            PipelineError::InvalidArgs(format!("invalid month {}-{:02}", year, month))
        })?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(|| PipelineError::InvalidArgs(format!("year {} out of range", year)))?;
        Ok(Self {
            kind: PeriodKind::Monthly,
            start,
            end: next - Duration::days(1),
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Processing key the report is written under.
    pub fn report_key(&self) -> String {
        naming::report_key(self.kind.report_kind(), self.start)
    }

    /// Report title, e.g. `2026年第2周 投资周报` or `2026年1月 投资月报`.
    pub fn title(&self) -> String {
        match self.kind {
            PeriodKind::Weekly => {
                let week = self.start.iso_week();
                format!("{}年第{}周 投资周报", week.year(), week.week())
            }
            PeriodKind::Monthly => {
                format!("{}年{}月 投资月报", self.start.year(), self.start.month())
            }
        }
    }
}

/// A high-importance item surfaced in the period report.
#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    pub date: NaiveDate,
    pub summary: String,
    pub sentiment: SentimentLabel,
}

/// Items touching a sector across the period.
#[derive(Debug, Clone, PartialEq)]
pub struct SectorStat {
    pub sector: String,
    pub items: u32,
    /// Mean item score.
    pub sentiment: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeriodDigest {
    pub period: Period,
    /// Dates of the analysis records folded in, ascending.
    pub record_dates: Vec<NaiveDate>,
    /// Dates of the screening results folded in, ascending.
    pub screening_dates: Vec<NaiveDate>,
    pub item_count: u32,
    pub positive: u32,
    pub negative: u32,
    /// Mean item score, `0.5` without items.
    pub sentiment_score: f64,
    pub highlights: Vec<Highlight>,
    pub sectors: Vec<SectorStat>,
    /// Merged screening candidates, screener order.
    pub candidates: Vec<Candidate>,
}

impl PeriodDigest {
    pub fn is_empty(&self) -> bool {
        self.record_dates.is_empty() && self.screening_dates.is_empty()
    }
}

/// Merge per-day candidates of the same entity.
///
/// Mentions and item counts add up; sentiment is mention-weighted. Focus
/// sectors are unioned and key news is kept up to its cap in date order.
/// Scores and levels are recomputed from the merged numbers.
pub fn merge_candidates<'a>(
    lists: impl IntoIterator<Item = &'a [Candidate]>,
    policy: &ScreeningPolicy,
) -> Vec<Candidate> {
    let mut merged: Vec<(Candidate, f64)> = Vec::new();
    for list in lists {
        for c in list {
            let weight = c.sentiment_score * f64::from(c.mention_count);
            match merged
                .iter_mut()
                .find(|(m, _)| m.entity == c.entity && m.code == c.code)
            {
                Some((m, weighted)) => {
                    m.mention_count += c.mention_count;
                    m.item_count += c.item_count;
                    *weighted += weight;
                    for sector in &c.focus_sectors {
                        if !m.focus_sectors.contains(sector) {
                            m.focus_sectors.push(sector.clone());
                        }
                    }
                    for news in &c.key_news {
                        if m.key_news.len() < screener::KEY_NEWS_LIMIT {
                            m.key_news.push(news.clone());
                        }
                    }
                }
                None => merged.push((c.clone(), weight)),
            }
        }
    }
    let out = merged.into_iter().map(|(mut c, weighted)| {
        if c.mention_count > 0 {
            c.sentiment_score = round4(weighted / f64::from(c.mention_count));
        }
        c.focus_sectors.sort();
        c.score = screener::candidate_score(
            c.mention_count,
            c.sentiment_score,
            c.focus_sectors.len(),
        );
        c.level = Level::from_score(c.score);
        c
    });
    screener::select(out, policy, None)
}

/// Fold records and screenings inside `period` into a digest.
///
/// Inputs outside the range are ignored, so callers may pass everything
/// they have.
pub fn aggregate(
    period: Period,
    records: &[AnalysisRecord],
    screenings: &[ScreeningResult],
    policy: &ScreeningPolicy,
) -> PeriodDigest {
    let mut records: Vec<&AnalysisRecord> =
        records.iter().filter(|r| period.contains(r.date)).collect();
    records.sort_by_key(|r| r.date);
    let mut screenings: Vec<&ScreeningResult> =
        screenings.iter().filter(|s| period.contains(s.date)).collect();
    screenings.sort_by_key(|s| s.date);

    let mut item_count = 0u32;
    let mut positive = 0u32;
    let mut negative = 0u32;
    let mut score_sum = 0.0;
    let mut highlights = Vec::new();
    let mut sectors: Vec<(String, u32, f64)> = Vec::new();

    for record in &records {
        for item in &record.items {
            item_count += 1;
            score_sum += item.sentiment_score;
            match item.sentiment {
                SentimentLabel::Positive => positive += 1,
                SentimentLabel::Negative => negative += 1,
                SentimentLabel::Neutral => {}
            }
            if item.importance == Importance::High && highlights.len() < MAX_HIGHLIGHTS {
                highlights.push(Highlight {
                    date: record.date,
                    summary: item.summary.clone(),
                    sentiment: item.sentiment,
                });
            }
            for sector in &item.sectors {
                match sectors.iter_mut().find(|(s, _, _)| s == sector) {
                    Some(entry) => {
                        entry.1 += 1;
                        entry.2 += item.sentiment_score;
                    }
                    None => sectors.push((sector.clone(), 1, item.sentiment_score)),
                }
            }
        }
    }

    sectors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let sectors = sectors
        .into_iter()
        .take(MAX_SECTORS)
        .map(|(sector, items, sum)| SectorStat {
            sector,
            items,
            sentiment: round4(sum / f64::from(items)),
        })
        .collect();

    let candidates = merge_candidates(
        screenings.iter().map(|s| s.candidates.as_slice()),
        policy,
    );

    PeriodDigest {
        period,
        record_dates: records.iter().map(|r| r.date).collect(),
        screening_dates: screenings.iter().map(|s| s.date).collect(),
        item_count,
        positive,
        negative,
        sentiment_score: if item_count == 0 {
            0.5
        } else {
            round4(score_sum / f64::from(item_count))
        },
        highlights,
        sectors,
        candidates,
    }
}
