//! Weekly and monthly reports (`<start>-周报.md`, `YYYY-MM-01-月报.md`).

use std::fmt::Write as _;

use crate::analyzer::NO_DATA;
use crate::error::RenderError;
use crate::models::SentimentLabel;
use crate::naming::DATE_FORMAT;
use crate::period::PeriodDigest;

use super::screening::{candidate_cells, COLUMNS as CANDIDATE_COLUMNS};
use super::{escape, footer, front_matter, table_header, table_row};

pub const TEMPLATE: &str = "period";

pub const SECTION_RANGE: &str = "## 📅 时间范围";
pub const SECTOR_COLUMNS: [&str; 4] = ["行业", "热度", "平均情感", "趋势"];

/// Candidates listed in the recommendation table.
const MAX_CANDIDATES: usize = 10;

pub fn section_highlights(unit: &str) -> String {
    format!("## 🔥 本{}热点", unit)
}
pub fn section_sectors() -> &'static str {
    "## 📊 行业表现"
}
pub fn section_candidates() -> &'static str {
    "## 🏆 推荐股票列表"
}
pub fn section_summary(unit: &str) -> String {
    format!("## 📝 本{}总结", unit)
}
pub fn section_outlook(unit: &str) -> String {
    format!("## 🔮 下{}展望", unit)
}

fn trend(score: f64) -> &'static str {
    match SentimentLabel::from_score(score) {
        SentimentLabel::Positive => "🔥",
        SentimentLabel::Negative => "❄️",
        SentimentLabel::Neutral => "➖",
    }
}

fn outlook(digest: &PeriodDigest) -> String {
    let unit = digest.period.kind.unit();
    let mut lines = vec![match SentimentLabel::from_score(digest.sentiment_score) {
        SentimentLabel::Positive => format!(
            "本{}市场情绪偏暖，下{}可继续跟踪热点板块的持续性，同时注意控制仓位。",
            unit, unit
        ),
        SentimentLabel::Negative => format!(
            "本{}市场情绪偏冷，下{}建议以防守为主，等待情绪修复信号。",
            unit, unit
        ),
        SentimentLabel::Neutral => {
            "持续关注宏观政策动向和行业热点变化，注意控制风险，把握结构性机会。".to_string()
        }
    }];
    let top: Vec<String> = digest
        .sectors
        .iter()
        .take(3)
        .map(|s| escape(&s.sector))
        .collect();
    if !top.is_empty() {
        lines.push(format!("重点跟踪行业：{}。", top.join(" / ")));
    }
    lines.join("\n")
}

pub fn render(digest: &PeriodDigest) -> Result<String, RenderError> {
    let period = &digest.period;
    if period.start > period.end {
        return Err(RenderError::InvertedPeriod {
            template: TEMPLATE,
            start: period.start,
            end: period.end,
        });
    }
    let unit = period.kind.unit();
    let start = period.start.format(DATE_FORMAT).to_string();
    let end = period.end.format(DATE_FORMAT).to_string();

    let mut out = String::new();
    front_matter(
        &mut out,
        &[
            ("kind", period.kind.report_kind().label().to_string()),
            ("date", start.clone()),
            ("start", start.clone()),
            ("end", end.clone()),
            ("records", digest.record_dates.len().to_string()),
            ("screenings", digest.screening_dates.len().to_string()),
            ("candidates", digest.candidates.len().to_string()),
        ],
    );
    let _ = writeln!(out, "# {}\n", period.title());

    let _ = writeln!(out, "{}", SECTION_RANGE);
    let _ = writeln!(out, "{} 至 {}", start, end);

    let _ = writeln!(out, "\n{}", section_highlights(unit));
    if digest.item_count == 0 {
        let _ = writeln!(out, "{}", NO_DATA);
    } else if digest.highlights.is_empty() {
        let _ = writeln!(out, "本{}暂无特别重大事件。", unit);
    } else {
        for h in &digest.highlights {
            let _ = writeln!(
                out,
                "- {} {} {}",
                h.date.format(DATE_FORMAT),
                h.sentiment.emoji(),
                escape(&h.summary)
            );
        }
    }

    let _ = writeln!(out, "\n{}", section_sectors());
    if digest.sectors.is_empty() {
        let _ = writeln!(out, "{}", NO_DATA);
    } else {
        table_header(&mut out, &SECTOR_COLUMNS);
        for s in &digest.sectors {
            table_row(
                &mut out,
                &[
                    escape(&s.sector),
                    format!("{}篇", s.items),
                    format!("{:.4}", s.sentiment),
                    trend(s.sentiment).to_string(),
                ],
            );
        }
    }

    let _ = writeln!(out, "\n{}", section_candidates());
    if digest.candidates.is_empty() {
        let _ = writeln!(out, "{}", NO_DATA);
    } else {
        table_header(&mut out, &CANDIDATE_COLUMNS);
        for (i, c) in digest.candidates.iter().take(MAX_CANDIDATES).enumerate() {
            table_row(&mut out, &candidate_cells(i + 1, c));
        }
    }

    let _ = writeln!(out, "\n{}", section_summary(unit));
    if digest.is_empty() || digest.item_count == 0 {
        let _ = writeln!(out, "{}", NO_DATA);
    } else {
        let _ = writeln!(
            out,
            "本{}共分析 {} 条财经信息，其中积极消息 {} 条，消极消息 {} 条，平均情感 {:.4}。",
            unit, digest.item_count, digest.positive, digest.negative, digest.sentiment_score
        );
    }

    let _ = writeln!(out, "\n{}", section_outlook(unit));
    if digest.item_count == 0 {
        let _ = writeln!(out, "{}", NO_DATA);
    } else {
        for line in outlook(digest).lines() {
            let _ = writeln!(out, "{}", line);
        }
    }

    footer(&mut out);
    Ok(out)
}
