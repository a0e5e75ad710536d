//! Processing reports → records.
//!
//! The inverse of the [`render`](crate::render) templates for files in the
//! processing stage. Downstream skills read daily analysis and screening
//! reports back through here instead of re-analyzing input, which keeps
//! every workflow on its own stage.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::config::ScreeningPolicy;
use crate::error::ParseError;
use crate::models::{
    AnalysisRecord, Candidate, EntityStat, Importance, ItemDigest, Level, ScreeningResult,
    SentimentLabel,
};
use crate::naming::{self, ReportKind, DATE_FORMAT};
use crate::parser::split_front_matter;
use crate::period::PeriodKind;
use crate::render::{daily, is_separator, period, screening, split_row, unescape};

static ITEM_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\. (\S+) \[([a-z]+)｜([^｜]+)｜([0-9.]+)\] (.*)$").unwrap()
});

/// Summary of a weekly or monthly report.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodReport {
    pub kind: PeriodKind,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub candidates: Vec<Candidate>,
}

/// Any processing-stage report.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    Analysis(AnalysisRecord),
    Screening(ScreeningResult),
    Period(PeriodReport),
}

impl Report {
    pub fn date(&self) -> NaiveDate {
        match self {
            Report::Analysis(r) => r.date,
            Report::Screening(s) => s.date,
            Report::Period(p) => p.start,
        }
    }

    /// Entity names the report mentions, sorted and deduplicated.
    pub fn entity_names(&self) -> Vec<String> {
        let mut names: Vec<String> = match self {
            Report::Analysis(r) => r.entities.iter().map(|e| e.name.clone()).collect(),
            Report::Screening(s) => s.candidates.iter().map(|c| c.entity.clone()).collect(),
            Report::Period(p) => p.candidates.iter().map(|c| c.entity.clone()).collect(),
        };
        names.sort();
        names.dedup();
        names
    }
}

fn malformed(key: &str, reason: impl Into<String>) -> ParseError {
    ParseError::MalformedReport {
        key: key.to_string(),
        reason: reason.into(),
    }
}

struct Doc<'a> {
    key: &'a str,
    meta: BTreeMap<String, String>,
    /// `## ` heading → lines up to the next heading or `---`.
    sections: Vec<(&'a str, Vec<&'a str>)>,
}

impl<'a> Doc<'a> {
    fn parse(key: &'a str, text: &'a str) -> Result<Self, ParseError> {
        if text.trim().is_empty() {
            return Err(ParseError::Empty(key.to_string()));
        }
        let (meta, body) = split_front_matter(text);
        let mut sections: Vec<(&str, Vec<&str>)> = Vec::new();
        let mut open = false;
        for line in body.lines() {
            if line.starts_with("## ") {
                sections.push((line.trim_end(), Vec::new()));
                open = true;
            } else if line.trim() == "---" {
                open = false;
            } else if open {
                if let Some((_, lines)) = sections.last_mut() {
                    lines.push(line);
                }
            }
        }
        Ok(Self {
            key,
            meta,
            sections,
        })
    }

    fn field(&self, name: &str) -> Result<&str, ParseError> {
        self.meta
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| malformed(self.key, format!("missing front-matter field '{}'", name)))
    }

    fn parsed<T: std::str::FromStr>(&self, name: &str) -> Result<T, ParseError> {
        self.field(name)?
            .parse()
            .map_err(|_| malformed(self.key, format!("invalid value for '{}'", name)))
    }

    fn date_field(&self, name: &str) -> Result<NaiveDate, ParseError> {
        NaiveDate::parse_from_str(self.field(name)?, DATE_FORMAT)
            .map_err(|_| malformed(self.key, format!("invalid date in '{}'", name)))
    }

    /// Filename date, falling back to the front-matter `date`.
    fn date(&self) -> Result<NaiveDate, ParseError> {
        match naming::date_of(self.key) {
            Some(d) => Ok(d),
            None => self.date_field("date"),
        }
    }

    fn section(&self, heading: &str) -> Result<&[&'a str], ParseError> {
        self.sections
            .iter()
            .find(|(h, _)| *h == heading)
            .map(|(_, lines)| lines.as_slice())
            .ok_or_else(|| malformed(self.key, format!("missing section '{}'", heading)))
    }
}

/// Report kind from front matter, else from the file name label.
pub fn report_kind(key: &str, meta: &BTreeMap<String, String>) -> Option<ReportKind> {
    meta.get("kind")
        .and_then(|k| ReportKind::from_label(k))
        .or_else(|| naming::classify_report(key).map(|(_, k)| k))
}

/// A markdown table: column name → index, plus body rows.
struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn find(lines: &[&str]) -> Option<Table> {
        let mut rows = lines.iter().filter_map(|l| split_row(l));
        let columns = rows.next()?;
        let rows = rows.filter(|r| !is_separator(r)).collect();
        Some(Table { columns, rows })
    }

    fn column(&self, key: &str, name: &str) -> Result<usize, ParseError> {
        self.optional(name)
            .ok_or_else(|| malformed(key, format!("table lacks column '{}'", name)))
    }

    /// Columns added after the first report format.
    fn optional(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

fn cell<'r>(key: &str, row: &'r [String], idx: usize) -> Result<&'r str, ParseError> {
    row.get(idx)
        .map(String::as_str)
        .ok_or_else(|| malformed(key, "short table row"))
}

fn number<T: std::str::FromStr>(key: &str, row: &[String], idx: usize) -> Result<T, ParseError> {
    cell(key, row, idx)?
        .parse()
        .map_err(|_| malformed(key, format!("not a number: '{}'", row[idx])))
}

fn code_cell(s: &str) -> Option<String> {
    if s == "-" || s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// `、`-joined list from a table cell, which [`split_row`] already unescaped.
fn cell_list(s: &str) -> Vec<String> {
    if s == "-" {
        return Vec::new();
    }
    s.split('、')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn split_list(s: &str) -> Vec<String> {
    // Parts were escaped before joining, so split first.
    s.split('、')
        .map(|p| unescape(p.trim()))
        .filter(|p| !p.is_empty())
        .collect()
}

fn read_candidates(key: &str, lines: &[&str]) -> Result<Vec<Candidate>, ParseError> {
    let Some(table) = Table::find(lines) else {
        return Ok(Vec::new());
    };
    let name = table.column(key, "名称")?;
    let code = table.column(key, "代码")?;
    let sector = table.column(key, "行业")?;
    let mentions = table.column(key, "提及次数")?;
    let items = table.column(key, "相关资讯")?;
    let sentiment = table.column(key, "情感分数")?;
    let score = table.column(key, "推荐分数")?;
    let level = table.column(key, "推荐等级")?;
    let market = table.optional("市场");
    let focus = table.optional("关注行业");

    table
        .rows
        .iter()
        .map(|row| {
            let score: f64 = number(key, row, score)?;
            let level_text = cell(key, row, level)?;
            let market = match market {
                Some(idx) => code_cell(cell(key, row, idx)?),
                None => None,
            };
            let focus_sectors = match focus {
                Some(idx) => cell_list(cell(key, row, idx)?),
                None => Vec::new(),
            };
            Ok(Candidate {
                entity: cell(key, row, name)?.to_string(),
                code: code_cell(cell(key, row, code)?),
                market,
                sector: cell(key, row, sector)?.to_string(),
                mention_count: number(key, row, mentions)?,
                item_count: number(key, row, items)?,
                sentiment_score: number(key, row, sentiment)?,
                score,
                level: level_text
                    .split_whitespace()
                    .last()
                    .and_then(Level::from_label)
                    .unwrap_or_else(|| Level::from_score(score)),
                focus_sectors,
                key_news: Vec::new(),
            })
        })
        .collect()
}

/// Attach the key-news lists of the details section to candidates by rank.
fn read_key_news(lines: &[&str], candidates: &mut [Candidate]) {
    let mut current: Option<usize> = None;
    let mut in_news = false;
    for line in lines {
        if let Some(rest) = line.strip_prefix("### ") {
            current = rest
                .split_once(". ")
                .and_then(|(rank, _)| rank.parse::<usize>().ok())
                .and_then(|rank| rank.checked_sub(1));
            in_news = false;
        } else if line.trim_end() == screening::LABEL_KEY_NEWS.trim_end() {
            in_news = true;
        } else if let Some(news) = line.strip_prefix(screening::KEY_NEWS_INDENT) {
            if let Some(c) = current.filter(|_| in_news).and_then(|i| candidates.get_mut(i)) {
                c.key_news.push(unescape(news.trim()));
            }
        } else {
            in_news = false;
        }
    }
}

fn read_items(key: &str, lines: &[&str]) -> Result<(String, Vec<ItemDigest>), ParseError> {
    let mut summary = None;
    let mut items: Vec<ItemDigest> = Vec::new();
    let mut in_points = false;

    for line in lines {
        if let Some(rest) = line.strip_prefix("> ") {
            if summary.is_none() {
                summary = Some(unescape(rest.trim()));
            }
            continue;
        }
        if let Some(caps) = ITEM_LINE.captures(line) {
            let score: f64 = caps[5]
                .parse()
                .map_err(|_| malformed(key, "item score is not a number"))?;
            let importance: Importance = caps[3]
                .parse()
                .map_err(|_| malformed(key, "item importance unknown"))?;
            items.push(ItemDigest {
                source: String::new(),
                title: String::new(),
                summary: unescape(&caps[6]),
                sentiment_score: score,
                sentiment: SentimentLabel::from_emoji(&caps[2])
                    .unwrap_or_else(|| SentimentLabel::from_score(score)),
                category: caps[4].to_string(),
                importance,
                key_points: Vec::new(),
                entities: Vec::new(),
                sectors: Vec::new(),
            });
            in_points = false;
            continue;
        }
        let Some(item) = items.last_mut() else {
            continue;
        };
        if let Some(point) = line.strip_prefix("     - ") {
            if in_points {
                item.key_points.push(unescape(point.trim()));
            }
        } else if let Some(detail) = line.strip_prefix("   - ") {
            in_points = false;
            if let Some(v) = detail.strip_prefix(daily::LABEL_SOURCE) {
                item.source = unescape(v.trim());
            } else if let Some(v) = detail.strip_prefix(daily::LABEL_TITLE) {
                item.title = unescape(v.trim());
            } else if detail.trim() == daily::LABEL_POINTS {
                in_points = true;
            } else if let Some(v) = detail.strip_prefix(daily::LABEL_ENTITIES) {
                item.entities = split_list(v);
            } else if let Some(v) = detail.strip_prefix(daily::LABEL_SECTORS) {
                item.sectors = split_list(v);
            }
        }
    }

    let summary = summary.ok_or_else(|| malformed(key, "summary line missing"))?;
    if let Some(item) = items.iter().find(|i| i.source.is_empty()) {
        return Err(malformed(key, format!("item '{}' has no source", item.summary)));
    }
    Ok((summary, items))
}

fn read_entities(key: &str, lines: &[&str]) -> Result<Vec<EntityStat>, ParseError> {
    let Some(table) = Table::find(lines) else {
        return Ok(Vec::new());
    };
    let name = table.column(key, "名称")?;
    let code = table.column(key, "代码")?;
    let sector = table.column(key, "行业")?;
    let mentions = table.column(key, "提及次数")?;
    let items = table.column(key, "相关资讯")?;
    let sentiment = table.column(key, "情感分数")?;
    table
        .rows
        .iter()
        .map(|row| {
            Ok(EntityStat {
                name: cell(key, row, name)?.to_string(),
                code: code_cell(cell(key, row, code)?),
                sector: cell(key, row, sector)?.to_string(),
                mentions: number(key, row, mentions)?,
                items: number(key, row, items)?,
                sentiment: number(key, row, sentiment)?,
            })
        })
        .collect()
}

/// Read a `新闻分析` report.
pub fn read_analysis(key: &str, text: &str) -> Result<AnalysisRecord, ParseError> {
    let doc = Doc::parse(key, text)?;
    read_analysis_doc(&doc)
}

fn read_analysis_doc(doc: &Doc<'_>) -> Result<AnalysisRecord, ParseError> {
    let key = doc.key;
    let date = doc.date()?;
    let sentiment_score: f64 = doc.parsed("sentiment")?;
    let (summary, items) = read_items(key, doc.section(daily::SECTION_SUMMARY)?)?;

    let hot_sectors = doc
        .section(daily::SECTION_SENTIMENT)?
        .iter()
        .find_map(|l| l.strip_prefix("- ")?.strip_prefix(daily::LABEL_HOT))
        .map(|v| {
            if v.trim() == daily::NO_HOT_SECTORS {
                Vec::new()
            } else {
                split_list(v)
            }
        })
        .unwrap_or_default();

    let entities = read_entities(key, doc.section(daily::SECTION_STOCKS)?)?;
    let recommendation = doc
        .section(daily::SECTION_ADVICE)?
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(unescape)
        .collect::<Vec<_>>()
        .join("\n");

    let importance = match doc.meta.get("importance") {
        Some(v) => v
            .parse()
            .map_err(|_| malformed(key, "invalid value for 'importance'"))?,
        None => items
            .iter()
            .map(|i| i.importance)
            .max()
            .unwrap_or(Importance::Low),
    };

    Ok(AnalysisRecord {
        date,
        summary,
        sentiment_score,
        sentiment: SentimentLabel::from_score(sentiment_score),
        entities,
        hot_sectors,
        recommendation,
        items,
        importance,
        input_digest: doc.meta.get("digest").cloned().unwrap_or_default(),
    })
}

/// Read a `股票筛选` report.
pub fn read_screening(key: &str, text: &str) -> Result<ScreeningResult, ParseError> {
    let doc = Doc::parse(key, text)?;
    read_screening_doc(&doc)
}

fn read_screening_doc(doc: &Doc<'_>) -> Result<ScreeningResult, ParseError> {
    let defaults = ScreeningPolicy::default();
    let policy = ScreeningPolicy {
        min_mentions: doc.parsed("min_mentions")?,
        sentiment_threshold: doc.parsed("sentiment_threshold")?,
        sectors: doc
            .meta
            .get("sectors")
            .map(|s| split_list(s))
            .unwrap_or(defaults.sectors),
        excluded_prefixes: doc
            .meta
            .get("excluded")
            .map(|s| split_list(s))
            .unwrap_or(defaults.excluded_prefixes),
    };
    let mut candidates = read_candidates(doc.key, doc.section(screening::SECTION_RESULTS)?)?;
    if let Ok(details) = doc.section(screening::SECTION_DETAILS) {
        read_key_news(details, &mut candidates);
    }
    Ok(ScreeningResult {
        date: doc.date()?,
        sector_filter: doc.meta.get("sector").cloned(),
        candidates,
        policy,
    })
}

/// Read a `周报` or `月报` report.
pub fn read_period(key: &str, text: &str) -> Result<PeriodReport, ParseError> {
    let doc = Doc::parse(key, text)?;
    read_period_doc(&doc)
}

fn read_period_doc(doc: &Doc<'_>) -> Result<PeriodReport, ParseError> {
    let kind = match report_kind(doc.key, &doc.meta) {
        Some(ReportKind::Weekly) => PeriodKind::Weekly,
        Some(ReportKind::Monthly) => PeriodKind::Monthly,
        _ => return Err(malformed(doc.key, "not a period report")),
    };
    let start = match doc.meta.get("start") {
        Some(_) => doc.date_field("start")?,
        None => doc.date()?,
    };
    Ok(PeriodReport {
        kind,
        start,
        end: doc.date_field("end")?,
        candidates: read_candidates(doc.key, doc.section(period::section_candidates())?)?,
    })
}

/// Read any processing report, dispatching on its kind.
pub fn read_report(key: &str, text: &str) -> Result<Report, ParseError> {
    let doc = Doc::parse(key, text)?;
    match report_kind(key, &doc.meta) {
        Some(ReportKind::Analysis) => read_analysis_doc(&doc).map(Report::Analysis),
        Some(ReportKind::Screening) => read_screening_doc(&doc).map(Report::Screening),
        Some(ReportKind::Weekly | ReportKind::Monthly) => read_period_doc(&doc).map(Report::Period),
        None => Err(malformed(key, "unknown report kind")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::config::{AnalysisSettings, EntityDef};
    use crate::parser::{parse_item, EntityCatalog};
    use crate::period::{aggregate, Period};
    use crate::render::{render, ReportData};
    use crate::screener::screen;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
    }

    fn sample_record() -> AnalysisRecord {
        let catalog = EntityCatalog::new(&[
            EntityDef::new("某新能源公司", "新能源").with_code("300750"),
            EntityDef::new("A|B*科技", "人工智能"),
        ]);
        let a = parse_item(
            "2026-01-05-新能源.md",
            "---\nsource: 测试\n---\n# 某新能源公司业绩超预期\n\
             某新能源公司发布业绩预告，净利润增长超过一倍。\n\
             某新能源公司订单突破新高，光伏储能业务加速扩张；海外市场同步增长。",
            &catalog,
            &[],
        )
        .unwrap();
        let b = parse_item(
            "2026-01-05-科技.md",
            "# 大模型 [测试] <注入>\nA|B*科技的大模型业务面临监管调查风险，股价下跌。600519 持平。",
            &catalog,
            &[],
        )
        .unwrap();
        analyze(date(), &[a, b], &AnalysisSettings::default(), "abc123".into())
    }

    #[test]
    fn analysis_roundtrip_recovers_record() {
        let rec = sample_record();
        let text = render(ReportData::Daily(&rec)).unwrap();
        let back = read_analysis("2026-01-05-新闻分析.md", &text).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn empty_analysis_roundtrip() {
        let rec = analyze(date(), &[], &AnalysisSettings::default(), String::new());
        let text = render(ReportData::Daily(&rec)).unwrap();
        assert_eq!(read_analysis("2026-01-05-新闻分析.md", &text).unwrap(), rec);
    }

    #[test]
    fn screening_roundtrip_recovers_result() {
        let rec = sample_record();
        let mut policy = ScreeningPolicy::default();
        policy.min_mentions = 1;
        policy.sentiment_threshold = 0.0;
        let result = screen(date(), Some(&rec), &policy, None).result;
        assert!(!result.candidates.is_empty());
        let text = render(ReportData::StockScreen(&result)).unwrap();
        let back = read_screening("2026-01-05-股票筛选.md", &text).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn period_roundtrip_recovers_range_and_entities() {
        let rec = sample_record();
        let mut policy = ScreeningPolicy::default();
        policy.min_mentions = 1;
        policy.sentiment_threshold = 0.0;
        let screening = screen(date(), Some(&rec), &policy, None).result;
        let p = Period::weekly(NaiveDate::from_ymd_opt(2025, 12, 30).unwrap(), date()).unwrap();
        let digest = aggregate(p, &[rec], &[screening.clone()], &policy);
        let text = render(ReportData::Period(&digest)).unwrap();
        let back = read_report("2025-12-30-周报.md", &text).unwrap();
        assert_eq!(back.date(), p.start);
        assert_eq!(back.entity_names(), Report::Screening(screening).entity_names());
    }

    #[test]
    fn front_matter_date_used_without_dated_name() {
        let rec = sample_record();
        let text = render(ReportData::Daily(&rec)).unwrap();
        let back = read_report("archive.md", &text).unwrap();
        assert_eq!(back.date(), date());
    }

    #[test]
    fn missing_columns_are_malformed() {
        let text = "---\nkind: 股票筛选\ndate: 2026-01-05\nmin_mentions: 2\n\
                    sentiment_threshold: 0.6\n---\n\
                    ## 筛选结果\n| 名称 | 代码 |\n|---|---|\n| A | - |\n";
        assert!(matches!(
            read_screening("2026-01-05-股票筛选.md", text),
            Err(ParseError::MalformedReport { .. })
        ));
    }

    #[test]
    fn unknown_kind_rejected() {
        assert!(matches!(
            read_report("notes.md", "---\nkind: 随笔\n---\n# x\n"),
            Err(ParseError::MalformedReport { .. })
        ));
        assert!(matches!(read_report("x.md", "  "), Err(ParseError::Empty(_))));
    }
}
