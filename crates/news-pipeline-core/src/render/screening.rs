//! Stock screening report (`YYYY-MM-DD-股票筛选.md`).

use std::fmt::Write as _;

use crate::analyzer::NO_DATA;
use crate::error::RenderError;
use crate::models::{Candidate, Level, ScreeningResult};
use crate::naming::{ReportKind, DATE_FORMAT};

use super::{escape, footer, front_matter, join_escaped, table_header, table_row};

pub const TEMPLATE: &str = "stock-screen";

pub const SECTION_CONDITIONS: &str = "## 筛选条件";
pub const SECTION_RESULTS: &str = "## 筛选结果";
pub const SECTION_DETAILS: &str = "## 详细分析";

pub const COLUMNS: [&str; 11] = [
    "排名", "名称", "代码", "市场", "行业", "关注行业", "提及次数", "相关资讯", "情感分数",
    "推荐分数", "推荐等级",
];

pub const LABEL_KEY_NEWS: &str = "- 相关新闻：";
/// Indent of one key-news line under [`LABEL_KEY_NEWS`].
pub const KEY_NEWS_INDENT: &str = "  - ";

pub(crate) fn level_cell(level: Level) -> String {
    format!("{} {}", level.stars(), level.label())
}

fn or_dash(value: Option<&str>) -> String {
    value.map(escape).unwrap_or_else(|| "-".to_string())
}

/// One table row in [`COLUMNS`] order.
pub(crate) fn candidate_cells(rank: usize, c: &Candidate) -> Vec<String> {
    vec![
        rank.to_string(),
        escape(&c.entity),
        or_dash(c.code.as_deref()),
        or_dash(c.market.as_deref()),
        escape(&c.sector),
        join_escaped(&c.focus_sectors, "-"),
        c.mention_count.to_string(),
        c.item_count.to_string(),
        format!("{:.4}", c.sentiment_score),
        format!("{:.2}", c.score),
        level_cell(c.level),
    ]
}

pub fn render(result: &ScreeningResult) -> Result<String, RenderError> {
    if result.policy.sectors.is_empty() {
        return Err(RenderError::MissingField {
            template: TEMPLATE,
            field: "sectors",
        });
    }

    let date = result.date.format(DATE_FORMAT).to_string();
    let policy = &result.policy;
    let mut fields = vec![
        ("kind", ReportKind::Screening.label().to_string()),
        ("date", date.clone()),
        ("min_mentions", policy.min_mentions.to_string()),
        ("sentiment_threshold", policy.sentiment_threshold.to_string()),
        ("sectors", policy.sectors.join("、")),
        ("excluded", policy.excluded_prefixes.join("、")),
    ];
    if let Some(sector) = &result.sector_filter {
        fields.push(("sector", sector.clone()));
    }
    fields.push(("candidates", result.candidates.len().to_string()));

    let mut out = String::new();
    front_matter(&mut out, &fields);
    let _ = writeln!(out, "# {} 股票筛选报告\n", date);

    let _ = writeln!(out, "{}", SECTION_CONDITIONS);
    let _ = writeln!(out, "- 最小提及次数：{}", policy.min_mentions);
    let _ = writeln!(out, "- 情感阈值：{}", policy.sentiment_threshold);
    let _ = writeln!(out, "- 关注行业：{}", escape(&policy.sectors.join("、")));
    let _ = writeln!(
        out,
        "- 行业过滤：{}",
        result.sector_filter.as_deref().map(escape).unwrap_or_else(|| "无".to_string())
    );

    let _ = writeln!(out, "\n{}", SECTION_RESULTS);
    if result.candidates.is_empty() {
        let _ = writeln!(out, "{}", NO_DATA);
    } else {
        table_header(&mut out, &COLUMNS);
        for (i, c) in result.candidates.iter().enumerate() {
            table_row(&mut out, &candidate_cells(i + 1, c));
        }
        out.push('\n');
        for level in [Level::Strong, Level::Moderate, Level::Watch] {
            let _ = writeln!(out, "- {}：{} 只", level.label(), result.count_level(level));
        }
    }

    let _ = writeln!(out, "\n{}", SECTION_DETAILS);
    if result.candidates.is_empty() {
        let _ = writeln!(out, "{}", NO_DATA);
    } else {
        for (i, c) in result.candidates.iter().enumerate() {
            let name = escape(&c.entity);
            match (&c.code, &c.market) {
                (Some(code), Some(market)) => {
                    let code = escape(code);
                    let _ = writeln!(out, "\n### {}. {}（{}·{}）", i + 1, name, code, market);
                }
                (Some(code), None) => {
                    let _ = writeln!(out, "\n### {}. {}（{}）", i + 1, name, escape(code));
                }
                _ => {
                    let _ = writeln!(out, "\n### {}. {}", i + 1, name);
                }
            }
            let _ = writeln!(out, "- 推荐等级：{}", level_cell(c.level));
            let _ = writeln!(out, "- 推荐分数：{:.2}", c.score);
            let _ = writeln!(out, "- 提及次数：{}（{} 条资讯）", c.mention_count, c.item_count);
            let _ = writeln!(out, "- 平均情感：{:.4}", c.sentiment_score);
            let _ = writeln!(out, "- 所属行业：{}", escape(&c.sector));
            let _ = writeln!(out, "- 关注行业匹配：{}", join_escaped(&c.focus_sectors, "无"));
            if !c.key_news.is_empty() {
                let _ = writeln!(out, "{}", LABEL_KEY_NEWS);
                for news in &c.key_news {
                    let _ = writeln!(out, "{}{}", KEY_NEWS_INDENT, escape(news));
                }
            }
        }
    }

    footer(&mut out);
    Ok(out)
}
