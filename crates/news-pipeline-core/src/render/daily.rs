//! Daily news analysis report (`YYYY-MM-DD-新闻分析.md`).

use std::fmt::Write as _;

use crate::analyzer::NO_DATA;
use crate::error::RenderError;
use crate::models::AnalysisRecord;
use crate::naming::{ReportKind, DATE_FORMAT};

use super::{escape, footer, front_matter, join_escaped, table_header, table_row};

pub const TEMPLATE: &str = "daily";

pub const SECTION_SUMMARY: &str = "## 📰 今日要闻摘要";
pub const SECTION_SENTIMENT: &str = "## 📈 市场情绪";
pub const SECTION_STOCKS: &str = "## 🔍 重点关注股票";
pub const SECTION_ADVICE: &str = "## 💡 投资建议";

pub const STOCK_COLUMNS: [&str; 6] = ["名称", "代码", "行业", "提及次数", "相关资讯", "情感分数"];

pub const LABEL_SOURCE: &str = "来源：";
pub const LABEL_TITLE: &str = "标题：";
pub const LABEL_POINTS: &str = "要点：";
pub const LABEL_ENTITIES: &str = "相关：";
pub const LABEL_SECTORS: &str = "行业：";
pub const LABEL_MOOD: &str = "整体情绪：";
pub const LABEL_SCORE: &str = "情绪分数：";
pub const LABEL_HOT: &str = "热门行业：";

/// Text shown when no sector stands out.
pub const NO_HOT_SECTORS: &str = "无明显热点";

pub fn render(record: &AnalysisRecord) -> Result<String, RenderError> {
    for item in &record.items {
        if item.source.is_empty() {
            return Err(RenderError::MissingField {
                template: TEMPLATE,
                field: "source",
            });
        }
    }

    let date = record.date.format(DATE_FORMAT).to_string();
    let mut out = String::new();
    front_matter(
        &mut out,
        &[
            ("kind", ReportKind::Analysis.label().to_string()),
            ("date", date.clone()),
            ("sentiment", format!("{:.4}", record.sentiment_score)),
            ("importance", record.importance.to_string()),
            ("items", record.items.len().to_string()),
            ("digest", record.input_digest.clone()),
        ],
    );
    let _ = writeln!(out, "# {} 财经新闻分析\n", date);

    let _ = writeln!(out, "{}", SECTION_SUMMARY);
    let _ = writeln!(out, "> {}", escape(&record.summary));
    for (i, item) in record.items.iter().enumerate() {
        if i == 0 {
            out.push('\n');
        }
        let _ = writeln!(
            out,
            "{}. {} [{}｜{}｜{:.4}] {}",
            i + 1,
            item.sentiment.emoji(),
            item.importance,
            item.category,
            item.sentiment_score,
            escape(&item.summary)
        );
        let _ = writeln!(out, "   - {}{}", LABEL_SOURCE, escape(&item.source));
        let _ = writeln!(out, "   - {}{}", LABEL_TITLE, escape(&item.title));
        if !item.key_points.is_empty() {
            let _ = writeln!(out, "   - {}", LABEL_POINTS);
            for point in &item.key_points {
                let _ = writeln!(out, "     - {}", escape(point));
            }
        }
        if !item.entities.is_empty() {
            let _ = writeln!(out, "   - {}{}", LABEL_ENTITIES, join_escaped(&item.entities, ""));
        }
        if !item.sectors.is_empty() {
            let _ = writeln!(out, "   - {}{}", LABEL_SECTORS, join_escaped(&item.sectors, ""));
        }
    }

    let _ = writeln!(out, "\n{}", SECTION_SENTIMENT);
    let _ = writeln!(
        out,
        "- {}{} {}",
        LABEL_MOOD,
        record.sentiment.mood(),
        record.sentiment.emoji()
    );
    let _ = writeln!(out, "- {}{:.4}", LABEL_SCORE, record.sentiment_score);
    let _ = writeln!(
        out,
        "- {}{}",
        LABEL_HOT,
        join_escaped(&record.hot_sectors, NO_HOT_SECTORS)
    );

    let _ = writeln!(out, "\n{}", SECTION_STOCKS);
    if record.entities.is_empty() {
        let _ = writeln!(out, "{}", NO_DATA);
    } else {
        table_header(&mut out, &STOCK_COLUMNS);
        for e in &record.entities {
            table_row(
                &mut out,
                &[
                    escape(&e.name),
                    e.code.as_deref().map(escape).unwrap_or_else(|| "-".to_string()),
                    escape(&e.sector),
                    e.mentions.to_string(),
                    e.items.to_string(),
                    format!("{:.4}", e.sentiment),
                ],
            );
        }
    }

    let _ = writeln!(out, "\n{}", SECTION_ADVICE);
    for line in record.recommendation.lines() {
        let _ = writeln!(out, "{}", escape(line));
    }

    footer(&mut out);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::config::{AnalysisSettings, EntityDef};
    use crate::parser::{parse_item, EntityCatalog};
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
    }

    #[test]
    fn empty_record_renders_no_data() {
        let rec = analyze(date(), &[], &AnalysisSettings::default(), String::new());
        let text = render(&rec).unwrap();
        assert!(text.starts_with("---\nkind: 新闻分析\ndate: 2026-01-05\n"));
        assert!(text.contains("# 2026-01-05 财经新闻分析"));
        assert!(text.contains("> 暂无数据"));
        assert!(text.contains(&format!("{}\n暂无数据", SECTION_STOCKS)));
        assert!(text.trim_end().ends_with(super::super::FOOTER));
    }

    #[test]
    fn hostile_titles_are_escaped() {
        let catalog = EntityCatalog::new(&[EntityDef::new("A|B公司", "消费")]);
        let item = parse_item(
            "2026-01-05-x.md",
            "# ## 标题 | 注入\nA|B公司业绩增长。A|B公司盈利。",
            &catalog,
            &[],
        )
        .unwrap();
        let rec = analyze(date(), &[item], &AnalysisSettings::default(), String::new());
        let text = render(&rec).unwrap();
        assert!(text.contains("\\#\\# 标题 \\| 注入"));
        assert!(text.contains("| A\\|B公司 | - | 消费 | 2 | 1 | 1.0000 |"));
        assert!(!text.lines().any(|l| l.starts_with("## 标题")));
    }

    #[test]
    fn rendering_is_deterministic() {
        let catalog = EntityCatalog::new(&[EntityDef::new("某公司", "金融")]);
        let item = parse_item("2026-01-05-x.md", "某公司业绩增长，某公司风险可控", &catalog, &[]).unwrap();
        let rec = analyze(date(), &[item], &AnalysisSettings::default(), "d".into());
        assert_eq!(render(&rec).unwrap(), render(&rec).unwrap());
    }
}
