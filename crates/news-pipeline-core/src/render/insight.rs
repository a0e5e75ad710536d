//! Insight note (`output/notes/YYYY-MM-DD-投资笔记.md`).

use std::fmt::Write as _;

use crate::error::RenderError;
use crate::insight::InsightNote;
use crate::naming::{DATE_FORMAT, NOTE_LABEL};

use super::{escape, front_matter, join_escaped};

pub const TEMPLATE: &str = "insight";

/// Key points listed per insight.
const POINTS_PER_ITEM: usize = 3;

pub fn render(note: &InsightNote) -> Result<String, RenderError> {
    if note.items.is_empty() {
        return Err(RenderError::MissingField {
            template: TEMPLATE,
            field: "items",
        });
    }

    let mut out = String::new();
    front_matter(
        &mut out,
        &[
            ("kind", NOTE_LABEL.to_string()),
            ("date", note.date.format(DATE_FORMAT).to_string()),
            ("importance", note.threshold.to_string()),
            ("insights", note.items.len().to_string()),
        ],
    );
    let _ = writeln!(out, "# {} 投资洞察笔记\n", note.date.format("%Y年%m月%d日"));

    out.push_str("## 📊 洞察概览\n");
    let _ = writeln!(out, "- 共提取 {} 条重要洞察", note.items.len());
    let _ = writeln!(out, "- 重要性阈值：{}", note.threshold);
    let sectors = note.hot_sectors();
    if !sectors.is_empty() {
        let _ = writeln!(out, "- 热门行业：{}", join_escaped(&sectors, ""));
    }

    out.push_str("\n---\n\n## 🔍 详细洞察\n");
    for (i, item) in note.items.iter().enumerate() {
        let _ = writeln!(
            out,
            "\n### {}. {} {}\n",
            i + 1,
            item.sentiment.emoji(),
            escape(&item.title)
        );
        let _ = writeln!(out, "- 来源：{}", escape(&item.source));
        let _ = writeln!(out, "- 重要性：{}", item.importance);
        let _ = writeln!(out, "- 分类：{}", item.category);
        let _ = writeln!(out, "- 情感分数：{:.4}", item.sentiment_score);
        let _ = writeln!(out, "- 摘要：{}", escape(&item.summary));
        if !item.key_points.is_empty() {
            out.push_str("- 关键要点：\n");
            for point in item.key_points.iter().take(POINTS_PER_ITEM) {
                let _ = writeln!(out, "  - {}", escape(point));
            }
        }
        if !item.entities.is_empty() {
            let _ = writeln!(out, "- 相关股票：{}", join_escaped(&item.entities, ""));
        }
        if !item.sectors.is_empty() {
            let _ = writeln!(out, "- 相关行业：{}", join_escaped(&item.sectors, ""));
        }
    }

    out.push_str("\n---\n\n## 💡 行动建议\n");
    out.push_str("基于以上洞察，建议：\n");
    out.push_str("1. 持续关注热门行业的政策动态\n");
    out.push_str("2. 对多次被提及的股票做进一步研究\n");
    out.push_str("3. 结合自身风险偏好做出投资决策\n");
    out.push_str("\n---\n*本笔记由程序辅助生成，投资需谨慎*\n");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Importance, ItemDigest, SentimentLabel};
    use chrono::NaiveDate;

    fn note(items: Vec<ItemDigest>) -> InsightNote {
        InsightNote {
            date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            threshold: Importance::High,
            items,
        }
    }

    #[test]
    fn renders_sections() {
        let text = render(&note(vec![ItemDigest {
            source: "2026-01-05-降准.md".into(),
            title: "央行_降准".into(),
            summary: "央行宣布降准。利好市场。".into(),
            sentiment_score: 1.0,
            sentiment: SentimentLabel::Positive,
            category: "宏观政策".into(),
            importance: Importance::High,
            key_points: vec!["降准释放流动性利好市场".into()],
            entities: vec!["某银行".into()],
            sectors: vec!["金融".into()],
        }]))
        .unwrap();
        assert!(text.contains("# 2026年01月05日 投资洞察笔记"));
        assert!(text.contains("### 1. 📈 央行\\_降准"));
        assert!(text.contains("- 热门行业：金融"));
        assert!(text.contains("  - 降准释放流动性利好市场"));
        assert!(text.contains("## 💡 行动建议"));
    }

    #[test]
    fn empty_note_is_render_error() {
        assert!(matches!(
            render(&note(Vec::new())),
            Err(RenderError::MissingField { field: "items", .. })
        ));
    }
}
