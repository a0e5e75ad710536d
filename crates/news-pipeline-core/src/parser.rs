//! Input markdown parsing.
//!
//! Turns one input-stage file into a [`ParsedItem`]: date from the file
//! name, optional `---` front matter, title, body, entity mentions and
//! industry cues. Entity names come from the configured catalog and are
//! matched leftmost-longest so `某新能源公司` is never also counted as a
//! shorter catalogued name it contains. Six-digit A-share codes are picked
//! up from digit runs whether or not they are catalogued.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use aho_corasick::{AhoCorasick, MatchKind};
use regex::Regex;

use crate::config::EntityDef;
use crate::error::ParseError;
use crate::lexicon;
use crate::models::{EntityMention, ParsedItem};
use crate::naming;

static FRONT_MATTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A---[ \t]*\r?\n(.*?)\r?\n---[ \t]*(?:\r?\n|\z)").unwrap()
});

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#[ \t]+(.+?)[ \t]*\r?$").unwrap());

static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").unwrap());

/// Whether a digit run is shaped like an A-share code.
pub fn is_stock_code(digits: &str) -> bool {
    digits.len() == 6
        && digits.bytes().all(|b| b.is_ascii_digit())
        && matches!(digits.as_bytes()[0], b'0' | b'3' | b'6')
}

/// Split a leading `---` block of `key: value` lines from the body.
///
/// Lines without a colon are ignored. Text without a front-matter block is
/// returned unchanged with empty metadata.
pub fn split_front_matter(text: &str) -> (BTreeMap<String, String>, &str) {
    let mut metadata = BTreeMap::new();
    let Some(caps) = FRONT_MATTER.captures(text) else {
        return (metadata, text);
    };
    for line in caps[1].lines() {
        if let Some((k, v)) = line.split_once(':') {
            let k = k.trim();
            if !k.is_empty() {
                metadata.insert(k.to_string(), v.trim().to_string());
            }
        }
    }
    let end = caps.get(0).map(|m| m.end()).unwrap_or(0);
    (metadata, &text[end..])
}

/// First `# ` heading in `body`.
pub fn first_heading(body: &str) -> Option<String> {
    HEADING
        .captures(body)
        .map(|c| c[1].trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Compiled entity catalog.
pub struct EntityCatalog {
    entities: Vec<EntityDef>,
    /// Names and aliases; pattern index → entity index in `owners`.
    matcher: Option<AhoCorasick>,
    owners: Vec<usize>,
    codes: HashMap<String, usize>,
}

impl EntityCatalog {
    pub fn new(entities: &[EntityDef]) -> Self {
        let mut patterns = Vec::new();
        let mut owners = Vec::new();
        let mut codes = HashMap::new();
        for (i, e) in entities.iter().enumerate() {
            for name in std::iter::once(&e.name).chain(e.aliases.iter()) {
                if !name.is_empty() {
                    patterns.push(name.clone());
                    owners.push(i);
                }
            }
            if let Some(code) = &e.code {
                codes.entry(code.clone()).or_insert(i);
            }
        }
        let matcher = if patterns.is_empty() {
            None
        } else {
            AhoCorasick::builder()
                .match_kind(MatchKind::LeftmostLongest)
                .build(&patterns)
                .ok()
        };
        Self {
            entities: entities.to_vec(),
            matcher,
            owners,
            codes,
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn by_code(&self, code: &str) -> Option<&EntityDef> {
        self.codes.get(code).map(|&i| &self.entities[i])
    }

    /// Mentions found in `text`, sorted by entity name.
    ///
    /// `fallback_sector` is given to uncatalogued stock codes.
    pub fn mentions(&self, text: &str, fallback_sector: &str) -> Vec<EntityMention> {
        let mut catalogued = vec![0u32; self.entities.len()];
        let mut bare: BTreeMap<&str, u32> = BTreeMap::new();

        if let Some(matcher) = &self.matcher {
            for m in matcher.find_iter(text) {
                catalogued[self.owners[m.pattern().as_usize()]] += 1;
            }
        }
        for m in DIGIT_RUN.find_iter(text) {
            let digits = m.as_str();
            if let Some(&i) = self.codes.get(digits) {
                catalogued[i] += 1;
            } else if is_stock_code(digits) {
                *bare.entry(digits).or_insert(0) += 1;
            }
        }

        let mut out: Vec<EntityMention> = self
            .entities
            .iter()
            .zip(catalogued)
            .filter(|(_, count)| *count > 0)
            .map(|(e, count)| EntityMention {
                name: e.name.clone(),
                code: e.code.clone(),
                sector: e.sector.clone(),
                count,
            })
            .collect();
        out.extend(bare.into_iter().map(|(code, count)| EntityMention {
            name: code.to_string(),
            code: Some(code.to_string()),
            sector: fallback_sector.to_string(),
            count,
        }));
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}

/// Parse one input file.
///
/// `preferred_sectors` breaks ties when choosing the sector for
/// uncatalogued codes (the screening allow-list).
pub fn parse_item(
    key: &str,
    text: &str,
    catalog: &EntityCatalog,
    preferred_sectors: &[String],
) -> Result<ParsedItem, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::Empty(key.to_string()));
    }
    let (date, name_title) = naming::split_dated_name(key)?;
    let (metadata, body) = split_front_matter(text);
    if body.trim().is_empty() {
        return Err(ParseError::Empty(key.to_string()));
    }

    let title = first_heading(body).unwrap_or(name_title);
    let hits = lexicon::industries(body);
    let sectors = lexicon::rank_sectors(&hits, preferred_sectors);
    let fallback = sectors
        .first()
        .map(String::as_str)
        .unwrap_or(lexicon::UNCLASSIFIED_SECTOR);
    let mentions = catalog.mentions(body, fallback);

    Ok(ParsedItem {
        key: key.to_string(),
        date,
        title,
        body: body.to_string(),
        metadata,
        mentions,
        industries: hits.iter().map(|h| h.keyword.to_string()).collect(),
        sectors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SECTORS;
    use chrono::NaiveDate;

    fn catalog() -> EntityCatalog {
        EntityCatalog::new(&[
            EntityDef::new("某新能源公司", "新能源")
                .with_code("300750")
                .with_alias("某新能源"),
            EntityDef::new("新能源", "新能源"),
            EntityDef::new("某芯片公司", "半导体"),
        ])
    }

    fn allow_list() -> Vec<String> {
        DEFAULT_SECTORS.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn date_from_filename() {
        let item = parse_item("2026-01-05-降准.md", "# 央行降准\n正文", &catalog(), &[]).unwrap();
        assert_eq!(item.date, NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
        assert_eq!(item.title, "央行降准");
    }

    #[test]
    fn title_falls_back_to_filename() {
        let item = parse_item("2026-01-05-降准消息.md", "没有标题的正文", &catalog(), &[]).unwrap();
        assert_eq!(item.title, "降准消息");
    }

    #[test]
    fn front_matter_is_metadata_not_body() {
        let text = "---\nsource: 财联社\ncategory: 宏观\n---\n# 标题\n正文";
        let item = parse_item("2026-01-05-x.md", text, &catalog(), &[]).unwrap();
        assert_eq!(item.metadata.get("source").map(String::as_str), Some("财联社"));
        assert!(item.body.starts_with("# 标题"));
        assert!(!item.body.contains("source"));
    }

    #[test]
    fn empty_and_malformed_rejected() {
        assert_eq!(
            parse_item("2026-01-05-x.md", "  \n", &catalog(), &[]).unwrap_err(),
            ParseError::Empty("2026-01-05-x.md".into())
        );
        assert!(matches!(
            parse_item("x.md", "text", &catalog(), &[]).unwrap_err(),
            ParseError::MalformedName(_)
        ));
        assert!(matches!(
            parse_item("2026-13-01-x.md", "text", &catalog(), &[]).unwrap_err(),
            ParseError::InvalidDate { .. }
        ));
        assert!(matches!(
            parse_item("2026-01-05-x.md", "---\na: b\n---\n", &catalog(), &[]).unwrap_err(),
            ParseError::Empty(_)
        ));
    }

    #[test]
    fn mentions_use_longest_names() {
        let text = "某新能源公司发布公告。某新能源公司业绩增长，某新能源订单饱满。新能源板块走强。";
        let item = parse_item("2026-01-05-x.md", text, &catalog(), &allow_list()).unwrap();
        assert_eq!(item.mention_count("某新能源公司"), 3);
        assert_eq!(item.mention_count("新能源"), 1);
        assert_eq!(item.mention_count("某芯片公司"), 0);
    }

    #[test]
    fn stock_codes_catalogued_and_bare() {
        let text = "宁德（300750）与 600519、SZ000001 以及 1234567 和 900001";
        let item = parse_item("2026-01-05-x.md", text, &catalog(), &allow_list()).unwrap();
        assert_eq!(item.mention_count("某新能源公司"), 1);
        assert_eq!(item.mention_count("600519"), 1);
        assert_eq!(item.mention_count("000001"), 1);
        assert_eq!(item.mention_count("1234567"), 0);
        assert_eq!(item.mention_count("900001"), 0);
        let bare = item.mentions.iter().find(|m| m.name == "600519").unwrap();
        assert_eq!(bare.sector, lexicon::UNCLASSIFIED_SECTOR);
    }

    #[test]
    fn bare_codes_take_dominant_sector() {
        let text = "芯片国产化加速，半导体设备需求旺盛，600584 受益，白酒持平";
        let item = parse_item("2026-01-05-x.md", text, &catalog(), &allow_list()).unwrap();
        assert_eq!(item.sectors, vec!["半导体", "消费"]);
        let m = item.mentions.iter().find(|m| m.name == "600584").unwrap();
        assert_eq!(m.sector, "半导体");
    }

    #[test]
    fn stock_code_shape() {
        assert!(is_stock_code("600519"));
        assert!(is_stock_code("000001"));
        assert!(is_stock_code("300750"));
        assert!(!is_stock_code("900001"));
        assert!(!is_stock_code("60051"));
    }
}
