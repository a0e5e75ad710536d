//! Keyword tables and matchers.
//!
//! Sentiment, news category and industry cues are plain keyword lists
//! compiled once into leftmost-longest Aho-Corasick automata, so
//! overlapping keywords (`创新高` / `新高`) are counted once, at the longest
//! match. Every function here is a pure function of the tables and the text.

use std::sync::LazyLock;

use aho_corasick::{AhoCorasick, MatchKind};

pub const POSITIVE: &[&str] = &[
    "利好", "上涨", "增长", "突破", "创新高", "超预期", "加速", "扩张", "支持", "鼓励", "减税",
    "降息", "降准", "补贴", "激励", "盈利", "业绩", "翻倍", "新高", "龙头",
];

pub const NEGATIVE: &[&str] = &[
    "利空", "下跌", "下降", "暴跌", "创新低", "不及预期", "放缓", "收缩", "限制", "禁止", "加税",
    "加息", "处罚", "亏损", "退市", "风险", "违规", "调查", "暴雷", "爆仓",
];

/// Category used when no category keyword occurs.
pub const OTHER_CATEGORY: &str = "其他";

/// News categories in tie-break order.
pub const CATEGORIES: &[(&str, &[&str])] = &[
    ("宏观政策", &["央行", "政策", "国务院", "发改委", "监管", "法规"]),
    ("行业动态", &["行业", "产业", "市场", "趋势", "发展"]),
    ("公司公告", &["公告", "业绩", "财报", "分红", "增发", "回购"]),
    ("市场数据", &["数据", "指数", "成交量", "涨跌", "换手率"]),
    ("专家观点", &["分析师", "研报", "预测", "观点", "评级"]),
    ("国际财经", &["美股", "港股", "外资", "汇率", "国际"]),
];

/// Industry keywords and the sector each one points at.
pub const INDUSTRIES: &[(&str, &str)] = &[
    ("新能源", "新能源"),
    ("光伏", "新能源"),
    ("锂电", "新能源"),
    ("储能", "新能源"),
    ("新能源车", "新能源"),
    ("电动车", "新能源"),
    ("半导体", "半导体"),
    ("芯片", "半导体"),
    ("集成电路", "半导体"),
    ("人工智能", "人工智能"),
    ("AI", "人工智能"),
    ("大模型", "人工智能"),
    ("机器人", "人工智能"),
    ("医药", "医疗健康"),
    ("医疗", "医疗健康"),
    ("生物", "医疗健康"),
    ("创新药", "医疗健康"),
    ("消费", "消费"),
    ("白酒", "消费"),
    ("食品", "消费"),
    ("零售", "消费"),
    ("金融", "金融"),
    ("银行", "金融"),
    ("保险", "金融"),
    ("券商", "金融"),
    ("地产", "地产"),
    ("房地产", "地产"),
    ("建材", "地产"),
    ("军工", "军工"),
    ("国防", "军工"),
    ("航空航天", "军工"),
    ("汽车", "汽车"),
    ("通信", "通信"),
    ("5G", "通信"),
    ("物联网", "通信"),
];

/// Sector given to entities no keyword places.
pub const UNCLASSIFIED_SECTOR: &str = "未分类";

fn leftmost_longest(patterns: impl IntoIterator<Item = &'static str>) -> AhoCorasick {
    AhoCorasick::builder()
        .match_kind(MatchKind::LeftmostLongest)
        .build(patterns)
        .unwrap()
}

/// Positive patterns first, then negative.
static POLARITY: LazyLock<AhoCorasick> =
    LazyLock::new(|| leftmost_longest(POSITIVE.iter().chain(NEGATIVE.iter()).copied()));

/// Pattern index → category index.
static CATEGORY_INDEX: LazyLock<Vec<usize>> = LazyLock::new(|| {
    CATEGORIES
        .iter()
        .enumerate()
        .flat_map(|(i, (_, kws))| kws.iter().map(move |_| i))
        .collect()
});

static CATEGORY_MATCHER: LazyLock<AhoCorasick> = LazyLock::new(|| {
    leftmost_longest(CATEGORIES.iter().flat_map(|(_, kws)| kws.iter().copied()))
});

static INDUSTRY_MATCHER: LazyLock<AhoCorasick> =
    LazyLock::new(|| leftmost_longest(INDUSTRIES.iter().map(|(kw, _)| *kw)));

/// Positive and negative keyword occurrences in a text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Polarity {
    pub positive: u32,
    pub negative: u32,
}

impl Polarity {
    pub fn hits(&self) -> u32 {
        self.positive + self.negative
    }

    /// `positive / (positive + negative)`, `0.5` when nothing matched.
    pub fn score(&self) -> f64 {
        let total = self.hits();
        if total == 0 {
            0.5
        } else {
            f64::from(self.positive) / f64::from(total)
        }
    }
}

pub fn polarity(text: &str) -> Polarity {
    let mut counts = Polarity::default();
    for m in POLARITY.find_iter(text) {
        if m.pattern().as_usize() < POSITIVE.len() {
            counts.positive += 1;
        } else {
            counts.negative += 1;
        }
    }
    counts
}

/// Sentiment score in `0..=1` for a text.
pub fn sentiment_score(text: &str) -> f64 {
    polarity(text).score()
}

/// Category with the most keyword occurrences; earlier categories win ties.
pub fn classify(text: &str) -> &'static str {
    let mut counts = vec![0u32; CATEGORIES.len()];
    for m in CATEGORY_MATCHER.find_iter(text) {
        counts[CATEGORY_INDEX[m.pattern().as_usize()]] += 1;
    }
    let mut best = None;
    let mut best_count = 0;
    for (i, count) in counts.into_iter().enumerate() {
        if count > best_count {
            best_count = count;
            best = Some(i);
        }
    }
    best.map(|i| CATEGORIES[i].0).unwrap_or(OTHER_CATEGORY)
}

/// An industry keyword found in a text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndustryHit {
    pub keyword: &'static str,
    pub sector: &'static str,
    pub count: u32,
}

/// Industry keywords found in `text`, in table order.
pub fn industries(text: &str) -> Vec<IndustryHit> {
    let mut counts = vec![0u32; INDUSTRIES.len()];
    for m in INDUSTRY_MATCHER.find_iter(text) {
        counts[m.pattern().as_usize()] += 1;
    }
    INDUSTRIES
        .iter()
        .zip(counts)
        .filter(|(_, c)| *c > 0)
        .map(|((keyword, sector), count)| IndustryHit {
            keyword,
            sector,
            count,
        })
        .collect()
}

/// Sectors touched by `hits`, most keyword occurrences first.
///
/// Ties follow `preferred` order (the screening allow-list), then first
/// appearance in the industry table.
pub fn rank_sectors(hits: &[IndustryHit], preferred: &[String]) -> Vec<String> {
    let mut totals: Vec<(&str, u32, usize)> = Vec::new();
    for hit in hits {
        match totals.iter_mut().find(|(s, _, _)| *s == hit.sector) {
            Some(entry) => entry.1 += hit.count,
            None => {
                let rank = preferred
                    .iter()
                    .position(|p| p == hit.sector)
                    .unwrap_or(preferred.len());
                totals.push((hit.sector, hit.count, rank));
            }
        }
    }
    // Stable sort keeps table order for sectors outside `preferred`.
    totals.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    totals.into_iter().map(|(s, _, _)| s.to_string()).collect()
}

/// Split text into sentences on `。！？` and newlines, trimmed, empties dropped.
pub fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split(['。', '！', '？', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Sentences of 10..=100 characters carrying sentiment keywords, most hits
/// first (stable), at most `max`.
pub fn key_points(text: &str, max: usize) -> Vec<String> {
    let mut scored: Vec<(&str, u32)> = sentences(text)
        .filter(|s| (10..=100).contains(&s.chars().count()))
        .map(|s| (s, polarity(s).hits()))
        .filter(|(_, hits)| *hits > 0)
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored
        .into_iter()
        .take(max)
        .map(|(s, _)| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_without_keywords() {
        assert_eq!(polarity("今天天气不错"), Polarity::default());
        assert!((sentiment_score("今天天气不错") - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn occurrences_are_counted() {
        let p = polarity("业绩增长，业绩超预期，存在风险");
        assert_eq!(p.positive, 4);
        assert_eq!(p.negative, 1);
        assert!((p.score() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn longest_keyword_wins() {
        let p = polarity("股价创新低");
        assert_eq!(p, Polarity { positive: 0, negative: 1 });
        let p = polarity("股价创新高");
        assert_eq!(p, Polarity { positive: 1, negative: 0 });
    }

    #[test]
    fn scoring_is_deterministic() {
        let text = "政策利好推动新能源板块上涨，但需警惕回调风险。";
        let first = sentiment_score(text);
        for _ in 0..10 {
            assert_eq!(sentiment_score(text).to_bits(), first.to_bits());
        }
    }

    #[test]
    fn classify_picks_most_hits() {
        assert_eq!(classify("央行宣布降准，监管政策调整"), "宏观政策");
        assert_eq!(classify("公司发布财报和分红公告"), "公司公告");
        assert_eq!(classify("今天天气不错"), OTHER_CATEGORY);
        // 1 vs 1: earlier category wins
        assert_eq!(classify("政策与行业"), "宏观政策");
    }

    #[test]
    fn industries_map_to_sectors() {
        let hits = industries("光伏和储能带动新能源，芯片也有表现，光伏龙头领涨");
        let sectors = rank_sectors(&hits, &[]);
        assert_eq!(sectors, vec!["新能源", "半导体"]);
        let photovoltaic = hits.iter().find(|h| h.keyword == "光伏").unwrap();
        assert_eq!(photovoltaic.count, 2);
    }

    #[test]
    fn sector_ties_follow_preferred_order() {
        let hits = industries("芯片与白酒");
        let preferred = vec!["消费".to_string(), "半导体".to_string()];
        assert_eq!(rank_sectors(&hits, &preferred), vec!["消费", "半导体"]);
    }

    #[test]
    fn key_points_filter_and_rank() {
        let text = "短句利好。这是一个普通的句子没有任何关键词在里面。\
                    公司业绩大幅增长并且超预期完成目标。政策利好推动行业加速发展";
        let points = key_points(text, 5);
        assert_eq!(
            points,
            vec![
                "公司业绩大幅增长并且超预期完成目标".to_string(),
                "政策利好推动行业加速发展".to_string(),
            ]
        );
        assert_eq!(key_points(text, 1).len(), 1);
    }
}
