//! Library-level workflow tests over the in-memory store.

use chrono::NaiveDate;

use news_pipeline_core::config::{EntityDef, PipelineConfig};
use news_pipeline_core::models::Importance;
use news_pipeline_core::reader::{read_report, Report};
use news_pipeline_core::store::memory::MemoryStore;
use news_pipeline_core::store::ScopedStore;
use news_pipeline_core::{
    ContentStore, Pipeline, PipelineError, Stage, StoreError, Workflow, WorkflowKind,
};

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn config() -> PipelineConfig {
    PipelineConfig {
        entities: vec![
            EntityDef::new("某新能源公司", "新能源").with_code("300750"),
            EntityDef::new("某芯片公司", "半导体").with_alias("芯片龙头"),
            EntityDef::new("*ST某某", "新能源"),
        ],
        ..PipelineConfig::default()
    }
}

fn item(title: &str, body: &str) -> String {
    format!("# {}\n\n{}\n", title, body)
}

fn seeded(files: &[(&str, String)]) -> Pipeline<MemoryStore> {
    let store = MemoryStore::with_stages();
    for (key, text) in files {
        store.write(Stage::Input, key, text).unwrap();
    }
    Pipeline::new(store, config(), d("2026-01-05"))
}

fn run(p: &Pipeline<MemoryStore>, trigger: &str) -> news_pipeline_core::RunReport {
    p.run(&Workflow::parse_trigger(trigger).unwrap())
        .unwrap_or_else(|e| panic!("{} failed: {}", trigger, e))
}

#[test]
fn three_positive_mentions_become_a_candidate() {
    let p = seeded(&[(
        "2026-01-05-新能源.md",
        item(
            "某新能源公司业绩大增",
            "某新能源公司发布公告，净利润增长，订单突破新高。某新能源公司宣布扩张产能。",
        ),
    )]);
    run(&p, "/analyze-news 2026-01-05");
    let report = run(&p, "/screen-stocks 2026-01-05");

    let c = report
        .candidates
        .iter()
        .find(|c| c.entity == "某新能源公司")
        .expect("candidate present");
    assert_eq!(c.mention_count, 3);
    assert!(c.sentiment_score >= 0.6);
}

#[test]
fn candidates_respect_policy() {
    let p = seeded(&[
        (
            "2026-01-05-a.md",
            item(
                "芯片龙头利好",
                "某芯片公司业绩增长，芯片龙头订单突破。某新能源公司提及一次。",
            ),
        ),
        (
            "2026-01-05-b.md",
            item(
                "*ST某某 上涨",
                "*ST某某 股价上涨，*ST某某 盈利增长，*ST某某 业绩翻倍。",
            ),
        ),
        (
            "2026-01-05-c.md",
            item("某新能源公司风险", "某新能源公司遭遇调查，股价下跌，面临亏损风险。"),
        ),
    ]);
    run(&p, "/analyze-news 2026-01-05");
    let report = run(&p, "/screen-stocks 2026-01-05");
    let policy = &p.config().screening;

    assert!(!report.candidates.is_empty());
    for c in &report.candidates {
        assert!(c.mention_count >= policy.min_mentions, "{:?}", c);
        assert!(c.sentiment_score >= policy.sentiment_threshold, "{:?}", c);
        assert!(policy.allows_sector(&c.sector), "{:?}", c);
        assert!(!c.entity.starts_with("*ST"), "{:?}", c);
    }

    let filtered = run(&p, "/screen-stocks 2026-01-05 新能源");
    assert!(filtered.candidates.iter().all(|c| c.sector == "新能源"));
}

#[test]
fn malformed_screening_date_leaves_the_screening_alone() {
    let p = seeded(&[(
        "2026-01-05-新能源.md",
        item("新能源", "某新能源公司增长，某新能源公司利好。"),
    )]);
    run(&p, "/process-input");
    let key = "2026-01-05-股票筛选.md";
    let before = p.store().read(Stage::Processing, key).unwrap();

    for line in ["/screen-stocks 2026-01-32", "/screen-stocks 2026-02-30 新能源"] {
        assert!(
            matches!(Workflow::parse_trigger(line), Err(PipelineError::InvalidArgs(_))),
            "{}",
            line
        );
    }
    assert_eq!(p.store().read(Stage::Processing, key).unwrap(), before);
}

#[test]
fn off_list_sector_leaves_the_screening_alone() {
    let p = seeded(&[(
        "2026-01-05-新能源.md",
        item("新能源", "某新能源公司增长，某新能源公司利好。"),
    )]);
    run(&p, "/process-input");
    let key = "2026-01-05-股票筛选.md";
    let before = p.store().read(Stage::Processing, key).unwrap();

    let report = run(&p, "/screen-stocks 2026-01-05 地产");
    assert!(report.written.is_empty());
    assert!(report.warnings[0].contains("地产"));
    assert_eq!(p.store().read(Stage::Processing, key).unwrap(), before);
}

#[test]
fn analyze_news_without_date_works_through_the_backlog() {
    let p = seeded(&[
        (
            "2026-01-02-新能源.md",
            item("新能源", "某新能源公司增长，某新能源公司利好。"),
        ),
        ("2026-01-03-芯片.md", item("芯片", "芯片龙头利好。")),
    ]);
    let report = run(&p, "/analyze-news");
    assert_eq!(
        report.written,
        vec![
            "processing/2026-01-02-新闻分析.md",
            "processing/2026-01-03-新闻分析.md",
        ]
    );
    // Today has no input and is not pending, so it gets no record.
    assert!(!p
        .store()
        .exists(Stage::Processing, "2026-01-05-新闻分析.md")
        .unwrap());
    assert!(run(&p, "/analyze-news").written.is_empty());
}

#[test]
fn candidates_carry_market_focus_and_key_news() {
    let p = seeded(&[(
        "2026-01-05-新能源.md",
        item(
            "某新能源公司储能订单",
            "某新能源公司光伏储能订单增长，某新能源公司利好。某新能源公司突破新高。",
        ),
    )]);
    run(&p, "/process-input");
    let report = run(&p, "/screen-stocks 2026-01-05");
    let c = &report.candidates[0];
    assert_eq!(c.entity, "某新能源公司");
    assert_eq!(c.market.as_deref(), Some("深圳"));
    assert_eq!(c.key_news.len(), 1);

    let text = p
        .store()
        .read(Stage::Processing, "2026-01-05-股票筛选.md")
        .unwrap();
    match read_report("2026-01-05-股票筛选.md", &text).unwrap() {
        Report::Screening(s) => assert_eq!(&s.candidates[0], c),
        other => panic!("expected screening, got {:?}", other),
    }
}

#[test]
fn archived_reports_drop_out_of_later_workflows() {
    let p = seeded(&[
        (
            "2025-12-29-新能源.md",
            item("新能源", "某新能源公司增长，某新能源公司利好。"),
        ),
        (
            "2026-01-05-新能源.md",
            item("新能源", "某新能源公司增长，某新能源公司利好。"),
        ),
    ]);
    run(&p, "/process-input");
    let archived = run(&p, "/archive-processed 2026-01-01");
    assert_eq!(archived.processed, 2);
    assert!(p
        .store()
        .exists(Stage::Processing, "archive/2025-12-29-新闻分析.md")
        .unwrap());

    let weekly = run(&p, "/generate-weekly-report 2025-12-29 2026-01-05");
    assert_eq!(weekly.processed, 2);
    assert!(run(&p, "/process-input").written.is_empty());
}

#[test]
fn configured_sector_with_line_break_keeps_reports_readable() {
    let mut cfg = config();
    cfg.screening.sectors.push("航运\n---\nkind: 周报".into());
    let store = MemoryStore::with_stages();
    let p = Pipeline::new(store, cfg, d("2026-01-05"));
    run(&p, "/screen-stocks 2026-01-05");

    let text = p
        .store()
        .read(Stage::Processing, "2026-01-05-股票筛选.md")
        .unwrap();
    match read_report("2026-01-05-股票筛选.md", &text).unwrap() {
        Report::Screening(s) => assert_eq!(s.date, d("2026-01-05")),
        other => panic!("expected screening, got {:?}", other),
    }
}

#[test]
fn screening_output_is_stable() {
    let files = [
        (
            "2026-01-05-a.md",
            item("芯片", "某芯片公司增长突破，芯片龙头利好。"),
        ),
        (
            "2026-01-05-b.md",
            item("新能源", "某新能源公司增长，某新能源公司利好。"),
        ),
    ];
    let texts: Vec<String> = (0..2)
        .map(|_| {
            let p = seeded(&files);
            run(&p, "/process-input");
            p.store()
                .read(Stage::Processing, "2026-01-05-股票筛选.md")
                .unwrap()
        })
        .collect();
    assert_eq!(texts[0], texts[1]);
}

#[test]
fn reports_reparse_to_same_date_and_entities() {
    let p = seeded(&[
        (
            "2026-01-05-a.md",
            item("芯片", "某芯片公司增长突破，芯片龙头利好。"),
        ),
        (
            "2026-01-05-b.md",
            item("新能源", "某新能源公司增长，某新能源公司利好。"),
        ),
    ]);
    run(&p, "/process-input");
    run(&p, "/generate-weekly-report 2026-01-05 2026-01-05");

    let store = p.store();
    let analysis = store
        .read(Stage::Processing, "2026-01-05-新闻分析.md")
        .unwrap();
    match read_report("2026-01-05-新闻分析.md", &analysis).unwrap() {
        Report::Analysis(record) => {
            assert_eq!(record.date, d("2026-01-05"));
            let names: Vec<&str> = record.entities.iter().map(|e| e.name.as_str()).collect();
            assert!(names.contains(&"某芯片公司"));
            assert!(names.contains(&"某新能源公司"));
        }
        other => panic!("expected analysis, got {:?}", other),
    }

    let screening = read_report(
        "2026-01-05-股票筛选.md",
        &store
            .read(Stage::Processing, "2026-01-05-股票筛选.md")
            .unwrap(),
    )
    .unwrap();
    let weekly = read_report(
        "2026-01-05-周报.md",
        &store.read(Stage::Processing, "2026-01-05-周报.md").unwrap(),
    )
    .unwrap();
    assert_eq!(weekly.date(), d("2026-01-05"));
    assert_eq!(weekly.entity_names(), screening.entity_names());
}

#[test]
fn weekly_report_reads_exactly_the_range() {
    let mut files = Vec::new();
    for date in ["2025-12-29", "2025-12-30", "2026-01-01", "2026-01-05", "2026-01-06"] {
        files.push((
            format!("{}-新能源.md", date),
            item("新能源", "某新能源公司增长，某新能源公司利好。"),
        ));
    }
    let files: Vec<(&str, String)> = files.iter().map(|(k, t)| (k.as_str(), t.clone())).collect();
    let p = seeded(&files);
    run(&p, "/process-input");

    let report = run(&p, "/generate-weekly-report 2025-12-30 2026-01-05");
    // Three dates inside, each with an analysis and a screening.
    assert_eq!(report.processed, 6);
    assert_eq!(report.candidates[0].mention_count, 6);
    assert_eq!(report.written, vec!["processing/2025-12-30-周报.md"]);
}

#[test]
fn weekly_report_ignores_earlier_period_reports() {
    let p = seeded(&[(
        "2026-01-05-新能源.md",
        item("新能源", "某新能源公司增长，某新能源公司利好。"),
    )]);
    run(&p, "/process-input");
    run(&p, "/generate-weekly-report 2026-01-05 2026-01-05");
    let again = run(&p, "/generate-weekly-report 2026-01-05 2026-01-05");
    assert_eq!(again.processed, 2);
    assert!(again.skipped.is_empty());
}

#[test]
fn insight_notes_are_write_once() {
    let p = seeded(&[(
        "2026-01-05-新能源.md",
        item(
            "某新能源公司业绩大增",
            "某新能源公司发布公告，净利润增长，订单突破新高。",
        ),
    )]);
    run(&p, "/analyze-news 2026-01-05");
    run(&p, "/extract-insights all");
    let key = "notes/2026-01-05-投资笔记.md";
    let before = p.store().read(Stage::Output, key).unwrap();

    // Changing the record must not rewrite the note.
    p.store()
        .write(Stage::Input, "2026-01-05-补充.md", &item("补充", "市场平稳。"))
        .unwrap();
    run(&p, "/analyze-news 2026-01-05");
    let report = p.extract_insights(Some(Importance::Low)).unwrap();
    assert!(report.was_skipped(key));
    assert_eq!(p.store().read(Stage::Output, key).unwrap(), before);
}

#[test]
fn workflows_stay_inside_their_stages() {
    let store = MemoryStore::with_stages();
    for kind in WorkflowKind::ALL {
        let scoped = ScopedStore::new(&store, kind.name(), kind.reads(), kind.writes());
        for stage in Stage::ALL {
            let write = scoped.write(stage, "scratch.md", "x");
            if stage == kind.writes() {
                assert!(write.is_ok(), "{} should write {}", kind, stage);
            } else {
                assert!(
                    matches!(write, Err(StoreError::StageViolation { .. })),
                    "{} must not write {}",
                    kind,
                    stage
                );
            }
            let read_allowed = stage == kind.writes() || kind.reads().contains(&stage);
            assert_eq!(
                scoped.list(stage).is_ok(),
                read_allowed,
                "{} list {}",
                kind,
                stage
            );
        }
    }
    // Only processing-stage writers touched processing; nothing wrote input.
    assert!(!store.exists(Stage::Input, "scratch.md").unwrap());
}

#[test]
fn missing_output_folder_is_fatal_for_insights() {
    let p = seeded(&[(
        "2026-01-05-新能源.md",
        item("新能源", "某新能源公司增长。"),
    )]);
    run(&p, "/analyze-news 2026-01-05");
    p.store().remove_stage(Stage::Output);
    let err = p.extract_insights(None).unwrap_err();
    assert_eq!(err.to_string(), "stage folder 'output' does not exist");
}
