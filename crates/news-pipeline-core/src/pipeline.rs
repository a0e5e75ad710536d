//! Skill implementations over a [`ContentStore`].
//!
//! [`Pipeline`] owns the store, the settings and the date treated as
//! "today", and runs each [`Workflow`] through a [`ScopedStore`] restricted
//! to that workflow's stages. A run either returns a [`RunReport`] or a
//! [`PipelineError`]; per-item failures (unparseable input, unreadable
//! reports) are collected as skips and never abort the batch.

use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::analyzer;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, StoreError};
use crate::insight;
use crate::models::{AnalysisRecord, Importance};
use crate::naming::{self, ReportKind};
use crate::parser::{self, EntityCatalog};
use crate::period::{self, Period};
use crate::reader;
use crate::render::{self, ReportData};
use crate::screener;
use crate::store::{ContentStore, ScopedStore, Stage};
use crate::workflow::{RunReport, Workflow, WorkflowKind};

/// Input files of one date, as `(key, text)`.
type DateInputs = BTreeMap<NaiveDate, Vec<(String, String)>>;

pub struct Pipeline<S: ContentStore> {
    store: S,
    config: PipelineConfig,
    today: NaiveDate,
    catalog: EntityCatalog,
}

/// Presence and size of one stage folder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageStatus {
    pub stage: Stage,
    pub present: bool,
    pub files: usize,
}

/// Snapshot of the stage folders, for `np status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Status {
    pub today: NaiveDate,
    pub stages: Vec<StageStatus>,
    /// Processing reports per kind label.
    pub reports: BTreeMap<String, usize>,
    pub latest_analysis: Option<NaiveDate>,
    /// Input dates without an up-to-date analysis record.
    pub pending: Vec<NaiveDate>,
}

impl<S: ContentStore> Pipeline<S> {
    pub fn new(store: S, config: PipelineConfig, today: NaiveDate) -> Self {
        let catalog = EntityCatalog::new(&config.entities);
        Self {
            store,
            config,
            today,
            catalog,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Dispatch one workflow.
    pub fn run(&self, workflow: &Workflow) -> Result<RunReport, PipelineError> {
        match workflow {
            Workflow::AnalyzeNews { date: None } => self.analyze_pending(),
            Workflow::AnalyzeNews { date: Some(date) } => self.analyze_news(*date),
            Workflow::ScreenStocks { date, sector } => {
                self.screen_stocks(date.unwrap_or(self.today), sector.as_deref())
            }
            Workflow::GenerateWeeklyReport { start, end } => {
                self.generate_weekly_report(*start, *end)
            }
            Workflow::GenerateMonthlyReport { year, month } => {
                self.generate_monthly_report(*year, *month)
            }
            Workflow::ExtractInsights { importance } => self.extract_insights(*importance),
            Workflow::ProcessInput { force } => self.process_input(*force),
            Workflow::ArchiveProcessed { before } => {
                self.archive_processed(before.unwrap_or_else(|| period::week_start(self.today)))
            }
        }
    }

    fn scoped(&self, kind: WorkflowKind) -> ScopedStore<'_, S> {
        ScopedStore::new(&self.store, kind.name(), kind.reads(), kind.writes())
    }

    // ── analyze-news ────────────────────────────────────────────────────

    /// Analyze every input item of `date` into one record. A date without
    /// input still gets an (empty) record.
    pub fn analyze_news(&self, date: NaiveDate) -> Result<RunReport, PipelineError> {
        let kind = WorkflowKind::AnalyzeNews;
        let mut report = RunReport::new(kind);
        let span = info_span!("workflow", run_id = %report.run_id, workflow = %kind);
        let _guard = span.enter();
        let store = self.scoped(kind);

        let mut inputs = self.load_inputs(&store, Some(date), &mut report)?;
        let files = inputs.remove(&date).unwrap_or_default();
        let record = self.analyze_date(&store, date, &files, &mut report)?;

        report.message = format!(
            "analyzed {} item(s) for {} (sentiment {:.4}, {})",
            record.items.len(),
            date,
            record.sentiment_score,
            record.sentiment.as_str()
        );
        info!(summary = %report.message, "workflow finished");
        Ok(report)
    }

    /// Analyze every date whose input changed since its record was written.
    pub fn analyze_pending(&self) -> Result<RunReport, PipelineError> {
        let kind = WorkflowKind::AnalyzeNews;
        let mut report = RunReport::new(kind);
        let span = info_span!("workflow", run_id = %report.run_id, workflow = %kind);
        let _guard = span.enter();
        let store = self.scoped(kind);

        let inputs = self.load_inputs(&store, None, &mut report)?;
        let mut dates = 0;
        for (date, files) in &inputs {
            if !is_pending(&store, *date, files)? {
                debug!(%date, "record up to date");
                continue;
            }
            self.analyze_date(&store, *date, files, &mut report)?;
            dates += 1;
        }

        report.message = if dates == 0 {
            "no pending input".to_string()
        } else {
            format!("analyzed {} pending date(s)", dates)
        };
        info!(summary = %report.message, "workflow finished");
        Ok(report)
    }

    // ── screen-stocks ───────────────────────────────────────────────────

    /// Screen the record of `date`. The screening file is written even when
    /// no candidate passes or no record exists, but never for a sector
    /// filter outside the allow-list: that only warns.
    pub fn screen_stocks(
        &self,
        date: NaiveDate,
        sector: Option<&str>,
    ) -> Result<RunReport, PipelineError> {
        let kind = WorkflowKind::ScreenStocks;
        let mut report = RunReport::new(kind);
        let span = info_span!("workflow", run_id = %report.run_id, workflow = %kind);
        let _guard = span.enter();
        let store = self.scoped(kind);

        let record = load_record(&store, date, &mut report)?;
        if record.is_some() {
            report.processed += 1;
        }
        self.screen_date(&store, date, record.as_ref(), sector, &mut report)?;

        report.message = if report.written.is_empty() {
            format!("sector filter rejected, screening for {} left unchanged", date)
        } else {
            format!(
                "{} candidate(s) for {}{}",
                report.candidates.len(),
                date,
                sector.map(|s| format!(" in {}", s)).unwrap_or_default()
            )
        };
        info!(summary = %report.message, "workflow finished");
        Ok(report)
    }

    // ── generate-weekly-report / generate-monthly-report ────────────────

    /// Weekly report. Defaults: Monday of the current week through today;
    /// a lone start covers seven days; a lone end starts on its Monday.
    pub fn generate_weekly_report(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<RunReport, PipelineError> {
        let period = match (start, end) {
            (None, None) => Period::current_week(self.today),
            (Some(s), None) => {
                let e = s.checked_add_days(Days::new(6)).ok_or_else(|| {
                    PipelineError::InvalidArgs(format!("start date {} out of range", s))
                })?;
                Period::weekly(s, e)?
            }
            (None, Some(e)) => Period::weekly(period::week_start(e), e)?,
            (Some(s), Some(e)) => Period::weekly(s, e)?,
        };
        self.period_report(WorkflowKind::GenerateWeeklyReport, period)
    }

    /// Monthly report, defaulting to the current month.
    pub fn generate_monthly_report(
        &self,
        year: Option<i32>,
        month: Option<u32>,
    ) -> Result<RunReport, PipelineError> {
        let period = Period::month(
            year.unwrap_or(self.today.year()),
            month.unwrap_or(self.today.month()),
        )?;
        self.period_report(WorkflowKind::GenerateMonthlyReport, period)
    }

    fn period_report(
        &self,
        kind: WorkflowKind,
        period: Period,
    ) -> Result<RunReport, PipelineError> {
        let mut report = RunReport::new(kind);
        let span = info_span!("workflow", run_id = %report.run_id, workflow = %kind);
        let _guard = span.enter();
        let store = self.scoped(kind);

        let mut records = Vec::new();
        let mut screenings = Vec::new();
        for key in store.list(Stage::Processing)? {
            // Period reports and anything unrecognised stay out of the fold.
            let Some((date, report_kind)) = naming::classify_report(&key) else {
                continue;
            };
            if report_kind.is_period() || !period.contains(date) {
                continue;
            }
            let Some(text) = read_or_skip(&store, Stage::Processing, &key, &mut report)? else {
                continue;
            };
            let parsed = match report_kind {
                ReportKind::Analysis => reader::read_analysis(&key, &text).map(|r| records.push(r)),
                _ => reader::read_screening(&key, &text).map(|s| screenings.push(s)),
            };
            if let Err(e) = parsed {
                warn!(key = %key, error = %e, "skipping unreadable report");
                report.skip(key, e);
            }
        }
        report.processed = records.len() + screenings.len();

        let digest = period::aggregate(period, &records, &screenings, &self.config.screening);
        let text = render::render(ReportData::Period(&digest))?;
        let key = period.report_key();
        store.write(Stage::Processing, &key, &text)?;
        report.wrote(Stage::Processing, &key);
        report.candidates = digest.candidates;

        report.message = format!(
            "{} for {} to {}: {} record(s), {} screening(s), {} item(s)",
            period.kind.report_kind().label(),
            period.start,
            period.end,
            records.len(),
            screenings.len(),
            digest.item_count
        );
        info!(summary = %report.message, "workflow finished");
        Ok(report)
    }

    // ── extract-insights ────────────────────────────────────────────────

    /// Copy items at or above `importance` into per-date notes under
    /// `output/notes/`. Existing notes are never rewritten.
    pub fn extract_insights(
        &self,
        importance: Option<Importance>,
    ) -> Result<RunReport, PipelineError> {
        let kind = WorkflowKind::ExtractInsights;
        let threshold = importance.unwrap_or(self.config.insights.importance);
        let mut report = RunReport::new(kind);
        let span = info_span!("workflow", run_id = %report.run_id, workflow = %kind, %threshold);
        let _guard = span.enter();
        let store = self.scoped(kind);

        for key in store.list(Stage::Processing)? {
            let Some((date, ReportKind::Analysis)) = naming::classify_report(&key) else {
                continue;
            };
            let note_key = naming::note_key(date);
            if store.exists(Stage::Output, &note_key)? {
                debug!(key = %note_key, "note exists");
                report.skip(note_key, "note already exists");
                continue;
            }
            let Some(text) = read_or_skip(&store, Stage::Processing, &key, &mut report)? else {
                continue;
            };
            let record = match reader::read_analysis(&key, &text) {
                Ok(r) => r,
                Err(e) => {
                    warn!(key = %key, error = %e, "skipping unreadable record");
                    report.skip(key, e);
                    continue;
                }
            };
            report.processed += 1;

            match insight::select(&record, threshold) {
                Some(note) => {
                    let text = render::render(ReportData::Insight(&note))?;
                    store.write(Stage::Output, &note_key, &text)?;
                    report.wrote(Stage::Output, &note_key);
                    info!(%date, insights = note.items.len(), "note written");
                }
                None => report.skip(key, format!("no items at or above {}", threshold)),
            }
        }

        report.message = format!(
            "{} note(s) written from {} record(s)",
            report.written.len(),
            report.processed
        );
        info!(summary = %report.message, "workflow finished");
        Ok(report)
    }

    // ── process-input ───────────────────────────────────────────────────

    /// Analyze and screen every pending date, or every date with `force`.
    pub fn process_input(&self, force: bool) -> Result<RunReport, PipelineError> {
        let kind = WorkflowKind::ProcessInput;
        let mut report = RunReport::new(kind);
        let span = info_span!("workflow", run_id = %report.run_id, workflow = %kind, force);
        let _guard = span.enter();
        let store = self.scoped(kind);

        let inputs = self.load_inputs(&store, None, &mut report)?;
        let mut dates = 0;
        for (date, files) in &inputs {
            if !force && !is_pending(&store, *date, files)? {
                debug!(%date, "record up to date");
                continue;
            }
            let record = self.analyze_date(&store, *date, files, &mut report)?;
            self.screen_date(&store, *date, Some(&record), None, &mut report)?;
            dates += 1;
        }

        report.message = if dates == 0 {
            "no pending input".to_string()
        } else {
            format!(
                "processed {} date(s), {} item(s), {} candidate(s)",
                dates,
                report.processed,
                report.candidates.len()
            )
        };
        info!(summary = %report.message, "workflow finished");
        Ok(report)
    }

    // ── archive-processed ───────────────────────────────────────────────

    /// Move dated processing reports older than `before` under
    /// `processing/archive/`. Archived files drop out of listings, so later
    /// period reports and insights no longer see them.
    pub fn archive_processed(&self, before: NaiveDate) -> Result<RunReport, PipelineError> {
        let kind = WorkflowKind::ArchiveProcessed;
        let mut report = RunReport::new(kind);
        let span = info_span!("workflow", run_id = %report.run_id, workflow = %kind, %before);
        let _guard = span.enter();
        let store = self.scoped(kind);

        for key in store.list(Stage::Processing)? {
            let Some((date, _)) = naming::classify_report(&key) else {
                continue;
            };
            if date >= before {
                continue;
            }
            let Some(text) = read_or_skip(&store, Stage::Processing, &key, &mut report)? else {
                continue;
            };
            let target = naming::archive_key(&key);
            store.write(Stage::Processing, &target, &text)?;
            store.remove(Stage::Processing, &key)?;
            report.wrote(Stage::Processing, &target);
            report.processed += 1;
            debug!(key = %key, "archived");
        }

        report.message = format!(
            "archived {} report(s) dated before {}",
            report.processed, before
        );
        info!(summary = %report.message, "workflow finished");
        Ok(report)
    }

    // ── status ──────────────────────────────────────────────────────────

    /// Input dates whose record is missing or stale.
    pub fn pending_dates(&self) -> Result<Vec<NaiveDate>, PipelineError> {
        let mut scratch = RunReport::new(WorkflowKind::ProcessInput);
        let inputs = self.load_inputs(&self.store, None, &mut scratch)?;
        let mut pending = Vec::new();
        for (date, files) in &inputs {
            if is_pending(&self.store, *date, files)? {
                pending.push(*date);
            }
        }
        Ok(pending)
    }

    pub fn status(&self) -> Result<Status, PipelineError> {
        let mut stages = Vec::new();
        let mut listings = BTreeMap::new();
        for stage in Stage::ALL {
            match self.store.list(stage) {
                Ok(keys) => {
                    stages.push(StageStatus {
                        stage,
                        present: true,
                        files: keys.len(),
                    });
                    listings.insert(stage, keys);
                }
                Err(StoreError::MissingStage(_)) => stages.push(StageStatus {
                    stage,
                    present: false,
                    files: 0,
                }),
                Err(e) => return Err(e.into()),
            }
        }

        let mut reports = BTreeMap::new();
        let mut latest_analysis = None;
        for key in listings.get(&Stage::Processing).into_iter().flatten() {
            if let Some((date, kind)) = naming::classify_report(key) {
                *reports.entry(kind.label().to_string()).or_insert(0) += 1;
                if kind == ReportKind::Analysis && latest_analysis < Some(date) {
                    latest_analysis = Some(date);
                }
            }
        }

        let pending = if listings.contains_key(&Stage::Input) {
            self.pending_dates()?
        } else {
            Vec::new()
        };

        Ok(Status {
            today: self.today,
            stages,
            reports,
            latest_analysis,
            pending,
        })
    }

    // ── shared steps ────────────────────────────────────────────────────

    /// Read input files grouped by the date in their name, optionally only
    /// those of `only`. Undated or unreadable files become skips.
    fn load_inputs<T: ContentStore + ?Sized>(
        &self,
        store: &T,
        only: Option<NaiveDate>,
        report: &mut RunReport,
    ) -> Result<DateInputs, PipelineError> {
        let mut by_date = DateInputs::new();
        for key in store.list(Stage::Input)? {
            let date = match naming::split_dated_name(&key) {
                Ok((date, _)) => date,
                Err(e) => {
                    warn!(key = %key, error = %e, "skipping input file");
                    report.skip(key, e);
                    continue;
                }
            };
            if only.is_some_and(|d| d != date) {
                continue;
            }
            if let Some(text) = read_or_skip(store, Stage::Input, &key, report)? {
                by_date.entry(date).or_default().push((key, text));
            }
        }
        Ok(by_date)
    }

    fn analyze_date<T: ContentStore + ?Sized>(
        &self,
        store: &T,
        date: NaiveDate,
        files: &[(String, String)],
        report: &mut RunReport,
    ) -> Result<AnalysisRecord, PipelineError> {
        let digest = analyzer::input_digest(files.iter().map(|(k, t)| (k.as_str(), t.as_str())));
        let mut items = Vec::with_capacity(files.len());
        for (key, text) in files {
            match parser::parse_item(key, text, &self.catalog, &self.config.screening.sectors) {
                Ok(item) => items.push(item),
                Err(e) => {
                    warn!(key = %key, error = %e, "skipping input item");
                    report.skip(key.clone(), e);
                }
            }
        }

        let record = analyzer::analyze(date, &items, &self.config.analysis, digest);
        let text = render::render(ReportData::Daily(&record))?;
        let key = naming::report_key(ReportKind::Analysis, date);
        store.write(Stage::Processing, &key, &text)?;
        report.wrote(Stage::Processing, &key);
        report.processed += items.len();
        info!(
            %date,
            items = items.len(),
            entities = record.entities.len(),
            sentiment = record.sentiment_score,
            "analysis record written"
        );
        Ok(record)
    }

    fn screen_date<T: ContentStore + ?Sized>(
        &self,
        store: &T,
        date: NaiveDate,
        record: Option<&AnalysisRecord>,
        sector: Option<&str>,
        report: &mut RunReport,
    ) -> Result<(), PipelineError> {
        let screening = screener::screen(date, record, &self.config.screening, sector);
        if screening.rejected {
            report.warnings.extend(screening.warnings);
            return Ok(());
        }
        let text = render::render(ReportData::StockScreen(&screening.result))?;
        let key = naming::report_key(ReportKind::Screening, date);
        store.write(Stage::Processing, &key, &text)?;
        report.wrote(Stage::Processing, &key);
        info!(
            %date,
            candidates = screening.result.candidates.len(),
            "screening written"
        );
        report.candidates.extend(screening.result.candidates);
        report.warnings.extend(screening.warnings);
        Ok(())
    }
}

/// Read a key, turning per-file failures into skips. A missing stage
/// folder is fatal.
fn read_or_skip<T: ContentStore + ?Sized>(
    store: &T,
    stage: Stage,
    key: &str,
    report: &mut RunReport,
) -> Result<Option<String>, PipelineError> {
    match store.read(stage, key) {
        Ok(text) => Ok(Some(text)),
        Err(e @ (StoreError::MissingStage(_) | StoreError::StageViolation { .. })) => {
            Err(e.into())
        }
        Err(e) => {
            warn!(key = %key, error = %e, "skipping unreadable file");
            report.skip(key, e);
            Ok(None)
        }
    }
}

/// The stored record of `date`, if present and readable.
fn load_record<T: ContentStore + ?Sized>(
    store: &T,
    date: NaiveDate,
    report: &mut RunReport,
) -> Result<Option<AnalysisRecord>, PipelineError> {
    let key = naming::report_key(ReportKind::Analysis, date);
    let text = match store.read(Stage::Processing, &key) {
        Ok(text) => text,
        Err(e) if e.is_not_found() => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    match reader::read_analysis(&key, &text) {
        Ok(record) => Ok(Some(record)),
        Err(e) => {
            warn!(key = %key, error = %e, "skipping unreadable record");
            report.skip(key, e);
            Ok(None)
        }
    }
}

/// Whether `date` lacks a record built from exactly these files. An
/// archived record counts.
fn is_pending<T: ContentStore + ?Sized>(
    store: &T,
    date: NaiveDate,
    files: &[(String, String)],
) -> Result<bool, PipelineError> {
    let key = naming::report_key(ReportKind::Analysis, date);
    let mut stored = None;
    for candidate in [key.clone(), naming::archive_key(&key)] {
        match store.read(Stage::Processing, &candidate) {
            Ok(text) => {
                stored = reader::read_analysis(&candidate, &text)
                    .ok()
                    .map(|r| r.input_digest);
                break;
            }
            Err(e) if e.is_not_found() => continue,
            Err(e) => return Err(e.into()),
        }
    }
    let current = analyzer::input_digest(files.iter().map(|(k, t)| (k.as_str(), t.as_str())));
    Ok(stored.as_deref() != Some(current.as_str()))
}
