//! Integration tests for schedule reconstruction

use schedule_inspector::extractor::{RawFragment, RawTextRun};
use schedule_inspector::store::RunStatus;
use schedule_inspector::{
    process_document, process_document_mem, run_pipeline, DiagnosticKind, GameRecord, GameStore,
    JsonFileSource, JsonFileStore, MemoryStore, OverrideMode, OverrideTable, RawDocument,
    RawPage, ScheduleError, ScheduleOptions, ScheduleParser, StoreError, YearSource,
};

// Helper to create an encoded raw text run
fn make_run(text: &str, x: f32, y: f32) -> RawTextRun {
    RawTextRun {
        x,
        y,
        w: text.len() as f32 * 0.5,
        runs: vec![RawFragment {
            text: urlencoding::encode(text).into_owned(),
        }],
    }
}

fn make_page(width: f32, runs: Vec<RawTextRun>) -> RawPage {
    RawPage {
        width,
        height: 40.0,
        tokens: runs,
    }
}

fn parse(pages: Vec<RawPage>) -> schedule_inspector::ExtractionResult {
    ScheduleParser::default()
        .parse(&RawDocument { pages }, Some("schedule.json"))
        .unwrap()
}

// ============================================================================
// End-to-end layout scenarios
// ============================================================================

#[test]
fn test_single_field_header() {
    let result = parse(vec![make_page(
        100.0,
        vec![
            make_run("FIELD 3A", 10.0, 2.0),
            make_run("15 min", 10.0, 3.0),
            make_run("3v3", 20.0, 3.0),
            make_run("2017", 30.0, 3.0),
            make_run("10.00 - 10.15", 10.0, 4.0),
            make_run("Team X", 15.0, 4.0),
        ],
    )]);

    assert_eq!(
        result.games,
        vec![GameRecord {
            field: "FIELD 3A".into(),
            time: "10.00 - 10.15".into(),
            team1: "Team X".into(),
            team2: "".into(),
            year: "2017".into(),
            game_duration: "15 min".into(),
            game_type: "3v3".into(),
            year_source: YearSource::Header,
        }]
    );
    assert_eq!(result.source_file.as_deref(), Some("schedule.json"));
}

#[test]
fn test_two_field_header_landscape() {
    let result = parse(vec![make_page(
        120.0,
        vec![
            make_run("FIELD 1A", 5.0, 2.0),
            make_run("FIELD 1B", 60.0, 2.0),
            make_run("15 min", 5.0, 3.0),
            make_run("3v3", 15.0, 3.0),
            make_run("2016", 25.0, 3.0),
            make_run("20 min", 60.0, 3.0),
            make_run("5v5", 70.0, 3.0),
            make_run("2014", 80.0, 3.0),
            make_run("10.00 - 10.15", 5.0, 4.0),
            make_run("HJK P16", 15.0, 4.0),
            make_run("FC Honka", 30.0, 4.0),
            make_run("10.00 - 10.20", 60.0, 4.0),
            make_run("Ilves", 70.0, 4.0),
            make_run("KuPS", 85.0, 4.0),
        ],
    )]);

    assert_eq!(result.games.len(), 2);

    let left = &result.games[0];
    assert_eq!(left.field, "FIELD 1A");
    assert_eq!(left.game_type, "3v3");
    assert_eq!(left.year, "2016");
    assert_eq!(left.year_source, YearSource::Inferred);

    let right = &result.games[1];
    assert_eq!(right.field, "FIELD 1B");
    assert_eq!(right.time, "10.00 - 10.20");
    assert_eq!(right.game_duration, "20 min");
    assert_eq!(right.game_type, "5v5");
    assert_eq!(right.year, "2014");
    assert_eq!(right.year_source, YearSource::Header);
}

#[test]
fn test_row_without_active_block() {
    let result = parse(vec![make_page(
        100.0,
        vec![
            make_run("10.00 - 10.15", 10.0, 4.0),
            make_run("Team X", 15.0, 4.0),
        ],
    )]);

    assert!(result.games.is_empty());
    assert_eq!(result.diagnostics.len(), 1);
    assert!(matches!(
        result.diagnostics[0].kind,
        DiagnosticKind::OrphanedLine { .. }
    ));
}

#[test]
fn test_document_date() {
    let result = parse(vec![make_page(
        100.0,
        vec![make_run("Ottelut 14.6.2025 alkaen", 10.0, 1.0)],
    )]);
    assert_eq!(result.document_date.as_deref(), Some("14.6.2025"));
}

#[test]
fn test_incomplete_metadata_side_has_no_records() {
    let result = parse(vec![make_page(
        120.0,
        vec![
            make_run("FIELD 1A", 5.0, 2.0),
            make_run("FIELD 1B", 60.0, 2.0),
            make_run("15 min", 5.0, 3.0),
            make_run("3v3", 15.0, 3.0),
            make_run("2016", 25.0, 3.0),
            make_run("20 min", 60.0, 3.0),
            make_run("10.00 - 10.15", 5.0, 4.0),
            make_run("10.00 - 10.20", 60.0, 4.0),
            make_run("Ilves", 70.0, 4.0),
        ],
    )]);

    assert_eq!(result.games.len(), 1);
    assert_eq!(result.games[0].field, "FIELD 1A");
    let kinds: Vec<&DiagnosticKind> = result.diagnostics.iter().map(|d| &d.kind).collect();
    assert!(matches!(kinds[0], DiagnosticKind::IncompleteMetadata { found: 1, .. }));
    assert!(matches!(kinds[1], DiagnosticKind::DroppedRow { .. }));
}

#[test]
fn test_games_keep_page_order() {
    let page = |field: &str, time: &str| {
        make_page(
            100.0,
            vec![
                make_run(field, 10.0, 2.0),
                make_run("15 min", 10.0, 3.0),
                make_run("3v3", 20.0, 3.0),
                make_run("2017", 30.0, 3.0),
                make_run(time, 10.0, 4.0),
            ],
        )
    };
    let result = parse(vec![
        page("FIELD 1A", "09.00 - 09.15"),
        page("FIELD 2A", "08.00 - 08.15"),
    ]);
    let fields: Vec<&str> = result.games.iter().map(|g| g.field.as_str()).collect();
    assert_eq!(fields, vec!["FIELD 1A", "FIELD 2A"]);
}

#[test]
fn test_every_time_matches_pattern() {
    let re = regex::Regex::new(r"^\d{2}\.\d{2}\s*-\s*\d{2}\.\d{2}$").unwrap();
    let result = parse(vec![make_page(
        100.0,
        vec![
            make_run("FIELD 3A", 10.0, 2.0),
            make_run("15 min", 10.0, 3.0),
            make_run("3v3", 20.0, 3.0),
            make_run("2017", 30.0, 3.0),
            make_run("10.00 - 10.15", 10.0, 4.0),
            make_run("9.00 - 9.15", 10.0, 5.0),
            make_run("Tauko", 10.0, 6.0),
            make_run("10.30-10.45", 10.0, 7.0),
        ],
    )]);
    assert_eq!(result.games.len(), 2);
    assert!(result.games.iter().all(|g| re.is_match(&g.time)));
}

// ============================================================================
// Input format
// ============================================================================

#[test]
fn test_upstream_capitalized_json() {
    let json = r#"{
        "Pages": [{
            "Width": 100, "Height": 40,
            "Texts": [
                {"x": 10, "y": 2, "w": 4, "R": [{"T": "FIELD%203A"}]},
                {"x": 10, "y": 3, "w": 3, "R": [{"T": "15%20min"}]},
                {"x": 20, "y": 3, "w": 2, "R": [{"T": "3v3"}]},
                {"x": 30, "y": 3, "w": 2, "R": [{"T": "2017"}]},
                {"x": 10, "y": 4, "w": 6, "R": [{"T": "10.00%20-%2010.15"}]},
                {"x": 15, "y": 4, "w": 3, "R": [{"T": "Team%20X"}]}
            ]
        }]
    }"#;
    let result =
        process_document_mem(json.as_bytes(), Some("a.json"), ScheduleOptions::default())
            .unwrap();
    assert_eq!(result.games.len(), 1);
    assert_eq!(result.games[0].team1, "Team X");
}

#[test]
fn test_malformed_input_is_an_error() {
    let err = process_document_mem(b"{\"pages\": 3}", None, ScheduleOptions::default())
        .unwrap_err();
    assert!(matches!(err, ScheduleError::Json(_)));

    let err = process_document_mem(b"{\"pages\": []}", None, ScheduleOptions::default())
        .unwrap_err();
    assert!(matches!(err, ScheduleError::NoPages));
}

#[test]
fn test_process_document_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kesa.json");
    let doc = RawDocument {
        pages: vec![make_page(100.0, vec![make_run("Ottelut 1.7.2025", 1.0, 1.0)])],
    };
    std::fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();

    let result = process_document(&path, ScheduleOptions::default()).unwrap();
    assert_eq!(result.source_file.as_deref(), Some("kesa.json"));
    assert_eq!(result.document_date.as_deref(), Some("1.7.2025"));
}

#[test]
fn test_result_serializes_camel_case() {
    let result = parse(vec![make_page(
        100.0,
        vec![
            make_run("FIELD 3A", 10.0, 2.0),
            make_run("15 min", 10.0, 3.0),
            make_run("3v3", 20.0, 3.0),
            make_run("2017", 30.0, 3.0),
            make_run("10.00 - 10.15", 10.0, 4.0),
        ],
    )]);
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["sourceFile"], "schedule.json");
    assert!(value["documentDate"].is_null());
    assert_eq!(value["games"][0]["gameDuration"], "15 min");
    assert_eq!(value["games"][0]["yearSource"], "header");
}

// ============================================================================
// Overrides
// ============================================================================

#[test]
fn test_overrides_merge_after_extraction() {
    let mut table = OverrideTable::default();
    table.fields.insert(
        "FIELD 3A".into(),
        serde_json::from_str(r#"[{"time": "12.00 - 12.15", "team1": "Manual"}]"#).unwrap(),
    );
    assert_eq!(table.mode, OverrideMode::Replace);

    let parser = ScheduleParser::default().with_overrides(table);
    let doc = RawDocument {
        pages: vec![make_page(
            100.0,
            vec![
                make_run("FIELD 3A", 10.0, 2.0),
                make_run("15 min", 10.0, 3.0),
                make_run("3v3", 20.0, 3.0),
                make_run("2017", 30.0, 3.0),
                make_run("10.00 - 10.15", 10.0, 4.0),
            ],
        )],
    };
    let result = parser.parse(&doc, None).unwrap();
    assert_eq!(result.games.len(), 1);
    assert_eq!(result.games[0].team1, "Manual");
    assert_eq!(result.games[0].year_source, YearSource::Override);
}

// ============================================================================
// Pipeline and stores
// ============================================================================

struct FailingStore {
    inner: MemoryStore,
}

impl GameStore for FailingStore {
    fn replace_all(&mut self, _games: &[GameRecord]) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        )))
    }

    fn record_run(&mut self, filename: &str, date: Option<&str>) -> Result<u64, StoreError> {
        self.inner.record_run(filename, date)
    }

    fn mark_run_completed(&mut self, run: u64, count: usize) -> Result<(), StoreError> {
        self.inner.mark_run_completed(run, count)
    }

    fn mark_run_failed(&mut self, run: u64, error: &str) -> Result<(), StoreError> {
        self.inner.mark_run_failed(run, error)
    }

    fn games(&self) -> Result<Vec<GameRecord>, StoreError> {
        self.inner.games()
    }

    fn latest_run(&self) -> Result<Option<schedule_inspector::store::RunRecord>, StoreError> {
        self.inner.latest_run()
    }
}

fn write_document(dir: &std::path::Path, name: &str, pages: Vec<RawPage>) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string(&RawDocument { pages }).unwrap()).unwrap();
    path
}

fn scenario_page() -> RawPage {
    make_page(
        100.0,
        vec![
            make_run("Ottelut 14.6.2025 alkaen", 10.0, 1.0),
            make_run("FIELD 3A", 10.0, 2.0),
            make_run("15 min", 10.0, 3.0),
            make_run("3v3", 20.0, 3.0),
            make_run("2017", 30.0, 3.0),
            make_run("10.00 - 10.15", 10.0, 4.0),
            make_run("Team X", 15.0, 4.0),
        ],
    )
}

#[test]
fn test_pipeline_into_json_store() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_document(dir.path(), "week.json", vec![scenario_page()]);
    let mut store = JsonFileStore::open(dir.path().join("store")).unwrap();

    let result = run_pipeline(
        &JsonFileSource::new(&input),
        &ScheduleParser::default(),
        &mut store,
    )
    .unwrap();
    assert_eq!(result.games.len(), 1);

    let run = store.latest_run().unwrap().unwrap();
    assert_eq!(run.filename, "week.json");
    assert_eq!(run.document_date.as_deref(), Some("14.6.2025"));
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.game_count, Some(1));
    assert_eq!(store.games().unwrap(), result.games);
}

#[test]
fn test_pipeline_structural_failure_marks_run_failed() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_document(dir.path(), "empty.json", vec![]);
    let mut store = MemoryStore::new();

    let err = run_pipeline(
        &JsonFileSource::new(&input),
        &ScheduleParser::default(),
        &mut store,
    )
    .unwrap_err();
    assert!(matches!(err, ScheduleError::NoPages));

    let run = store.latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.document_date, None);
}

#[test]
fn test_pipeline_store_failure_keeps_previous_games() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_document(dir.path(), "week.json", vec![scenario_page()]);
    let mut store = FailingStore {
        inner: MemoryStore::new(),
    };

    let err = run_pipeline(
        &JsonFileSource::new(&input),
        &ScheduleParser::default(),
        &mut store,
    )
    .unwrap_err();
    assert!(matches!(err, ScheduleError::Store(_)));

    let run = store.latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.error.unwrap().contains("disk full"));
    assert!(store.games().unwrap().is_empty());
}
