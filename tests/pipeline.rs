//! End-to-end runs over event logs on disk.

use std::fs;
use std::path::PathBuf;
use weblog_report::config::FontConfig;
use weblog_report::fonts::FontSet;
use weblog_report::models::SessionDurationPolicy;
use weblog_report::pipeline::{PipelineOptions, ReportPipeline};
use weblog_report::report::generate_json_report;
use weblog_report::Error;

const EVENTS: &str = "\
user_id,session_id,page_url,timestamp,event_type,event_duration
u1,s1,/home,2024-01-01 10:00:00,view,12.5
u1,s1,/cart,2024-01-01 10:05:00,click,3.5
u2,s2,/home,2024-01-02 09:00:00,view,8
";

fn write_log(dir: &tempfile::TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("events.csv");
    fs::write(&path, content).unwrap();
    path
}

fn pipeline(policy: SessionDurationPolicy) -> ReportPipeline {
    let options = PipelineOptions {
        policy,
        chart_width: 500,
        chart_height: 650,
        ..PipelineOptions::default()
    };
    ReportPipeline::new(options, FontSet::builtin())
}

#[test]
fn test_full_run_writes_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_log(&dir, EVENTS);

    let output = pipeline(SessionDurationPolicy::Span).run(&input).unwrap();

    assert_eq!(output.rows, 3);
    assert_eq!(output.metrics.total_visits, 3);
    assert_eq!(output.metrics.session_durations.get("s1"), Some(300.0));
    assert_eq!(output.metrics.session_durations.get("s2"), Some(0.0));
    assert_eq!(output.metrics.average_session_duration, Some(150.0));
    assert_eq!(output.metrics.top_pages.as_slice()[0].page_url, "/home");
    assert_eq!(
        output.document.sections.first().map(String::as_str),
        Some("1. Analysis Results")
    );

    let report_path = dir.path().join("analysis_report.pdf");
    output.document.save(&report_path).unwrap();
    let bytes = fs::read(&report_path).unwrap();
    assert!(bytes.starts_with(b"%PDF"));

    let chart_path = dir.path().join("chart.png");
    output.chart.save(&chart_path).unwrap();
    let chart = image::open(&chart_path).unwrap();
    assert_eq!((chart.width(), chart.height()), (500, 650));
}

#[test]
fn test_mean_event_duration_policy() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_log(&dir, EVENTS);

    let (_, metrics) = pipeline(SessionDurationPolicy::MeanEventDuration)
        .analyze_path(&input)
        .unwrap();

    assert_eq!(metrics.policy_version, "mean-event-duration/v1");
    assert_eq!(metrics.session_durations.get("s1"), Some(8.0));
    assert_eq!(metrics.session_durations.get("s2"), Some(8.0));
}

#[test]
fn test_json_export() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_log(&dir, EVENTS);

    let (_, metrics) = pipeline(SessionDurationPolicy::Span)
        .analyze_path(&input)
        .unwrap();
    let json = generate_json_report(&metrics).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["policy_version"], "span/v1");
    assert_eq!(value["daily_visits"]["2024-01-01"], 2);
    assert_eq!(value["top_pages"][0]["visits"], 2);
    assert_eq!(value["session_durations"]["s1"], 300.0);
}

#[test]
fn test_header_only_log() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_log(&dir, "session_id,page_url,timestamp\n");

    let output = pipeline(SessionDurationPolicy::Span).run(&input).unwrap();

    assert_eq!(output.rows, 0);
    assert!(output.metrics.daily_visits.is_empty());
    assert_eq!(output.metrics.average_session_duration, None);
    assert!(output.document.bytes.starts_with(b"%PDF"));
}

#[test]
fn test_missing_column_is_data_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_log(&dir, "session_id,timestamp\ns1,2024-01-01 10:00:00\n");

    let err = pipeline(SessionDurationPolicy::Span)
        .run(&input)
        .unwrap_err();
    assert!(matches!(err, Error::DataFormat(_)));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = pipeline(SessionDurationPolicy::Span)
        .run(&dir.path().join("absent.csv"))
        .unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_mean_policy_rejects_blank_duration() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_log(
        &dir,
        "session_id,page_url,timestamp,event_duration\n\
         s1,/home,2024-01-01 10:00:00,\n\
         s2,/a,2024-01-01 11:00:00,10\n",
    );

    let err = pipeline(SessionDurationPolicy::MeanEventDuration)
        .analyze_path(&input)
        .unwrap_err();
    assert!(matches!(err, Error::DataFormat(_)));
}

#[test]
fn test_span_policy_tolerates_junk_duration() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_log(
        &dir,
        "session_id,page_url,timestamp,event_duration\ns1,/home,2024-01-01 10:00:00,N/A\n",
    );

    let (rows, metrics) = pipeline(SessionDurationPolicy::Span)
        .analyze_path(&input)
        .unwrap();
    assert_eq!(rows, 1);
    assert_eq!(metrics.session_durations.get("s1"), Some(0.0));
}

#[test]
fn test_full_run_with_system_font() {
    let fonts = FontSet::resolve(None, &FontConfig::default().fallbacks);
    if fonts.font().is_none() {
        eprintln!("no system font available; skipping");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let input = write_log(&dir, EVENTS);
    let output = ReportPipeline::new(PipelineOptions::default(), fonts)
        .run(&input)
        .unwrap();

    assert_eq!((output.chart.width, output.chart.height), (1000, 1300));
    assert!(output.document.bytes.starts_with(b"%PDF"));
}
