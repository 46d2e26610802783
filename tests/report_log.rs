mod common;

use archival_automation::batch::BatchOrchestrator;
use common::{fast_config, jobs, Behavior, MockBridge};

#[test]
fn log_lists_every_job_and_summary() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = fast_config();
    let bridge = MockBridge::new([
        Behavior::clean(),
        Behavior::dialog("This document contains missing links."),
        Behavior::hang_on_open(),
    ]);

    let mut orch = BatchOrchestrator::new(&cfg, &bridge, tmp.path().join("pkg"))
        .with_log_dir(tmp.path());
    let report = orch.run_batch(jobs(tmp.path(), &["One.indd", "Two.indd", "Three.indd"]));

    let log_path = report.log_path.clone().expect("log written");
    let name = log_path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("batch-log-"), "{name}");
    assert!(name.ends_with(".txt"));
    assert_eq!(name.len(), "batch-log-".len() + "YYYYMMDD-HHMMSS".len() + ".txt".len());

    let log = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert!(lines[0].starts_with("Archival Automation batch log"));
    assert!(lines[0].contains(&report.batch_id));

    for doc in ["One.indd", "Two.indd", "Three.indd"] {
        let processing = format!("Processing: {}", tmp.path().join(doc).display());
        assert!(lines.contains(&processing.as_str()), "{processing}");
    }
    assert!(log.contains("Outcome: Success - packaged to"));
    assert!(log.contains("Outcome: MissingLinks - "));
    assert!(log.contains("Outcome: Timeout - "));
    assert!(log.contains("Missing links: unknown"));
    assert!(log.contains("Succeeded: 1"));
    assert!(log.contains("Failed: 1"));
    assert!(log.contains("Timed out: 1"));
    assert!(log.contains("  - Two.indd: unknown"));
}

#[test]
fn clean_batch_reports_no_missing_links() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = fast_config();
    let bridge = MockBridge::new([Behavior::clean()]);

    let mut orch = BatchOrchestrator::new(&cfg, &bridge, tmp.path()).with_log_dir(tmp.path());
    let report = orch.run_batch(jobs(tmp.path(), &["Only.indd"]));

    let rendered = report.render_log();
    assert!(rendered.contains("Documents with missing links: none"));
    assert!(report.finished.is_some());
}

#[test]
fn json_report_carries_summary_and_results() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = fast_config();
    let bridge = MockBridge::new([Behavior::dialog("8 links are missing")]);

    let mut orch = BatchOrchestrator::new(&cfg, &bridge, tmp.path()).with_log_dir(tmp.path());
    let report = orch.run_batch(jobs(tmp.path(), &["Links.indd"]));

    let raw = std::fs::read_to_string(tmp.path().join("batch-report.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(doc["summary"]["failed"], 1);
    assert_eq!(doc["summary"]["missing_links"][0]["count"], "8");
    assert_eq!(doc["report"]["batch_id"], report.batch_id.as_str());
    assert_eq!(doc["report"]["results"][0]["outcome"], "MissingLinks");
}

#[test]
fn disabled_outputs_write_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let mut cfg = fast_config();
    cfg.output.write_log = false;
    cfg.output.write_report_json = false;
    let bridge = MockBridge::new([Behavior::clean()]);

    let logs = tmp.path().join("logs");
    let mut orch = BatchOrchestrator::new(&cfg, &bridge, tmp.path()).with_log_dir(&logs);
    let report = orch.run_batch(jobs(tmp.path(), &["A.indd"]));

    assert!(report.log_path.is_none());
    assert!(!logs.exists());
}
