use archival_automation::config::{Config, Dismissal, TextSource};

#[test]
fn parse_example_config() {
    let raw = include_str!("../archival-automation.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert_eq!(cfg.application.document_extension, "indd");
    assert_eq!(cfg.timeouts.job_seconds, 90);
    assert_eq!(cfg.batch.grace_seconds, 5);
    assert_eq!(cfg.polling.max_checks, 10);
    assert_eq!(
        cfg.recovery.dismiss_order,
        vec![
            Dismissal::PrimaryButton,
            Dismissal::SecondaryButton,
            Dismissal::ConfirmKey
        ]
    );
    assert!(!cfg.packaging.include_idml);
}

#[test]
fn partial_sections_fall_back_to_defaults() {
    let cfg = Config::parse(
        r#"
[timeouts]
job_seconds = 30

[recovery]
text_sources = ["window_title"]
"#,
    )
    .expect("parse");
    assert_eq!(cfg.timeouts.job_seconds, 30);
    assert_eq!(cfg.timeouts.package_seconds, 1200);
    assert_eq!(cfg.recovery.text_sources, vec![TextSource::WindowTitle]);
    assert_eq!(cfg.recovery.dismiss_order.len(), 3);
    assert_eq!(cfg.packaging.suffix, "_Packaged");
}

#[test]
fn unknown_strategy_is_rejected() {
    let err = Config::parse("[recovery]\ndismiss_order = [\"shout\"]\n");
    assert!(err.is_err());
}

#[test]
fn normalized_form_round_trips() {
    let cfg = Config::default();
    let again = Config::parse(&cfg.normalized_for_hash()).expect("reparse");
    assert_eq!(again.normalized_for_hash(), cfg.normalized_for_hash());
}
