mod common;

use common::{sample_devices, tags, FakeApi};
use tailnet_admin::executor::{execute, Outcome};
use tailnet_admin::planner::{plan, TagOperation};

fn remove_dev() -> TagOperation {
    TagOperation::Remove {
        tag: "dev".into(),
        devices: vec![],
    }
}

#[tokio::test]
async fn test_dry_run_never_writes() {
    let api = FakeApi::new(sample_devices());
    let plan = plan(&remove_dev(), &sample_devices());

    let report = execute(&plan, false, &api).await;

    assert!(api.writes().is_empty());
    assert!(!report.applied_mode);
    assert_eq!(report.outcomes[0].outcome, Outcome::Unchanged);
    assert_eq!(report.outcomes[1].outcome, Outcome::WouldChange);
    assert_eq!(report.outcomes[1].proposed, tags(&[]));
    assert_eq!(report.outcomes[2].outcome, Outcome::WouldChange);
    assert_eq!(report.outcomes[2].proposed, tags(&["prod"]));

    let summary = report.summary();
    assert_eq!(summary.would_change, 2);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.applied, 0);
}

#[tokio::test]
async fn test_apply_writes_each_changed_device_once() {
    let api = FakeApi::new(sample_devices());
    let plan = plan(&remove_dev(), &sample_devices());

    let report = execute(&plan, true, &api).await;

    assert_eq!(api.written_ids(), vec!["B", "C"]);
    assert_eq!(
        api.writes(),
        vec![
            ("B".to_string(), tags(&[])),
            ("C".to_string(), tags(&["prod"])),
        ]
    );
    assert_eq!(report.summary().applied, 2);
    assert_eq!(report.attempted(), 2);
    assert!(!report.has_failures());
}

#[tokio::test]
async fn test_failure_does_not_stop_later_devices() {
    let api = FakeApi::new(sample_devices()).failing_writes_for("B");
    let plan = plan(&remove_dev(), &sample_devices());

    let report = execute(&plan, true, &api).await;

    // C is still written after B fails
    assert_eq!(api.written_ids(), vec!["B", "C"]);
    assert!(matches!(report.outcomes[1].outcome, Outcome::Failed(_)));
    assert_eq!(report.outcomes[2].outcome, Outcome::Applied);

    let summary = report.summary();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.applied, 1);
    assert_eq!(summary.unchanged, 1);

    let failures = report.failures();
    assert_eq!(failures.len(), summary.failed);
    assert_eq!(failures[0].0.id, "B");
    assert!(failures[0].1.contains("403"));
}

#[tokio::test]
async fn test_every_write_failing_is_counted() {
    let api = FakeApi::new(sample_devices())
        .failing_writes_for("B")
        .failing_writes_for("C");
    let plan = plan(&remove_dev(), &sample_devices());

    let report = execute(&plan, true, &api).await;

    assert_eq!(report.summary().failed, 2);
    assert_eq!(report.failures().len(), 2);
    assert_eq!(report.attempted(), 2);
}

#[tokio::test]
async fn test_unchanged_entries_are_never_written() {
    let api = FakeApi::new(sample_devices());
    let op = TagOperation::Set {
        devices: vec!["A".into()],
        tags: tags(&["prod"]),
    };
    let plan = plan(&op, &sample_devices()[..1]);

    let report = execute(&plan, true, &api).await;

    assert!(api.writes().is_empty());
    assert_eq!(report.outcomes[0].outcome, Outcome::Unchanged);
}

#[tokio::test]
async fn test_report_serializes_outcomes() -> anyhow::Result<()> {
    let api = FakeApi::new(sample_devices()).failing_writes_for("C");
    let plan = plan(&remove_dev(), &sample_devices());

    let report = execute(&plan, true, &api).await;
    let json = serde_json::to_value(&report)?;

    assert_eq!(json["outcomes"][0]["status"], "unchanged");
    assert_eq!(json["outcomes"][1]["status"], "applied");
    assert_eq!(json["outcomes"][2]["status"], "failed");
    assert!(json["outcomes"][2]["reason"]
        .as_str()
        .unwrap_or_default()
        .contains("not allowed"));
    Ok(())
}
