//! End-to-end verification runs
//!
//! Drives a harness with the simulated source: a complete source satisfies
//! every reporter; a source that never emits a gauge fails with exactly the
//! patterns for that gauge outstanding.

use metricwatch::config::Config;
use metricwatch::error::AppError;
use metricwatch::harness::Harness;
use metricwatch::metrics::Outcome;
use metricwatch::source::SimulatedSource;
use metricwatch::tracker::CompletionState;
use std::str::FromStr;
use std::time::Duration;

const CONFIG: &str = r#"
[metrics]
system_resource_metrics = true
reporters = ["primary", "secondary"]

[metrics.reporter.primary]
factory = "pattern"

[metrics.reporter.secondary]
factory = "pattern"
label = "secondary-resources"

[expectations]
hosts = ["taskmanager.", "jobmanager."]
gauges = [
    "System.CPU.Idle",
    "System.CPU.User",
    "System.Memory.Total",
    "System.Swap.Used",
    "System.Network.*ReceiveRate",
]
timeout_seconds = 1
"#;

fn harness() -> Harness {
    Harness::setup(Config::from_str(CONFIG).expect("valid config")).expect("harness setup")
}

fn source(harness: &Harness) -> SimulatedSource {
    SimulatedSource::from_expectations(&harness.config().expectations)
        .producers(3)
        .max_jitter(Duration::from_millis(5))
        .seed(42)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_complete_source_satisfies_every_reporter() {
    let harness = harness();
    assert_eq!(harness.installed().len(), 2);

    let producers = source(&harness).spawn(harness.registry().clone());
    harness
        .await_all_reporters()
        .await
        .expect("every expected gauge is emitted");

    for producer in producers {
        producer.await.unwrap();
    }

    for (label, report) in harness.reports() {
        assert_eq!(report.state, CompletionState::Resolved, "{}", label);
        assert_eq!(report.settled, 10, "{}", label);
        assert!(report.patterns.iter().all(|p| p.settled_by.is_some()));
    }

    let metrics = harness.metrics();
    assert_eq!(metrics.settlements_count(), 20);
    assert!(metrics.notifications_count(Outcome::Unmatched) > 0);
    assert_eq!(metrics.timeouts_count(), 0);
    assert_eq!(metrics.active_reporters(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_omitted_gauge_times_out_with_outstanding_patterns() {
    let harness = harness();

    let producers = source(&harness)
        .omit(["System.Swap.Used"])
        .spawn(harness.registry().clone());

    let err = harness
        .await_all_reporters()
        .await
        .expect_err("an omitted gauge can never settle");
    for producer in producers {
        producer.await.unwrap();
    }

    match &err {
        AppError::TimeoutExceeded { timeout, unsettled } => {
            assert_eq!(*timeout, Duration::from_secs(1));
            assert_eq!(
                unsettled,
                &vec![
                    "taskmanager.System.Swap.Used".to_string(),
                    "jobmanager.System.Swap.Used".to_string(),
                ]
            );
        }
        other => panic!("expected TimeoutExceeded, got {:?}", other),
    }

    for (_, report) in harness.reports() {
        assert_eq!(report.state, CompletionState::TimedOut);
        assert_eq!(report.settled, 8);
    }
    assert_eq!(harness.metrics().timeouts_count(), 2);
}

#[tokio::test]
async fn test_teardown_allows_a_fresh_run() {
    let first = harness();
    let registry = first.registry().clone();
    let first_ids = registry.ids();
    first.teardown();
    assert!(registry.is_empty());

    let second = harness();
    let second_ids = second.registry().ids();
    assert_eq!(second_ids.len(), 2);
    assert!(second_ids.iter().all(|id| !first_ids.contains(id)));
    assert!(
        second
            .installed()
            .iter()
            .all(|r| r.tracker().settled_count() == 0)
    );
}

#[tokio::test]
async fn test_single_reporter_wait_rejects_multiple_reporters() {
    let harness = harness();
    assert!(matches!(
        harness.await_single().await,
        Err(AppError::UnexpectedReporterCount {
            expected: 1,
            actual: 2
        })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_host_without_trailing_delimiter_still_settles() {
    let toml = CONFIG.replace(
        r#"hosts = ["taskmanager.", "jobmanager."]"#,
        r#"hosts = ["taskmanager", "jobmanager"]"#,
    );
    let harness = Harness::setup(Config::from_str(&toml).expect("valid config")).unwrap();

    let producers = source(&harness).spawn(harness.registry().clone());
    harness
        .await_all_reporters()
        .await
        .expect("undotted hosts qualify names the same way notifications do");
    for producer in producers {
        producer.await.unwrap();
    }

    let (_, report) = &harness.reports()[0];
    assert!(
        report
            .patterns
            .iter()
            .any(|p| p.pattern == "taskmanager.System.CPU.Idle")
    );
}
