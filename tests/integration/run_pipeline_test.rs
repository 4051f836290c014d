//! The run pipeline end to end: selection expansion, dispatch against a
//! stand-in process, result correlation and failure diagnostics.

use phpunit_atlas::{NodeId, RunOutcome, RunRequest, TestStatus};
use tokio_util::sync::CancellationToken;

use super::common::Workspace;

#[tokio::test]
async fn test_full_run_correlates_results() {
    let mut ws = Workspace::new();
    let file = ws.add_test_file("tests/FooTest.php", "FooTest", &["testPass", "testFail"]);
    ws.service.scan_workspace().await.unwrap();

    ws.use_fake_tool(
        "echo \"##teamcity[testCount count='2']\"; \
         echo \"##teamcity[testStarted name='FooTest::testPass']\"; \
         echo \"##teamcity[testFinished name='FooTest::testPass' duration='3']\"; \
         echo \"##teamcity[testStarted name='FooTest::testFail']\"; \
         echo \"##teamcity[testFailed name='FooTest::testFail' message='assertion failed' details='trace']\"; \
         echo \"##teamcity[testFinished name='FooTest::testFail' duration='5']\"; \
         echo 'FAILURES!'; \
         echo 'Tests: 2, Assertions: 2, Failures: 1.'",
    );

    let token = CancellationToken::new();
    let outcome = ws.service.run(RunRequest::all(), &token).await.unwrap();
    let RunOutcome::Completed(summary) = outcome else {
        panic!("expected a completed run");
    };

    let pass = summary.results_for(&NodeId::method(&file, "testPass"));
    assert_eq!(pass.len(), 1);
    assert_eq!(pass[0].status, TestStatus::Passed);
    assert_eq!(pass[0].duration_ms, 3);

    let fail = summary.results_for(&NodeId::method(&file, "testFail"));
    assert_eq!(fail.len(), 1);
    assert_eq!(fail[0].status, TestStatus::Failed);
    assert_eq!(fail[0].message.as_deref(), Some("assertion failed"));

    // Reported and actual tallies are tracked independently.
    assert_eq!(summary.reported.tests, 2);
    assert_eq!(summary.actual.tests, 2);
}

#[tokio::test]
async fn test_subtree_run_passes_filter_and_ignores_chatter() {
    let mut ws = Workspace::new();
    let foo = ws.add_test_file("tests/FooTest.php", "FooTest", &["testA"]);
    ws.add_test_file("tests/BarTest.php", "BarTest", &["testB"]);
    ws.service.scan_workspace().await.unwrap();

    // The stand-in prints deprecation chatter around recognizable lines.
    ws.use_fake_tool(
        "echo 'PHP Deprecated: something in /ws/foo.php on line 3'; \
         echo \"testStarted name='FooTest::testA'\"; \
         echo \"testFinished name='FooTest::testA' duration='1'\"; \
         echo 'OK (1 test, 1 assertion)'",
    );

    let token = CancellationToken::new();
    let outcome = ws
        .service
        .run(RunRequest::node(NodeId::class(&foo)), &token)
        .await
        .unwrap();
    let RunOutcome::Completed(summary) = outcome else {
        panic!("expected a completed run");
    };

    assert_eq!(summary.results_for(&NodeId::method(&foo, "testA")).len(), 1);
    assert_eq!(summary.reported.tests, 1);
    assert!(summary.fatal.is_empty());
    assert!(summary.message.is_none());
}

#[tokio::test]
async fn test_failure_diagnostics_are_projected() {
    let mut ws = Workspace::new();
    let file = ws.add_test_file("tests/FooTest.php", "FooTest", &["testFail"]);
    std::fs::write(&file, "<?php\n    assertTrue(false);\n").unwrap();
    ws.service.scan_workspace().await.unwrap();

    let details = format!("Failed asserting that false is true.|n|n{}:2", file.display());
    ws.use_fake_tool(&format!(
        "echo \"##teamcity[testStarted name='FooTest::testFail']\"; \
         echo \"##teamcity[testFailed name='FooTest::testFail' message='Failed asserting that false is true.' details='{details}']\"; \
         echo \"##teamcity[testFinished name='FooTest::testFail' duration='2']\"; \
         echo 'Tests: 1, Assertions: 1, Failures: 1.'",
    ));

    let token = CancellationToken::new();
    let outcome = ws.service.run(RunRequest::all(), &token).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Completed(_)));

    let annotations = ws.service.diagnostics().annotations();
    let group = annotations.get(&file).expect("annotations for the file");
    assert_eq!(group.len(), 1);
    assert_eq!(group[0].line, 2);
    assert_eq!(group[0].message, "Failed asserting that false is true.");

    // The next run clears them up front.
    ws.use_fake_tool("echo 'OK (0 tests, 0 assertions)'");
    ws.service.run(RunRequest::all(), &token).await.unwrap();
    assert!(ws.service.diagnostics().annotations().is_empty());
}

#[tokio::test]
async fn test_data_provider_results_accumulate_history() {
    let mut ws = Workspace::new();
    let file = ws.add_test_file("tests/FooTest.php", "FooTest", &["testCases"]);
    ws.service.scan_workspace().await.unwrap();

    ws.use_fake_tool(
        "echo \"##teamcity[testStarted name='FooTest::testCases with data set #0']\"; \
         echo \"##teamcity[testFinished name='FooTest::testCases with data set #0' duration='1']\"; \
         echo \"##teamcity[testStarted name='FooTest::testCases with data set #1']\"; \
         echo \"##teamcity[testFailed name='FooTest::testCases with data set #1' message='nope']\"; \
         echo \"##teamcity[testFinished name='FooTest::testCases with data set #1' duration='1']\"; \
         echo 'Tests: 2, Assertions: 2, Failures: 1.'",
    );

    let token = CancellationToken::new();
    let outcome = ws.service.run(RunRequest::all(), &token).await.unwrap();
    let RunOutcome::Completed(summary) = outcome else {
        panic!("expected a completed run");
    };

    let history = summary.results_for(&NodeId::method(&file, "testCases"));
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].data_set.as_deref(), Some("#0"));
    assert_eq!(history[0].status, TestStatus::Passed);
    assert_eq!(history[1].data_set.as_deref(), Some("#1"));
    assert_eq!(history[1].status, TestStatus::Failed);
}

#[tokio::test]
async fn test_crash_without_summary_is_noted() {
    let mut ws = Workspace::new();
    let file = ws.add_test_file("tests/FooTest.php", "FooTest", &["testA"]);
    ws.service.scan_workspace().await.unwrap();

    // The process dies mid-run: a started test, stderr output, no summary.
    ws.use_fake_tool(
        "echo \"##teamcity[testStarted name='FooTest::testA']\"; \
         echo 'PHP Fatal error: out of memory' >&2; \
         exit 255",
    );

    let token = CancellationToken::new();
    let outcome = ws.service.run(RunRequest::all(), &token).await.unwrap();
    let RunOutcome::Completed(summary) = outcome else {
        panic!("expected a completed run");
    };

    // The opened result is flushed in its last known state.
    let history = summary.results_for(&NodeId::method(&file, "testA"));
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, TestStatus::Started);

    assert_eq!(summary.message.as_deref(), Some("no test summary available"));
    assert!(summary.fatal.iter().any(|f| f.contains("out of memory")));
}

#[tokio::test]
async fn test_cancellation_keeps_partial_results() {
    let mut ws = Workspace::new();
    ws.add_test_file("tests/FooTest.php", "FooTest", &["testA"]);
    ws.service.scan_workspace().await.unwrap();
    ws.use_fake_tool("echo 'OK (1 test, 1 assertion)'");

    let token = CancellationToken::new();
    token.cancel();
    let outcome = ws.service.run(RunRequest::all(), &token).await.unwrap();
    let RunOutcome::Completed(summary) = outcome else {
        panic!("expected a completed run");
    };
    assert!(summary.results.is_empty());
    assert_eq!(summary.message.as_deref(), Some("no test summary available"));
}
