//! Run-on-save behavior: the file watcher feeding the catalog service, and
//! subscription matching through the public API.

use std::fs;
use std::time::Duration;

use phpunit_atlas::services::sync::WatcherConfig;
use phpunit_atlas::{
    NodeId, RegexMapPair, RunOutcome, RunRequest, WatchPattern, WatchedFileKind, WorkspaceWatcher,
};

use super::common::Workspace;

#[tokio::test]
async fn test_watcher_feeds_service_and_retriggers_subscription() {
    let mut ws = Workspace::new();
    let file = ws.add_test_file("tests/FooTest.php", "FooTest", &["testA"]);
    ws.service.scan_workspace().await.unwrap();
    ws.use_fake_tool(
        "echo \"##teamcity[testStarted name='FooTest::testA']\"; \
         echo \"##teamcity[testFinished name='FooTest::testA' duration='1']\"; \
         echo 'OK (1 test, 1 assertion)'",
    );

    ws.service.watch(
        WatchPattern::TestFile(file.clone()),
        RunRequest::node(NodeId::class(&file)),
    );

    let (mut watcher, mut rx) = WorkspaceWatcher::with_config(WatcherConfig { debounce_ms: 20 });
    watcher.watch_root(&ws.root).unwrap();

    // Touch the watched test file.
    fs::write(&file, "<?php // edited\n").unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    let event = loop {
        let event = tokio::time::timeout_at(deadline, rx.recv())
            .await
            .expect("timed out waiting for change event")
            .expect("watcher channel closed");
        // The fake tool script lives in the root too; skip anything else.
        if event.path == file {
            break event;
        }
    };
    assert_eq!(event.file_kind, WatchedFileKind::TestSource);

    let outcomes = ws.service.handle_change(&event).await.unwrap();
    assert_eq!(outcomes.len(), 1);
    let RunOutcome::Completed(summary) = &outcomes[0] else {
        panic!("expected a completed run");
    };
    assert_eq!(summary.results_for(&NodeId::method(&file, "testA")).len(), 1);
}

#[tokio::test]
async fn test_saving_covered_source_retriggers_by_inference() {
    let mut ws = Workspace::new();
    let test_file = ws.add_test_file("tests/MailerTest.php", "MailerTest", &["testSend"]);
    ws.service.scan_workspace().await.unwrap();
    ws.use_fake_tool("echo 'OK (1 test, 1 assertion)'");

    ws.service.watch(
        WatchPattern::TestFile(test_file.clone()),
        RunRequest::node(NodeId::class(&test_file)),
    );

    // Saving src/Mailer.php maps to MailerTest.php by stem inference.
    fs::create_dir_all(ws.root.join("src")).unwrap();
    let source = ws.root.join("src/Mailer.php");
    fs::write(&source, "<?php\n").unwrap();

    let event = phpunit_atlas::FileChangeEvent::new(
        source,
        phpunit_atlas::ChangeKind::Modified,
        WatchedFileKind::TestSource,
        ws.root.clone(),
    );
    let outcomes = ws.service.handle_change(&event).await.unwrap();
    assert_eq!(outcomes.len(), 1);
}

#[tokio::test]
async fn test_regex_pair_maps_source_to_test() {
    let mut ws = Workspace::new();
    let test_file = ws.add_test_file("tests/Service/QueueTest.php", "QueueTest", &["testPush"]);
    ws.service.scan_workspace().await.unwrap();

    let mut settings = ws.service.settings().clone();
    settings.map_pairs = vec![RegexMapPair {
        source_pattern: "^(.*)/app/(.+)\\.php$".to_string(),
        test_pattern: "${1}/tests/${2}Test.php".to_string(),
    }];
    ws.service.update_settings(settings);
    ws.use_fake_tool("echo 'OK (1 test, 1 assertion)'");

    ws.service.watch(
        WatchPattern::TestFile(test_file.clone()),
        RunRequest::node(NodeId::class(&test_file)),
    );

    fs::create_dir_all(ws.root.join("app/Service")).unwrap();
    let source = ws.root.join("app/Service/Queue.php");
    fs::write(&source, "<?php\n").unwrap();

    let event = phpunit_atlas::FileChangeEvent::new(
        source,
        phpunit_atlas::ChangeKind::Modified,
        WatchedFileKind::TestSource,
        ws.root.clone(),
    );
    let outcomes = ws.service.handle_change(&event).await.unwrap();
    assert_eq!(outcomes.len(), 1);

    // An unmapped sibling re-triggers nothing.
    let other = ws.root.join("app/Service/Other.php");
    fs::write(&other, "<?php\n").unwrap();
    let event = phpunit_atlas::FileChangeEvent::new(
        other,
        phpunit_atlas::ChangeKind::Modified,
        WatchedFileKind::TestSource,
        ws.root.clone(),
    );
    assert!(ws.service.handle_change(&event).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cancelled_subscription_stops_retriggering() {
    let mut ws = Workspace::new();
    let file = ws.add_test_file("tests/FooTest.php", "FooTest", &["testA"]);
    ws.service.scan_workspace().await.unwrap();
    ws.use_fake_tool("echo 'OK (1 test, 1 assertion)'");

    let token = ws.service.watch(
        WatchPattern::TestFile(file.clone()),
        RunRequest::node(NodeId::class(&file)),
    );
    token.cancel();

    let event = phpunit_atlas::FileChangeEvent::new(
        file.clone(),
        phpunit_atlas::ChangeKind::Modified,
        WatchedFileKind::TestSource,
        ws.root.clone(),
    );
    assert!(ws.service.handle_change(&event).await.unwrap().is_empty());
}
