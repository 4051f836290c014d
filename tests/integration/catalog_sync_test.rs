//! Catalog synchronization over a real directory tree: initial scan,
//! incremental edits, deletions, and configuration reloads.

use std::fs;

use phpunit_atlas::{
    ChangeKind, FileChangeEvent, NamespaceMapping, NodeId, SuiteDefinition, WatchedFileKind,
};

use super::common::Workspace;

fn source_change(ws: &Workspace, path: &std::path::Path, kind: ChangeKind) -> FileChangeEvent {
    FileChangeEvent::new(
        path.to_path_buf(),
        kind,
        WatchedFileKind::TestSource,
        ws.root.clone(),
    )
}

#[tokio::test]
async fn test_initial_scan_builds_forest() {
    let mut ws = Workspace::new();
    let foo = ws.add_test_file("tests/FooTest.php", "FooTest", &["testA", "testB"]);
    let bar = ws.add_test_file("tests/BarTest.php", "BarTest", &["testC"]);

    ws.service.scan_workspace().await.unwrap();

    let tree = ws.service.tree();
    assert!(tree.contains(&NodeId::class(&foo)));
    assert!(tree.contains(&NodeId::class(&bar)));
    assert_eq!(tree.all_method_leaves().len(), 3);
}

#[tokio::test]
async fn test_incremental_edit_keeps_sibling_files_intact() {
    let mut ws = Workspace::new();
    let foo = ws.add_test_file("tests/FooTest.php", "FooTest", &["testA", "testB"]);
    let bar = ws.add_test_file("tests/BarTest.php", "BarTest", &["testC"]);
    ws.service.scan_workspace().await.unwrap();

    // FooTest drops testB and gains testD.
    ws.add_test_file("tests/FooTest.php", "FooTest", &["testA", "testD"]);
    ws.service
        .handle_change(&source_change(&ws, &foo, ChangeKind::Modified))
        .await
        .unwrap();

    let tree = ws.service.tree();
    assert!(!tree.contains(&NodeId::method(&foo, "testB")));
    assert!(tree.contains(&NodeId::method(&foo, "testD")));
    assert!(tree.contains(&NodeId::method(&bar, "testC")));
}

#[tokio::test]
async fn test_deleting_last_file_prunes_empty_ancestors() {
    let mut ws = Workspace::new();
    let foo = ws.add_test_file("tests/FooTest.php", "FooTest", &["testA"]);
    ws.service.scan_workspace().await.unwrap();

    fs::remove_file(&foo).unwrap();
    ws.service
        .handle_change(&source_change(&ws, &foo, ChangeKind::Deleted))
        .await
        .unwrap();

    let tree = ws.service.tree();
    assert!(!tree.contains(&NodeId::class(&foo)));
    assert!(!tree.contains(&NodeId::method(&foo, "testA")));
}

#[tokio::test]
async fn test_autoload_mappings_shape_the_hierarchy() {
    let mut ws = Workspace::new();
    fs::create_dir_all(ws.root.join("tests/Unit")).unwrap();
    let file = ws.add_test_file("tests/Unit/FooTest.php", "FooTest", &["testA"]);
    // Override the default namespace to include the Unit segment.
    let composer = ws.root.join("composer.json");
    fs::write(&composer, "{}").unwrap();

    *ws.autoload.mappings.lock().unwrap() = vec![NamespaceMapping::new(
        "App\\Tests\\",
        ws.root.join("tests"),
        &ws.root,
    )];
    ws.service
        .handle_change(&FileChangeEvent::new(
            composer,
            ChangeKind::Modified,
            WatchedFileKind::AutoloadConfig,
            ws.root.clone(),
        ))
        .await
        .unwrap();

    let tree = ws.service.tree();
    let class_id = NodeId::class(&file);
    assert!(tree.contains(&class_id));
    // Default namespace is App\Tests, so the class sits under the prefix root.
    assert_eq!(
        tree.parent_of(&class_id),
        Some(&NodeId::namespace(&ws.root.join("tests"))),
    );
}

#[tokio::test]
async fn test_suite_configuration_takes_over_placement() {
    let mut ws = Workspace::new();
    fs::create_dir_all(ws.root.join("tests/Unit")).unwrap();
    let inside = ws.add_test_file("tests/Unit/FooTest.php", "FooTest", &["testA"]);
    let outside = ws.add_test_file("tests/StrayTest.php", "StrayTest", &["testB"]);
    let config = ws.root.join("phpunit.xml");
    fs::write(&config, "<phpunit/>").unwrap();
    ws.service.scan_workspace().await.unwrap();
    assert!(ws.service.tree().contains(&NodeId::class(&outside)));

    *ws.suite.suites.lock().unwrap() = vec![SuiteDefinition::new(
        "unit",
        &config,
        vec!["tests/Unit/*Test.php".to_string()],
    )];
    ws.service
        .handle_change(&FileChangeEvent::new(
            config.clone(),
            ChangeKind::Modified,
            WatchedFileKind::RunnerConfig,
            ws.root.clone(),
        ))
        .await
        .unwrap();

    let tree = ws.service.tree();
    assert_eq!(
        tree.parent_of(&NodeId::class(&inside)),
        Some(&NodeId::suite(&config, "unit")),
    );
    // Files matched by no suite are excluded from the catalog.
    assert!(!tree.contains(&NodeId::class(&outside)));
}

#[tokio::test]
async fn test_tree_events_mirror_scan() {
    let mut ws = Workspace::new();
    ws.add_test_file("tests/FooTest.php", "FooTest", &["testA"]);

    let mut rx = ws.service.tree_mut().subscribe();
    ws.service.scan_workspace().await.unwrap();

    let mut added = 0;
    while let Ok(event) = rx.try_recv() {
        if matches!(event, phpunit_atlas::TreeEvent::Added { .. }) {
            added += 1;
        }
    }
    // Root, class, method at minimum.
    assert!(added >= 3, "expected at least 3 added events, got {added}");
}
