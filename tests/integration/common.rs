//! Shared fixtures: canned parser implementations and a workspace builder.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use phpunit_atlas::{
    AppResult, AutoloadParser, CatalogService, Definition, NamespaceMapping, RunnerSettings,
    SourceParser, SourceRange, SuiteConfigParser, SuiteDefinition,
};

/// Source parser returning canned definitions per file
#[derive(Default)]
pub struct CannedSourceParser {
    files: Mutex<HashMap<PathBuf, Vec<Definition>>>,
}

impl CannedSourceParser {
    pub fn set(&self, file: &Path, definitions: Vec<Definition>) {
        self.files
            .lock()
            .unwrap()
            .insert(file.to_path_buf(), definitions);
    }
}

#[async_trait]
impl SourceParser for CannedSourceParser {
    async fn parse_file(&self, file: &Path) -> AppResult<Vec<Definition>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .get(file)
            .cloned()
            .unwrap_or_default())
    }
}

/// Autoload parser returning a fixed mapping list
#[derive(Default)]
pub struct CannedAutoloadParser {
    pub mappings: Mutex<Vec<NamespaceMapping>>,
}

#[async_trait]
impl AutoloadParser for CannedAutoloadParser {
    async fn parse_mappings(&self, _config: &Path) -> AppResult<Vec<NamespaceMapping>> {
        Ok(self.mappings.lock().unwrap().clone())
    }
}

/// Suite-config parser returning a fixed suite list
#[derive(Default)]
pub struct CannedSuiteParser {
    pub suites: Mutex<Vec<SuiteDefinition>>,
}

#[async_trait]
impl SuiteConfigParser for CannedSuiteParser {
    async fn parse_suites(&self, _config: &Path) -> AppResult<Vec<SuiteDefinition>> {
        Ok(self.suites.lock().unwrap().clone())
    }
}

/// One temp workspace wired to a catalog service with canned parsers
pub struct Workspace {
    pub _temp: TempDir,
    pub root: PathBuf,
    pub source: Arc<CannedSourceParser>,
    pub autoload: Arc<CannedAutoloadParser>,
    pub suite: Arc<CannedSuiteParser>,
    pub service: CatalogService,
}

impl Workspace {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        std::fs::create_dir_all(root.join("tests")).unwrap();

        let source = Arc::new(CannedSourceParser::default());
        let autoload = Arc::new(CannedAutoloadParser::default());
        let suite = Arc::new(CannedSuiteParser::default());
        let settings = RunnerSettings {
            workspace_roots: vec![root.clone()],
            ..RunnerSettings::default()
        };
        let service = CatalogService::new(
            settings,
            source.clone(),
            autoload.clone(),
            suite.clone(),
        );
        Self {
            _temp: temp,
            root,
            source,
            autoload,
            suite,
            service,
        }
    }

    /// Create a test file on disk and register its canned definitions
    pub fn add_test_file(&self, rel: &str, class: &str, methods: &[&str]) -> PathBuf {
        let file = self.root.join(rel);
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&file, "<?php\n").unwrap();

        let mut definitions = vec![Definition::class(class, &file, SourceRange::lines(0, 50))
            .with_namespace("App\\Tests")];
        for (i, name) in methods.iter().enumerate() {
            let line = (i as u32 + 1) * 10;
            definitions.push(Definition::method(
                *name,
                &file,
                SourceRange::lines(line, line + 5),
            ));
        }
        self.source.set(&file, definitions);
        file
    }

    /// Swap the external test tool for an executable shell script that
    /// ignores its arguments and prints canned output
    pub fn use_fake_tool(&mut self, script: &str) {
        use std::os::unix::fs::PermissionsExt;

        let path = self.root.join("fake-tool.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", script)).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();

        let mut settings = self.service.settings().clone();
        settings.php_command = path.display().to_string();
        self.service.update_settings(settings);
    }
}
