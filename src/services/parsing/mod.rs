//! Parse Collaborators
//!
//! Trait seams for the external parsers this engine consumes: the PHP
//! source symbol parser, the composer autoload parser, and the test-runner
//! (phpunit.xml) suite-config parser. The engine treats a parse failure on
//! one file as zero definitions for that file; it never aborts the
//! reconciliation of other files.

use std::path::Path;

use async_trait::async_trait;

use crate::models::{Definition, NamespaceMapping, SuiteDefinition};
use crate::utils::error::AppResult;

/// Yields the parsed symbol definitions of one source file, in file order
#[async_trait]
pub trait SourceParser: Send + Sync {
    async fn parse_file(&self, file: &Path) -> AppResult<Vec<Definition>>;
}

/// Yields the namespace prefix/directory mappings of one autoload config
#[async_trait]
pub trait AutoloadParser: Send + Sync {
    async fn parse_mappings(&self, config: &Path) -> AppResult<Vec<NamespaceMapping>>;
}

/// Yields the suite declarations of one test-runner config
#[async_trait]
pub trait SuiteConfigParser: Send + Sync {
    async fn parse_suites(&self, config: &Path) -> AppResult<Vec<SuiteDefinition>>;
}
