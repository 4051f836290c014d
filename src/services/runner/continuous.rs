//! Continuous Run Matcher
//!
//! Decides whether a changed file should re-trigger an active run-on-save
//! subscription. Matching is best effort and never raises: ambiguous or
//! unresolvable source↔test mappings simply yield no match.

use std::path::{Path, PathBuf};

use glob::Pattern;
use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::models::{RegexMapPair, RunRequest};
use crate::utils::paths::{file_stem, is_ancestor, normalized};

/// What a run-on-save subscription watches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchPattern {
    /// Wildcard or directory scope: any change within scope re-triggers
    Scope(String),
    /// An exact test file, matched directly or via source↔test inference
    TestFile(PathBuf),
}

/// One active run-on-save subscription
#[derive(Debug)]
struct Subscription {
    pattern: WatchPattern,
    request: RunRequest,
    token: CancellationToken,
}

/// A run re-triggered by a file change, carrying the subscription's own
/// cancellation token
#[derive(Debug, Clone)]
pub struct Retrigger {
    pub request: RunRequest,
    pub token: CancellationToken,
}

/// Matches changed files against run-on-save subscriptions
#[derive(Debug, Default)]
pub struct ContinuousRunMatcher {
    subscriptions: Vec<Subscription>,
    pairs: Vec<(Regex, String)>,
}

impl ContinuousRunMatcher {
    pub fn new(pairs: &[RegexMapPair]) -> Self {
        let pairs = pairs
            .iter()
            .filter_map(|pair| match Regex::new(&pair.source_pattern) {
                Ok(regex) => Some((regex, pair.test_pattern.clone())),
                Err(e) => {
                    warn!(pattern = %pair.source_pattern, error = %e,
                        "invalid source/test mapping pattern, dropping");
                    None
                }
            })
            .collect();
        Self {
            subscriptions: Vec::new(),
            pairs,
        }
    }

    /// Register a run-on-save request. The returned token cancels the
    /// subscription when fired; the subscription lapses on the next event.
    pub fn subscribe(&mut self, pattern: WatchPattern, request: RunRequest) -> CancellationToken {
        let token = CancellationToken::new();
        self.subscriptions.push(Subscription {
            pattern,
            request,
            token: token.clone(),
        });
        token
    }

    /// Count of live subscriptions
    pub fn active(&self) -> usize {
        self.subscriptions
            .iter()
            .filter(|s| !s.token.is_cancelled())
            .count()
    }

    /// Evaluate a changed file against every live subscription.
    ///
    /// Scope patterns re-trigger only their own subscription. An exact
    /// test-file match (equality, stem inference, or a configured regex
    /// pair) re-triggers ALL active subscriptions.
    pub fn on_file_changed(&mut self, path: &Path) -> Vec<Retrigger> {
        self.subscriptions.retain(|s| !s.token.is_cancelled());

        let mut scope_hits: Vec<usize> = Vec::new();
        let mut exact_hit = false;

        for (index, sub) in self.subscriptions.iter().enumerate() {
            match &sub.pattern {
                WatchPattern::Scope(scope) => {
                    if scope_matches(scope, path) {
                        scope_hits.push(index);
                    }
                }
                WatchPattern::TestFile(target) => {
                    if path == target
                        || infers_to_test(path, target)
                        || self.maps_via_pair(path, target)
                    {
                        exact_hit = true;
                    }
                }
            }
        }

        if exact_hit {
            return self
                .subscriptions
                .iter()
                .map(|s| Retrigger {
                    request: s.request.clone(),
                    token: s.token.clone(),
                })
                .collect();
        }

        scope_hits
            .into_iter()
            .map(|i| {
                let s = &self.subscriptions[i];
                Retrigger {
                    request: s.request.clone(),
                    token: s.token.clone(),
                }
            })
            .collect()
    }

    /// Apply each configured regex pair to the changed path and compare the
    /// produced test path against the target.
    fn maps_via_pair(&self, path: &Path, target: &Path) -> bool {
        let raw = normalized(path);
        self.pairs.iter().any(|(regex, template)| {
            if !regex.is_match(&raw) {
                return false;
            }
            let mapped = regex.replace(&raw, template.as_str());
            Path::new(mapped.as_ref()) == target
        })
    }
}

/// A wildcard pattern matches by glob; a plain path acts as a directory
/// scope containing the changed file.
fn scope_matches(scope: &str, path: &Path) -> bool {
    let raw = normalized(path);
    if scope.contains('*') || scope.contains('?') || scope.contains('[') {
        Pattern::new(scope)
            .map(|p| p.matches(&raw))
            .unwrap_or(false)
    } else {
        is_ancestor(Path::new(scope), path)
    }
}

/// Best-effort source→test inference: `Foo.php` maps to the subscription's
/// file when that file's stem is `FooTest`.
fn infers_to_test(changed: &Path, target: &Path) -> bool {
    let (Some(changed_stem), Some(target_stem)) = (file_stem(changed), file_stem(target)) else {
        return false;
    };
    format!("{}Test", changed_stem) == target_stem
}
