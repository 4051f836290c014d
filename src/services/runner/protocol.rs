//! Result Stream Parser
//!
//! Decodes the external process's line-oriented result protocol (TeamCity
//! service messages, which PHPUnit emits under `--teamcity`) into per-node
//! outcomes and a run summary. The decoding is deliberately isolated behind
//! the [`ResultStream`] trait so an alternate result-reporting protocol can
//! be substituted without touching the catalog tree or the dispatcher.
//!
//! Lines that are not recognized protocol messages are ordinary tool chatter
//! and are ignored without error. Two tallies are kept: "reported" totals
//! taken from the tool's own summary output and "actual" totals counted from
//! individual events; a mismatch between them is informational only.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Utc;
use regex::Regex;
use tracing::trace;

use crate::models::{NodeId, RunResult, RunSummary, SourceLocation, TestStatus};
use crate::services::runner::queue::RunQueue;

/// Receiver side of a line-oriented result protocol
pub trait ResultStream {
    /// Consume one full line from the tool's standard output, in arrival
    /// order. Partial-line buffering is the caller's responsibility.
    fn process_line(&mut self, line: &str);
}

/// Decode the protocol's escape convention.
///
/// `|'`→`'`, `|"`→`"`, `|[`→`[`, `|]`→`]`, `|n`→LF, `|r`→CR (so `|r|n`
/// yields CRLF) and `||`→`|`. Unknown escapes pass through untouched.
pub fn decode_escapes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c != '|' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('[') => out.push('['),
            Some(']') => out.push(']'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('|') => out.push('|'),
            Some(other) => {
                out.push('|');
                out.push(other);
            }
            None => out.push('|'),
        }
    }
    out
}

/// Inverse of [`decode_escapes`], used by the sender side in tests.
pub fn encode_escapes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '\'' => out.push_str("|'"),
            '"' => out.push_str("|\""),
            '[' => out.push_str("|["),
            ']' => out.push_str("|]"),
            '\n' => out.push_str("|n"),
            '\r' => out.push_str("|r"),
            '|' => out.push_str("||"),
            other => out.push(other),
        }
    }
    out
}

/// Interpret the final non-empty line of a failure detail blob as
/// `<file>:<line>`. A missing colon or unparsable line number yields no
/// location, which is not an error.
pub fn parse_failure_location(detail: &str) -> Option<SourceLocation> {
    let last = detail.lines().rev().find(|l| !l.trim().is_empty())?;
    let (file, line) = last.trim().rsplit_once(':')?;
    let line = line.trim().parse::<u32>().ok()?;
    if file.is_empty() {
        return None;
    }
    Some(SourceLocation {
        file: PathBuf::from(file),
        line,
    })
}

/// Split a reported test name into its base name and optional data-set label
/// (`ClassA::testOne with data set "strings"` or `… with data set #0`).
fn split_data_set(name: &str) -> (&str, Option<String>) {
    match name.split_once(" with data set ") {
        Some((base, label)) => {
            let label = label.trim().trim_matches('"').to_string();
            (base, Some(label))
        }
        None => (name, None),
    }
}

/// TeamCity service-message receiver for one run
pub struct TeamCityParser {
    queue: RunQueue,
    summary: RunSummary,
    /// Results between their start and finish events, keyed by node
    open: HashMap<NodeId, RunResult>,
    saw_summary_line: bool,
    ok_line: Regex,
    counts_line: Regex,
}

impl TeamCityParser {
    pub fn new(queue: RunQueue) -> Self {
        Self {
            queue,
            summary: RunSummary::new(),
            open: HashMap::new(),
            saw_summary_line: false,
            ok_line: Regex::new(r"^OK \((\d+) tests?, (\d+) assertions?\)").expect("static regex"),
            counts_line: Regex::new(r"([A-Za-z]+): (\d+)").expect("static regex"),
        }
    }

    /// Whether the tool's own plain-text summary line arrived. Individual
    /// result events do not count; a process that dies mid-run emits those
    /// but never its summary.
    pub fn saw_summary_line(&self) -> bool {
        self.saw_summary_line
    }

    /// Seal the run: flush unfinished results, stamp the finish time, and
    /// note when the tool never produced its own summary line.
    pub fn finish(mut self) -> RunSummary {
        let mut open: Vec<RunResult> = self.open.into_values().collect();
        open.sort_by(|a, b| a.node_id.cmp(&b.node_id));
        for result in open {
            self.summary.push_result(result);
        }

        self.summary.finished_at = Some(Utc::now());
        if !self.saw_summary_line {
            self.summary.message = Some("no test summary available".to_string());
        }
        self.summary
    }

    fn handle_event(&mut self, event: &str, attrs: &HashMap<String, String>) {
        let name_attr = attrs.get("name").map(String::as_str).unwrap_or("");
        let (base_name, data_set) = split_data_set(name_attr);

        match event {
            "testCount" => {
                if let Some(count) = attrs.get("count").and_then(|c| c.parse().ok()) {
                    self.summary.reported.tests = count;
                }
            }
            "testSuiteStarted" | "testSuiteFinished" => {}
            "testStarted" => {
                let Some(entry) = self.queue.lookup(base_name) else {
                    trace!(name = %name_attr, "testStarted for a name outside the run queue");
                    return;
                };
                let mut result = RunResult::started(entry.node_id.clone());
                result.data_set = data_set;
                self.summary.actual.tests += 1;
                self.open.insert(entry.node_id.clone(), result);
            }
            "testFinished" => {
                let Some(entry) = self.queue.lookup(base_name) else {
                    return;
                };
                let node_id = entry.node_id.clone();
                let mut result = self
                    .open
                    .remove(&node_id)
                    .unwrap_or_else(|| RunResult::started(node_id));
                if result.status == TestStatus::Started {
                    result.status = TestStatus::Passed;
                }
                result.duration_ms = attrs
                    .get("duration")
                    .and_then(|d| d.parse().ok())
                    .unwrap_or(0);
                self.summary.push_result(result);
            }
            "testFailed" => {
                let Some(entry) = self.queue.lookup(base_name) else {
                    return;
                };
                let node_id = entry.node_id.clone();
                let result = self
                    .open
                    .entry(node_id.clone())
                    .or_insert_with(|| RunResult::started(node_id));

                let is_error = attrs.get("error").map(String::as_str) == Some("true");
                result.status = if is_error {
                    self.summary.actual.errors += 1;
                    TestStatus::Error
                } else {
                    self.summary.actual.failures += 1;
                    TestStatus::Failed
                };
                result.message = attrs.get("message").map(|m| m.trim_end().to_string());
                result.detail = attrs.get("details").map(|d| d.trim_end().to_string());
                result.location = result
                    .detail
                    .as_deref()
                    .and_then(parse_failure_location);
                if attrs.get("type").map(String::as_str) == Some("comparisonFailure") {
                    result.expected = attrs.get("expected").map(|e| e.trim_end().to_string());
                    result.actual = attrs.get("actual").map(|a| a.trim_end().to_string());
                }
                if result.data_set.is_none() {
                    result.data_set = data_set;
                }
            }
            "testIgnored" => {
                let Some(entry) = self.queue.lookup(base_name) else {
                    return;
                };
                let node_id = entry.node_id.clone();
                let result = self
                    .open
                    .entry(node_id.clone())
                    .or_insert_with(|| RunResult::started(node_id));

                let message = attrs.get("message").map(|m| m.trim_end().to_string());
                result.status = match message.as_deref() {
                    Some(m) if m.starts_with("Skipped") => TestStatus::Skipped,
                    Some(m) if m.starts_with("Incomplete") => TestStatus::Incomplete,
                    Some(m) if m.to_ascii_lowercase().contains("risky") => TestStatus::Risky,
                    _ => TestStatus::Ignored,
                };
                result.message = message;
                self.summary.actual.skipped += 1;
            }
            other => {
                trace!(event = %other, "unrecognized result-protocol event");
            }
        }
    }

    /// Parse the tool's own plain-text summary output into reported totals.
    fn try_summary_line(&mut self, line: &str) -> bool {
        if let Some(caps) = self.ok_line.captures(line) {
            self.summary.reported.tests = caps[1].parse().unwrap_or(0);
            self.summary.reported.assertions = caps[2].parse().unwrap_or(0);
            return true;
        }

        if line.starts_with("Tests:") {
            for caps in self.counts_line.captures_iter(line) {
                let value: u32 = caps[2].parse().unwrap_or(0);
                match &caps[1] {
                    "Tests" => self.summary.reported.tests = value,
                    "Assertions" => self.summary.reported.assertions = value,
                    "Failures" => self.summary.reported.failures = value,
                    "Errors" => self.summary.reported.errors = value,
                    "Skipped" | "Incomplete" => self.summary.reported.skipped += value,
                    _ => {}
                }
            }
            return true;
        }

        false
    }
}

impl ResultStream for TeamCityParser {
    fn process_line(&mut self, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }

        let inner = if let Some(idx) = trimmed.find("##teamcity[") {
            let rest = &trimmed[idx + "##teamcity[".len()..];
            rest.strip_suffix(']').unwrap_or(rest)
        } else if trimmed.starts_with("test") {
            // Tolerate unwrapped messages.
            trimmed
        } else {
            if self.try_summary_line(trimmed) {
                self.saw_summary_line = true;
            }
            return;
        };

        let Some((event, attrs)) = parse_message(inner) else {
            // Malformed protocol lines are silently skipped.
            trace!(line = %trimmed, "skipping malformed result-protocol line");
            return;
        };
        self.handle_event(&event, &attrs);
    }
}

/// Parse `eventName key='value' …` with escaped values. Returns None for
/// anything that does not fully parse.
fn parse_message(inner: &str) -> Option<(String, HashMap<String, String>)> {
    let name_end = inner
        .find(char::is_whitespace)
        .unwrap_or(inner.len());
    let name = &inner[..name_end];
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    let mut attrs = HashMap::new();
    let mut rest = inner[name_end..].trim_start();
    while !rest.is_empty() {
        let eq = rest.find('=')?;
        let key = rest[..eq].trim();
        if key.is_empty() || key.contains(char::is_whitespace) {
            return None;
        }
        let after = &rest[eq + 1..];
        if !after.starts_with('\'') {
            return None;
        }

        // Find the closing quote, honoring '|' escapes.
        let mut end = None;
        let mut iter = after.char_indices().skip(1);
        while let Some((i, c)) = iter.next() {
            match c {
                '|' => {
                    iter.next();
                }
                '\'' => {
                    end = Some(i);
                    break;
                }
                _ => {}
            }
        }
        let end = end?;
        attrs.insert(key.to_string(), decode_escapes(&after[1..end]));
        rest = after[end + 1..].trim_start();
    }

    Some((name.to_string(), attrs))
}
