// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Report: the append-only structured result of a job (logs, data, children).

use crate::progress::Progress;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Category a log message is filed under. Ordered so `BTreeMap<LogCategory, _>`
/// serializes in a stable, human-scannable order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogCategory {
    Error,
    Warning,
    Info,
    Event,
    Network,
    FileSystem,
    Startup,
    Shutdown,
    User,
    Authentication,
    Security,
}

crate::simple_display! {
    LogCategory {
        Error => "ERROR",
        Warning => "WARNING",
        Info => "INFO",
        Event => "EVENT",
        Network => "NETWORK",
        FileSystem => "FILE_SYSTEM",
        Startup => "STARTUP",
        Shutdown => "SHUTDOWN",
        User => "USER",
        Authentication => "AUTHENTICATION",
        Security => "SECURITY",
    }
}

/// A single timestamped log line within a [`Report`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    pub datetime: DateTime<Utc>,
    pub origin: String,
    pub body: String,
}

impl LogMessage {
    pub fn new(now: DateTime<Utc>, origin: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            datetime: now,
            origin: origin.into(),
            body: body.into(),
        }
    }
}

/// Identifier of a child report within a parent's `children` map.
/// Format: `[0-9a-zA-Z_-]+@[0-9a-zA-Z_-]+` (name@host).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReportIdentifier(String);

/// A [`ReportIdentifier`] failed the `name@host` shape check.
#[derive(Debug, Clone)]
pub struct InvalidReportIdentifier(pub String);

impl fmt::Display for InvalidReportIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid report identifier (expected name@host): {:?}", self.0)
    }
}

impl std::error::Error for InvalidReportIdentifier {}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

impl ReportIdentifier {
    pub fn new(name: &str, host: &str) -> Result<Self, InvalidReportIdentifier> {
        Self::parse(&format!("{name}@{host}"))
    }

    pub fn parse(s: &str) -> Result<Self, InvalidReportIdentifier> {
        let Some((name, host)) = s.split_once('@') else {
            return Err(InvalidReportIdentifier(s.to_string()));
        };
        let valid = !name.is_empty()
            && !host.is_empty()
            && name.chars().all(is_identifier_char)
            && host.chars().all(is_identifier_char);
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidReportIdentifier(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ReportIdentifier {
    type Error = InvalidReportIdentifier;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ReportIdentifier> for String {
    fn from(value: ReportIdentifier) -> Self {
        value.0
    }
}

impl fmt::Display for ReportIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The append-only structured result of a job: logs filed by category,
/// optional free-form output data, and a nested map of child reports.
///
/// A `Report` has exactly one writer — the worker process executing the
/// job — at any given time; readers (Registry consumers) only ever see
/// copies flushed by that writer (see design note on Report ownership).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub host: String,
    pub token: String,
    #[serde(default)]
    pub args: serde_json::Value,
    pub progress: Progress,
    #[serde(default)]
    pub log: BTreeMap<LogCategory, Vec<LogMessage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub children: BTreeMap<ReportIdentifier, Report>,
}

impl Report {
    pub fn new(host: impl Into<String>, token: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            host: host.into(),
            token: token.into(),
            args,
            progress: Progress::queued(),
            log: BTreeMap::new(),
            data: None,
            children: BTreeMap::new(),
        }
    }

    /// Append one log line to the given category. Append-only: never
    /// rewrites or removes prior entries.
    pub fn log(&mut self, category: LogCategory, message: LogMessage) {
        self.log.entry(category).or_default().push(message);
    }

    pub fn log_count(&self, category: LogCategory) -> usize {
        self.log.get(&category).map(Vec::len).unwrap_or(0)
    }

    pub fn set_child(&mut self, id: ReportIdentifier, report: Report) {
        self.children.insert(id, report);
    }

    pub fn child(&self, id: &ReportIdentifier) -> Option<&Report> {
        self.children.get(id)
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
