//! Typed identifiers.
//!
//! Identity is numeric; the `P1` / `T12` / `S3` strings users see are produced by
//! `Display` and are never used as keys inside the ledger. A task is identified by
//! its parent project number plus a per-project sequence, so `T112` can mean
//! project 1 task 12 or project 11 task 2 only in its display form.

use crate::errors::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Identifier of a top-level project, displayed as `P<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectId(pub u32);

/// Identifier of a task: parent project number and per-project sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId {
    /// Numeric part of the parent project id
    pub project: u32,
    /// Sequence number within the parent project
    pub seq: u32,
}

/// Identifier of a funding source, displayed as `S<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub u32);

/// Identifier of an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AllocationId(pub u64);

impl TaskId {
    /// Builds a task id under `project`.
    #[must_use]
    pub const fn new(project: ProjectId, seq: u32) -> Self {
        Self {
            project: project.0,
            seq,
        }
    }

    /// The parent project.
    #[must_use]
    pub const fn project_id(self) -> ProjectId {
        ProjectId(self.project)
    }

    /// Recovers a task id from its display form given the known parent.
    ///
    /// `T112` under `P11` is sequence 2, under `P1` it is sequence 12.
    pub fn parse_with_parent(raw: &str, parent: ProjectId) -> Result<Self> {
        let prefix = format!("T{}", parent.0);
        let seq = raw
            .trim()
            .strip_prefix(&prefix)
            .filter(|rest| !rest.is_empty())
            .and_then(|rest| rest.parse::<u32>().ok())
            .ok_or_else(|| {
                Error::validation(format!("task id '{raw}' does not belong to project {parent}"))
            })?;
        Ok(Self::new(parent, seq))
    }
}

fn parse_prefixed(raw: &str, prefix: char, what: &str) -> Result<u32> {
    raw.trim()
        .strip_prefix(prefix)
        .and_then(|digits| digits.parse::<u32>().ok())
        .ok_or_else(|| Error::validation(format!("malformed {what} id '{raw}'")))
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}{}", self.project, self.seq)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

impl fmt::Display for AllocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_prefixed(s, 'P', "project").map(Self)
    }
}

impl FromStr for SourceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_prefixed(s, 'S', "source").map(Self)
    }
}
