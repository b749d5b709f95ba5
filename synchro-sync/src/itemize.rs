//! Change detection from itemized dry-run output.
//!
//! Each dry-run line looks like `YXcstpoguax path`, where `Y` is the update
//! class and `X` the item type:
//!
//! ```text
//! >f+++++++++ path/to/new/file                   change: file to be received
//! .f...p..... path/to/old/file                   no-op: permissions differ only
//! cd+++++++++ new/dir/                           change: directory created
//! ```
//!
//! Permission-only differences carry the `.` update class and are ignored.

use std::fmt;

use synchro_core::Destination;

use crate::destination::DestinationOps;
use crate::error::SyncError;
use crate::exec::{CommandLine, CommandRunner};

/// First character of an itemized code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateClass {
    NoOp,
    Send,
    Receive,
    LocalChange,
    HardLink,
    Message,
}

impl UpdateClass {
    fn from_code(c: char) -> Option<Self> {
        match c {
            '.' => Some(Self::NoOp),
            '<' => Some(Self::Send),
            '>' => Some(Self::Receive),
            'c' => Some(Self::LocalChange),
            'h' => Some(Self::HardLink),
            '*' => Some(Self::Message),
            _ => None,
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::NoOp => "Item is not being updated",
            Self::Send => "New item to be sent to the remote host",
            Self::Receive => "New item to be received by the local host",
            Self::LocalChange => "Local change to / creation of item",
            Self::HardLink => "Hard link detected",
            Self::Message => "Itemized output contains a message",
        }
    }
}

/// Second character of an itemized code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    File,
    Directory,
    Symlink,
    Device,
    Special,
}

impl ItemType {
    fn from_code(c: char) -> Option<Self> {
        match c {
            'f' => Some(Self::File),
            'd' => Some(Self::Directory),
            'L' => Some(Self::Symlink),
            'D' => Some(Self::Device),
            'S' => Some(Self::Special),
            _ => None,
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
            Self::Device => "device",
            Self::Special => "special",
        }
    }
}

/// One parsed dry-run line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemizedLine {
    pub update: UpdateClass,
    pub item: ItemType,
    pub path: String,
}

impl ItemizedLine {
    /// Parse `"<code> <path>"`. Anything else is a [`SyncError::MalformedDryRunLine`].
    pub fn parse(line: &str) -> Result<Self, SyncError> {
        let malformed = || SyncError::MalformedDryRunLine {
            line: line.to_owned(),
        };
        let (code, path) = line.split_once(' ').ok_or_else(malformed)?;
        let mut chars = code.chars();
        let update = chars
            .next()
            .and_then(UpdateClass::from_code)
            .ok_or_else(malformed)?;
        let item = chars
            .next()
            .and_then(ItemType::from_code)
            .ok_or_else(malformed)?;
        let path = path.trim_start();
        if path.is_empty() {
            return Err(malformed());
        }
        Ok(Self {
            update,
            item,
            path: path.to_owned(),
        })
    }

    /// Whether this line is evidence that a transfer is needed.
    pub fn requires_transfer(&self) -> bool {
        self.update != UpdateClass::NoOp
    }
}

impl fmt::Display for ItemizedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} : {} : {}",
            self.update.description(),
            self.item.description(),
            self.path
        )
    }
}

/// Verdict of a dry run plus a human-readable line per reported item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeReport {
    pub transfer_required: bool,
    pub trace: Vec<String>,
}

impl ChangeReport {
    /// Fold classified lines into a verdict: any non-no-op line requires a transfer.
    pub fn from_lines<'a, I>(lines: I) -> Result<Self, SyncError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut report = Self::default();
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let parsed = ItemizedLine::parse(line)?;
            report.transfer_required |= parsed.requires_transfer();
            report.trace.push(parsed.to_string());
        }
        Ok(report)
    }
}

/// Runs the dry-run command and classifies its output.
pub struct ChangeDetector<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> ChangeDetector<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    /// Decide whether `destination` needs a transfer.
    ///
    /// A destination that does not exist yet always needs one; the dry run
    /// is skipped in that case. Output lines are collected before
    /// classification so a malformed line fails the whole run.
    pub fn detect(
        &self,
        dry_run: &CommandLine,
        destination: &Destination,
    ) -> Result<ChangeReport, SyncError> {
        if !destination.exists(self.runner) {
            return Ok(ChangeReport {
                transfer_required: true,
                trace: vec![format!("Destination {destination} does not exist yet")],
            });
        }

        let mut lines = Vec::new();
        self.runner
            .run(dry_run, &mut |line| lines.push(line.to_owned()))?;
        ChangeReport::from_lines(lines.iter().map(String::as_str))
    }
}
