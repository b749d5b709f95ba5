//! Start and end notifications.
//!
//! Both notifications are always present; a disabled one is
//! [`Notification::Disabled`] and sending it does nothing, so the engine calls
//! `send` at the same two points whatever the configuration says.

use std::path::{Path, PathBuf};

use synchro_core::NotificationSettings;

use crate::error::SyncError;
use crate::exec::{CommandLine, CommandRunner};
use crate::run_log::dry_run_excerpt;

/// Where the message body comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailBody {
    Empty,
    /// The dry-run section of this run log.
    LogExcerpt(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Disabled,
    Mail {
        subject: String,
        recipient: String,
        body: MailBody,
    },
}

impl Notification {
    /// `mailx -s <subject> <recipient>`, or `None` when disabled.
    pub fn command(&self) -> Option<CommandLine> {
        match self {
            Notification::Disabled => None,
            Notification::Mail {
                subject, recipient, ..
            } => Some(CommandLine::new([
                "mailx",
                "-s",
                subject.as_str(),
                recipient.as_str(),
            ])),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Notification::Disabled)
    }

    /// Deliver the message with its body on stdin.
    pub fn send(
        &self,
        runner: &dyn CommandRunner,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<(), SyncError> {
        let (Some(command), Notification::Mail { body, .. }) = (self.command(), self) else {
            return Ok(());
        };
        let text = match body {
            MailBody::Empty => String::new(),
            MailBody::LogExcerpt(log_file) => dry_run_excerpt(log_file)?,
        };
        runner.run_with_input(&command, &text, on_line)
    }
}

/// The pair of notifications for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationGate {
    start: Notification,
    end: Notification,
}

impl NotificationGate {
    pub fn new(settings: &NotificationSettings, source: &Path, log_file: &Path) -> Self {
        let mail = |enabled: bool, subject: String, body: MailBody| match &settings.recipient {
            Some(recipient) if enabled && !recipient.is_empty() => Notification::Mail {
                subject,
                recipient: recipient.clone(),
                body,
            },
            _ => Notification::Disabled,
        };
        let source = source.display();
        Self {
            start: mail(
                settings.on_start,
                format!("Synchro transfer started: {source}"),
                MailBody::Empty,
            ),
            end: mail(
                settings.on_end,
                format!("Synchro transfer complete: {source}"),
                MailBody::LogExcerpt(log_file.to_path_buf()),
            ),
        }
    }

    /// Sent once a transfer has been found necessary.
    pub fn start(&self) -> &Notification {
        &self.start
    }

    /// Sent after a transfer has completed.
    pub fn end(&self) -> &Notification {
        &self.end
    }
}
