//! Notifications published to UI subscribers.
//!
//! Subscribers get a [`Notification::State`] each time a refresh swaps the snapshot and
//! a [`Notification::Log`] for every discrete status line. Log lines are also mirrored
//! to the `log` facade.

use crate::core::state::RepositoryState;
use chrono::{DateTime, Local};
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub level: LogLevel,
    pub message: String,
    pub at: DateTime<Local>,
}

impl LogLine {
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            at: Local::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == LogLevel::Error
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.at.format("%H:%M:%S"), self.message)
    }
}

#[derive(Debug, Clone)]
pub enum Notification {
    State(Arc<RepositoryState>),
    Log(LogLine),
}

/// Fan-out of notifications to every live subscriber
#[derive(Default)]
pub(crate) struct Subscribers {
    senders: Mutex<Vec<Sender<Notification>>>,
}

impl Subscribers {
    pub(crate) fn subscribe(&self) -> Receiver<Notification> {
        let (tx, rx) = mpsc::channel();
        self.senders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(tx);
        rx
    }

    /// Deliver to everyone, forgetting subscribers whose receiver is gone
    pub(crate) fn publish(&self, notification: Notification) {
        let mut senders = self
            .senders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        senders.retain(|tx| tx.send(notification.clone()).is_ok());
    }

    pub(crate) fn log(&self, line: LogLine) {
        match line.level {
            LogLevel::Info => log::info!("{}", line.message),
            LogLevel::Error => log::error!("{}", line.message),
        }
        self.publish(Notification::Log(line));
    }
}
