//! Transient UI notices standing in for the toast layer.
//!
//! DESIGN
//! ======
//! Pages push notices as a side effect of submit/load; the host drains them
//! and shows them however it likes (the CLI prints them to stderr). The queue
//! is bounded and drops the oldest entry when full.

#[cfg(test)]
#[path = "ui_test.rs"]
mod ui_test;

use std::collections::VecDeque;

/// Notices kept before the oldest is dropped.
pub const MAX_NOTICES: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

impl NoticeLevel {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Bounded FIFO of pending notices.
#[derive(Clone, Debug, Default)]
pub struct Notices {
    queue: VecDeque<Notice>,
}

impl Notices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Success, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Error, message.into());
    }

    fn push(&mut self, level: NoticeLevel, message: String) {
        if self.queue.len() == MAX_NOTICES {
            self.queue.pop_front();
        }
        self.queue.push_back(Notice { level, message });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Most recent notice, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Notice> {
        self.queue.back()
    }

    /// Remove and return every pending notice, oldest first.
    pub fn drain(&mut self) -> Vec<Notice> {
        self.queue.drain(..).collect()
    }
}
