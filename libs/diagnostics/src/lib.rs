//! Utilities for collecting diagnostics.

#![warn(missing_docs)]

use std::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};

/// A diagnostic issue that should be reported to users.
pub trait Diagnostic: Debug + Display {
    /// Returns the severity of this issue.
    ///
    /// The default implementation returns [`Severity::default`].
    fn severity(&self) -> Severity {
        Default::default()
    }
}

/// An enumeration of possible severity levels.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Severity {
    /// An informational message.
    Info,
    /// A warning.
    #[default]
    Warning,
    /// An error. Often, but not always, fatal.
    Error,
}

impl Severity {
    /// Returns the log level corresponding to this severity.
    #[inline]
    pub const fn as_tracing_level(&self) -> tracing::Level {
        match *self {
            Self::Info => tracing::Level::INFO,
            Self::Warning => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }

    /// Returns `true` if the severity is [`Severity::Error`].
    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(*self, Self::Error)
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A destination for diagnostic entries.
///
/// Subsystems that need to report issues take a `&mut dyn LogSink<T>`
/// rather than owning a journal, so tests can inject their own sink.
pub trait LogSink<T> {
    /// Appends an entry to the sink.
    fn append(&mut self, entry: T);
}

/// An ordered, append-only journal of diagnostic entries.
///
/// Consecutive identical entries collapse to one; non-adjacent duplicates
/// are all kept.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Journal<T> {
    entries: Vec<T>,
    num_errors: usize,
    num_warnings: usize,
}

impl<T> Journal<T> {
    /// Creates a new, empty journal.
    #[inline]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            num_errors: 0,
            num_warnings: 0,
        }
    }

    /// Returns an iterator over all entries, oldest first.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    /// The number of entries in the journal.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the journal is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.num_errors = 0;
        self.num_warnings = 0;
    }

    /// Returns `true` if the journal contains an error-severity entry.
    #[inline]
    pub fn has_error(&self) -> bool {
        self.num_errors > 0
    }

    /// The number of error-severity entries.
    #[inline]
    pub fn num_errors(&self) -> usize {
        self.num_errors
    }

    /// The number of warning-severity entries.
    #[inline]
    pub fn num_warnings(&self) -> usize {
        self.num_warnings
    }
}

impl<T: Diagnostic + PartialEq> LogSink<T> for Journal<T> {
    fn append(&mut self, entry: T) {
        if self.entries.last() == Some(&entry) {
            return;
        }
        match entry.severity() {
            Severity::Error => self.num_errors += 1,
            Severity::Warning => self.num_warnings += 1,
            _ => (),
        }
        self.entries.push(entry);
    }
}

impl<T> IntoIterator for Journal<T> {
    type Item = T;
    type IntoIter = <Vec<T> as IntoIterator>::IntoIter;
    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<T> Default for Journal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Display> Display for Journal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for entry in self.entries.iter() {
            writeln!(f, "{}", entry)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct TestIssue(Severity, &'static str);

    impl Display for TestIssue {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}: {}", self.0, self.1)
        }
    }

    impl Diagnostic for TestIssue {
        fn severity(&self) -> Severity {
            self.0
        }
    }

    #[test]
    fn consecutive_duplicates_collapse() {
        let mut journal = Journal::new();
        journal.append(TestIssue(Severity::Error, "boom"));
        journal.append(TestIssue(Severity::Error, "boom"));
        journal.append(TestIssue(Severity::Warning, "hmm"));
        journal.append(TestIssue(Severity::Error, "boom"));
        assert_eq!(journal.len(), 3);
        assert_eq!(journal.num_errors(), 2);
        assert_eq!(journal.num_warnings(), 1);
    }

    #[test]
    fn clear_resets_counts() {
        let mut journal = Journal::new();
        journal.append(TestIssue(Severity::Error, "boom"));
        assert!(journal.has_error());
        journal.clear();
        assert!(journal.is_empty());
        assert!(!journal.has_error());
    }
}
