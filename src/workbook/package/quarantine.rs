//! Hook for refusing to open files the operating system has flagged as downloaded.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// What is known about a possibly quarantined file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuarantineInfo {
    /// The file under quarantine.
    pub represented_file: PathBuf,
    /// When the file was quarantined.
    pub quarantined_at: Option<DateTime<Utc>>,
    /// Where the file was downloaded from, from the user's point of view.
    pub origin_url: Option<String>,
    /// The application that quarantined the file.
    pub agent_name: Option<String>,
}

impl QuarantineInfo {
    pub fn new(represented_file: impl Into<PathBuf>) -> Self {
        Self {
            represented_file: represented_file.into(),
            quarantined_at: None,
            origin_url: None,
            agent_name: None,
        }
    }

    pub fn with_timestamp(mut self, quarantined_at: DateTime<Utc>) -> Self {
        self.quarantined_at = Some(quarantined_at);
        self
    }

    pub fn with_origin_url(mut self, origin_url: impl Into<String>) -> Self {
        self.origin_url = Some(origin_url.into());
        self
    }

    pub fn with_agent_name(mut self, agent_name: impl Into<String>) -> Self {
        self.agent_name = Some(agent_name.into());
        self
    }
}

/// Decides whether a file may be opened.
///
/// `inspect` gathers what the platform knows about the file; the default only
/// knows the path. Closures taking a `&QuarantineInfo` implement this trait.
pub trait QuarantineCheck {
    fn inspect(&self, path: &Path) -> QuarantineInfo {
        QuarantineInfo::new(path)
    }

    fn allow(&self, info: &QuarantineInfo) -> bool;
}

impl<F> QuarantineCheck for F
where
    F: Fn(&QuarantineInfo) -> bool,
{
    fn allow(&self, info: &QuarantineInfo) -> bool {
        self(info)
    }
}

/// Opens everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl QuarantineCheck for AllowAll {
    fn allow(&self, _info: &QuarantineInfo) -> bool {
        true
    }
}
