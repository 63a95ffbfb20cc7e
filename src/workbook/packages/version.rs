use crate::error::{Result, WorkbookError};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A NuGet package version: up to four numeric components plus an optional
/// pre-release label. Build metadata (`+...`) is accepted and ignored.
#[derive(Debug, Clone)]
pub struct NuGetVersion {
    major: u64,
    minor: u64,
    patch: u64,
    revision: u64,
    release: Option<String>,
}

impl NuGetVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            revision: 0,
            release: None,
        }
    }

    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release = Some(release.into());
        self
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    pub fn patch(&self) -> u64 {
        self.patch
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn release(&self) -> Option<&str> {
        self.release.as_deref()
    }

    pub fn is_prerelease(&self) -> bool {
        self.release.is_some()
    }

    /// Parses the numeric prefix of a floating version (`9.0` in `9.0.*`).
    /// Missing components default to zero.
    pub(crate) fn parse_components(text: &str) -> Result<Vec<u64>> {
        let parts: Vec<&str> = text.split('.').collect();
        if parts.is_empty() || parts.len() > 4 {
            return Err(WorkbookError::format(format!(
                "'{}' is not a valid version",
                text
            )));
        }
        parts
            .iter()
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(WorkbookError::format(format!(
                        "'{}' is not a valid version",
                        text
                    )));
                }
                part.parse::<u64>().map_err(|_| {
                    WorkbookError::format(format!("'{}' is not a valid version", text))
                })
            })
            .collect()
    }

    pub(crate) fn from_components(components: &[u64], release: Option<String>) -> Self {
        let get = |i: usize| components.get(i).copied().unwrap_or(0);
        Self {
            major: get(0),
            minor: get(1),
            patch: get(2),
            revision: get(3),
            release,
        }
    }

    fn numbers(&self) -> [u64; 4] {
        [self.major, self.minor, self.patch, self.revision]
    }
}

impl FromStr for NuGetVersion {
    type Err = WorkbookError;

    fn from_str(text: &str) -> Result<Self> {
        let text = text.trim();
        let text = text.split_once('+').map_or(text, |(version, _metadata)| version);

        let (numbers, release) = match text.split_once('-') {
            Some((numbers, release)) => {
                if release.is_empty()
                    || !release
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
                {
                    return Err(WorkbookError::format(format!(
                        "'{}' has an invalid pre-release label",
                        text
                    )));
                }
                (numbers, Some(release.to_string()))
            }
            None => (text, None),
        };

        let components = Self::parse_components(numbers)?;
        Ok(Self::from_components(&components, release))
    }
}

/// Normalized form: three components, a fourth only when the revision is non-zero.
impl fmt::Display for NuGetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if self.revision != 0 {
            write!(f, ".{}", self.revision)?;
        }
        if let Some(release) = &self.release {
            write!(f, "-{}", release)?;
        }
        Ok(())
    }
}

impl PartialEq for NuGetVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for NuGetVersion {}

impl PartialOrd for NuGetVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NuGetVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.numbers()
            .cmp(&other.numbers())
            .then_with(|| match (&self.release, &other.release) {
                (None, None) => Ordering::Equal,
                // A release sorts after any of its pre-releases.
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => compare_release_labels(a, b),
            })
    }
}

fn compare_release_labels(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => x.to_ascii_lowercase().cmp(&y.to_ascii_lowercase()),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(text: &str) -> NuGetVersion {
        text.parse().unwrap()
    }

    #[test]
    fn test_normalizes_to_three_components() {
        assert_eq!(v("9").to_string(), "9.0.0");
        assert_eq!(v("9.1").to_string(), "9.1.0");
        assert_eq!(v("1.0.0.0").to_string(), "1.0.0");
        assert_eq!(v("1.2.3.4").to_string(), "1.2.3.4");
        assert_eq!(v("2.5.0-pre2").to_string(), "2.5.0-pre2");
        assert_eq!(v("1.0.0+build.5").to_string(), "1.0.0");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!("".parse::<NuGetVersion>().is_err());
        assert!("a.b".parse::<NuGetVersion>().is_err());
        assert!("1..2".parse::<NuGetVersion>().is_err());
        assert!("1.2.3.4.5".parse::<NuGetVersion>().is_err());
        assert!("1.0-".parse::<NuGetVersion>().is_err());
    }

    #[test]
    fn test_ordering() {
        assert!(v("1.0") == v("1.0.0.0"));
        assert!(v("1.0.1") > v("1.0.0"));
        assert!(v("1.0.0") > v("1.0.0-beta"));
        assert!(v("1.0.0-beta.2") < v("1.0.0-beta.10"));
        assert!(v("1.0.0-alpha") < v("1.0.0-beta"));
        assert!(v("10.0") > v("9.9.9"));
    }
}
