use super::version::NuGetVersion;
use crate::error::{Result, WorkbookError};
use std::fmt;
use std::str::FromStr;

/// A floating lower bound such as `9.0.*`, `*` or `1.0.0-beta*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloatingVersion {
    text: String,
    min: NuGetVersion,
}

impl FloatingVersion {
    fn parse(text: &str) -> Result<Self> {
        let invalid = || WorkbookError::format(format!("'{}' is not a valid floating version", text));

        let min = if text == "*" {
            NuGetVersion::new(0, 0, 0)
        } else if let Some((numbers, release)) = text.split_once('-') {
            // 1.0.0-* or 1.0.0-beta*
            let prefix = release.strip_suffix('*').ok_or_else(invalid)?;
            if prefix.contains('*') {
                return Err(invalid());
            }
            let components = NuGetVersion::parse_components(numbers)?;
            NuGetVersion::from_components(&components, Some(prefix.to_string()))
        } else {
            // 9.* or 9.0.*
            let numbers = text.strip_suffix(".*").ok_or_else(invalid)?;
            let components = NuGetVersion::parse_components(numbers)?;
            if components.len() >= 4 {
                return Err(invalid());
            }
            NuGetVersion::from_components(&components, None)
        };

        Ok(Self {
            text: text.to_string(),
            min,
        })
    }

    pub fn min_version(&self) -> &NuGetVersion {
        &self.min
    }

    fn allows_prerelease(&self) -> bool {
        self.text.contains('-')
    }
}

impl fmt::Display for FloatingVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LowerBound {
    Version(NuGetVersion),
    Floating(FloatingVersion),
}

impl LowerBound {
    pub fn version(&self) -> &NuGetVersion {
        match self {
            LowerBound::Version(version) => version,
            LowerBound::Floating(floating) => floating.min_version(),
        }
    }
}

impl fmt::Display for LowerBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LowerBound::Version(version) => version.fmt(f),
            LowerBound::Floating(floating) => floating.fmt(f),
        }
    }
}

/// A NuGet version range.
///
/// The text the range was parsed from is kept verbatim and is what gets written back
/// to a manifest. [`VersionRange::to_normalized_string`] renders the derived
/// interval:
///
/// | original  | normalized          |
/// |-----------|---------------------|
/// | `9.0.1`   | `[9.0.1, )`         |
/// | `[9.0.1]` | `[9.0.1, 9.0.1]`    |
/// | `9.0.*`   | `[9.0.*, )`         |
/// | `[9,10)`  | `[9.0.0, 10.0.0)`   |
#[derive(Debug, Clone)]
pub struct VersionRange {
    original: String,
    min: Option<LowerBound>,
    min_inclusive: bool,
    max: Option<NuGetVersion>,
    max_inclusive: bool,
    normalized: String,
}

impl VersionRange {
    pub fn parse(text: &str) -> Result<Self> {
        text.parse()
    }

    /// `version` or higher; the original text is the bare version string.
    pub fn at_least(version: NuGetVersion) -> Self {
        Self::build(
            version.to_string(),
            Some(LowerBound::Version(version)),
            true,
            None,
            false,
        )
    }

    pub fn original_string(&self) -> &str {
        &self.original
    }

    pub fn to_normalized_string(&self) -> &str {
        &self.normalized
    }

    pub fn min(&self) -> Option<&LowerBound> {
        self.min.as_ref()
    }

    pub fn max(&self) -> Option<&NuGetVersion> {
        self.max.as_ref()
    }

    pub fn is_min_inclusive(&self) -> bool {
        self.min_inclusive
    }

    pub fn is_max_inclusive(&self) -> bool {
        self.max_inclusive
    }

    pub fn is_floating(&self) -> bool {
        matches!(self.min, Some(LowerBound::Floating(_)))
    }

    pub fn satisfies(&self, version: &NuGetVersion) -> bool {
        let above_min = match &self.min {
            None => true,
            Some(LowerBound::Floating(floating)) => {
                if version.is_prerelease() && !floating.allows_prerelease() {
                    return false;
                }
                version >= floating.min_version()
            }
            Some(LowerBound::Version(min)) => {
                if self.min_inclusive {
                    version >= min
                } else {
                    version > min
                }
            }
        };
        let below_max = match &self.max {
            None => true,
            Some(max) => {
                if self.max_inclusive {
                    version <= max
                } else {
                    version < max
                }
            }
        };
        above_min && below_max
    }

    fn build(
        original: String,
        min: Option<LowerBound>,
        min_inclusive: bool,
        max: Option<NuGetVersion>,
        max_inclusive: bool,
    ) -> Self {
        let normalized = format!(
            "{}{}, {}{}",
            if min_inclusive { '[' } else { '(' },
            min.as_ref().map(ToString::to_string).unwrap_or_default(),
            max.as_ref().map(ToString::to_string).unwrap_or_default(),
            if max_inclusive { ']' } else { ')' },
        );
        Self {
            original,
            min,
            min_inclusive,
            max,
            max_inclusive,
            normalized,
        }
    }
}

impl FromStr for VersionRange {
    type Err = WorkbookError;

    fn from_str(text: &str) -> Result<Self> {
        let original = text.to_string();
        let text = text.trim();
        let invalid = |why: &str| {
            WorkbookError::format(format!("'{}' is not a valid version range: {}", original, why))
        };

        if text.is_empty() {
            return Err(invalid("empty"));
        }

        let first = text.chars().next().unwrap_or(' ');
        if first != '[' && first != '(' {
            let min = if text.contains('*') {
                LowerBound::Floating(FloatingVersion::parse(text)?)
            } else {
                LowerBound::Version(text.parse()?)
            };
            return Ok(Self::build(original, Some(min), true, None, false));
        }

        let min_inclusive = first == '[';
        let max_inclusive = match text.chars().last() {
            Some(']') => true,
            Some(')') => false,
            _ => return Err(invalid("missing closing bracket")),
        };
        if text.len() < 2 {
            return Err(invalid("missing closing bracket"));
        }
        let inner = &text[1..text.len() - 1];

        let Some((left, right)) = inner.split_once(',') else {
            // [1.0] pins exactly one version.
            if !(min_inclusive && max_inclusive) {
                return Err(invalid("a single version must be written as [x]"));
            }
            let version: NuGetVersion = inner.trim().parse()?;
            return Ok(Self::build(
                original,
                Some(LowerBound::Version(version.clone())),
                true,
                Some(version),
                true,
            ));
        };

        let (left, right) = (left.trim(), right.trim());
        if left.is_empty() && right.is_empty() {
            return Err(invalid("no bounds"));
        }
        if right.contains(',') {
            return Err(invalid("too many bounds"));
        }

        let min = if left.is_empty() {
            None
        } else if left.contains('*') {
            Some(LowerBound::Floating(FloatingVersion::parse(left)?))
        } else {
            Some(LowerBound::Version(left.parse()?))
        };
        let max: Option<NuGetVersion> = if right.is_empty() {
            None
        } else {
            Some(right.parse()?)
        };

        if let (Some(min), Some(max)) = (&min, &max) {
            let min = min.version();
            if min > max || (min == max && !(min_inclusive && max_inclusive)) {
                return Err(invalid("lower bound exceeds upper bound"));
            }
        }

        Ok(Self::build(original, min, min_inclusive, max, max_inclusive))
    }
}

impl PartialEq for VersionRange {
    fn eq(&self, other: &Self) -> bool {
        self.original == other.original && self.normalized == other.normalized
    }
}

impl Eq for VersionRange {}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(text: &str) -> String {
        VersionRange::parse(text)
            .unwrap()
            .to_normalized_string()
            .to_string()
    }

    #[test]
    fn test_normalized_forms() {
        assert_eq!(normalized("9.0.1"), "[9.0.1, )");
        assert_eq!(normalized("[9.0.1]"), "[9.0.1, 9.0.1]");
        assert_eq!(normalized("9.0.*"), "[9.0.*, )");
        assert_eq!(normalized("[9,10)"), "[9.0.0, 10.0.0)");
        assert_eq!(normalized("(1.0,)"), "(1.0.0, )");
        assert_eq!(normalized("(,2.0]"), "(, 2.0.0]");
        assert_eq!(normalized("[2.*,2.9)"), "[2.*, 2.9.0)");
        assert_eq!(normalized("*"), "[*, )");
        assert_eq!(normalized("1.0.0-*"), "[1.0.0-*, )");
    }

    #[test]
    fn test_original_text_is_preserved() {
        let range = VersionRange::parse("[9,10)").unwrap();
        assert_eq!(range.original_string(), "[9,10)");
        assert_eq!(range.to_string(), "[9,10)");
    }

    #[test]
    fn test_invalid_ranges() {
        for text in ["", "[", "[1.0", "(1.0)", "(,)", "[2.0,1.0]", "(1.0,1.0]", "1.*.0", "[1,2,3]"] {
            assert!(VersionRange::parse(text).is_err(), "{} should not parse", text);
        }
    }

    #[test]
    fn test_satisfies() {
        let range = VersionRange::parse("[9,10)").unwrap();
        assert!(range.satisfies(&"9.0.0".parse().unwrap()));
        assert!(range.satisfies(&"9.9.9".parse().unwrap()));
        assert!(!range.satisfies(&"10.0.0".parse().unwrap()));
        assert!(!range.satisfies(&"8.9".parse().unwrap()));

        let pin = VersionRange::parse("[9.0.1]").unwrap();
        assert!(pin.satisfies(&"9.0.1".parse().unwrap()));
        assert!(!pin.satisfies(&"9.0.2".parse().unwrap()));

        let floating = VersionRange::parse("9.0.*").unwrap();
        assert!(floating.is_floating());
        assert!(floating.satisfies(&"9.0.4".parse().unwrap()));
        assert!(!floating.satisfies(&"9.0.4-beta".parse().unwrap()));

        let exclusive = VersionRange::parse("(1.0,)").unwrap();
        assert!(!exclusive.satisfies(&"1.0".parse().unwrap()));
        assert!(exclusive.satisfies(&"1.0.1".parse().unwrap()));
    }

    #[test]
    fn test_at_least_uses_bare_version_as_original() {
        let range = VersionRange::at_least("9.0.1".parse().unwrap());
        assert_eq!(range.original_string(), "9.0.1");
        assert_eq!(range.to_normalized_string(), "[9.0.1, )");
    }
}
