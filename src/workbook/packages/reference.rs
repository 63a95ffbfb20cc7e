use super::range::VersionRange;
use super::version::NuGetVersion;
use crate::error::Result;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

/// A package identifier. Comparison and hashing ignore ASCII case; the original
/// spelling is kept for display and serialization.
#[derive(Debug, Clone, Eq)]
pub struct PackageId(String);

impl PackageId {
    pub fn new(id: impl Into<String>) -> Self {
        PackageId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl PartialEq for PackageId {
    fn eq(&self, other: &Self) -> bool {
        self.matches(&other.0)
    }
}

impl Hash for PackageId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.0.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackageReference {
    id: PackageId,
    range: Option<VersionRange>,
    is_explicit: bool,
    /// Filled in by the package resolver; never persisted in a manifest.
    pub assembly_references: Vec<PathBuf>,
}

impl PackageReference {
    /// An explicitly declared reference. `range` is kept verbatim.
    pub fn new(id: impl Into<String>, range: Option<&str>) -> Result<Self> {
        let range = range.map(VersionRange::parse).transpose()?;
        Ok(Self {
            id: PackageId::new(id),
            range,
            is_explicit: true,
            assembly_references: Vec::new(),
        })
    }

    /// A reference built from one resolved version. It is written back as the bare
    /// version string rather than the normalized `[x, )` interval.
    pub fn from_version(id: impl Into<String>, version: NuGetVersion) -> Self {
        Self {
            id: PackageId::new(id),
            range: Some(VersionRange::at_least(version)),
            is_explicit: true,
            assembly_references: Vec::new(),
        }
    }

    pub fn transitive(mut self) -> Self {
        self.is_explicit = false;
        self
    }

    pub fn id(&self) -> &PackageId {
        &self.id
    }

    pub fn range(&self) -> Option<&VersionRange> {
        self.range.as_ref()
    }

    pub fn original_range_string(&self) -> Option<&str> {
        self.range.as_ref().map(VersionRange::original_string)
    }

    pub fn normalized_range_string(&self) -> Option<&str> {
        self.range.as_ref().map(VersionRange::to_normalized_string)
    }

    pub fn is_explicit(&self) -> bool {
        self.is_explicit
    }
}

impl fmt::Display for PackageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.range {
            Some(range) => write!(f, "{} {}", self.id, range),
            None => write!(f, "{}", self.id),
        }
    }
}

/// Ordered package references, keyed on the package id. Only one reference per id
/// may exist in the list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageReferenceList {
    packages: Vec<PackageReference>,
}

impl PackageReferenceList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&PackageReference> {
        self.packages.iter().find(|p| p.id.matches(id))
    }

    /// Adds the reference, or replaces the one with the same id in place.
    /// Returns true if the list changed.
    pub fn add_or_update(&mut self, package: PackageReference) -> bool {
        match self.packages.iter().position(|p| p.id == package.id) {
            Some(index) if self.packages[index] == package => false,
            Some(index) => {
                self.packages[index] = package;
                true
            }
            None => {
                self.packages.push(package);
                true
            }
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<PackageReference> {
        let index = self.packages.iter().position(|p| p.id.matches(id))?;
        Some(self.packages.remove(index))
    }

    pub fn replace_all(&mut self, packages: impl IntoIterator<Item = PackageReference>) {
        self.packages.clear();
        for package in packages {
            self.add_or_update(package);
        }
    }

    pub fn clear(&mut self) {
        self.packages.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PackageReference> {
        self.packages.iter()
    }

    /// References the user declared; these are the ones persisted in a manifest.
    pub fn explicit(&self) -> impl Iterator<Item = &PackageReference> + '_ {
        self.packages.iter().filter(|p| p.is_explicit)
    }
}

impl<'a> IntoIterator for &'a PackageReferenceList {
    type Item = &'a PackageReference;
    type IntoIter = std::slice::Iter<'a, PackageReference>;

    fn into_iter(self) -> Self::IntoIter {
        self.packages.iter()
    }
}

impl FromIterator<PackageReference> for PackageReferenceList {
    fn from_iter<I: IntoIterator<Item = PackageReference>>(iter: I) -> Self {
        let mut list = PackageReferenceList::new();
        list.replace_all(iter);
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn package(id: &str, range: &str) -> PackageReference {
        PackageReference::new(id, Some(range)).unwrap()
    }

    #[test]
    fn test_package_id_ignores_case() {
        assert_eq!(PackageId::new("Newtonsoft.Json"), PackageId::new("newtonsoft.json"));
        let mut set = HashSet::new();
        set.insert(PackageId::new("Newtonsoft.Json"));
        assert!(set.contains(&PackageId::new("NEWTONSOFT.JSON")));
        assert_eq!(PackageId::new("Newtonsoft.Json").to_string(), "Newtonsoft.Json");
    }

    #[test]
    fn test_reference_keeps_original_range() {
        let reference = package("Fake.Package4", "[9,10)");
        assert_eq!(reference.original_range_string(), Some("[9,10)"));
        assert_eq!(reference.normalized_range_string(), Some("[9.0.0, 10.0.0)"));
        assert!(reference.is_explicit());
    }

    #[test]
    fn test_from_version_emits_bare_version() {
        let reference = PackageReference::from_version("Fake.Package1", "9.0.1".parse().unwrap());
        assert_eq!(reference.original_range_string(), Some("9.0.1"));
    }

    #[test]
    fn test_invalid_range_is_an_error() {
        assert!(PackageReference::new("Broken", Some("[1.0")).is_err());
    }

    #[test]
    fn test_add_or_update_is_keyed_on_id() {
        let mut list = PackageReferenceList::new();
        assert!(list.add_or_update(package("Xamarin.Forms", "2.5.0")));
        assert!(list.add_or_update(package("Newtonsoft.Json", "8.0.3")));
        assert!(!list.add_or_update(package("Newtonsoft.Json", "8.0.3")));
        assert!(list.add_or_update(package("newtonsoft.json", "9.0.1")));

        assert_eq!(list.len(), 2);
        let updated = list.get("NEWTONSOFT.JSON").unwrap();
        assert_eq!(updated.original_range_string(), Some("9.0.1"));
        // Position is kept on update.
        assert_eq!(list.iter().nth(1).unwrap().id().as_str(), "newtonsoft.json");
    }

    #[test]
    fn test_remove_and_explicit_filter() {
        let mut list: PackageReferenceList = vec![
            package("A", "1.0"),
            package("B", "1.0").transitive(),
            package("C", "1.0"),
        ]
        .into_iter()
        .collect();

        let explicit: Vec<&str> = list.explicit().map(|p| p.id().as_str()).collect();
        assert_eq!(explicit, ["A", "C"]);

        assert!(list.remove("a").is_some());
        assert!(list.remove("a").is_none());
        assert_eq!(list.len(), 2);
    }
}
