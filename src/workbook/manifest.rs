//! # Manifest
//!
//! Page metadata: identity, target platforms, declared packages and a bag of custom
//! properties. The manifest is read from and written to an ordered YAML mapping; the
//! text framing around that mapping lives in [`crate::format`].
//!
//! Recognised keys are `uti`, `id`, `title`, `platforms` (or the older `platform`)
//! and `packages`. Every other key is kept as a custom property, in the order it was
//! read, so that manifests written by newer clients survive a load/save cycle.

use crate::error::{Result, WorkbookError};
use crate::packages::{PackageReference, PackageReferenceList};
use serde_yaml::{Mapping, Number, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub const WORKBOOK_UTI: &str = "com.xamarin.workbook";

const KEY_UTI: &str = "uti";
const KEY_ID: &str = "id";
const KEY_TITLE: &str = "title";
const KEY_PLATFORMS: &str = "platforms";
const KEY_PLATFORM: &str = "platform";
const KEY_PACKAGES: &str = "packages";

/// A platform a workbook can run against. Names compare case-insensitively; names
/// this version does not know are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlatformTarget {
    Ios,
    MacNet45,
    MacMobile,
    Android,
    Wpf,
    Console,
    DotNetCore,
    Other(String),
}

impl PlatformTarget {
    const KNOWN: [PlatformTarget; 7] = [
        PlatformTarget::Ios,
        PlatformTarget::MacNet45,
        PlatformTarget::MacMobile,
        PlatformTarget::Android,
        PlatformTarget::Wpf,
        PlatformTarget::Console,
        PlatformTarget::DotNetCore,
    ];

    pub fn name(&self) -> &str {
        match self {
            PlatformTarget::Ios => "iOS",
            PlatformTarget::MacNet45 => "MacNet45",
            PlatformTarget::MacMobile => "MacMobile",
            PlatformTarget::Android => "Android",
            PlatformTarget::Wpf => "WPF",
            PlatformTarget::Console => "Console",
            PlatformTarget::DotNetCore => "DotNetCore",
            PlatformTarget::Other(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, PlatformTarget::Other(_))
    }

    /// Parses a platform name; blank names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let known = Self::KNOWN
            .iter()
            .find(|known| known.name().eq_ignore_ascii_case(name))
            .cloned();
        Some(known.unwrap_or_else(|| PlatformTarget::Other(name.to_string())))
    }
}

impl fmt::Display for PlatformTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A custom manifest property. Only scalars are supported.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Bool(bool),
    Number(PropertyNumber),
}

/// A numeric property and the text it is written as. Numbers read from a page
/// keep their source text, so `1.10` is not rewritten as `1.1`.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyNumber {
    value: Number,
    text: String,
}

impl PropertyNumber {
    pub fn value(&self) -> &Number {
        &self.value
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Uses `text` when it is a YAML number equal to `value`.
    fn with_literal(value: Number, text: Option<&str>) -> Self {
        match text {
            Some(text) if literal_matches(text, &value) => Self {
                text: text.to_string(),
                value,
            },
            _ => Self::from(value),
        }
    }
}

impl From<Number> for PropertyNumber {
    fn from(value: Number) -> Self {
        Self {
            text: value.to_string(),
            value,
        }
    }
}

impl PropertyValue {
    fn from_yaml(key: &str, value: Value, literal: Option<&str>) -> Result<Self> {
        match value {
            Value::String(s) => Ok(PropertyValue::String(s)),
            Value::Bool(b) => Ok(PropertyValue::Bool(b)),
            Value::Number(n) => Ok(PropertyValue::Number(PropertyNumber::with_literal(n, literal))),
            Value::Null => Err(WorkbookError::format(format!(
                "manifest property '{}' has no value",
                key
            ))),
            _ => Err(WorkbookError::format(format!(
                "manifest property '{}' must be a string, boolean or number",
                key
            ))),
        }
    }

    fn to_yaml(&self) -> Value {
        match self {
            PropertyValue::String(s) => Value::String(s.clone()),
            PropertyValue::Bool(b) => Value::Bool(*b),
            PropertyValue::Number(n) => Value::Number(n.value.clone()),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => f.write_str(s),
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Number(n) => f.write_str(&n.text),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Number(Number::from(value).into())
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(Number::from(value).into())
    }
}

/// Source text of the numeric scalars in a front matter block. YAML parsing keeps
/// only the value of a number, and `9.10` and `9.1` are different package versions.
#[derive(Debug, Default)]
pub(crate) struct NumberLiterals {
    /// Plain scalar text of top-level keys.
    pub(crate) properties: Vec<(String, String)>,
    /// Text of each `packages` entry's `version`, by entry position.
    pub(crate) versions: Vec<Option<String>>,
}

impl NumberLiterals {
    fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, text)| text.as_str())
    }

    fn version(&self, index: usize) -> Option<&str> {
        self.versions.get(index)?.as_deref()
    }
}

/// True if `text` reads back as the YAML number `value`.
fn literal_matches(text: &str, value: &Number) -> bool {
    matches!(serde_yaml::from_str::<Value>(text), Ok(Value::Number(n)) if n == *value)
}

/// Custom properties in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    entries: Vec<(String, PropertyValue)>,
}

impl Properties {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Inserts or replaces a property. Replacing keeps the original position.
    /// Keys reserved for the manifest's own fields are refused.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Result<Option<PropertyValue>> {
        let key = key.into();
        if is_reserved_key(&key) {
            return Err(WorkbookError::InvalidOperation(format!(
                "'{}' is a reserved manifest key",
                key
            )));
        }
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Ok(Some(std::mem::replace(existing, value))),
            None => {
                self.entries.push((key, value));
                Ok(None)
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

fn is_reserved_key(key: &str) -> bool {
    [
        KEY_UTI,
        KEY_ID,
        KEY_TITLE,
        KEY_PLATFORMS,
        KEY_PLATFORM,
        KEY_PACKAGES,
    ]
    .contains(&key)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    id: Uuid,
    uti: String,
    title: Option<String>,
    platform_targets: Vec<PlatformTarget>,
    pub packages: PackageReferenceList,
    pub properties: Properties,
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}

impl Manifest {
    /// A fresh manifest with a newly generated id.
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    pub fn with_id(id: Uuid) -> Self {
        Self {
            id,
            uti: WORKBOOK_UTI.to_string(),
            title: None,
            platform_targets: Vec::new(),
            packages: PackageReferenceList::new(),
            properties: Properties::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn uti(&self) -> &str {
        &self.uti
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Sets the title. Surrounding whitespace is dropped and a blank title clears it.
    pub fn set_title(&mut self, title: Option<&str>) {
        self.title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
    }

    pub fn platform_targets(&self) -> &[PlatformTarget] {
        &self.platform_targets
    }

    /// Adds a platform unless it is already present. Returns true if it was added.
    pub fn add_platform_target(&mut self, platform: PlatformTarget) -> bool {
        if self.platform_targets.contains(&platform) {
            return false;
        }
        self.platform_targets.push(platform);
        true
    }

    pub fn set_platform_targets(&mut self, platforms: impl IntoIterator<Item = PlatformTarget>) {
        self.platform_targets.clear();
        for platform in platforms {
            self.add_platform_target(platform);
        }
    }

    /// Builds a manifest from a mapping. Numbers are taken at their value; a
    /// numeric package version becomes that number's canonical text.
    pub fn from_mapping(mapping: Mapping) -> Result<Self> {
        Self::build(mapping, None)
    }

    /// Builds a manifest from front matter, keeping the source text of numbers.
    /// A fractional version whose text cannot be recovered is an error rather
    /// than a silently different version.
    pub(crate) fn from_front_matter(mapping: Mapping, literals: &NumberLiterals) -> Result<Self> {
        Self::build(mapping, Some(literals))
    }

    fn build(mapping: Mapping, literals: Option<&NumberLiterals>) -> Result<Self> {
        let mut id = None;
        let mut uti = None;
        let mut manifest = Manifest::with_id(Uuid::nil());

        for (key, value) in mapping {
            let key = match key {
                Value::String(key) => key,
                other => {
                    return Err(WorkbookError::format(format!(
                        "manifest keys must be strings, found {}",
                        describe(&other)
                    )))
                }
            };

            match key.as_str() {
                KEY_UTI => uti = Some(expect_string(&key, value)?),
                KEY_ID => id = Some(parse_id(&expect_string(&key, value)?)?),
                KEY_TITLE => match value {
                    Value::Null => {}
                    value => manifest.set_title(Some(&expect_string(&key, value)?)),
                },
                KEY_PLATFORMS | KEY_PLATFORM => {
                    for platform in read_platforms(&key, value)? {
                        manifest.add_platform_target(platform);
                    }
                }
                KEY_PACKAGES => {
                    for package in read_packages(value, literals)? {
                        manifest.packages.add_or_update(package);
                    }
                }
                _ => {
                    let literal = literals.and_then(|literals| literals.property(&key));
                    let value = PropertyValue::from_yaml(&key, value, literal)?;
                    manifest.properties.entries.push((key, value));
                }
            }
        }

        match uti {
            Some(uti) if uti.eq_ignore_ascii_case(WORKBOOK_UTI) => manifest.uti = uti,
            Some(uti) => {
                return Err(WorkbookError::format(format!(
                    "unsupported manifest uti '{}'",
                    uti
                )))
            }
            None => {
                return Err(WorkbookError::format(format!(
                    "manifest is missing '{}'",
                    KEY_UTI
                )))
            }
        }

        manifest.id = id.unwrap_or_else(Uuid::new_v4);
        Ok(manifest)
    }

    /// The mapping written as front matter: fixed fields first, then custom
    /// properties in insertion order.
    pub fn to_mapping(&self) -> Mapping {
        let mut mapping = Mapping::new();
        mapping.insert(KEY_UTI.into(), self.uti.clone().into());
        mapping.insert(KEY_ID.into(), self.id.to_string().into());

        if let Some(title) = &self.title {
            mapping.insert(KEY_TITLE.into(), title.clone().into());
        }

        if !self.platform_targets.is_empty() {
            let platforms = self
                .platform_targets
                .iter()
                .map(|p| Value::String(p.name().to_string()))
                .collect();
            mapping.insert(KEY_PLATFORMS.into(), Value::Sequence(platforms));
        }

        let packages: Vec<Value> = self.packages.explicit().map(package_to_yaml).collect();
        if !packages.is_empty() {
            mapping.insert(KEY_PACKAGES.into(), Value::Sequence(packages));
        }

        for (key, value) in self.properties.iter() {
            mapping.insert(key.into(), value.to_yaml());
        }

        mapping
    }
}

fn package_to_yaml(package: &PackageReference) -> Value {
    let mut entry = Mapping::new();
    entry.insert("id".into(), package.id().as_str().into());
    if let Some(range) = package.original_range_string() {
        entry.insert("version".into(), range.into());
    }
    Value::Mapping(entry)
}

fn parse_id(text: &str) -> Result<Uuid> {
    Uuid::from_str(text.trim())
        .map_err(|e| WorkbookError::format(format!("invalid manifest id '{}': {}", text, e)))
}

fn expect_string(key: &str, value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(WorkbookError::format(format!(
            "manifest key '{}' must be a string, found {}",
            key,
            describe(&other)
        ))),
    }
}

fn read_platforms(key: &str, value: Value) -> Result<Vec<PlatformTarget>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(name) => Ok(PlatformTarget::parse(&name).into_iter().collect()),
        Value::Sequence(items) => {
            let mut platforms = Vec::new();
            for item in items {
                platforms.extend(PlatformTarget::parse(&expect_string(key, item)?));
            }
            Ok(platforms)
        }
        other => Err(WorkbookError::format(format!(
            "manifest key '{}' must be a platform name or a list, found {}",
            key,
            describe(&other)
        ))),
    }
}

fn read_packages(value: Value, literals: Option<&NumberLiterals>) -> Result<Vec<PackageReference>> {
    let items = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Sequence(items) => items,
        other => {
            return Err(WorkbookError::format(format!(
                "manifest packages must be a list, found {}",
                describe(&other)
            )))
        }
    };

    let mut packages = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let entry = match item {
            Value::Mapping(entry) => entry,
            other => {
                return Err(WorkbookError::format(format!(
                    "package entries must be mappings, found {}",
                    describe(&other)
                )))
            }
        };

        let id = match entry.get("id") {
            Some(Value::String(id)) if !id.trim().is_empty() => id.clone(),
            _ => return Err(WorkbookError::format("package entry is missing an id")),
        };

        let version = match entry.get("version") {
            None | Some(Value::Null) => None,
            Some(Value::String(v)) => Some(v.clone()),
            Some(Value::Number(n)) => Some(version_text(&id, n, index, literals)?),
            Some(other) => {
                return Err(WorkbookError::format(format!(
                    "package '{}' has an invalid version ({})",
                    id,
                    describe(other)
                )))
            }
        };

        packages.push(PackageReference::new(id, version.as_deref())?);
    }
    Ok(packages)
}

fn version_text(
    id: &str,
    version: &Number,
    index: usize,
    literals: Option<&NumberLiterals>,
) -> Result<String> {
    let Some(literals) = literals else {
        return Ok(version.to_string());
    };
    match literals.version(index) {
        Some(text) if literal_matches(text, version) => Ok(text.to_string()),
        _ if version.is_f64() => Err(WorkbookError::format(format!(
            "package '{}' has a numeric version ({}); quote it to keep its exact text",
            id, version
        ))),
        _ => Ok(version.to_string()),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "2b4bbf2c-3f5d-4d4a-8c8a-4f0a6a9e4e11";

    fn mapping(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_platform_names_are_case_insensitive() {
        assert_eq!(PlatformTarget::parse("ios"), Some(PlatformTarget::Ios));
        assert_eq!(PlatformTarget::parse("wpf"), Some(PlatformTarget::Wpf));
        assert_eq!(
            PlatformTarget::parse("Tizen"),
            Some(PlatformTarget::Other("Tizen".into()))
        );
        assert_eq!(PlatformTarget::parse("  "), None);
        assert_eq!(PlatformTarget::Ios.to_string(), "iOS");
    }

    #[test]
    fn test_reads_recognised_keys() {
        let manifest = Manifest::from_mapping(mapping(&format!(
            "uti: com.xamarin.workbook\nid: {ID}\ntitle: '  Hello  '\nplatforms:\n- iOS\n- android\n- IOS\n"
        )))
        .unwrap();

        assert_eq!(manifest.id().to_string(), ID);
        assert_eq!(manifest.title(), Some("Hello"));
        assert_eq!(
            manifest.platform_targets(),
            &[PlatformTarget::Ios, PlatformTarget::Android]
        );
        assert!(manifest.properties.is_empty());
    }

    #[test]
    fn test_singular_platform_key() {
        let manifest =
            Manifest::from_mapping(mapping("uti: com.xamarin.workbook\nplatform: Console\n")).unwrap();
        assert_eq!(manifest.platform_targets(), &[PlatformTarget::Console]);
    }

    #[test]
    fn test_missing_id_is_synthesised() {
        let manifest = Manifest::from_mapping(mapping("uti: com.xamarin.workbook\n")).unwrap();
        assert!(!manifest.id().is_nil());
    }

    #[test]
    fn test_malformed_id_is_rejected() {
        let err = Manifest::from_mapping(mapping("uti: com.xamarin.workbook\nid: not-a-guid\n"))
            .unwrap_err();
        assert!(err.to_string().contains("invalid manifest id"));
    }

    #[test]
    fn test_uti_is_checked() {
        assert!(Manifest::from_mapping(mapping("uti: COM.XAMARIN.WORKBOOK\n")).is_ok());
        assert!(Manifest::from_mapping(mapping("uti: com.example.other\n")).is_err());
        assert!(Manifest::from_mapping(mapping("title: no uti\n")).is_err());
    }

    #[test]
    fn test_custom_properties_keep_type_and_order() {
        let manifest = Manifest::from_mapping(mapping(
            "uti: com.xamarin.workbook\nzeta: one\nalpha: true\ncount: 3\nratio: 0.5\n",
        ))
        .unwrap();

        let keys: Vec<&str> = manifest.properties.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["zeta", "alpha", "count", "ratio"]);
        assert_eq!(manifest.properties.get("alpha"), Some(&PropertyValue::Bool(true)));
        assert_eq!(manifest.properties.get("count"), Some(&PropertyValue::from(3i64)));
        assert_eq!(manifest.properties.get("zeta"), Some(&PropertyValue::from("one")));
    }

    #[test]
    fn test_nested_and_null_properties_are_rejected() {
        for yaml in [
            "uti: com.xamarin.workbook\nnested:\n  a: 1\n",
            "uti: com.xamarin.workbook\nlist: [1, 2]\n",
            "uti: com.xamarin.workbook\nempty:\n",
        ] {
            assert!(Manifest::from_mapping(mapping(yaml)).is_err(), "{}", yaml);
        }
    }

    #[test]
    fn test_packages_accept_string_and_number_versions() {
        let manifest = Manifest::from_mapping(mapping(
            "uti: com.xamarin.workbook\npackages:\n- id: A\n  version: '[9,10)'\n- id: B\n  version: 2.5\n- id: C\n",
        ))
        .unwrap();

        let a = manifest.packages.get("a").unwrap();
        assert_eq!(a.original_range_string(), Some("[9,10)"));
        assert_eq!(a.normalized_range_string(), Some("[9.0.0, 10.0.0)"));
        assert_eq!(
            manifest.packages.get("B").unwrap().original_range_string(),
            Some("2.5")
        );
        assert!(manifest.packages.get("C").unwrap().range().is_none());
    }

    #[test]
    fn test_to_mapping_orders_fixed_fields_first() {
        let mut manifest = Manifest::with_id(ID.parse().unwrap());
        manifest.properties.insert("custom", "value").unwrap();
        manifest.set_title(Some("Title"));
        manifest.add_platform_target(PlatformTarget::Console);
        manifest
            .packages
            .add_or_update(PackageReference::new("Pkg", Some("1.0")).unwrap());
        manifest
            .packages
            .add_or_update(PackageReference::new("Dep", Some("2.0")).unwrap().transitive());

        let yaml = serde_yaml::to_string(&manifest.to_mapping()).unwrap();
        assert_eq!(
            yaml,
            format!(
                "uti: com.xamarin.workbook\nid: {ID}\ntitle: Title\nplatforms:\n- Console\npackages:\n- id: Pkg\n  version: '1.0'\ncustom: value\n"
            )
        );
    }

    #[test]
    fn test_reserved_property_keys_are_refused() {
        let mut properties = Properties::default();
        assert!(properties.insert("packages", "x").is_err());
        assert_eq!(properties.insert("a", 1i64).unwrap(), None);
        assert_eq!(properties.insert("a", 2i64).unwrap(), Some(PropertyValue::from(1i64)));
    }
}
