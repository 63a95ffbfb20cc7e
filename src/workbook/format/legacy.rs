//! The JSON manifest block used by early workbooks.
//!
//! The block is a ```` ```json ```` fence on the first line of the page. It is only
//! ever read; its contents are translated into the same mapping shape as YAML front
//! matter and the page is written back with YAML.

use crate::error::{Result, WorkbookError};
use serde_json::{Map, Value as JsonValue};
use serde_yaml::{Mapping, Value};

pub(crate) const MARKER: &str = "```json";
const FENCE: &str = "```";

/// Parses the legacy block at the top of `lines`. Returns the equivalent front
/// matter mapping and the number of lines consumed.
pub(crate) fn read(lines: &[&str]) -> Result<(Mapping, usize)> {
    let close = lines
        .iter()
        .skip(1)
        .position(|line| *line == FENCE)
        .map(|p| p + 1)
        .ok_or_else(|| WorkbookError::format_at(1, "json manifest is missing its closing fence"))?;

    let json = lines[1..close].join("\n");
    let value: JsonValue = serde_json::from_str(&json).map_err(|e| {
        WorkbookError::format_at(e.line() + 1, format!("invalid json manifest: {}", e))
    })?;
    let JsonValue::Object(object) = value else {
        return Err(WorkbookError::format_at(2, "json manifest must be an object"));
    };

    Ok((translate(&object), close + 1))
}

fn translate(object: &Map<String, JsonValue>) -> Mapping {
    let mut mapping = Mapping::new();

    if let Some(JsonValue::String(uti)) = object.get("uti") {
        mapping.insert("uti".into(), uti.as_str().into());
    }

    if let Some(platform) = read_platform(object) {
        mapping.insert("platform".into(), platform.into());
    }

    let packages = read_packages(object.get("packages"));
    if !packages.is_empty() {
        mapping.insert("packages".into(), Value::Sequence(packages));
    }

    mapping
}

fn read_platform(object: &Map<String, JsonValue>) -> Option<String> {
    if let Some(JsonValue::String(platform)) = object.get("platform") {
        return Some(platform.clone());
    }
    match object.get("sdk")? {
        JsonValue::String(sdk) => Some(sdk.clone()),
        JsonValue::Object(sdk) => sdk.get("flavor")?.as_str().map(str::to_string),
        _ => None,
    }
}

fn read_packages(packages: Option<&JsonValue>) -> Vec<Value> {
    match packages {
        Some(JsonValue::Array(items)) => items
            .iter()
            .filter_map(|item| {
                let id = item.get("id")?.as_str()?;
                Some(package(id, item.get("version").and_then(JsonValue::as_str)))
            })
            .collect(),
        Some(JsonValue::Object(items)) => items
            .iter()
            .map(|(id, version)| package(id, version.as_str()))
            .collect(),
        _ => Vec::new(),
    }
}

fn package(id: &str, version: Option<&str>) -> Value {
    let mut entry = Mapping::new();
    entry.insert("id".into(), id.into());
    if let Some(version) = version {
        entry.insert("version".into(), version.into());
    }
    Value::Mapping(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_text(text: &str) -> Result<(Mapping, usize)> {
        let lines: Vec<&str> = text.split('\n').collect();
        read(&lines)
    }

    #[test]
    fn test_reads_platform_and_package_list() {
        let (mapping, consumed) = read_text(
            "```json\n{\"uti\":\"com.xamarin.workbook\",\"platform\":\"iOS\",\"packages\":[{\"id\":\"Newtonsoft.Json\",\"version\":\"9.0.1\"}]}\n```\n\nBody",
        )
        .unwrap();

        assert_eq!(consumed, 3);
        assert_eq!(mapping.get("platform"), Some(&Value::from("iOS")));
        let yaml = serde_yaml::to_string(&mapping).unwrap();
        assert_eq!(
            yaml,
            "uti: com.xamarin.workbook\nplatform: iOS\npackages:\n- id: Newtonsoft.Json\n  version: 9.0.1\n"
        );
    }

    #[test]
    fn test_reads_sdk_flavor_and_package_map() {
        let (mapping, _) = read_text(
            "```json\n{\n  \"uti\": \"com.xamarin.workbook\",\n  \"sdk\": { \"flavor\": \"Android\" },\n  \"packages\": { \"Xamarin.Forms\": \"2.3.4\" }\n}\n```",
        )
        .unwrap();

        assert_eq!(mapping.get("platform"), Some(&Value::from("Android")));
        let packages = mapping.get("packages").and_then(Value::as_sequence).unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].get("id"), Some(&Value::from("Xamarin.Forms")));
    }

    #[test]
    fn test_invalid_json_is_a_format_error() {
        let err = read_text("```json\n{\"uti\": \n```").unwrap_err();
        assert!(matches!(err, WorkbookError::Format { .. }));
    }
}
