//! YAML front matter delimited by `---` lines.

use crate::error::{Result, WorkbookError};
use crate::manifest::{Manifest, NumberLiterals, PropertyValue};
use serde_yaml::{Mapping, Value};

pub(crate) const DELIMITER: &str = "---";

const KEY_PACKAGES: &str = "packages";
const KEY_VERSION: &str = "version";

/// Parses the front matter at the top of `lines` into a manifest. Returns it with
/// the number of lines consumed, both delimiters included.
pub(crate) fn read_manifest(lines: &[&str]) -> Result<(Manifest, usize)> {
    let (mapping, consumed) = read(lines)?;
    let literals = number_literals(&lines[1..consumed - 1]);
    Ok((Manifest::from_front_matter(mapping, &literals)?, consumed))
}

/// Parses the front matter at the top of `lines`, whose first line is the opening
/// delimiter. Returns the mapping and the number of lines consumed, both delimiters
/// included.
pub(crate) fn read(lines: &[&str]) -> Result<(Mapping, usize)> {
    let close = lines
        .iter()
        .skip(1)
        .position(|line| *line == DELIMITER)
        .map(|p| p + 1)
        .ok_or_else(|| WorkbookError::format_at(1, "front matter is missing its closing '---'"))?;

    let yaml = lines[1..close].join("\n");
    let value: Value = serde_yaml::from_str(&yaml).map_err(|e| {
        let message = format!("invalid front matter: {}", e);
        match e.location() {
            Some(location) => WorkbookError::format_at(location.line() + 1, message),
            None => WorkbookError::format(message),
        }
    })?;

    let mapping = match value {
        Value::Mapping(mapping) => mapping,
        Value::Null => Mapping::new(),
        _ => return Err(WorkbookError::format_at(2, "front matter must be a mapping")),
    };

    Ok((mapping, close + 1))
}

/// Recovers the plain scalar text of top-level keys and of `version` keys in the
/// block-style `packages` list. Flow-style entries yield nothing.
fn number_literals(yaml: &[&str]) -> NumberLiterals {
    let mut literals = NumberLiterals::default();
    let mut in_packages = false;
    // Column of the `- ` markers and of the keys of the current package entry.
    let mut item_indent = None;
    let mut key_indent = None;

    for line in yaml {
        let content = line.trim_start();
        if content.is_empty() || content.starts_with('#') {
            continue;
        }
        let indent = line.len() - content.len();

        if indent == 0 && !content.starts_with('-') {
            in_packages = false;
            if let Some((key, value)) = plain_entry(content) {
                if key == KEY_PACKAGES {
                    in_packages = true;
                    item_indent = None;
                } else if !value.is_empty() {
                    literals.properties.push((key.to_string(), value.to_string()));
                }
            }
            continue;
        }
        if !in_packages {
            continue;
        }

        let (column, content) = match content.strip_prefix('-') {
            Some(rest)
                if item_indent.map_or(true, |item| item == indent)
                    && (rest.is_empty() || rest.starts_with(' ')) =>
            {
                item_indent = Some(indent);
                literals.versions.push(None);
                let entry = rest.trim_start();
                key_indent = None;
                (line.len() - entry.len(), entry)
            }
            _ => (indent, content),
        };
        if content.is_empty() || content.starts_with('{') {
            continue;
        }
        let key_column = *key_indent.get_or_insert(column);
        if column != key_column {
            continue;
        }
        let slot = literals.versions.last_mut();
        if let (Some((key, value)), Some(slot)) = (plain_entry(content), slot) {
            if key == KEY_VERSION && slot.is_none() && !value.is_empty() {
                *slot = Some(value.to_string());
            }
        }
    }
    literals
}

/// Splits `key: value` with a plain key, dropping a trailing comment.
fn plain_entry(content: &str) -> Option<(&str, &str)> {
    let (key, value) = content.split_once(':')?;
    if key.is_empty() || key.starts_with(['"', '\'', '?', '&', '*', '!']) {
        return None;
    }
    if !value.is_empty() && !value.starts_with([' ', '\t']) {
        return None;
    }
    let value = match value.find(" #").or_else(|| value.find("\t#")) {
        Some(comment) => &value[..comment],
        None => value,
    };
    Some((key.trim_end(), value.trim()))
}

pub(crate) fn write(manifest: &Manifest, out: &mut String) -> Result<()> {
    let mut yaml = serde_yaml::to_string(&manifest.to_mapping()).map_err(serialize_error)?;
    for (key, value) in manifest.properties.iter() {
        if let PropertyValue::Number(number) = value {
            yaml = restore_number_text(yaml, key, number.value(), number.as_str())?;
        }
    }

    out.push_str(DELIMITER);
    out.push('\n');
    out.push_str(&yaml);
    if !yaml.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(DELIMITER);
    Ok(())
}

/// Rewrites the top-level `key` line so the number keeps the text it was read as.
fn restore_number_text(
    yaml: String,
    key: &str,
    value: &serde_yaml::Number,
    text: &str,
) -> Result<String> {
    let rendered = serde_yaml::to_string(&Value::Number(value.clone())).map_err(serialize_error)?;
    let rendered = rendered.trim_end();
    if rendered == text {
        return Ok(yaml);
    }

    let mut entry = Mapping::new();
    entry.insert(key.into(), Value::Number(value.clone()));
    let line = serde_yaml::to_string(&entry).map_err(serialize_error)?;
    let line = line.trim_end();
    let Some(prefix) = line.strip_suffix(rendered) else {
        return Ok(yaml);
    };
    let replacement = format!("{}{}", prefix, text);

    let mut restored = String::with_capacity(yaml.len());
    for current in yaml.lines() {
        restored.push_str(if current == line { &replacement } else { current });
        restored.push('\n');
    }
    Ok(restored)
}

fn serialize_error(e: serde_yaml::Error) -> WorkbookError {
    WorkbookError::format(format!("could not serialize manifest: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_counts_consumed_lines() {
        let lines = ["---", "uti: com.xamarin.workbook", "---", "", "Body"];
        let (mapping, consumed) = read(&lines).unwrap();
        assert_eq!(consumed, 3);
        assert_eq!(
            mapping.get("uti"),
            Some(&Value::String("com.xamarin.workbook".into()))
        );
    }

    #[test]
    fn test_missing_closing_delimiter() {
        let lines = ["---", "uti: com.xamarin.workbook", "", "Body"];
        assert!(read(&lines).is_err());
    }

    #[test]
    fn test_invalid_yaml_reports_page_line() {
        let lines = ["---", "uti: com.xamarin.workbook", "id: [unclosed", "---"];
        match read(&lines).unwrap_err() {
            WorkbookError::Format { line, .. } => assert!(matches!(line, Some(n) if n >= 3)),
            other => panic!("unexpected error: {other}"),
        }
    }

    fn owned(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_number_literals_follow_package_entries() {
        let yaml = [
            "title: Demo",
            "rev: 1.10 # build",
            "packages:",
            "- id: A",
            "  version: '1.0'",
            "- version: 9.10",
            "  id: B",
            "- {id: C, version: 2}",
            "- id: D",
            "  meta:",
            "    version: 0.1",
            "  version: 3.50",
            "count: 07",
        ];
        let literals = number_literals(&yaml);
        assert_eq!(
            literals.versions,
            vec![
                Some("'1.0'".to_string()),
                Some("9.10".to_string()),
                None,
                Some("3.50".to_string()),
            ]
        );
        assert_eq!(
            literals.properties,
            owned(&[("title", "Demo"), ("rev", "1.10"), ("count", "07")])
        );
    }

    #[test]
    fn test_write_restores_number_text() {
        let text = "---\nuti: com.xamarin.workbook\nid: 2b4bbf2c-3f5d-4d4a-8c8a-4f0a6a9e4e11\nrev: 1.10\nratio: 0.5\n---";
        let lines: Vec<&str> = text.split('\n').collect();
        let (manifest, consumed) = read_manifest(&lines).unwrap();
        assert_eq!(consumed, lines.len());

        let mut out = String::new();
        write(&manifest, &mut out).unwrap();
        assert_eq!(out, text);
    }

    #[test]
    fn test_scalar_front_matter_is_rejected() {
        let lines = ["---", "just text", "---"];
        assert!(read(&lines).is_err());
    }
}
