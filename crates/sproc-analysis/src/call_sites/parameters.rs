//! Static reading of parameter-map arguments.
//!
//! Recognized shapes:
//!
//! ```text
//! new Dictionary<string, object> { ["p_UserID"] = user, { "p_Position", 3 } }
//! new() { ["p_UserID"] = user }
//! parameters            // a local declared earlier with one of the above
//! null
//! ```
//!
//! A local may also be filled after its declaration with
//! `parameters.Add("k", v)` or `parameters["k"] = v`.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::syntax::{collapse_whitespace, find_closing, find_top_level, is_identifier, string_literal, split_top_level};
use super::types::ParameterSource;

static INDEXER_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)^\[\s*(@?"(?:[^"\\]|\\.|"")*")\s*\]\s*=\s*(.+)$"#).expect("valid indexer entry regex")
});

static PAIR_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)^\{\s*(@?"(?:[^"\\]|\\.|"")*")\s*,\s*(.+?)\s*\}$"#).expect("valid pair entry regex")
});

/// Parameter map read from a call argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParameterMap {
    pub entries: BTreeMap<String, String>,
    pub source: ParameterSource,
}

impl ParameterMap {
    fn empty(source: ParameterSource) -> Self {
        Self {
            entries: BTreeMap::new(),
            source,
        }
    }
}

/// Read the map passed as `argument` to a call at byte `call_offset` of
/// `source`. `Err` carries the reason the map could not be read, together
/// with the `Unresolved` placeholder the call must still carry.
pub(crate) fn read_parameter_map(
    argument: Option<&str>,
    source: &str,
    call_offset: usize,
) -> Result<ParameterMap, (ParameterMap, String)> {
    let Some(argument) = argument.map(str::trim).filter(|a| !a.is_empty()) else {
        return Ok(ParameterMap::empty(ParameterSource::None));
    };
    let unresolved = |reason: String| (ParameterMap::empty(ParameterSource::Unresolved), reason);

    if argument == "null" || argument == "default" {
        return Ok(ParameterMap::empty(ParameterSource::None));
    }

    let is_new = argument
        .strip_prefix("new")
        .is_some_and(|rest| rest.starts_with(|c: char| c.is_whitespace() || c == '(' || c == '{'));
    if is_new {
        return initializer_entries(argument)
            .map(|entries| ParameterMap {
                entries,
                source: ParameterSource::Inline,
            })
            .map_err(unresolved);
    }

    if is_identifier(argument) {
        return resolve_variable(argument, &source[..call_offset.min(source.len())])
            .map(|entries| ParameterMap {
                entries,
                source: ParameterSource::Variable(argument.to_string()),
            })
            .map_err(unresolved);
    }

    Err(unresolved(format!(
        "parameter map '{}' is not a dictionary initializer or local variable",
        collapse_whitespace(argument)
    )))
}

/// Entries of the collection initializer in a `new ...` expression. An
/// expression without an initializer is an empty map.
fn initializer_entries(expression: &str) -> Result<BTreeMap<String, String>, String> {
    let mut entries = BTreeMap::new();
    let Some(open) = find_top_level(expression, '{') else {
        return Ok(entries);
    };
    let close = find_closing(expression, open).ok_or_else(|| "unterminated initializer".to_string())?;

    for entry in split_top_level(&expression[open + 1..close]) {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let caps = INDEXER_ENTRY
            .captures(entry)
            .or_else(|| PAIR_ENTRY.captures(entry))
            .ok_or_else(|| format!("unrecognized initializer entry '{}'", collapse_whitespace(entry)))?;
        let key = caps
            .get(1)
            .and_then(|m| string_literal(m.as_str()))
            .ok_or_else(|| format!("initializer key in '{}' is not a string literal", collapse_whitespace(entry)))?;
        let value = caps.get(2).map_or(String::new(), |m| collapse_whitespace(m.as_str()));
        entries.insert(key, value);
    }
    Ok(entries)
}

/// Resolve a local from the last `name = new ...` before the call, plus any
/// `Add` or indexer assignments between that declaration and the call.
fn resolve_variable(name: &str, before_call: &str) -> Result<BTreeMap<String, String>, String> {
    let escaped = regex::escape(name);
    let declaration = Regex::new(&format!(r"(?:^|[^\w.]){escaped}\s*=\s*(new\b)"))
        .map_err(|e| e.to_string())?;

    let start = declaration
        .captures_iter(before_call)
        .filter_map(|c| c.get(1))
        .last()
        .map(|m| m.start())
        .ok_or_else(|| format!("no initialization of '{name}' found before the call"))?;

    let statement_end = find_top_level(&before_call[start..], ';')
        .map(|i| start + i)
        .unwrap_or(before_call.len());
    let mut entries = initializer_entries(&before_call[start..statement_end])?;

    let tail = &before_call[statement_end..];
    let add = Regex::new(&format!(
        r#"(?:^|[^\w.]){escaped}\s*\.\s*(?:Add|TryAdd)\s*\(\s*(@?"(?:[^"\\]|\\.|"")*")\s*,"#
    ))
    .map_err(|e| e.to_string())?;
    for caps in add.captures_iter(tail) {
        let (Some(key), Some(whole)) = (caps.get(1), caps.get(0)) else {
            continue;
        };
        let Some(key) = string_literal(key.as_str()) else {
            continue;
        };
        let open = tail[..whole.end()].rfind('(').unwrap_or(whole.start());
        let value = find_closing(tail, open)
            .map(|close| collapse_whitespace(&tail[whole.end()..close]))
            .unwrap_or_default();
        entries.insert(key, value);
    }

    let indexer = Regex::new(&format!(
        r#"(?:^|[^\w.]){escaped}\s*\[\s*(@?"(?:[^"\\]|\\.|"")*")\s*\]\s*=\s*([^;]+);"#
    ))
    .map_err(|e| e.to_string())?;
    for caps in indexer.captures_iter(tail) {
        if let (Some(key), Some(value)) = (caps.get(1).and_then(|m| string_literal(m.as_str())), caps.get(2)) {
            entries.insert(key, collapse_whitespace(value.as_str()));
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_indexer_and_pair_entries() {
        let map = read_parameter_map(
            Some(r#"new Dictionary<string, object> { ["p_UserID"] = userId, { "p_Position", pos + 1 }, }"#),
            "",
            0,
        )
        .unwrap();
        assert_eq!(map.source, ParameterSource::Inline);
        assert_eq!(map.entries.get("p_UserID").map(String::as_str), Some("userId"));
        assert_eq!(map.entries.get("p_Position").map(String::as_str), Some("pos + 1"));
    }

    #[test]
    fn null_and_absent_maps_are_none() {
        assert_eq!(read_parameter_map(None, "", 0).unwrap().source, ParameterSource::None);
        assert_eq!(read_parameter_map(Some("null"), "", 0).unwrap().source, ParameterSource::None);
    }

    #[test]
    fn variable_with_later_additions() {
        let source = r#"
            var parameters = new Dictionary<string, object>
            {
                ["p_InventoryId"] = inventoryId
            };
            parameters.Add("p_Notes", noteText ?? string.Empty);
            parameters["p_User"] = user;
            CALL
        "#;
        let offset = source.find("CALL").unwrap();
        let map = read_parameter_map(Some("parameters"), source, offset).unwrap();
        assert_eq!(map.source, ParameterSource::Variable("parameters".into()));
        assert_eq!(map.entries.len(), 3);
        assert_eq!(map.entries["p_Notes"], "noteText ?? string.Empty");
    }

    #[test]
    fn unknown_variable_is_unresolved() {
        let (map, reason) = read_parameter_map(Some("args"), "var x = 1;", 10).unwrap_err();
        assert_eq!(map.source, ParameterSource::Unresolved);
        assert!(map.entries.is_empty());
        assert!(reason.contains("args"));
    }

    #[test]
    fn method_call_argument_is_unresolved() {
        let (map, _) = read_parameter_map(Some("BuildParameters(id)"), "", 0).unwrap_err();
        assert_eq!(map.source, ParameterSource::Unresolved);
    }
}
