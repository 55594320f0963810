//! Regex-based gateway call locator for sources the grammar rejects.

use regex::Regex;

use super::syntax::{code_chars, find_closing, line_of, split_top_level};
use super::types::{GatewayPattern, RawCall};

pub(crate) struct LexicalCallLocator {
    call: Option<Regex>,
}

impl LexicalCallLocator {
    pub fn new(pattern: &GatewayPattern) -> Self {
        let alternation = |names: &[String]| {
            names
                .iter()
                .map(|n| regex::escape(n))
                .collect::<Vec<_>>()
                .join("|")
        };
        let receivers = if pattern.receivers.is_empty() {
            r"[A-Za-z_]\w*".to_string()
        } else {
            alternation(&pattern.receivers)
        };
        let methods = alternation(&pattern.methods);

        let call = Regex::new(&format!(
            r"\b(?:{receivers})\s*\.\s*({methods})\b\s*(?:<[^()]*?>)?\s*\("
        ))
        .map_err(|e| tracing::warn!(error = %e, "gateway call pattern failed to compile"))
        .ok();
        Self { call }
    }

    /// Gateway calls in `source`, ignoring matches inside comments and
    /// string literals.
    pub fn locate(&self, source: &str) -> Vec<RawCall> {
        let Some(call) = &self.call else {
            return Vec::new();
        };
        let code: Vec<usize> = code_chars(source).into_iter().map(|(i, _)| i).collect();

        call.captures_iter(source)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                if code.binary_search(&whole.start()).is_err() {
                    return None;
                }
                let method = caps.get(1)?.as_str().to_string();
                let open = whole.end() - 1;
                let arguments = match find_closing(source, open) {
                    Some(close) => split_top_level(&source[open + 1..close])
                        .into_iter()
                        .map(str::trim)
                        .filter(|a| !a.is_empty())
                        .map(str::to_string)
                        .collect(),
                    None => Vec::new(),
                };
                Some(RawCall {
                    offset: whole.start(),
                    line: line_of(source, whole.start()),
                    method,
                    arguments,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_calls_outside_comments() {
        let source = r#"
            // Helper_Database_StoredProcedure.ExecuteDataTable(c, "commented", null);
            var r = await Helper_Database_StoredProcedure.ExecuteDataTable(conn, "inv_inventory_Get_All", null
        "#;
        let calls = LexicalCallLocator::new(&GatewayPattern::default()).locate(source);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].line, 3);
        assert_eq!(calls[0].method, "ExecuteDataTable");
        assert!(calls[0].arguments.is_empty());
    }

    #[test]
    fn reads_arguments() {
        let source = r#"Helper_Database_StoredProcedure.ExecuteWithStatus(conn, "x_Save", p);"#;
        let calls = LexicalCallLocator::new(&GatewayPattern::default()).locate(source);
        assert_eq!(calls[0].arguments, vec!["conn", "\"x_Save\"", "p"]);
    }
}
