//! `CREATE PROCEDURE` header and parameter-list parser.
//!
//! Only headers are parsed: the name and the formal parameter list. Bodies
//! are never interpreted, so a script may contain `DELIMITER` directives,
//! triggers, or anything else between procedures.

use std::fs;
use std::iter::Peekable;
use std::str::CharIndices;
use std::sync::LazyLock;

use regex::Regex;
use sproc_core::errors::{ExtractionError, PipelineResult};

use super::catalog::DefinitionCatalog;
use super::types::{ParameterDirection, ProcedureDefinition, ProcedureParameter};
use crate::scanner::SourceFile;

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\bCREATE\s+(?:OR\s+REPLACE\s+)?",
        r#"(?:DEFINER\s*=\s*(?:`[^`]*`|'[^']*'|"[^"]*"|[A-Za-z0-9_]+(?:\(\))?)"#,
        r#"(?:\s*@\s*(?:`[^`]*`|'[^']*'|"[^"]*"|[A-Za-z0-9_.%-]+))?\s+)?"#,
        r"PROCEDURE\s+(?:IF\s+NOT\s+EXISTS\s+)?",
        r"(?:(?:`[^`]+`|[\w$]+)\s*\.\s*)?(`[^`]+`|[\w$]+)\s*(\()?",
    ))
    .expect("valid procedure header regex")
});

static PARAMETER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^(?:(INOUT|IN|OUT)\s+)?(`[^`]+`|[A-Za-z_$@][A-Za-z0-9_$@]*)\s+(\S.*)$")
        .expect("valid parameter regex")
});

/// Best-effort extractor for MySQL procedure definitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefinitionExtractor;

impl DefinitionExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract every procedure defined in one SQL source blob.
    ///
    /// Malformed definitions are skipped; each skip is recorded as a
    /// `MalformedDefinition` warning and extraction continues after it.
    pub fn extract(&self, source: &str, file: &str) -> PipelineResult<Vec<ProcedureDefinition>> {
        let mut result: PipelineResult<Vec<ProcedureDefinition>> = PipelineResult::default();
        let mut cursor = 0;

        while let Some(caps) = HEADER.captures_at(source, cursor) {
            let whole = caps.get(0).map_or(cursor..cursor + 1, |m| m.range());
            let line = line_of(source, whole.start);
            let name = unquote(caps.get(1).map_or("", |m| m.as_str())).to_string();

            if caps.get(2).is_none() {
                self.skip(&mut result, file, line, format!("procedure '{name}' has no parameter list"));
                cursor = whole.end.max(whole.start + 1);
                continue;
            }

            let Some((list, next)) = read_parameter_list(source, whole.end) else {
                self.skip(
                    &mut result,
                    file,
                    line,
                    format!("unterminated parameter list for procedure '{name}'"),
                );
                cursor = whole.end;
                continue;
            };
            cursor = next;

            match parse_parameters(&list) {
                Ok(parameters) => {
                    tracing::trace!(procedure = name.as_str(), file, parameters = parameters.len(), "extracted definition");
                    result.data.push(ProcedureDefinition {
                        name,
                        parameters,
                        source_file: file.to_string(),
                    });
                }
                Err(message) => {
                    self.skip(&mut result, file, line, format!("procedure '{name}': {message}"));
                }
            }
        }

        result
    }

    /// Extract several blobs into one catalog. A later definition of the
    /// same name replaces the earlier one with a `DuplicateDefinition` warning.
    pub fn extract_all<'a>(
        &self,
        sources: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> PipelineResult<DefinitionCatalog> {
        let mut result = PipelineResult::new(DefinitionCatalog::new());
        for (file, source) in sources {
            let extracted = self.extract(source, file);
            let definitions = result.absorb(extracted);
            register(&mut result, definitions);
        }
        result
    }

    /// Read and extract SQL files. Unreadable files are skipped with a
    /// `ReadFailed` warning.
    pub fn extract_files(&self, files: &[SourceFile]) -> PipelineResult<DefinitionCatalog> {
        let mut result = PipelineResult::new(DefinitionCatalog::new());
        for file in files {
            let source = match fs::read_to_string(&file.absolute) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(file = file.path.as_str(), error = %e, "skipping unreadable SQL file");
                    result.add_error(ExtractionError::ReadFailed {
                        path: file.path.clone(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };
            let extracted = self.extract(&source, &file.path);
            let definitions = result.absorb(extracted);
            register(&mut result, definitions);
        }

        tracing::info!(
            files = files.len(),
            procedures = result.data.len(),
            warnings = result.error_count(),
            "procedure definitions extracted"
        );
        result
    }

    fn skip<T: Default>(&self, result: &mut PipelineResult<T>, file: &str, line: usize, message: String) {
        tracing::warn!(file, line, reason = message.as_str(), "skipping malformed procedure definition");
        result.add_error(ExtractionError::MalformedDefinition {
            file: file.to_string(),
            line,
            message,
        });
    }
}

fn register(result: &mut PipelineResult<DefinitionCatalog>, definitions: Vec<ProcedureDefinition>) {
    for definition in definitions {
        let name = definition.name.clone();
        let file = definition.source_file.clone();
        if let Some(previous) = result.data.insert(definition) {
            tracing::warn!(
                procedure = name.as_str(),
                file = file.as_str(),
                previous = previous.source_file.as_str(),
                "duplicate procedure definition; keeping the later one"
            );
            result.add_error(ExtractionError::DuplicateDefinition {
                name,
                file,
                previous_file: previous.source_file,
            });
        }
    }
}

/// Read from just past an opening parenthesis to its matching close.
///
/// Returns the list text with SQL comments removed, and the byte offset
/// just past the closing parenthesis. `None` when the list never closes,
/// or when a statement terminator or `BEGIN` turns up before it does.
fn read_parameter_list(source: &str, start: usize) -> Option<(String, usize)> {
    let mut chars: Peekable<CharIndices<'_>> = source[start..].char_indices().peekable();
    let mut out = String::new();
    let mut depth = 0usize;

    while let Some((offset, c)) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                out.push(c);
                read_quoted(&mut chars, c, &mut out)?;
            }
            '-' if matches!(chars.peek(), Some((_, '-'))) => skip_line(&mut chars, &mut out),
            '#' => skip_line(&mut chars, &mut out),
            '/' if matches!(chars.peek(), Some((_, '*'))) => {
                chars.next();
                let mut prev = '\0';
                loop {
                    let (_, c) = chars.next()?;
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
                out.push(' ');
            }
            '(' => {
                depth += 1;
                out.push(c);
            }
            ')' if depth == 0 => return Some((out, start + offset + 1)),
            ')' => {
                depth -= 1;
                out.push(c);
            }
            ';' => return None,
            'b' | 'B' if starts_begin(&source[start + offset..]) && !out.ends_with(is_identifier_char) => {
                return None;
            }
            _ => out.push(c),
        }
    }
    None
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// `BEGIN` as a whole word at the start of `rest`.
fn starts_begin(rest: &str) -> bool {
    rest.get(..5).is_some_and(|word| word.eq_ignore_ascii_case("BEGIN"))
        && !rest[5..].starts_with(is_identifier_char)
}

fn read_quoted(chars: &mut Peekable<CharIndices<'_>>, quote: char, out: &mut String) -> Option<()> {
    loop {
        let (_, c) = chars.next()?;
        out.push(c);
        if c == '\\' && quote != '`' {
            let (_, escaped) = chars.next()?;
            out.push(escaped);
        } else if c == quote {
            if matches!(chars.peek(), Some(&(_, next)) if next == quote) {
                chars.next();
                out.push(quote);
            } else {
                return Some(());
            }
        }
    }
}

fn skip_line(chars: &mut Peekable<CharIndices<'_>>, out: &mut String) {
    for (_, c) in chars.by_ref() {
        if c == '\n' {
            out.push('\n');
            return;
        }
    }
}

fn parse_parameters(list: &str) -> Result<Vec<ProcedureParameter>, String> {
    if list.trim().is_empty() {
        return Ok(Vec::new());
    }

    split_top_level(list)
        .into_iter()
        .enumerate()
        .map(|(index, raw)| {
            let raw = raw.trim();
            if raw.is_empty() {
                return Err(format!("parameter {} is empty", index + 1));
            }
            let caps = PARAMETER
                .captures(raw)
                .ok_or_else(|| format!("cannot parse parameter '{}'", collapse_whitespace(raw)))?;
            let direction = caps
                .get(1)
                .and_then(|m| ParameterDirection::parse(m.as_str()))
                .unwrap_or(ParameterDirection::In);
            let name = unquote(caps.get(2).map_or("", |m| m.as_str()));
            let param_type = normalize_type(caps.get(3).map_or("", |m| m.as_str()));
            Ok(ProcedureParameter::new(name, param_type, direction))
        })
        .collect()
}

/// Split on commas outside parentheses and quotes.
fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in list.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts
}

fn unquote(identifier: &str) -> &str {
    identifier.trim().trim_matches('`')
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `DECIMAL( 10 ,\n 2 )` becomes `DECIMAL(10,2)`; other runs of whitespace
/// collapse to one space.
fn normalize_type(raw: &str) -> String {
    let collapsed = collapse_whitespace(raw);
    let mut out = String::with_capacity(collapsed.len());
    let mut chars = collapsed.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ' ' {
            let next = chars.peek().copied();
            let prev = out.chars().last();
            if matches!(next, Some('(' | ')' | ',')) || matches!(prev, Some('(' | ',')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].bytes().filter(|&b| b == b'\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_list_with_nested_parens_and_comments() {
        let source = "(IN p_Amount DECIMAL(10, 2), -- money\n OUT p_ErrorMsg VARCHAR(255) /* msg */)\nBEGIN END";
        let (list, next) = read_parameter_list(source, 1).unwrap();
        assert!(!list.contains("money"));
        assert!(!list.contains("msg */"));
        assert_eq!(&source[next..], "\nBEGIN END");
    }

    #[test]
    fn unterminated_list_is_none() {
        assert!(read_parameter_list("(IN p_a INT", 1).is_none());
    }

    #[test]
    fn list_scan_stops_at_body_or_terminator() {
        assert!(read_parameter_list("(IN p_a INT\nBEGIN SELECT 1); END", 1).is_none());
        assert!(read_parameter_list("(IN p_a INT; SELECT (1)", 1).is_none());
        let (list, _) = read_parameter_list("(IN p_begin_at DATETIME, IN p_note VARCHAR(10) DEFAULT ';')", 1).unwrap();
        assert!(list.contains("p_begin_at"));
    }

    #[test]
    fn type_whitespace_is_normalized() {
        assert_eq!(normalize_type("DECIMAL( 10 ,\n  2 )"), "DECIMAL(10,2)");
        assert_eq!(normalize_type("VARCHAR(255)   CHARSET utf8mb4"), "VARCHAR(255) CHARSET utf8mb4");
        assert_eq!(normalize_type("ENUM('a', 'b')"), "ENUM('a','b')");
    }

    #[test]
    fn split_ignores_commas_inside_parens_and_quotes() {
        let parts = split_top_level("IN a DECIMAL(10,2), IN b ENUM('x,y'), OUT c INT");
        assert_eq!(parts.len(), 3);
    }

    #[test]
    fn missing_direction_defaults_to_in() {
        let params = parse_parameters("p_UserID VARCHAR(100)").unwrap();
        assert_eq!(params[0].direction, ParameterDirection::In);
    }
}
