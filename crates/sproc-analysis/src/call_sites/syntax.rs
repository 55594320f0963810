//! Lightweight C# text handling shared by both call locators.
//!
//! Nothing here builds a syntax tree. The helpers only know enough about
//! C# tokens (string and char literals, comments, generic argument lists)
//! to split argument lists and initializers at the right commas.

/// Characters of `text` that are code, with their byte offsets. String
/// literals, char literals, and comments are left out. A string literal
/// is reported as a single `'"'` at its opening offset so callers can
/// still see that a token stood there.
pub(crate) fn code_chars(text: &str) -> Vec<(usize, char)> {
    let mut out = Vec::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '/' if matches!(chars.peek(), Some((_, '/'))) => {
                for (_, c) in chars.by_ref() {
                    if c == '\n' {
                        out.push((i, ' '));
                        break;
                    }
                }
            }
            '/' if matches!(chars.peek(), Some((_, '*'))) => {
                chars.next();
                let mut prev = '\0';
                for (_, c) in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
                out.push((i, ' '));
            }
            '"' => {
                let before = &text[..i];
                let verbatim = before.ends_with('@') || before.ends_with("@$");
                out.push((i, '"'));
                while let Some((_, c)) = chars.next() {
                    match c {
                        '\\' if !verbatim => {
                            chars.next();
                        }
                        '"' if verbatim && matches!(chars.peek(), Some((_, '"'))) => {
                            chars.next();
                        }
                        '"' => break,
                        _ => {}
                    }
                }
            }
            '\'' => {
                out.push((i, '\''));
                while let Some((_, c)) = chars.next() {
                    match c {
                        '\\' => {
                            chars.next();
                        }
                        '\'' | '\n' => break,
                        _ => {}
                    }
                }
            }
            _ => out.push((i, c)),
        }
    }
    out
}

/// Split on commas that sit outside every bracket pair and generic
/// argument list.
pub(crate) fn split_top_level(text: &str) -> Vec<&str> {
    let code = code_chars(text);
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut k = 0;

    while k < code.len() {
        let (i, c) = code[k];
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            '<' if k > 0 && is_ident_char(code[k - 1].1) => {
                if let Some(end) = generic_end(&code, k) {
                    k = end;
                }
            }
            ',' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        k += 1;
    }
    parts.push(&text[start..]);
    parts
}

/// Index of the `>` closing a generic argument list opened at `open`, or
/// `None` when the `<` is a comparison.
fn generic_end(code: &[(usize, char)], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (k, &(_, c)) in code.iter().enumerate().skip(open) {
        match c {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                if depth == 0 {
                    return Some(k);
                }
            }
            c if is_ident_char(c) || c.is_whitespace() || matches!(c, ',' | '.' | '?' | '[' | ']') => {}
            _ => return None,
        }
    }
    None
}

/// Byte offset of the bracket closing the one at `open`.
pub(crate) fn find_closing(text: &str, open: usize) -> Option<usize> {
    let code = code_chars(&text[open..]);
    let mut depth = 0usize;
    for (i, c) in code {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Byte offset of the first code occurrence of `target` at bracket depth 0.
pub(crate) fn find_top_level(text: &str, target: char) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in code_chars(text) {
        if c == target && depth == 0 {
            return Some(i);
        }
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

/// Value of a plain or verbatim C# string literal. Interpolated strings
/// are not literals.
pub(crate) fn string_literal(text: &str) -> Option<String> {
    let text = text.trim();
    if let Some(body) = text.strip_prefix("@\"").and_then(|t| t.strip_suffix('"')) {
        return Some(body.replace("\"\"", "\""));
    }
    let body = text.strip_prefix('"')?.strip_suffix('"')?;
    let mut value = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next()? {
                'n' => value.push('\n'),
                't' => value.push('\t'),
                'r' => value.push('\r'),
                '0' => value.push('\0'),
                other => value.push(other),
            }
        } else if c == '"' {
            return None;
        } else {
            value.push(c);
        }
    }
    Some(value)
}

/// Drop a `name:` prefix from a named argument.
pub(crate) fn strip_argument_name(argument: &str) -> &str {
    let trimmed = argument.trim();
    let ident_len = trimmed
        .char_indices()
        .find(|&(_, c)| !is_ident_char(c))
        .map_or(trimmed.len(), |(i, _)| i);
    if ident_len == 0 || trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        return trimmed;
    }
    let rest = trimmed[ident_len..].trim_start();
    match rest.strip_prefix(':') {
        Some(value) if !value.starts_with(':') => value.trim(),
        _ => trimmed,
    }
}

pub(crate) fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_alphabetic()) && chars.all(is_ident_char)
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn line_of(text: &str, offset: usize) -> usize {
    text[..offset].bytes().filter(|&b| b == b'\n').count() + 1
}

fn is_ident_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}
