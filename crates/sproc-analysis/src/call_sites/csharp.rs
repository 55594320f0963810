//! Gateway call locator over the tree-sitter C# grammar.

use sproc_core::errors::ExtractionError;
use tree_sitter::{Node, Parser, Query, QueryCursor, StreamingIterator};

use super::types::{GatewayPattern, RawCall};

const CALL_QUERY: &str = r#"
(invocation_expression
    function: (member_access_expression
        expression: (_) @receiver
        name: (_) @method
    )
    arguments: (argument_list) @arguments
) @call
"#;

/// Finds `Receiver.Method(...)` invocations in a C# syntax tree.
pub(crate) struct CSharpCallLocator {
    parser: Parser,
    call_query: Query,
}

impl CSharpCallLocator {
    pub fn new() -> Result<Self, ExtractionError> {
        let mut parser = Parser::new();
        let language = tree_sitter_c_sharp::LANGUAGE;
        parser
            .set_language(&language.into())
            .map_err(|e| ExtractionError::Grammar {
                message: format!("failed to set language: {e}"),
            })?;

        let call_query = Query::new(&language.into(), CALL_QUERY).map_err(|e| ExtractionError::Grammar {
            message: format!("failed to create call query: {e}"),
        })?;

        Ok(Self { parser, call_query })
    }

    /// Gateway calls in `source`, ordered by position. `None` when the
    /// source does not parse cleanly and the caller should fall back to
    /// the lexical locator.
    pub fn locate(&mut self, source: &str, pattern: &GatewayPattern) -> Option<Vec<RawCall>> {
        let tree = self.parser.parse(source, None)?;
        let root = tree.root_node();
        if root.has_error() {
            return None;
        }

        let bytes = source.as_bytes();
        let names = self.call_query.capture_names();
        let mut cursor = QueryCursor::new();
        let mut calls = Vec::new();

        let mut matches = cursor.matches(&self.call_query, root, bytes);
        while let Some(m) = matches.next() {
            let mut call: Option<Node<'_>> = None;
            let mut receiver = "";
            let mut method = "";
            let mut arguments: Option<Node<'_>> = None;

            for capture in m.captures.iter() {
                let node = capture.node;
                match names[capture.index as usize] {
                    "call" => call = Some(node),
                    "receiver" => receiver = node.utf8_text(bytes).unwrap_or(""),
                    "method" => method = node.utf8_text(bytes).unwrap_or(""),
                    "arguments" => arguments = Some(node),
                    _ => {}
                }
            }

            let (Some(call), Some(arguments)) = (call, arguments) else {
                continue;
            };
            if !pattern.matches(receiver, method) {
                continue;
            }

            let mut walk = arguments.walk();
            let argument_texts = arguments
                .named_children(&mut walk)
                .filter(|child| child.kind() == "argument")
                .map(|child| child.utf8_text(bytes).unwrap_or("").to_string())
                .collect();

            calls.push(RawCall {
                offset: call.start_byte(),
                line: call.start_position().row + 1,
                method: method.split('<').next().unwrap_or(method).trim().to_string(),
                arguments: argument_texts,
            });
        }

        calls.sort_by_key(|c| c.offset);
        Some(calls)
    }
}
