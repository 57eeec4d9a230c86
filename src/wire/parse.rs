//! Block wire format parser
//!
//! Delimiters are recognised by a logos lexer whose callbacks read the block
//! name and the JSON attribute object straight from the remaining input.
//! Everything between delimiters is literal markup.

use logos::{Lexer, Logos};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::block::{is_name_char, qualify_name, BlockNode, EditingMode, TemplateLock, FREEFORM_BLOCK};
use crate::parser::ast::Position;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum WireError {
    #[error("malformed block delimiter at {position}: {message}")]
    MalformedDelimiter { position: Position, message: String },

    #[error("closing delimiter for '{found}' at {position} does not match open block '{expected}'")]
    MismatchedCloser {
        expected: String,
        found: String,
        position: Position,
    },

    #[error("closing delimiter for '{found}' at {position} has no open block")]
    UnexpectedCloser { found: String, position: Position },

    #[error("block '{name}' opened at {position} is never closed")]
    UnclosedBlock { name: String, position: Position },

    #[error("block '{name}' at {position} is nested deeper than {max_depth} levels")]
    TooDeep {
        name: String,
        max_depth: usize,
        position: Position,
    },
}

impl WireError {
    pub fn position(&self) -> Position {
        match self {
            WireError::MalformedDelimiter { position, .. }
            | WireError::MismatchedCloser { position, .. }
            | WireError::UnexpectedCloser { position, .. }
            | WireError::UnclosedBlock { position, .. }
            | WireError::TooDeep { position, .. } => *position,
        }
    }
}

/// Deepest block nesting accepted by [`parse`]
///
/// Well above the template nesting limit, since wrapping text in default
/// children can add blocks that have no element of their own.
pub const DEFAULT_MAX_WIRE_DEPTH: usize = 256;

/// Error produced inside delimiter callbacks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DelimiterError(String);

#[derive(Debug, Clone, PartialEq)]
struct Opener {
    name: String,
    attrs: Map<String, Value>,
    void: bool,
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = DelimiterError)]
enum WireToken {
    #[regex(r"<!--[ \t\r\n]+wp:", open_delimiter)]
    Open(Opener),

    #[regex(r"<!--[ \t\r\n]+/wp:", close_delimiter)]
    Close(String),

    #[regex(r"[^<]+")]
    Html,

    #[token("<")]
    Lt,
}

fn name_len(rest: &str) -> usize {
    rest.find(|c: char| !is_name_char(c)).unwrap_or(rest.len())
}

fn skip_whitespace(rest: &str, pos: usize) -> usize {
    let trimmed = rest[pos..].trim_start_matches([' ', '\t', '\r', '\n']);
    rest.len() - trimmed.len()
}

fn open_delimiter(lex: &mut Lexer<WireToken>) -> Result<Opener, DelimiterError> {
    let rest = lex.remainder();
    let mut pos = name_len(rest);
    if pos == 0 {
        return Err(DelimiterError("missing block name".to_string()));
    }
    let name = qualify_name(&rest[..pos]);
    pos = skip_whitespace(rest, pos);

    let mut attrs = Map::new();
    if rest[pos..].starts_with('{') {
        let mut stream =
            serde_json::Deserializer::from_str(&rest[pos..]).into_iter::<Map<String, Value>>();
        match stream.next() {
            Some(Ok(map)) => attrs = map,
            Some(Err(e)) => {
                return Err(DelimiterError(format!("invalid block attributes: {}", e)));
            }
            None => return Err(DelimiterError("missing block attributes".to_string())),
        }
        pos += stream.byte_offset();
        pos = skip_whitespace(rest, pos);
    }

    let void = if rest[pos..].starts_with("/-->") {
        pos += 4;
        true
    } else if rest[pos..].starts_with("-->") {
        pos += 3;
        false
    } else {
        return Err(DelimiterError(format!(
            "expected '-->' after block '{}'",
            name
        )));
    };
    lex.bump(pos);
    Ok(Opener { name, attrs, void })
}

fn close_delimiter(lex: &mut Lexer<WireToken>) -> Result<String, DelimiterError> {
    let rest = lex.remainder();
    let mut pos = name_len(rest);
    if pos == 0 {
        return Err(DelimiterError("missing block name".to_string()));
    }
    let name = qualify_name(&rest[..pos]);
    pos = skip_whitespace(rest, pos);
    if !rest[pos..].starts_with("-->") {
        return Err(DelimiterError(format!(
            "expected '-->' after closing block '{}'",
            name
        )));
    }
    lex.bump(pos + 3);
    Ok(name)
}

/// Move `metadata.key`, `metadata.blockEditingMode` and `templateLock` out of
/// the attribute map into the node's control fields
fn lift_controls(block: &mut BlockNode) {
    if let Some(lock) = block.attrs.get("templateLock").and_then(TemplateLock::from_value) {
        block.lock = Some(lock);
        block.attrs.remove("templateLock");
    }
    let Some(Value::Object(metadata)) = block.attrs.get_mut("metadata") else {
        return;
    };
    let mut lifted = false;
    if let Some(Value::String(key)) = metadata.get("key") {
        block.key = Some(key.clone());
        metadata.remove("key");
        lifted = true;
    }
    let mode = metadata
        .get("blockEditingMode")
        .and_then(Value::as_str)
        .and_then(EditingMode::parse);
    if let Some(mode) = mode {
        block.editing_mode = Some(mode);
        metadata.remove("blockEditingMode");
        lifted = true;
    }
    if lifted && metadata.is_empty() {
        block.attrs.remove("metadata");
    }
}

struct Frame {
    block: BlockNode,
    start: usize,
}

/// Parse serialized blocks back into a block tree
///
/// Non-blank markup outside any block becomes a freeform block; whitespace
/// between top-level blocks is dropped.
pub fn parse(input: &str) -> Result<Vec<BlockNode>, WireError> {
    parse_with_depth(input, DEFAULT_MAX_WIRE_DEPTH)
}

/// Parse serialized blocks, rejecting blocks nested deeper than `max_depth`
pub fn parse_with_depth(input: &str, max_depth: usize) -> Result<Vec<BlockNode>, WireError> {
    let mut top: Vec<BlockNode> = Vec::new();
    let mut loose = String::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut lex = WireToken::lexer(input);

    while let Some(token) = lex.next() {
        let span = lex.span();
        match token {
            Ok(WireToken::Html) | Ok(WireToken::Lt) => match stack.last_mut() {
                Some(frame) => frame.block.push_html(lex.slice()),
                None => loose.push_str(lex.slice()),
            },
            Ok(WireToken::Open(opener)) => {
                if stack.len() >= max_depth {
                    return Err(WireError::TooDeep {
                        name: opener.name,
                        max_depth,
                        position: Position::locate(input, span.start),
                    });
                }
                let mut block = BlockNode::new(opener.name);
                block.attrs = opener.attrs.into_iter().collect();
                lift_controls(&mut block);
                if opener.void {
                    attach(&mut stack, &mut top, &mut loose, block);
                } else {
                    if stack.is_empty() {
                        flush_loose(&mut top, &mut loose);
                    }
                    stack.push(Frame {
                        block,
                        start: span.start,
                    });
                }
            }
            Ok(WireToken::Close(name)) => {
                let position = Position::locate(input, span.start);
                let Some(frame) = stack.pop() else {
                    return Err(WireError::UnexpectedCloser {
                        found: name,
                        position,
                    });
                };
                if frame.block.name != name {
                    return Err(WireError::MismatchedCloser {
                        expected: frame.block.name,
                        found: name,
                        position,
                    });
                }
                attach(&mut stack, &mut top, &mut loose, frame.block);
            }
            Err(DelimiterError(message)) => {
                return Err(WireError::MalformedDelimiter {
                    position: Position::locate(input, span.start),
                    message,
                });
            }
        }
    }

    if let Some(frame) = stack.pop() {
        return Err(WireError::UnclosedBlock {
            name: frame.block.name,
            position: Position::locate(input, frame.start),
        });
    }
    flush_loose(&mut top, &mut loose);
    Ok(top)
}

fn attach(stack: &mut [Frame], top: &mut Vec<BlockNode>, loose: &mut String, block: BlockNode) {
    match stack.last_mut() {
        Some(parent) => parent.block.push_block(block),
        None => {
            flush_loose(top, loose);
            top.push(block);
        }
    }
}

fn flush_loose(top: &mut Vec<BlockNode>, loose: &mut String) {
    let html = std::mem::take(loose);
    if !html.trim().is_empty() {
        top.push(BlockNode::new(FREEFORM_BLOCK).with_html(html));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::InnerContent;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_leaf() {
        let blocks = parse("<!-- wp:paragraph --><p>Hi</p><!-- /wp:paragraph -->").unwrap();
        assert_eq!(
            blocks,
            vec![BlockNode::new("core/paragraph").with_html("<p>Hi</p>")]
        );
    }

    #[test]
    fn test_parse_attributes_and_void() {
        let blocks = parse(r#"<!-- wp:acme/spacer {"size":3,"label":"a < b"} /-->"#).unwrap();
        assert_eq!(blocks[0].name, "acme/spacer");
        assert_eq!(blocks[0].attr("size"), Some(&json!(3)));
        assert_eq!(blocks[0].attr("label"), Some(&json!("a < b")));
        assert!(blocks[0].inner.is_empty());
    }

    #[test]
    fn test_parse_nested() {
        let src = "<!-- wp:group --><div><!-- wp:paragraph --><p>a</p><!-- /wp:paragraph --></div><!-- /wp:group -->";
        let blocks = parse(src).unwrap();
        let group = &blocks[0];
        assert_eq!(group.inner.len(), 3);
        assert_eq!(group.inner[0], InnerContent::Html("<div>".to_string()));
        assert_eq!(group.inner_blocks().next().unwrap().name, "core/paragraph");
    }

    #[test]
    fn test_parse_lifts_controls() {
        let src = r#"<!-- wp:group {"metadata":{"key":"hero","name":"Hero"},"templateLock":"contentOnly"} /-->"#;
        let block = &parse(src).unwrap()[0];
        assert_eq!(block.key.as_deref(), Some("hero"));
        assert_eq!(block.lock, Some(TemplateLock::ContentOnly));
        assert_eq!(block.attr("metadata"), Some(&json!({"name": "Hero"})));
        assert!(block.attr("templateLock").is_none());
    }

    #[test]
    fn test_whitespace_between_blocks_ignored() {
        let src = "<!-- wp:separator /-->\n\n<!-- wp:separator /-->\n";
        assert_eq!(parse(src).unwrap().len(), 2);
    }

    #[test]
    fn test_loose_html_is_freeform() {
        let blocks = parse("<p>legacy</p><!-- wp:separator /-->").unwrap();
        assert_eq!(blocks[0].name, "core/freeform");
        assert_eq!(blocks[0].html(), "<p>legacy</p>");
        assert_eq!(blocks[1].name, "core/separator");
    }

    #[test]
    fn test_plain_comments_are_html() {
        let blocks = parse("<!-- wp:html --><!-- note --><!-- /wp:html -->").unwrap();
        assert_eq!(blocks[0].html(), "<!-- note -->");
    }

    #[test]
    fn test_mismatched_closer() {
        let err = parse("<!-- wp:group --><!-- /wp:paragraph -->").unwrap_err();
        assert!(matches!(err, WireError::MismatchedCloser { .. }));
    }

    #[test]
    fn test_unclosed_block() {
        let err = parse("\n<!-- wp:group --><div>").unwrap_err();
        assert_eq!(
            err,
            WireError::UnclosedBlock {
                name: "core/group".to_string(),
                position: Position { line: 2, column: 1 },
            }
        );
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |depth: usize| {
            let mut text = "<!-- wp:group -->".repeat(depth);
            text.push_str(&"<!-- /wp:group -->".repeat(depth));
            text
        };
        assert!(parse_with_depth(&nested(3), 3).is_ok());
        let err = parse_with_depth(&nested(4), 3).unwrap_err();
        assert!(matches!(err, WireError::TooDeep { max_depth: 3, .. }));
        assert_eq!(err.position().column, 1 + 3 * "<!-- wp:group -->".len());

        let deep = nested(DEFAULT_MAX_WIRE_DEPTH + 1);
        assert!(matches!(parse(&deep), Err(WireError::TooDeep { .. })));
    }

    #[test]
    fn test_malformed_delimiter() {
        let err = parse("<!-- wp:group {not json} -->").unwrap_err();
        assert!(matches!(err, WireError::MalformedDelimiter { .. }));
        let err = parse("<!-- wp:group").unwrap_err();
        assert!(matches!(err, WireError::MalformedDelimiter { .. }));
    }
}
