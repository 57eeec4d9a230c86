//! Lexer for template markup using logos
//!
//! Markup is context sensitive: text between tags and the inside of a tag use
//! different token sets. Two logos lexers are chained with [`Lexer::morph`],
//! switching to tag mode on `<name` / `</name` and back on `>` / `/>`.

use std::fmt;

use logos::{Lexer, Logos};

use crate::error::ParseError;
use crate::parser::ast::{is_void, Span, RAW_TEXT_ELEMENTS};

/// Tokens outside of tags
#[derive(Logos, Debug, Clone, PartialEq)]
enum ContentToken {
    #[regex(r"<!--([^-]|-[^-]|--[^>])*-->", logos::skip)]
    Comment,

    #[token("<!--")]
    UnterminatedComment,

    #[regex(r"<![a-zA-Z][^>]*>", logos::skip)]
    Doctype,

    #[regex(r"<[a-zA-Z][a-zA-Z0-9:_.\-]*", |lex| lex.slice()[1..].to_ascii_lowercase())]
    OpenStart(String),

    #[regex(r"</[a-zA-Z][a-zA-Z0-9:_.\-]*", |lex| lex.slice()[2..].to_ascii_lowercase())]
    CloseStart(String),

    #[regex(r"[^<]+")]
    Text,

    // A `<` that does not start a tag is ordinary text
    #[token("<")]
    StrayLt,
}

/// Tokens inside a tag
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum TagToken {
    #[regex(r#"/*[^ \t\r\n\f"'<>=`/]+(/+[^ \t\r\n\f"'<>=`/]+)*"#, |lex| lex.slice().to_string())]
    Word(String),

    #[token("=")]
    Equals,

    #[regex(r#""[^"]*""#, |lex| trim_quotes(lex.slice()))]
    #[regex(r#"'[^']*'"#, |lex| trim_quotes(lex.slice()))]
    Quoted(String),

    #[token(">")]
    End,

    #[token("/>")]
    SelfClose,
}

fn trim_quotes(s: &str) -> String {
    s[1..s.len() - 1].to_string()
}

/// Unified token stream consumed by the grammar
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// `<name`
    OpenTag(String),
    /// `</name`
    CloseTag(String),
    /// `>` ending an open tag whose element has children
    TagEnd,
    /// `/>`
    SelfClose,
    /// `>` ending the open tag of a void element
    VoidEnd,
    /// Attribute name or unquoted attribute value
    Name(String),
    Equals,
    /// Quoted attribute value, quotes removed, entities still encoded
    Quoted(String),
    /// Text between tags, verbatim
    Text(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::OpenTag(name) => write!(f, "<{}", name),
            Token::CloseTag(name) => write!(f, "</{}", name),
            Token::TagEnd | Token::VoidEnd => write!(f, ">"),
            Token::SelfClose => write!(f, "/>"),
            Token::Name(name) => write!(f, "{}", name),
            Token::Equals => write!(f, "="),
            Token::Quoted(value) => write!(f, "\"{}\"", value),
            Token::Text(text) => write!(f, "{:?}", text),
        }
    }
}

enum Mode<'a> {
    Content(Lexer<'a, ContentToken>),
    Tag(Lexer<'a, TagToken>),
}

/// State of the tag currently being lexed
struct OpenTagState {
    name: String,
    start: usize,
    closing: bool,
}

/// Lex template source into tokens with spans
///
/// Fails on characters that cannot appear inside a tag, unterminated quotes,
/// tags or comments, and on element nesting deeper than `max_depth`.
pub fn lex(input: &str, max_depth: usize) -> Result<Vec<(Token, Span)>, ParseError> {
    let mut tokens: Vec<(Token, Span)> = Vec::new();
    let mut depth = 0usize;
    let mut current: Option<OpenTagState> = None;
    let mut mode = Mode::Content(ContentToken::lexer(input));

    loop {
        mode = match mode {
            Mode::Content(mut lex) => {
                let Some(result) = lex.next() else {
                    break;
                };
                let span = lex.span();
                match result {
                    Ok(ContentToken::OpenStart(name)) => {
                        current = Some(OpenTagState {
                            name: name.clone(),
                            start: span.start,
                            closing: false,
                        });
                        tokens.push((Token::OpenTag(name), span));
                        Mode::Tag(lex.morph())
                    }
                    Ok(ContentToken::CloseStart(name)) => {
                        current = Some(OpenTagState {
                            name: name.clone(),
                            start: span.start,
                            closing: true,
                        });
                        depth = depth.saturating_sub(1);
                        tokens.push((Token::CloseTag(name), span));
                        Mode::Tag(lex.morph())
                    }
                    Ok(ContentToken::Text) | Ok(ContentToken::StrayLt) => {
                        push_text(&mut tokens, lex.slice(), span);
                        Mode::Content(lex)
                    }
                    Ok(ContentToken::UnterminatedComment) => {
                        return Err(ParseError::syntax(
                            input,
                            span,
                            "unterminated comment",
                            vec!["'-->'".to_string()],
                        ));
                    }
                    Ok(ContentToken::Comment) | Ok(ContentToken::Doctype) => Mode::Content(lex),
                    Err(()) => {
                        return Err(ParseError::syntax(
                            input,
                            span,
                            "unreadable markup",
                            Vec::new(),
                        ));
                    }
                }
            }
            Mode::Tag(mut lex) => {
                let Some(result) = lex.next() else {
                    let start = current.map(|t| t.start).unwrap_or(input.len());
                    return Err(ParseError::syntax(
                        input,
                        start..input.len(),
                        "unterminated tag",
                        vec!["'>'".to_string()],
                    ));
                };
                let span = lex.span();
                match result {
                    Ok(TagToken::Word(word)) => {
                        tokens.push((Token::Name(word), span));
                        Mode::Tag(lex)
                    }
                    Ok(TagToken::Equals) => {
                        tokens.push((Token::Equals, span));
                        Mode::Tag(lex)
                    }
                    Ok(TagToken::Quoted(value)) => {
                        tokens.push((Token::Quoted(value), span));
                        Mode::Tag(lex)
                    }
                    Ok(TagToken::SelfClose) => {
                        current = None;
                        tokens.push((Token::SelfClose, span));
                        Mode::Content(lex.morph())
                    }
                    Ok(TagToken::End) => {
                        let tag = current.take();
                        let mut content: Lexer<'_, ContentToken> = lex.morph();
                        match tag {
                            Some(tag) if !tag.closing && is_void(&tag.name) => {
                                tokens.push((Token::VoidEnd, span));
                            }
                            Some(tag) if !tag.closing => {
                                depth += 1;
                                if depth > max_depth {
                                    return Err(ParseError::too_deep(
                                        input,
                                        tag.start..span.end,
                                        max_depth,
                                    ));
                                }
                                let end = span.end;
                                tokens.push((Token::TagEnd, span));
                                if RAW_TEXT_ELEMENTS.contains(&tag.name.as_str()) {
                                    let rest = content.remainder();
                                    let len = raw_text_len(rest, &tag.name);
                                    if len > 0 {
                                        content.bump(len);
                                        push_text(&mut tokens, &rest[..len], end..end + len);
                                    }
                                }
                            }
                            _ => tokens.push((Token::TagEnd, span)),
                        }
                        Mode::Content(content)
                    }
                    Err(()) => {
                        let slice = lex.slice();
                        let message = if slice.starts_with(['"', '\'']) {
                            "unterminated attribute value".to_string()
                        } else {
                            format!("unexpected {:?} inside tag", slice)
                        };
                        return Err(ParseError::syntax(input, span, message, Vec::new()));
                    }
                }
            }
        };
    }

    Ok(tokens)
}

/// Append text, merging with a directly preceding text token
fn push_text(tokens: &mut Vec<(Token, Span)>, text: &str, span: Span) {
    if let Some((Token::Text(prev), prev_span)) = tokens.last_mut() {
        if prev_span.end == span.start {
            prev.push_str(text);
            prev_span.end = span.end;
            return;
        }
    }
    tokens.push((Token::Text(text.to_string()), span));
}

/// Length of raw text before the closing tag of a raw-text element
fn raw_text_len(rest: &str, tag: &str) -> usize {
    let needle = format!("</{}", tag);
    rest.to_ascii_lowercase()
        .find(&needle)
        .unwrap_or(rest.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        lex(input, 64)
            .expect("should lex")
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn test_simple_element() {
        assert_eq!(
            kinds("<p>Hi</p>"),
            vec![
                Token::OpenTag("p".to_string()),
                Token::TagEnd,
                Token::Text("Hi".to_string()),
                Token::CloseTag("p".to_string()),
                Token::TagEnd,
            ]
        );
    }

    #[test]
    fn test_tag_names_are_lowercased() {
        assert_eq!(
            kinds("<DIV></Div>"),
            vec![
                Token::OpenTag("div".to_string()),
                Token::TagEnd,
                Token::CloseTag("div".to_string()),
                Token::TagEnd,
            ]
        );
    }

    #[test]
    fn test_attributes_quoted_and_unquoted() {
        assert_eq!(
            kinds(r#"<img src=/a/b.png alt='x y' hidden>"#),
            vec![
                Token::OpenTag("img".to_string()),
                Token::Name("src".to_string()),
                Token::Equals,
                Token::Name("/a/b.png".to_string()),
                Token::Name("alt".to_string()),
                Token::Equals,
                Token::Quoted("x y".to_string()),
                Token::Name("hidden".to_string()),
                Token::VoidEnd,
            ]
        );
    }

    #[test]
    fn test_self_closing_after_bare_attribute() {
        assert_eq!(
            kinds("<input disabled/>"),
            vec![
                Token::OpenTag("input".to_string()),
                Token::Name("disabled".to_string()),
                Token::SelfClose,
            ]
        );
    }

    #[test]
    fn test_comments_and_doctype_skipped() {
        assert_eq!(
            kinds("<!DOCTYPE html><!-- note -->Hi"),
            vec![Token::Text("Hi".to_string())]
        );
    }

    #[test]
    fn test_stray_less_than_is_text() {
        assert_eq!(kinds("a < b"), vec![Token::Text("a < b".to_string())]);
    }

    #[test]
    fn test_script_content_is_raw_text() {
        assert_eq!(
            kinds("<script>if (a<b) {}</script>"),
            vec![
                Token::OpenTag("script".to_string()),
                Token::TagEnd,
                Token::Text("if (a<b) {}".to_string()),
                Token::CloseTag("script".to_string()),
                Token::TagEnd,
            ]
        );
    }

    #[test]
    fn test_unterminated_quote_is_error() {
        let err = lex(r#"<p class="x>hi</p>"#, 64).unwrap_err();
        assert!(err.to_string().contains("unterminated"), "{}", err);
    }

    #[test]
    fn test_unterminated_tag_is_error() {
        let err = lex("<p class=x", 64).unwrap_err();
        assert!(err.to_string().contains("unterminated tag"), "{}", err);
        assert_eq!(err.position().column, 1);
    }

    #[test]
    fn test_unterminated_comment_is_error() {
        assert!(lex("<!-- never closed", 64).is_err());
    }

    #[test]
    fn test_depth_limit() {
        let deep = "<div>".repeat(5) + &"</div>".repeat(5);
        assert!(lex(&deep, 5).is_ok());
        let err = lex(&deep, 4).unwrap_err();
        assert!(matches!(err, ParseError::TooDeep { limit: 4, .. }));
    }

    #[test]
    fn test_void_elements_do_not_count_towards_depth() {
        let input = "<div><img><br><hr></div>";
        assert!(lex(input, 1).is_ok());
    }
}
