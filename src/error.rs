//! Error types for template parsing

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::parser::ast::{Position, Span};
use crate::parser::lexer::Token;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("parse error at {position}: {message}")]
    Syntax {
        span: Span,
        position: Position,
        message: String,
        expected: Vec<String>,
    },

    #[error("parse error at {position}: elements nested deeper than {limit} levels")]
    TooDeep {
        span: Span,
        position: Position,
        limit: usize,
    },
}

impl ParseError {
    pub fn syntax(
        source: &str,
        span: Span,
        message: impl Into<String>,
        expected: Vec<String>,
    ) -> Self {
        ParseError::Syntax {
            position: Position::locate(source, span.start),
            span,
            message: message.into(),
            expected,
        }
    }

    pub fn too_deep(source: &str, span: Span, limit: usize) -> Self {
        ParseError::TooDeep {
            position: Position::locate(source, span.start),
            span,
            limit,
        }
    }

    pub fn span(&self) -> &Span {
        match self {
            ParseError::Syntax { span, .. } | ParseError::TooDeep { span, .. } => span,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            ParseError::Syntax { position, .. } | ParseError::TooDeep { position, .. } => *position,
        }
    }

    pub fn line(&self) -> usize {
        self.position().line
    }

    pub fn column(&self) -> usize {
        self.position().column
    }

    /// Message without the position prefix
    pub fn message(&self) -> String {
        match self {
            ParseError::Syntax { message, .. } => message.clone(),
            ParseError::TooDeep { limit, .. } => {
                format!("elements nested deeper than {} levels", limit)
            }
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let span = self.span().clone();
        let message = self.message();
        let label = match self {
            ParseError::Syntax { expected, .. } if !expected.is_empty() => {
                format!("{}\nExpected: {}", message, expected.join(", "))
            }
            _ => message.clone(),
        };

        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, filename, span.start)
            .with_message(&message)
            .with_label(
                Label::new((filename, span))
                    .with_message(label)
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);
        if written.is_err() {
            return self.to_string();
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Convert a grammar error, resolving its position against `source`
    pub(crate) fn from_rich(source: &str, err: chumsky::error::Rich<'_, Token>) -> Self {
        use chumsky::error::{RichPattern, RichReason};

        let message = match err.reason() {
            RichReason::ExpectedFound { found, .. } => {
                let found_str = match found {
                    Some(tok) => format_token(tok),
                    None => "end of input".to_string(),
                };
                format!("unexpected {}", found_str)
            }
            RichReason::Custom(msg) => msg.to_string(),
        };

        let expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                RichPattern::Token(tok) => Some(format_token(tok)),
                RichPattern::Label(label) => Some(label.to_string()),
                RichPattern::EndOfInput => Some("end of input".to_string()),
                RichPattern::Identifier(s) => Some(format!("'{}'", s)),
                RichPattern::Any => Some("any token".to_string()),
                RichPattern::SomethingElse => None,
            })
            .collect();

        ParseError::syntax(source, err.span().into_range(), message, expected)
    }
}

/// Format a token for human-readable error messages
fn format_token(tok: &Token) -> String {
    match tok {
        Token::OpenTag(name) => format!("opening tag <{}>", name),
        Token::CloseTag(name) => format!("closing tag </{}>", name),
        Token::TagEnd | Token::VoidEnd => "'>'".to_string(),
        Token::SelfClose => "'/>'".to_string(),
        Token::Name(name) => format!("attribute '{}'", name),
        Token::Equals => "'='".to_string(),
        Token::Quoted(value) => format!("string \"{}\"", value),
        Token::Text(_) => "text".to_string(),
    }
}
