//! Template grammar using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::ParseError;
use crate::parser::ast::*;
use crate::parser::lexer::Token;

/// Deepest element nesting accepted by [`parse`]
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// How an open tag was terminated
#[derive(Debug, Clone)]
enum TagBody {
    Empty { self_closing: bool },
    Children(Vec<Spanned<RawNode>>, Spanned<String>),
}

/// Parse template markup into a node tree
pub fn parse(input: &str) -> Result<Template, ParseError> {
    parse_with_depth(input, DEFAULT_MAX_DEPTH)
}

/// Parse template markup, rejecting nesting deeper than `max_depth`
pub fn parse_with_depth(input: &str, max_depth: usize) -> Result<Template, ParseError> {
    let len = input.len();

    let tokens = crate::parser::lexer::lex(input, max_depth)?;
    let token_iter = tokens.into_iter().map(|(tok, span)| (tok, span.into()));

    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    template_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| match errs.into_iter().next() {
            Some(err) => ParseError::from_rich(input, err),
            None => ParseError::syntax(input, len..len, "invalid template", Vec::new()),
        })
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn template_parser<'a, I>() -> impl Parser<'a, I, Template, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let attribute_value = select! {
        Token::Quoted(v) => v,
        Token::Name(v) => v,
    };

    let attribute = select! {
        Token::Name(name) => name,
    }
    .then(just(Token::Equals).ignore_then(attribute_value).or_not())
    .map_with(|(name, value), e| {
        let value = value.map(|v: String| html_escape::decode_html_entities(&v).into_owned());
        Spanned::new(Attribute { name, value }, span_range(&e.span()))
    });

    let close_tag = select! {
        Token::CloseTag(name) => name,
    }
    .then_ignore(just(Token::TagEnd))
    .map_with(|name, e| Spanned::new(name, span_range(&e.span())));

    let text = select! {
        Token::Text(t) => RawNode::Text(t),
    };

    let node = recursive(|node| {
        let body = choice((
            just(Token::SelfClose).map(|_| TagBody::Empty { self_closing: true }),
            just(Token::VoidEnd).map(|_| TagBody::Empty {
                self_closing: false,
            }),
            just(Token::TagEnd)
                .ignore_then(node.repeated().collect::<Vec<_>>())
                .then(close_tag.clone())
                .map(|(children, close)| TagBody::Children(children, close)),
        ));

        let element = select! {
            Token::OpenTag(name) => name,
        }
        .then(attribute.clone().repeated().collect::<Vec<_>>())
        .then(body)
        .try_map(
            |((name, attributes), body): ((String, Vec<Spanned<Attribute>>), TagBody), _span| {
                match body {
                    TagBody::Empty { self_closing } => Ok(RawNode::Element(Element {
                        name,
                        attributes,
                        children: Vec::new(),
                        self_closing,
                    })),
                    TagBody::Children(children, close) if close.node == name => {
                        Ok(RawNode::Element(Element {
                            name,
                            attributes,
                            children,
                            self_closing: false,
                        }))
                    }
                    TagBody::Children(_, close) => Err(Rich::custom(
                        SimpleSpan::from(close.span.clone()),
                        format!(
                            "mismatched closing tag: <{}> closed by </{}>",
                            name, close.node
                        ),
                    )),
                }
            },
        );

        choice((element, text))
            .map_with(|n, e| Spanned::new(n, span_range(&e.span())))
            .boxed()
    });

    node.repeated()
        .collect()
        .then_ignore(end())
        .map(|nodes| Template { nodes })
}
