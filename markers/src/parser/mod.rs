pub mod error;
mod lexer;

pub use error::ParseError;

use std::ops::Range;

use crate::path::{Key, Path, PathComponent, Selector};
use crate::pattern::Pattern;
use lexer::Token;

/// Parse a raw path expression such as `.s(Goal).g#0.ccl`.
///
/// Surrounding whitespace is ignored; spans in the result and in errors are
/// relative to the trimmed string.
pub fn parse_path(raw: &str) -> Result<Path, ParseError> {
    let raw = raw.trim();
    let tokens = lexer::tokenize(raw)?;
    let components = PathParser::new(raw, tokens).parse()?;
    Ok(Path {
        raw: raw.to_string(),
        components,
    })
}

struct PathParser<'a> {
    raw: &'a str,
    tokens: Vec<(Token, Range<usize>)>,
    pos: usize,
}

impl<'a> PathParser<'a> {
    fn new(raw: &'a str, tokens: Vec<(Token, Range<usize>)>) -> Self {
        PathParser {
            raw,
            tokens,
            pos: 0,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn advance(&mut self) -> Option<(Token, Range<usize>)> {
        let next = self.tokens.get(self.pos).cloned();
        if next.is_some() {
            self.pos += 1;
        }
        next
    }

    fn parse(mut self) -> Result<Vec<PathComponent>, ParseError> {
        if self.tokens.is_empty() {
            return Err(ParseError::syntax("Empty path", self.raw, 0..0));
        }

        let mut components: Vec<PathComponent> = Vec::new();
        while let Some((token, span)) = self.advance() {
            if token != Token::Dot {
                return Err(self.unexpected(&token, span, components.last()));
            }
            let component = self.parse_component(span.start, components.last())?;
            components.push(component);
        }
        Ok(components)
    }

    /// Parse `key [selector]` after a dot at byte `dot_start`.
    fn parse_component(
        &mut self,
        dot_start: usize,
        previous: Option<&PathComponent>,
    ) -> Result<PathComponent, ParseError> {
        let raw = self.raw;
        let (word, word_span) = match self.advance() {
            Some((Token::Word(word), span)) => (word, span),
            Some((_, span)) => {
                return Err(ParseError::syntax(
                    "Expected a component name after `.`",
                    raw,
                    dot_start..span.end,
                ));
            }
            None => {
                return Err(ParseError::syntax(
                    "Path ends with a dangling `.`",
                    raw,
                    dot_start..raw.len(),
                ));
            }
        };

        if let Some(leaf) = previous.filter(|p| p.key.is_leaf()) {
            return Err(ParseError::mismatch(
                format!(
                    "Incompatible components: `{}` must end the path, but `{}` follows it",
                    &raw[leaf.span.clone()],
                    &raw[dot_start..],
                ),
                raw,
                leaf.span.start..raw.len(),
            ));
        }

        let key = Key::from_token(&word).ok_or_else(|| {
            ParseError::syntax(
                format!("Unknown path component `.{}`", word),
                raw,
                dot_start..word_span.end,
            )
            .with_note("expected one of .io .s .g .h .msg .in .out .ccl .body .name .type")
        })?;

        let mut end = word_span.end;
        let selector = match self.peek() {
            Some(Token::Index(_) | Token::Name(_) | Token::Group { .. }) => {
                let (token, span) = self.advance().ok_or_else(|| {
                    ParseError::syntax("Unexpected end of path", raw, dot_start..raw.len())
                })?;
                end = span.end;
                selector_of(token)
            }
            _ => Selector::None,
        };
        let span = dot_start..end;

        if key.is_leaf() {
            if selector != Selector::None {
                return Err(ParseError::syntax(
                    format!("`.{}` does not take a selector", key.token()),
                    raw,
                    span,
                ));
            }
            return Ok(PathComponent {
                key,
                selector,
                span,
            });
        }

        let allowed = key
            .allowed_selectors()
            .iter()
            .map(|form| form.describe())
            .collect::<Vec<_>>()
            .join(", ");
        match selector.form() {
            None => Err(ParseError::syntax(
                format!("Missing selector after `.{}`", key.token()),
                raw,
                span,
            )
            .with_note(format!("`.{}` accepts {}", key.token(), allowed))),
            Some(form) if !key.accepts(form) => Err(ParseError::syntax(
                format!(
                    "{} are not supported on `.{}` (in `{}`)",
                    capitalize(form.describe()),
                    key.token(),
                    &raw[span.clone()],
                ),
                raw,
                span,
            )
            .with_note(format!("`.{}` accepts {}", key.token(), allowed))),
            Some(_) => Ok(PathComponent {
                key,
                selector,
                span,
            }),
        }
    }

    fn unexpected(
        &self,
        token: &Token,
        span: Range<usize>,
        previous: Option<&PathComponent>,
    ) -> ParseError {
        let raw = self.raw;
        let text = &raw[span.clone()];
        match previous {
            None => ParseError::syntax(
                format!("Path must start with `.`, found `{}`", text),
                raw,
                span,
            ),
            Some(prev) if prev.key.is_leaf() => ParseError::syntax(
                format!("`.{}` does not take a selector", prev.key.token()),
                raw,
                prev.span.start..span.end,
            ),
            Some(prev) if matches!(token, Token::Word(_)) => ParseError::syntax(
                format!("Unexpected `{}` after `{}`", text, &raw[prev.span.clone()]),
                raw,
                span,
            ),
            Some(prev) => ParseError::syntax(
                format!(
                    "Unexpected `{}` after `{}`: a component takes at most one selector",
                    text,
                    &raw[prev.span.clone()]
                ),
                raw,
                span,
            ),
        }
    }
}

fn selector_of(token: Token) -> Selector {
    match token {
        Token::Index(index) => Selector::Index(index),
        Token::Name(name) => Selector::Name(name),
        Token::Group {
            wildcard: true,
            content,
        } => Selector::Pattern(Pattern::wildcard(content)),
        Token::Group {
            wildcard: false,
            content,
        } => Selector::Pattern(Pattern::substring(content)),
        Token::Dot | Token::Word(_) => Selector::None,
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
