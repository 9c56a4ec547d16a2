use std::ops::Range;

use crate::parser::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Dot,
    /// A component keyword such as `s` or `ccl`.
    Word(String),
    /// `#` followed by digits.
    Index(usize),
    /// `#` followed by an identifier.
    Name(String),
    /// A delimited pattern; `wildcard` is true for `{…}`, false for `(…)`.
    Group { wildcard: bool, content: String },
}

pub(crate) fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '\'' | '-')
}

/// Split a raw path into tokens with byte spans.
pub(crate) fn tokenize(raw: &str) -> Result<Vec<(Token, Range<usize>)>, ParseError> {
    let chars: Vec<(usize, char)> = raw.char_indices().collect();
    let len = chars.len();
    let offset = |i: usize| chars.get(i).map(|(b, _)| *b).unwrap_or(raw.len());

    let mut tokens = Vec::new();
    let mut i = 0;

    while i < len {
        let (start, c) = chars[i];
        match c {
            '.' => {
                i += 1;
                tokens.push((Token::Dot, start..offset(i)));
            }

            c if c.is_alphabetic() => {
                while i < len && (chars[i].1.is_alphanumeric() || chars[i].1 == '_') {
                    i += 1;
                }
                let span = start..offset(i);
                tokens.push((Token::Word(raw[span.clone()].to_string()), span));
            }

            '#' => {
                i += 1;
                let name_start = i;
                while i < len && is_name_char(chars[i].1) {
                    i += 1;
                }
                let text = &raw[offset(name_start)..offset(i)];
                let span = start..offset(i);
                if text.is_empty() {
                    return Err(ParseError::syntax(
                        "Missing index or name after `#`",
                        raw,
                        span,
                    ));
                }
                if text.chars().all(|c| c.is_ascii_digit()) {
                    let index = text.parse::<usize>().map_err(|_| {
                        ParseError::syntax(format!("Index `#{}` is too large", text), raw, span.clone())
                    })?;
                    tokens.push((Token::Index(index), span));
                } else if text.starts_with(|c: char| c.is_ascii_digit()) {
                    return Err(ParseError::syntax(
                        format!("Invalid selector `#{}`: names cannot start with a digit", text),
                        raw,
                        span,
                    ));
                } else {
                    tokens.push((Token::Name(text.to_string()), span));
                }
            }

            '(' | '{' => {
                let close = if c == '(' { ')' } else { '}' };
                let mut depth = 1u32;
                let mut content = String::new();
                i += 1;
                loop {
                    if i >= len {
                        return Err(ParseError::syntax(
                            format!("Unterminated pattern `{}`", &raw[start..]),
                            raw,
                            start..raw.len(),
                        )
                        .with_note(format!("add a closing `{}`, or escape it as `\\{}`", close, c)));
                    }
                    let ch = chars[i].1;
                    if ch == '\\' && i + 1 < len {
                        let escaped = chars[i + 1].1;
                        // Wildcards keep `\*` and `\\` for the matcher to read.
                        if c == '{' && matches!(escaped, '*' | '\\') {
                            content.push('\\');
                        }
                        content.push(escaped);
                        i += 2;
                        continue;
                    }
                    if ch == c {
                        depth += 1;
                    } else if ch == close {
                        depth -= 1;
                        if depth == 0 {
                            i += 1;
                            break;
                        }
                    }
                    content.push(ch);
                    i += 1;
                }
                tokens.push((
                    Token::Group {
                        wildcard: c == '{',
                        content,
                    },
                    start..offset(i),
                ));
            }

            ')' | '}' => {
                return Err(ParseError::syntax(
                    format!("Unbalanced `{}`", c),
                    raw,
                    start..start + 1,
                ));
            }

            c if c.is_whitespace() => {
                return Err(ParseError::syntax(
                    "Unexpected whitespace in path",
                    raw,
                    start..start + c.len_utf8(),
                )
                .with_note("whitespace is only allowed inside `(…)` and `{…}` patterns"));
            }

            _ => {
                return Err(ParseError::syntax(
                    format!("Unexpected character `{}`", c),
                    raw,
                    start..start + c.len_utf8(),
                ));
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(raw: &str) -> Vec<Token> {
        tokenize(raw)
            .expect("tokenize failed")
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn selectors() {
        assert_eq!(
            kinds(".io#intro.s(pose proof).h#n"),
            vec![
                Token::Dot,
                Token::Word("io".into()),
                Token::Name("intro".into()),
                Token::Dot,
                Token::Word("s".into()),
                Token::Group {
                    wildcard: false,
                    content: "pose proof".into()
                },
                Token::Dot,
                Token::Word("h".into()),
                Token::Name("n".into()),
            ]
        );
    }

    #[test]
    fn nested_and_escaped_groups() {
        assert_eq!(
            kinds(".s(f (x) \\) y)"),
            vec![
                Token::Dot,
                Token::Word("s".into()),
                Token::Group {
                    wildcard: false,
                    content: "f (x) ) y".into()
                },
            ]
        );
    }

    #[test]
    fn wildcards_keep_star_escapes() {
        assert_eq!(
            kinds(".msg{a\\*b\\}*}")[2],
            Token::Group {
                wildcard: true,
                content: "a\\*b}*".into()
            }
        );
        assert_eq!(
            kinds(".s(a\\*b)")[2],
            Token::Group {
                wildcard: false,
                content: "a*b".into()
            }
        );
    }

    #[test]
    fn unterminated_group_spans_to_end() {
        let err = tokenize(".s(Goal").unwrap_err();
        assert_eq!(err.span, 2..7);
        assert_eq!(err.fragment, "(Goal");
    }

    #[test]
    fn spans_are_byte_offsets() {
        let tokens = tokenize(".s(∀ n).g#0").expect("tokenize failed");
        assert_eq!(tokens[2].1, 2..9);
        assert_eq!(tokens[5].1, 11..13);
    }
}
