use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser as CmarkParser, Tag, TagEnd};

/// Inline-code role prefixes.
const REFERENCE_ROLE: &str = "mref:";
const QUOTATION_ROLE: &str = "mquote:";
/// Fenced-block info words.
const ASSERT_DIRECTIVE: &str = "massert";
const CODE_DIRECTIVE: &str = "coq";

/// Something in a literate document that queries the transcript.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveKind {
    /// `` `mref:PATH` `` or `` `mref:title <PATH>` ``
    Reference { argument: String },
    /// `` `mquote:PATH` ``
    Quotation { argument: String },
    /// One line of a `massert` block, with the block's prefix already applied.
    Assertion {
        argument: String,
        expected: Option<String>,
    },
    /// The flag list of the `block`-th `coq` code block.
    Flags { block: usize, flags: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub kind: DirectiveKind,
    /// Byte span in the Markdown source, for diagnostics.
    pub span: Range<usize>,
}

impl Directive {
    pub fn label(&self) -> &'static str {
        match self.kind {
            DirectiveKind::Reference { .. } => "reference",
            DirectiveKind::Quotation { .. } => "quotation",
            DirectiveKind::Assertion { .. } => "assertion",
            DirectiveKind::Flags { .. } => "flags",
        }
    }
}

/// Scan Markdown source for roles and directives, in document order.
pub fn scan(source: &str) -> Vec<Directive> {
    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES;
    let events: Vec<(Event<'_>, Range<usize>)> =
        CmarkParser::new_ext(source, options).into_offset_iter().collect();

    let mut directives = Vec::new();
    let mut code_blocks = 0usize;
    let mut i = 0;

    while i < events.len() {
        let (ev, range) = &events[i];
        match ev {
            Event::Code(code) => {
                if let Some(kind) = inline_role(code) {
                    directives.push(Directive {
                        kind,
                        span: range.clone(),
                    });
                }
                i += 1;
            }

            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                let info = info.to_string();
                i += 1;
                let body = collect_code_lines(source, &events, &mut i);
                let (word, rest) = split_info(&info);
                match word {
                    ASSERT_DIRECTIVE => {
                        directives.extend(assertion_lines(rest, body));
                    }
                    CODE_DIRECTIVE => {
                        if !rest.is_empty() {
                            directives.push(Directive {
                                kind: DirectiveKind::Flags {
                                    block: code_blocks,
                                    flags: rest.to_string(),
                                },
                                span: range.clone(),
                            });
                        }
                        code_blocks += 1;
                    }
                    _ => {}
                }
            }

            _ => {
                i += 1;
            }
        }
    }

    directives
}

fn inline_role(code: &str) -> Option<DirectiveKind> {
    if let Some(argument) = code.strip_prefix(REFERENCE_ROLE) {
        return Some(DirectiveKind::Reference {
            argument: argument.trim().to_string(),
        });
    }
    code.strip_prefix(QUOTATION_ROLE)
        .map(|argument| DirectiveKind::Quotation {
            argument: argument.trim().to_string(),
        })
}

fn split_info(info: &str) -> (&str, &str) {
    let info = info.trim();
    match info.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (info, ""),
    }
}

/// Collect the lines of a fenced block with their source spans.
/// Advances `i` past the closing tag.
fn collect_code_lines(
    source: &str,
    events: &[(Event<'_>, Range<usize>)],
    i: &mut usize,
) -> Vec<(String, Range<usize>)> {
    let mut lines = Vec::new();
    while *i < events.len() {
        let (ev, range) = &events[*i];
        *i += 1;
        match ev {
            Event::End(TagEnd::CodeBlock) => break,
            Event::Text(text) => {
                let verbatim = source.get(range.clone()) == Some(&**text);
                let mut offset = range.start;
                for line in text.split_inclusive('\n') {
                    let content = line.trim_end_matches(['\n', '\r']);
                    let span = if verbatim {
                        offset..offset + content.len()
                    } else {
                        range.clone()
                    };
                    lines.push((content.to_string(), span));
                    offset += line.len();
                }
            }
            _ => {}
        }
    }
    lines
}

/// Find `=>` outside any brackets.
fn find_arrow(line: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut escaped = false;
    let bytes = line.as_bytes();
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '(' | '{' => depth += 1,
            ')' | '}' => depth -= 1,
            '=' if depth == 0 && bytes.get(i + 1) == Some(&b'>') => return Some(i),
            _ => {}
        }
    }
    None
}

fn assertion_lines(prefix: &str, body: Vec<(String, Range<usize>)>) -> Vec<Directive> {
    body.into_iter()
        .filter(|(line, _)| !line.trim().is_empty())
        .map(|(line, span)| {
            let (path, expected) = match find_arrow(&line) {
                Some(arrow) => (
                    line[..arrow].trim().to_string(),
                    Some(line[arrow + 2..].trim().to_string()),
                ),
                None => (line.trim().to_string(), None),
            };
            Directive {
                kind: DirectiveKind::Assertion {
                    argument: format!("{}{}", prefix, path),
                    expected,
                },
                span,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const DOC: &str = "\
# Intro

```coq unfold
Goal True.
exact I.
```

The goal `mref:.s(Goal).g#0` is `mquote:.s(Goal).g#0.ccl`.
See `mref:the proof <.s(exact)>` and `plain code`.

```massert .s(Goal)
.g#0.ccl => {True}
.msg{*}
```

```python
print(1)
```

```coq
Check I.
```
";

    #[test]
    fn finds_directives_in_order() {
        let directives = scan(DOC);
        let labels: Vec<&str> = directives.iter().map(|d| d.label()).collect();
        assert_eq!(
            labels,
            vec!["flags", "reference", "quotation", "reference", "assertion", "assertion"]
        );
    }

    #[test]
    fn inline_roles_keep_their_argument() {
        let directives = scan(DOC);
        assert_eq!(
            directives[3].kind,
            DirectiveKind::Reference {
                argument: "the proof <.s(exact)>".into()
            }
        );
        assert_eq!(&DOC[directives[1].span.clone()], "`mref:.s(Goal).g#0`");
    }

    #[test]
    fn assertion_lines_take_the_prefix() {
        let directives = scan(DOC);
        assert_eq!(
            directives[4].kind,
            DirectiveKind::Assertion {
                argument: ".s(Goal).g#0.ccl".into(),
                expected: Some("{True}".into()),
            }
        );
        assert_eq!(&DOC[directives[5].span.clone()], ".msg{*}");
    }

    #[test]
    fn flags_count_code_blocks() {
        let directives = scan(DOC);
        assert_eq!(
            directives[0].kind,
            DirectiveKind::Flags {
                block: 0,
                flags: "unfold".into()
            }
        );
        // The second coq block has no flags and yields no directive.
        assert!(!directives.iter().any(|d| matches!(d.kind, DirectiveKind::Flags { block: 1, .. })));
    }

    #[test]
    fn arrow_inside_pattern_is_not_a_separator() {
        assert_eq!(find_arrow(".s(a => b) => x"), Some(11));
        assert_eq!(find_arrow(".s(a => b)"), None);
    }
}
