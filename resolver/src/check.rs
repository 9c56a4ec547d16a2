use markers::Transcript;
use markers::flags::{apply_flags, parse_flags};
use markers::literate::{Directive, DirectiveKind};
use markers::pattern::Pattern;
use tracing::{info, warn};

use crate::contract::{Reference, assert_path, quote, reference};
use crate::error::{DiagnosticError, ResolveError};
use crate::options::ResolverOptions;

/// What a successful directive produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Linked(Reference),
    Quoted(String),
    Asserted,
    Configured,
}

#[derive(Debug, Clone)]
pub struct Record {
    pub directive: Directive,
    pub result: Result<Outcome, ResolveError>,
}

/// Every directive's outcome, in document order.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub records: Vec<Record>,
}

impl Report {
    pub fn failures(&self) -> usize {
        self.records.iter().filter(|r| r.result.is_err()).count()
    }

    pub fn passed(&self) -> bool {
        self.failures() == 0
    }

    /// Failures located in the document with id `source_id`.
    pub fn diagnostics(&self, source_id: usize) -> Vec<DiagnosticError> {
        self.records
            .iter()
            .filter_map(|record| match &record.result {
                Err(error) => Some(DiagnosticError::new(
                    error.clone(),
                    record.directive.span.clone(),
                    source_id,
                )),
                Ok(_) => None,
            })
            .collect()
    }

    fn push(&mut self, directive: &Directive, result: Result<Outcome, ResolveError>) {
        match &result {
            Ok(_) => info!(directive = directive.label(), span = ?directive.span, "ok"),
            Err(error) => warn!(
                directive = directive.label(),
                kind = %error.kind(),
                fragment = %error.fragment(),
                "{}",
                error
            ),
        }
        self.records.push(Record {
            directive: directive.clone(),
            result,
        });
    }
}

/// Run every directive of a literate document against `transcript`.
///
/// Flag directives are applied first to a private copy of the transcript;
/// queries then resolve against that copy. A failure is recorded and checking
/// continues with the next directive.
pub fn check_document(
    transcript: &Transcript,
    directives: &[Directive],
    options: &ResolverOptions,
) -> Report {
    let mut report = Report::default();
    let mut configured = transcript.clone();

    for directive in directives {
        if let DirectiveKind::Flags { block, flags } = &directive.kind {
            for result in configure(&mut configured, *block, flags) {
                report.push(directive, result);
            }
        }
    }

    for directive in directives {
        let result = match &directive.kind {
            DirectiveKind::Flags { .. } => continue,
            DirectiveKind::Reference { argument } => {
                reference(&configured, argument, true, options).map(Outcome::Linked)
            }
            DirectiveKind::Quotation { argument } => {
                quote(&configured, argument, options).map(Outcome::Quoted)
            }
            DirectiveKind::Assertion { argument, expected } => {
                let expected = expected.as_deref().map(Pattern::from_expected);
                assert_path(&configured, argument, expected.as_ref(), options)
                    .map(|_| Outcome::Asserted)
            }
        };
        report.push(directive, result);
    }

    report
}

fn configure(
    transcript: &mut Transcript,
    block: usize,
    flags: &str,
) -> Vec<Result<Outcome, ResolveError>> {
    let list = match parse_flags(flags) {
        Ok(list) => list,
        Err(error) => return vec![Err(error.into())],
    };
    let Some(target) = transcript.blocks.get_mut(block) else {
        return vec![Err(ResolveError::NoMatch {
            noun: "block",
            searched: block.to_string(),
            fragment: flags.to_string(),
            context: None,
        })];
    };
    match apply_flags(block, target, &list) {
        Ok(()) => vec![Ok(Outcome::Configured)],
        Err(errors) => errors.into_iter().map(|e| Err(e.into())).collect(),
    }
}
