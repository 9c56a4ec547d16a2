mod test_runner;
mod transcript_file;

use std::path::Path;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::EnvFilter;

use markers::Transcript;
use resolver::{DiagnosticError, ResolveError, ResolverOptions};

#[derive(Parser)]
#[command(
    name = "mref",
    version,
    about = "Check transcript references in literate proof documents"
)]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve every reference, quotation and assertion in a document
    Check(CheckArgs),

    /// Resolve a single path against a transcript
    Resolve(ResolveArgs),

    /// Run .test.md test files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Markdown document to check
    file: String,

    /// TOML transcript the document's code blocks produced
    #[arg(short, long)]
    transcript: String,

    /// Take the first candidate when a search matches several in one scope
    #[arg(long)]
    first_match: bool,
}

#[derive(clap::Args)]
struct ResolveArgs {
    /// TOML transcript to resolve against
    transcript: String,

    /// Path expression, e.g. `.s(Goal).g#0.ccl`
    path: String,

    /// How the target will be consumed
    #[arg(long = "as", value_enum, default_value_t = Consumer::Reference)]
    consumer: Consumer,

    /// Take the first candidate when a search matches several in one scope
    #[arg(long)]
    first_match: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Consumer {
    Reference,
    Quote,
    Assert,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.md file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Command::Check(args) => process::exit(do_check(args, cli.no_color)),
        Command::Resolve(args) => process::exit(do_resolve(args, cli.no_color)),
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code = test_runner::run_tests(path, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

/// Log to stderr, filtered by `RUST_LOG`. Recorded failures are already
/// rendered as diagnostics, so only errors show by default.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn options(first_match: bool) -> ResolverOptions {
    if first_match {
        ResolverOptions::first_match()
    } else {
        ResolverOptions::default()
    }
}

fn load_transcript(path: &str) -> Transcript {
    match transcript_file::load(Path::new(path)) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

fn do_check(args: CheckArgs, no_color: bool) -> i32 {
    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let source = match std::fs::read_to_string(&args.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", args.file, e);
            return 1;
        }
    };
    let transcript = load_transcript(&args.transcript);

    let mut files = SimpleFiles::new();
    let file_id = files.add(args.file.clone(), source.clone());

    let directives = markers::literate::scan(&source);
    let report = resolver::check_document(&transcript, &directives, &options(args.first_match));

    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();
    for error in report.diagnostics(file_id) {
        emit_diagnostic_error(&writer, &config, &files, &error);
    }

    let failures = report.failures();
    eprintln!(
        "{}: {} directive(s), {} failed",
        args.file,
        report.records.len(),
        failures
    );
    if failures > 0 { 1 } else { 0 }
}

fn do_resolve(args: ResolveArgs, no_color: bool) -> i32 {
    let transcript = load_transcript(&args.transcript);
    let options = options(args.first_match);

    let result = match args.consumer {
        Consumer::Reference => {
            resolver::reference(&transcript, &args.path, true, &options).map(|r| {
                match r.target.text() {
                    Some(text) => format!("#{}\n{}", r.anchor, text),
                    None => format!("#{}", r.anchor),
                }
            })
        }
        Consumer::Quote => resolver::quote(&transcript, &args.path, &options),
        Consumer::Assert => {
            resolver::assert_path(&transcript, &args.path, None, &options).map(|_| "ok".into())
        }
    };

    match result {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(ResolveError::Parse(error)) => {
            // Spans in a parse error are relative to the trimmed path, without any title.
            let (_, raw_path) = resolver::contract::split_title(&args.path);
            let mut files = SimpleFiles::new();
            let file_id = files.add("<path>".to_string(), raw_path.trim().to_string());
            let writer = StandardStream::stderr(if no_color {
                ColorChoice::Never
            } else {
                ColorChoice::Auto
            });
            let _ = term::emit_to_write_style(
                &mut writer.lock(),
                &term::Config::default(),
                &files,
                &error.to_diagnostic(file_id, 0),
            );
            1
        }
        Err(error) => {
            print_error(&error);
            1
        }
    }
}

fn print_error(error: &ResolveError) {
    eprintln!("error[{}]: {}", error.kind(), error);
    let fragment = error.fragment();
    if !fragment.is_empty() {
        eprintln!("  in `{}`", fragment);
    }
    if let Some(context) = error.context() {
        eprintln!("  while searching '{}'", context);
    }
}

fn emit_diagnostic_error(
    writer: &StandardStream,
    config: &term::Config,
    files: &SimpleFiles<String, String>,
    error: &DiagnosticError,
) {
    let Some(span) = &error.span else {
        print_error(&error.error);
        return;
    };

    let fragment = error.error.fragment();
    let mut label = Label::primary(error.source_id, span.clone());
    if !fragment.is_empty() {
        label = label.with_message(format!("in `{}`", fragment));
    }
    let mut notes = Vec::new();
    if let ResolveError::Parse(parse) = &error.error {
        notes.extend(parse.notes.iter().cloned());
    }
    if let Some(context) = error.error.context() {
        notes.push(format!("while searching '{}'", context));
    }

    let diagnostic = Diagnostic::new(Severity::Error)
        .with_message(error.to_string())
        .with_code(error.error.kind().as_str())
        .with_labels(vec![label])
        .with_notes(notes);
    let _ = term::emit_to_write_style(&mut writer.lock(), config, files, &diagnostic);
}
