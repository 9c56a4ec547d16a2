use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use markers::Transcript;
use resolver::{DiagnosticError, MultiMatch, Outcome, Report, ResolverOptions};

#[derive(Debug, Deserialize)]
pub struct ExpectedError {
    /// Substring that must appear in the error message.
    pub contains: String,

    /// If set, the error's span must start on this 1-based line of the document body.
    #[serde(default)]
    pub line: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Transcript the document is checked against.
    #[serde(default)]
    pub transcript: Transcript,

    /// Multi-match policy. Defaults to reporting ambiguity.
    #[serde(default)]
    pub multi_match: MultiMatch,

    /// Expected number of failing directives. Defaults to zero.
    #[serde(default)]
    pub expect_failures: Option<usize>,

    /// Expected errors, in document order. If present, count and content are checked.
    #[serde(default)]
    pub expect_errors: Option<Vec<ExpectedError>>,

    /// Expected text of every successful quotation, in document order.
    #[serde(default)]
    pub expect_quotes: Option<Vec<String>>,
}

/// Split a `.test.md` file into its TOML config and Markdown body.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}');

    let after_open = content
        .strip_prefix("---")
        .ok_or("missing opening --- frontmatter delimiter")?;
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest = &after_open[close_pos + 4..];
    let body = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, body))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

fn run_single_test(path: &Path) -> TestResult {
    let fail = |description: Option<String>, reason: String| TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Fail(reason),
    };

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return fail(None, format!("cannot read file: {}", e)),
    };

    let (config, body) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => return fail(None, format!("frontmatter error: {}", e)),
    };
    let description = config.description.clone();

    let options = ResolverOptions {
        multi_match: config.multi_match,
    };
    let directives = markers::literate::scan(body);
    let report = resolver::check_document(&config.transcript, &directives, &options);

    match evaluate(&config, body, &report) {
        Some(reason) => fail(description, reason),
        None => TestResult {
            path: path.to_path_buf(),
            description,
            outcome: TestOutcome::Pass,
        },
    }
}

/// Compare a report with the frontmatter's expectations. Returns `Some(reason)` on mismatch.
fn evaluate(config: &TestConfig, body: &str, report: &Report) -> Option<String> {
    let diagnostics = report.diagnostics(0);

    if let Some(expected) = &config.expect_errors {
        if let Some(reason) = check_errors(body, &diagnostics, expected) {
            return Some(reason);
        }
    }

    let expected_failures = config
        .expect_failures
        .or(config.expect_errors.as_ref().map(Vec::len))
        .unwrap_or(0);
    if report.failures() != expected_failures {
        return Some(format!(
            "expected {} failure(s), got {}\n{}",
            expected_failures,
            report.failures(),
            list_errors(&diagnostics)
        ));
    }

    if let Some(expected) = &config.expect_quotes {
        let actual: Vec<&str> = report
            .records
            .iter()
            .filter_map(|r| match &r.result {
                Ok(Outcome::Quoted(text)) => Some(text.as_str()),
                _ => None,
            })
            .collect();
        if actual != expected.iter().map(String::as_str).collect::<Vec<_>>() {
            return Some(format!(
                "quotation mismatch\n  expected: {:?}\n  actual:   {:?}",
                expected, actual
            ));
        }
    }

    None
}

fn list_errors(diagnostics: &[DiagnosticError]) -> String {
    if diagnostics.is_empty() {
        return "  actual errors:\n    (none)".to_string();
    }
    let lines: Vec<String> = diagnostics.iter().map(|d| format!("    - {}", d)).collect();
    format!("  actual errors:\n{}", lines.join("\n"))
}

/// Convert a byte offset in `source` to a 1-based line number.
fn byte_offset_to_line(source: &str, offset: usize) -> usize {
    source[..offset.min(source.len())]
        .bytes()
        .filter(|&b| b == b'\n')
        .count()
        + 1
}

/// Check that actual errors match expectations. Returns `Some(reason)` on mismatch.
fn check_errors(
    source: &str,
    diagnostics: &[DiagnosticError],
    expected: &[ExpectedError],
) -> Option<String> {
    if diagnostics.len() != expected.len() {
        return Some(format!(
            "expected {} error(s), got {}\n{}",
            expected.len(),
            diagnostics.len(),
            list_errors(diagnostics)
        ));
    }

    for (i, (actual, expected)) in diagnostics.iter().zip(expected.iter()).enumerate() {
        let msg = actual.to_string();

        if !msg.contains(&expected.contains) {
            return Some(format!(
                "error[{}]: expected message containing \"{}\", got: {}",
                i, expected.contains, msg
            ));
        }

        if let Some(expected_line) = expected.line {
            let Some(span) = &actual.span else {
                return Some(format!(
                    "error[{}]: expected on line {}, but error has no span",
                    i, expected_line
                ));
            };
            let actual_line = byte_offset_to_line(source, span.start);
            if actual_line != expected_line {
                return Some(format!(
                    "error[{}]: expected on line {}, but span is on line {}",
                    i, expected_line, actual_line
                ));
            }
        }
    }

    None
}

/// Discover `.test.md` files grouped by category (subfolder relative to root).
/// Files directly in `root` get category "" (uncategorized).
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.ends_with(".test.md") {
                let category = path
                    .parent()
                    .and_then(|p| p.strip_prefix(root).ok())
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_default();
                out.entry(category).or_default().push(path);
            }
        }
    }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no .test.md files found in {}", path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        let label = if cat.is_empty() { "(root)" } else { cat.as_str() };
        eprintln!("  {} ({} tests)", label, files.len());
    }
}

fn pass_label(no_color: bool) -> &'static str {
    if no_color { "PASS" } else { "\x1b[32mPASS\x1b[0m" }
}

fn fail_label(no_color: bool) -> &'static str {
    if no_color { "FAIL" } else { "\x1b[31mFAIL\x1b[0m" }
}

fn bold(s: &str, no_color: bool) -> String {
    if no_color {
        s.to_string()
    } else {
        format!("\x1b[1m{}\x1b[0m", s)
    }
}

fn label_of(result: &TestResult) -> &str {
    result.description.as_deref().unwrap_or_else(|| {
        result
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("?")
    })
}

/// Select the categories to run. Unknown requests are reported and skipped.
fn filter_categories<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'a str, &'a Vec<PathBuf>> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v)).collect();
    }
    let mut filtered = BTreeMap::new();
    for requested in requested {
        let req = requested.trim_matches('/');
        let prefix = format!("{}/", req);
        let mut found = false;
        for (cat, files) in all {
            if cat == req || cat.starts_with(&prefix) {
                filtered.insert(cat.as_str(), files);
                found = true;
            }
        }
        if !found {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                all.keys()
                    .map(|k| if k.is_empty() { "(root)" } else { k.as_str() })
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    filtered
}

/// Run all `.test.md` files under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let groups: Vec<(String, Vec<PathBuf>)> = if path.is_file() {
        // Single file mode ignores categories.
        vec![(String::new(), vec![path.to_path_buf()])]
    } else {
        let all = discover_categorized(path);
        if all.is_empty() {
            eprintln!("no .test.md files found in {}", path.display());
            return 1;
        }
        let selected = filter_categories(&all, categories);
        if selected.is_empty() {
            eprintln!("no matching categories found");
            return 1;
        }
        selected
            .into_iter()
            .map(|(cat, files)| (cat.to_string(), files.clone()))
            .collect()
    };

    let single = path.is_file();
    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (cat, files) in &groups {
        if !single {
            let header = if cat.is_empty() { "(root)" } else { cat.as_str() };
            eprintln!();
            eprintln!("{}", bold(header, no_color));
        }

        for file in files {
            let result = run_single_test(file);
            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", pass_label(no_color), label_of(&result));
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", fail_label(no_color), label_of(&result));
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for f in &failures {
            eprintln!();
            eprintln!("  --- {} ---", f.path.display());
            if let TestOutcome::Fail(reason) = &f.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    let failed = failures.len();
    if failed == 0 {
        let ok = if no_color { "ok" } else { "\x1b[32mok\x1b[0m" };
        eprintln!("test result: {}. {} passed, 0 failed", ok, passed);
        0
    } else {
        let bad = if no_color { "FAILED" } else { "\x1b[31mFAILED\x1b[0m" };
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            bad,
            passed,
            failed,
            passed + failed
        );
        1
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    const PASSING: &str = r#"---
description = "quotes a conclusion"
expect_quotes = ["True"]

[[transcript.blocks]]

[[transcript.blocks.sentences]]
input = "Goal True."
goals = [{ conclusion = "True" }]

[[transcript.blocks.sentences]]
input = "exact I."
---
# Demo

```coq
Goal True.
exact I.
```

The goal is `mquote:.s(Goal).g#0.ccl`.
"#;

    const EXPECTED_FAILURE: &str = r#"---
transcript = { blocks = [{ sentences = [{ input = "exact I." }] }] }

[[expect_errors]]
contains = "No message matches ''"
line = 2
---
```massert .s(exact)
.msg{*}
```
"#;

    fn write(dir: &Path, relative: &str, content: &str) -> PathBuf {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create dir");
        }
        fs::write(&path, content).expect("write test file");
        path
    }

    #[test]
    fn frontmatter_and_body() {
        let (config, body) = parse_test_file(PASSING).expect("parse failed");
        assert_eq!(config.description.as_deref(), Some("quotes a conclusion"));
        assert_eq!(config.multi_match, MultiMatch::Ambiguous);
        assert_eq!(config.transcript.blocks[0].sentences.len(), 2);
        assert!(body.starts_with("# Demo"));
    }

    #[test]
    fn frontmatter_is_required() {
        assert!(parse_test_file("# no frontmatter").is_err());
        assert!(parse_test_file("---\ndescription = \"x\"\n").is_err());
    }

    #[test]
    fn passing_and_expected_failures() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ok = write(dir.path(), "quote.test.md", PASSING);
        assert!(matches!(run_single_test(&ok).outcome, TestOutcome::Pass));

        let expected = write(dir.path(), "assert/empty.test.md", EXPECTED_FAILURE);
        let result = run_single_test(&expected);
        if let TestOutcome::Fail(reason) = &result.outcome {
            panic!("unexpected failure: {}", reason);
        }

        assert_eq!(run_tests(dir.path(), true, &[]), 0);
        assert_eq!(run_tests(dir.path(), true, &["assert".to_string()]), 0);
    }

    #[test]
    fn unexpected_failure_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let broken = PASSING.replace("expect_quotes = [\"True\"]", "expect_quotes = [\"False\"]");
        let path = write(dir.path(), "broken.test.md", &broken);
        match run_single_test(&path).outcome {
            TestOutcome::Fail(reason) => assert!(reason.contains("quotation mismatch"), "{}", reason),
            TestOutcome::Pass => panic!("test unexpectedly passed"),
        }
        assert_eq!(run_tests(&path, true, &[]), 1);
    }

    #[test]
    fn categories_follow_folders() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "a.test.md", PASSING);
        write(dir.path(), "quote/b.test.md", PASSING);
        write(dir.path(), "quote/nested/c.test.md", PASSING);
        let categories = discover_categorized(dir.path());
        let names: Vec<&str> = categories.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["", "quote", "quote/nested"]);

        let selected = filter_categories(&categories, &["quote".to_string()]);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn bundled_suites_pass() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../tests");
        assert_eq!(run_tests(&root, true, &[]), 0);
    }

    #[test]
    fn bundled_demo_checks_cleanly() {
        let demos = Path::new(env!("CARGO_MANIFEST_DIR")).join("../demos");
        let source = fs::read_to_string(demos.join("addition.md")).expect("read demo");
        let transcript =
            crate::transcript_file::load(&demos.join("addition.toml")).expect("load transcript");
        let directives = markers::literate::scan(&source);
        let report =
            resolver::check_document(&transcript, &directives, &ResolverOptions::default());
        assert_eq!(report.failures(), 0, "{:?}", report.diagnostics(0));
        assert_eq!(report.records.len(), 12);
    }

    #[test]
    fn line_numbers_are_one_based() {
        assert_eq!(byte_offset_to_line("a\nb\nc", 0), 1);
        assert_eq!(byte_offset_to_line("a\nb\nc", 4), 3);
    }
}
