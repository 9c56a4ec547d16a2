use markers::literate::scan;
use markers::transcript::{Block, Goal, Hypothesis, Message, Sentence};
use markers::{ErrorKind, Key, Pattern, Transcript};
use pretty_assertions::assert_eq;
use resolver::{
    MultiMatch, Outcome, ResolveError, ResolverOptions, Target, TargetKind, assert_path,
    check_document, quote, reference, resolve_str,
};

/// Three blocks: a small proof about addition, a trivial proof, and a block
/// captured in degraded mode (inputs only).
fn document() -> Transcript {
    let n = || Hypothesis::new(&["n"], "nat");
    Transcript::new(vec![
        Block::named(
            "intro",
            vec![
                Sentence::new("Goal forall n : nat, n + 0 = n.")
                    .with_goals(vec![Goal::new("forall n : nat, n + 0 = n")]),
                Sentence::new("intros n.")
                    .with_goals_before(vec![Goal::new("forall n : nat, n + 0 = n")])
                    .with_goals(vec![Goal::new("n + 0 = n").with_hypothesis(n())]),
                Sentence::new("pose proof (plus_n_O n) as H.").with_goals(vec![
                    Goal::new("n + 0 = n")
                        .with_hypothesis(n())
                        .with_hypothesis(Hypothesis::new(&["H"], "n = n + 0")),
                ]),
                Sentence::new("Check n.").with_messages(vec![Message::new("n\n     : nat")]),
                Sentence::new("Qed."),
            ],
        ),
        Block::new(vec![
            Sentence::new("Goal True.").with_goals(vec![Goal::new("True").with_name("main")]),
            Sentence::new("exact I."),
            Sentence::new("Qed."),
        ]),
        Block::new(vec![Sentence::new("Check nat.")]),
    ])
}

fn options() -> ResolverOptions {
    ResolverOptions::default()
}

fn ok(raw: &str) -> Target {
    resolve_str(&document(), raw, &options()).expect("resolution failed")
}

fn text(raw: &str) -> String {
    ok(raw).text.expect("null target")
}

fn err(raw: &str) -> ResolveError {
    resolve_str(&document(), raw, &options()).expect_err("resolution unexpectedly succeeded")
}

// ---- Structural targets ----

#[test]
fn goal_is_a_structural_target() {
    let single = Transcript::new(vec![Block::new(vec![
        Sentence::new("Goal True.").with_goals(vec![Goal::new("True")]),
    ])]);
    let target = resolve_str(&single, ".s(Goal).g#0", &options()).expect("resolution failed");
    assert_eq!(target.kind, TargetKind::Structural);
    assert_eq!(target.origin, Key::Goal);
    assert_eq!(target.text(), Some("============================\nTrue"));
    assert_eq!(target.anchor.to_string(), "m-b0-s0-g0");
}

#[test]
fn structural_natural_text() {
    assert_eq!(text(".s(intros)"), "intros n.");
    assert_eq!(text(".s(intros).h#n"), "n : nat");
    assert_eq!(text(".s(Check n.).msg#0"), "n\n     : nat");
    assert_eq!(text(".io#2"), "Check nat.");
    assert_eq!(text(".io#1"), "Goal True.\nexact I.\nQed.");
}

// ---- Leaf projections ----

#[test]
fn leaves() {
    assert_eq!(text(".s(intros).in"), "intros n.");
    assert_eq!(text(".s(intros).g#0.ccl"), "n + 0 = n");
    assert_eq!(text(".s(pose).h#H.type"), "n = n + 0");
    assert_eq!(text(".s(pose).h(n + 0).name"), "H");
    assert_eq!(text(".s(Check n.).msg{*nat}.body"), "n\n     : nat");
    assert_eq!(text(".io#intro.name"), "intro");
    assert_eq!(text(".s(Goal True).g#main.ccl"), "True");

    let target = ok(".s(intros).g#0.ccl");
    assert_eq!(target.kind, TargetKind::Leaf);
    assert_eq!(target.origin, Key::Goal);
}

#[test]
fn output_lists_messages_then_goals() {
    assert_eq!(text(".s(Check n.).out"), "n\n     : nat");
    assert_eq!(
        text(".s(intros).out"),
        "n : nat\n============================\nn + 0 = n"
    );
}

#[test]
fn nullable_leaves() {
    assert!(ok(".s(Goal True).g#0.name").text().is_some());
    assert!(ok(".s(intros).g#0.name").is_null());
    assert!(ok(".io#1.name").is_null());
}

#[test]
fn leaf_not_defined_on_node() {
    let e = err(".s(intros).name");
    assert_eq!(e.kind(), ErrorKind::ComponentMismatch);
    assert_eq!(e.to_string(), "`.name` is not defined on a sentence");
    assert_eq!(e.fragment(), ".name");

    assert_eq!(err(".s(Check n.).msg#0.type").kind(), ErrorKind::ComponentMismatch);
    assert_eq!(err(".in").kind(), ErrorKind::ComponentMismatch);
}

#[test]
fn leaf_followed_by_component() {
    let e = err(".s(intros).in.g#0");
    assert_eq!(e.kind(), ErrorKind::ComponentMismatch);
    assert_eq!(e.fragment(), ".in.g#0");
}

#[test]
fn structural_component_in_wrong_scope() {
    let e = err(".s(Check n.).msg#0.h#n");
    assert_eq!(e.kind(), ErrorKind::ComponentMismatch);
    assert_eq!(e.fragment(), ".h#n");
}

// ---- Anchoring ----

#[test]
fn goal_without_sentence() {
    let e = err(".g#0.in");
    assert_eq!(e.kind(), ErrorKind::MissingAnchor);
    assert_eq!(e.to_string(), "Missing `.s(…)` sentence component in path");
    assert_eq!(e.fragment(), ".g#0");

    assert_eq!(err(".io#intro.h#n").kind(), ErrorKind::MissingAnchor);
    assert_eq!(err(".msg{*}").kind(), ErrorKind::MissingAnchor);
}

#[test]
fn hypothesis_directly_after_sentence_uses_first_goal() {
    let target = ok(".s(intros).h#n.type");
    assert_eq!(target.text(), Some("nat"));
    assert_eq!(target.anchor.to_string(), "m-b0-s1-g0-h0");

    let e = err(".s(exact).h#n");
    assert_eq!(e.kind(), ErrorKind::NoMatch);
    assert_eq!(e.to_string(), "No goal matches '0'");
    assert_eq!(e.context(), Some("exact I."));
}

// ---- No match / unknown names ----

#[test]
fn goal_index_out_of_range() {
    let e = err(".s(intros).g#25");
    assert_eq!(e.kind(), ErrorKind::NoMatch);
    assert_eq!(e.to_string(), "No goal matches '25'");
    assert_eq!(e.fragment(), ".g#25");
    assert_eq!(e.context(), Some("intros n."));
}

#[test]
fn sentence_not_found() {
    let e = err(".s(Admitted).in");
    assert_eq!(e.kind(), ErrorKind::NoMatch);
    assert_eq!(e.to_string(), "No sentence matches 'Admitted'");
}

#[test]
fn unknown_names() {
    let e = err(".io#nope.s#0");
    assert_eq!(e.kind(), ErrorKind::UnknownReference);
    assert_eq!(e.to_string(), "Unknown block 'nope'");

    let e = err(".s(intros).h#x");
    assert_eq!(e.kind(), ErrorKind::UnknownReference);
    assert_eq!(e.to_string(), "Unknown hypothesis 'x'");
}

#[test]
fn degraded_block_has_no_outputs() {
    assert_eq!(text(".io#2.s#0.in"), "Check nat.");
    let e = err(".io#2.s#0.g#0");
    assert_eq!(e.kind(), ErrorKind::NoMatch);
    assert_eq!(e.to_string(), "No goal matches '0'");
    assert_eq!(err(".io#2.s#0.msg#0").kind(), ErrorKind::NoMatch);
}

// ---- Ambiguity ----

#[test]
fn sentence_matching_in_several_blocks() {
    let e = err(".s(Qed.)");
    assert_eq!(e.kind(), ErrorKind::Ambiguous);
    assert!(e.to_string().contains("add a `.io` block selector"), "{}", e);

    assert_eq!(ok(".io#1.s(Qed.)").anchor.to_string(), "m-b1-s2");
    assert_eq!(ok(".io#intro.s(Qed.)").anchor.to_string(), "m-b0-s4");
}

#[test]
fn block_ambiguity_is_deferred() {
    // Both of the first two blocks contain `Qed.`, but only one has `exact`.
    assert_eq!(ok(".io(Qed.).s(exact)").anchor.to_string(), "m-b1-s1");

    let e = err(".io(Qed.).in");
    assert_eq!(e.kind(), ErrorKind::Ambiguous);
    assert_eq!(e.fragment(), ".io(Qed.)");
    assert_eq!(err(".io(Qed.)").kind(), ErrorKind::Ambiguous);
}

#[test]
fn several_matches_in_one_block() {
    let e = err(".io#intro.s(n)");
    assert_eq!(e.kind(), ErrorKind::Ambiguous);

    let first = ResolverOptions {
        multi_match: MultiMatch::First,
    };
    let target = resolve_str(&document(), ".io#intro.s(n)", &first).expect("resolution failed");
    assert_eq!(target.anchor.to_string(), "m-b0-s0");

    let target = resolve_str(&document(), ".s(Qed.)", &first).expect("resolution failed");
    assert_eq!(target.anchor.to_string(), "m-b0-s4");
}

#[test]
fn first_match_keeps_block_choice_deferred() {
    let first = ResolverOptions::first_match();
    let resolve = |raw: &str| {
        resolve_str(&document(), raw, &first)
            .expect("resolution failed")
            .anchor
            .to_string()
    };

    // The first block with `Qed.` has no `exact`; the second one does.
    assert_eq!(resolve(".io(Qed.).s(exact)"), "m-b1-s1");
    assert_eq!(resolve(".s(exact)"), "m-b1-s1");

    // Ending on the blocks themselves takes the first in document order.
    assert_eq!(resolve(".io(Qed.)"), "m-b0");
    assert_eq!(resolve(".io(Qed.).in"), "m-b0");
}

// ---- Purity ----

#[test]
fn resolution_is_idempotent_and_read_only() {
    let transcript = document();
    let before = transcript.clone();
    for raw in [".s(pose).h#H.type", ".s(Qed.)", ".g#0.in", ".s(intros).h#n.body"] {
        let first = resolve_str(&transcript, raw, &options());
        let second = resolve_str(&transcript, raw, &options());
        assert_eq!(first, second);
    }
    assert_eq!(transcript, before);
}

// ---- Quotation ----

#[test]
fn quoting_leaves_and_small_nodes() {
    let t = document();
    assert_eq!(
        quote(&t, ".s(Goal True).in", &options()).expect("quote failed"),
        "Goal True."
    );
    assert_eq!(
        quote(&t, ".s(intros).h#n", &options()).expect("quote failed"),
        "n : nat"
    );
}

#[test]
fn quoting_whole_sentences_and_goals_is_rejected() {
    let t = document();
    let e = quote(&t, ".s(Goal True)", &options()).expect_err("quote succeeded");
    assert_eq!(e.kind(), ErrorKind::PolicyViolation);
    assert_eq!(e.to_string(), "Cannot quote a full sentence inline");

    let e = quote(&t, ".s(Goal True).g#0", &options()).expect_err("quote succeeded");
    assert_eq!(e.to_string(), "Cannot quote a full goal inline");

    // A deeper leaf of the same goal resolves fine.
    assert_eq!(
        quote(&t, ".s(Goal True).g#0.ccl", &options()).expect("quote failed"),
        "True"
    );
}

#[test]
fn quoting_a_null_target() {
    let e = quote(&document(), ".s(intros).h#n.body", &options()).expect_err("quote succeeded");
    assert_eq!(e.kind(), ErrorKind::NullTarget);
    assert_eq!(e.to_string(), "Target is null");
}

// ---- Assertions ----

#[test]
fn assertion_on_missing_body() {
    let t = document();
    assert!(
        resolve_str(&t, ".s(pose proof).h#n", &options()).is_ok(),
        "the hypothesis itself resolves"
    );
    let e = assert_path(&t, ".s(pose proof).h#n.body", None, &options())
        .expect_err("assertion passed");
    assert_eq!(e.kind(), ErrorKind::NullTarget);
    assert_eq!(e.to_string(), "Target is null");
}

#[test]
fn assertion_on_missing_messages() {
    let e = assert_path(&document(), ".s(intros).msg{*}", None, &options())
        .expect_err("assertion passed");
    assert_eq!(e.kind(), ErrorKind::NoMatch);
    assert_eq!(e.to_string(), "No message matches ''");
}

#[test]
fn assertion_with_expected_value() {
    let t = document();
    let expected = Pattern::from_expected("{* + 0 = n}");
    assert!(assert_path(&t, ".s(intros).g#0.ccl", Some(&expected), &options()).is_ok());

    let expected = Pattern::from_expected("False");
    let e = assert_path(&t, ".s(Goal True).g#0.ccl", Some(&expected), &options())
        .expect_err("assertion passed");
    assert_eq!(e.kind(), ErrorKind::NoMatch);
    assert!(e.to_string().contains("False"), "{}", e);
    assert!(e.to_string().contains("True"), "{}", e);
}

// ---- References and titles ----

#[test]
fn reference_with_title() {
    let r = reference(&document(), "the intro <.io#intro.s#0>", true, &options())
        .expect("reference failed");
    assert_eq!(r.title.as_deref(), Some("the intro"));
    assert_eq!(r.anchor.to_string(), "m-b0-s0");
}

#[test]
fn reference_accepts_null_targets() {
    let r = reference(&document(), ".s(intros).h#n.body", false, &options())
        .expect("reference failed");
    assert!(r.target.is_null());
    assert_eq!(r.anchor.to_string(), "m-b0-s1-g0-h0");
}

#[test]
fn title_syntax_where_not_allowed() {
    let t = document();
    let e = reference(&t, "x <.s(intros)>", false, &options()).expect_err("reference succeeded");
    assert_eq!(e.kind(), ErrorKind::PolicyViolation);
    let e = quote(&t, "x <.s(intros).in>", &options()).expect_err("quote succeeded");
    assert_eq!(e.kind(), ErrorKind::PolicyViolation);
    let e = assert_path(&t, "x <.s(intros).in>", None, &options()).expect_err("assert succeeded");
    assert_eq!(e.kind(), ErrorKind::PolicyViolation);
}

#[test]
fn syntax_errors_surface_unchanged() {
    let e = err(".io.s(Goal)");
    assert_eq!(e.kind(), ErrorKind::SyntaxError);
    assert_eq!(e.to_string(), "Missing selector after `.io`");
    assert_eq!(e.fragment(), ".io");
}

// ---- Document checking ----

const DOC: &str = "\
# Addition

```coq before
Goal forall n : nat, n + 0 = n.
intros n.
```

Before `mref:.s(intros)` the goal is `mquote:.io#intro.s(intros).g#0.ccl`.

```massert .io#intro.s(intros)
.g#0.ccl => {forall*}
.msg{*}
```

Quoting `mquote:.s(Goal True)` is not allowed.

```coq unfold out .xyz
Goal True.
```
";

#[test]
fn check_document_records_every_outcome() {
    let directives = scan(DOC);
    let report = check_document(&document(), &directives, &options());

    // flags x2, reference, quotation, two assertions, quotation
    assert_eq!(report.records.len(), 7);
    assert_eq!(report.failures(), 3);
    assert!(!report.passed());

    let messages: Vec<String> = report
        .records
        .iter()
        .filter_map(|r| r.result.as_ref().err().map(|e| e.to_string()))
        .collect();
    assert_eq!(
        messages,
        vec![
            "Unrecognized directive flags: .xyz".to_string(),
            "No message matches ''".to_string(),
            "Cannot quote a full sentence inline".to_string(),
        ]
    );
}

#[test]
fn flags_switch_goals_before_execution() {
    let directives = scan(DOC);
    let report = check_document(&document(), &directives, &options());
    let quoted: Vec<&str> = report
        .records
        .iter()
        .filter_map(|r| match &r.result {
            Ok(Outcome::Quoted(text)) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(quoted, vec!["forall n : nat, n + 0 = n"]);
}

#[test]
fn diagnostics_point_into_the_document() {
    let directives = scan(DOC);
    let report = check_document(&document(), &directives, &options());
    let diagnostics = report.diagnostics(7);
    assert_eq!(diagnostics.len(), 3);
    let quote_span = diagnostics[2].span.clone().expect("span");
    assert_eq!(&DOC[quote_span], "`mquote:.s(Goal True)`");
    assert!(diagnostics.iter().all(|d| d.source_id == 7));
}
