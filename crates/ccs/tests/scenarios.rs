//! The six end-to-end scenarios from the specification, driven through the
//! public parse-then-explore API rather than hand-built ASTs.

use ccs::{Action, Kind, Options, dead, ttr};

fn parse(src: &str) -> ccs::Program {
    ccs::parse(src, "scenario").unwrap()
}

#[test]
fn scenario_1_handshake() {
    let program = parse("(a!.0 | a?.0)");
    let ts = ccs::transitions(&program.main, &program, true).unwrap();
    assert_eq!(ts.len(), 3);

    let kinds: Vec<Kind> = ts.iter().map(|t| t.action.kind).collect();
    assert!(kinds.contains(&Kind::Send));
    assert!(kinds.contains(&Kind::Recv));
    assert!(kinds.contains(&Kind::Tau));

    for t in &ts {
        match t.action.kind {
            Kind::Send => assert_eq!(t.to.to_string(), "(0 | a?.0)"),
            Kind::Recv => assert_eq!(t.to.to_string(), "(a!.0 | 0)"),
            Kind::Tau => assert_eq!(t.to.to_string(), "(0 | 0)"),
            other => panic!("unexpected action kind: {other:?}"),
        }
    }
}

#[test]
fn scenario_2_value_passing() {
    let program = parse("(a!1.0 | a?x.b!x.0)\\{a}");
    let ts = ccs::transitions(&program.main, &program, true).unwrap();
    assert_eq!(ts.len(), 1);
    let first = ts.into_iter().next().unwrap();
    assert_eq!(first.action.kind, Kind::Tau);

    let next = ccs::transitions(&first.to, &program, true).unwrap();
    assert_eq!(next.len(), 1);
    let second = next.into_iter().next().unwrap();
    assert_eq!(second.action.kind, Kind::Send);
    assert_eq!(second.action.name, "b");
    assert_eq!(second.action.to_string(), "b!1");

    // And the carried value substituted through correctly, with no further
    // transitions once `b!1` has fired (the restriction already ate `a`).
    let last = ccs::transitions(&second.to, &program, true).unwrap();
    assert!(last.is_empty());
}

#[test]
fn scenario_3_restriction_complement() {
    let program = parse("p := a.p + b.p\np\\{*, a}");
    let ts = ccs::transitions(&program.main, &program, true).unwrap();
    // Only `a` survives a `\{*, a}` restriction; `b` is filtered out.
    assert_eq!(ts.len(), 1);
    let t = ts.into_iter().next().unwrap();
    assert_eq!(t.action, Action::none("a"));

    // The loop is infinite: the same single `a` transition keeps appearing.
    let ts2 = ccs::transitions(&t.to, &program, true).unwrap();
    assert_eq!(ts2.len(), 1);
    assert_eq!(ts2.into_iter().next().unwrap().action, Action::none("a"));
}

#[test]
fn scenario_4_sequential_termination() {
    let program = parse("(1; a.0)");
    let ts = ccs::transitions(&program.main, &program, true).unwrap();
    assert_eq!(ts.len(), 1);
    let t1 = ts.into_iter().next().unwrap();
    assert_eq!(t1.action.kind, Kind::Tau);
    assert_eq!(t1.to.to_string(), "a.0");

    let ts2 = ccs::transitions(&t1.to, &program, true).unwrap();
    assert_eq!(ts2.len(), 1);
    let t2 = ts2.into_iter().next().unwrap();
    assert_eq!(t2.action, Action::none("a"));
    assert_eq!(t2.to.to_string(), "0");
}

#[test]
fn scenario_5_deadlock_detection() {
    let program = parse(
        "p := a?x.when (x == 0) 1 + a?x.when (x != 0) 0\n(a!5.0 | p)\\{a}",
    );

    // After the handshake substitutes x = 5, both branches of the choice
    // reduce to a guarded deadlock (one with a false, unreduced `when 0 1`,
    // one with a true but empty-bodied `when 1 0`) — neither offers any
    // further transition, so `dead` must report a one-step path, not
    // "no deadlock found".
    let (out, warnings) = dead(&program, &Options::default()).unwrap();
    assert!(warnings.is_empty());
    assert_ne!(out, "no deadlock found");
    assert!(out.starts_with('['), "expected a `[i] ~> ...` trace, got: {out}");

    let ts = ccs::transitions(&program.main, &program, true).unwrap();
    assert_eq!(ts.len(), 2);
    for t in &ts {
        assert_eq!(t.action.kind, Kind::Tau);
        assert!(ccs::transitions(&t.to, &program, true).unwrap().is_empty(), "both post-handshake states must be deadlocks");
    }
}

#[test]
fn scenario_6_ttr_iterative_deepening() {
    let program = parse("p := a.(p + 1)\np");

    // Depth 1: `p` only reaches a choice, neither branch of which
    // terminates in a single step, so no trace is reported yet.
    let depth1 = Options { max_depth: 1, ..Options::default() };
    let (out1, warnings1) = ttr(&program, &depth1).unwrap();
    assert!(warnings1.is_empty());
    assert!(out1.is_empty());

    // Depth 2: `[a, e] ~> 0` is reported exactly once.
    let depth2 = Options { max_depth: 2, ..Options::default() };
    let (out2, warnings2) = ttr(&program, &depth2).unwrap();
    assert!(warnings2.is_empty());
    assert_eq!(out2, "[a, e] ~> 0");

    // Depth >= 3 finds nothing new: the search already completed at depth 2.
    let depth3 = Options { max_depth: 3, ..Options::default() };
    let (out3, warnings3) = ttr(&program, &depth3).unwrap();
    assert!(warnings3.is_empty());
    assert_eq!(out3, "[a, e] ~> 0");
}
