//! The operational semantics engine: computes the one-step transitions of a
//! process term under a program environment.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use crate::action::{Action, Kind};
use crate::error::EngineError;
use crate::process::Process;
use crate::program::Program;

/// One edge of the LTS: `from --( action )-> to`.
#[derive(Debug, Clone)]
pub struct Transition {
    pub action: Action,
    pub from: Rc<Process>,
    pub to: Rc<Process>,
}

impl Transition {
    fn new(action: Action, from: Rc<Process>, to: Rc<Process>) -> Self {
        Self { action, from, to }
    }

    pub fn compare(&self, other: &Self) -> Ordering {
        self.action.compare(&other.action).then_with(|| self.from.compare(&other.from)).then_with(|| self.to.compare(&other.to))
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}   --( {} )->   {}", self.from, self.action, self.to)
    }
}

impl PartialEq for Transition {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}
impl Eq for Transition {}
impl PartialOrd for Transition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}
impl Ord for Transition {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

/// Computes the ordered set of one-step transitions of `term`.
///
/// Pure: the same `(term, program, fold)` always yields the same result.
/// Fails with [`EngineError::UnresolvedInput`] if any surviving transition
/// still carries an unmatched RECV input variable (§4.3's top-level
/// post-condition).
pub fn transitions(term: &Rc<Process>, program: &Program, fold: bool) -> Result<BTreeSet<Transition>, EngineError> {
    let seen = BTreeSet::new();
    let result = transitions_rec(term, program, fold, &seen)?;
    for t in &result {
        if t.action.kind == Kind::Recv && !t.action.input.is_empty() {
            return Err(EngineError::UnresolvedInput { name: t.action.name.clone() });
        }
    }
    Ok(result)
}

fn rewrite_from(trans: BTreeSet<Transition>, from: &Rc<Process>) -> BTreeSet<Transition> {
    trans.into_iter().map(|t| Transition::new(t.action, Rc::clone(from), t.to)).collect()
}

fn transitions_rec(
    term: &Rc<Process>,
    program: &Program,
    fold: bool,
    seen: &BTreeSet<String>,
) -> Result<BTreeSet<Transition>, EngineError> {
    match term.as_ref() {
        Process::Null => Ok(BTreeSet::new()),
        Process::Term => Ok(BTreeSet::from([Transition::new(Action::delta(), Rc::clone(term), Process::null())])),
        Process::Name { name, args } => {
            if seen.contains(name) {
                return Err(EngineError::UnguardedRecursion { name: name.clone() });
            }
            let mut values = Vec::with_capacity(args.len());
            for a in args {
                values.push(a.eval()?);
            }
            let Some(body) = program.get(name, &values, fold) else {
                return Ok(BTreeSet::new());
            };
            let mut seen2 = seen.clone();
            seen2.insert(name.clone());
            let inner = transitions_rec(&body, program, fold, &seen2)?;
            Ok(rewrite_from(inner, term))
        }
        Process::Prefix { action, body } => {
            let action2 = eval_action(action)?;
            Ok(BTreeSet::from([Transition::new(action2, Rc::clone(term), Rc::clone(body))]))
        }
        Process::Choice(l, r) => {
            let mut result = transitions_rec(l, program, fold, seen)?;
            result.extend(transitions_rec(r, program, fold, seen)?);
            Ok(rewrite_from(result, term))
        }
        Process::Parallel(l, r) => parallel_transitions(term, l, r, program, fold, seen),
        Process::Restrict { body, set, complement } => {
            let inner = transitions_rec(body, program, fold, seen)?;
            let mut result = BTreeSet::new();
            for t in inner {
                let keep = t.action.kind == Kind::Tau
                    || t.action.kind == Kind::Delta
                    || (set.contains(&t.action.plain()) || set.contains(&t.action.none_form())) == *complement;
                if keep {
                    let to = Process::restrict(t.to, set.clone(), *complement);
                    result.insert(Transition::new(t.action, Rc::clone(term), to));
                }
            }
            Ok(result)
        }
        Process::Sequential(l, r) => {
            let inner = transitions_rec(l, program, fold, seen)?;
            let mut result = BTreeSet::new();
            for t in inner {
                if t.action.kind == Kind::Delta {
                    result.insert(Transition::new(Action::tau(), Rc::clone(term), Rc::clone(r)));
                } else {
                    let to = Process::sequential(t.to, Rc::clone(r));
                    result.insert(Transition::new(t.action, Rc::clone(term), to));
                }
            }
            Ok(result)
        }
        Process::When { cond, body } => {
            if cond.eval()? == 0 {
                Ok(BTreeSet::new())
            } else {
                let inner = transitions_rec(body, program, fold, seen)?;
                Ok(rewrite_from(inner, term))
            }
        }
    }
}

/// Normalises a prefix action's value/parameter expressions to constants at
/// emission time (the fold-like step every emitted transition gets,
/// independent of the `fold` flag — matches `CCSAction::eval` in the
/// reference implementation).
fn eval_action(action: &Action) -> Result<Action, EngineError> {
    let param = match &action.param {
        Some(p) => Some(crate::expr::Expression::const_(p.eval()?)),
        None => None,
    };
    let exp = match &action.exp {
        Some(e) => Some(crate::expr::Expression::const_(e.eval()?)),
        None => None,
    };
    Ok(Action { kind: action.kind, name: action.name.clone(), param, input: action.input.clone(), exp })
}

fn parallel_transitions(
    term: &Rc<Process>,
    l: &Rc<Process>,
    r: &Rc<Process>,
    program: &Program,
    fold: bool,
    seen: &BTreeSet<String>,
) -> Result<BTreeSet<Transition>, EngineError> {
    let trans_l = transitions_rec(l, program, fold, seen)?;
    let trans_r = transitions_rec(r, program, fold, seen)?;
    let mut result = BTreeSet::new();

    // 1: interleave left.
    for t in &trans_l {
        if t.action.kind != Kind::Delta {
            let to = Process::parallel(Rc::clone(&t.to), Rc::clone(r));
            result.insert(Transition::new(t.action.clone(), Rc::clone(term), to));
        }
    }
    // 2: interleave right.
    for t in &trans_r {
        if t.action.kind != Kind::Delta {
            let to = Process::parallel(Rc::clone(l), Rc::clone(&t.to));
            result.insert(Transition::new(t.action.clone(), Rc::clone(term), to));
        }
    }
    // 3: handshake.
    for t1 in &trans_l {
        for t2 in &trans_r {
            if let Some((l_to, r_to)) = try_handshake(t1, t2, fold)? {
                let to = Process::parallel(l_to, r_to);
                result.insert(Transition::new(Action::tau(), Rc::clone(term), to));
            }
        }
    }
    // 4: joint termination. Only the first DELTA offered by each side is
    // taken, emitting exactly one joint DELTA regardless of how many
    // distinct DELTA targets either side has.
    if let (Some(t1), Some(t2)) =
        (trans_l.iter().find(|t| t.action.kind == Kind::Delta), trans_r.iter().find(|t| t.action.kind == Kind::Delta))
    {
        let to = Process::parallel(Rc::clone(&t1.to), Rc::clone(&t2.to));
        result.insert(Transition::new(Action::delta(), Rc::clone(term), to));
    }
    Ok(result)
}

/// Attempts to synchronise a left-hand transition `t1` with a right-hand
/// transition `t2`. Returns the new `(left, right)` continuations on a
/// successful handshake.
fn try_handshake(t1: &Transition, t2: &Transition, fold: bool) -> Result<Option<(Rc<Process>, Rc<Process>)>, EngineError> {
    if t1.action.plain() != t2.action.complement().plain() {
        return Ok(None);
    }
    let (send, recv, send_to, recv_to, send_is_left) = if t1.action.kind == Kind::Send {
        (&t1.action, &t2.action, &t1.to, &t2.to, true)
    } else if t2.action.kind == Kind::Send {
        (&t2.action, &t1.action, &t2.to, &t1.to, false)
    } else {
        return Ok(None);
    };

    let recv_to2 = match (&send.exp, &recv.exp, recv.input.is_empty()) {
        (None, None, true) => Rc::clone(recv_to),
        (Some(sval), None, false) => {
            let v = sval.eval()?;
            recv_to.subst(&recv.input, v, fold)
        }
        (Some(sval), Some(rval), true) => {
            let sv = sval.eval()?;
            let rv = rval.eval()?;
            if sv != rv {
                return Ok(None);
            }
            Rc::clone(recv_to)
        }
        _ => return Ok(None),
    };

    Ok(Some(if send_is_left { (Rc::clone(send_to), recv_to2) } else { (recv_to2, Rc::clone(send_to)) }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::expr::{BinaryOp, Expression};
    use crate::program::{Binding, Program};
    use std::collections::BTreeMap;

    fn empty_program(main: Rc<Process>) -> Program {
        Program::new(BTreeMap::new(), main)
    }

    #[test]
    fn null_has_no_transitions() {
        let p = Process::null();
        let program = empty_program(Rc::clone(&p));
        assert!(transitions(&p, &program, true).unwrap().is_empty());
    }

    #[test]
    fn term_performs_delta_to_null() {
        let p = Process::term();
        let program = empty_program(Rc::clone(&p));
        let ts = transitions(&p, &program, true).unwrap();
        assert_eq!(ts.len(), 1);
        let t = ts.into_iter().next().unwrap();
        assert_eq!(t.action.kind, Kind::Delta);
        assert!(matches!(t.to.as_ref(), Process::Null));
    }

    #[test]
    fn scenario_handshake() {
        // (a!.0 | a?.0) --a!--> 0|a?.0, --a?--> a!.0|0, --i--> 0|0 : exactly three.
        let main = Process::parallel(
            Process::prefix(Action::send("a", None, None), Process::null()),
            Process::prefix(Action::recv("a", None, "", None), Process::null()),
        );
        let program = empty_program(Rc::clone(&main));
        let ts = transitions(&main, &program, true).unwrap();
        assert_eq!(ts.len(), 3);
    }

    #[test]
    fn scenario_value_passing() {
        // (a!1.0 | a?x.b!x.0)\{a}: one TAU, then one b! (restricted a gone).
        let mut set = BTreeSet::new();
        set.insert(Action::none("a"));
        let main = Process::restrict(
            Process::parallel(
                Process::prefix(Action::send("a", None, Some(Expression::const_(1))), Process::null()),
                Process::prefix(
                    Action::recv("a", None, "x", None),
                    Process::prefix(Action::send("b", None, Some(Expression::id("x"))), Process::null()),
                ),
            ),
            set.clone(),
            false,
        );
        let program = empty_program(Rc::clone(&main));
        let ts = transitions(&main, &program, true).unwrap();
        assert_eq!(ts.len(), 1);
        let t = ts.into_iter().next().unwrap();
        assert_eq!(t.action.kind, Kind::Tau);

        let next_ts = transitions(&t.to, &program, true).unwrap();
        assert_eq!(next_ts.len(), 1);
        let t2 = next_ts.into_iter().next().unwrap();
        assert_eq!(t2.action.kind, Kind::Send);
        assert_eq!(t2.action.name, "b");
    }

    #[test]
    fn scenario_sequential_termination() {
        // (1; a.0): DELTA converts to TAU leading to a.0, then `a` to 0.
        let main = Process::sequential(Process::term(), Process::prefix(Action::none("a"), Process::null()));
        let program = empty_program(Rc::clone(&main));
        let ts = transitions(&main, &program, true).unwrap();
        assert_eq!(ts.len(), 1);
        let t = ts.into_iter().next().unwrap();
        assert_eq!(t.action.kind, Kind::Tau);
        assert_eq!(t.to.to_string(), "a.0");
    }

    #[test]
    fn unguarded_recursion_errors() {
        let mut bindings = BTreeMap::new();
        bindings.insert("X".to_string(), Binding::new("X", vec![], Process::name("X", vec![])));
        let program = Program::new(bindings, Process::name("X", vec![]));
        let err = transitions(&program.main, &program, true).unwrap_err();
        assert!(matches!(err, EngineError::UnguardedRecursion { .. }));
    }

    #[test]
    fn guarded_recursion_succeeds() {
        let mut bindings = BTreeMap::new();
        bindings.insert(
            "X".to_string(),
            Binding::new("X", vec![], Process::prefix(Action::none("a"), Process::name("X", vec![]))),
        );
        let program = Program::new(bindings, Process::name("X", vec![]));
        let ts = transitions(&program.main, &program, true).unwrap();
        assert_eq!(ts.len(), 1);
    }

    #[test]
    fn choice_with_null_matches_left_transitions() {
        let l = Process::prefix(Action::none("a"), Process::null());
        let p = Process::choice(Rc::clone(&l), Process::null());
        let program = empty_program(Rc::clone(&p));
        let from_choice = transitions(&p, &program, true).unwrap();
        let from_l = transitions(&l, &program, true).unwrap();
        assert_eq!(from_choice.len(), from_l.len());
    }

    #[test]
    fn when_zero_has_no_transitions_when_nonzero_mirrors_body() {
        let body = Process::prefix(Action::none("a"), Process::null());
        let off = Process::when(Expression::const_(0), Rc::clone(&body));
        let on = Process::when(Expression::const_(1), Rc::clone(&body));
        let program = empty_program(Process::null());
        assert!(transitions(&off, &program, true).unwrap().is_empty());
        assert_eq!(transitions(&on, &program, true).unwrap().len(), 1);
    }

    #[test]
    fn restriction_complement_keeps_only_listed_actions() {
        // p := a.p + b.p ; main p\{*, a}: only `a` transitions survive.
        let mut bindings = BTreeMap::new();
        let body = Process::choice(
            Process::prefix(Action::none("a"), Process::name("p", vec![])),
            Process::prefix(Action::none("b"), Process::name("p", vec![])),
        );
        bindings.insert("p".to_string(), Binding::new("p", vec![], body));
        let mut set = BTreeSet::new();
        set.insert(Action::none("a"));
        let main = Process::restrict(Process::name("p", vec![]), set, true);
        let program = Program::new(bindings, main);
        let ts = transitions(&program.main, &program, true).unwrap();
        assert_eq!(ts.len(), 1);
        let t = ts.into_iter().next().unwrap();
        assert_eq!(t.action.name, "a");
    }

    #[test]
    fn unresolved_recv_input_is_rejected_at_top_level() {
        let p = Process::prefix(Action::recv("a", None, "x", None), Process::null());
        let program = empty_program(Rc::clone(&p));
        let err = transitions(&p, &program, true).unwrap_err();
        assert!(matches!(err, EngineError::UnresolvedInput { .. }));
    }

    #[test]
    fn deadlock_scenario_both_branches_are_terminal() {
        // p := a?x.when (x == 0) 1 + a?x.when (x != 0) 0
        // main (a!5.0 | p)\{a}: both reachable states after the handshake are
        // deadlocks (no outgoing transitions) — one still shows the guarded
        // `1` behind a now-false condition, the other reduces to `0`.
        let x_eq_0 = Process::prefix(
            Action::recv("a", None, "x", None),
            Process::when(
                Expression::binary(BinaryOp::Eq, Expression::id("x"), Expression::const_(0)),
                Process::term(),
            ),
        );
        let x_neq_0 = Process::prefix(
            Action::recv("a", None, "x", None),
            Process::when(
                Expression::binary(BinaryOp::Neq, Expression::id("x"), Expression::const_(0)),
                Process::null(),
            ),
        );
        let p = Process::choice(x_eq_0, x_neq_0);
        let mut set = BTreeSet::new();
        set.insert(Action::none("a"));
        let main = Process::restrict(
            Process::parallel(Process::prefix(Action::send("a", None, Some(Expression::const_(5))), Process::null()), p),
            set,
            false,
        );
        let program = empty_program(Rc::clone(&main));
        let ts = transitions(&main, &program, true).unwrap();
        assert_eq!(ts.len(), 2);
        for t in &ts {
            assert_eq!(t.action.kind, Kind::Tau);
            assert!(transitions(&t.to, &program, true).unwrap().is_empty());
        }
    }
}
