//! The exploration driver: `actions`, `graph`, `dead`, `random`, `ttr`, and
//! `echo` over a parsed [`Program`].
//!
//! None of these functions touch stdio: each returns the text it would
//! print plus any warnings collected along the way, leaving the decision of
//! where those land (stdout vs stderr) to the caller.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::rc::Rc;

use rand::Rng;

use crate::action::Action;
use crate::engine::{Transition, transitions};
use crate::error::CcsError;
use crate::process::Process;
use crate::program::Program;

/// Shared knobs for every exploration command, mirroring the CLI's option
/// set one-to-one.
#[derive(Debug, Clone)]
pub struct Options {
    /// Negative means unbounded, matching the reference `-1` default.
    pub max_depth: i64,
    pub ignore_errors: bool,
    pub fold: bool,
    pub full_paths: bool,
    pub omit_names: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self { max_depth: -1, ignore_errors: false, fold: true, full_paths: false, omit_names: false }
    }
}

impl Options {
    fn depth_reached(&self, depth: usize) -> bool {
        self.max_depth >= 0 && depth as i64 >= self.max_depth
    }
}

/// Computes one term's transitions, turning an engine error into a
/// collected warning (and an empty transition set) when `ignore_errors` is
/// set, or propagating it as a hard abort otherwise.
fn step(term: &Rc<Process>, program: &Program, opts: &Options, warnings: &mut Vec<String>) -> Result<BTreeSet<Transition>, CcsError> {
    match transitions(term, program, opts.fold) {
        Ok(ts) => Ok(ts),
        Err(err) => {
            if opts.ignore_errors {
                warnings.push(format!("warning: {err} (treating `{term}` as having no transitions)"));
                Ok(BTreeSet::new())
            } else {
                Err(CcsError::Engine(err))
            }
        }
    }
}

/// Pretty-prints the whole program: every binding, then the main process.
pub fn echo(program: &Program) -> String {
    program.to_string()
}

/// Breadth-first exploration accumulating the set of distinct actions seen,
/// printed in discovery order.
pub fn actions(program: &Program, opts: &Options) -> Result<(String, Vec<String>), CcsError> {
    let mut warnings = Vec::new();
    let mut seen_actions: BTreeSet<Action> = BTreeSet::new();
    let mut visited: BTreeSet<Rc<Process>> = BTreeSet::new();
    let mut lines = Vec::new();

    visited.insert(Rc::clone(&program.main));
    let mut frontier = vec![Rc::clone(&program.main)];
    let mut depth = 0usize;

    while !frontier.is_empty() && !opts.depth_reached(depth) {
        let mut next = Vec::new();
        for term in &frontier {
            for t in step(term, program, opts, &mut warnings)? {
                if seen_actions.insert(t.action.clone()) {
                    lines.push(t.action.to_string());
                }
                if visited.insert(Rc::clone(&t.to)) {
                    next.push(t.to);
                }
            }
        }
        frontier = next;
        depth += 1;
    }

    Ok((lines.join("\n"), warnings))
}

fn dot_quote(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn print_node(out: &mut String, id: usize, term: &Rc<Process>, omit_names: bool, terminal: bool, dashed: bool, error: bool) {
    let _ = write!(out, "    p{id}");
    let mut attrs = Vec::new();
    if !omit_names {
        attrs.push(format!("label=\"{}\"", dot_quote(&term.to_string())));
    }
    if terminal {
        attrs.push("shape=box".to_string());
    }
    if dashed {
        attrs.push("style=dashed".to_string());
    }
    if error {
        attrs.push("color=red".to_string());
    }
    if !attrs.is_empty() {
        let _ = write!(out, " [{}]", attrs.join(", "));
    }
    out.push_str(";\n");
}

/// Breadth-first exploration rendering a DOT graph of the LTS reachable
/// from `program.main`.
pub fn graph(program: &Program, opts: &Options) -> Result<(String, Vec<String>), CcsError> {
    let mut warnings = Vec::new();
    let mut ids: BTreeMap<Rc<Process>, usize> = BTreeMap::new();
    let mut printed: BTreeSet<usize> = BTreeSet::new();
    let mut out = String::from("digraph lts {\n    start [shape=point];\n");

    ids.insert(Rc::clone(&program.main), 0);
    let _ = writeln!(out, "    start -> p0;");

    let mut frontier = vec![Rc::clone(&program.main)];
    let mut depth = 0usize;

    while !frontier.is_empty() {
        let depth_cut = opts.depth_reached(depth);
        let mut next = Vec::new();
        for term in &frontier {
            let id = ids[term];
            if depth_cut {
                continue;
            }
            let ts = match transitions(term, program, opts.fold) {
                Ok(ts) => ts,
                Err(err) => {
                    print_node(&mut out, id, term, opts.omit_names, false, false, true);
                    printed.insert(id);
                    if opts.ignore_errors {
                        warnings.push(format!("warning: {err}"));
                        continue;
                    }
                    return Err(CcsError::Engine(err));
                }
            };
            print_node(&mut out, id, term, opts.omit_names, ts.is_empty(), false, false);
            printed.insert(id);
            for t in &ts {
                let to_id = *ids.entry(Rc::clone(&t.to)).or_insert_with(|| {
                    let next_id = ids.len();
                    next.push(Rc::clone(&t.to));
                    next_id
                });
                let _ = writeln!(out, "    p{id} -> p{to_id} [label=\"{}\"];", dot_quote(&t.action.to_string()));
            }
        }
        frontier = next;
        depth += 1;
    }

    for term in &frontier {
        let id = ids[term];
        if !printed.contains(&id) {
            print_node(&mut out, id, term, opts.omit_names, false, true, false);
        }
    }

    out.push_str("}\n");
    Ok((out, warnings))
}

fn render_path(root: &Rc<Process>, chain: &[Transition], full_paths: bool) -> String {
    if full_paths {
        let mut s = root.to_string();
        for t in chain {
            let _ = write!(s, " --({})--> {}", t.action, t.to);
        }
        s
    } else {
        let acts: Vec<String> = chain.iter().map(|t| t.action.to_string()).collect();
        let last = chain.last().map_or_else(|| root.to_string(), |t| t.to.to_string());
        format!("[{}] ~> {last}", acts.join(", "))
    }
}

/// Breadth-first exploration stopping at the first discovered deadlock
/// (a term with no transitions) and reporting the path to it.
pub fn dead(program: &Program, opts: &Options) -> Result<(String, Vec<String>), CcsError> {
    let mut warnings = Vec::new();
    let mut visited: BTreeSet<Rc<Process>> = BTreeSet::new();
    let mut pred: BTreeMap<Rc<Process>, Transition> = BTreeMap::new();

    visited.insert(Rc::clone(&program.main));
    let mut frontier = vec![Rc::clone(&program.main)];
    let mut depth = 0usize;

    loop {
        if frontier.is_empty() {
            return Ok(("no deadlock found".to_string(), warnings));
        }
        let mut next = Vec::new();
        for term in &frontier {
            let ts = step(term, program, opts, &mut warnings)?;
            if ts.is_empty() {
                let mut chain = Vec::new();
                let mut cur = Rc::clone(term);
                while let Some(t) = pred.get(&cur) {
                    chain.push(t.clone());
                    cur = Rc::clone(&t.from);
                }
                chain.reverse();
                return Ok((render_path(&program.main, &chain, opts.full_paths), warnings));
            }
            for t in ts {
                if visited.insert(Rc::clone(&t.to)) {
                    pred.insert(Rc::clone(&t.to), t.clone());
                    next.push(t.to);
                }
            }
        }
        if opts.depth_reached(depth) {
            return Ok(("no deadlock found within depth bound".to_string(), warnings));
        }
        frontier = next;
        depth += 1;
    }
}

/// Walks one path chosen uniformly at random among each state's
/// transitions, until a deadlock or the depth bound is hit.
pub fn random(program: &Program, opts: &Options, rng: &mut impl Rng) -> Result<(String, Vec<String>), CcsError> {
    let mut warnings = Vec::new();
    let mut out = program.main.to_string();
    let mut cur = Rc::clone(&program.main);
    let mut depth = 0usize;

    loop {
        if opts.depth_reached(depth) {
            break;
        }
        let ts = step(&cur, program, opts, &mut warnings)?;
        if ts.is_empty() {
            break;
        }
        let choices: Vec<Transition> = ts.into_iter().collect();
        let pick = &choices[rng.gen_range(0..choices.len())];
        let _ = write!(out, " --({})--> {}", pick.action, pick.to);
        cur = Rc::clone(&pick.to);
        depth += 1;
    }

    Ok((out, warnings))
}

#[allow(clippy::too_many_arguments)]
fn dfs_limit(
    term: &Rc<Process>,
    root: &Rc<Process>,
    program: &Program,
    opts: &Options,
    depth_remaining: usize,
    visited: &mut BTreeSet<Rc<Process>>,
    path: &mut Vec<(Action, Rc<Process>)>,
    seen: &mut BTreeSet<Vec<Action>>,
    lines: &mut Vec<String>,
    warnings: &mut Vec<String>,
) -> Result<bool, CcsError> {
    let ts = step(term, program, opts, warnings)?;
    if ts.is_empty() {
        let key: Vec<Action> = path.iter().map(|(a, _)| a.clone()).collect();
        if seen.insert(key) {
            lines.push(render_trace(root, path, opts.full_paths));
        }
        return Ok(true);
    }
    if depth_remaining == 0 {
        return Ok(false);
    }

    let mut all_completed = true;
    for t in ts {
        if visited.contains(&t.to) {
            // cut off by the cycle guard, not by depth: does not block completion.
            continue;
        }
        visited.insert(Rc::clone(&t.to));
        path.push((t.action, Rc::clone(&t.to)));
        let completed = dfs_limit(&t.to, root, program, opts, depth_remaining - 1, visited, path, seen, lines, warnings)?;
        path.pop();
        visited.remove(&t.to);
        all_completed &= completed;
    }
    Ok(all_completed)
}

fn render_trace(root: &Rc<Process>, path: &[(Action, Rc<Process>)], full_paths: bool) -> String {
    if full_paths {
        let mut s = root.to_string();
        for (a, to) in path {
            let _ = write!(s, " --({a})--> {to}");
        }
        s
    } else {
        let acts: Vec<String> = path.iter().map(|(a, _)| a.to_string()).collect();
        let last = path.last().map_or_else(|| root.to_string(), |(_, to)| to.to_string());
        format!("[{}] ~> {last}", acts.join(", "))
    }
}

/// Iterative-deepening search for terminating traces: reruns a depth-bounded
/// DFS from depth 1 upward, each run with a fresh cycle-guard, printing
/// every newly discovered terminating trace. Stops once a run completes
/// (every branch bottomed out by termination or the cycle guard, never by
/// the depth bound) or the optional `--depth` ceiling is exceeded.
pub fn ttr(program: &Program, opts: &Options) -> Result<(String, Vec<String>), CcsError> {
    let mut warnings = Vec::new();
    let mut lines = Vec::new();
    let mut seen: BTreeSet<Vec<Action>> = BTreeSet::new();
    let mut depth = 1usize;

    loop {
        let mut visited = BTreeSet::new();
        visited.insert(Rc::clone(&program.main));
        let mut path = Vec::new();
        let completed = dfs_limit(
            &program.main,
            &program.main,
            program,
            opts,
            depth,
            &mut visited,
            &mut path,
            &mut seen,
            &mut lines,
            &mut warnings,
        )?;
        if completed || opts.depth_reached(depth) {
            break;
        }
        depth += 1;
    }

    Ok((lines.join("\n"), warnings))
}
