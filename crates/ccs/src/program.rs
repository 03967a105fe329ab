//! Program environment: named bindings plus a main process expression.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::expr::Expression;
use crate::process::Process;

/// A single `Name[params] := process` definition.
#[derive(Debug, Clone)]
pub struct Binding {
    pub name: String,
    pub params: Vec<String>,
    pub process: Rc<Process>,
}

impl Binding {
    pub fn new(name: impl Into<String>, params: Vec<String>, process: Rc<Process>) -> Self {
        Self { name: name.into(), params, process }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.params.is_empty() {
            write!(f, "[{}]", self.params.join(", "))?;
        }
        write!(f, " := {}", self.process)
    }
}

/// A parsed program: its name bindings plus the main process to explore.
#[derive(Debug, Clone)]
pub struct Program {
    pub bindings: BTreeMap<String, Binding>,
    pub main: Rc<Process>,
}

impl Program {
    pub fn new(bindings: BTreeMap<String, Binding>, main: Rc<Process>) -> Self {
        Self { bindings, main }
    }

    /// Looks up `name`, checks arity against `args`, and returns the body
    /// with each formal parameter substituted (in reverse declaration
    /// order) by its corresponding evaluated argument. Returns `None` on an
    /// unknown name or an arity mismatch — never an error; callers turn a
    /// `None` into an empty transition set.
    pub fn get(&self, name: &str, args: &[i64], fold: bool) -> Option<Rc<Process>> {
        let binding = self.bindings.get(name)?;
        if binding.params.len() != args.len() {
            return None;
        }
        let mut body = Rc::clone(&binding.process);
        for (param, value) in binding.params.iter().zip(args).rev() {
            body = body.subst(param, *value, fold);
        }
        Some(body)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for binding in self.bindings.values() {
            writeln!(f, "{binding}")?;
        }
        writeln!(f, "{}", self.main)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;

    #[test]
    fn unknown_name_returns_none() {
        let program = Program::new(BTreeMap::new(), Process::null());
        assert!(program.get("X", &[], true).is_none());
    }

    #[test]
    fn arity_mismatch_returns_none() {
        let mut bindings = BTreeMap::new();
        bindings.insert(
            "P".to_string(),
            Binding::new("P", vec!["x".to_string()], Process::null()),
        );
        let program = Program::new(bindings, Process::null());
        assert!(program.get("P", &[], true).is_none());
        assert!(program.get("P", &[1, 2], true).is_none());
    }

    #[test]
    fn substitutes_formal_parameters() {
        let mut bindings = BTreeMap::new();
        bindings.insert(
            "P".to_string(),
            Binding::new(
                "P",
                vec!["x".to_string()],
                Process::when(Expression::id("x"), Process::prefix(Action::none("a"), Process::null())),
            ),
        );
        let program = Program::new(bindings, Process::null());
        let body = program.get("P", &[1], true).unwrap();
        assert_eq!(body.to_string(), "when 1 a.0");
    }
}
