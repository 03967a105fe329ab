//! Action labels attached to LTS edges: internal (tau), termination (delta),
//! send, receive, and bare (unlabelled) forms.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use crate::expr::Expression;

/// The kind of an [`Action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Kind {
    Tau,
    Delta,
    Send,
    Recv,
    None,
}

/// A label on an LTS edge.
///
/// `input` is only meaningful for `Recv` (empty string means "no input
/// variable"); `param` is a channel-parameter expression shared by `Send`
/// and `Recv`; `exp` is the carried/expected value expression.
#[derive(Debug, Clone)]
pub struct Action {
    pub kind: Kind,
    pub name: String,
    pub param: Option<Rc<Expression>>,
    pub input: String,
    pub exp: Option<Rc<Expression>>,
}

impl Action {
    pub fn tau() -> Self {
        Self { kind: Kind::Tau, name: String::new(), param: None, input: String::new(), exp: None }
    }

    pub fn delta() -> Self {
        Self { kind: Kind::Delta, name: String::new(), param: None, input: String::new(), exp: None }
    }

    pub fn none(name: impl Into<String>) -> Self {
        Self { kind: Kind::None, name: name.into(), param: None, input: String::new(), exp: None }
    }

    pub fn send(name: impl Into<String>, param: Option<Rc<Expression>>, exp: Option<Rc<Expression>>) -> Self {
        Self { kind: Kind::Send, name: name.into(), param, input: String::new(), exp }
    }

    pub fn recv(
        name: impl Into<String>,
        param: Option<Rc<Expression>>,
        input: impl Into<String>,
        exp: Option<Rc<Expression>>,
    ) -> Self {
        Self { kind: Kind::Recv, name: name.into(), param, input: input.into(), exp }
    }

    /// Keeps `kind`, `name`, and `param`; drops `input` and `exp`.
    pub fn base(&self) -> Self {
        Self { kind: self.kind, name: self.name.clone(), param: self.param.clone(), input: String::new(), exp: None }
    }

    /// Keeps `kind` and `name` only; drops `param`, `input`, and `exp`.
    pub fn plain(&self) -> Self {
        Self { kind: self.kind, name: self.name.clone(), param: None, input: String::new(), exp: None }
    }

    /// Like `plain`, but also resets `kind` to `None`: lets a restriction
    /// set written with a bare name match both `Send` and `Recv` on it.
    pub fn none_form(&self) -> Self {
        Self { kind: Kind::None, name: self.name.clone(), param: None, input: String::new(), exp: None }
    }

    /// Substitutes into the channel parameter and value expressions.
    pub fn subst(&self, id: &str, v: i64, fold: bool) -> Self {
        Self {
            kind: self.kind,
            name: self.name.clone(),
            param: self.param.as_ref().map(|p| p.subst(id, v, fold)),
            input: self.input.clone(),
            exp: self.exp.as_ref().map(|e| e.subst(id, v, fold)),
        }
    }

    /// The complementary action: swaps `Send`/`Recv`, leaves everything else.
    pub fn complement(&self) -> Self {
        let kind = match self.kind {
            Kind::Send => Kind::Recv,
            Kind::Recv => Kind::Send,
            other => other,
        };
        Self { kind, name: self.name.clone(), param: self.param.clone(), input: self.input.clone(), exp: self.exp.clone() }
    }

    pub fn compare(&self, other: &Self) -> Ordering {
        self.kind
            .cmp(&other.kind)
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| compare_opt_expr(&self.param, &other.param))
            .then_with(|| self.input.cmp(&other.input))
            .then_with(|| compare_opt_expr(&self.exp, &other.exp))
    }
}

fn compare_opt_expr(a: &Option<Rc<Expression>>, b: &Option<Rc<Expression>>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.compare(b),
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Kind::Tau => f.write_str("i"),
            Kind::Delta => f.write_str("e"),
            Kind::Send => {
                write!(f, "{}", self.name)?;
                if let Some(param) = &self.param {
                    write!(f, "({param})")?;
                }
                write!(f, "!")?;
                if let Some(exp) = &self.exp {
                    write!(f, "{exp}")?;
                }
                Ok(())
            }
            Kind::Recv => {
                write!(f, "{}", self.name)?;
                if let Some(param) = &self.param {
                    write!(f, "({param})")?;
                }
                write!(f, "?")?;
                if !self.input.is_empty() {
                    write!(f, "{}", self.input)?;
                }
                if let Some(exp) = &self.exp {
                    write!(f, "{exp}")?;
                }
                Ok(())
            }
            Kind::None => write!(f, "{}", self.name),
        }
    }
}

impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}
impl Eq for Action {}
impl PartialOrd for Action {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}
impl Ord for Action {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complement_swaps_send_recv() {
        let a = Action::send("a", None, None);
        assert_eq!(a.complement().kind, Kind::Recv);
        assert_eq!(a.complement().complement().kind, Kind::Send);
    }

    #[test]
    fn complement_leaves_tau_delta_none() {
        assert_eq!(Action::tau().complement().kind, Kind::Tau);
        assert_eq!(Action::delta().complement().kind, Kind::Delta);
        assert_eq!(Action::none("x").complement().kind, Kind::None);
    }

    #[test]
    fn plain_drops_input_and_exp() {
        let a = Action::recv("a", None, "x", None);
        let p = a.plain();
        assert_eq!(p.input, "");
        assert_eq!(p.kind, Kind::Recv);
    }

    #[test]
    fn none_form_resets_kind() {
        let a = Action::send("a", None, Some(Expression::const_(1)));
        let n = a.none_form();
        assert_eq!(n.kind, Kind::None);
        assert_eq!(n.name, "a");
    }

    #[test]
    fn display_forms() {
        assert_eq!(Action::tau().to_string(), "i");
        assert_eq!(Action::delta().to_string(), "e");
        assert_eq!(Action::send("a", None, None).to_string(), "a!");
        assert_eq!(
            Action::send("a", None, Some(Expression::const_(1))).to_string(),
            "a!1"
        );
        assert_eq!(Action::recv("a", None, "x", None).to_string(), "a?x");
        assert_eq!(Action::none("a").to_string(), "a");
    }
}
