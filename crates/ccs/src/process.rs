//! The nine-variant process term algebra.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use crate::action::Action;
use crate::expr::Expression;

/// An immutable CCS process term.
///
/// Variant order matches `examples/original_source/ccs++/ccsprocess.h`'s
/// `Type` enum and is the first key of the structural order.
#[derive(Debug, Clone)]
pub enum Process {
    Null,
    Term,
    Name { name: String, args: Vec<Rc<Expression>> },
    Prefix { action: Action, body: Rc<Process> },
    Choice(Rc<Process>, Rc<Process>),
    Parallel(Rc<Process>, Rc<Process>),
    Restrict { body: Rc<Process>, set: BTreeSet<Action>, complement: bool },
    Sequential(Rc<Process>, Rc<Process>),
    When { cond: Rc<Expression>, body: Rc<Process> },
}

impl Process {
    pub fn null() -> Rc<Self> {
        Rc::new(Self::Null)
    }

    pub fn term() -> Rc<Self> {
        Rc::new(Self::Term)
    }

    pub fn name(name: impl Into<String>, args: Vec<Rc<Expression>>) -> Rc<Self> {
        Rc::new(Self::Name { name: name.into(), args })
    }

    pub fn prefix(action: Action, body: Rc<Process>) -> Rc<Self> {
        Rc::new(Self::Prefix { action, body })
    }

    pub fn choice(l: Rc<Process>, r: Rc<Process>) -> Rc<Self> {
        Rc::new(Self::Choice(l, r))
    }

    pub fn parallel(l: Rc<Process>, r: Rc<Process>) -> Rc<Self> {
        Rc::new(Self::Parallel(l, r))
    }

    pub fn restrict(body: Rc<Process>, set: BTreeSet<Action>, complement: bool) -> Rc<Self> {
        Rc::new(Self::Restrict { body, set, complement })
    }

    pub fn sequential(l: Rc<Process>, r: Rc<Process>) -> Rc<Self> {
        Rc::new(Self::Sequential(l, r))
    }

    pub fn when(cond: Rc<Expression>, body: Rc<Process>) -> Rc<Self> {
        Rc::new(Self::When { cond, body })
    }

    fn tag(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Term => 1,
            Self::Name { .. } => 2,
            Self::Prefix { .. } => 3,
            Self::Choice(..) => 4,
            Self::Parallel(..) => 5,
            Self::Restrict { .. } => 6,
            Self::Sequential(..) => 7,
            Self::When { .. } => 8,
        }
    }

    /// Structural total order: tag, then fields in declaration order.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) | (Self::Term, Self::Term) => Ordering::Equal,
            (Self::Name { name: n1, args: a1 }, Self::Name { name: n2, args: a2 }) => n1
                .cmp(n2)
                .then_with(|| a1.len().cmp(&a2.len()))
                .then_with(|| a1.iter().zip(a2).fold(Ordering::Equal, |acc, (x, y)| acc.then_with(|| x.compare(y)))),
            (Self::Prefix { action: a1, body: b1 }, Self::Prefix { action: a2, body: b2 }) => {
                a1.compare(a2).then_with(|| b1.compare(b2))
            }
            (Self::Choice(l1, r1), Self::Choice(l2, r2))
            | (Self::Parallel(l1, r1), Self::Parallel(l2, r2))
            | (Self::Sequential(l1, r1), Self::Sequential(l2, r2)) => l1.compare(l2).then_with(|| r1.compare(r2)),
            (
                Self::Restrict { body: b1, set: s1, complement: c1 },
                Self::Restrict { body: b2, set: s2, complement: c2 },
            ) => b1.compare(b2).then_with(|| compare_sets(s1, s2)).then_with(|| c1.cmp(c2)),
            (Self::When { cond: c1, body: b1 }, Self::When { cond: c2, body: b2 }) => {
                c1.compare(c2).then_with(|| b1.compare(b2))
            }
            _ => self.tag().cmp(&other.tag()),
        }
    }

    /// Substitutes `Const(v)` for free occurrences of `id` throughout the
    /// term, rebuilding only the spine from a changed leaf to the root.
    /// `Prefix`'s `Recv` input variable shadows `id` in the body: if the
    /// bound name equals `id`, the body is left untouched.
    pub fn subst(self: &Rc<Self>, id: &str, v: i64, fold: bool) -> Rc<Self> {
        match self.as_ref() {
            Self::Null | Self::Term => Rc::clone(self),
            Self::Name { name, args } => {
                let args2: Vec<Rc<Expression>> = args.iter().map(|a| a.subst(id, v, fold)).collect();
                if args.iter().zip(&args2).all(|(a, b)| Rc::ptr_eq(a, b)) {
                    Rc::clone(self)
                } else {
                    Self::name(name.clone(), args2)
                }
            }
            Self::Prefix { action, body } => {
                let action2 = action.subst(id, v, fold);
                let shadowed = action.kind == crate::action::Kind::Recv && action.input == id;
                let body2 = if shadowed { Rc::clone(body) } else { body.subst(id, v, fold) };
                Self::prefix(action2, body2)
            }
            Self::Choice(l, r) => rebuild2(self, l, r, id, v, fold, Self::choice),
            Self::Parallel(l, r) => rebuild2(self, l, r, id, v, fold, Self::parallel),
            Self::Restrict { body, set, complement } => {
                let body2 = body.subst(id, v, fold);
                let set2: BTreeSet<Action> = set.iter().map(|a| a.subst(id, v, fold)).collect();
                if Rc::ptr_eq(&body2, body) && &set2 == set {
                    Rc::clone(self)
                } else {
                    Self::restrict(body2, set2, *complement)
                }
            }
            Self::Sequential(l, r) => rebuild2(self, l, r, id, v, fold, Self::sequential),
            Self::When { cond, body } => {
                let cond2 = cond.subst(id, v, fold);
                let body2 = body.subst(id, v, fold);
                if Rc::ptr_eq(&cond2, cond) && Rc::ptr_eq(&body2, body) {
                    Rc::clone(self)
                } else {
                    Self::when(cond2, body2)
                }
            }
        }
    }
}

fn rebuild2(
    orig: &Rc<Process>,
    l: &Rc<Process>,
    r: &Rc<Process>,
    id: &str,
    v: i64,
    fold: bool,
    make: impl Fn(Rc<Process>, Rc<Process>) -> Rc<Process>,
) -> Rc<Process> {
    let l2 = l.subst(id, v, fold);
    let r2 = r.subst(id, v, fold);
    if Rc::ptr_eq(&l2, l) && Rc::ptr_eq(&r2, r) { Rc::clone(orig) } else { make(l2, r2) }
}

fn compare_sets(a: &BTreeSet<Action>, b: &BTreeSet<Action>) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.iter().zip(b).fold(Ordering::Equal, |acc, (x, y)| acc.then_with(|| x.compare(y))))
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("0"),
            Self::Term => f.write_str("1"),
            Self::Name { name, args } => {
                write!(f, "{name}")?;
                if !args.is_empty() {
                    write!(f, "[")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{a}")?;
                    }
                    write!(f, "]")?;
                }
                Ok(())
            }
            Self::Prefix { action, body } => write!(f, "{action}.{body}"),
            Self::Choice(l, r) => write!(f, "({l} + {r})"),
            Self::Parallel(l, r) => write!(f, "({l} | {r})"),
            Self::Restrict { body, set, complement } => {
                write!(f, "({body})\\{{")?;
                let mut first = true;
                if *complement {
                    write!(f, "*")?;
                    first = false;
                }
                for a in set {
                    if !first {
                        write!(f, ", ")?;
                    }
                    first = false;
                    write!(f, "{a}")?;
                }
                write!(f, "}}")
            }
            Self::Sequential(l, r) => write!(f, "({l}; {r})"),
            Self::When { cond, body } => write!(f, "when {cond} {body}"),
        }
    }
}

impl PartialEq for Process {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}
impl Eq for Process {}
impl PartialOrd for Process {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}
impl Ord for Process {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}
