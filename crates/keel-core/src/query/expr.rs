use crate::{
    query::{QueryError, Variables, path::PropertyPath},
    value::Value,
};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    fmt,
    ops::{BitAnd, BitOr, Not},
};

///
/// Expression tree
///
/// Immutable, backend-agnostic description of a query filter. Trees are
/// built once through field descriptors and never mutated; composing with
/// `&`, `|`, `!`, or `QueryBuilder::filter` yields a new tree and leaves
/// the operands valid for reuse.
///
/// Interpretation is entirely up to the executing finder:
///
/// - in-process evaluation (`IterableQuery`, `MemoryEntityFinder`)
/// - translation into a native backend query language
///

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum CompareOp {
    #[display("=")]
    Eq,
    #[display("!=")]
    Ne,
    #[display("<")]
    Lt,
    #[display("<=")]
    Lte,
    #[display(">")]
    Gt,
    #[display(">=")]
    Gte,
}

impl CompareOp {
    /// True for operators that need an ordering rather than equality.
    #[must_use]
    pub const fn is_ordering(self) -> bool {
        matches!(self, Self::Lt | Self::Lte | Self::Gt | Self::Gte)
    }
}

///
/// Operand
///
/// Right-hand side of a node: a literal fixed at build time, or a named
/// variable resolved from the query's bindings at execution time.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Operand {
    Value(Value),
    Variable(String),
}

impl Operand {
    #[must_use]
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    /// Resolve against `variables`; an unbound name is an error.
    pub fn resolve<'a>(&'a self, variables: &'a Variables) -> Result<&'a Value, QueryError> {
        match self {
            Self::Value(value) => Ok(value),
            Self::Variable(name) => variables
                .get(name)
                .ok_or_else(|| QueryError::UnboundVariable { name: name.clone() }),
        }
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => write!(f, "{value}"),
            Self::Variable(name) => write!(f, "${name}"),
        }
    }
}

///
/// ComparePredicate
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ComparePredicate {
    pub path: PropertyPath,
    pub op: CompareOp,
    pub operand: Operand,
}

impl ComparePredicate {
    #[must_use]
    pub const fn new(path: PropertyPath, op: CompareOp, operand: Operand) -> Self {
        Self { path, op, operand }
    }
}

///
/// NullTarget
///
/// Whether a null check reads a property value or an association slot.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum NullTarget {
    Property,
    Association,
}

///
/// PredicateKind
///
/// Node kind as reported to finders when checking what they can translate.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum PredicateKind {
    And,
    Or,
    Not,
    Compare,
    Contains,
    ContainsAll,
    IsNull,
    IsNotNull,
    Matches,
}

///
/// Predicate
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Predicate {
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
    Compare(ComparePredicate),

    /// Collection at `path` holds the operand (values or references).
    Contains {
        path: PropertyPath,
        operand: Operand,
    },

    /// Collection at `path` holds every operand.
    ContainsAll {
        path: PropertyPath,
        operands: Vec<Operand>,
    },

    IsNull {
        path: PropertyPath,
        target: NullTarget,
    },

    IsNotNull {
        path: PropertyPath,
        target: NullTarget,
    },

    /// Text at `path` matches a regular expression.
    Matches {
        path: PropertyPath,
        pattern: Operand,
    },
}

impl Predicate {
    #[must_use]
    pub const fn kind(&self) -> PredicateKind {
        match self {
            Self::And(_) => PredicateKind::And,
            Self::Or(_) => PredicateKind::Or,
            Self::Not(_) => PredicateKind::Not,
            Self::Compare(_) => PredicateKind::Compare,
            Self::Contains { .. } => PredicateKind::Contains,
            Self::ContainsAll { .. } => PredicateKind::ContainsAll,
            Self::IsNull { .. } => PredicateKind::IsNull,
            Self::IsNotNull { .. } => PredicateKind::IsNotNull,
            Self::Matches { .. } => PredicateKind::Matches,
        }
    }

    /// Visit this node and every descendant, depth-first, parents first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Self)) {
        visit(self);
        match self {
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.walk(visit);
                }
            }
            Self::Not(inner) => inner.walk(visit),
            _ => {}
        }
    }

    /// Names of every variable the tree references.
    #[must_use]
    pub fn variables(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        self.walk(&mut |node| {
            for operand in node.operands() {
                if let Operand::Variable(name) = operand {
                    names.insert(name.as_str());
                }
            }
        });

        names
    }

    /// Fail with the first referenced variable that has no binding.
    pub fn check_bound(&self, variables: &Variables) -> Result<(), QueryError> {
        match self
            .variables()
            .into_iter()
            .find(|name| !variables.contains_key(*name))
        {
            Some(name) => Err(QueryError::UnboundVariable {
                name: name.to_string(),
            }),
            None => Ok(()),
        }
    }

    // Operands held directly by this node (children excluded).
    fn operands(&self) -> Vec<&Operand> {
        match self {
            Self::Compare(cmp) => vec![&cmp.operand],
            Self::Contains { operand, .. } => vec![operand],
            Self::ContainsAll { operands, .. } => operands.iter().collect(),
            Self::Matches { pattern, .. } => vec![pattern],
            _ => Vec::new(),
        }
    }
}

// ----------------------------------------------------------------------
// Combinators
// ----------------------------------------------------------------------

/// Conjunction of every predicate in `preds`.
#[must_use]
pub fn and(preds: impl IntoIterator<Item = Predicate>) -> Predicate {
    Predicate::And(preds.into_iter().collect())
}

/// Disjunction of every predicate in `preds`.
#[must_use]
pub fn or(preds: impl IntoIterator<Item = Predicate>) -> Predicate {
    Predicate::Or(preds.into_iter().collect())
}

#[must_use]
pub fn not(pred: Predicate) -> Predicate {
    Predicate::Not(Box::new(pred))
}

// Flatten nested conjunctions so repeated `filter` calls stay shallow.
pub(crate) fn conjoin(lhs: Predicate, rhs: Predicate) -> Predicate {
    match (lhs, rhs) {
        (Predicate::And(mut left), Predicate::And(right)) => {
            left.extend(right);
            Predicate::And(left)
        }
        (Predicate::And(mut left), right) => {
            left.push(right);
            Predicate::And(left)
        }
        (left, right) => Predicate::And(vec![left, right]),
    }
}

impl BitAnd for Predicate {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self::And(vec![self, rhs])
    }
}

impl BitAnd for &Predicate {
    type Output = Predicate;

    fn bitand(self, rhs: Self) -> Self::Output {
        Predicate::And(vec![self.clone(), rhs.clone()])
    }
}

impl BitOr for Predicate {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::Or(vec![self, rhs])
    }
}

impl BitOr for &Predicate {
    type Output = Predicate;

    fn bitor(self, rhs: Self) -> Self::Output {
        Predicate::Or(vec![self.clone(), rhs.clone()])
    }
}

impl Not for Predicate {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self::Not(Box::new(self))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, children: &[Predicate], sep: &str) -> fmt::Result {
            f.write_str("(")?;
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    f.write_str(sep)?;
                }
                write!(f, "{child}")?;
            }
            f.write_str(")")
        }

        match self {
            Self::And(children) => join(f, children, " and "),
            Self::Or(children) => join(f, children, " or "),
            Self::Not(inner) => write!(f, "not {inner}"),
            Self::Compare(cmp) => write!(f, "{} {} {}", cmp.path, cmp.op, cmp.operand),
            Self::Contains { path, operand } => write!(f, "{path} contains {operand}"),
            Self::ContainsAll { path, operands } => {
                write!(f, "{path} contains all [")?;
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{operand}")?;
                }
                f.write_str("]")
            }
            Self::IsNull { path, .. } => write!(f, "{path} is null"),
            Self::IsNotNull { path, .. } => write!(f, "{path} is not null"),
            Self::Matches { path, pattern } => write!(f, "{path} matches {pattern}"),
        }
    }
}

///
/// Walk `predicate` and report the first node kind `supports` rejects.
/// Finders call this before translation so an inexpressible construct
/// surfaces as `QueryError::Unsupported` instead of a silent approximation.
///
pub fn ensure_supported(
    predicate: &Predicate,
    backend: &str,
    supports: impl Fn(PredicateKind) -> bool,
) -> Result<(), QueryError> {
    let mut rejected = None;
    predicate.walk(&mut |node| {
        if rejected.is_none() && !supports(node.kind()) {
            rejected = Some(node.kind());
        }
    });

    match rejected {
        Some(kind) => Err(QueryError::Unsupported {
            kind,
            backend: backend.to_string(),
        }),
        None => Ok(()),
    }
}
