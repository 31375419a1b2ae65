use crate::{
    entity::{EntityReference, EntityState},
    query::{
        QueryError, Variables,
        expr::{CompareOp, ComparePredicate, Operand, Predicate},
        order::{Direction, OrderBy},
        path::PropertyPath,
    },
    value::{Value, canonical_cmp, compare_eq, compare_order},
};
use regex::Regex;
use std::{cell::RefCell, cmp::Ordering, collections::HashMap};

///
/// FieldPresence
///
/// Result of reading a path from a row. Distinguishes a field that was
/// never set from one that is present but null.
///

#[derive(Clone, Debug, PartialEq)]
pub enum FieldPresence {
    /// Field exists (including `Value::Null`).
    Present(Value),
    /// Field is not present on the row.
    Missing,
}

impl FieldPresence {
    // Absent fields compare and null-check like explicit nulls.
    fn into_value(self) -> Value {
        match self {
            Self::Present(value) => value,
            Self::Missing => Value::Null,
        }
    }
}

///
/// Row
///
/// Anything a predicate can be evaluated against. Reading a field fails
/// only when the backing data cannot be reached.
///

pub trait Row {
    fn field(&self, path: &PropertyPath) -> Result<FieldPresence, QueryError>;
}

///
/// StateRow
///
/// `Row` over an `EntityState`. Association segments of a path are
/// followed through `resolve`, which returns the target's state, `None`
/// for a dangling reference, or the backend failure that prevented the
/// lookup.
///

pub struct StateRow<'a, F> {
    state: &'a EntityState,
    resolve: F,
}

impl<'a, F> StateRow<'a, F>
where
    F: Fn(&EntityReference) -> Result<Option<EntityState>, QueryError>,
{
    pub const fn new(state: &'a EntityState, resolve: F) -> Self {
        Self { state, resolve }
    }
}

// Leaf lookup on one state: properties, then associations, then lists.
fn read_leaf(state: &EntityState, name: &str) -> FieldPresence {
    if let Some(value) = state.property(name) {
        return FieldPresence::Present(value.clone());
    }
    if let Some(target) = state.association(name) {
        return FieldPresence::Present(target.cloned().map_or(Value::Null, Value::Ref));
    }
    if state.has_many_association(name) {
        let refs = state
            .many_association(name)
            .iter()
            .cloned()
            .map(Value::Ref)
            .collect();
        return FieldPresence::Present(Value::List(refs));
    }

    FieldPresence::Missing
}

impl<F> Row for StateRow<'_, F>
where
    F: Fn(&EntityReference) -> Result<Option<EntityState>, QueryError>,
{
    fn field(&self, path: &PropertyPath) -> Result<FieldPresence, QueryError> {
        let traversal = path.traversal();
        if traversal.is_empty() {
            return Ok(read_leaf(self.state, path.leaf()));
        }

        let mut current: Option<EntityState> = None;
        for segment in traversal {
            let state = current.as_ref().unwrap_or(self.state);
            let target = match state.association(segment) {
                Some(Some(target)) => target.clone(),
                // crossing a null association reads as null
                Some(None) => return Ok(FieldPresence::Present(Value::Null)),
                None => return Ok(FieldPresence::Missing),
            };
            match (self.resolve)(&target)? {
                Some(next) => current = Some(next),
                None => return Ok(FieldPresence::Missing),
            }
        }

        let state = current.as_ref().unwrap_or(self.state);
        Ok(read_leaf(state, path.leaf()))
    }
}

///
/// Evaluator
///
/// Evaluates expression trees in process with one set of variable
/// bindings. Compiled regex patterns are cached for the evaluator's life
/// so a pattern is compiled once per query execution, not once per row.
///

pub struct Evaluator<'v> {
    variables: &'v Variables,
    patterns: RefCell<HashMap<String, Regex>>,
}

impl<'v> Evaluator<'v> {
    #[must_use]
    pub fn new(variables: &'v Variables) -> Self {
        Self {
            variables,
            patterns: RefCell::new(HashMap::new()),
        }
    }

    /// Evaluate `predicate` against `row`.
    ///
    /// Comparisons between incompatible kinds are non-matches, not errors.
    /// Errors are reserved for unbound variables, invalid patterns, and
    /// rows whose fields cannot be read.
    pub fn eval<R: Row + ?Sized>(&self, row: &R, predicate: &Predicate) -> Result<bool, QueryError> {
        match predicate {
            Predicate::And(children) => {
                for child in children {
                    if !self.eval(row, child)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Or(children) => {
                for child in children {
                    if self.eval(row, child)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::Not(inner) => Ok(!self.eval(row, inner)?),

            Predicate::Compare(cmp) => self.eval_compare(row, cmp),

            Predicate::Contains { path, operand } => {
                let expected = operand.resolve(self.variables)?;
                Ok(list_contains(&row.field(path)?.into_value(), expected))
            }

            Predicate::ContainsAll { path, operands } => {
                let actual = row.field(path)?.into_value();
                for operand in operands {
                    if !list_contains(&actual, operand.resolve(self.variables)?) {
                        return Ok(false);
                    }
                }
                Ok(true)
            }

            Predicate::IsNull { path, .. } => Ok(row.field(path)?.into_value().is_null()),
            Predicate::IsNotNull { path, .. } => Ok(!row.field(path)?.into_value().is_null()),

            Predicate::Matches { path, pattern } => {
                let pattern = self.pattern_text(pattern)?;
                let FieldPresence::Present(Value::Text(text)) = row.field(path)? else {
                    return Ok(false);
                };
                self.is_match(&pattern, &text)
            }
        }
    }

    fn eval_compare<R: Row + ?Sized>(
        &self,
        row: &R,
        cmp: &ComparePredicate,
    ) -> Result<bool, QueryError> {
        let ComparePredicate { path, op, operand } = cmp;
        let expected = operand.resolve(self.variables)?;
        let actual = row.field(path)?.into_value();

        let matched = match op {
            CompareOp::Eq => compare_eq(&actual, expected) == Some(true),
            CompareOp::Ne => compare_eq(&actual, expected) == Some(false),
            CompareOp::Lt => compare_order(&actual, expected) == Some(Ordering::Less),
            CompareOp::Lte => matches!(
                compare_order(&actual, expected),
                Some(Ordering::Less | Ordering::Equal)
            ),
            CompareOp::Gt => compare_order(&actual, expected) == Some(Ordering::Greater),
            CompareOp::Gte => matches!(
                compare_order(&actual, expected),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        };

        Ok(matched)
    }

    fn pattern_text(&self, pattern: &Operand) -> Result<String, QueryError> {
        match pattern.resolve(self.variables)? {
            Value::Text(text) => Ok(text.clone()),
            other => Err(QueryError::InvalidPattern {
                pattern: other.to_string(),
                message: format!("expected text, found {}", other.kind_label()),
            }),
        }
    }

    fn is_match(&self, pattern: &str, text: &str) -> Result<bool, QueryError> {
        let mut patterns = self.patterns.borrow_mut();
        if let Some(regex) = patterns.get(pattern) {
            return Ok(regex.is_match(text));
        }

        let regex = Regex::new(pattern).map_err(|err| QueryError::InvalidPattern {
            pattern: pattern.to_string(),
            message: err.to_string(),
        })?;
        let matched = regex.is_match(text);
        patterns.insert(pattern.to_string(), regex);

        Ok(matched)
    }
}

fn list_contains(actual: &Value, expected: &Value) -> bool {
    actual
        .as_list()
        .is_some_and(|items| items.iter().any(|item| compare_eq(item, expected) == Some(true)))
}

/// Sort keys of `row` under `order`, one value per key.
pub fn order_keys<R: Row + ?Sized>(
    row: &R,
    order: &[OrderBy],
) -> Result<Vec<Value>, QueryError> {
    order
        .iter()
        .map(|key| Ok(row.field(&key.path)?.into_value()))
        .collect()
}

/// Compare two key lists produced by `order_keys` for the same `order`.
/// Values of different kinds fall back to the canonical cross-kind order
/// so the comparison is total.
#[must_use]
pub fn compare_keys(left: &[Value], right: &[Value], order: &[OrderBy]) -> Ordering {
    for ((a, b), key) in left.iter().zip(right).zip(order) {
        let ord = match key.direction {
            Direction::Ascending => canonical_cmp(a, b),
            Direction::Descending => canonical_cmp(b, a),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    Ordering::Equal
}

/// Stable sort of `rows` by `order`, earlier keys first. Rows with equal
/// keys keep their input order. On error `rows` is left untouched.
pub fn sort_rows<T: Row>(rows: &mut Vec<T>, order: &[OrderBy]) -> Result<(), QueryError> {
    if order.is_empty() {
        return Ok(());
    }

    let keys = rows
        .iter()
        .map(|row| order_keys(row, order))
        .collect::<Result<Vec<_>, _>>()?;
    let mut keyed: Vec<(Vec<Value>, T)> = keys.into_iter().zip(rows.drain(..)).collect();
    keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b, order));
    rows.extend(keyed.into_iter().map(|(_, row)| row));

    Ok(())
}
