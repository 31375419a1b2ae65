use crate::value::Value;
use std::cmp::Ordering;

///
/// NumericRepr
///
/// Widened numeric view used for mixed int/uint/float comparisons.
///

#[derive(Clone, Copy)]
enum NumericRepr {
    Integer(i128),
    Float(f64),
}

impl NumericRepr {
    const fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Int(v) => Some(Self::Integer(*v as i128)),
            Value::Uint(v) => Some(Self::Integer(*v as i128)),
            Value::Float(v) => Some(Self::Float(*v)),
            _ => None,
        }
    }

    #[expect(clippy::cast_precision_loss)]
    fn partial_cmp(self, other: Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(&b)),
            (Self::Integer(a), Self::Float(b)) => (a as f64).partial_cmp(&b),
            (Self::Float(a), Self::Integer(b)) => a.partial_cmp(&(b as f64)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(&b),
        }
    }
}

/// Equality used by predicate evaluation.
///
/// Numeric variants compare by magnitude. `Null` equals only `Null`.
/// Returns `None` when the two values are not comparable at all
/// (for example text against a boolean).
#[must_use]
pub fn compare_eq(left: &Value, right: &Value) -> Option<bool> {
    match (left, right) {
        (Value::Null, Value::Null) => Some(true),
        (Value::Null, _) | (_, Value::Null) => Some(false),
        _ => {
            if let (Some(a), Some(b)) = (NumericRepr::of(left), NumericRepr::of(right)) {
                return a.partial_cmp(b).map(Ordering::is_eq);
            }

            (left.canonical_rank() == right.canonical_rank()).then(|| left == right)
        }
    }
}

/// Ordering used by range predicates (`lt`, `gte`, ...).
///
/// Returns `None` for nulls, lists, and mismatched variants; callers treat
/// that as a non-match.
#[must_use]
pub fn compare_order(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (NumericRepr::of(left), NumericRepr::of(right)) {
        return a.partial_cmp(b);
    }

    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        (Value::Ref(a), Value::Ref(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Total canonical comparator used for client-side ordering.
///
/// Ordering rules:
/// 1. Canonical variant rank (`Null` first)
/// 2. Variant-specific comparison for same-ranked values
///
/// NaN sorts after every other float so the order stays total.
#[must_use]
pub fn canonical_cmp(left: &Value, right: &Value) -> Ordering {
    let rank = left.canonical_rank().cmp(&right.canonical_rank());
    if rank != Ordering::Equal {
        return rank;
    }

    canonical_cmp_same_rank(left, right)
}

fn canonical_cmp_same_rank(left: &Value, right: &Value) -> Ordering {
    if let (Some(a), Some(b)) = (NumericRepr::of(left), NumericRepr::of(right)) {
        return a.partial_cmp(b).unwrap_or_else(|| nan_last(left, right));
    }

    match (left, right) {
        (Value::List(a), Value::List(b)) => canonical_cmp_list(a, b),
        _ => compare_order(left, right).unwrap_or(Ordering::Equal),
    }
}

fn canonical_cmp_list(left: &[Value], right: &[Value]) -> Ordering {
    for (a, b) in left.iter().zip(right) {
        let cmp = canonical_cmp(a, b);
        if cmp != Ordering::Equal {
            return cmp;
        }
    }

    left.len().cmp(&right.len())
}

const fn is_nan(value: &Value) -> bool {
    matches!(value, Value::Float(v) if v.is_nan())
}

const fn nan_last(left: &Value, right: &Value) -> Ordering {
    match (is_nan(left), is_nan(right)) {
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => Ordering::Equal,
    }
}
