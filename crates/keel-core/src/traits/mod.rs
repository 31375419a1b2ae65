use crate::{
    entity::EntityReference,
    model::{EntityModel, MixinModel},
    value::Value,
};
use chrono::{DateTime, Utc};

///
/// EntityType
///
/// Marker for a Rust type that names a persistent entity. The type itself
/// is never instantiated; values live in `EntityState` and are reached
/// through `Entity<E>` handles.
///

pub trait EntityType: 'static {
    const MODEL: &'static EntityModel;

    #[must_use]
    fn type_name() -> &'static str {
        Self::MODEL.type_name
    }
}

///
/// Mixin
///

pub trait Mixin: 'static {
    const MODEL: &'static MixinModel;
}

///
/// HasMixin
///
/// Declares that entity `Self` is composed with mixin `M`, enabling
/// `Entity::mixin::<M>()` and `EntityBuilder::state_for::<M>()`.
///

pub trait HasMixin<M: Mixin>: EntityType {}

///
/// FieldValue
///
/// Conversion between a Rust field type and the dynamic `Value`.
///

pub trait FieldValue: Sized {
    fn to_value(&self) -> Value;

    #[must_use]
    fn from_value(value: &Value) -> Option<Self>;
}

impl FieldValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FieldValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl FieldValue for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Timestamp(v) => Some(*v),
            _ => None,
        }
    }
}

impl FieldValue for EntityReference {
    fn to_value(&self) -> Value {
        Value::Ref(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_reference().cloned()
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        if matches!(value, Value::Null) {
            return Some(None);
        }

        T::from_value(value).map(Some)
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(FieldValue::to_value).collect())
    }

    fn from_value(value: &Value) -> Option<Self> {
        let Value::List(items) = value else {
            return None;
        };

        items.iter().map(T::from_value).collect()
    }
}

// impl_field_value
// Integers read back from either signed or unsigned storage when in range.
macro_rules! impl_field_value {
    ( $( $type:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl FieldValue for $type {
                fn to_value(&self) -> Value {
                    Value::$variant((*self).into())
                }

                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::Int(v) => (*v).try_into().ok(),
                        Value::Uint(v) => (*v).try_into().ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_field_value!(
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Uint,
    u16 => Uint,
    u32 => Uint,
    u64 => Uint,
);

impl FieldValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }
}
