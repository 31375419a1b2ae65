//! Typed field descriptors.
//!
//! A descriptor names one field of an owner type and doubles as a query
//! template: calling a predicate method records the field's full path
//! instead of reading data. Traversals (`FRIEND.then(NAME)`) keep every
//! segment so finders can translate them into joins.

use crate::{
    entity::EntityReference,
    query::{
        expr::{CompareOp, ComparePredicate, NullTarget, Operand, Predicate},
        order::OrderBy,
        path::PropertyPath,
    },
    traits::FieldValue,
    value::Value,
};
use std::{fmt, marker::PhantomData};

// Descriptors are plain names; none of the type parameters need to be
// Clone/Copy/Debug themselves.
macro_rules! impl_descriptor_traits {
    ( $( [$($generics:tt)*] $ty:ty ),* $(,)? ) => {
        $(
            impl<$($generics)*> Clone for $ty {
                fn clone(&self) -> Self {
                    *self
                }
            }

            impl<$($generics)*> Copy for $ty {}

            impl<$($generics)*> fmt::Debug for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.debug_tuple("Descriptor").field(&self.name).finish()
                }
            }
        )*
    };
}

///
/// Property
///
/// Value-typed field `V` declared on owner `O`.
///

pub struct Property<O, V> {
    name: &'static str,
    _marker: PhantomData<fn() -> (O, V)>,
}

impl<O, V> Property<O, V> {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn path(&self) -> PropertyPath {
        PropertyPath::new(self.name)
    }
}

///
/// Association
///
/// Single, nullable reference from owner `O` to entity type `T`.
///

pub struct Association<O, T> {
    name: &'static str,
    _marker: PhantomData<fn() -> (O, T)>,
}

impl<O, T> Association<O, T> {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn path(&self) -> PropertyPath {
        PropertyPath::new(self.name)
    }
}

///
/// ManyAssociation
///
/// Ordered list of references from owner `O` to entity type `T`.
///

pub struct ManyAssociation<O, T> {
    name: &'static str,
    _marker: PhantomData<fn() -> (O, T)>,
}

impl<O, T> ManyAssociation<O, T> {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn path(&self) -> PropertyPath {
        PropertyPath::new(self.name)
    }
}

impl_descriptor_traits!(
    [O, V] Property<O, V>,
    [O, T] Association<O, T>,
    [O, T] ManyAssociation<O, T>,
);

///
/// PropertyExpr
/// Property reached through one or more associations.
///

pub struct PropertyExpr<V> {
    path: PropertyPath,
    _marker: PhantomData<fn() -> V>,
}

impl<V> PropertyExpr<V> {
    const fn from_path(path: PropertyPath) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn path(&self) -> PropertyPath {
        self.path.clone()
    }
}

///
/// AssociationExpr
///

pub struct AssociationExpr<T> {
    path: PropertyPath,
    _marker: PhantomData<fn() -> T>,
}

impl<T> AssociationExpr<T> {
    const fn from_path(path: PropertyPath) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn path(&self) -> PropertyPath {
        self.path.clone()
    }
}

///
/// ManyAssociationExpr
///

pub struct ManyAssociationExpr<T> {
    path: PropertyPath,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ManyAssociationExpr<T> {
    const fn from_path(path: PropertyPath) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn path(&self) -> PropertyPath {
        self.path.clone()
    }
}

// Path expressions clone their path without bounding the marker type.
macro_rules! impl_expr_traits {
    ( $( $ty:ident ),* $(,)? ) => {
        $(
            impl<X> Clone for $ty<X> {
                fn clone(&self) -> Self {
                    Self::from_path(self.path.clone())
                }
            }

            impl<X> fmt::Debug for $ty<X> {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}({})", stringify!($ty), self.path)
                }
            }
        )*
    };
}

impl_expr_traits!(PropertyExpr, AssociationExpr, ManyAssociationExpr);

fn compare(path: PropertyPath, op: CompareOp, operand: Operand) -> Predicate {
    Predicate::Compare(ComparePredicate::new(path, op, operand))
}

fn literal<V: FieldValue>(value: impl Into<V>) -> Operand {
    Operand::Value(value.into().to_value())
}

// ----------------------------------------------------------------------
// Property predicates
// ----------------------------------------------------------------------

macro_rules! impl_property_predicates {
    ( $( [$($generics:tt)*] $ty:ty ),* $(,)? ) => {
        $(
            impl<$($generics)*> $ty
            where
                V: FieldValue,
            {
                #[must_use]
                pub fn eq(&self, value: impl Into<V>) -> Predicate {
                    compare(self.path(), CompareOp::Eq, literal::<V>(value))
                }

                #[must_use]
                pub fn ne(&self, value: impl Into<V>) -> Predicate {
                    compare(self.path(), CompareOp::Ne, literal::<V>(value))
                }

                #[must_use]
                pub fn lt(&self, value: impl Into<V>) -> Predicate {
                    compare(self.path(), CompareOp::Lt, literal::<V>(value))
                }

                #[must_use]
                pub fn lte(&self, value: impl Into<V>) -> Predicate {
                    compare(self.path(), CompareOp::Lte, literal::<V>(value))
                }

                #[must_use]
                pub fn gt(&self, value: impl Into<V>) -> Predicate {
                    compare(self.path(), CompareOp::Gt, literal::<V>(value))
                }

                #[must_use]
                pub fn gte(&self, value: impl Into<V>) -> Predicate {
                    compare(self.path(), CompareOp::Gte, literal::<V>(value))
                }

                /// Equality against a variable bound at execution time.
                #[must_use]
                pub fn eq_var(&self, name: impl Into<String>) -> Predicate {
                    compare(self.path(), CompareOp::Eq, Operand::variable(name))
                }

                #[must_use]
                pub fn ne_var(&self, name: impl Into<String>) -> Predicate {
                    compare(self.path(), CompareOp::Ne, Operand::variable(name))
                }

                #[must_use]
                pub fn lt_var(&self, name: impl Into<String>) -> Predicate {
                    compare(self.path(), CompareOp::Lt, Operand::variable(name))
                }

                #[must_use]
                pub fn lte_var(&self, name: impl Into<String>) -> Predicate {
                    compare(self.path(), CompareOp::Lte, Operand::variable(name))
                }

                #[must_use]
                pub fn gt_var(&self, name: impl Into<String>) -> Predicate {
                    compare(self.path(), CompareOp::Gt, Operand::variable(name))
                }

                #[must_use]
                pub fn gte_var(&self, name: impl Into<String>) -> Predicate {
                    compare(self.path(), CompareOp::Gte, Operand::variable(name))
                }

                /// Value is absent or explicitly null.
                #[must_use]
                pub fn is_null(&self) -> Predicate {
                    Predicate::IsNull {
                        path: self.path(),
                        target: NullTarget::Property,
                    }
                }

                #[must_use]
                pub fn is_not_null(&self) -> Predicate {
                    Predicate::IsNotNull {
                        path: self.path(),
                        target: NullTarget::Property,
                    }
                }

                #[must_use]
                pub fn asc(&self) -> OrderBy {
                    OrderBy::asc(self.path())
                }

                #[must_use]
                pub fn desc(&self) -> OrderBy {
                    OrderBy::desc(self.path())
                }
            }
        )*
    };
}

impl_property_predicates!([O, V] Property<O, V>, [V] PropertyExpr<V>);

// Text-only predicates.
macro_rules! impl_text_predicates {
    ( $( [$($generics:tt)*] $ty:ty ),* $(,)? ) => {
        $(
            impl<$($generics)*> $ty {
                /// Text matches the regular expression `pattern`.
                #[must_use]
                pub fn matches(&self, pattern: impl Into<String>) -> Predicate {
                    Predicate::Matches {
                        path: self.path(),
                        pattern: Operand::Value(Value::Text(pattern.into())),
                    }
                }

                #[must_use]
                pub fn matches_var(&self, name: impl Into<String>) -> Predicate {
                    Predicate::Matches {
                        path: self.path(),
                        pattern: Operand::variable(name),
                    }
                }
            }
        )*
    };
}

impl_text_predicates!(
    [O] Property<O, String>,
    [O] Property<O, Option<String>>,
    [] PropertyExpr<String>,
    [] PropertyExpr<Option<String>>,
);

// Collection predicates over `Vec<T>` properties.
macro_rules! impl_collection_predicates {
    ( $( [$($generics:tt)*] $ty:ty ),* $(,)? ) => {
        $(
            impl<$($generics)*> $ty
            where
                T: FieldValue,
            {
                /// Collection holds `value`.
                #[must_use]
                pub fn contains(&self, value: impl Into<T>) -> Predicate {
                    Predicate::Contains {
                        path: self.path(),
                        operand: literal::<T>(value),
                    }
                }

                #[must_use]
                pub fn contains_var(&self, name: impl Into<String>) -> Predicate {
                    Predicate::Contains {
                        path: self.path(),
                        operand: Operand::variable(name),
                    }
                }

                /// Collection holds every element of `values`.
                #[must_use]
                pub fn contains_all<I>(&self, values: I) -> Predicate
                where
                    I: IntoIterator,
                    I::Item: Into<T>,
                {
                    Predicate::ContainsAll {
                        path: self.path(),
                        operands: values.into_iter().map(literal::<T>).collect(),
                    }
                }
            }
        )*
    };
}

impl_collection_predicates!([O, T] Property<O, Vec<T>>, [T] PropertyExpr<Vec<T>>);

// ----------------------------------------------------------------------
// Association predicates and traversal
// ----------------------------------------------------------------------

macro_rules! impl_association_predicates {
    ( $( [$($generics:tt)*] $ty:ty ),* $(,)? ) => {
        $(
            impl<$($generics)*> $ty {
                /// Association points at `target`.
                #[must_use]
                pub fn eq(&self, target: impl Into<EntityReference>) -> Predicate {
                    compare(
                        self.path(),
                        CompareOp::Eq,
                        Operand::Value(Value::Ref(target.into())),
                    )
                }

                #[must_use]
                pub fn eq_var(&self, name: impl Into<String>) -> Predicate {
                    compare(self.path(), CompareOp::Eq, Operand::variable(name))
                }

                /// Association was never set or was cleared.
                #[must_use]
                pub fn is_null(&self) -> Predicate {
                    Predicate::IsNull {
                        path: self.path(),
                        target: NullTarget::Association,
                    }
                }

                #[must_use]
                pub fn is_not_null(&self) -> Predicate {
                    Predicate::IsNotNull {
                        path: self.path(),
                        target: NullTarget::Association,
                    }
                }

                /// Continue the path into a property of the associated entity.
                #[must_use]
                pub fn then<V>(&self, property: Property<T, V>) -> PropertyExpr<V> {
                    PropertyExpr::from_path(self.path().join(&property.path()))
                }

                #[must_use]
                pub fn then_association<U>(
                    &self,
                    association: Association<T, U>,
                ) -> AssociationExpr<U> {
                    AssociationExpr::from_path(self.path().join(&association.path()))
                }

                #[must_use]
                pub fn then_many<U>(
                    &self,
                    association: ManyAssociation<T, U>,
                ) -> ManyAssociationExpr<U> {
                    ManyAssociationExpr::from_path(self.path().join(&association.path()))
                }
            }
        )*
    };
}

impl_association_predicates!([O, T] Association<O, T>, [T] AssociationExpr<T>);

macro_rules! impl_many_association_predicates {
    ( $( [$($generics:tt)*] $ty:ty ),* $(,)? ) => {
        $(
            impl<$($generics)*> $ty {
                /// Many-association holds `target`.
                #[must_use]
                pub fn contains(&self, target: impl Into<EntityReference>) -> Predicate {
                    Predicate::Contains {
                        path: self.path(),
                        operand: Operand::Value(Value::Ref(target.into())),
                    }
                }

                #[must_use]
                pub fn contains_var(&self, name: impl Into<String>) -> Predicate {
                    Predicate::Contains {
                        path: self.path(),
                        operand: Operand::variable(name),
                    }
                }
            }
        )*
    };
}

impl_many_association_predicates!([O, T] ManyAssociation<O, T>, [T] ManyAssociationExpr<T>);
