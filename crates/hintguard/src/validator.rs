//! Runtime validators attached to `Annotated` hints.
//!
//! Validators compose with `&`, `|` and `!`:
//!
//! ```text
//! let positive = Validator::is("lambda x: x > 0", |x| matches!(x, Object::Int(i) if *i > 0));
//! let small = Validator::is("lambda x: x < 10", |x| matches!(x, Object::Int(i) if *i < 10));
//! let digit = positive & small;
//! ```

use std::{
    fmt,
    ops::{BitAnd, BitOr, Not},
    sync::Arc,
};

use crate::{
    object::Object,
    types::{ClassRef, is_instance_any, is_subclass},
};

type Predicate = dyn Fn(&Object) -> bool + Send + Sync;

enum ValidatorKind {
    Is { repr: String, predicate: Arc<Predicate> },
    IsAttr { name: String, check: Validator },
    IsEqual(Object),
    IsInstance(Vec<ClassRef>),
    IsSubclass(Vec<ClassRef>),
    And(Validator, Validator),
    Or(Validator, Validator),
    Not(Validator),
}

/// A boolean predicate on the pith.
#[derive(Clone)]
pub struct Validator(Arc<ValidatorKind>);

impl Validator {
    fn new(kind: ValidatorKind) -> Self {
        Self(Arc::new(kind))
    }

    /// `Is[predicate]`; `repr` is how the predicate shows up in messages.
    #[must_use]
    pub fn is(repr: impl Into<String>, predicate: impl Fn(&Object) -> bool + Send + Sync + 'static) -> Self {
        Self::new(ValidatorKind::Is {
            repr: repr.into(),
            predicate: Arc::new(predicate),
        })
    }

    /// `IsAttr[name, check]`: the attribute exists and satisfies `check`.
    #[must_use]
    pub fn is_attr(name: impl Into<String>, check: Self) -> Self {
        Self::new(ValidatorKind::IsAttr {
            name: name.into(),
            check,
        })
    }

    /// `IsEqual[value]`.
    #[must_use]
    pub fn is_equal(value: impl Into<Object>) -> Self {
        Self::new(ValidatorKind::IsEqual(value.into()))
    }

    /// `IsInstance[classes]`.
    #[must_use]
    pub fn is_instance(classes: &[ClassRef]) -> Self {
        Self::new(ValidatorKind::IsInstance(classes.to_vec()))
    }

    /// `IsSubclass[classes]`.
    #[must_use]
    pub fn is_subclass(classes: &[ClassRef]) -> Self {
        Self::new(ValidatorKind::IsSubclass(classes.to_vec()))
    }

    /// Runs the validator.
    #[must_use]
    pub fn check(&self, pith: &Object) -> bool {
        match &*self.0 {
            ValidatorKind::Is { predicate, .. } => predicate(pith),
            ValidatorKind::IsAttr { name, check } => pith.get_attr(name).is_some_and(|value| check.check(&value)),
            ValidatorKind::IsEqual(value) => pith.py_eq(value),
            ValidatorKind::IsInstance(classes) => is_instance_any(pith, classes),
            ValidatorKind::IsSubclass(classes) => match pith {
                Object::Type(class) => classes.iter().any(|c| is_subclass(class, c)),
                _ => false,
            },
            ValidatorKind::And(a, b) => a.check(pith) && b.check(pith),
            ValidatorKind::Or(a, b) => a.check(pith) || b.check(pith),
            ValidatorKind::Not(a) => !a.check(pith),
        }
    }

    #[must_use]
    pub fn repr(&self) -> String {
        match &*self.0 {
            ValidatorKind::Is { repr, .. } => format!("Is[{repr}]"),
            ValidatorKind::IsAttr { name, check } => format!("IsAttr['{name}', {}]", check.repr()),
            ValidatorKind::IsEqual(value) => format!("IsEqual[{}]", value.repr()),
            ValidatorKind::IsInstance(classes) => format!("IsInstance[{}]", class_list(classes)),
            ValidatorKind::IsSubclass(classes) => format!("IsSubclass[{}]", class_list(classes)),
            ValidatorKind::And(a, b) => format!("({} & {})", a.repr(), b.repr()),
            ValidatorKind::Or(a, b) => format!("({} | {})", a.repr(), b.repr()),
            ValidatorKind::Not(a) => format!("~{}", a.repr()),
        }
    }

    /// True if both handles are the same validator object.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

fn class_list(classes: &[ClassRef]) -> String {
    classes.iter().map(|c| c.type_repr()).collect::<Vec<_>>().join(", ")
}

impl BitAnd for Validator {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self::new(ValidatorKind::And(self, rhs))
    }
}

impl BitOr for Validator {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self::new(ValidatorKind::Or(self, rhs))
    }
}

impl Not for Validator {
    type Output = Self;

    fn not(self) -> Self {
        Self::new(ValidatorKind::Not(self))
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positive() -> Validator {
        Validator::is("lambda x: x > 0", |x| matches!(x, Object::Int(i) if *i > 0))
    }

    #[test]
    fn operators_compose() {
        let v = !positive() | Validator::is_equal(5);
        assert!(v.check(&Object::Int(-1)));
        assert!(v.check(&Object::Int(5)));
        assert!(!v.check(&Object::Int(3)));
        assert_eq!(v.repr(), "(~Is[lambda x: x > 0] | IsEqual[5])");
    }
}
