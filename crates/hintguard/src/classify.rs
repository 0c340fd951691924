//! The hint classifier: one entry point from annotation to `(sign, children, data)`.

use std::sync::{LazyLock, PoisonError, RwLock};

use ahash::AHashMap;
use smallvec::SmallVec;

use crate::{
    error::{HintError, HintResult},
    hint::{Hint, HintId, HintKind, TypingForm},
    object::Object,
    reduce::{HintPosition, ReduceContext, reduce},
    sign::{Arity, HintSign, SignCategory, Strategy, sign_of},
    types::{ClassRef, builtins, pseudo_superclasses},
    validator::Validator,
};

/// Upper bound on chained hint extension substitutions.
pub const MAX_SUBSTITUTION_DEPTH: usize = 32;

type CacheKey = (HintId, HintPosition);

static CLASSIFIED: LazyLock<RwLock<AHashMap<CacheKey, ClassifiedHint>>> = LazyLock::new(Default::default);

/// Sign-specific payload of a classified hint.
#[derive(Debug, Clone)]
pub enum SignData {
    None,
    /// Literal members in declared order.
    Literals(Vec<Object>),
    /// `Annotated` validators plus the classification of the wrapped hint.
    Annotated {
        validators: Vec<Validator>,
        inner: Box<ClassifiedHint>,
    },
    /// A user generic and what its type parameters are bound to.
    Generic {
        class: ClassRef,
        substitutions: Vec<(Hint, Hint)>,
        /// Subscripted builtin bases, e.g. `list[T]` in `class Bag(list[T])`.
        supers: Vec<Hint>,
    },
    /// Keys a `TypedDict` value must hold.
    TypedDict { required: Vec<String> },
}

/// The classification of one hint occurrence.
#[derive(Debug, Clone)]
pub struct ClassifiedHint {
    pub sign: HintSign,
    /// The reduced hint, or the `Annotated` hint for [`HintSign::Annotated`].
    pub hint: Hint,
    /// Child hints in declared order; duplicates are kept.
    pub children: SmallVec<[Hint; 2]>,
    /// The runtime class the check starts with, if any.
    pub origin: Option<ClassRef>,
    pub data: SignData,
}

impl ClassifiedHint {
    fn leaf(sign: HintSign, hint: &Hint, origin: Option<ClassRef>) -> Self {
        Self {
            sign,
            hint: hint.clone(),
            children: SmallVec::new(),
            origin,
            data: SignData::None,
        }
    }

    fn container(sign: HintSign, hint: &Hint, origin: Option<ClassRef>, children: &[Hint]) -> Self {
        Self {
            children: children.iter().cloned().collect(),
            ..Self::leaf(sign, hint, origin)
        }
    }

    #[must_use]
    pub fn strategy(&self) -> Strategy {
        self.sign.strategy()
    }

    /// True when the hint matches every value.
    #[must_use]
    pub fn is_ignorable(&self) -> bool {
        self.sign == HintSign::Ignorable
    }
}

/// Classifies `hint` at the position carried by `ctx`.
///
/// Plain classes take a fast path with no reduction and no cache lookup.
/// Other results are cached by hint identity and position when the context
/// has no enclosing class and no type variable substitutions.
pub fn classify_hint(hint: &Hint, ctx: &ReduceContext) -> HintResult<ClassifiedHint> {
    if let HintKind::Class(class) = hint.kind()
        && is_plain_class(class)
        && !matches!(ctx.position(), HintPosition::Param(kind) if kind.is_variadic())
    {
        return Ok(ClassifiedHint::leaf(HintSign::Isinstanceable, hint, Some(class.clone())));
    }

    let key = ctx.is_scope_free().then(|| (hint.id(), ctx.position()));
    if let Some(key) = key
        && let Some(hit) = CLASSIFIED.read().unwrap_or_else(PoisonError::into_inner).get(&key)
    {
        return Ok(hit.clone());
    }

    let classified = classify_uncached(hint, ctx, 0)?;
    tracing::trace!(hint = %hint, sign = %classified.sign, "classified hint");
    if let Some(key) = key {
        // Concurrent decorations may race here; both compute the same result.
        CLASSIFIED
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, classified.clone());
    }
    Ok(classified)
}

fn is_plain_class(class: &ClassRef) -> bool {
    let b = builtins();
    !class.is_root()
        && !class.flags().typed_dict
        && *class != b.generic
        && *class != b.protocol
        && pseudo_superclasses(class).is_empty()
}

fn classify_uncached(hint: &Hint, ctx: &ReduceContext, depth: usize) -> HintResult<ClassifiedHint> {
    match hint.kind() {
        HintKind::Value(_) | HintKind::Validator(_) | HintKind::ParamList(_) => {
            return Err(HintError::NotAHint { repr: hint.repr() });
        }
        HintKind::Extension(ext) => {
            if depth >= MAX_SUBSTITUTION_DEPTH {
                return Err(HintError::Recursion {
                    repr: ext.repr(),
                    limit: MAX_SUBSTITUTION_DEPTH,
                });
            }
            return classify_uncached(&ext.substitute(), ctx, depth + 1);
        }
        _ => {}
    }

    let reduced = reduce(hint, ctx)?;
    let inner = if matches!(reduced.hint.kind(), HintKind::Extension(_)) {
        classify_uncached(&reduced.hint, &ctx.nested(), depth + 1)?
    } else {
        classify_reduced(&reduced.hint)?
    };
    if reduced.validators.is_empty() {
        return Ok(inner);
    }
    Ok(ClassifiedHint {
        sign: HintSign::Annotated,
        hint: hint.clone(),
        children: SmallVec::from_elem(reduced.hint, 1),
        origin: inner.origin.clone(),
        data: SignData::Annotated {
            validators: reduced.validators,
            inner: Box::new(inner),
        },
    })
}

/// Classifies a hint the reducer has already rewritten.
fn classify_reduced(hint: &Hint) -> HintResult<ClassifiedHint> {
    let Some(sign) = sign_of(hint) else {
        return classify_user_generic(hint);
    };
    let origin = hint.origin_class().or_else(|| hint.as_class().cloned());
    match sign {
        HintSign::Ignorable | HintSign::Isinstanceable | HintSign::ForwardRef | HintSign::NoReturn => {
            Ok(ClassifiedHint::leaf(sign, hint, origin))
        }
        sign if sign.is_in(SignCategory::Union) => {
            if hint.args().is_empty() {
                return Err(HintError::malformed(hint.repr(), "union without members"));
            }
            Ok(ClassifiedHint::container(sign, hint, None, hint.args()))
        }
        HintSign::Literal => classify_literal(hint),
        sign if sign.is_in(SignCategory::Tuple) => classify_tuple(hint, origin),
        HintSign::TypedDict => classify_typed_dict(hint),
        HintSign::Generic => classify_pseudo_generic(hint),
        _ => classify_by_strategy(sign, hint, origin),
    }
}

/// Containers and origin-only hints, driven by the sign's declared arity.
fn classify_by_strategy(sign: HintSign, hint: &Hint, origin: Option<ClassRef>) -> HintResult<ClassifiedHint> {
    let strategy = sign.strategy();
    if sign.is_in(SignCategory::Reduced) {
        return Err(HintError::unsupported(hint.repr()));
    }
    let args = hint.args();
    if !hint.is_subscripted() {
        return Ok(ClassifiedHint::leaf(sign, hint, origin));
    }
    let expected = match strategy.arity {
        Arity::Zero => 0,
        Arity::One => 1,
        Arity::Two => 2,
        Arity::Many => return Ok(ClassifiedHint::container(sign, hint, origin, args)),
    };
    if args.len() != expected {
        return Err(HintError::malformed(
            hint.repr(),
            format!("expected {expected} type argument(s), got {}", args.len()),
        ));
    }
    if args.iter().any(|a| matches!(a.kind(), HintKind::Value(Object::Ellipsis))) {
        return Err(HintError::malformed(hint.repr(), "'...' only valid as the last tuple argument"));
    }
    Ok(ClassifiedHint::container(sign, hint, origin, args))
}

/// `tuple[()]`, `tuple[A, B]` or `tuple[A, ...]`.
fn classify_tuple(hint: &Hint, origin: Option<ClassRef>) -> HintResult<ClassifiedHint> {
    let args = hint.args();
    let is_ellipsis = |h: &Hint| matches!(h.kind(), HintKind::Value(Object::Ellipsis));
    if let [item, last] = args
        && is_ellipsis(last)
    {
        if is_ellipsis(item) {
            return Err(HintError::malformed(hint.repr(), "'...' cannot be the tuple item hint"));
        }
        return Ok(ClassifiedHint::container(HintSign::TupleVariadic, hint, origin, &[item.clone()]));
    }
    if args.iter().any(is_ellipsis) {
        return Err(HintError::malformed(hint.repr(), "'...' only valid as the last of two tuple arguments"));
    }
    Ok(ClassifiedHint::container(HintSign::TupleFixed, hint, origin, args))
}

fn is_literal_safe(value: &Object) -> bool {
    match value {
        Object::Int(_) | Object::Bool(_) | Object::String(_) | Object::Bytes(_) | Object::None => true,
        Object::Instance(instance) => instance.class().flags().enumeration,
        _ => false,
    }
}

fn classify_literal(hint: &Hint) -> HintResult<ClassifiedHint> {
    let args = hint.args();
    if args.is_empty() {
        return Err(HintError::malformed(hint.repr(), "Literal requires at least one value"));
    }
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        let value = match arg.kind() {
            HintKind::Value(value) if is_literal_safe(value) => value.clone(),
            HintKind::None => Object::None,
            _ => {
                return Err(HintError::malformed(
                    hint.repr(),
                    format!("{} not a valid literal value", arg.repr()),
                ));
            }
        };
        values.push(value);
    }
    Ok(ClassifiedHint {
        data: SignData::Literals(values),
        ..ClassifiedHint::leaf(HintSign::Literal, hint, None)
    })
}

/// Required keys of a `TypedDict`: every key of a total dict unless marked
/// `NotRequired`, and only `Required` keys of a non-total one.
fn classify_typed_dict(hint: &Hint) -> HintResult<ClassifiedHint> {
    let Some(class) = hint.as_class() else {
        return Err(HintError::unsupported(hint.repr()));
    };
    let total = class.flags().total;
    let required = class
        .all_annotations()
        .into_iter()
        .filter(|(_, field)| match field.subscripted_form() {
            Some(TypingForm::Required) => true,
            Some(TypingForm::NotRequired) => false,
            _ => total,
        })
        .map(|(name, _)| name)
        .collect();
    Ok(ClassifiedHint {
        data: SignData::TypedDict { required },
        ..ClassifiedHint::leaf(HintSign::TypedDict, hint, Some(builtins().dict.clone()))
    })
}

/// A class with subscripted builtin bases, used unsubscripted.
fn classify_pseudo_generic(hint: &Hint) -> HintResult<ClassifiedHint> {
    let Some(class) = hint.as_class() else {
        return Err(HintError::unsupported(hint.repr()));
    };
    Ok(generic(hint, class, Vec::new()))
}

/// `MyGeneric[int]`: a subscripted user class with no dedicated sign.
fn classify_user_generic(hint: &Hint) -> HintResult<ClassifiedHint> {
    let Some(class) = hint.origin_class().filter(|_| hint.is_subscripted()) else {
        return Err(HintError::unsupported(hint.repr()));
    };
    let params = class.type_params();
    if params.is_empty() {
        return Err(HintError::malformed(hint.repr(), format!("{} not a generic class", class.type_repr())));
    }
    let args = hint.args();
    if args.len() != params.len() {
        return Err(HintError::malformed(
            hint.repr(),
            format!("expected {} type argument(s), got {}", params.len(), args.len()),
        ));
    }
    let substitutions = params.iter().cloned().zip(args.iter().cloned()).collect();
    Ok(generic(hint, &class, substitutions))
}

fn generic(hint: &Hint, class: &ClassRef, substitutions: Vec<(Hint, Hint)>) -> ClassifiedHint {
    ClassifiedHint {
        data: SignData::Generic {
            class: class.clone(),
            substitutions,
            supers: pseudo_superclasses(class).into_vec(),
        },
        ..ClassifiedHint::container(HintSign::Generic, hint, Some(class.clone()), hint.args())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{conf::CheckConf, hint::hints};

    #[test]
    fn plain_class_takes_fast_path() {
        let ctx = ReduceContext::new(&CheckConf::new());
        let classified = classify_hint(&hints::int(), &ctx).unwrap();
        assert_eq!(classified.sign, HintSign::Isinstanceable);
        assert!(classified.children.is_empty());
    }

    #[test]
    fn ellipsis_in_the_middle_is_malformed() {
        let ctx = ReduceContext::new(&CheckConf::new());
        let hint = hints::tuple(&[hints::int(), Hint::value(Object::Ellipsis), hints::str()]);
        assert!(matches!(classify_hint(&hint, &ctx), Err(HintError::Malformed { .. })));
    }
}
