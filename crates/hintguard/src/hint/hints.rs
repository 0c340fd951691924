//! Shorthand constructors for common hints.
//!
//! Each function mirrors one way of spelling an annotation: [`list`] is
//! `list[T]`, [`typing`] is `typing.Form[args]`, [`pipe`] is `A | B`.

use crate::{
    hint::{AliasOrigin, ForwardRefHint, Hint, HintKind, NewTypeDef, SpecialForm, TypingForm},
    object::Object,
    types::{ClassRef, builtins},
    validator::Validator,
};

/// The hint of a class.
#[must_use]
pub fn class(class: &ClassRef) -> Hint {
    Hint::class(class)
}

#[must_use]
pub fn object() -> Hint {
    Hint::class(&builtins().object)
}

#[must_use]
pub fn int() -> Hint {
    Hint::class(&builtins().int)
}

#[must_use]
pub fn bool() -> Hint {
    Hint::class(&builtins().bool_)
}

#[must_use]
pub fn float() -> Hint {
    Hint::class(&builtins().float)
}

#[must_use]
pub fn complex() -> Hint {
    Hint::class(&builtins().complex)
}

#[must_use]
pub fn str() -> Hint {
    Hint::class(&builtins().str)
}

#[must_use]
pub fn bytes() -> Hint {
    Hint::class(&builtins().bytes)
}

/// The `None` constant.
#[must_use]
pub fn none() -> Hint {
    Hint::new(HintKind::None)
}

/// `typing.Any`.
#[must_use]
pub fn any() -> Hint {
    Hint::form(TypingForm::Any)
}

/// `typing.<form>` unsubscripted.
#[must_use]
pub fn form(form: TypingForm) -> Hint {
    Hint::form(form)
}

/// `typing.<form>[args]`.
#[must_use]
pub fn typing(form: TypingForm, args: Vec<Hint>) -> Hint {
    Hint::alias(AliasOrigin::Form(SpecialForm::new(form)), args)
}

/// `typing_extensions.<form>[args]`.
#[must_use]
pub fn typing_extensions(form: TypingForm, args: Vec<Hint>) -> Hint {
    Hint::alias(AliasOrigin::Form(SpecialForm::extension(form)), args)
}

/// `cls[args]` for any subscriptable class: builtins, ABCs, user generics.
#[must_use]
pub fn generic(class: &ClassRef, args: Vec<Hint>) -> Hint {
    Hint::alias(AliasOrigin::Class(class.clone()), args)
}

/// `list[item]`.
#[must_use]
pub fn list(item: Hint) -> Hint {
    generic(&builtins().list, vec![item])
}

/// `set[item]`.
#[must_use]
pub fn set(item: Hint) -> Hint {
    generic(&builtins().set, vec![item])
}

/// `frozenset[item]`.
#[must_use]
pub fn frozenset(item: Hint) -> Hint {
    generic(&builtins().frozenset, vec![item])
}

/// `dict[key, value]`.
#[must_use]
pub fn dict(key: Hint, value: Hint) -> Hint {
    generic(&builtins().dict, vec![key, value])
}

/// `tuple[a, b, ...]` with fixed positions; an empty slice gives `tuple[()]`.
#[must_use]
pub fn tuple(items: &[Hint]) -> Hint {
    generic(&builtins().tuple, items.to_vec())
}

/// `tuple[item, ...]`.
#[must_use]
pub fn tuple_of(item: Hint) -> Hint {
    generic(&builtins().tuple, vec![item, Hint::value(Object::Ellipsis)])
}

/// `type[item]`.
#[must_use]
pub fn type_of(item: Hint) -> Hint {
    generic(&builtins().type_, vec![item])
}

/// `collections.abc.Sequence[item]`.
#[must_use]
pub fn sequence(item: Hint) -> Hint {
    generic(&builtins().sequence, vec![item])
}

/// `collections.abc.Iterable[item]`.
#[must_use]
pub fn iterable(item: Hint) -> Hint {
    generic(&builtins().iterable, vec![item])
}

/// `collections.abc.Mapping[key, value]`.
#[must_use]
pub fn mapping(key: Hint, value: Hint) -> Hint {
    generic(&builtins().mapping, vec![key, value])
}

/// `collections.abc.Callable[[params], ret]`.
#[must_use]
pub fn callable(params: Vec<Hint>, ret: Hint) -> Hint {
    generic(&builtins().callable, vec![Hint::new(HintKind::ParamList(params)), ret])
}

/// `typing.Union[members]`.
#[must_use]
pub fn union(members: &[Hint]) -> Hint {
    typing(TypingForm::Union, members.to_vec())
}

/// `a | b | ...`.
#[must_use]
pub fn pipe(members: &[Hint]) -> Hint {
    Hint::new(HintKind::UnionType(members.to_vec()))
}

/// `typing.Optional[item]`.
#[must_use]
pub fn optional(item: Hint) -> Hint {
    typing(TypingForm::Optional, vec![item])
}

/// `typing.Literal[values]`.
#[must_use]
pub fn literal(values: impl IntoIterator<Item = Object>) -> Hint {
    typing(TypingForm::Literal, values.into_iter().map(Hint::value).collect())
}

/// `typing.Annotated[hint, validators]`.
#[must_use]
pub fn annotated(hint: Hint, validators: impl IntoIterator<Item = Validator>) -> Hint {
    let mut args = vec![hint];
    args.extend(validators.into_iter().map(|v| Hint::new(HintKind::Validator(v))));
    typing(TypingForm::Annotated, args)
}

/// `typing.Annotated[hint, metadata]` with arbitrary metadata hints.
#[must_use]
pub fn annotated_with(hint: Hint, metadata: Vec<Hint>) -> Hint {
    let mut args = vec![hint];
    args.extend(metadata);
    typing(TypingForm::Annotated, args)
}

/// `typing.ForwardRef(name)`.
#[must_use]
pub fn forward_ref(name: impl Into<String>) -> Hint {
    Hint::new(HintKind::ForwardRef(ForwardRefHint {
        name: name.into(),
        module: None,
    }))
}

/// `typing.ForwardRef(name, module=module)`.
#[must_use]
pub fn forward_ref_in(name: impl Into<String>, module: impl Into<String>) -> Hint {
    Hint::new(HintKind::ForwardRef(ForwardRefHint {
        name: name.into(),
        module: Some(module.into()),
    }))
}

/// A stringified annotation, `"Name"`.
#[must_use]
pub fn string(name: impl Into<String>) -> Hint {
    Hint::string(name)
}

/// `NewType(name, supertype)` declared in `module`.
#[must_use]
pub fn new_type(name: impl Into<String>, module: impl Into<String>, supertype: Hint) -> Hint {
    Hint::new(HintKind::NewType(NewTypeDef {
        name: name.into(),
        module: module.into(),
        supertype,
    }))
}

/// `TypeVarTuple(name)`.
#[must_use]
pub fn type_var_tuple(name: impl Into<String>) -> Hint {
    Hint::new(HintKind::TypeVarTuple(name.into()))
}

/// `ParamSpec(name)`.
#[must_use]
pub fn param_spec(name: impl Into<String>) -> Hint {
    Hint::new(HintKind::ParamSpec(name.into()))
}

/// `typing.Unpack[item]`.
#[must_use]
pub fn unpack(item: Hint) -> Hint {
    typing(TypingForm::Unpack, vec![item])
}
