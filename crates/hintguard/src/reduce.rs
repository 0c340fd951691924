//! Hint reduction: rewriting equivalent spellings to one canonical form.
//!
//! Rules run to a bounded fixpoint. Each rule is a pure function of the hint
//! and the [`ReduceContext`]; `Annotated` metadata is split off into validators
//! rather than kept as a child hint.

use std::sync::{Arc, Weak};

use ahash::AHashMap;

use crate::{
    conf::CheckConf,
    error::{HintError, HintResult},
    function::ParamKind,
    hint::{AliasOrigin, GenericAlias, Hint, HintId, HintKind, SpecialForm, TypingForm, hints},
    namespace::LocalScope,
    sign::{SignCategory, registry, sign_of},
    types::{ClassRef, builtins},
    validator::Validator,
};

/// Upper bound on rewrite passes for one hint.
pub const MAX_REDUCTION_PASSES: usize = 64;

/// Where a hint appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HintPosition {
    /// Annotation of a parameter of the given kind.
    Param(ParamKind),
    Return,
    /// A child of another hint.
    Nested,
    /// A one-off check (`is_bearable`).
    Standalone,
}

/// Declaration-site scope shared by every hint of one callable.
#[derive(Debug, Clone, Default)]
struct DeclScope {
    module: Option<String>,
    cls_stack: Vec<ClassRef>,
    typevars: AHashMap<HintId, Hint>,
    local: Option<Weak<LocalScope>>,
}

/// Context threaded through reduction, classification and code generation.
#[derive(Debug, Clone)]
pub struct ReduceContext {
    position: HintPosition,
    conf: CheckConf,
    scope: Arc<DeclScope>,
}

impl ReduceContext {
    /// A standalone context with no enclosing module or class.
    #[must_use]
    pub fn new(conf: &CheckConf) -> Self {
        Self {
            position: HintPosition::Standalone,
            conf: conf.clone(),
            scope: Arc::default(),
        }
    }

    /// Sets the module forward references resolve against.
    #[must_use]
    pub fn module(mut self, module: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.scope).module = Some(module.into());
        self
    }

    /// Pushes an enclosing class (innermost last).
    #[must_use]
    pub fn push_class(mut self, class: &ClassRef) -> Self {
        Arc::make_mut(&mut self.scope).cls_stack.push(class.clone());
        self
    }

    /// Maps a type variable to a concrete hint.
    #[must_use]
    pub fn typevar(mut self, type_var: &Hint, hint: Hint) -> Self {
        Arc::make_mut(&mut self.scope).typevars.insert(type_var.id(), hint);
        self
    }

    /// Captures the enclosing function's locals weakly.
    #[must_use]
    pub fn local_scope(mut self, scope: Weak<LocalScope>) -> Self {
        Arc::make_mut(&mut self.scope).local = Some(scope);
        self
    }

    /// The same scope at another position.
    #[must_use]
    pub fn at(&self, position: HintPosition) -> Self {
        Self {
            position,
            conf: self.conf.clone(),
            scope: Arc::clone(&self.scope),
        }
    }

    /// The same scope for a child hint.
    #[must_use]
    pub fn nested(&self) -> Self {
        self.at(HintPosition::Nested)
    }

    /// A nested context with extra type variable substitutions.
    #[must_use]
    pub fn with_substitutions(&self, pairs: impl IntoIterator<Item = (Hint, Hint)>) -> Self {
        let mut ctx = self.nested();
        let scope = Arc::make_mut(&mut ctx.scope);
        for (type_var, hint) in pairs {
            scope.typevars.insert(type_var.id(), hint);
        }
        ctx
    }

    #[must_use]
    pub fn position(&self) -> HintPosition {
        self.position
    }

    #[must_use]
    pub fn conf(&self) -> &CheckConf {
        &self.conf
    }

    #[must_use]
    pub fn scope_module(&self) -> Option<&str> {
        self.scope.module.as_deref()
    }

    /// Enclosing classes, innermost last.
    #[must_use]
    pub fn cls_stack(&self) -> &[ClassRef] {
        &self.scope.cls_stack
    }

    #[must_use]
    pub fn local(&self) -> Option<&Weak<LocalScope>> {
        self.scope.local.as_ref()
    }

    /// The hint a type variable is bound to in this context.
    #[must_use]
    pub fn substitution(&self, type_var: &Hint) -> Option<&Hint> {
        self.scope.typevars.get(&type_var.id())
    }

    /// True when reduction depends on nothing but the hint, position and conf.
    #[must_use]
    pub fn is_scope_free(&self) -> bool {
        self.scope.cls_stack.is_empty() && self.scope.typevars.is_empty()
    }
}

/// A reduced hint plus the validators split off `Annotated` metadata.
#[derive(Debug, Clone)]
pub struct Reduced {
    pub hint: Hint,
    pub validators: Vec<Validator>,
}

/// True for hints that match any value.
pub(crate) fn is_ignorable(hint: &Hint) -> bool {
    hint.as_class().is_some_and(|c| c.is_root())
}

/// Reduces `hint` to its canonical form.
pub fn reduce(hint: &Hint, ctx: &ReduceContext) -> HintResult<Reduced> {
    let mut validators = Vec::new();
    let mut current = reduce_variadic(hint, ctx)?;
    for _ in 0..MAX_REDUCTION_PASSES {
        match reduce_once(&current, ctx, &mut validators)? {
            Some(next) => current = next,
            None => {
                return Ok(Reduced {
                    hint: current,
                    validators,
                });
            }
        }
    }
    Err(HintError::Recursion {
        repr: hint.repr(),
        limit: MAX_REDUCTION_PASSES,
    })
}

/// `*args: T` checks the args tuple as `tuple[T, ...]`; `**kwargs: T` checks the kwargs dict as `dict[str, T]`.
fn reduce_variadic(hint: &Hint, ctx: &ReduceContext) -> HintResult<Hint> {
    let HintPosition::Param(kind) = ctx.position else {
        return Ok(hint.clone());
    };
    let unpacked = (hint.subscripted_form() == Some(TypingForm::Unpack)).then(|| hint.args());
    match (kind, unpacked) {
        (ParamKind::VarPositional, Some([inner])) => match inner.kind() {
            HintKind::TypeVarTuple(_) => Ok(hints::object()),
            _ if inner.origin_class().is_some_and(|c| c == builtins().tuple) => Ok(inner.clone()),
            _ => Err(HintError::malformed(hint.repr(), "*args unpack requires a TypeVarTuple or tuple hint")),
        },
        (ParamKind::VarKeyword, Some([inner])) => match inner.as_class() {
            Some(class) if class.flags().typed_dict => Ok(inner.clone()),
            _ => Err(HintError::malformed(hint.repr(), "**kwargs unpack requires a TypedDict")),
        },
        (_, Some(_)) => Err(HintError::malformed(hint.repr(), "Unpack outside a variadic parameter")),
        (ParamKind::VarPositional, None) => Ok(hints::tuple_of(hint.clone())),
        (ParamKind::VarKeyword, None) => Ok(hints::dict(hints::str(), hint.clone())),
        (_, None) => Ok(hint.clone()),
    }
}

/// Applies the first matching rule, or returns `None` at the fixpoint.
fn reduce_once(hint: &Hint, ctx: &ReduceContext, validators: &mut Vec<Validator>) -> HintResult<Option<Hint>> {
    let b = builtins();
    let next = match hint.kind() {
        HintKind::None => Some(Hint::class(&b.none_type)),
        HintKind::TypeVar(def) => Some(if let Some(sub) = ctx.substitution(hint) {
            sub.clone()
        } else if let Some(bound) = &def.bound {
            bound.clone()
        } else if def.constraints.is_empty() {
            hints::object()
        } else {
            hints::union(&def.constraints)
        }),
        HintKind::ParamSpec(_) | HintKind::TypeVarTuple(_) => {
            Some(ctx.substitution(hint).cloned().unwrap_or_else(hints::object))
        }
        HintKind::NewType(def) => Some(def.supertype.clone()),
        HintKind::UnionType(_) => reduce_union(hint, ctx)?,
        HintKind::Form(form) => reduce_bare_form(hint, form.form, ctx)?,
        HintKind::Alias(alias) => reduce_alias(hint, alias, ctx, validators)?,
        HintKind::Class(class) if *class == b.generic || *class == b.protocol => Some(hints::object()),
        _ => None,
    };
    Ok(next)
}

fn reduce_bare_form(hint: &Hint, form: TypingForm, ctx: &ReduceContext) -> HintResult<Option<Hint>> {
    let next = match form {
        TypingForm::Any | TypingForm::Generic | TypingForm::Protocol => hints::object(),
        f if registry().is_deprecated(&hint.repr()) => match f.origin_class() {
            Some(origin) => Hint::class(&origin),
            None => return Ok(None),
        },
        f if f.is_qualifier() => hints::object(),
        TypingForm::LiteralString => hints::str(),
        TypingForm::TypeGuard | TypingForm::TypeIs => hints::bool(),
        TypingForm::SelfType => return reduce_self(hint, ctx).map(Some),
        _ if sign_of(hint).is_some_and(|sign| sign.is_in(SignCategory::ReturnOnly)) => {
            if matches!(ctx.position, HintPosition::Param(_)) {
                return Err(HintError::malformed(hint.repr(), "only valid as a return hint"));
            }
            return Ok(None);
        }
        TypingForm::Optional | TypingForm::Union | TypingForm::Literal | TypingForm::Annotated | TypingForm::Unpack => {
            return Err(HintError::malformed(hint.repr(), "requires subscription"));
        }
        _ => return Ok(None),
    };
    Ok(Some(next))
}

/// `typing.Self` is the innermost enclosing class.
fn reduce_self(hint: &Hint, ctx: &ReduceContext) -> HintResult<Hint> {
    ctx.cls_stack()
        .last()
        .map(Hint::class)
        .ok_or_else(|| HintError::malformed(hint.repr(), "typing.Self outside a class"))
}

fn reduce_alias(
    hint: &Hint,
    alias: &GenericAlias,
    ctx: &ReduceContext,
    validators: &mut Vec<Validator>,
) -> HintResult<Option<Hint>> {
    let args = &alias.args;
    let form = match &alias.origin {
        AliasOrigin::Form(form) => form.form,
        AliasOrigin::Class(class) => return reduce_class_alias(hint, class, args),
    };
    let next = match form {
        TypingForm::Optional => match args.as_slice() {
            [inner] => hints::union(&[inner.clone(), hints::none()]),
            _ => return Err(HintError::malformed(hint.repr(), "Optional requires exactly one argument")),
        },
        TypingForm::Union => return reduce_union(hint, ctx),
        TypingForm::Annotated => {
            let Some((inner, metadata)) = args.split_first().filter(|(_, meta)| !meta.is_empty()) else {
                return Err(HintError::malformed(hint.repr(), "Annotated requires at least one metadata item"));
            };
            // Only validators are checked; other metadata is inert.
            let found: Vec<Validator> = metadata
                .iter()
                .filter_map(|m| match m.kind() {
                    HintKind::Validator(v) => Some(v.clone()),
                    _ => None,
                })
                .collect();
            validators.splice(0..0, found);
            inner.clone()
        }
        f if f.is_qualifier() => match args.as_slice() {
            [inner] => inner.clone(),
            _ => return Err(HintError::malformed(hint.repr(), format!("{f} requires exactly one argument"))),
        },
        TypingForm::TypeGuard | TypingForm::TypeIs => hints::bool(),
        TypingForm::Generic | TypingForm::Protocol => hints::object(),
        TypingForm::Unpack => {
            return Err(HintError::malformed(
                hint.repr(),
                "Unpack outside a variadic parameter or tuple hint",
            ));
        }
        TypingForm::Any
        | TypingForm::NoReturn
        | TypingForm::Never
        | TypingForm::SelfType
        | TypingForm::LiteralString => {
            return Err(HintError::malformed(hint.repr(), "not subscriptable"));
        }
        f if registry().is_deprecated(&hint.repr()) => match f.origin_class() {
            Some(origin) => Hint::alias(AliasOrigin::Class(origin), args.clone()),
            None => return Ok(None),
        },
        _ => return Ok(None),
    };
    Ok(Some(next))
}

/// Tuples holding one unpacked item are checked shallowly.
fn reduce_class_alias(hint: &Hint, class: &ClassRef, args: &[Hint]) -> HintResult<Option<Hint>> {
    if *class != builtins().tuple {
        return Ok(None);
    }
    let unpacks = args
        .iter()
        .filter(|a| a.subscripted_form() == Some(TypingForm::Unpack))
        .count();
    match unpacks {
        0 => Ok(None),
        1 => Ok(Some(Hint::class(class))),
        _ => Err(HintError::malformed(hint.repr(), "tuple hint contains more than one unpack")),
    }
}

fn flatten_union(hint: &Hint, out: &mut Vec<Hint>) {
    if hint.is_union() {
        for member in hint.args() {
            flatten_union(member, out);
        }
    } else {
        out.push(hint.clone());
    }
}

/// Flattens nested unions, reduces members, and collapses ignorable or single-member unions.
fn reduce_union(hint: &Hint, ctx: &ReduceContext) -> HintResult<Option<Hint>> {
    let mut flat = Vec::new();
    for member in hint.args() {
        flatten_union(member, &mut flat);
    }
    if flat.is_empty() {
        return Err(HintError::malformed(hint.repr(), "union without members"));
    }

    let nested = ctx.nested();
    let mut members: Vec<Hint> = Vec::with_capacity(flat.len());
    for member in flat {
        let reduced = reduce(&member, &nested)?;
        if !reduced.validators.is_empty() {
            // Keep the spelling so classification can rebuild the validators.
            members.push(member);
        } else if is_ignorable(&reduced.hint) {
            return Ok(Some(hints::object()));
        } else if reduced.hint.is_union() {
            members.extend(reduced.hint.args().iter().cloned());
        } else {
            members.push(reduced.hint);
        }
    }

    let next = if members.len() == 1 {
        members.pop().unwrap_or_else(hints::object)
    } else if matches!(hint.kind(), HintKind::UnionType(_)) {
        hints::pipe(&members)
    } else {
        Hint::alias(AliasOrigin::Form(SpecialForm::new(TypingForm::Union)), members)
    };
    Ok((next != *hint).then_some(next))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variadic_keyword_wraps_in_str_dict() {
        let ctx = ReduceContext::new(&CheckConf::new()).at(HintPosition::Param(ParamKind::VarKeyword));
        let reduced = reduce(&hints::int(), &ctx).unwrap();
        assert_eq!(reduced.hint.repr(), "dict[str, int]");
    }

    #[test]
    fn union_of_one_member_is_the_member() {
        let ctx = ReduceContext::new(&CheckConf::new());
        let reduced = reduce(&hints::union(&[hints::int()]), &ctx).unwrap();
        assert_eq!(reduced.hint, hints::int());
    }
}
