//! Type hints: the annotation objects the engine reads but never mutates.
//!
//! A [`Hint`] is a cheap, shared handle carrying a process-unique id. Caches
//! key on that id, never on structural equality: two structurally equal
//! forward references may live in different scopes. Hints of a class and of
//! an unsubscripted special form are canonical, so every `int` annotation
//! shares one id the way every `int` annotation shares one class object.

mod form;
pub mod hints;

use std::{
    fmt,
    sync::{
        Arc, LazyLock, PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use ahash::AHashMap;

pub use form::{FormModule, SpecialForm, TypingForm};

use crate::{
    object::Object,
    types::{ClassRef, builtins},
    validator::Validator,
};

/// Process-unique hint identity.
pub type HintId = u64;

static NEXT_HINT_ID: AtomicU64 = AtomicU64::new(1);

static CLASS_HINTS: LazyLock<RwLock<AHashMap<u64, Hint>>> = LazyLock::new(Default::default);
static FORM_HINTS: LazyLock<RwLock<AHashMap<SpecialForm, Hint>>> = LazyLock::new(Default::default);

/// The hint extension protocol.
///
/// Objects implementing it are not hints themselves but name a substitute hint
/// to check against instead.
pub trait HintProtocol: fmt::Debug + Send + Sync {
    /// Representation shown in messages.
    fn repr(&self) -> String;

    /// The substitute hint.
    fn substitute(&self) -> Hint;
}

/// Variance of a type variable; only affects its repr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Variance {
    #[default]
    Invariant,
    Covariant,
    Contravariant,
}

/// A `TypeVar` declaration.
#[derive(Debug, Clone)]
pub struct TypeVarDef {
    pub name: String,
    pub bound: Option<Hint>,
    pub constraints: Vec<Hint>,
    pub variance: Variance,
}

impl TypeVarDef {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bound: None,
            constraints: Vec::new(),
            variance: Variance::Invariant,
        }
    }

    #[must_use]
    pub fn bound(mut self, bound: Hint) -> Self {
        self.bound = Some(bound);
        self
    }

    #[must_use]
    pub fn constraints(mut self, constraints: Vec<Hint>) -> Self {
        self.constraints = constraints;
        self
    }

    #[must_use]
    pub fn covariant(mut self) -> Self {
        self.variance = Variance::Covariant;
        self
    }

    #[must_use]
    pub fn contravariant(mut self) -> Self {
        self.variance = Variance::Contravariant;
        self
    }

    /// Declares the type variable.
    #[must_use]
    pub fn build(self) -> Hint {
        Hint::new(HintKind::TypeVar(self))
    }
}

/// A `typing.ForwardRef` object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardRefHint {
    pub name: String,
    /// Module the name is resolved against, overriding the decorated callable's module.
    pub module: Option<String>,
}

/// A `typing.NewType` declaration.
#[derive(Debug, Clone)]
pub struct NewTypeDef {
    pub name: String,
    pub module: String,
    pub supertype: Hint,
}

/// What a subscripted hint was subscripted from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasOrigin {
    /// `typing.List[int]`.
    Form(SpecialForm),
    /// `list[int]`, `collections.abc.Sequence[int]`, `MyGeneric[int]`.
    Class(ClassRef),
}

/// A subscripted hint.
#[derive(Debug, Clone)]
pub struct GenericAlias {
    pub origin: AliasOrigin,
    pub args: Vec<Hint>,
}

/// The shape of a hint.
#[derive(Debug, Clone)]
pub enum HintKind {
    /// A class used directly: `int`, `MyClass`.
    Class(ClassRef),
    /// The `None` constant, shorthand for `NoneType`.
    None,
    /// A stringified annotation: `"MyClass"`.
    Str(String),
    /// An unsubscripted special form: `typing.Any`, `typing.List`.
    Form(SpecialForm),
    /// A subscripted hint.
    Alias(GenericAlias),
    /// A PEP 604 union: `int | str`.
    UnionType(Vec<Hint>),
    TypeVar(TypeVarDef),
    ParamSpec(String),
    TypeVarTuple(String),
    ForwardRef(ForwardRefHint),
    NewType(NewTypeDef),
    /// A plain value: literal arguments, `...`, or something that is not a hint at all.
    Value(Object),
    /// `Annotated` metadata checked at runtime.
    Validator(Validator),
    /// The bracketed parameter list of `Callable[[int, str], bool]`.
    ParamList(Vec<Hint>),
    /// An object implementing [`HintProtocol`].
    Extension(Arc<dyn HintProtocol>),
}

#[derive(Debug)]
struct HintNode {
    id: HintId,
    kind: HintKind,
}

/// A shared, immutable hint.
#[derive(Clone)]
pub struct Hint(Arc<HintNode>);

impl Hint {
    /// Creates a new hint with a fresh identity.
    #[must_use]
    pub fn new(kind: HintKind) -> Self {
        Self(Arc::new(HintNode {
            id: NEXT_HINT_ID.fetch_add(1, Ordering::Relaxed),
            kind,
        }))
    }

    /// The canonical hint of a class.
    #[must_use]
    pub fn class(class: &ClassRef) -> Self {
        if let Some(hint) = CLASS_HINTS
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&class.id())
        {
            return hint.clone();
        }
        let mut cache = CLASS_HINTS.write().unwrap_or_else(PoisonError::into_inner);
        cache
            .entry(class.id())
            .or_insert_with(|| Self::new(HintKind::Class(class.clone())))
            .clone()
    }

    /// The canonical hint of a special form.
    #[must_use]
    pub fn special(form: SpecialForm) -> Self {
        if let Some(hint) = FORM_HINTS.read().unwrap_or_else(PoisonError::into_inner).get(&form) {
            return hint.clone();
        }
        let mut cache = FORM_HINTS.write().unwrap_or_else(PoisonError::into_inner);
        cache
            .entry(form)
            .or_insert_with(|| Self::new(HintKind::Form(form)))
            .clone()
    }

    /// `typing.<form>`.
    #[must_use]
    pub fn form(form: TypingForm) -> Self {
        Self::special(SpecialForm::new(form))
    }

    /// A subscription of `origin` by `args`.
    #[must_use]
    pub fn alias(origin: AliasOrigin, args: Vec<Self>) -> Self {
        Self::new(HintKind::Alias(GenericAlias { origin, args }))
    }

    /// Subscripts an unsubscripted form or class: `List` becomes `List[args]`.
    ///
    /// Returns `None` for hints that cannot be subscripted.
    #[must_use]
    pub fn subscript(&self, args: Vec<Self>) -> Option<Self> {
        match self.kind() {
            HintKind::Form(form) => Some(Self::alias(AliasOrigin::Form(*form), args)),
            HintKind::Class(class) => Some(Self::alias(AliasOrigin::Class(class.clone()), args)),
            _ => None,
        }
    }

    /// A stringified annotation.
    #[must_use]
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(HintKind::Str(name.into()))
    }

    /// A value hint (literal member, metadata or non-hint).
    #[must_use]
    pub fn value(value: impl Into<Object>) -> Self {
        Self::new(HintKind::Value(value.into()))
    }

    #[must_use]
    pub fn id(&self) -> HintId {
        self.0.id
    }

    #[must_use]
    pub fn kind(&self) -> &HintKind {
        &self.0.kind
    }

    /// True when both handles are the same hint object.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    #[must_use]
    pub fn as_class(&self) -> Option<&ClassRef> {
        match self.kind() {
            HintKind::Class(class) => Some(class),
            _ => None,
        }
    }

    /// The form of an unsubscripted special form.
    #[must_use]
    pub fn form_kind(&self) -> Option<TypingForm> {
        match self.kind() {
            HintKind::Form(form) => Some(form.form),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_alias(&self) -> Option<&GenericAlias> {
        match self.kind() {
            HintKind::Alias(alias) => Some(alias),
            _ => None,
        }
    }

    /// The form a subscripted hint was subscripted from, e.g. `List` for `typing.List[int]`.
    #[must_use]
    pub fn subscripted_form(&self) -> Option<TypingForm> {
        match self.kind() {
            HintKind::Alias(GenericAlias {
                origin: AliasOrigin::Form(form),
                ..
            }) => Some(form.form),
            _ => None,
        }
    }

    /// Either the bare form or the form it was subscripted from.
    #[must_use]
    pub fn any_form(&self) -> Option<TypingForm> {
        self.form_kind().or_else(|| self.subscripted_form())
    }

    #[must_use]
    pub fn is_subscripted(&self) -> bool {
        matches!(self.kind(), HintKind::Alias(_))
    }

    /// Subscription arguments, union members or callable parameters.
    #[must_use]
    pub fn args(&self) -> &[Self] {
        match self.kind() {
            HintKind::Alias(alias) => &alias.args,
            HintKind::UnionType(members) | HintKind::ParamList(members) => members,
            _ => &[],
        }
    }

    /// The runtime class behind a subscripted hint: `list` for both `list[int]` and `typing.List[int]`.
    #[must_use]
    pub fn origin_class(&self) -> Option<ClassRef> {
        match self.kind() {
            HintKind::Alias(GenericAlias {
                origin: AliasOrigin::Class(class),
                ..
            }) => Some(class.clone()),
            HintKind::Alias(GenericAlias {
                origin: AliasOrigin::Form(form),
                ..
            }) => form.form.origin_class(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_type_var(&self) -> bool {
        matches!(
            self.kind(),
            HintKind::TypeVar(_) | HintKind::ParamSpec(_) | HintKind::TypeVarTuple(_)
        )
    }

    /// True for a union, in either spelling.
    #[must_use]
    pub fn is_union(&self) -> bool {
        matches!(self.kind(), HintKind::UnionType(_)) || self.subscripted_form() == Some(TypingForm::Union)
    }

    /// Appends every type variable reachable from this hint, without duplicates.
    pub fn collect_type_vars(&self, out: &mut Vec<Self>) {
        if self.is_type_var() {
            if !out.iter().any(|t| Self::ptr_eq(t, self)) {
                out.push(self.clone());
            }
            return;
        }
        for arg in self.args() {
            arg.collect_type_vars(out);
        }
    }

    /// Python `repr()` of the hint.
    #[must_use]
    pub fn repr(&self) -> String {
        match self.kind() {
            HintKind::Class(class) if *class == builtins().none_type => "None".to_owned(),
            HintKind::Class(class) => class.type_repr(),
            HintKind::None => "None".to_owned(),
            HintKind::Str(name) => Object::str(name.as_str()).repr(),
            HintKind::Form(form) => form.repr(),
            HintKind::Alias(alias) => {
                let origin = match &alias.origin {
                    AliasOrigin::Form(form) => form.repr(),
                    AliasOrigin::Class(class) => class.type_repr(),
                };
                if alias.args.is_empty() {
                    format!("{origin}[()]")
                } else {
                    format!("{origin}[{}]", join_reprs(&alias.args, ", "))
                }
            }
            HintKind::UnionType(members) => join_reprs(members, " | "),
            HintKind::TypeVar(def) => {
                let prefix = match def.variance {
                    Variance::Invariant => '~',
                    Variance::Covariant => '+',
                    Variance::Contravariant => '-',
                };
                format!("{prefix}{}", def.name)
            }
            HintKind::ParamSpec(name) => format!("~{name}"),
            HintKind::TypeVarTuple(name) => name.clone(),
            HintKind::ForwardRef(fwd) => match &fwd.module {
                Some(module) => format!("ForwardRef('{}', module='{module}')", fwd.name),
                None => format!("ForwardRef('{}')", fwd.name),
            },
            HintKind::NewType(def) => format!("{}.{}", def.module, def.name),
            HintKind::Value(Object::Ellipsis) => "...".to_owned(),
            HintKind::Value(value) => value.repr(),
            HintKind::Validator(validator) => validator.repr(),
            HintKind::ParamList(params) => format!("[{}]", join_reprs(params, ", ")),
            HintKind::Extension(ext) => ext.repr(),
        }
    }
}

fn join_reprs(hints: &[Hint], sep: &str) -> String {
    hints.iter().map(Hint::repr).collect::<Vec<_>>().join(sep)
}

impl PartialEq for Hint {
    /// Structural equality. Type variables, new types, validators and extension
    /// objects only equal themselves.
    fn eq(&self, other: &Self) -> bool {
        if Self::ptr_eq(self, other) {
            return true;
        }
        match (self.kind(), other.kind()) {
            (HintKind::Class(a), HintKind::Class(b)) => a == b,
            (HintKind::None, HintKind::None) => true,
            (HintKind::Str(a), HintKind::Str(b)) => a == b,
            (HintKind::Form(a), HintKind::Form(b)) => a == b,
            (HintKind::Alias(a), HintKind::Alias(b)) => a.origin == b.origin && a.args == b.args,
            (HintKind::UnionType(a), HintKind::UnionType(b)) | (HintKind::ParamList(a), HintKind::ParamList(b)) => {
                a == b
            }
            (HintKind::ForwardRef(a), HintKind::ForwardRef(b)) => a == b,
            (HintKind::Value(a), HintKind::Value(b)) => a == b,
            (HintKind::Validator(a), HintKind::Validator(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Hint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

impl fmt::Display for Hint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

impl From<&ClassRef> for Hint {
    fn from(class: &ClassRef) -> Self {
        Self::class(class)
    }
}
