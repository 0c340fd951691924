//! Class objects and the subclass relation.
//!
//! A [`Class`] is immutable once built, apart from its ABC virtual-subclass
//! registry. [`ClassRef`] compares by identity, like class objects do.

use std::{
    fmt,
    hash::{Hash, Hasher},
    ops::Deref,
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::{
    hint::{Hint, TypingForm},
    object::Object,
    types::builtins,
};

/// Maximum length of the MRO of any class.
pub const MAX_MRO_LENGTH: usize = 2600;

/// Maximum depth of single-path inheritance chains.
pub const MAX_INHERITANCE_DEPTH: usize = 1000;

/// Names never treated as protocol members.
const NON_PROTOCOL_MEMBERS: &[&str] = &[
    "__init__",
    "__module__",
    "__qualname__",
    "__doc__",
    "__slots__",
    "__dict__",
    "__weakref__",
    "__annotations__",
    "__parameters__",
    "__orig_bases__",
    "__class_getitem__",
    "__init_subclass__",
    "__subclasshook__",
    "__abstractmethods__",
];

static NEXT_CLASS_ID: AtomicU64 = AtomicU64::new(1);

/// Error building a class.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassError {
    #[error("Cannot create a consistent method resolution order (MRO) for bases {bases}")]
    Mro { bases: String },
    #[error("inheritance chain too deep (maximum depth 1000)")]
    TooDeep,
}

/// Boolean properties of a class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassFlags {
    /// `class P(Protocol)`: structural checks apply.
    pub protocol: bool,
    /// Decorated with `@runtime_checkable`.
    pub runtime_checkable: bool,
    /// A `TypedDict` subclass.
    pub typed_dict: bool,
    /// `TypedDict` totality (`total=False` makes keys optional).
    pub total: bool,
    /// An `enum.Enum` subclass; its instances are valid literal values.
    pub enumeration: bool,
    /// An abstract base class that accepts virtual subclass registration.
    pub abc: bool,
    /// Decorated with `@no_type_check`.
    pub no_type_check: bool,
}

/// A class object.
pub struct Class {
    id: u64,
    name: String,
    module: String,
    qualname: String,
    bases: Vec<ClassRef>,
    /// MRO without the class itself.
    ancestors: Vec<ClassRef>,
    attrs: IndexMap<String, Object>,
    annotations: IndexMap<String, Hint>,
    type_params: Vec<Hint>,
    orig_bases: Vec<Hint>,
    flags: ClassFlags,
    /// Attribute names whose presence makes any class a subclass (`__subclasshook__`).
    subclass_hook: &'static [&'static str],
    virtual_subclasses: RwLock<Vec<ClassRef>>,
    root: bool,
}

impl Class {
    /// Process-unique identifier.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    #[must_use]
    pub fn qualname(&self) -> &str {
        &self.qualname
    }

    #[must_use]
    pub fn bases(&self) -> &[ClassRef] {
        &self.bases
    }

    /// The method resolution order, excluding the class itself.
    #[must_use]
    pub fn ancestors(&self) -> &[ClassRef] {
        &self.ancestors
    }

    #[must_use]
    pub fn attrs(&self) -> &IndexMap<String, Object> {
        &self.attrs
    }

    /// Field annotations declared directly on this class.
    #[must_use]
    pub fn annotations(&self) -> &IndexMap<String, Hint> {
        &self.annotations
    }

    /// Type parameters (type variables) this class is generic over.
    #[must_use]
    pub fn type_params(&self) -> &[Hint] {
        &self.type_params
    }

    /// Subscripted bases as written, e.g. `Generic[T]` or `list[T]`.
    #[must_use]
    pub fn orig_bases(&self) -> &[Hint] {
        &self.orig_bases
    }

    #[must_use]
    pub fn flags(&self) -> ClassFlags {
        self.flags
    }

    /// True for the root `object` class.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.root
    }

    /// True when this class declares type parameters.
    #[must_use]
    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }

    /// True for a user protocol, false for the bare `typing.Protocol` class.
    #[must_use]
    pub fn is_user_protocol(&self) -> bool {
        self.flags.protocol && !(self.module == "typing" && self.name == "Protocol")
    }

    /// True for builtin classes, whose hint repr omits the module.
    #[must_use]
    pub fn is_builtin(&self) -> bool {
        self.module == "builtins"
    }

    /// Looks up a class attribute along the MRO.
    #[must_use]
    pub fn lookup_attr(&self, name: &str) -> Option<&Object> {
        self.attrs
            .get(name)
            .or_else(|| self.ancestors.iter().find_map(|c| c.attrs.get(name)))
    }

    /// Field annotations along the MRO; subclasses override bases.
    #[must_use]
    pub fn all_annotations(&self) -> IndexMap<String, Hint> {
        let mut merged = IndexMap::new();
        for class in self.ancestors.iter().rev() {
            for (name, hint) in &class.annotations {
                merged.insert(name.clone(), hint.clone());
            }
        }
        for (name, hint) in &self.annotations {
            merged.insert(name.clone(), hint.clone());
        }
        merged
    }

    /// Members a structural check requires, gathered from this protocol and its protocol bases.
    #[must_use]
    pub fn protocol_members(&self) -> Vec<String> {
        let mut members: Vec<String> = Vec::new();
        let lineage = std::iter::once(self).chain(self.ancestors.iter().map(Deref::deref));
        for class in lineage.filter(|c| c.is_user_protocol()) {
            for name in class.attrs.keys().chain(class.annotations.keys()) {
                if !NON_PROTOCOL_MEMBERS.contains(&name.as_str()) && !members.contains(name) {
                    members.push(name.clone());
                }
            }
        }
        members
    }

    /// The hint repr of this class: `int` for builtins, `module.Qualname` otherwise.
    #[must_use]
    pub fn type_repr(&self) -> String {
        if self.is_builtin() {
            self.qualname.clone()
        } else {
            format!("{}.{}", self.module, self.qualname)
        }
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class '{}'>", self.type_repr())
    }
}

/// A shared handle to a class, compared by identity.
#[derive(Clone)]
pub struct ClassRef(Arc<Class>);

impl ClassRef {
    /// Registers `sub` as a virtual subclass of this ABC and of every abstract ancestor.
    pub fn register(&self, sub: &Self) {
        let lineage = std::iter::once(self).chain(self.ancestors.iter());
        for abc in lineage.filter(|c| c.flags.abc) {
            let mut registry = abc.virtual_subclasses.write().unwrap_or_else(PoisonError::into_inner);
            if !registry.contains(sub) {
                registry.push(sub.clone());
            }
        }
    }

    /// Returns true if both handles name the same class.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl Deref for ClassRef {
    type Target = Class;

    fn deref(&self) -> &Class {
        &self.0
    }
}

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}

impl Eq for ClassRef {}

impl Hash for ClassRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class '{}'>", self.type_repr())
    }
}

/// Builds a [`Class`].
///
/// ```text
/// let point = ClassBuilder::new("Point").module("geometry").annotation("x", hints::int()).build()?;
/// ```
#[derive(Debug)]
pub struct ClassBuilder {
    name: String,
    module: String,
    qualname: Option<String>,
    bases: Vec<ClassRef>,
    attrs: IndexMap<String, Object>,
    annotations: IndexMap<String, Hint>,
    type_params: Vec<Hint>,
    orig_bases: Vec<Hint>,
    flags: ClassFlags,
    subclass_hook: &'static [&'static str],
    root: bool,
}

impl ClassBuilder {
    /// Starts a class named `name` in module `__main__`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module: "__main__".to_owned(),
            qualname: None,
            bases: Vec::new(),
            attrs: IndexMap::new(),
            annotations: IndexMap::new(),
            type_params: Vec::new(),
            orig_bases: Vec::new(),
            flags: ClassFlags::default(),
            subclass_hook: &[],
            root: false,
        }
    }

    #[must_use]
    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    /// Sets the qualified name, e.g. `Outer.Inner`; defaults to the name.
    #[must_use]
    pub fn qualname(mut self, qualname: impl Into<String>) -> Self {
        self.qualname = Some(qualname.into());
        self
    }

    #[must_use]
    pub fn base(mut self, base: &ClassRef) -> Self {
        self.bases.push(base.clone());
        self
    }

    /// Adds a subscripted base such as `Generic[T]`, `Protocol[T]` or `list[T]`.
    ///
    /// The runtime origin of the base becomes a real base; `Generic[...]` and
    /// `Protocol[...]` also declare the class's type parameters.
    #[must_use]
    pub fn orig_base(mut self, base: Hint) -> Self {
        match base.subscripted_form() {
            Some(TypingForm::Generic) => {
                self.bases.push(builtins().generic.clone());
                self.type_params.extend(base.args().iter().cloned());
            }
            Some(TypingForm::Protocol) => {
                self.flags.protocol = true;
                self.bases.push(builtins().protocol.clone());
                self.type_params.extend(base.args().iter().cloned());
            }
            _ => {
                if let Some(origin) = base.origin_class() {
                    self.bases.push(origin);
                }
            }
        }
        self.orig_bases.push(base);
        self
    }

    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: Object) -> Self {
        self.attrs.insert(name.into(), value);
        self
    }

    /// Declares a method slot; structural checks only need its presence.
    #[must_use]
    pub fn method(self, name: &'static str) -> Self {
        self.attr(name, Object::BuiltinMethod(name))
    }

    #[must_use]
    pub fn annotation(mut self, name: impl Into<String>, hint: Hint) -> Self {
        self.annotations.insert(name.into(), hint);
        self
    }

    /// Makes this class a protocol (`class P(Protocol)`).
    #[must_use]
    pub fn protocol(mut self) -> Self {
        self.flags.protocol = true;
        self.bases.push(builtins().protocol.clone());
        self
    }

    /// Applies `@runtime_checkable`.
    #[must_use]
    pub fn runtime_checkable(mut self) -> Self {
        self.flags.runtime_checkable = true;
        self
    }

    /// Makes this class a `TypedDict` with the given totality.
    #[must_use]
    pub fn typed_dict(mut self, total: bool) -> Self {
        self.flags.typed_dict = true;
        self.flags.total = total;
        self.bases.push(builtins().dict.clone());
        self
    }

    /// Makes this class an `enum.Enum` subclass.
    #[must_use]
    pub fn enumeration(mut self) -> Self {
        self.flags.enumeration = true;
        self.bases.push(builtins().enum_base.clone());
        self
    }

    /// Makes this class an ABC accepting virtual subclasses.
    #[must_use]
    pub fn abstract_base(mut self) -> Self {
        self.flags.abc = true;
        self
    }

    /// Applies `@no_type_check` to every method of the class.
    #[must_use]
    pub fn no_type_check(mut self) -> Self {
        self.flags.no_type_check = true;
        self
    }

    #[must_use]
    pub(crate) fn subclass_hook(mut self, members: &'static [&'static str]) -> Self {
        self.subclass_hook = members;
        self
    }

    #[must_use]
    pub(crate) fn flags(mut self, flags: ClassFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub(crate) fn root(mut self) -> Self {
        self.root = true;
        self
    }

    /// Computes the MRO and freezes the class.
    pub fn build(mut self) -> Result<ClassRef, ClassError> {
        if self.bases.is_empty() && !self.root {
            self.bases.push(builtins().object.clone());
        }
        // A class inheriting type variables through subscripted bases is generic over them.
        if self.type_params.is_empty() {
            for base in &self.orig_bases {
                base.collect_type_vars(&mut self.type_params);
            }
        }
        let ancestors = compute_c3_mro(&self.bases)?;
        let qualname = self.qualname.unwrap_or_else(|| self.name.clone());
        Ok(ClassRef(Arc::new(Class {
            id: NEXT_CLASS_ID.fetch_add(1, Ordering::Relaxed),
            name: self.name,
            module: self.module,
            qualname,
            bases: self.bases,
            ancestors,
            attrs: self.attrs,
            annotations: self.annotations,
            type_params: self.type_params,
            orig_bases: self.orig_bases,
            flags: self.flags,
            subclass_hook: self.subclass_hook,
            virtual_subclasses: RwLock::new(Vec::new()),
            root: self.root,
        })))
    }
}

/// C3 linearization of a new class with the given bases, excluding the class itself.
fn compute_c3_mro(bases: &[ClassRef]) -> Result<Vec<ClassRef>, ClassError> {
    let mut linearizations: Vec<Vec<ClassRef>> = Vec::with_capacity(bases.len() + 1);
    for base in bases {
        if base.ancestors.len() >= MAX_INHERITANCE_DEPTH {
            return Err(ClassError::TooDeep);
        }
        let mut lin = Vec::with_capacity(base.ancestors.len() + 1);
        lin.push(base.clone());
        lin.extend(base.ancestors.iter().cloned());
        linearizations.push(lin);
    }
    linearizations.push(bases.to_vec());

    let mut result: Vec<ClassRef> = Vec::new();
    loop {
        linearizations.retain(|l| !l.is_empty());
        if linearizations.is_empty() {
            break;
        }

        // A good head does not appear in the tail of any list.
        let found = linearizations
            .iter()
            .map(|lin| &lin[0])
            .find(|candidate| !linearizations.iter().any(|other| other[1..].contains(*candidate)))
            .cloned();

        let Some(next) = found else {
            let names: Vec<&str> = bases.iter().map(|c| c.name()).collect();
            return Err(ClassError::Mro {
                bases: names.join(", "),
            });
        };
        for lin in &mut linearizations {
            if lin.first() == Some(&next) {
                lin.remove(0);
            }
        }
        result.push(next);
        if result.len() > MAX_MRO_LENGTH {
            return Err(ClassError::TooDeep);
        }
    }
    Ok(result)
}

/// `issubclass(sub, cls)`.
#[must_use]
pub fn is_subclass(sub: &ClassRef, cls: &ClassRef) -> bool {
    if sub == cls || cls.root || sub.ancestors.contains(cls) {
        return true;
    }
    if !cls.subclass_hook.is_empty() && cls.subclass_hook.iter().all(|name| has_live_attr(sub, name)) {
        return true;
    }
    if cls.is_user_protocol() {
        let members = cls.protocol_members();
        if !members.is_empty() && members.iter().all(|name| has_live_attr(sub, name)) {
            return true;
        }
    }
    if cls.flags.abc {
        let registry = cls.virtual_subclasses.read().unwrap_or_else(PoisonError::into_inner);
        return registry.iter().any(|v| v == sub || sub.ancestors.contains(v));
    }
    false
}

/// `isinstance(obj, cls)`, including instance-level protocol members.
#[must_use]
pub fn is_instance(obj: &Object, cls: &ClassRef) -> bool {
    if cls.root {
        return true;
    }
    let obj_class = obj.class();
    if is_subclass(&obj_class, cls) {
        return true;
    }
    if cls.is_user_protocol() {
        let members = cls.protocol_members();
        return !members.is_empty() && members.iter().all(|name| obj.has_attr(name));
    }
    false
}

/// `isinstance(obj, (a, b, ...))`.
#[must_use]
pub fn is_instance_any(obj: &Object, classes: &[ClassRef]) -> bool {
    classes.iter().any(|cls| is_instance(obj, cls))
}

/// True when `name` resolves along the MRO to something other than `None`
/// (`__hash__ = None` marks a class unhashable).
fn has_live_attr(class: &ClassRef, name: &str) -> bool {
    class.lookup_attr(name).is_some_and(|value| !matches!(value, Object::None))
}

/// Bases of a class that are generic aliases worth checking, e.g. `list[T]` in `class Bag(list[T])`.
pub(crate) fn pseudo_superclasses(class: &ClassRef) -> SmallVec<[Hint; 2]> {
    class
        .orig_bases
        .iter()
        .filter(|base| base.is_subscripted() && !matches!(base.subscripted_form(), Some(TypingForm::Generic | TypingForm::Protocol)))
        .cloned()
        .collect()
}
