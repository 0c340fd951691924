//! The per-wrapper scope: every runtime object a generated check closes over.

use std::{borrow::Borrow, fmt, sync::Arc};

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::{forward::ForwardRef, object::Object, types::ClassRef, validator::Validator};

/// Prefix shared by every generated identifier.
pub const NAME_PREFIX: &str = "__hg_";

/// Name of the per-call random integer in generated source.
pub const RANDOM_NAME: &str = "__hg_random";

/// The variable a check reads its value from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PithName(String);

impl PithName {
    /// The root pith of a parameter is the parameter itself.
    #[must_use]
    pub fn param(name: &str) -> Self {
        Self(name.to_owned())
    }

    /// The root pith of a return value.
    #[must_use]
    pub fn ret() -> Self {
        Self(format!("{NAME_PREFIX}return"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PithName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A generated name bound in a [`Scope`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeKey(String);

impl ScopeKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ScopeKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A runtime object bound under a scope key.
#[derive(Debug, Clone)]
pub enum ScopeEntry {
    Class(ClassRef),
    ForwardRef(Arc<ForwardRef>),
    Validator(Validator),
    /// A literal value that has no source spelling (enum members).
    Literal(Object),
    /// A parameter default, referenced by the wrapper signature.
    Default(Object),
}

/// Scope of one generated wrapper. Immutable once the wrapper is synthesized.
#[derive(Debug, Default)]
pub struct Scope {
    entries: IndexMap<ScopeKey, ScopeEntry>,
    classes: AHashMap<u64, ScopeKey>,
    forward_refs: AHashMap<(String, Option<String>), ScopeKey>,
    next_pith: usize,
    next_key: usize,
}

impl Scope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh local pith name.
    pub fn next_pith(&mut self) -> PithName {
        let pith = PithName(format!("{NAME_PREFIX}pith_{}", self.next_pith));
        self.next_pith += 1;
        pith
    }

    fn insert(&mut self, kind: &str, entry: ScopeEntry) -> ScopeKey {
        let key = ScopeKey(format!("{NAME_PREFIX}{kind}_{}", self.next_key));
        self.next_key += 1;
        self.entries.insert(key.clone(), entry);
        key
    }

    /// Binds a class, reusing the key of an earlier binding of the same class.
    pub fn bind_class(&mut self, class: &ClassRef) -> ScopeKey {
        if let Some(key) = self.classes.get(&class.id()) {
            return key.clone();
        }
        let key = self.insert("type", ScopeEntry::Class(class.clone()));
        self.classes.insert(class.id(), key.clone());
        key
    }

    /// Binds a forward reference proxy, one per referenced name and module.
    pub fn bind_forward_ref(&mut self, proxy: ForwardRef, module: Option<&str>) -> (ScopeKey, Arc<ForwardRef>) {
        let dedup = (proxy.name().to_owned(), module.map(str::to_owned));
        if let Some(key) = self.forward_refs.get(&dedup)
            && let Some(ScopeEntry::ForwardRef(existing)) = self.entries.get(key)
        {
            return (key.clone(), Arc::clone(existing));
        }
        let proxy = Arc::new(proxy);
        let key = self.insert("fwd", ScopeEntry::ForwardRef(Arc::clone(&proxy)));
        self.forward_refs.insert(dedup, key.clone());
        (key, proxy)
    }

    pub fn bind_validator(&mut self, validator: &Validator) -> ScopeKey {
        self.insert("validator", ScopeEntry::Validator(validator.clone()))
    }

    pub fn bind_literal(&mut self, value: &Object) -> ScopeKey {
        self.insert("literal", ScopeEntry::Literal(value.clone()))
    }

    /// Binds the default of parameter `param` under a name derived from it.
    pub fn bind_default(&mut self, param: &str, value: &Object) -> ScopeKey {
        let key = ScopeKey(format!("{NAME_PREFIX}default_{param}"));
        self.entries.insert(key.clone(), ScopeEntry::Default(value.clone()));
        key
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ScopeEntry> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &ScopeKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&ScopeKey, &ScopeEntry)> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
