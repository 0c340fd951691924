//! Forward references: hints naming a class that may not exist yet.
//!
//! A [`ForwardRef`] is created at decoration time and resolved on first use at
//! call time. Resolution runs through an explicit state machine:
//!
//! ```text
//! Unresolved -> Resolving -> Resolved(class)
//!                         -> Ignored          (defining scope is gone)
//!                         -> Unresolved       (error; retried next call)
//! ```
//!
//! Only successful outcomes are cached, so defining the missing class or
//! registering the missing module later fixes the wrapper.

use std::{
    fmt,
    sync::{PoisonError, RwLock, Weak},
};

use crate::{
    error::ForwardRefError,
    hint::{Hint, HintKind},
    namespace::{LocalScope, modules},
    object::Object,
    reduce::ReduceContext,
    types::{self, ClassRef, builtins},
};

/// Resolution progress of a [`ForwardRef`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionState {
    Unresolved,
    /// A lookup is in flight on some thread.
    Resolving,
    Resolved(ClassRef),
    /// Every strategy failed because the enclosing scope no longer exists; matches anything.
    Ignored,
}

/// A lazily resolved class reference.
pub struct ForwardRef {
    name: String,
    scope_module: Option<String>,
    /// Enclosing classes at decoration time, innermost last.
    cls_stack: Vec<ClassRef>,
    local: Option<Weak<LocalScope>>,
    state: RwLock<ResolutionState>,
}

/// What one lookup found.
enum Lookup {
    Found(Object),
    Missing,
    /// The local scope was the only hope and it is gone.
    ScopeGone,
}

impl ForwardRef {
    /// A reference to `name`, resolved against the declaring scope in `ctx`.
    #[must_use]
    pub fn new(name: impl Into<String>, ctx: &ReduceContext) -> Self {
        Self {
            name: name.into(),
            scope_module: ctx.scope_module().map(str::to_owned),
            cls_stack: ctx.cls_stack().to_vec(),
            local: ctx.local().cloned(),
            state: RwLock::new(ResolutionState::Unresolved),
        }
    }

    /// Builds the proxy for a string or `ForwardRef` hint; an explicit module overrides the context's.
    #[must_use]
    pub fn from_hint(hint: &Hint, ctx: &ReduceContext) -> Option<Self> {
        match hint.kind() {
            HintKind::Str(name) => Some(Self::new(name.clone(), ctx)),
            HintKind::ForwardRef(fwd) => {
                let mut proxy = Self::new(fwd.name.clone(), ctx);
                if let Some(module) = &fwd.module {
                    proxy.scope_module = Some(module.clone());
                }
                Some(proxy)
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn state(&self) -> ResolutionState {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// `isinstance(obj, <referent>)`, resolving on first use.
    pub fn is_instance(&self, obj: &Object) -> Result<bool, ForwardRefError> {
        Ok(match self.resolve()? {
            Some(class) => types::is_instance(obj, &class),
            None => true,
        })
    }

    /// `issubclass(obj, <referent>)` for a class object; false for non-classes.
    pub fn is_subclass(&self, obj: &Object) -> Result<bool, ForwardRefError> {
        let Object::Type(sub) = obj else {
            return Ok(false);
        };
        Ok(match self.resolve()? {
            Some(class) => types::is_subclass(sub, &class),
            None => true,
        })
    }

    /// The referent class, or `None` once ignored.
    ///
    /// Threads that find the proxy unresolved may each run the lookup. A
    /// failed lookup never replaces an outcome another thread published.
    pub fn resolve(&self) -> Result<Option<ClassRef>, ForwardRefError> {
        if let Some(done) = settled(&self.state.read().unwrap_or_else(PoisonError::into_inner)) {
            return Ok(done);
        }
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(done) = settled(&state) {
                return Ok(done);
            }
            *state = ResolutionState::Resolving;
        }

        let outcome = self.lookup().and_then(|found| match found {
            Lookup::Found(Object::Type(class)) => Ok(Some(class)),
            Lookup::Found(other) => Err(ForwardRefError::NotAClass {
                name: self.name.clone(),
                repr: other.repr(),
            }),
            Lookup::ScopeGone => Ok(None),
            Lookup::Missing => Err(ForwardRefError::NameNotFound {
                name: self.name.clone(),
                scope: self.describe_scope(),
            }),
        });

        match &outcome {
            Ok(Some(class)) => {
                tracing::debug!(name = %self.name, class = %class, "forward reference resolved");
                self.set_state(ResolutionState::Resolved(class.clone()));
            }
            Ok(None) => {
                tracing::debug!(name = %self.name, "forward reference ignored: defining scope is gone");
                self.set_state(ResolutionState::Ignored);
            }
            Err(err) => {
                tracing::debug!(name = %self.name, error = %err, "forward reference unresolved");
                let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
                if *state == ResolutionState::Resolving {
                    *state = ResolutionState::Unresolved;
                }
            }
        }
        outcome
    }

    fn set_state(&self, state: ResolutionState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn lookup(&self) -> Result<Lookup, ForwardRefError> {
        if let Some((module_name, attr)) = self.name.rsplit_once('.') {
            if let Some(module) = modules().import_module(module_name) {
                return Ok(module.get(attr).map_or(Lookup::Missing, Lookup::Found));
            }
            // `Outer.Inner`: a class-nested name rather than a module path.
            let mut parts = self.name.split('.');
            let head = parts.next().unwrap_or_default();
            return match self.lookup_unqualified(head) {
                Lookup::Found(mut value) => {
                    for part in parts {
                        match value.get_attr(part) {
                            Some(next) => value = next,
                            None => return Ok(Lookup::Missing),
                        }
                    }
                    Ok(Lookup::Found(value))
                }
                Lookup::ScopeGone => Ok(Lookup::ScopeGone),
                Lookup::Missing => Err(ForwardRefError::ModuleNotFound {
                    name: self.name.clone(),
                    module: module_name.to_owned(),
                }),
            };
        }
        Ok(self.lookup_unqualified(&self.name))
    }

    /// Class stack, module globals, local scope, builtins.
    fn lookup_unqualified(&self, name: &str) -> Lookup {
        for class in self.cls_stack.iter().rev() {
            if class.name() == name {
                return Lookup::Found(Object::Type(class.clone()));
            }
            if let Some(attr) = class.attrs().get(name) {
                return Lookup::Found(attr.clone());
            }
        }
        if let Some(value) = self
            .scope_module
            .as_deref()
            .and_then(|m| modules().import_module(m))
            .and_then(|module| module.get(name))
        {
            return Lookup::Found(value);
        }
        let mut scope_gone = false;
        if let Some(local) = &self.local {
            match local.upgrade() {
                Some(scope) => {
                    if let Some(value) = scope.get(name) {
                        return Lookup::Found(value);
                    }
                }
                None => scope_gone = true,
            }
        }
        if let Some(class) = builtins().by_name(name) {
            return Lookup::Found(Object::Type(class.clone()));
        }
        if scope_gone { Lookup::ScopeGone } else { Lookup::Missing }
    }

    fn describe_scope(&self) -> String {
        match &self.scope_module {
            Some(module) => format!("module '{module}'"),
            None => "builtins".to_owned(),
        }
    }
}

impl fmt::Debug for ForwardRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardRef")
            .field("name", &self.name)
            .field("scope_module", &self.scope_module)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// The published outcome of a finished resolution, if any.
fn settled(state: &ResolutionState) -> Option<Option<ClassRef>> {
    match state {
        ResolutionState::Resolved(class) => Some(Some(class.clone())),
        ResolutionState::Ignored => Some(None),
        ResolutionState::Unresolved | ResolutionState::Resolving => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::conf::CheckConf;

    #[test]
    fn builtin_names_resolve_without_a_module() {
        let proxy = ForwardRef::new("int", &ReduceContext::new(&CheckConf::new()));
        assert_eq!(proxy.is_instance(&Object::Int(1)), Ok(true));
        assert_eq!(proxy.state(), ResolutionState::Resolved(builtins().int.clone()));
    }

    #[test]
    fn dead_local_scope_is_ignored() {
        let scope = LocalScope::new();
        let ctx = ReduceContext::new(&CheckConf::new()).local_scope(Arc::downgrade(&scope));
        let proxy = ForwardRef::new("Gone", &ctx);
        drop(scope);
        assert_eq!(proxy.is_instance(&Object::Int(1)), Ok(true));
        assert_eq!(proxy.state(), ResolutionState::Ignored);
    }

    #[test]
    fn dead_local_scope_ignores_nested_names() {
        let scope = LocalScope::new();
        let ctx = ReduceContext::new(&CheckConf::new()).local_scope(Arc::downgrade(&scope));
        let proxy = ForwardRef::new("Gone.Inner", &ctx);
        drop(scope);
        assert_eq!(proxy.is_instance(&Object::Int(1)), Ok(true));
        assert_eq!(proxy.state(), ResolutionState::Ignored);
    }
}
