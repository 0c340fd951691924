//! Module and local namespaces forward references resolve against.
//!
//! Modules live in a process-wide [`ModuleRegistry`]; `import_module` of an
//! unregistered name fails the way an import would. A [`LocalScope`] stands in
//! for the locals of an enclosing function: references hold it weakly, so once
//! the defining scope is dropped they can tell "scope gone" apart from "typo".

use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::{object::Object, types::ClassRef};

/// A named module with mutable globals.
#[derive(Debug)]
pub struct Module {
    name: String,
    globals: RwLock<IndexMap<String, Object>>,
    no_type_check: bool,
}

impl Module {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            globals: RwLock::new(IndexMap::new()),
            no_type_check: false,
        }
    }

    /// Marks every callable in this module as exempt from checking.
    #[must_use]
    pub fn no_type_check(mut self) -> Self {
        self.no_type_check = true;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_no_type_check(&self) -> bool {
        self.no_type_check
    }

    /// Binds a global name.
    pub fn set(&self, name: impl Into<String>, value: impl Into<Object>) {
        self.globals
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), value.into());
    }

    /// Binds a class under its own name.
    pub fn define_class(&self, class: &ClassRef) {
        self.set(class.name(), Object::Type(class.clone()));
    }

    /// Looks up a global name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Object> {
        self.globals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Unbinds a global name, returning its old value.
    pub fn remove(&self, name: &str) -> Option<Object> {
        self.globals
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .shift_remove(name)
    }
}

/// Registry of importable modules.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: RwLock<AHashMap<String, Arc<Module>>>,
}

static MODULES: LazyLock<ModuleRegistry> = LazyLock::new(ModuleRegistry::default);

/// Returns the process-wide module registry.
#[must_use]
pub fn modules() -> &'static ModuleRegistry {
    &MODULES
}

impl ModuleRegistry {
    /// Registers (or replaces) a module and returns the shared handle.
    pub fn register(&self, module: Module) -> Arc<Module> {
        let module = Arc::new(module);
        self.modules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(module.name.clone(), Arc::clone(&module));
        module
    }

    /// `import module`: the registered module, if any.
    #[must_use]
    pub fn import_module(&self, name: &str) -> Option<Arc<Module>> {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Unregisters a module.
    pub fn remove(&self, name: &str) -> Option<Arc<Module>> {
        self.modules.write().unwrap_or_else(PoisonError::into_inner).remove(name)
    }
}

/// Locals of an enclosing function, captured weakly by decorated inner callables.
#[derive(Debug, Default)]
pub struct LocalScope {
    locals: RwLock<IndexMap<String, Object>>,
}

impl LocalScope {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, name: impl Into<String>, value: impl Into<Object>) {
        self.locals
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Object> {
        self.locals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}
