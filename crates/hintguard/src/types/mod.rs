//! Class objects, the builtin class catalog and the `isinstance`/`issubclass` relations.

mod builtins;
mod class;

pub use builtins::{BuiltinClasses, builtins};
pub(crate) use class::pseudo_superclasses;
pub use class::{
    Class, ClassBuilder, ClassError, ClassFlags, ClassRef, MAX_INHERITANCE_DEPTH, MAX_MRO_LENGTH, is_instance,
    is_instance_any, is_subclass,
};
