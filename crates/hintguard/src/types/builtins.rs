//! The builtin and standard-library classes every hint ultimately bottoms out in.
//!
//! Built once on first use. `collections.abc` classes get their one-trick-pony
//! subclass hooks and the usual virtual-subclass registrations, so
//! `isinstance([], Sequence)` and `isinstance(len, Callable)` hold.

use std::sync::LazyLock;

use ahash::AHashMap;

use crate::{
    object::Object,
    types::class::{ClassBuilder, ClassFlags, ClassRef},
};

const OBJECT_METHODS: &[&str] = &["__eq__", "__hash__", "__repr__", "__str__"];
const INT_METHODS: &[&str] = &[
    "__abs__", "__add__", "__bool__", "__float__", "__index__", "__int__", "__lt__", "__round__",
];
const FLOAT_METHODS: &[&str] = &["__abs__", "__add__", "__bool__", "__float__", "__int__", "__lt__", "__round__"];
const COMPLEX_METHODS: &[&str] = &["__abs__", "__add__", "__bool__", "__complex__"];
const IMMUTABLE_SEQUENCE_METHODS: &[&str] = &["__add__", "__contains__", "__getitem__", "__iter__", "__len__", "__lt__"];
const MUTABLE_SEQUENCE_METHODS: &[&str] = &[
    "__add__",
    "__contains__",
    "__getitem__",
    "__iter__",
    "__len__",
    "__reversed__",
    "__setitem__",
];
const MAPPING_METHODS: &[&str] = &[
    "__contains__",
    "__getitem__",
    "__iter__",
    "__len__",
    "__reversed__",
    "__setitem__",
];
const SET_METHODS: &[&str] = &["__contains__", "__iter__", "__len__"];
const CALLABLE_METHODS: &[&str] = &["__call__"];
const ITERATOR_METHODS: &[&str] = &["__iter__", "__next__"];

/// The process-wide catalog of builtin classes.
#[derive(Debug)]
pub struct BuiltinClasses {
    pub object: ClassRef,
    pub type_: ClassRef,
    pub none_type: ClassRef,
    pub ellipsis: ClassRef,
    pub int: ClassRef,
    pub bool_: ClassRef,
    pub float: ClassRef,
    pub complex: ClassRef,
    pub str: ClassRef,
    pub bytes: ClassRef,
    pub list: ClassRef,
    pub tuple: ClassRef,
    pub dict: ClassRef,
    pub set: ClassRef,
    pub frozenset: ClassRef,
    pub function: ClassRef,
    pub builtin_method: ClassRef,
    pub iterator: ClassRef,
    pub module: ClassRef,

    pub deque: ClassRef,
    pub defaultdict: ClassRef,
    pub ordered_dict: ClassRef,
    pub counter: ClassRef,
    pub chain_map: ClassRef,

    pub container: ClassRef,
    pub hashable: ClassRef,
    pub iterable: ClassRef,
    pub iterator_abc: ClassRef,
    pub reversible: ClassRef,
    pub generator: ClassRef,
    pub sized: ClassRef,
    pub callable: ClassRef,
    pub collection: ClassRef,
    pub sequence: ClassRef,
    pub mutable_sequence: ClassRef,
    pub byte_string: ClassRef,
    pub abstract_set: ClassRef,
    pub mutable_set: ClassRef,
    pub mapping: ClassRef,
    pub mutable_mapping: ClassRef,
    pub mapping_view: ClassRef,
    pub keys_view: ClassRef,
    pub items_view: ClassRef,
    pub values_view: ClassRef,
    pub awaitable: ClassRef,
    pub coroutine: ClassRef,
    pub async_iterable: ClassRef,
    pub async_iterator: ClassRef,
    pub async_generator: ClassRef,

    pub generic: ClassRef,
    pub protocol: ClassRef,
    pub enum_base: ClassRef,

    /// Classes reachable by bare name from the `builtins` module.
    by_name: AHashMap<String, ClassRef>,
}

static BUILTINS: LazyLock<BuiltinClasses> = LazyLock::new(BuiltinClasses::build);

/// Returns the builtin class catalog.
#[must_use]
pub fn builtins() -> &'static BuiltinClasses {
    &BUILTINS
}

impl BuiltinClasses {
    /// Looks up a builtin class by its bare name, e.g. `"int"`.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&ClassRef> {
        self.by_name.get(name)
    }

    /// True for classes the code generator may name inline instead of through the scope.
    #[must_use]
    pub fn is_inlineable(&self, class: &ClassRef) -> bool {
        self.by_name.get(class.name()).is_some_and(|c| c == class)
    }

    fn build() -> Self {
        let object = new_class("object", "builtins", &[])
            .root()
            .methods(OBJECT_METHODS)
            .finish();
        let plain = |name: &str, module: &str, bases: &[&ClassRef], methods: &[&'static str]| {
            let bases = if bases.is_empty() { vec![&object] } else { bases.to_vec() };
            new_class(name, module, &bases).methods(methods).finish()
        };
        let unhashable = |name: &str, module: &str, bases: &[&ClassRef], methods: &[&'static str]| {
            let bases = if bases.is_empty() { vec![&object] } else { bases.to_vec() };
            new_class(name, module, &bases)
                .methods(methods)
                .builder
                .attr("__hash__", Object::None)
                .build()
                .expect("builtin class hierarchy is consistent")
        };
        let abc = |name: &str, bases: &[&ClassRef], hook: &'static [&'static str]| {
            let bases = if bases.is_empty() { vec![&object] } else { bases.to_vec() };
            let mut class = new_class(name, "collections.abc", &bases);
            class.builder = class
                .builder
                .flags(ClassFlags {
                    abc: true,
                    ..ClassFlags::default()
                })
                .subclass_hook(hook);
            class.finish()
        };

        let type_ = plain("type", "builtins", &[], CALLABLE_METHODS);
        let none_type = plain("NoneType", "builtins", &[], &["__bool__"]);
        let ellipsis = plain("ellipsis", "builtins", &[], &[]);
        let int = plain("int", "builtins", &[], INT_METHODS);
        let bool_ = plain("bool", "builtins", &[&int], &[]);
        let float = plain("float", "builtins", &[], FLOAT_METHODS);
        let complex = plain("complex", "builtins", &[], COMPLEX_METHODS);
        let str = plain("str", "builtins", &[], IMMUTABLE_SEQUENCE_METHODS);
        let bytes = plain("bytes", "builtins", &[], IMMUTABLE_SEQUENCE_METHODS);
        let tuple = plain("tuple", "builtins", &[], IMMUTABLE_SEQUENCE_METHODS);
        let frozenset = plain("frozenset", "builtins", &[], SET_METHODS);
        let list = unhashable("list", "builtins", &[], MUTABLE_SEQUENCE_METHODS);
        let dict = unhashable("dict", "builtins", &[], MAPPING_METHODS);
        let set = unhashable("set", "builtins", &[], SET_METHODS);
        let function = plain("function", "builtins", &[], &["__call__", "__get__"]);
        let builtin_method = plain("builtin_function_or_method", "builtins", &[], CALLABLE_METHODS);
        let iterator = plain("iterator", "builtins", &[], ITERATOR_METHODS);
        let module = plain("module", "builtins", &[], &[]);

        let container = abc("Container", &[], &["__contains__"]);
        let hashable = abc("Hashable", &[], &["__hash__"]);
        let iterable = abc("Iterable", &[], &["__iter__"]);
        let sized = abc("Sized", &[], &["__len__"]);
        let callable = abc("Callable", &[], CALLABLE_METHODS);
        let awaitable = abc("Awaitable", &[], &["__await__"]);
        let async_iterable = abc("AsyncIterable", &[], &["__aiter__"]);
        let iterator_abc = abc("Iterator", &[&iterable], ITERATOR_METHODS);
        let reversible = abc("Reversible", &[&iterable], &["__reversed__", "__iter__"]);
        let generator = abc("Generator", &[&iterator_abc], &["__iter__", "__next__", "send", "throw", "close"]);
        let collection = abc(
            "Collection",
            &[&sized, &iterable, &container],
            &["__len__", "__iter__", "__contains__"],
        );
        let sequence = abc("Sequence", &[&reversible, &collection], &[]);
        let mutable_sequence = abc("MutableSequence", &[&sequence], &[]);
        let byte_string = abc("ByteString", &[&sequence], &[]);
        let abstract_set = abc("Set", &[&collection], &[]);
        let mutable_set = abc("MutableSet", &[&abstract_set], &[]);
        let mapping = abc("Mapping", &[&collection], &[]);
        let mutable_mapping = abc("MutableMapping", &[&mapping], &[]);
        let mapping_view = abc("MappingView", &[&sized], &[]);
        let keys_view = abc("KeysView", &[&mapping_view, &abstract_set], &[]);
        let items_view = abc("ItemsView", &[&mapping_view, &abstract_set], &[]);
        let values_view = abc("ValuesView", &[&mapping_view, &collection], &[]);
        let coroutine = abc("Coroutine", &[&awaitable], &["send", "throw", "close", "__await__"]);
        let async_iterator = abc("AsyncIterator", &[&async_iterable], &["__aiter__", "__anext__"]);
        let async_generator = abc(
            "AsyncGenerator",
            &[&async_iterator],
            &["__aiter__", "__anext__", "asend", "athrow", "aclose"],
        );

        let deque = unhashable("deque", "collections", &[], MUTABLE_SEQUENCE_METHODS);
        let defaultdict = plain("defaultdict", "collections", &[&dict], &[]);
        let ordered_dict = plain("OrderedDict", "collections", &[&dict], &[]);
        let counter = plain("Counter", "collections", &[&dict], &[]);
        let chain_map = unhashable("ChainMap", "collections", &[&mutable_mapping], MAPPING_METHODS);

        let generic = plain("Generic", "typing", &[], &[]);
        let mut protocol = new_class("Protocol", "typing", &[&generic]);
        protocol.builder = protocol.builder.flags(ClassFlags {
            protocol: true,
            ..ClassFlags::default()
        });
        let protocol = protocol.finish();
        let enum_base = plain("Enum", "enum", &[], &[]);

        sequence.register(&tuple);
        sequence.register(&str);
        mutable_sequence.register(&list);
        mutable_sequence.register(&deque);
        byte_string.register(&bytes);
        abstract_set.register(&frozenset);
        mutable_set.register(&set);
        mutable_mapping.register(&dict);

        let by_name = [
            &object, &type_, &int, &bool_, &float, &complex, &str, &bytes, &list, &tuple, &dict, &set, &frozenset,
        ]
        .into_iter()
        .map(|c| (c.name().to_owned(), c.clone()))
        .collect();

        Self {
            object,
            type_,
            none_type,
            ellipsis,
            int,
            bool_,
            float,
            complex,
            str,
            bytes,
            list,
            tuple,
            dict,
            set,
            frozenset,
            function,
            builtin_method,
            iterator,
            module,
            deque,
            defaultdict,
            ordered_dict,
            counter,
            chain_map,
            container,
            hashable,
            iterable,
            iterator_abc,
            reversible,
            generator,
            sized,
            callable,
            collection,
            sequence,
            mutable_sequence,
            byte_string,
            abstract_set,
            mutable_set,
            mapping,
            mutable_mapping,
            mapping_view,
            keys_view,
            items_view,
            values_view,
            awaitable,
            coroutine,
            async_iterable,
            async_iterator,
            async_generator,
            generic,
            protocol,
            enum_base,
            by_name,
        }
    }
}

/// Builder wrapper that never consults the (still initializing) builtin catalog.
struct NewClass {
    builder: ClassBuilder,
}

fn new_class(name: &str, module: &str, bases: &[&ClassRef]) -> NewClass {
    let mut builder = ClassBuilder::new(name).module(module);
    for base in bases {
        builder = builder.base(base);
    }
    NewClass { builder }
}

impl NewClass {
    fn root(mut self) -> Self {
        self.builder = self.builder.root();
        self
    }

    fn methods(mut self, names: &[&'static str]) -> Self {
        for &name in names {
            self.builder = self.builder.method(name);
        }
        self
    }

    fn finish(self) -> ClassRef {
        self.builder.build().expect("builtin class hierarchy is consistent")
    }
}
