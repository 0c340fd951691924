//! Special forms: the named attributes of `typing` and friends.

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::types::{ClassRef, builtins};

/// Module a special form is spelled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum FormModule {
    #[strum(serialize = "typing")]
    Typing,
    #[strum(serialize = "typing_extensions")]
    TypingExtensions,
    #[strum(serialize = "dataclasses")]
    Dataclasses,
}

/// A named special form such as `typing.List` or `typing.Optional`.
///
/// Display gives the attribute name (`List`), matching how the form is spelled
/// after its module prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumIter)]
pub enum TypingForm {
    Any,
    Union,
    Optional,
    Literal,
    Annotated,
    ClassVar,
    Final,
    InitVar,
    Generic,
    Protocol,
    Tuple,
    List,
    Dict,
    Set,
    FrozenSet,
    Type,
    Callable,
    Iterable,
    Iterator,
    Reversible,
    Container,
    Collection,
    Sequence,
    MutableSequence,
    ByteString,
    AbstractSet,
    MutableSet,
    Mapping,
    MutableMapping,
    Sized,
    Hashable,
    Generator,
    Awaitable,
    Coroutine,
    AsyncIterable,
    AsyncIterator,
    AsyncGenerator,
    MappingView,
    KeysView,
    ItemsView,
    ValuesView,
    Deque,
    DefaultDict,
    OrderedDict,
    Counter,
    ChainMap,
    NoReturn,
    Never,
    #[strum(serialize = "Self")]
    SelfType,
    LiteralString,
    TypeGuard,
    TypeIs,
    Unpack,
    Required,
    NotRequired,
    ReadOnly,
    Concatenate,
    TypeAlias,
}

impl TypingForm {
    /// The runtime class a subscription of this form checks against, e.g. `list` for `List`.
    #[must_use]
    pub fn origin_class(self) -> Option<ClassRef> {
        let b = builtins();
        let class = match self {
            Self::Tuple => &b.tuple,
            Self::List => &b.list,
            Self::Dict => &b.dict,
            Self::Set => &b.set,
            Self::FrozenSet => &b.frozenset,
            Self::Type => &b.type_,
            Self::Callable => &b.callable,
            Self::Iterable => &b.iterable,
            Self::Iterator => &b.iterator_abc,
            Self::Reversible => &b.reversible,
            Self::Container => &b.container,
            Self::Collection => &b.collection,
            Self::Sequence => &b.sequence,
            Self::MutableSequence => &b.mutable_sequence,
            Self::ByteString => &b.byte_string,
            Self::AbstractSet => &b.abstract_set,
            Self::MutableSet => &b.mutable_set,
            Self::Mapping => &b.mapping,
            Self::MutableMapping => &b.mutable_mapping,
            Self::Sized => &b.sized,
            Self::Hashable => &b.hashable,
            Self::Generator => &b.generator,
            Self::Awaitable => &b.awaitable,
            Self::Coroutine => &b.coroutine,
            Self::AsyncIterable => &b.async_iterable,
            Self::AsyncIterator => &b.async_iterator,
            Self::AsyncGenerator => &b.async_generator,
            Self::MappingView => &b.mapping_view,
            Self::KeysView => &b.keys_view,
            Self::ItemsView => &b.items_view,
            Self::ValuesView => &b.values_view,
            Self::Deque => &b.deque,
            Self::DefaultDict => &b.defaultdict,
            Self::OrderedDict => &b.ordered_dict,
            Self::Counter => &b.counter,
            Self::ChainMap => &b.chain_map,
            Self::Generic => &b.generic,
            Self::Protocol => &b.protocol,
            _ => return None,
        };
        Some(class.clone())
    }

    /// True for forms superseded by a subscriptable builtin or `collections.abc` class (PEP 585).
    #[must_use]
    pub fn is_deprecated_alias(self) -> bool {
        !matches!(self, Self::Generic | Self::Protocol) && self.origin_class().is_some()
    }

    /// Type qualifiers that only decorate the hint they wrap.
    #[must_use]
    pub fn is_qualifier(self) -> bool {
        matches!(
            self,
            Self::ClassVar | Self::Final | Self::InitVar | Self::Required | Self::NotRequired | Self::ReadOnly
        )
    }
}

/// A special form together with the module it was spelled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpecialForm {
    pub module: FormModule,
    pub form: TypingForm,
}

impl SpecialForm {
    /// The form as spelled from its home module (`typing`, or `dataclasses` for `InitVar`).
    #[must_use]
    pub fn new(form: TypingForm) -> Self {
        let module = match form {
            TypingForm::InitVar => FormModule::Dataclasses,
            _ => FormModule::Typing,
        };
        Self { module, form }
    }

    /// The form as spelled from `typing_extensions`.
    #[must_use]
    pub fn extension(form: TypingForm) -> Self {
        Self {
            module: FormModule::TypingExtensions,
            form,
        }
    }

    /// `typing.List`, `typing_extensions.Self`, ...
    #[must_use]
    pub fn repr(self) -> String {
        format!("{}.{}", self.module, self.form)
    }
}
