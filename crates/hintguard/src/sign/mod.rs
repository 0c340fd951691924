//! Signs: the closed catalog of hint kinds, and how each one is checked.
//!
//! A [`HintSign`] names what a hint *means* (a union, a fixed tuple, a sequence
//! of one item type) independent of how it was spelled. Every sign maps to
//! exactly one [`Strategy`]; the registry in [`registry`] maps spellings to
//! signs.

mod registry;

use strum::{Display, EnumIter, IntoStaticStr};

pub use registry::{SignRegistry, classify_by_origin_type, classify_by_repr_prefix, registry, sign_of};

/// The kind of a hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
pub enum HintSign {
    /// A plain class checked with `isinstance`.
    Isinstanceable,
    /// Matches anything; generates no check.
    Ignorable,
    Union,
    Optional,
    Literal,
    Annotated,
    /// A tuple hint before its shape is known.
    Tuple,
    /// `tuple[A, B]`, `tuple[()]`.
    TupleFixed,
    /// `tuple[A, ...]`.
    TupleVariadic,
    List,
    Sequence,
    MutableSequence,
    ByteString,
    Deque,
    Set,
    FrozenSet,
    AbstractSet,
    MutableSet,
    Collection,
    Container,
    Iterable,
    Reversible,
    KeysView,
    ValuesView,
    ItemsView,
    MappingView,
    Dict,
    Mapping,
    MutableMapping,
    DefaultDict,
    OrderedDict,
    ChainMap,
    Counter,
    /// `type[T]`.
    Type,
    Callable,
    Iterator,
    Generator,
    Awaitable,
    Coroutine,
    AsyncIterable,
    AsyncIterator,
    AsyncGenerator,
    Hashable,
    Sized,
    /// A subscripted user generic, or a class with subscripted builtin bases.
    Generic,
    Protocol,
    ForwardRef,
    TypedDict,
    NewType,
    TypeVar,
    NoReturn,
    Any,
    /// `ClassVar`, `Final`, `Required`, ... wrappers.
    Qualifier,
    #[strum(serialize = "Self")]
    SelfType,
    LiteralString,
    TypeGuard,
    Unpack,
}

/// The check emitted for a sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Emit {
    /// `True`.
    Pass,
    /// `False`: no value satisfies the hint.
    Fail,
    IsInstance,
    /// `isinstance(pith, type) and issubclass(pith, ...)`.
    IsSubclass,
    Union,
    Literal,
    /// Wrapped check conjoined with validators.
    Validators,
    /// Length check then one check per position.
    TupleFixed,
    /// Origin check then one item at a pseudo-random index.
    Sequence,
    /// Origin check then the first item.
    Reiterable,
    /// Origin check then the first key and value.
    Mapping,
    /// Origin check only; type arguments are ignored.
    OriginOnly,
    Generic,
    ForwardRef,
    TypedDict,
    /// Never reaches code generation: the reducer rewrites these away.
    Reduced,
}

/// How many child hints a sign takes from its subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    Zero,
    One,
    Two,
    Many,
}

/// Code generation and argument extraction strategy for a sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Strategy {
    pub emit: Emit,
    pub arity: Arity,
}

/// Derived sign sets the generator and reducer query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum SignCategory {
    /// Containers checked through one child hint.
    SingleArgContainer,
    /// Containers sampled by random index.
    Sequence,
    /// Containers sampled by first item.
    Reiterable,
    /// Containers sampled by first key and value.
    Mapping,
    Union,
    Tuple,
    /// Signs only valid as a return hint.
    ReturnOnly,
    /// Signs the reducer rewrites before classification completes.
    Reduced,
}

impl HintSign {
    /// The one strategy this sign is checked with.
    #[must_use]
    pub fn strategy(self) -> Strategy {
        use Arity::{Many, One, Two, Zero};
        let (emit, arity) = match self {
            Self::Isinstanceable => (Emit::IsInstance, Zero),
            Self::Ignorable => (Emit::Pass, Zero),
            Self::Union => (Emit::Union, Many),
            Self::Literal => (Emit::Literal, Many),
            Self::Annotated => (Emit::Validators, One),
            Self::TupleFixed => (Emit::TupleFixed, Many),
            Self::TupleVariadic
            | Self::List
            | Self::Sequence
            | Self::MutableSequence
            | Self::ByteString
            | Self::Deque => (Emit::Sequence, One),
            Self::Set
            | Self::FrozenSet
            | Self::AbstractSet
            | Self::MutableSet
            | Self::Collection
            | Self::Iterable
            | Self::Reversible
            | Self::KeysView
            | Self::ValuesView
            | Self::Counter => (Emit::Reiterable, One),
            Self::Dict
            | Self::Mapping
            | Self::MutableMapping
            | Self::DefaultDict
            | Self::OrderedDict
            | Self::ChainMap => (Emit::Mapping, Two),
            Self::Type => (Emit::IsSubclass, One),
            Self::Container
            | Self::ItemsView
            | Self::MappingView
            | Self::Callable
            | Self::Iterator
            | Self::Generator
            | Self::Awaitable
            | Self::Coroutine
            | Self::AsyncIterable
            | Self::AsyncIterator
            | Self::AsyncGenerator
            | Self::Hashable
            | Self::Sized => (Emit::OriginOnly, Many),
            Self::Generic => (Emit::Generic, Many),
            Self::ForwardRef => (Emit::ForwardRef, Zero),
            Self::TypedDict => (Emit::TypedDict, Zero),
            Self::NoReturn => (Emit::Fail, Zero),
            Self::Tuple
            | Self::Optional
            | Self::Protocol
            | Self::NewType
            | Self::TypeVar
            | Self::Any
            | Self::Qualifier
            | Self::SelfType
            | Self::LiteralString
            | Self::TypeGuard
            | Self::Unpack => (Emit::Reduced, Many),
        };
        Strategy { emit, arity }
    }

    /// True if this sign belongs to `category`.
    #[must_use]
    pub fn is_in(self, category: SignCategory) -> bool {
        registry().category(category).contains(&self)
    }
}
