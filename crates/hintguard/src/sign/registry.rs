//! The process-wide sign registry.
//!
//! Built in two phases: signs are a closed enum (phase one), then the lookup
//! tables are populated from the typing forms and the builtin classes, and the
//! category sets are derived from the sign strategies (phase two). Read-only
//! afterwards, so lookups never lock.

use std::sync::LazyLock;

use ahash::{AHashMap, AHashSet};
use strum::IntoEnumIterator;

use crate::{
    hint::{FormModule, Hint, HintKind, TypingForm},
    sign::{Emit, HintSign, SignCategory},
    types::{ClassRef, pseudo_superclasses},
};

/// Lookup tables from hint shape to sign.
#[derive(Debug)]
pub struct SignRegistry {
    /// Spellings valid with or without subscription: `typing.List`, `typing.Any`.
    args_0_or_more: AHashMap<String, HintSign>,
    /// Spellings only meaningful subscripted: `list[...]`, `typing.Literal[...]`.
    args_1_or_more: AHashMap<String, HintSign>,
    /// Runtime origin class id to sign.
    by_origin: AHashMap<u64, HintSign>,
    /// Spellings superseded by a builtin or `collections.abc` class.
    deprecated: AHashSet<String>,
    categories: AHashMap<SignCategory, AHashSet<HintSign>>,
}

static REGISTRY: LazyLock<SignRegistry> = LazyLock::new(SignRegistry::build);

/// Returns the sign registry.
#[must_use]
pub fn registry() -> &'static SignRegistry {
    &REGISTRY
}

/// Sign of a hint spelled `text`, looked up by the part before any `[`.
#[must_use]
pub fn classify_by_repr_prefix(text: &str) -> Option<HintSign> {
    registry().by_repr_prefix(text)
}

/// Sign of a subscripted hint whose runtime origin is `class`.
#[must_use]
pub fn classify_by_origin_type(class: &ClassRef) -> Option<HintSign> {
    registry().by_origin.get(&class.id()).copied()
}

/// Sign of a hint: kind override, then spelling, then origin class.
#[must_use]
pub fn sign_of(hint: &Hint) -> Option<HintSign> {
    sign_by_kind(hint)
        .or_else(|| classify_by_repr_prefix(&hint.repr()))
        .or_else(|| hint.origin_class().as_ref().and_then(classify_by_origin_type))
}

/// Signs determined by the kind of hint object alone.
fn sign_by_kind(hint: &Hint) -> Option<HintSign> {
    match hint.kind() {
        HintKind::Class(class) => Some(if class.is_root() {
            HintSign::Ignorable
        } else if class.flags().typed_dict {
            HintSign::TypedDict
        } else if !pseudo_superclasses(class).is_empty() {
            HintSign::Generic
        } else {
            HintSign::Isinstanceable
        }),
        HintKind::None => Some(HintSign::Isinstanceable),
        HintKind::Str(_) | HintKind::ForwardRef(_) => Some(HintSign::ForwardRef),
        HintKind::UnionType(_) => Some(HintSign::Union),
        HintKind::TypeVar(_) | HintKind::ParamSpec(_) | HintKind::TypeVarTuple(_) => Some(HintSign::TypeVar),
        HintKind::NewType(_) => Some(HintSign::NewType),
        HintKind::Form(_)
        | HintKind::Alias(_)
        | HintKind::Value(_)
        | HintKind::Validator(_)
        | HintKind::ParamList(_)
        | HintKind::Extension(_) => None,
    }
}

/// Sign of a typing form, or `None` for forms with no runtime check.
fn form_sign(form: TypingForm) -> Option<HintSign> {
    Some(match form {
        TypingForm::Any => HintSign::Any,
        TypingForm::Union => HintSign::Union,
        TypingForm::Optional => HintSign::Optional,
        TypingForm::Literal => HintSign::Literal,
        TypingForm::Annotated => HintSign::Annotated,
        TypingForm::ClassVar
        | TypingForm::Final
        | TypingForm::InitVar
        | TypingForm::Required
        | TypingForm::NotRequired
        | TypingForm::ReadOnly => HintSign::Qualifier,
        TypingForm::Generic => HintSign::Generic,
        TypingForm::Protocol => HintSign::Protocol,
        TypingForm::Tuple => HintSign::Tuple,
        TypingForm::List => HintSign::List,
        TypingForm::Dict => HintSign::Dict,
        TypingForm::Set => HintSign::Set,
        TypingForm::FrozenSet => HintSign::FrozenSet,
        TypingForm::Type => HintSign::Type,
        TypingForm::Callable => HintSign::Callable,
        TypingForm::Iterable => HintSign::Iterable,
        TypingForm::Iterator => HintSign::Iterator,
        TypingForm::Reversible => HintSign::Reversible,
        TypingForm::Container => HintSign::Container,
        TypingForm::Collection => HintSign::Collection,
        TypingForm::Sequence => HintSign::Sequence,
        TypingForm::MutableSequence => HintSign::MutableSequence,
        TypingForm::ByteString => HintSign::ByteString,
        TypingForm::AbstractSet => HintSign::AbstractSet,
        TypingForm::MutableSet => HintSign::MutableSet,
        TypingForm::Mapping => HintSign::Mapping,
        TypingForm::MutableMapping => HintSign::MutableMapping,
        TypingForm::Sized => HintSign::Sized,
        TypingForm::Hashable => HintSign::Hashable,
        TypingForm::Generator => HintSign::Generator,
        TypingForm::Awaitable => HintSign::Awaitable,
        TypingForm::Coroutine => HintSign::Coroutine,
        TypingForm::AsyncIterable => HintSign::AsyncIterable,
        TypingForm::AsyncIterator => HintSign::AsyncIterator,
        TypingForm::AsyncGenerator => HintSign::AsyncGenerator,
        TypingForm::MappingView => HintSign::MappingView,
        TypingForm::KeysView => HintSign::KeysView,
        TypingForm::ItemsView => HintSign::ItemsView,
        TypingForm::ValuesView => HintSign::ValuesView,
        TypingForm::Deque => HintSign::Deque,
        TypingForm::DefaultDict => HintSign::DefaultDict,
        TypingForm::OrderedDict => HintSign::OrderedDict,
        TypingForm::Counter => HintSign::Counter,
        TypingForm::ChainMap => HintSign::ChainMap,
        TypingForm::NoReturn | TypingForm::Never => HintSign::NoReturn,
        TypingForm::SelfType => HintSign::SelfType,
        TypingForm::LiteralString => HintSign::LiteralString,
        TypingForm::TypeGuard | TypingForm::TypeIs => HintSign::TypeGuard,
        TypingForm::Unpack => HintSign::Unpack,
        TypingForm::Concatenate | TypingForm::TypeAlias => return None,
    })
}

impl SignRegistry {
    fn build() -> Self {
        let mut args_0_or_more = AHashMap::new();
        let mut args_1_or_more = AHashMap::new();
        let mut by_origin = AHashMap::new();
        let mut deprecated = AHashSet::new();

        for form in TypingForm::iter() {
            let Some(sign) = form_sign(form) else { continue };
            let modules: &[FormModule] = if form == TypingForm::InitVar {
                &[FormModule::Dataclasses]
            } else {
                &[FormModule::Typing, FormModule::TypingExtensions]
            };
            for module in modules {
                let name = format!("{module}.{form}");
                if form.is_deprecated_alias() {
                    deprecated.insert(name.clone());
                }
                // Literal and Annotated are meaningless unsubscripted.
                if matches!(form, TypingForm::Literal | TypingForm::Annotated | TypingForm::InitVar) {
                    args_1_or_more.insert(name, sign);
                } else {
                    args_0_or_more.insert(name, sign);
                }
            }
            // PEP 585: the origin class itself is subscriptable.
            if form.is_deprecated_alias()
                && let Some(origin) = form.origin_class()
            {
                args_1_or_more.insert(origin.type_repr(), sign);
                by_origin.insert(origin.id(), sign);
            }
        }

        // Categories are derived from the strategies, never listed by hand.
        let mut categories: AHashMap<SignCategory, AHashSet<HintSign>> = AHashMap::new();
        for category in <SignCategory as IntoEnumIterator>::iter() {
            categories.insert(category, AHashSet::new());
        }
        let mut add = |category: SignCategory, sign: HintSign| {
            categories.entry(category).or_default().insert(sign);
        };
        for sign in HintSign::iter() {
            let emit = sign.strategy().emit;
            match emit {
                Emit::Sequence => {
                    add(SignCategory::Sequence, sign);
                    add(SignCategory::SingleArgContainer, sign);
                }
                Emit::Reiterable => {
                    add(SignCategory::Reiterable, sign);
                    add(SignCategory::SingleArgContainer, sign);
                }
                Emit::Mapping => add(SignCategory::Mapping, sign),
                Emit::Union => add(SignCategory::Union, sign),
                Emit::TupleFixed => add(SignCategory::Tuple, sign),
                Emit::Fail => add(SignCategory::ReturnOnly, sign),
                Emit::Reduced => add(SignCategory::Reduced, sign),
                _ => {}
            }
        }
        for sign in [HintSign::Tuple, HintSign::TupleVariadic] {
            add(SignCategory::Tuple, sign);
        }
        add(SignCategory::Union, HintSign::Optional);

        let registry = Self {
            args_0_or_more,
            args_1_or_more,
            by_origin,
            deprecated,
            categories,
        };
        tracing::trace!(
            args_0_or_more = registry.args_0_or_more.len(),
            args_1_or_more = registry.args_1_or_more.len(),
            origins = registry.by_origin.len(),
            "sign registry built"
        );
        registry
    }

    /// Looks up the spelling before any `[`: first the unsubscripted table, then,
    /// for subscripted spellings, the subscripted-only table.
    #[must_use]
    pub fn by_repr_prefix(&self, text: &str) -> Option<HintSign> {
        let (prefix, subscripted) = match text.split_once('[') {
            Some((prefix, _)) => (prefix, true),
            None => (text, false),
        };
        self.args_0_or_more.get(prefix).copied().or_else(|| {
            if subscripted {
                self.args_1_or_more.get(prefix).copied()
            } else {
                None
            }
        })
    }

    /// True for a deprecated spelling such as `typing.List`.
    #[must_use]
    pub fn is_deprecated(&self, text: &str) -> bool {
        let prefix = text.split_once('[').map_or(text, |(prefix, _)| prefix);
        self.deprecated.contains(prefix)
    }

    /// The signs in `category`.
    #[must_use]
    pub fn category(&self, category: SignCategory) -> &AHashSet<HintSign> {
        static EMPTY: LazyLock<AHashSet<HintSign>> = LazyLock::new(AHashSet::new);
        self.categories.get(&category).unwrap_or(&EMPTY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::builtins;

    #[test]
    fn subscripted_only_spellings_need_brackets() {
        assert_eq!(classify_by_repr_prefix("list[int]"), Some(HintSign::List));
        assert_eq!(classify_by_repr_prefix("list"), None);
        assert_eq!(classify_by_repr_prefix("typing.List"), Some(HintSign::List));
        assert_eq!(classify_by_repr_prefix("typing_extensions.Literal[1]"), Some(HintSign::Literal));
    }

    #[test]
    fn origin_table_covers_abcs() {
        assert_eq!(classify_by_origin_type(&builtins().sequence), Some(HintSign::Sequence));
        assert_eq!(classify_by_origin_type(&builtins().int), None);
    }

    #[test]
    fn categories_are_derived() {
        assert!(HintSign::List.is_in(SignCategory::Sequence));
        assert!(HintSign::Set.is_in(SignCategory::Reiterable));
        assert!(HintSign::Optional.is_in(SignCategory::Union));
        assert!(!HintSign::Dict.is_in(SignCategory::SingleArgContainer));
        assert!(HintSign::NoReturn.is_in(SignCategory::ReturnOnly));
        assert!(HintSign::Optional.is_in(SignCategory::Reduced));
    }

    #[test]
    fn deprecated_spellings_are_flagged() {
        let registry = registry();
        assert!(registry.is_deprecated("typing.List"));
        assert!(registry.is_deprecated("typing_extensions.Dict[str, int]"));
        assert!(!registry.is_deprecated("typing.Union[int, str]"));
        assert!(!registry.is_deprecated("list[int]"));
    }
}
