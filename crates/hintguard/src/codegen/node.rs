//! The generated predicate tree and its evaluation.

use std::sync::Arc;

use crate::{
    codegen::scope::{PithName, ScopeKey},
    error::ForwardRefError,
    forward::ForwardRef,
    object::Object,
    types::{self, ClassRef},
    validator::Validator,
};

/// A class operand of an `isinstance`/`issubclass` test.
#[derive(Debug, Clone)]
pub enum ClassExpr {
    /// An always-available builtin, spelled by name.
    Inline(ClassRef),
    /// Any other class, read from the scope.
    Bound { key: ScopeKey, class: ClassRef },
}

impl ClassExpr {
    #[must_use]
    pub fn class(&self) -> &ClassRef {
        match self {
            Self::Inline(class) | Self::Bound { class, .. } => class,
        }
    }
}

/// A forward reference proxy bound in the scope.
#[derive(Debug, Clone)]
pub struct ForwardExpr {
    pub key: ScopeKey,
    pub proxy: Arc<ForwardRef>,
}

/// One literal member.
#[derive(Debug, Clone)]
pub struct LiteralExpr {
    pub value: Object,
    /// Set for members with no source spelling (enum members).
    pub key: Option<ScopeKey>,
}

impl LiteralExpr {
    /// `is` for singletons and enum members, `isinstance` plus `==` otherwise.
    ///
    /// Subclass instances of the literal's type match; `bool` never matches an
    /// `int` literal.
    fn matches(&self, pith: &Object) -> bool {
        match &self.value {
            Object::None | Object::Bool(_) | Object::Instance(_) => pith.is_same(&self.value),
            value => {
                !matches!(pith, Object::Bool(_))
                    && types::is_instance(pith, &value.class())
                    && pith.py_eq(value)
            }
        }
    }
}

/// A bound validator.
#[derive(Debug, Clone)]
pub struct ValidatorExpr {
    pub key: ScopeKey,
    pub validator: Validator,
}

/// The shape of one check.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Always true.
    Pass,
    /// Always false.
    Fail,
    IsInstance(Vec<ClassExpr>),
    /// The pith is a class and a subclass of one of these.
    IsSubclass(Vec<ClassExpr>),
    ForwardInstance(ForwardExpr),
    ForwardSubclass(ForwardExpr),
    /// Disjunction, in declared order.
    Any(Vec<CheckNode>),
    /// Conjunction, short-circuiting left to right.
    All(Vec<CheckNode>),
    /// Origin check, then one item at `random % len` (or every item).
    Sequence {
        origin: Vec<ClassExpr>,
        item: Box<CheckNode>,
        exhaustive: bool,
    },
    /// Origin check, then the first item (or every item).
    Reiterable {
        origin: Vec<ClassExpr>,
        item: Box<CheckNode>,
        exhaustive: bool,
    },
    /// Origin check, then the first key and value (or every pair).
    Mapping {
        origin: Vec<ClassExpr>,
        key: Option<Box<CheckNode>>,
        value: Option<Box<CheckNode>>,
        exhaustive: bool,
    },
    /// Origin check, length check, then each position that is not ignorable.
    TupleFixed {
        origin: Vec<ClassExpr>,
        len: usize,
        items: Vec<(usize, CheckNode)>,
    },
    Literal(Vec<LiteralExpr>),
    /// The wrapped check, then each validator.
    Validators {
        child: Box<CheckNode>,
        validators: Vec<ValidatorExpr>,
    },
    /// A field of a generic instance; a missing attribute passes.
    Attr { name: String, child: Box<CheckNode> },
    /// A dict holding every required key.
    TypedDict {
        origin: Vec<ClassExpr>,
        required: Vec<String>,
    },
}

/// Call-time state shared by every check of one wrapper call.
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    /// Drawn once per call; selects the sampled index of every sequence.
    pub random: u32,
}

/// A check of the value named `pith` against the hint rendered as `hint`.
#[derive(Debug, Clone)]
pub struct CheckNode {
    pub pith: PithName,
    pub hint: String,
    pub kind: NodeKind,
}

impl CheckNode {
    #[must_use]
    pub fn new(pith: PithName, hint: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            pith,
            hint: hint.into(),
            kind,
        }
    }

    #[must_use]
    pub fn is_pass(&self) -> bool {
        matches!(self.kind, NodeKind::Pass)
    }

    /// Evaluates the check. Errors only come from unresolvable forward references.
    pub fn check(&self, pith: &Object, frame: &Frame) -> Result<bool, ForwardRefError> {
        Ok(match &self.kind {
            NodeKind::Pass => true,
            NodeKind::Fail => false,
            NodeKind::IsInstance(classes) => is_instance(pith, classes),
            NodeKind::IsSubclass(classes) => match pith {
                Object::Type(sub) => classes.iter().any(|c| types::is_subclass(sub, c.class())),
                _ => false,
            },
            NodeKind::ForwardInstance(fwd) => fwd.proxy.is_instance(pith)?,
            NodeKind::ForwardSubclass(fwd) => fwd.proxy.is_subclass(pith)?,
            NodeKind::Any(members) => {
                for member in members {
                    if member.check(pith, frame)? {
                        return Ok(true);
                    }
                }
                false
            }
            NodeKind::All(parts) => {
                for part in parts {
                    if !part.check(pith, frame)? {
                        return Ok(false);
                    }
                }
                true
            }
            NodeKind::Sequence {
                origin,
                item,
                exhaustive,
            } => {
                if !is_instance(pith, origin) {
                    return Ok(false);
                }
                if *exhaustive {
                    return all_items(pith, item, frame);
                }
                match pith.len() {
                    Some(len) if len > 0 => match pith.item_at(sample_index(frame.random, len)) {
                        Some(value) => item.check(&value, frame)?,
                        None => true,
                    },
                    _ => true,
                }
            }
            NodeKind::Reiterable {
                origin,
                item,
                exhaustive,
            } => {
                if !is_instance(pith, origin) {
                    return Ok(false);
                }
                if *exhaustive {
                    return all_items(pith, item, frame);
                }
                match pith.first_item() {
                    Some(value) => item.check(&value, frame)?,
                    None => true,
                }
            }
            NodeKind::Mapping {
                origin,
                key,
                value,
                exhaustive,
            } => {
                if !is_instance(pith, origin) {
                    return Ok(false);
                }
                let pairs = pith.pairs().unwrap_or_default();
                let sampled = if *exhaustive { pairs } else { &pairs[..pairs.len().min(1)] };
                for (k, v) in sampled {
                    if let Some(key) = key
                        && !key.check(k, frame)?
                    {
                        return Ok(false);
                    }
                    if let Some(value) = value
                        && !value.check(v, frame)?
                    {
                        return Ok(false);
                    }
                }
                true
            }
            NodeKind::TupleFixed { origin, len, items } => {
                if !is_instance(pith, origin) || pith.len() != Some(*len) {
                    return Ok(false);
                }
                for (index, item) in items {
                    if let Some(value) = pith.item_at(*index)
                        && !item.check(&value, frame)?
                    {
                        return Ok(false);
                    }
                }
                true
            }
            NodeKind::Literal(values) => values.iter().any(|lit| lit.matches(pith)),
            NodeKind::Validators { child, validators } => {
                child.check(pith, frame)? && validators.iter().all(|v| v.validator.check(pith))
            }
            NodeKind::Attr { name, child } => match pith.get_attr(name) {
                Some(value) => child.check(&value, frame)?,
                None => true,
            },
            NodeKind::TypedDict { origin, required } => {
                is_instance(pith, origin) && required.iter().all(|key| pith.contains_key(key))
            }
        })
    }

    /// Every scope key this check reads, in render order.
    #[must_use]
    pub fn scope_keys(&self) -> Vec<&ScopeKey> {
        let mut keys = Vec::new();
        self.collect_keys(&mut keys);
        keys
    }

    fn collect_keys<'a>(&'a self, out: &mut Vec<&'a ScopeKey>) {
        let class_keys = |classes: &'a [ClassExpr], out: &mut Vec<&'a ScopeKey>| {
            out.extend(classes.iter().filter_map(|c| match c {
                ClassExpr::Bound { key, .. } => Some(key),
                ClassExpr::Inline(_) => None,
            }));
        };
        match &self.kind {
            NodeKind::Pass | NodeKind::Fail => {}
            NodeKind::IsInstance(classes) | NodeKind::IsSubclass(classes) => class_keys(classes, out),
            NodeKind::ForwardInstance(fwd) | NodeKind::ForwardSubclass(fwd) => out.push(&fwd.key),
            NodeKind::Any(nodes) | NodeKind::All(nodes) => nodes.iter().for_each(|n| n.collect_keys(out)),
            NodeKind::Sequence { origin, item, .. } | NodeKind::Reiterable { origin, item, .. } => {
                class_keys(origin, out);
                item.collect_keys(out);
            }
            NodeKind::Mapping { origin, key, value, .. } => {
                class_keys(origin, out);
                key.iter().chain(value.iter()).for_each(|n| n.collect_keys(out));
            }
            NodeKind::TupleFixed { origin, items, .. } => {
                class_keys(origin, out);
                items.iter().for_each(|(_, n)| n.collect_keys(out));
            }
            NodeKind::Literal(values) => out.extend(values.iter().filter_map(|v| v.key.as_ref())),
            NodeKind::Validators { child, validators } => {
                child.collect_keys(out);
                out.extend(validators.iter().map(|v| &v.key));
            }
            NodeKind::Attr { child, .. } => child.collect_keys(out),
            NodeKind::TypedDict { origin, .. } => class_keys(origin, out),
        }
    }
}

pub(crate) fn is_instance(pith: &Object, classes: &[ClassExpr]) -> bool {
    classes.iter().any(|c| types::is_instance(pith, c.class()))
}

/// The sampled index of a container of `len` items.
#[must_use]
pub fn sample_index(random: u32, len: usize) -> usize {
    random as usize % len
}

fn all_items(pith: &Object, item: &CheckNode, frame: &Frame) -> Result<bool, ForwardRefError> {
    for value in pith.items() {
        if !item.check(&value, frame)? {
            return Ok(false);
        }
    }
    Ok(true)
}
