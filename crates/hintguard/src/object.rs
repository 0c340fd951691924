//! Runtime values checked against hints.
//!
//! [`Object`] is an owned, Python-shaped value: the "pith" every generated check
//! inspects. Containers own their items; class instances and callables are
//! shared through `Arc` so identity (`is`) survives cloning.

use std::{
    borrow::Cow,
    fmt::{self, Write},
    sync::Arc,
};

use indexmap::IndexMap;

use crate::{
    function::Callable,
    types::{ClassRef, builtins},
};

/// A runtime value.
#[derive(Debug, Clone)]
pub enum Object {
    /// Python's `Ellipsis` singleton (`...`).
    Ellipsis,
    /// Python's `None` singleton.
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Complex {
        re: f64,
        im: f64,
    },
    String(String),
    Bytes(Vec<u8>),
    List(Vec<Self>),
    Tuple(Vec<Self>),
    /// Insertion-ordered dictionary.
    Dict(DictPairs),
    Set(Vec<Self>),
    FrozenSet(Vec<Self>),
    /// `collections.deque`.
    Deque(Vec<Self>),
    /// A class object, e.g. the value `int` itself.
    Type(ClassRef),
    /// An instance of a user or library class.
    Instance(Arc<Instance>),
    /// A callable value (plain or checked).
    Function(Callable),
    /// A builtin method slot; only its presence matters.
    BuiltinMethod(&'static str),
    /// A single-pass iterator over the given items.
    Iterator(Vec<Self>),
    /// A module object, by name.
    Module(String),
}

impl Object {
    /// Creates a string object.
    #[must_use]
    pub fn str(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// Creates a dict from key/value pairs.
    #[must_use]
    pub fn dict(pairs: impl IntoIterator<Item = (Self, Self)>) -> Self {
        Self::Dict(DictPairs(pairs.into_iter().collect()))
    }

    /// Returns the runtime class of this value.
    #[must_use]
    pub fn class(&self) -> ClassRef {
        let b = builtins();
        match self {
            Self::Ellipsis => b.ellipsis.clone(),
            Self::None => b.none_type.clone(),
            Self::Bool(_) => b.bool_.clone(),
            Self::Int(_) => b.int.clone(),
            Self::Float(_) => b.float.clone(),
            Self::Complex { .. } => b.complex.clone(),
            Self::String(_) => b.str.clone(),
            Self::Bytes(_) => b.bytes.clone(),
            Self::List(_) => b.list.clone(),
            Self::Tuple(_) => b.tuple.clone(),
            Self::Dict(_) => b.dict.clone(),
            Self::Set(_) => b.set.clone(),
            Self::FrozenSet(_) => b.frozenset.clone(),
            Self::Deque(_) => b.deque.clone(),
            Self::Type(_) => b.type_.clone(),
            Self::Instance(inst) => inst.class.clone(),
            Self::Function(_) => b.function.clone(),
            Self::BuiltinMethod(_) => b.builtin_method.clone(),
            Self::Iterator(_) => b.iterator.clone(),
            Self::Module(_) => b.module.clone(),
        }
    }

    /// Name of the runtime class, as shown in violation messages.
    #[must_use]
    pub fn type_name(&self) -> String {
        self.class().qualname().to_owned()
    }

    /// `hasattr(obj, name)`: instance attributes first, then the class.
    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        match self {
            Self::Instance(inst) => inst.attrs.contains_key(name) || inst.class.lookup_attr(name).is_some(),
            Self::Type(class) => class.lookup_attr(name).is_some() || builtins().type_.lookup_attr(name).is_some(),
            _ => self.class().lookup_attr(name).is_some(),
        }
    }

    /// `getattr(obj, name, None)`, limited to data the object model carries.
    #[must_use]
    pub fn get_attr(&self, name: &str) -> Option<Self> {
        match self {
            Self::Instance(inst) => inst
                .attrs
                .get(name)
                .or_else(|| inst.class.lookup_attr(name))
                .cloned(),
            Self::Type(class) => class.lookup_attr(name).cloned(),
            Self::Complex { re, .. } if name == "real" => Some(Self::Float(*re)),
            Self::Complex { im, .. } if name == "imag" => Some(Self::Float(*im)),
            _ => self.class().lookup_attr(name).cloned(),
        }
    }

    /// The value a builtin-subclass instance wraps, or the object itself.
    fn data(&self) -> &Self {
        match self {
            Self::Instance(inst) => inst.payload.as_ref().map_or(self, Self::data),
            _ => self,
        }
    }

    /// `len(obj)` for sized values.
    #[must_use]
    pub fn len(&self) -> Option<usize> {
        match self.data() {
            Self::String(s) => Some(s.chars().count()),
            Self::Bytes(b) => Some(b.len()),
            Self::List(items)
            | Self::Tuple(items)
            | Self::Set(items)
            | Self::FrozenSet(items)
            | Self::Deque(items) => Some(items.len()),
            Self::Dict(pairs) => Some(pairs.len()),
            _ => None,
        }
    }

    /// True for a sized value of length zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// `obj[index]` for indexable sequences.
    #[must_use]
    pub fn item_at(&self, index: usize) -> Option<Cow<'_, Self>> {
        match self.data() {
            Self::List(items) | Self::Tuple(items) | Self::Deque(items) => items.get(index).map(Cow::Borrowed),
            Self::String(s) => s.chars().nth(index).map(|c| Cow::Owned(Self::String(c.to_string()))),
            Self::Bytes(b) => b.get(index).map(|byte| Cow::Owned(Self::Int(i64::from(*byte)))),
            _ => None,
        }
    }

    /// `next(iter(obj))` without consuming anything.
    #[must_use]
    pub fn first_item(&self) -> Option<Cow<'_, Self>> {
        match self.data() {
            Self::Dict(pairs) => pairs.0.first().map(|(k, _)| Cow::Borrowed(k)),
            Self::Set(items) | Self::FrozenSet(items) => items.first().map(Cow::Borrowed),
            _ => self.item_at(0),
        }
    }

    /// Every item `iter(obj)` would yield.
    #[must_use]
    pub fn items(&self) -> Vec<Cow<'_, Self>> {
        match self.data() {
            Self::List(items) | Self::Tuple(items) | Self::Set(items) | Self::FrozenSet(items) | Self::Deque(items) => {
                items.iter().map(Cow::Borrowed).collect()
            }
            Self::Dict(pairs) => pairs.0.iter().map(|(k, _)| Cow::Borrowed(k)).collect(),
            Self::String(s) => s.chars().map(|c| Cow::Owned(Self::String(c.to_string()))).collect(),
            Self::Bytes(b) => b.iter().map(|byte| Cow::Owned(Self::Int(i64::from(*byte)))).collect(),
            _ => Vec::new(),
        }
    }

    /// Key/value pairs of a mapping.
    #[must_use]
    pub fn pairs(&self) -> Option<&[(Self, Self)]> {
        match self.data() {
            Self::Dict(pairs) => Some(&pairs.0),
            _ => None,
        }
    }

    /// `key in obj` for mappings.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs()
            .is_some_and(|pairs| pairs.iter().any(|(k, _)| matches!(k, Self::String(s) if s == key)))
    }

    /// Python `is`: singletons compare by value, shared objects by pointer.
    #[must_use]
    pub fn is_same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) | (Self::Ellipsis, Self::Ellipsis) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Type(a), Self::Type(b)) => a == b,
            (Self::Instance(a), Self::Instance(b)) => Arc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => a.ptr_eq(b),
            (Self::BuiltinMethod(a), Self::BuiltinMethod(b)) => a == b,
            _ => false,
        }
    }

    /// Python `==`, including `1 == True == 1.0`.
    #[must_use]
    pub fn py_eq(&self, other: &Self) -> bool {
        let (this, other) = (self.data(), other.data());
        match this.numeric_eq(other) {
            Some(eq) => eq,
            None => match (this, other) {
                (Self::List(a), Self::List(b))
                | (Self::Tuple(a), Self::Tuple(b))
                | (Self::Deque(a), Self::Deque(b)) => {
                    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.py_eq(y))
                }
                (Self::Set(a) | Self::FrozenSet(a), Self::Set(b) | Self::FrozenSet(b)) => {
                    a.len() == b.len() && a.iter().all(|x| b.iter().any(|y| x.py_eq(y)))
                }
                (Self::Dict(a), Self::Dict(b)) => {
                    a.len() == b.len()
                        && a.0
                            .iter()
                            .all(|(k, v)| b.get(k).is_some_and(|other_v| v.py_eq(other_v)))
                }
                _ => this == other,
            },
        }
    }

    /// Numeric `==`, or `None` when neither side is a number.
    ///
    /// Integers compare exactly; floats match an integer only when they hold
    /// exactly that integral value.
    fn numeric_eq(&self, other: &Self) -> Option<bool> {
        let eq = match (self.as_int(), other.as_int()) {
            (Some(a), Some(b)) => a == b,
            (Some(i), None) => other.as_complex().is_some_and(|(re, im)| im == 0.0 && int_eq_float(i, re)),
            (None, Some(i)) => self.as_complex().is_some_and(|(re, im)| im == 0.0 && int_eq_float(i, re)),
            (None, None) => match (self.as_complex(), other.as_complex()) {
                (None, None) => return None,
                (a, b) => a.is_some() && a == b,
            },
        };
        Some(eq)
    }

    fn as_int(&self) -> Option<i64> {
        match self {
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Non-integral numbers as (real, imaginary).
    fn as_complex(&self) -> Option<(f64, f64)> {
        match self {
            Self::Float(f) => Some((*f, 0.0)),
            Self::Complex { re, im } => Some((*re, *im)),
            _ => None,
        }
    }

    /// Returns the Python `repr()` of this value.
    #[must_use]
    pub fn repr(&self) -> String {
        let mut s = String::new();
        self.repr_fmt(&mut s).expect("writing to a String cannot fail");
        s
    }

    fn repr_fmt(&self, f: &mut impl Write) -> fmt::Result {
        match self {
            Self::Ellipsis => f.write_str("Ellipsis"),
            Self::None => f.write_str("None"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => float_repr_fmt(*v, f),
            Self::Complex { re, im } => {
                if *re == 0.0 && re.is_sign_positive() {
                    write!(f, "{}j", trim_float(*im))
                } else {
                    let sign = if im.is_sign_negative() { '-' } else { '+' };
                    write!(f, "({}{sign}{}j)", trim_float(*re), trim_float(im.abs()))
                }
            }
            Self::String(s) => string_repr_fmt(s, f),
            Self::Bytes(b) => bytes_repr_fmt(b, f),
            Self::List(items) => seq_repr_fmt(items, "[", "]", f),
            Self::Tuple(items) => {
                if items.len() == 1 {
                    f.write_char('(')?;
                    items[0].repr_fmt(f)?;
                    f.write_str(",)")
                } else {
                    seq_repr_fmt(items, "(", ")", f)
                }
            }
            Self::Dict(pairs) => {
                f.write_char('{')?;
                for (i, (k, v)) in pairs.0.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    k.repr_fmt(f)?;
                    f.write_str(": ")?;
                    v.repr_fmt(f)?;
                }
                f.write_char('}')
            }
            Self::Set(items) if items.is_empty() => f.write_str("set()"),
            Self::Set(items) => seq_repr_fmt(items, "{", "}", f),
            Self::FrozenSet(items) if items.is_empty() => f.write_str("frozenset()"),
            Self::FrozenSet(items) => seq_repr_fmt(items, "frozenset({", "})", f),
            Self::Deque(items) => seq_repr_fmt(items, "deque([", "])", f),
            Self::Type(class) => write!(f, "{class}"),
            Self::Instance(inst) => inst.repr_fmt(f),
            Self::Function(callable) => write!(f, "<function {}>", callable.qualname()),
            Self::BuiltinMethod(name) => write!(f, "<built-in method {name}>"),
            Self::Iterator(_) => f.write_str("<iterator object>"),
            Self::Module(name) => write!(f, "<module '{name}'>"),
        }
    }
}

impl PartialEq for Object {
    /// Structural equality without Python's numeric cross-type coercion.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Ellipsis, Self::Ellipsis) | (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Complex { re: a, im: b }, Self::Complex { re: c, im: d }) => {
                a.to_bits() == c.to_bits() && b.to_bits() == d.to_bits()
            }
            (Self::String(a), Self::String(b)) | (Self::Module(a), Self::Module(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::List(a), Self::List(b))
            | (Self::Tuple(a), Self::Tuple(b))
            | (Self::Set(a), Self::Set(b))
            | (Self::FrozenSet(a), Self::FrozenSet(b))
            | (Self::Deque(a), Self::Deque(b))
            | (Self::Iterator(a), Self::Iterator(b)) => a == b,
            (Self::Dict(a), Self::Dict(b)) => a == b,
            _ => self.is_same(other),
        }
    }
}

impl From<bool> for Object {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Object {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Object {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Object {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Object {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Object {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<ClassRef> for Object {
    fn from(value: ClassRef) -> Self {
        Self::Type(value)
    }
}

impl From<Callable> for Object {
    fn from(value: Callable) -> Self {
        Self::Function(value)
    }
}

impl<T: Into<Self>> From<Vec<T>> for Object {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            _ => self.repr_fmt(f),
        }
    }
}

/// An instance of a class, with its own attributes.
///
/// Instances of builtin subclasses (`class Names(list)`) carry the builtin value
/// they wrap as `payload`, so container checks see through them.
#[derive(Debug)]
pub struct Instance {
    class: ClassRef,
    attrs: IndexMap<String, Object>,
    payload: Option<Object>,
}

impl Instance {
    /// Starts an instance of `class` with no attributes.
    #[must_use]
    pub fn new(class: &ClassRef) -> Self {
        Self {
            class: class.clone(),
            attrs: IndexMap::new(),
            payload: None,
        }
    }

    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<Object>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Sets the builtin value a builtin-subclass instance wraps.
    #[must_use]
    pub fn payload(mut self, value: Object) -> Self {
        self.payload = Some(value);
        self
    }

    /// Creates an enum member `class.name` with the given value.
    #[must_use]
    pub fn enum_member(class: &ClassRef, name: &str, value: impl Into<Object>) -> Object {
        Self::new(class).attr("name", name).attr("value", value).into_object()
    }

    #[must_use]
    pub fn into_object(self) -> Object {
        Object::Instance(Arc::new(self))
    }

    #[must_use]
    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    #[must_use]
    pub fn attrs(&self) -> &IndexMap<String, Object> {
        &self.attrs
    }

    fn repr_fmt(&self, f: &mut impl Write) -> fmt::Result {
        if self.class.flags().enumeration
            && let (Some(Object::String(name)), Some(value)) = (self.attrs.get("name"), self.attrs.get("value"))
        {
            write!(f, "<{}.{name}: ", self.class.qualname())?;
            value.repr_fmt(f)?;
            return f.write_char('>');
        }
        match &self.payload {
            Some(payload) => {
                write!(f, "{}(", self.class.qualname())?;
                payload.repr_fmt(f)?;
                f.write_char(')')
            }
            None => write!(
                f,
                "<{}.{} object at {:#x}>",
                self.class.module(),
                self.class.qualname(),
                std::ptr::from_ref(self) as usize
            ),
        }
    }
}

/// Insertion-ordered key/value pairs of a dict.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DictPairs(Vec<(Object, Object)>);

impl DictPairs {
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Looks up a key with Python equality.
    #[must_use]
    pub fn get(&self, key: &Object) -> Option<&Object> {
        self.0.iter().find(|(k, _)| k.py_eq(key)).map(|(_, v)| v)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (Object, Object)> {
        self.0.iter()
    }
}

impl From<Vec<(Object, Object)>> for DictPairs {
    fn from(pairs: Vec<(Object, Object)>) -> Self {
        Self(pairs)
    }
}

impl<'a> IntoIterator for &'a DictPairs {
    type Item = &'a (Object, Object);
    type IntoIter = std::slice::Iter<'a, (Object, Object)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn seq_repr_fmt(items: &[Object], open: &str, close: &str, f: &mut impl Write) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        item.repr_fmt(f)?;
    }
    f.write_str(close)
}

fn float_repr_fmt(v: f64, f: &mut impl Write) -> fmt::Result {
    if v.is_nan() {
        f.write_str("nan")
    } else if v.is_infinite() {
        f.write_str(if v > 0.0 { "inf" } else { "-inf" })
    } else {
        let s = v.to_string();
        f.write_str(&s)?;
        if !s.contains('.') {
            f.write_str(".0")?;
        }
        Ok(())
    }
}

/// Float formatting inside complex reprs, where `1.0` prints as `1`.
fn trim_float(v: f64) -> String {
    let s = v.to_string();
    s.strip_suffix(".0").map_or_else(|| s.clone(), str::to_owned)
}

fn string_repr_fmt(s: &str, f: &mut impl Write) -> fmt::Result {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    f.write_char(quote)?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c == quote => {
                f.write_char('\\')?;
                f.write_char(c)?;
            }
            c if c.is_control() => write!(f, "\\x{:02x}", u32::from(c))?,
            c => f.write_char(c)?,
        }
    }
    f.write_char(quote)
}

fn bytes_repr_fmt(bytes: &[u8], f: &mut impl Write) -> fmt::Result {
    let has_single = bytes.contains(&b'\'');
    let has_double = bytes.contains(&b'"');
    let quote = if has_single && !has_double { '"' } else { '\'' };
    f.write_char('b')?;
    f.write_char(quote)?;
    for &byte in bytes {
        match byte {
            b'\\' => f.write_str("\\\\")?,
            b'\t' => f.write_str("\\t")?,
            b'\n' => f.write_str("\\n")?,
            b'\r' => f.write_str("\\r")?,
            b'\'' if quote == '\'' => f.write_str("\\'")?,
            b'"' if quote == '"' => f.write_str("\\\"")?,
            0x20..=0x7e => f.write_char(char::from(byte))?,
            _ => write!(f, "\\x{byte:02x}")?,
        }
    }
    f.write_char(quote)
}

/// `i == f` without rounding `i` through `f64`.
fn int_eq_float(i: i64, f: f64) -> bool {
    // 2**63; every integral float in [-2**63, 2**63) converts to i64 exactly.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if f.fract() != 0.0 || !(-LIMIT..LIMIT).contains(&f) {
        return false;
    }
    #[expect(clippy::cast_possible_truncation, reason = "f is integral and within i64 range")]
    let whole = f as i64;
    whole == i
}
