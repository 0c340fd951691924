//! Callables, their signatures and argument binding.
//!
//! A Python signature can include, in this order:
//! - Positional-only parameters (before `/`)
//! - Positional-or-keyword parameters
//! - A variable positional parameter (`*args`)
//! - Keyword-only parameters (after `*` or `*args`)
//! - A variable keyword parameter (`**kwargs`)
//!
//! [`Signature::bind`] implements the usual binding algorithm. `*args` binds to a
//! tuple and `**kwargs` to a dict with string keys, which is exactly what the
//! variadic reduction rules check them against.

use std::{
    fmt,
    sync::{
        Arc, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

use strum::Display;

use crate::{
    error::{BindError, CallResult, SignatureError},
    hint::Hint,
    namespace::LocalScope,
    object::Object,
    wrapper::CheckedFunction,
};

static NEXT_FUNCTION_ID: AtomicU64 = AtomicU64::new(1);

/// Parameter kinds, in the order a signature must declare them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub enum ParamKind {
    #[strum(serialize = "positional-only")]
    PositionalOnly,
    #[strum(serialize = "positional or keyword")]
    PositionalOrKeyword,
    #[strum(serialize = "variadic positional")]
    VarPositional,
    #[strum(serialize = "keyword-only")]
    KeywordOnly,
    #[strum(serialize = "variadic keyword")]
    VarKeyword,
}

impl ParamKind {
    #[must_use]
    pub fn is_variadic(self) -> bool {
        matches!(self, Self::VarPositional | Self::VarKeyword)
    }

    fn accepts_position(self) -> bool {
        matches!(self, Self::PositionalOnly | Self::PositionalOrKeyword)
    }

    fn accepts_keyword(self) -> bool {
        matches!(self, Self::PositionalOrKeyword | Self::KeywordOnly)
    }
}

/// One declared parameter.
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    kind: ParamKind,
    default: Option<Object>,
    hint: Option<Hint>,
}

impl Parameter {
    fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            hint: None,
        }
    }

    #[must_use]
    pub fn positional_only(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::PositionalOnly)
    }

    /// A regular positional-or-keyword parameter.
    #[must_use]
    pub fn positional(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::PositionalOrKeyword)
    }

    #[must_use]
    pub fn var_positional(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::VarPositional)
    }

    #[must_use]
    pub fn keyword_only(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::KeywordOnly)
    }

    #[must_use]
    pub fn var_keyword(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::VarKeyword)
    }

    /// Annotates the parameter.
    #[must_use]
    pub fn hint(mut self, hint: Hint) -> Self {
        self.hint = Some(hint);
        self
    }

    #[must_use]
    pub fn default(mut self, value: impl Into<Object>) -> Self {
        self.default = Some(value.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    #[must_use]
    pub fn default_value(&self) -> Option<&Object> {
        self.default.as_ref()
    }

    #[must_use]
    pub fn annotation(&self) -> Option<&Hint> {
        self.hint.as_ref()
    }
}

/// A validated parameter list.
#[derive(Debug, Clone, Default)]
pub struct Signature {
    params: Vec<Parameter>,
}

impl Signature {
    /// Validates declaration order, defaults and name uniqueness.
    pub fn new(params: Vec<Parameter>) -> Result<Self, SignatureError> {
        let mut previous: Option<ParamKind> = None;
        let mut seen_default = false;
        for (i, param) in params.iter().enumerate() {
            if params[..i].iter().any(|p| p.name == param.name) {
                return Err(SignatureError::DuplicateName {
                    name: param.name.clone(),
                });
            }
            if let Some(prev) = previous
                && (param.kind < prev || (param.kind == prev && param.kind.is_variadic()))
            {
                return Err(SignatureError::WrongOrder {
                    name: param.name.clone(),
                    kind: param.kind.to_string(),
                    previous: prev.to_string(),
                });
            }
            if param.kind.is_variadic() && param.default.is_some() {
                return Err(SignatureError::VariadicDefault {
                    name: param.name.clone(),
                });
            }
            if param.kind.accepts_position() {
                if param.default.is_some() {
                    seen_default = true;
                } else if seen_default {
                    return Err(SignatureError::DefaultOrder {
                        name: param.name.clone(),
                    });
                }
            }
            previous = Some(param.kind);
        }
        Ok(Self { params })
    }

    #[must_use]
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Binds call arguments to parameters, filling in defaults.
    pub fn bind(&self, function: &str, args: Vec<Object>, kwargs: Vec<(String, Object)>) -> Result<BoundArgs, BindError> {
        let n = self.params.len();
        let mut values: Vec<Option<Object>> = vec![None; n];
        let mut passed = vec![false; n];

        let positional: Vec<usize> = (0..n).filter(|&i| self.params[i].kind.accepts_position()).collect();
        let var_positional = self.params.iter().position(|p| p.kind == ParamKind::VarPositional);
        let var_keyword = self.params.iter().position(|p| p.kind == ParamKind::VarKeyword);

        let given = args.len();
        let mut args = args.into_iter();
        for &idx in &positional {
            let Some(arg) = args.next() else { break };
            values[idx] = Some(arg);
            passed[idx] = true;
        }
        let extra: Vec<Object> = args.collect();
        match var_positional {
            Some(idx) => {
                passed[idx] = !extra.is_empty();
                values[idx] = Some(Object::Tuple(extra));
            }
            None if !extra.is_empty() => {
                return Err(BindError::TooManyPositional {
                    function: function.to_owned(),
                    expected: positional.len(),
                    given,
                });
            }
            None => {}
        }

        let mut extra_kwargs: Vec<(Object, Object)> = Vec::new();
        for (name, value) in kwargs {
            match self.params.iter().position(|p| p.name == name) {
                Some(idx) if self.params[idx].kind.accepts_keyword() => {
                    if passed[idx] {
                        return Err(BindError::MultipleValues {
                            function: function.to_owned(),
                            name,
                        });
                    }
                    values[idx] = Some(value);
                    passed[idx] = true;
                }
                Some(idx) if self.params[idx].kind == ParamKind::PositionalOnly && var_keyword.is_none() => {
                    return Err(BindError::PositionalOnlyAsKeyword {
                        function: function.to_owned(),
                        name,
                    });
                }
                _ if var_keyword.is_some() => extra_kwargs.push((Object::String(name), value)),
                _ => {
                    return Err(BindError::UnexpectedKeyword {
                        function: function.to_owned(),
                        name,
                    });
                }
            }
        }
        if let Some(idx) = var_keyword {
            passed[idx] = !extra_kwargs.is_empty();
            values[idx] = Some(Object::dict(extra_kwargs));
        }

        let mut bound = Vec::with_capacity(n);
        for ((param, value), passed) in self.params.iter().zip(values).zip(passed) {
            let value = match value.or_else(|| param.default.clone()) {
                Some(value) => value,
                None => {
                    return Err(BindError::Missing {
                        function: function.to_owned(),
                        name: param.name.clone(),
                    });
                }
            };
            bound.push(BoundValue {
                name: param.name.clone(),
                value,
                passed,
            });
        }
        Ok(BoundArgs { values: bound })
    }
}

impl fmt::Display for Signature {
    /// Renders the parameter list as it would appear in a `def` line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::with_capacity(self.params.len() + 2);
        let mut after_positional_only = false;
        let mut has_star = false;
        for param in &self.params {
            if after_positional_only && param.kind != ParamKind::PositionalOnly {
                parts.push("/".to_owned());
                after_positional_only = false;
            }
            let default = if param.default.is_some() {
                format!("=__hg_default_{}", param.name)
            } else {
                String::new()
            };
            match param.kind {
                ParamKind::PositionalOnly => {
                    after_positional_only = true;
                    parts.push(format!("{}{default}", param.name));
                }
                ParamKind::PositionalOrKeyword => parts.push(format!("{}{default}", param.name)),
                ParamKind::VarPositional => {
                    has_star = true;
                    parts.push(format!("*{}", param.name));
                }
                ParamKind::KeywordOnly => {
                    if !has_star {
                        parts.push("*".to_owned());
                        has_star = true;
                    }
                    parts.push(format!("{}{default}", param.name));
                }
                ParamKind::VarKeyword => parts.push(format!("**{}", param.name)),
            }
        }
        if after_positional_only {
            parts.push("/".to_owned());
        }
        f.write_str(&parts.join(", "))
    }
}

/// One bound parameter value.
#[derive(Debug, Clone)]
pub struct BoundValue {
    pub name: String,
    pub value: Object,
    /// False when the value came from a default (or an empty `*args`/`**kwargs`).
    pub passed: bool,
}

/// Arguments bound to a signature, in declaration order.
#[derive(Debug, Clone)]
pub struct BoundArgs {
    values: Vec<BoundValue>,
}

impl BoundArgs {
    /// The value bound to `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Object> {
        self.values.iter().find(|v| v.name == name).map(|v| &v.value)
    }

    #[must_use]
    pub fn values(&self) -> &[BoundValue] {
        &self.values
    }
}

/// The body of a plain callable.
pub type Body = Arc<dyn Fn(&BoundArgs) -> CallResult<Object> + Send + Sync>;

/// A plain (unchecked) callable: signature, hints and body.
pub struct Function {
    id: u64,
    name: String,
    qualname: String,
    module: String,
    signature: Signature,
    return_hint: Option<Hint>,
    body: Body,
    no_type_check: bool,
    local_scope: Option<Weak<LocalScope>>,
}

impl Function {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn qualname(&self) -> &str {
        &self.qualname
    }

    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    #[must_use]
    pub fn return_hint(&self) -> Option<&Hint> {
        self.return_hint.as_ref()
    }

    #[must_use]
    pub fn is_no_type_check(&self) -> bool {
        self.no_type_check
    }

    /// The enclosing function scope captured at definition time, if any.
    #[must_use]
    pub fn local_scope(&self) -> Option<&Weak<LocalScope>> {
        self.local_scope.as_ref()
    }

    /// Binds and runs the body.
    pub fn call(&self, args: Vec<Object>, kwargs: Vec<(String, Object)>) -> CallResult<Object> {
        let bound = self.signature.bind(&self.qualname, args, kwargs)?;
        self.invoke(&bound)
    }

    /// Runs the body on already-bound arguments.
    pub(crate) fn invoke(&self, bound: &BoundArgs) -> CallResult<Object> {
        (self.body)(bound)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function {}({})>", self.qualname, self.signature)
    }
}

pub type FunctionRef = Arc<Function>;

/// Builds a plain callable.
///
/// ```text
/// let f = FunctionBuilder::new("f")
///     .param(Parameter::positional("x").hint(hints::int()))
///     .returns(hints::str())
///     .body(|args| Ok(Object::str(args.get("x").unwrap().repr())))
///     .build()?;
/// ```
pub struct FunctionBuilder {
    name: String,
    qualname: Option<String>,
    module: String,
    params: Vec<Parameter>,
    return_hint: Option<Hint>,
    body: Option<Body>,
    no_type_check: bool,
    local_scope: Option<Weak<LocalScope>>,
}

impl FunctionBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qualname: None,
            module: "__main__".to_owned(),
            params: Vec::new(),
            return_hint: None,
            body: None,
            no_type_check: false,
            local_scope: None,
        }
    }

    #[must_use]
    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    #[must_use]
    pub fn qualname(mut self, qualname: impl Into<String>) -> Self {
        self.qualname = Some(qualname.into());
        self
    }

    #[must_use]
    pub fn param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    #[must_use]
    pub fn returns(mut self, hint: Hint) -> Self {
        self.return_hint = Some(hint);
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Fn(&BoundArgs) -> CallResult<Object> + Send + Sync + 'static) -> Self {
        self.body = Some(Arc::new(body));
        self
    }

    /// Applies `@no_type_check`.
    #[must_use]
    pub fn no_type_check(mut self) -> Self {
        self.no_type_check = true;
        self
    }

    /// Defines the callable inside a function whose locals are `scope`.
    #[must_use]
    pub fn local_scope(mut self, scope: &Arc<LocalScope>) -> Self {
        self.local_scope = Some(Arc::downgrade(scope));
        self
    }

    /// Validates the signature and freezes the callable. Without a body, calls return `None`.
    pub fn build(self) -> Result<Callable, SignatureError> {
        let signature = Signature::new(self.params)?;
        let body: Body = match self.body {
            Some(body) => body,
            None => Arc::new(|_: &BoundArgs| Ok(Object::None)),
        };
        Ok(Callable::Plain(Arc::new(Function {
            id: NEXT_FUNCTION_ID.fetch_add(1, Ordering::Relaxed),
            qualname: self.qualname.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            module: self.module,
            signature,
            return_hint: self.return_hint,
            body,
            no_type_check: self.no_type_check,
            local_scope: self.local_scope,
        })))
    }
}

/// A callable value: either a plain function or a type-checked wrapper around one.
#[derive(Clone)]
pub enum Callable {
    Plain(FunctionRef),
    Checked(Arc<CheckedFunction>),
}

impl Callable {
    /// Calls with positional and keyword arguments.
    pub fn call(&self, args: Vec<Object>, kwargs: Vec<(String, Object)>) -> CallResult<Object> {
        match self {
            Self::Plain(function) => function.call(args, kwargs),
            Self::Checked(checked) => checked.call(args, kwargs),
        }
    }

    /// Calls with positional arguments only.
    pub fn call_args(&self, args: Vec<Object>) -> CallResult<Object> {
        self.call(args, Vec::new())
    }

    /// The underlying plain function (the original, for checked wrappers).
    #[must_use]
    pub fn function(&self) -> &FunctionRef {
        match self {
            Self::Plain(function) => function,
            Self::Checked(checked) => checked.original(),
        }
    }

    #[must_use]
    pub fn qualname(&self) -> &str {
        self.function().qualname()
    }

    #[must_use]
    pub fn is_checked(&self) -> bool {
        matches!(self, Self::Checked(_))
    }

    /// The checked wrapper, if this callable is one.
    #[must_use]
    pub fn checked(&self) -> Option<&CheckedFunction> {
        match self {
            Self::Checked(checked) => Some(checked),
            Self::Plain(_) => None,
        }
    }

    /// True if both handles name the same callable object.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Plain(a), Self::Plain(b)) => Arc::ptr_eq(a, b),
            (Self::Checked(a), Self::Checked(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(function) => fmt::Debug::fmt(&**function, f),
            Self::Checked(checked) => write!(f, "<checked {:?}>", &**checked.original()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_renders_markers() {
        let sig = Signature::new(vec![
            Parameter::positional_only("a"),
            Parameter::positional("b").default(1),
            Parameter::keyword_only("c"),
            Parameter::var_keyword("kw"),
        ])
        .unwrap();
        assert_eq!(sig.to_string(), "a, /, b=__hg_default_b, *, c, **kw");
    }

    #[test]
    fn duplicate_variadic_is_rejected() {
        let err = Signature::new(vec![Parameter::var_positional("a"), Parameter::var_positional("b")]).unwrap_err();
        assert!(matches!(err, SignatureError::WrongOrder { .. }));
    }
}
