//! Error taxonomy for decoration and call time.
//!
//! Decoration-time failures ([`HintError`], [`InternalError`], [`SignatureError`]) abort
//! decoration before any wrapper exists. Call-time failures ([`Violation`],
//! [`ForwardRefError`], [`BindError`]) propagate unchanged to the caller of the
//! wrapped callable.

use std::fmt;

/// Result type alias for hint reduction, classification and code generation.
pub type HintResult<T> = Result<T, HintError>;

/// Result type alias for calls through a checked callable.
pub type CallResult<T> = Result<T, CallError>;

/// A hint could not be turned into a check.
///
/// All variants are fatal at decoration time: an unchecked parameter is never
/// silently produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HintError {
    /// The object is not a type hint at all (e.g. the integer `5`).
    #[error("{repr} not a type hint")]
    NotAHint { repr: String },
    /// The object is hint-shaped but no check strategy exists for it.
    #[error("type hint {repr} currently unsupported")]
    Unsupported { repr: String },
    /// The hint violates an invariant of its own kind.
    #[error("type hint {repr} malformed: {reason}")]
    Malformed { repr: String, reason: String },
    /// Substitution through the hint extension protocol did not terminate.
    #[error("type hint {repr} substitution exceeds maximum depth {limit}")]
    Recursion { repr: String, limit: usize },
    /// Hint nesting exceeded the code generator's depth limit.
    #[error("type hint {repr} nesting exceeds maximum depth {limit}")]
    CodeGenRecursion { repr: String, limit: usize },
}

impl HintError {
    pub(crate) fn malformed(repr: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            repr: repr.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(repr: impl Into<String>) -> Self {
        Self::Unsupported { repr: repr.into() }
    }
}

/// A forward reference could not be resolved at call time.
///
/// Errors are never cached on the proxy: a later call retries resolution, so
/// registering the missing module or name afterwards fixes the wrapper.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForwardRefError {
    /// The qualifying module of a dotted reference is not registered.
    #[error("forward reference '{name}' unresolvable: module '{module}' not found")]
    ModuleNotFound { name: String, module: String },
    /// No scope defines the referenced name.
    #[error("forward reference '{name}' unresolvable: name undefined in {scope}")]
    NameNotFound { name: String, scope: String },
    /// The name resolved, but not to a class.
    #[error("forward reference '{name}' referent {repr} not a class")]
    NotAClass { name: String, repr: String },
}

/// Where in a callable a violation occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationSite {
    /// A named parameter.
    Param(String),
    /// The return value.
    Return,
    /// A one-off check through `die_if_unbearable`.
    Value,
}

impl fmt::Display for ViolationSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Param(name) => write!(f, "parameter {name}"),
            Self::Return => f.write_str("return"),
            Self::Value => f.write_str("value"),
        }
    }
}

/// A runtime value failed its check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Violation {
    /// Qualified name of the checked callable (empty for one-off checks).
    pub function: String,
    /// The violating parameter or `return`.
    pub site: ViolationSite,
    /// Rendered expected hint.
    pub hint: String,
    /// Class name of the offending root value.
    pub type_name: String,
    /// Truncated repr of the offending root value.
    pub value_repr: String,
    /// Description of the innermost failing sub-value.
    pub cause: String,
    message: String,
}

impl Violation {
    pub(crate) fn new(
        function: String,
        site: ViolationSite,
        hint: String,
        type_name: String,
        value_repr: String,
        cause: String,
    ) -> Self {
        let message = render_violation(&function, &site, &hint, &value_repr, &cause);
        Self {
            function,
            site,
            hint,
            type_name,
            value_repr,
            cause,
            message,
        }
    }

    /// Re-renders the message with the hint and value highlighted by ANSI color.
    #[must_use]
    pub(crate) fn colorized(mut self) -> Self {
        let hint = format!("{HINT_COLOR}{}{RESET}", self.hint);
        let value = format!("{VALUE_COLOR}{}{RESET}", self.value_repr);
        self.message = render_violation(&self.function, &self.site, &hint, &value, &self.cause);
        self
    }

    /// Returns the parameter name, or `None` for return and one-off violations.
    #[must_use]
    pub fn param(&self) -> Option<&str> {
        match &self.site {
            ViolationSite::Param(name) => Some(name),
            _ => None,
        }
    }
}

const HINT_COLOR: &str = "\x1b[1;32m";
const VALUE_COLOR: &str = "\x1b[1;31m";
const RESET: &str = "\x1b[0m";

fn render_violation(function: &str, site: &ViolationSite, hint: &str, value: &str, cause: &str) -> String {
    match site {
        ViolationSite::Value => format!("{value} violates type hint {hint}, as {cause}."),
        ViolationSite::Param(name) => {
            format!("Function {function}() parameter {name}={value} violates type hint {hint}, as {cause}.")
        }
        ViolationSite::Return => format!("Function {function}() return {value} violates type hint {hint}, as {cause}."),
    }
}

/// A bug in the engine itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InternalError {
    /// Generated wrapper source failed validation.
    #[error("generated wrapper for {function}() failed to compile: {message}\n{code}")]
    Compile {
        function: String,
        message: String,
        code: String,
    },
}

/// A callable signature is not well formed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("parameter '{name}' declared twice")]
    DuplicateName { name: String },
    #[error("parameter '{name}' of kind {kind} cannot follow {previous}")]
    WrongOrder {
        name: String,
        kind: String,
        previous: String,
    },
    #[error("non-default parameter '{name}' follows default parameter")]
    DefaultOrder { name: String },
    #[error("variadic parameter '{name}' cannot have a default")]
    VariadicDefault { name: String },
}

/// Arguments could not be bound to a signature.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    #[error("{function}() takes {expected} positional arguments but {given} were given")]
    TooManyPositional {
        function: String,
        expected: usize,
        given: usize,
    },
    #[error("{function}() missing required argument: '{name}'")]
    Missing { function: String, name: String },
    #[error("{function}() got an unexpected keyword argument '{name}'")]
    UnexpectedKeyword { function: String, name: String },
    #[error("{function}() got multiple values for argument '{name}'")]
    MultipleValues { function: String, name: String },
    #[error("{function}() got some positional-only arguments passed as keyword arguments: '{name}'")]
    PositionalOnlyAsKeyword { function: String, name: String },
}

/// Decoration failed; the original callable is untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecorationError {
    #[error("Function {function}() {site} type hint invalid: {error}")]
    Hint {
        function: String,
        site: String,
        #[source]
        error: HintError,
    },
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl DecorationError {
    /// Returns the underlying hint error, if any.
    #[must_use]
    pub fn hint_error(&self) -> Option<&HintError> {
        match self {
            Self::Hint { error, .. } => Some(error),
            Self::Internal(_) => None,
        }
    }
}

/// Any failure while calling a (checked or plain) callable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error(transparent)]
    Violation(#[from] Violation),
    #[error(transparent)]
    ForwardRef(#[from] ForwardRefError),
    #[error(transparent)]
    Hint(#[from] HintError),
    /// An error raised by the wrapped body.
    #[error("{exc_type}: {message}")]
    Raised { exc_type: String, message: String },
}

impl CallError {
    /// Builds an error raised by a callable body, e.g. `CallError::raised("ValueError", "bad")`.
    pub fn raised(exc_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Raised {
            exc_type: exc_type.into(),
            message: message.into(),
        }
    }

    /// Returns the violation, if this error is one.
    #[must_use]
    pub fn as_violation(&self) -> Option<&Violation> {
        match self {
            Self::Violation(v) => Some(v),
            _ => None,
        }
    }
}
