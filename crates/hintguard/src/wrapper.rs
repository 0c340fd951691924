//! Wrapper synthesis: assembling per-parameter checks into one checked callable.
//!
//! The wrapper is rendered as the Python function it stands for, with the
//! original signature (markers, variadics and defaults included), so the line
//! cache can show exactly what each call runs:
//!
//! ```text
//! def g(x):
//!     __hg_random = __hg_getrandbits(32)
//!     if not (isinstance(x, list) and (not x or isinstance((__hg_pith_0 := x[__hg_random % len(x)]), int))):
//!         raise __hg_violation('x', x)
//!     __hg_return = __hg_func(x)
//!     if not isinstance(__hg_return, int):
//!         raise __hg_violation('return', __hg_return)
//!     return __hg_return
//! ```
//!
//! "Compiling" validates that source against the scope before the wrapper is
//! handed out. The rendered source is what a human reads; calls evaluate the
//! same predicate trees directly.

use crate::{
    codegen::{CheckNode, Frame, NAME_PREFIX, PithName, RANDOM_NAME, Scope, ScopeEntry, render_check},
    conf::CheckConf,
    diagnose,
    error::{CallResult, InternalError, Violation, ViolationSite},
    function::{FunctionRef, ParamKind},
    linecache,
    object::Object,
    sampling,
};

/// Name of the original callable in generated source.
pub const FUNC_NAME: &str = "__hg_func";
/// Name of the violation factory in generated source.
pub const VIOLATION_NAME: &str = "__hg_violation";
/// Name of the random source in generated source.
pub const GETRANDBITS_NAME: &str = "__hg_getrandbits";

const INDENT: &str = "    ";

/// The check of one parameter.
#[derive(Debug, Clone)]
pub struct ParamCheck {
    /// Position of the parameter in the signature.
    pub index: usize,
    pub name: String,
    pub node: CheckNode,
}

/// A type-checked wrapper around a plain callable.
#[derive(Debug)]
pub struct CheckedFunction {
    original: FunctionRef,
    params: Vec<ParamCheck>,
    ret: Option<CheckNode>,
    scope: Scope,
    source: String,
    filename: String,
    samples: bool,
    conf: CheckConf,
}

/// Renders, validates and registers the wrapper of `original`.
///
/// Parameter checks must be in declaration order. Defaults are bound into
/// `scope` here, so the scope is complete (and frozen) once this returns.
pub fn synthesize(
    original: &FunctionRef,
    params: Vec<ParamCheck>,
    ret: Option<CheckNode>,
    mut scope: Scope,
    conf: &CheckConf,
) -> Result<CheckedFunction, InternalError> {
    for param in original.signature().params() {
        if let Some(default) = param.default_value() {
            scope.bind_default(param.name(), default);
        }
    }
    let ret_check = ret.as_ref().map(render_check);
    let samples = params.iter().any(|p| render_check(&p.node).contains(RANDOM_NAME))
        || ret_check.as_deref().is_some_and(|check| check.contains(RANDOM_NAME));
    let source = render_wrapper(original, &params, ret_check.as_deref(), samples);
    let filename = format!(
        "<@hintguard({}.{}) at {:#x}>",
        original.module(),
        original.qualname(),
        original.id()
    );

    let compile_error = |message: String| InternalError::Compile {
        function: original.qualname().to_owned(),
        message,
        code: source.clone(),
    };
    for node in params.iter().map(|p| &p.node).chain(ret.iter()) {
        for key in node.scope_keys() {
            if !scope.contains(key) {
                return Err(compile_error(format!("name '{key}' is not defined")));
            }
        }
    }
    for param in original.signature().params() {
        if param.default_value().is_some() {
            let key = format!("{NAME_PREFIX}default_{}", param.name());
            if !matches!(scope.get(&key), Some(ScopeEntry::Default(_))) {
                return Err(compile_error(format!("default '{key}' is not defined")));
            }
        }
    }
    check_balanced(&source).map_err(compile_error)?;

    linecache::register(&filename, &source);
    Ok(CheckedFunction {
        original: original.clone(),
        params,
        ret,
        scope,
        source,
        filename,
        samples,
        conf: conf.clone(),
    })
}

fn render_wrapper(original: &FunctionRef, params: &[ParamCheck], ret: Option<&str>, samples: bool) -> String {
    let signature = original.signature();
    let mut lines = vec![format!("def {}({signature}):", original.name())];
    if samples {
        lines.push(format!("{INDENT}{RANDOM_NAME} = {GETRANDBITS_NAME}(32)"));
    }
    for param in params {
        let (name, check) = (&param.name, render_check(&param.node));
        if signature.params()[param.index].default_value().is_some() {
            lines.push(format!("{INDENT}if {name} is not {NAME_PREFIX}default_{name} and not {check}:"));
        } else {
            lines.push(format!("{INDENT}if not {check}:"));
        }
        lines.push(format!("{INDENT}{INDENT}raise {VIOLATION_NAME}('{name}', {name})"));
    }
    let result = PithName::ret();
    lines.push(format!("{INDENT}{result} = {FUNC_NAME}({})", forward_args(original)));
    if let Some(check) = ret {
        lines.push(format!("{INDENT}if not {check}:"));
        lines.push(format!("{INDENT}{INDENT}raise {VIOLATION_NAME}('return', {result})"));
    }
    lines.push(format!("{INDENT}return {result}"));
    lines.push(String::new());
    lines.join("\n")
}

/// The argument list that forwards every parameter to the original.
fn forward_args(original: &FunctionRef) -> String {
    original
        .signature()
        .params()
        .iter()
        .map(|p| match p.kind() {
            ParamKind::PositionalOnly | ParamKind::PositionalOrKeyword => p.name().to_owned(),
            ParamKind::VarPositional => format!("*{}", p.name()),
            ParamKind::KeywordOnly => format!("{0}={0}", p.name()),
            ParamKind::VarKeyword => format!("**{}", p.name()),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Brackets must nest; string literals are skipped.
fn check_balanced(source: &str) -> Result<(), String> {
    let mut stack = Vec::new();
    let mut quote: Option<char> = None;
    for (lineno, line) in source.lines().enumerate() {
        let mut chars = line.chars();
        while let Some(c) = chars.next() {
            if let Some(q) = quote {
                if c == '\\' {
                    chars.next();
                } else if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '\'' | '"' => quote = Some(c),
                '(' | '[' | '{' => stack.push(c),
                ')' | ']' | '}' => {
                    let open = match c {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    if stack.pop() != Some(open) {
                        return Err(format!("unmatched '{c}' on line {}", lineno + 1));
                    }
                }
                _ => {}
            }
        }
    }
    match stack.last() {
        Some(open) => Err(format!("'{open}' was never closed")),
        None => Ok(()),
    }
}

impl CheckedFunction {
    /// Binds, checks parameters in declaration order, calls the original, then checks the return.
    pub fn call(&self, args: Vec<Object>, kwargs: Vec<(String, Object)>) -> CallResult<Object> {
        let bound = self.original.signature().bind(self.original.qualname(), args, kwargs)?;
        let frame = Frame {
            random: if self.samples { sampling::next_random() } else { 0 },
        };
        for check in &self.params {
            let Some(arg) = bound.values().get(check.index) else {
                continue;
            };
            // Defaults are trusted; only passed values are checked.
            if arg.passed && !check.node.check(&arg.value, &frame)? {
                let site = ViolationSite::Param(check.name.clone());
                return Err(self.violation(site, &check.node, &arg.value, &frame).into());
            }
        }
        let value = self.original.invoke(&bound)?;
        if let Some(ret) = &self.ret
            && !ret.check(&value, &frame)?
        {
            return Err(self.violation(ViolationSite::Return, ret, &value, &frame).into());
        }
        Ok(value)
    }

    fn violation(&self, site: ViolationSite, node: &CheckNode, value: &Object, frame: &Frame) -> Violation {
        diagnose::violation(self.original.qualname(), site, node, value, frame, &self.conf)
    }

    /// The wrapped callable.
    #[must_use]
    pub fn original(&self) -> &FunctionRef {
        &self.original
    }

    /// The rendered wrapper source, as registered in the line cache.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The synthetic filename the source is registered under.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    #[must_use]
    pub fn param_checks(&self) -> &[ParamCheck] {
        &self.params
    }

    #[must_use]
    pub fn return_check(&self) -> Option<&CheckNode> {
        self.ret.as_ref()
    }

    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    #[must_use]
    pub fn conf(&self) -> &CheckConf {
        &self.conf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brackets_inside_strings_are_ignored() {
        assert_eq!(check_balanced("f('(', [x])"), Ok(()));
        assert!(check_balanced("f((x)").is_err());
        assert!(check_balanced("f(x]").is_err());
    }
}
