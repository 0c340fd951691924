//! The decorator front-end and one-off value checks.
//!
//! Decoration is all-or-nothing: every hint is reduced, classified and turned
//! into a check before the wrapper is synthesized, and any error aborts with
//! the original callable untouched.

use std::sync::Arc;

use crate::{
    classify::classify_hint,
    codegen::{CheckNode, CodeGenerator, Frame, PithName, Scope, render_check},
    conf::{CheckConf, CheckStrategy},
    diagnose,
    error::{CallResult, DecorationError, HintError, ViolationSite},
    function::{Callable, FunctionRef},
    hint::Hint,
    namespace::modules,
    object::Object,
    reduce::{HintPosition, ReduceContext},
    sampling,
    tracer::{DecorTracer, NoopTracer},
    types::ClassRef,
    wrapper::{ParamCheck, synthesize},
};

/// Decorates callables with one configuration.
#[derive(Debug)]
pub struct Decorator<T: DecorTracer = NoopTracer> {
    conf: CheckConf,
    tracer: T,
}

impl Decorator {
    #[must_use]
    pub fn new(conf: CheckConf) -> Self {
        Self::with_tracer(conf, NoopTracer)
    }
}

impl Default for Decorator {
    fn default() -> Self {
        Self::new(CheckConf::new())
    }
}

impl<T: DecorTracer> Decorator<T> {
    #[must_use]
    pub fn with_tracer(conf: CheckConf, tracer: T) -> Self {
        Self { conf, tracer }
    }

    #[must_use]
    pub fn conf(&self) -> &CheckConf {
        &self.conf
    }

    #[must_use]
    pub fn tracer(&self) -> &T {
        &self.tracer
    }

    pub fn tracer_mut(&mut self) -> &mut T {
        &mut self.tracer
    }

    /// Returns a checked wrapper of `callable`.
    ///
    /// The callable itself is returned (as the same handle) when it is already
    /// checked, when checking is disabled or suppressed by `no_type_check`, and
    /// when no hint produces a check.
    pub fn decorate(&mut self, callable: &Callable) -> Result<Callable, DecorationError> {
        self.decorate_in(callable, None)
    }

    /// Like [`Self::decorate`], for a method defined in the body of `owner`.
    ///
    /// `Self` and names of the class (or its attributes) resolve against `owner`.
    pub fn decorate_method(&mut self, callable: &Callable, owner: &ClassRef) -> Result<Callable, DecorationError> {
        if owner.flags().no_type_check {
            return Ok(callable.clone());
        }
        self.decorate_in(callable, Some(owner))
    }

    fn decorate_in(&mut self, callable: &Callable, owner: Option<&ClassRef>) -> Result<Callable, DecorationError> {
        let function = match callable {
            Callable::Checked(_) => return Ok(callable.clone()),
            Callable::Plain(function) => function,
        };
        if self.conf.strategy == CheckStrategy::O0 || is_exempt(function) {
            tracing::debug!(function = function.qualname(), "decoration skipped");
            return Ok(callable.clone());
        }

        let mut ctx = ReduceContext::new(&self.conf).module(function.module());
        if let Some(local) = function.local_scope() {
            ctx = ctx.local_scope(local.clone());
        }
        if let Some(owner) = owner {
            ctx = ctx.push_class(owner);
        }

        let mut scope = Scope::new();
        let mut params = Vec::new();
        for (index, param) in function.signature().params().iter().enumerate() {
            let Some(hint) = param.annotation() else { continue };
            let pith = PithName::param(param.name());
            let node = self
                .check_of(hint, &pith, &ctx.at(HintPosition::Param(param.kind())), &mut scope)
                .map_err(|error| DecorationError::Hint {
                    function: function.qualname().to_owned(),
                    site: format!("parameter \"{}\"", param.name()),
                    error,
                })?;
            if let Some(node) = node {
                params.push(ParamCheck {
                    index,
                    name: param.name().to_owned(),
                    node,
                });
            }
        }
        let ret = match function.return_hint() {
            Some(hint) => self
                .check_of(hint, &PithName::ret(), &ctx.at(HintPosition::Return), &mut scope)
                .map_err(|error| DecorationError::Hint {
                    function: function.qualname().to_owned(),
                    site: "return".to_owned(),
                    error,
                })?,
            None => None,
        };

        if params.is_empty() && ret.is_none() {
            tracing::debug!(function = function.qualname(), "no effective checks");
            return Ok(callable.clone());
        }
        let checked = synthesize(function, params, ret, scope, &self.conf)?;
        self.tracer.on_synthesize(function.qualname(), checked.filename());
        Ok(Callable::Checked(Arc::new(checked)))
    }

    /// The check of one declared hint, or `None` if it checks nothing.
    fn check_of(
        &mut self,
        hint: &Hint,
        pith: &PithName,
        ctx: &ReduceContext,
        scope: &mut Scope,
    ) -> Result<Option<CheckNode>, HintError> {
        let classified = classify_hint(hint, ctx)?;
        let declared = hint.repr();
        let reduced = classified.hint.repr();
        if declared != reduced {
            self.tracer.on_reduce(&declared, &reduced);
        }
        self.tracer.on_classify(&reduced, classified.sign);
        if classified.is_ignorable() {
            return Ok(None);
        }
        let node = CodeGenerator::new(ctx).generate_check(&classified, pith, scope)?;
        if node.is_pass() {
            return Ok(None);
        }
        let site = if *pith == PithName::ret() { "return" } else { pith.as_str() };
        self.tracer.on_generate(site, &render_check(&node));
        Ok(Some(node))
    }
}

/// `@no_type_check` on the function or its whole module.
fn is_exempt(function: &FunctionRef) -> bool {
    function.is_no_type_check()
        || modules()
            .import_module(function.module())
            .is_some_and(|module| module.is_no_type_check())
}

fn standalone_check(hint: &Hint, conf: &CheckConf) -> Result<CheckNode, HintError> {
    let ctx = ReduceContext::new(conf).at(HintPosition::Standalone);
    let classified = classify_hint(hint, &ctx)?;
    let mut scope = Scope::new();
    CodeGenerator::new(&ctx).generate_check(&classified, &PithName::param("obj"), &mut scope)
}

/// True if `obj` satisfies `hint`.
///
/// Errors only for invalid hints and unresolvable forward references.
pub fn is_bearable(obj: &Object, hint: &Hint, conf: &CheckConf) -> CallResult<bool> {
    let node = standalone_check(hint, conf)?;
    let frame = Frame {
        random: sampling::next_random(),
    };
    Ok(node.check(obj, &frame)?)
}

/// Raises a [`Violation`](crate::Violation) unless `obj` satisfies `hint`.
pub fn die_if_unbearable(obj: &Object, hint: &Hint, conf: &CheckConf) -> CallResult<()> {
    let node = standalone_check(hint, conf)?;
    let frame = Frame {
        random: sampling::next_random(),
    };
    if node.check(obj, &frame)? {
        return Ok(());
    }
    Err(diagnose::violation("", ViolationSite::Value, &node, obj, &frame, conf).into())
}
