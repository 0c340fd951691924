#![doc = include_str!("../../../README.md")]

pub mod classify;
pub mod codegen;
mod conf;
mod decorator;
pub mod diagnose;
mod error;
pub mod forward;
mod function;
pub mod hint;
pub mod linecache;
mod namespace;
mod object;
pub mod reduce;
pub mod sampling;
pub mod sign;
pub mod tracer;
pub mod types;
mod validator;
pub mod wrapper;

pub use crate::{
    classify::{ClassifiedHint, SignData, classify_hint},
    codegen::{CheckNode, CodeGenerator, PithName, Scope},
    conf::{CheckConf, CheckStrategy},
    decorator::{Decorator, die_if_unbearable, is_bearable},
    error::{
        BindError, CallError, CallResult, DecorationError, ForwardRefError, HintError, HintResult, InternalError,
        SignatureError, Violation, ViolationSite,
    },
    forward::{ForwardRef, ResolutionState},
    function::{BoundArgs, BoundValue, Callable, Function, FunctionBuilder, FunctionRef, ParamKind, Parameter, Signature},
    hint::{Hint, HintKind, HintProtocol, TypeVarDef, TypingForm, hints},
    namespace::{LocalScope, Module, ModuleRegistry, modules},
    object::{DictPairs, Instance, Object},
    reduce::{HintPosition, ReduceContext, reduce},
    sign::HintSign,
    tracer::{DecorTracer, LogTracer, NoopTracer, RecordingTracer, TraceEvent},
    types::{ClassBuilder, ClassRef, builtins},
    validator::Validator,
    wrapper::CheckedFunction,
};
