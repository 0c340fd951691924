//! Check generation: from a classified hint to a predicate tree.
//!
//! Each [`CheckNode`] is evaluated directly at call time and also rendered as
//! the Python expression it stands for (see [`render_check`]), which is what
//! the wrapper source and the line cache show. Runtime objects the check
//! needs live in the wrapper's [`Scope`] under generated keys.

mod node;
mod render;
mod scope;

pub use node::{CheckNode, ClassExpr, ForwardExpr, Frame, LiteralExpr, NodeKind, ValidatorExpr, sample_index};
pub use render::render_check;
pub use scope::{NAME_PREFIX, PithName, RANDOM_NAME, Scope, ScopeEntry, ScopeKey};

use crate::{
    classify::{ClassifiedHint, SignData, classify_hint},
    conf::CheckStrategy,
    error::{HintError, HintResult},
    forward::ForwardRef,
    hint::{Hint, HintKind},
    object::Object,
    reduce::ReduceContext,
    sign::{Emit, HintSign, SignCategory},
    types::{ClassRef, builtins},
};

/// Nesting limit for generated checks.
pub const MAX_CODEGEN_DEPTH: usize = 100;

/// Generates checks for hints declared in one scope.
#[derive(Debug)]
pub struct CodeGenerator<'a> {
    ctx: &'a ReduceContext,
}

impl<'a> CodeGenerator<'a> {
    #[must_use]
    pub fn new(ctx: &'a ReduceContext) -> Self {
        Self { ctx }
    }

    /// Generates the check of `pith` against `classified`, binding what it needs in `scope`.
    pub fn generate_check(&self, classified: &ClassifiedHint, pith: &PithName, scope: &mut Scope) -> HintResult<CheckNode> {
        self.generate(classified, pith, self.ctx, scope, 0)
    }

    fn exhaustive(&self) -> bool {
        self.ctx.conf().strategy == CheckStrategy::On
    }

    /// Classifies and generates a child hint under a fresh pith.
    fn child(&self, hint: &Hint, ctx: &ReduceContext, scope: &mut Scope, depth: usize) -> HintResult<CheckNode> {
        let nested = ctx.nested();
        let classified = classify_hint(hint, &nested)?;
        let pith = scope.next_pith();
        self.generate(&classified, &pith, &nested, scope, depth + 1)
    }

    /// Like [`Self::child`], but `None` for an ignorable child.
    fn optional_child(
        &self,
        hint: &Hint,
        ctx: &ReduceContext,
        scope: &mut Scope,
        depth: usize,
    ) -> HintResult<Option<Box<CheckNode>>> {
        let node = self.child(hint, ctx, scope, depth)?;
        Ok((!node.is_pass()).then(|| Box::new(node)))
    }

    /// Classifies and generates a hint checked against the same pith.
    fn same_pith(
        &self,
        hint: &Hint,
        pith: &PithName,
        ctx: &ReduceContext,
        scope: &mut Scope,
        depth: usize,
    ) -> HintResult<CheckNode> {
        let nested = ctx.nested();
        let classified = classify_hint(hint, &nested)?;
        self.generate(&classified, pith, &nested, scope, depth + 1)
    }

    /// Builtins are spelled inline; other classes go through the scope.
    fn class_expr(class: &ClassRef, scope: &mut Scope) -> ClassExpr {
        if builtins().is_inlineable(class) {
            ClassExpr::Inline(class.clone())
        } else {
            ClassExpr::Bound {
                key: scope.bind_class(class),
                class: class.clone(),
            }
        }
    }

    /// The `isinstance` operands for `class`, widened by the numeric tower when enabled.
    fn origin_exprs(&self, class: &ClassRef, scope: &mut Scope) -> Vec<ClassExpr> {
        let b = builtins();
        let classes: Vec<&ClassRef> = if self.ctx.conf().is_pep484_tower && *class == b.float {
            vec![&b.float, &b.int]
        } else if self.ctx.conf().is_pep484_tower && *class == b.complex {
            vec![&b.complex, &b.float, &b.int]
        } else {
            vec![class]
        };
        classes.into_iter().map(|c| Self::class_expr(c, scope)).collect()
    }

    fn origin(classified: &ClassifiedHint) -> HintResult<ClassRef> {
        classified
            .origin
            .clone()
            .ok_or_else(|| HintError::unsupported(classified.hint.repr()))
    }

    fn generate(
        &self,
        classified: &ClassifiedHint,
        pith: &PithName,
        ctx: &ReduceContext,
        scope: &mut Scope,
        depth: usize,
    ) -> HintResult<CheckNode> {
        if depth > MAX_CODEGEN_DEPTH {
            return Err(HintError::CodeGenRecursion {
                repr: classified.hint.repr(),
                limit: MAX_CODEGEN_DEPTH,
            });
        }
        let repr = classified.hint.repr();
        let node = |kind| CheckNode::new(pith.clone(), repr.clone(), kind);

        let kind = match classified.strategy().emit {
            Emit::Pass => NodeKind::Pass,
            Emit::Fail => NodeKind::Fail,
            Emit::IsInstance | Emit::OriginOnly => {
                NodeKind::IsInstance(self.origin_exprs(&Self::origin(classified)?, scope))
            }
            Emit::Union => return self.generate_union(classified, pith, ctx, scope, depth),
            Emit::Literal => {
                let SignData::Literals(values) = &classified.data else {
                    return Err(HintError::malformed(repr.clone(), "literal without values"));
                };
                NodeKind::Literal(
                    values
                        .iter()
                        .map(|value| LiteralExpr {
                            key: matches!(value, Object::Instance(_)).then(|| scope.bind_literal(value)),
                            value: value.clone(),
                        })
                        .collect(),
                )
            }
            Emit::Validators => {
                let SignData::Annotated { validators, inner } = &classified.data else {
                    return Err(HintError::unsupported(repr.clone()));
                };
                let child = self.generate(inner, pith, ctx, scope, depth + 1)?;
                NodeKind::Validators {
                    child: Box::new(child),
                    validators: validators
                        .iter()
                        .map(|v| ValidatorExpr {
                            key: scope.bind_validator(v),
                            validator: v.clone(),
                        })
                        .collect(),
                }
            }
            Emit::TupleFixed => {
                let origin = self.origin_exprs(&Self::origin(classified)?, scope);
                let mut items = Vec::new();
                for (index, hint) in classified.children.iter().enumerate() {
                    let item = self.child(hint, ctx, scope, depth)?;
                    if !item.is_pass() {
                        items.push((index, item));
                    }
                }
                NodeKind::TupleFixed {
                    origin,
                    len: classified.children.len(),
                    items,
                }
            }
            Emit::Sequence | Emit::Reiterable | Emit::Mapping => self.generate_container(classified, ctx, scope, depth)?,
            Emit::IsSubclass => {
                let type_check = node(NodeKind::IsInstance(vec![Self::class_expr(&builtins().type_, scope)]));
                let targets = match classified.children.first() {
                    Some(target) => self.subclass_targets(target, pith, ctx, scope)?,
                    None => Vec::new(),
                };
                if targets.is_empty() {
                    return Ok(type_check);
                }
                let any = node(NodeKind::Any(targets));
                NodeKind::All(vec![type_check, any])
            }
            Emit::Generic => return self.generate_generic(classified, pith, ctx, scope, depth),
            Emit::ForwardRef => {
                let proxy = ForwardRef::from_hint(&classified.hint, ctx)
                    .ok_or_else(|| HintError::unsupported(repr.clone()))?;
                let (key, proxy) = scope.bind_forward_ref(proxy, forward_module(&classified.hint, ctx));
                NodeKind::ForwardInstance(ForwardExpr { key, proxy })
            }
            Emit::TypedDict => {
                let SignData::TypedDict { required } = &classified.data else {
                    return Err(HintError::unsupported(repr.clone()));
                };
                NodeKind::TypedDict {
                    origin: vec![Self::class_expr(&builtins().dict, scope)],
                    required: required.clone(),
                }
            }
            Emit::Reduced => return Err(HintError::unsupported(repr.clone())),
        };
        Ok(node(kind))
    }

    /// Origin check plus item checks, shaped by the sign's container category.
    fn generate_container(
        &self,
        classified: &ClassifiedHint,
        ctx: &ReduceContext,
        scope: &mut Scope,
        depth: usize,
    ) -> HintResult<NodeKind> {
        let origin = self.origin_exprs(&Self::origin(classified)?, scope);
        let exhaustive = self.exhaustive();
        let sign = classified.sign;
        if sign.is_in(SignCategory::Mapping) {
            let (key, value) = match classified.children.as_slice() {
                [k, v] => (
                    self.optional_child(k, ctx, scope, depth)?,
                    self.optional_child(v, ctx, scope, depth)?,
                ),
                _ => (None, None),
            };
            if key.is_none() && value.is_none() {
                return Ok(NodeKind::IsInstance(origin));
            }
            return Ok(NodeKind::Mapping {
                origin,
                key,
                value,
                exhaustive,
            });
        }
        if !sign.is_in(SignCategory::SingleArgContainer) {
            return Err(HintError::unsupported(classified.hint.repr()));
        }
        let item = match classified.children.first() {
            Some(item_hint) => self.optional_child(item_hint, ctx, scope, depth)?,
            None => None,
        };
        let Some(item) = item else {
            return Ok(NodeKind::IsInstance(origin));
        };
        Ok(if sign.is_in(SignCategory::Sequence) {
            NodeKind::Sequence {
                origin,
                item,
                exhaustive,
            }
        } else {
            NodeKind::Reiterable {
                origin,
                item,
                exhaustive,
            }
        })
    }

    /// Members in declared order; consecutive identical members collapse and
    /// adjacent plain class members merge into one `isinstance` tuple.
    fn generate_union(
        &self,
        classified: &ClassifiedHint,
        pith: &PithName,
        ctx: &ReduceContext,
        scope: &mut Scope,
        depth: usize,
    ) -> HintResult<CheckNode> {
        let mut members: Vec<CheckNode> = Vec::new();
        let mut previous: Option<&Hint> = None;
        for hint in &classified.children {
            if previous.is_some_and(|p| p == hint) {
                continue;
            }
            previous = Some(hint);
            let member = self.same_pith(hint, pith, ctx, scope, depth)?;
            if member.is_pass() {
                return Ok(member);
            }
            if let NodeKind::IsInstance(more) = &member.kind
                && let Some(CheckNode {
                    kind: NodeKind::IsInstance(classes),
                    ..
                }) = members.last_mut()
            {
                for class in more {
                    if !classes.iter().any(|c| c.class() == class.class()) {
                        classes.push(class.clone());
                    }
                }
                continue;
            }
            members.push(member);
        }
        let repr = classified.hint.repr();
        Ok(match members.len() {
            1 => {
                let only = members.pop().unwrap_or_else(|| CheckNode::new(pith.clone(), "", NodeKind::Fail));
                CheckNode::new(pith.clone(), repr, only.kind)
            }
            _ => CheckNode::new(pith.clone(), repr, NodeKind::Any(members)),
        })
    }

    /// `issubclass` operands for the argument of `type[...]`.
    fn subclass_targets(
        &self,
        target: &Hint,
        pith: &PithName,
        ctx: &ReduceContext,
        scope: &mut Scope,
    ) -> HintResult<Vec<CheckNode>> {
        let nested = ctx.nested();
        let classified = classify_hint(target, &nested)?;
        let repr = classified.hint.repr();
        let node = |kind| CheckNode::new(pith.clone(), repr.clone(), kind);
        Ok(match classified.sign {
            HintSign::Ignorable => Vec::new(),
            HintSign::Union => {
                let mut targets = Vec::new();
                for member in &classified.children {
                    targets.extend(self.subclass_targets(member, pith, &nested, scope)?);
                }
                targets
            }
            HintSign::ForwardRef => {
                let proxy = ForwardRef::from_hint(&classified.hint, &nested)
                    .ok_or_else(|| HintError::unsupported(repr.clone()))?;
                let (key, proxy) = scope.bind_forward_ref(proxy, forward_module(&classified.hint, &nested));
                vec![node(NodeKind::ForwardSubclass(ForwardExpr { key, proxy }))]
            }
            _ => match &classified.origin {
                Some(origin) => vec![node(NodeKind::IsSubclass(vec![Self::class_expr(origin, scope)]))],
                None => Vec::new(),
            },
        })
    }

    /// `isinstance` against the generic's class, then its subscripted bases and
    /// the fields whose annotations mention a substituted type parameter.
    fn generate_generic(
        &self,
        classified: &ClassifiedHint,
        pith: &PithName,
        ctx: &ReduceContext,
        scope: &mut Scope,
        depth: usize,
    ) -> HintResult<CheckNode> {
        let SignData::Generic {
            class,
            substitutions,
            supers,
        } = &classified.data
        else {
            return Err(HintError::unsupported(classified.hint.repr()));
        };
        let repr = classified.hint.repr();
        let mut parts = vec![CheckNode::new(
            pith.clone(),
            repr.clone(),
            NodeKind::IsInstance(vec![Self::class_expr(class, scope)]),
        )];
        let bound = ctx.with_substitutions(substitutions.iter().cloned());
        for base in supers {
            let check = self.same_pith(base, pith, &bound, scope, depth)?;
            if !check.is_pass() {
                parts.push(check);
            }
        }
        if !substitutions.is_empty() {
            for (name, annotation) in class.all_annotations() {
                let mut vars = Vec::new();
                annotation.collect_type_vars(&mut vars);
                if !vars.iter().any(|v| substitutions.iter().any(|(tv, _)| Hint::ptr_eq(tv, v))) {
                    continue;
                }
                let field = self.child(&annotation, &bound, scope, depth)?;
                if !field.is_pass() {
                    parts.push(CheckNode::new(
                        pith.clone(),
                        repr.clone(),
                        NodeKind::Attr {
                            name,
                            child: Box::new(field),
                        },
                    ));
                }
            }
        }
        Ok(match parts.len() {
            1 => parts.remove(0),
            _ => CheckNode::new(pith.clone(), repr, NodeKind::All(parts)),
        })
    }
}

/// The module a forward reference resolves in, for proxy deduplication.
fn forward_module<'h>(hint: &'h Hint, ctx: &'h ReduceContext) -> Option<&'h str> {
    match hint.kind() {
        HintKind::ForwardRef(fwd) => fwd.module.as_deref().or_else(|| ctx.scope_module()),
        _ => ctx.scope_module(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{conf::CheckConf, hint::hints};

    fn generate(hint: &Hint) -> CheckNode {
        let ctx = ReduceContext::new(&CheckConf::new());
        let classified = classify_hint(hint, &ctx).unwrap();
        CodeGenerator::new(&ctx)
            .generate_check(&classified, &PithName::param("x"), &mut Scope::new())
            .unwrap()
    }

    #[test]
    fn union_of_classes_merges_into_one_isinstance() {
        let node = generate(&hints::union(&[hints::int(), hints::str(), hints::int()]));
        assert_eq!(render_check(&node), "isinstance(x, (int, str))");
    }

    #[test]
    fn sequence_binds_sampled_item() {
        let node = generate(&hints::list(hints::int()));
        assert_eq!(
            render_check(&node),
            "(isinstance(x, list) and (not x or isinstance((__hg_pith_0 := x[__hg_random % len(x)]), int)))"
        );
        assert_eq!(node.check(&Object::from(vec![1, 2]), &Frame { random: 7 }), Ok(true));
    }
}
