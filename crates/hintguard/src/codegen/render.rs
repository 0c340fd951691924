//! Rendering a predicate tree as a Python boolean expression.
//!
//! The first reference to a child pith assigns it with `:=`; later references
//! reuse the name. The first reference always sits in the leftmost operand of
//! its conjunction, so it is evaluated before any reuse.

use std::fmt::Write;

use crate::{
    codegen::{
        node::{CheckNode, ClassExpr, NodeKind},
        scope::RANDOM_NAME,
    },
    object::Object,
};

/// A pith name plus the expression it is bound to on first use.
struct Pith<'a> {
    name: &'a str,
    pending: Option<String>,
}

impl<'a> Pith<'a> {
    fn bound(name: &'a str) -> Self {
        Self { name, pending: None }
    }

    fn from(name: &'a str, expr: String) -> Self {
        Self {
            name,
            pending: Some(expr),
        }
    }

    fn take(&mut self) -> String {
        match self.pending.take() {
            Some(expr) => format!("({} := {expr})", self.name),
            None => self.name.to_owned(),
        }
    }
}

/// Renders the check of an already bound root pith.
#[must_use]
pub fn render_check(node: &CheckNode) -> String {
    render(node, &mut Pith::bound(node.pith.as_str()))
}

fn classes(exprs: &[ClassExpr]) -> String {
    let names: Vec<String> = exprs
        .iter()
        .map(|c| match c {
            ClassExpr::Inline(class) => class.name().to_owned(),
            ClassExpr::Bound { key, .. } => key.to_string(),
        })
        .collect();
    match names.as_slice() {
        [single] => single.clone(),
        _ => format!("({})", names.join(", ")),
    }
}

fn join(parts: Vec<String>, op: &str) -> String {
    match parts.len() {
        0 if op == "or" => "False".to_owned(),
        0 => "True".to_owned(),
        1 => parts.into_iter().next().unwrap_or_default(),
        _ => format!("({})", parts.join(&format!(" {op} "))),
    }
}

fn render(node: &CheckNode, pith: &mut Pith<'_>) -> String {
    match &node.kind {
        NodeKind::Pass => "True".to_owned(),
        NodeKind::Fail => "False".to_owned(),
        NodeKind::IsInstance(exprs) => format!("isinstance({}, {})", pith.take(), classes(exprs)),
        NodeKind::IsSubclass(exprs) => format!("issubclass({}, {})", pith.take(), classes(exprs)),
        NodeKind::ForwardInstance(fwd) => format!("{}.is_instance({})", fwd.key, pith.take()),
        NodeKind::ForwardSubclass(fwd) => format!("{}.is_subclass({})", fwd.key, pith.take()),
        NodeKind::Any(members) => join(members.iter().map(|m| render(m, pith)).collect(), "or"),
        NodeKind::All(parts) => join(parts.iter().map(|p| render(p, pith)).collect(), "and"),
        NodeKind::Sequence {
            origin,
            item,
            exhaustive,
        } => {
            let head = format!("isinstance({}, {})", pith.take(), classes(origin));
            let p = pith.name;
            if *exhaustive {
                let check = render(item, &mut Pith::bound(item.pith.as_str()));
                format!("({head} and all({check} for {} in {p}))", item.pith)
            } else {
                let expr = format!("{p}[{RANDOM_NAME} % len({p})]");
                let check = render(item, &mut Pith::from(item.pith.as_str(), expr));
                format!("({head} and (not {p} or {check}))")
            }
        }
        NodeKind::Reiterable {
            origin,
            item,
            exhaustive,
        } => {
            let head = format!("isinstance({}, {})", pith.take(), classes(origin));
            let p = pith.name;
            if *exhaustive {
                let check = render(item, &mut Pith::bound(item.pith.as_str()));
                format!("({head} and all({check} for {} in {p}))", item.pith)
            } else {
                let check = render(item, &mut Pith::from(item.pith.as_str(), format!("next(iter({p}))")));
                format!("({head} and (not {p} or {check}))")
            }
        }
        NodeKind::Mapping {
            origin,
            key,
            value,
            exhaustive,
        } => {
            let head = format!("isinstance({}, {})", pith.take(), classes(origin));
            let p = pith.name;
            if *exhaustive {
                let parts = key
                    .iter()
                    .chain(value.iter())
                    .map(|child| render(child, &mut Pith::bound(child.pith.as_str())))
                    .collect();
                let target = match (key, value) {
                    (Some(k), Some(v)) => format!("{}, {} in {p}.items()", k.pith, v.pith),
                    (Some(k), None) => format!("{} in {p}", k.pith),
                    (None, Some(v)) => format!("{} in {p}.values()", v.pith),
                    (None, None) => return head,
                };
                format!("({head} and all({} for {target}))", join(parts, "and"))
            } else {
                let mut parts = Vec::new();
                if let Some(k) = key {
                    parts.push(render(k, &mut Pith::from(k.pith.as_str(), format!("next(iter({p}))"))));
                }
                if let Some(v) = value {
                    let expr = match key {
                        Some(k) => format!("{p}[{}]", k.pith),
                        None => format!("next(iter({p}.values()))"),
                    };
                    parts.push(render(v, &mut Pith::from(v.pith.as_str(), expr)));
                }
                if parts.is_empty() {
                    return head;
                }
                format!("({head} and (not {p} or {}))", join(parts, "and"))
            }
        }
        NodeKind::TupleFixed { origin, len, items } => {
            let mut out = format!("(isinstance({}, {}) and len({}) == {len}", pith.take(), classes(origin), pith.name);
            for (index, item) in items {
                let check = render(item, &mut Pith::from(item.pith.as_str(), format!("{}[{index}]", pith.name)));
                write!(out, " and {check}").expect("writing to a String cannot fail");
            }
            out.push(')');
            out
        }
        NodeKind::Literal(values) => {
            let parts = values
                .iter()
                .map(|lit| {
                    let p = pith.take();
                    match (&lit.key, &lit.value) {
                        (Some(key), _) => format!("{p} is {key}"),
                        (None, value @ (Object::None | Object::Bool(_))) => format!("{p} is {}", value.repr()),
                        (None, value @ Object::Int(_)) => format!(
                            "(isinstance({p}, int) and not isinstance({0}, bool) and {0} == {1})",
                            pith.name,
                            value.repr()
                        ),
                        (None, value) => format!(
                            "(isinstance({p}, {}) and {} == {})",
                            value.class().name(),
                            pith.name,
                            value.repr()
                        ),
                    }
                })
                .collect();
            join(parts, "or")
        }
        NodeKind::Validators { child, validators } => {
            let mut parts = Vec::with_capacity(validators.len() + 1);
            if !child.is_pass() {
                parts.push(render(child, pith));
            }
            for v in validators {
                parts.push(format!("{}({})", v.key, pith.take()));
            }
            join(parts, "and")
        }
        NodeKind::Attr { name, child } => {
            let p = pith.take();
            let check = render(child, &mut Pith::from(child.pith.as_str(), format!("getattr({}, '{name}')", pith.name)));
            format!("(not hasattr({p}, '{name}') or {check})")
        }
        NodeKind::TypedDict { origin, required } => {
            let mut out = format!("(isinstance({}, {})", pith.take(), classes(origin));
            for key in required {
                write!(out, " and '{key}' in {}", pith.name).expect("writing to a String cannot fail");
            }
            out.push(')');
            out
        }
    }
}
