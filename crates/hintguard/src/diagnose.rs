//! Explaining a failed check.
//!
//! The diagnoser re-walks the predicate tree of a failed check with the same
//! [`Frame`], so it follows the same sampled items as the failing call, and
//! reports the innermost failing sub-value with a path from the root
//! (`[2]`, ` key`, `['a']`, `.field`).

use crate::{
    codegen::{CheckNode, ClassExpr, Frame, NodeKind, sample_index},
    conf::CheckConf,
    error::{ForwardRefError, Violation, ViolationSite},
    object::Object,
    types,
};

/// Longest value repr quoted in a message before it is truncated.
pub const MAX_REPR_LEN: usize = 80;

/// The innermost failure found under a root value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Path from the root value, empty when the root itself failed.
    pub path: String,
    pub type_name: String,
    pub value_repr: String,
    pub reason: String,
}

impl Failure {
    fn new(path: &str, value: &Object, reason: String) -> Self {
        Self {
            path: path.to_owned(),
            type_name: value.type_name(),
            value_repr: truncate_repr(value.repr()),
            reason,
        }
    }

    /// Renders the failure, labelling a nested path with `root`.
    #[must_use]
    pub fn describe(&self, root: &str) -> String {
        if self.path.is_empty() {
            format!("{} {} {}", self.type_name, self.value_repr, self.reason)
        } else {
            format!("{root}{} {} {} {}", self.path, self.type_name, self.value_repr, self.reason)
        }
    }
}

/// Finds the innermost failure of `value` against `node`.
///
/// Returns `Ok(None)` if the check actually passes.
pub fn diagnose(node: &CheckNode, value: &Object, frame: &Frame) -> Result<Option<Failure>, ForwardRefError> {
    let mut path = String::new();
    find(node, value, frame, &mut path)
}

/// Builds the violation for a value that failed `node` at `site`.
pub(crate) fn violation(
    function: &str,
    site: ViolationSite,
    node: &CheckNode,
    value: &Object,
    frame: &Frame,
    conf: &CheckConf,
) -> Violation {
    let root = match &site {
        ViolationSite::Param(name) => name.clone(),
        ViolationSite::Return => "return".to_owned(),
        ViolationSite::Value => "value".to_owned(),
    };
    let cause = match diagnose(node, value, frame) {
        Ok(Some(failure)) => failure.describe(&root),
        Ok(None) | Err(_) => Failure::new("", value, format!("not instance of {}", node.hint)).describe(&root),
    };
    tracing::debug!(function, site = %site, hint = %node.hint, cause, "type-check violation");
    let violation = Violation::new(
        function.to_owned(),
        site,
        node.hint.clone(),
        value.type_name(),
        truncate_repr(value.repr()),
        cause,
    );
    if conf.use_color() { violation.colorized() } else { violation }
}

fn truncate_repr(repr: String) -> String {
    if repr.chars().count() <= MAX_REPR_LEN {
        return repr;
    }
    let mut short: String = repr.chars().take(MAX_REPR_LEN - 3).collect();
    short.push_str("...");
    short
}

fn class_names(classes: &[ClassExpr]) -> String {
    classes.iter().map(|c| c.class().name()).collect::<Vec<_>>().join(" or ")
}

fn fail(path: &str, value: &Object, reason: String) -> Result<Option<Failure>, ForwardRefError> {
    Ok(Some(Failure::new(path, value, reason)))
}

/// Recurses into `child` with `segment` appended to the path.
fn descend(
    child: &CheckNode,
    value: &Object,
    frame: &Frame,
    path: &mut String,
    segment: &str,
) -> Result<Option<Failure>, ForwardRefError> {
    let len = path.len();
    path.push_str(segment);
    let found = find(child, value, frame, path);
    path.truncate(len);
    found
}

fn find(node: &CheckNode, value: &Object, frame: &Frame, path: &mut String) -> Result<Option<Failure>, ForwardRefError> {
    if node.check(value, frame)? {
        return Ok(None);
    }
    let not_instance = |origin: &[ClassExpr]| format!("not instance of {}", class_names(origin));

    match &node.kind {
        NodeKind::Pass => Ok(None),
        NodeKind::Fail => fail(path, value, format!("returned despite {}", node.hint)),
        NodeKind::IsInstance(classes) => fail(path, value, not_instance(classes)),
        NodeKind::IsSubclass(classes) => fail(path, value, format!("not subclass of {}", class_names(classes))),
        NodeKind::ForwardInstance(fwd) => fail(path, value, format!("not instance of {}", fwd.proxy.name())),
        NodeKind::ForwardSubclass(fwd) => fail(path, value, format!("not subclass of {}", fwd.proxy.name())),
        NodeKind::Any(members) => {
            // A member whose origin matches explains the failure better than the union.
            for member in members {
                if origin_matches(member, value, frame)
                    && let Some(failure) = find(member, value, frame, path)?
                {
                    return Ok(Some(failure));
                }
            }
            fail(path, value, format!("matches no member of {}", node.hint))
        }
        NodeKind::All(parts) => {
            for part in parts {
                if let Some(failure) = find(part, value, frame, path)? {
                    return Ok(Some(failure));
                }
            }
            fail(path, value, format!("not instance of {}", node.hint))
        }
        NodeKind::Sequence {
            origin,
            item,
            exhaustive,
        } => {
            if !is_origin(value, origin) {
                return fail(path, value, not_instance(origin));
            }
            let items = value.items();
            let indices: Vec<usize> = if *exhaustive {
                (0..items.len()).collect()
            } else if items.is_empty() {
                Vec::new()
            } else {
                vec![sample_index(frame.random, items.len())]
            };
            for index in indices {
                if let Some(failure) = descend(item, &items[index], frame, path, &format!("[{index}]"))? {
                    return Ok(Some(failure));
                }
            }
            Ok(None)
        }
        NodeKind::Reiterable { origin, item, .. } => {
            if !is_origin(value, origin) {
                return fail(path, value, not_instance(origin));
            }
            for (index, element) in value.items().iter().enumerate() {
                if let Some(failure) = descend(item, element, frame, path, &format!(" item {index}"))? {
                    return Ok(Some(failure));
                }
            }
            Ok(None)
        }
        NodeKind::Mapping { origin, key, value: val, .. } => {
            if !is_origin(value, origin) {
                return fail(path, value, not_instance(origin));
            }
            for (k, v) in value.pairs().unwrap_or_default() {
                if let Some(key) = key
                    && let Some(failure) = descend(key, k, frame, path, " key")?
                {
                    return Ok(Some(failure));
                }
                if let Some(val) = val
                    && let Some(failure) = descend(val, v, frame, path, &format!("[{}]", k.repr()))?
                {
                    return Ok(Some(failure));
                }
            }
            Ok(None)
        }
        NodeKind::TupleFixed { origin, len, items } => {
            if !is_origin(value, origin) {
                return fail(path, value, not_instance(origin));
            }
            let actual = value.len().unwrap_or_default();
            if actual != *len {
                return fail(path, value, format!("length {actual} not {len}"));
            }
            for (index, item) in items {
                if let Some(element) = value.item_at(*index)
                    && let Some(failure) = descend(item, &element, frame, path, &format!("[{index}]"))?
                {
                    return Ok(Some(failure));
                }
            }
            Ok(None)
        }
        NodeKind::Literal(_) => fail(path, value, format!("not in {}", node.hint)),
        NodeKind::Validators { child, validators } => {
            if let Some(failure) = find(child, value, frame, path)? {
                return Ok(Some(failure));
            }
            match validators.iter().find(|v| !v.validator.check(value)) {
                Some(v) => fail(path, value, format!("violates validator {}", v.validator.repr())),
                None => Ok(None),
            }
        }
        NodeKind::Attr { name, child } => match value.get_attr(name) {
            Some(attr) => descend(child, &attr, frame, path, &format!(".{name}")),
            None => Ok(None),
        },
        NodeKind::TypedDict { origin, required } => {
            if !is_origin(value, origin) {
                return fail(path, value, not_instance(origin));
            }
            match required.iter().find(|key| !value.contains_key(key)) {
                Some(key) => fail(path, value, format!("missing required key '{key}'")),
                None => Ok(None),
            }
        }
    }
}

fn is_origin(value: &Object, origin: &[ClassExpr]) -> bool {
    origin.iter().any(|c| types::is_instance(value, c.class()))
}

/// True if `value` gets past the outermost test of `node`, so its failure lies deeper.
fn origin_matches(node: &CheckNode, value: &Object, frame: &Frame) -> bool {
    match &node.kind {
        NodeKind::Sequence { origin, .. }
        | NodeKind::Reiterable { origin, .. }
        | NodeKind::Mapping { origin, .. }
        | NodeKind::TupleFixed { origin, .. }
        | NodeKind::TypedDict { origin, .. } => is_origin(value, origin),
        NodeKind::Validators { child, .. } => {
            child.check(value, frame).unwrap_or(false) || origin_matches(child, value, frame)
        }
        NodeKind::All(parts) => parts.first().is_some_and(|p| p.check(value, frame).unwrap_or(false)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_reprs_are_truncated() {
        let short = truncate_repr("x".repeat(200));
        assert_eq!(short.chars().count(), MAX_REPR_LEN);
        assert!(short.ends_with("..."));
    }
}
