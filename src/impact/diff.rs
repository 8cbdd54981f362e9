//! Method-level changes between two parses of one file

use std::collections::HashMap;

use crate::parser::{JavaFile, MethodDecl};
use crate::signature::parameters_match;

use super::types::{ChangeKind, ChangeRecord};

/// Compare the baseline and working-tree parses of `file`.
///
/// `None` on either side means the file did not exist there. A method is
/// changed when its signature appears on one side only, or when its
/// declaration text differs ignoring whitespace. Methods of anonymous classes
/// are skipped; their text is part of the enclosing method.
pub fn changed_methods(
    file: &str,
    baseline: Option<&JavaFile>,
    current: Option<&JavaFile>,
) -> Vec<ChangeRecord> {
    fn declared(f: Option<&JavaFile>) -> Vec<&MethodDecl> {
        f.map(|f| f.methods.iter().filter(|m| m.class_name.is_some()).collect())
            .unwrap_or_default()
    }

    let before = declared(baseline);
    let after = declared(current);
    let before_by_name = by_name(&before);
    let after_by_name = by_name(&after);

    let mut out = Vec::new();
    for method in &after {
        let kind = match counterpart(method, &before_by_name) {
            None => ChangeKind::Added,
            Some(old) if old.normalized_text() != method.normalized_text() => ChangeKind::Modified,
            Some(_) => continue,
        };
        out.push(record(file, method, kind));
    }
    for method in &before {
        if counterpart(method, &after_by_name).is_none() {
            out.push(record(file, method, ChangeKind::Removed));
        }
    }
    out
}

type ByName<'a> = HashMap<(&'a str, &'a str), Vec<&'a MethodDecl>>;

/// Overloads grouped by declaring class and method name.
fn by_name<'a>(methods: &[&'a MethodDecl]) -> ByName<'a> {
    let mut map: ByName<'a> = HashMap::new();
    for method in methods {
        map.entry((method.class_name.as_deref().unwrap_or(""), method.name.as_str()))
            .or_default()
            .push(*method);
    }
    map
}

/// The declaration on the other side with the same class, name and
/// parameter list. Parameter types compare ignoring whitespace.
fn counterpart<'a>(method: &'a MethodDecl, others: &ByName<'a>) -> Option<&'a MethodDecl> {
    let key = (method.class_name.as_deref().unwrap_or(""), method.name.as_str());
    others
        .get(&key)?
        .iter()
        .copied()
        .find(|other| parameters_match(&other.parameter_types, &method.parameter_types))
}

fn record(file: &str, method: &MethodDecl, kind: ChangeKind) -> ChangeRecord {
    ChangeRecord {
        signature: method.signature(),
        class_qualified_name: method.class_name.clone().unwrap_or_default(),
        method_name: method.name.clone(),
        parameter_types: method.parameter_types.clone(),
        file: file.to_string(),
        kind,
    }
}
