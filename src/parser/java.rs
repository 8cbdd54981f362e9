//! Declaration and call extraction from tree-sitter-java parse trees

use tree_sitter::Node;

use super::types::{CallSite, ClassDecl, Import, JavaFile, MethodDecl};
use crate::signature::normalize_type;

/// Node kinds that open a new named type scope.
const TYPE_DECLARATIONS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
];

const METHOD_DECLARATIONS: &[&str] = &[
    "method_declaration",
    "constructor_declaration",
    "compact_constructor_declaration",
];

/// Where a declaration sits, which decides whether it has a qualified name.
#[derive(Clone)]
enum Scope {
    TopLevel,
    Type(String),
    /// Inside a method body or an anonymous class
    Local,
}

pub(super) struct Extractor<'a> {
    src: &'a [u8],
    out: JavaFile,
}

impl<'a> Extractor<'a> {
    pub(super) fn new(src: &'a str, out: JavaFile) -> Self {
        Self {
            src: src.as_bytes(),
            out,
        }
    }

    pub(super) fn run(mut self, root: Node<'_>) -> JavaFile {
        for child in named_children(root) {
            match child.kind() {
                "package_declaration" => {
                    self.out.package = named_children(child)
                        .into_iter()
                        .find(|n| matches!(n.kind(), "identifier" | "scoped_identifier"))
                        .map(|n| self.text(n).to_string());
                }
                "import_declaration" => {
                    if let Some(import) = self.import(child) {
                        self.out.imports.push(import);
                    }
                }
                _ => self.visit(child, &Scope::TopLevel),
            }
        }
        self.out
    }

    fn text(&self, node: Node<'_>) -> &'a str {
        node.utf8_text(self.src).unwrap_or("")
    }

    fn import(&self, node: Node<'_>) -> Option<Import> {
        let mut path = None;
        let mut wildcard = false;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                // static imports name members, not types
                "static" => return None,
                "identifier" | "scoped_identifier" => path = Some(self.text(child).to_string()),
                "asterisk" => wildcard = true,
                _ => {}
            }
        }
        path.map(|path| Import { path, wildcard })
    }

    /// Walk declarations under `root` in source order. Expression trees can
    /// nest thousands of levels deep, so the walk keeps its own stack.
    fn visit(&mut self, root: Node<'_>, scope: &Scope) {
        let mut stack = vec![(root, scope.clone())];
        while let Some((node, scope)) = stack.pop() {
            let kind = node.kind();

            if TYPE_DECLARATIONS.contains(&kind) {
                let inner = self.type_declaration(node, &scope);
                if let Some(body) = node.child_by_field_name("body") {
                    for child in named_children(body).into_iter().rev() {
                        stack.push((child, inner.clone()));
                    }
                }
                continue;
            }

            if METHOD_DECLARATIONS.contains(&kind) {
                self.method_declaration(node, &scope);
                // Anything declared inside a body is local
                if let Some(body) = node.child_by_field_name("body") {
                    stack.push((body, Scope::Local));
                }
                continue;
            }

            let anonymous = kind == "object_creation_expression";
            for child in named_children(node).into_iter().rev() {
                let child_scope = if anonymous && child.kind() == "class_body" {
                    Scope::Local
                } else {
                    scope.clone()
                };
                stack.push((child, child_scope));
            }
        }
    }

    fn type_declaration(&mut self, node: Node<'_>, scope: &Scope) -> Scope {
        let Some(name) = node.child_by_field_name("name").map(|n| self.text(n)) else {
            return Scope::Local;
        };

        let qualified = match scope {
            Scope::TopLevel => Some(match &self.out.package {
                Some(pkg) => format!("{pkg}.{name}"),
                None => name.to_string(),
            }),
            Scope::Type(outer) => Some(format!("{outer}.{name}")),
            Scope::Local => None,
        };

        let Some(qualified_name) = qualified else {
            return Scope::Local;
        };

        let superclass = node
            .child_by_field_name("superclass")
            .and_then(|s| named_children(s).into_iter().next())
            .map(|t| super::types::strip_type_arguments(self.text(t)).to_string());

        self.out.classes.push(ClassDecl {
            qualified_name: qualified_name.clone(),
            name: name.to_string(),
            superclass,
            line_start: node.start_position().row as u32 + 1,
        });

        Scope::Type(qualified_name)
    }

    fn method_declaration(&mut self, node: Node<'_>, scope: &Scope) {
        let Some(name) = node.child_by_field_name("name").map(|n| self.text(n)) else {
            return;
        };

        let class_name = match scope {
            Scope::Type(q) => Some(q.clone()),
            _ => None,
        };

        let parameter_types = node
            .child_by_field_name("parameters")
            .map(|p| self.parameter_types(p))
            .unwrap_or_default();

        let annotations = named_children(node)
            .into_iter()
            .find(|n| n.kind() == "modifiers")
            .map(|m| self.annotations(m))
            .unwrap_or_default();

        let calls = node
            .child_by_field_name("body")
            .map(|b| self.calls(b))
            .unwrap_or_default();

        self.out.methods.push(MethodDecl {
            class_name,
            name: name.to_string(),
            parameter_types,
            annotations,
            is_constructor: node.kind() != "method_declaration",
            line_start: node.start_position().row as u32 + 1,
            line_end: node.end_position().row as u32 + 1,
            text: self.text(node).to_string(),
            calls,
        });
    }

    fn parameter_types(&self, params: Node<'_>) -> Vec<String> {
        let mut out = Vec::new();
        for param in named_children(params) {
            match param.kind() {
                "formal_parameter" => {
                    if let Some(ty) = param.child_by_field_name("type") {
                        out.push(normalize_type(self.text(ty)));
                    }
                }
                "spread_parameter" => {
                    let ty = named_children(param).into_iter().find(|n| {
                        !matches!(
                            n.kind(),
                            "modifiers" | "variable_declarator" | "marker_annotation" | "annotation"
                        )
                    });
                    if let Some(ty) = ty {
                        out.push(format!("{}...", normalize_type(self.text(ty))));
                    }
                }
                // receiver parameters (`Foo this`) are not part of the signature
                _ => {}
            }
        }
        out
    }

    fn annotations(&self, modifiers: Node<'_>) -> Vec<String> {
        named_children(modifiers)
            .into_iter()
            .filter(|n| matches!(n.kind(), "marker_annotation" | "annotation"))
            .filter_map(|n| n.child_by_field_name("name"))
            .map(|n| self.text(n).to_string())
            .collect()
    }

    /// Calls made in a body. Nested named types own their calls; anonymous
    /// class bodies are attributed to the enclosing method.
    fn calls(&self, body: Node<'_>) -> Vec<CallSite> {
        let mut calls = Vec::new();
        let mut stack = vec![body];
        while let Some(node) = stack.pop() {
            match node.kind() {
                k if TYPE_DECLARATIONS.contains(&k) => continue,
                "method_invocation" => {
                    if let Some(name) = node.child_by_field_name("name") {
                        calls.push(CallSite {
                            name: self.text(name).to_string(),
                            arity: arity(node),
                        });
                    }
                }
                "object_creation_expression" => {
                    if let Some(ty) = node.child_by_field_name("type") {
                        let ty = super::types::strip_type_arguments(self.text(ty));
                        let simple = ty.rsplit('.').next().unwrap_or(ty);
                        calls.push(CallSite {
                            name: simple.to_string(),
                            arity: arity(node),
                        });
                    }
                }
                _ => {}
            }
            stack.extend(named_children(node).into_iter().rev());
        }

        let mut seen = std::collections::HashSet::new();
        calls.retain(|c| seen.insert(c.clone()));
        calls
    }
}

fn arity(call: Node<'_>) -> usize {
    call.child_by_field_name("arguments")
        .map(|a| a.named_child_count())
        .unwrap_or(0)
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}
