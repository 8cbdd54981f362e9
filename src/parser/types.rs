//! Data types for the parser module

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::signature;

/// Errors that can occur during source parsing
#[derive(Error, Debug)]
pub enum ParserError {
    /// File extension is not `.java`
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),
    /// Tree-sitter failed to parse the file contents
    #[error("Failed to parse: {0}")]
    ParseFailed(String),
    /// File read error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An `import` line. `path` excludes the trailing `.*` of wildcard imports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Import {
    pub path: String,
    pub wildcard: bool,
}

/// A call made from a method body, matched against declarations by name and
/// argument count.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CallSite {
    pub name: String,
    pub arity: usize,
}

/// A named type declaration (class, interface, enum, record).
#[derive(Debug, Clone, Serialize)]
pub struct ClassDecl {
    /// `pkg.Outer.Inner`
    pub qualified_name: String,
    pub name: String,
    /// Superclass as written after `extends`, generics stripped
    pub superclass: Option<String>,
    pub line_start: u32,
}

/// A method or constructor declaration.
#[derive(Debug, Clone, Serialize)]
pub struct MethodDecl {
    /// Qualified name of the declaring class; `None` inside anonymous or
    /// local classes, which have no qualified name.
    pub class_name: Option<String>,
    pub name: String,
    /// Parameter types with whitespace removed, varargs as `T...`
    pub parameter_types: Vec<String>,
    /// Annotation names as written (`Test`, `org.junit.Test`)
    pub annotations: Vec<String>,
    pub is_constructor: bool,
    pub line_start: u32,
    pub line_end: u32,
    /// Declaration text, used to detect body changes
    #[serde(skip)]
    pub text: String,
    pub calls: Vec<CallSite>,
}

impl MethodDecl {
    /// Canonical signature; anonymous-class methods use an empty class part.
    pub fn signature(&self) -> String {
        signature::format(
            self.class_name.as_deref().unwrap_or(""),
            &self.name,
            &self.parameter_types,
        )
    }

    /// Declaration text with all whitespace removed.
    pub fn normalized_text(&self) -> String {
        signature::normalize_type(&self.text)
    }
}

/// Everything extracted from one `.java` file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JavaFile {
    pub path: PathBuf,
    pub package: Option<String>,
    pub imports: Vec<Import>,
    pub classes: Vec<ClassDecl>,
    pub methods: Vec<MethodDecl>,
}

impl JavaFile {
    /// Candidate qualified names for a type or annotation name used in this
    /// file.
    ///
    /// Qualified names resolve to themselves; an explicit single-type import
    /// wins outright. Otherwise the file's package and every wildcard import
    /// are candidates, in that order.
    pub fn resolve(&self, name: &str) -> Vec<String> {
        let name = strip_type_arguments(name);
        if name.contains('.') {
            return vec![name.to_string()];
        }

        if let Some(import) = self
            .imports
            .iter()
            .find(|i| !i.wildcard && i.path.rsplit('.').next() == Some(name))
        {
            return vec![import.path.clone()];
        }

        let mut out = Vec::with_capacity(1 + self.imports.len());
        out.push(match &self.package {
            Some(pkg) => format!("{pkg}.{name}"),
            None => name.to_string(),
        });
        out.extend(
            self.imports
                .iter()
                .filter(|i| i.wildcard)
                .map(|i| format!("{}.{}", i.path, name)),
        );
        out
    }
}

/// `Base<T>` -> `Base`, `java.util.List<String>` -> `java.util.List`.
pub fn strip_type_arguments(name: &str) -> &str {
    match name.find('<') {
        Some(i) => name[..i].trim(),
        None => name.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_with(package: Option<&str>, imports: &[(&str, bool)]) -> JavaFile {
        JavaFile {
            package: package.map(str::to_string),
            imports: imports
                .iter()
                .map(|(p, w)| Import {
                    path: p.to_string(),
                    wildcard: *w,
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn resolve_explicit_import() {
        let f = file_with(Some("com.acme"), &[("org.junit.Test", false)]);
        assert_eq!(f.resolve("Test"), vec!["org.junit.Test"]);
    }

    #[test]
    fn resolve_wildcard_and_package() {
        let f = file_with(Some("com.acme"), &[("org.junit.jupiter.api", true)]);
        assert_eq!(
            f.resolve("Test"),
            vec!["com.acme.Test", "org.junit.jupiter.api.Test"]
        );
    }

    #[test]
    fn resolve_qualified_and_generic() {
        let f = file_with(None, &[]);
        assert_eq!(f.resolve("org.junit.Test"), vec!["org.junit.Test"]);
        assert_eq!(f.resolve("Base<String>"), vec!["Base"]);
    }
}
