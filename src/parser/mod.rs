//! Java source parsing with tree-sitter
//!
//! Split into submodules:
//! - `types`: data structures and error types
//! - `java`: declaration, annotation and call extraction

mod java;
pub mod types;

pub use types::{CallSite, ClassDecl, Import, JavaFile, MethodDecl, ParserError};

use std::path::Path;

/// Files larger than this are skipped rather than parsed.
const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Java parser
///
/// Cheap to share across threads: a tree-sitter parser is created per call.
///
/// # Example
///
/// ```no_run
/// use affected::Parser;
///
/// let parser = Parser::new()?;
/// let file = parser.parse_file(std::path::Path::new("src/test/java/CartTest.java"))?;
/// for method in &file.methods {
///     println!("{} {:?}", method.signature(), method.annotations);
/// }
/// # Ok::<(), anyhow::Error>(())
/// ```
pub struct Parser {
    language: tree_sitter::Language,
}

impl Parser {
    pub fn new() -> Result<Self, ParserError> {
        Ok(Self {
            language: tree_sitter_java::LANGUAGE.into(),
        })
    }

    /// Parse Java source text. `path` is recorded on the result only.
    pub fn parse_source(&self, source: &str, path: &Path) -> Result<JavaFile, ParserError> {
        let _span = tracing::debug_span!("parse_source", path = %path.display()).entered();

        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| ParserError::ParseFailed(format!("{:?}", e)))?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ParserError::ParseFailed(path.display().to_string()))?;

        if tree.root_node().has_error() {
            tracing::debug!(path = %path.display(), "Parse tree contains errors, extracting what parsed");
        }

        let out = JavaFile {
            path: path.to_path_buf(),
            ..Default::default()
        };
        Ok(java::Extractor::new(source, out).run(tree.root_node()))
    }

    /// Parse a `.java` file from disk.
    ///
    /// Non-UTF8 and oversized files yield an empty [`JavaFile`] with a warning.
    pub fn parse_file(&self, path: &Path) -> Result<JavaFile, ParserError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if ext != "java" {
            return Err(ParserError::UnsupportedFileType(ext.to_string()));
        }

        let meta = std::fs::metadata(path)?;
        if meta.len() > MAX_FILE_SIZE {
            tracing::warn!(
                "Skipping large file ({}MB > {}MB limit): {}",
                meta.len() / (1024 * 1024),
                MAX_FILE_SIZE / (1024 * 1024),
                path.display()
            );
            return Ok(JavaFile {
                path: path.to_path_buf(),
                ..Default::default()
            });
        }

        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                tracing::warn!("Skipping non-UTF8 file: {}", path.display());
                return Ok(JavaFile {
                    path: path.to_path_buf(),
                    ..Default::default()
                });
            }
            Err(e) => return Err(e.into()),
        };

        self.parse_source(&source.replace("\r\n", "\n"), path)
    }
}
