//! Canonical method signatures
//!
//! A signature is `Class.method(T1,T2,...)`. It is the key shared by changed
//! method records and selectable test methods, so every helper here has to
//! agree with [`format`] on where the class, name and parameter list live.
//!
//! Generic parameter types keep their commas: `Map<String,Integer>` is one
//! parameter, not two.

use std::path::Path;

/// Build `className.methodName(T1,T2)`. No trailing separator; an empty
/// parameter list yields `()`.
pub fn format<S: AsRef<str>>(class_name: &str, method_name: &str, parameter_types: &[S]) -> String {
    let mut sig = String::with_capacity(class_name.len() + method_name.len() + 16);
    sig.push_str(class_name);
    sig.push('.');
    sig.push_str(method_name);
    sig.push('(');
    for (i, ty) in parameter_types.iter().enumerate() {
        if i > 0 {
            sig.push(',');
        }
        sig.push_str(ty.as_ref());
    }
    sig.push(')');
    sig
}

/// Extract the method name: the text between the last `.` before the first
/// `(` and that `(`.
///
/// Inputs that do not look like a signature (no `(`, or no `.` ahead of it)
/// come back unchanged, so callers can pass arbitrary strings through.
pub fn extract_method_name(signature: &str) -> &str {
    let Some(open) = signature.find('(') else {
        return signature;
    };
    match signature[..open].rfind('.') {
        Some(dot) => &signature[dot + 1..open],
        None => signature,
    }
}

/// Extract the ordered parameter types between the first `(` and the
/// following `)`, splitting on top-level commas only.
///
/// Returns an empty list when `(` or `)` is missing or `)` comes first.
pub fn extract_parameter_types(signature: &str) -> Vec<String> {
    let (Some(open), Some(close)) = (signature.find('('), signature.find(')')) else {
        return Vec::new();
    };
    if open >= close {
        return Vec::new();
    }

    let params = &signature[open + 1..close];
    if params.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut current = String::new();
    let mut angle_depth: i32 = 0;

    for ch in params.chars() {
        match ch {
            '<' => angle_depth += 1,
            '>' => angle_depth -= 1,
            ',' if angle_depth == 0 => {
                out.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }

    if !current.is_empty() {
        out.push(current.trim().to_string());
    }

    out
}

/// Class part of a signature: everything before the last `.` of the
/// qualified method name. Empty when there is no `.`.
///
/// Dots inside the parameter list (qualified parameter types) are ignored.
pub fn extract_class_name(signature: &str) -> &str {
    let head = match signature.find('(') {
        Some(open) => &signature[..open],
        None => signature,
    };
    match head.rfind('.') {
        Some(dot) => &head[..dot],
        None => "",
    }
}

/// Remove all whitespace, the form parameter types are compared in.
pub fn normalize_type(ty: &str) -> String {
    ty.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Whitespace-insensitive comparison of two ordered parameter lists.
///
/// `List<String>` matches `List< String >`; order and arity must agree.
pub fn parameters_match<A: AsRef<str>, B: AsRef<str>>(left: &[A], right: &[B]) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .zip(right)
            .all(|(a, b)| normalize_type(a.as_ref()) == normalize_type(b.as_ref()))
}

/// Simple class name from a source path: `src/main/java/a/Foo.java` -> `Foo`.
pub fn class_name_from_path(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|s| s.to_str())
}

/// Path of `file` relative to `root`, `/`-separated. Falls back to the full
/// path when `file` is outside `root`.
pub fn relative_path(file: &Path, root: &Path) -> String {
    file.strip_prefix(root)
        .unwrap_or(file)
        .to_string_lossy()
        .replace('\\', "/")
}
