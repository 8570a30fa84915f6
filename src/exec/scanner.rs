// src/exec/scanner.rs

//! Static dependency discovery for script entry files.
//!
//! Starting from the entry, every scannable file is searched for module
//! specifiers (static imports, re-exports, side-effect imports, dynamic
//! `import("...")` and `require("...")`). Relative and absolute specifiers
//! are resolved to files and followed; bare package names, `node:` builtins
//! and virtual ids are external and never reported.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, trace};

use crate::exec::backend::RunError;
use crate::fs::FileSystem;
use crate::watch::path_utils::normalize_path;

/// Extensions tried, in order, when a specifier has none.
pub const DEFAULT_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs", "json"];

/// Files with these extensions are searched for further imports.
const SCRIPT_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"];

/// Compiled-output specifiers that usually point at a TypeScript source.
const SOURCE_SUBSTITUTES: &[(&str, &[&str])] = &[
    ("js", &["ts", "tsx"]),
    ("jsx", &["tsx"]),
    ("mjs", &["mts"]),
    ("cjs", &["cts"]),
];

#[derive(Debug)]
struct ImportPatterns {
    specifiers: Vec<Regex>,
}

impl ImportPatterns {
    fn new() -> Result<Self> {
        // Matched against masked source (see `mask_non_code`), so quotes
        // only ever delimit real string literals in code position.
        let specifiers = [
            // import x from "./x", import x, { a } from "./x", import type { T } from "./t"
            r#"(?m)^[ \t]*import\s+(?P<ty>type\s+)?(?:[\w$]+\s*,?\s*)?(?:\*\s*as\s+[\w$]+|\{[^}]*\})?\s*from\s*['"](?P<spec>[^'"]+)['"]"#,
            // import "./side-effect"
            r#"(?m)^[ \t]*import\s*['"](?P<spec>[^'"]+)['"]"#,
            // export * from "./x", export * as ns from "./x", export { a } from "./x"
            r#"(?m)^[ \t]*export\s+(?P<ty>type\s+)?(?:\*(?:\s*as\s+[\w$]+)?|\{[^}]*\})\s*from\s*['"](?P<spec>[^'"]+)['"]"#,
            // import("./lazy")
            r#"\bimport\s*\(\s*['"](?P<spec>[^'"]+)['"]\s*\)"#,
            // require("./legacy")
            r#"\brequire\s*\(\s*['"](?P<spec>[^'"]+)['"]\s*\)"#,
        ];

        Ok(Self {
            specifiers: specifiers
                .iter()
                .map(|p| Regex::new(p).with_context(|| format!("compiling pattern {p}")))
                .collect::<Result<_>>()?,
        })
    }
}

/// Walks the import graph of an entry file.
#[derive(Debug, Clone)]
pub struct DependencyScanner {
    fs: Arc<dyn FileSystem>,
    patterns: Arc<ImportPatterns>,
    extensions: Vec<String>,
}

impl DependencyScanner {
    pub fn new(fs: Arc<dyn FileSystem>, extensions: Vec<String>) -> Result<Self> {
        Ok(Self {
            fs,
            patterns: Arc::new(ImportPatterns::new()?),
            extensions,
        })
    }

    /// Scanner using [`DEFAULT_EXTENSIONS`].
    pub fn with_defaults(fs: Arc<dyn FileSystem>) -> Result<Self> {
        Self::new(fs, DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect())
    }

    /// Return the entry and every file it transitively imports, as canonical
    /// paths, entry first.
    pub fn scan(&self, entry: &Path) -> std::result::Result<Vec<PathBuf>, RunError> {
        if !self.fs.is_file(entry) {
            return Err(RunError::EntryNotFound(entry.to_path_buf()));
        }
        let entry = self.fs.canonicalize(entry).map_err(RunError::Scan)?;

        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut queue: VecDeque<PathBuf> = VecDeque::from([entry]);
        let mut files = Vec::new();

        while let Some(file) = queue.pop_front() {
            if !seen.insert(file.clone()) {
                continue;
            }
            files.push(file.clone());

            if !is_scannable(&file) {
                continue;
            }

            let source = self
                .fs
                .read_to_string(&file)
                .with_context(|| format!("reading dependency {:?}", file))
                .map_err(RunError::Scan)?;

            for specifier in self.import_specifiers(&source) {
                if !is_local(&specifier) {
                    trace!(%specifier, importer = ?file, "external specifier");
                    continue;
                }
                let resolved = self.resolve(&file, &specifier).ok_or_else(|| {
                    RunError::UnresolvedImport {
                        specifier: specifier.clone(),
                        importer: file.clone(),
                    }
                })?;
                let resolved = self.fs.canonicalize(&resolved).map_err(RunError::Scan)?;
                if !seen.contains(&resolved) {
                    queue.push_back(resolved);
                }
            }
        }

        debug!(count = files.len(), "scanned dependencies");
        Ok(files)
    }

    /// Module specifiers referenced by `source`, in no particular order.
    ///
    /// Type-only imports and re-exports are skipped because they are erased
    /// before execution.
    pub fn import_specifiers(&self, source: &str) -> Vec<String> {
        let code = mask_non_code(source);

        let mut found = Vec::new();
        let mut seen = HashSet::new();
        for pattern in &self.patterns.specifiers {
            for caps in pattern.captures_iter(&code) {
                if caps.name("ty").is_some() {
                    continue;
                }
                // Offsets line up between the masked copy and the source.
                let Some(spec) = caps.name("spec").and_then(|m| source.get(m.range())) else {
                    continue;
                };
                if seen.insert(spec.to_string()) {
                    found.push(spec.to_string());
                }
            }
        }
        found
    }

    /// Resolve a local specifier relative to the importing file.
    pub fn resolve(&self, importer: &Path, specifier: &str) -> Option<PathBuf> {
        let dir = importer.parent().unwrap_or(Path::new("/"));
        let base = normalize_path(dir, Path::new(specifier));

        if self.fs.is_file(&base) {
            return Some(base);
        }

        if let Some(ext) = base.extension().and_then(|e| e.to_str()) {
            for (from, substitutes) in SOURCE_SUBSTITUTES {
                if ext != *from {
                    continue;
                }
                for sub in *substitutes {
                    let candidate = base.with_extension(sub);
                    if self.fs.is_file(&candidate) {
                        return Some(candidate);
                    }
                }
            }
        }

        for ext in &self.extensions {
            let candidate = with_appended_extension(&base, ext);
            if self.fs.is_file(&candidate) {
                return Some(candidate);
            }
        }

        if self.fs.is_dir(&base) {
            for ext in &self.extensions {
                let candidate = base.join(format!("index.{ext}"));
                if self.fs.is_file(&candidate) {
                    return Some(candidate);
                }
            }
        }

        None
    }
}

/// Keywords after which a `/` starts a regex literal rather than a division.
const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "case", "do", "else", "in", "of", "void", "yield",
    "await", "delete", "throw", "new",
];

/// Copy of `source` with comments blanked to spaces and the bodies of string,
/// template and regex literals replaced by `_`.
///
/// Delimiters and newlines are kept, so byte offsets and line starts match
/// the original. Template literals are masked whole, `${...}` included.
pub fn mask_non_code(source: &str) -> String {
    let bytes = source.as_bytes();
    let mut out = bytes.to_vec();
    let mut last_code: Option<usize> = None;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                let end = find_byte(bytes, i, b'\n');
                blank(&mut out, i, end, b' ');
                i = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = find_seq(bytes, i + 2, b"*/").map_or(bytes.len(), |at| at + 2);
                blank(&mut out, i, end, b' ');
                i = end;
            }
            quote @ (b'\'' | b'"' | b'`') => {
                let end = skip_quoted(bytes, i + 1, quote);
                blank(&mut out, i + 1, end, b'_');
                last_code = Some(i);
                i = end + 1;
            }
            b'/' if regex_allowed(bytes, last_code) => {
                let end = skip_regex(bytes, i + 1);
                blank(&mut out, i + 1, end, b'_');
                last_code = Some(i);
                i = end + 1;
            }
            b if b.is_ascii_whitespace() => i += 1,
            _ => {
                last_code = Some(i);
                i += 1;
            }
        }
    }

    // Only whole runs between ASCII delimiters were replaced, so this holds
    // valid UTF-8; fall back to the raw source rather than fail the scan.
    String::from_utf8(out).unwrap_or_else(|_| source.to_string())
}

fn blank(out: &mut [u8], start: usize, end: usize, fill: u8) {
    let end = end.min(out.len());
    for byte in out.iter_mut().take(end).skip(start) {
        if *byte != b'\n' {
            *byte = fill;
        }
    }
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> usize {
    bytes[from..]
        .iter()
        .position(|&b| b == needle)
        .map_or(bytes.len(), |at| from + at)
}

fn find_seq(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    bytes
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|at| from + at)
}

/// Index of the closing `quote`, or where an unterminated literal stops.
fn skip_quoted(bytes: &[u8], mut i: usize, quote: u8) -> usize {
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i,
            b'\n' if quote != b'`' => return i,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Index of the closing `/` of a regex literal body starting at `i`.
fn skip_regex(bytes: &[u8], mut i: usize) -> usize {
    let mut in_class = false;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'[' => {
                in_class = true;
                i += 1;
            }
            b']' => {
                in_class = false;
                i += 1;
            }
            b'/' if !in_class => return i,
            b'\n' => return i,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn regex_allowed(bytes: &[u8], last_code: Option<usize>) -> bool {
    let Some(at) = last_code else {
        return true;
    };
    let prev = bytes[at];
    if b"(,=:[!&|?{};+-*%~^".contains(&prev) {
        return true;
    }
    if !is_ident_byte(prev) {
        return false;
    }
    let start = bytes[..=at]
        .iter()
        .rposition(|&b| !is_ident_byte(b))
        .map_or(0, |p| p + 1);
    std::str::from_utf8(&bytes[start..=at])
        .is_ok_and(|word| REGEX_PRECEDING_KEYWORDS.contains(&word))
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

fn is_scannable(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SCRIPT_EXTENSIONS.contains(&ext))
}

fn is_local(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with('/')
}

/// `foo.config` + `ts` -> `foo.config.ts` (unlike `with_extension`).
fn with_appended_extension(path: &Path, ext: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}
