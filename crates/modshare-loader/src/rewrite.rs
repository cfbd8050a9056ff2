//! Static-import rewriting.
//!
//! Extension source arrives with ordinary static imports of the shared
//! libraries. By the time the source runs, those libraries are already
//! loaded and exposed under global binding slots, so each import
//! statement is replaced with a local-binding declaration reading from
//! its slot.
//!
//! This is a small parser pass over import declarations, not a
//! full-language parse. The supported shapes are a closed set:
//! default, named bindings, namespace, and default-plus-named. An
//! import of a resolved module in any other shape is reported and left
//! untouched. Imports of modules that were not resolved are never
//! touched.

use std::collections::HashMap;

/// One named binding: `a` or `a as b`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedBinding {
    pub imported: String,
    pub local: String,
}

/// The closed set of rewritable import shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportClause {
    /// `import Foo from "pkg"`
    Default(String),
    /// `import { a, b as c } from "pkg"`
    Named(Vec<NamedBinding>),
    /// `import * as ns from "pkg"`
    Namespace(String),
    /// `import Foo, { a } from "pkg"`
    DefaultAndNamed(String, Vec<NamedBinding>),
}

/// An import of a resolved module that could not be rewritten.
#[derive(Debug, Clone)]
pub struct UnsupportedImport {
    /// The statement text as found in the source.
    pub statement: String,
    /// The module specifier it references.
    pub module: String,
    /// Why the shape was rejected.
    pub reason: String,
}

/// Outcome of a rewrite pass.
#[derive(Debug)]
pub struct RewriteResult {
    /// The source with every rewritable import replaced.
    pub source: String,
    /// Module names whose imports were rewritten, in source order.
    pub rewritten: Vec<String>,
    /// Imports of resolved modules left untouched.
    pub unsupported: Vec<UnsupportedImport>,
}

/// Derive the global binding slot for a module name: non-alphanumeric
/// characters normalized to `_`, uppercased, wrapped in a reserved
/// prefix so slots cannot collide with host bindings.
pub fn global_slot_name(module: &str) -> String {
    let normalized: String = module
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("__MODSHARE_{normalized}__")
}

/// Rewrite every supported import of a resolved module into a
/// declaration reading from its global slot. `bindings` maps module
/// name to installed slot name.
pub fn rewrite_imports(source: &str, bindings: &HashMap<String, String>) -> RewriteResult {
    let mut output = String::with_capacity(source.len());
    let mut rewritten = Vec::new();
    let mut unsupported = Vec::new();
    let mut cursor = 0;

    for (pos, _) in source.match_indices("import") {
        if pos < cursor || !at_statement_boundary(source, pos) {
            continue;
        }
        let Some(parsed) = parse_import(&source[pos..]) else {
            continue;
        };
        let Some(slot) = bindings.get(&parsed.specifier) else {
            continue;
        };

        match &parsed.clause {
            Ok(clause) => {
                output.push_str(&source[cursor..pos]);
                output.push_str(&emit_binding(clause, slot));
                rewritten.push(parsed.specifier.clone());
            }
            Err(reason) => {
                output.push_str(&source[cursor..pos + parsed.len]);
                unsupported.push(UnsupportedImport {
                    statement: source[pos..pos + parsed.len].to_string(),
                    module: parsed.specifier.clone(),
                    reason: reason.clone(),
                });
            }
        }
        cursor = pos + parsed.len;
    }

    output.push_str(&source[cursor..]);
    RewriteResult {
        source: output,
        rewritten,
        unsupported,
    }
}

struct ParsedImport {
    /// Bytes consumed from the start of `import`, trailing `;` included.
    len: usize,
    specifier: String,
    clause: Result<ImportClause, String>,
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => chars.all(is_ident_char),
        _ => false,
    }
}

/// `import` counts only where it starts a word and is not a property
/// access (`obj.import`).
fn at_statement_boundary(source: &str, pos: usize) -> bool {
    let before = source[..pos].chars().next_back();
    let after = source[pos + "import".len()..].chars().next();
    let boundary_before = match before {
        None => true,
        Some(c) => !is_ident_char(c) && c != '.',
    };
    let boundary_after = matches!(after, Some(c) if !is_ident_char(c));
    boundary_before && boundary_after
}

/// Parse one import statement starting at `import`. Returns `None`
/// when the text is not a syntactically complete import declaration;
/// the shape check happens separately so unsupported shapes of a
/// resolved module can be reported.
fn parse_import(text: &str) -> Option<ParsedImport> {
    let mut rest = &text["import".len()..];
    let mut consumed = "import".len();
    let eat_ws = |rest: &mut &str, consumed: &mut usize| {
        let trimmed = rest.trim_start();
        *consumed += rest.len() - trimmed.len();
        *rest = trimmed;
    };
    eat_ws(&mut rest, &mut consumed);

    // Side-effect form: `import "pkg";` is complete but not rewritable.
    if rest.starts_with('"') || rest.starts_with('\'') {
        let (specifier, spec_len) = parse_string(rest)?;
        rest = &rest[spec_len..];
        consumed += spec_len;
        consumed += trailing_semicolon(rest);
        return Some(ParsedImport {
            len: consumed,
            specifier,
            clause: Err("side-effect import has no bindings".to_string()),
        });
    }

    let from_at = find_from_keyword(rest)?;
    let clause_text = &rest[..from_at];
    rest = &rest[from_at + "from".len()..];
    consumed += from_at + "from".len();
    eat_ws(&mut rest, &mut consumed);

    let (specifier, spec_len) = parse_string(rest)?;
    rest = &rest[spec_len..];
    consumed += spec_len;
    consumed += trailing_semicolon(rest);

    Some(ParsedImport {
        len: consumed,
        specifier,
        clause: parse_clause(clause_text),
    })
}

/// Locate the top-level `from` keyword within the clause region.
/// Brace groups are skipped; hitting `;` or a quote first means the
/// statement is not an import declaration.
fn find_from_keyword(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => depth = depth.checked_sub(1)?,
            b';' | b'"' | b'\'' => return None,
            b'f' if depth == 0 && text[i..].starts_with("from") => {
                let before_ok = i == 0
                    || !is_ident_char(text[..i].chars().next_back().unwrap());
                let after_ok = matches!(
                    text[i + 4..].chars().next(),
                    Some(c) if !is_ident_char(c)
                );
                if before_ok && after_ok {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Parse a quoted module specifier, returning it with its byte length
/// including both quotes.
fn parse_string(text: &str) -> Option<(String, usize)> {
    let quote = text.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let inner = &text[1..];
    let end = inner.find(quote)?;
    Some((inner[..end].to_string(), end + 2))
}

/// Length of an optional `;` (with leading whitespace) after the
/// specifier.
fn trailing_semicolon(rest: &str) -> usize {
    let trimmed = rest.trim_start();
    if trimmed.starts_with(';') {
        rest.len() - trimmed.len() + 1
    } else {
        0
    }
}

fn parse_clause(text: &str) -> Result<ImportClause, String> {
    let t = text.trim();
    if t.is_empty() {
        return Err("missing import clause".to_string());
    }

    if let Some(rest) = t.strip_prefix('*') {
        let rest = rest.trim_start();
        // The `as` keyword needs a separator: `* asns` is malformed.
        let local = rest
            .strip_prefix("as")
            .filter(|s| s.starts_with(char::is_whitespace))
            .map(str::trim)
            .filter(|s| is_identifier(s))
            .ok_or_else(|| "malformed namespace import".to_string())?;
        return Ok(ImportClause::Namespace(local.to_string()));
    }

    if t.starts_with('{') {
        return parse_named_group(t).map(ImportClause::Named);
    }

    match t.split_once(',') {
        None => {
            if is_identifier(t) {
                Ok(ImportClause::Default(t.to_string()))
            } else {
                Err(format!("unsupported import clause: {t}"))
            }
        }
        Some((default, named)) => {
            let default = default.trim();
            if !is_identifier(default) {
                return Err(format!("unsupported default binding: {default}"));
            }
            let named = parse_named_group(named.trim())?;
            Ok(ImportClause::DefaultAndNamed(default.to_string(), named))
        }
    }
}

fn parse_named_group(text: &str) -> Result<Vec<NamedBinding>, String> {
    let inner = text
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(|| "malformed named-import group".to_string())?;

    let mut bindings = Vec::new();
    for entry in inner.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (imported, local) = match entry.split_once(" as ") {
            Some((imported, local)) => (imported.trim(), local.trim()),
            None => (entry, entry),
        };
        if !is_identifier(imported) || !is_identifier(local) {
            return Err(format!("unsupported named binding: {entry}"));
        }
        bindings.push(NamedBinding {
            imported: imported.to_string(),
            local: local.to_string(),
        });
    }
    if bindings.is_empty() {
        return Err("empty named-import group".to_string());
    }
    Ok(bindings)
}

/// Emit the replacement declaration for a supported clause. The
/// default binding tolerates both ES-module-shaped slots (with a
/// `default` member) and plain-object slots.
fn emit_binding(clause: &ImportClause, slot: &str) -> String {
    let slot_ref = format!("globalThis.{slot}");
    match clause {
        ImportClause::Default(local) => emit_default(local, &slot_ref),
        ImportClause::Named(bindings) => emit_named(bindings, &slot_ref),
        ImportClause::Namespace(local) => format!("const {local} = {slot_ref};"),
        ImportClause::DefaultAndNamed(local, bindings) => {
            format!(
                "{} {}",
                emit_default(local, &slot_ref),
                emit_named(bindings, &slot_ref)
            )
        }
    }
}

fn emit_default(local: &str, slot_ref: &str) -> String {
    format!(
        "const {local} = {slot_ref}.default !== undefined ? {slot_ref}.default : {slot_ref};"
    )
}

fn emit_named(bindings: &[NamedBinding], slot_ref: &str) -> String {
    let members: Vec<String> = bindings
        .iter()
        .map(|b| {
            if b.imported == b.local {
                b.imported.clone()
            } else {
                format!("{}: {}", b.imported, b.local)
            }
        })
        .collect();
    format!("const {{ {} }} = {slot_ref};", members.join(", "))
}
