//! Attribute templating.
//!
//! # Grammar
//!
//! - A token is `#` followed by an identifier run `[A-Za-z_][A-Za-z0-9_]*`.
//! - The longest prefix of the run that names a known attribute is replaced by
//!   the attribute's value; the remainder of the run is kept as written, so
//!   `#name_acc` renders as `obj3_acc` when `name` is `obj3`.
//! - A run without any known prefix is emitted verbatim, `#` included. Helper
//!   text routinely carries backend syntax (`#pragma unroll`) that must survive.
//! - There are no escapes: a template without tokens is returned unchanged.
//! - `$<k>` is not a token. It stands for the loop index of target axis `k`
//!   and is left for the kernel-body synthesizer.

use std::collections::BTreeMap;

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Substitute attribute tokens in `template`.
pub fn substitute(template: &str, attributes: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(hash) = rest.find('#') {
        out.push_str(&rest[..hash]);
        let after = &rest[hash + 1..];
        let run_len = ident_len(after);
        let run = &after[..run_len];

        match longest_attribute_prefix(run, attributes) {
            Some((len, value)) => {
                out.push_str(value);
                out.push_str(&run[len..]);
            }
            None => {
                out.push('#');
                out.push_str(run);
            }
        }
        rest = &after[run_len..];
    }
    out.push_str(rest);
    out
}

/// Length in bytes of the identifier run at the start of `text` (0 if none).
pub fn ident_len(text: &str) -> usize {
    let mut chars = text.char_indices();
    match chars.next() {
        Some((_, c)) if is_ident_start(c) => {}
        _ => return 0,
    }
    chars.find(|(_, c)| !is_ident_continue(*c)).map_or(text.len(), |(i, _)| i)
}

fn longest_attribute_prefix<'a>(run: &str, attributes: &'a BTreeMap<String, String>) -> Option<(usize, &'a str)> {
    (1..=run.len()).rev().find_map(|len| attributes.get(&run[..len]).map(|value| (len, value.as_str())))
}

/// Replace whole-identifier occurrences of `params[k]` with `args[k]`.
///
/// Identifiers are matched on word boundaries only, so a parameter `i` leaves
/// `obj0_pointer` untouched.
pub fn substitute_params(body: &str, params: &[String], args: &[String]) -> String {
    let mut out = String::with_capacity(body.len());
    let mut rest = body;

    while let Some(start) = rest.find(is_ident_start) {
        // A run that starts mid-word (digits before it) belongs to the preceding token.
        let preceded_by_word = rest[..start].chars().next_back().is_some_and(is_ident_continue);
        out.push_str(&rest[..start]);
        let len = ident_len(&rest[start..]);
        let word = &rest[start..start + len];
        match params.iter().position(|p| p == word) {
            Some(k) if !preceded_by_word => out.push_str(&args[k]),
            _ => out.push_str(word),
        }
        rest = &rest[start + len..];
    }
    out.push_str(rest);
    out
}

/// Split a comma-separated argument list on top-level commas.
pub fn split_args(args: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in args.chars() {
        match c {
            '(' | '[' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => result.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() || !result.is_empty() {
        result.push(current.trim().to_string());
    }
    result
}
