//! Helper macros emitted ahead of the kernel body.
//!
//! A macro is a function-like preprocessor definition. Objects collect the
//! macros they need in a set; the set ordering (name, parameters, body) is the
//! dedup key, so two objects requesting identical helpers emit one definition.

use std::collections::BTreeSet;
use std::fmt;

use crate::template::{split_args, substitute_params};

/// Upper bound on nested expansion rounds in [`expand_all`].
const MAX_EXPANSION_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Macro {
    name: String,
    params: Vec<String>,
    body: String,
}

impl Macro {
    pub fn new(name: impl Into<String>, params: &[&str], body: impl Into<String>) -> Self {
        Self { name: name.into(), params: params.iter().map(|p| p.to_string()).collect(), body: body.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Body with parameters replaced by `args`.
    pub fn apply(&self, args: &[String]) -> String {
        substitute_params(&self.body, &self.params, args)
    }

    /// Inline every call to this macro in `text`. Calls with the wrong arity are kept.
    pub fn expand(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(found) = find_call(rest, &self.name) {
            let args_start = found + self.name.len() + 1;
            let Some(args_len) = balanced_len(&rest[args_start..]) else {
                break;
            };
            let args = split_args(&rest[args_start..args_start + args_len]);
            out.push_str(&rest[..found]);
            if args.len() == self.arity() {
                out.push_str(&self.apply(&args));
            } else {
                out.push_str(&rest[found..args_start + args_len + 1]);
            }
            rest = &rest[args_start + args_len + 1..];
        }
        out.push_str(rest);
        out
    }
}

impl fmt::Display for Macro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#define {}({}) {}", self.name, self.params.join(", "), self.body)
    }
}

/// Byte offset of the next `name(` call whose name is a whole identifier.
fn find_call(text: &str, name: &str) -> Option<usize> {
    let mut offset = 0;
    while let Some(pos) = text[offset..].find(name) {
        let at = offset + pos;
        let before_ok = text[..at].chars().next_back().is_none_or(|c| !(c.is_ascii_alphanumeric() || c == '_'));
        let after = &text[at + name.len()..];
        if before_ok && after.starts_with('(') {
            return Some(at);
        }
        offset = at + name.len();
    }
    None
}

/// Length of the argument text up to the parenthesis closing an already-open one.
fn balanced_len(text: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Inline every macro of `macros` in `text` until no call is left.
pub fn expand_all<'a>(text: &str, macros: impl IntoIterator<Item = &'a Macro> + Clone) -> String {
    let mut current = text.to_string();
    for _ in 0..MAX_EXPANSION_DEPTH {
        let next = macros.clone().into_iter().fold(current.clone(), |acc, m| m.expand(&acc));
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Render a set of macros as preprocessor lines.
pub fn render_definitions<'a>(macros: impl IntoIterator<Item = &'a Macro>) -> String {
    let unique: BTreeSet<&Macro> = macros.into_iter().collect();
    unique.iter().map(|m| format!("{m}\n")).collect()
}
