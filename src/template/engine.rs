//! Token substitution over a parsed document tree.
//!
//! Word processors fragment text freely: a placeholder typed as
//! `{investor.name}` routinely ends up split across several sibling runs,
//! with the braces and path pieces in different text nodes. Substitution
//! therefore never matches against single nodes. It selects the smallest
//! element whose combined text holds a complete placeholder, then walks that
//! element's text nodes with an accumulating buffer, rewriting nodes as
//! matches complete. A fragment left over after a match can itself open the
//! next placeholder; the scan carries it forward, widening to enclosing
//! elements when the closing brace lives outside the selected scope.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::context::scalar_to_string;
use crate::richtext::{Delta, DeltaCompiler};
use crate::xml::{MarkupTree, NodePath};

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(?<token>.*?)\}").expect("Failed to build token pattern"));

/// Substitute every `{dotted.path}` placeholder in the tree.
///
/// `values` is a flattened context; paths that resolve to nothing are
/// replaced with the empty string and appended to `unresolved`.
pub(crate) fn substitute_tree(
    tree: &mut MarkupTree,
    values: &HashMap<String, Value>,
    compiler: &DeltaCompiler,
    unresolved: &mut Vec<String>,
) {
    let mut scanned: HashSet<NodePath> = HashSet::new();
    let mut written: HashSet<NodePath> = HashSet::new();
    for candidate in tree.find_text_bearing_nodes() {
        let Some(selected) = select_node(tree, candidate) else {
            continue;
        };
        if !scanned.insert(selected.clone()) {
            continue;
        }
        let mut scanner = Scanner::new(values, compiler);
        let mut scope = selected;
        let mut resume: Option<NodePath> = None;
        while scanner.scan(tree, &scope, resume.as_ref(), &mut written, unresolved) {
            let Some(receiver) = scanner.receiver.clone() else {
                break;
            };
            match widen_scope(tree, &scope, &receiver, &written) {
                Some(wider) => {
                    resume = Some(receiver);
                    scope = wider;
                }
                None => {
                    scanner.reattach(tree);
                    break;
                }
            }
        }
    }
}

/// Climb from a candidate element to the smallest enclosing element whose
/// combined text holds a complete placeholder.
///
/// The opening brace a candidate was picked for may be closed in a sibling
/// node, so the climb widens until a closing brace is in scope. Candidates
/// that never complete a placeholder are discarded.
fn select_node(tree: &MarkupTree, mut path: NodePath) -> Option<NodePath> {
    while !path.is_empty() && !tree.concatenated_text(&path).contains('}') {
        path.pop();
    }
    if TOKEN_RE.is_match(&tree.concatenated_text(&path)) {
        Some(path)
    } else {
        None
    }
}

/// Smallest strict ancestor of `scope` whose text beyond `resume` leads with
/// a closing brace, so a carried fragment can complete its placeholder
/// there.
///
/// Returns `None` when the first brace beyond `resume` opens a fresh
/// placeholder instead, when a substituted or raw node stands in between, or
/// when no brace follows at all; the caller then reattaches the fragment.
fn widen_scope(
    tree: &MarkupTree,
    scope: &[usize],
    resume: &NodePath,
    written: &HashSet<NodePath>,
) -> Option<NodePath> {
    let mut scope = scope.to_vec();
    while !scope.is_empty() {
        scope.pop();
        let mut past_resume = false;
        for path in tree.descendant_text_paths(&scope) {
            if !past_resume {
                past_resume = path == *resume;
                continue;
            }
            let Some(text) = tree.text_at(&path) else {
                continue;
            };
            if text.is_raw() || written.contains(&path) {
                return None;
            }
            if let Some(brace) = text.content().chars().find(|&c| c == '{' || c == '}') {
                return (brace == '}').then_some(scope);
            }
        }
    }
    None
}

/// Scan state over one selected element and its widenings.
///
/// The buffer accumulates text node contents until a placeholder completes,
/// `pending` tracks the nodes whose characters the buffer currently holds,
/// and `receiver` is the node that took the latest replacement. `carried` is
/// true while the buffer holds characters removed from the tree: the
/// fragment trailing a match, which either completes a further placeholder
/// or is reattached to the receiver.
struct Scanner<'a> {
    values: &'a HashMap<String, Value>,
    compiler: &'a DeltaCompiler,
    buffer: String,
    pending: Vec<NodePath>,
    receiver: Option<NodePath>,
    carried: bool,
}

impl<'a> Scanner<'a> {
    fn new(values: &'a HashMap<String, Value>, compiler: &'a DeltaCompiler) -> Self {
        Self {
            values,
            compiler,
            buffer: String::new(),
            pending: Vec::new(),
            receiver: None,
            carried: false,
        }
    }

    /// One pass over the text nodes beneath `scope`, skipping everything up
    /// to and including `resume_after` when continuing a widened scan.
    ///
    /// Node contents accumulate into the buffer until it completes a
    /// placeholder. The replacement is written into the node that supplied
    /// the closing brace; nodes whose characters were absorbed into the
    /// match are cleared. Returns true when the scan ends with a carried
    /// fragment that still opens a placeholder, so the caller can widen.
    fn scan(
        &mut self,
        tree: &mut MarkupTree,
        scope: &NodePath,
        resume_after: Option<&NodePath>,
        written: &mut HashSet<NodePath>,
        unresolved: &mut Vec<String>,
    ) -> bool {
        let mut resume = resume_after;
        for text_path in tree.descendant_text_paths(scope) {
            if let Some(marker) = resume {
                if text_path == *marker {
                    resume = None;
                }
                continue;
            }
            let content = match tree.text_at(&text_path) {
                Some(text) if !text.is_raw() && !written.contains(&text_path) => {
                    text.content().to_string()
                }
                // Nodes holding substituted or spliced content split the
                // scan: text gathered so far stays in place and accumulation
                // restarts on the far side.
                _ => {
                    self.reattach(tree);
                    continue;
                }
            };
            self.buffer.push_str(&content);
            self.pending.push(text_path.clone());

            let mut wrote_here = false;
            loop {
                let Some((start, end, token)) = find_token(&self.buffer) else {
                    break;
                };
                let prefix = self.buffer[..start].to_string();
                let rest = self.buffer[end..].to_string();
                let replacement = resolve_token(&token, self.values, self.compiler, unresolved);

                // Earlier pending nodes lose their characters to this match
                for absorbed in self.pending.drain(..) {
                    if absorbed != text_path
                        && let Some(node) = tree.text_at_mut(&absorbed)
                    {
                        node.clear();
                    }
                }
                if let Some(node) = tree.text_at_mut(&text_path) {
                    if !wrote_here {
                        node.clear();
                        wrote_here = true;
                    }
                    node.push_plain(&prefix);
                    match &replacement {
                        Replacement::Markup(markup) => node.push_raw(markup),
                        Replacement::Plain(text) => node.push_plain(text),
                    }
                }
                written.insert(text_path.clone());
                self.receiver = Some(text_path.clone());

                if rest.contains('{') || rest.contains('}') {
                    // Another placeholder may be opening; keep accumulating
                    self.buffer = rest;
                    self.carried = true;
                } else {
                    if let Some(node) = tree.text_at_mut(&text_path) {
                        node.push_plain(&rest);
                    }
                    self.buffer.clear();
                    self.carried = false;
                    break;
                }
            }
        }

        if self.carried && !self.buffer.is_empty() && self.receiver.is_some() {
            if self.buffer.contains('{') {
                return true;
            }
            self.reattach(tree);
        }
        false
    }

    /// Put carried characters back on the last rewritten node so no text is
    /// lost, clearing the nodes they were gathered from, and reset the
    /// accumulation state.
    fn reattach(&mut self, tree: &mut MarkupTree) {
        if self.carried
            && !self.buffer.is_empty()
            && let Some(receiver) = self.receiver.clone()
        {
            for absorbed in self.pending.drain(..) {
                if let Some(node) = tree.text_at_mut(&absorbed) {
                    node.clear();
                }
            }
            if let Some(node) = tree.text_at_mut(&receiver) {
                node.push_plain(&self.buffer);
            }
        }
        self.buffer.clear();
        self.pending.clear();
        self.carried = false;
    }
}

fn find_token(buffer: &str) -> Option<(usize, usize, String)> {
    let captures = TOKEN_RE.captures(buffer)?;
    let matched = captures.get(0)?;
    let token = captures.name("token")?.as_str().to_string();
    Some((matched.start(), matched.end(), token))
}

enum Replacement {
    Plain(String),
    Markup(String),
}

/// Resolve a token path against the flattened context.
///
/// String values that parse as rich-text deltas compile to markup; all other
/// strings substitute verbatim. A path with no value substitutes the empty
/// string so stale placeholders never reach the rendered document.
fn resolve_token(
    token: &str,
    values: &HashMap<String, Value>,
    compiler: &DeltaCompiler,
    unresolved: &mut Vec<String>,
) -> Replacement {
    match values.get(token) {
        Some(Value::String(raw)) => match Delta::from_json(raw) {
            Some(delta) => Replacement::Markup(compiler.compile_ops(&delta.ops)),
            None => Replacement::Plain(raw.clone()),
        },
        Some(value) => Replacement::Plain(scalar_to_string(value)),
        None => {
            log::debug!("no context value for token {token:?}");
            unresolved.push(token.to_string());
            Replacement::Plain(String::new())
        }
    }
}
