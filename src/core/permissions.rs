//! Path-pattern permission resolution.
//!
//! Rules are merged, compiled to anchored regular expressions, and ordered
//! by specificity once. Each check is then a pure lookup:
//!
//! 1. The first matching rule fixes the winning specificity level
//! 2. Every matching rule at that level contributes; an explicit deny wins
//! 3. Less specific rules are ignored
//! 4. No matching rule means allowed
//!
//! # Pattern Syntax
//!
//! | Pattern         | Matches                                   |
//! |-----------------|-------------------------------------------|
//! | `/docs/private` | `/docs/private` and everything beneath it |
//! | `/docs/*`       | direct children of `/docs`                |
//! | `/docs/**`      | `/docs` and everything beneath it         |
//! | `/**`           | every path, including the root            |

use std::collections::HashMap;

use regex::Regex;

use crate::core::error::PermissionDenied;
use crate::models::{Action, ActionFlags, ApplyTo, Entry, PermissionRule};
use crate::utils::path::segments;

/// A rule ready for matching.
#[derive(Clone, Debug)]
struct CompiledRule {
    pattern: String,
    apply_to: Option<ApplyTo>,
    flags: ActionFlags,
    matcher: Regex,
    specificity: usize,
}

/// Verdict for one entry, with the rule that decided it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    /// Pattern of the deciding rule; `None` when nothing matched
    pub rule: Option<String>,
    pub specificity: Option<usize>,
}

impl Decision {
    fn unmatched() -> Self {
        Self {
            allowed: true,
            rule: None,
            specificity: None,
        }
    }
}

/// Resolves allow/deny for entries and actions.
#[derive(Clone, Debug, Default)]
pub struct PermissionEngine {
    rules: Vec<CompiledRule>,
}

impl PermissionEngine {
    /// Merge, compile and order `rules`.
    ///
    /// Rules sharing `(path, apply_to)` are merged with the most restrictive
    /// verdict per action.
    pub fn new(rules: &[PermissionRule]) -> Self {
        let mut merged: Vec<PermissionRule> = Vec::new();
        let mut index: HashMap<(String, Option<ApplyTo>), usize> = HashMap::new();

        for rule in rules {
            let key = (rule.path.clone(), rule.apply_to);
            match index.get(&key) {
                Some(&idx) => {
                    merged[idx].flags = merged[idx].flags.restrict(&rule.flags);
                }
                None => {
                    index.insert(key, merged.len());
                    merged.push(rule.clone());
                }
            }
        }

        let mut compiled: Vec<CompiledRule> = merged.into_iter().filter_map(compile).collect();
        compiled.sort_by(|a, b| b.specificity.cmp(&a.specificity));

        log::debug!("Compiled {} permission rules", compiled.len());
        Self { rules: compiled }
    }

    /// Number of rules after merging.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    // =========================================================================
    // Single Entry
    // =========================================================================

    /// Decide `action` for one entry.
    pub fn decide(&self, entry: &Entry, action: Action) -> Decision {
        let path = match_path(&entry.path);
        let mut winner: Option<&CompiledRule> = None;

        for rule in &self.rules {
            if let Some(level) = winner.map(|w| w.specificity)
                && rule.specificity < level
            {
                break;
            }
            if !ApplyTo::covers(rule.apply_to, entry.is_directory) || !rule.matcher.is_match(path)
            {
                continue;
            }
            if rule.flags.get(action) == Some(false) {
                return Decision {
                    allowed: false,
                    rule: Some(rule.pattern.clone()),
                    specificity: Some(rule.specificity),
                };
            }
            if winner.is_none() {
                winner = Some(rule);
            }
        }

        match winner {
            Some(rule) => Decision {
                allowed: true,
                rule: Some(rule.pattern.clone()),
                specificity: Some(rule.specificity),
            },
            None => Decision::unmatched(),
        }
    }

    // =========================================================================
    // Entry Sets
    // =========================================================================

    /// Check `action` on every entry without reporting.
    ///
    /// An empty set is allowed.
    pub fn is_allowed(&self, entries: &[&Entry], action: Action) -> bool {
        entries.iter().all(|entry| self.decide(entry, action).allowed)
    }

    /// Check `action` on every entry, reporting the denial.
    ///
    /// The denied entry's display name is reported only when exactly one
    /// entry was checked.
    pub fn authorize(&self, entries: &[&Entry], action: Action) -> Result<(), PermissionDenied> {
        let denied = entries
            .iter()
            .find(|entry| !self.decide(entry, action).allowed);

        match denied {
            None => Ok(()),
            Some(entry) => {
                log::debug!("{} denied on '{}'", action, entry.path);
                Err(PermissionDenied {
                    action,
                    entry: (entries.len() == 1).then(|| entry.label().to_string()),
                })
            }
        }
    }

    /// Check `action` on a folder, substituting the root for `None`.
    pub fn is_folder_allowed(&self, folder: Option<&Entry>, action: Action) -> bool {
        let home = Entry::home();
        self.is_allowed(&[folder.unwrap_or(&home)], action)
    }

    /// Check `action` on a folder, substituting the root for `None`.
    pub fn authorize_folder(
        &self,
        folder: Option<&Entry>,
        action: Action,
    ) -> Result<(), PermissionDenied> {
        let home = Entry::home();
        self.authorize(&[folder.unwrap_or(&home)], action)
    }
}

/// Paths as seen by matchers: both root forms become `""`.
#[inline]
fn match_path(path: &str) -> &str {
    if path == "/" { "" } else { path }
}

/// Compile a rule's pattern into an anchored matcher.
fn compile(rule: PermissionRule) -> Option<CompiledRule> {
    let mut source = String::from("^");
    let mut specificity = 0;
    let mut literal = true;

    for segment in segments(&rule.path) {
        match segment {
            "**" => {
                source.push_str("(?:/[^/]+)*");
                literal = false;
            }
            "*" => {
                source.push_str("/[^/]+");
                literal = false;
            }
            partial if partial.contains('*') => {
                source.push('/');
                let parts: Vec<String> = partial.split('*').map(regex::escape).collect();
                source.push_str(&parts.join("[^/]*"));
                literal = false;
            }
            exact => {
                source.push('/');
                source.push_str(&regex::escape(exact));
                specificity += 1;
            }
        }
    }

    // Plain paths also cover their descendants
    if literal {
        source.push_str("(?:/.*)?");
    }
    source.push('$');

    match Regex::new(&source) {
        Ok(matcher) => Some(CompiledRule {
            pattern: rule.path,
            apply_to: rule.apply_to,
            flags: rule.flags,
            matcher,
            specificity,
        }),
        Err(err) => {
            log::warn!("Ignoring permission rule '{}': {}", rule.path, err);
            None
        }
    }
}
