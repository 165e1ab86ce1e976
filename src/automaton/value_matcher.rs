//! The shared, concurrently readable value matcher.
//!
//! Readers load the current snapshot without locking and traverse it with
//! their own `ExecutionContext`. Writers serialize on a mutex, merge the new
//! fragment into a copy of the automaton and publish the result atomically.
//! A reader holding an old snapshot keeps matching against it undisturbed.

use std::hash::Hash;
use std::sync::Arc;

use arc_swap::ArcSwap;
use log::debug;
use parking_lot::Mutex;

use super::arena::Automaton;
use super::context::ExecutionContext;
use super::fa_builders::{
    make_anything_but_fa, make_monocase_fa, make_prefix_fa, make_shellstyle_fa, make_string_fa,
    make_wildcard_fa, merge_fas,
};
use crate::shell_fast::ShellFastMatcher;
use crate::AutomatonError;

/// One published state of a [`ValueMatcher`].
#[derive(Clone, Debug)]
pub struct MatcherSnapshot<T> {
    automaton: Automaton<T>,
    /// Plain shellstyle patterns answered without the automaton.
    fast_matchers: Vec<(ShellFastMatcher, T)>,
    automaton_patterns: usize,
}

impl<T> MatcherSnapshot<T> {
    fn empty() -> Self {
        Self {
            automaton: Automaton::empty(),
            fast_matchers: Vec::new(),
            automaton_patterns: 0,
        }
    }

    pub fn automaton(&self) -> &Automaton<T> {
        &self.automaton
    }

    pub fn fast_matcher_count(&self) -> usize {
        self.fast_matchers.len()
    }

    pub fn pattern_count(&self) -> usize {
        self.automaton_patterns + self.fast_matchers.len()
    }
}

/// Matches one field's values against every pattern added for that field.
///
/// `ValueMatcher` is `Send + Sync` when `T` is. Adding patterns takes a lock
/// and is serialized; matching never blocks.
pub struct ValueMatcher<T> {
    current: ArcSwap<MatcherSnapshot<T>>,
    build_lock: Mutex<()>,
}

impl<T: Clone + Eq + Hash> Default for ValueMatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Eq + Hash> ValueMatcher<T> {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(MatcherSnapshot::empty()),
            build_lock: Mutex::new(()),
        }
    }

    /// The snapshot matching currently runs against.
    pub fn snapshot(&self) -> Arc<MatcherSnapshot<T>> {
        self.current.load_full()
    }

    pub fn pattern_count(&self) -> usize {
        self.current.load().pattern_count()
    }

    /// Add an exact-match pattern.
    pub fn add_string(&self, value: &[u8], payload: T) {
        self.add_fragment(&make_string_fa(value, payload));
    }

    /// Add a prefix pattern.
    pub fn add_prefix(&self, prefix: &[u8], payload: T) {
        self.add_fragment(&make_prefix_fa(prefix, payload));
    }

    /// Add a shellstyle pattern (bare, without quotes).
    ///
    /// Patterns made only of literals and `*` go to the substring fast path
    /// and never touch the automaton.
    pub fn add_shellstyle(&self, pattern: &[u8], payload: T) {
        match ShellFastMatcher::from_unquoted(pattern) {
            Some(fast) => {
                debug!(
                    "shellstyle pattern {:?} uses the fast path",
                    String::from_utf8_lossy(pattern)
                );
                self.publish(|snap| {
                    let mut next = snap.clone();
                    next.fast_matchers.push((fast, payload));
                    next
                });
            }
            None => self.add_fragment(&make_shellstyle_fa(pattern, payload)),
        }
    }

    /// Add a wildcard pattern, where `\*` and `\\` are escapes.
    pub fn add_wildcard(&self, pattern: &[u8], payload: T) -> Result<(), AutomatonError> {
        let fragment = make_wildcard_fa(pattern, payload)?;
        self.add_fragment(&fragment);
        Ok(())
    }

    /// Add a pattern matching every value except those in `excluded`.
    pub fn add_anything_but(&self, excluded: &[&[u8]], payload: T) {
        self.add_fragment(&make_anything_but_fa(excluded, payload));
    }

    /// Add a case-insensitive exact-match pattern.
    pub fn add_monocase(&self, value: &str, payload: T) {
        self.add_fragment(&make_monocase_fa(value, payload));
    }

    /// Merge a prebuilt fragment into the shared automaton.
    pub fn add_fragment(&self, fragment: &Automaton<T>) {
        self.publish(|snap| MatcherSnapshot {
            automaton: merge_fas(&snap.automaton, fragment),
            fast_matchers: snap.fast_matchers.clone(),
            automaton_patterns: snap.automaton_patterns + 1,
        });
    }

    fn publish(&self, build: impl FnOnce(&MatcherSnapshot<T>) -> MatcherSnapshot<T>) {
        let _guard = self.build_lock.lock();
        let next = build(&self.current.load());
        debug!(
            "published automaton {} with {} states, {} fast-path patterns",
            next.automaton.id(),
            next.automaton.state_count(),
            next.fast_matchers.len()
        );
        self.current.store(Arc::new(next));
    }

    /// Every payload whose pattern matches `value`, after `incoming`.
    ///
    /// Fast-path patterns are checked first and their payloads seed the
    /// automaton traversal, so each payload appears once.
    pub fn matches(&self, ctx: &mut ExecutionContext<T>, value: &[u8], incoming: &[T]) -> Vec<T> {
        let snap = self.current.load();

        let mut seeds;
        let seeds = if snap.fast_matchers.is_empty() {
            incoming
        } else {
            seeds = incoming.to_vec();
            for (fast, payload) in &snap.fast_matchers {
                if fast.is_match(value) && !seeds.contains(payload) {
                    seeds.push(payload.clone());
                }
            }
            &seeds[..]
        };

        if snap.automaton_patterns == 0 {
            let mut out: Vec<T> = Vec::with_capacity(seeds.len());
            for t in seeds {
                if !out.contains(t) {
                    out.push(t.clone());
                }
            }
            return out;
        }
        ctx.traverse_with_cache(&snap.automaton, value, seeds)
    }
}
