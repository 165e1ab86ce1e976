//! Per-caller execution contexts.

use std::fmt;
use std::hash::Hash;

use rustc_hash::FxHashMap;

use super::arena::Automaton;
use super::lazy_dfa::{traverse_lazy, CacheBudget, CacheStats, LazyDfa};
use super::nfa::{traverse_dfa, traverse_nfa, NfaBuffers};
use crate::config::Config;

/// Scratch space and lazy DFA caches for one caller.
///
/// A context is the only mutable thing in a traversal: the automata it walks
/// are borrowed immutably, so each thread (or worker) keeps its own context
/// and no locking is needed. Contexts are cheap to create and to drop.
///
/// One lazy DFA is kept per automaton lineage. When a lineage is republished
/// as a new snapshot (a merge), the stale DFA is dropped and its states are
/// returned to the budget. The budget itself, [`Config::cache_capacity`]
/// states, covers every DFA in the context; once it is exhausted caching stays
/// off until [`ExecutionContext::clear_cache`].
pub struct ExecutionContext<T> {
    config: Config,
    bufs: NfaBuffers<T>,
    caches: FxHashMap<u64, LazyDfa<T>>,
    budget: CacheBudget,
}

impl<T> fmt::Debug for ExecutionContext<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("config", &self.config)
            .field("caches", &self.caches.len())
            .field("budget", &self.budget)
            .finish()
    }
}

impl<T: Clone + Eq + Hash> Default for ExecutionContext<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Eq + Hash> ExecutionContext<T> {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            bufs: NfaBuffers::new(),
            caches: FxHashMap::default(),
            budget: CacheBudget::new(config.get_cache_capacity()),
        }
    }

    /// Traverse without the lazy DFA, reusing this context's buffers.
    pub fn traverse(&mut self, fa: &Automaton<T>, val: &[u8], incoming: &[T]) -> Vec<T> {
        if fa.is_deterministic() {
            traverse_dfa(fa, val, incoming, &mut self.bufs)
        } else {
            traverse_nfa(
                fa,
                val,
                incoming,
                &mut self.bufs,
                self.config.get_dedupe_sort_threshold(),
            )
        }
    }

    /// Traverse through the lazy DFA cache.
    ///
    /// Returns the same payloads as [`ExecutionContext::traverse`]:
    /// `incoming` first in the caller's order, then each new payload once.
    /// A cached state is shared by every path reaching its state-set, so the
    /// order after `incoming` is unspecified. Deterministic automata skip the
    /// cache, and so does every call once the budget has run out.
    pub fn traverse_with_cache(
        &mut self,
        fa: &Automaton<T>,
        val: &[u8],
        incoming: &[T],
    ) -> Vec<T> {
        if fa.is_deterministic() || self.budget.is_disabled() {
            return self.traverse(fa, val, incoming);
        }

        let budget = &mut self.budget;
        let dfa = self
            .caches
            .entry(fa.lineage())
            .or_insert_with(|| LazyDfa::new(fa.id()));
        if dfa.snapshot() != fa.id() {
            budget.release(dfa.len());
            *dfa = LazyDfa::new(fa.id());
        }

        traverse_lazy(
            fa,
            val,
            incoming,
            dfa,
            budget,
            &mut self.bufs,
            self.config.get_dedupe_sort_threshold(),
        )
    }

    /// Cache occupancy and hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        self.budget.stats(self.caches.len())
    }

    pub fn is_cache_disabled(&self) -> bool {
        self.budget.is_disabled()
    }

    /// Drop every cached DFA state and re-enable caching. Lifetime counters
    /// (`creates`, `hits`, `misses`) are kept.
    pub fn clear_cache(&mut self) {
        self.caches.clear();
        self.budget.reset();
    }
}
