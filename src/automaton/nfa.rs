//! NFA/DFA traversal functions.
//!
//! - `traverse_dfa`: single-state walk for automata without epsilon edges
//! - `traverse_nfa`: state-set walk with epsilon closures and dedupe
//!
//! Both append payloads to a `TransitionSet` that preserves first-seen order
//! and drops duplicates, seeded with whatever the caller already knows.

use std::hash::Hash;

use rustc_hash::FxHashSet;

use super::arena::{Automaton, StateId};
use super::small_table::VALUE_TERMINATOR;
use crate::config::DEFAULT_DEDUPE_SORT_THRESHOLD;

/// Ordered, duplicate-free collection of field transitions.
#[derive(Debug)]
pub(crate) struct TransitionSet<T> {
    seen: FxHashSet<T>,
    items: Vec<T>,
}

impl<T> Default for TransitionSet<T> {
    fn default() -> Self {
        Self {
            seen: FxHashSet::default(),
            items: Vec::new(),
        }
    }
}

impl<T: Clone + Eq + Hash> TransitionSet<T> {
    #[inline]
    pub(crate) fn add(&mut self, transitions: &[T]) {
        for t in transitions {
            if self.seen.insert(t.clone()) {
                self.items.push(t.clone());
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.seen.clear();
        self.items.clear();
    }

    /// Hand out the collected transitions, leaving the set empty for reuse.
    pub(crate) fn take(&mut self) -> Vec<T> {
        self.seen.clear();
        std::mem::take(&mut self.items)
    }
}

/// Buffers reused across traversals to minimize allocations.
#[derive(Debug)]
pub(crate) struct NfaBuffers<T> {
    pub(crate) current_states: Vec<StateId>,
    pub(crate) next_states: Vec<StateId>,
    pub(crate) transitions: TransitionSet<T>,
}

impl<T> Default for NfaBuffers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> NfaBuffers<T> {
    pub(crate) fn new() -> Self {
        Self {
            current_states: Vec::with_capacity(16),
            next_states: Vec::with_capacity(16),
            transitions: TransitionSet::default(),
        }
    }
}

impl<T: Clone + Eq + Hash> NfaBuffers<T> {
    pub(crate) fn clear(&mut self) {
        self.current_states.clear();
        self.next_states.clear();
        self.transitions.clear();
    }
}

/// Traverse `fa` on `val` and return every reachable field transition.
///
/// `incoming` seeds the result, so matches already known from a sibling
/// branch come back first. An empty result means no match.
pub fn traverse<T: Clone + Eq + Hash>(fa: &Automaton<T>, val: &[u8], incoming: &[T]) -> Vec<T> {
    let mut bufs = NfaBuffers::new();
    if fa.is_deterministic() {
        traverse_dfa(fa, val, incoming, &mut bufs)
    } else {
        traverse_nfa(fa, val, incoming, &mut bufs, DEFAULT_DEDUPE_SORT_THRESHOLD)
    }
}

/// Walk an automaton with no epsilon edges: at most one state is ever active.
pub(crate) fn traverse_dfa<T: Clone + Eq + Hash>(
    fa: &Automaton<T>,
    val: &[u8],
    incoming: &[T],
    bufs: &mut NfaBuffers<T>,
) -> Vec<T> {
    debug_assert!(fa.is_deterministic());
    bufs.clear();
    bufs.transitions.add(incoming);

    let mut current = fa.start();
    bufs.transitions.add(fa[current].field_transitions());
    for i in 0..=val.len() {
        let byte = if i < val.len() { val[i] } else { VALUE_TERMINATOR };
        let next = fa[current].table().step(byte);
        if next.is_none() {
            break;
        }
        bufs.transitions.add(fa[next].field_transitions());
        current = next;
    }
    bufs.transitions.take()
}

/// Walk the NFA from its start state.
pub(crate) fn traverse_nfa<T: Clone + Eq + Hash>(
    fa: &Automaton<T>,
    val: &[u8],
    incoming: &[T],
    bufs: &mut NfaBuffers<T>,
    dedupe_threshold: usize,
) -> Vec<T> {
    bufs.clear();
    bufs.transitions.add(incoming);
    bufs.current_states.push(fa.start());
    run_nfa(fa, val, 0, bufs, dedupe_threshold);
    bufs.transitions.take()
}

/// Step the active states in `bufs.current_states` through `val[from..]` and
/// the terminator, collecting field transitions into `bufs.transitions`.
///
/// Also the landing point when a lazy DFA runs out of cache mid-value: it
/// loads its current state-set and resumes here.
pub(crate) fn run_nfa<T: Clone + Eq + Hash>(
    fa: &Automaton<T>,
    val: &[u8],
    from: usize,
    bufs: &mut NfaBuffers<T>,
    dedupe_threshold: usize,
) {
    for i in from..=val.len() {
        if bufs.current_states.is_empty() {
            return;
        }
        let byte = if i < val.len() { val[i] } else { VALUE_TERMINATOR };

        bufs.next_states.clear();
        for &state in &bufs.current_states {
            for &ec in fa[state].epsilon_closure() {
                let ec_state = &fa[ec];
                bufs.transitions.add(ec_state.field_transitions());
                let next = ec_state.table().step(byte);
                if !next.is_none() {
                    bufs.next_states.push(next);
                }
            }
        }
        dedupe_states(&mut bufs.next_states, dedupe_threshold);
        std::mem::swap(&mut bufs.current_states, &mut bufs.next_states);
    }

    // Out of input: the states reached on the terminator hold the matches.
    for &state in &bufs.current_states {
        for &ec in fa[state].epsilon_closure() {
            bufs.transitions.add(fa[ec].field_transitions());
        }
    }
}

/// Remove duplicate states in place.
///
/// Small sets keep their order and use a linear scan. Past `threshold` the
/// scan would go quadratic, so sort and dedup instead.
pub(crate) fn dedupe_states(states: &mut Vec<StateId>, threshold: usize) {
    if states.len() < 2 {
        return;
    }
    if states.len() > threshold {
        states.sort_unstable();
        states.dedup();
        return;
    }
    let mut kept = 0;
    for i in 0..states.len() {
        let state = states[i];
        if !states[..kept].contains(&state) {
            states[kept] = state;
            kept += 1;
        }
    }
    states.truncate(kept);
}
