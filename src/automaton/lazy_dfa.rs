//! Lazy (on-demand) DFA construction during NFA traversal.
//!
//! Rather than determinizing the whole NFA up front, DFA states are built as
//! traversal discovers them. A `LazyState` stands for one epsilon-closed set
//! of NFA states; its byte transitions start out unknown and are filled in on
//! first use. Hot paths then run at one table lookup per byte, while the
//! exponential worst case is capped by a budget on the number of states.
//!
//! Caches belong to one `ExecutionContext` and are never shared, so nothing
//! here needs synchronization.

use std::hash::Hash;

use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};

use super::arena::{Automaton, StateId};
use super::nfa::{run_nfa, NfaBuffers};
use super::small_table::{BYTE_CEILING, VALUE_TERMINATOR};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Slot {
    Unknown,
    Dead,
    To(u32),
}

struct LazyState<T> {
    transitions: Box<[Slot; BYTE_CEILING]>,
    /// Union of the field transitions of every NFA state in the set.
    field_transitions: Vec<T>,
    /// The sorted NFA state-set; used to compute unknown transitions.
    nfa_states: Box<[StateId]>,
}

/// Outcome of one cached step.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum LazyStep {
    To(u32),
    Dead,
    /// The budget is spent; continue by stepping the NFA.
    Exhausted,
}

/// Per-context accounting shared by all of a context's lazy DFAs.
#[derive(Clone, Debug)]
pub(crate) struct CacheBudget {
    capacity: usize,
    used: usize,
    disabled: bool,
    creates: u64,
    hits: u64,
    misses: u64,
}

impl CacheBudget {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            used: 0,
            disabled: false,
            creates: 0,
            hits: 0,
            misses: 0,
        }
    }

    #[inline]
    pub(crate) fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Give back the states of a discarded cache.
    pub(crate) fn release(&mut self, states: usize) {
        self.used -= states;
    }

    /// Forget every cached state and re-enable caching. Counters persist.
    pub(crate) fn reset(&mut self) {
        self.used = 0;
        self.disabled = false;
    }

    pub(crate) fn stats(&self, caches: usize) -> CacheStats {
        CacheStats {
            caches,
            states: self.used,
            creates: self.creates,
            hits: self.hits,
            misses: self.misses,
            disabled: self.disabled,
        }
    }

    fn try_reserve(&mut self) -> bool {
        if self.disabled {
            return false;
        }
        if self.used >= self.capacity {
            debug!(
                "lazy DFA cache full at {} states; falling back to NFA traversal",
                self.capacity
            );
            self.disabled = true;
            return false;
        }
        self.used += 1;
        self.creates += 1;
        true
    }
}

/// Cache diagnostics for one execution context.
///
/// For tuning only; the numbers carry no behavioral contract.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lazy DFAs held, one per automaton the context has traversed.
    pub caches: usize,
    /// Cached DFA states currently held.
    pub states: usize,
    /// DFA states created over the context's lifetime.
    pub creates: u64,
    /// Transition lookups answered from the cache.
    pub hits: u64,
    /// Transition lookups that had to step the NFA.
    pub misses: u64,
    /// Whether the budget was exhausted and caching switched off. Once set it
    /// stays set for the context's life, except that
    /// [`ExecutionContext::clear_cache`](super::ExecutionContext::clear_cache)
    /// resets it.
    pub disabled: bool,
}

/// The lazily built DFA for one automaton snapshot.
pub(crate) struct LazyDfa<T> {
    /// `Automaton::id` of the snapshot these states were built from.
    snapshot: u64,
    states: Vec<LazyState<T>>,
    index: FxHashMap<Box<[StateId]>, u32>,
    start: Option<u32>,
}

impl<T: Clone + Eq + Hash> LazyDfa<T> {
    pub(crate) fn new(snapshot: u64) -> Self {
        Self {
            snapshot,
            states: Vec::new(),
            index: FxHashMap::default(),
            start: None,
        }
    }

    #[inline]
    pub(crate) fn snapshot(&self) -> u64 {
        self.snapshot
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.states.len()
    }

    #[inline]
    pub(crate) fn field_transitions(&self, id: u32) -> &[T] {
        &self.states[id as usize].field_transitions
    }

    #[inline]
    pub(crate) fn nfa_states(&self, id: u32) -> &[StateId] {
        &self.states[id as usize].nfa_states
    }

    /// The DFA state for the closure of the automaton's start state.
    pub(crate) fn start_state(
        &mut self,
        fa: &Automaton<T>,
        budget: &mut CacheBudget,
    ) -> Option<u32> {
        if let Some(id) = self.start {
            return Some(id);
        }
        let mut set = fa[fa.start()].epsilon_closure().to_vec();
        set.sort_unstable();
        let id = self.get_or_create(fa, &set, budget)?;
        self.start = Some(id);
        Some(id)
    }

    /// Follow `byte` out of DFA state `from`, computing and caching the
    /// transition on a miss. `scratch` is clobbered.
    pub(crate) fn step(
        &mut self,
        fa: &Automaton<T>,
        from: u32,
        byte: u8,
        budget: &mut CacheBudget,
        scratch: &mut Vec<StateId>,
    ) -> LazyStep {
        if byte as usize >= BYTE_CEILING {
            return LazyStep::Dead;
        }
        match self.states[from as usize].transitions[byte as usize] {
            Slot::To(next) => {
                budget.hits += 1;
                return LazyStep::To(next);
            }
            Slot::Dead => {
                budget.hits += 1;
                return LazyStep::Dead;
            }
            Slot::Unknown => budget.misses += 1,
        }

        scratch.clear();
        for &nfa_state in self.states[from as usize].nfa_states.iter() {
            let next = fa[nfa_state].table().step(byte);
            if !next.is_none() {
                scratch.extend_from_slice(fa[next].epsilon_closure());
            }
        }

        if scratch.is_empty() {
            self.states[from as usize].transitions[byte as usize] = Slot::Dead;
            return LazyStep::Dead;
        }

        scratch.sort_unstable();
        scratch.dedup();
        match self.get_or_create(fa, &scratch[..], budget) {
            Some(next) => {
                self.states[from as usize].transitions[byte as usize] = Slot::To(next);
                LazyStep::To(next)
            }
            None => LazyStep::Exhausted,
        }
    }

    /// Look up a sorted NFA state-set by identity, creating its DFA state if
    /// the budget allows.
    fn get_or_create(
        &mut self,
        fa: &Automaton<T>,
        set: &[StateId],
        budget: &mut CacheBudget,
    ) -> Option<u32> {
        if let Some(&id) = self.index.get(set) {
            return Some(id);
        }
        if !budget.try_reserve() {
            return None;
        }

        let mut seen = FxHashSet::default();
        let mut field_transitions = Vec::new();
        for &state in set {
            for t in fa[state].field_transitions() {
                if seen.insert(t) {
                    field_transitions.push(t.clone());
                }
            }
        }

        let id = self.states.len() as u32;
        let nfa_states: Box<[StateId]> = set.into();
        self.index.insert(nfa_states.clone(), id);
        self.states.push(LazyState {
            transitions: Box::new([Slot::Unknown; BYTE_CEILING]),
            field_transitions,
            nfa_states,
        });
        Some(id)
    }
}

/// Traverse `fa` through its lazy DFA, falling back to NFA stepping from the
/// current state-set if the budget runs out partway.
pub(crate) fn traverse_lazy<T: Clone + Eq + Hash>(
    fa: &Automaton<T>,
    val: &[u8],
    incoming: &[T],
    dfa: &mut LazyDfa<T>,
    budget: &mut CacheBudget,
    bufs: &mut NfaBuffers<T>,
    dedupe_threshold: usize,
) -> Vec<T> {
    debug_assert_eq!(dfa.snapshot(), fa.id());
    bufs.clear();
    bufs.transitions.add(incoming);

    let mut current = match dfa.start_state(fa, budget) {
        Some(id) => id,
        None => {
            bufs.current_states.push(fa.start());
            run_nfa(fa, val, 0, bufs, dedupe_threshold);
            return bufs.transitions.take();
        }
    };
    bufs.transitions.add(dfa.field_transitions(current));

    for i in 0..=val.len() {
        let byte = if i < val.len() { val[i] } else { VALUE_TERMINATOR };
        match dfa.step(fa, current, byte, budget, &mut bufs.next_states) {
            LazyStep::To(next) => {
                bufs.transitions.add(dfa.field_transitions(next));
                current = next;
            }
            LazyStep::Dead => break,
            LazyStep::Exhausted => {
                bufs.current_states.clear();
                bufs.current_states.extend_from_slice(dfa.nfa_states(current));
                run_nfa(fa, val, i, bufs, dedupe_threshold);
                break;
            }
        }
    }
    bufs.transitions.take()
}
