//! Arena-based state storage for the shared value automaton.
//!
//! States are addressed by `StateId` (a `u32` index) instead of `Arc` pointers.
//! Merging many fragments produces heavily shared structure, and `*` spinners
//! loop back onto themselves; with indices neither costs anything in ownership
//! terms. The identity of a state is its index, which is also what the lazy
//! DFA cache keys on.
//!
//! ```text
//!   start --f--> s1 --o--> s2 --o--> s3 --TERM--> match{p1}
//!                  \
//!                   --a--> s4 --TERM--> match{p2}
//! ```

use std::fmt;
use std::ops::{Index, IndexMut};
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use super::small_table::SmallTable;
use super::sparse_set::SparseSet;

/// A state identifier - just an index into the arena.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct StateId(u32);

impl StateId {
    /// Sentinel for "no state": a dead-end step.
    pub const NONE: StateId = StateId(u32::MAX);

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub(crate) fn from_index(index: usize) -> StateId {
        debug_assert!(index < u32::MAX as usize, "state arena overflow");
        StateId(index as u32)
    }
}

/// One automaton node: a transition table plus the payloads handed on when a
/// value reaches it.
#[derive(Clone)]
pub struct FaState<T> {
    pub(crate) table: SmallTable,
    pub(crate) field_transitions: SmallVec<[T; 1]>,
    /// Every state reachable through zero or more epsilon edges, this state
    /// first. Filled in when the automaton is sealed.
    pub(crate) epsilon_closure: Vec<StateId>,
}

impl<T> Default for FaState<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for FaState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaState")
            .field("table", &self.table)
            .field("field_transitions_count", &self.field_transitions.len())
            .field("epsilon_closure", &self.epsilon_closure)
            .finish()
    }
}

impl<T> FaState<T> {
    pub fn new() -> Self {
        Self::with_table(SmallTable::new())
    }

    pub fn with_table(table: SmallTable) -> Self {
        Self {
            table,
            field_transitions: SmallVec::new(),
            epsilon_closure: Vec::new(),
        }
    }

    #[inline]
    pub fn table(&self) -> &SmallTable {
        &self.table
    }

    #[inline]
    pub fn field_transitions(&self) -> &[T] {
        &self.field_transitions
    }

    #[inline]
    pub fn epsilon_closure(&self) -> &[StateId] {
        &self.epsilon_closure
    }
}

impl<T: PartialEq> FaState<T> {
    /// Add a payload unless an equal one is already present.
    pub(crate) fn add_field_transition(&mut self, transition: T) {
        if !self.field_transitions.contains(&transition) {
            self.field_transitions.push(transition);
        }
    }
}

/// Arena for allocating automaton states.
///
/// States are allocated contiguously and referenced by `StateId`.
#[derive(Clone)]
pub struct StateArena<T> {
    states: Vec<FaState<T>>,
}

impl<T> Default for StateArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for StateArena<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateArena")
            .field("states_count", &self.states.len())
            .finish()
    }
}

impl<T> StateArena<T> {
    pub fn new() -> Self {
        Self { states: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            states: Vec::with_capacity(capacity),
        }
    }

    /// Allocate a new empty state, returning its ID.
    pub fn alloc(&mut self) -> StateId {
        self.alloc_with_table(SmallTable::new())
    }

    /// Allocate a new state with the given table, returning its ID.
    pub fn alloc_with_table(&mut self, table: SmallTable) -> StateId {
        let id = StateId::from_index(self.states.len());
        self.states.push(FaState::with_table(table));
        id
    }

    #[inline]
    pub fn get(&self, id: StateId) -> Option<&FaState<T>> {
        if id.is_none() {
            None
        } else {
            self.states.get(id.index())
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Fill in every state's epsilon closure.
    fn compute_epsilon_closures(&mut self) {
        let mut seen = SparseSet::new(self.states.len());
        let mut stack = Vec::new();
        for index in 0..self.states.len() {
            let id = StateId::from_index(index);
            seen.clear();
            seen.insert(index);
            stack.push(id);
            let mut closure = vec![id];
            while let Some(current) = stack.pop() {
                for &eps in self.states[current.index()].table.epsilons() {
                    if !eps.is_none() && seen.insert(eps.index()) {
                        closure.push(eps);
                        stack.push(eps);
                    }
                }
            }
            self.states[index].epsilon_closure = closure;
        }
    }
}

impl<T> Index<StateId> for StateArena<T> {
    type Output = FaState<T>;

    #[inline]
    fn index(&self, id: StateId) -> &Self::Output {
        &self.states[id.index()]
    }
}

impl<T> IndexMut<StateId> for StateArena<T> {
    #[inline]
    fn index_mut(&mut self, id: StateId) -> &mut Self::Output {
        &mut self.states[id.index()]
    }
}

static NEXT_AUTOMATON_ID: AtomicU64 = AtomicU64::new(1);

fn next_automaton_id() -> u64 {
    NEXT_AUTOMATON_ID.fetch_add(1, Ordering::Relaxed)
}

/// A sealed, immutable automaton for one field.
///
/// Built fragments and merge results are both `Automaton`s. Once sealed, the
/// graph is never mutated, so any number of threads can traverse it. Every
/// sealed automaton gets a fresh `id`; `lineage` is inherited through merges
/// so an execution context can tell a republished snapshot from an unrelated
/// automaton.
#[derive(Clone)]
pub struct Automaton<T> {
    id: u64,
    lineage: u64,
    arena: StateArena<T>,
    start: StateId,
    deterministic: bool,
}

impl<T> fmt::Debug for Automaton<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Automaton")
            .field("id", &self.id)
            .field("lineage", &self.lineage)
            .field("states_count", &self.arena.len())
            .field("start", &self.start)
            .field("deterministic", &self.deterministic)
            .finish()
    }
}

impl<T> Default for Automaton<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Automaton<T> {
    /// An automaton that matches nothing: a single state with no transitions.
    pub fn empty() -> Self {
        let mut arena = StateArena::new();
        let start = arena.alloc();
        Self::seal(arena, start)
    }

    /// Seal a freshly built arena into an automaton with a new lineage.
    pub fn seal(arena: StateArena<T>, start: StateId) -> Self {
        let id = next_automaton_id();
        Self::seal_with_lineage(arena, start, id, id)
    }

    pub(crate) fn seal_inheriting(arena: StateArena<T>, start: StateId, lineage: u64) -> Self {
        Self::seal_with_lineage(arena, start, next_automaton_id(), lineage)
    }

    fn seal_with_lineage(mut arena: StateArena<T>, start: StateId, id: u64, lineage: u64) -> Self {
        assert!(
            !start.is_none() && start.index() < arena.len(),
            "automaton start state {:?} is not in the arena",
            start
        );
        arena.compute_epsilon_closures();
        let deterministic = arena.states.iter().all(|s| s.table.epsilons().is_empty());
        Self {
            id,
            lineage,
            arena,
            start,
            deterministic,
        }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn lineage(&self) -> u64 {
        self.lineage
    }

    #[inline]
    pub fn start(&self) -> StateId {
        self.start
    }

    /// True when no state carries an epsilon edge, so a single-state walk is exact.
    #[inline]
    pub fn is_deterministic(&self) -> bool {
        self.deterministic
    }

    pub fn state_count(&self) -> usize {
        self.arena.len()
    }

    pub fn state(&self, id: StateId) -> Option<&FaState<T>> {
        self.arena.get(id)
    }
}

impl<T> Index<StateId> for Automaton<T> {
    type Output = FaState<T>;

    #[inline]
    fn index(&self, id: StateId) -> &Self::Output {
        &self.arena[id]
    }
}
