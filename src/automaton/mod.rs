//! Automaton-based value matching engine
//!
//! Patterns for one field compile into fragment automata which are merged
//! into a single shared automaton. Values are matched by walking it byte by
//! byte, then the terminator. The key components are:
//!
//! - `SmallTable`: A compact byte-range transition table
//! - `FaState`: A state in the finite automaton
//! - `Automaton`: A sealed, immutable graph of states
//! - `ExecutionContext`: Per-caller buffers and lazy DFA caches
//! - `ValueMatcher`: The shared matcher with lock-free reads
//!
//! # Module Organization
//!
//! - `arena`: State storage and the sealed `Automaton`
//! - `small_table`: Byte-range transition tables
//! - `fa_builders`: FA construction functions (make_*_fa, merge_fas)
//! - `nfa`: NFA/DFA traversal functions
//! - `lazy_dfa`: On-demand subset construction with a bounded cache
//! - `context`: `ExecutionContext`, which owns caches and scratch space
//! - `value_matcher`: Snapshot publishing for concurrent readers

mod arena;
mod context;
mod fa_builders;
mod lazy_dfa;
mod nfa;
mod small_table;
mod sparse_set;
mod value_matcher;

pub use arena::{Automaton, FaState, StateArena, StateId};
pub use context::ExecutionContext;
pub use fa_builders::{
    make_anything_but_fa, make_monocase_fa, make_prefix_fa, make_shellstyle_fa, make_string_fa,
    make_wildcard_fa, merge_fas,
};
pub use lazy_dfa::CacheStats;
pub use nfa::traverse;
pub use small_table::{SmallTable, BYTE_CEILING, VALUE_TERMINATOR};
pub use value_matcher::{MatcherSnapshot, ValueMatcher};
