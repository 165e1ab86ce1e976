//! quamina-automaton: the shared value-matching automaton behind quamina
//!
//! Every pattern on a field becomes a small automaton fragment; fragments
//! are merged into one automaton per field, and values are matched by
//! walking it once, whatever the number of patterns. Walks are
//! nondeterministic where `*` wildcards are involved, so each caller's
//! [`ExecutionContext`] memoizes visited state-sets as a lazily built DFA,
//! bounded by [`Config::cache_capacity`]. Plain `*lit*lit*` shellstyle
//! patterns skip the automaton entirely via [`ShellFastMatcher`].
//!
//! ```
//! use quamina_automaton::{ExecutionContext, ValueMatcher};
//!
//! let vm = ValueMatcher::new();
//! vm.add_string(b"active", "p1");
//! vm.add_shellstyle(b"*err*", "p2");
//! vm.add_shellstyle(b"a?*", "p3");
//!
//! let mut ctx = ExecutionContext::new();
//! assert_eq!(vm.matches(&mut ctx, b"active", &[]), vec!["p1"]);
//! assert_eq!(vm.matches(&mut ctx, b"a?error", &[]), vec!["p2", "p3"]);
//! assert!(vm.matches(&mut ctx, b"idle", &[]).is_empty());
//! ```
//!
//! The [`ValueMatcher`] can be shared between threads; each thread matches
//! with its own context:
//! ```
//! use quamina_automaton::{ExecutionContext, ValueMatcher};
//! use std::sync::Arc;
//!
//! let vm = Arc::new(ValueMatcher::<String>::new());
//! let reader = Arc::clone(&vm);
//! let handle = std::thread::spawn(move || {
//!     let mut ctx = ExecutionContext::new();
//!     reader.matches(&mut ctx, b"x", &[])
//! });
//! vm.add_string(b"x", "p1".to_string());
//! let _ = handle.join();
//! ```

pub mod automaton;
mod config;
mod shell_fast;

use std::fmt;

pub use automaton::{
    make_anything_but_fa, make_monocase_fa, make_prefix_fa, make_shellstyle_fa, make_string_fa,
    make_wildcard_fa, merge_fas, traverse, Automaton, CacheStats, ExecutionContext, FaState,
    MatcherSnapshot, SmallTable, StateArena, StateId, ValueMatcher, BYTE_CEILING, VALUE_TERMINATOR,
};
pub use config::{Config, DEFAULT_CACHE_CAPACITY, DEFAULT_DEDUPE_SORT_THRESHOLD};
pub use shell_fast::{match_shell_fast, ShellFastMatcher};

/// Errors that can occur while building automata
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutomatonError {
    InvalidPattern(String),
}

impl fmt::Display for AutomatonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutomatonError::InvalidPattern(msg) => write!(f, "invalid pattern: {}", msg),
        }
    }
}

impl std::error::Error for AutomatonError {}
