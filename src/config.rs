//! Tuning knobs for traversal.

/// Default ceiling on the number of lazily built DFA states one execution
/// context may hold.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Default size above which a step's state-set is deduplicated by sorting
/// rather than by linear scan.
pub const DEFAULT_DEDUPE_SORT_THRESHOLD: usize = 500;

/// Configuration for an [`ExecutionContext`](crate::ExecutionContext).
///
/// Unset knobs fall back to their defaults when read.
///
/// ```
/// use quamina_automaton::Config;
///
/// let config = Config::new().cache_capacity(64);
/// assert_eq!(config.get_cache_capacity(), 64);
/// assert_eq!(config.get_dedupe_sort_threshold(), 500);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Config {
    cache_capacity: Option<usize>,
    dedupe_sort_threshold: Option<usize>,
}

impl Config {
    pub fn new() -> Config {
        Config::default()
    }

    /// Set the maximum number of cached DFA states per execution context.
    ///
    /// Once a context needs one more state than this, its cache is disabled
    /// for the rest of its life and every traversal falls back to stepping
    /// the NFA directly. Results are identical either way; only speed
    /// differs. Each cached state costs roughly 2 KiB. A capacity of zero
    /// disables caching outright.
    pub fn cache_capacity(mut self, states: usize) -> Config {
        self.cache_capacity = Some(states);
        self
    }

    /// Set the state-set size above which duplicates are removed by
    /// sort-and-dedup instead of a quadratic scan.
    pub fn dedupe_sort_threshold(mut self, states: usize) -> Config {
        self.dedupe_sort_threshold = Some(states);
        self
    }

    pub fn get_cache_capacity(&self) -> usize {
        self.cache_capacity.unwrap_or(DEFAULT_CACHE_CAPACITY)
    }

    pub fn get_dedupe_sort_threshold(&self) -> usize {
        self.dedupe_sort_threshold.unwrap_or(DEFAULT_DEDUPE_SORT_THRESHOLD)
    }
}
