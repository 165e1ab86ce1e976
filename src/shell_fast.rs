//! Fast path for plain shellstyle patterns.
//!
//! A pattern of the form `*lit1*lit2*...*litN*` (leading and trailing `*`
//! optional) needs no automaton at all: anchor the first literal if the
//! pattern doesn't start with `*`, find each middle literal left to right,
//! then require the last literal at the end if the pattern doesn't end with
//! `*`. Leftmost placement of each middle literal leaves the most room for
//! the rest, so the scan never needs to backtrack.

use memchr::memmem::Finder;

use crate::automaton::BYTE_CEILING;

/// Substring matcher for one plain shellstyle pattern.
///
/// Built only for patterns whose one special byte is `*`; anything with
/// `?`, `[` or `\` is left to the automaton.
#[derive(Clone, Debug)]
pub struct ShellFastMatcher {
    literals: Vec<Finder<'static>>,
    starts_wild: bool,
    ends_wild: bool,
    /// Combined literal length; shorter inputs can't match.
    min_len: usize,
}

impl ShellFastMatcher {
    /// Build a matcher from a pattern wrapped in double quotes, as it
    /// appears in a pattern document.
    ///
    /// Returns `None` when the quotes are missing, the pattern is empty, or
    /// it uses `?`, `[` or `\`.
    pub fn new(quoted: &[u8]) -> Option<ShellFastMatcher> {
        match quoted {
            [b'"', pattern @ .., b'"'] => ShellFastMatcher::from_unquoted(pattern),
            _ => None,
        }
    }

    /// Build a matcher from a bare pattern.
    pub fn from_unquoted(pattern: &[u8]) -> Option<ShellFastMatcher> {
        if pattern.is_empty() || pattern.iter().any(|&b| matches!(b, b'?' | b'[' | b'\\')) {
            return None;
        }

        let literals: Vec<Finder<'static>> = pattern
            .split(|&b| b == b'*')
            .filter(|lit| !lit.is_empty())
            .map(|lit| Finder::new(lit).into_owned())
            .collect();
        let min_len = literals.iter().map(|f| f.needle().len()).sum();

        // All wildcards: matches anything.
        let all_wild = literals.is_empty();
        Some(ShellFastMatcher {
            starts_wild: all_wild || pattern[0] == b'*',
            ends_wild: all_wild || pattern[pattern.len() - 1] == b'*',
            literals,
            min_len,
        })
    }

    /// The literal segments between wildcards, in pattern order.
    pub fn literals(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.literals.iter().map(|f| f.needle())
    }

    pub fn starts_wild(&self) -> bool {
        self.starts_wild
    }

    pub fn ends_wild(&self) -> bool {
        self.ends_wild
    }

    /// Whether `input` (a raw value, no quotes) matches the pattern.
    ///
    /// A byte at or above `BYTE_CEILING` can't occur in a valid value, and
    /// `*` doesn't cover it: such inputs never match.
    pub fn is_match(&self, input: &[u8]) -> bool {
        if input.len() < self.min_len || input.iter().any(|&b| b as usize >= BYTE_CEILING) {
            return false;
        }
        let (first, rest) = match self.literals.split_first() {
            Some(split) => split,
            None => return true,
        };

        let mut pos = 0;
        let middle = if self.starts_wild {
            &self.literals[..]
        } else {
            if !input.starts_with(first.needle()) {
                return false;
            }
            pos = first.needle().len();
            if rest.is_empty() {
                return self.ends_wild || input.len() == pos;
            }
            rest
        };

        // Every literal but the last may sit anywhere after the previous one.
        let (last, middle) = match middle.split_last() {
            Some(split) => split,
            None => return true,
        };
        for finder in middle {
            match finder.find(&input[pos..]) {
                Some(at) => pos += at + finder.needle().len(),
                None => return false,
            }
        }

        if self.ends_wild {
            last.find(&input[pos..]).is_some()
        } else {
            input[pos..].ends_with(last.needle())
        }
    }
}

/// One-shot convenience: build a matcher for `quoted` and test `input`.
/// An inadmissible pattern matches nothing.
pub fn match_shell_fast(quoted: &[u8], input: &[u8]) -> bool {
    ShellFastMatcher::new(quoted).map_or(false, |m| m.is_match(input))
}
