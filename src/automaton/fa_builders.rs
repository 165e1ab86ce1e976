//! FA (Finite Automaton) construction functions.
//!
//! - `make_string_fa`: Exact string matching
//! - `make_prefix_fa`: Prefix matching
//! - `make_shellstyle_fa`: Shell-style `*` patterns
//! - `make_wildcard_fa`: Wildcard patterns with `\*` and `\\` escapes
//! - `make_anything_but_fa`: Negative matching
//! - `make_monocase_fa`: Case-insensitive matching
//! - `merge_fas`: Union of two automata
//!
//! Every builder returns a sealed single-pattern `Automaton` whose matching
//! state carries `payload`.

use std::collections::BTreeMap;
use std::hash::Hash;

use log::trace;
use rustc_hash::FxHashMap;

use super::arena::{Automaton, StateArena, StateId};
use super::small_table::{SmallTable, BYTE_CEILING, VALUE_TERMINATOR};
use crate::AutomatonError;

/// Allocate the state a successful match lands on.
fn match_state<T: PartialEq>(arena: &mut StateArena<T>, payload: T) -> StateId {
    let id = arena.alloc();
    arena[id].add_field_transition(payload);
    id
}

/// A state that accepts only the end of the value.
fn terminal_state<T: PartialEq>(arena: &mut StateArena<T>, payload: T) -> StateId {
    let matched = match_state(arena, payload);
    arena.alloc_with_table(SmallTable::with_mappings(
        StateId::NONE,
        &[VALUE_TERMINATOR],
        &[matched],
    ))
}

/// Build a chain of states for `bytes`, ending at `end`.
fn byte_chain<T>(arena: &mut StateArena<T>, bytes: &[u8], end: StateId) -> StateId {
    let mut current = end;
    for &byte in bytes.iter().rev() {
        current = if (byte as usize) < BYTE_CEILING {
            arena.alloc_with_table(SmallTable::with_mappings(StateId::NONE, &[byte], &[current]))
        } else {
            // Such a byte never occurs in a valid value, so nothing gets past it.
            arena.alloc()
        };
    }
    current
}

/// Build a `*` spinner: any non-terminator byte loops back, and an epsilon
/// edge tries `continuation` at every position.
fn spinner<T>(arena: &mut StateArena<T>, continuation: StateId) -> StateId {
    let spin = arena.alloc();
    let mut table = SmallTable::with_mappings(spin, &[VALUE_TERMINATOR], &[StateId::NONE]);
    table.add_epsilon(continuation);
    arena[spin].table = table;
    spin
}

/// Build a string-matching FA.
pub fn make_string_fa<T: PartialEq>(val: &[u8], payload: T) -> Automaton<T> {
    let mut arena = StateArena::with_capacity(val.len() + 2);
    let end = terminal_state(&mut arena, payload);
    let start = byte_chain(&mut arena, val, end);
    Automaton::seal(arena, start)
}

/// Build a prefix-matching FA: any value starting with `prefix`.
pub fn make_prefix_fa<T: PartialEq>(prefix: &[u8], payload: T) -> Automaton<T> {
    let mut arena = StateArena::with_capacity(prefix.len() + 2);
    let matched = match_state(&mut arena, payload);
    let after = arena.alloc_with_table(SmallTable::with_default(matched));
    let start = byte_chain(&mut arena, prefix, after);
    Automaton::seal(arena, start)
}

#[derive(Debug, PartialEq, Eq)]
enum Segment {
    Literal(Vec<u8>),
    Star,
}

fn shellstyle_segments(pattern: &[u8]) -> Vec<Segment> {
    pattern
        .split(|&b| b == b'*')
        .enumerate()
        .flat_map(|(i, literal)| {
            let star = (i > 0).then_some(Segment::Star);
            let literal = (!literal.is_empty()).then(|| Segment::Literal(literal.to_vec()));
            star.into_iter().chain(literal)
        })
        .collect()
}

fn wildcard_segments(pattern: &[u8]) -> Result<Vec<Segment>, AutomatonError> {
    let mut segments = Vec::new();
    let mut literal = Vec::new();
    let mut i = 0;
    while i < pattern.len() {
        match pattern[i] {
            b'*' => {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Star);
            }
            b'\\' => match pattern.get(i + 1) {
                Some(&escaped @ (b'*' | b'\\')) => {
                    literal.push(escaped);
                    i += 1;
                }
                Some(&other) => {
                    return Err(AutomatonError::InvalidPattern(format!(
                        "invalid escape '\\{}' at offset {}",
                        other as char, i
                    )))
                }
                None => {
                    return Err(AutomatonError::InvalidPattern(
                        "pattern ends with an unescaped backslash".to_string(),
                    ))
                }
            },
            b => literal.push(b),
        }
        i += 1;
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

fn build_from_segments<T: PartialEq>(segments: &[Segment], payload: T) -> Automaton<T> {
    let mut arena = StateArena::new();
    let mut next = terminal_state(&mut arena, payload);
    for segment in segments.iter().rev() {
        next = match segment {
            Segment::Literal(bytes) => byte_chain(&mut arena, bytes, next),
            Segment::Star => spinner(&mut arena, next),
        };
    }
    Automaton::seal(arena, next)
}

/// Build a shellstyle pattern FA.
///
/// `*` matches zero or more bytes; every other byte is literal. `pattern`
/// is given without its surrounding quotes.
pub fn make_shellstyle_fa<T: PartialEq>(pattern: &[u8], payload: T) -> Automaton<T> {
    build_from_segments(&shellstyle_segments(pattern), payload)
}

/// Build a wildcard pattern FA.
///
/// Like shellstyle, except `\*` is a literal asterisk and `\\` a literal
/// backslash. Any other escape is an error.
pub fn make_wildcard_fa<T: PartialEq>(
    pattern: &[u8],
    payload: T,
) -> Result<Automaton<T>, AutomatonError> {
    let segments = wildcard_segments(pattern)?;
    Ok(build_from_segments(&segments, payload))
}

/// Build an anything-but FA that matches any value NOT in `excluded`.
///
/// Every byte defaults to a success state. Bytes that continue an excluded
/// value lead deeper, and the terminator after a complete excluded value is
/// a dead end.
pub fn make_anything_but_fa<T: PartialEq>(excluded: &[&[u8]], payload: T) -> Automaton<T> {
    let mut arena = StateArena::new();
    let success = match_state(&mut arena, payload);
    let start = anything_but_step(&mut arena, excluded, 0, success);
    Automaton::seal(arena, start)
}

fn anything_but_step<T>(
    arena: &mut StateArena<T>,
    vals: &[&[u8]],
    index: usize,
    success: StateId,
) -> StateId {
    let mut unpacked = [success; BYTE_CEILING];
    if vals.iter().any(|v| v.len() == index) {
        unpacked[VALUE_TERMINATOR as usize] = StateId::NONE;
    }

    let mut groups: BTreeMap<u8, Vec<&[u8]>> = BTreeMap::new();
    for &val in vals {
        if val.len() > index && (val[index] as usize) < BYTE_CEILING {
            groups.entry(val[index]).or_default().push(val);
        }
    }
    for (byte, group) in groups {
        unpacked[byte as usize] = anything_but_step(arena, &group, index + 1, success);
    }

    let mut table = SmallTable::new();
    table.pack(&unpacked);
    arena.alloc_with_table(table)
}

/// Build an equals-ignore-case (monocase) FA.
///
/// Each character may also match its simple upper- and lowercase forms;
/// characters whose case mapping expands to several characters match only
/// themselves.
pub fn make_monocase_fa<T: PartialEq>(val: &str, payload: T) -> Automaton<T> {
    let mut arena = StateArena::new();
    let mut next = terminal_state(&mut arena, payload);
    for ch in val.chars().rev() {
        let mut forms: Vec<Vec<u8>> = vec![encode(ch)];
        for alt in [single(ch.to_lowercase()), single(ch.to_uppercase())].into_iter().flatten() {
            let bytes = encode(alt);
            if !forms.contains(&bytes) {
                forms.push(bytes);
            }
        }
        let forms: Vec<&[u8]> = forms.iter().map(Vec::as_slice).collect();
        next = alternatives(&mut arena, &forms, next);
    }
    Automaton::seal(arena, next)
}

fn single(mut mapping: impl Iterator<Item = char>) -> Option<char> {
    let ch = mapping.next()?;
    mapping.next().is_none().then_some(ch)
}

fn encode(ch: char) -> Vec<u8> {
    let mut buf = [0u8; 4];
    ch.encode_utf8(&mut buf).as_bytes().to_vec()
}

/// Branch over byte sequences that all lead to `end`, sharing common
/// leading bytes. UTF-8 encodings are prefix-free, so a sequence runs out
/// only where every sequence sharing its prefix does.
fn alternatives<T>(arena: &mut StateArena<T>, seqs: &[&[u8]], end: StateId) -> StateId {
    let mut groups: BTreeMap<u8, Vec<&[u8]>> = BTreeMap::new();
    for seq in seqs {
        groups.entry(seq[0]).or_default().push(&seq[1..]);
    }
    let mut bytes = Vec::with_capacity(groups.len());
    let mut targets = Vec::with_capacity(groups.len());
    for (byte, rests) in groups {
        let target = if rests.iter().any(|rest| rest.is_empty()) {
            end
        } else {
            alternatives(arena, &rests, end)
        };
        bytes.push(byte);
        targets.push(target);
    }
    arena.alloc_with_table(SmallTable::with_mappings(StateId::NONE, &bytes, &targets))
}

/// Merge two automata into one that matches the union of their languages.
///
/// The result is built as a product over pairs `(state in a, state in b)`,
/// either side possibly absent. Each pair is materialized once, so shared
/// structure and spinner self-loops terminate, and the walk uses an explicit
/// worklist rather than recursion. Bytes both sides step on lead to the
/// merged pair; payloads and epsilon edges of both sides are carried over.
/// The result inherits `a`'s lineage and holds only reachable states.
pub fn merge_fas<T: Clone + Eq + Hash>(a: &Automaton<T>, b: &Automaton<T>) -> Automaton<T> {
    let mut merger = Merger {
        a,
        b,
        arena: StateArena::with_capacity(a.state_count() + b.state_count()),
        memo: FxHashMap::default(),
        pending: Vec::new(),
    };
    let start = merger.intern(a.start(), b.start());
    while let Some((out, sa, sb)) = merger.pending.pop() {
        merger.fill(out, sa, sb);
    }
    trace!(
        "merged automata: {} + {} states -> {}",
        a.state_count(),
        b.state_count(),
        merger.arena.len()
    );
    Automaton::seal_inheriting(merger.arena, start, a.lineage())
}

struct Merger<'a, T> {
    a: &'a Automaton<T>,
    b: &'a Automaton<T>,
    arena: StateArena<T>,
    memo: FxHashMap<(StateId, StateId), StateId>,
    pending: Vec<(StateId, StateId, StateId)>,
}

impl<'a, T: Clone + Eq + Hash> Merger<'a, T> {
    /// The output state for a pair, allocating and queueing it on first sight.
    fn intern(&mut self, sa: StateId, sb: StateId) -> StateId {
        if sa.is_none() && sb.is_none() {
            return StateId::NONE;
        }
        if let Some(&out) = self.memo.get(&(sa, sb)) {
            return out;
        }
        let out = self.arena.alloc();
        self.memo.insert((sa, sb), out);
        self.pending.push((out, sa, sb));
        out
    }

    fn fill(&mut self, out: StateId, sa: StateId, sb: StateId) {
        let (a, b) = (self.a, self.b);
        let state_a = a.state(sa);
        let state_b = b.state(sb);

        let ua = state_a.map_or([StateId::NONE; BYTE_CEILING], |s| s.table().unpack());
        let ub = state_b.map_or([StateId::NONE; BYTE_CEILING], |s| s.table().unpack());
        let mut merged = [StateId::NONE; BYTE_CEILING];
        for i in 0..BYTE_CEILING {
            if i > 0 && ua[i] == ua[i - 1] && ub[i] == ub[i - 1] {
                merged[i] = merged[i - 1];
            } else {
                merged[i] = self.intern(ua[i], ub[i]);
            }
        }

        let mut table = SmallTable::new();
        table.pack(&merged);
        if let Some(s) = state_a {
            for &eps in s.table().epsilons() {
                table.add_epsilon(self.intern(eps, StateId::NONE));
            }
        }
        if let Some(s) = state_b {
            for &eps in s.table().epsilons() {
                table.add_epsilon(self.intern(StateId::NONE, eps));
            }
        }

        let target = &mut self.arena[out];
        target.table = table;
        for s in state_a.into_iter().chain(state_b) {
            for t in s.field_transitions() {
                target.add_field_transition(t.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::nfa::traverse;

    fn matches<T: Clone + Eq + Hash>(fa: &Automaton<T>, val: &str) -> Vec<T> {
        traverse(fa, val.as_bytes(), &[])
    }

    #[test]
    fn test_string_fa() {
        let fa = make_string_fa(b"abc", "p1");
        assert!(fa.is_deterministic());
        assert_eq!(matches(&fa, "abc"), vec!["p1"]);
        assert!(matches(&fa, "abd").is_empty());
        assert!(matches(&fa, "ab").is_empty());
        assert!(matches(&fa, "abcd").is_empty());
    }

    #[test]
    fn test_empty_string_fa() {
        let fa = make_string_fa(b"", "p1");
        assert_eq!(matches(&fa, ""), vec!["p1"]);
        assert!(matches(&fa, "a").is_empty());
    }

    #[test]
    fn test_prefix_fa() {
        let fa = make_prefix_fa(b"ab", "p1");
        assert_eq!(matches(&fa, "ab"), vec!["p1"]);
        assert_eq!(matches(&fa, "abc"), vec!["p1"]);
        assert!(matches(&fa, "a").is_empty());
        assert!(matches(&fa, "ac").is_empty());
    }

    #[test]
    fn test_shellstyle_segments() {
        assert_eq!(
            shellstyle_segments(b"*ab**c"),
            vec![
                Segment::Star,
                Segment::Literal(b"ab".to_vec()),
                Segment::Star,
                Segment::Star,
                Segment::Literal(b"c".to_vec()),
            ]
        );
        assert!(shellstyle_segments(b"").is_empty());
    }

    #[test]
    fn test_shellstyle_suffix() {
        let fa = make_shellstyle_fa(b"*bc", "p1");
        assert_eq!(matches(&fa, "bc"), vec!["p1"]);
        assert_eq!(matches(&fa, "abc"), vec!["p1"]);
        assert_eq!(matches(&fa, "xxbcbc"), vec!["p1"]);
        assert!(matches(&fa, "bcx").is_empty());
    }

    #[test]
    fn test_shellstyle_prefix() {
        let fa = make_shellstyle_fa(b"ab*", "p1");
        assert_eq!(matches(&fa, "ab"), vec!["p1"]);
        assert_eq!(matches(&fa, "abcdef"), vec!["p1"]);
        assert!(matches(&fa, "xab").is_empty());
    }

    #[test]
    fn test_shellstyle_infix() {
        let fa = make_shellstyle_fa(b"a*c", "p1");
        assert_eq!(matches(&fa, "ac"), vec!["p1"]);
        assert_eq!(matches(&fa, "abbbc"), vec!["p1"]);
        assert!(matches(&fa, "abcd").is_empty());
    }

    #[test]
    fn test_shellstyle_only_wildcards() {
        for pattern in [&b"*"[..], b"**", b"***"] {
            let fa = make_shellstyle_fa(pattern, "p1");
            assert_eq!(matches(&fa, ""), vec!["p1"]);
            assert_eq!(matches(&fa, "anything"), vec!["p1"]);
        }
    }

    #[test]
    fn test_wildcard_escapes() {
        let fa = make_wildcard_fa(br"a\*b*", "p1").unwrap();
        assert_eq!(matches(&fa, "a*b"), vec!["p1"]);
        assert_eq!(matches(&fa, "a*bcd"), vec!["p1"]);
        assert!(matches(&fa, "axb").is_empty());

        let fa = make_wildcard_fa(br"*\\", "p1").unwrap();
        assert_eq!(matches(&fa, r"dir\"), vec!["p1"]);
        assert!(matches(&fa, "dir").is_empty());
    }

    #[test]
    fn test_wildcard_rejects_bad_escapes() {
        assert!(matches!(
            make_wildcard_fa(br"a\b", "p1"),
            Err(AutomatonError::InvalidPattern(_))
        ));
        assert!(matches!(
            make_wildcard_fa(br"ab\", "p1"),
            Err(AutomatonError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_anything_but_fa() {
        let excluded = ["foo".as_bytes(), "foobar".as_bytes(), "".as_bytes()];
        let fa = make_anything_but_fa(&excluded, "p1");
        assert!(matches(&fa, "foo").is_empty());
        assert!(matches(&fa, "foobar").is_empty());
        assert!(matches(&fa, "").is_empty());
        assert_eq!(matches(&fa, "fo"), vec!["p1"]);
        assert_eq!(matches(&fa, "foob"), vec!["p1"]);
        assert_eq!(matches(&fa, "foobarx"), vec!["p1"]);
        assert_eq!(matches(&fa, "bar"), vec!["p1"]);
    }

    #[test]
    fn test_monocase_fa() {
        let fa = make_monocase_fa("HeLLo", "p1");
        assert_eq!(matches(&fa, "hello"), vec!["p1"]);
        assert_eq!(matches(&fa, "HELLO"), vec!["p1"]);
        assert!(matches(&fa, "hellp").is_empty());
        assert!(matches(&fa, "hell").is_empty());
    }

    #[test]
    fn test_monocase_fa_non_ascii() {
        let fa = make_monocase_fa("Straße Ωmega", "p1");
        assert_eq!(matches(&fa, "STRAßE ωMEGA"), vec!["p1"]);
        assert_eq!(matches(&fa, "straße ωmega"), vec!["p1"]);
        assert!(matches(&fa, "strasse omega").is_empty());
    }

    #[test]
    fn test_merge_two_strings() {
        let merged = merge_fas(&make_string_fa(b"foo", "p1"), &make_string_fa(b"fab", "p2"));
        assert!(merged.is_deterministic());
        assert_eq!(matches(&merged, "foo"), vec!["p1"]);
        assert_eq!(matches(&merged, "fab"), vec!["p2"]);
        assert!(matches(&merged, "fa").is_empty());
    }

    #[test]
    fn test_merge_shares_common_prefix() {
        let a = make_string_fa(b"abcdef", "p1");
        let b = make_string_fa(b"abcdeg", "p2");
        let merged = merge_fas(&a, &b);
        // Six shared states for "abcde" and the fork, then terminator and
        // match state for each tail.
        assert_eq!(merged.state_count(), 6 + 2 * 2);
    }

    #[test]
    fn test_merge_same_endpoint_keeps_both_payloads() {
        let merged = merge_fas(&make_string_fa(b"x", "p1"), &make_string_fa(b"x", "p2"));
        assert_eq!(matches(&merged, "x"), vec!["p1", "p2"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let frag = make_shellstyle_fa(b"*ab*", "p1");
        let once = merge_fas(&Automaton::empty(), &frag);
        let twice = merge_fas(&once, &frag);
        for input in ["ab", "xaby", "ba", "", "aab"] {
            assert_eq!(matches(&once, input), matches(&twice, input), "input {:?}", input);
        }
        assert_eq!(matches(&twice, "ab"), vec!["p1"]);
    }

    #[test]
    fn test_merge_keeps_lineage_of_left() {
        let base: Automaton<&str> = Automaton::empty();
        let merged = merge_fas(&base, &make_string_fa(b"a", "p1"));
        assert_eq!(merged.lineage(), base.lineage());
        assert_ne!(merged.id(), base.id());
    }
}
