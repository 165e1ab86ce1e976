//! Benchmarks for quamina-automaton value matching
//!
//! The same patterns matched through the shellstyle fast path, the plain
//! NFA walk and the lazy DFA cache.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use quamina_automaton::{
    make_shellstyle_fa, make_string_fa, merge_fas, Automaton, Config, ExecutionContext,
    ShellFastMatcher, ValueMatcher,
};

const MULTI_WILDCARD: &[u8] = b"*foo*bar*baz*";
const MULTI_WILDCARD_INPUT: &[u8] = b"prefix_foo_middle_bar_more_baz_suffix";

fn long_value(len: usize, needle_at_end: bool) -> Vec<u8> {
    let mut value: Vec<u8> = (0..len).map(|i| b"abcdefghij"[i % 10]).collect();
    if needle_at_end {
        value.extend_from_slice(b"needle");
    }
    value
}

fn bench_multi_wildcard(c: &mut Criterion) {
    let fast = ShellFastMatcher::from_unquoted(MULTI_WILDCARD).unwrap();
    c.bench_function("multi_wildcard_fast", |b| {
        b.iter(|| fast.is_match(black_box(MULTI_WILDCARD_INPUT)))
    });

    let fa = make_shellstyle_fa(MULTI_WILDCARD, "p1");
    let mut ctx = ExecutionContext::new();
    c.bench_function("multi_wildcard_nfa", |b| {
        b.iter(|| ctx.traverse(&fa, black_box(MULTI_WILDCARD_INPUT), &[]))
    });

    let mut ctx = ExecutionContext::new();
    c.bench_function("multi_wildcard_lazy_dfa", |b| {
        b.iter(|| ctx.traverse_with_cache(&fa, black_box(MULTI_WILDCARD_INPUT), &[]))
    });
}

/// One `*needle*` pattern against a long value, found at the end or not at all.
fn bench_long_value(c: &mut Criterion) {
    let fast = ShellFastMatcher::from_unquoted(b"*needle*").unwrap();
    let fa = make_shellstyle_fa(b"*needle*", "p1");
    for (name, value) in [
        ("long_value_hit", long_value(1000, true)),
        ("long_value_miss", long_value(1000, false)),
    ] {
        c.bench_function(&format!("{}_fast", name), |b| {
            b.iter(|| fast.is_match(black_box(&value)))
        });

        let mut ctx = ExecutionContext::new();
        c.bench_function(&format!("{}_lazy_dfa", name), |b| {
            b.iter(|| ctx.traverse_with_cache(&fa, black_box(&value), &[]))
        });
    }
}

/// 26 overlapping patterns merged into one automaton; the case the lazy
/// DFA exists for.
fn bench_merged_shellstyle(c: &mut Criterion) {
    let fa = ('a'..='z').fold(Automaton::empty(), |acc, letter| {
        let pattern = format!("*{}?*", letter);
        merge_fas(&acc, &make_shellstyle_fa(pattern.as_bytes(), letter))
    });
    let value = b"the quick? brown fox? jumps over the lazy? dog";

    let mut ctx = ExecutionContext::new();
    c.bench_function("merged_26_nfa", |b| b.iter(|| ctx.traverse(&fa, black_box(value), &[])));

    let mut ctx = ExecutionContext::new();
    c.bench_function("merged_26_lazy_dfa", |b| {
        b.iter(|| ctx.traverse_with_cache(&fa, black_box(value), &[]))
    });

    let mut ctx = ExecutionContext::with_config(Config::new().cache_capacity(4));
    c.bench_function("merged_26_exhausted_cache", |b| {
        b.iter(|| ctx.traverse_with_cache(&fa, black_box(value), &[]))
    });
}

fn bench_exact_strings(c: &mut Criterion) {
    let fa = (0..100).fold(Automaton::empty(), |acc, i| {
        merge_fas(&acc, &make_string_fa(format!("status_{}", i).as_bytes(), i))
    });
    let mut ctx = ExecutionContext::new();
    c.bench_function("100_exact_strings", |b| {
        b.iter(|| ctx.traverse_with_cache(&fa, black_box(b"status_50"), &[]))
    });
}

fn bench_value_matcher(c: &mut Criterion) {
    let vm = ValueMatcher::new();
    for letter in 'A'..='Z' {
        vm.add_shellstyle(format!("{}*", letter).as_bytes(), letter);
    }
    vm.add_shellstyle(b"*E?E*", '?');
    let mut ctx = ExecutionContext::new();
    c.bench_function("value_matcher_27_patterns", |b| {
        b.iter(|| vm.matches(&mut ctx, black_box(b"BELVE?EDERE"), &[]))
    });
}

criterion_group!(
    benches,
    bench_multi_wildcard,
    bench_long_value,
    bench_merged_shellstyle,
    bench_exact_strings,
    bench_value_matcher,
);
criterion_main!(benches);
