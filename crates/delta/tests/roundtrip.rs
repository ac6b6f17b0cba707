//! Integration tests for delta encode/apply round-trips.
//!
//! Covers the universal delta properties (round-trip, empty source and
//! target, identical buffers, index soundness and completeness) and the
//! concrete end-to-end scenarios the pack pipeline depends on.

use rand::{Rng, SeedableRng};

use delta::{analyze, apply, encode, DeltaIndex, MIN_COPY_LEN};
use fingerprint::WINDOW;

fn round_trip(source: &[u8], target: &[u8]) -> Vec<u8> {
    let delta = encode(source, target).expect("encode");
    let rebuilt = apply(source, &delta).expect("apply");
    assert_eq!(rebuilt, target, "round-trip mismatch");
    delta
}

#[test]
fn hello_world_to_hello_everyone() {
    let source = b"hello world";
    let target = b"hello everyone";
    round_trip(source, target);
}

#[test]
fn identical_repeated_content_stays_tiny() {
    let data = b"identical content".repeat(100);
    let delta = round_trip(&data, &data);
    assert!(delta.len() <= 50, "delta was {} bytes", delta.len());
}

#[test]
fn small_numeric_edit_keeps_a_copy() {
    // Too short for window matching either side of the edit; the delta must
    // still round-trip even when it degenerates to inserts.
    let source: Vec<u8> = (0u8..10).collect();
    let target = vec![0, 1, 2, 99, 4, 5, 6, 7, 8, 9, 10, 11];
    round_trip(&source, &target);

    // With window-sized context the edit does produce copies.
    let source: Vec<u8> = (0u8..120).collect();
    let mut target = source.clone();
    target[60] = 201;
    let delta = round_trip(&source, &target);
    let stats = analyze(&source, &target).expect("analyze");
    assert!(stats.copy_instructions >= 1, "delta {delta:?} had no copy");
}

#[test]
fn single_edit_in_a_large_run_compresses_well() {
    let source = vec![b'a'; 10_000];
    let mut target = Vec::with_capacity(10_000);
    target.extend_from_slice(&vec![b'a'; 5_000]);
    target.extend_from_slice(b"CHANGED");
    target.extend_from_slice(&vec![b'a'; 4_993]);

    let delta = round_trip(&source, &target);
    assert!(
        delta.len() < target.len() / 10,
        "delta was {} bytes for a {}-byte target",
        delta.len(),
        target.len()
    );
}

#[test]
fn repeated_source_compresses_the_expansion() {
    let source = b"short source text";
    let target = source.repeat(100);
    let delta = round_trip(source, &target);
    assert!(
        delta.len() < target.len() / 5,
        "delta was {} bytes for a {}-byte target",
        delta.len(),
        target.len()
    );
}

#[test]
fn empty_target_round_trips() {
    let delta = encode(b"any source", b"").expect("encode");
    assert!(apply(b"any source", &delta).expect("apply").is_empty());
}

#[test]
fn empty_source_round_trips() {
    let target = b"all of this is literal data because there is no source";
    round_trip(b"", target);
}

#[test]
fn both_empty_round_trips() {
    round_trip(b"", b"");
}

#[test]
fn random_buffers_round_trip() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    for _ in 0..16 {
        let source_len = rng.gen_range(0..4096);
        let target_len = rng.gen_range(0..4096);
        let mut source = vec![0u8; source_len];
        let mut target = vec![0u8; target_len];
        rng.fill(&mut source[..]);
        rng.fill(&mut target[..]);
        round_trip(&source, &target);
    }
}

#[test]
fn random_mutations_of_the_source_round_trip() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    let mut source = vec![0u8; 8192];
    rng.fill(&mut source[..]);

    for _ in 0..8 {
        let mut target = source.clone();
        for _ in 0..rng.gen_range(1..40) {
            let at = rng.gen_range(0..target.len());
            target[at] = rng.gen();
        }
        // Splice in an unrelated run as well.
        let at = rng.gen_range(0..target.len());
        let insert: Vec<u8> = (0..rng.gen_range(1..200)).map(|_| rng.gen()).collect();
        target.splice(at..at, insert);

        let delta = round_trip(&source, &target);
        assert!(delta.len() < target.len());
    }
}

#[test]
fn index_matches_are_sound() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(99);
    let mut source = vec![0u8; 2048];
    rng.fill(&mut source[..]);
    let mut target = source[512..1536].to_vec();
    target.extend_from_slice(b"unrelated tail bytes for the walk");

    let index = DeltaIndex::new(&source).expect("index");
    for pos in 0..target.len() {
        if let Some(m) = index.find_match(&target, pos) {
            assert!(m.len >= WINDOW);
            assert_eq!(
                &source[m.src_offset..m.src_offset + m.len],
                &target[pos..pos + m.len],
                "unsound match at target position {pos}"
            );
        }
    }
}

#[test]
fn index_matches_are_complete() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(123);
    let mut source = vec![0u8; 1024];
    rng.fill(&mut source[..]);
    let index = DeltaIndex::new(&source).expect("index");

    // Every window taken verbatim from the source must be found.
    for start in (0..source.len() - WINDOW).step_by(37) {
        let target = &source[start..start + WINDOW];
        let m = index
            .find_match(target, 0)
            .unwrap_or_else(|| panic!("window at {start} not found"));
        assert!(m.len >= WINDOW);
    }
}

#[test]
fn min_copy_len_equals_the_window() {
    assert_eq!(MIN_COPY_LEN, WINDOW);
}

#[test]
fn shared_prefix_and_suffix_become_copies() {
    let prefix = b"shared prefix that is long enough to match".to_vec();
    let suffix = b"shared suffix that is also long enough to match".to_vec();
    let mut source = prefix.clone();
    source.extend_from_slice(b"OLD MIDDLE");
    source.extend_from_slice(&suffix);
    let mut target = prefix;
    target.extend_from_slice(b"freshly rewritten middle portion");
    target.extend_from_slice(&suffix);

    let delta = round_trip(&source, &target);
    let stats = analyze(&source, &target).expect("analyze");
    assert!(stats.copy_instructions >= 2);
    assert!(delta.len() < target.len());
}
