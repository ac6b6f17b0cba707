//! Base-selection heuristics for delta candidates.
//!
//! Before spending encoder time on a pair, the writer filters candidates
//! through a cheap admissibility test and ranks the survivors with a
//! similarity score. The score rewards close sizes, shared leading bytes,
//! matching paths, and shallow chains; the best admissible candidate in the
//! window becomes the delta base if the resulting delta earns its keep.

use std::collections::BTreeMap;

use crate::object::PackObject;

/// Objects smaller than this are never deltified.
pub const MIN_SIZE_FOR_DELTA: usize = 16;

/// Longest delta chain the writer will create.
pub const MAX_DELTA_CHAIN_DEPTH: u32 = 50;

/// Largest size ratio between a candidate base and its target.
pub const MAX_SIZE_RATIO: f64 = 2.0;

/// Number of preceding entries considered as delta bases.
pub const CANDIDATE_WINDOW: usize = 10;

/// Points awarded for size similarity.
const SIZE_POINTS: f64 = 30.0;

/// Points awarded for shared leading bytes.
const PREFIX_POINTS: f64 = 30.0;

/// Points for an exactly matching path.
const PATH_EQUAL_POINTS: f64 = 20.0;

/// Points for a matching trailing path component.
const PATH_BASENAME_POINTS: f64 = 10.0;

/// Points awarded for a shallow candidate chain.
const DEPTH_POINTS: f64 = 20.0;

/// Leading bytes probed for prefix similarity.
const PREFIX_PROBE: usize = 100;

/// Returns `true` when `candidate` may serve as a delta base for `target`.
///
/// Admissible candidates share the target's kind, sit below the chain-depth
/// cap, stay within a 2x size band, and are small enough to index.
#[must_use]
pub fn is_admissible(
    target: &PackObject<'_>,
    candidate: &PackObject<'_>,
    candidate_depth: u32,
    max_index_bytes: usize,
) -> bool {
    if candidate.kind() != target.kind() {
        return false;
    }
    if candidate_depth >= MAX_DELTA_CHAIN_DEPTH {
        return false;
    }
    if candidate.payload().len() > max_index_bytes {
        return false;
    }

    let larger = candidate.payload().len().max(target.payload().len());
    let smaller = candidate.payload().len().min(target.payload().len());
    if smaller == 0 {
        return false;
    }
    larger as f64 / smaller as f64 <= MAX_SIZE_RATIO
}

/// Scores a candidate base against a target on a 0-100 scale.
///
/// Components: size similarity (0-30), prefix similarity over at most 100
/// leading bytes (0-30), path similarity (0-20), and a preference for
/// shallow chains (0-20).
#[must_use]
pub fn compute_similarity_score(
    target: &PackObject<'_>,
    candidate: &PackObject<'_>,
    candidate_depth: u32,
) -> f64 {
    size_similarity(target.payload().len(), candidate.payload().len())
        + prefix_similarity(target.payload(), candidate.payload())
        + path_similarity(target.path(), candidate.path())
        + depth_preference(candidate_depth)
}

fn size_similarity(target_size: usize, candidate_size: usize) -> f64 {
    if target_size == 0 {
        return 0.0;
    }
    let difference = target_size.abs_diff(candidate_size) as f64;
    let ratio = (difference / target_size as f64).min(1.0);
    (1.0 - ratio) * SIZE_POINTS
}

fn prefix_similarity(target: &[u8], candidate: &[u8]) -> f64 {
    let probe = PREFIX_PROBE.min(target.len()).min(candidate.len());
    if probe == 0 {
        return 0.0;
    }
    let matching = target[..probe]
        .iter()
        .zip(&candidate[..probe])
        .take_while(|(a, b)| a == b)
        .count();
    matching as f64 / probe as f64 * PREFIX_POINTS
}

fn path_similarity(target: Option<&str>, candidate: Option<&str>) -> f64 {
    match (target, candidate) {
        (Some(target), Some(candidate)) if target == candidate => PATH_EQUAL_POINTS,
        (Some(target), Some(candidate)) if basename(target) == basename(candidate) => {
            PATH_BASENAME_POINTS
        }
        _ => 0.0,
    }
}

fn depth_preference(candidate_depth: u32) -> f64 {
    (1.0 - f64::from(candidate_depth) / f64::from(MAX_DELTA_CHAIN_DEPTH)) * DEPTH_POINTS
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Decides whether a produced delta is worth keeping.
///
/// The delta must beat half the target size outright; it must also be
/// smaller than the base unless it is shorter than 100 bytes.
#[must_use]
pub fn accept_delta(delta_len: usize, target_len: usize, base_len: usize) -> bool {
    if delta_len * 2 >= target_len {
        return false;
    }
    delta_len < base_len || delta_len < 100
}

/// Computes the emission order as indices into `objects`.
///
/// Objects group by kind in type-code order. Within a kind they partition
/// by path (falling back to the first two oid hex characters), partitions
/// sort lexicographically by key, and each partition sorts by ascending
/// payload size. Versions of the same file therefore end up adjacent,
/// smallest first, which is what the candidate window feeds on.
#[must_use]
pub fn emission_order(objects: &[PackObject<'_>]) -> Vec<usize> {
    let mut order = Vec::with_capacity(objects.len());

    for kind in crate::object::ObjectKind::ALL {
        let mut partitions: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (index, object) in objects.iter().enumerate() {
            if object.kind() != kind {
                continue;
            }
            let key = match object.path() {
                Some(path) => path.to_owned(),
                None => object.oid().hex_prefix(),
            };
            partitions.entry(key).or_default().push(index);
        }

        for members in partitions.values_mut() {
            members.sort_by_key(|&index| objects[index].payload().len());
            order.extend_from_slice(members);
        }
    }

    order
}

/// Finds the best admissible base for `target` among `window`.
///
/// `window` pairs each candidate with its current chain depth. Returns the
/// position within `window` of the highest-scoring admissible candidate;
/// ties keep the earliest.
#[must_use]
pub fn find_best(
    target: &PackObject<'_>,
    window: &[(&PackObject<'_>, u32)],
    max_index_bytes: usize,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (position, (candidate, depth)) in window.iter().enumerate() {
        if !is_admissible(target, candidate, *depth, max_index_bytes) {
            continue;
        }
        let score = compute_similarity_score(target, candidate, *depth);
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((position, score));
        }
    }
    best.map(|(position, _)| position)
}
