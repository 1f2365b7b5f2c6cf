//! Pure selection functions over already-enumerated pools.

use super::SourcePool;
use crate::core::fingerprint::ContentFingerprint;
use crate::core::source::ImageCandidate;
use crate::error::{FingerprintError, SelectionError};
use rand::Rng;
use std::path::Path;
use tracing::{debug, warn};

/// Pick a candidate: a non-empty pool uniformly, then an item uniformly in it.
///
/// Returns `(pool index, candidate index)`, or `None` when every pool is empty.
pub fn pick_one<R: Rng + ?Sized>(pools: &[SourcePool], rng: &mut R) -> Option<(usize, usize)> {
    let non_empty: Vec<usize> = pools
        .iter()
        .enumerate()
        .filter(|(_, pool)| !pool.is_empty())
        .map(|(index, _)| index)
        .collect();

    if non_empty.is_empty() {
        return None;
    }

    let pool = non_empty[rng.random_range(0..non_empty.len())];
    let item = rng.random_range(0..pools[pool].len());
    Some((pool, item))
}

/// Pick two candidates whose content differs.
///
/// The first pick is fingerprinted; if its file cannot be read it is
/// dropped and stage 1 runs again. Every candidate sharing the first
/// pick's fingerprint (or whose file cannot be read) is then removed from
/// all pools, pools left empty drop out, and the second pick runs over
/// what remains. Only the duplicate content is excluded, never the whole
/// source it came from.
pub fn pick_distinct_pair<R, F>(
    mut pools: Vec<SourcePool>,
    rng: &mut R,
    mut fingerprint: F,
) -> Result<(ImageCandidate, ImageCandidate), SelectionError>
where
    R: Rng + ?Sized,
    F: FnMut(&Path) -> Result<ContentFingerprint, FingerprintError>,
{
    let (first, first_fingerprint) = loop {
        let (pool, item) = pick_one(&pools, rng).ok_or(SelectionError::NoCandidates)?;
        let candidate = pools[pool].candidates.swap_remove(item);
        match fingerprint(&candidate.path) {
            Ok(fp) => break (candidate, fp),
            Err(e) => warn!(error = %e, "Dropping unreadable candidate"),
        }
    };

    for pool in &mut pools {
        pool.candidates.retain(|candidate| match fingerprint(&candidate.path) {
            Ok(fp) => fp != first_fingerprint,
            Err(e) => {
                warn!(error = %e, "Dropping unreadable candidate");
                false
            }
        });
    }
    pools.retain(|pool| !pool.is_empty());

    if pools.is_empty() {
        debug!(
            fingerprint = %first_fingerprint.short(),
            "Only one distinct image available"
        );
        return Err(SelectionError::InsufficientCandidates { available: 1 });
    }

    let (pool, item) = pick_one(&pools, rng).ok_or(SelectionError::NoCandidates)?;
    let second = pools[pool].candidates.swap_remove(item);
    Ok((first, second))
}
