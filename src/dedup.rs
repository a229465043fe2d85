//! Shifted-NDCG duplicate suppression.
//!
//! Within a query, documents can carry a duplicate-group id. Only the
//! best-ranked member of a group should earn gain; every later member whose
//! label does not beat the group's top label is neutralised: its label is
//! zeroed and its score is pushed to negative infinity so the next sort
//! moves it to the tail.

use crate::data::is_dupe_sentinel;

/// A duplicate-group id that does not map into the query's document range.
///
/// Group ids are query-local: id `g >= 2` denotes group index `g - 2`, which
/// must be below the query's document count. Anything else means the dataset
/// is corrupt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("duplicate group id {group} is out of range for a query of {n_docs} documents")]
pub struct InvalidDupeGroup {
    pub group: u32,
    pub n_docs: usize,
}

/// Neutralise non-best duplicates, walking documents in rank order.
///
/// `perm` is the rank-order permutation from the score sort; `labels`,
/// `scores` and `dupe_ids` are query-local. `group_tops` is scratch, reset
/// here.
///
/// The first member of a group seen in rank order fixes the group's top
/// label. Later members with a label no better than the top are suppressed;
/// a later member with a strictly better label is left alone (a better-rated
/// duplicate may legitimately promote).
pub fn suppress_duplicates(
    perm: &[usize],
    labels: &mut [u32],
    scores: &mut [f64],
    dupe_ids: &[u32],
    group_tops: &mut Vec<Option<u32>>,
) -> Result<(), InvalidDupeGroup> {
    let n_docs = perm.len();
    group_tops.clear();
    group_tops.resize(n_docs, None);

    for &p in perm {
        let id = dupe_ids[p];
        if is_dupe_sentinel(id) {
            continue;
        }
        let group = (id - 2) as usize;
        if group >= n_docs {
            return Err(InvalidDupeGroup { group: id, n_docs });
        }
        match group_tops[group] {
            None => group_tops[group] = Some(labels[p]),
            Some(top) => {
                if labels[p] <= top {
                    labels[p] = 0;
                    scores[p] = f64::NEG_INFINITY;
                }
            }
        }
    }
    Ok(())
}
