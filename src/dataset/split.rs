use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// Position of a document in `[0, 1]`, from the first 32 bits of `sha256(seed:doc_id)`.
///
/// An empty seed hashes the bare doc id, which keeps historical splits stable.
pub fn split_bucket(doc_id: &str, seed: &str) -> f64 {
    let key = if seed.is_empty() {
        doc_id.to_string()
    } else {
        format!("{seed}:{doc_id}")
    };
    let digest = Sha256::digest(key.as_bytes());
    let prefix = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    f64::from(prefix) / f64::from(u32::MAX)
}

/// Document-level split into `(train, holdout)`.
///
/// Whole documents land on one side so no document leaks between training and
/// evaluation. Whenever there are at least two documents both sides are non-empty.
pub fn split_docs_for_holdout<'a, I>(
    doc_ids: I,
    holdout_ratio: f64,
    seed: &str,
) -> (BTreeSet<String>, BTreeSet<String>)
where
    I: IntoIterator<Item = &'a str>,
{
    let mut train = BTreeSet::new();
    let mut holdout = BTreeSet::new();

    let unique: BTreeSet<&str> = doc_ids.into_iter().collect();
    for doc_id in unique {
        if split_bucket(doc_id, seed) < holdout_ratio {
            holdout.insert(doc_id.to_string());
        } else {
            train.insert(doc_id.to_string());
        }
    }

    if holdout.is_empty() {
        if let Some(moved) = train.pop_first() {
            holdout.insert(moved);
        }
    }
    if train.is_empty() {
        if let Some(moved) = holdout.pop_first() {
            train.insert(moved);
        }
    }

    (train, holdout)
}
