//! # K-way merge over sorted sequences.
//!
//! [`MergeIter`] merges any number of already-sorted sequences into one
//! sorted stream using a caller-supplied key projection. One cursor per
//! sequence; each emission picks the minimum projected key across the
//! sequence heads, with exhausted sequences comparing as +∞ and ties going
//! to the earliest sequence.
//!
//! Used twice by the broker: merging retained messages across descendant
//! nodes in publication order for late delivery, and merging subscription
//! lists across ancestor nodes in dispatch order for publish.

/// Merging iterator over `k` sorted sequences.
pub(crate) struct MergeIter<T, F> {
    tails: Vec<std::vec::IntoIter<T>>,
    // One peeked element per sequence; `None` is the exhausted sentinel.
    heads: Vec<Option<T>>,
    key: F,
}

impl<T, F> MergeIter<T, F> {
    /// `seqs` must each be sorted ascending under `key`.
    pub(crate) fn new(seqs: Vec<Vec<T>>, key: F) -> Self {
        let mut tails: Vec<_> = seqs.into_iter().map(Vec::into_iter).collect();
        let heads: Vec<_> = tails.iter_mut().map(Iterator::next).collect();
        MergeIter { tails, heads, key }
    }
}

impl<T, K, F> Iterator for MergeIter<T, F>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let mut best: Option<(usize, K)> = None;
        for (i, head) in self.heads.iter().enumerate() {
            let Some(item) = head else { continue };
            let k = (self.key)(item);
            match &best {
                Some((_, bk)) if *bk <= k => {}
                _ => best = Some((i, k)),
            }
        }
        let (i, _) = best?;
        std::mem::replace(&mut self.heads[i], self.tails[i].next())
    }
}
