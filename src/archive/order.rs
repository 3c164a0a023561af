//! Page ordering for archive entries.

use rayon::prelude::*;

use crate::types::{ArchiveEntry, OrderingPolicy};

/// Orders `entries` according to `policy`.
///
/// - [`OrderingPolicy::ByNameAscending`]: stable sort on `(source_seq, name)`, names compared
///   byte-wise. Entries of a merged archive stay grouped by source in caller order no matter how
///   their prefixed names compare.
/// - [`OrderingPolicy::ByInsertionOffset`]: the order the container lists its entries in.
///
/// Names are unique inside one archive, so the result is deterministic.
pub fn order_entries(entries: &[ArchiveEntry], policy: OrderingPolicy) -> Vec<ArchiveEntry> {
    let mut ordered = entries.to_vec();
    match policy {
        OrderingPolicy::ByNameAscending => {
            ordered.par_sort_by(|a, b| {
                a.source_seq
                    .cmp(&b.source_seq)
                    .then_with(|| a.name.as_bytes().cmp(b.name.as_bytes()))
            });
        }
        OrderingPolicy::ByInsertionOffset => {
            ordered.sort_by_key(|entry| entry.index);
        }
    }
    ordered
}
