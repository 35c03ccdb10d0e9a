//! In-process stand-in for the grouping step between mappers and aggregators.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// Group `(key, value)` pairs into `key -> values`, keeping per-key arrival order.
pub fn group_by_key<K: Ord, V, I>(pairs: I) -> BTreeMap<K, Vec<V>>
where
    I: IntoIterator<Item = (K, V)>,
{
    let mut groups: BTreeMap<K, Vec<V>> = BTreeMap::new();
    for (k, v) in pairs {
        groups.entry(k).or_default().push(v);
    }
    groups
}

/// Split complete groups into `partitions` disjoint shards. Groups whose `route`
/// values are equal always land in the same shard.
pub fn partition_by<K: Ord, V, R: Hash>(
    groups: BTreeMap<K, Vec<V>>,
    partitions: usize,
    route: impl Fn(&K) -> R,
) -> Vec<BTreeMap<K, Vec<V>>> {
    let n = partitions.max(1);
    let mut shards: Vec<BTreeMap<K, Vec<V>>> = (0..n).map(|_| BTreeMap::new()).collect();
    for (k, vs) in groups {
        let mut h = DefaultHasher::new();
        route(&k).hash(&mut h);
        let shard = (h.finish() % n as u64) as usize;
        shards[shard].insert(k, vs);
    }
    shards
}
