use std::borrow::Borrow;
use std::hash::Hash;

use bincode::{
    de::Decoder,
    enc::Encoder,
    error::{DecodeError, EncodeError},
    Decode, Encode,
};

use crate::utils::SerializableHashMap;

/// Mapping from keys to accumulated weights, turned into a single discrete distribution in log
/// space by [`ProbabilityTable::normalize()`].
///
/// Keys enter the table only through [`ProbabilityTable::accumulate()`], so every key in the
/// table was observed at least once.
#[derive(Clone, Debug)]
pub struct ProbabilityTable<K> {
    values: SerializableHashMap<K, f64>,
    normalized: bool,
}

impl<K> Default for ProbabilityTable<K> {
    fn default() -> Self {
        Self {
            values: SerializableHashMap::default(),
            normalized: false,
        }
    }
}

impl<K> ProbabilityTable<K>
where
    K: Eq + Hash,
{
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `delta` to the weight of `key`. A key seen for the first time starts from zero.
    pub fn accumulate(&mut self, key: K, delta: f64) {
        debug_assert!(!self.normalized, "accumulate() after normalize()");
        *self.values.entry(key).or_insert(0.) += delta;
    }

    /// Replaces every weight `v` with `ln(v) - ln(norm)`.
    ///
    /// # Arguments
    ///
    /// * `total` - The normalizer. If `None`, the sum of the current weights is used.
    pub fn normalize(&mut self, total: Option<f64>) {
        debug_assert!(!self.normalized, "normalize() called twice");
        let norm = total
            .unwrap_or_else(|| self.values.values().sum::<f64>())
            .ln();
        for v in self.values.values_mut() {
            *v = v.ln() - norm;
        }
        self.normalized = true;
    }

    /// Gets the value of `key`, a weight before normalization and a log-probability after.
    pub fn get<Q>(&self, key: &Q) -> Option<f64>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.values.get(key).copied()
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.values.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, f64)> {
        self.values.iter().map(|(k, &v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.values.keys()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub const fn is_normalized(&self) -> bool {
        self.normalized
    }
}

impl<K> Decode for ProbabilityTable<K>
where
    K: Decode + Eq + Hash,
{
    fn decode<D: Decoder>(decoder: &mut D) -> Result<Self, DecodeError> {
        Ok(Self {
            values: Decode::decode(decoder)?,
            normalized: Decode::decode(decoder)?,
        })
    }
}

impl<K> Encode for ProbabilityTable<K>
where
    K: Encode,
{
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        Encode::encode(&self.values, encoder)?;
        Encode::encode(&self.normalized, encoder)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulate_sums_repeated_keys() {
        let mut table = ProbabilityTable::new();
        table.accumulate("a", 1.);
        table.accumulate("b", 2.);
        table.accumulate("a", 0.5);

        assert_eq!(2, table.len());
        assert_eq!(Some(1.5), table.get(&"a"));
        assert_eq!(Some(2.), table.get(&"b"));
        assert_eq!(None, table.get(&"c"));
    }

    #[test]
    fn test_normalize_by_sum() {
        let mut table = ProbabilityTable::new();
        table.accumulate("a", 1.);
        table.accumulate("b", 3.);
        table.normalize(None);

        assert!(table.is_normalized());
        assert_close!(0.25f64.ln(), table.get(&"a").unwrap());
        assert_close!(0.75f64.ln(), table.get(&"b").unwrap());
        let total: f64 = table.iter().map(|(_, v)| v.exp()).sum();
        assert_close!(1., total);
    }

    #[test]
    fn test_normalize_explicit_total_round_trip() {
        let counts = [("a", 2.), ("b", 5.), ("c", 0.25)];
        let mut table = ProbabilityTable::new();
        for &(k, v) in &counts {
            table.accumulate(k, v);
        }
        table.normalize(Some(10.));

        for &(k, v) in &counts {
            assert_close!(v, table.get(&k).unwrap().exp() * 10.);
        }
        let total: f64 = table.iter().map(|(_, v)| v.exp()).sum();
        assert_close!(7.25 / 10., total);
    }

    #[test]
    fn test_normalize_explicit_unit_total_keeps_probabilities() {
        let mut table = ProbabilityTable::new();
        table.accumulate("x", 0.9);
        table.accumulate("y", 0.1);
        table.normalize(Some(1.));

        assert_close!(0.9f64.ln(), table.get(&"x").unwrap());
        assert_close!(0.1f64.ln(), table.get(&"y").unwrap());
    }
}
