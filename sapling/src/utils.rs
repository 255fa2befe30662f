use std::hash::Hash;
use std::ops::{Deref, DerefMut};

use bincode::{
    de::Decoder,
    enc::Encoder,
    error::{DecodeError, EncodeError},
    Decode, Encode,
};
use hashbrown::HashMap;

#[derive(Clone, Debug)]
pub struct SerializableHashMap<K, V>(pub HashMap<K, V>);

impl<K, V> Default for SerializableHashMap<K, V> {
    fn default() -> Self {
        Self(HashMap::new())
    }
}

impl<K, V> Deref for SerializableHashMap<K, V> {
    type Target = HashMap<K, V>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<K, V> DerefMut for SerializableHashMap<K, V> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<K, V> Decode for SerializableHashMap<K, V>
where
    K: Decode + Eq + Hash,
    V: Decode,
{
    fn decode<D: Decoder>(decoder: &mut D) -> Result<Self, DecodeError> {
        let len: u64 = Decode::decode(decoder)?;
        let mut map = HashMap::new();
        for _ in 0..len {
            let k = Decode::decode(decoder)?;
            let v = Decode::decode(decoder)?;
            map.insert(k, v);
        }
        Ok(Self(map))
    }
}

impl<K, V> Encode for SerializableHashMap<K, V>
where
    K: Encode,
    V: Encode,
{
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        Encode::encode(&(self.0.len() as u64), encoder)?;
        for (k, v) in &self.0 {
            Encode::encode(k, encoder)?;
            Encode::encode(v, encoder)?;
        }
        Ok(())
    }
}

/// Tolerance used when comparing log-probabilities.
#[cfg(test)]
pub const EPSILON: f64 = 1e-9;

#[cfg(test)]
macro_rules! assert_close {
    ( $left:expr, $right:expr ) => {{
        let (left, right): (f64, f64) = ($left, $right);
        assert!(
            (left - right).abs() < crate::utils::EPSILON,
            "assertion failed: `{} ≈ {}`",
            left,
            right
        );
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializable_hash_map_encode_decode() {
        let mut map: SerializableHashMap<String, SerializableHashMap<(u32, u32), f64>> =
            SerializableHashMap::default();
        map.entry("NP".to_string())
            .or_default()
            .insert((1, 2), -0.5);
        map.entry("VP".to_string())
            .or_default()
            .insert((3, 4), -1.5);
        map.insert("S".to_string(), SerializableHashMap::default());

        let config = bincode::config::standard();
        let data = bincode::encode_to_vec(&map, config).unwrap();
        let (decoded, len): (SerializableHashMap<String, SerializableHashMap<(u32, u32), f64>>, _) =
            bincode::decode_from_slice(&data, config).unwrap();

        assert_eq!(data.len(), len);
        assert_eq!(3, decoded.len());
        assert_eq!(Some(&-0.5), decoded["NP"].get(&(1, 2)));
        assert_eq!(Some(&-1.5), decoded["VP"].get(&(3, 4)));
        assert!(decoded["S"].is_empty());
    }

    #[test]
    fn test_serializable_hash_map_decode_truncated() {
        let mut map: SerializableHashMap<String, f64> = SerializableHashMap::default();
        map.insert("fish".to_string(), 1.);
        map.insert("tanks".to_string(), 2.);

        let config = bincode::config::standard();
        let data = bincode::encode_to_vec(&map, config).unwrap();
        let decoded: Result<(SerializableHashMap<String, f64>, usize), _> =
            bincode::decode_from_slice(&data[..data.len() - 1], config);
        assert!(decoded.is_err());
    }
}
