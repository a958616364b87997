//! Serde support: maps encode as ordered maps, sets as ordered sequences.
//!
//! Decoding uses the presorted build when the input arrives in strictly
//! ascending order, which is always the case for data this crate encoded,
//! and falls back to one insertion per entry otherwise.

use core::fmt;
use core::marker::PhantomData;

use alloc::vec::Vec;

use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Redwood, RedwoodMap, RedwoodSet};

fn rebuild<K: Ord, V>(entries: Vec<(K, V)>) -> Redwood<K, V> {
    if entries.windows(2).all(|pair| pair[0].0 < pair[1].0) {
        return Redwood::link_sorted(entries);
    }

    log::debug!("decoded entries are not presorted, inserting one by one");

    let mut tree = Redwood::with_capacity(entries.len());
    for (key, value) in entries {
        tree.add_node(key, value);
    }
    tree
}

impl<K, V> Serialize for RedwoodMap<K, V>
where
    K: Serialize,
    V: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct RedwoodMapVisitor<K, V> {
    marker: PhantomData<fn() -> RedwoodMap<K, V>>,
}

impl<'de, K, V> Visitor<'de> for RedwoodMapVisitor<K, V>
where
    K: Deserialize<'de> + Ord,
    V: Deserialize<'de>,
{
    type Value = RedwoodMap<K, V>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0).min(4096));
        while let Some(entry) = access.next_entry()? {
            entries.push(entry);
        }

        Ok(RedwoodMap {
            tree: rebuild(entries),
        })
    }
}

impl<'de, K, V> Deserialize<'de> for RedwoodMap<K, V>
where
    K: Deserialize<'de> + Ord,
    V: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(RedwoodMapVisitor {
            marker: PhantomData,
        })
    }
}

impl<K: Serialize> Serialize for RedwoodSet<K> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for key in self {
            seq.serialize_element(key)?;
        }
        seq.end()
    }
}

struct RedwoodSetVisitor<K> {
    marker: PhantomData<fn() -> RedwoodSet<K>>,
}

impl<'de, K> Visitor<'de> for RedwoodSetVisitor<K>
where
    K: Deserialize<'de> + Ord,
{
    type Value = RedwoodSet<K>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a sequence")
    }

    fn visit_seq<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0).min(4096));
        while let Some(key) = access.next_element()? {
            entries.push((key, ()));
        }

        Ok(RedwoodSet {
            map: RedwoodMap {
                tree: rebuild(entries),
            },
        })
    }
}

impl<'de, K> Deserialize<'de> for RedwoodSet<K>
where
    K: Deserialize<'de> + Ord,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(RedwoodSetVisitor {
            marker: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{RedwoodMap, RedwoodSet};

    #[test]
    fn map_serializes_in_key_order() {
        let map = RedwoodMap::from([(3, "c"), (1, "a"), (2, "b")]);

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"1":"a","2":"b","3":"c"}"#);
    }

    #[test]
    fn map_roundtrip() {
        let map: RedwoodMap<String, i32> = (0..40).map(|k| (format!("{k:02}"), k)).collect();

        let json = serde_json::to_string(&map).unwrap();
        let restored: RedwoodMap<String, i32> = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, map);
        assert!(restored.validate().is_ok());
    }

    #[test]
    fn unsorted_input_is_inserted_one_by_one() {
        let restored: RedwoodMap<String, i32> =
            serde_json::from_str(r#"{"b":2,"a":1,"c":3}"#).unwrap();

        assert_eq!(
            restored.keys().iter().map(String::as_str).collect::<Vec<_>>(),
            ["a", "b", "c"]
        );
        assert!(restored.validate().is_ok());
    }

    #[test]
    fn set_roundtrip() {
        let set = RedwoodSet::from([5, 3, 9]);

        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, "[3,5,9]");

        let restored: RedwoodSet<i32> = serde_json::from_str("[9,3,5,3]").unwrap();
        assert_eq!(restored, set);
    }
}
