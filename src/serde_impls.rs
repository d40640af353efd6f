use crate::hasharray::Hasharray;
use crate::hashing::KeyHashing;
use serde::{
    de::{self, MapAccess, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};
use std::fmt::{self, Formatter};
use std::marker::PhantomData;

struct HasharrayVisitor<K, V, H> {
    key_marker: PhantomData<K>,
    value_marker: PhantomData<V>,
    hashing_marker: PhantomData<H>,
}

impl<K, V, H> Serialize for Hasharray<K, V, H>
where
    K: Serialize,
    V: Serialize,
{
    fn serialize<Sr>(&self, serializer: Sr) -> Result<Sr::Ok, Sr::Error>
    where
        Sr: Serializer,
    {
        serializer.collect_map(self.iter())
    }
}

impl<'de, K, V, H> Deserialize<'de> for Hasharray<K, V, H>
where
    K: Deserialize<'de> + Eq,
    V: Deserialize<'de>,
    H: KeyHashing<K> + Default,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(HasharrayVisitor::new())
    }
}

impl<K, V, H> HasharrayVisitor<K, V, H> {
    pub(crate) fn new() -> Self {
        Self {
            key_marker: PhantomData,
            value_marker: PhantomData,
            hashing_marker: PhantomData,
        }
    }
}

impl<'de, K, V, H> Visitor<'de> for HasharrayVisitor<K, V, H>
where
    K: Deserialize<'de> + Eq,
    V: Deserialize<'de>,
    H: KeyHashing<K> + Default,
{
    type Value = Hasharray<K, V, H>;

    fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "a map")
    }

    fn visit_map<M>(self, mut access: M) -> Result<Self::Value, M::Error>
    where
        M: MapAccess<'de>,
    {
        let mut map = Hasharray::new();
        // Repeated keys were separate rows when serialized; keep them so.
        while let Some((key, value)) = access.next_entry()? {
            map.append(key, value).map_err(de::Error::custom)?;
        }
        Ok(map)
    }
}
