//! Ordered environment blocks.
//!
//! An [`EnvBlock`] keeps variable definitions in declaration order so that
//! substitution runs left to right. It deserializes from either format:
//!
//! ```yaml
//! env:
//!   A: "1"
//!   B: "${A}2"
//! ```
//!
//! ```yaml
//! env:
//!   - A: "1"
//!   - B: "${A}2"
//! ```

use std::fmt;

use serde::{
    Deserialize, Deserializer,
    de::{self, EnumAccess, MapAccess, SeqAccess, VariantAccess, Visitor},
};

/// A value inside an environment block.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<EnvValue>),
    Block(EnvBlock),
}

impl EnvValue {
    /// Flatten the value to the string stored in the environment.
    ///
    /// Scalars are stringified, lists and nested blocks are encoded as
    /// compact JSON.
    pub fn flatten(&self) -> String {
        match self {
            EnvValue::Null => String::new(),
            EnvValue::Bool(b) => b.to_string(),
            EnvValue::Number(n) => n.to_string(),
            EnvValue::String(s) => s.clone(),
            EnvValue::List(_) | EnvValue::Block(_) => self.to_json().to_string(),
        }
    }

    /// Convert to a JSON value. Nested blocks become objects, where a later
    /// duplicate key wins.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            EnvValue::Null => serde_json::Value::Null,
            EnvValue::Bool(b) => serde_json::Value::Bool(*b),
            EnvValue::Number(n) => serde_json::Value::Number(n.clone()),
            EnvValue::String(s) => serde_json::Value::String(s.clone()),
            EnvValue::List(items) => {
                serde_json::Value::Array(items.iter().map(EnvValue::to_json).collect())
            }
            EnvValue::Block(block) => {
                let mut object = serde_json::Map::new();
                for (key, value) in block.iter() {
                    object.insert(key.to_string(), value.to_json());
                }
                serde_json::Value::Object(object)
            }
        }
    }

    /// Returns true if this value is a list or a nested block
    pub fn is_nested(&self) -> bool {
        matches!(self, EnvValue::List(_) | EnvValue::Block(_))
    }
}

impl From<&str> for EnvValue {
    fn from(s: &str) -> Self {
        EnvValue::String(s.to_string())
    }
}

impl From<String> for EnvValue {
    fn from(s: String) -> Self {
        EnvValue::String(s)
    }
}

impl From<bool> for EnvValue {
    fn from(b: bool) -> Self {
        EnvValue::Bool(b)
    }
}

impl From<i64> for EnvValue {
    fn from(n: i64) -> Self {
        EnvValue::Number(n.into())
    }
}

/// Insertion-ordered sequence of `(key, value)` pairs.
///
/// Duplicate keys are kept; whoever resolves the block decides that the
/// later definition wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvBlock {
    entries: Vec<(String, EnvValue)>,
}

impl EnvBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a definition to the end of the block.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<EnvValue>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Get the last definition of `key`, if any.
    pub fn get(&self, key: &str) -> Option<&EnvValue> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EnvValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keys in declaration order, duplicates included.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for EnvBlock
where
    K: Into<String>,
    V: Into<EnvValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for EnvBlock {
    type Item = (String, EnvValue);
    type IntoIter = std::vec::IntoIter<(String, EnvValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Read the remaining entries of a mapping into `entries`, in order.
fn read_entries<'de, M>(
    mut map: M,
    entries: &mut Vec<(String, EnvValue)>,
) -> std::result::Result<(), M::Error>
where
    M: MapAccess<'de>,
{
    while let Some(key) = map.next_key::<EnvValue>()? {
        if key.is_nested() {
            return Err(de::Error::custom(
                "environment keys must be scalars, found a list or mapping",
            ));
        }
        let value = map.next_value::<EnvValue>()?;
        entries.push((key.flatten(), value));
    }
    Ok(())
}

impl<'de> Deserialize<'de> for EnvBlock {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct BlockVisitor;

        impl<'de> Visitor<'de> for BlockVisitor {
            type Value = EnvBlock;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a mapping of variables or a list of single-entry mappings")
            }

            fn visit_unit<E>(self) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(EnvBlock::new())
            }

            fn visit_none<E>(self) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(EnvBlock::new())
            }

            fn visit_map<M>(self, map: M) -> std::result::Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut entries = Vec::new();
                read_entries(map, &mut entries)?;
                Ok(EnvBlock { entries })
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut entries = Vec::new();
                while let Some(item) = seq.next_element::<EnvValue>()? {
                    match item {
                        EnvValue::Block(block) => entries.extend(block.entries),
                        EnvValue::Null => {}
                        _ => {
                            return Err(de::Error::custom(
                                "list entries of an environment block must be mappings",
                            ));
                        }
                    }
                }
                Ok(EnvBlock { entries })
            }
        }

        deserializer.deserialize_any(BlockVisitor)
    }
}

impl<'de> Deserialize<'de> for EnvValue {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = EnvValue;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a scalar, a list or a mapping")
            }

            fn visit_bool<E>(self, v: bool) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(EnvValue::Bool(v))
            }

            fn visit_i64<E>(self, v: i64) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(EnvValue::Number(v.into()))
            }

            fn visit_u64<E>(self, v: u64) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(EnvValue::Number(v.into()))
            }

            fn visit_f64<E>(self, v: f64) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                // NaN and infinities have no JSON number form
                Ok(serde_json::Number::from_f64(v)
                    .map(EnvValue::Number)
                    .unwrap_or_else(|| EnvValue::String(v.to_string())))
            }

            fn visit_str<E>(self, v: &str) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(EnvValue::String(v.to_string()))
            }

            fn visit_string<E>(self, v: String) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(EnvValue::String(v))
            }

            fn visit_unit<E>(self) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(EnvValue::Null)
            }

            fn visit_none<E>(self) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(EnvValue::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> std::result::Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                EnvValue::deserialize(deserializer)
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element::<EnvValue>()? {
                    items.push(item);
                }
                Ok(EnvValue::List(items))
            }

            fn visit_map<M>(self, map: M) -> std::result::Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut entries = Vec::new();
                read_entries(map, &mut entries)?;
                Ok(EnvValue::Block(EnvBlock { entries }))
            }

            // YAML tags (`!secret value`) arrive as enums; keep the value
            fn visit_enum<A>(self, data: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: EnumAccess<'de>,
            {
                let (_tag, variant) = data.variant::<String>()?;
                variant.newtype_variant::<EnvValue>()
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}
