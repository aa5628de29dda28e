use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::RuntimeError;

/// Bytes of an ADL `ByteVector`. Serialized as standard padded base64.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ByteVector(pub Vec<u8>);

impl ByteVector {
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    pub fn from_base64(text: &str) -> Result<Self, RuntimeError> {
        Ok(ByteVector(STANDARD.decode(text)?))
    }
}

impl From<Vec<u8>> for ByteVector {
    fn from(bytes: Vec<u8>) -> Self {
        ByteVector(bytes)
    }
}

impl AsRef<[u8]> for ByteVector {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for ByteVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

struct Base64Visitor;

impl<'de> de::Visitor<'de> for Base64Visitor {
    type Value = ByteVector;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a base64 string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<ByteVector, E> {
        ByteVector::from_base64(v).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for ByteVector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(Base64Visitor)
    }
}
