/// Serialization format options for grid storages.
///
/// Each format has both a plain and an LZ4 compressed variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SerializationFormat {
    /// bincode with the standard configuration
    Bincode,
    /// bincode with LZ4 compression (default)
    #[default]
    BincodeLz4,
}

impl SerializationFormat {
    /// Returns true if this format uses LZ4 compression
    pub fn is_compressed(&self) -> bool {
        matches!(self, SerializationFormat::BincodeLz4)
    }
}

use crate::errors::SGError;
use serde::{de::DeserializeOwned, Serialize};

fn serialize_serde<T: Serialize>(data: &T) -> Result<Vec<u8>, SGError> {
    bincode::serde::encode_to_vec(data, bincode::config::standard()).map_err(|e| {
        log::error!("bincode encoding failed: {e}");
        SGError::SerializationFailed
    })
}

fn deserialize_serde<T: DeserializeOwned>(data: &[u8]) -> Result<T, SGError> {
    let (value, read) = bincode::serde::decode_from_slice(data, bincode::config::standard()).map_err(|e| {
        log::error!("bincode decoding failed: {e}");
        SGError::DeserializationFailed
    })?;
    if read != data.len() {
        return Err(SGError::DeserializationFailed);
    }
    Ok(value)
}

/// Serialize data to bytes using the specified format.
/// Applies LZ4 compression if the format variant ends with Lz4.
pub fn serialize<T: Serialize>(data: &T, format: SerializationFormat) -> Result<Vec<u8>, SGError> {
    let bytes = serialize_serde(data)?;
    if format.is_compressed() {
        Ok(lz4_flex::compress_prepend_size(&bytes))
    } else {
        Ok(bytes)
    }
}

/// Deserialize data from bytes using the specified format.
/// Applies LZ4 decompression if the format variant ends with Lz4.
pub fn deserialize<T: DeserializeOwned>(data: &[u8], format: SerializationFormat) -> Result<T, SGError> {
    if format.is_compressed() {
        let decompressed = lz4_flex::decompress_size_prepended(data)
            .map_err(|_| SGError::LZ4DecompressionFailed)?;
        deserialize_serde(&decompressed)
    } else {
        deserialize_serde(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
    struct TestData {
        level: Vec<u8>,
        index: Vec<u32>,
        name: String,
    }

    fn data() -> TestData {
        TestData { level: vec![1, 2, 2], index: vec![1, 1, 3], name: "test".to_string() }
    }

    #[test]
    fn test_bincode_roundtrip() {
        let bytes = serialize(&data(), SerializationFormat::Bincode).unwrap();
        let result: TestData = deserialize(&bytes, SerializationFormat::Bincode).unwrap();
        assert_eq!(data(), result);
    }

    #[test]
    fn test_bincode_lz4_roundtrip() {
        let bytes = serialize(&data(), SerializationFormat::BincodeLz4).unwrap();
        let result: TestData = deserialize(&bytes, SerializationFormat::BincodeLz4).unwrap();
        assert_eq!(data(), result);
    }

    #[test]
    fn test_corrupt_input() {
        let bytes = serialize(&data(), SerializationFormat::Bincode).unwrap();
        let result: Result<TestData, _> = deserialize(&bytes, SerializationFormat::BincodeLz4);
        assert!(result.is_err());
        let result: Result<TestData, _> = deserialize(&bytes[..bytes.len() - 2], SerializationFormat::Bincode);
        assert_eq!(result, Err(SGError::DeserializationFailed));
    }
}
