use serde::{Serialize, Deserialize};
use crate::core::error::{Error, ErrorKind, Result};

/// Compressed block storage for snapshot bodies
#[derive(Serialize, Deserialize)]
pub struct CompressedBlock {
    pub data: Vec<u8>,
    pub original_size: usize,
    pub compression: CompressionType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionType {
    None,
    Lz4,
}

impl CompressedBlock {
    pub fn compress(data: &[u8], compression: CompressionType) -> Self {
        let compressed = match compression {
            CompressionType::None => data.to_vec(),
            CompressionType::Lz4 => lz4_flex::compress(data),
        };

        CompressedBlock {
            data: compressed,
            original_size: data.len(),
            compression,
        }
    }

    pub fn decompress(&self) -> Result<Vec<u8>> {
        match self.compression {
            CompressionType::None => Ok(self.data.clone()),
            CompressionType::Lz4 => lz4_flex::decompress(&self.data, self.original_size)
                .map_err(|e| Error::new(ErrorKind::Corruption, format!("lz4: {}", e))),
        }
    }
}
