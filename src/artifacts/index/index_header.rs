use crate::artifacts::index::{HEADER_SIZE, SIGNATURE, VERSION};
use crate::errors::{Error, Result};
use byteorder::{ByteOrder, NetworkEndian, WriteBytesExt};
use bytes::Bytes;
use derive_new::new;
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct IndexHeader {
    pub marker: [u8; 4],
    pub version: u32,
    pub entries_count: u32,
}

impl IndexHeader {
    pub fn empty() -> Self {
        IndexHeader {
            marker: *SIGNATURE,
            version: VERSION,
            entries_count: 0,
        }
    }

    pub fn serialize(&self) -> Result<Bytes> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE);
        bytes.write_all(&self.marker)?;
        bytes.write_u32::<NetworkEndian>(self.version)?;
        bytes.write_u32::<NetworkEndian>(self.entries_count)?;

        Ok(Bytes::from(bytes))
    }

    /// Parse and validate a header
    ///
    /// Fails with `CorruptObject` on a short buffer, a foreign signature, or an
    /// unsupported version.
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::corrupt("index header is truncated"));
        }

        let mut marker = [0u8; 4];
        marker.copy_from_slice(&bytes[0..4]);
        if &marker != SIGNATURE {
            return Err(Error::corrupt("invalid index file signature"));
        }

        let version = NetworkEndian::read_u32(&bytes[4..8]);
        if version != VERSION {
            return Err(Error::corrupt(format!(
                "unsupported index file version {version}"
            )));
        }

        Ok(IndexHeader {
            marker,
            version,
            entries_count: NetworkEndian::read_u32(&bytes[8..12]),
        })
    }
}
