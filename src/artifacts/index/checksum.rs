use crate::artifacts::digest::hasher::Hasher;
use crate::artifacts::index::CHECKSUM_SIZE;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::{Error, Result};
use bytes::Bytes;
use std::io::{ErrorKind, Read, Write};

/// Reader/writer adapter that digests every byte passing through it
///
/// The index file ends with the SHA-1 of everything before it; this wrapper
/// produces that trailer when writing and checks it when reading.
#[derive(Debug)]
pub struct Checksum<T> {
    inner: T,
    hasher: Hasher,
}

impl<T> Checksum<T> {
    pub fn new(inner: T) -> Self {
        Checksum {
            inner,
            hasher: Hasher::new(),
        }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<R: Read> Checksum<R> {
    pub fn read(&mut self, size: usize) -> Result<Bytes> {
        let mut buffer = vec![0; size];
        self.inner.read_exact(&mut buffer).map_err(|error| match error.kind() {
            ErrorKind::UnexpectedEof => Error::corrupt("unexpected end-of-file while reading index"),
            _ => Error::IoFailure(error),
        })?;

        self.hasher.update(&buffer)?;
        Ok(Bytes::from(buffer))
    }

    /// Compare the stored trailer with the digest of everything read so far
    pub fn verify(&mut self) -> Result<()> {
        let expected = ObjectId::read_raw_from(&mut self.inner).map_err(|error| {
            match error.kind() {
                ErrorKind::UnexpectedEof => Error::corrupt("index checksum is truncated"),
                _ => Error::IoFailure(error),
            }
        })?;

        let mut trailing = [0u8; 1];
        if self.inner.read(&mut trailing)? != 0 {
            return Err(Error::corrupt("unexpected data after index checksum"));
        }

        if expected != self.hasher.finalize() {
            return Err(Error::corrupt("index checksum does not match its contents"));
        }

        Ok(())
    }
}

impl<W: Write> Checksum<W> {
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.inner.write_all(data)?;
        self.hasher.update(data)?;
        Ok(())
    }

    pub fn write_checksum(&mut self) -> Result<()> {
        let checksum = self.hasher.finalize();
        debug_assert_eq!(checksum.as_bytes().len(), CHECKSUM_SIZE);

        checksum.write_raw_to(&mut self.inner)?;
        self.inner.flush()?;
        Ok(())
    }
}
