//! Append-only binary shard: one on-disk file holding a disjoint subset of
//! records, read back once as an ordered stream.
//!
//! File format (repeated):
//! ```text
//! ┌────────────────┬───────────────┬─────────────────┐
//! │ hkey: 16 bytes │ size: 8 bytes │ payload: N bytes│
//! └────────────────┴───────────────┴─────────────────┘
//! ```
//! No header, no trailer, no record-count prefix; EOF terminates the
//! stream and a partial frame is a read error.

use crate::config::HKEY_SIZE_BYTES;
use crate::hkey::{decode_hkey, decode_len, encode_hkey, encode_len};
use crate::oslimit;
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// A single disk-backed shard. Created empty; the file itself is opened
/// lazily on the first [`Bucket::add`].
pub struct Bucket {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    write_buffer_bytes: usize,
    len: usize,
    size: u64,
}

impl Bucket {
    pub fn new(path: PathBuf, write_buffer_bytes: usize) -> Self {
        Self {
            path,
            writer: None,
            write_buffer_bytes,
            len: 0,
            size: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    fn open_writer(&mut self) -> Result<()> {
        if self.writer.is_some() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create bucket directory {}", parent.display()))?;
        }
        let file = File::create(&self.path)
            .with_context(|| format!("create bucket file {}", self.path.display()))?;
        self.writer = Some(BufWriter::with_capacity(self.write_buffer_bytes, file));
        Ok(())
    }

    fn write_frame(&mut self, hkey: u128, payload: &[u8]) -> io::Result<()> {
        let w = self.writer.as_mut().expect("writer opened before write_frame");
        w.write_all(&encode_hkey(hkey))?;
        w.write_all(&encode_len(payload.len() as u64))?;
        w.write_all(payload)?;
        Ok(())
    }

    /// Appends `(hkey, payload)` to the shard. On open-file-descriptor
    /// exhaustion, raises the process's FD ceiling once and retries the
    /// write exactly once; any other I/O error propagates unchanged.
    pub fn add(&mut self, hkey: u128, payload: &[u8]) -> Result<()> {
        self.open_writer()?;

        match self.write_frame(hkey, payload) {
            Ok(()) => {}
            Err(e) if oslimit::is_fd_exhaustion(&e) => {
                tracing::warn!(
                    bucket = %self.path.display(),
                    "open-file-descriptor exhaustion writing bucket; raising limit and retrying once"
                );
                oslimit::raise_nofile_limit(crate::config::BUCKETS_NUMBER as u64);
                self.write_frame(hkey, payload)
                    .with_context(|| format!("retry write to {}", self.path.display()))?;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("write to {}", self.path.display()));
            }
        }

        self.len += 1;
        self.size += payload.len() as u64;
        Ok(())
    }

    fn flush_writer(&mut self) -> Result<()> {
        if let Some(mut w) = self.writer.take() {
            w.flush()
                .with_context(|| format!("flush bucket {}", self.path.display()))?;
        }
        Ok(())
    }

    /// Flushes and closes any open write handle, then returns a lazy
    /// reader over the shard's frames. A shard that was never written to
    /// (no file on disk) yields an empty stream rather than an error.
    pub fn read_values(&mut self) -> Result<BucketReader> {
        self.flush_writer()?;
        if !self.path.exists() {
            return Ok(BucketReader { reader: None });
        }
        let file = File::open(&self.path)
            .with_context(|| format!("open bucket {}", self.path.display()))?;
        Ok(BucketReader {
            reader: Some(BufReader::new(file)),
        })
    }

    /// Removes the shard's file if present; a no-op otherwise.
    pub fn delete(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("delete bucket {}", self.path.display()))?;
        }
        Ok(())
    }
}

/// Lazy iterator over the frames of a bucket shard, produced by
/// [`Bucket::read_values`].
pub struct BucketReader {
    reader: Option<BufReader<File>>,
}

impl Iterator for BucketReader {
    type Item = Result<(u128, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        let r = self.reader.as_mut()?;

        let mut hkey_buf = [0u8; HKEY_SIZE_BYTES];
        match r.read_exact(&mut hkey_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return None,
            Err(e) => return Some(Err(e).context("read bucket hkey frame")),
        }

        let mut len_buf = [0u8; 8];
        if let Err(e) = r.read_exact(&mut len_buf) {
            return Some(Err(e).context("truncated bucket frame: missing length prefix"));
        }
        let len = decode_len(&len_buf) as usize;

        let mut payload = vec![0u8; len];
        if let Err(e) = r.read_exact(&mut payload) {
            return Some(Err(e).context("truncated bucket frame: missing payload bytes"));
        }

        Some(Ok((decode_hkey(&hkey_buf), payload)))
    }
}

pub fn bucket_path(dir: &Path, group_id: &str, index: usize) -> PathBuf {
    dir.join(format!("bucket_{group_id}_{index:03}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn never_written_bucket_reads_empty_and_has_no_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bucket_x_000.tmp");
        let mut bucket = Bucket::new(path.clone(), 64 * 1024);
        assert!(!path.exists());
        let mut values: Vec<_> = bucket.read_values().unwrap().collect::<Result<_>>().unwrap();
        assert!(values.is_empty());
        values.clear();
        assert!(!path.exists());
    }

    #[test]
    fn round_trips_records_including_empty_payload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bucket_x_001.tmp");
        let mut bucket = Bucket::new(path.clone(), 64 * 1024);

        bucket.add(42, b"hello").unwrap();
        bucket.add(7, b"").unwrap();
        let big = vec![0xABu8; 5 * 1024 * 1024];
        bucket.add(u128::MAX, &big).unwrap();

        assert_eq!(bucket.len(), 3);
        assert_eq!(bucket.size(), 5 + 0 + big.len() as u64);

        let values: Vec<_> = bucket
            .read_values()
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(values, vec![(42u128, b"hello".to_vec()), (7, vec![]), (u128::MAX, big)]);
    }

    #[test]
    fn delete_removes_file_and_is_a_no_op_when_absent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bucket_x_002.tmp");
        let mut bucket = Bucket::new(path.clone(), 64 * 1024);
        bucket.add(1, b"x").unwrap();
        let _ = bucket.read_values().unwrap();
        assert!(path.exists());
        bucket.delete().unwrap();
        assert!(!path.exists());
        bucket.delete().unwrap();
    }

    #[test]
    fn truncated_frame_is_a_read_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bucket_x_003.tmp");
        std::fs::write(&path, [0u8; 10]).unwrap(); // shorter than one hkey frame
        let mut bucket = Bucket::new(path, 64 * 1024);
        let mut reader = bucket.read_values().unwrap();
        assert!(reader.next().unwrap().is_err());
    }
}
