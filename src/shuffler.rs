//! Top-level coordinator: accepts `(key, payload)` pairs, transparently
//! switches between an in-memory fast path and a disk-spilling slow path,
//! and re-emits every record exactly once in deterministic key order.

use crate::bucket::{bucket_path, Bucket};
use crate::config::ShufflerConfig;
use crate::error::ShufflerError;
use crate::hasher::KeyHasher;
use crate::selector::bucket_index;
use std::path::PathBuf;
use uuid::Uuid;

enum Phase {
    WritingInMemory,
    WritingSpilled,
}

/// Stable external-memory shuffler.
///
/// See the crate-level docs for the full state machine. In short:
/// `add`/`add_raw` accumulate records until [`Shuffler::iterate`] is
/// called, after which the instance is read-only — further `add` calls
/// return [`ShufflerError::AlreadyReadOnly`].
pub struct Shuffler {
    hasher: Box<dyn KeyHasher>,
    disable_shuffling: bool,
    config: ShufflerConfig,
    group_id: String,
    buckets: Vec<Bucket>,
    phase: Phase,
    mem_buffer: Vec<(u128, Vec<u8>)>,
    total_bytes: u64,
    read_only: bool,
}

impl Shuffler {
    /// Constructs a shuffler writing temporary bucket files under `dir`,
    /// using the default [`ShufflerConfig`].
    pub fn new(dir: impl Into<PathBuf>, hasher: Box<dyn KeyHasher>, disable_shuffling: bool) -> Self {
        Self::with_config(dir, hasher, disable_shuffling, ShufflerConfig::default())
    }

    /// Constructs a shuffler with an explicit [`ShufflerConfig`] — tests use
    /// this to lower `max_mem_buffer_size` and force the spilled path.
    pub fn with_config(
        dir: impl Into<PathBuf>,
        hasher: Box<dyn KeyHasher>,
        disable_shuffling: bool,
        config: ShufflerConfig,
    ) -> Self {
        let dir = dir.into();
        // Fresh per-instance identifier so concurrent Shufflers sharing
        // `dir` never collide on bucket filenames.
        let group_id = Uuid::new_v4().simple().to_string();
        let buckets = (0..config.buckets_number)
            .map(|i| Bucket::new(bucket_path(&dir, &group_id, i), config.write_buffer_bytes))
            .collect();

        Self {
            hasher,
            disable_shuffling,
            group_id,
            buckets,
            phase: Phase::WritingInMemory,
            mem_buffer: Vec::new(),
            total_bytes: 0,
            read_only: false,
            config,
        }
    }

    /// Total payload bytes accepted so far (keys are not counted).
    pub fn size(&self) -> u64 {
        self.total_bytes
    }

    /// In `WritingInMemory`, a one-element sequence equal to the buffer
    /// length; otherwise, per-bucket record counts.
    pub fn bucket_lengths(&self) -> Vec<usize> {
        match self.phase {
            Phase::WritingInMemory => vec![self.mem_buffer.len()],
            Phase::WritingSpilled => self.buckets.iter().map(Bucket::len).collect(),
        }
    }

    /// The per-instance group identifier embedded in this shuffler's
    /// bucket filenames.
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Adds `(key, payload)`, hashing `key` with the configured salted
    /// [`KeyHasher`]. Use this when the shuffler was constructed with
    /// `disable_shuffling = false`.
    pub fn add(&mut self, key: &[u8], payload: impl Into<Vec<u8>>) -> Result<(), ShufflerError> {
        let hkey = self.hasher.hash_key(key);
        self.add_hkey(hkey, payload.into())
    }

    /// Adds `(key, payload)` using `key` verbatim as the hashed key. Use
    /// this when the shuffler was constructed with `disable_shuffling =
    /// true`; `key` must be non-negative and fit in 128 bits, or this
    /// returns [`ShufflerError::KeyOutOfRange`] rather than silently
    /// wrapping or truncating.
    pub fn add_raw(&mut self, key: i128, payload: impl Into<Vec<u8>>) -> Result<(), ShufflerError> {
        if key < 0 {
            return Err(ShufflerError::KeyOutOfRange { key });
        }
        // i128::MAX < 2^128, so any non-negative i128 fits in u128.
        let hkey = key as u128;
        self.add_hkey(hkey, payload.into())
    }

    fn add_hkey(&mut self, hkey: u128, payload: Vec<u8>) -> Result<(), ShufflerError> {
        if self.read_only {
            return Err(ShufflerError::AlreadyReadOnly);
        }
        self.total_bytes += payload.len() as u64;
        match self.phase {
            Phase::WritingInMemory => {
                self.mem_buffer.push((hkey, payload));
                if self.total_bytes > self.config.max_mem_buffer_size {
                    self.spill_to_buckets()?;
                }
            }
            Phase::WritingSpilled => {
                self.add_to_bucket(hkey, &payload)?;
            }
        }
        Ok(())
    }

    fn add_to_bucket(&mut self, hkey: u128, payload: &[u8]) -> Result<(), ShufflerError> {
        let idx = bucket_index(hkey, self.config.buckets_number);
        self.buckets[idx].add(hkey, payload)?;
        Ok(())
    }

    fn spill_to_buckets(&mut self) -> Result<(), ShufflerError> {
        tracing::debug!(
            total_bytes = self.total_bytes,
            buckets = self.config.buckets_number,
            "spilling in-memory buffer to disk buckets"
        );
        let buffer = std::mem::take(&mut self.mem_buffer);
        for (hkey, payload) in buffer {
            self.add_to_bucket(hkey, &payload)?;
        }
        self.phase = Phase::WritingSpilled;
        Ok(())
    }

    /// Atomically transitions to read-only and returns a single-use,
    /// lazy, key-ordered stream of `(hkey, payload)`. Further `add`/`add_raw`
    /// calls fail with [`ShufflerError::AlreadyReadOnly`], even after this
    /// iterator is dropped without being fully consumed.
    pub fn iterate(&mut self) -> ShuffleIter<'_> {
        self.read_only = true;
        let disable_shuffling = self.disable_shuffling;
        match self.phase {
            Phase::WritingInMemory => {
                let mut buf = std::mem::take(&mut self.mem_buffer);
                if !disable_shuffling {
                    buf.sort_unstable_by_key(|(h, _)| *h);
                }
                ShuffleIter {
                    state: IterState::Memory(buf.into_iter()),
                    disable_shuffling,
                    previous: None,
                }
            }
            Phase::WritingSpilled => ShuffleIter {
                state: IterState::Buckets {
                    buckets: &mut self.buckets,
                    index: 0,
                    current: Vec::new().into_iter(),
                },
                disable_shuffling,
                previous: None,
            },
        }
    }
}

enum IterState<'a> {
    Memory(std::vec::IntoIter<(u128, Vec<u8>)>),
    Buckets {
        buckets: &'a mut [Bucket],
        index: usize,
        current: std::vec::IntoIter<(u128, Vec<u8>)>,
    },
}

/// Single-use, lazy, key-ordered stream produced by [`Shuffler::iterate`].
pub struct ShuffleIter<'a> {
    state: IterState<'a>,
    disable_shuffling: bool,
    previous: Option<(u128, Vec<u8>)>,
}

impl<'a> ShuffleIter<'a> {
    fn next_raw(&mut self) -> Option<Result<(u128, Vec<u8>), ShufflerError>> {
        match &mut self.state {
            IterState::Memory(iter) => iter.next().map(Ok),
            IterState::Buckets {
                buckets,
                index,
                current,
            } => {
                loop {
                    if let Some(item) = current.next() {
                        return Some(Ok(item));
                    }
                    if *index >= buckets.len() {
                        return None;
                    }
                    let bucket = &mut buckets[*index];
                    let loaded = match bucket.read_values() {
                        Ok(reader) => match reader.collect::<anyhow::Result<Vec<_>>>() {
                            Ok(v) => v,
                            Err(e) => return Some(Err(ShufflerError::from(e))),
                        },
                        Err(e) => return Some(Err(ShufflerError::from(e))),
                    };
                    let mut loaded = loaded;
                    if !self.disable_shuffling {
                        loaded.sort_unstable_by_key(|(h, _)| *h);
                    }
                    if let Err(e) = bucket.delete() {
                        return Some(Err(ShufflerError::from(e)));
                    }
                    *index += 1;
                    *current = loaded.into_iter();
                }
            }
        }
    }
}

impl<'a> Iterator for ShuffleIter<'a> {
    type Item = Result<(u128, Vec<u8>), ShufflerError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (hkey, payload) = match self.next_raw()? {
            Ok(item) => item,
            Err(e) => return Some(Err(e)),
        };

        if let Some((prev_hkey, prev_payload)) = &self.previous {
            if *prev_hkey == hkey {
                return Some(Err(ShufflerError::DuplicateKeys {
                    hkey,
                    first: prev_payload.clone(),
                    second: payload,
                }));
            }
        }

        self.previous = Some((hkey, payload.clone()));
        Some(Ok((hkey, payload)))
    }
}
