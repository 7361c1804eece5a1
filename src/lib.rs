//! Stable external-memory shuffler.
//!
//! Ingests an arbitrary number of `(key, payload)` records and re-emits
//! every record exactly once in a deterministic, key-ordered sequence
//! that is pseudorandomly permuted with respect to insertion order. See
//! `SPEC_FULL.md` for the full design; `DESIGN.md` for the grounding
//! ledger behind each module.

mod bucket;
mod config;
mod error;
mod hasher;
mod hkey;
mod oslimit;
mod selector;
mod shuffler;
mod util;

pub use crate::config::{ShufflerConfig, BUCKETS_NUMBER, HKEY_SIZE_BYTES, MAX_MEM_BUFFER_SIZE};
pub use crate::error::ShufflerError;
pub use crate::hasher::{Blake3Hasher, KeyHasher};
pub use crate::hkey::{decode_hkey, decode_len, encode_hkey, encode_len};
pub use crate::selector::bucket_index;
pub use crate::shuffler::{ShuffleIter, Shuffler};
pub use crate::util::init_tracing_once;
