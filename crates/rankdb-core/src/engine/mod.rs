//! Backing-engine contract: ordered key-value storage with sorted-set
//! indexes, hash records, and atomic multi-command execution.
//!
//! Any engine offering these primitives qualifies (an in-process reference
//! implementation ships in [`memory`]). The store delegates every
//! cross-structure consistency guarantee to [`Engine::apply`]; it holds no
//! locks of its own.

use std::collections::BTreeMap;

use thiserror::Error;

pub mod memory;

pub use memory::MemoryEngine;

/// Transport and availability failures from the backing engine. The store
/// wraps these with the failing operation's name and never retries.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("NaN is not a valid score")]
    InvalidScore,

    #[error("engine unavailable: {0}")]
    Unavailable(String),

    #[error("engine protocol error: {0}")]
    Protocol(String),
}

/// One write in an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Store `value` at `key`, unconditionally overwriting any prior value.
    Set { key: String, value: Vec<u8> },
    /// Delete the record at `key`.
    Del { key: String },
    /// Upsert `member` into the sorted set at `key`, overwriting any prior
    /// score for that member.
    ZAdd {
        key: String,
        score: f64,
        member: String,
    },
    /// Remove `member` from the sorted set at `key`. A no-op if absent.
    ZRem { key: String, member: String },
    /// Set one field of the hash at `key`.
    HSet {
        key: String,
        field: String,
        value: Vec<u8>,
    },
}

/// Traversal direction for [`Engine::zrange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

/// The primitives the store consumes.
///
/// Implementations must be safe for unbounded concurrent use. `zrange` must
/// break score ties deterministically on the member string: ascending member
/// order under [`Order::Ascending`], descending under [`Order::Descending`],
/// so that pagination is stable across repeated calls.
pub trait Engine: Send + Sync {
    /// Fetch the record at `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, EngineError>;

    /// Fetch several records from one consistent snapshot. Results are
    /// positional: `results[i]` corresponds to `keys[i]`.
    fn get_many(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>, EngineError>;

    /// All fields of the hash at `key`; an absent hash is an empty map.
    fn hgetall(&self, key: &str) -> Result<BTreeMap<String, Vec<u8>>, EngineError>;

    /// Up to `count` members of the sorted set at `key`, starting at rank
    /// `offset` in the given score order. An absent set yields no members.
    fn zrange(
        &self,
        key: &str,
        offset: u64,
        count: u64,
        order: Order,
    ) -> Result<Vec<String>, EngineError>;

    /// Apply a batch of writes as one indivisible unit: concurrent readers
    /// observe either none or all of it. Returns the number of keys removed
    /// by [`Command::Del`] entries.
    fn apply(&self, commands: Vec<Command>) -> Result<u64, EngineError>;
}
