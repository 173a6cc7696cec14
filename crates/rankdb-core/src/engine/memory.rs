//! In-process reference engine.
//!
//! Sorted sets are kept as `(encoded score, member)` tuples in a `BTreeSet`,
//! so score order with the required member tie-break falls out of tuple
//! ordering. Atomicity of [`Engine::apply`] comes from holding the write
//! lock for the whole batch.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use parking_lot::RwLock;

use super::{Command, Engine, EngineError, Order};

/// Encode an f64 score into 8 bytes that preserve numeric ordering under
/// byte comparison: reject NaN, normalize -0.0 to +0.0, then flip all bits
/// for negatives and only the sign bit for positives.
fn score_key(score: f64) -> Result<[u8; 8], EngineError> {
    if score.is_nan() {
        return Err(EngineError::InvalidScore);
    }

    let score = if score == 0.0 { 0.0_f64 } else { score };

    let mut bits = score.to_bits();
    if bits & (1u64 << 63) != 0 {
        bits = !bits;
    } else {
        bits ^= 1u64 << 63;
    }
    Ok(bits.to_be_bytes())
}

#[derive(Default)]
struct SortedSet {
    scores: HashMap<String, [u8; 8]>,
    ordered: BTreeSet<([u8; 8], String)>,
}

impl SortedSet {
    fn upsert(&mut self, member: String, key: [u8; 8]) {
        if let Some(old) = self.scores.insert(member.clone(), key) {
            self.ordered.remove(&(old, member.clone()));
        }
        self.ordered.insert((key, member));
    }

    fn remove(&mut self, member: &str) {
        if let Some(old) = self.scores.remove(member) {
            self.ordered.remove(&(old, member.to_string()));
        }
    }

    fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

#[derive(Default)]
struct State {
    records: HashMap<String, Vec<u8>>,
    sorted: HashMap<String, SortedSet>,
    hashes: HashMap<String, BTreeMap<String, Vec<u8>>>,
}

/// Commands with scores pre-encoded, so a bad score is rejected before any
/// write happens and a batch can never be applied partially.
enum Op {
    Set(String, Vec<u8>),
    Del(String),
    ZAdd(String, [u8; 8], String),
    ZRem(String, String),
    HSet(String, String, Vec<u8>),
}

impl Op {
    fn resolve(command: Command) -> Result<Self, EngineError> {
        Ok(match command {
            Command::Set { key, value } => Op::Set(key, value),
            Command::Del { key } => Op::Del(key),
            Command::ZAdd { key, score, member } => Op::ZAdd(key, score_key(score)?, member),
            Command::ZRem { key, member } => Op::ZRem(key, member),
            Command::HSet { key, field, value } => Op::HSet(key, field, value),
        })
    }
}

/// Thread-safe in-memory engine implementing the full [`Engine`] contract.
#[derive(Default)]
pub struct MemoryEngine {
    state: RwLock<State>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Engine for MemoryEngine {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, EngineError> {
        Ok(self.state.read().records.get(key).cloned())
    }

    fn get_many(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>, EngineError> {
        let state = self.state.read();
        Ok(keys.iter().map(|k| state.records.get(k).cloned()).collect())
    }

    fn hgetall(&self, key: &str) -> Result<BTreeMap<String, Vec<u8>>, EngineError> {
        Ok(self.state.read().hashes.get(key).cloned().unwrap_or_default())
    }

    fn zrange(
        &self,
        key: &str,
        offset: u64,
        count: u64,
        order: Order,
    ) -> Result<Vec<String>, EngineError> {
        let state = self.state.read();
        let Some(set) = state.sorted.get(key) else {
            return Ok(Vec::new());
        };
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = usize::try_from(count).unwrap_or(usize::MAX);
        let members = match order {
            Order::Ascending => set
                .ordered
                .iter()
                .skip(skip)
                .take(take)
                .map(|(_, m)| m.clone())
                .collect(),
            Order::Descending => set
                .ordered
                .iter()
                .rev()
                .skip(skip)
                .take(take)
                .map(|(_, m)| m.clone())
                .collect(),
        };
        Ok(members)
    }

    fn apply(&self, commands: Vec<Command>) -> Result<u64, EngineError> {
        let ops = commands
            .into_iter()
            .map(Op::resolve)
            .collect::<Result<Vec<_>, _>>()?;

        let mut state = self.state.write();
        let mut deleted = 0u64;
        for op in ops {
            match op {
                Op::Set(key, value) => {
                    state.records.insert(key, value);
                }
                Op::Del(key) => {
                    if state.records.remove(&key).is_some() {
                        deleted += 1;
                    }
                }
                Op::ZAdd(key, score, member) => {
                    state.sorted.entry(key).or_default().upsert(member, score);
                }
                Op::ZRem(key, member) => {
                    if let Some(set) = state.sorted.get_mut(&key) {
                        set.remove(&member);
                        // A set with zero members is equivalent to no set.
                        if set.is_empty() {
                            state.sorted.remove(&key);
                        }
                    }
                }
                Op::HSet(key, field, value) => {
                    state.hashes.entry(key).or_default().insert(field, value);
                }
            }
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zadd(key: &str, score: f64, member: &str) -> Command {
        Command::ZAdd {
            key: key.to_string(),
            score,
            member: member.to_string(),
        }
    }

    #[test]
    fn test_score_key_ordering() {
        let values = [f64::NEG_INFINITY, -100.0, -0.5, 0.0, 0.5, 1e10, f64::INFINITY];
        let encoded: Vec<[u8; 8]> = values.iter().map(|&v| score_key(v).unwrap()).collect();
        for pair in encoded.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_score_key_rejects_nan() {
        assert!(matches!(score_key(f64::NAN), Err(EngineError::InvalidScore)));
    }

    #[test]
    fn test_negative_zero_equals_positive_zero() {
        assert_eq!(score_key(0.0).unwrap(), score_key(-0.0).unwrap());
    }

    #[test]
    fn test_set_get_del() {
        let engine = MemoryEngine::new();
        engine
            .apply(vec![Command::Set {
                key: "k".into(),
                value: b"v".to_vec(),
            }])
            .unwrap();
        assert_eq!(engine.get("k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(engine.get("absent").unwrap(), None);

        let deleted = engine.apply(vec![Command::Del { key: "k".into() }]).unwrap();
        assert_eq!(deleted, 1);
        let deleted = engine.apply(vec![Command::Del { key: "k".into() }]).unwrap();
        assert_eq!(deleted, 0);
        assert_eq!(engine.get("k").unwrap(), None);
    }

    #[test]
    fn test_get_many_positional() {
        let engine = MemoryEngine::new();
        engine
            .apply(vec![
                Command::Set {
                    key: "a".into(),
                    value: b"1".to_vec(),
                },
                Command::Set {
                    key: "c".into(),
                    value: b"3".to_vec(),
                },
            ])
            .unwrap();
        let got = engine
            .get_many(&["a".into(), "b".into(), "c".into()])
            .unwrap();
        assert_eq!(got, vec![Some(b"1".to_vec()), None, Some(b"3".to_vec())]);
    }

    #[test]
    fn test_zrange_score_order_and_tie_break() {
        let engine = MemoryEngine::new();
        engine
            .apply(vec![
                zadd("z", 2.0, "b"),
                zadd("z", 1.0, "c"),
                zadd("z", 2.0, "a"),
                zadd("z", -1.0, "d"),
            ])
            .unwrap();

        let asc = engine.zrange("z", 0, 10, Order::Ascending).unwrap();
        assert_eq!(asc, vec!["d", "c", "a", "b"]);

        let desc = engine.zrange("z", 0, 10, Order::Descending).unwrap();
        assert_eq!(desc, vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn test_zadd_overwrites_member_score() {
        let engine = MemoryEngine::new();
        engine
            .apply(vec![zadd("z", 1.0, "m"), zadd("z", 9.0, "m")])
            .unwrap();
        let members = engine.zrange("z", 0, 10, Order::Ascending).unwrap();
        assert_eq!(members, vec!["m"]);
    }

    #[test]
    fn test_zrange_offset_and_count() {
        let engine = MemoryEngine::new();
        engine
            .apply((0..5).map(|i| zadd("z", i as f64, &format!("m{i}"))).collect())
            .unwrap();
        assert_eq!(
            engine.zrange("z", 1, 2, Order::Ascending).unwrap(),
            vec!["m1", "m2"]
        );
        assert_eq!(
            engine.zrange("z", 4, 10, Order::Ascending).unwrap(),
            vec!["m4"]
        );
        assert!(engine.zrange("z", 99, 10, Order::Ascending).unwrap().is_empty());
        assert!(engine.zrange("absent", 0, 10, Order::Ascending).unwrap().is_empty());
    }

    #[test]
    fn test_zrem_last_member_drops_set() {
        let engine = MemoryEngine::new();
        engine.apply(vec![zadd("z", 1.0, "m")]).unwrap();
        engine
            .apply(vec![Command::ZRem {
                key: "z".into(),
                member: "m".into(),
            }])
            .unwrap();
        assert!(engine.zrange("z", 0, 10, Order::Ascending).unwrap().is_empty());
        assert!(engine.state.read().sorted.is_empty());
    }

    #[test]
    fn test_bad_score_rejects_whole_batch() {
        let engine = MemoryEngine::new();
        let result = engine.apply(vec![
            Command::Set {
                key: "k".into(),
                value: b"v".to_vec(),
            },
            zadd("z", f64::NAN, "m"),
        ]);
        assert!(result.is_err());
        // The Set preceding the bad ZAdd must not have been applied.
        assert_eq!(engine.get("k").unwrap(), None);
    }

    #[test]
    fn test_hset_hgetall() {
        let engine = MemoryEngine::new();
        assert!(engine.hgetall("h").unwrap().is_empty());
        engine
            .apply(vec![
                Command::HSet {
                    key: "h".into(),
                    field: "a".into(),
                    value: b"1".to_vec(),
                },
                Command::HSet {
                    key: "h".into(),
                    field: "b".into(),
                    value: b"1".to_vec(),
                },
            ])
            .unwrap();
        let fields: Vec<_> = engine.hgetall("h").unwrap().into_keys().collect();
        assert_eq!(fields, vec!["a", "b"]);
    }
}
