//! The shared store of DFA states.
//!
//! States live in an append-only arena of fixed-size chunks, so a state never
//! moves once created and may be read without locking. Each distinct key is
//! interned exactly once, under a lock which only the creation path takes.
//! A state's transition table is published at most once.

use crate::automata::dfa::{StateId, StateKey, Transitions};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::OnceLock;

const CHUNK_BITS: u32 = 6;
const CHUNK_SIZE: usize = 1 << CHUNK_BITS;

/// A DFA state in the cache.
#[derive(Debug)]
pub struct StateRecord {
    pub key: StateKey,
    pub transitions: OnceLock<Transitions>,
}

type Chunk = Box<[OnceLock<StateRecord>]>;

#[derive(Debug)]
pub struct StateCache {
    chunks: Box<[OnceLock<Chunk>]>,
    index: Mutex<FxHashMap<StateKey, StateId>>,
    capacity: usize,
}

impl StateCache {
    /// Construct a cache holding at most `capacity` states.
    pub fn new(capacity: usize) -> Self {
        let chunk_count = (capacity + CHUNK_SIZE - 1) / CHUNK_SIZE;
        StateCache {
            chunks: (0..chunk_count).map(|_| OnceLock::new()).collect(),
            index: Mutex::new(FxHashMap::default()),
            capacity,
        }
    }

    /// Intern a key.
    /// \return the id of its state and whether it was newly created, or None if
    /// the key is new and the cache is full.
    pub fn intern(&self, key: StateKey) -> Option<(StateId, bool)> {
        let mut index = self.index.lock();
        if let Some(&id) = index.get(&key) {
            return Some((id, false));
        }
        let id = index.len();
        if id >= self.capacity {
            return None;
        }
        let chunk = self.chunks[id >> CHUNK_BITS]
            .get_or_init(|| (0..CHUNK_SIZE).map(|_| OnceLock::new()).collect());
        let record = StateRecord {
            key: key.clone(),
            transitions: OnceLock::new(),
        };
        if chunk[id & (CHUNK_SIZE - 1)].set(record).is_err() {
            rs_unreachable!("State slot initialized twice");
        }
        index.insert(key, id as StateId);
        log::trace!("interned DFA state {}", id);
        Some((id as StateId, true))
    }

    /// Access a state by id, without locking.
    #[inline]
    pub fn get(&self, id: StateId) -> Option<&StateRecord> {
        let id = id as usize;
        self.chunks
            .get(id >> CHUNK_BITS)?
            .get()?
            .get(id & (CHUNK_SIZE - 1))?
            .get()
    }

    /// \return the number of states created so far.
    pub fn len(&self) -> usize {
        self.index.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
