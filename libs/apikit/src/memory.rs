use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::model::{Model, Store};

/// Process-local store keyed by id. Ids are handed out sequentially from 1.
#[derive(Debug)]
pub struct MemoryStore<M> {
    rows: RwLock<BTreeMap<i64, M>>,
    next_id: AtomicI64,
}

impl<M> Default for MemoryStore<M> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl<M: Model> MemoryStore<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

#[async_trait]
impl<M: Model> Store for MemoryStore<M> {
    type Item = M;

    async fn all(&self) -> anyhow::Result<Vec<M>> {
        Ok(self.rows.read().values().cloned().collect())
    }

    async fn get(&self, pk: i64) -> anyhow::Result<Option<M>> {
        Ok(self.rows.read().get(&pk).cloned())
    }

    async fn save(&self, mut item: M) -> anyhow::Result<M> {
        let id = match item.id() {
            Some(id) => id,
            None => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                item.set_id(id);
                id
            }
        };
        self.rows.write().insert(id, item.clone());
        Ok(item)
    }
}
