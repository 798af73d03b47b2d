//! In-memory `ListingSource` with call counting for pipeline tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::data::{ItemDetail, ItemId, ListingSource};

pub(crate) fn story(id: u64, title: &str) -> ItemDetail {
    let mut item = ItemDetail::placeholder(ItemId(id));
    item.title = Some(title.to_string());
    item.url = Some(format!("https://example.com/{}", id));
    item.kind = Some("story".to_string());
    item
}

pub(crate) fn dead(id: u64) -> ItemDetail {
    let mut item = ItemDetail::placeholder(ItemId(id));
    item.title = Some(format!("Ask HN {}", id));
    item
}

#[derive(Default)]
pub(crate) struct FakeSource {
    ranked: Mutex<Vec<ItemId>>,
    items: HashMap<ItemId, ItemDetail>,
    delays: HashMap<ItemId, Duration>,
    default_delay: Duration,
    ranked_calls: AtomicUsize,
    item_calls: Mutex<HashMap<ItemId, usize>>,
    active: AtomicUsize,
    peak_active: AtomicUsize,
}

impl FakeSource {
    pub(crate) fn new(ranked: &[u64], items: Vec<ItemDetail>) -> Self {
        Self {
            ranked: Mutex::new(ranked.iter().copied().map(ItemId).collect()),
            items: items.into_iter().map(|item| (item.id, item)).collect(),
            ..Self::default()
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub(crate) fn with_item_delay(mut self, id: u64, delay: Duration) -> Self {
        self.delays.insert(ItemId(id), delay);
        self
    }

    pub(crate) fn set_ranked(&self, ranked: &[u64]) {
        *self.ranked.lock().unwrap() = ranked.iter().copied().map(ItemId).collect();
    }

    pub(crate) fn ranked_calls(&self) -> usize {
        self.ranked_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn item_calls(&self, id: u64) -> usize {
        self.item_calls.lock().unwrap().get(&ItemId(id)).copied().unwrap_or(0)
    }

    pub(crate) fn total_item_calls(&self) -> usize {
        self.item_calls.lock().unwrap().values().sum()
    }

    pub(crate) fn peak_active(&self) -> usize {
        self.peak_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ListingSource for FakeSource {
    async fn fetch_ranked_ids(&self) -> Vec<ItemId> {
        self.ranked_calls.fetch_add(1, Ordering::SeqCst);
        self.ranked.lock().unwrap().clone()
    }

    async fn fetch_item(&self, id: ItemId) -> ItemDetail {
        *self.item_calls.lock().unwrap().entry(id).or_insert(0) += 1;
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_active.fetch_max(active, Ordering::SeqCst);

        let delay = self.delays.get(&id).copied().unwrap_or(self.default_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.active.fetch_sub(1, Ordering::SeqCst);
        self.items
            .get(&id)
            .cloned()
            .unwrap_or_else(|| ItemDetail::placeholder(id))
    }
}
