use crate::core::types::{DomainObject, Endpoint, ErrorInfo};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

type ObserverKey = (Endpoint, Option<String>);

/// Channel-backed observers keyed by (endpoint, symbol)
///
/// A `None` symbol observes every symbol of the endpoint. Delivery never
/// blocks the dispatch loop: a full channel drops the item with a warning and
/// a closed one is pruned.
#[derive(Debug)]
pub struct ObserverRegistry {
    buffer: usize,
    domain: HashMap<ObserverKey, Vec<mpsc::Sender<DomainObject>>>,
    errors: Vec<mpsc::Sender<ErrorInfo>>,
}

impl ObserverRegistry {
    pub fn new(buffer: usize) -> Self {
        Self {
            buffer: buffer.max(1),
            domain: HashMap::new(),
            errors: Vec::new(),
        }
    }

    pub fn observe(&mut self, endpoint: Endpoint, symbol: Option<&str>) -> mpsc::Receiver<DomainObject> {
        let (tx, rx) = mpsc::channel(self.buffer);
        self.domain
            .entry((endpoint, symbol.map(str::to_string)))
            .or_default()
            .push(tx);
        rx
    }

    pub fn observe_errors(&mut self) -> mpsc::Receiver<ErrorInfo> {
        let (tx, rx) = mpsc::channel(self.buffer);
        self.errors.push(tx);
        rx
    }

    pub fn observer_count(&self) -> usize {
        self.domain.values().map(Vec::len).sum::<usize>() + self.errors.len()
    }

    /// Deliver to symbol-specific and wildcard observers; returns the number of receivers reached
    pub fn dispatch(&mut self, endpoint: Endpoint, object: &DomainObject) -> usize {
        let symbol = object.symbol().map(str::to_string);
        let mut reached = 0;
        let mut keys = vec![(endpoint, None)];
        if symbol.is_some() {
            keys.push((endpoint, symbol));
        }
        for key in keys {
            if let Some(senders) = self.domain.get_mut(&key) {
                reached += deliver(senders, object);
                if senders.is_empty() {
                    self.domain.remove(&key);
                }
            }
        }
        reached
    }

    pub fn dispatch_error(&mut self, error: &ErrorInfo) -> usize {
        deliver(&mut self.errors, error)
    }
}

fn deliver<T: Clone>(senders: &mut Vec<mpsc::Sender<T>>, item: &T) -> usize {
    let mut reached = 0;
    senders.retain(|sender| match sender.try_send(item.clone()) {
        Ok(()) => {
            reached += 1;
            true
        }
        Err(TrySendError::Full(_)) => {
            warn!("Observer channel full, dropping message");
            true
        }
        Err(TrySendError::Closed(_)) => false,
    });
    reached
}
