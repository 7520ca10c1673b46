use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::engine::Epoch;

/// Live platform stream objects by id, shared by the media source, the peer
/// connections and the page callback.
///
/// Streams a peer connection received are filed under that connection's
/// epoch so closing it can drop them all at once.
pub struct StreamStore<S> {
    inner: Rc<RefCell<Streams<S>>>,
}

struct Streams<S> {
    by_id: HashMap<String, S>,
    received_by: HashMap<String, Epoch>,
}

impl<S> Default for StreamStore<S> {
    fn default() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Streams {
                by_id: HashMap::new(),
                received_by: HashMap::new(),
            })),
        }
    }
}

impl<S> Clone for StreamStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: Clone> StreamStore<S> {
    pub fn insert(&self, id: &str, stream: S) {
        self.inner.borrow_mut().by_id.insert(id.to_string(), stream);
    }

    /// Stores a stream that arrived on peer connection `epoch`.
    pub fn insert_remote(&self, epoch: Epoch, id: &str, stream: S) {
        let mut inner = self.inner.borrow_mut();
        inner.by_id.insert(id.to_string(), stream);
        inner.received_by.insert(id.to_string(), epoch);
    }

    pub fn get(&self, id: &str) -> Option<S> {
        self.inner.borrow().by_id.get(id).cloned()
    }

    pub fn remove(&self, id: &str) -> Option<S> {
        let mut inner = self.inner.borrow_mut();
        inner.received_by.remove(id);
        inner.by_id.remove(id)
    }

    /// Drops every stream received on peer connection `epoch` and returns
    /// how many there were.
    pub fn remove_remote(&self, epoch: Epoch) -> usize {
        let mut inner = self.inner.borrow_mut();
        let ids: Vec<String> = inner
            .received_by
            .iter()
            .filter(|(_, owner)| **owner == epoch)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &ids {
            inner.received_by.remove(id);
            inner.by_id.remove(id);
        }
        ids.len()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
