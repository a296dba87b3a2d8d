use std::sync::Mutex;

/// Results waiting for the owning thread. The lock is held only for a push or a swap.
pub(crate) struct CompletionQueue<T> {
    items: Mutex<Vec<T>>,
}

impl<T> CompletionQueue<T> {
    pub(crate) fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn push(&self, item: T) {
        self.items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(item);
    }

    /// Swaps out everything queued so far.
    pub(crate) fn take(&self) -> Vec<T> {
        std::mem::take(&mut *self.items.lock().unwrap_or_else(|e| e.into_inner()))
    }

    pub(crate) fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
