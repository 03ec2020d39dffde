//! Pre-dispose notifications.
//!
//! Observers are registered on a handle life and run synchronously, in
//! registration order, right before the adapter is disposed. Each observer
//! runs at most once; the list is cleared with the life.

use core::fmt;

/// Token returned when registering a pre-dispose observer.
///
/// Only meaningful for the handle life it was issued by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

/// Callback receiving the resource one last time before it is released.
pub(crate) type PreDisposeFn<T> = Box<dyn FnOnce(Option<&T>) + Send>;

/// Ordered list of observers for one handle life.
pub(crate) struct ObserverList<T> {
    next_id: u64,
    entries: Vec<(ObserverId, PreDisposeFn<T>)>,
}

impl<T> ObserverList<T> {
    pub(crate) const fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, observer: PreDisposeFn<T>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, observer));
        id
    }

    pub(crate) fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Moves all observers out, leaving an empty list with a fresh id space.
    pub(crate) fn take(&mut self) -> Vec<(ObserverId, PreDisposeFn<T>)> {
        self.next_id = 0;
        core::mem::take(&mut self.entries)
    }
}
