//! Per-aggregate outbox of not-yet-dispatched domain events.

/// Buffer of domain events raised by one aggregate/entity instance.
///
/// Mutators `record` events as a side effect of a successful state change. The
/// application layer drains the buffer with [`DomainEvents::pull`] only after the
/// owning aggregate has been persisted; a drained buffer is empty, so a second
/// drain returns nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainEvents<E> {
    pending: Vec<E>,
}

impl<E> Default for DomainEvents<E> {
    fn default() -> Self {
        Self { pending: Vec::new() }
    }
}

impl<E> DomainEvents<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: E) {
        self.pending.push(event);
    }

    /// Take every buffered event, leaving the buffer empty.
    pub fn pull(&mut self) -> Vec<E> {
        std::mem::take(&mut self.pending)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
