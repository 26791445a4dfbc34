/// Exclusive hold on a stored record. Dropping the guard releases the lock.
pub struct RecordLock(Box<dyn Send>);

impl RecordLock {
    pub fn new<G: Send + 'static>(guard: G) -> Self {
        Self(Box::new(guard))
    }

    /// A lock that guards nothing, for tests and single-process stores.
    pub fn noop() -> Self {
        Self::new(())
    }
}

impl std::fmt::Debug for RecordLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RecordLock")
    }
}

/// A record read after its lock was taken, together with that lock.
#[derive(Debug)]
pub struct Locked<T> {
    pub record: T,
    pub guard: RecordLock,
}

impl<T> Locked<T> {
    pub fn new(record: T, guard: RecordLock) -> Self {
        Self { record, guard }
    }

    pub fn unlocked(record: T) -> Self {
        Self::new(record, RecordLock::noop())
    }

    pub fn into_parts(self) -> (T, RecordLock) {
        (self.record, self.guard)
    }
}
