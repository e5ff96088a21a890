use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};
use uuid::Uuid;

/// IdGenerator
///
/// Source of new entity identifiers. Injected through the application state so tests can
/// predict the ids the handlers allocate.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> Uuid;
}

pub type IdGeneratorState = Arc<dyn IdGenerator>;

/// Random v4 ids; the production generator.
#[derive(Debug, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// SequentialIdGenerator
///
/// Yields `00000001-0000-0000-0000-000000000000`, `00000002-...` and so on.
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    counter: AtomicU32,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The id the n-th call returns (1-based).
    pub fn nth(n: u32) -> Uuid {
        Uuid::from_fields(n, 0, 0, &[0; 8])
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> Uuid {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Self::nth(n)
    }
}
