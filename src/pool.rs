//! # Entity Pool
//!
//! A fixed-capacity pool of identified entities with strict take/return
//! accounting.
//!
//! ## Overview
//!
//! The pool bounds stage concurrency: a downloader or analyzer worker must
//! check an entity out before doing work and hand it back afterwards. The
//! free entities sit in a bounded channel of the pool's capacity, which gives
//! `take` its blocking semantics; an occupancy map keyed by entity id tracks
//! which entities are inside the pool so that a double return, or a return of
//! an entity the pool never owned, is detected as a structural error rather
//! than silently corrupting the accounting.
//!
//! At every instant `used() + <free entities> == total()`.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::atomic::{AtomicU32, Ordering};

use kanal::{AsyncReceiver, AsyncSender};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::error;

/// Monotone source of entity ids. One generator per pool.
#[derive(Debug, Default)]
pub struct IdGenerator(AtomicU32);

impl IdGenerator {
    pub fn new() -> Self {
        IdGenerator(AtomicU32::new(0))
    }

    pub fn next_id(&self) -> u32 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// A poolable value with a stable numeric id.
pub trait PoolEntity: Send + 'static {
    fn id(&self) -> u32;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// Transient: no entity is currently available.
    #[error("the pool has no free entity")]
    Empty,
    /// The pool cannot be built with zero capacity.
    #[error("the pool can not be initialized (total={0})")]
    InvalidCapacity(u32),
    /// The factory produced two entities with the same id.
    #[error("duplicate entity id {0}")]
    DuplicateEntityId(u32),
    /// Structural: the returned entity was never part of this pool.
    #[error("the entity (id={0}) is illegal")]
    UnknownEntity(u32),
    /// Structural: the entity is already inside the pool.
    #[error("the entity (id={0}) is already in the pool")]
    AlreadyReturned(u32),
    /// The pool's inner container is no longer usable.
    #[error("the inner container is invalid")]
    Closed,
}

impl PoolError {
    /// Structural errors indicate a broken take/return discipline, as opposed
    /// to the transient [`PoolError::Empty`].
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            PoolError::UnknownEntity(_) | PoolError::AlreadyReturned(_) | PoolError::DuplicateEntityId(_)
        )
    }
}

/// Fixed-capacity pool of [`PoolEntity`] values.
pub struct Pool<T: PoolEntity> {
    total: u32,
    slots_tx: AsyncSender<T>,
    slots_rx: AsyncReceiver<T>,
    // id -> currently inside the pool?
    occupancy: Mutex<HashMap<u32, bool>>,
}

impl<T: PoolEntity> Pool<T> {
    /// Eagerly produces `total` entities from `gen` and stores them.
    pub fn new(total: u32, mut gen: impl FnMut() -> T) -> Result<Self, PoolError> {
        if total == 0 {
            return Err(PoolError::InvalidCapacity(total));
        }
        let (slots_tx, slots_rx) = kanal::bounded_async(total as usize);
        let mut occupancy = HashMap::with_capacity(total as usize);
        for _ in 0..total {
            let entity = gen();
            let id = entity.id();
            if occupancy.insert(id, true).is_some() {
                return Err(PoolError::DuplicateEntityId(id));
            }
            if slots_tx.try_send(entity).is_err() {
                return Err(PoolError::Closed);
            }
        }
        Ok(Pool {
            total,
            slots_tx,
            slots_rx,
            occupancy: Mutex::new(occupancy),
        })
    }

    /// Takes an entity out, waiting while the pool is empty.
    pub async fn take(&self) -> Result<T, PoolError> {
        let entity = self.slots_rx.recv().await.map_err(|_| PoolError::Closed)?;
        self.occupancy.lock().insert(entity.id(), false);
        Ok(entity)
    }

    /// Takes an entity out, or reports [`PoolError::Empty`] promptly.
    pub fn try_take(&self) -> Result<T, PoolError> {
        match self.slots_rx.try_recv() {
            Ok(Some(entity)) => {
                self.occupancy.lock().insert(entity.id(), false);
                Ok(entity)
            }
            Ok(None) => Err(PoolError::Empty),
            Err(_) => Err(PoolError::Closed),
        }
    }

    /// Puts an entity back, validating the take/return discipline.
    pub fn give_back(&self, entity: T) -> Result<(), PoolError> {
        let id = entity.id();
        {
            let mut occupancy = self.occupancy.lock();
            match occupancy.get(&id) {
                None => return Err(PoolError::UnknownEntity(id)),
                Some(true) => return Err(PoolError::AlreadyReturned(id)),
                Some(false) => {
                    occupancy.insert(id, true);
                }
            }
        }
        // Capacity equals the entity count, so a validated return always has
        // room.
        match self.slots_tx.try_send(entity) {
            Ok(true) => Ok(()),
            Ok(false) | Err(_) => {
                self.occupancy.lock().insert(id, false);
                Err(PoolError::Closed)
            }
        }
    }

    /// Checks an entity out behind a guard that returns it on drop, panic
    /// included.
    pub async fn checkout(&self) -> Result<Checkout<'_, T>, PoolError> {
        let entity = self.take().await?;
        Ok(Checkout {
            entity: Some(entity),
            pool: self,
        })
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// Number of entities currently checked out.
    pub fn used(&self) -> u32 {
        self.total - self.slots_tx.len() as u32
    }
}

/// A checked-out entity; dropping it returns the entity to its pool.
pub struct Checkout<'a, T: PoolEntity> {
    entity: Option<T>,
    pool: &'a Pool<T>,
}

impl<T: PoolEntity> Deref for Checkout<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.entity.as_ref().expect("entity present until drop")
    }
}

impl<T: PoolEntity> Drop for Checkout<'_, T> {
    fn drop(&mut self) {
        if let Some(entity) = self.entity.take() {
            let id = entity.id();
            if let Err(err) = self.pool.give_back(entity) {
                error!("Failed to return entity {} to its pool: {}", id, err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe {
        id: u32,
    }

    impl PoolEntity for Probe {
        fn id(&self) -> u32 {
            self.id
        }
    }

    fn probe_pool(total: u32) -> Pool<Probe> {
        let ids = IdGenerator::new();
        Pool::new(total, || Probe { id: ids.next_id() }).unwrap()
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let ids = IdGenerator::new();
        let result = Pool::new(0, || Probe { id: ids.next_id() });
        assert!(matches!(result, Err(PoolError::InvalidCapacity(0))));
    }

    #[tokio::test]
    async fn take_and_return_preserve_conservation() {
        let pool = probe_pool(2);
        assert_eq!(pool.total(), 2);
        assert_eq!(pool.used(), 0);

        let a = pool.take().await.unwrap();
        let b = pool.take().await.unwrap();
        assert_eq!(pool.used(), 2);
        assert!(matches!(pool.try_take(), Err(PoolError::Empty)));

        pool.give_back(a).unwrap();
        assert_eq!(pool.used(), 1);
        pool.give_back(b).unwrap();
        assert_eq!(pool.used(), 0);
    }

    #[tokio::test]
    async fn double_return_is_a_structural_error() {
        let pool = probe_pool(1);
        let a = pool.take().await.unwrap();
        let id = a.id();
        pool.give_back(a).unwrap();
        assert_eq!(pool.used(), 0);

        let err = pool.give_back(Probe { id }).unwrap_err();
        assert_eq!(err, PoolError::AlreadyReturned(id));
        assert!(err.is_structural());
        // used decremented exactly once
        assert_eq!(pool.used(), 0);
    }

    #[tokio::test]
    async fn returning_a_foreign_entity_is_rejected() {
        let pool = probe_pool(1);
        let err = pool.give_back(Probe { id: 999 }).unwrap_err();
        assert_eq!(err, PoolError::UnknownEntity(999));
        assert!(err.is_structural());
    }

    #[tokio::test]
    async fn checkout_guard_returns_on_drop() {
        let pool = probe_pool(1);
        {
            let lease = pool.checkout().await.unwrap();
            assert_eq!(pool.used(), 1);
            assert_eq!(lease.id(), 0);
        }
        assert_eq!(pool.used(), 0);
        // the entity is available again
        let again = pool.try_take().unwrap();
        assert_eq!(again.id(), 0);
    }

    #[tokio::test]
    async fn blocked_take_resumes_after_a_return() {
        let pool = std::sync::Arc::new(probe_pool(1));
        let held = pool.take().await.unwrap();

        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.take().await.unwrap().id() })
        };
        tokio::task::yield_now().await;
        pool.give_back(held).unwrap();
        assert_eq!(waiter.await.unwrap(), 0);
    }
}
