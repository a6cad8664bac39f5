//! # IDs
//! Items, guides and sample points are referred to by `UniqueID<T>`, which is unique within this
//! execution of the program and namespaced by the type `T`. The numeric order of IDs carries no meaning.
//!
//! Fetch a fresh ID through `UniqueID`'s `Default` impl.

// Next available ID, by namespace.
static ID_SERVER: parking_lot::RwLock<
    std::collections::BTreeMap<std::any::TypeId, std::sync::atomic::AtomicU64>,
> = parking_lot::const_rwlock(std::collections::BTreeMap::new());

/// ID that is unique within this execution of the program.
/// IDs with different namespaces may share a numeric value but never compare equal, as they are different types.
pub struct UniqueID<T: std::any::Any> {
    id: std::num::NonZeroU64,
    _namespace: std::marker::PhantomData<fn() -> T>,
}
impl<T: std::any::Any> Clone for UniqueID<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T: std::any::Any> Copy for UniqueID<T> {}
impl<T: std::any::Any> PartialEq for UniqueID<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<T: std::any::Any> Eq for UniqueID<T> {}
impl<T: std::any::Any> PartialOrd for UniqueID<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<T: std::any::Any> Ord for UniqueID<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}
impl<T: std::any::Any> std::hash::Hash for UniqueID<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T: std::any::Any> UniqueID<T> {
    /// The raw numeric value of this ID.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id.get()
    }
    fn allocate() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        let ty = std::any::TypeId::of::<T>();
        let read = ID_SERVER.upgradable_read();
        let id = if let Some(next) = read.get(&ty) {
            next.fetch_add(1, Ordering::Relaxed)
        } else {
            // First ID of this namespace, happens once per type.
            let mut write = parking_lot::RwLockUpgradableReadGuard::upgrade(read);
            write
                .entry(ty)
                .or_insert_with(|| AtomicU64::new(1))
                .fetch_add(1, Ordering::Relaxed)
        };
        let Some(id) = std::num::NonZeroU64::new(id) else {
            // Wrapped all the way around. Uniqueness can no longer be upheld.
            log::error!("{} ID overflow!", std::any::type_name::<T>());
            panic!("{} ID overflow!", std::any::type_name::<T>());
        };
        Self {
            id,
            _namespace: std::marker::PhantomData,
        }
    }
}
impl<T: std::any::Any> Default for UniqueID<T> {
    fn default() -> Self {
        Self::allocate()
    }
}
impl<T: std::any::Any> std::fmt::Display for UniqueID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // rsplit always yields at least one element.
        let name = std::any::type_name::<T>()
            .rsplit("::")
            .next()
            .unwrap_or_default();
        write!(f, "{name}#{}", self.id)
    }
}
impl<T: std::any::Any> std::fmt::Debug for UniqueID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}
