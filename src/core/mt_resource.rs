use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A thread-safe, reference-counted resource container with read-write locking.
///
/// A host that edits its world from other threads can hand the renderer an
/// `MtResource` of it. A single read guard spans a whole section capture, so a
/// snapshot never mixes blocks from before and after an edit.
///
/// # Type Parameters
/// - `T`: The type of the contained resource, must be `Send + Sync`
///
/// # Examples
///
/// ```
/// # use std::thread;
/// use voxel_chunk_graph::core::MtResource;
///
/// let edits = MtResource::new(Vec::<(i32, i32, i32)>::new());
/// let worker_view = edits.clone();
///
/// let handle = thread::spawn(move || {
///     worker_view.get_mut().push((1, 64, 1));
/// });
///
/// handle.join().unwrap();
/// assert_eq!(edits.get().len(), 1);
/// ```
///
/// # Performance Considerations
/// - Read operations (`get()`) can occur concurrently
/// - Write operations (`get_mut()`) are exclusive and block workers capturing snapshots
/// - A poisoned lock is recovered rather than propagated; the data is plain state
pub struct MtResource<T: Send + Sync> {
    pub resource: Arc<RwLock<T>>,
}

impl<T: Send + Sync + 'static> MtResource<T> {
    /// Creates a new `MtResource` containing the given value.
    ///
    /// # Arguments
    /// * `resource` - The value to be stored in the resource
    pub fn new(resource: T) -> Self {
        Self {
            resource: Arc::new(RwLock::new(resource)),
        }
    }

    /// Returns a read-only guard that allows reading the contained value.
    pub fn get(&self) -> RwLockReadGuard<'_, T> {
        self.resource.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a mutable guard that allows modifying the contained value.
    pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
        self.resource.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of handles sharing this resource.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.resource)
    }
}

impl<T: Send + Sync> Clone for MtResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let value = MtResource::new(1);
        let poisoner = value.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.get_mut();
            panic!("poison the lock");
        })
        .join();

        *value.get_mut() += 1;
        assert_eq!(*value.get(), 2);
        assert_eq!(value.handle_count(), 1);
    }
}
