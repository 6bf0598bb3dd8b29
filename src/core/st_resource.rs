use std::{
    cell::{Ref, RefCell, RefMut},
    rc::Rc,
};

/// A single-threaded, reference-counted resource with interior mutability.
///
/// Used for render-thread bookkeeping that several owners update, such as the
/// per-buffer analytics shared between a buffer device and its diagnostics.
///
/// # Type Parameters
/// - `T`: The type of the contained resource
///
/// # Examples
///
/// ```
/// use voxel_chunk_graph::core::StResource;
///
/// let resource = StResource::new(vec![1, 2, 3]);
/// let shared = resource.clone();
///
/// shared.get_mut().push(4);
/// assert_eq!(resource.get().len(), 4);
/// ```
///
/// # Panics
/// Panics if a mutable borrow overlaps any other borrow of the same resource.
///
/// # Performance Considerations
/// - No atomic operations; not usable across thread boundaries
pub struct StResource<T> {
    pub resource: Rc<RefCell<T>>,
}

impl<T> StResource<T> {
    /// Creates a new `StResource` containing the given value.
    ///
    /// # Arguments
    /// * `resource` - The value to be stored in the resource
    pub fn new(resource: T) -> Self {
        Self {
            resource: Rc::new(RefCell::new(resource)),
        }
    }

    /// Borrows the contained value immutably.
    pub fn get(&self) -> Ref<'_, T> {
        self.resource.borrow()
    }

    /// Borrows the contained value mutably.
    pub fn get_mut(&self) -> RefMut<'_, T> {
        self.resource.borrow_mut()
    }
}

impl<T: Default> Default for StResource<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Clone for StResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}
