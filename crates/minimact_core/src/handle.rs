//! Type-safe handles for resources owned by the core
//!
//! Handles let a host language refer to an instance living inside the core
//! without ever holding a pointer to it. They use generational indices so a
//! handle that outlived its instance is detected rather than silently
//! resolving to whatever reused the slot.

use crate::error::HandleError;
use alloc::vec::Vec;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;

/// A type-safe handle to a resource of type T
#[repr(transparent)]
pub struct Handle<T> {
    /// Lower 32 bits: index, Upper 32 bits: generation
    bits: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// Maximum index value; `u32::MAX` is reserved so the null sentinel never decodes to a live slot
    pub const MAX_INDEX: u32 = u32::MAX - 1;

    /// Create a new handle from index and generation
    #[inline]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self {
            bits: (generation as u64) << 32 | index as u64,
            _marker: PhantomData,
        }
    }

    /// Create an invalid/null handle
    #[inline]
    pub const fn null() -> Self {
        Self {
            bits: u64::MAX,
            _marker: PhantomData,
        }
    }

    /// Check if this handle is null
    #[inline]
    pub const fn is_null(&self) -> bool {
        self.bits == u64::MAX
    }

    /// Get the index portion
    #[inline]
    pub const fn index(&self) -> u32 {
        self.bits as u32
    }

    /// Get the generation portion
    #[inline]
    pub const fn generation(&self) -> u32 {
        (self.bits >> 32) as u32
    }

    /// Convert to raw bits for crossing the FFI boundary
    #[inline]
    pub const fn to_bits(&self) -> u64 {
        self.bits
    }

    /// Create from raw bits
    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self {
            bits,
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for Handle<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Handle<{}>(null)", core::any::type_name::<T>())
        } else {
            write!(
                f,
                "Handle<{}>({}v{})",
                core::any::type_name::<T>(),
                self.index(),
                self.generation()
            )
        }
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::null()
    }
}

/// Allocates handles with proper generation tracking
pub struct HandleAllocator<T> {
    /// Generation for each slot; the slot is live when its handle carries this generation
    generations: Vec<u32>,
    /// Whether each slot currently holds a live handle
    live: Vec<bool>,
    /// Free list of available indices
    free_list: Vec<u32>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> HandleAllocator<T> {
    /// Create a new handle allocator
    pub fn new() -> Self {
        Self::with_capacity(16)
    }

    /// Create with specific initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            generations: Vec::with_capacity(capacity),
            live: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Allocate a new handle, or `None` once every index is in use
    pub fn allocate(&mut self) -> Option<Handle<T>> {
        if let Some(index) = self.free_list.pop() {
            self.live[index as usize] = true;
            return Some(Handle::new(index, self.generations[index as usize]));
        }

        let index = u32::try_from(self.generations.len()).ok()?;
        if index > Handle::<T>::MAX_INDEX {
            return None;
        }
        self.generations.push(0);
        self.live.push(true);
        Some(Handle::new(index, 0))
    }

    /// Free a handle, making its index available for reuse
    pub fn free(&mut self, handle: Handle<T>) -> Result<(), HandleError> {
        self.check(handle)?;
        let index = handle.index() as usize;
        self.generations[index] = self.generations[index].wrapping_add(1);
        self.live[index] = false;
        self.free_list.push(handle.index());
        Ok(())
    }

    /// Classify a handle: `Ok` if it refers to a live slot
    pub fn check(&self, handle: Handle<T>) -> Result<(), HandleError> {
        if handle.is_null() {
            return Err(HandleError::Null);
        }
        let index = handle.index() as usize;
        if index >= self.generations.len() {
            return Err(HandleError::OutOfBounds);
        }
        if !self.live[index] || self.generations[index] != handle.generation() {
            return Err(HandleError::Stale);
        }
        Ok(())
    }

    /// Check if a handle is still valid
    pub fn is_valid(&self, handle: Handle<T>) -> bool {
        self.check(handle).is_ok()
    }

    /// Get the number of allocated handles
    pub fn len(&self) -> usize {
        self.generations.len() - self.free_list.len()
    }

    /// Check if no handles are allocated
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the total capacity (including freed slots)
    pub fn capacity(&self) -> usize {
        self.generations.len()
    }
}

impl<T> Default for HandleAllocator<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A handle map that stores values associated with handles
pub struct HandleMap<T> {
    allocator: HandleAllocator<T>,
    values: Vec<Option<T>>,
}

impl<T> HandleMap<T> {
    /// Create a new handle map
    pub fn new() -> Self {
        Self {
            allocator: HandleAllocator::new(),
            values: Vec::new(),
        }
    }

    /// Insert a value and get a handle to it; `None` if the index space is exhausted
    pub fn insert(&mut self, value: T) -> Option<Handle<T>> {
        let handle = self.allocator.allocate()?;
        let index = handle.index() as usize;

        if index >= self.values.len() {
            self.values.resize_with(index + 1, || None);
        }
        self.values[index] = Some(value);
        Some(handle)
    }

    /// Remove a value by its handle
    pub fn remove(&mut self, handle: Handle<T>) -> Option<T> {
        self.try_remove(handle).ok()
    }

    /// Remove a value, reporting why the handle was rejected
    pub fn try_remove(&mut self, handle: Handle<T>) -> Result<T, HandleError> {
        self.allocator.free(handle)?;
        self.values[handle.index() as usize]
            .take()
            .ok_or(HandleError::Stale)
    }

    /// Get a reference to a value by its handle
    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.try_get(handle).ok()
    }

    /// Get a reference, reporting why the handle was rejected
    pub fn try_get(&self, handle: Handle<T>) -> Result<&T, HandleError> {
        self.allocator.check(handle)?;
        self.values
            .get(handle.index() as usize)
            .and_then(Option::as_ref)
            .ok_or(HandleError::Stale)
    }

    /// Get a mutable reference to a value by its handle
    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        if !self.allocator.is_valid(handle) {
            return None;
        }
        self.values.get_mut(handle.index() as usize)?.as_mut()
    }

    /// Check if a handle is valid
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.allocator.is_valid(handle)
    }

    /// Get the number of values
    pub fn len(&self) -> usize {
        self.allocator.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.allocator.is_empty()
    }

    /// Iterate over all valid handles and values
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.values
            .iter()
            .enumerate()
            .filter_map(move |(i, opt)| {
                opt.as_ref().map(|v| {
                    let gen = self.allocator.generations[i];
                    (Handle::new(i as u32, gen), v)
                })
            })
    }
}

impl<T> Default for HandleMap<T> {
    fn default() -> Self {
        Self::new()
    }
}
