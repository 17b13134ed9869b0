//! Arena allocation for one parse.
//!
//! Every AST node produced by a parse lives in a single bump arena and is
//! freed en masse when the arena is dropped. Nothing in the tree owns heap
//! memory of its own; abandoned speculative nodes simply become unreachable
//! and die with the arena.

use bumpalo::Bump;

/// The arena backing one compilation unit's parse.
pub struct ParseArena {
    bump: Bump,
}

impl ParseArena {
    /// Create a new arena with default capacity.
    pub fn new() -> Self {
        Self { bump: Bump::new() }
    }

    /// Create a new arena with the specified initial capacity in bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bump: Bump::with_capacity(capacity),
        }
    }

    /// Get a reference to the underlying bump allocator.
    #[inline]
    pub fn bump(&self) -> &Bump {
        &self.bump
    }

    /// Allocate a value in the arena.
    #[inline]
    pub fn alloc<T>(&self, val: T) -> &T {
        self.bump.alloc(val)
    }

    /// Allocate a value in the arena, returning a mutable reference.
    #[inline]
    pub fn alloc_mut<T>(&self, val: T) -> &mut T {
        self.bump.alloc(val)
    }

    /// Allocate a string slice in the arena.
    #[inline]
    pub fn alloc_str(&self, s: &str) -> &str {
        self.bump.alloc_str(s)
    }

    /// Allocate a copy of a slice in the arena.
    #[inline]
    pub fn alloc_slice_copy<T: Copy>(&self, src: &[T]) -> &[T] {
        self.bump.alloc_slice_copy(src)
    }

    /// Move the elements of a `Vec` into an arena slice.
    ///
    /// Uses ManuallyDrop so the Vec destructor cannot double-free elements
    /// if the fill closure panics partway through.
    pub fn alloc_vec<T>(&self, vec: Vec<T>) -> &[T] {
        if vec.is_empty() {
            return &[];
        }
        let mut vec = std::mem::ManuallyDrop::new(vec);
        let len = vec.len();
        let ptr = vec.as_ptr();
        let slice = self.bump.alloc_slice_fill_with(len, |i| {
            // SAFETY: i < len and each element is read exactly once;
            // ManuallyDrop prevents the Vec from dropping moved-from slots.
            unsafe { std::ptr::read(ptr.add(i)) }
        });
        unsafe {
            vec.set_len(0);
        }
        slice
    }

    /// Total bytes allocated so far.
    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }

    /// Reset the arena, invalidating all allocations but keeping the memory.
    pub fn reset(&mut self) {
        self.bump.reset();
    }
}

impl Default for ParseArena {
    fn default() -> Self {
        Self::new()
    }
}
