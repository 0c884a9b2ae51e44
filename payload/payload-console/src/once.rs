use core::{
    cell::UnsafeCell,
    convert::Infallible,
    hint::spin_loop,
    mem::MaybeUninit,
    sync::atomic::{AtomicU8, Ordering},
};

const EMPTY: u8 = 0;
const RUNNING: u8 = 1;
const DONE: u8 = 2;

/// Process-scoped value initialized exactly once.
///
/// The first caller of [`get_or_init`](Self::get_or_init) runs the initializer;
/// concurrent callers wait for it to publish. If the initializer panics, or a
/// fallible one returns an error, the cell returns to empty and the next
/// caller tries again.
pub struct AcquireOnce<T> {
    state: AtomicU8,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Default for AcquireOnce<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Resets a cell to [`EMPTY`] unless the initializer published a value.
struct ResetUnlessPublished<'a> {
    state: &'a AtomicU8,
}

impl Drop for ResetUnlessPublished<'_> {
    fn drop(&mut self) {
        self.state.store(EMPTY, Ordering::Release);
    }
}

impl<T> AcquireOnce<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(EMPTY),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.load(Ordering::Acquire) == DONE
    }

    /// Returns the value if it was published.
    #[inline]
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        if self.is_initialized() {
            // SAFETY: DONE is only stored after the value was written.
            Some(unsafe { (*self.value.get()).assume_init_ref() })
        } else {
            None
        }
    }

    /// Returns the value, running `init` if nobody has yet.
    pub fn get_or_init(&self, init: impl FnOnce() -> T) -> &T {
        match self.get_or_try_init(|| Ok::<T, Infallible>(init())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Like [`get_or_init`](Self::get_or_init), but an `Err` from `init` is
    /// handed back and leaves the cell empty.
    ///
    /// # Errors
    /// Whatever `init` returned.
    pub fn get_or_try_init<E>(&self, init: impl FnOnce() -> Result<T, E>) -> Result<&T, E> {
        loop {
            if let Some(v) = self.get() {
                return Ok(v);
            }

            if self
                .state
                .compare_exchange(EMPTY, RUNNING, Ordering::Acquire, Ordering::Acquire)
                .is_ok()
            {
                let guard = ResetUnlessPublished { state: &self.state };
                let value = init()?;
                core::mem::forget(guard);

                // SAFETY: RUNNING gives us exclusive access to the slot.
                let value = unsafe { (*self.value.get()).write(value) };
                self.state.store(DONE, Ordering::Release);
                return Ok(value);
            }

            // Someone else is initializing; wait until DONE, or EMPTY if it gave up.
            while self.state.load(Ordering::Acquire) == RUNNING {
                spin_loop();
                std::thread::yield_now();
            }
        }
    }
}

impl<T> Drop for AcquireOnce<T> {
    fn drop(&mut self) {
        if *self.state.get_mut() == DONE {
            // SAFETY: DONE means the slot holds a value; `&mut self` is exclusive.
            unsafe { self.value.get_mut().assume_init_drop() };
        }
    }
}

// SAFETY: the value is written once by a single initializer and then only shared.
unsafe impl<T: Send + Sync> Sync for AcquireOnce<T> {}
unsafe impl<T: Send> Send for AcquireOnce<T> {}
