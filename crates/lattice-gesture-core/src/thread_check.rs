//! Owner-thread checks.
//!
//! Gesture arenas, recognizers and the timer queue are built on `Rc` and
//! `RefCell`, so the compiler already keeps them on one thread. The
//! [`ThreadAffinity`] tracker adds a runtime check at the entry points a host
//! could still reach from elsewhere (for instance through an `unsafe` wrapper
//! around its event loop).
//!
//! ```
//! use lattice_gesture_core::ThreadAffinity;
//!
//! let affinity = ThreadAffinity::current();
//! affinity.assert_owner("pointer event");
//! assert!(affinity.is_owner_thread());
//! ```

use std::thread::{self, ThreadId};

/// The thread that created an owner-thread object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadAffinity {
    owner: ThreadId,
}

impl Default for ThreadAffinity {
    fn default() -> Self {
        Self::current()
    }
}

impl ThreadAffinity {
    /// Bind to the calling thread.
    pub fn current() -> Self {
        Self {
            owner: thread::current().id(),
        }
    }

    #[inline]
    pub fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Panic unless called on the owner thread. Runs in every build.
    ///
    /// `what` names the operation in the panic message.
    #[inline]
    pub fn assert_owner(&self, what: &str) {
        if !self.is_owner_thread() {
            self.wrong_thread(what);
        }
    }

    /// [`assert_owner`](Self::assert_owner) in debug builds, nothing in release.
    #[inline]
    pub fn debug_assert_owner(&self) {
        #[cfg(debug_assertions)]
        self.assert_owner("gesture state access");
    }

    #[cold]
    #[inline(never)]
    fn wrong_thread(&self, what: &str) -> ! {
        let current = thread::current();
        panic!(
            "{what} on thread {:?} ({:?}), but gesture state is owned by {:?}; \
             forward the call to the owner thread's event loop",
            current.name().unwrap_or("<unnamed>"),
            current.id(),
            self.owner,
        )
    }
}
