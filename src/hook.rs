//! Wraps the game's present-frame function so that our code runs right before every frame is
//! shown, while the game's own implementation is still called afterwards.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, PoisonError,
};

use eyre::{eyre, Result};

use crate::host::{Host, PresentFn};

/// An install-once replacement for the present-frame function. The original implementation is
/// kept here after installation so the replacement can delegate to it.
pub struct Hook {
    installed: AtomicBool,
    original_fn: Mutex<Option<PresentFn>>,
}

impl Hook {
    pub const fn new() -> Hook {
        Hook {
            installed: AtomicBool::new(false),
            original_fn: Mutex::new(None),
        }
    }

    /// Replaces the host's present function with `replacement`. Returns `Ok(false)` without
    /// touching the host if the hook was installed before.
    pub fn install(&self, host: &dyn Host, replacement: PresentFn) -> Result<bool> {
        if self
            .installed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(false);
        }

        // The game may present a frame from inside `hook_present`, which calls back into
        // `call_original`, so the lock must not be held here.
        let original = match host.hook_present(replacement) {
            Ok(original) => original,
            Err(err) => {
                self.installed.store(false, Ordering::SeqCst);
                return Err(err);
            }
        };

        *self
            .original_fn
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(original);

        Ok(true)
    }

    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::SeqCst)
    }

    /// Returns the game's own present function.
    pub fn original(&self) -> Result<PresentFn> {
        self.original_fn
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| eyre!("`original()` requires that the hook is installed"))
    }

    /// Calls the original present function. Does nothing if the original isn't stored yet, which
    /// can only happen if the game calls our replacement before `hook_present` has returned.
    pub fn call_original(&self) {
        match self.original() {
            Ok(present) => present(),
            Err(err) => log::warn!("{err}"),
        }
    }
}

impl Default for Hook {
    fn default() -> Self {
        Hook::new()
    }
}
