//! Keeps our failures away from the game. Anything that runs on a game thread or on our own
//! background thread goes through [`shielded`].

use std::{
    cell::{Cell, RefCell},
    panic::{self, AssertUnwindSafe},
};

use eyre::Result;

thread_local! {
    /// How many shielded steps are running on this thread.
    static DEPTH: Cell<usize> = Cell::new(0);

    /// Where the last panic inside a shielded step happened, filled in by the panic hook.
    static PANIC_LOCATION: RefCell<Option<String>> = RefCell::new(None);
}

/// Whether a panic on this thread right now would be caught by [`shielded`].
pub fn is_shielding() -> bool {
    DEPTH.try_with(Cell::get).unwrap_or(0) > 0
}

/// Remembers where a shielded panic happened so [`shielded`] can report it.
pub fn note_panic_location(location: String) {
    let _ = PANIC_LOCATION.try_with(|slot| *slot.borrow_mut() = Some(location));
}

fn take_panic_location() -> Option<String> {
    PANIC_LOCATION
        .try_with(|slot| slot.borrow_mut().take())
        .ok()
        .flatten()
}

/// How a shielded step ended.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome<T> {
    Done(T),
    Failed,
    Panicked,
}

/// Runs `step`, swallowing both errors and panics. Failures are logged under `label` at debug
/// level because some of them (the game still loading, for example) happen every frame.
pub fn shielded<T>(label: &str, step: impl FnOnce() -> Result<T>) -> Outcome<T> {
    DEPTH.with(|depth| depth.set(depth.get() + 1));
    let result = panic::catch_unwind(AssertUnwindSafe(step));
    DEPTH.with(|depth| depth.set(depth.get() - 1));

    match result {
        Ok(Ok(value)) => Outcome::Done(value),
        Ok(Err(err)) => {
            log::debug!("{label} failed: {err:?}");
            Outcome::Failed
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "no message".to_string());

            let location = take_panic_location().unwrap_or_else(|| "unknown location".to_string());

            log::warn!("{label} panicked at {location}: {message}");
            Outcome::Panicked
        }
    }
}
