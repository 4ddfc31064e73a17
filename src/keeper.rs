//! Keeps the puppet's music box full and the puppet in its box.
//!
//! A background thread overwrites the puppet's fields a few times a second. Nothing stops the game
//! from writing to the same fields in between; we just write often enough to win.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
    thread::JoinHandle,
};

use eyre::{Result, WrapErr};

use crate::{
    host::{Entity, Host},
    settings::KeeperSettings,
    shield::shielded,
};

/// What a single cycle did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cycle {
    /// The target doesn't exist (yet).
    Absent,

    Reasserted {
        /// Whether the target had left the safe state and was put back.
        moved: bool,

        /// Whether the discharge timers were reset. This needs the game's clock.
        timers_reset: bool,
    },
}

pub struct Keeper {
    host: Arc<dyn Host>,
    settings: KeeperSettings,
    stop: AtomicBool,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Keeper {
    pub fn new(host: Arc<dyn Host>, settings: KeeperSettings) -> Arc<Keeper> {
        Arc::new(Keeper {
            host,
            settings,
            stop: AtomicBool::new(false),
            thread: Mutex::new(None),
        })
    }

    /// Forces the target back to its safe configuration once.
    pub fn step(&self) -> Result<Cycle> {
        let entity = match self.host.entity(&self.settings.target) {
            Some(entity) => entity,
            None => return Ok(Cycle::Absent),
        };

        self.reassert(entity.as_ref())
    }

    fn reassert(&self, entity: &dyn Entity) -> Result<Cycle> {
        if let Ok(charge) = entity.charge() {
            log::trace!("{} charge was {charge}", self.settings.target);
        }

        // Some builds of the game have no music box charge at all; the position still matters.
        if let Err(err) = entity.set_charge(self.settings.full_charge) {
            log::debug!("unable to set {} charge: {err:?}", self.settings.target);
        }

        let safe = self.settings.safe_state;
        let moved = entity.position_state().ok() != Some(safe);

        if moved {
            entity
                .set_position_state(safe)
                .wrap_err("moving back to safe state")?;
        }

        // Without the game's clock there's no sensible value for the discharge timer, so leave
        // both timers alone until next cycle.
        let timers_reset = match self.host.ticks() {
            Ok(now) => {
                entity.set_last_discharge(now)?;
                entity.set_discharge_time(0)?;
                true
            }
            Err(err) => {
                log::debug!("not resetting discharge timers: {err:?}");
                false
            }
        };

        if moved {
            log::info!("moved {} back to {safe}", self.settings.target);
        }

        Ok(Cycle::Reasserted {
            moved,
            timers_reset,
        })
    }

    /// Starts the background thread. Returns `false` if it's already running. If the thread was
    /// asked to stop, it is waited for and a new one is started.
    pub fn start(self: &Arc<Self>) -> Result<bool> {
        let mut thread = self.thread.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(handle) = thread.take() {
            if self.stop.load(Ordering::SeqCst) {
                // Stopping but not gone yet. This waits for at most one period.
                if handle.join().is_err() {
                    log::warn!("previous state keeper thread panicked");
                }
            } else if !handle.is_finished() {
                *thread = Some(handle);
                return Ok(false);
            }
        }

        self.stop.store(false, Ordering::SeqCst);

        let keeper = Arc::clone(self);
        let handle = std::thread::Builder::new()
            .name("state_keeper".to_string())
            .spawn(move || keeper.run())
            .wrap_err("spawning state keeper thread")?;

        *thread = Some(handle);

        log::info!(
            "keeping {} at {} every {}ms",
            self.settings.target,
            self.settings.full_charge,
            self.settings.period_ms
        );

        Ok(true)
    }

    fn run(&self) {
        // Give the game a moment to finish creating its objects.
        std::thread::sleep(self.settings.start_delay());

        while !self.stop.load(Ordering::SeqCst) {
            shielded("state keeper cycle", || self.step());
            std::thread::sleep(self.settings.period());
        }

        log::info!("state keeper stopped");
    }

    /// Asks the thread to stop. It notices within one period.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }
}
