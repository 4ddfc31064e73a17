//! Two small patches for the FNAF2 fan game:
//!
//! * the overlay, which flashes "It's me" somewhere on screen once a minute, and
//! * the state keeper, which keeps the puppet's music box wound and the puppet in its box.
//!
//! The game's mod loader calls [`init_overlay`] and/or [`init_keeper`] once with its [`Host`]
//! implementation. Neither entry point can fail or panic from the game's point of view.

use std::sync::Arc;

use once_cell::sync::OnceCell;

pub mod hook;
pub mod host;
pub mod keeper;
pub mod logging;
pub mod overlay;
pub mod settings;
pub mod shield;

pub use host::Host;

use keeper::Keeper;
use overlay::Overlay;
use settings::Settings;
use shield::shielded;

static OVERLAY: OnceCell<Arc<Overlay>> = OnceCell::new();
static KEEPER: OnceCell<Arc<Keeper>> = OnceCell::new();

/// Sets up logging and reads the settings file from the game's config directory.
fn load_settings(host: &dyn Host) -> Settings {
    let dir = host.config_dir();

    logging::init(dir.as_ref().map(|dir| dir.join(logging::LOG_FILE_NAME)));
    log::info!("nightmods version {}", env!("CARGO_PKG_VERSION"));

    Settings::load(dir.as_deref())
}

/// Starts showing the overlay. Only the first call does anything; if hooking the game's present
/// function fails, the overlay stays off for the rest of the session.
pub fn init_overlay(host: Arc<dyn Host>) {
    shielded("overlay init", || {
        let mut first = false;

        let overlay = OVERLAY.get_or_init(|| {
            first = true;

            let settings = load_settings(host.as_ref());
            Overlay::new(host, settings.overlay)
        });

        if !first {
            log::debug!("overlay already initialised");
            return Ok(());
        }

        if let Err(err) = overlay.install() {
            log::error!("unable to hook frame presentation, overlay disabled: {err:?}");
        } else {
            log::info!("overlay installed");
        }

        Ok(())
    });
}

/// Starts the state keeper's background thread, unless it's already running.
pub fn init_keeper(host: Arc<dyn Host>) {
    shielded("keeper init", || {
        let keeper = KEEPER.get_or_init(|| {
            let settings = load_settings(host.as_ref());
            Keeper::new(host, settings.keeper)
        });

        if !keeper.start()? {
            log::debug!("state keeper already running");
        }

        Ok(())
    });
}

/// Stops the state keeper, for mod loaders that support unloading. The thread notices within one
/// polling period.
pub fn shutdown() {
    if let Some(keeper) = KEEPER.get() {
        keeper.stop();
    }
}
