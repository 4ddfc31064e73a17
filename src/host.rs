//! The surface of the game process that the patches are allowed to touch. The game implements
//! [`Host`] and passes it to the entry points; nothing in this crate looks anything up by name.

use std::{path::PathBuf, sync::Arc};

use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The game's present-frame function. Calling it shows whatever has been drawn this frame.
pub type PresentFn = Arc<dyn Fn() + Send + Sync>;

/// Screen size used when the game doesn't report one.
pub const DEFAULT_SCREEN: (i32, i32) = (1920, 1080);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(red: u8, green: u8, blue: u8) -> Rgb {
        Rgb { red, green, blue }
    }
}

/// A piece of rendered text, ready to be blitted. Only the game knows what's inside.
pub trait Image: Send {}

pub trait Font: Send + Sync {
    fn render(&self, text: &str, colour: Rgb) -> Result<Box<dyn Image>>;
}

/// Describes a font for the game to build when it doesn't already have one loaded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontSpec {
    pub family: String,
    pub size: u32,
    pub bold: bool,
}

/// The screen surface that gets presented at the end of the frame.
pub trait Surface: Send + Sync {
    fn blit(&self, image: &dyn Image, at: (i32, i32)) -> Result<()>;
}

/// Where the puppet is. The game's own spellings are accepted when parsing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum PositionState {
    /// In the music box. This is the only position that can't hurt the player.
    #[strum(to_string = "safe", serialize = "Box")]
    #[serde(alias = "Box")]
    Safe,

    /// Out of the box and moving.
    #[strum(to_string = "active", serialize = "Awake")]
    #[serde(alias = "Awake")]
    Active,

    /// In the office.
    #[strum(to_string = "triggered", serialize = "Office")]
    #[serde(alias = "Office")]
    Triggered,
}

/// A character owned by the game. All setters take `&self`; the game decides how its fields are
/// shared, and we simply overwrite them.
pub trait Entity: Send + Sync {
    fn charge(&self) -> Result<f64>;
    fn set_charge(&self, charge: f64) -> Result<()>;

    fn position_state(&self) -> Result<PositionState>;
    fn set_position_state(&self, state: PositionState) -> Result<()>;

    /// Sets the tick at which the charge was last drained.
    fn set_last_discharge(&self, tick: u64) -> Result<()>;

    /// Sets how long the charge has been draining for.
    fn set_discharge_time(&self, elapsed_ms: u64) -> Result<()>;
}

/// Everything the game exposes to the patches. Only `hook_present` and `ticks` are required; the
/// rest default to "not available", which makes the relevant feature do nothing.
pub trait Host: Send + Sync {
    /// Replaces the present-frame function with `replacement` and returns the previous one. The
    /// previous function must stay callable.
    fn hook_present(&self, replacement: PresentFn) -> Result<PresentFn>;

    /// Milliseconds since the game started.
    fn ticks(&self) -> Result<u64>;

    fn screen_size(&self) -> Option<(i32, i32)> {
        None
    }

    fn surface(&self) -> Option<Arc<dyn Surface>> {
        None
    }

    /// The font the game already uses for its own text, if it has one.
    fn font(&self) -> Option<Arc<dyn Font>> {
        None
    }

    fn load_font(&self, spec: &FontSpec) -> Result<Arc<dyn Font>> {
        Err(eyre!("unable to build font {:?}", spec))
    }

    fn entity(&self, _name: &str) -> Option<Arc<dyn Entity>> {
        None
    }

    /// Directory for our settings and log file.
    fn config_dir(&self) -> Option<PathBuf> {
        None
    }
}

/// Milliseconds from the game's clock, or from the wall clock if the game can't tell us.
pub fn now_ms(host: &dyn Host) -> u64 {
    match host.ticks() {
        Ok(ticks) => ticks,
        Err(err) => {
            log::trace!("falling back to wall clock: {err:?}");
            wall_clock_ms()
        }
    }
}

pub fn wall_clock_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

pub fn screen_size(host: &dyn Host) -> (i32, i32) {
    host.screen_size().unwrap_or(DEFAULT_SCREEN)
}
