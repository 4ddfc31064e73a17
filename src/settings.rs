//! User-tweakable timings and values for both patches. Every value has a default, so a missing or
//! partial `nightmods.json` is fine.

use std::{
    fs::File,
    path::{Path, PathBuf},
    time::Duration,
};

use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};

use crate::host::{FontSpec, PositionState, Rgb};

pub const SETTINGS_FILE_NAME: &str = "nightmods.json";

/// Space kept free around the message so that it never gets cut off at the screen edges. The
/// right and bottom margins allow for the size of the text itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Default for Margins {
    fn default() -> Self {
        Margins {
            left: 50,
            top: 50,
            right: 350,
            bottom: 120,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    pub message: String,

    /// Time between the message disappearing and showing again.
    pub interval_ms: u64,

    /// How long the message stays on screen.
    pub duration_ms: u64,

    pub margins: Margins,

    /// How far the shadow is moved down and to the right of the text.
    pub shadow_offset: i32,

    /// Used when the game doesn't have a font of its own loaded.
    pub fallback_font: FontSpec,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        OverlaySettings {
            message: "It's me".to_string(),
            interval_ms: 60_000,
            duration_ms: 3_000,
            margins: Margins::default(),
            shadow_offset: 4,
            fallback_font: FontSpec {
                family: "Arial".to_string(),
                size: 90,
                bold: true,
            },
        }
    }
}

impl OverlaySettings {
    pub const TEXT_COLOUR: Rgb = Rgb::WHITE;
    pub const SHADOW_COLOUR: Rgb = Rgb::BLACK;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeeperSettings {
    /// Name the game knows the target character by.
    pub target: String,

    pub full_charge: f64,
    pub safe_state: PositionState,

    /// How long to wait before the first cycle, so the game can finish creating its objects.
    pub start_delay_ms: u64,
    pub period_ms: u64,
}

impl Default for KeeperSettings {
    fn default() -> Self {
        KeeperSettings {
            target: "puppet".to_string(),
            full_charge: 100.0,
            safe_state: PositionState::Safe,
            start_delay_ms: 500,
            period_ms: 200,
        }
    }
}

impl KeeperSettings {
    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub overlay: OverlaySettings,
    pub keeper: KeeperSettings,
}

impl Settings {
    /// Returns the path of the settings file inside `dir`.
    pub fn path(dir: &Path) -> PathBuf {
        dir.join(SETTINGS_FILE_NAME)
    }

    fn parse_json(file: File) -> Result<Settings> {
        serde_json::from_reader(std::io::BufReader::new(file)).wrap_err("invalid settings JSON")
    }

    /// Looks for a settings file and loads it.
    pub fn load_from_file(path: &Path) -> Result<Option<Settings>> {
        if !path.exists() {
            // This isn't an error, but we didn't find any settings.
            return Ok(None);
        }

        let file = File::open(path).wrap_err_with(|| format!("opening {}", path.display()))?;
        Ok(Some(Settings::parse_json(file)?))
    }

    /// Either loads the settings from `dir` or generates default values for them.
    pub fn load(dir: Option<&Path>) -> Settings {
        let dir = match dir {
            Some(dir) => dir,
            None => return Settings::default(),
        };

        match Settings::load_from_file(&Settings::path(dir)) {
            Ok(Some(settings)) => return settings,

            Ok(None) => log::info!("No settings file found. Defaults will be used."),

            Err(err) => log::error!("Error loading settings file: {err:?}. Defaults will be used."),
        }

        Settings::default()
    }

    /// Saves the settings into `dir`, returning any errors encountered.
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::write(Settings::path(dir), serde_json::to_string_pretty(self)?)
            .wrap_err("writing settings file")?;

        Ok(())
    }
}
