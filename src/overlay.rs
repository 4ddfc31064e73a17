//! Shows a message at a random place on screen every so often. The message is drawn from inside
//! the game's present-frame call, just before the frame goes to the screen.

mod schedule;

pub use schedule::{random_position, Phase, Schedule};

use std::sync::{Arc, Mutex, PoisonError};

use eyre::{eyre, Result};
use rand::{rngs::StdRng, SeedableRng};

use crate::{
    hook::Hook,
    host::{self, Host},
    settings::OverlaySettings,
    shield::shielded,
};

pub struct Overlay {
    host: Arc<dyn Host>,
    settings: OverlaySettings,
    schedule: Mutex<Schedule>,
    rng: Mutex<StdRng>,
    hook: Hook,
}

impl Overlay {
    pub fn new(host: Arc<dyn Host>, settings: OverlaySettings) -> Arc<Overlay> {
        Overlay::with_rng(host, settings, StdRng::from_entropy())
    }

    /// Creates an overlay with a fixed random source, so message positions are predictable.
    pub fn with_rng(host: Arc<dyn Host>, settings: OverlaySettings, rng: StdRng) -> Arc<Overlay> {
        Arc::new(Overlay {
            host,
            settings,
            schedule: Mutex::new(Schedule::default()),
            rng: Mutex::new(rng),
            hook: Hook::new(),
        })
    }

    /// Seeds the schedule and wraps the game's present-frame function. Returns `Ok(false)` if the
    /// wrapper was already installed, in which case nothing changes.
    pub fn install(self: &Arc<Self>) -> Result<bool> {
        if self.hook.is_installed() {
            return Ok(false);
        }

        let now = host::now_ms(self.host.as_ref());
        self.schedule().ensure_seeded(now, self.settings.interval_ms);

        let overlay = Arc::clone(self);
        self.hook
            .install(self.host.as_ref(), Arc::new(move || overlay.on_frame_present()))
    }

    /// Replacement for the game's present-frame function.
    fn on_frame_present(&self) {
        shielded("overlay frame", || {
            let now = host::now_ms(self.host.as_ref());

            if self.update(now) == Phase::Showing {
                self.draw()?;
            }

            Ok(())
        });

        // Whatever happened above, the game still needs its frame.
        self.hook.call_original();
    }

    fn schedule(&self) -> std::sync::MutexGuard<'_, Schedule> {
        self.schedule.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Advances the schedule to `now_ms`.
    pub fn update(&self, now_ms: u64) -> Phase {
        let screen = host::screen_size(self.host.as_ref());
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

        self.schedule()
            .advance(now_ms, &self.settings, screen, &mut *rng)
    }

    pub fn phase(&self) -> Phase {
        self.schedule().phase()
    }

    pub fn position(&self) -> (i32, i32) {
        self.schedule().position()
    }

    /// Draws the message with its shadow. Does nothing if the game has no surface to draw on.
    fn draw(&self) -> Result<()> {
        let surface = match self.host.surface() {
            Some(surface) => surface,
            None => return Ok(()),
        };

        let font = match self.host.font() {
            Some(font) => font,
            None => self
                .host
                .load_font(&self.settings.fallback_font)
                .map_err(|err| eyre!("no font to draw with: {err}"))?,
        };

        let message = self.settings.message.as_str();
        let text = font.render(message, OverlaySettings::TEXT_COLOUR)?;
        let shadow = font.render(message, OverlaySettings::SHADOW_COLOUR)?;

        let (x, y) = self.position();
        let offset = self.settings.shadow_offset;

        surface.blit(
            shadow.as_ref(),
            (x.saturating_add(offset), y.saturating_add(offset)),
        )?;
        surface.blit(text.as_ref(), (x, y))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Font, FontSpec, Image, PresentFn, Rgb, Surface};
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    struct Text;

    impl Image for Text {}

    #[derive(Default)]
    struct Canvas {
        blits: Mutex<Vec<(i32, i32)>>,
        colours: Mutex<Vec<Rgb>>,
    }

    impl Font for Canvas {
        fn render(&self, _text: &str, colour: Rgb) -> Result<Box<dyn Image>> {
            self.colours.lock().unwrap().push(colour);
            Ok(Box::new(Text))
        }
    }

    impl Surface for Canvas {
        fn blit(&self, _image: &dyn Image, at: (i32, i32)) -> Result<()> {
            self.blits.lock().unwrap().push(at);
            Ok(())
        }
    }

    struct Game {
        now: AtomicU64,
        present: Mutex<PresentFn>,
        presented: Arc<AtomicUsize>,
        canvas: Arc<Canvas>,
        has_font: bool,
        fonts_built: Mutex<Vec<FontSpec>>,
    }

    impl Game {
        fn new(has_font: bool) -> Arc<Game> {
            let presented = Arc::new(AtomicUsize::new(0));
            let counter = presented.clone();

            Arc::new(Game {
                now: AtomicU64::new(0),
                present: Mutex::new(Arc::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })),
                presented,
                canvas: Arc::new(Canvas::default()),
                has_font,
                fonts_built: Mutex::new(vec![]),
            })
        }

        fn frame_at(&self, now: u64) {
            self.now.store(now, Ordering::SeqCst);
            let present = self.present.lock().unwrap().clone();
            present();
        }
    }

    impl Host for Game {
        fn hook_present(&self, replacement: PresentFn) -> Result<PresentFn> {
            Ok(std::mem::replace(&mut *self.present.lock().unwrap(), replacement))
        }

        fn ticks(&self) -> Result<u64> {
            Ok(self.now.load(Ordering::SeqCst))
        }

        fn surface(&self) -> Option<Arc<dyn Surface>> {
            Some(self.canvas.clone())
        }

        fn font(&self) -> Option<Arc<dyn Font>> {
            if self.has_font {
                Some(self.canvas.clone())
            } else {
                None
            }
        }

        fn load_font(&self, spec: &FontSpec) -> Result<Arc<dyn Font>> {
            self.fonts_built.lock().unwrap().push(spec.clone());
            Ok(self.canvas.clone())
        }
    }

    fn overlay(game: &Arc<Game>) -> Arc<Overlay> {
        Overlay::with_rng(
            game.clone(),
            OverlaySettings::default(),
            StdRng::seed_from_u64(42),
        )
    }

    #[test]
    fn draws_shadow_then_text() {
        let game = Game::new(true);
        let overlay = overlay(&game);
        assert!(overlay.install().unwrap());

        game.frame_at(59_999);
        assert!(game.canvas.blits.lock().unwrap().is_empty());

        game.frame_at(60_000);
        let (x, y) = overlay.position();

        assert_eq!(*game.canvas.blits.lock().unwrap(), vec![(x + 4, y + 4), (x, y)]);
        assert_eq!(*game.canvas.colours.lock().unwrap(), vec![Rgb::WHITE, Rgb::BLACK]);
        assert_eq!(game.presented.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn builds_fallback_font_when_game_has_none() {
        let game = Game::new(false);
        let overlay = overlay(&game);
        overlay.install().unwrap();

        game.frame_at(60_000);

        let built = game.fonts_built.lock().unwrap();
        assert_eq!(built.len(), 1);
        assert_eq!(built[0].family, "Arial");
        assert_eq!(built[0].size, 90);
        assert!(built[0].bold);
    }

    #[test]
    fn stops_drawing_after_duration() {
        let game = Game::new(true);
        let overlay = overlay(&game);
        overlay.install().unwrap();

        game.frame_at(60_000);
        game.frame_at(62_999);
        assert_eq!(overlay.phase(), Phase::Showing);

        game.frame_at(63_000);
        assert_eq!(overlay.phase(), Phase::Idle);
        assert_eq!(game.canvas.blits.lock().unwrap().len(), 4);
    }
}
