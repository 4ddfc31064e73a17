//! When the message is shown, and where.

use rand::Rng;

use crate::settings::{Margins, OverlaySettings};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Not shown, waiting for `next_show_ms`.
    Idle,

    /// On screen until `hide_at_ms`.
    Showing,
}

/// The overlay's timing state. `hide_at_ms` is only ever set while the message is active.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schedule {
    next_show_ms: Option<u64>,
    hide_at_ms: Option<u64>,
    position: (i32, i32),
    active: bool,
}

impl Schedule {
    /// Sets the first showing time if it hasn't been set yet.
    pub fn ensure_seeded(&mut self, now_ms: u64, interval_ms: u64) {
        if self.next_show_ms.is_none() && !self.active {
            self.next_show_ms = Some(now_ms.saturating_add(interval_ms));
        }
    }

    /// Moves the schedule on to `now_ms`, hiding or showing the message if it's time to.
    pub fn advance(
        &mut self,
        now_ms: u64,
        settings: &OverlaySettings,
        screen: (i32, i32),
        rng: &mut impl Rng,
    ) -> Phase {
        self.ensure_seeded(now_ms, settings.interval_ms);

        if let Some(hide_at) = self.hide_at_ms.filter(|_| self.active) {
            if now_ms >= hide_at {
                self.active = false;
                self.hide_at_ms = None;

                // The interval counts from when the message disappears.
                self.next_show_ms = Some(now_ms.saturating_add(settings.interval_ms));

                log::debug!("hiding overlay");
            }
        }

        if let Some(show_at) = self.next_show_ms.filter(|_| !self.active) {
            if now_ms >= show_at {
                self.position = random_position(rng, screen, &settings.margins);
                self.active = true;
                self.hide_at_ms = Some(now_ms.saturating_add(settings.duration_ms));
                self.next_show_ms = None;

                log::info!("showing overlay at {:?}", self.position);
            }
        }

        self.phase()
    }

    pub fn phase(&self) -> Phase {
        if self.active {
            Phase::Showing
        } else {
            Phase::Idle
        }
    }

    pub fn position(&self) -> (i32, i32) {
        self.position
    }

    pub fn next_show_ms(&self) -> Option<u64> {
        self.next_show_ms
    }

    pub fn hide_at_ms(&self) -> Option<u64> {
        self.hide_at_ms
    }
}

/// Picks a point uniformly within the screen minus `margins`. On screens too small for the
/// margins, the point is pinned to the top-left margin.
pub fn random_position(rng: &mut impl Rng, screen: (i32, i32), margins: &Margins) -> (i32, i32) {
    let (width, height) = screen;

    let max_x = margins.left.max(width.saturating_sub(margins.right));
    let max_y = margins.top.max(height.saturating_sub(margins.bottom));

    (
        rng.gen_range(margins.left..=max_x),
        rng.gen_range(margins.top..=max_y),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn settings() -> OverlaySettings {
        OverlaySettings::default()
    }

    fn starting_at(now_ms: u64, interval_ms: u64) -> Schedule {
        let mut schedule = Schedule::default();
        schedule.ensure_seeded(now_ms, interval_ms);
        schedule
    }

    #[test]
    fn first_showing_is_one_interval_after_start() {
        let settings = settings();
        let mut rng = StdRng::seed_from_u64(1);
        let mut schedule = starting_at(1_000, settings.interval_ms);

        assert_eq!(schedule.next_show_ms(), Some(61_000));
        assert_eq!(
            schedule.advance(60_999, &settings, (1920, 1080), &mut rng),
            Phase::Idle
        );
        assert_eq!(
            schedule.advance(61_000, &settings, (1920, 1080), &mut rng),
            Phase::Showing
        );
        assert_eq!(schedule.hide_at_ms(), Some(64_000));
    }

    #[test]
    fn unseeded_schedule_seeds_on_first_advance() {
        let settings = settings();
        let mut rng = StdRng::seed_from_u64(2);
        let mut schedule = Schedule::default();

        assert_eq!(
            schedule.advance(500, &settings, (1920, 1080), &mut rng),
            Phase::Idle
        );
        assert_eq!(schedule.next_show_ms(), Some(60_500));
    }

    #[test]
    fn interval_counts_from_hide_time() {
        let settings = settings();
        let mut rng = StdRng::seed_from_u64(3);
        let mut schedule = starting_at(0, settings.interval_ms);

        schedule.advance(60_000, &settings, (1920, 1080), &mut rng);

        // A late frame hides the message after its deadline.
        assert_eq!(
            schedule.advance(63_500, &settings, (1920, 1080), &mut rng),
            Phase::Idle
        );
        assert_eq!(schedule.hide_at_ms(), None);
        assert_eq!(schedule.next_show_ms(), Some(123_500));
    }

    #[test]
    fn hide_time_set_only_while_active() {
        let settings = settings();
        let mut rng = StdRng::seed_from_u64(4);
        let mut schedule = starting_at(0, settings.interval_ms);

        for now in (0..200_000).step_by(250) {
            let phase = schedule.advance(now, &settings, (1920, 1080), &mut rng);
            assert_eq!(phase == Phase::Showing, schedule.hide_at_ms().is_some());
            assert_eq!(phase == Phase::Idle, schedule.next_show_ms().is_some());
        }
    }

    #[test]
    fn steady_state_duty_cycle() {
        let settings = settings();
        let mut rng = StdRng::seed_from_u64(5);
        let mut schedule = starting_at(0, settings.interval_ms);

        let step = 10;
        let mut first_shown = None;
        let mut shown_ms = 0;

        let cycle = settings.interval_ms + settings.duration_ms;
        let end = settings.interval_ms + 3 * cycle;

        for now in (0..end).step_by(step) {
            if schedule.advance(now, &settings, (1920, 1080), &mut rng) == Phase::Showing {
                first_shown.get_or_insert(now);
                shown_ms += step as u64;
            }
        }

        assert_eq!(first_shown, Some(settings.interval_ms));
        assert_eq!(shown_ms, 3 * settings.duration_ms);
    }

    #[test]
    fn positions_stay_inside_margins() {
        let margins = Margins::default();
        let mut rng = StdRng::seed_from_u64(6);

        for _ in 0..1_000 {
            let (x, y) = random_position(&mut rng, (1920, 1080), &margins);
            assert!((50..=1570).contains(&x));
            assert!((50..=960).contains(&y));
        }
    }

    #[test]
    fn small_screens_pin_to_margin() {
        let margins = Margins::default();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..100 {
            assert_eq!(random_position(&mut rng, (300, 100), &margins), (50, 50));
        }
    }

    #[test]
    fn huge_timings_saturate() {
        let settings = OverlaySettings {
            interval_ms: u64::MAX,
            duration_ms: u64::MAX,
            ..OverlaySettings::default()
        };
        let mut rng = StdRng::seed_from_u64(8);

        let mut schedule = Schedule::default();
        assert_eq!(
            schedule.advance(5, &settings, (1920, 1080), &mut rng),
            Phase::Idle
        );
        assert_eq!(schedule.next_show_ms(), Some(u64::MAX));

        // An overlay that does show never hides.
        let mut shown = starting_at(10, 1);
        assert_eq!(
            shown.advance(11, &settings, (1920, 1080), &mut rng),
            Phase::Showing
        );
        assert_eq!(shown.hide_at_ms(), Some(u64::MAX));
        assert_eq!(
            shown.advance(1_000_000, &settings, (1920, 1080), &mut rng),
            Phase::Showing
        );
    }
}
