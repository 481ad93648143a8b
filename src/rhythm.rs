//! Rhythm charge. Holding attack grows a ring that eases out towards `ring_end` over one beat;
//! releasing compares the ring with `ring_target` and grades the shot. Holding through a whole
//! beat parks the shot as pending, and the metronome fires it at the next beat boundary with a
//! Perfect grade.

use crate::config::{JudgmentScale, RhythmParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Judgment {
    Perfect,
    Good,
    Offbeat,
}

impl Judgment {
    pub fn scale(self, params: &RhythmParams) -> JudgmentScale {
        match self {
            Judgment::Perfect => params.perfect,
            Judgment::Good => params.good,
            Judgment::Offbeat => params.offbeat,
        }
    }
}

pub fn beat_period(params: &RhythmParams) -> f32 {
    60.0 / params.bpm.max(1.0)
}

/// Ring radius after holding for `hold` seconds:
/// `end - (end - start) * exp(-rate * hold / period)`.
pub fn ring_radius(params: &RhythmParams, hold: f32) -> f32 {
    let u = hold.max(0.0) / beat_period(params);
    let span = params.ring_end - params.ring_start;
    params.ring_end - span * (-params.ease_rate * u).exp()
}

pub fn judge(params: &RhythmParams, radius: f32) -> Judgment {
    let error = (radius - params.ring_target).abs();
    if error <= params.perfect_tolerance {
        Judgment::Perfect
    } else if error <= params.good_tolerance {
        Judgment::Good
    } else {
        Judgment::Offbeat
    }
}

/// Charge and metronome state owned by the player.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RhythmCharge {
    pub holding: bool,
    pub hold_time: f32,
    pub pending: bool,
    pub cooldown: f32,
    /// Time since the last beat boundary.
    pub beat_clock: f32,
    pub last_judgment: Option<Judgment>,
}

impl RhythmCharge {
    /// Current ring radius while charging.
    pub fn ring(&self, params: &RhythmParams) -> Option<f32> {
        self.holding.then(|| ring_radius(params, self.hold_time))
    }

    /// Advances one tick. Returns the grade of a shot to fire this tick, if any.
    pub fn tick(
        &mut self,
        params: &RhythmParams,
        attack_pressed: bool,
        attack_held: bool,
        dt: f32,
    ) -> Option<Judgment> {
        let period = beat_period(params);
        self.cooldown = (self.cooldown - dt).max(0.0);
        self.beat_clock += dt;
        let on_beat = self.beat_clock >= period;
        if on_beat {
            self.beat_clock %= period;
        }

        if attack_pressed && !self.holding && !self.pending {
            self.holding = true;
            self.hold_time = 0.0;
        }

        if self.holding {
            if !attack_held {
                self.holding = false;
                if self.cooldown > 0.0 {
                    return None;
                }
                let judgment = judge(params, ring_radius(params, self.hold_time));
                return Some(self.commit(params, judgment));
            }

            self.hold_time += dt;
            if self.hold_time >= period {
                self.holding = false;
                self.pending = true;
            }
        }

        if self.pending && on_beat && self.cooldown <= 0.0 {
            self.pending = false;
            return Some(self.commit(params, Judgment::Perfect));
        }

        None
    }

    fn commit(&mut self, params: &RhythmParams, judgment: Judgment) -> Judgment {
        self.cooldown = params.fire_cooldown;
        self.last_judgment = Some(judgment);
        judgment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::FIXED_DT;

    /// Hold time at which the ring crosses `ring_target`.
    fn target_time(params: &RhythmParams) -> f32 {
        let span = (params.ring_end - params.ring_start).max(f32::EPSILON);
        let remaining = (params.ring_end - params.ring_target).clamp(f32::EPSILON, span);
        -(remaining / span).ln() / params.ease_rate.max(f32::EPSILON) * beat_period(params)
    }

    fn params() -> RhythmParams {
        RhythmParams {
            bpm: 120.0,
            ring_start: 16.0,
            ring_end: 120.0,
            ring_target: 84.0,
            perfect_tolerance: 6.0,
            good_tolerance: 14.0,
            ..RhythmParams::default()
        }
    }

    #[test]
    fn target_lands_near_085_of_a_beat() {
        let p = params();
        let period = beat_period(&p);
        let at = 0.85 * period;
        assert_eq!(judge(&p, ring_radius(&p, at)), Judgment::Perfect);
        assert!((target_time(&p) / period - 0.85).abs() < 0.01);
        assert!((ring_radius(&p, target_time(&p)) - 84.0).abs() < 1e-3);
    }

    #[test]
    fn judgment_bands() {
        let p = params();
        assert_eq!(judge(&p, 84.0), Judgment::Perfect);
        assert_eq!(judge(&p, 90.0), Judgment::Perfect);
        assert_eq!(judge(&p, 77.5), Judgment::Good);
        assert_eq!(judge(&p, 98.0), Judgment::Good);
        assert_eq!(judge(&p, 98.5), Judgment::Offbeat);
        assert_eq!(judge(&p, 16.0), Judgment::Offbeat);
    }

    #[test]
    fn ring_grows_monotonically_towards_end() {
        let p = params();
        assert_eq!(ring_radius(&p, 0.0), 16.0);
        let mut last = 0.0;
        for i in 0..60 {
            let r = ring_radius(&p, i as f32 * FIXED_DT);
            assert!(r > last && r < 120.0);
            last = r;
        }
    }

    #[test]
    fn release_on_target_fires_perfect() {
        let p = params();
        let mut charge = RhythmCharge::default();
        let ticks = (target_time(&p) / FIXED_DT).round() as usize;

        assert_eq!(charge.tick(&p, true, true, FIXED_DT), None);
        for _ in 1..ticks {
            assert_eq!(charge.tick(&p, false, true, FIXED_DT), None);
        }
        assert_eq!(charge.tick(&p, false, false, FIXED_DT), Some(Judgment::Perfect));
        assert!(charge.cooldown > 0.0);
    }

    #[test]
    fn quick_tap_is_offbeat() {
        let p = params();
        let mut charge = RhythmCharge::default();
        charge.tick(&p, true, true, FIXED_DT);
        assert_eq!(charge.tick(&p, false, false, FIXED_DT), Some(Judgment::Offbeat));
    }

    #[test]
    fn overheld_shot_auto_fires_on_next_beat() {
        let p = params();
        let period = beat_period(&p);
        let mut charge = RhythmCharge::default();
        charge.tick(&p, true, true, FIXED_DT);

        let mut fired = None;
        let mut ticks = 1;
        while fired.is_none() && ticks < 240 {
            fired = charge.tick(&p, false, true, FIXED_DT);
            ticks += 1;
        }
        assert_eq!(fired, Some(Judgment::Perfect));
        assert!(!charge.pending);
        assert!(ticks as f32 * FIXED_DT >= period);

        assert_eq!(charge.tick(&p, false, false, FIXED_DT), None);
    }

    #[test]
    fn cooldown_swallows_release() {
        let p = params();
        let mut charge = RhythmCharge {
            cooldown: 1.0,
            ..RhythmCharge::default()
        };
        charge.tick(&p, true, true, FIXED_DT);
        assert_eq!(charge.tick(&p, false, false, FIXED_DT), None);
        assert!(!charge.holding);
    }
}
