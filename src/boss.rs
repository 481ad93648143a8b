//! Boss phase machine. It replaces Patrol/Chase/Attack entirely and cycles through scripted
//! attack patterns, with a rest window after each pattern in which the boss stands still.

use bevy::prelude::*;

use crate::config::BossParams;
use crate::enemy::{EnemyMotion, EnemyShot, Senses};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BossPhase {
    #[default]
    Idle,
    Volley,
    DashPrep,
    DashRun,
    HopPrep,
    HopUp,
    HopFall,
    StompRecover,
}

#[derive(Debug, Clone)]
pub struct BossAi {
    pub phase: BossPhase,
    /// Time spent in the current phase, rest included.
    pub phase_time: f32,
    pub rest: f32,
    pub dash_dir: f32,
    pub volley_left: u32,
    /// Drives the deterministic pattern rotation out of Idle.
    pub sequence: u32,
    params: BossParams,
}

impl BossAi {
    /// The boss opens with a dash so it moves as soon as it appears.
    pub fn new(params: BossParams) -> Self {
        Self {
            phase: BossPhase::DashPrep,
            phase_time: 0.0,
            rest: 0.0,
            dash_dir: -1.0,
            volley_left: 0,
            sequence: 0,
            params,
        }
    }

    /// True while the boss is in a telegraph or recovery window.
    pub fn is_vulnerable(&self) -> bool {
        self.rest > 0.0
            || matches!(
                self.phase,
                BossPhase::DashPrep | BossPhase::HopPrep | BossPhase::StompRecover
            )
    }

    fn enter(&mut self, phase: BossPhase) {
        self.phase = phase;
        self.phase_time = 0.0;
    }

    fn finish(&mut self, rest: f32) {
        self.enter(BossPhase::Idle);
        self.rest = rest;
    }

    fn next_pattern(&mut self) -> BossPhase {
        let step = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        if self.params.fires_bullets {
            match step % 3 {
                0 => BossPhase::Volley,
                1 => BossPhase::DashPrep,
                _ => BossPhase::HopPrep,
            }
        } else if step % 2 == 0 {
            BossPhase::DashPrep
        } else {
            BossPhase::HopPrep
        }
    }

    pub fn tick(&mut self, motion: &mut EnemyMotion, senses: &Senses, shots: &mut Vec<EnemyShot>) {
        self.phase_time += senses.dt;
        if self.rest > 0.0 {
            self.rest = (self.rest - senses.dt).max(0.0);
            motion.body.velocity.x = 0.0;
            return;
        }

        let me = motion.body.center();
        let target = senses
            .target
            .unwrap_or_else(|| me + Vec2::new(motion.dir, 0.0));
        let toward = |fallback: f32| {
            let dx = target.x - me.x;
            if dx.abs() > 1e-4 {
                dx.signum()
            } else {
                fallback
            }
        };
        let p = &self.params;

        match self.phase {
            BossPhase::Idle => {
                motion.body.velocity.x = 0.0;
                if self.phase_time >= p.idle_time {
                    let next = self.next_pattern();
                    if next == BossPhase::Volley {
                        self.volley_left = self.params.volley_count;
                    }
                    self.enter(next);
                }
            }
            BossPhase::Volley => {
                motion.body.velocity.x = 0.0;
                if self.phase_time >= p.volley_interval && self.volley_left > 0 {
                    self.phase_time = 0.0;
                    self.volley_left -= 1;
                    self.fire_spread(me, target, shots);
                }
                if self.volley_left == 0 && self.phase_time > self.params.volley_tail {
                    self.finish(self.params.rest_after_attack);
                }
            }
            BossPhase::DashPrep => {
                motion.body.velocity.x = 0.0;
                if senses.target.is_some() {
                    self.dash_dir = toward(self.dash_dir);
                }
                if self.phase_time >= p.dash_prep_time {
                    self.enter(BossPhase::DashRun);
                }
            }
            BossPhase::DashRun => {
                motion.body.velocity.x = self.dash_dir * p.dash_speed;
                if self.phase_time >= p.dash_duration {
                    self.fire_radial(me, shots);
                    self.finish(self.params.rest_after_attack);
                }
            }
            BossPhase::HopPrep => {
                motion.body.velocity.x = 0.0;
                if self.phase_time >= p.hop_prep_time {
                    self.dash_dir = toward(self.dash_dir);
                    motion.body.velocity.x = self.dash_dir * p.hop_h_speed;
                    motion.body.velocity.y = p.hop_velocity;
                    motion.on_ground = false;
                    self.enter(BossPhase::HopUp);
                }
            }
            BossPhase::HopUp => {
                motion.body.velocity.x = toward(self.dash_dir) * p.hop_h_speed;
                if motion.body.velocity.y <= 0.0 {
                    self.enter(BossPhase::HopFall);
                }
            }
            BossPhase::HopFall => {
                motion.body.velocity.x = toward(self.dash_dir) * p.hop_h_speed;
                if motion.on_ground {
                    self.enter(BossPhase::StompRecover);
                }
            }
            BossPhase::StompRecover => {
                motion.body.velocity.x = 0.0;
                if self.phase_time >= p.stomp_recover_time {
                    self.finish(self.params.rest_after_stomp);
                }
            }
        }
    }

    /// A dash that runs into a wall ends early with the same radial burst.
    pub fn on_wall(&mut self, at: Vec2, shots: &mut Vec<EnemyShot>) {
        if self.phase == BossPhase::DashRun {
            self.fire_radial(at, shots);
            self.finish(self.params.rest_after_attack);
        }
    }

    fn fire_spread(&self, from: Vec2, target: Vec2, shots: &mut Vec<EnemyShot>) {
        if !self.params.fires_bullets {
            return;
        }
        let aim = target - from;
        let base = aim.y.atan2(aim.x);
        let count = self.params.volley_shots.max(1);
        let mid = count / 2;
        let step = if mid == 0 {
            0.0
        } else {
            self.params.volley_spread_deg.to_radians() / mid as f32
        };

        for i in 0..count {
            let angle = base + (i as f32 - mid as f32) * step;
            shots.push(EnemyShot {
                origin: from,
                direction: Vec2::from_angle(angle),
                speed: self.params.volley_speed,
            });
        }
    }

    fn fire_radial(&self, from: Vec2, shots: &mut Vec<EnemyShot>) {
        if !self.params.fires_bullets {
            return;
        }
        let count = self.params.radial_shots.max(1);
        for i in 0..count {
            let angle = std::f32::consts::TAU * i as f32 / count as f32;
            shots.push(EnemyShot {
                origin: from,
                direction: Vec2::from_angle(angle),
                speed: self.params.radial_speed,
            });
        }
    }
}
