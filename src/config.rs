//! Gameplay tuning. Every number the simulation uses lives in `Tuning`, which is read once from
//! `assets/config/tuning.ron` when the app is built. Every struct is `#[serde(default)]`, so the
//! file only needs to name the values it overrides.

use std::path::Path;

use anyhow::Context;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::enemy::EnemyKind;

pub const TUNING_PATH: &str = "assets/config/tuning.ron";

/// Loads `Tuning` before any other gameplay plugin reads it.
pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(Tuning::load_or_default(Path::new(TUNING_PATH)));
    }
}

#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub player: PlayerParams,
    pub rhythm: RhythmParams,
    pub fireworks: FireworkParams,
    pub enemies: EnemyTable,
    pub boss: BossParams,
    pub bullets: BulletParams,
    pub spawn: SpawnParams,
}

impl Tuning {
    pub fn from_ron(text: &str) -> anyhow::Result<Self> {
        ron::from_str(text).context("parsing tuning RON")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading tuning file {}", path.display()))?;
        Self::from_ron(&text)
    }

    /// Falls back to the built-in defaults when the file is missing or malformed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(tuning) => {
                info!("Loaded tuning from {}", path.display());
                tuning
            }
            Err(err) => {
                warn!("{err:#}; using built-in tuning.");
                Self::default()
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerParams {
    pub width: f32,
    pub height: f32,
    pub max_hp: i32,
    pub ground_accel: f32,
    /// Fraction of horizontal speed shed per tick with no input on the ground.
    pub ground_attenuation: f32,
    pub air_accel: f32,
    pub max_run_speed: f32,
    pub gravity: f32,
    pub max_fall_speed: f32,
    pub jump_velocity: f32,
    /// Multiplier applied to upward velocity when jump is released early.
    pub jump_cut: f32,
    pub coyote_time: f32,
    pub jump_buffer: f32,
    pub turn_duration: f32,
    pub invincible_time: f32,
    pub blink_hz: f32,
    pub knockback_x: f32,
    pub knockback_y: f32,
}

impl Default for PlayerParams {
    fn default() -> Self {
        Self {
            width: 0.8,
            height: 0.8,
            max_hp: 3,
            ground_accel: 40.0,
            ground_attenuation: 0.15,
            air_accel: 24.0,
            max_run_speed: 6.0,
            gravity: 58.0,
            max_fall_speed: 24.0,
            jump_velocity: 17.0,
            jump_cut: 0.5,
            coyote_time: 0.1,
            jump_buffer: 0.1,
            turn_duration: 0.3,
            invincible_time: 1.0,
            blink_hz: 10.0,
            knockback_x: 6.0,
            knockback_y: 8.0,
        }
    }
}

/// Stat multipliers applied to a shot for one judgment tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct JudgmentScale {
    pub speed: f32,
    pub life: f32,
    pub radius: f32,
    pub damage: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RhythmParams {
    pub bpm: f32,
    /// Ring radius in HUD pixels when the charge starts.
    pub ring_start: f32,
    /// Radius the ring eases towards.
    pub ring_end: f32,
    pub ring_target: f32,
    /// Exponential ease-out rate per beat.
    pub ease_rate: f32,
    pub perfect_tolerance: f32,
    pub good_tolerance: f32,
    /// Shared between manual release and metronome auto-fire.
    pub fire_cooldown: f32,
    /// HUD pixels per world unit when the ring is drawn around the player.
    pub pixels_per_unit: f32,
    pub perfect: JudgmentScale,
    pub good: JudgmentScale,
    pub offbeat: JudgmentScale,
}

impl Default for RhythmParams {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            ring_start: 16.0,
            ring_end: 120.0,
            ring_target: 84.0,
            ease_rate: 1.25,
            perfect_tolerance: 6.0,
            good_tolerance: 14.0,
            fire_cooldown: 0.15,
            pixels_per_unit: 48.0,
            perfect: JudgmentScale {
                speed: 1.25,
                life: 1.2,
                radius: 1.3,
                damage: 1.5,
            },
            good: JudgmentScale {
                speed: 1.0,
                life: 1.0,
                radius: 1.0,
                damage: 1.0,
            },
            offbeat: JudgmentScale {
                speed: 0.75,
                life: 0.7,
                radius: 0.8,
                damage: 0.5,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ShotParams {
    pub speed: f32,
    pub life: f32,
    pub radius: f32,
    pub damage: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BurstChildParams {
    pub count: u32,
    pub speed: f32,
    pub life: f32,
    pub radius: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FireworkParams {
    pub rocket: ShotParams,
    pub burst: ShotParams,
    pub burst_children: BurstChildParams,
    pub pierce: ShotParams,
    /// Life a pierce shot loses per enemy it passes through.
    pub pierce_life_cost: f32,
    /// Distance beyond the map edges before a shot is culled.
    pub bounds_margin: f32,
}

impl Default for FireworkParams {
    fn default() -> Self {
        Self {
            rocket: ShotParams {
                speed: 14.0,
                life: 1.0,
                radius: 0.25,
                damage: 2.0,
            },
            burst: ShotParams {
                speed: 10.0,
                life: 0.6,
                radius: 0.3,
                damage: 2.0,
            },
            burst_children: BurstChildParams {
                count: 8,
                speed: 6.0,
                life: 0.35,
                radius: 0.2,
            },
            pierce: ShotParams {
                speed: 12.0,
                life: 1.2,
                radius: 0.3,
                damage: 2.0,
            },
            pierce_life_cost: 0.25,
            bounds_margin: 2.0,
        }
    }
}

/// Per-kind enemy stats. Speeds are world units per second, gravity is units per second squared.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyParams {
    pub hp: i32,
    pub width: f32,
    pub height: f32,
    pub speed_patrol: f32,
    pub speed_chase: f32,
    pub gravity: f32,
    pub max_fall_speed: f32,
    pub hop_power: f32,
    pub hop_cooldown: f32,
    pub prefer_range: f32,
    pub shoot_cooldown: f32,
    pub projectile_speed: f32,
    pub aggro_range: f32,
    pub attack_range: f32,
    pub attack_windup: f32,
    pub attack_cooldown: f32,
    pub patrol_half_width: f32,
}

impl Default for EnemyParams {
    fn default() -> Self {
        Self {
            hp: 5,
            width: 0.9,
            height: 0.9,
            speed_patrol: 0.78,
            speed_chase: 1.8,
            gravity: 54.0,
            max_fall_speed: 24.0,
            hop_power: 16.8,
            hop_cooldown: 0.9,
            prefer_range: 3.0,
            shoot_cooldown: 1.2,
            projectile_speed: 10.8,
            aggro_range: 6.0,
            attack_range: 1.2,
            attack_windup: 0.25,
            attack_cooldown: 0.5,
            patrol_half_width: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyTable {
    pub walker: EnemyParams,
    pub hopper: EnemyParams,
    pub shooter: EnemyParams,
}

impl Default for EnemyTable {
    fn default() -> Self {
        let base = EnemyParams::default();
        Self {
            walker: base,
            hopper: EnemyParams {
                hp: 4,
                speed_patrol: 0.6,
                speed_chase: 1.68,
                gravity: 64.8,
                hop_power: 20.4,
                hop_cooldown: 0.7,
                prefer_range: 2.0,
                ..base
            },
            shooter: EnemyParams {
                hp: 3,
                speed_patrol: 0.6,
                speed_chase: 1.32,
                prefer_range: 3.5,
                shoot_cooldown: 1.0,
                projectile_speed: 13.2,
                ..base
            },
        }
    }
}

impl EnemyTable {
    pub fn get(&self, kind: EnemyKind) -> &EnemyParams {
        match kind {
            EnemyKind::Walker => &self.walker,
            EnemyKind::Hopper => &self.hopper,
            EnemyKind::Shooter => &self.shooter,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BossParams {
    pub hp: i32,
    pub scale: f32,
    pub gravity: f32,
    /// When false the boss never enters Volley and its radial bursts are silent.
    pub fires_bullets: bool,
    pub idle_time: f32,
    pub volley_count: u32,
    pub volley_interval: f32,
    pub volley_tail: f32,
    pub volley_shots: u32,
    pub volley_spread_deg: f32,
    pub volley_speed: f32,
    pub dash_prep_time: f32,
    pub dash_speed: f32,
    pub dash_duration: f32,
    pub hop_prep_time: f32,
    pub hop_velocity: f32,
    pub hop_h_speed: f32,
    pub stomp_recover_time: f32,
    pub rest_after_attack: f32,
    pub rest_after_stomp: f32,
    pub radial_shots: u32,
    pub radial_speed: f32,
}

impl Default for BossParams {
    fn default() -> Self {
        Self {
            hp: 50,
            scale: 2.5,
            gravity: 64.8,
            fires_bullets: true,
            idle_time: 0.40,
            volley_count: 4,
            volley_interval: 0.28,
            volley_tail: 0.35,
            volley_shots: 3,
            volley_spread_deg: 30.0,
            volley_speed: 13.2,
            dash_prep_time: 0.45,
            dash_speed: 7.2,
            dash_duration: 0.70,
            hop_prep_time: 0.25,
            hop_velocity: 27.6,
            hop_h_speed: 3.6,
            stomp_recover_time: 0.50,
            rest_after_attack: 0.45,
            rest_after_stomp: 0.50,
            radial_shots: 6,
            radial_speed: 12.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BulletParams {
    pub enemy_radius: f32,
    pub enemy_life: f32,
    pub enemy_damage: i32,
    pub danmaku_count: u32,
    pub danmaku_speed: f32,
    pub danmaku_bounces: i32,
    pub danmaku_life: f32,
    pub danmaku_radius: f32,
    pub danmaku_damage: i32,
    pub super_cooldown: f32,
}

impl Default for BulletParams {
    fn default() -> Self {
        Self {
            enemy_radius: 0.2,
            enemy_life: 3.0,
            enemy_damage: 1,
            danmaku_count: 24,
            danmaku_speed: 9.0,
            danmaku_bounces: 3,
            danmaku_life: 3.0,
            danmaku_radius: 0.2,
            danmaku_damage: 1,
            super_cooldown: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnParams {
    /// Columns ahead of the player that are scanned for events.
    pub look_ahead: u32,
    pub max_stock: u32,
    pub sp_gain_per_damage: f32,
    pub sp_gain_danmaku_hit: f32,
    pub pickup_radius: f32,
    pub lantern_life: f32,
    pub lantern_rise_speed: f32,
    pub contact_damage: i32,
    /// Columns past the gate used for the boss when the map has no spawn marker.
    pub boss_fallback_offset: u32,
}

impl Default for SpawnParams {
    fn default() -> Self {
        Self {
            look_ahead: 8,
            max_stock: 5,
            sp_gain_per_damage: 0.04,
            sp_gain_danmaku_hit: 0.01,
            pickup_radius: 0.4,
            lantern_life: 2.5,
            lantern_rise_speed: 1.2,
            contact_damage: 1,
            boss_fallback_offset: 6,
        }
    }
}
