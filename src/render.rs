//! Presentation. Runs in `Update` and only reads simulation state: sprites follow their bodies,
//! and everything without an entity of its own (projectiles, pickups, lanterns, the rhythm ring,
//! kill sparks) is drawn with gizmos each frame.

use bevy::prelude::*;

use crate::bullets::{DanmakuBullets, EnemyBullets};
use crate::config::Tuning;
use crate::enemy::{base_color, Brain, Enemy, EnemyKilled, BOSS_COLOR};
use crate::firework::{Fireworks, WeaponForm};
use crate::player::{Player, PlayerState};
use crate::spawn::Pickups;

pub struct RenderPlugin;

impl Plugin for RenderPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Sparks>().add_systems(
            Update,
            (
                sync_player_sprite,
                sync_enemy_sprites,
                (collect_sparks, draw_sparks).chain(),
                draw_projectiles,
                draw_pickups,
                draw_rhythm_ring,
            ),
        );
    }
}

const BOSS_VULNERABLE_COLOR: Color = Color::srgb(0.95, 0.55, 0.8);
/// Peak z-rotation of the walk wobble, in radians.
const WOBBLE_ANGLE: f32 = 0.08;
const WOBBLE_RATE: f32 = 12.0;
const SPARK_COUNT: usize = 10;
const SPARK_SPEED: f32 = 4.0;
const SPARK_LIFE: f32 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spark {
    pub position: Vec2,
    pub velocity: Vec2,
    pub life: f32,
}

/// Short-lived particles thrown out where an enemy died.
#[derive(Resource, Debug, Default)]
pub struct Sparks {
    pub live: Vec<Spark>,
}

impl Sparks {
    pub fn emit(&mut self, at: Vec2) {
        for i in 0..SPARK_COUNT {
            let angle = std::f32::consts::TAU * i as f32 / SPARK_COUNT as f32;
            self.live.push(Spark {
                position: at,
                velocity: Vec2::from_angle(angle) * SPARK_SPEED,
                life: SPARK_LIFE,
            });
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.live.retain_mut(|spark| {
            spark.position += spark.velocity * dt;
            spark.velocity *= 0.9;
            spark.life -= dt;
            spark.life > 0.0
        });
    }
}

fn sync_player_sprite(
    tuning: Res<Tuning>,
    mut query: Query<(&PlayerState, &mut Transform, &mut Visibility), With<Player>>,
) {
    let Ok((player, mut transform, mut visibility)) = query.get_single_mut() else {
        return;
    };
    transform.translation = player.body.position;
    transform.rotation = Quat::from_rotation_y(player.angle);
    *visibility = if player.blink_visible(&tuning.player) {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    };
}

/// Tint for an enemy this frame: white while flashing, lighter while the boss is open.
pub fn enemy_tint(enemy: &Enemy) -> Color {
    if enemy.hit_flash > 0.0 {
        return Color::WHITE;
    }
    match &enemy.brain {
        Brain::Boss(ai) if ai.is_vulnerable() => BOSS_VULNERABLE_COLOR,
        Brain::Boss(_) => BOSS_COLOR,
        Brain::Standard(_) => base_color(enemy.kind),
    }
}

fn sync_enemy_sprites(mut query: Query<(&Enemy, &mut Transform, &mut Sprite)>) {
    for (enemy, mut transform, mut sprite) in &mut query {
        transform.translation = enemy.motion.body.position;
        let wobble = if enemy.motion.on_ground && enemy.motion.body.velocity.x.abs() > 0.05 {
            (enemy.walk_timer * WOBBLE_RATE).sin() * WOBBLE_ANGLE
        } else {
            0.0
        };
        transform.rotation = Quat::from_rotation_z(wobble);
        sprite.color = enemy_tint(enemy);
        sprite.flip_x = enemy.facing() < 0.0;
    }
}

fn collect_sparks(mut killed: EventReader<EnemyKilled>, mut sparks: ResMut<Sparks>) {
    for kill in killed.read() {
        debug!("{:?} defeated at {}", kill.kind, kill.position);
        sparks.emit(kill.position);
    }
}

fn draw_sparks(time: Res<Time>, mut sparks: ResMut<Sparks>, mut gizmos: Gizmos) {
    sparks.update(time.delta_seconds());
    for spark in &sparks.live {
        let alpha = (spark.life / SPARK_LIFE).clamp(0.0, 1.0);
        gizmos.circle_2d(spark.position, 0.06, Color::srgba(1.0, 0.85, 0.4, alpha));
    }
}

fn firework_color(kind: WeaponForm) -> Color {
    match kind {
        WeaponForm::Rocket => Color::srgb(1.0, 0.6, 0.2),
        WeaponForm::Burst => Color::srgb(1.0, 0.3, 0.6),
        WeaponForm::Pierce => Color::srgb(0.5, 0.9, 1.0),
    }
}

fn draw_projectiles(
    fireworks: Query<&Fireworks, With<Player>>,
    enemy_bullets: Res<EnemyBullets>,
    danmaku: Res<DanmakuBullets>,
    mut gizmos: Gizmos,
) {
    for shots in &fireworks {
        for shot in &shots.live {
            gizmos.circle_2d(shot.position, shot.radius, firework_color(shot.kind));
        }
    }
    for bullet in &enemy_bullets.live {
        gizmos.circle_2d(bullet.position, bullet.radius, Color::srgb(1.0, 0.25, 0.25));
    }
    for bullet in &danmaku.live {
        gizmos.circle_2d(bullet.position, bullet.radius, Color::srgb(0.7, 0.5, 1.0));
    }
}

fn draw_pickups(pickups: Res<Pickups>, tuning: Res<Tuning>, mut gizmos: Gizmos) {
    for item in &pickups.items {
        gizmos.circle_2d(*item, tuning.spawn.pickup_radius, Color::srgb(0.4, 1.0, 0.5));
    }
    for lantern in &pickups.lanterns {
        let alpha = (lantern.life / tuning.spawn.lantern_life.max(f32::EPSILON)).clamp(0.0, 1.0);
        gizmos.rect_2d(
            lantern.position,
            0.0,
            Vec2::new(0.3, 0.4),
            Color::srgba(1.0, 0.7, 0.3, alpha),
        );
    }
}

fn draw_rhythm_ring(tuning: Res<Tuning>, players: Query<&PlayerState, With<Player>>, mut gizmos: Gizmos) {
    let Ok(player) = players.get_single() else {
        return;
    };
    let params = &tuning.rhythm;
    let Some(ring) = player.rhythm.ring(params) else {
        return;
    };
    let scale = 1.0 / params.pixels_per_unit.max(1.0);
    let center = player.position();

    gizmos.circle_2d(center, params.ring_target * scale, Color::srgba(1.0, 1.0, 1.0, 0.35));
    let color = if (ring - params.ring_target).abs() <= params.perfect_tolerance {
        Color::srgb(1.0, 0.95, 0.4)
    } else {
        Color::srgb(0.6, 0.8, 1.0)
    };
    gizmos.circle_2d(center, ring * scale, color);
}
