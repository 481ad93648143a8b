//! Enemy bullets and the player's danmaku super. Both are plain value lists held in resources;
//! enemy bullets die on walls, danmaku bullets bounce off walls and the edges of the view until
//! their bounce budget runs out.

use bevy::prelude::*;

use crate::camera::ViewBounds;
use crate::config::{BulletParams, Tuning};
use crate::enemy::{update_enemies, EnemyShot};
use crate::state::{GameSet, GameState};
use crate::tile_grid::TileGrid;

pub struct BulletsPlugin;

impl Plugin for BulletsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<EnemyBullets>()
            .init_resource::<DanmakuBullets>()
            .add_systems(OnEnter(GameState::Loading), clear_bullets)
            .add_systems(
                FixedUpdate,
                (absorb_enemy_shots, update_bullets)
                    .chain()
                    .in_set(GameSet::Movement)
                    .after(update_enemies),
            );
    }
}

/// Distance past the map edges at which enemy bullets are dropped.
const CULL_MARGIN: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyBullet {
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
    pub life: f32,
}

#[derive(Resource, Debug, Default)]
pub struct EnemyBullets {
    pub live: Vec<EnemyBullet>,
}

impl EnemyBullets {
    pub fn spawn(&mut self, shot: &EnemyShot, params: &BulletParams) {
        let direction = shot.direction.try_normalize().unwrap_or(Vec2::X);
        self.live.push(EnemyBullet {
            position: shot.origin,
            velocity: direction * shot.speed,
            radius: params.enemy_radius,
            life: params.enemy_life,
        });
    }

    pub fn update(&mut self, map: &TileGrid, dt: f32) {
        let bounds = map.world_bounds().expanded(CULL_MARGIN);
        self.live.retain_mut(|bullet| {
            bullet.position += bullet.velocity * dt;
            bullet.life -= dt;
            bullet.life > 0.0 && bounds.contains(bullet.position) && !map.is_solid_at(bullet.position)
        });
    }

    pub fn clear(&mut self) {
        self.live.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DanmakuBullet {
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
    pub life: f32,
    pub bounces_left: i32,
    pub damage: i32,
}

#[derive(Resource, Debug, Default)]
pub struct DanmakuBullets {
    pub live: Vec<DanmakuBullet>,
}

impl DanmakuBullets {
    /// Emits an evenly spaced ring of bullets around `center`.
    pub fn emit_ring(&mut self, center: Vec2, params: &BulletParams) {
        let count = params.danmaku_count.max(1);
        for i in 0..count {
            let angle = std::f32::consts::TAU * i as f32 / count as f32;
            self.live.push(DanmakuBullet {
                position: center,
                velocity: Vec2::from_angle(angle) * params.danmaku_speed,
                radius: params.danmaku_radius,
                life: params.danmaku_life,
                bounces_left: params.danmaku_bounces,
                damage: params.danmaku_damage,
            });
        }
    }

    /// Moves each bullet one axis at a time so a wall hit reflects only the axis that entered
    /// it. `view` falls back to the map bounds when no camera has published one yet.
    pub fn update(&mut self, map: &TileGrid, view: Option<Rect>, dt: f32) {
        let view = view.unwrap_or_else(|| map.world_bounds().as_rect());

        self.live.retain_mut(|bullet| {
            let step = bullet.velocity * dt;

            let next_x = bullet.position + Vec2::new(step.x, 0.0);
            if map.is_solid_at(next_x) || next_x.x < view.min.x || next_x.x > view.max.x {
                bullet.velocity.x = -bullet.velocity.x;
                bullet.bounces_left -= 1;
            } else {
                bullet.position = next_x;
            }

            let next_y = bullet.position + Vec2::new(0.0, step.y);
            if map.is_solid_at(next_y) || next_y.y < view.min.y || next_y.y > view.max.y {
                bullet.velocity.y = -bullet.velocity.y;
                bullet.bounces_left -= 1;
            } else {
                bullet.position = next_y;
            }

            bullet.life -= dt;
            bullet.life > 0.0 && bullet.bounces_left >= 0
        });
    }

    pub fn clear(&mut self) {
        self.live.clear();
    }
}

fn absorb_enemy_shots(
    mut shots: EventReader<EnemyShot>,
    tuning: Res<Tuning>,
    mut bullets: ResMut<EnemyBullets>,
) {
    for shot in shots.read() {
        bullets.spawn(shot, &tuning.bullets);
    }
}

fn update_bullets(
    time: Res<Time>,
    map: Res<TileGrid>,
    view: Res<ViewBounds>,
    mut enemy_bullets: ResMut<EnemyBullets>,
    mut danmaku: ResMut<DanmakuBullets>,
) {
    let dt = time.delta_seconds();
    enemy_bullets.update(&map, dt);
    danmaku.update(&map, view.0, dt);
}

fn clear_bullets(mut enemy_bullets: ResMut<EnemyBullets>, mut danmaku: ResMut<DanmakuBullets>) {
    enemy_bullets.clear();
    danmaku.clear();
}
