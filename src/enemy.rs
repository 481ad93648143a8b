//! Enemies. Every enemy is the same `Enemy` record with a behaviour strategy chosen at spawn
//! time: `StandardAi` for walkers, hoppers and shooters, `BossAi` for the boss. The record owns
//! the shared parts (gravity, integration, the foot/side probe, damage, hit flash, facing); the
//! strategy only decides velocities, state changes and shots.

use bevy::prelude::*;

use crate::boss::BossAi;
use crate::config::{BossParams, EnemyParams, Tuning};
use crate::movement::{probe_foot_and_side, Aabb, Body};
use crate::player::{Player, PlayerState};
use crate::state::{GameSet, GameState};
use crate::tile_grid::TileGrid;

pub struct EnemyPlugin;

impl Plugin for EnemyPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<EnemyShot>()
            .add_event::<EnemyKilled>()
            .add_systems(OnEnter(GameState::Loading), despawn_all_enemies)
            .add_systems(FixedUpdate, update_enemies.in_set(GameSet::Movement))
            .add_systems(FixedUpdate, despawn_dead_enemies.in_set(GameSet::Effects));
    }
}

pub const BOSS_COLOR: Color = Color::srgb(0.75, 0.2, 0.55);

const HIT_FLASH_TIME: f32 = 0.10;
const STUN_TIME: f32 = 0.10;
const KNOCKBACK_SPEED: f32 = 3.0;
/// Fraction of knockback velocity kept per tick.
const KNOCKBACK_DECAY: f32 = 0.85;
const LOS_SAMPLES: u32 = 12;
/// Half width of the band around the preferred range in which a shooter holds still.
const STANDOFF_BAND: f32 = 0.4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnemyKind {
    #[default]
    Walker,
    Hopper,
    Shooter,
}

impl EnemyKind {
    /// Event-layer variant byte to kind. Unknown variants become walkers.
    pub fn from_variant(variant: u8) -> Self {
        match variant {
            1 => EnemyKind::Hopper,
            2 => EnemyKind::Shooter,
            _ => EnemyKind::Walker,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnemyState {
    #[default]
    Patrol,
    Chase,
    Attack,
    Stunned,
    Dead,
}

/// Request to spawn one enemy bullet.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct EnemyShot {
    pub origin: Vec2,
    pub direction: Vec2,
    pub speed: f32,
}

#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct EnemyKilled {
    pub position: Vec2,
    pub kind: EnemyKind,
    pub boss: bool,
}

/// Physical state shared by both behaviour strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnemyMotion {
    pub body: Body,
    pub on_ground: bool,
    /// -1 or +1.
    pub dir: f32,
    /// Decaying horizontal push from the last hit, added on top of the AI's velocity.
    pub knockback: f32,
}

/// What a behaviour strategy sees each tick.
pub struct Senses<'a> {
    pub map: &'a TileGrid,
    pub target: Option<Vec2>,
    pub dt: f32,
}

#[derive(Debug, Clone)]
pub enum Brain {
    Standard(StandardAi),
    Boss(BossAi),
}

/// Patrol/Chase/Attack brain for ordinary enemies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StandardAi {
    pub home_x: f32,
    pub hop_timer: f32,
    pub shoot_cooldown: f32,
    pub attack_timer: f32,
    pub stun_timer: f32,
}

impl StandardAi {
    pub fn new(home_x: f32) -> Self {
        Self {
            home_x,
            ..default()
        }
    }

    fn tick(
        &mut self,
        kind: EnemyKind,
        state: &mut EnemyState,
        motion: &mut EnemyMotion,
        params: &EnemyParams,
        senses: &Senses,
        shots: &mut Vec<EnemyShot>,
    ) {
        match *state {
            EnemyState::Patrol => self.patrol(kind, state, motion, params, senses),
            EnemyState::Chase => self.chase(kind, state, motion, params, senses, shots),
            EnemyState::Attack => {
                self.attack_timer = (self.attack_timer - senses.dt).max(0.0);
                motion.body.velocity.x = 0.0;
                if self.attack_timer <= 0.0 {
                    *state = EnemyState::Chase;
                }
            }
            EnemyState::Stunned => {
                self.stun_timer = (self.stun_timer - senses.dt).max(0.0);
                motion.body.velocity.x = 0.0;
                if self.stun_timer <= 0.0 {
                    *state = EnemyState::Chase;
                }
            }
            EnemyState::Dead => {}
        }
    }

    fn patrol(
        &mut self,
        kind: EnemyKind,
        state: &mut EnemyState,
        motion: &mut EnemyMotion,
        params: &EnemyParams,
        senses: &Senses,
    ) {
        let pos = motion.body.center();
        if pos.x < self.home_x - params.patrol_half_width {
            motion.dir = 1.0;
        } else if pos.x > self.home_x + params.patrol_half_width {
            motion.dir = -1.0;
        }

        if kind == EnemyKind::Hopper {
            self.hop(motion, params, senses.dt);
        }

        if motion.on_ground {
            let half = motion.body.half_extents;
            let ahead = pos.x + motion.dir * (half.x + 0.15);
            let hole = !senses.map.is_solid_at(Vec2::new(ahead, pos.y - (half.y + 0.06)));
            let wall = senses.map.is_solid_at(Vec2::new(ahead, pos.y));
            if hole || wall {
                motion.dir = -motion.dir;
            }
        }
        motion.body.velocity.x = motion.dir * params.speed_patrol;

        if let Some(target) = senses.target {
            if pos.distance(target) <= params.aggro_range {
                *state = EnemyState::Chase;
            }
        }
    }

    fn chase(
        &mut self,
        kind: EnemyKind,
        state: &mut EnemyState,
        motion: &mut EnemyMotion,
        params: &EnemyParams,
        senses: &Senses,
        shots: &mut Vec<EnemyShot>,
    ) {
        let Some(target) = senses.target else {
            *state = EnemyState::Patrol;
            return;
        };
        let pos = motion.body.center();
        let to_target = target - pos;
        let distance = to_target.length();
        let toward = if to_target.x >= 0.0 { 1.0 } else { -1.0 };

        if kind == EnemyKind::Shooter {
            if to_target.x.abs() > 1e-4 {
                motion.body.velocity.x = if distance > params.prefer_range + STANDOFF_BAND {
                    toward * params.speed_chase
                } else if distance < params.prefer_range - STANDOFF_BAND {
                    -toward * params.speed_chase
                } else {
                    0.0
                };
            }

            self.shoot_cooldown = (self.shoot_cooldown - senses.dt).max(0.0);
            if self.shoot_cooldown <= 0.0 && line_of_sight(senses.map, pos, target) {
                shots.push(EnemyShot {
                    origin: pos,
                    direction: Vec2::new(toward, 0.0),
                    speed: params.projectile_speed,
                });
                self.shoot_cooldown = params.shoot_cooldown;
            }
        } else {
            motion.body.velocity.x = toward * params.speed_chase;
            if kind == EnemyKind::Hopper {
                self.hop(motion, params, senses.dt);
            }
            if distance <= params.attack_range {
                *state = EnemyState::Attack;
                self.attack_timer = params.attack_windup + params.attack_cooldown;
                motion.body.velocity.x = 0.0;
            }
        }

        if distance > params.aggro_range * 1.5 {
            *state = EnemyState::Patrol;
        }
    }

    fn hop(&mut self, motion: &mut EnemyMotion, params: &EnemyParams, dt: f32) {
        self.hop_timer -= dt;
        if motion.on_ground && self.hop_timer <= 0.0 {
            motion.body.velocity.y = params.hop_power;
            motion.on_ground = false;
            self.hop_timer = params.hop_cooldown;
        }
    }
}

/// Coarse line of sight: samples points along the segment and fails on the first solid one.
pub fn line_of_sight(map: &TileGrid, from: Vec2, to: Vec2) -> bool {
    (1..=LOS_SAMPLES).all(|i| {
        let t = i as f32 / LOS_SAMPLES as f32;
        !map.is_solid_at(from.lerp(to, t))
    })
}

#[derive(Component, Debug, Clone)]
pub struct Enemy {
    pub kind: EnemyKind,
    pub state: EnemyState,
    pub hp: i32,
    pub motion: EnemyMotion,
    pub params: EnemyParams,
    pub brain: Brain,
    pub hit_flash: f32,
    pub walk_timer: f32,
}

impl Enemy {
    pub fn standard(kind: EnemyKind, position: Vec2, params: &EnemyParams) -> Self {
        let half = Vec2::new(params.width, params.height) * 0.5;
        Self {
            kind,
            state: EnemyState::Patrol,
            hp: params.hp,
            motion: EnemyMotion {
                body: Body::new(position.extend(0.5), half),
                on_ground: false,
                dir: -1.0,
                knockback: 0.0,
            },
            params: *params,
            brain: Brain::Standard(StandardAi::new(position.x)),
            hit_flash: 0.0,
            walk_timer: 0.0,
        }
    }

    /// A boss is a scaled walker with its own HP, gravity and phase brain.
    pub fn boss(position: Vec2, base: &EnemyParams, boss: &BossParams) -> Self {
        let params = EnemyParams {
            hp: boss.hp,
            width: base.width * boss.scale,
            height: base.height * boss.scale,
            gravity: boss.gravity,
            ..*base
        };
        let mut enemy = Self::standard(EnemyKind::Walker, position, &params);
        enemy.brain = Brain::Boss(BossAi::new(boss.clone()));
        enemy
    }

    pub fn is_boss(&self) -> bool {
        matches!(self.brain, Brain::Boss(_))
    }

    pub fn is_dead(&self) -> bool {
        self.state == EnemyState::Dead
    }

    pub fn position(&self) -> Vec2 {
        self.motion.body.center()
    }

    pub fn aabb(&self) -> Aabb {
        self.motion.body.aabb()
    }

    /// -1 or +1, the direction the enemy is looking.
    pub fn facing(&self) -> f32 {
        self.motion.dir
    }

    /// Advances one tick: gravity, brain, integration, map probe, facing.
    pub fn tick(
        &mut self,
        map: &TileGrid,
        target: Option<Vec2>,
        dt: f32,
        shots: &mut Vec<EnemyShot>,
    ) {
        if self.is_dead() {
            return;
        }
        let senses = Senses { map, target, dt };

        let velocity = &mut self.motion.body.velocity;
        velocity.y = (velocity.y - self.params.gravity * dt).max(-self.params.max_fall_speed);

        match &mut self.brain {
            Brain::Standard(ai) => ai.tick(
                self.kind,
                &mut self.state,
                &mut self.motion,
                &self.params,
                &senses,
                shots,
            ),
            Brain::Boss(ai) => ai.tick(&mut self.motion, &senses, shots),
        }

        self.walk_timer += dt;
        self.hit_flash = (self.hit_flash - dt).max(0.0);

        let knockback = self.motion.knockback;
        let body = &mut self.motion.body;
        body.position.x += (body.velocity.x + knockback) * dt;
        body.position.y += body.velocity.y * dt;

        let contacts = probe_foot_and_side(map, &mut self.motion.body, knockback);
        self.motion.on_ground = contacts.ground;
        self.motion.knockback = if contacts.wall { 0.0 } else { knockback * KNOCKBACK_DECAY };
        if self.motion.knockback.abs() < 1e-3 {
            self.motion.knockback = 0.0;
        }
        if contacts.wall {
            match &mut self.brain {
                Brain::Standard(_) if self.state == EnemyState::Patrol => {
                    self.motion.dir = -self.motion.dir;
                }
                Brain::Boss(ai) => ai.on_wall(self.motion.body.center(), shots),
                Brain::Standard(_) => {}
            }
        }

        self.resolve_facing(target);
    }

    fn resolve_facing(&mut self, target: Option<Vec2>) {
        let looks_at_target = self.is_boss()
            || matches!(self.state, EnemyState::Chase | EnemyState::Attack);
        let dx = match target {
            Some(target) if looks_at_target => target.x - self.position().x,
            _ => self.motion.body.velocity.x,
        };
        if dx.abs() > 1e-4 {
            self.motion.dir = dx.signum();
        }
    }

    /// Applies at least one point of damage pushed along `push_dir`. Returns true when this hit
    /// killed the enemy.
    pub fn apply_damage(&mut self, damage: i32, push_dir: f32) -> bool {
        if self.is_dead() {
            return false;
        }
        self.hp -= damage.max(1);
        self.hit_flash = HIT_FLASH_TIME;
        if push_dir.abs() > 1e-4 {
            self.motion.knockback = push_dir.signum() * KNOCKBACK_SPEED;
        }

        if self.hp <= 0 {
            self.state = EnemyState::Dead;
            return true;
        }

        if let Brain::Standard(ai) = &mut self.brain {
            ai.stun_timer = STUN_TIME;
            self.state = EnemyState::Stunned;
        }
        false
    }
}

/// Bundles the enemy with a tinted quad sized to its body.
pub fn enemy_bundle(enemy: Enemy) -> impl Bundle {
    let color = if enemy.is_boss() {
        BOSS_COLOR
    } else {
        base_color(enemy.kind)
    };
    let size = enemy.motion.body.half_extents * 2.0;
    let translation = enemy.motion.body.position;
    (
        Name::new(if enemy.is_boss() { "Boss" } else { "Enemy" }),
        SpriteBundle {
            sprite: Sprite {
                color,
                custom_size: Some(size),
                ..default()
            },
            transform: Transform::from_translation(translation),
            ..default()
        },
        enemy,
    )
}

pub fn base_color(kind: EnemyKind) -> Color {
    match kind {
        EnemyKind::Walker => Color::srgb(0.8, 0.3, 0.25),
        EnemyKind::Hopper => Color::srgb(0.3, 0.75, 0.35),
        EnemyKind::Shooter => Color::srgb(0.3, 0.45, 0.9),
    }
}

pub fn update_enemies(
    time: Res<Time>,
    map: Res<TileGrid>,
    players: Query<&PlayerState, With<Player>>,
    mut enemies: Query<&mut Enemy>,
    mut shot_events: EventWriter<EnemyShot>,
) {
    let dt = time.delta_seconds();
    let target = players
        .get_single()
        .ok()
        .filter(|player| !player.dead)
        .map(PlayerState::position);

    let mut shots = Vec::new();
    for mut enemy in &mut enemies {
        enemy.tick(&map, target, dt, &mut shots);
    }
    for shot in shots {
        shot_events.send(shot);
    }
}

fn despawn_dead_enemies(mut commands: Commands, enemies: Query<(Entity, &Enemy)>) {
    for (entity, enemy) in &enemies {
        if enemy.is_dead() {
            commands.entity(entity).despawn_recursive();
        }
    }
}

fn despawn_all_enemies(mut commands: Commands, enemies: Query<Entity, With<Enemy>>) {
    for entity in &enemies {
        commands.entity(entity).despawn_recursive();
    }
}

/// Spawns one enemy of `kind` using the tuning table.
pub fn spawn_enemy(commands: &mut Commands, tuning: &Tuning, kind: EnemyKind, position: Vec2) {
    let enemy = Enemy::standard(kind, position, tuning.enemies.get(kind));
    commands.spawn(enemy_bundle(enemy));
}
