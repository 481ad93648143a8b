//! Player controller. Locomotion, turning, the rhythm weapon and damage all live on one
//! `PlayerState` component as independent sub-systems advanced once per fixed tick.
//!
//! The entity is spawned when the level finishes loading and despawned when a new load starts,
//! so pausing and resuming never recreate it.

use bevy::prelude::*;

use crate::bullets::DanmakuBullets;
use crate::config::{PlayerParams, Tuning};
use crate::firework::{Fireworks, WeaponForm};
use crate::input::{Action, PlayerInput};
use crate::level::LevelConfig;
use crate::movement::{step_body, Body};
use crate::rhythm::{Judgment, RhythmCharge};
use crate::state::{GameSet, GameState};
use crate::tile_grid::TileGrid;

pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnExit(GameState::Loading), spawn_player)
            .add_systems(OnEnter(GameState::Loading), despawn_player)
            .add_systems(FixedUpdate, update_player.in_set(GameSet::Movement));
    }
}

/// Marker used by the camera, HUD and combat queries to find the player entity.
#[derive(Component)]
pub struct Player;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Facing {
    #[default]
    Right,
    Left,
}

impl Facing {
    pub fn sign(self) -> f32 {
        match self {
            Facing::Right => 1.0,
            Facing::Left => -1.0,
        }
    }

    /// Yaw of the model when fully turned this way.
    pub fn angle(self) -> f32 {
        match self {
            Facing::Right => 0.0,
            Facing::Left => std::f32::consts::PI,
        }
    }
}

/// What the controller asked for this tick; the system turns these into projectiles.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerActions {
    pub fire: Option<Judgment>,
    pub super_shot: bool,
}

#[derive(Component, Debug, Clone)]
pub struct PlayerState {
    pub body: Body,
    pub facing: Facing,
    pub grounded: bool,
    /// Time left in which a jump is still honoured after leaving the ground.
    pub coyote: f32,
    /// Time left in which an early jump press is remembered.
    pub jump_buffer: f32,
    turn_timer: f32,
    turn_from: f32,
    pub angle: f32,
    pub hp: i32,
    pub invincible: f32,
    pub dead: bool,
    pub rhythm: RhythmCharge,
    pub weapon: WeaponForm,
    pub stock: u32,
    pub sp_gauge: f32,
    pub super_cooldown: f32,
}

impl PlayerState {
    pub fn new(position: Vec2, params: &PlayerParams) -> Self {
        Self {
            body: Body::new(
                position.extend(1.0),
                Vec2::new(params.width, params.height) * 0.5,
            ),
            facing: Facing::Right,
            grounded: false,
            coyote: 0.0,
            jump_buffer: 0.0,
            turn_timer: 0.0,
            turn_from: 0.0,
            angle: Facing::Right.angle(),
            hp: params.max_hp,
            invincible: 0.0,
            dead: false,
            rhythm: RhythmCharge::default(),
            weapon: WeaponForm::Rocket,
            stock: 0,
            sp_gauge: 0.0,
            super_cooldown: 0.0,
        }
    }

    pub fn position(&self) -> Vec2 {
        self.body.center()
    }

    /// Runs every sub-system for one tick. A dead player is frozen.
    pub fn update(
        &mut self,
        map: &TileGrid,
        input: &PlayerInput,
        tuning: &Tuning,
        dt: f32,
    ) -> PlayerActions {
        if self.dead {
            return PlayerActions::default();
        }

        self.invincible = (self.invincible - dt).max(0.0);
        self.super_cooldown = (self.super_cooldown - dt).max(0.0);

        self.update_facing(input.axis(), &tuning.player, dt);
        self.update_locomotion(map, input, &tuning.player, dt);

        if input.pressed(Action::CycleWeapon) {
            self.weapon = self.weapon.next();
        }

        let fire = self.rhythm.tick(
            &tuning.rhythm,
            input.pressed(Action::Attack),
            input.held(Action::Attack),
            dt,
        );

        let super_shot = input.pressed(Action::Super) && self.try_spend_super(tuning.bullets.super_cooldown);

        PlayerActions { fire, super_shot }
    }

    pub fn update_locomotion(
        &mut self,
        map: &TileGrid,
        input: &PlayerInput,
        params: &PlayerParams,
        dt: f32,
    ) {
        let axis = input.axis();
        let velocity = &mut self.body.velocity;

        if self.grounded {
            if axis != 0.0 {
                velocity.x += axis * params.ground_accel * dt;
            } else {
                velocity.x *= 1.0 - params.ground_attenuation;
                if velocity.x.abs() < 1e-3 {
                    velocity.x = 0.0;
                }
            }
        } else {
            velocity.x += axis * params.air_accel * dt;
        }
        velocity.x = velocity.x.clamp(-params.max_run_speed, params.max_run_speed);

        if self.grounded {
            self.coyote = params.coyote_time;
        } else {
            self.coyote = (self.coyote - dt).max(0.0);
        }

        if input.pressed(Action::Jump) {
            self.jump_buffer = params.jump_buffer;
        } else {
            self.jump_buffer = (self.jump_buffer - dt).max(0.0);
        }

        if self.jump_buffer > 0.0 && (self.grounded || self.coyote > 0.0) {
            velocity.y = params.jump_velocity;
            self.grounded = false;
            self.coyote = 0.0;
            self.jump_buffer = 0.0;
        }

        if input.released(Action::Jump) && velocity.y > 0.0 {
            velocity.y *= params.jump_cut;
        }

        if !self.grounded {
            velocity.y = (velocity.y - params.gravity * dt).max(-params.max_fall_speed);
        }

        let (_, grounded) = step_body(map, &mut self.body, self.grounded, dt);
        self.grounded = grounded;
    }

    fn update_facing(&mut self, axis: f32, params: &PlayerParams, dt: f32) {
        let wanted = if axis > 0.0 {
            Facing::Right
        } else if axis < 0.0 {
            Facing::Left
        } else {
            self.facing
        };

        if wanted != self.facing {
            self.facing = wanted;
            self.turn_from = self.angle;
            self.turn_timer = params.turn_duration;
        }

        if self.turn_timer > 0.0 {
            self.turn_timer = (self.turn_timer - dt).max(0.0);
            let duration = params.turn_duration.max(f32::EPSILON);
            let t = 1.0 - self.turn_timer / duration;
            self.angle = self.turn_from + (self.facing.angle() - self.turn_from) * t;
        } else {
            self.angle = self.facing.angle();
        }
    }

    /// Applies damage from a source at `source_x`. Returns false when the hit was ignored
    /// because the player is invincible or already dead.
    pub fn take_damage(&mut self, amount: i32, source_x: f32, params: &PlayerParams) -> bool {
        if self.dead || self.invincible > 0.0 {
            return false;
        }

        self.hp = (self.hp - amount.max(1)).max(0);
        self.invincible = params.invincible_time;

        let away = self.position().x - source_x;
        let push = if away.abs() > 1e-4 {
            away.signum()
        } else {
            -self.facing.sign()
        };
        self.body.velocity.x = push * params.knockback_x;
        self.body.velocity.y = params.knockback_y;
        self.grounded = false;

        if self.hp <= 0 {
            self.dead = true;
            info!("Player defeated.");
        }
        true
    }

    /// False on the "off" half of each blink period while invincible.
    pub fn blink_visible(&self, params: &PlayerParams) -> bool {
        if self.invincible <= 0.0 {
            return true;
        }
        let phase = (self.invincible * params.blink_hz * 2.0) as i32;
        phase % 2 == 0
    }

    pub fn add_stock(&mut self, max_stock: u32) {
        self.stock = (self.stock + 1).min(max_stock);
    }

    /// Fills the SP gauge; a full gauge turns into one stock.
    pub fn add_sp(&mut self, amount: f32, max_stock: u32) {
        if amount <= 0.0 {
            return;
        }
        self.sp_gauge += amount;
        while self.sp_gauge >= 1.0 {
            self.sp_gauge -= 1.0;
            self.add_stock(max_stock);
        }
    }

    fn try_spend_super(&mut self, cooldown: f32) -> bool {
        if self.stock == 0 || self.super_cooldown > 0.0 {
            return false;
        }
        self.stock -= 1;
        self.super_cooldown = cooldown;
        true
    }

    /// Muzzle point just ahead of the body in the facing direction.
    pub fn muzzle(&self) -> Vec2 {
        self.position() + Vec2::new(self.facing.sign() * self.body.half_extents.x, 0.0)
    }
}

fn spawn_player(
    mut commands: Commands,
    map: Res<TileGrid>,
    config: Res<LevelConfig>,
    tuning: Res<Tuning>,
    cameras: Query<(), With<Camera2d>>,
) {
    debug_assert!(map.width() > 0 && map.height() > 0, "tile grid must be loaded before the player");
    debug_assert!(!cameras.is_empty(), "a 2D camera must exist before the player");

    let position = map.index_to_world(config.spawn_cell);
    let state = PlayerState::new(position, &tuning.player);
    let size = state.body.half_extents * 2.0;

    commands.spawn((
        Name::new("Player"),
        Player,
        SpriteBundle {
            sprite: Sprite {
                color: Color::srgb(0.95, 0.85, 0.35),
                custom_size: Some(size),
                ..default()
            },
            transform: Transform::from_translation(state.body.position),
            ..default()
        },
        state,
        Fireworks::default(),
    ));
}

fn despawn_player(mut commands: Commands, query: Query<Entity, With<Player>>) {
    for entity in &query {
        commands.entity(entity).despawn_recursive();
    }
}

fn update_player(
    time: Res<Time>,
    input: Res<PlayerInput>,
    tuning: Res<Tuning>,
    map: Res<TileGrid>,
    mut danmaku: ResMut<DanmakuBullets>,
    mut query: Query<(&mut PlayerState, &mut Fireworks), With<Player>>,
) {
    let Ok((mut player, mut fireworks)) = query.get_single_mut() else {
        return;
    };
    let dt = time.delta_seconds();

    let actions = player.update(&map, &input, &tuning, dt);

    if let Some(judgment) = actions.fire {
        let direction = Vec2::new(player.facing.sign(), 0.0);
        fireworks.fire(
            player.weapon,
            judgment,
            player.muzzle(),
            direction,
            &tuning.fireworks,
            &tuning.rhythm,
        );
    }

    if actions.super_shot {
        danmaku.emit_ring(player.position(), &tuning.bullets);
    }

    fireworks.update(&map, tuning.fireworks.bounds_margin, dt);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::FIXED_DT;

    /// 20x10 map with a solid bottom row.
    fn floor_map() -> TileGrid {
        let mut rows = vec![vec!["0"; 20].join(","); 9];
        rows.push(vec!["1"; 20].join(","));
        TileGrid::from_csv(20, 10, 1.0, &rows.join("\n"), "")
    }

    fn standing_player(map: &TileGrid, params: &PlayerParams) -> PlayerState {
        let floor_top = map.index_to_world_rect(crate::tile_grid::CellIndex { ix: 5, iy: 9 }).top;
        let mut player = PlayerState::new(Vec2::new(5.0, floor_top + params.height * 0.5 + 0.002), params);
        player.grounded = true;
        player
    }

    fn tick(player: &mut PlayerState, map: &TileGrid, input: PlayerInput, tuning: &Tuning) -> PlayerActions {
        player.update(map, &input, tuning, FIXED_DT)
    }

    #[test]
    fn jump_from_ground_and_land_again() {
        let map = floor_map();
        let tuning = Tuning::default();
        let mut player = standing_player(&map, &tuning.player);
        let start_y = player.position().y;

        tick(&mut player, &map, PlayerInput::from_held(&[Action::Jump], &[]), &tuning);
        assert!(!player.grounded);
        assert!(player.body.velocity.y > 0.0);

        let held = PlayerInput::from_held(&[Action::Jump], &[Action::Jump]);
        let mut peak = start_y;
        for _ in 0..180 {
            tick(&mut player, &map, held, &tuning);
            peak = peak.max(player.position().y);
        }
        assert!(peak > start_y + 1.0);
        assert!(player.grounded);
        assert!((player.position().y - start_y).abs() < 0.01);
    }

    #[test]
    fn coyote_time_allows_late_jump() {
        let map = floor_map();
        let tuning = Tuning::default();
        let mut player = PlayerState::new(Vec2::new(5.0, 4.0), &tuning.player);
        player.grounded = false;
        player.coyote = tuning.player.coyote_time;

        tick(&mut player, &map, PlayerInput::from_held(&[Action::Jump], &[]), &tuning);
        assert!(player.body.velocity.y > 0.0);

        let mut late = PlayerState::new(Vec2::new(5.0, 4.0), &tuning.player);
        late.coyote = 0.0;
        tick(&mut late, &map, PlayerInput::from_held(&[Action::Jump], &[]), &tuning);
        assert!(late.body.velocity.y <= 0.0);
    }

    #[test]
    fn buffered_jump_fires_on_landing() {
        let map = floor_map();
        let tuning = Tuning::default();
        let floor_top = map.index_to_world_rect(crate::tile_grid::CellIndex { ix: 5, iy: 9 }).top;
        let mut player =
            PlayerState::new(Vec2::new(5.0, floor_top + tuning.player.height * 0.5 + 0.05), &tuning.player);
        player.body.velocity.y = -6.0;

        tick(&mut player, &map, PlayerInput::from_held(&[Action::Jump], &[]), &tuning);
        let mut jumped = player.body.velocity.y > 0.0;
        let held = PlayerInput::from_held(&[Action::Jump], &[Action::Jump]);
        for _ in 0..4 {
            tick(&mut player, &map, held, &tuning);
            jumped |= player.body.velocity.y > 0.0;
        }
        assert!(jumped);
    }

    #[test]
    fn early_release_cuts_the_jump() {
        let map = floor_map();
        let tuning = Tuning::default();

        let mut full = standing_player(&map, &tuning.player);
        let mut cut = standing_player(&map, &tuning.player);
        let press = PlayerInput::from_held(&[Action::Jump], &[]);
        tick(&mut full, &map, press, &tuning);
        tick(&mut cut, &map, press, &tuning);

        tick(&mut full, &map, PlayerInput::from_held(&[Action::Jump], &[Action::Jump]), &tuning);
        tick(&mut cut, &map, PlayerInput::from_held(&[], &[Action::Jump]), &tuning);
        assert!(cut.body.velocity.y < full.body.velocity.y * 0.75);
    }

    #[test]
    fn turning_interpolates_angle() {
        let map = floor_map();
        let tuning = Tuning::default();
        let mut player = standing_player(&map, &tuning.player);

        tick(&mut player, &map, PlayerInput::from_held(&[Action::Left], &[]), &tuning);
        assert_eq!(player.facing, Facing::Left);
        assert!(player.turn_timer > 0.0);
        assert!(player.angle > 0.0 && player.angle < std::f32::consts::PI);

        let held = PlayerInput::from_held(&[Action::Left], &[Action::Left]);
        for _ in 0..30 {
            tick(&mut player, &map, held, &tuning);
        }
        assert_eq!(player.turn_timer, 0.0);
        assert_eq!(player.angle, Facing::Left.angle());
    }

    #[test]
    fn invincibility_blocks_repeat_damage() {
        let params = PlayerParams::default();
        let mut player = PlayerState::new(Vec2::new(5.0, 5.0), &params);

        assert!(player.take_damage(1, 6.0, &params));
        assert_eq!(player.hp, 2);
        assert!(player.body.velocity.x < 0.0);
        assert!(!player.take_damage(1, 6.0, &params));
        assert_eq!(player.hp, 2);

        player.invincible = 0.0;
        assert!(player.take_damage(1, 4.0, &params));
        assert!(player.body.velocity.x > 0.0);
    }

    #[test]
    fn zero_hp_is_terminal() {
        let params = PlayerParams::default();
        let mut player = PlayerState::new(Vec2::new(5.0, 5.0), &params);
        player.hp = 1;

        assert!(player.take_damage(1, 4.0, &params));
        assert_eq!(player.hp, 0);
        assert!(player.dead);

        player.invincible = 0.0;
        assert!(!player.take_damage(1, 4.0, &params));
        assert_eq!(player.hp, 0);
    }

    #[test]
    fn blink_alternates_while_invincible() {
        let params = PlayerParams::default();
        let mut player = PlayerState::new(Vec2::ZERO, &params);
        assert!(player.blink_visible(&params));

        let mut seen = [false; 2];
        for i in 0..20 {
            player.invincible = 1.0 - i as f32 * 0.01;
            seen[player.blink_visible(&params) as usize] = true;
        }
        assert_eq!(seen, [true, true]);
    }

    #[test]
    fn sp_gauge_converts_to_stock() {
        let params = PlayerParams::default();
        let mut player = PlayerState::new(Vec2::ZERO, &params);
        player.add_sp(0.6, 5);
        assert_eq!(player.stock, 0);
        player.add_sp(0.6, 5);
        assert_eq!(player.stock, 1);
        assert!((player.sp_gauge - 0.2).abs() < 1e-5);

        for _ in 0..10 {
            player.add_stock(5);
        }
        assert_eq!(player.stock, 5);
    }

    #[test]
    fn super_needs_stock_and_cooldown() {
        let map = floor_map();
        let tuning = Tuning::default();
        let mut player = standing_player(&map, &tuning.player);
        let press = PlayerInput::from_held(&[Action::Super], &[]);

        assert!(!tick(&mut player, &map, press, &tuning).super_shot);

        player.stock = 2;
        assert!(tick(&mut player, &map, press, &tuning).super_shot);
        assert_eq!(player.stock, 1);
        assert!(!tick(&mut player, &map, press, &tuning).super_shot);
        assert_eq!(player.stock, 1);
    }

    #[test]
    fn cycle_weapon_rotates_forms() {
        let map = floor_map();
        let tuning = Tuning::default();
        let mut player = standing_player(&map, &tuning.player);
        let press = PlayerInput::from_held(&[Action::CycleWeapon], &[]);

        tick(&mut player, &map, press, &tuning);
        assert_eq!(player.weapon, WeaponForm::Burst);
        tick(&mut player, &map, press, &tuning);
        tick(&mut player, &map, press, &tuning);
        assert_eq!(player.weapon, WeaponForm::Rocket);
    }
}
