//! Lazy spawning. Columns of the event layer are scanned once, a few columns ahead of the
//! player, and every event found there is consumed as it is turned into an enemy, a pickup or a
//! lantern. Crossing the boss gate spawns the boss and clears the stage of everything else.

use bevy::prelude::*;

use crate::bullets::EnemyBullets;
use crate::config::{SpawnParams, Tuning};
use crate::enemy::{enemy_bundle, spawn_enemy, Enemy, EnemyKind};
use crate::player::{Player, PlayerState};
use crate::state::{GameSet, GameState};
use crate::tile_grid::{CellIndex, EventKind, TileGrid};

pub struct SpawnPlugin;

impl Plugin for SpawnPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SpawnTracker>()
            .init_resource::<Pickups>()
            .add_systems(OnEnter(GameState::Loading), reset_spawns)
            .add_systems(
                FixedUpdate,
                (scan_columns, check_boss_gate).chain().in_set(GameSet::Spawn),
            )
            .add_systems(FixedUpdate, update_lanterns.in_set(GameSet::Effects));
    }
}

#[derive(Resource, Debug, Default)]
pub struct SpawnTracker {
    /// First column that has not been scanned yet.
    pub next_column: u32,
    /// Cached on the first scan; `None` when the map has no gate.
    pub gate_column: Option<u32>,
    gate_cached: bool,
    pub boss_spawned: bool,
}

impl SpawnTracker {
    fn gate(&mut self, map: &TileGrid) -> Option<u32> {
        if !self.gate_cached {
            self.gate_column = map.first_column_with(EventKind::BossGate);
            self.gate_cached = true;
        }
        self.gate_column
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lantern {
    pub position: Vec2,
    pub life: f32,
}

/// Collectible items and decorative lanterns spawned from the event layer.
#[derive(Resource, Debug, Default)]
pub struct Pickups {
    pub items: Vec<Vec2>,
    pub lanterns: Vec<Lantern>,
}

impl Pickups {
    pub fn update_lanterns(&mut self, params: &SpawnParams, dt: f32) {
        self.lanterns.retain_mut(|lantern| {
            lantern.position.y += params.lantern_rise_speed * dt;
            lantern.life -= dt;
            lantern.life > 0.0
        });
    }
}

/// Something the scanner found in one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Spawned {
    Enemy(EnemyKind, Vec2),
    Item(Vec2),
    Lantern(Vec2),
}

/// Consumes every spawnable event in columns `[tracker.next_column, up_to]`, clamped to the map.
pub fn scan_ahead(map: &mut TileGrid, tracker: &mut SpawnTracker, up_to: u32) -> Vec<Spawned> {
    let mut found = Vec::new();
    let last = up_to.min(map.width().saturating_sub(1));
    while tracker.next_column <= last {
        let ix = tracker.next_column;
        for cell in map.events_in_column(ix, EventKind::Enemy) {
            let kind = EnemyKind::from_variant(map.enemy_variant(cell));
            found.push(Spawned::Enemy(kind, map.index_to_world(cell)));
            map.consume_event(cell);
        }
        for cell in map.events_in_column(ix, EventKind::Item) {
            found.push(Spawned::Item(map.index_to_world(cell)));
            map.consume_event(cell);
        }
        for cell in map.events_in_column(ix, EventKind::LanternRow) {
            found.push(Spawned::Lantern(map.index_to_world(cell)));
            map.consume_event(cell);
        }
        tracker.next_column += 1;
    }
    found
}

/// Where the boss appears: the first spawn marker (consumed), otherwise a few columns past the
/// gate on the gate's row.
pub fn boss_spawn_point(map: &mut TileGrid, gate_column: u32, fallback_offset: u32) -> Vec2 {
    if let Some(cell) = map
        .first_column_with(EventKind::BossSpawn)
        .and_then(|ix| map.events_in_column(ix, EventKind::BossSpawn).first().copied())
    {
        map.consume_event(cell);
        return map.index_to_world(cell);
    }

    let gate_row = map
        .events_in_column(gate_column, EventKind::BossGate)
        .first()
        .map(|cell| cell.iy)
        .unwrap_or(0);
    let ix = (gate_column + fallback_offset).min(map.width().saturating_sub(1));
    map.index_to_world(CellIndex { ix, iy: gate_row })
}

fn scan_columns(
    mut commands: Commands,
    tuning: Res<Tuning>,
    mut map: ResMut<TileGrid>,
    mut tracker: ResMut<SpawnTracker>,
    mut pickups: ResMut<Pickups>,
    players: Query<&PlayerState, With<Player>>,
) {
    let Ok(player) = players.get_single() else {
        return;
    };
    let column = map.world_to_index(player.position()).ix;
    let up_to = column.saturating_add(tuning.spawn.look_ahead);
    if tracker.next_column > up_to {
        return;
    }

    for spawned in scan_ahead(&mut map, &mut tracker, up_to) {
        match spawned {
            Spawned::Enemy(kind, position) => {
                debug!("Spawning {kind:?} at {position}");
                spawn_enemy(&mut commands, &tuning, kind, position);
            }
            Spawned::Item(position) => pickups.items.push(position),
            Spawned::Lantern(position) => pickups.lanterns.push(Lantern {
                position,
                life: tuning.spawn.lantern_life,
            }),
        }
    }
}

fn check_boss_gate(
    mut commands: Commands,
    tuning: Res<Tuning>,
    mut map: ResMut<TileGrid>,
    mut tracker: ResMut<SpawnTracker>,
    mut enemy_bullets: ResMut<EnemyBullets>,
    players: Query<&PlayerState, With<Player>>,
    enemies: Query<(Entity, &Enemy)>,
) {
    if tracker.boss_spawned {
        return;
    }
    let Ok(player) = players.get_single() else {
        return;
    };
    let Some(gate) = tracker.gate(&map) else {
        return;
    };
    if map.world_to_index(player.position()).ix < gate {
        return;
    }

    for (entity, enemy) in &enemies {
        if !enemy.is_boss() {
            commands.entity(entity).despawn_recursive();
        }
    }
    enemy_bullets.clear();

    let position = boss_spawn_point(&mut map, gate, tuning.spawn.boss_fallback_offset);
    let boss = Enemy::boss(position, tuning.enemies.get(EnemyKind::Walker), &tuning.boss);
    commands.spawn(enemy_bundle(boss));
    tracker.boss_spawned = true;
    info!("Boss gate reached at column {gate}; boss spawned at {position}");
}

fn update_lanterns(time: Res<Time>, tuning: Res<Tuning>, mut pickups: ResMut<Pickups>) {
    pickups.update_lanterns(&tuning.spawn, time.delta_seconds());
}

fn reset_spawns(mut tracker: ResMut<SpawnTracker>, mut pickups: ResMut<Pickups>) {
    *tracker = SpawnTracker::default();
    *pickups = Pickups::default();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tuning;

    fn event_map() -> TileGrid {
        let blocks = vec![vec!["0"; 20].join(","); 5].join("\n");
        let events = [
            ",,,,,,,,,,,,,,,,,,,",
            ",,E,,,,,,,,,,,,,,,,,",
            ",,,,,I,,,,,H,,,,,G,,,B,",
            ",,,,,,,,,,,,,,,,,,,",
            ",,,,L,,,,,,S,,,,,G,,,,",
        ]
        .join("\n");
        TileGrid::from_csv(20, 5, 1.0, &blocks, &events)
    }

    #[test]
    fn scanning_consumes_each_event_once() {
        let mut map = event_map();
        let mut tracker = SpawnTracker::default();

        let first = scan_ahead(&mut map, &mut tracker, 8);
        assert_eq!(first.len(), 3);
        assert!(first.contains(&Spawned::Enemy(EnemyKind::Walker, Vec2::new(2.0, 3.0))));
        assert!(first.contains(&Spawned::Item(Vec2::new(5.0, 2.0))));
        assert!(first.contains(&Spawned::Lantern(Vec2::new(4.0, 0.0))));
        assert_eq!(tracker.next_column, 9);

        assert!(scan_ahead(&mut map, &mut tracker, 8).is_empty());

        let second = scan_ahead(&mut map, &mut tracker, 12);
        assert_eq!(second.len(), 2);
        assert!(second.contains(&Spawned::Enemy(EnemyKind::Hopper, Vec2::new(10.0, 2.0))));
        assert!(second.contains(&Spawned::Enemy(EnemyKind::Shooter, Vec2::new(10.0, 0.0))));
        assert_eq!(map.count_events(EventKind::Enemy), 0);
    }

    #[test]
    fn scanning_stops_at_map_edge() {
        let mut map = event_map();
        let mut tracker = SpawnTracker::default();
        scan_ahead(&mut map, &mut tracker, 500);
        assert_eq!(tracker.next_column, 20);
    }

    #[test]
    fn boss_uses_spawn_marker_or_falls_back() {
        let mut map = event_map();
        assert_eq!(boss_spawn_point(&mut map, 15, 6), Vec2::new(18.0, 2.0));
        assert_eq!(map.count_events(EventKind::BossSpawn), 0);

        // Marker consumed: fall back to the gate row, clamped to the last column.
        assert_eq!(boss_spawn_point(&mut map, 15, 6), Vec2::new(19.0, 2.0));
    }

    #[test]
    fn lanterns_rise_and_expire() {
        let params = SpawnParams::default();
        let mut pickups = Pickups::default();
        pickups.lanterns.push(Lantern {
            position: Vec2::ZERO,
            life: 0.5,
        });
        pickups.update_lanterns(&params, 0.25);
        assert!(pickups.lanterns[0].position.y > 0.0);
        pickups.update_lanterns(&params, 0.3);
        assert!(pickups.lanterns.is_empty());
    }

    #[test]
    fn gate_spawns_boss_and_purges_enemies() {
        let mut app = App::new();
        app.insert_resource(Tuning::default())
            .insert_resource(event_map())
            .init_resource::<SpawnTracker>()
            .init_resource::<EnemyBullets>()
            .add_systems(Update, check_boss_gate);

        let tuning = Tuning::default();
        app.world_mut().spawn(Enemy::standard(
            EnemyKind::Walker,
            Vec2::new(12.0, 2.0),
            &tuning.enemies.walker,
        ));
        let mut player = PlayerState::new(Vec2::new(10.0, 2.0), &tuning.player);
        let player_entity = app.world_mut().spawn((Player, player.clone())).id();

        app.update();
        assert!(!app.world().resource::<SpawnTracker>().boss_spawned);

        player.body.position.x = 15.0;
        app.world_mut().entity_mut(player_entity).insert(player);
        app.update();

        assert!(app.world().resource::<SpawnTracker>().boss_spawned);
        let world = app.world_mut();
        let enemies: Vec<bool> = world.query::<&Enemy>().iter(world).map(Enemy::is_boss).collect();
        assert_eq!(enemies, vec![true]);
    }
}
