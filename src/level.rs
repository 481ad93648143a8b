//! Level loading. Entering `Loading` reads both CSV layers into a fresh `TileGrid`, rebuilds the
//! block sprites under one `LevelRoot` entity and moves on to `Playing`.
//!
//! A missing or unreadable collision layer is not fatal: the level falls back to an empty grid
//! of the configured size so the game still starts.

use std::path::PathBuf;

use bevy::prelude::*;

use crate::state::GameState;
use crate::tile_grid::{CellIndex, EventKind, TileGrid};

pub struct LevelPlugin;

impl Plugin for LevelPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(LevelConfig::default())
            .init_resource::<TileGrid>()
            .add_systems(OnEnter(GameState::Loading), load_level);
    }
}

/// Where the stage comes from and how it is laid out in the world.
#[derive(Resource, Debug, Clone)]
pub struct LevelConfig {
    pub collision_path: PathBuf,
    pub event_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub cell_size: f32,
    pub spawn_cell: CellIndex,
    /// Screen pixels per world unit; sets the camera zoom.
    pub pixels_per_unit: f32,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            collision_path: PathBuf::from("assets/maps/stage1_blocks.csv"),
            event_path: PathBuf::from("assets/maps/stage1_events.csv"),
            width: 100,
            height: 20,
            cell_size: 1.0,
            spawn_cell: CellIndex { ix: 2, iy: 16 },
            pixels_per_unit: 48.0,
        }
    }
}

impl LevelConfig {
    /// Reads the configured layers, or an empty grid when the collision layer is unavailable.
    pub fn load_grid(&self) -> TileGrid {
        match TileGrid::load(
            self.width,
            self.height,
            self.cell_size,
            &self.collision_path,
            &self.event_path,
        ) {
            Ok(grid) => {
                info!(
                    "Loaded {}x{} map: {} enemies, {} items, {} lantern rows, boss gate: {}",
                    grid.width(),
                    grid.height(),
                    grid.count_events(EventKind::Enemy),
                    grid.count_events(EventKind::Item),
                    grid.count_events(EventKind::LanternRow),
                    grid.count_events(EventKind::BossGate) > 0,
                );
                grid
            }
            Err(err) => {
                warn!("{err:#}; starting with an empty map.");
                TileGrid::empty(self.width, self.height, self.cell_size)
            }
        }
    }
}

/// Parent of every block sprite so a reload can drop them in one go.
#[derive(Component)]
pub struct LevelRoot;

fn load_level(
    mut commands: Commands,
    roots: Query<Entity, With<LevelRoot>>,
    config: Res<LevelConfig>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    for entity in &roots {
        commands.entity(entity).despawn_recursive();
    }

    let grid = config.load_grid();
    let size = Vec2::splat(grid.cell_size());

    commands
        .spawn((Name::new("LevelRoot"), LevelRoot, SpatialBundle::default()))
        .with_children(|parent| {
            for cell in grid.block_cells() {
                parent.spawn(SpriteBundle {
                    sprite: Sprite {
                        color: Color::srgb(0.22, 0.2, 0.3),
                        custom_size: Some(size),
                        ..default()
                    },
                    transform: Transform::from_translation(grid.index_to_world(cell).extend(0.0)),
                    ..default()
                });
            }
        });

    commands.insert_resource(grid);
    next_state.set(GameState::Playing);
}
