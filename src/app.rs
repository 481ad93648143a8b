//! High-level plugin composition.
//!
//! `FireworksPlatformerPlugin` registers every gameplay plugin and fixes the order of one
//! simulation tick. Gameplay runs in `FixedUpdate` at 60 Hz, chained
//! Input → Spawn → Movement → Combat → Effects, and only while `Playing`; presentation and the
//! state hot keys run every frame in `Update`.

use bevy::prelude::*;

use crate::bullets::BulletsPlugin;
use crate::camera::CameraPlugin;
use crate::combat::CombatPlugin;
use crate::config::ConfigPlugin;
use crate::enemy::EnemyPlugin;
use crate::input::InputPlugin;
use crate::level::LevelPlugin;
use crate::player::PlayerPlugin;
use crate::render::RenderPlugin;
use crate::spawn::SpawnPlugin;
use crate::state::{restart_on_key, toggle_pause, watch_outcome, GameSet, GameState};
use crate::ui::UiPlugin;

const TICK_HZ: f64 = 60.0;

pub struct FireworksPlatformerPlugin;

impl Plugin for FireworksPlatformerPlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<GameState>()
            .insert_resource(Time::<Fixed>::from_hz(TICK_HZ))
            .add_plugins((
                ConfigPlugin,  // Tuning from RON.
                LevelPlugin,   // CSV layers + block sprites.
                InputPlugin,   // Keyboard to actions.
                PlayerPlugin,
                EnemyPlugin,
                BulletsPlugin,
                SpawnPlugin,   // Column scanner + boss gate.
                CombatPlugin,
                CameraPlugin,
                RenderPlugin,
                UiPlugin,      // HUD + overlays.
            ))
            .configure_sets(
                FixedUpdate,
                (
                    GameSet::Input,
                    GameSet::Spawn,
                    GameSet::Movement,
                    GameSet::Combat,
                    GameSet::Effects,
                )
                    .chain()
                    .run_if(in_state(GameState::Playing)),
            )
            .add_systems(FixedUpdate, watch_outcome.in_set(GameSet::Effects))
            .add_systems(Update, (toggle_pause, restart_on_key));
    }
}
