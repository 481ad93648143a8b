//! Application entry point: composes the Bevy runtime, core plugins, and window configuration.
//!
//! Everything game-specific is registered by `FireworksPlatformerPlugin` in `app.rs`; this file
//! only sets up the window and the default plugin group.

mod app;
mod boss;
mod bullets;
mod camera;
mod combat;
mod config;
mod enemy;
mod firework;
mod input;
mod level;
mod movement;
mod player;
mod render;
mod rhythm;
mod spawn;
mod state;
mod tile_grid;
mod ui;

use app::FireworksPlatformerPlugin;
use bevy::asset::AssetPlugin;
use bevy::prelude::*;
use bevy::window::{Window, WindowResizeConstraints, WindowResolution};

fn main() {
    // 1280x720 logical pixels at 48 pixels per tile shows roughly 26x15 tiles. Resizing keeps the
    // zoom and reveals more of the stage; the constraints stop it collapsing to nothing.
    let primary_window = Window {
        title: "Fireworks Platformer".to_string(),
        resolution: WindowResolution::new(1280.0, 720.0),
        resizable: true,
        resize_constraints: WindowResizeConstraints {
            min_width: 640.0,
            min_height: 360.0,
            max_width: f32::INFINITY,
            max_height: f32::INFINITY,
        },
        ..default()
    };

    let default_plugins = DefaultPlugins
        .set(WindowPlugin {
            primary_window: Some(primary_window),
            ..default()
        })
        .set(AssetPlugin {
            file_path: "assets".to_owned(),
            watch_for_changes_override: Some(true),
            ..default()
        });

    App::new()
        .insert_resource(ClearColor(Color::srgb(0.02, 0.02, 0.06)))
        .add_plugins(default_plugins)
        .add_plugins(FireworksPlatformerPlugin)
        .run();
}
