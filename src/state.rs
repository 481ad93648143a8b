//! Game state machine and the system sets that order one simulation tick.

use bevy::input::keyboard::KeyCode;
use bevy::prelude::*;

use crate::enemy::EnemyKilled;
use crate::player::{Player, PlayerState};

/// High-level state machine for the game loop.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, States)]
pub enum GameState {
    #[default]
    Loading,
    Playing,
    Paused,
    GameOver,
    Cleared,
}

/// Stages of one fixed tick, chained in this order while `Playing`.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum GameSet {
    Input,
    Spawn,
    Movement,
    Combat,
    Effects,
}

/// Toggles between Playing and Paused when `ESC` is pressed.
pub fn toggle_pause(
    keyboard: Res<ButtonInput<KeyCode>>,
    state: Res<State<GameState>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if !keyboard.just_pressed(KeyCode::Escape) {
        return;
    }

    match state.get() {
        GameState::Playing => next_state.set(GameState::Paused),
        GameState::Paused => next_state.set(GameState::Playing),
        GameState::Loading | GameState::GameOver | GameState::Cleared => {}
    }
}

/// `R` on a result screen reloads the stage.
pub fn restart_on_key(
    keyboard: Res<ButtonInput<KeyCode>>,
    state: Res<State<GameState>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if keyboard.just_pressed(KeyCode::KeyR)
        && matches!(state.get(), GameState::GameOver | GameState::Cleared)
    {
        next_state.set(GameState::Loading);
    }
}

/// Ends the run when the player dies or the boss falls.
pub fn watch_outcome(
    players: Query<&PlayerState, With<Player>>,
    mut killed: EventReader<EnemyKilled>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if killed.read().any(|kill| kill.boss) {
        info!("Boss defeated; stage cleared.");
        next_state.set(GameState::Cleared);
        return;
    }
    if players.get_single().is_ok_and(|player| player.dead) {
        info!("Player down; game over.");
        next_state.set(GameState::GameOver);
    }
}
