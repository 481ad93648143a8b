//! Overlays and HUD. Pause, game over and stage clear each get a full-screen overlay spawned on
//! state entry; the HUD line in the corner mirrors the player's HP, weapon, stock and gauge.

use bevy::prelude::*;

use crate::player::{Player, PlayerState};
use crate::rhythm::Judgment;
use crate::state::GameState;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_hud)
            .add_systems(Update, update_hud)
            .add_systems(OnEnter(GameState::Paused), spawn_pause_menu)
            .add_systems(OnExit(GameState::Paused), despawn_overlays)
            .add_systems(OnEnter(GameState::GameOver), spawn_game_over)
            .add_systems(OnExit(GameState::GameOver), despawn_overlays)
            .add_systems(OnEnter(GameState::Cleared), spawn_cleared)
            .add_systems(OnExit(GameState::Cleared), despawn_overlays);
    }
}

#[derive(Component)]
struct Overlay;

#[derive(Component)]
struct HudText;

fn spawn_overlay(commands: &mut Commands, name: &'static str, text: &str, tint: Color) {
    commands
        .spawn((
            Overlay,
            Name::new(name),
            NodeBundle {
                background_color: BackgroundColor(tint),
                style: Style {
                    width: Val::Percent(100.0),
                    height: Val::Percent(100.0),
                    align_items: AlignItems::Center,
                    justify_content: JustifyContent::Center,
                    ..default()
                },
                ..default()
            },
        ))
        .with_children(|parent| {
            parent.spawn(
                TextBundle::from_section(
                    text,
                    TextStyle {
                        font_size: 36.0,
                        color: Color::srgba(0.9, 0.9, 0.9, 1.0),
                        ..default()
                    },
                )
                .with_text_justify(JustifyText::Center),
            );
        });
}

fn spawn_pause_menu(mut commands: Commands) {
    spawn_overlay(
        &mut commands,
        "PauseMenu",
        "Paused\nPress ESC to resume",
        Color::srgba(0.0, 0.0, 0.0, 0.6),
    );
}

fn spawn_game_over(mut commands: Commands) {
    spawn_overlay(
        &mut commands,
        "GameOver",
        "Game Over\nPress R to retry",
        Color::srgba(0.25, 0.0, 0.0, 0.7),
    );
}

fn spawn_cleared(mut commands: Commands) {
    spawn_overlay(
        &mut commands,
        "StageClear",
        "Stage Clear!\nPress R to play again",
        Color::srgba(0.05, 0.05, 0.2, 0.7),
    );
}

fn despawn_overlays(mut commands: Commands, query: Query<Entity, With<Overlay>>) {
    for entity in &query {
        commands.entity(entity).despawn_recursive();
    }
}

fn spawn_hud(mut commands: Commands) {
    commands.spawn((
        HudText,
        Name::new("Hud"),
        TextBundle::from_section(
            "",
            TextStyle {
                font_size: 22.0,
                color: Color::srgb(0.95, 0.95, 0.85),
                ..default()
            },
        )
        .with_style(Style {
            position_type: PositionType::Absolute,
            left: Val::Px(12.0),
            top: Val::Px(8.0),
            ..default()
        }),
    ));
}

fn judgment_label(judgment: Option<Judgment>) -> &'static str {
    match judgment {
        Some(Judgment::Perfect) => "PERFECT",
        Some(Judgment::Good) => "GOOD",
        Some(Judgment::Offbeat) => "OFFBEAT",
        None => "-",
    }
}

/// One-line HUD summary of the player's state.
pub fn hud_line(player: &PlayerState) -> String {
    format!(
        "HP {}   {}   Stock {}   SP {:>3.0}%   {}",
        player.hp,
        player.weapon.label(),
        player.stock,
        player.sp_gauge * 100.0,
        judgment_label(player.rhythm.last_judgment),
    )
}

fn update_hud(
    players: Query<&PlayerState, With<Player>>,
    mut hud: Query<&mut Text, With<HudText>>,
) {
    let Ok(mut text) = hud.get_single_mut() else {
        return;
    };
    let line = players.get_single().map(hud_line).unwrap_or_default();
    if let Some(section) = text.sections.first_mut() {
        if section.value != line {
            section.value = line;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlayerParams;

    #[test]
    fn hud_reports_player_state() {
        let mut player = PlayerState::new(Vec2::ZERO, &PlayerParams::default());
        player.stock = 2;
        player.sp_gauge = 0.5;
        player.rhythm.last_judgment = Some(Judgment::Perfect);
        let line = hud_line(&player);
        assert!(line.starts_with("HP 3"));
        assert!(line.contains("Rocket"));
        assert!(line.contains("Stock 2"));
        assert!(line.contains("50%"));
        assert!(line.contains("PERFECT"));
    }
}
