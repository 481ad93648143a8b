//! Keyboard sampling. The fixed step reads the keyboard exactly once per tick into `PlayerInput`;
//! edges (pressed/released) are derived from the previous tick's held state rather than from
//! `just_pressed`, which belongs to the render frame and can be seen zero or several times by the
//! fixed schedule.

use bevy::input::keyboard::KeyCode;
use bevy::prelude::*;

use crate::state::GameSet;

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PlayerInput>()
            .add_systems(FixedUpdate, sample_keyboard.in_set(GameSet::Input));
    }
}

/// Logical actions the core understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Left,
    Right,
    Jump,
    Attack,
    CycleWeapon,
    Super,
}

impl Action {
    const ALL: [Action; 6] = [
        Action::Left,
        Action::Right,
        Action::Jump,
        Action::Attack,
        Action::CycleWeapon,
        Action::Super,
    ];

    fn keys(self) -> &'static [KeyCode] {
        match self {
            Action::Left => &[KeyCode::KeyA, KeyCode::ArrowLeft],
            Action::Right => &[KeyCode::KeyD, KeyCode::ArrowRight],
            Action::Jump => &[KeyCode::Space, KeyCode::ArrowUp, KeyCode::KeyW],
            Action::Attack => &[KeyCode::KeyJ, KeyCode::KeyZ],
            Action::CycleWeapon => &[KeyCode::KeyK, KeyCode::KeyX],
            Action::Super => &[KeyCode::KeyQ, KeyCode::KeyC],
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Snapshot of the logical actions for the current tick.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerInput {
    held: u8,
    previous: u8,
}

impl PlayerInput {
    /// Builds a snapshot from explicit held sets.
    #[cfg(test)]
    pub fn from_held(held: &[Action], previous: &[Action]) -> Self {
        let fold = |actions: &[Action]| actions.iter().fold(0u8, |acc, a| acc | a.bit());
        Self {
            held: fold(held),
            previous: fold(previous),
        }
    }

    /// Rolls the snapshot forward one tick with a new held set.
    pub fn advance(&mut self, held: u8) {
        self.previous = self.held;
        self.held = held;
    }

    pub fn held(&self, action: Action) -> bool {
        self.held & action.bit() != 0
    }

    pub fn pressed(&self, action: Action) -> bool {
        self.held(action) && self.previous & action.bit() == 0
    }

    pub fn released(&self, action: Action) -> bool {
        !self.held(action) && self.previous & action.bit() != 0
    }

    /// -1, 0 or +1 from the directional actions.
    pub fn axis(&self) -> f32 {
        let mut axis = 0.0;
        if self.held(Action::Left) {
            axis -= 1.0;
        }
        if self.held(Action::Right) {
            axis += 1.0;
        }
        axis
    }
}

fn sample_keyboard(keyboard: Res<ButtonInput<KeyCode>>, mut input: ResMut<PlayerInput>) {
    let held = Action::ALL
        .into_iter()
        .filter(|action| keyboard.any_pressed(action.keys().iter().copied()))
        .fold(0u8, |acc, action| acc | action.bit());
    input.advance(held);
}
