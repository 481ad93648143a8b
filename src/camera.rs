//! Camera follow. The camera leads the player slightly in the direction of travel, eases towards
//! that point and stays inside the level. The visible world rectangle is published as
//! `ViewBounds` so the simulation can bounce danmaku off the screen edges.

use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::level::LevelConfig;
use crate::player::{Player, PlayerState};
use crate::tile_grid::TileGrid;

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ViewBounds>()
            .add_systems(Startup, setup_camera)
            .add_systems(
                Update,
                (follow_player_camera.run_if(has_player_and_camera), publish_view_bounds).chain(),
            );
    }
}

/// Seconds of velocity added to the follow target.
const VELOCITY_BIAS: f32 = 0.25;
/// Farthest the follow target may lead the player, in world units.
const FOLLOW_MARGIN: f32 = 2.0;
const FOLLOW_SPEED: f32 = 6.0;

#[derive(Component)]
pub struct FollowCamera;

/// World rectangle currently on screen; `None` until the first frame has been laid out.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct ViewBounds(pub Option<Rect>);

fn setup_camera(mut commands: Commands, config: Res<LevelConfig>) {
    let mut camera = Camera2dBundle::default();
    camera.projection.scale = 1.0 / config.pixels_per_unit.max(1.0);
    commands.spawn((Name::new("MainCamera"), camera, FollowCamera));
}

fn has_player_and_camera(
    player_query: Query<Entity, With<Player>>,
    camera_query: Query<Entity, With<FollowCamera>>,
) -> bool {
    !player_query.is_empty() && !camera_query.is_empty()
}

/// Half of the visible world area for a window and projection scale.
fn half_view(window: &Window, projection: &OrthographicProjection) -> Vec2 {
    Vec2::new(window.resolution.width(), window.resolution.height()) * 0.5 * projection.scale
}

/// Clamps a camera centre so the view stays inside `bounds`; a level narrower than the view is
/// centred instead.
pub fn clamp_to_level(desired: Vec2, half: Vec2, bounds: Rect) -> Vec2 {
    let axis = |value: f32, min: f32, max: f32, half: f32| {
        if max - min > half * 2.0 {
            value.clamp(min + half, max - half)
        } else {
            (min + max) * 0.5
        }
    };
    Vec2::new(
        axis(desired.x, bounds.min.x, bounds.max.x, half.x),
        axis(desired.y, bounds.min.y, bounds.max.y, half.y),
    )
}

/// Follow target: player position led by velocity, never farther than the margin.
pub fn follow_target(position: Vec2, velocity: Vec2) -> Vec2 {
    position + (velocity * VELOCITY_BIAS).clamp_length_max(FOLLOW_MARGIN)
}

fn follow_player_camera(
    mut camera_query: Query<(&mut Transform, &OrthographicProjection), With<FollowCamera>>,
    player_query: Query<&PlayerState, With<Player>>,
    map: Res<TileGrid>,
    window_query: Query<&Window, With<PrimaryWindow>>,
    time: Res<Time>,
) {
    let Ok(player) = player_query.get_single() else {
        return;
    };
    let Ok((mut camera_transform, projection)) = camera_query.get_single_mut() else {
        return;
    };

    let mut desired = follow_target(player.position(), player.body.velocity.truncate());
    if let Ok(window) = window_query.get_single() {
        let level = map.world_bounds().as_rect();
        desired = clamp_to_level(desired, half_view(window, projection), level);
    }

    let lerp_t = 1.0 - f32::exp(-FOLLOW_SPEED * time.delta_seconds());
    let z = camera_transform.translation.z;
    camera_transform.translation = camera_transform
        .translation
        .lerp(desired.extend(z), lerp_t);
}

fn publish_view_bounds(
    camera_query: Query<(&Transform, &OrthographicProjection), With<FollowCamera>>,
    window_query: Query<&Window, With<PrimaryWindow>>,
    mut view: ResMut<ViewBounds>,
) {
    let (Ok((transform, projection)), Ok(window)) =
        (camera_query.get_single(), window_query.get_single())
    else {
        return;
    };
    let center = transform.translation.truncate();
    let half = half_view(window, projection);
    view.0 = Some(Rect::from_center_half_size(center, half));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_keeps_view_inside_level() {
        let level = Rect::new(-0.5, -0.5, 99.5, 19.5);
        let half = Vec2::new(13.0, 7.5);
        let c = clamp_to_level(Vec2::new(0.0, 0.0), half, level);
        assert_eq!(c, Vec2::new(12.5, 7.0));
        let c = clamp_to_level(Vec2::new(200.0, 30.0), half, level);
        assert_eq!(c, Vec2::new(86.5, 12.0));
    }

    #[test]
    fn narrow_level_is_centred() {
        let level = Rect::new(0.0, 0.0, 10.0, 5.0);
        let c = clamp_to_level(Vec2::new(3.0, 1.0), Vec2::new(13.0, 7.5), level);
        assert_eq!(c, Vec2::new(5.0, 2.5));
    }

    #[test]
    fn velocity_lead_is_capped() {
        assert_eq!(follow_target(Vec2::ZERO, Vec2::new(4.0, 0.0)), Vec2::new(1.0, 0.0));
        let led = follow_target(Vec2::ZERO, Vec2::new(100.0, 0.0));
        assert!((led.length() - FOLLOW_MARGIN).abs() < 1e-5);
    }
}
