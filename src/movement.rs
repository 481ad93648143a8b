//! Kinematic body stepping against the tile grid.
//!
//! Two resolvers live here and are deliberately kept apart:
//! - `resolve_move` probes the four corners of the body per axis and is what the player uses.
//! - `probe_foot_and_side` samples one foot point and two side points after integrating, which
//!   is cheaper and is what enemies use.

use bevy::prelude::*;

use crate::tile_grid::{CellIndex, TileGrid};

/// Logical tick length. Every timer in the simulation advances by this amount per step.
pub const FIXED_DT: f32 = 1.0 / 60.0;

/// Gap kept between a resolved body and the cell it was pushed out of.
const SKIN: f32 = 0.001;

/// How far below the feet the grounded check looks for support.
const GROUND_PROBE: f32 = 0.02;

/// Position, velocity and half-size of anything that moves through the grid. Velocity is in
/// world units per second; Z is carried along for the renderer but ignored by collision.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Body {
    pub position: Vec3,
    pub velocity: Vec3,
    pub half_extents: Vec2,
}

impl Body {
    pub fn new(position: Vec3, half_extents: Vec2) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            half_extents,
        }
    }

    pub fn center(&self) -> Vec2 {
        self.position.truncate()
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_center(self.center(), self.half_extents)
    }
}

/// Axis-aligned box in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn from_center(center: Vec2, half: Vec2) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Contacts {
    pub ceiling: bool,
    pub ground: bool,
    pub wall: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Corner {
    LeftBottom,
    RightBottom,
    LeftTop,
    RightTop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

fn corner_point(center: Vec2, half: Vec2, corner: Corner) -> Vec2 {
    match corner {
        Corner::LeftBottom => Vec2::new(center.x - half.x, center.y - half.y),
        Corner::RightBottom => Vec2::new(center.x + half.x, center.y - half.y),
        Corner::LeftTop => Vec2::new(center.x - half.x, center.y + half.y),
        Corner::RightTop => Vec2::new(center.x + half.x, center.y + half.y),
    }
}

/// Returns the solid cell a corner entered during the move. A corner already sitting in that
/// row/column before the move does not count, so resting against a boundary never clips.
fn entered_block(
    map: &TileGrid,
    from: Vec2,
    to: Vec2,
    half: Vec2,
    corners: [Corner; 2],
    axis: Axis,
) -> Option<CellIndex> {
    for corner in corners {
        let Some(after) = map.try_world_to_index(corner_point(to, half, corner)) else {
            continue;
        };
        if !map.is_block(after) {
            continue;
        }

        let before = map.world_to_index(corner_point(from, half, corner));
        let crossed = match axis {
            Axis::X => before.ix != after.ix,
            Axis::Y => before.iy != after.iy,
        };
        if crossed {
            return Some(after);
        }
    }
    None
}

fn resolve_vertical(
    map: &TileGrid,
    position: Vec2,
    half: Vec2,
    move_y: &mut f32,
    contacts: &mut Contacts,
) {
    let target = Vec2::new(position.x, position.y + *move_y);

    if *move_y > 0.0 {
        let corners = [Corner::LeftTop, Corner::RightTop];
        if let Some(cell) = entered_block(map, position, target, half, corners, Axis::Y) {
            let rect = map.index_to_world_rect(cell);
            *move_y = (rect.bottom - position.y - (half.y + SKIN)).max(0.0);
            contacts.ceiling = true;
        }
    } else if *move_y < 0.0 {
        let corners = [Corner::LeftBottom, Corner::RightBottom];
        if let Some(cell) = entered_block(map, position, target, half, corners, Axis::Y) {
            let rect = map.index_to_world_rect(cell);
            *move_y = (rect.top - position.y + (half.y + SKIN)).min(0.0);
            contacts.ground = true;
        }
    }
}

fn resolve_horizontal(
    map: &TileGrid,
    position: Vec2,
    half: Vec2,
    move_x: &mut f32,
    contacts: &mut Contacts,
) {
    let target = Vec2::new(position.x + *move_x, position.y);

    if *move_x > 0.0 {
        let corners = [Corner::RightBottom, Corner::RightTop];
        if let Some(cell) = entered_block(map, position, target, half, corners, Axis::X) {
            let rect = map.index_to_world_rect(cell);
            *move_x = (rect.left - position.x - (half.x + SKIN)).max(0.0);
            contacts.wall = true;
        }
    } else if *move_x < 0.0 {
        let corners = [Corner::LeftBottom, Corner::LeftTop];
        if let Some(cell) = entered_block(map, position, target, half, corners, Axis::X) {
            let rect = map.index_to_world_rect(cell);
            *move_x = (rect.right - position.x + (half.x + SKIN)).min(0.0);
            contacts.wall = true;
        }
    }
}

/// Clamps a proposed displacement so the body stops at the first solid cell on each axis.
/// The vertical axis is resolved first; the horizontal probe then starts from the corrected
/// height so that landing next to a wall never reads as a wall hit.
pub fn resolve_move(map: &TileGrid, position: Vec2, half: Vec2, proposed: Vec2) -> (Vec2, Contacts) {
    let mut contacts = Contacts::default();
    let mut corrected = proposed;

    resolve_vertical(map, position, half, &mut corrected.y, &mut contacts);
    let after_vertical = Vec2::new(position.x, position.y + corrected.y);
    resolve_horizontal(map, after_vertical, half, &mut corrected.x, &mut contacts);

    (corrected, contacts)
}

/// True when either bottom corner, nudged slightly downward, rests on a solid cell.
pub fn has_ground_support(map: &TileGrid, position: Vec2, half: Vec2) -> bool {
    let probe = Vec2::new(0.0, -GROUND_PROBE);
    [Corner::LeftBottom, Corner::RightBottom]
        .into_iter()
        .any(|corner| map.is_solid_at(corner_point(position, half, corner) + probe))
}

/// Integrates one tick with corner resolution and runs the grounded/airborne transitions.
/// Returns the contacts and the new grounded flag.
pub fn step_body(map: &TileGrid, body: &mut Body, grounded: bool, dt: f32) -> (Contacts, bool) {
    let proposed = body.velocity.truncate() * dt;
    let (corrected, contacts) = resolve_move(map, body.center(), body.half_extents, proposed);

    body.position.x += corrected.x;
    body.position.y += corrected.y;

    if contacts.ceiling && body.velocity.y > 0.0 {
        body.velocity.y = 0.0;
    }
    if contacts.wall {
        body.velocity.x = 0.0;
    }

    let grounded = if grounded {
        body.velocity.y <= 0.0 && has_ground_support(map, body.center(), body.half_extents)
    } else if contacts.ground {
        body.velocity.y = 0.0;
        true
    } else {
        false
    };

    (contacts, grounded)
}

/// Result of the enemy single-point probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeContacts {
    pub ground: bool,
    pub wall: bool,
}

/// Enemy collision: one point under the feet and two points ahead of the body at 35% of the
/// half height. Runs after the body has already been integrated. `drift_x` is horizontal speed
/// the body moved by this tick on top of its own velocity (knockback); the side probe looks
/// along the sum.
pub fn probe_foot_and_side(map: &TileGrid, body: &mut Body, drift_x: f32) -> ProbeContacts {
    let mut result = ProbeContacts::default();
    let half = body.half_extents;
    let pos = body.center();

    let foot = Vec2::new(pos.x, pos.y - (half.y + GROUND_PROBE));
    if body.velocity.y <= 0.0 {
        if let Some(cell) = map.try_world_to_index(foot).filter(|c| map.is_block(*c)) {
            let rect = map.index_to_world_rect(cell);
            body.position.y = rect.top + half.y + SKIN;
            body.velocity.y = 0.0;
            result.ground = true;
        }
    }

    let moved_x = body.velocity.x + drift_x;
    if moved_x.abs() > 1e-6 {
        let dir = moved_x.signum();
        let probe_x = pos.x + dir * (half.x + GROUND_PROBE);
        let hit = [half.y * 0.35, -half.y * 0.35]
            .into_iter()
            .filter_map(|dy| map.try_world_to_index(Vec2::new(probe_x, pos.y + dy)))
            .find(|cell| map.is_block(*cell));

        if let Some(cell) = hit {
            let rect = map.index_to_world_rect(cell);
            body.position.x = if dir > 0.0 {
                rect.left - half.x - SKIN
            } else {
                rect.right + half.x + SKIN
            };
            body.velocity.x = 0.0;
            result.wall = true;
        }
    }

    result
}
