//! Player projectiles. Three weapon forms share one struct; a Burst carries the parameters of
//! the radial child burst it releases when it hits a wall, hits an enemy or runs out of life.
//!
//! Child bursts are never spawned while the live list is being walked. They are queued and
//! flushed once the walk is over.

use bevy::prelude::*;

use crate::config::{FireworkParams, RhythmParams, ShotParams};
use crate::rhythm::Judgment;
use crate::tile_grid::TileGrid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WeaponForm {
    #[default]
    Rocket,
    Burst,
    Pierce,
}

impl WeaponForm {
    pub fn next(self) -> Self {
        match self {
            WeaponForm::Rocket => WeaponForm::Burst,
            WeaponForm::Burst => WeaponForm::Pierce,
            WeaponForm::Pierce => WeaponForm::Rocket,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WeaponForm::Rocket => "Rocket",
            WeaponForm::Burst => "Burst",
            WeaponForm::Pierce => "Pierce",
        }
    }
}

/// Deferred child burst parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurstSpec {
    pub count: u32,
    pub speed: f32,
    pub life: f32,
    pub radius: f32,
    pub damage: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Firework {
    pub position: Vec2,
    pub velocity: Vec2,
    pub life: f32,
    pub radius: f32,
    pub kind: WeaponForm,
    pub damage: i32,
    pub burst: Option<BurstSpec>,
    /// Enemies a pierce shot has already passed through.
    pub pierced: Vec<Entity>,
}

impl Firework {
    fn from_shot(
        kind: WeaponForm,
        shot: &ShotParams,
        judgment: Judgment,
        rhythm: &RhythmParams,
        origin: Vec2,
        direction: Vec2,
    ) -> Self {
        let scale = judgment.scale(rhythm);
        Self {
            position: origin,
            velocity: direction * shot.speed * scale.speed,
            life: shot.life * scale.life,
            radius: shot.radius * scale.radius,
            kind,
            damage: ((shot.damage * scale.damage).round() as i32).max(1),
            burst: None,
            pierced: Vec::new(),
        }
    }
}

/// The player's live projectiles plus bursts waiting to be released.
#[derive(Component, Debug, Default)]
pub struct Fireworks {
    pub live: Vec<Firework>,
    pending_bursts: Vec<(Vec2, BurstSpec)>,
}

impl Fireworks {
    /// Spawns one shot of `form` graded by `judgment`. A zero direction falls back to +X.
    pub fn fire(
        &mut self,
        form: WeaponForm,
        judgment: Judgment,
        origin: Vec2,
        direction: Vec2,
        params: &FireworkParams,
        rhythm: &RhythmParams,
    ) {
        let direction = direction.try_normalize().unwrap_or(Vec2::X);
        let shot = match form {
            WeaponForm::Rocket => {
                Firework::from_shot(form, &params.rocket, judgment, rhythm, origin, direction)
            }
            WeaponForm::Burst => {
                let mut shot =
                    Firework::from_shot(form, &params.burst, judgment, rhythm, origin, direction);
                let scale = judgment.scale(rhythm);
                let children = &params.burst_children;
                shot.burst = Some(BurstSpec {
                    count: children.count,
                    speed: children.speed * scale.speed,
                    life: children.life * scale.life,
                    radius: children.radius * scale.radius,
                    damage: shot.damage,
                });
                shot
            }
            WeaponForm::Pierce => {
                Firework::from_shot(form, &params.pierce, judgment, rhythm, origin, direction)
            }
        };
        self.live.push(shot);
    }

    pub fn queue_burst(&mut self, at: Vec2, spec: BurstSpec) {
        self.pending_bursts.push((at, spec));
    }

    #[cfg(test)]
    pub fn pending_bursts(&self) -> usize {
        self.pending_bursts.len()
    }

    /// Moves every shot one tick, culls those that hit a wall, left the map or expired, then
    /// releases queued bursts.
    pub fn update(&mut self, map: &TileGrid, margin: f32, dt: f32) {
        let bounds = map.world_bounds().expanded(margin);
        let mut queued = std::mem::take(&mut self.pending_bursts);

        self.live.retain_mut(|shot| {
            let previous = shot.position;
            shot.position += shot.velocity * dt;

            if map.is_solid_at(shot.position) {
                if let Some(spec) = shot.burst {
                    queued.push((previous, spec));
                }
                return false;
            }

            if !bounds.contains(shot.position) {
                return false;
            }

            shot.life -= dt;
            if shot.life <= 0.0 {
                if let Some(spec) = shot.burst {
                    queued.push((shot.position, spec));
                }
                return false;
            }
            true
        });

        self.pending_bursts = queued;
        self.flush_bursts();
    }

    /// Turns queued bursts into radial children. Children never burst again.
    pub fn flush_bursts(&mut self) {
        for (center, spec) in self.pending_bursts.drain(..) {
            let count = spec.count.max(1);
            for i in 0..count {
                let angle = std::f32::consts::TAU * i as f32 / count as f32;
                let direction = Vec2::new(angle.cos(), angle.sin());
                self.live.push(Firework {
                    position: center,
                    velocity: direction * spec.speed,
                    life: spec.life,
                    radius: spec.radius,
                    kind: WeaponForm::Burst,
                    damage: spec.damage,
                    burst: None,
                    pierced: Vec::new(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::FIXED_DT;

    fn open_map() -> TileGrid {
        TileGrid::empty(20, 10, 1.0)
    }

    fn walled_map() -> TileGrid {
        let row: Vec<&str> = (0..20).map(|ix| if ix == 8 { "1" } else { "0" }).collect();
        let rows = vec![row.join(","); 10];
        TileGrid::from_csv(20, 10, 1.0, &rows.join("\n"), "")
    }

    #[test]
    fn judgment_scales_shot_stats() {
        let params = FireworkParams::default();
        let rhythm = RhythmParams::default();
        for form in [WeaponForm::Rocket, WeaponForm::Burst, WeaponForm::Pierce] {
            let mut fw = Fireworks::default();
            for judgment in [Judgment::Perfect, Judgment::Good, Judgment::Offbeat] {
                fw.fire(form, judgment, Vec2::ZERO, Vec2::X, &params, &rhythm);
            }
            let [perfect, good, offbeat] = [&fw.live[0], &fw.live[1], &fw.live[2]];
            assert!(perfect.velocity.x > good.velocity.x && good.velocity.x > offbeat.velocity.x);
            assert!(perfect.life > good.life && good.life > offbeat.life);
            assert!(perfect.radius > good.radius && good.radius > offbeat.radius);
            assert!(
                perfect.damage > good.damage && good.damage > offbeat.damage,
                "{form:?} damage tiers collapse"
            );
            assert!(offbeat.damage >= 1);
        }
    }

    #[test]
    fn zero_direction_falls_back() {
        let mut fw = Fireworks::default();
        fw.fire(
            WeaponForm::Pierce,
            Judgment::Good,
            Vec2::ZERO,
            Vec2::ZERO,
            &FireworkParams::default(),
            &RhythmParams::default(),
        );
        assert!(fw.live[0].velocity.x > 0.0);
    }

    #[test]
    fn shots_expire() {
        let map = open_map();
        let mut fw = Fireworks::default();
        fw.fire(
            WeaponForm::Rocket,
            Judgment::Offbeat,
            Vec2::new(2.0, 5.0),
            Vec2::Y * 0.01,
            &FireworkParams::default(),
            &RhythmParams::default(),
        );
        for _ in 0..120 {
            fw.update(&map, 2.0, FIXED_DT);
        }
        assert!(fw.live.is_empty());
    }

    #[test]
    fn rocket_dies_on_wall() {
        let map = walled_map();
        let mut fw = Fireworks::default();
        fw.fire(
            WeaponForm::Rocket,
            Judgment::Perfect,
            Vec2::new(6.0, 5.0),
            Vec2::X,
            &FireworkParams::default(),
            &RhythmParams::default(),
        );
        for _ in 0..30 {
            fw.update(&map, 2.0, FIXED_DT);
        }
        assert!(fw.live.is_empty());
    }

    #[test]
    fn burst_releases_children_at_wall() {
        let map = walled_map();
        let params = FireworkParams::default();
        let mut fw = Fireworks::default();
        fw.fire(
            WeaponForm::Burst,
            Judgment::Good,
            Vec2::new(6.8, 5.0),
            Vec2::X,
            &params,
            &RhythmParams::default(),
        );

        let mut ticks = 0;
        while fw.live.len() == 1 && ticks < 30 {
            fw.update(&map, 2.0, FIXED_DT);
            ticks += 1;
        }
        assert_eq!(fw.live.len(), params.burst_children.count as usize);
        assert!(fw.live.iter().all(|c| c.burst.is_none()));
        assert!(fw.live.iter().all(|c| c.position.x < 7.5));
        assert_eq!(fw.pending_bursts(), 0);
    }

    #[test]
    fn shots_leaving_the_map_are_culled() {
        let map = open_map();
        let mut fw = Fireworks::default();
        fw.live.push(Firework {
            position: Vec2::new(-2.4, 5.0),
            velocity: Vec2::new(-60.0, 0.0),
            life: 10.0,
            radius: 0.2,
            kind: WeaponForm::Rocket,
            damage: 1,
            burst: None,
            pierced: Vec::new(),
        });
        fw.update(&map, 2.0, FIXED_DT);
        assert!(fw.live.is_empty());
    }
}
