//! Combat resolution, run once per tick after everything has moved.
//!
//! Pass order: body contact, player shots, enemy bullets, danmaku, pickups. Bursts triggered by
//! hits are queued during the shot pass and released after it, and SP earned from damage is
//! credited once at the end.

use bevy::prelude::*;

use crate::bullets::{DanmakuBullets, EnemyBullets};
use crate::config::Tuning;
use crate::enemy::{Enemy, EnemyKilled};
use crate::firework::{Fireworks, WeaponForm};
use crate::movement::Aabb;
use crate::player::{Player, PlayerState};
use crate::spawn::Pickups;
use crate::state::GameSet;

pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(FixedUpdate, resolve_combat.in_set(GameSet::Combat));
    }
}

/// Closest point of the box to the circle centre, then a squared distance test.
pub fn circle_hits_aabb(center: Vec2, radius: f32, aabb: &Aabb) -> bool {
    let closest = center.clamp(aabb.min, aabb.max);
    center.distance_squared(closest) <= radius * radius
}

fn push_dir(velocity_x: f32) -> f32 {
    if velocity_x.abs() > 1e-4 {
        velocity_x.signum()
    } else {
        0.0
    }
}

pub fn resolve_combat(
    tuning: Res<Tuning>,
    mut enemy_bullets: ResMut<EnemyBullets>,
    mut danmaku: ResMut<DanmakuBullets>,
    mut pickups: ResMut<Pickups>,
    mut players: Query<(&mut PlayerState, &mut Fireworks), With<Player>>,
    mut enemies: Query<(Entity, &mut Enemy)>,
    mut killed: EventWriter<EnemyKilled>,
) {
    let Ok((mut player, mut fireworks)) = players.get_single_mut() else {
        return;
    };
    let mut enemies: Vec<(Entity, Mut<Enemy>)> = enemies
        .iter_mut()
        .filter(|(_, enemy)| !enemy.is_dead())
        .collect();
    let mut report_kill = |enemy: &Enemy| {
        killed.send(EnemyKilled {
            position: enemy.position(),
            kind: enemy.kind,
            boss: enemy.is_boss(),
        });
    };

    // Body contact.
    for (_, enemy) in &enemies {
        if player.body.aabb().overlaps(&enemy.aabb()) {
            player.take_damage(tuning.spawn.contact_damage, enemy.position().x, &tuning.player);
        }
    }

    // Player shots.
    let mut damage_dealt = 0;
    let mut queued_bursts = Vec::new();
    fireworks.live.retain_mut(|shot| {
        for (entity, enemy) in enemies.iter_mut() {
            if enemy.is_dead() || shot.pierced.contains(entity) {
                continue;
            }
            if !circle_hits_aabb(shot.position, shot.radius, &enemy.aabb()) {
                continue;
            }

            damage_dealt += shot.damage.max(1);
            if enemy.apply_damage(shot.damage, push_dir(shot.velocity.x)) {
                report_kill(enemy);
            }

            match (shot.kind, shot.burst) {
                (WeaponForm::Pierce, _) => {
                    shot.pierced.push(*entity);
                    shot.life -= tuning.fireworks.pierce_life_cost;
                    if shot.life <= 0.0 {
                        return false;
                    }
                }
                (_, Some(spec)) => {
                    queued_bursts.push((shot.position, spec));
                    return false;
                }
                _ => return false,
            }
        }
        true
    });
    for (at, spec) in queued_bursts {
        fireworks.queue_burst(at, spec);
    }
    fireworks.flush_bursts();

    // Enemy bullets.
    let player_box = player.body.aabb();
    let mut hits_from = Vec::new();
    enemy_bullets.live.retain(|bullet| {
        let hit = circle_hits_aabb(bullet.position, bullet.radius, &player_box);
        if hit {
            hits_from.push(bullet.position.x);
        }
        !hit
    });
    for source_x in hits_from {
        player.take_damage(tuning.bullets.enemy_damage, source_x, &tuning.player);
    }

    // Danmaku.
    let mut danmaku_hits = 0;
    danmaku.live.retain(|bullet| {
        for (_, enemy) in enemies.iter_mut() {
            if enemy.is_dead() || !circle_hits_aabb(bullet.position, bullet.radius, &enemy.aabb()) {
                continue;
            }
            danmaku_hits += 1;
            if enemy.apply_damage(bullet.damage, push_dir(bullet.velocity.x)) {
                report_kill(enemy);
            }
            return false;
        }
        true
    });

    // Pickups.
    let player_box = player.body.aabb();
    let radius = tuning.spawn.pickup_radius;
    let before = pickups.items.len();
    pickups
        .items
        .retain(|item| !circle_hits_aabb(*item, radius, &player_box));
    for _ in pickups.items.len()..before {
        player.add_stock(tuning.spawn.max_stock);
    }

    let sp = damage_dealt as f32 * tuning.spawn.sp_gain_per_damage
        + danmaku_hits as f32 * tuning.spawn.sp_gain_danmaku_hit;
    player.add_sp(sp, tuning.spawn.max_stock);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enemy::EnemyKind;
    use crate::firework::Firework;

    #[test]
    fn circle_vs_box() {
        let aabb = Aabb::from_center(Vec2::ZERO, Vec2::splat(0.5));
        assert!(circle_hits_aabb(Vec2::ZERO, 0.1, &aabb));
        assert!(circle_hits_aabb(Vec2::new(0.7, 0.0), 0.2, &aabb));
        assert!(!circle_hits_aabb(Vec2::new(0.71, 0.0), 0.2, &aabb));
        // Corner: distance to (0.5, 0.5) is ~0.283.
        assert!(!circle_hits_aabb(Vec2::new(0.7, 0.7), 0.25, &aabb));
        assert!(circle_hits_aabb(Vec2::new(0.7, 0.7), 0.3, &aabb));
    }

    fn shot(kind: WeaponForm, position: Vec2) -> Firework {
        Firework {
            position,
            velocity: Vec2::new(10.0, 0.0),
            life: 1.0,
            radius: 0.3,
            kind,
            damage: 1,
            burst: None,
            pierced: Vec::new(),
        }
    }

    /// Headless app with the player far from two enemies standing at x = 10 and x = 10.5.
    fn combat_app(shots: Vec<Firework>) -> App {
        let tuning = Tuning::default();
        let mut app = App::new();
        app.insert_resource(tuning.clone())
            .init_resource::<EnemyBullets>()
            .init_resource::<DanmakuBullets>()
            .init_resource::<Pickups>()
            .add_event::<EnemyKilled>()
            .add_systems(Update, resolve_combat);

        let mut fireworks = Fireworks::default();
        fireworks.live = shots;
        app.world_mut().spawn((
            Player,
            PlayerState::new(Vec2::new(0.0, 2.0), &tuning.player),
            fireworks,
        ));
        for x in [10.0, 10.5] {
            app.world_mut().spawn(Enemy::standard(
                EnemyKind::Walker,
                Vec2::new(x, 2.0),
                &tuning.enemies.walker,
            ));
        }
        app
    }

    fn enemy_hp(app: &mut App) -> Vec<i32> {
        let world = app.world_mut();
        let mut hp: Vec<(f32, i32)> = world
            .query::<&Enemy>()
            .iter(world)
            .map(|e| (e.position().x, e.hp))
            .collect();
        hp.sort_by(|a, b| a.0.total_cmp(&b.0));
        hp.into_iter().map(|(_, hp)| hp).collect()
    }

    fn live_shots(app: &mut App) -> Vec<Firework> {
        let world = app.world_mut();
        world
            .query::<&Fireworks>()
            .single(world)
            .live
            .clone()
    }

    #[test]
    fn pierce_damages_both_enemies_and_survives() {
        let mut app = combat_app(vec![shot(WeaponForm::Pierce, Vec2::new(10.25, 2.0))]);
        app.update();

        assert_eq!(enemy_hp(&mut app), vec![4, 4]);
        let shots = live_shots(&mut app);
        assert_eq!(shots.len(), 1);
        assert!(shots[0].life < 1.0 && shots[0].life > 0.0);
        assert_eq!(shots[0].pierced.len(), 2);

        // Already pierced enemies are not hit again.
        app.update();
        assert_eq!(enemy_hp(&mut app), vec![4, 4]);
    }

    #[test]
    fn rocket_stops_at_first_enemy() {
        let mut app = combat_app(vec![shot(WeaponForm::Rocket, Vec2::new(10.25, 2.0))]);
        app.update();

        let hp = enemy_hp(&mut app);
        assert_eq!(hp.iter().filter(|&&hp| hp == 4).count(), 1);
        assert!(live_shots(&mut app).is_empty());
    }

    #[test]
    fn burst_hit_releases_children() {
        let tuning = Tuning::default();
        let mut burst = shot(WeaponForm::Burst, Vec2::new(10.0, 2.0));
        burst.burst = Some(crate::firework::BurstSpec {
            count: 8,
            speed: 6.0,
            life: 0.35,
            radius: 0.2,
            damage: 1,
        });
        let mut app = combat_app(vec![burst]);
        app.update();

        let shots = live_shots(&mut app);
        assert_eq!(shots.len(), tuning.fireworks.burst_children.count as usize);
        assert!(shots.iter().all(|s| s.burst.is_none()));
    }

    #[test]
    fn lethal_hit_reports_kill_and_fills_sp() {
        let mut strong = shot(WeaponForm::Rocket, Vec2::new(10.0, 2.0));
        strong.damage = 10;
        let mut app = combat_app(vec![strong]);
        app.update();

        let events = app.world().resource::<Events<EnemyKilled>>();
        let mut reader = events.get_reader();
        let kills: Vec<_> = reader.read(events).collect();
        assert_eq!(kills.len(), 1);
        assert!(!kills[0].boss);

        let world = app.world_mut();
        let player = world.query::<&PlayerState>().single(world);
        assert!(player.sp_gauge > 0.0);
    }

    #[test]
    fn enemy_bullet_hurts_player_once_then_vanishes() {
        let mut app = combat_app(Vec::new());
        app.world_mut()
            .resource_mut::<EnemyBullets>()
            .live
            .push(crate::bullets::EnemyBullet {
                position: Vec2::new(0.3, 2.0),
                velocity: Vec2::new(-5.0, 0.0),
                radius: 0.2,
                life: 1.0,
            });
        app.update();

        assert!(app.world().resource::<EnemyBullets>().live.is_empty());
        let world = app.world_mut();
        let player = world.query::<&PlayerState>().single(world);
        assert_eq!(player.hp, 2);
        assert!(player.invincible > 0.0);
    }

    #[test]
    fn body_contact_hurts_and_pushes_player_away() {
        let tuning = Tuning::default();
        let mut app = combat_app(Vec::new());
        app.world_mut().spawn(Enemy::standard(
            EnemyKind::Walker,
            Vec2::new(0.5, 2.0),
            &tuning.enemies.walker,
        ));
        app.update();

        let world = app.world_mut();
        let player = world.query::<&PlayerState>().single(world);
        assert_eq!(player.hp, tuning.player.max_hp - tuning.spawn.contact_damage);
        assert!(player.body.velocity.x < 0.0);
        assert!(player.invincible > 0.0);
    }

    #[test]
    fn danmaku_hits_one_enemy_and_feeds_sp() {
        let tuning = Tuning::default();
        let mut app = combat_app(Vec::new());
        app.world_mut()
            .resource_mut::<DanmakuBullets>()
            .live
            .push(crate::bullets::DanmakuBullet {
                position: Vec2::new(10.25, 2.0),
                velocity: Vec2::new(5.0, 0.0),
                radius: 0.2,
                life: 1.0,
                bounces_left: 3,
                damage: tuning.bullets.danmaku_damage,
            });
        app.update();

        let hp = enemy_hp(&mut app);
        let full = tuning.enemies.walker.hp;
        assert_eq!(hp.iter().filter(|&&hp| hp == full).count(), 1);
        assert_eq!(
            hp.iter()
                .filter(|&&hp| hp == full - tuning.bullets.danmaku_damage)
                .count(),
            1
        );
        assert!(app.world().resource::<DanmakuBullets>().live.is_empty());

        let world = app.world_mut();
        let player = world.query::<&PlayerState>().single(world);
        assert!((player.sp_gauge - tuning.spawn.sp_gain_danmaku_hit).abs() < 1e-6);
    }

    #[test]
    fn touching_a_pickup_adds_stock() {
        let mut app = combat_app(Vec::new());
        app.world_mut()
            .resource_mut::<Pickups>()
            .items
            .extend([Vec2::new(0.2, 2.0), Vec2::new(8.0, 2.0)]);
        app.update();

        assert_eq!(app.world().resource::<Pickups>().items.len(), 1);
        let world = app.world_mut();
        let player = world.query::<&PlayerState>().single(world);
        assert_eq!(player.stock, 1);
    }
}
