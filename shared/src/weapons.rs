//! Blast damage resolution: graduated falloff tiers, kill/score accounting,
//! and the explosion event fan-out list. Generalizes the teacher's melee
//! `HitZone` falloff (`shared/src/weapons/damage.rs`) from a 1D hit-zone
//! table to a 3D distance-to-blast-radius table.

use std::collections::HashMap;

use crate::geometry::distance3d;
use crate::ids::{SubId, UserId};
use crate::world::Submarine;

/// Damage dealt at a given distance from the detonation point, in the
/// source's four graduated tiers. Distances beyond `blast_radius` take no
/// damage at all.
pub fn blast_damage_at(dist: f64, blast_radius: f64) -> f64 {
    if dist <= 60.0 {
        100.0
    } else if dist <= 80.0 {
        75.0
    } else if dist <= 100.0 {
        50.0
    } else if dist <= blast_radius {
        25.0
    } else {
        0.0
    }
}

pub struct SubDamage {
    pub sub_id: SubId,
    pub damage: f64,
    pub killed: bool,
}

pub struct DetonationOutcome {
    /// Every sub inside the blast radius, win or lose health, for the
    /// `explosion` event fan-out (every affected sub's owner is notified,
    /// not just the one that died).
    pub affected: Vec<SubDamage>,
    /// The sub (if any) whose kill/score should be credited: the torpedo
    /// owner's first living sub at the time of detonation.
    pub credited_sub: Option<SubId>,
}

/// Resolve one torpedo detonation against the current submarine set.
/// `blast_radius` is the effective radius; tiers inside it follow
/// `blast_damage_at`. Mutates `subs` in place and returns the event payload.
pub fn resolve_detonation(
    subs: &mut HashMap<SubId, Submarine>,
    detonation: (f64, f64, f64),
    blast_radius: f64,
    torpedo_owner: UserId,
    now: f64,
) -> DetonationOutcome {
    let mut affected = Vec::new();

    for sub in subs.values_mut() {
        if !sub.alive {
            continue;
        }
        let d = distance3d(sub.x, sub.y, sub.depth, detonation.0, detonation.1, detonation.2);
        let dmg = blast_damage_at(d, blast_radius);
        if dmg <= 0.0 {
            continue;
        }
        sub.health = (sub.health - dmg).max(0.0);
        let killed = sub.health <= 0.0;
        if killed {
            sub.alive = false;
            sub.died_at = Some(now);
        }
        affected.push(SubDamage {
            sub_id: sub.id,
            damage: dmg,
            killed,
        });
    }

    let credited_sub = subs
        .values()
        .filter(|s| s.owner == torpedo_owner && s.alive)
        .map(|s| s.id)
        .next();

    if let Some(kill) = affected.iter().find(|a| a.killed) {
        let _ = kill;
        if let Some(credited) = credited_sub {
            if let Some(sub) = subs.get_mut(&credited) {
                sub.kills += 1;
                sub.score += 100;
            }
        }
    }

    DetonationOutcome {
        affected,
        credited_sub,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blast_damage_tiers_are_graduated() {
        assert_eq!(blast_damage_at(0.0, 60.0), 100.0);
        assert_eq!(blast_damage_at(60.0, 60.0), 100.0);
        assert_eq!(blast_damage_at(70.0, 80.0), 75.0);
        assert_eq!(blast_damage_at(90.0, 100.0), 50.0);
        assert_eq!(blast_damage_at(59.0, 60.0), 100.0);
    }

    #[test]
    fn beyond_blast_radius_takes_no_damage() {
        assert_eq!(blast_damage_at(61.0, 60.0), 0.0);
        assert_eq!(blast_damage_at(150.0, 60.0), 0.0);
    }

    #[test]
    fn tier_boundaries_use_inclusive_upper_bound() {
        assert_eq!(blast_damage_at(80.0, 120.0), 75.0);
        assert_eq!(blast_damage_at(100.0, 120.0), 50.0);
        assert_eq!(blast_damage_at(120.0, 120.0), 25.0);
    }
}
