//! To-way disambiguation by turning angle.

use butterfly_common::geo::bearing_delta;
use tracing::warn;

use super::DirectionHint;

/// Angles closer than this share a group. Groups whose deviations from the
/// ideal are this close to the best one are reported as ties.
const ANGLE_TOLERANCE_DEG: f64 = 1.0;

/// Deviations closer than this are equal; the earlier group wins.
const SAME_DEVIATION_DEG: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub enum AngleChoice {
    /// Keep every candidate.
    All,
    /// Keep the candidates whose indices are listed.
    Group(Vec<usize>),
}

#[derive(Debug)]
struct AngleGroup {
    angle: f64,
    members: Vec<usize>,
}

fn group_angles(angles: &[f64]) -> Vec<AngleGroup> {
    let mut groups: Vec<AngleGroup> = Vec::new();
    for (i, &angle) in angles.iter().enumerate() {
        match groups
            .iter_mut()
            .find(|g| bearing_delta(g.angle, angle).abs() < ANGLE_TOLERANCE_DEG)
        {
            Some(group) => group.members.push(i),
            None => groups.push(AngleGroup {
                angle,
                members: vec![i],
            }),
        }
    }
    groups
}

/// Pairwise pick of the group closest to `ideal`; the earlier group wins an
/// exact tie. Returns the winner and how many groups lie within the angle
/// tolerance of it.
fn pick_group(groups: &[AngleGroup], ideal: f64) -> (usize, usize) {
    let deviation = |g: &AngleGroup| bearing_delta(ideal, g.angle).abs();
    let mut best = 0;
    for i in 1..groups.len() {
        if deviation(&groups[i]) < deviation(&groups[best]) - SAME_DEVIATION_DEG {
            best = i;
        }
    }
    let best_dev = deviation(&groups[best]);
    let tied = groups
        .iter()
        .filter(|g| (deviation(g) - best_dev).abs() <= ANGLE_TOLERANCE_DEG)
        .count();
    (best, tied)
}

/// Pick the candidates whose turning angle best matches `hint`.
///
/// `angles[i]` is the signed turn (positive right) from the incoming heading
/// to candidate `i`.
pub fn choose_group(angles: &[f64], hint: DirectionHint) -> AngleChoice {
    let Some(ideal) = hint.ideal_angle() else {
        return AngleChoice::All;
    };
    let mut groups = group_angles(angles);
    if groups.len() < 2 {
        return AngleChoice::All;
    }

    let (best, tied) = pick_group(&groups, ideal);
    if tied > 2 {
        warn!(
            tied,
            ?hint,
            angle = groups[best].angle,
            "more than two turn angle groups tie, keeping the closest"
        );
    }
    AngleChoice::Group(groups.swap_remove(best).members)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_right_hint_prefers_near_right_angle() {
        assert_eq!(
            choose_group(&[88.0, 170.0], DirectionHint::Right),
            AngleChoice::Group(vec![0])
        );
        assert_eq!(
            choose_group(&[170.0, 88.0], DirectionHint::Right),
            AngleChoice::Group(vec![1])
        );
    }

    #[test]
    fn test_closer_group_wins_within_a_degree() {
        assert_eq!(
            choose_group(&[91.9, 89.0], DirectionHint::Right),
            AngleChoice::Group(vec![1])
        );
        // a chain of near-equal deviations still ends at the minimum
        assert_eq!(
            choose_group(&[10.0, -9.5, 9.0], DirectionHint::Straight),
            AngleChoice::Group(vec![2])
        );
    }

    #[test]
    fn test_close_angles_form_one_group() {
        assert_eq!(
            choose_group(&[-89.6, 10.0, -90.2], DirectionHint::Left),
            AngleChoice::Group(vec![0, 2])
        );
        assert_eq!(choose_group(&[45.0, 45.5], DirectionHint::Straight), AngleChoice::All);
    }

    #[test]
    fn test_uturn_matches_both_signs() {
        assert_eq!(
            choose_group(&[30.0, -179.0], DirectionHint::UTurn),
            AngleChoice::Group(vec![1])
        );
        assert_eq!(
            choose_group(&[179.5, 30.0], DirectionHint::UTurn),
            AngleChoice::Group(vec![0])
        );
    }

    #[test]
    fn test_unknown_hint_keeps_everything() {
        assert_eq!(choose_group(&[0.0, 90.0], DirectionHint::Unknown), AngleChoice::All);
    }

    #[test]
    fn test_exact_tie_keeps_first_group() {
        assert_eq!(
            choose_group(&[-45.0, 45.0, -45.0], DirectionHint::Straight),
            AngleChoice::Group(vec![0, 2])
        );
        assert_eq!(
            choose_group(&[45.0, -45.0], DirectionHint::Straight),
            AngleChoice::Group(vec![0])
        );
    }

    #[test]
    fn test_three_groups_tie() {
        let groups = group_angles(&[89.5, -89.2, 88.5]);
        assert_eq!(groups.len(), 3);
        assert_eq!(pick_group(&groups, 0.0), (2, 3));
        assert_eq!(
            choose_group(&[89.5, -89.2, 88.5], DirectionHint::Straight),
            AngleChoice::Group(vec![2])
        );
    }
}
