// Elimination ranking and Blitz payout split.

use std::cmp::Ordering;
use std::collections::BTreeMap;

/// One active participant's standing at a tick
#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    pub participant_id: u64,
    pub profile_id: String,
    /// Weighted grid progress as a whole percent
    pub percent: u32,
    /// Raw checked boxes
    pub boxes: u32,
}

/// Worst first: lowest progress, then fewest boxes, then profile id.
fn worst_first(a: &Standing, b: &Standing) -> Ordering {
    a.percent
        .cmp(&b.percent)
        .then(a.boxes.cmp(&b.boxes))
        .then_with(|| a.profile_id.cmp(&b.profile_id))
}

/// Victims per tick: two while more than `double_above` are active, else one.
/// Always leaves at least one survivor.
pub fn elimination_count(active: usize, double_above: usize) -> usize {
    let wanted = if active > double_above { 2 } else { 1 };
    wanted.min(active.saturating_sub(1))
}

/// Participants to eliminate this tick, worst first
pub fn pick_victims(mut standings: Vec<Standing>, double_above: usize) -> Vec<Standing> {
    let count = elimination_count(standings.len(), double_above);
    standings.sort_by(worst_first);
    standings.truncate(count);
    standings
}

/// Elimination waits until every active participant has played the same number of rounds
pub fn rounds_synchronized(rounds: &[u32]) -> bool {
    match (rounds.iter().min(), rounds.iter().max()) {
        (Some(min), Some(max)) => min == max,
        _ => true,
    }
}

/// Final placing of one participant
#[derive(Debug, Clone, PartialEq)]
pub struct Finisher {
    pub profile_id: String,
    /// None while still active
    pub eliminated_seq: Option<u32>,
}

/// Rank groups, best first: the survivors, then each elimination batch from the
/// latest back. Stops once `ranks` groups are formed.
pub fn payout_groups(finishers: &[Finisher], ranks: usize) -> Vec<Vec<String>> {
    let mut groups = Vec::new();

    let mut survivors: Vec<String> = finishers
        .iter()
        .filter(|f| f.eliminated_seq.is_none())
        .map(|f| f.profile_id.clone())
        .collect();
    if !survivors.is_empty() {
        survivors.sort();
        groups.push(survivors);
    }

    let mut batches: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    for f in finishers {
        if let Some(seq) = f.eliminated_seq {
            batches.entry(seq).or_default().push(f.profile_id.clone());
        }
    }
    for (_, mut batch) in batches.into_iter().rev() {
        if groups.len() >= ranks {
            break;
        }
        batch.sort();
        groups.push(batch);
    }

    groups.truncate(ranks);
    groups
}

/// Split the rank pools: each group takes the next rank and its members share
/// that rank's pool evenly.
pub fn distribute(groups: &[Vec<String>], rank_points: &[u32]) -> Vec<(String, f64)> {
    groups
        .iter()
        .zip(rank_points)
        .filter(|(group, _)| !group.is_empty())
        .flat_map(|(group, &pool)| {
            let share = pool as f64 / group.len() as f64;
            group.iter().map(move |id| (id.clone(), share))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standing(id: u64, profile: &str, percent: u32, boxes: u32) -> Standing {
        Standing { participant_id: id, profile_id: profile.to_string(), percent, boxes }
    }

    fn finisher(profile: &str, seq: Option<u32>) -> Finisher {
        Finisher { profile_id: profile.to_string(), eliminated_seq: seq }
    }

    #[test]
    fn test_elimination_count() {
        assert_eq!(elimination_count(12, 10), 2);
        assert_eq!(elimination_count(11, 10), 2);
        assert_eq!(elimination_count(10, 10), 1);
        assert_eq!(elimination_count(5, 10), 1);
        assert_eq!(elimination_count(2, 10), 1);
        assert_eq!(elimination_count(1, 10), 0);
        assert_eq!(elimination_count(0, 10), 0);
        // Low threshold still never empties the field
        assert_eq!(elimination_count(2, 0), 1);
    }

    #[test]
    fn test_twelve_lose_two() {
        let standings: Vec<Standing> = (1..=12)
            .map(|i| standing(i, &format!("p{:02}", i), 20 + i as u32, 10))
            .collect();
        let victims = pick_victims(standings, 10);
        let ids: Vec<u64> = victims.iter().map(|v| v.participant_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_five_lose_one() {
        let standings = vec![
            standing(1, "a", 40, 20),
            standing(2, "b", 12, 9),
            standing(3, "c", 35, 18),
            standing(4, "d", 50, 25),
            standing(5, "e", 44, 22),
        ];
        let victims = pick_victims(standings, 10);
        assert_eq!(victims.len(), 1);
        assert_eq!(victims[0].profile_id, "b");
    }

    #[test]
    fn test_tie_breaks() {
        // Same percent: fewer boxes goes first
        let victims = pick_victims(vec![standing(1, "a", 30, 15), standing(2, "b", 30, 14), standing(3, "c", 60, 30)], 10);
        assert_eq!(victims[0].profile_id, "b");

        // Full tie: lowest profile id goes first
        let victims = pick_victims(vec![standing(1, "zed", 30, 15), standing(2, "amy", 30, 15), standing(3, "c", 60, 30)], 10);
        assert_eq!(victims[0].profile_id, "amy");
    }

    #[test]
    fn test_rounds_barrier() {
        assert!(rounds_synchronized(&[3, 3, 3]));
        assert!(!rounds_synchronized(&[3, 4, 3]));
        assert!(rounds_synchronized(&[0]));
        assert!(rounds_synchronized(&[]));
    }

    #[test]
    fn test_groups_walk_batches_newest_first() {
        let finishers = vec![
            finisher("s", None),
            finisher("a", Some(1)),
            finisher("b", Some(1)),
            finisher("c", Some(1)),
            finisher("x", Some(2)),
            finisher("y", Some(3)),
            finisher("z", Some(3)),
        ];
        let groups = payout_groups(&finishers, 3);
        assert_eq!(groups, vec![vec!["s".to_string()], vec!["y".to_string(), "z".to_string()], vec!["x".to_string()]]);
    }

    #[test]
    fn test_payout_survivor_and_two_batches() {
        let finishers = vec![
            finisher("s", None),
            finisher("a", Some(1)),
            finisher("b", Some(1)),
            finisher("c", Some(1)),
            finisher("d", Some(2)),
            finisher("e", Some(2)),
        ];
        let groups = payout_groups(&finishers, 3);
        let payouts = distribute(&groups, &[10, 5, 3]);
        let expected = vec![
            ("s".to_string(), 10.0),
            ("d".to_string(), 2.5),
            ("e".to_string(), 2.5),
            ("a".to_string(), 1.0),
            ("b".to_string(), 1.0),
            ("c".to_string(), 1.0),
        ];
        assert_eq!(payouts, expected);
    }

    #[test]
    fn test_payout_without_survivors() {
        let finishers = vec![finisher("a", Some(1)), finisher("b", Some(2))];
        let payouts = distribute(&payout_groups(&finishers, 3), &[10, 5, 3]);
        assert_eq!(payouts, vec![("b".to_string(), 10.0), ("a".to_string(), 5.0)]);
    }

    #[test]
    fn test_payout_fewer_pools_than_groups() {
        let finishers = vec![finisher("s", None), finisher("a", Some(1))];
        let payouts = distribute(&payout_groups(&finishers, 1), &[7]);
        assert_eq!(payouts, vec![("s".to_string(), 7.0)]);
    }
}
