// Monthly leaderboard, rebuilt from match_player rows.

use std::collections::BTreeMap;

use spacetimedb::{ReducerContext, Table, Timestamp};

use crate::{leaderboard_entry, match_player, LeaderboardEntry, MatchPlayer};

/// Totals for one account over a month
#[derive(Debug, Clone, PartialEq)]
pub struct Tally {
    pub profile_id: String,
    pub display_name: String,
    pub points: f64,
    pub wins: u32,
    pub matches: u32,
}

/// Sum rows per account and sort: points desc, wins desc, account id asc.
/// Guest rows (no account) are skipped.
pub fn tally<'a>(rows: impl IntoIterator<Item = &'a MatchPlayer>) -> Vec<Tally> {
    // Per account: running totals and when the shown name was recorded
    let mut by_profile: BTreeMap<String, (Tally, Timestamp)> = BTreeMap::new();
    for row in rows {
        let Some(profile_id) = &row.profile_id else {
            continue;
        };
        let (entry, named_at) = by_profile.entry(profile_id.clone()).or_insert_with(|| {
            let tally = Tally {
                profile_id: profile_id.clone(),
                display_name: row.display_name.clone(),
                points: 0.0,
                wins: 0,
                matches: 0,
            };
            (tally, row.created_at)
        });
        entry.points += row.points_awarded;
        entry.matches += 1;
        if row.is_winner {
            entry.wins += 1;
        }
        // Index order is not time order; the newest row names the account
        if row.created_at > *named_at {
            entry.display_name = row.display_name.clone();
            *named_at = row.created_at;
        }
    }

    let mut tallies: Vec<Tally> = by_profile.into_values().map(|(t, _)| t).collect();
    tallies.sort_by(|a, b| {
        b.points
            .total_cmp(&a.points)
            .then(b.wins.cmp(&a.wins))
            .then_with(|| a.profile_id.cmp(&b.profile_id))
    });
    tallies
}

/// 1-based positions; tied rows (same points and wins) share one, the next skips ahead
pub fn positions(tallies: &[Tally]) -> Vec<u32> {
    let mut out = Vec::with_capacity(tallies.len());
    let mut position = 1;
    for (i, t) in tallies.iter().enumerate() {
        if i > 0 {
            let prev = &tallies[i - 1];
            if prev.points != t.points || prev.wins != t.wins {
                position = (i + 1) as u32;
            }
        }
        out.push(position);
    }
    out
}

/// Replace the month's leaderboard rows
pub fn refresh_leaderboard(ctx: &ReducerContext, month_key: &str) {
    let stale: Vec<u64> = ctx
        .db
        .leaderboard_entry()
        .month_key()
        .filter(month_key)
        .map(|e| e.id)
        .collect();
    for id in stale {
        ctx.db.leaderboard_entry().id().delete(&id);
    }

    let rows: Vec<MatchPlayer> = ctx.db.match_player().month_key().filter(month_key).collect();
    let tallies = tally(&rows);
    let positions = positions(&tallies);

    for (t, position) in tallies.iter().zip(positions) {
        ctx.db.leaderboard_entry().insert(LeaderboardEntry {
            id: 0, // auto_inc
            month_key: month_key.to_string(),
            position,
            profile_id: t.profile_id.clone(),
            display_name: t.display_name.clone(),
            points: t.points,
            wins: t.wins,
            matches: t.matches,
        });
    }

    log::debug!("[MATCH] leaderboard month={} entries={}", month_key, tallies.len());
}
