// Match finalization: payouts for a finished casual game.

use spacetimedb::{ReducerContext, SpacetimeType, Table, Timestamp};

use crate::clock;
use crate::config::{GameConfig, GuestPoints};
use crate::leaderboard::refresh_leaderboard;
use crate::{game_match, match_player, GameMatch, MatchPlayer, RoomState};

/// A player in the turn order when the game started
#[derive(SpacetimeType, Debug, Clone, PartialEq)]
pub struct Entrant {
    pub player_id: u64,
    pub name: String,
    pub profile_id: Option<String>,
}

/// Pool shared by the winners: 1 point, plus half a point per player beyond two
pub fn total_points(total_players: usize) -> f64 {
    (1.0 + 0.5 * total_players.saturating_sub(2) as f64).max(1.0)
}

pub fn round_up_to_half(value: f64) -> f64 {
    (value * 2.0).ceil() / 2.0
}

/// +1 for finishing within 37 rounds, +1 more within 33
pub fn speed_bonus(rounds: u32) -> f64 {
    let mut bonus = 0.0;
    if rounds <= 37 {
        bonus += 1.0;
    }
    if rounds <= 33 {
        bonus += 1.0;
    }
    bonus
}

#[derive(Debug, Clone, PartialEq)]
pub struct Payout {
    pub entrant: Entrant,
    pub is_winner: bool,
    pub rounds: u32,
    pub points: f64,
}

/// One payout per entrant. Non-winners get 0; with `AccountsOnly`, so do guests.
pub fn match_payouts(
    entrants: &[Entrant],
    winner_ids: &[u64],
    rounds_of: impl Fn(u64) -> u32,
    policy: GuestPoints,
) -> Vec<Payout> {
    let winner_count = entrants.iter().filter(|e| winner_ids.contains(&e.player_id)).count();
    let per_winner = if winner_count > 0 {
        round_up_to_half(total_points(entrants.len()) / winner_count as f64)
    } else {
        0.0
    };

    entrants
        .iter()
        .map(|entrant| {
            let is_winner = winner_ids.contains(&entrant.player_id);
            let rounds = rounds_of(entrant.player_id);
            let eligible = entrant.profile_id.is_some() || policy == GuestPoints::Everyone;
            let points = if is_winner && eligible { per_winner + speed_bonus(rounds) } else { 0.0 };
            Payout { entrant: entrant.clone(), is_winner, rounds, points }
        })
        .collect()
}

/// Write the match record and reset the room. A room whose current game was
/// already recorded is left alone. Returns the new match id.
/// Whether a room's game still needs its match record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeDecision {
    Record,
    AlreadyRecorded(u64),
}

/// `match_id` is cleared only by a new start, so repeats see the first record
pub fn finalize_decision(match_id: Option<u64>) -> FinalizeDecision {
    match match_id {
        Some(existing) => FinalizeDecision::AlreadyRecorded(existing),
        None => FinalizeDecision::Record,
    }
}

/// Tie the room to its record and send it back to the lobby
pub fn close_match(state: &mut RoomState, match_id: u64, now: Timestamp) {
    state.match_id = Some(match_id);
    state.finalized_at = Some(now);
    state.reset_unstarted(now);
}

pub fn finalize_match(ctx: &ReducerContext, state: &mut RoomState, config: &GameConfig) -> Option<u64> {
    if let FinalizeDecision::AlreadyRecorded(existing) = finalize_decision(state.match_id) {
        log::debug!("[MATCH] room_id={} already finalized as match_id={}", state.room_id, existing);
        return None;
    }
    if state.entrants.is_empty() {
        log::error!("[MATCH] room_id={} finished without entrants", state.room_id);
    }

    let payouts = match_payouts(
        &state.entrants,
        &state.finish_winner_ids,
        |id| state.rounds_for(id),
        config.guest_points,
    );
    let month_key = clock::month_key(ctx.timestamp, config);
    let winner_count = payouts.iter().filter(|p| p.is_winner).count() as u32;

    let record = ctx.db.game_match().insert(GameMatch {
        id: 0, // auto_inc
        room_id: state.room_id,
        ended_at: ctx.timestamp,
        month_key: month_key.clone(),
        total_players: payouts.len() as u32,
        winner_count,
    });

    for payout in &payouts {
        ctx.db.match_player().insert(MatchPlayer {
            id: 0, // auto_inc
            match_id: Some(record.id),
            blitz_event_id: None,
            room_id: state.room_id,
            player_id: Some(payout.entrant.player_id),
            profile_id: payout.entrant.profile_id.clone(),
            display_name: payout.entrant.name.clone(),
            is_winner: payout.is_winner,
            rounds: Some(payout.rounds),
            points_awarded: payout.points,
            month_key: month_key.clone(),
            created_at: ctx.timestamp,
        });
    }

    log::info!(
        "[MATCH] finalized match_id={} room_id={} players={} winners={} month={}",
        record.id,
        state.room_id,
        payouts.len(),
        winner_count,
        month_key
    );

    close_match(state, record.id, ctx.timestamp);

    refresh_leaderboard(ctx, &month_key);
    Some(record.id)
}
