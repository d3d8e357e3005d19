// Turn state machine: per-player dice turns and per-room rotation.
//
// Everything here is pure. Reducers load the rows, call into these methods,
// and write the rows back; an Err leaves the rows untouched.

use spacetimedb::{SpacetimeType, Timestamp};
use thiserror::Error;

use crate::dice::{self, Dice, Locks, DICE_COUNT};
use crate::finalize::Entrant;
use crate::grid::{Grid, BOXES_PER_ROW, ROWS};
use crate::RoomState;

/// Phase of the acting player's turn segment
#[derive(SpacetimeType, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// Nothing rolled yet; only a roll is legal
    Idle,
    /// Dice rolled, target not yet fixed
    Choosing,
    /// Last roll gained something; roll again
    Running,
    /// Last roll gained nothing (or nothing was selectable); end the round
    Stopped,
}

/// Refusals. No state is mutated when one of these is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TurnError {
    #[error("game has not started")]
    NotStarted,

    #[error("it is not your turn")]
    NotYourTurn,

    #[error("cannot {action} while {phase:?}")]
    IllegalInPhase { action: &'static str, phase: TurnPhase },

    #[error("choose a target before rolling")]
    TargetRequired,

    #[error("target {0} is outside 1-12")]
    TargetOutOfRange(u8),

    #[error("row {0} is already complete")]
    RowComplete(u8),

    #[error("target {0} matches none of the dice")]
    NoGain(u8),
}

/// Dice state of one player's current turn segment
#[derive(SpacetimeType, Debug, Clone, PartialEq)]
pub struct DiceTurn {
    pub phase: TurnPhase,
    /// Last six values rolled
    pub dice: Vec<u8>,
    /// Dice kept toward the target
    pub locked: Vec<bool>,
    /// Lock set shown while choosing; becomes real on the first roll
    pub preview: Vec<bool>,
    /// Chosen target (row), fixed from the first roll after choosing
    pub target: Option<u8>,
    /// Gain of the most recent roll
    pub last_gain: u8,
}

impl Default for DiceTurn {
    fn default() -> Self {
        DiceTurn {
            phase: TurnPhase::Idle,
            dice: vec![1; DICE_COUNT],
            locked: vec![false; DICE_COUNT],
            preview: vec![false; DICE_COUNT],
            target: None,
            last_gain: 0,
        }
    }
}

/// What a roll did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollOutcome {
    /// Newly matched singles/pairs on this roll
    pub gain: u8,
    /// Boxes checked on the grid
    pub applied: u8,
    /// Row filled or all dice locked; the segment reset to Idle
    pub segment_complete: bool,
    pub phase: TurnPhase,
}

/// Targets the player may choose: some gain against the dice, row not complete
pub fn available_targets(dice: &Dice, grid: &Grid) -> Vec<u8> {
    (1..=ROWS)
        .filter(|&t| !grid.is_row_complete(t) && dice::gain_for(dice, t) > 0)
        .collect()
}

impl DiceTurn {
    fn dice(&self) -> Dice {
        dice::dice_from_slice(&self.dice)
    }

    fn locked(&self) -> Locks {
        dice::locks_from_slice(&self.locked)
    }

    fn preview(&self) -> Locks {
        dice::locks_from_slice(&self.preview)
    }

    /// Back to Idle, keeping the last dice on display
    fn reset_segment(&mut self) {
        self.phase = TurnPhase::Idle;
        self.locked = vec![false; DICE_COUNT];
        self.preview = vec![false; DICE_COUNT];
        self.target = None;
        self.last_gain = 0;
    }

    /// Roll the dice. `roll_die` yields a value in 1..=6.
    pub fn roll(&mut self, grid: &mut Grid, mut roll_die: impl FnMut() -> u8) -> Result<RollOutcome, TurnError> {
        let (target, base, first_roll) = match self.phase {
            TurnPhase::Idle => {
                let fresh: Dice = std::array::from_fn(|_| roll_die());
                self.reset_segment();
                self.dice = fresh.to_vec();
                self.phase = if available_targets(&fresh, grid).is_empty() {
                    TurnPhase::Stopped
                } else {
                    TurnPhase::Choosing
                };
                return Ok(RollOutcome { gain: 0, applied: 0, segment_complete: false, phase: self.phase });
            }
            TurnPhase::Choosing => (self.target.ok_or(TurnError::TargetRequired)?, self.preview(), true),
            TurnPhase::Running => (self.target.ok_or(TurnError::TargetRequired)?, self.locked(), false),
            TurnPhase::Stopped => {
                return Err(TurnError::IllegalInPhase { action: "roll", phase: self.phase });
            }
        };

        let current = self.dice();
        let next: Dice = std::array::from_fn(|i| if base[i] { current[i] } else { roll_die() });
        let result = dice::resolve(&next, &base, target);

        let applied = if first_roll {
            // Reconcile the preview: kept dice become boxes (pairs for 7-12)
            let kept = base.iter().filter(|&&l| l).count() as u8;
            let initial = if dice::is_single_die_target(target) { kept } else { kept / 2 };
            initial + result.gain
        } else {
            result.gain
        };
        let checked = grid.fill(target, applied.min(BOXES_PER_ROW));

        self.dice = next.to_vec();
        self.locked = result.locked.to_vec();
        self.preview = result.locked.to_vec();
        self.last_gain = result.gain;

        let segment_complete = result.locked.iter().all(|&l| l) || grid.is_row_complete(target);
        if segment_complete {
            self.reset_segment();
        } else {
            self.phase = if result.gain > 0 { TurnPhase::Running } else { TurnPhase::Stopped };
        }

        Ok(RollOutcome { gain: result.gain, applied: checked, segment_complete, phase: self.phase })
    }

    /// Pick the target while choosing. Returns the previewed gain.
    pub fn choose_target(&mut self, grid: &Grid, target: u8) -> Result<u8, TurnError> {
        if self.phase != TurnPhase::Choosing {
            return Err(TurnError::IllegalInPhase { action: "choose a target", phase: self.phase });
        }
        if !(1..=ROWS).contains(&target) {
            return Err(TurnError::TargetOutOfRange(target));
        }
        if grid.is_row_complete(target) {
            return Err(TurnError::RowComplete(target));
        }
        let preview = dice::resolve(&self.dice(), &self.locked(), target);
        if preview.gain == 0 {
            return Err(TurnError::NoGain(target));
        }
        self.target = Some(target);
        self.preview = preview.locked.to_vec();
        Ok(preview.gain)
    }

    /// Close the segment. Only legal once a roll came up empty.
    pub fn end_round(&mut self) -> Result<(), TurnError> {
        if self.phase != TurnPhase::Stopped {
            return Err(TurnError::IllegalInPhase { action: "end the round", phase: self.phase });
        }
        self.reset_segment();
        Ok(())
    }
}

/// Completed turns of one player
#[derive(SpacetimeType, Debug, Clone, PartialEq)]
pub struct RoundCount {
    pub player_id: u64,
    pub rounds: u32,
}

/// Entry after `current` in `order`, wrapping, skipping players no longer present.
/// Starts from the top when `current` is not in the order.
pub fn next_in_order(order: &[u64], current: Option<u64>, is_present: impl Fn(u64) -> bool) -> Option<u64> {
    if order.is_empty() {
        return None;
    }
    let start = current
        .and_then(|c| order.iter().position(|&p| p == c))
        .map(|i| i + 1)
        .unwrap_or(0);
    (0..order.len())
        .map(|k| order[(start + k) % order.len()])
        .find(|&p| is_present(p))
}

/// Uniform Fisher-Yates shuffle. `pick(n)` returns an index in 0..n.
pub fn shuffle<T>(items: &mut [T], mut pick: impl FnMut(usize) -> usize) {
    for i in (1..items.len()).rev() {
        let j = pick(i + 1);
        items.swap(i, j);
    }
}

/// What closing a round means for the room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundEnd {
    pub rounds: u32,
    pub next_player: Option<u64>,
    /// Actor was the last player of the final lap
    pub finalize: bool,
}

/// What a departure did to the rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    Continue,
    /// The final lap ended with this departure; record the match now
    CloseMatch,
    /// Nobody is left to play
    Emptied,
}

impl RoomState {
    pub fn fresh(room_id: u64, host_player_id: Option<u64>, now: Timestamp) -> Self {
        RoomState {
            room_id,
            host_player_id,
            started: false,
            turn_player_id: None,
            turn_order: Vec::new(),
            round_counts: Vec::new(),
            entrants: Vec::new(),
            finish_triggered: false,
            finish_until_player_id: None,
            finish_winner_ids: Vec::new(),
            match_id: None,
            started_at: None,
            finalized_at: None,
            updated_at: now,
        }
    }

    /// Single-writer guard: only the turn player may act
    pub fn ensure_turn(&self, player_id: u64) -> Result<(), TurnError> {
        if !self.started {
            return Err(TurnError::NotStarted);
        }
        if self.turn_player_id != Some(player_id) {
            return Err(TurnError::NotYourTurn);
        }
        Ok(())
    }

    pub fn rounds_for(&self, player_id: u64) -> u32 {
        self.round_counts
            .iter()
            .find(|rc| rc.player_id == player_id)
            .map(|rc| rc.rounds)
            .unwrap_or(0)
    }

    /// Start a game with `order` as the rotation
    pub fn begin(&mut self, order: Vec<u64>, entrants: Vec<Entrant>, now: Timestamp) {
        self.round_counts = order.iter().map(|&player_id| RoundCount { player_id, rounds: 0 }).collect();
        self.turn_player_id = order.first().copied();
        self.turn_order = order;
        self.entrants = entrants;
        self.started = true;
        self.finish_triggered = false;
        self.finish_until_player_id = None;
        self.finish_winner_ids.clear();
        self.match_id = None;
        self.started_at = Some(now);
        self.finalized_at = None;
        self.updated_at = now;
    }

    /// Back to an unstarted room; the match reference survives as the finalize guard
    pub fn reset_unstarted(&mut self, now: Timestamp) {
        self.started = false;
        self.turn_player_id = None;
        self.turn_order.clear();
        self.round_counts.clear();
        self.entrants.clear();
        self.finish_triggered = false;
        self.finish_until_player_id = None;
        self.finish_winner_ids.clear();
        self.updated_at = now;
    }

    /// Note a completed grid. The final lap runs until the last player in the
    /// current order has had their turn. Returns false if already recorded.
    pub fn record_win(&mut self, player_id: u64) -> bool {
        if self.finish_winner_ids.contains(&player_id) {
            return false;
        }
        self.finish_triggered = true;
        self.finish_winner_ids.push(player_id);
        if self.finish_until_player_id.is_none() {
            self.finish_until_player_id = self.turn_order.last().copied();
        }
        true
    }

    /// Count the actor's round and pass the turn on
    pub fn complete_round(&mut self, actor: u64, is_present: impl Fn(u64) -> bool, now: Timestamp) -> RoundEnd {
        let rounds = match self.round_counts.iter_mut().find(|rc| rc.player_id == actor) {
            Some(rc) => {
                rc.rounds += 1;
                rc.rounds
            }
            None => {
                self.round_counts.push(RoundCount { player_id: actor, rounds: 1 });
                1
            }
        };
        let finalize = self.finish_triggered && self.finish_until_player_id == Some(actor);
        self.turn_player_id = next_in_order(&self.turn_order, Some(actor), is_present);
        self.updated_at = now;
        RoundEnd { rounds, next_player: self.turn_player_id, finalize }
    }

    /// Drop a player from the rotation (leave or elimination)
    pub fn remove_from_order(&mut self, player_id: u64, now: Timestamp) -> Departure {
        let Some(pos) = self.turn_order.iter().position(|&p| p == player_id) else {
            return if self.started && self.turn_order.is_empty() { Departure::Emptied } else { Departure::Continue };
        };
        // Last player of the final lap, on their own turn: everyone else has played since the win
        let lap_done = self.finish_triggered
            && self.finish_until_player_id == Some(player_id)
            && self.turn_player_id == Some(player_id);
        self.turn_order.remove(pos);
        self.updated_at = now;

        if self.turn_player_id == Some(player_id) {
            // The entry that followed the removed player now sits at `pos`
            self.turn_player_id = if self.turn_order.is_empty() {
                None
            } else {
                Some(self.turn_order[pos % self.turn_order.len()])
            };
        }
        if self.finish_until_player_id == Some(player_id) {
            self.finish_until_player_id = self.turn_order.last().copied();
        }
        if lap_done {
            Departure::CloseMatch
        } else if self.started && self.turn_order.is_empty() {
            Departure::Emptied
        } else {
            Departure::Continue
        }
    }

    /// Keep only `survivors` in the rotation, preserving their order
    pub fn retain_players(&mut self, survivors: &[u64], now: Timestamp) {
        let removed: Vec<u64> = self
            .turn_order
            .iter()
            .copied()
            .filter(|p| !survivors.contains(p))
            .collect();
        for player_id in removed {
            self.remove_from_order(player_id, now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> Timestamp {
        Timestamp::from_micros_since_unix_epoch(1_700_000_000_000_000)
    }

    /// Roller that replays a fixed sequence
    fn script(values: &[u8]) -> impl FnMut() -> u8 + '_ {
        let mut it = values.iter().copied();
        move || it.next().expect("script ran out of dice")
    }

    fn started_room(order: &[u64]) -> RoomState {
        let mut state = RoomState::fresh(1, order.first().copied(), ts());
        state.begin(order.to_vec(), Vec::new(), ts());
        state
    }

    #[test]
    fn test_idle_only_allows_roll() {
        let grid = Grid::empty();
        let mut turn = DiceTurn::default();
        assert_eq!(
            turn.choose_target(&grid, 3),
            Err(TurnError::IllegalInPhase { action: "choose a target", phase: TurnPhase::Idle })
        );
        assert!(matches!(turn.end_round(), Err(TurnError::IllegalInPhase { .. })));
        assert_eq!(turn, DiceTurn::default());
    }

    #[test]
    fn test_first_roll_enters_choosing() {
        let mut grid = Grid::empty();
        let mut turn = DiceTurn::default();
        let outcome = turn.roll(&mut grid, script(&[1, 2, 3, 4, 5, 6])).unwrap();
        assert_eq!(outcome.phase, TurnPhase::Choosing);
        assert_eq!(turn.dice, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(turn.target, None);
        assert_eq!(grid, Grid::empty());
    }

    #[test]
    fn test_choosing_without_target() {
        let mut grid = Grid::empty();
        let mut turn = DiceTurn::default();
        turn.roll(&mut grid, script(&[1, 2, 3, 4, 5, 6])).unwrap();
        assert!(matches!(turn.end_round(), Err(TurnError::IllegalInPhase { .. })));
        assert_eq!(turn.roll(&mut grid, script(&[])), Err(TurnError::TargetRequired));
    }

    #[test]
    fn test_choose_target_validation() {
        let mut grid = Grid::empty();
        grid.fill(2, 7);
        let mut turn = DiceTurn::default();
        turn.roll(&mut grid, script(&[2, 2, 5, 5, 5, 1])).unwrap();

        assert_eq!(turn.choose_target(&grid, 0), Err(TurnError::TargetOutOfRange(0)));
        assert_eq!(turn.choose_target(&grid, 13), Err(TurnError::TargetOutOfRange(13)));
        assert_eq!(turn.choose_target(&grid, 2), Err(TurnError::RowComplete(2)));
        assert_eq!(turn.choose_target(&grid, 4), Err(TurnError::NoGain(4)));

        assert_eq!(turn.choose_target(&grid, 5), Ok(3));
        assert_eq!(turn.preview, vec![false, false, true, true, true, false]);
        assert!(turn.locked.iter().all(|&l| !l));

        // Still choosing: the target may change until the first roll
        assert_eq!(turn.choose_target(&grid, 10), Ok(1));
        assert_eq!(turn.target, Some(10));
    }

    #[test]
    fn test_no_selectable_target_stops() {
        let mut grid = Grid::empty();
        for row in 1..=12 {
            if row != 3 {
                grid.fill(row, 7);
            }
        }
        let mut turn = DiceTurn::default();
        // No 3 and no way to reach anything else open
        let outcome = turn.roll(&mut grid, script(&[1, 1, 2, 2, 4, 4])).unwrap();
        assert_eq!(outcome.phase, TurnPhase::Stopped);
        assert!(turn.end_round().is_ok());
        assert_eq!(turn.phase, TurnPhase::Idle);
    }

    #[test]
    fn test_first_roll_reconciles_single_preview() {
        let mut grid = Grid::empty();
        let mut turn = DiceTurn::default();
        turn.roll(&mut grid, script(&[4, 4, 1, 2, 3, 6])).unwrap();
        turn.choose_target(&grid, 4).unwrap();

        // Four unlocked dice re-rolled; one more 4
        let outcome = turn.roll(&mut grid, script(&[4, 1, 1, 2])).unwrap();
        assert_eq!(outcome.gain, 1);
        assert_eq!(outcome.applied, 3);
        assert_eq!(outcome.phase, TurnPhase::Running);
        assert_eq!(grid.filled(4), 3);
        assert_eq!(turn.dice, vec![4, 4, 4, 1, 1, 2]);
        assert_eq!(turn.locked, vec![true, true, true, false, false, false]);

        // Nothing new: stopped, grid unchanged
        let outcome = turn.roll(&mut grid, script(&[1, 2, 3])).unwrap();
        assert_eq!(outcome.gain, 0);
        assert_eq!(outcome.phase, TurnPhase::Stopped);
        assert_eq!(grid.filled(4), 3);
        assert_eq!(turn.roll(&mut grid, script(&[])), Err(TurnError::IllegalInPhase { action: "roll", phase: TurnPhase::Stopped }));

        turn.end_round().unwrap();
        assert_eq!(turn.phase, TurnPhase::Idle);
        assert_eq!(turn.target, None);
    }

    #[test]
    fn test_first_roll_halves_pair_preview() {
        let mut grid = Grid::empty();
        let mut turn = DiceTurn::default();
        turn.roll(&mut grid, script(&[3, 4, 2, 5, 1, 1])).unwrap();
        assert_eq!(turn.choose_target(&grid, 7).unwrap(), 2);

        // Two pairs previewed = 2 boxes; rolled 1s add nothing
        let outcome = turn.roll(&mut grid, script(&[1, 1])).unwrap();
        assert_eq!(outcome.gain, 0);
        assert_eq!(outcome.applied, 2);
        assert_eq!(outcome.phase, TurnPhase::Stopped);
        assert_eq!(grid.filled(7), 2);
    }

    #[test]
    fn test_all_dice_locked_ends_segment() {
        let mut grid = Grid::empty();
        let mut turn = DiceTurn::default();
        turn.roll(&mut grid, script(&[6, 6, 6, 6, 1, 2])).unwrap();
        turn.choose_target(&grid, 6).unwrap();

        let outcome = turn.roll(&mut grid, script(&[6, 6])).unwrap();
        assert!(outcome.segment_complete);
        assert_eq!(outcome.applied, 6);
        assert_eq!(outcome.phase, TurnPhase::Idle);
        assert_eq!(turn.target, None);
        assert_eq!(turn.dice, vec![6; 6]);
        assert_eq!(grid.filled(6), 6);
    }

    #[test]
    fn test_row_filled_ends_segment_and_caps() {
        let mut grid = Grid::empty();
        grid.fill(1, 5);
        let mut turn = DiceTurn::default();
        turn.roll(&mut grid, script(&[1, 1, 1, 2, 3, 4])).unwrap();
        turn.choose_target(&grid, 1).unwrap();

        let outcome = turn.roll(&mut grid, script(&[2, 3, 4])).unwrap();
        assert!(outcome.segment_complete);
        assert_eq!(outcome.applied, 2);
        assert!(grid.is_row_complete(1));
        assert_eq!(turn.phase, TurnPhase::Idle);
    }

    #[test]
    fn test_next_in_order_wraps_and_skips() {
        let order = [10, 20, 30, 40];
        assert_eq!(next_in_order(&order, Some(20), |_| true), Some(30));
        assert_eq!(next_in_order(&order, Some(40), |_| true), Some(10));
        assert_eq!(next_in_order(&order, Some(20), |p| p != 30), Some(40));
        assert_eq!(next_in_order(&order, Some(99), |_| true), Some(10));
        assert_eq!(next_in_order(&order, Some(10), |p| p == 10), Some(10));
        assert_eq!(next_in_order(&order, Some(10), |_| false), None);
        assert_eq!(next_in_order(&[], Some(10), |_| true), None);
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let mut items = vec![1, 2, 3, 4, 5];
        // Always pick index 0: rotates elements deterministically
        shuffle(&mut items, |_| 0);
        let mut sorted = items.clone();
        sorted.sort();
        assert_eq!(sorted, vec![1, 2, 3, 4, 5]);
        assert_eq!(items, vec![2, 3, 4, 5, 1]);

        let mut identity = vec![1, 2, 3];
        shuffle(&mut identity, |n| n - 1);
        assert_eq!(identity, vec![1, 2, 3]);
    }

    #[test]
    fn test_ensure_turn() {
        let mut state = RoomState::fresh(1, Some(7), ts());
        assert_eq!(state.ensure_turn(7), Err(TurnError::NotStarted));
        state.begin(vec![7, 8], Vec::new(), ts());
        assert_eq!(state.ensure_turn(7), Ok(()));
        assert_eq!(state.ensure_turn(8), Err(TurnError::NotYourTurn));
    }

    #[test]
    fn test_complete_round_advances_and_counts() {
        let mut state = started_room(&[1, 2, 3]);
        let end = state.complete_round(1, |_| true, ts());
        assert_eq!(end, RoundEnd { rounds: 1, next_player: Some(2), finalize: false });
        assert_eq!(state.turn_player_id, Some(2));
        assert_eq!(state.rounds_for(1), 1);
        assert_eq!(state.rounds_for(2), 0);

        // Player 3 left the room: skipped
        let end = state.complete_round(2, |p| p != 3, ts());
        assert_eq!(end.next_player, Some(1));
    }

    #[test]
    fn test_win_runs_until_last_in_order() {
        let mut state = started_room(&[1, 2, 3]);
        state.complete_round(1, |_| true, ts());
        assert!(state.record_win(2));
        assert!(!state.record_win(2));
        assert!(state.finish_triggered);
        assert_eq!(state.finish_until_player_id, Some(3));

        assert!(!state.complete_round(2, |_| true, ts()).finalize);
        assert!(state.record_win(3));
        assert_eq!(state.finish_winner_ids, vec![2, 3]);
        assert_eq!(state.finish_until_player_id, Some(3));
        assert!(state.complete_round(3, |_| true, ts()).finalize);
    }

    #[test]
    fn test_remove_turn_player_passes_turn() {
        let mut state = started_room(&[1, 2, 3]);
        state.turn_player_id = Some(3);
        state.finish_until_player_id = Some(3);
        assert_eq!(state.remove_from_order(3, ts()), Departure::Continue);
        assert_eq!(state.turn_order, vec![1, 2]);
        assert_eq!(state.turn_player_id, Some(1));
        assert_eq!(state.finish_until_player_id, Some(2));

        assert_eq!(state.remove_from_order(1, ts()), Departure::Continue);
        assert_eq!(state.turn_player_id, Some(2));
        assert_eq!(state.remove_from_order(2, ts()), Departure::Emptied);
        assert_eq!(state.turn_player_id, None);
    }

    #[test]
    fn test_last_of_final_lap_leaving_closes_match() {
        let mut state = started_room(&[1, 2, 3]);
        assert!(state.record_win(1));
        assert!(!state.complete_round(1, |_| true, ts()).finalize);
        assert!(!state.complete_round(2, |_| true, ts()).finalize);
        assert_eq!(state.turn_player_id, Some(3));

        assert_eq!(state.remove_from_order(3, ts()), Departure::CloseMatch);
        assert_eq!(state.turn_order, vec![1, 2]);
        assert_eq!(state.finish_winner_ids, vec![1]);

        // A sole player leaving on the winning turn also closes it
        let mut solo = started_room(&[7]);
        assert!(solo.record_win(7));
        assert_eq!(solo.remove_from_order(7, ts()), Departure::CloseMatch);
    }

    #[test]
    fn test_last_of_final_lap_leaving_early_moves_the_lap_end() {
        let mut state = started_room(&[1, 2, 3]);
        assert!(state.record_win(1));
        state.complete_round(1, |_| true, ts());
        // 3 leaves while 2 is still playing
        assert_eq!(state.remove_from_order(3, ts()), Departure::Continue);
        assert_eq!(state.finish_until_player_id, Some(2));
        assert!(state.complete_round(2, |_| true, ts()).finalize);
    }

    #[test]
    fn test_retain_players_keeps_relative_order() {
        let mut state = started_room(&[5, 1, 4, 2, 3]);
        state.turn_player_id = Some(4);
        state.retain_players(&[3, 1, 2], ts());
        assert_eq!(state.turn_order, vec![1, 2, 3]);
        assert_eq!(state.turn_player_id, Some(2));
    }
}
