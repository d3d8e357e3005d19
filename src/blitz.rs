// Blitz: the nightly elimination tournament.
//
// Three phases run on a timer (and may also be fired by an external worker):
// bootstrap opens the day's lobby, start seats everyone, tick eliminates the
// weakest players every few minutes until one is left. Each phase re-reads
// the rows it needs and is a no-op when its preconditions do not hold, so
// duplicate or early invocations are harmless.

use std::time::Duration;

use spacetimedb::rand::Rng;
use spacetimedb::{reducer, table, ReducerContext, ScheduleAt, SpacetimeType, Table, Timestamp};

use crate::clock;
use crate::config::GameConfig;
use crate::finalize::Entrant;
use crate::leaderboard::refresh_leaderboard;
use crate::notify;
use crate::ranker::{self, Finisher, Standing};
use crate::turn::shuffle;
use crate::{
    authorized_worker, match_player, player, player_state, profile, room, room_state, MatchPlayer, Room, RoomKind,
    RoomState,
};

/// Name recorded for a payout when neither profile nor player has one
const FALLBACK_NAME: &str = "Player";

// ==================== TABLES ====================

#[derive(SpacetimeType, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlitzStatus {
    Lobby,
    Running,
    Finished,
}

#[derive(SpacetimeType, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantStatus {
    Active,
    Eliminated,
}

#[derive(SpacetimeType, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlitzPhase {
    Bootstrap,
    Start,
    Tick,
}

/// One tournament per local calendar day
#[table(name = blitz_event, public)]
#[derive(Clone, Debug)]
pub struct BlitzEvent {
    #[primary_key]
    #[auto_inc]
    pub id: u64,

    /// Local day, YYYY-MM-DD
    #[unique]
    pub date_key: String,

    pub status: BlitzStatus,

    /// Room every participant plays in
    pub room_id: u64,

    pub lobby_open_at: Timestamp,
    pub start_at: Timestamp,
    pub started_at: Option<Timestamp>,

    /// Earliest time the next elimination may run
    pub next_elim_at: Option<Timestamp>,
    pub last_elim_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
}

/// An account signed up for an event
#[table(name = blitz_participant, public)]
#[derive(Clone, Debug)]
pub struct BlitzParticipant {
    #[primary_key]
    #[auto_inc]
    pub id: u64,

    #[index(btree)]
    pub event_id: u64,

    pub profile_id: String,

    /// Player row in the event room; None once they leave
    pub player_id: Option<u64>,

    pub status: ParticipantStatus,
    pub joined_at: Timestamp,
    pub eliminated_at: Option<Timestamp>,

    /// Batch number shared by everyone eliminated in the same tick
    pub eliminated_seq: Option<u32>,
}

/// Interval trigger, one row per phase
#[table(name = blitz_schedule, scheduled(run_blitz_phase))]
pub struct BlitzSchedule {
    #[primary_key]
    #[auto_inc]
    pub id: u64,

    pub scheduled_at: ScheduleAt,

    pub phase: BlitzPhase,
}

// ==================== DECISIONS ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapDecision {
    LobbyClosed,
    /// Today's event already exists
    AlreadyCreated,
    Create,
}

pub fn bootstrap_decision(now: Timestamp, lobby_open_at: Timestamp, event_exists: bool) -> BootstrapDecision {
    if now < lobby_open_at {
        BootstrapDecision::LobbyClosed
    } else if event_exists {
        BootstrapDecision::AlreadyCreated
    } else {
        BootstrapDecision::Create
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartDecision {
    NotInLobby,
    TooEarly,
    NoPlayers,
    Start,
}

pub fn start_decision(status: BlitzStatus, now: Timestamp, start_at: Timestamp, bound_players: usize) -> StartDecision {
    if status != BlitzStatus::Lobby {
        StartDecision::NotInLobby
    } else if now < start_at {
        StartDecision::TooEarly
    } else if bound_players == 0 {
        StartDecision::NoPlayers
    } else {
        StartDecision::Start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    /// One or no players left
    Finalize,
    /// Next elimination time not reached
    Waiting,
    /// Someone is still catching up on rounds
    Unsynchronized,
    Eliminate,
}

/// Payouts are written once; a finished event is left alone
pub fn event_finalize_decision(status: BlitzStatus) -> bool {
    status != BlitzStatus::Finished
}

/// `active_rounds` holds the completed-round count of each active participant
pub fn tick_decision(active_rounds: &[u32], now: Timestamp, next_elim_at: Option<Timestamp>) -> TickDecision {
    if active_rounds.len() <= 1 {
        TickDecision::Finalize
    } else if next_elim_at.is_some_and(|at| now < at) {
        TickDecision::Waiting
    } else if !ranker::rounds_synchronized(active_rounds) {
        TickDecision::Unsynchronized
    } else {
        TickDecision::Eliminate
    }
}

/// Room code of the event on `date_key` (YYYY-MM-DD -> BLITZ-YYYYMMDD)
pub fn room_code(date_key: &str) -> String {
    format!("BLITZ-{}", date_key.replace('-', ""))
}

/// Next elimination batch number, from the highest already handed out
pub fn next_elimination_seq(participants: &[BlitzParticipant]) -> u32 {
    participants.iter().filter_map(|p| p.eliminated_seq).max().unwrap_or(0) + 1
}

fn is_active_and_seated(p: &BlitzParticipant) -> bool {
    p.status == ParticipantStatus::Active && p.player_id.is_some()
}

// ==================== PHASES ====================

/// Open today's lobby once the lobby time has passed
pub fn bootstrap(ctx: &ReducerContext, config: &GameConfig) {
    let now = ctx.timestamp;
    let date = clock::local_date(now, config);
    let lobby_open_at = clock::local_minute(date, config.lobby_open_minute, config);
    let start_at = clock::local_minute(date, config.start_minute, config);

    let date_key = clock::day_key(now, config);
    let exists = ctx.db.blitz_event().date_key().find(&date_key).is_some();
    match bootstrap_decision(now, lobby_open_at, exists) {
        BootstrapDecision::LobbyClosed => {
            log::debug!("[BLITZ] bootstrap skipped: lobby not open yet");
            return;
        }
        BootstrapDecision::AlreadyCreated => {
            log::debug!("[BLITZ] bootstrap no-op: event for {} exists", date_key);
            return;
        }
        BootstrapDecision::Create => {}
    }

    let code = room_code(&date_key);
    let room = match ctx.db.room().code().find(&code) {
        Some(existing) => existing,
        None => ctx.db.room().insert(Room {
            id: 0, // auto_inc
            code: code.clone(),
            kind: RoomKind::Blitz,
            created_at: now,
        }),
    };

    let fresh = RoomState::fresh(room.id, None, now);
    if ctx.db.room_state().room_id().find(&room.id).is_some() {
        ctx.db.room_state().room_id().update(fresh);
    } else {
        ctx.db.room_state().insert(fresh);
    }

    let event = ctx.db.blitz_event().insert(BlitzEvent {
        id: 0, // auto_inc
        date_key: date_key.clone(),
        status: BlitzStatus::Lobby,
        room_id: room.id,
        lobby_open_at,
        start_at,
        started_at: None,
        next_elim_at: None,
        last_elim_at: None,
        finished_at: None,
    });

    let queued = notify::enqueue_blitz_reminder(ctx, config);
    log::info!(
        "[BLITZ] lobby open event_id={} date={} room={} reminders={}",
        event.id,
        date_key,
        code,
        queued
    );
}

/// Seat every signed-up player once the start time has passed
pub fn start(ctx: &ReducerContext, config: &GameConfig) {
    let now = ctx.timestamp;
    let date_key = clock::day_key(now, config);
    let Some(mut event) = ctx.db.blitz_event().date_key().find(&date_key) else {
        log::debug!("[BLITZ] start no-op: no event for {}", date_key);
        return;
    };

    let mut order: Vec<u64> = ctx
        .db
        .blitz_participant()
        .event_id()
        .filter(&event.id)
        .filter(is_active_and_seated)
        .filter_map(|p| p.player_id)
        .filter(|pid| ctx.db.player().id().find(pid).is_some())
        .collect();

    match start_decision(event.status, now, event.start_at, order.len()) {
        StartDecision::Start => {}
        StartDecision::NoPlayers => {
            log::info!("[BLITZ] start skipped event_id={}: nobody seated", event.id);
            return;
        }
        other => {
            log::debug!("[BLITZ] start no-op event_id={}: {:?}", event.id, other);
            return;
        }
    }

    let Some(mut state) = ctx.db.room_state().room_id().find(&event.room_id) else {
        log::error!("[BLITZ] event_id={} has no room state for room_id={}", event.id, event.room_id);
        return;
    };

    let mut rng = ctx.rng();
    shuffle(&mut order, |n| rng.gen_range(0..n));

    let entrants: Vec<Entrant> = order
        .iter()
        .filter_map(|pid| ctx.db.player().id().find(pid))
        .map(|p| Entrant { player_id: p.id, name: p.name, profile_id: p.profile_id })
        .collect();
    for pid in &order {
        crate::reset_player_state(ctx, *pid, event.room_id);
    }

    state.host_player_id = None;
    state.begin(order.clone(), entrants, now);
    ctx.db.room_state().room_id().update(state);

    event.status = BlitzStatus::Running;
    event.started_at = Some(now);
    event.next_elim_at = Some(now + Duration::from_secs(config.elimination_interval_secs));
    let event_id = event.id;
    ctx.db.blitz_event().id().update(event);

    log::info!("[BLITZ] started event_id={} players={}", event_id, order.len());
}

/// Run one elimination check for every running event
pub fn tick(ctx: &ReducerContext, config: &GameConfig) {
    let running: Vec<BlitzEvent> = ctx
        .db
        .blitz_event()
        .iter()
        .filter(|e| e.status == BlitzStatus::Running)
        .collect();
    if running.is_empty() {
        log::debug!("[BLITZ] tick no-op: nothing running");
    }
    for event in running {
        tick_event(ctx, config, event);
    }
}

fn tick_event(ctx: &ReducerContext, config: &GameConfig, mut event: BlitzEvent) {
    let now = ctx.timestamp;
    let participants: Vec<BlitzParticipant> = ctx.db.blitz_participant().event_id().filter(&event.id).collect();
    let active: Vec<&BlitzParticipant> = participants.iter().filter(|p| is_active_and_seated(p)).collect();

    let Some(mut state) = ctx.db.room_state().room_id().find(&event.room_id) else {
        log::error!("[BLITZ] event_id={} has no room state; finishing", event.id);
        finalize_event(ctx, config, event);
        return;
    };

    // Read fresh every tick: round counts move between invocations
    let rounds: Vec<u32> = active
        .iter()
        .filter_map(|p| p.player_id)
        .map(|pid| state.rounds_for(pid))
        .collect();

    match tick_decision(&rounds, now, event.next_elim_at) {
        TickDecision::Finalize => {
            finalize_event(ctx, config, event);
            return;
        }
        TickDecision::Waiting => {
            log::debug!("[BLITZ] tick event_id={}: waiting for next elimination", event.id);
            return;
        }
        TickDecision::Unsynchronized => {
            log::debug!("[BLITZ] tick event_id={}: rounds not in sync {:?}", event.id, rounds);
            return;
        }
        TickDecision::Eliminate => {}
    }

    let standings: Vec<Standing> = active
        .iter()
        .map(|p| {
            let grid = p
                .player_id
                .and_then(|pid| ctx.db.player_state().player_id().find(&pid))
                .map(|ps| ps.grid)
                .unwrap_or_default();
            Standing {
                participant_id: p.id,
                profile_id: p.profile_id.clone(),
                percent: grid.weighted_percent(),
                boxes: grid.checked_boxes(),
            }
        })
        .collect();

    let victims = ranker::pick_victims(standings, config.double_elimination_above as usize);
    if victims.is_empty() {
        return;
    }

    let seq = next_elimination_seq(&participants);
    for victim in &victims {
        if let Some(mut p) = ctx.db.blitz_participant().id().find(&victim.participant_id) {
            p.status = ParticipantStatus::Eliminated;
            p.eliminated_at = Some(now);
            p.eliminated_seq = Some(seq);
            ctx.db.blitz_participant().id().update(p);
        }
        log::info!(
            "[BLITZ] eliminated event_id={} profile={} seq={} percent={} boxes={}",
            event.id,
            victim.profile_id,
            seq,
            victim.percent,
            victim.boxes
        );
    }

    let survivors: Vec<u64> = active
        .iter()
        .filter(|p| !victims.iter().any(|v| v.participant_id == p.id))
        .filter_map(|p| p.player_id)
        .collect();

    state.retain_players(&survivors, now);
    ctx.db.room_state().room_id().update(state);

    if survivors.len() <= 1 {
        finalize_event(ctx, config, event);
        return;
    }

    event.last_elim_at = Some(now);
    event.next_elim_at = Some(now + Duration::from_secs(config.elimination_interval_secs));
    ctx.db.blitz_event().id().update(event);
}

/// Pay out ranks and close the event. A finished event is left alone.
pub fn finalize_event(ctx: &ReducerContext, config: &GameConfig, event: BlitzEvent) {
    // Re-read: an earlier step in this transaction may have written the row
    let Some(mut event) = ctx.db.blitz_event().id().find(&event.id) else {
        return;
    };
    if !event_finalize_decision(event.status) {
        log::debug!("[BLITZ] finalize no-op: event_id={} already finished", event.id);
        return;
    }

    let participants: Vec<BlitzParticipant> = ctx.db.blitz_participant().event_id().filter(&event.id).collect();
    let finishers: Vec<Finisher> = participants
        .iter()
        .filter_map(|p| match p.status {
            ParticipantStatus::Active if p.player_id.is_some() => {
                Some(Finisher { profile_id: p.profile_id.clone(), eliminated_seq: None })
            }
            ParticipantStatus::Active => None,
            ParticipantStatus::Eliminated => {
                Some(Finisher { profile_id: p.profile_id.clone(), eliminated_seq: p.eliminated_seq })
            }
        })
        .collect();

    let groups = ranker::payout_groups(&finishers, config.rank_points.len());
    let payouts = ranker::distribute(&groups, &config.rank_points);
    let month_key = clock::month_key(ctx.timestamp, config);

    for (profile_id, points) in &payouts {
        let participant = participants.iter().find(|p| &p.profile_id == profile_id);
        let player_id = participant.and_then(|p| p.player_id);
        let display_name = ctx
            .db
            .profile()
            .id()
            .find(profile_id)
            .map(|p| p.display_name)
            .or_else(|| player_id.and_then(|pid| ctx.db.player().id().find(&pid)).map(|p| p.name))
            .unwrap_or_else(|| FALLBACK_NAME.to_string());

        // Blitz rows carry points only; wins count casual matches
        ctx.db.match_player().insert(MatchPlayer {
            id: 0, // auto_inc
            match_id: None,
            blitz_event_id: Some(event.id),
            room_id: event.room_id,
            player_id,
            profile_id: Some(profile_id.clone()),
            display_name,
            is_winner: false,
            rounds: None,
            points_awarded: *points,
            month_key: month_key.clone(),
            created_at: ctx.timestamp,
        });
    }

    if let Some(mut state) = ctx.db.room_state().room_id().find(&event.room_id) {
        state.finalized_at = Some(ctx.timestamp);
        state.reset_unstarted(ctx.timestamp);
        ctx.db.room_state().room_id().update(state);
    }

    event.status = BlitzStatus::Finished;
    event.finished_at = Some(ctx.timestamp);
    event.next_elim_at = None;
    let event_id = event.id;
    ctx.db.blitz_event().id().update(event);

    refresh_leaderboard(ctx, &month_key);
    log::info!(
        "[BLITZ] finished event_id={} groups={} payouts={}",
        event_id,
        groups.len(),
        payouts.len()
    );
}

/// Seed one interval row per phase (idempotent)
pub fn ensure_blitz_schedule(ctx: &ReducerContext, config: &GameConfig) {
    for phase in [BlitzPhase::Bootstrap, BlitzPhase::Start, BlitzPhase::Tick] {
        if ctx.db.blitz_schedule().iter().any(|s| s.phase == phase) {
            continue;
        }
        ctx.db.blitz_schedule().insert(BlitzSchedule {
            id: 0, // auto_inc
            scheduled_at: ScheduleAt::Interval(Duration::from_secs(config.scheduler_interval_secs).into()),
            phase,
        });
    }
}

pub fn clear_blitz_schedule(ctx: &ReducerContext) {
    let ids: Vec<u64> = ctx.db.blitz_schedule().iter().map(|s| s.id).collect();
    for id in ids {
        ctx.db.blitz_schedule().id().delete(&id);
    }
}

// ==================== REDUCERS ====================

/// Scheduled trigger for all three phases
#[reducer]
pub fn run_blitz_phase(ctx: &ReducerContext, schedule: BlitzSchedule) {
    if ctx.sender != ctx.identity() {
        log::warn!("[BLITZ] client {} attempted to call run_blitz_phase", ctx.sender);
        return;
    }
    let config = GameConfig::load(ctx);
    match schedule.phase {
        BlitzPhase::Bootstrap => bootstrap(ctx, &config),
        BlitzPhase::Start => start(ctx, &config),
        BlitzPhase::Tick => tick(ctx, &config),
    }
}

fn require_worker(ctx: &ReducerContext, action: &str) -> Result<(), String> {
    if ctx.db.authorized_worker().identity().find(&ctx.sender).is_none() {
        log::warn!("[BLITZ] unauthorized {} attempt by {}", action, ctx.sender);
        return Err("Unauthorized".to_string());
    }
    Ok(())
}

/// External trigger for bootstrap (authorized workers only)
#[reducer]
pub fn blitz_bootstrap(ctx: &ReducerContext) -> Result<(), String> {
    require_worker(ctx, "blitz_bootstrap")?;
    bootstrap(ctx, &GameConfig::load(ctx));
    Ok(())
}

/// External trigger for start (authorized workers only)
#[reducer]
pub fn blitz_start(ctx: &ReducerContext) -> Result<(), String> {
    require_worker(ctx, "blitz_start")?;
    start(ctx, &GameConfig::load(ctx));
    Ok(())
}

/// External trigger for tick (authorized workers only)
#[reducer]
pub fn blitz_tick(ctx: &ReducerContext) -> Result<(), String> {
    require_worker(ctx, "blitz_tick")?;
    tick(ctx, &GameConfig::load(ctx));
    Ok(())
}

/// Sign up for tonight's Blitz and take a seat in its room
#[reducer]
pub fn join_blitz(ctx: &ReducerContext, profile_id: String, name: String, device_id: String) -> Result<(), String> {
    let profile_id = profile_id.trim().to_string();
    if profile_id.is_empty() {
        return Err("Blitz requires an account".to_string());
    }
    let config = GameConfig::load(ctx);
    let date_key = clock::day_key(ctx.timestamp, &config);

    let event = ctx
        .db
        .blitz_event()
        .date_key()
        .find(&date_key)
        .ok_or_else(|| "No Blitz tonight yet".to_string())?;
    if event.status != BlitzStatus::Lobby {
        return Err("Blitz lobby is closed".to_string());
    }
    let room = ctx
        .db
        .room()
        .id()
        .find(&event.room_id)
        .ok_or_else(|| "Blitz room not found".to_string())?;

    let player = crate::enter_room(ctx, &room, name, device_id, Some(profile_id.clone()))?;

    let existing = ctx
        .db
        .blitz_participant()
        .event_id()
        .filter(&event.id)
        .find(|p| p.profile_id == profile_id);
    match existing {
        Some(mut participant) => {
            participant.player_id = Some(player.id);
            ctx.db.blitz_participant().id().update(participant);
            log::info!("[BLITZ] rejoined event_id={} profile={}", event.id, profile_id);
        }
        None => {
            ctx.db.blitz_participant().insert(BlitzParticipant {
                id: 0, // auto_inc
                event_id: event.id,
                profile_id: profile_id.clone(),
                player_id: Some(player.id),
                status: ParticipantStatus::Active,
                joined_at: ctx.timestamp,
                eliminated_at: None,
                eliminated_seq: None,
            });
            log::info!("[BLITZ] joined event_id={} profile={}", event.id, profile_id);
        }
    }
    Ok(())
}

/// Unseat a player who left a Blitz room; they drop out of the tournament
pub fn release_player(ctx: &ReducerContext, player_id: u64) {
    let seated: Vec<BlitzParticipant> = ctx
        .db
        .blitz_participant()
        .iter()
        .filter(|p| p.player_id == Some(player_id))
        .collect();
    for mut p in seated {
        log::info!("[BLITZ] profile={} left event_id={}", p.profile_id, p.event_id);
        p.player_id = None;
        ctx.db.blitz_participant().id().update(p);
    }
}

/// True while the room backs an event still in lobby or running
pub fn is_live_blitz_room(ctx: &ReducerContext, room_id: u64) -> bool {
    ctx.db
        .blitz_event()
        .iter()
        .any(|e| e.room_id == room_id && e.status != BlitzStatus::Finished)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_micros_since_unix_epoch(secs * 1_000_000)
    }

    fn participant(id: u64, seq: Option<u32>) -> BlitzParticipant {
        BlitzParticipant {
            id,
            event_id: 1,
            profile_id: format!("p{}", id),
            player_id: Some(100 + id),
            status: if seq.is_some() { ParticipantStatus::Eliminated } else { ParticipantStatus::Active },
            joined_at: at(0),
            eliminated_at: seq.map(|_| at(10)),
            eliminated_seq: seq,
        }
    }

    #[test]
    fn test_bootstrap_decision_runs_once_per_day() {
        let lobby_open_at = at(1000);
        assert_eq!(bootstrap_decision(at(999), lobby_open_at, false), BootstrapDecision::LobbyClosed);
        assert_eq!(bootstrap_decision(at(1000), lobby_open_at, false), BootstrapDecision::Create);
        // Repeat runs after the first created the event
        assert_eq!(bootstrap_decision(at(1000), lobby_open_at, true), BootstrapDecision::AlreadyCreated);
        assert_eq!(bootstrap_decision(at(5000), lobby_open_at, true), BootstrapDecision::AlreadyCreated);
    }

    #[test]
    fn test_event_finalize_decision() {
        assert!(event_finalize_decision(BlitzStatus::Running));
        assert!(event_finalize_decision(BlitzStatus::Lobby));
        assert!(!event_finalize_decision(BlitzStatus::Finished));
    }

    #[test]
    fn test_start_decision() {
        let start_at = at(1000);
        assert_eq!(start_decision(BlitzStatus::Lobby, at(999), start_at, 5), StartDecision::TooEarly);
        assert_eq!(start_decision(BlitzStatus::Lobby, at(1000), start_at, 0), StartDecision::NoPlayers);
        assert_eq!(start_decision(BlitzStatus::Lobby, at(1000), start_at, 5), StartDecision::Start);
        // Second invocation after the first flipped the status
        assert_eq!(start_decision(BlitzStatus::Running, at(1200), start_at, 5), StartDecision::NotInLobby);
        assert_eq!(start_decision(BlitzStatus::Finished, at(1200), start_at, 5), StartDecision::NotInLobby);
    }

    #[test]
    fn test_tick_decision_order() {
        let next = Some(at(600));
        assert_eq!(tick_decision(&[4], at(0), next), TickDecision::Finalize);
        assert_eq!(tick_decision(&[], at(0), next), TickDecision::Finalize);
        assert_eq!(tick_decision(&[4, 4], at(599), next), TickDecision::Waiting);
        assert_eq!(tick_decision(&[4, 5, 4], at(600), next), TickDecision::Unsynchronized);
        assert_eq!(tick_decision(&[5, 5, 5], at(600), next), TickDecision::Eliminate);
        assert_eq!(tick_decision(&[5, 5], at(0), None), TickDecision::Eliminate);
    }

    #[test]
    fn test_unsynchronized_regardless_of_elapsed_time() {
        // Hours past the deadline, still waiting on the barrier
        assert_eq!(tick_decision(&[7, 6, 7, 7], at(100_000), Some(at(600))), TickDecision::Unsynchronized);
    }

    #[test]
    fn test_room_code() {
        assert_eq!(room_code("2024-07-02"), "BLITZ-20240702");
    }

    #[test]
    fn test_next_elimination_seq() {
        assert_eq!(next_elimination_seq(&[participant(1, None), participant(2, None)]), 1);
        assert_eq!(
            next_elimination_seq(&[participant(1, None), participant(2, Some(1)), participant(3, Some(3))]),
            4
        );
    }

    #[test]
    fn test_active_and_seated() {
        let mut p = participant(1, None);
        assert!(is_active_and_seated(&p));
        p.player_id = None;
        assert!(!is_active_and_seated(&p));
        assert!(!is_active_and_seated(&participant(2, Some(1))));
    }
}
