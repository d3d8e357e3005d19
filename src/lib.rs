use spacetimedb::{
    ReducerContext, Identity, Table, Timestamp, ScheduleAt,
    table, reducer, SpacetimeType, rand::Rng,
};

mod blitz;
mod clock;
mod config;
mod dice;
mod finalize;
mod grid;
mod leaderboard;
mod notify;
mod ranker;
mod turn;

use config::{ensure_config, GameConfig};
use finalize::{finalize_match, Entrant};
use grid::Grid;
use turn::{Departure, DiceTurn, RoundCount, TurnError};

// ==================== CONSTANTS ====================

/// Room codes avoid confusable characters (no I, O, 0, 1)
const ROOM_CODE_CHARS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const ROOM_CODE_LEN: usize = 6;
const ROOM_CODE_ATTEMPTS: usize = 20;

/// Rooms without players are deleted after this long
const EMPTY_ROOM_TTL_SECS: u64 = 8 * 60;

const MAX_NAME_LEN: usize = 24;

// ==================== TABLES ====================

/// Session links a connection to the player it joined as
/// PRIVATE: clients learn their player id from the join reducers' effects
#[table(name = session)]
pub struct Session {
    #[primary_key]
    pub connection_id: Identity,

    #[index(btree)]
    pub player_id: u64,

    pub connected_at: Timestamp,
}

/// Authorized identities that can access protected tables and admin reducers
#[table(name = authorized_worker)]
pub struct AuthorizedWorker {
    #[primary_key]
    pub identity: Identity,
}

#[derive(SpacetimeType, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomKind {
    /// Player-created room, started by its host
    Casual,
    /// Backs a Blitz event; started by the scheduler
    Blitz,
}

#[table(name = room, public)]
#[derive(Clone, Debug)]
pub struct Room {
    #[primary_key]
    #[auto_inc]
    pub id: u64,

    /// Shareable join code
    #[unique]
    pub code: String,

    pub kind: RoomKind,

    pub created_at: Timestamp,
}

#[table(name = player, public)]
#[derive(Clone, Debug)]
pub struct Player {
    #[primary_key]
    #[auto_inc]
    pub id: u64,

    #[index(btree)]
    pub room_id: u64,

    pub name: String,

    /// Browser/device that created this player, used to reconnect
    pub device_id: String,

    /// Persistent account, if signed in
    pub profile_id: Option<String>,

    pub joined_at: Timestamp,

    /// Presence heartbeat
    pub last_seen: Timestamp,
}

/// Turn rotation and finish tracking of one room
#[table(name = room_state, public)]
#[derive(Clone, Debug)]
pub struct RoomState {
    #[primary_key]
    pub room_id: u64,

    pub host_player_id: Option<u64>,

    pub started: bool,

    /// Only this player may roll, choose or end a round
    pub turn_player_id: Option<u64>,

    /// Rotation, duplicate-free; shrinks when players leave or are eliminated
    pub turn_order: Vec<u64>,

    pub round_counts: Vec<RoundCount>,

    /// Turn order at start, kept for the match record
    pub entrants: Vec<Entrant>,

    /// Someone completed their grid; the final lap is running
    pub finish_triggered: bool,

    /// Whose end of round closes the game
    pub finish_until_player_id: Option<u64>,

    pub finish_winner_ids: Vec<u64>,

    /// Match recorded for the current game (finalize guard)
    pub match_id: Option<u64>,

    pub started_at: Option<Timestamp>,
    pub finalized_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}

/// Grid and dice of one player, readable by spectators
#[table(name = player_state, public)]
#[derive(Clone, Debug)]
pub struct PlayerState {
    #[primary_key]
    pub player_id: u64,

    #[index(btree)]
    pub room_id: u64,

    pub grid: Grid,

    pub turn: DiceTurn,

    pub updated_at: Timestamp,
}

/// One finished casual game
#[table(name = game_match, public)]
pub struct GameMatch {
    #[primary_key]
    #[auto_inc]
    pub id: u64,

    pub room_id: u64,

    pub ended_at: Timestamp,

    /// Leaderboard period, YYYY-MM
    pub month_key: String,

    pub total_players: u32,

    pub winner_count: u32,
}

/// One participant's outcome of a match or Blitz event
#[table(name = match_player, public)]
#[derive(Clone, Debug)]
pub struct MatchPlayer {
    #[primary_key]
    #[auto_inc]
    pub id: u64,

    /// Set for casual matches
    pub match_id: Option<u64>,

    /// Set for Blitz payouts
    pub blitz_event_id: Option<u64>,

    pub room_id: u64,

    pub player_id: Option<u64>,

    pub profile_id: Option<String>,

    /// Name at the time of the match (denormalized for display)
    pub display_name: String,

    pub is_winner: bool,

    /// Completed rounds; None for Blitz payouts
    pub rounds: Option<u32>,

    pub points_awarded: f64,

    #[index(btree)]
    pub month_key: String,

    pub created_at: Timestamp,
}

/// Latest display name of each account
#[table(name = profile, public)]
pub struct Profile {
    #[primary_key]
    pub id: String,

    pub display_name: String,

    pub updated_at: Timestamp,
}

/// Monthly standings, rebuilt after every payout
#[table(name = leaderboard_entry, public)]
pub struct LeaderboardEntry {
    #[primary_key]
    #[auto_inc]
    pub id: u64,

    #[index(btree)]
    pub month_key: String,

    /// 1-based; ties share a position
    pub position: u32,

    pub profile_id: String,

    pub display_name: String,

    pub points: f64,

    pub wins: u32,

    pub matches: u32,
}

/// Schedule table for cleanup tasks
#[table(name = cleanup_schedule, scheduled(cleanup_stale_rooms))]
pub struct CleanupSchedule {
    #[primary_key]
    #[auto_inc]
    pub id: u64,

    pub scheduled_at: ScheduleAt,
}

// ==================== HELPERS ====================

/// Player bound to the calling connection
fn get_player(ctx: &ReducerContext) -> Result<Player, String> {
    let session = ctx.db.session()
        .connection_id()
        .find(&ctx.sender)
        .ok_or("Not in a room")?;
    ctx.db.player()
        .id()
        .find(&session.player_id)
        .ok_or_else(|| "Player not found".to_string())
}

fn generate_room_code(ctx: &ReducerContext) -> Result<String, String> {
    let mut rng = ctx.rng();
    for _ in 0..ROOM_CODE_ATTEMPTS {
        let code: String = (0..ROOM_CODE_LEN)
            .map(|_| ROOM_CODE_CHARS[rng.gen_range(0..ROOM_CODE_CHARS.len())] as char)
            .collect();
        if ctx.db.room().code().find(&code).is_none() {
            return Ok(code);
        }
    }
    log::error!("[ROOM] no free room code after {} attempts", ROOM_CODE_ATTEMPTS);
    Err("Could not allocate a room code".to_string())
}

fn clean_name(name: &str) -> Result<String, String> {
    let name: String = name.trim().chars().take(MAX_NAME_LEN).collect();
    if name.is_empty() {
        return Err("Name is required".to_string());
    }
    Ok(name)
}

fn upsert_profile(ctx: &ReducerContext, profile_id: &str, display_name: &str) {
    match ctx.db.profile().id().find(&profile_id.to_string()) {
        Some(mut existing) => {
            if existing.display_name != display_name {
                existing.display_name = display_name.to_string();
                existing.updated_at = ctx.timestamp;
                ctx.db.profile().id().update(existing);
            }
        }
        None => {
            ctx.db.profile().insert(Profile {
                id: profile_id.to_string(),
                display_name: display_name.to_string(),
                updated_at: ctx.timestamp,
            });
        }
    }
}

/// Bind the calling connection to `player_id`, replacing stale sessions
fn bind_session(ctx: &ReducerContext, player_id: u64) {
    let stale: Vec<Identity> = ctx.db.session()
        .iter()
        .filter(|s| s.player_id == player_id || s.connection_id == ctx.sender)
        .map(|s| s.connection_id)
        .collect();
    for conn_id in stale {
        ctx.db.session().connection_id().delete(&conn_id);
    }
    ctx.db.session().insert(Session {
        connection_id: ctx.sender,
        player_id,
        connected_at: ctx.timestamp,
    });
}

/// Clear a player's grid and dice
pub(crate) fn reset_player_state(ctx: &ReducerContext, player_id: u64, room_id: u64) {
    let fresh = PlayerState {
        player_id,
        room_id,
        grid: Grid::empty(),
        turn: DiceTurn::default(),
        updated_at: ctx.timestamp,
    };
    if ctx.db.player_state().player_id().find(&player_id).is_some() {
        ctx.db.player_state().player_id().update(fresh);
    } else {
        ctx.db.player_state().insert(fresh);
    }
}

/// Join `room` from this device, reconnecting to an existing player when the
/// device has been here before. Players joining a started game spectate.
pub(crate) fn enter_room(
    ctx: &ReducerContext,
    room: &Room,
    name: String,
    device_id: String,
    profile_id: Option<String>,
) -> Result<Player, String> {
    let name = clean_name(&name)?;
    let device_id = device_id.trim().to_string();
    if device_id.is_empty() {
        return Err("Device id is required".to_string());
    }
    let profile_id = profile_id.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());

    let existing = ctx.db.player()
        .room_id()
        .filter(&room.id)
        .find(|p| p.device_id == device_id);

    let player = match existing {
        Some(mut player) => {
            player.name = name;
            if profile_id.is_some() {
                player.profile_id = profile_id;
            }
            player.last_seen = ctx.timestamp;
            ctx.db.player().id().update(player.clone());
            log::info!("[ROOM] reconnected player_id={} room={}", player.id, room.code);
            player
        }
        None => {
            let player = ctx.db.player().insert(Player {
                id: 0, // auto_inc
                room_id: room.id,
                name,
                device_id,
                profile_id,
                joined_at: ctx.timestamp,
                last_seen: ctx.timestamp,
            });
            log::info!("[ROOM] joined player_id={} room={}", player.id, room.code);
            player
        }
    };

    if ctx.db.player_state().player_id().find(&player.id).is_none() {
        reset_player_state(ctx, player.id, room.id);
    }

    match ctx.db.room_state().room_id().find(&room.id) {
        Some(mut state) => {
            let mut changed = false;
            if state.host_player_id.is_none() && room.kind == RoomKind::Casual {
                state.host_player_id = Some(player.id);
                changed = true;
            }
            // Turn order only grows before the game starts
            if !state.started && !state.turn_order.contains(&player.id) {
                state.turn_order.push(player.id);
                changed = true;
            }
            if changed {
                state.updated_at = ctx.timestamp;
                ctx.db.room_state().room_id().update(state);
            }
        }
        None => {
            let host = (room.kind == RoomKind::Casual).then_some(player.id);
            let mut state = RoomState::fresh(room.id, host, ctx.timestamp);
            state.turn_order.push(player.id);
            ctx.db.room_state().insert(state);
        }
    }

    if let Some(profile_id) = &player.profile_id {
        upsert_profile(ctx, profile_id, &player.name);
    }
    bind_session(ctx, player.id);
    Ok(player)
}

fn refuse(player: &Player, action: &str, err: TurnError) -> String {
    log::warn!("[TURN] refused {} player_id={} room_id={}: {}", action, player.id, player.room_id, err);
    err.to_string()
}

/// Everything a turn action needs, after the single-writer check
fn load_turn(ctx: &ReducerContext, action: &str) -> Result<(Player, Room, RoomState, PlayerState), String> {
    let player = get_player(ctx)?;
    let room = ctx.db.room().id().find(&player.room_id).ok_or("Room not found")?;
    let state = ctx.db.room_state().room_id().find(&room.id).ok_or("Room state not found")?;
    state.ensure_turn(player.id).map_err(|e| refuse(&player, action, e))?;
    let player_state = ctx.db.player_state()
        .player_id()
        .find(&player.id)
        .ok_or("Player state not found")?;
    Ok((player, room, state, player_state))
}

// ==================== LIFECYCLE ====================

/// Initialize module - seed config and scheduled tasks
#[reducer(init)]
pub fn init(ctx: &ReducerContext) {
    // In init, ctx.sender is the module owner identity
    if ctx.db.authorized_worker().identity().find(&ctx.sender).is_none() {
        ctx.db.authorized_worker().insert(AuthorizedWorker {
            identity: ctx.sender,
        });
    }

    let config = ensure_config(ctx);

    ensure_schedules(ctx, &config);

    log::info!("[CONFIG] module initialized");
}

fn ensure_schedules(ctx: &ReducerContext, config: &GameConfig) {
    // Avoid duplicate schedulers on hot-reload
    if ctx.db.cleanup_schedule().iter().count() == 0 {
        ctx.db.cleanup_schedule().insert(CleanupSchedule {
            id: 0, // auto_inc
            scheduled_at: ScheduleAt::Interval(std::time::Duration::from_secs(config.scheduler_interval_secs).into()),
        });
    }
    blitz::ensure_blitz_schedule(ctx, config);
}

/// Replace every scheduled row so the current interval takes effect
pub(crate) fn restart_schedules(ctx: &ReducerContext, config: &GameConfig) {
    let cleanup: Vec<u64> = ctx.db.cleanup_schedule().iter().map(|s| s.id).collect();
    for id in cleanup {
        ctx.db.cleanup_schedule().id().delete(&id);
    }
    blitz::clear_blitz_schedule(ctx);
    ensure_schedules(ctx, config);
    log::info!("[CONFIG] schedules restarted every {}s", config.scheduler_interval_secs);
}

/// Drop the connection binding; the player stays in the room
#[reducer(client_disconnected)]
pub fn on_disconnect(ctx: &ReducerContext) {
    if let Some(session) = ctx.db.session().connection_id().find(&ctx.sender) {
        let minutes = ctx.timestamp.duration_since(session.connected_at)
            .map(|d| d.as_secs_f32() / 60.0)
            .unwrap_or(0.0);
        log::info!("[SESSION] closed player_id={} session_min={:.1}", session.player_id, minutes);
        ctx.db.session().connection_id().delete(&ctx.sender);
    }
}

// ==================== ROOMS ====================

/// Create a casual room and join it as host
#[reducer]
pub fn create_room(ctx: &ReducerContext, name: String, device_id: String, profile_id: Option<String>) -> Result<(), String> {
    let code = generate_room_code(ctx)?;
    let room = ctx.db.room().insert(Room {
        id: 0, // auto_inc
        code: code.clone(),
        kind: RoomKind::Casual,
        created_at: ctx.timestamp,
    });
    log::info!("[ROOM] created room_id={} code={}", room.id, code);
    enter_room(ctx, &room, name, device_id, profile_id)?;
    Ok(())
}

/// Join a room by code (case-insensitive)
#[reducer]
pub fn join_room(ctx: &ReducerContext, code: String, name: String, device_id: String, profile_id: Option<String>) -> Result<(), String> {
    let code = code.trim().to_uppercase();
    let room = ctx.db.room().code().find(&code).ok_or("Room not found")?;
    enter_room(ctx, &room, name, device_id, profile_id)?;
    Ok(())
}

/// Leave the current room for good
#[reducer]
pub fn leave_room(ctx: &ReducerContext) -> Result<(), String> {
    let player = get_player(ctx)?;
    let room_id = player.room_id;

    ctx.db.player().id().delete(&player.id);
    ctx.db.player_state().player_id().delete(&player.id);
    let sessions: Vec<Identity> = ctx.db.session()
        .player_id()
        .filter(&player.id)
        .map(|s| s.connection_id)
        .collect();
    for conn_id in sessions {
        ctx.db.session().connection_id().delete(&conn_id);
    }

    let kind = ctx.db.room().id().find(&room_id).map(|r| r.kind);

    if let Some(mut state) = ctx.db.room_state().room_id().find(&room_id) {
        let departure = state.remove_from_order(player.id, ctx.timestamp);
        if state.host_player_id == Some(player.id) {
            state.host_player_id = ctx.db.player()
                .room_id()
                .filter(&room_id)
                .min_by_key(|p| (p.joined_at, p.id))
                .map(|p| p.id);
        }
        match departure {
            // Entrants still hold the leaver, so they are paid with the rest
            Departure::CloseMatch if kind == Some(RoomKind::Casual) => {
                log::info!("[ROOM] player_id={} left on the last turn of the final lap", player.id);
                let config = GameConfig::load(ctx);
                finalize_match(ctx, &mut state, &config);
            }
            Departure::CloseMatch | Departure::Emptied if state.turn_order.is_empty() => {
                log::info!("[ROOM] room_id={} emptied mid-game; back to lobby", room_id);
                state.reset_unstarted(ctx.timestamp);
            }
            _ => {}
        }
        state.updated_at = ctx.timestamp;
        ctx.db.room_state().room_id().update(state);
    }

    if kind == Some(RoomKind::Blitz) {
        blitz::release_player(ctx, player.id);
    }

    log::info!("[ROOM] left player_id={} room_id={}", player.id, room_id);
    Ok(())
}

/// Presence heartbeat
#[reducer]
pub fn touch_player(ctx: &ReducerContext) -> Result<(), String> {
    let mut player = get_player(ctx)?;
    player.last_seen = ctx.timestamp;
    ctx.db.player().id().update(player);
    Ok(())
}

/// Host starts the game: shuffled turn order, fresh grids
#[reducer]
pub fn start_game(ctx: &ReducerContext) -> Result<(), String> {
    let player = get_player(ctx)?;
    let room = ctx.db.room().id().find(&player.room_id).ok_or("Room not found")?;
    if room.kind != RoomKind::Casual {
        return Err("Blitz rooms start on schedule".to_string());
    }
    let mut state = ctx.db.room_state().room_id().find(&room.id).ok_or("Room state not found")?;
    if state.host_player_id != Some(player.id) {
        log::warn!("[ROOM] non-host player_id={} tried to start room_id={}", player.id, room.id);
        return Err("Only the host can start the game".to_string());
    }
    if state.started {
        return Err("Game already started".to_string());
    }

    let mut players: Vec<Player> = ctx.db.player().room_id().filter(&room.id).collect();
    players.sort_by_key(|p| (p.joined_at, p.id));

    let mut rng = ctx.rng();
    turn::shuffle(&mut players, |n| rng.gen_range(0..n));

    let entrants: Vec<Entrant> = players
        .iter()
        .map(|p| Entrant { player_id: p.id, name: p.name.clone(), profile_id: p.profile_id.clone() })
        .collect();
    let order: Vec<u64> = players.iter().map(|p| p.id).collect();
    for pid in &order {
        reset_player_state(ctx, *pid, room.id);
    }

    state.begin(order, entrants, ctx.timestamp);
    let first = state.turn_player_id;
    ctx.db.room_state().room_id().update(state);

    log::info!("[ROOM] started room_id={} players={} first={:?}", room.id, players.len(), first);
    Ok(())
}

/// Clear your own grid while waiting for a game
#[reducer]
pub fn reset_progress(ctx: &ReducerContext) -> Result<(), String> {
    let player = get_player(ctx)?;
    let started = ctx.db.room_state()
        .room_id()
        .find(&player.room_id)
        .is_some_and(|s| s.started);
    if started {
        return Err("Cannot reset during a game".to_string());
    }
    reset_player_state(ctx, player.id, player.room_id);
    Ok(())
}

// ==================== TURNS ====================

/// Roll: fresh dice from idle, otherwise re-roll the unlocked dice
#[reducer]
pub fn roll_dice(ctx: &ReducerContext) -> Result<(), String> {
    let (player, _room, mut state, mut ps) = load_turn(ctx, "roll")?;

    let mut rng = ctx.rng();
    let outcome = ps.turn
        .roll(&mut ps.grid, || rng.gen_range(1..=6))
        .map_err(|e| refuse(&player, "roll", e))?;

    if outcome.applied > 0 && ps.grid.is_won() && state.record_win(player.id) {
        log::info!(
            "[TURN] grid complete player_id={} room_id={} final_lap_until={:?}",
            player.id, player.room_id, state.finish_until_player_id
        );
        state.updated_at = ctx.timestamp;
        ctx.db.room_state().room_id().update(state);
    }

    log::debug!(
        "[TURN] roll player_id={} dice={:?} gain={} applied={} phase={:?} segment_done={} rows_done={}",
        player.id, ps.turn.dice, outcome.gain, outcome.applied, outcome.phase, outcome.segment_complete,
        ps.grid.completed_rows()
    );
    ps.updated_at = ctx.timestamp;
    ctx.db.player_state().player_id().update(ps);
    Ok(())
}

/// Pick the row to fill this turn segment
#[reducer]
pub fn choose_target(ctx: &ReducerContext, target: u8) -> Result<(), String> {
    let (player, _room, _state, mut ps) = load_turn(ctx, "choose_target")?;
    let preview = ps.turn
        .choose_target(&ps.grid, target)
        .map_err(|e| refuse(&player, "choose_target", e))?;
    log::debug!("[TURN] target player_id={} target={} preview_gain={}", player.id, target, preview);
    ps.updated_at = ctx.timestamp;
    ctx.db.player_state().player_id().update(ps);
    Ok(())
}

/// Finish the turn after an empty roll; may close the match
#[reducer]
pub fn end_round(ctx: &ReducerContext) -> Result<(), String> {
    let (player, room, mut state, mut ps) = load_turn(ctx, "end_round")?;
    ps.turn.end_round().map_err(|e| refuse(&player, "end_round", e))?;
    ps.updated_at = ctx.timestamp;
    ctx.db.player_state().player_id().update(ps);

    let room_id = room.id;
    let end = state.complete_round(
        player.id,
        |pid| ctx.db.player().id().find(&pid).is_some_and(|p| p.room_id == room_id),
        ctx.timestamp,
    );
    log::info!(
        "[TURN] round done player_id={} rounds={} next={:?}",
        player.id, end.rounds, end.next_player
    );

    if end.finalize && room.kind == RoomKind::Casual {
        let config = GameConfig::load(ctx);
        finalize_match(ctx, &mut state, &config);
    }
    ctx.db.room_state().room_id().update(state);
    Ok(())
}

// ==================== SCHEDULED ====================

/// Delete rooms that have sat empty, and old delivered pushes
#[reducer]
pub fn cleanup_stale_rooms(ctx: &ReducerContext, _schedule: CleanupSchedule) {
    // Only allow scheduler to call this, not clients
    if ctx.sender != ctx.identity() {
        log::warn!("Client {} attempted to call cleanup_stale_rooms", ctx.sender);
        return;
    }

    let now = ctx.timestamp;
    let rooms: Vec<Room> = ctx.db.room().iter().collect();
    for room in rooms {
        if ctx.db.player().room_id().filter(&room.id).next().is_some() {
            continue;
        }
        let last_activity = ctx.db.room_state()
            .room_id()
            .find(&room.id)
            .map(|s| s.updated_at.max(room.created_at))
            .unwrap_or(room.created_at);
        let idle_secs = now.duration_since(last_activity).map(|d| d.as_secs()).unwrap_or(0);
        if idle_secs <= EMPTY_ROOM_TTL_SECS || blitz::is_live_blitz_room(ctx, room.id) {
            continue;
        }

        let orphaned: Vec<u64> = ctx.db.player_state()
            .room_id()
            .filter(&room.id)
            .map(|ps| ps.player_id)
            .collect();
        for pid in orphaned {
            ctx.db.player_state().player_id().delete(&pid);
        }
        ctx.db.room_state().room_id().delete(&room.id);
        ctx.db.room().id().delete(&room.id);
        log::info!("[CLEANUP] closed room_id={} code={} idle_sec={}", room.id, room.code, idle_secs);
    }

    let pruned = notify::prune_sent(ctx, now);
    if pruned > 0 {
        log::info!("[CLEANUP] pruned {} delivered pushes", pruned);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name("  Ada  "), Ok("Ada".to_string()));
        assert!(clean_name("   ").is_err());
        let long = "x".repeat(40);
        assert_eq!(clean_name(&long).unwrap().chars().count(), MAX_NAME_LEN);
        // Multi-byte names are cut on character boundaries
        assert_eq!(clean_name(&"å".repeat(30)).unwrap(), "å".repeat(MAX_NAME_LEN));
    }

    #[test]
    fn test_room_code_alphabet() {
        for c in ['I', 'O', '0', '1'] {
            assert!(!ROOM_CODE_CHARS.contains(&(c as u8)));
        }
        assert_eq!(ROOM_CODE_CHARS.len(), 32);
    }
}
