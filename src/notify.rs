// Web Push: subscriptions and the outbox an external worker drains.

use serde_json::json;
use spacetimedb::{client_visibility_filter, reducer, table, Filter, ReducerContext, Table, Timestamp};

use crate::authorized_worker;
use crate::config::GameConfig;

/// Sent rows are kept this long before cleanup prunes them
pub const SENT_RETENTION_SECS: i64 = 24 * 60 * 60;

/// Browser push subscription
/// PRIVATE: endpoints and keys never leave the module except through the outbox
#[table(name = push_subscription)]
#[derive(Clone)]
pub struct PushSubscription {
    #[primary_key]
    #[auto_inc]
    pub id: u64,

    #[unique]
    pub endpoint: String,

    pub p256dh: String,
    pub auth: String,

    /// Account that registered the subscription, if signed in
    pub profile_id: Option<String>,

    pub created_at: Timestamp,
}

/// One notification waiting for the push worker
/// SECURITY: Public table with RLS protection - only authorized workers can see rows
#[table(name = push_outbox, public)]
pub struct PushOutbox {
    #[primary_key]
    #[auto_inc]
    pub id: u64,

    pub subscription_id: u64,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,

    /// JSON: {title, body, url}
    pub payload: String,

    #[index(btree)]
    pub created_at: Timestamp,

    #[index(btree)]
    pub sent: bool,

    pub sent_at: Option<Timestamp>,

    /// Delivery error reported by the worker
    pub last_error: Option<String>,
}

/// RLS Filter: only authorized workers see queued pushes
#[client_visibility_filter]
const PUSH_OUTBOX_VISIBILITY: Filter = Filter::Sql(
    "SELECT po.* FROM push_outbox po
     JOIN authorized_worker aw WHERE aw.identity = :sender"
);

/// Register or refresh a push subscription for this browser
#[reducer]
pub fn register_push_subscription(
    ctx: &ReducerContext,
    endpoint: String,
    p256dh: String,
    auth: String,
    profile_id: Option<String>,
) -> Result<(), String> {
    let endpoint = endpoint.trim().to_string();
    if endpoint.is_empty() || p256dh.is_empty() || auth.is_empty() {
        return Err("Incomplete push subscription".to_string());
    }

    if let Some(mut existing) = ctx.db.push_subscription().endpoint().find(&endpoint) {
        existing.p256dh = p256dh;
        existing.auth = auth;
        if profile_id.is_some() {
            existing.profile_id = profile_id;
        }
        let id = existing.id;
        ctx.db.push_subscription().id().update(existing);
        log::info!("[PUSH] refreshed subscription_id={}", id);
    } else {
        let row = ctx.db.push_subscription().insert(PushSubscription {
            id: 0, // auto_inc
            endpoint,
            p256dh,
            auth,
            profile_id,
            created_at: ctx.timestamp,
        });
        log::info!("[PUSH] registered subscription_id={}", row.id);
    }
    Ok(())
}

/// Payload the service worker shows
pub fn reminder_payload(config: &GameConfig) -> String {
    json!({
        "title": config.notify_title,
        "body": config.notify_body,
        "url": config.notify_url,
    })
    .to_string()
}

/// Queue the Blitz reminder for every subscription. Returns how many were queued.
pub fn enqueue_blitz_reminder(ctx: &ReducerContext, config: &GameConfig) -> usize {
    let payload = reminder_payload(config);

    let mut queued = 0;
    for sub in ctx.db.push_subscription().iter() {
        ctx.db.push_outbox().insert(PushOutbox {
            id: 0, // auto_inc
            subscription_id: sub.id,
            endpoint: sub.endpoint.clone(),
            p256dh: sub.p256dh.clone(),
            auth: sub.auth.clone(),
            payload: payload.clone(),
            created_at: ctx.timestamp,
            sent: false,
            sent_at: None,
            last_error: None,
        });
        queued += 1;
    }
    queued
}

/// Close an outbox row (called by the push worker).
/// Failures are logged and not retried.
#[reducer]
pub fn mark_push_sent(ctx: &ReducerContext, outbox_id: u64, error: Option<String>) {
    if ctx.db.authorized_worker().identity().find(&ctx.sender).is_none() {
        log::warn!("[PUSH] unauthorized mark_push_sent attempt by {}", ctx.sender);
        return;
    }

    let Some(mut row) = ctx.db.push_outbox().id().find(&outbox_id) else {
        log::error!("[PUSH] mark_push_sent: outbox_id={} not found", outbox_id);
        return;
    };

    if let Some(err) = &error {
        log::warn!("[PUSH] delivery failed outbox_id={} subscription_id={}: {}", outbox_id, row.subscription_id, err);
    } else {
        log::debug!("[PUSH] delivered outbox_id={}", outbox_id);
    }
    row.sent = true;
    row.sent_at = Some(ctx.timestamp);
    row.last_error = error;
    ctx.db.push_outbox().id().update(row);
}

/// Delete delivered rows older than the retention window. Returns the count.
pub fn prune_sent(ctx: &ReducerContext, now: Timestamp) -> usize {
    let cutoff = now.to_micros_since_unix_epoch() - SENT_RETENTION_SECS * 1_000_000;
    let expired: Vec<u64> = ctx
        .db
        .push_outbox()
        .sent()
        .filter(&true)
        .filter(|row| row.sent_at.map_or(false, |t| t.to_micros_since_unix_epoch() < cutoff))
        .map(|row| row.id)
        .collect();
    for id in &expired {
        ctx.db.push_outbox().id().delete(id);
    }
    expired.len()
}
