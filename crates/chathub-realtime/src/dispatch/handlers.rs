//! Built-in command handlers.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use serde_json::json;
use tracing::debug;

use crate::engine::PubSubEngine;
use crate::session::ClientSession;
use crate::wire::WireMessage;
use crate::wire::message::CMD_HELLO;

use super::dispatcher::{CommandHandler, HandlerFuture, Reply};

/// The command table every engine starts with.
pub fn builtin_handlers() -> HashMap<&'static str, CommandHandler> {
    let mut handlers: HashMap<&'static str, CommandHandler> = HashMap::new();
    handlers.insert(CMD_HELLO, handle_hello);
    handlers.insert("sub", handle_sub);
    handlers.insert("unsub", handle_unsub);
    handlers.insert("track_follow", handle_track_follow);
    handlers.insert("emote_stats", handle_emote_stats);
    handlers
}

/// `hello ["<client version>", <client-id or null>]`
///
/// Must be the first command on a connection. Records the protocol version,
/// joins the global broadcast set, and replies with the endpoint id the
/// client should present on reconnect.
fn handle_hello<'a>(
    engine: &'a PubSubEngine,
    session: &'a Arc<ClientSession>,
    msg: &'a WireMessage,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let (version, _client_id) = msg.args_two_strings()?;

        {
            let mut fields = session.state.lock().await;
            fields.protocol_version = version.to_string();
        }

        engine.registry.subscribe_global(&session.endpoint).await;

        debug!(
            endpoint = %session.endpoint.id,
            version = %version,
            "client said hello"
        );
        Ok(Reply::Ok(Some(json!(session.endpoint.id.to_string()))))
    })
}

/// `sub "<topic>"` — join a topic.
fn handle_sub<'a>(
    engine: &'a PubSubEngine,
    session: &'a Arc<ClientSession>,
    msg: &'a WireMessage,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let topic = msg.args_string()?;

        engine.registry.subscribe(topic, &session.endpoint).await;

        let mut fields = session.state.lock().await;
        if fields.current_channels.insert(topic.to_string()) {
            fields.pending_subscriptions.push(topic.to_string());
        }

        Ok(Reply::Ok(None))
    })
}

/// `unsub "<topic>"` — leave a topic. The record itself stays for the
/// janitor to reclaim.
fn handle_unsub<'a>(
    engine: &'a PubSubEngine,
    session: &'a Arc<ClientSession>,
    msg: &'a WireMessage,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let topic = msg.args_string()?;

        engine
            .registry
            .unsubscribe(topic, session.endpoint.id)
            .await;

        let mut fields = session.state.lock().await;
        fields.current_channels.remove(topic);
        fields.pending_subscriptions.retain(|t| t != topic);

        Ok(Reply::Ok(None))
    })
}

/// `track_follow ["<channel>", <following>]` — follow-state report.
/// Acknowledged and logged; follow analytics live outside this server.
fn handle_track_follow<'a>(
    _engine: &'a PubSubEngine,
    session: &'a Arc<ClientSession>,
    msg: &'a WireMessage,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let (channel, following) = msg.args_string_bool()?;
        debug!(
            endpoint = %session.endpoint.id,
            channel = %channel,
            following,
            "follow state reported"
        );
        Ok(Reply::Ok(None))
    })
}

/// `emote_stats ["<emote>", <uses>]` — usage report, aggregated off the
/// supervisor task; the reply is posted through the endpoint.
fn handle_emote_stats<'a>(
    engine: &'a PubSubEngine,
    session: &'a Arc<ClientSession>,
    msg: &'a WireMessage,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let (emote, uses) = msg.args_string_int()?;
        let uses = u64::try_from(uses)
            .map_err(|_| chathub_core::error::AppError::validation("Error: negative count."))?;

        let reply_id = msg.id;
        let emote = emote.to_string();
        let metrics = Arc::clone(&engine.metrics);
        let job_session = Arc::clone(session);
        let mut done = session.done_signal();

        session.jobs.spawn(async move {
            tokio::select! {
                _ = done.changed() => {}
                _ = async {
                    metrics.emote_uses.fetch_add(uses, Ordering::Relaxed);
                    debug!(emote = %emote, uses, "emote usage recorded");
                    let _ = job_session
                        .endpoint
                        .send(super::dispatcher::ok_frame(reply_id, None))
                        .await;
                } => {}
            }
        });

        Ok(Reply::Deferred)
    })
}
