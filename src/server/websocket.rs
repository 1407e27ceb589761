//! Presence websocket
//!
//! ## Protocol
//!
//! Connect: `ws://host/ws?token=<jwt>` (or an `Authorization` header)
//!
//! Client → server:
//! - `{"type":"join","userId":"…"}` - register a live channel for a user
//! - `{"type":"leave"}` - drop the channel, keep the socket
//! - `{"type":"ping"}`
//!
//! Server → client:
//! - `{"type":"joined","userId":"…"}`
//! - `{"type":"notification","notification":{…}}`
//! - `{"type":"pong"}`
//! - `{"type":"error","message":"…"}`
//!
//! Only admins may join a channel other than their own. The channel is
//! removed when the socket closes.

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::{Request, Response};
use std::sync::Arc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use crate::auth::{extract_token_from_header, extract_token_from_query, Caller};
use crate::notify::{ChannelId, ClientFrame, PresenceRegistry, ServerFrame};
use crate::routes;
use crate::server::AppState;
use crate::types::{BulletinError, ChannelKey, Result};

/// WebSocket type after upgrade
type HyperWebSocket =
    hyper_tungstenite::WebSocketStream<hyper_util::rt::TokioIo<hyper::upgrade::Upgraded>>;

type WsSink = SplitSink<HyperWebSocket, WsMessage>;

/// Authenticate and upgrade `/ws`
pub async fn handle_presence_upgrade(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let query_token = extract_token_from_query(req.uri().query(), "token");
    let header = req
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());
    let token = query_token.or_else(|| extract_token_from_header(header).map(str::to_string));

    let caller = match token {
        Some(token) => match state.authenticate_token(&token) {
            Ok(caller) => caller,
            Err(e) => return routes::error_response(&e),
        },
        None => {
            return routes::error_response(&BulletinError::Unauthorized(
                "No token provided".into(),
            ))
        }
    };

    let (response, websocket) = match hyper_tungstenite::upgrade(req, None) {
        Ok((resp, ws)) => (resp, ws),
        Err(e) => {
            error!("WebSocket upgrade failed: {}", e);
            return routes::error_response(&BulletinError::WebSocket(format!(
                "Upgrade failed: {}",
                e
            )));
        }
    };

    let presence = Arc::clone(&state.presence);
    tokio::spawn(async move {
        match websocket.await {
            Ok(ws) => {
                let ws: HyperWebSocket = ws;
                handle_presence_connection(ws, presence, caller).await;
            }
            Err(e) => {
                error!("WebSocket connection failed: {}", e);
            }
        }
    });

    let (parts, _body) = response.into_parts();
    Response::from_parts(parts, Full::new(Bytes::new()))
}

/// Channel this socket currently occupies
struct Membership {
    key: ChannelKey,
    id: ChannelId,
}

async fn handle_presence_connection(
    ws: HyperWebSocket,
    presence: Arc<PresenceRegistry>,
    caller: Caller,
) {
    let session_id = format!("ws_{}", uuid::Uuid::new_v4());
    info!(user = %caller.id, session = %session_id, "Presence socket connected");

    let mut membership: Option<Membership> = None;
    if let Err(e) = session(ws, &presence, &caller, &mut membership).await {
        warn!(user = %caller.id, session = %session_id, "Presence socket error: {}", e);
    }

    if let Some(m) = membership.take() {
        presence.leave(&m.key, m.id);
    }
    info!(user = %caller.id, session = %session_id, "Presence socket disconnected");
}

async fn session(
    ws: HyperWebSocket,
    presence: &PresenceRegistry,
    caller: &Caller,
    membership: &mut Option<Membership>,
) -> Result<()> {
    let (mut sink, mut stream) = ws.split();
    let (tx, mut rx) = presence.channel();

    loop {
        tokio::select! {
            frame = rx.recv() => {
                match frame {
                    Some(frame) => send_frame(&mut sink, &frame).await?,
                    None => break,
                }
            }

            msg = stream.next() => {
                match msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        debug!(user = %caller.id, "Received presence frame: {}", text);
                        let reply = match serde_json::from_str::<ClientFrame>(&text) {
                            Ok(frame) => apply(frame, presence, caller, membership, &tx),
                            Err(_) => Some(ServerFrame::error("Invalid message")),
                        };
                        if let Some(reply) = reply {
                            send_frame(&mut sink, &reply).await?;
                        }
                    }
                    Some(Ok(WsMessage::Ping(data))) => {
                        sink.send(WsMessage::Pong(data)).await?;
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                }
            }
        }
    }

    Ok(())
}

/// Apply a client frame; returns the reply, if any
fn apply(
    frame: ClientFrame,
    presence: &PresenceRegistry,
    caller: &Caller,
    membership: &mut Option<Membership>,
    tx: &tokio::sync::mpsc::Sender<ServerFrame>,
) -> Option<ServerFrame> {
    match frame {
        ClientFrame::Join { user_id } => {
            if user_id != caller.id && !caller.is_admin() {
                warn!(user = %caller.id, target = %user_id, "Join for another user refused");
                return Some(ServerFrame::error("Cannot join another user's channel"));
            }
            if let Some(m) = membership.take() {
                presence.leave(&m.key, m.id);
            }
            let key = ChannelKey::for_user(&user_id);
            let id = presence.join(key.clone(), tx.clone());
            *membership = Some(Membership { key, id });
            Some(ServerFrame::Joined { user_id })
        }
        ClientFrame::Leave => {
            if let Some(m) = membership.take() {
                presence.leave(&m.key, m.id);
            }
            None
        }
        ClientFrame::Ping => Some(ServerFrame::Pong),
    }
}

async fn send_frame(sink: &mut WsSink, frame: &ServerFrame) -> Result<()> {
    let json = serde_json::to_string(frame)?;
    sink.send(WsMessage::Text(json.into())).await?;
    Ok(())
}
