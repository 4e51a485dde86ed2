use crate::websocket::{ConnectionId, PresenceRegistry, WsInboundEvent, WsOutboundEvent};
use actix::{Actor, ActorContext, AsyncContext, StreamHandler};
use actix_web_actors::ws;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

/// One live WebSocket connection for one user.
///
/// The session owns the receiving half of its registry channel; events
/// pushed through the registry are forwarded to the socket as text frames.
/// Stopping the actor (close frame, missed heartbeats, network drop)
/// detaches the connection from the registry.
pub struct WsSession {
    user_id: Uuid,
    connection_id: ConnectionId,
    registry: PresenceRegistry,
    rx: Option<UnboundedReceiver<String>>,
    heartbeat_interval: Duration,
    client_timeout: Duration,
    hb: Instant,
}

impl WsSession {
    pub fn new(
        user_id: Uuid,
        connection_id: ConnectionId,
        registry: PresenceRegistry,
        rx: UnboundedReceiver<String>,
        heartbeat_interval: Duration,
        client_timeout: Duration,
    ) -> Self {
        Self {
            user_id,
            connection_id,
            registry,
            rx: Some(rx),
            heartbeat_interval,
            client_timeout,
            hb: Instant::now(),
        }
    }

    fn start_heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let timeout = self.client_timeout;
        ctx.run_interval(self.heartbeat_interval, move |act, ctx| {
            if Instant::now().duration_since(act.hb) > timeout {
                tracing::warn!(user_id = %act.user_id, "websocket heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn handle_inbound(&self, event: WsInboundEvent) {
        match event {
            WsInboundEvent::Typing { peer_id } => {
                let registry = self.registry.clone();
                let sender_id = self.user_id;
                actix::spawn(async move {
                    let event = WsOutboundEvent::Typing { sender_id };
                    match event.to_json() {
                        Ok(payload) => {
                            registry.notify(peer_id, &payload).await;
                        }
                        Err(e) => tracing::error!(error = %e, "failed to encode typing event"),
                    }
                });
            }
        }
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(user_id = %self.user_id, "websocket session started");
        self.start_heartbeat(ctx);

        if let Some(rx) = self.rx.take() {
            ctx.add_stream(UnboundedReceiverStream::new(rx));
        }
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(user_id = %self.user_id, "websocket session stopped");

        let registry = self.registry.clone();
        let connection_id = self.connection_id;
        actix::spawn(async move {
            registry.leave(connection_id).await;
        });
    }
}

/// Registry events bridged from the presence channel onto the socket.
impl StreamHandler<String> for WsSession {
    fn handle(&mut self, payload: String, ctx: &mut Self::Context) {
        ctx.text(payload);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(payload)) => {
                self.hb = Instant::now();
                ctx.pong(&payload);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<WsInboundEvent>(&text) {
                Ok(event) => self.handle_inbound(event),
                Err(e) => {
                    tracing::warn!(user_id = %self.user_id, error = %e, "unparseable ws message");
                }
            },
            Ok(ws::Message::Binary(_)) => {
                tracing::warn!("binary websocket messages not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::debug!(?reason, "websocket close received");
                ctx.stop();
            }
            _ => {}
        }
    }
}
