use crate::state::AppState;
use crate::websocket::session::WsSession;
use actix_web::{get, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// The user this connection represents. The upstream gateway has
    /// already authenticated the session before the upgrade reaches us.
    pub user_id: Uuid,
}

/// WebSocket endpoint
/// GET /ws?user_id=...
///
/// The connection joins the presence registry under the announced user and
/// from then on receives push events for that user until it disconnects.
#[get("/ws")]
pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
    query: web::Query<WsParams>,
) -> Result<HttpResponse, Error> {
    let params = query.into_inner();

    let (connection_id, rx) = state.presence.join(params.user_id).await;

    let session = WsSession::new(
        params.user_id,
        connection_id,
        state.presence.clone(),
        rx,
        state.config.ws_heartbeat,
        state.config.ws_client_timeout,
    );

    ws::start(session, &req, stream)
}
