use crate::error::AppError;
use crate::middleware::guards::User;
use crate::models::Message;
use crate::state::AppState;
use actix_web::{get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==================== Request/Response Types ====================

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub receiver_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub nonce: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: i64,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    pub created_at: String,
}

impl From<&Message> for MessageResponse {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            content: message.content.clone(),
            nonce: message.nonce.clone(),
            created_at: message.created_at.to_rfc3339(),
        }
    }
}

// ==================== Message Endpoints ====================

/// Send a message to a contact
/// POST /api/v1/messages
#[post("/messages")]
pub async fn send_message(
    state: web::Data<AppState>,
    user: User,
    body: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let message = state
        .delivery
        .send(user.id, body.receiver_id, body.content, body.nonce)
        .await?;

    Ok(HttpResponse::Created().json(MessageResponse::from(&message)))
}

/// Fetch the full conversation with a peer, oldest first
/// GET /api/v1/conversations/{peer_id}
#[get("/conversations/{peer_id}")]
pub async fn get_conversation(
    state: web::Data<AppState>,
    user: User,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let peer_id = path.into_inner();
    let messages = state.delivery.conversation(user.id, peer_id).await?;
    let response: Vec<MessageResponse> = messages.iter().map(MessageResponse::from).collect();

    Ok(HttpResponse::Ok().json(response))
}

/// Configure message routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(send_message).service(get_conversation);
}
