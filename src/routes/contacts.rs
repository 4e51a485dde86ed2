use crate::error::AppError;
use crate::middleware::guards::User;
use crate::models::{Contact, ContactStatus};
use crate::state::AppState;
use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==================== Request/Response Types ====================

#[derive(Debug, Deserialize)]
pub struct AddContactRequest {
    pub peer_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SetBlockedRequest {
    pub blocked: bool,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub peer_id: Uuid,
    pub status: ContactStatus,
    pub created_at: String,
}

impl From<&Contact> for ContactResponse {
    fn from(contact: &Contact) -> Self {
        Self {
            id: contact.id,
            owner_id: contact.owner_id,
            peer_id: contact.peer_id,
            status: contact.status,
            created_at: contact.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ContactPairResponse {
    pub contact: ContactResponse,
    pub peer_contact: ContactResponse,
}

// ==================== Contact Lifecycle Endpoints ====================

/// Send a contact request
/// POST /api/v1/contacts
#[post("/contacts")]
pub async fn add_contact(
    state: web::Data<AppState>,
    user: User,
    body: web::Json<AddContactRequest>,
) -> Result<HttpResponse, AppError> {
    let (own, mirror) = state.contacts.add_contact(user.id, body.peer_id).await?;

    Ok(HttpResponse::Created().json(ContactPairResponse {
        contact: ContactResponse::from(&own),
        peer_contact: ContactResponse::from(&mirror),
    }))
}

/// List all contacts owned by the caller
/// GET /api/v1/contacts
#[get("/contacts")]
pub async fn list_contacts(
    state: web::Data<AppState>,
    user: User,
) -> Result<HttpResponse, AppError> {
    let contacts = state.contacts.list_contacts(user.id).await?;
    let response: Vec<ContactResponse> = contacts.iter().map(ContactResponse::from).collect();

    Ok(HttpResponse::Ok().json(response))
}

/// List pending requests sent to the caller
/// GET /api/v1/contacts/incoming
#[get("/contacts/incoming")]
pub async fn incoming_requests(
    state: web::Data<AppState>,
    user: User,
) -> Result<HttpResponse, AppError> {
    let contacts = state.contacts.incoming_requests(user.id).await?;
    let response: Vec<ContactResponse> = contacts.iter().map(ContactResponse::from).collect();

    Ok(HttpResponse::Ok().json(response))
}

/// List pending requests the caller has sent
/// GET /api/v1/contacts/outgoing
#[get("/contacts/outgoing")]
pub async fn outgoing_requests(
    state: web::Data<AppState>,
    user: User,
) -> Result<HttpResponse, AppError> {
    let contacts = state.contacts.outgoing_requests(user.id).await?;
    let response: Vec<ContactResponse> = contacts.iter().map(ContactResponse::from).collect();

    Ok(HttpResponse::Ok().json(response))
}

/// Accept a pending incoming request
/// POST /api/v1/contacts/{contact_id}/accept
#[post("/contacts/{contact_id}/accept")]
pub async fn accept_request(
    state: web::Data<AppState>,
    user: User,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let contact_id = path.into_inner();
    let contact = state.contacts.accept_request(user.id, contact_id).await?;

    Ok(HttpResponse::Ok().json(ContactResponse::from(&contact)))
}

/// Reject a pending incoming request
/// POST /api/v1/contacts/{contact_id}/reject
#[post("/contacts/{contact_id}/reject")]
pub async fn reject_request(
    state: web::Data<AppState>,
    user: User,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let contact_id = path.into_inner();
    let contact = state.contacts.reject_request(user.id, contact_id).await?;

    Ok(HttpResponse::Ok().json(ContactResponse::from(&contact)))
}

/// Block or unblock a peer
/// PUT /api/v1/contacts/{peer_id}/block
#[put("/contacts/{peer_id}/block")]
pub async fn set_blocked(
    state: web::Data<AppState>,
    user: User,
    path: web::Path<Uuid>,
    body: web::Json<SetBlockedRequest>,
) -> Result<HttpResponse, AppError> {
    let peer_id = path.into_inner();
    let contact = state
        .contacts
        .set_blocked(user.id, peer_id, body.blocked)
        .await?;

    Ok(HttpResponse::Ok().json(ContactResponse::from(&contact)))
}

/// Delete the caller's own row for a peer
/// DELETE /api/v1/contacts/{peer_id}
#[delete("/contacts/{peer_id}")]
pub async fn delete_contact(
    state: web::Data<AppState>,
    user: User,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let peer_id = path.into_inner();
    state.contacts.delete_contact(user.id, peer_id).await?;

    Ok(HttpResponse::NoContent().finish())
}

/// Configure contact routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(add_contact)
        .service(list_contacts)
        .service(incoming_requests)
        .service(outgoing_requests)
        .service(accept_request)
        .service(reject_request)
        .service(set_blocked)
        .service(delete_contact);
}
