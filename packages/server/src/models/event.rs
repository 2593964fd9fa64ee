use chrono::{DateTime, Utc};
use common::{EventKind, VerificationStatus};
use serde::{Deserialize, Serialize};

use super::shared::{validate_optional_text, validate_text};
use crate::entity::{event, event_registration};
use crate::error::AppError;
use crate::extractors::json::Validate;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateEventRequest {
    /// URL slug: lowercase letters, digits and `-`.
    #[schema(example = "grand-seminar-2025")]
    pub slug: String,
    #[schema(example = "Grand Seminar")]
    pub title: String,
    pub kind: EventKind,
    #[serde(default)]
    pub description: String,
    #[schema(example = "Aula Barat ITB")]
    pub venue: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// Maximum number of non-rejected tickets; omit for unlimited.
    #[schema(example = 300)]
    pub capacity: Option<i32>,
    /// Ticket price in rupiah; 0 for free events.
    #[schema(example = 50000)]
    pub price: i64,
    pub is_active: Option<bool>,
}

impl Validate for CreateEventRequest {
    fn validate(&self) -> Result<(), AppError> {
        validate_slug(&self.slug)?;
        validate_text(&self.title, "Title", 256)?;
        validate_text(&self.venue, "Venue", 256)?;
        if self.description.len() > 100_000 {
            return Err(AppError::Validation(
                "Description must be at most 100KB".into(),
            ));
        }
        if self.ends_at <= self.starts_at {
            return Err(AppError::Validation(
                "ends_at must be after starts_at".into(),
            ));
        }
        if let Some(capacity) = self.capacity
            && capacity < 1
        {
            return Err(AppError::Validation("capacity must be >= 1".into()));
        }
        if self.price < 0 {
            return Err(AppError::Validation("price must be >= 0".into()));
        }
        Ok(())
    }
}

pub fn validate_slug(slug: &str) -> Result<(), AppError> {
    if slug.is_empty()
        || slug.len() > 64
        || slug.starts_with('-')
        || slug.ends_with('-')
        || !slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(AppError::Validation(
            "Slug must be 1-64 lowercase letters, digits or '-'".into(),
        ));
    }
    Ok(())
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct EventResponse {
    pub id: i32,
    #[schema(example = "grand-seminar-2025")]
    pub slug: String,
    #[schema(example = "Grand Seminar")]
    pub title: String,
    pub kind: EventKind,
    pub description: String,
    pub venue: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub capacity: Option<i32>,
    /// Seats left, when the event has a capacity.
    pub seats_left: Option<i64>,
    pub price: i64,
    pub is_active: bool,
}

impl EventResponse {
    /// `taken` counts pending and approved tickets.
    pub fn new(m: event::Model, taken: i64) -> Self {
        Self {
            id: m.id,
            slug: m.slug,
            title: m.title,
            kind: m.kind,
            description: m.description,
            venue: m.venue,
            starts_at: m.starts_at,
            ends_at: m.ends_at,
            capacity: m.capacity,
            seats_left: m.capacity.map(|c| (i64::from(c) - taken).max(0)),
            price: m.price,
            is_active: m.is_active,
        }
    }
}

/// Request body for buying a ticket. Attendee name defaults to the account name.
#[derive(Deserialize, Default, utoipa::ToSchema)]
#[serde(default)]
pub struct RegisterTicketRequest {
    #[schema(example = "Ana Putri")]
    pub attendee_name: Option<String>,
}

impl Validate for RegisterTicketRequest {
    fn validate(&self) -> Result<(), AppError> {
        validate_optional_text(self.attendee_name.as_deref(), "Attendee name", 100)
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TicketResponse {
    pub id: i32,
    pub event_id: i32,
    pub event_slug: String,
    pub event_title: String,
    pub attendee_name: String,
    pub attendee_email: String,
    pub status: VerificationStatus,
    pub amount_due: i64,
    pub has_payment_proof: bool,
    /// Present once the ticket is approved.
    #[schema(example = "SBX-7KQ2M9XD4A")]
    pub ticket_code: Option<String>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TicketResponse {
    pub fn new(t: event_registration::Model, event: &event::Model) -> Self {
        Self {
            id: t.id,
            event_id: t.event_id,
            event_slug: event.slug.clone(),
            event_title: event.title.clone(),
            attendee_name: t.attendee_name,
            attendee_email: t.attendee_email,
            status: t.status,
            amount_due: t.amount_due,
            has_payment_proof: t.payment_proof_key.is_some(),
            ticket_code: t.ticket_code,
            checked_in_at: t.checked_in_at,
            created_at: t.created_at,
        }
    }
}
