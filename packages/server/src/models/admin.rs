use chrono::{DateTime, Utc};
use common::{Phase, VerificationStatus};
use serde::{Deserialize, Serialize};

use super::event::TicketResponse;
use super::registration::{RegistrationResponse, RegistrationSummary, SubmissionResponse};
use super::shared::{Pagination, validate_text};
use crate::error::AppError;
use crate::extractors::json::Validate;

/// Query parameters for the admin registration list.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct AdminRegistrationQuery {
    /// Filter by verification status.
    pub status: Option<VerificationStatus>,
    /// Filter by competition code.
    #[param(example = "PTC")]
    pub competition: Option<String>,
    /// Filter by current phase.
    pub phase: Option<Phase>,
    /// Case-insensitive team name search.
    #[param(example = "beast")]
    pub search: Option<String>,
    #[param(example = 1)]
    pub page: Option<u64>,
    #[param(example = 20)]
    pub per_page: Option<u64>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RegistrationListResponse {
    pub data: Vec<RegistrationSummary>,
    pub pagination: Pagination,
}

/// Full registration view for reviewers.
#[derive(Serialize, utoipa::ToSchema)]
pub struct AdminRegistrationDetail {
    #[serde(flatten)]
    pub registration: RegistrationResponse,
    pub user_id: i32,
    pub leader_email: String,
    pub verified_by: Option<i32>,
    pub verified_at: Option<DateTime<Utc>>,
    pub submissions: Vec<SubmissionResponse>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct RejectRequest {
    /// Shown to the team (1-500 characters).
    #[schema(example = "Payment proof is unreadable")]
    pub reason: String,
}

impl Validate for RejectRequest {
    fn validate(&self) -> Result<(), AppError> {
        validate_text(&self.reason, "Reason", 500)
    }
}

/// Query parameters for the admin ticket list.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct AdminTicketQuery {
    pub status: Option<VerificationStatus>,
    /// Filter by event slug.
    #[param(example = "grand-seminar-2025")]
    pub event: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TicketListResponse {
    pub data: Vec<TicketResponse>,
    pub pagination: Pagination,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CheckinRequest {
    #[schema(example = "SBX-7KQ2M9XD4A")]
    pub code: String,
}

impl Validate for CheckinRequest {
    fn validate(&self) -> Result<(), AppError> {
        validate_text(&self.code, "Ticket code", 64)
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CheckinResponse {
    pub ticket_id: i32,
    pub event_id: i32,
    #[schema(example = "Grand Seminar")]
    pub event_title: String,
    pub attendee_name: String,
    pub checked_in_at: DateTime<Utc>,
}

/// Counts and amounts for one competition or event.
#[derive(Debug, Default, Serialize, utoipa::ToSchema)]
pub struct FinanceLine {
    pub id: i32,
    /// Competition code or event slug.
    #[schema(example = "PTC")]
    pub label: String,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    /// Sum of `amount_due` over approved entries, in rupiah.
    pub approved_revenue: i64,
    /// Sum of `amount_due` over pending entries, in rupiah.
    pub pending_amount: i64,
}

impl FinanceLine {
    pub fn record(&mut self, status: VerificationStatus, count: i64, amount: i64) {
        match status {
            VerificationStatus::Pending => {
                self.pending += count;
                self.pending_amount += amount;
            }
            VerificationStatus::Approved => {
                self.approved += count;
                self.approved_revenue += amount;
            }
            VerificationStatus::Rejected => self.rejected += count,
        }
    }
}

#[derive(Debug, Default, Serialize, utoipa::ToSchema)]
pub struct FinanceTotals {
    pub registrations: i64,
    pub tickets: i64,
    pub approved_revenue: i64,
    pub pending_amount: i64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct FinanceSummary {
    pub competitions: Vec<FinanceLine>,
    pub events: Vec<FinanceLine>,
    pub totals: FinanceTotals,
}

impl FinanceSummary {
    pub fn new(competitions: Vec<FinanceLine>, events: Vec<FinanceLine>) -> Self {
        let mut totals = FinanceTotals::default();
        for line in &competitions {
            totals.registrations += line.pending + line.approved + line.rejected;
        }
        for line in &events {
            totals.tickets += line.pending + line.approved + line.rejected;
        }
        for line in competitions.iter().chain(&events) {
            totals.approved_revenue += line.approved_revenue;
            totals.pending_amount += line.pending_amount;
        }
        Self {
            competitions,
            events,
            totals,
        }
    }
}
