use std::collections::HashSet;

use chrono::{DateTime, Utc};
use common::{Phase, RegistrationSource, SubmissionKind, VerificationStatus};
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

use super::shared::{normalize_email, validate_email, validate_optional_text, validate_text};
use crate::entity::{competition_registration, phase_submission, team_member};
use crate::error::AppError;
use crate::extractors::json::Validate;

/// Upper bound on members in any request; per-competition bounds are tighter.
const MAX_MEMBERS: usize = 10;

/// One team member in a registration request.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct MemberInput {
    #[schema(example = "Ana Putri")]
    pub name: String,
    #[schema(example = "ana@std.stei.itb.ac.id")]
    pub email: String,
    #[schema(example = "+6281234567890")]
    pub phone: Option<String>,
    #[schema(example = "Institut Teknologi Bandung")]
    pub institution: Option<String>,
    /// Exactly one member must be the leader.
    #[serde(default)]
    pub is_leader: bool,
}

impl MemberInput {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_text(&self.name, "Member name", 100)?;
        validate_email(&self.email)?;
        validate_optional_text(self.phone.as_deref(), "Phone", 32)?;
        validate_optional_text(self.institution.as_deref(), "Institution", 128)?;
        Ok(())
    }
}

/// Check a member list: non-empty, bounded, exactly one leader, no repeated email.
pub fn validate_members(members: &[MemberInput]) -> Result<(), AppError> {
    if members.is_empty() || members.len() > MAX_MEMBERS {
        return Err(AppError::Validation(format!(
            "A team must have 1-{MAX_MEMBERS} members"
        )));
    }
    let mut seen = HashSet::new();
    for member in members {
        member.validate()?;
        if !seen.insert(normalize_email(&member.email)) {
            return Err(AppError::Validation(format!(
                "Duplicate member email: {}",
                member.email.trim()
            )));
        }
    }
    match members.iter().filter(|m| m.is_leader).count() {
        1 => Ok(()),
        _ => Err(AppError::Validation(
            "Exactly one member must be the team leader".into(),
        )),
    }
}

/// Request body for registering a team.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegisterTeamRequest {
    #[schema(example = "Binary Beasts")]
    pub team_name: String,
    pub members: Vec<MemberInput>,
    /// Optional referral code for a fee discount.
    #[schema(example = "EARLYBIRD")]
    pub referral_code: Option<String>,
}

impl Validate for RegisterTeamRequest {
    fn validate(&self) -> Result<(), AppError> {
        validate_text(&self.team_name, "Team name", 64)?;
        validate_members(&self.members)?;
        validate_optional_text(self.referral_code.as_deref(), "Referral code", 32)
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TeamMemberResponse {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub institution: Option<String>,
    pub is_leader: bool,
    pub position: i32,
}

impl From<team_member::Model> for TeamMemberResponse {
    fn from(m: team_member::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            email: m.email,
            phone: m.phone,
            institution: m.institution,
            is_leader: m.is_leader,
            position: m.position,
        }
    }
}

/// A registration as seen by its owner.
#[derive(Serialize, utoipa::ToSchema)]
pub struct RegistrationResponse {
    #[schema(example = 7)]
    pub id: i32,
    pub competition_id: i32,
    #[schema(example = "PTC")]
    pub competition_code: String,
    #[schema(example = "Binary Beasts")]
    pub team_name: String,
    pub status: VerificationStatus,
    pub phase: Phase,
    /// Marked by an admin to advance at the next phase transition.
    pub qualified: bool,
    pub rejection_reason: Option<String>,
    pub referral_code: Option<String>,
    #[schema(example = 120000)]
    pub amount_due: i64,
    pub has_payment_proof: bool,
    pub payment_uploaded_at: Option<DateTime<Utc>>,
    pub source: RegistrationSource,
    pub members: Vec<TeamMemberResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RegistrationResponse {
    pub fn new(
        m: competition_registration::Model,
        competition_code: String,
        members: Vec<team_member::Model>,
    ) -> Self {
        Self {
            id: m.id,
            competition_id: m.competition_id,
            competition_code,
            team_name: m.team_name,
            status: m.status,
            phase: m.phase,
            qualified: m.qualified,
            rejection_reason: m.rejection_reason,
            referral_code: m.referral_code,
            amount_due: m.amount_due,
            has_payment_proof: m.payment_proof_key.is_some(),
            payment_uploaded_at: m.payment_uploaded_at,
            source: m.source,
            members: members.into_iter().map(Into::into).collect(),
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Row shape for registration lists (joined with the competition code).
#[derive(Debug, Serialize, FromQueryResult, utoipa::ToSchema)]
pub struct RegistrationSummary {
    pub id: i32,
    pub user_id: i32,
    pub competition_id: i32,
    pub competition_code: String,
    pub team_name: String,
    pub leader_email: String,
    pub status: VerificationStatus,
    pub phase: Phase,
    pub qualified: bool,
    pub amount_due: i64,
    pub source: RegistrationSource,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionResponse {
    pub id: i32,
    pub registration_id: i32,
    pub phase: Phase,
    pub kind: SubmissionKind,
    #[schema(example = "abstract.pdf")]
    pub filename: String,
    #[schema(example = "application/pdf")]
    pub content_type: String,
    pub size: i64,
    /// SHA-256 of the content, hex.
    pub checksum: String,
    pub submitted_at: DateTime<Utc>,
}

impl From<phase_submission::Model> for SubmissionResponse {
    fn from(m: phase_submission::Model) -> Self {
        Self {
            id: m.id,
            registration_id: m.registration_id,
            phase: m.phase,
            kind: m.kind,
            filename: m.filename,
            content_type: m.content_type,
            size: m.size,
            checksum: m.checksum,
            submitted_at: m.submitted_at,
        }
    }
}

/// Result of a payment-proof upload (registrations and tickets).
#[derive(Serialize, utoipa::ToSchema)]
pub struct PaymentProofResponse {
    /// Registration or ticket ID.
    pub id: i32,
    #[schema(example = "transfer.jpg")]
    pub filename: String,
    #[schema(example = "image/jpeg")]
    pub content_type: String,
    pub size: i64,
    pub checksum: String,
    pub uploaded_at: DateTime<Utc>,
}
