use serde::{Deserialize, Serialize};

use super::registration::{MemberInput, validate_members};
use super::shared::validate_text;
use crate::error::AppError;
use crate::extractors::json::Validate;

/// Team member as sent by an external form.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct ImportMember {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub institution: Option<String>,
}

impl ImportMember {
    fn into_member(self, is_leader: bool) -> MemberInput {
        MemberInput {
            name: self.name,
            email: self.email,
            phone: self.phone,
            institution: self.institution,
            is_leader,
        }
    }
}

/// Registration collected outside the web app.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct ImportRegistrationRequest {
    #[schema(example = "BCC")]
    pub competition_code: String,
    pub team_name: String,
    /// The leader's email identifies (or creates) the owning account.
    pub leader: ImportMember,
    /// Other members, leader excluded.
    #[serde(default)]
    pub members: Vec<ImportMember>,
}

impl ImportRegistrationRequest {
    /// All members with the leader first.
    pub fn all_members(&self) -> Vec<MemberInput> {
        std::iter::once(self.leader.clone().into_member(true))
            .chain(self.members.iter().cloned().map(|m| m.into_member(false)))
            .collect()
    }
}

impl Validate for ImportRegistrationRequest {
    fn validate(&self) -> Result<(), AppError> {
        validate_text(&self.competition_code, "Competition code", 8)?;
        validate_text(&self.team_name, "Team name", 64)?;
        validate_members(&self.all_members())
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ImportRegistrationResponse {
    pub registration_id: i32,
    pub user_id: i32,
    /// `true` when the leader had no account and one was created.
    pub user_created: bool,
}
