use common::{Phase, RegistrationSource, VerificationStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A team's entry in a competition. Unique per `(user_id, competition_id)` and
/// per `(competition_id, leader_email)`; see `seed::ensure_indexes`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "competition_registration")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub competition_id: i32,
    #[sea_orm(belongs_to, from = "competition_id", to = "id")]
    pub competition: HasOne<super::competition::Entity>,

    pub team_name: String,
    /// Lowercased email of the member flagged as leader.
    pub leader_email: String,

    pub status: VerificationStatus,
    pub phase: Phase,
    /// Set by an admin; consumed by the next phase transition.
    pub qualified: bool,
    pub rejection_reason: Option<String>,

    pub referral_code: Option<String>,
    /// Fee after referral discount, in rupiah.
    pub amount_due: i64,
    pub payment_proof_key: Option<String>,
    pub payment_uploaded_at: Option<DateTimeUtc>,

    pub verified_by: Option<i32>,
    pub verified_at: Option<DateTimeUtc>,

    pub source: RegistrationSource,

    #[sea_orm(has_many)]
    pub members: HasMany<super::team_member::Entity>,

    #[sea_orm(has_many)]
    pub submissions: HasMany<super::phase_submission::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
