use common::{Phase, PhaseSchedule};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "competition")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Short uppercase code such as `PTC`.
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    pub description: String, // in Markdown
    /// In rupiah.
    pub registration_fee: i64,
    pub min_team_size: i32,
    pub max_team_size: i32,
    pub is_active: bool,

    pub registration_open: Option<DateTimeUtc>,
    pub registration_close: Option<DateTimeUtc>,
    pub preliminary_close: Option<DateTimeUtc>,
    pub semifinal_close: Option<DateTimeUtc>,
    pub final_close: Option<DateTimeUtc>,
    pub current_phase: Phase,

    #[sea_orm(has_many)]
    pub registrations: HasMany<super::competition_registration::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    pub fn schedule(&self) -> PhaseSchedule {
        PhaseSchedule {
            registration_close: self.registration_close,
            preliminary_close: self.preliminary_close,
            semifinal_close: self.semifinal_close,
            final_close: self.final_close,
        }
    }

    /// Registration is accepted from `registration_open` (if set) until the
    /// registration phase closes.
    pub fn accepts_registrations(&self, now: DateTimeUtc) -> bool {
        self.is_active
            && self.registration_open.is_none_or(|open| now >= open)
            && self.schedule().is_open(Phase::Registration, now)
    }
}

impl ActiveModelBehavior for ActiveModel {}
