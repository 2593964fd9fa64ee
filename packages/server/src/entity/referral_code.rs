use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "referral_code")]
pub struct Model {
    /// Stored uppercase.
    #[sea_orm(primary_key, auto_increment = false)]
    pub code: String,

    pub discount_percent: i32,
    pub max_uses: Option<i32>,
    #[sea_orm(default_value = 0)]
    pub used_count: i32,
    pub is_active: bool,
    pub expires_at: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
}

impl Model {
    pub fn is_usable(&self, now: DateTimeUtc) -> bool {
        self.is_active
            && self.expires_at.is_none_or(|exp| now < exp)
            && self.max_uses.is_none_or(|max| self.used_count < max)
    }
}

/// Fee after applying `discount_percent`, rounded down to whole rupiah.
pub fn apply_discount(fee: i64, discount_percent: i32) -> i64 {
    let discount = i64::from(discount_percent.clamp(0, 100));
    fee * (100 - discount) / 100
}

impl ActiveModelBehavior for ActiveModel {}
