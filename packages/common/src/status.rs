#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Admin verification state of a competition registration or event ticket.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Waiting for an admin decision.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "pending"))]
    #[default]
    Pending,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "approved"))]
    Approved,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "rejected"))]
    Rejected,
}

impl VerificationStatus {
    pub const ALL: &'static [VerificationStatus] =
        &[Self::Pending, Self::Approved, Self::Rejected];

    /// Only `pending` rows can be decided, and a decision is final.
    pub fn can_transition_to(self, target: VerificationStatus) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Approved) | (Self::Pending, Self::Rejected)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an unknown enum value from a query string or form field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for VerificationStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "status",
                value: s.to_string(),
            })
    }
}

/// Kind of file a team uploads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "payment_proof"))]
    PaymentProof,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "abstract"))]
    Abstract,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "paper"))]
    Paper,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "pitch_deck"))]
    PitchDeck,
}

const MIB: u64 = 1024 * 1024;

impl SubmissionKind {
    pub const ALL: &'static [SubmissionKind] =
        &[Self::PaymentProof, Self::Abstract, Self::Paper, Self::PitchDeck];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentProof => "payment_proof",
            Self::Abstract => "abstract",
            Self::Paper => "paper",
            Self::PitchDeck => "pitch_deck",
        }
    }

    /// MIME types accepted for this kind.
    pub fn allowed_mime_types(&self) -> &'static [&'static str] {
        match self {
            Self::PaymentProof => &["image/jpeg", "image/png", "image/webp", "application/pdf"],
            Self::Abstract | Self::Paper => &["application/pdf"],
            Self::PitchDeck => &[
                "application/pdf",
                "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            ],
        }
    }

    /// Upper bound on the uploaded file size, in bytes.
    pub fn max_size(&self) -> u64 {
        match self {
            Self::PaymentProof => 5 * MIB,
            Self::Abstract => 10 * MIB,
            Self::Paper => 20 * MIB,
            Self::PitchDeck => 25 * MIB,
        }
    }
}

impl fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "submission kind",
                value: s.to_string(),
            })
    }
}

/// Kind of ticketed event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "seminar"))]
    Seminar,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "exhibition"))]
    Exhibition,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "grand_seminar"))]
    GrandSeminar,
}

/// What a recorded payment was for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "competition"))]
    Competition,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "event"))]
    Event,
}

/// Where a registration came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationSource {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "web"))]
    Web,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "import"))]
    Import,
}
