#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stage of a competition, and of each team registered for it.
///
/// Phases are ordered: a registration only ever moves towards `Final`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    utoipa::ToSchema,
)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "registration"))]
    #[default]
    Registration,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "preliminary"))]
    Preliminary,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "semifinal"))]
    Semifinal,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "final"))]
    Final,
}

impl Phase {
    pub const ALL: &'static [Phase] = &[
        Self::Registration,
        Self::Preliminary,
        Self::Semifinal,
        Self::Final,
    ];

    /// The phase that follows this one, or `None` after `Final`.
    pub fn next(self) -> Option<Phase> {
        match self {
            Self::Registration => Some(Self::Preliminary),
            Self::Preliminary => Some(Self::Semifinal),
            Self::Semifinal => Some(Self::Final),
            Self::Final => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::Preliminary => "preliminary",
            Self::Semifinal => "semifinal",
            Self::Final => "final",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an unknown phase name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown phase: {0}")]
pub struct ParsePhaseError(pub String);

impl FromStr for Phase {
    type Err = ParsePhaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ParsePhaseError(s.to_string()))
    }
}

/// Closing instants of each competition phase.
///
/// A boundary left as `None` is "not scheduled": that phase stays open until
/// some later scheduled boundary passes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PhaseSchedule {
    pub registration_close: Option<DateTime<Utc>>,
    pub preliminary_close: Option<DateTime<Utc>>,
    pub semifinal_close: Option<DateTime<Utc>>,
    pub final_close: Option<DateTime<Utc>>,
}

impl PhaseSchedule {
    /// Closing instant of `phase`, if scheduled.
    pub fn close_of(&self, phase: Phase) -> Option<DateTime<Utc>> {
        match phase {
            Phase::Registration => self.registration_close,
            Phase::Preliminary => self.preliminary_close,
            Phase::Semifinal => self.semifinal_close,
            Phase::Final => self.final_close,
        }
    }

    /// The phase a competition is in at `now`: the first one still open.
    /// Once registration, preliminary and semifinal have all closed the
    /// competition stays in `Final`.
    pub fn phase_at(&self, now: DateTime<Utc>) -> Phase {
        Phase::ALL[..3]
            .iter()
            .copied()
            .find(|&phase| self.is_open(phase, now))
            .unwrap_or(Phase::Final)
    }

    /// Whether `phase` still accepts registrations or submissions at `now`.
    ///
    /// A scheduled phase is open strictly before its close. An unscheduled
    /// one closes as soon as any later scheduled boundary has passed.
    pub fn is_open(&self, phase: Phase, now: DateTime<Utc>) -> bool {
        match self.close_of(phase) {
            Some(close) => now < close,
            None => Phase::ALL
                .iter()
                .filter(|&&later| later > phase)
                .filter_map(|&later| self.close_of(later))
                .all(|close| now < close),
        }
    }

    /// Scheduled boundaries must be strictly increasing.
    pub fn validate(&self) -> Result<(), &'static str> {
        let mut last: Option<DateTime<Utc>> = None;
        for &phase in Phase::ALL {
            if let Some(close) = self.close_of(phase) {
                if let Some(prev) = last
                    && close <= prev
                {
                    return Err("Phase deadlines must be strictly increasing");
                }
                last = Some(close);
            }
        }
        Ok(())
    }
}
