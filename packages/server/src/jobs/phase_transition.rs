use std::time::Duration;

use chrono::{DateTime, Utc};
use common::{Phase, VerificationStatus};
use sea_orm::sea_query::LockType;
use sea_orm::*;
use serde::Serialize;
use tracing::{error, info};

use crate::entity::{competition, competition_registration};

/// Outcome of one scan over the active competitions.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct PhaseTransitionReport {
    pub competitions_checked: u64,
    pub competitions_advanced: u64,
    pub registrations_promoted: u64,
}

/// Run the phase transition periodically as a background task.
pub async fn run_scheduler(db: DatabaseConnection, every: Duration) {
    info!(interval_secs = every.as_secs(), "Starting phase transition scheduler");

    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;

        match run_phase_transition(&db, Utc::now()).await {
            Ok(report) if report.competitions_advanced > 0 => {
                info!(?report, "Phase transition advanced competitions");
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "Phase transition scan failed"),
        }
    }
}

/// Move every active competition whose schedule has passed a boundary
/// forward, promoting the teams that advance with it.
///
/// A failure on one competition is logged and does not stop the scan.
pub async fn run_phase_transition(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
) -> anyhow::Result<PhaseTransitionReport> {
    let competitions = competition::Entity::find()
        .filter(competition::Column::IsActive.eq(true))
        .all(db)
        .await?;

    let mut report = PhaseTransitionReport {
        competitions_checked: competitions.len() as u64,
        ..Default::default()
    };

    for c in competitions {
        if c.schedule().phase_at(now) <= c.current_phase {
            continue;
        }
        match advance_competition(db, c.id, now).await {
            Ok(Some(promoted)) => {
                report.competitions_advanced += 1;
                report.registrations_promoted += promoted;
            }
            Ok(None) => {}
            Err(e) => error!(competition = %c.code, error = %e, "Failed to advance competition"),
        }
    }

    Ok(report)
}

/// Returns the number of promoted registrations, or `None` if another run
/// already moved the competition.
async fn advance_competition(
    db: &DatabaseConnection,
    competition_id: i32,
    now: DateTime<Utc>,
) -> anyhow::Result<Option<u64>> {
    let txn = db.begin().await?;

    let Some(locked) = competition::Entity::find_by_id(competition_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
    else {
        txn.rollback().await?;
        return Ok(None);
    };

    let target = locked.schedule().phase_at(now);
    let steps = steps_between(locked.current_phase, target);
    if steps.is_empty() {
        txn.rollback().await?;
        return Ok(None);
    }

    let mut promoted = 0;
    for &(from, to) in &steps {
        promoted += promote(&txn, competition_id, from, to, now).await?;
        info!(competition = %locked.code, %from, %to, "Competition phase advanced");
    }

    let code = locked.code.clone();
    let mut active: competition::ActiveModel = locked.into();
    active.current_phase = Set(target);
    active.updated_at = Set(now);
    active.update(&txn).await?;
    txn.commit().await?;

    info!(competition = %code, phase = %target, promoted, "Phase transition committed");
    Ok(Some(promoted))
}

/// Move approved registrations from `from` to `to`. Entering the preliminary
/// round takes every approved team; later rounds only take qualified ones.
async fn promote(
    txn: &DatabaseTransaction,
    competition_id: i32,
    from: Phase,
    to: Phase,
    now: DateTime<Utc>,
) -> anyhow::Result<u64> {
    let mut update = competition_registration::Entity::update_many()
        .set(competition_registration::ActiveModel {
            phase: Set(to),
            qualified: Set(false),
            updated_at: Set(now),
            ..Default::default()
        })
        .filter(competition_registration::Column::CompetitionId.eq(competition_id))
        .filter(competition_registration::Column::Status.eq(VerificationStatus::Approved))
        .filter(competition_registration::Column::Phase.eq(from));

    if requires_qualification(to) {
        update = update.filter(competition_registration::Column::Qualified.eq(true));
    }

    Ok(update.exec(txn).await?.rows_affected)
}

fn requires_qualification(to: Phase) -> bool {
    to > Phase::Preliminary
}

/// Consecutive `(from, to)` pairs walking from `current` up to `target`.
/// Empty when `target` is not ahead; phases never move backwards.
fn steps_between(current: Phase, target: Phase) -> Vec<(Phase, Phase)> {
    let mut steps = Vec::new();
    let mut phase = current;
    while phase < target {
        let Some(next) = phase.next() else { break };
        steps.push((phase, next));
        phase = next;
    }
    steps
}
