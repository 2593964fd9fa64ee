use chrono::Utc;
use sea_orm::sea_query::{Index, IndexCreateStatement, OnConflict, PostgresQueryBuilder};
use sea_orm::*;
use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::entity::{
    competition_registration, event_registration, phase_submission, role, role_permission, user,
};
use crate::models::shared::normalize_email;
use crate::utils::hash;

pub const ADMIN_ROLE: &str = "admin";

/// Default roles seeded on startup.
const DEFAULT_ROLES: &[&str] = &[ADMIN_ROLE, "finance", role::DEFAULT_ROLE];

/// Default role-permission mappings seeded on startup.
const DEFAULT_MAPPINGS: &[(&str, &str)] = &[
    // Admin: all permissions
    ("admin", "competition:manage"),
    ("admin", "registration:view"),
    ("admin", "registration:verify"),
    ("admin", "finance:view"),
    ("admin", "event:manage"),
    ("admin", "ticket:verify"),
    ("admin", "ticket:checkin"),
    ("admin", "referral:manage"),
    ("admin", "karya:manage"),
    // Finance desk
    ("finance", "registration:view"),
    ("finance", "finance:view"),
    ("finance", "ticket:checkin"),
];

/// Seed the `role` and `role_permission` tables with defaults.
pub async fn seed_role_permissions(db: &DatabaseConnection) -> Result<(), DbErr> {
    let mut roles_inserted = 0u32;
    for &name in DEFAULT_ROLES {
        let model = role::ActiveModel {
            name: Set(name.to_string()),
        };

        let result = role::Entity::insert(model)
            .on_conflict(OnConflict::column(role::Column::Name).do_nothing().to_owned())
            .exec_without_returning(db)
            .await;

        match result {
            Ok(n) if n > 0 => roles_inserted += 1,
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if roles_inserted > 0 {
        info!("Seeded {} new roles", roles_inserted);
    }

    let mut perms_inserted = 0u32;
    for &(role, permission) in DEFAULT_MAPPINGS {
        let model = role_permission::ActiveModel {
            role: Set(role.to_string()),
            permission: Set(permission.to_string()),
        };

        let result = role_permission::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    role_permission::Column::Role,
                    role_permission::Column::Permission,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(n) if n > 0 => perms_inserted += 1,
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if perms_inserted > 0 {
        info!("Seeded {} new role-permission mappings", perms_inserted);
    }

    Ok(())
}

/// Create or promote the configured bootstrap administrator.
///
/// An existing account keeps its password and is activated and given the
/// admin role. Does nothing unless both email and password are configured.
pub async fn ensure_admin(db: &DatabaseConnection, auth: &AuthConfig) -> Result<(), DbErr> {
    if auth.admin_email.trim().is_empty() || auth.admin_password.is_empty() {
        return Ok(());
    }
    let email = normalize_email(&auth.admin_email);

    match user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(db)
        .await?
    {
        Some(existing) if existing.role == ADMIN_ROLE && existing.is_active => {}
        Some(existing) => {
            let mut active: user::ActiveModel = existing.into();
            active.role = Set(ADMIN_ROLE.to_string());
            active.is_active = Set(true);
            active.update(db).await?;
            info!(%email, "Promoted bootstrap administrator");
        }
        None => {
            let password = hash::hash_password(&auth.admin_password)
                .map_err(|e| DbErr::Custom(format!("Password hash error: {e}")))?;
            user::ActiveModel {
                email: Set(email.clone()),
                name: Set("Administrator".to_string()),
                password: Set(password),
                role: Set(ADMIN_ROLE.to_string()),
                is_active: Set(true),
                created_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(db)
            .await?;
            info!(%email, "Created bootstrap administrator");
        }
    }

    Ok(())
}

/// Ensure the composite unique indexes exist.
///
/// SeaORM's schema-sync only handles single-column uniqueness, so these are
/// created manually on startup. Failing to create one is fatal: the handlers
/// rely on them as the last line against duplicates.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // One registration per user per competition.
    create_index(
        db,
        "uq_registration_user_competition",
        Index::create()
            .table(competition_registration::Entity)
            .col(competition_registration::Column::UserId)
            .col(competition_registration::Column::CompetitionId),
    )
    .await?;

    // A leader email leads at most one team per competition.
    create_index(
        db,
        "uq_registration_competition_leader",
        Index::create()
            .table(competition_registration::Entity)
            .col(competition_registration::Column::CompetitionId)
            .col(competition_registration::Column::LeaderEmail),
    )
    .await?;

    // Re-uploads replace the existing row.
    create_index(
        db,
        "uq_submission_registration_phase_kind",
        Index::create()
            .table(phase_submission::Entity)
            .col(phase_submission::Column::RegistrationId)
            .col(phase_submission::Column::Phase)
            .col(phase_submission::Column::Kind),
    )
    .await?;

    // One ticket per user per event.
    create_index(
        db,
        "uq_ticket_event_user",
        Index::create()
            .table(event_registration::Entity)
            .col(event_registration::Column::EventId)
            .col(event_registration::Column::UserId),
    )
    .await?;

    Ok(())
}

async fn create_index(
    db: &DatabaseConnection,
    name: &str,
    stmt: &mut IndexCreateStatement,
) -> Result<(), DbErr> {
    let sql = stmt
        .if_not_exists()
        .unique()
        .name(name)
        .to_string(PostgresQueryBuilder);

    match db.execute_unprepared(&sql).await {
        Ok(_) => {
            info!("Ensured index {} exists", name);
            Ok(())
        }
        Err(e) => {
            warn!("Failed to create index {}: {}", name, e);
            Err(e)
        }
    }
}
