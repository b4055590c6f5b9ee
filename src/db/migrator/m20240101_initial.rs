use crate::entities::prelude::*;
use crate::entities::{readings, user_controllers, users};
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Seeded dev account so a fresh install can administer itself.
/// The password must be rotated on first login.
const DEFAULT_DEV_EMAIL: &str = "dev@roomsense.local";

/// Hash the default password using Argon2id
fn hash_default_password() -> String {
    use argon2::{
        Argon2,
        password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
    };

    let password = b"password";
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password, &salt)
        .expect("Failed to hash default password")
        .to_string()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(Users)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Controllers)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(UserControllers)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(AuditLog)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Readings)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // One assignment per (user, controller) pair; the final arbiter
        // against duplicate claims racing past the application check.
        manager
            .create_index(
                Index::create()
                    .name("idx_user_controllers_unique_pair")
                    .table(UserControllers)
                    .col(user_controllers::Column::UserId)
                    .col(user_controllers::Column::ControllerId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_readings_device_ts")
                    .table(Readings)
                    .col(readings::Column::DeviceId)
                    .col(readings::Column::Ts)
                    .to_owned(),
            )
            .await?;

        // Seed the initial dev account.
        let now = chrono::Utc::now().to_rfc3339();
        let password_hash = hash_default_password();

        let insert = sea_orm_migration::sea_query::Query::insert()
            .into_table(Users)
            .columns([
                users::Column::Username,
                users::Column::Email,
                users::Column::PasswordHash,
                users::Column::Role,
                users::Column::IsAdmin,
                users::Column::IsDev,
                users::Column::MustChangePassword,
                users::Column::CreatedAt,
            ])
            .values_panic([
                "dev".into(),
                DEFAULT_DEV_EMAIL.into(),
                password_hash.into(),
                "dev".into(),
                true.into(),
                true.into(),
                true.into(),
                now.into(),
            ])
            .to_owned();

        manager.exec_stmt(insert).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Readings).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AuditLog).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserControllers).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Controllers).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users).to_owned())
            .await?;

        Ok(())
    }
}
