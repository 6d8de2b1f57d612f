use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Bootstrap password for the seeded admin account. Rotated through the
/// regular reset flow or `create-user` on first deploy.
const DEFAULT_ADMIN_PASSWORD: &[u8] = b"trocar-senha";

fn hash_default_password() -> String {
    use argon2::{
        Argon2,
        password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
    };

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(DEFAULT_ADMIN_PASSWORD, &salt)
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
                    .create_table_from_entity(Profiles)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Companies)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Users)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Seed the role catalog
        for (code, name, level) in [
            ("ADMIN", "Administrador", 1),
            ("CONSULTOR", "Consultor", 2),
            ("GESTOR", "Gestor", 3),
        ] {
            let insert = sea_orm_migration::sea_query::Query::insert()
                .into_table(Profiles)
                .columns([
                    crate::entities::profiles::Column::Code,
                    crate::entities::profiles::Column::Name,
                    crate::entities::profiles::Column::Level,
                    crate::entities::profiles::Column::Active,
                ])
                .values_panic([code.into(), name.into(), level.into(), true.into()])
                .to_owned();

            manager.exec_stmt(insert).await?;
        }

        // Seed the global admin (no company binding)
        let now = chrono::Utc::now().to_rfc3339();
        let password_hash = hash_default_password();

        let insert = sea_orm_migration::sea_query::Query::insert()
            .into_table(Users)
            .columns([
                crate::entities::users::Column::Email,
                crate::entities::users::Column::PasswordHash,
                crate::entities::users::Column::Name,
                crate::entities::users::Column::Active,
                crate::entities::users::Column::ProfileId,
                crate::entities::users::Column::CreatedAt,
                crate::entities::users::Column::UpdatedAt,
            ])
            .values_panic([
                "admin@reiche.local".into(),
                password_hash.into(),
                "Administrador".into(),
                true.into(),
                1.into(),
                now.clone().into(),
                now.into(),
            ])
            .to_owned();

        manager.exec_stmt(insert).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Companies).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Profiles).to_owned())
            .await?;

        Ok(())
    }
}
