use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::SecurityConfig;
use crate::entities::{audit_log, controllers, readings, user_controllers};
use crate::models::{Role, User};

pub mod migrator;
pub mod repositories;

pub use repositories::assignment::AssignmentDetail;
pub use repositories::audit::AuditFilter;
pub use repositories::reading::{DeviceScope, NewReading, ReadingsQuery};
pub use repositories::user::NewUser;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn controller_repo(&self) -> repositories::controller::ControllerRepository {
        repositories::controller::ControllerRepository::new(self.conn.clone())
    }

    fn assignment_repo(&self) -> repositories::assignment::AssignmentRepository {
        repositories::assignment::AssignmentRepository::new(self.conn.clone())
    }

    fn audit_repo(&self) -> repositories::audit::AuditRepository {
        repositories::audit::AuditRepository::new(self.conn.clone())
    }

    fn reading_repo(&self) -> repositories::reading::ReadingRepository {
        repositories::reading::ReadingRepository::new(self.conn.clone())
    }

    // ========== Users ==========

    pub async fn create_user(&self, new: NewUser<'_>, config: &SecurityConfig) -> Result<User> {
        self.user_repo().create(new, config).await
    }

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_email_with_password(
        &self,
        email: &str,
    ) -> Result<Option<(User, String)>> {
        self.user_repo().get_by_email_with_password(email).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.user_repo().list().await
    }

    pub async fn verify_user_password(&self, id: i32, password: &str) -> Result<bool> {
        self.user_repo().verify_password(id, password).await
    }

    pub async fn update_user_profile(
        &self,
        id: i32,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>> {
        self.user_repo().update_profile(id, username, email).await
    }

    pub async fn update_user_password(
        &self,
        id: i32,
        new_password: &str,
        config: &SecurityConfig,
    ) -> Result<()> {
        self.user_repo()
            .update_password(id, new_password, config)
            .await
    }

    pub async fn set_user_role(&self, id: i32, role: Role) -> Result<Option<User>> {
        self.user_repo().set_role(id, role).await
    }

    pub async fn set_user_must_change_password(
        &self,
        id: i32,
        value: bool,
    ) -> Result<Option<User>> {
        self.user_repo().set_must_change_password(id, value).await
    }

    pub async fn delete_user(&self, id: i32) -> Result<bool> {
        self.user_repo().delete(id).await
    }

    // ========== Controllers & claiming ==========

    pub async fn create_controller(
        &self,
        device_id: &str,
        label: Option<&str>,
        pairing_code: &str,
    ) -> Result<controllers::Model> {
        self.controller_repo()
            .create(device_id, label, pairing_code)
            .await
    }

    pub async fn get_controller(&self, id: i32) -> Result<Option<controllers::Model>> {
        self.controller_repo().get(id).await
    }

    pub async fn list_controllers(&self) -> Result<Vec<controllers::Model>> {
        self.controller_repo().list().await
    }

    pub async fn find_controllers_by_code(
        &self,
        code: &str,
    ) -> Result<Vec<(controllers::Model, bool)>> {
        self.controller_repo().find_by_code(code).await
    }

    pub async fn pairing_code_in_use(&self, code: &str) -> Result<bool> {
        self.controller_repo().code_in_use(code).await
    }

    pub async fn delete_controller(&self, id: i32) -> Result<bool> {
        self.controller_repo().delete(id).await
    }

    pub async fn assign_controller(
        &self,
        user_id: i32,
        controller_id: i32,
        label: Option<&str>,
    ) -> Result<user_controllers::Model> {
        self.assignment_repo()
            .assign(user_id, controller_id, label)
            .await
    }

    pub async fn list_user_controllers(&self, user_id: i32) -> Result<Vec<AssignmentDetail>> {
        self.assignment_repo().list_for_user(user_id).await
    }

    pub async fn relabel_assignment(
        &self,
        user_id: i32,
        controller_id: i32,
        label: Option<&str>,
    ) -> Result<Option<user_controllers::Model>> {
        self.assignment_repo()
            .update_label(user_id, controller_id, label)
            .await
    }

    pub async fn unassign_controller(&self, user_id: i32, controller_id: i32) -> Result<bool> {
        self.assignment_repo().remove(user_id, controller_id).await
    }

    pub async fn owned_device_ids(&self, user_id: i32) -> Result<Vec<String>> {
        self.assignment_repo().owned_device_ids(user_id).await
    }

    pub async fn owns_device(&self, user_id: i32, device_id: &str) -> Result<bool> {
        self.assignment_repo().owns_device(user_id, device_id).await
    }

    // ========== Audit ==========

    pub async fn append_audit(
        &self,
        actor_id: Option<i32>,
        action: &str,
        entity_type: &str,
        entity_id: Option<&str>,
        metadata: Option<serde_json::Value>,
        ip_address: Option<&str>,
    ) -> Result<()> {
        self.audit_repo()
            .append(actor_id, action, entity_type, entity_id, metadata, ip_address)
            .await
    }

    pub async fn list_audit(
        &self,
        filter: &AuditFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<audit_log::Model>, u64)> {
        self.audit_repo().list(filter, page, limit).await
    }

    pub async fn purge_audit_all(&self) -> Result<u64> {
        self.audit_repo().purge_all().await
    }

    pub async fn purge_audit_before(&self, before: &str) -> Result<u64> {
        self.audit_repo().purge_before(before).await
    }

    pub async fn audit_count(&self) -> Result<u64> {
        self.audit_repo().count().await
    }

    // ========== Readings ==========

    pub async fn insert_reading(&self, reading: NewReading) -> Result<readings::Model> {
        self.reading_repo().insert(reading).await
    }

    pub async fn distinct_devices(&self, scope: &DeviceScope) -> Result<Vec<String>> {
        self.reading_repo().distinct_devices(scope).await
    }

    pub async fn latest_reading(&self, device_id: &str) -> Result<Option<readings::Model>> {
        self.reading_repo().latest(device_id).await
    }

    pub async fn reading_history(
        &self,
        device_id: &str,
        hours: i64,
    ) -> Result<Vec<readings::Model>> {
        self.reading_repo().history(device_id, hours).await
    }

    pub async fn query_readings(
        &self,
        params: &ReadingsQuery,
    ) -> Result<(Vec<readings::Model>, u64)> {
        self.reading_repo().query(params).await
    }

    pub async fn reading_count(&self) -> Result<u64> {
        self.reading_repo().count().await
    }

    pub async fn controller_count(&self) -> Result<u64> {
        self.controller_repo().count().await
    }
}
