pub use super::audit_log::Entity as AuditLog;
pub use super::controllers::Entity as Controllers;
pub use super::readings::Entity as Readings;
pub use super::user_controllers::Entity as UserControllers;
pub use super::users::Entity as Users;
