pub mod audit;
pub mod pairing;

pub use audit::AuditRecorder;
pub use pairing::{ClaimError, PairingService};
