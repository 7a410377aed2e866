pub mod generator;
pub mod record;

pub use generator::RefreshSecretGenerator;
pub use record::{MarkUsed, RefreshTokenRecord};
