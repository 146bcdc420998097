pub mod credentials;
pub mod usage;
