pub mod fingerprint;
pub mod matcher;
