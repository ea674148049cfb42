/// Re-export `Config` from `tallyboard-core`; environment parsing lives there
/// so integration tests can build one directly.
pub use tallyboard_core::config::Config;
