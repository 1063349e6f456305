// Domain layer - Session state and value types
pub mod files;
pub mod params;
pub mod plot;
pub mod signal;
