pub mod auth;
pub mod roster;

pub use auth::{bootstrap, AuthService, IdentityToolkitAuth, LocalAuth};
pub use roster::{enrich_snapshot, RosterDeps, RosterHandle, RosterOptions, RosterState, RosterView};
