//! Request middleware: identity, subscription gate, module permissions

pub mod auth;
pub mod gate;
pub mod permissions;

pub use auth::{Caller, TokenService};
pub use gate::{AccessGate, GateConfig, GateDecision};
pub use permissions::{has_module_permission, ModuleGate};
