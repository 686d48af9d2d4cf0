//! Provider-facing configuration (data) and per-provider conventions.
//!
//! `kind` names the supported identity providers and their defaults (endpoints, scopes,
//! authorization extras, callback transport). `config` exposes the validated, immutable
//! [`ProviderConfig`] built from those defaults plus operator overrides.

pub mod config;
pub mod kind;

pub use config::*;
pub use kind::*;
