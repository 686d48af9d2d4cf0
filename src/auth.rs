//! Client credential material: redacted secrets, static credentials, and ES256 client
//! assertions minted per exchange.

pub mod assertion;
pub mod credential;
pub mod secret;

pub use assertion::*;
pub use credential::*;
pub use secret::*;
