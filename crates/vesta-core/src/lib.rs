//! `vesta-core` — shared foundation for the Vesta event bot.
//!
//! Holds the pieces every other crate needs: configuration loading
//! (`vesta.toml` + `VESTA_*` env overrides), the common error type, the
//! timezone-aware [`clock::Clock`], and the [`action::EventAction`] payload
//! that travels from command registration to fire-time delivery.

pub mod action;
pub mod clock;
pub mod config;
pub mod error;

pub use clock::Clock;
pub use config::VestaConfig;
pub use error::{Result, VestaError};
