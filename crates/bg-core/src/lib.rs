//! Blue/green container swap controller.
//!
//! The [`services::deployer::Deployer`] drives one deployment run: detect the
//! live slot, launch the other one, wait for readiness, switch the proxy and
//! retire the old container.

pub mod error;
pub mod models;
pub mod services;

pub use error::{DeployError, Result};
