pub mod config_loader;
pub mod deployer;
pub mod detector;
pub mod files;
pub mod launcher;
pub mod lock;
pub mod readiness;
pub mod retirer;
pub mod routing;
pub mod runtime;
pub mod state;
