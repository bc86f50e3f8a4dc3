pub mod adam;
pub mod config;
pub mod latent_adam;

#[cfg(test)]
mod __tests__;

pub use adam::AdamState;
pub use config::AdamConfig;
pub use latent_adam::LatentAdam;
