//! # 순환 동역학 엔진

pub mod euler;

#[cfg(test)]
mod __tests__;

pub use euler::{DynamicsGradients, EulerIntegrator, Trajectory};
