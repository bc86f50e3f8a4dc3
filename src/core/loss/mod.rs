//! # 손실 및 지표
//!
//! `mse_z` + `l_y`·`nmse_y` 가 학습 목적 함수이고,
//! `nmse_x`, `nmse_q`는 학습 경로에서 쓰이지 않는 모니터링 지표다.

pub mod metrics;

#[cfg(test)]
mod __tests__;

pub use metrics::{
    flatten_time, latent_variance, mse_z, nmse_q, nmse_x, nmse_y, unflatten_time, CompositeLoss,
    LossBreakdown, LossGradients, VARIANCE_FLOOR,
};
