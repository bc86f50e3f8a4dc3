//! # 잠재 순환망 핵심 모듈
//!
//! 직교 투영기, 구조 제약 선형 사상, 순환 동역학, 손실, 최적화기, 학습기

pub mod config;
pub mod dynamics;
pub mod error;
pub mod layers;
pub mod loss;
pub mod network;
pub mod optimizers;
pub mod projector;
pub mod trainer;

// 주요 타입들 재수출
pub use config::{Device, ExperimentConfig, NetConfig, TrainConfig};
pub use dynamics::{EulerIntegrator, Trajectory};
pub use error::{LatentError, LatentResult};
pub use layers::{ConstrainedLinear, MaskKind};
pub use loss::{CompositeLoss, LossBreakdown};
pub use network::{LatentNet, NetworkGradients};
pub use optimizers::{AdamConfig, AdamState, LatentAdam};
pub use projector::OrthogonalProjector;
pub use trainer::{EpochReport, Trainer};
