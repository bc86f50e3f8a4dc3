//! 잠재 순환망 (Latent Net) 라이브러리
//!
//! 직교 매개화된 저차원 잠재 부분공간에 묶인 연속시간 순환망을 학습시켜
//! 목표 동역학과 행동 출력을 재현하고, 정신측정 곡선으로 평가한다.

pub mod analysis;
pub mod core;
pub mod task;

// 핵심 모듈들 재수출
pub use crate::core::{
    // 구성
    Device, ExperimentConfig, NetConfig, TrainConfig,
    // 오류
    LatentError, LatentResult,
    // 모델과 학습
    LatentNet, NetworkGradients, Trainer, EpochReport,
    // 구성 요소
    ConstrainedLinear, MaskKind, OrthogonalProjector, EulerIntegrator, Trajectory,
    CompositeLoss, LossBreakdown, LatentAdam,
};
pub use analysis::{PsychometricFit, PsychometricReport};
pub use task::{Context, TaskConfig, TaskDataset, TrialCondition};
