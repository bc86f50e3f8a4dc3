//! # 오류 타입
//!
//! 잠재 네트워크 학습/분석 전 과정에서 발생하는 오류들.
//! 재시도 로직은 없으며 모든 오류는 호출자에게 그대로 전달된다.

use thiserror::Error;

/// 라이브러리 전역 결과 타입
pub type LatentResult<T> = Result<T, LatentError>;

#[derive(Debug, Error)]
pub enum LatentError {
    /// 텐서 차원 불일치
    #[error("shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: &'static str,
        expected: String,
        actual: String,
    },

    /// 잘못된 구성값
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// (I + S)가 역행렬을 갖지 않음
    #[error("Cayley generator produced a singular (I + S) of size {0}")]
    SingularGenerator(usize),

    /// 정규화 분모(잠재 타깃 분산)가 0
    #[error("{metric}: latent target has zero variance across batch and time ({variance:e})")]
    DegenerateVariance { metric: &'static str, variance: f32 },

    /// NaN/inf 손실
    #[error("non-finite loss {value} at epoch {epoch}, batch {batch}")]
    NonFinite { epoch: usize, batch: usize, value: f32 },

    #[error("dataset is empty")]
    EmptyDataset,

    /// 정신측정 곡선 적합 실패
    #[error("psychometric analysis failed: {0}")]
    Analysis(String),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl LatentError {
    pub(crate) fn shape(
        context: &'static str,
        expected: impl std::fmt::Debug,
        actual: impl std::fmt::Debug,
    ) -> Self {
        Self::ShapeMismatch {
            context,
            expected: format!("{:?}", expected),
            actual: format!("{:?}", actual),
        }
    }
}
