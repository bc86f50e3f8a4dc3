//! 출력 손실과 정규화 MSE 지표
//!
//! 모든 함수는 (batch, time, feature) 텐서를 받아 (batch·time, feature) 행렬로
//! 펼친 뒤 계산한다. 정규화 분모는 잠재 타깃 y의 (batch, time) 공동 평균 주위 분산.

use crate::core::error::{LatentError, LatentResult};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};

/// 정규화 분모의 하한. 이하이면 `DegenerateVariance`
pub const VARIANCE_FLOOR: f32 = 1e-12;

/// (batch, time, d) → (batch·time, d)
pub fn flatten_time(a: &ArrayView3<f32>) -> LatentResult<Array2<f32>> {
    let (batch, steps, features) = a.dim();
    Ok(a.as_standard_layout()
        .into_owned()
        .into_shape((batch * steps, features))?)
}

/// (batch·time, d) → (batch, time, d)
pub fn unflatten_time(a: Array2<f32>, batch: usize, steps: usize) -> LatentResult<Array3<f32>> {
    let features = a.ncols();
    Ok(a.as_standard_layout()
        .into_owned()
        .into_shape((batch, steps, features))?)
}

fn check_pair(
    context: &'static str,
    x: &ArrayView3<f32>,
    other: &ArrayView3<f32>,
    features: usize,
) -> LatentResult<()> {
    let (batch, steps, _) = x.dim();
    let expected = (batch, steps, features);
    if other.dim() != expected {
        return Err(LatentError::shape(context, expected, other.dim()));
    }
    Ok(())
}

/// mean((y − ȳ)²), ȳ는 특징별 (batch, time) 평균
pub fn latent_variance(y: &ArrayView2<f32>, metric: &'static str) -> LatentResult<f32> {
    let mean = y
        .mean_axis(Axis(0))
        .ok_or(LatentError::EmptyDataset)?;
    let centered = y - &mean;
    let variance = centered.mapv(|v| v * v).mean().ok_or(LatentError::EmptyDataset)?;
    if !variance.is_finite() || variance <= VARIANCE_FLOOR {
        return Err(LatentError::DegenerateVariance { metric, variance });
    }
    Ok(variance)
}

fn mean_square(r: &Array2<f32>) -> LatentResult<f32> {
    r.mapv(|v| v * v).mean().ok_or(LatentError::EmptyDataset)
}

/// 출력 손실: Σ(x·W_outᵀ − z)² / (batch·time)
///
/// 출력 차원으로는 나누지 않는다.
pub fn mse_z(x: &ArrayView3<f32>, z: &ArrayView3<f32>, w_out: &Array2<f32>) -> LatentResult<f32> {
    check_pair("target output z", x, z, w_out.nrows())?;
    let (batch, steps, _) = x.dim();
    if batch * steps == 0 {
        return Err(LatentError::EmptyDataset);
    }
    let residual = flatten_time(x)?.dot(&w_out.t()) - flatten_time(z)?;
    Ok(residual.mapv(|v| v * v).sum() / (batch * steps) as f32)
}

/// 잠재 정렬 손실: mse(x·Q, y) / var(y)
pub fn nmse_y(y: &ArrayView3<f32>, x: &ArrayView3<f32>, q: &Array2<f32>) -> LatentResult<f32> {
    check_pair("target latent y", x, y, q.ncols())?;
    let y_flat = flatten_time(y)?;
    let variance = latent_variance(&y_flat.view(), "nmse_y")?;
    let residual = flatten_time(x)?.dot(q) - &y_flat;
    Ok(mean_square(&residual)? / variance)
}

/// 은닉 상태 재구성 지표: mse(y·Qᵀ, x) / var(y)
pub fn nmse_x(y: &ArrayView3<f32>, x: &ArrayView3<f32>, q: &Array2<f32>) -> LatentResult<f32> {
    check_pair("target latent y", x, y, q.ncols())?;
    let y_flat = flatten_time(y)?;
    let variance = latent_variance(&y_flat.view(), "nmse_x")?;
    let residual = y_flat.dot(&q.t()) - flatten_time(x)?;
    Ok(mean_square(&residual)? / variance)
}

/// Q 왕복 일관성 지표: mse(y·Qᵀ·Q, y) / var(y)
pub fn nmse_q(y: &ArrayView3<f32>, q: &Array2<f32>) -> LatentResult<f32> {
    if y.dim().2 != q.ncols() {
        return Err(LatentError::shape("target latent y features", q.ncols(), y.dim().2));
    }
    let y_flat = flatten_time(y)?;
    let variance = latent_variance(&y_flat.view(), "nmse_q")?;
    let residual = y_flat.dot(&q.t()).dot(q) - &y_flat;
    Ok(mean_square(&residual)? / variance)
}

/// 손실 구성 요소
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossBreakdown {
    pub mse_z: f32,
    pub nmse_y: f32,
    pub total: f32,
}

/// 손실의 그래디언트
#[derive(Debug, Clone)]
pub struct LossGradients {
    /// ∂L/∂x (batch, time, n)
    pub states: Array3<f32>,
    /// ∂L/∂W_out (유효 가중치 기준)
    pub output: Array2<f32>,
    /// ∂L/∂Q
    pub q: Array2<f32>,
}

/// 학습 목적 함수: mse_z(x, z) + l_y·nmse_y(y, x)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeLoss {
    pub l_y: f32,
}

impl CompositeLoss {
    pub fn new(l_y: f32) -> Self {
        Self { l_y }
    }

    pub fn evaluate(
        &self,
        x: &ArrayView3<f32>,
        z: &ArrayView3<f32>,
        y: &ArrayView3<f32>,
        w_out: &Array2<f32>,
        q: &Array2<f32>,
    ) -> LatentResult<LossBreakdown> {
        let mse = mse_z(x, z, w_out)?;
        let nmse = nmse_y(y, x, q)?;
        Ok(LossBreakdown {
            mse_z: mse,
            nmse_y: nmse,
            total: mse + self.l_y * nmse,
        })
    }

    /// 손실과 x, W_out, Q에 대한 해석적 그래디언트
    pub fn evaluate_with_gradients(
        &self,
        x: &ArrayView3<f32>,
        z: &ArrayView3<f32>,
        y: &ArrayView3<f32>,
        w_out: &Array2<f32>,
        q: &Array2<f32>,
    ) -> LatentResult<(LossBreakdown, LossGradients)> {
        check_pair("target output z", x, z, w_out.nrows())?;
        check_pair("target latent y", x, y, q.ncols())?;
        let (batch, steps, _) = x.dim();
        let rows = (batch * steps) as f32;
        let latent_dim = q.ncols() as f32;

        let x_flat = flatten_time(x)?;
        let y_flat = flatten_time(y)?;
        let variance = latent_variance(&y_flat.view(), "nmse_y")?;

        // 출력 항
        let out_residual = x_flat.dot(&w_out.t()) - flatten_time(z)?;
        let mse = out_residual.mapv(|v| v * v).sum() / rows;
        let out_scale = 2.0 / rows;
        let mut grad_x = out_residual.dot(w_out) * out_scale;
        let grad_w_out = out_residual.t().dot(&x_flat) * out_scale;

        // 잠재 정렬 항
        let latent_residual = x_flat.dot(q) - &y_flat;
        let nmse = latent_residual.mapv(|v| v * v).sum() / (rows * latent_dim) / variance;
        let latent_scale = 2.0 * self.l_y / (rows * latent_dim * variance);
        grad_x.scaled_add(latent_scale, &latent_residual.dot(&q.t()));
        let grad_q = x_flat.t().dot(&latent_residual) * latent_scale;

        let breakdown = LossBreakdown {
            mse_z: mse,
            nmse_y: nmse,
            total: mse + self.l_y * nmse,
        };
        let gradients = LossGradients {
            states: unflatten_time(grad_x, batch, steps)?,
            output: grad_w_out,
            q: grad_q,
        };
        Ok((breakdown, gradients))
    }
}
