//! 오일러 이산화된 누수 순환 동역학
//!
//! x[i+1] = (1 − α)·x[i] + α·relu(W_rec·x[i] + W_in·u[i] + ξ[i]),
//! ξ[i] ~ N(0, 1)·sqrt(2·α·σ²), 유닛/시행/시점마다 독립.
//!
//! 시간 방향은 엄격히 순차적이고, 배치/특징 방향은 한 스텝 안에서 벡터화된다.

use crate::core::error::{LatentError, LatentResult};
use crate::core::layers::ConstrainedLinear;
use ndarray::{s, Array2, Array3, ArrayView2, ArrayView3, Zip};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// 순전파 궤적
///
/// `states`는 (batch, T, n) 버퍼에 시점별로 기록되고,
/// 역전파를 위해 각 스텝의 활성화 이전 값을 (batch, T−1, n)으로 함께 보관한다.
#[derive(Debug, Clone)]
pub struct Trajectory {
    pub states: Array3<f32>,
    pub preactivations: Array3<f32>,
}

impl Trajectory {
    pub fn batch_size(&self) -> usize {
        self.states.dim().0
    }

    pub fn steps(&self) -> usize {
        self.states.dim().1
    }

    pub fn into_states(self) -> Array3<f32> {
        self.states
    }
}

/// 순환 사상과 입력 사상의 그래디언트 (유효 가중치 기준)
#[derive(Debug, Clone)]
pub struct DynamicsGradients {
    pub recurrent: Array2<f32>,
    pub input: Array2<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EulerIntegrator {
    /// 누수율
    pub alpha: f32,
    /// 순환 잡음 크기
    pub sigma_rec: f32,
}

impl EulerIntegrator {
    pub fn new(alpha: f32, sigma_rec: f32) -> Self {
        Self { alpha, sigma_rec }
    }

    /// sqrt(2·α·σ²)
    pub fn noise_scale(&self) -> f32 {
        (2.0 * self.alpha * self.sigma_rec * self.sigma_rec).sqrt()
    }

    /// 궤적 적분. T = 1이면 초기 상태만 담긴 궤적
    pub fn integrate<R: Rng + ?Sized>(
        &self,
        recurrent: &ConstrainedLinear,
        input: &ConstrainedLinear,
        u: &ArrayView3<f32>,
        initial: &ArrayView2<f32>,
        rng: &mut R,
    ) -> LatentResult<Trajectory> {
        let (batch, steps, features) = u.dim();
        let n = recurrent.out_features();
        if features != input.in_features() {
            return Err(LatentError::shape(
                "input feature dimension",
                input.in_features(),
                features,
            ));
        }
        if steps == 0 {
            return Err(LatentError::shape("input time steps", "at least 1", steps));
        }
        if initial.dim() != (batch, n) {
            return Err(LatentError::shape("initial state", (batch, n), initial.dim()));
        }

        let mut states = Array3::<f32>::zeros((batch, steps, n));
        let mut preactivations = Array3::<f32>::zeros((batch, steps - 1, n));
        states.slice_mut(s![.., 0, ..]).assign(initial);

        let scale = self.noise_scale();
        let leak = 1.0 - self.alpha;
        for i in 0..steps - 1 {
            let x = states.slice(s![.., i, ..]);
            let mut pre = recurrent.forward(&x)? + input.forward(&u.slice(s![.., i, ..]))?;
            if scale > 0.0 {
                pre.mapv_inplace(|p| {
                    let xi: f32 = StandardNormal.sample(&mut *rng);
                    p + scale * xi
                });
            }
            let next = &x * leak + &(pre.mapv(|p| p.max(0.0)) * self.alpha);

            states.slice_mut(s![.., i + 1, ..]).assign(&next);
            preactivations.slice_mut(s![.., i, ..]).assign(&pre);
        }

        Ok(Trajectory {
            states,
            preactivations,
        })
    }

    /// 시간 역전파
    ///
    /// `grad_states`는 손실이 각 상태에 직접 주는 그래디언트 (batch, T, n).
    /// 초기 상태는 고정이므로 그 그래디언트는 버린다. relu'(0) = 0.
    pub fn backward(
        &self,
        recurrent: &ConstrainedLinear,
        trajectory: &Trajectory,
        u: &ArrayView3<f32>,
        grad_states: &Array3<f32>,
    ) -> LatentResult<DynamicsGradients> {
        let (_, steps, n) = trajectory.states.dim();
        if grad_states.dim() != trajectory.states.dim() {
            return Err(LatentError::shape(
                "state gradient",
                trajectory.states.dim(),
                grad_states.dim(),
            ));
        }
        let input_features = u.dim().2;
        let mut grad_recurrent = Array2::<f32>::zeros((n, n));
        let mut grad_input = Array2::<f32>::zeros((n, input_features));

        let leak = 1.0 - self.alpha;
        let mut carry = grad_states.slice(s![.., steps - 1, ..]).to_owned();
        for t in (1..steps).rev() {
            let pre = trajectory.preactivations.slice(s![.., t - 1, ..]);
            let mut grad_pre = &carry * self.alpha;
            Zip::from(&mut grad_pre).and(&pre).for_each(|g, &p| {
                if p <= 0.0 {
                    *g = 0.0;
                }
            });

            let x_prev = trajectory.states.slice(s![.., t - 1, ..]);
            grad_recurrent += &grad_pre.t().dot(&x_prev);
            grad_input += &grad_pre.t().dot(&u.slice(s![.., t - 1, ..]));

            carry = &grad_states.slice(s![.., t - 1, ..])
                + &(&carry * leak)
                + grad_pre.dot(recurrent.weight());
        }

        Ok(DynamicsGradients {
            recurrent: grad_recurrent,
            input: grad_input,
        })
    }
}
