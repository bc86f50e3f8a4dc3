//! 저차원 잠재 부분공간 제약 순환망
//!
//! 자유 파라미터(순환/입력/출력 원시 가중치, 케일리 생성 행렬)와
//! 그로부터 유도되는 값(마스크된 유효 가중치, 투영 행렬 Q)을 분리해 보관한다.
//! 유도 값은 `reconstrain`으로만 갱신된다.

use crate::core::config::{NetConfig, TrainConfig};
use crate::core::dynamics::{EulerIntegrator, Trajectory};
use crate::core::error::{LatentError, LatentResult};
use crate::core::layers::{ConstrainedLinear, MaskKind};
use crate::core::loss::{self, flatten_time, unflatten_time, CompositeLoss, LossBreakdown};
use crate::core::projector::OrthogonalProjector;
use crate::core::trainer::Trainer;
use ndarray::{s, Array2, Array3, ArrayView3};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// 원시 파라미터 공간의 그래디언트
#[derive(Debug, Clone)]
pub struct NetworkGradients {
    pub recurrent: Array2<f32>,
    pub input: Array2<f32>,
    pub output: Array2<f32>,
    pub generator: Array2<f32>,
}

#[derive(Debug, Clone)]
pub struct LatentNet {
    config: NetConfig,
    /// 상태 → 상태 (n × n), 제약 없음
    pub recurrent: ConstrainedLinear,
    /// 입력 → 상태 (n × input_size), 선행 항등 블록
    pub input: ConstrainedLinear,
    /// 상태 → 출력 (output_size × n), 후행 항등 블록
    pub output: ConstrainedLinear,
    /// 잠재 공간 → 순환 상태 공간 투영
    pub projector: OrthogonalProjector,
    /// 고정 초기 은닉 상태 (n_trials × 1 × n), 학습되지 않음
    init_hidden: Array3<f32>,
    integrator: EulerIntegrator,
    rng: StdRng,
}

impl LatentNet {
    /// 구성에 따라 파라미터를 임의 초기화
    ///
    /// 순환 ~ N(0, 0.025), 입력/출력 ~ N(0.2, 0.1), 생성 행렬 ~ U[0, 1).
    pub fn new(config: NetConfig) -> LatentResult<Self> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let n = config.n;
        let recurrent = ConstrainedLinear::normal(&mut rng, n, n, 0.0, 0.025, MaskKind::Dense)?;
        let input = ConstrainedLinear::normal(
            &mut rng,
            n,
            config.input_size,
            0.2,
            0.1,
            MaskKind::LeadingIdentity(config.input_size),
        )?;
        let output = ConstrainedLinear::normal(
            &mut rng,
            config.output_size,
            n,
            0.2,
            0.1,
            MaskKind::TrailingIdentity(config.output_size),
        )?;
        let projector = OrthogonalProjector::random(&mut rng, config.latent_dim, n)?;

        Ok(Self {
            init_hidden: Array3::zeros((config.n_trials, 1, n)),
            integrator: EulerIntegrator::new(config.alpha, config.sigma_rec),
            config,
            recurrent,
            input,
            output,
            projector,
            rng,
        })
    }

    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    /// 현재 투영 행렬 Q (n × N)
    pub fn q(&self) -> &Array2<f32> {
        self.projector.q()
    }

    pub fn init_hidden(&self) -> &Array3<f32> {
        &self.init_hidden
    }

    /// 자유 파라미터가 바뀐 뒤 유도 값(Q, 마스크된 가중치) 재계산
    pub fn reconstrain(&mut self) -> LatentResult<()> {
        self.projector.refresh()?;
        self.recurrent.reconstrain();
        self.input.reconstrain();
        self.output.reconstrain();
        Ok(())
    }

    /// 잡음 난수 생성기 재시드
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// 순환 잡음 크기 변경 (분석 시 0으로 끄는 용도)
    pub fn set_sigma_rec(&mut self, sigma_rec: f32) -> LatentResult<()> {
        if !sigma_rec.is_finite() || sigma_rec < 0.0 {
            return Err(LatentError::InvalidConfig(format!(
                "sigma_rec must be a non-negative finite number, got {}",
                sigma_rec
            )));
        }
        self.config.sigma_rec = sigma_rec;
        self.integrator.sigma_rec = sigma_rec;
        Ok(())
    }

    fn initial_state(&self, batch: usize) -> Array2<f32> {
        if batch == self.config.n_trials {
            self.init_hidden.slice(s![.., 0, ..]).to_owned()
        } else {
            Array2::zeros((batch, self.config.n))
        }
    }

    /// 순전파 + 역전파용 활성화 이전 값
    pub fn forward_traced(&mut self, u: &ArrayView3<f32>) -> LatentResult<Trajectory> {
        let batch = u.dim().0;
        if batch == 0 {
            return Err(LatentError::EmptyDataset);
        }
        let initial = self.initial_state(batch);
        self.integrator.integrate(
            &self.recurrent,
            &self.input,
            u,
            &initial.view(),
            &mut self.rng,
        )
    }

    /// u (batch, T, input_size) → x (batch, T, n)
    pub fn forward(&mut self, u: &ArrayView3<f32>) -> LatentResult<Array3<f32>> {
        Ok(self.forward_traced(u)?.into_states())
    }

    /// 출력 사상: x (batch, T, n) → (batch, T, output_size)
    pub fn output(&self, x: &ArrayView3<f32>) -> LatentResult<Array3<f32>> {
        let (batch, steps, _) = x.dim();
        let flat = flatten_time(x)?;
        unflatten_time(self.output.forward(&flat.view())?, batch, steps)
    }

    /// x·Q: 순환 상태를 잠재 공간 좌표로
    pub fn latent_projection(&self, x: &ArrayView3<f32>) -> LatentResult<Array3<f32>> {
        let (batch, steps, features) = x.dim();
        if features != self.config.n {
            return Err(LatentError::shape("state features", self.config.n, features));
        }
        unflatten_time(flatten_time(x)?.dot(self.q()), batch, steps)
    }

    pub fn mse_z(&self, x: &ArrayView3<f32>, z: &ArrayView3<f32>) -> LatentResult<f32> {
        loss::mse_z(x, z, self.output.weight())
    }

    pub fn nmse_y(&self, y: &ArrayView3<f32>, x: &ArrayView3<f32>) -> LatentResult<f32> {
        loss::nmse_y(y, x, self.q())
    }

    pub fn nmse_x(&self, y: &ArrayView3<f32>, x: &ArrayView3<f32>) -> LatentResult<f32> {
        loss::nmse_x(y, x, self.q())
    }

    pub fn nmse_q(&self, y: &ArrayView3<f32>) -> LatentResult<f32> {
        loss::nmse_q(y, self.q())
    }

    /// mse_z(x, z) + l_y·nmse_y(y, x)
    pub fn loss(
        &self,
        x: &ArrayView3<f32>,
        z: &ArrayView3<f32>,
        y: &ArrayView3<f32>,
        l_y: f32,
    ) -> LatentResult<LossBreakdown> {
        CompositeLoss::new(l_y).evaluate(x, z, y, self.output.weight(), self.q())
    }

    /// 한 배치의 순전파, 손실, 원시 파라미터 그래디언트
    pub fn loss_and_gradients(
        &mut self,
        u: &ArrayView3<f32>,
        z: &ArrayView3<f32>,
        y: &ArrayView3<f32>,
        l_y: f32,
    ) -> LatentResult<(LossBreakdown, NetworkGradients)> {
        let trajectory = self.forward_traced(u)?;
        let (breakdown, grads) = CompositeLoss::new(l_y).evaluate_with_gradients(
            &trajectory.states.view(),
            z,
            y,
            self.output.weight(),
            self.q(),
        )?;
        let dynamics = self
            .integrator
            .backward(&self.recurrent, &trajectory, u, &grads.states)?;
        let generator = self.projector.backward(&grads.q)?;

        let gradients = NetworkGradients {
            recurrent: self.recurrent.raw_gradient(dynamics.recurrent),
            input: self.input.raw_gradient(dynamics.input),
            output: self.output.raw_gradient(grads.output),
            generator,
        };
        Ok((breakdown, gradients))
    }

    /// 미니배치 학습. 보고 주기마다의 누적 손실 목록 반환
    #[allow(clippy::too_many_arguments)]
    pub fn fit(
        &mut self,
        u: &ArrayView3<f32>,
        z: &ArrayView3<f32>,
        y: &ArrayView3<f32>,
        epochs: usize,
        lr: f32,
        l_y: f32,
        weight_decay: f32,
    ) -> LatentResult<Vec<f32>> {
        let trainer = Trainer::new(TrainConfig::new(epochs, lr, l_y, weight_decay))?;
        trainer.fit(self, u, z, y)
    }
}
