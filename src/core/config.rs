//! # 구성 설정
//!
//! 네트워크 구조, 학습 하이퍼파라미터, 실험 전체 설정.
//! 모든 필드는 기본값을 가지며 JSON 파일에서 일부만 덮어쓸 수 있다.

use crate::core::error::{LatentError, LatentResult};
use crate::task::TaskConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 연산 장치. 현재는 CPU만 지원
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Cpu,
}

/// 잠재 네트워크 구성
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// 순환 상태 차원 (n)
    pub n: usize,
    /// 잠재 공간 차원 (N, n ≤ N)
    pub latent_dim: usize,
    /// 고정 초기 은닉 상태의 시행 수
    pub n_trials: usize,
    /// 순환 잡음 크기
    pub sigma_rec: f32,
    pub input_size: usize,
    pub output_size: usize,
    /// 누수율 (오일러 적분 스텝)
    pub alpha: f32,
    pub device: Device,
    /// 초기화와 잡음에 쓰이는 시드. 없으면 엔트로피에서 생성
    pub seed: Option<u64>,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            n: 8,
            latent_dim: 16,
            n_trials: 1,
            sigma_rec: 0.15,
            input_size: 6,
            output_size: 2,
            alpha: 0.2,
            device: Device::Cpu,
            seed: None,
        }
    }
}

impl NetConfig {
    pub fn new(n: usize, latent_dim: usize, n_trials: usize) -> Self {
        Self {
            n,
            latent_dim,
            n_trials,
            ..Self::default()
        }
    }

    pub fn with_sigma_rec(mut self, sigma_rec: f32) -> Self {
        self.sigma_rec = sigma_rec;
        self
    }

    pub fn with_input_size(mut self, input_size: usize) -> Self {
        self.input_size = input_size;
        self
    }

    pub fn with_output_size(mut self, output_size: usize) -> Self {
        self.output_size = output_size;
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// 구조 제약 검사
    ///
    /// 입력/출력 마스크의 항등 블록이 순환 상태 안에 들어가야 하고,
    /// 투영 행렬 Q는 N×N 직교 행렬의 앞 n개 행이므로 n ≤ N 이어야 한다.
    pub fn validate(&self) -> LatentResult<()> {
        if self.n == 0 || self.latent_dim == 0 || self.input_size == 0 || self.output_size == 0 {
            return Err(LatentError::InvalidConfig(format!(
                "all widths must be positive (n={}, N={}, input={}, output={})",
                self.n, self.latent_dim, self.input_size, self.output_size
            )));
        }
        if self.n_trials == 0 {
            return Err(LatentError::InvalidConfig("n_trials must be positive".into()));
        }
        if self.n > self.latent_dim {
            return Err(LatentError::InvalidConfig(format!(
                "recurrent width n={} exceeds latent width N={}",
                self.n, self.latent_dim
            )));
        }
        if self.n < self.input_size {
            return Err(LatentError::InvalidConfig(format!(
                "input identity block {}x{} does not fit in n={}",
                self.input_size, self.input_size, self.n
            )));
        }
        if self.n < self.output_size {
            return Err(LatentError::InvalidConfig(format!(
                "output identity block {}x{} does not fit in n={}",
                self.output_size, self.output_size, self.n
            )));
        }
        if !self.sigma_rec.is_finite() || self.sigma_rec < 0.0 {
            return Err(LatentError::InvalidConfig(format!(
                "sigma_rec must be a non-negative finite number, got {}",
                self.sigma_rec
            )));
        }
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(LatentError::InvalidConfig(format!(
                "alpha must lie in (0, 1], got {}",
                self.alpha
            )));
        }
        Ok(())
    }
}

/// 학습 구성
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub epochs: usize,
    pub learning_rate: f32,
    /// 잠재 정렬 손실 가중치
    pub l_y: f32,
    /// L2 가중치 감소 (Adam 그래디언트에 결합)
    pub weight_decay: f32,
    pub batch_size: usize,
    /// 보고 주기 (에포크, 0부터 셈)
    pub report_every: usize,
    pub show_progress: bool,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            learning_rate: 1e-3,
            l_y: 1.0,
            weight_decay: 0.0,
            batch_size: 128,
            report_every: 10,
            show_progress: false,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

impl TrainConfig {
    pub fn new(epochs: usize, learning_rate: f32, l_y: f32, weight_decay: f32) -> Self {
        Self {
            epochs,
            learning_rate,
            l_y,
            weight_decay,
            ..Self::default()
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_report_every(mut self, report_every: usize) -> Self {
        self.report_every = report_every;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn with_adam_betas(mut self, beta1: f32, beta2: f32) -> Self {
        self.beta1 = beta1;
        self.beta2 = beta2;
        self
    }

    pub fn validate(&self) -> LatentResult<()> {
        if self.batch_size == 0 {
            return Err(LatentError::InvalidConfig("batch_size must be positive".into()));
        }
        if self.report_every == 0 {
            return Err(LatentError::InvalidConfig("report_every must be positive".into()));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(LatentError::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !self.l_y.is_finite() || self.l_y < 0.0 {
            return Err(LatentError::InvalidConfig(format!(
                "l_y must be non-negative, got {}",
                self.l_y
            )));
        }
        if !self.weight_decay.is_finite() || self.weight_decay < 0.0 {
            return Err(LatentError::InvalidConfig(format!(
                "weight_decay must be non-negative, got {}",
                self.weight_decay
            )));
        }
        Ok(())
    }
}

/// 실험 전체 구성 (네트워크 + 학습 + 과제)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub net: NetConfig,
    pub train: TrainConfig,
    pub task: TaskConfig,
}

impl ExperimentConfig {
    /// JSON 파일에서 구성 로드. 누락된 필드는 기본값
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> LatentResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> LatentResult<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn validate(&self) -> LatentResult<()> {
        self.net.validate()?;
        self.train.validate()?;
        self.task.validate()?;
        if self.task.input_channels() != self.net.input_size {
            return Err(LatentError::InvalidConfig(format!(
                "task produces {} input channels but net.input_size is {}",
                self.task.input_channels(),
                self.net.input_size
            )));
        }
        if self.task.output_channels() != self.net.output_size {
            return Err(LatentError::InvalidConfig(format!(
                "task produces {} outputs but net.output_size is {}",
                self.task.output_channels(),
                self.net.output_size
            )));
        }
        Ok(())
    }
}
