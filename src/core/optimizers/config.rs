use crate::core::config::TrainConfig;

/// Adam 옵티마이저 구성
#[derive(Debug, Clone, PartialEq)]
pub struct AdamConfig {
    /// 베타1 파라미터 (1차 모멘트 지수 감소율)
    pub beta1: f32,
    /// 베타2 파라미터 (2차 모멘트 지수 감소율)
    pub beta2: f32,
    /// 엡실론 (수치 안정성을 위한 작은 값)
    pub epsilon: f32,
    /// 학습률
    pub learning_rate: f32,
    /// 가중치 감소
    pub weight_decay: f32,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            learning_rate: 0.001,
            weight_decay: 0.0,
        }
    }
}

impl AdamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_learning_rate(mut self, lr: f32) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_weight_decay(mut self, decay: f32) -> Self {
        self.weight_decay = decay;
        self
    }
}

impl From<&TrainConfig> for AdamConfig {
    fn from(train: &TrainConfig) -> Self {
        Self {
            beta1: train.beta1,
            beta2: train.beta2,
            epsilon: train.epsilon,
            learning_rate: train.learning_rate,
            weight_decay: train.weight_decay,
        }
    }
}
