use crate::core::network::{LatentNet, NetworkGradients};
use crate::core::optimizers::{AdamConfig, AdamState};

/// 잠재망의 자유 파라미터 네 개에 대한 Adam
///
/// 원시 가중치와 생성 행렬만 갱신한다. 유도 값 재계산은 호출자의 몫
/// (`LatentNet::reconstrain`).
#[derive(Debug, Clone)]
pub struct LatentAdam {
    pub config: AdamConfig,
    recurrent: AdamState,
    input: AdamState,
    output: AdamState,
    generator: AdamState,
}

impl LatentAdam {
    pub fn new(net: &LatentNet, config: AdamConfig) -> Self {
        let state = |shape: (usize, usize)| {
            AdamState::with_config(shape, config.beta1, config.beta2, config.epsilon)
        };
        Self {
            recurrent: state(net.recurrent.raw.dim()),
            input: state(net.input.raw.dim()),
            output: state(net.output.raw.dim()),
            generator: state(net.projector.generator.dim()),
            config,
        }
    }

    pub fn step(&mut self, net: &mut LatentNet, grads: &NetworkGradients) {
        let lr = self.config.learning_rate;
        let wd = self.config.weight_decay;
        self.recurrent.update(&mut net.recurrent.raw, &grads.recurrent, lr, wd);
        self.input.update(&mut net.input.raw, &grads.input, lr, wd);
        self.output.update(&mut net.output.raw, &grads.output, lr, wd);
        self.generator.update(&mut net.projector.generator, &grads.generator, lr, wd);
    }

    /// 수행한 스텝 수
    pub fn steps(&self) -> i32 {
        self.recurrent.t
    }
}
