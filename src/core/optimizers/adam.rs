use ndarray::{Array2, Zip};

/// Adam 최적화기 상태 (텐서 하나당 하나)
#[derive(Debug, Clone)]
pub struct AdamState {
    pub m: Array2<f32>, // 1차 모멘트
    pub v: Array2<f32>, // 2차 모멘트
    pub t: i32,         // 시간 스텝
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
}

impl AdamState {
    pub fn new(shape: (usize, usize)) -> Self {
        Self::with_config(shape, 0.9, 0.999, 1e-8)
    }

    pub fn with_config(shape: (usize, usize), beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            m: Array2::zeros(shape),
            v: Array2::zeros(shape),
            t: 0,
            beta1,
            beta2,
            epsilon,
        }
    }

    /// Adam 업데이트 수행
    ///
    /// 가중치 감소는 그래디언트에 결합된다: g ← g + wd·θ
    pub fn update(
        &mut self,
        param: &mut Array2<f32>,
        gradient: &Array2<f32>,
        learning_rate: f32,
        weight_decay: f32,
    ) {
        self.t += 1;
        let (beta1, beta2, epsilon) = (self.beta1, self.beta2, self.epsilon);

        // 편향 보정
        let bias1 = 1.0 - beta1.powi(self.t);
        let bias2 = 1.0 - beta2.powi(self.t);

        Zip::from(param)
            .and(gradient)
            .and(&mut self.m)
            .and(&mut self.v)
            .for_each(|p, &g, m, v| {
                let g = g + weight_decay * *p;
                *m = beta1 * *m + (1.0 - beta1) * g;
                *v = beta2 * *v + (1.0 - beta2) * g * g;

                let m_hat = *m / bias1;
                let v_hat = *v / bias2;
                *p -= learning_rate * m_hat / (v_hat.sqrt() + epsilon);
            });
    }

    /// 상태 초기화
    pub fn reset(&mut self) {
        self.m.fill(0.0);
        self.v.fill(0.0);
        self.t = 0;
    }
}
