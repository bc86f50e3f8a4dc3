use crate::core::optimizers::*;
use ndarray::{array, Array2};

#[test]
fn adam상태_초기화_테스트() {
    let adam_state = AdamState::new((2, 3));

    assert!(adam_state.m.iter().all(|&m| m == 0.0), "1차 모멘트는 0으로 초기화되어야 함");
    assert!(adam_state.v.iter().all(|&v| v == 0.0), "2차 모멘트는 0으로 초기화되어야 함");
    assert_eq!(adam_state.t, 0, "시간 스텝은 0으로 초기화되어야 함");
    assert_eq!(adam_state.beta1, 0.9, "beta1 기본값은 0.9");
    assert_eq!(adam_state.beta2, 0.999, "beta2 기본값은 0.999");
    assert_eq!(adam_state.epsilon, 1e-8, "epsilon 기본값은 1e-8");
}

#[test]
fn adam업데이트_기본동작_테스트() {
    let mut adam_state = AdamState::new((1, 2));
    let mut param = array![[1.0f32, 1.0]];
    let gradient = array![[0.1f32, -0.1]];
    let lr = 0.001;

    adam_state.update(&mut param, &gradient, lr, 0.0);

    assert!(param[[0, 0]] < 1.0, "양의 그래디언트에 대해 파라미터는 감소해야 함");
    assert!(param[[0, 1]] > 1.0, "음의 그래디언트에 대해 파라미터는 증가해야 함");
    // 첫 스텝은 편향 보정 후 크기가 lr
    assert!((param[[0, 0]] - (1.0 - lr)).abs() < 1e-6);
    assert_eq!(adam_state.t, 1, "시간 스텝이 증가해야 함");
}

#[test]
fn adam업데이트_연속호출_수렴_테스트() {
    // f(θ) = ½‖θ‖² 최소화
    let mut adam_state = AdamState::new((2, 2));
    let mut param = array![[1.0f32, -2.0], [0.5, 3.0]];

    for _ in 0..2000 {
        let gradient = param.clone();
        adam_state.update(&mut param, &gradient, 0.01, 0.0);
    }

    assert!(param.iter().all(|p| p.abs() < 0.05), "충분한 반복 후 0 근처로 수렴해야 함: {:?}", param);
    assert_eq!(adam_state.t, 2000);
}

#[test]
fn 가중치_감소는_그래디언트_없이도_축소() {
    let mut adam_state = AdamState::new((1, 1));
    let mut param = array![[2.0f32]];
    let zero = Array2::<f32>::zeros((1, 1));

    adam_state.update(&mut param, &zero, 0.01, 0.1);

    assert!(param[[0, 0]] < 2.0, "가중치 감소는 그래디언트가 0이어도 파라미터를 줄여야 함");
}

#[test]
fn 초기화하면_모멘트_제거() {
    let mut adam_state = AdamState::new((1, 1));
    let mut param = array![[1.0f32]];
    adam_state.update(&mut param, &array![[0.5f32]], 0.1, 0.0);
    adam_state.reset();

    assert_eq!(adam_state.t, 0);
    assert_eq!(adam_state.m[[0, 0]], 0.0);
    assert_eq!(adam_state.v[[0, 0]], 0.0);
}

#[test]
fn adam구성_기본값_테스트() {
    let config = AdamConfig::default();

    assert_eq!(config.beta1, 0.9);
    assert_eq!(config.beta2, 0.999);
    assert_eq!(config.epsilon, 1e-8);
    assert_eq!(config.learning_rate, 0.001);
    assert_eq!(config.weight_decay, 0.0);

    let tuned = AdamConfig::new().with_learning_rate(0.05).with_weight_decay(1e-4);
    assert_eq!(tuned.learning_rate, 0.05);
    assert_eq!(tuned.weight_decay, 1e-4);
    println!("✅ Adam 구성 기본값 테스트 통과");
}

#[test]
fn 학습구성에서_adam구성_변환() {
    let train = crate::core::config::TrainConfig::new(10, 0.02, 1.0, 0.003).with_adam_betas(0.8, 0.99);
    let adam = AdamConfig::from(&train);

    assert_eq!(adam.learning_rate, 0.02);
    assert_eq!(adam.weight_decay, 0.003);
    assert_eq!(adam.beta1, 0.8);
    assert_eq!(adam.beta2, 0.99);
}
