use crate::core::dynamics::*;
use crate::core::layers::{ConstrainedLinear, MaskKind};
use approx::assert_abs_diff_eq;
use ndarray::{s, Array2, Array3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn maps(n: usize, input_size: usize, seed: u64) -> (ConstrainedLinear, ConstrainedLinear) {
    let mut rng = StdRng::seed_from_u64(seed);
    let recurrent = ConstrainedLinear::normal(&mut rng, n, n, 0.0, 0.1, MaskKind::Dense).unwrap();
    let input = ConstrainedLinear::normal(&mut rng, n, input_size, 0.2, 0.1, MaskKind::LeadingIdentity(input_size)).unwrap();
    (recurrent, input)
}

fn random_input(batch: usize, steps: usize, features: usize, seed: u64) -> Array3<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array3::from_shape_fn((batch, steps, features), |_| rng.gen_range(0.0f32..1.0))
}

#[test]
fn 궤적_형상과_초기상태() {
    let (recurrent, input) = maps(5, 3, 1);
    let integrator = EulerIntegrator::new(0.2, 0.15);
    let u = random_input(4, 9, 3, 2);
    let initial = Array2::<f32>::zeros((4, 5));
    let mut rng = StdRng::seed_from_u64(3);

    let trajectory = integrator
        .integrate(&recurrent, &input, &u.view(), &initial.view(), &mut rng)
        .unwrap();

    assert_eq!(trajectory.states.dim(), (4, 9, 5));
    assert_eq!(trajectory.preactivations.dim(), (4, 8, 5));
    assert!(trajectory.states.slice(s![.., 0, ..]).iter().all(|&v| v == 0.0), "첫 시점은 항상 0");
}

#[test]
fn 단일_시점은_초기_상태만() {
    let (recurrent, input) = maps(4, 2, 4);
    let integrator = EulerIntegrator::new(0.2, 0.15);
    let u = random_input(3, 1, 2, 5);
    let initial = Array2::<f32>::zeros((3, 4));
    let mut rng = StdRng::seed_from_u64(6);

    let trajectory = integrator
        .integrate(&recurrent, &input, &u.view(), &initial.view(), &mut rng)
        .unwrap();

    assert_eq!(trajectory.states.dim(), (3, 1, 4));
    assert_eq!(trajectory.preactivations.dim().1, 0);
    assert!(trajectory.states.iter().all(|&v| v == 0.0));
}

#[test]
fn 잡음없는_한스텝_수식검증() {
    let recurrent = ConstrainedLinear::new(Array2::zeros((2, 2)), MaskKind::Dense).unwrap();
    let input = ConstrainedLinear::new(Array2::from_elem((2, 1), 0.5), MaskKind::LeadingIdentity(1)).unwrap();
    let integrator = EulerIntegrator::new(0.2, 0.0);
    let u = Array3::from_elem((1, 2, 1), 2.0f32);
    let initial = Array2::<f32>::zeros((1, 2));
    let mut rng = StdRng::seed_from_u64(0);

    let trajectory = integrator
        .integrate(&recurrent, &input, &u.view(), &initial.view(), &mut rng)
        .unwrap();

    // x1 = 0.8·0 + 0.2·relu(0.5·2) = 0.2, 두 번째 유닛은 마스크로 입력 없음
    assert_abs_diff_eq!(trajectory.states[[0, 1, 0]], 0.2, epsilon = 1e-7);
    assert_eq!(trajectory.states[[0, 1, 1]], 0.0);
}

#[test]
fn 잡음_크기_공식() {
    let integrator = EulerIntegrator::new(0.2, 0.15);
    assert_abs_diff_eq!(integrator.noise_scale(), (2.0f32 * 0.2 * 0.0225).sqrt(), epsilon = 1e-7);
    assert_eq!(EulerIntegrator::new(0.2, 0.0).noise_scale(), 0.0);
}

#[test]
fn 잡음은_호출마다_궤적을_바꿈() {
    let (recurrent, input) = maps(4, 2, 7);
    let integrator = EulerIntegrator::new(0.2, 0.5);
    let u = random_input(2, 6, 2, 8);
    let initial = Array2::<f32>::zeros((2, 4));
    let mut rng = StdRng::seed_from_u64(9);

    let first = integrator.integrate(&recurrent, &input, &u.view(), &initial.view(), &mut rng).unwrap();
    let second = integrator.integrate(&recurrent, &input, &u.view(), &initial.view(), &mut rng).unwrap();

    assert_ne!(first.states, second.states, "잡음은 호출마다 새로 샘플링되어야 함");
}

#[test]
fn 입력특징_불일치는_오류() {
    let (recurrent, input) = maps(4, 2, 10);
    let integrator = EulerIntegrator::new(0.2, 0.0);
    let u = random_input(2, 3, 5, 11);
    let initial = Array2::<f32>::zeros((2, 4));
    let mut rng = StdRng::seed_from_u64(12);

    assert!(integrator.integrate(&recurrent, &input, &u.view(), &initial.view(), &mut rng).is_err());
}

#[test]
fn 시간역전파_방향미분_일치() {
    // L = Σ G ⊙ X 에 대해 순환 가중치 방향 미분을 중앙 차분과 비교
    let n = 4;
    let (recurrent, input) = maps(n, n, 13);
    let integrator = EulerIntegrator::new(0.2, 0.0);
    // 모든 유닛이 양의 입력을 받아 relu 꺾임점에서 멀리 있도록
    let u = random_input(3, 5, n, 14).mapv(|v| 0.5 + 0.5 * v);
    let initial = Array2::<f32>::zeros((3, n));
    let mut rng = StdRng::seed_from_u64(15);
    let weights = Array3::from_shape_fn((3, 5, n), |_| rng.gen_range(-1.0f32..1.0));
    let direction = Array2::from_shape_fn((n, n), |_| rng.gen_range(-1.0f32..1.0));

    let trajectory = integrator.integrate(&recurrent, &input, &u.view(), &initial.view(), &mut rng).unwrap();
    let grads = integrator.backward(&recurrent, &trajectory, &u.view(), &weights).unwrap();
    let analytic = (&grads.recurrent * &direction).sum();

    let mut loss_at = |w: Array2<f32>| -> f32 {
        let layer = ConstrainedLinear::new(w, MaskKind::Dense).unwrap();
        let t = integrator.integrate(&layer, &input, &u.view(), &initial.view(), &mut rng).unwrap();
        (&t.states * &weights).sum()
    };
    let h = 1e-3f32;
    let plus = loss_at(recurrent.weight() + &(&direction * h));
    let minus = loss_at(recurrent.weight() - &(&direction * h));
    let numeric = (plus - minus) / (2.0 * h);

    println!("analytic = {:.6}, numeric = {:.6}", analytic, numeric);
    assert!((analytic - numeric).abs() <= 2e-2 * (1.0 + numeric.abs()));
    assert_eq!(grads.input.dim(), (n, n));
}
