use crate::core::error::LatentError;
use crate::core::loss::*;
use crate::core::projector::OrthogonalProjector;
use approx::assert_abs_diff_eq;
use ndarray::{Array2, Array3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random3(shape: (usize, usize, usize), seed: u64) -> Array3<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array3::from_shape_fn(shape, |_| rng.gen_range(-1.0f32..1.0))
}

fn random2(shape: (usize, usize), seed: u64) -> Array2<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn(shape, |_| rng.gen_range(-1.0f32..1.0))
}

fn projector_q(latent_dim: usize, rank: usize, seed: u64) -> Array2<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    OrthogonalProjector::random(&mut rng, latent_dim, rank).unwrap().q().clone()
}

#[test]
fn 출력손실_완전일치시_0() {
    let x = Array3::<f32>::zeros((3, 4, 5));
    let z = Array3::<f32>::zeros((3, 4, 2));
    let w_out = random2((2, 5), 1);

    assert_eq!(mse_z(&x.view(), &z.view(), &w_out).unwrap(), 0.0);
}

#[test]
fn 정확한_사상이면_출력손실_0() {
    let x = random3((2, 3, 4), 2);
    let w_out = random2((2, 4), 3);
    let z = unflatten_time(flatten_time(&x.view()).unwrap().dot(&w_out.t()), 2, 3).unwrap();

    assert_abs_diff_eq!(mse_z(&x.view(), &z.view(), &w_out).unwrap(), 0.0, epsilon = 1e-10);
}

#[test]
fn 출력손실은_배치와_시간으로만_나눔() {
    // 잔차가 모두 1이면 Σr² / (B·T) = 출력 차원
    let x = Array3::<f32>::zeros((2, 5, 3));
    let w_out = Array2::<f32>::zeros((4, 3));
    let z = Array3::<f32>::ones((2, 5, 4));

    assert_abs_diff_eq!(mse_z(&x.view(), &z.view(), &w_out).unwrap(), 4.0, epsilon = 1e-6);
}

#[test]
fn 상수_잠재타깃은_분산오류() {
    let x = random3((3, 4, 2), 4);
    let y = Array3::<f32>::ones((3, 4, 5));
    let q = projector_q(5, 2, 5);

    let err = nmse_y(&y.view(), &x.view(), &q).unwrap_err();
    assert!(matches!(err, LatentError::DegenerateVariance { metric: "nmse_y", .. }));
    assert!(matches!(nmse_x(&y.view(), &x.view(), &q), Err(LatentError::DegenerateVariance { .. })));
    assert!(matches!(nmse_q(&y.view(), &q), Err(LatentError::DegenerateVariance { .. })));
}

#[test]
fn 투영된_상태면_잠재손실_0() {
    let x = random3((2, 6, 3), 6);
    let q = projector_q(5, 3, 7);
    let y = unflatten_time(flatten_time(&x.view()).unwrap().dot(&q), 2, 6).unwrap();

    assert_abs_diff_eq!(nmse_y(&y.view(), &x.view(), &q).unwrap(), 0.0, epsilon = 1e-8);
    // Q의 행이 정규직교이므로 역방향 재구성도 정확
    assert_abs_diff_eq!(nmse_x(&y.view(), &x.view(), &q).unwrap(), 0.0, epsilon = 1e-8);
    assert_abs_diff_eq!(nmse_q(&y.view(), &q).unwrap(), 0.0, epsilon = 1e-8);
}

#[test]
fn 완전_랭크_투영의_왕복오차_0() {
    let y = random3((3, 4, 4), 8);
    let q = projector_q(4, 4, 9);

    assert_abs_diff_eq!(nmse_q(&y.view(), &q).unwrap(), 0.0, epsilon = 1e-6);
}

#[test]
fn 잠재손실은_잠재분산으로_정규화() {
    // x = 0 이면 nmse_y = mean(y²) / var(y)
    let x = Array3::<f32>::zeros((1, 2, 2));
    let q = Array2::<f32>::eye(2);
    let mut y = Array3::<f32>::zeros((1, 2, 2));
    y[[0, 0, 0]] = 1.0;
    y[[0, 1, 0]] = -1.0;

    // mean(y²) = 0.5, 분산 = 0.5
    assert_abs_diff_eq!(nmse_y(&y.view(), &x.view(), &q).unwrap(), 1.0, epsilon = 1e-6);
}

#[test]
fn 형상_불일치는_오류() {
    let x = random3((2, 3, 4), 10);
    let w_out = random2((2, 4), 11);
    let z_bad = random3((2, 4, 2), 12);
    assert!(matches!(
        mse_z(&x.view(), &z_bad.view(), &w_out),
        Err(LatentError::ShapeMismatch { .. })
    ));

    let q = projector_q(6, 4, 13);
    let y_bad = random3((2, 3, 5), 14);
    assert!(nmse_y(&y_bad.view(), &x.view(), &q).is_err());
}

#[test]
fn 합성손실은_개별항의_합() {
    let x = random3((2, 3, 4), 15);
    let z = random3((2, 3, 2), 16);
    let y = random3((2, 3, 6), 17);
    let w_out = random2((2, 4), 18);
    let q = projector_q(6, 4, 19);
    let loss = CompositeLoss::new(0.5);

    let breakdown = loss.evaluate(&x.view(), &z.view(), &y.view(), &w_out, &q).unwrap();
    let (with_grads, _) = loss
        .evaluate_with_gradients(&x.view(), &z.view(), &y.view(), &w_out, &q)
        .unwrap();

    assert_abs_diff_eq!(breakdown.mse_z, mse_z(&x.view(), &z.view(), &w_out).unwrap(), epsilon = 1e-6);
    assert_abs_diff_eq!(breakdown.nmse_y, nmse_y(&y.view(), &x.view(), &q).unwrap(), epsilon = 1e-6);
    assert_abs_diff_eq!(breakdown.total, breakdown.mse_z + 0.5 * breakdown.nmse_y, epsilon = 1e-6);
    assert_abs_diff_eq!(with_grads.total, breakdown.total, epsilon = 1e-5);
}

#[test]
fn 손실_그래디언트_방향미분_일치() {
    let x = random3((2, 3, 4), 20);
    let z = random3((2, 3, 2), 21);
    let y = random3((2, 3, 6), 22);
    let w_out = random2((2, 4), 23);
    let q = projector_q(6, 4, 24);
    let loss = CompositeLoss::new(0.7);
    let (_, grads) = loss
        .evaluate_with_gradients(&x.view(), &z.view(), &y.view(), &w_out, &q)
        .unwrap();

    let total = |x: &Array3<f32>, w: &Array2<f32>, q: &Array2<f32>| -> f32 {
        loss.evaluate(&x.view(), &z.view(), &y.view(), w, q).unwrap().total
    };
    let h = 1e-2f32;

    let dx = random3((2, 3, 4), 25);
    let numeric = (total(&(&x + &(&dx * h)), &w_out, &q) - total(&(&x - &(&dx * h)), &w_out, &q)) / (2.0 * h);
    assert_abs_diff_eq!((&grads.states * &dx).sum(), numeric, epsilon = 1e-2 * (1.0 + numeric.abs()));

    let dw = random2((2, 4), 26);
    let numeric = (total(&x, &(&w_out + &(&dw * h)), &q) - total(&x, &(&w_out - &(&dw * h)), &q)) / (2.0 * h);
    assert_abs_diff_eq!((&grads.output * &dw).sum(), numeric, epsilon = 1e-2 * (1.0 + numeric.abs()));

    let dq = random2((4, 6), 27);
    let numeric = (total(&x, &w_out, &(&q + &(&dq * h))) - total(&x, &w_out, &(&q - &(&dq * h)))) / (2.0 * h);
    assert_abs_diff_eq!((&grads.q * &dq).sum(), numeric, epsilon = 1e-2 * (1.0 + numeric.abs()));
}

#[test]
fn 시간축_평탄화_왕복은_배치_유지() {
    let a = random3((2, 3, 4), 28);
    let flat = flatten_time(&a.view()).unwrap();
    assert_eq!(flat.dim(), (6, 4));
    assert_eq!(flat[[4, 2]], a[[1, 1, 2]]);
}

#[test]
fn 빈_배치는_데이터셋_오류() {
    let x = Array3::<f32>::zeros((0, 3, 6));
    let z = Array3::<f32>::zeros((0, 3, 2));
    let y = Array3::<f32>::zeros((0, 3, 6));
    let w_out = random2((2, 6), 9);
    let q = projector_q(6, 6, 10);

    assert!(matches!(mse_z(&x.view(), &z.view(), &w_out), Err(LatentError::EmptyDataset)));
    assert!(matches!(nmse_y(&y.view(), &x.view(), &q), Err(LatentError::EmptyDataset)));

    let empty_steps = Array3::<f32>::zeros((2, 0, 6));
    let z_steps = Array3::<f32>::zeros((2, 0, 2));
    assert!(matches!(
        mse_z(&empty_steps.view(), &z_steps.view(), &w_out),
        Err(LatentError::EmptyDataset)
    ));
}
