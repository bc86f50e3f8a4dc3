use anyhow::{Context as _, Result};
use clap::Parser;
use latent_net::analysis::CoherenceAxis;
use latent_net::{
    Context, ExperimentConfig, LatentNet, NetConfig, PsychometricReport, TaskDataset, Trainer,
};
use log::info;
use std::path::PathBuf;

/// 맥락 의존 과제에서 참조 순환망의 궤적을 저차원 잠재망으로 재현
#[derive(Parser, Debug)]
#[command(name = "latent_net", version, about)]
struct Args {
    /// JSON 실험 구성 파일
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long)]
    epochs: Option<usize>,

    /// 학습률
    #[arg(long)]
    lr: Option<f32>,

    /// 잠재 정렬 손실 가중치
    #[arg(long = "l-y")]
    l_y: Option<f32>,

    #[arg(long = "weight-decay")]
    weight_decay: Option<f32>,

    #[arg(long = "batch-size")]
    batch_size: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// 잠재망 순환 차원
    #[arg(long)]
    n: Option<usize>,

    /// 잠재 공간 차원 (참조망 폭)
    #[arg(long = "latent-dim")]
    latent_dim: Option<usize>,

    #[arg(long = "sigma-rec")]
    sigma_rec: Option<f32>,

    /// 에포크 진행 막대 표시
    #[arg(long)]
    progress: bool,

    /// 정신측정 리포트를 JSON으로 저장
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
}

impl Args {
    fn experiment(&self) -> Result<ExperimentConfig> {
        let mut config = match &self.config {
            Some(path) => ExperimentConfig::from_json_file(path)
                .with_context(|| format!("구성 파일 로드 실패: {}", path.display()))?,
            None => ExperimentConfig::default(),
        };
        if let Some(epochs) = self.epochs {
            config.train.epochs = epochs;
        }
        if let Some(lr) = self.lr {
            config.train.learning_rate = lr;
        }
        if let Some(l_y) = self.l_y {
            config.train.l_y = l_y;
        }
        if let Some(decay) = self.weight_decay {
            config.train.weight_decay = decay;
        }
        if let Some(batch_size) = self.batch_size {
            config.train.batch_size = batch_size;
        }
        if let Some(seed) = self.seed {
            config.net.seed = Some(seed);
        }
        if let Some(n) = self.n {
            config.net.n = n;
        }
        if let Some(latent_dim) = self.latent_dim {
            config.net.latent_dim = latent_dim;
        }
        if let Some(sigma_rec) = self.sigma_rec {
            config.net.sigma_rec = sigma_rec;
        }
        config.train.show_progress |= self.progress;
        config.validate()?;
        Ok(config)
    }
}

fn print_report(report: &PsychometricReport) {
    println!("\n=== 정신측정 곡선 ===");
    for axis in [CoherenceAxis::Motion, CoherenceAxis::Color] {
        for context in Context::ALL {
            if let Some(curve) = report.curve(context, axis) {
                let axis_name = match axis {
                    CoherenceAxis::Motion => "motion",
                    CoherenceAxis::Color => "color",
                };
                println!(
                    "  {} coherence / {} context: alpha={:.4} beta={:.4} sse={:.2e}",
                    axis_name,
                    context.name(),
                    curve.fit.alpha,
                    curve.fit.beta,
                    curve.fit.sse
                );
            }
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.experiment()?;
    let data = TaskDataset::generate(&config.task)?;
    let trials = data.trials();
    info!(
        "task: {} trials × {} steps, {} coherence levels",
        trials,
        config.task.steps,
        config.task.coherences.len()
    );

    // 1단계: 잠재 공간 폭의 참조망을 행동 출력만으로 학습
    let latent_dim = config.net.latent_dim;
    let mut reference_config = NetConfig {
        n: latent_dim,
        n_trials: trials,
        ..config.net.clone()
    };
    reference_config.seed = config.net.seed.map(|s| s.wrapping_add(1));
    let mut reference = LatentNet::new(reference_config)?;
    let initial_states = reference.forward(&data.inputs.view())?;
    let placeholder = reference.latent_projection(&initial_states.view())?;

    println!("=== 참조망 학습 (n = {}) ===", latent_dim);
    let mut reference_train = config.train.clone();
    reference_train.l_y = 0.0;
    Trainer::new(reference_train)?.fit(
        &mut reference,
        &data.inputs.view(),
        &data.targets.view(),
        &placeholder.view(),
    )?;

    reference.set_sigma_rec(0.0)?;
    let reference_states = reference.forward(&data.inputs.view())?;
    let y = reference.latent_projection(&reference_states.view())?;

    // 2단계: 저차원 잠재망이 참조 궤적과 행동을 함께 재현
    let net_config = NetConfig {
        n_trials: trials,
        ..config.net.clone()
    };
    let mut net = LatentNet::new(net_config)?;
    println!("\n=== 잠재망 학습 (n = {}, N = {}) ===", config.net.n, latent_dim);
    let history = Trainer::new(config.train.clone())?.fit(
        &mut net,
        &data.inputs.view(),
        &data.targets.view(),
        &y.view(),
    )?;
    if let Some(last) = history.last() {
        info!("final reported epoch loss: {:.6}", last);
    }

    let x = net.forward(&data.inputs.view())?;
    println!(
        "\nnmse_x: {:.4} nmse_q: {:.4}",
        net.nmse_x(&y.view(), &x.view())?,
        net.nmse_q(&y.view())?
    );

    let report = PsychometricReport::from_network(&mut net, &data.inputs.view(), &data.conditions)?;
    print_report(&report);

    if let Some(path) = &args.report {
        let text = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, text)
            .with_context(|| format!("리포트 저장 실패: {}", path.display()))?;
        info!("report written to {}", path.display());
    }
    Ok(())
}
