use anyhow::{Context, Result};
use clap::Parser;
use latentrec::services::dataset;
use latentrec::{
    init_tracing, top_k_test, CheckpointStore, Config, FileCheckpointStore, LatentFactorModel,
    ParameterInitializer,
};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Checkpoint key to resume training from
    #[arg(short, long)]
    resume: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing with specified log level
    std::env::set_var("RUST_LOG", &args.log_level);
    init_tracing();

    info!("Starting latent factor trainer");

    let config = if std::path::Path::new(&args.config).exists() {
        Config::from_file(&args.config)?
    } else {
        info!("Config file not found, using default configuration");
        Config::default()
    };

    info!("Training configuration loaded: {:?}", config.training);

    let train_ratings = dataset::load_ratings(&config.data.train_ratings)
        .with_context(|| format!("loading training ratings from {}", config.data.train_ratings))?;
    let implicit_feedback = match &config.data.implicit_feedback {
        Some(path) => Some(
            dataset::load_implicit_feedback(path)
                .with_context(|| format!("loading implicit feedback from {}", path))?,
        ),
        None => None,
    };

    let mut checkpoints = FileCheckpointStore::new(&config.checkpoint.directory)?;
    let initializer = ParameterInitializer::from_seed(config.training.seed);

    let mut model = match &args.resume {
        Some(key) => {
            let checkpoint = checkpoints
                .load(key)
                .with_context(|| format!("loading checkpoint {}", key))?;
            let mut model = LatentFactorModel::from_checkpoint(checkpoint, train_ratings, initializer)?;
            model.set_max_epochs(config.training.max_epochs)?;
            model
        }
        None => LatentFactorModel::new(
            train_ratings,
            config.hyperparameters(),
            implicit_feedback.as_deref(),
            initializer,
        )?,
    };

    let outcome = model.train_with_checkpoints(&mut checkpoints)?;
    if !outcome.succeeded() {
        error!("Training diverged: {:?}. Try a smaller learning rate.", outcome);
        std::process::exit(1);
    }
    info!("Training finished: {:?}", outcome);

    let test_ratings = dataset::load_ratings(&config.data.test_ratings)
        .with_context(|| format!("loading test ratings from {}", config.data.test_ratings))?;
    let report = model.test(&test_ratings)?;
    info!("Test RMSE {} over {} ratings", report.rmse, report.total);

    if let Some(path) = &config.data.topk_cases {
        let cases = dataset::load_top_k_cases(path)
            .with_context(|| format!("loading top-K cases from {}", path))?;
        let distribution = top_k_test(&model, &cases, config.evaluation.topk_distractors)?;
        for (position, probability) in distribution.positions.iter().zip(&distribution.cumulative) {
            println!("{}\t{}", position, probability);
        }
    }

    Ok(())
}
