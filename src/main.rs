use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use scrawl::canvas::DrawingBitmap;
use scrawl::classifier::{Classifier, DigitRecognizer};
use scrawl::config::Config;
use scrawl::error::{Result, ScrawlError};
use scrawl::models::download::format_bytes;
use scrawl::models::provisioner::resolve_models_dir;
use scrawl::models::registry::MODELS;
use scrawl::models::{ModelInfo, ModelManager, ModelProvisioner};
use scrawl::notifications::NotificationManager;
use scrawl::pad::{script, spawn_provisioning, DigitPad, PadEvent};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "scrawl")]
#[command(version, about = "Handwritten digit recognition pad", long_about = None)]
struct Cli {
    /// Config file (default: ~/.config/scrawl/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the drawing pad, reading pointer events from stdin (default)
    Pad {
        /// Hold input until the model is loaded
        #[arg(long)]
        wait_ready: bool,
    },
    /// Classify an image file
    Classify {
        /// PNG or JPEG with a single digit
        image: PathBuf,
    },
    /// Download or refresh the configured model
    Provision,
    /// Manage installed models
    Model {
        #[command(subcommand)]
        action: ModelCommands,
    },
}

#[derive(Subcommand)]
enum ModelCommands {
    /// List installed models
    List {
        /// Show downloadable models instead
        #[arg(long)]
        available: bool,
    },
    /// Remove an installed model
    Remove { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries predictions, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        None => run_pad(config, false).await,
        Some(Commands::Pad { wait_ready }) => run_pad(config, wait_ready).await,
        Some(Commands::Classify { image }) => run_classify(config, image).await,
        Some(Commands::Provision) => run_provision(config).await,
        Some(Commands::Model { action }) => run_model(&config, action),
    }
}

async fn run_pad(config: Config, wait_ready: bool) -> Result<()> {
    let provisioner = Arc::new(ModelProvisioner::from_config(&config)?);
    let model_name = provisioner.spec().name.clone();
    let classifier = Arc::new(Classifier::new(config.classifier.clone()));
    let notifier = NotificationManager::new(config.notifications.clone());

    let pad = DigitPad::new(classifier, &config.canvas);
    let mut display = pad.subscribe();
    let mut ready = pad.subscribe();

    let (event_tx, event_rx) = mpsc::channel::<PadEvent>(64);
    spawn_provisioning(provisioner, event_tx.clone());
    let pad_task = tokio::spawn(pad.run(event_rx));

    let printer = tokio::spawn(async move {
        let mut last = display.borrow_and_update().clone();
        println!("{}", last.prediction);

        while display.changed().await.is_ok() {
            let current = display.borrow_and_update().clone();
            if current.prediction != last.prediction {
                println!("{}", current.prediction);
            }
            if current.toast != last.toast {
                if let Some(toast) = &current.toast {
                    eprintln!("{toast}");
                    notifier.provisioning_failed(toast);
                }
            }
            if current.ready && !last.ready {
                eprintln!("Model '{model_name}' ready");
                notifier.model_ready(&model_name);
            }
            last = current;
        }
    });

    if wait_ready {
        // A toast means provisioning failed; input is still accepted
        ready
            .wait_for(|d| d.ready || d.toast.is_some())
            .await
            .map_err(|e| ScrawlError::Other(format!("Pad exited early: {e}")))?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match script::parse_line(&line) {
            Ok(Some(PadEvent::Shutdown)) => break,
            Ok(Some(event)) => {
                if event_tx.send(event).await.is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => eprintln!("{e}"),
        }
    }

    event_tx.send(PadEvent::Shutdown).await.ok();
    pad_task
        .await
        .map_err(|e| ScrawlError::Other(format!("Pad task panicked: {e}")))??;
    printer.await.ok();

    Ok(())
}

async fn run_classify(config: Config, image: PathBuf) -> Result<()> {
    let bitmap = DrawingBitmap::open(&image)?;
    let handle = provision_with_spinner(&config).await?;

    let classifier = Classifier::new(config.classifier.clone());
    classifier.initialize(handle).await?;

    let result = classifier.classify(bitmap).await;
    classifier.close().await;

    println!("{}", result?);
    Ok(())
}

async fn run_provision(config: Config) -> Result<()> {
    let handle = provision_with_spinner(&config).await?;
    println!(
        "✓ Model '{}' ready at {} ({})",
        handle.name(),
        handle.path().display(),
        format_bytes(handle.len() as u64)
    );
    Ok(())
}

async fn provision_with_spinner(config: &Config) -> Result<scrawl::classifier::ModelHandle> {
    let provisioner = ModelProvisioner::from_config(config)?;

    // hf-hub draws its own progress bar when enabled
    let spinner = (!config.model.show_progress).then(|| {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(format!("Provisioning {}...", provisioner.spec().name));
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    });

    let result = provisioner.provision().await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    result
}

fn run_model(config: &Config, action: ModelCommands) -> Result<()> {
    match action {
        ModelCommands::List { available: true } => {
            println!("Available models:\n");
            for model in MODELS {
                let marker = if model.recommended { " (recommended)" } else { "" };
                println!("  {}{marker}", model.name);
                println!("    {}", model.description);
                println!("    Repository: {} [{}]", model.hf_repo, model.file);
                println!("    Size: ~{} KB", model.size_kb);
            }
            println!(
                "\nSet model.name to one of: {}",
                ModelInfo::all_names().join(", ")
            );
        }
        ModelCommands::List { available: false } => {
            let manager = ModelManager::new(&resolve_models_dir(config)?)?;
            let installed = manager.list_installed();

            if installed.is_empty() {
                println!("No models installed.");
                println!("Use 'scrawl provision' to download the configured model.");
            } else {
                println!("Installed models:\n");
                for model in installed {
                    println!("  {}", model.name);
                    println!("    Path: {}", model.path.display());
                    println!("    Size: {}", format_bytes(model.size_bytes));
                    println!("    Source: {}", model.source);
                    println!("    Downloaded: {}", model.downloaded_at);
                }
            }
        }
        ModelCommands::Remove { name } => {
            let mut manager = ModelManager::new(&resolve_models_dir(config)?)?;
            let removed = manager.remove(&name)?;
            println!(
                "✓ Removed model '{}' (freed {})",
                removed.name,
                format_bytes(removed.size_bytes)
            );
        }
    }

    Ok(())
}
