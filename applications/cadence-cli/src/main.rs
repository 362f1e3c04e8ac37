use anyhow::Context;
use cadence_cli::{clock, shell, AppConfig, Flow, Library, Shell, ShellLine};
use cadence_playback::{
    JsonFileStore, MemoryStore, PlayerService, PlayerStore, SimulatedBackend, SimulatedDownloader,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Interactive playback queue shell", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./cadence.toml when present)
    #[arg(short, long, env = "CADENCE_CONFIG")]
    config: Option<PathBuf>,

    /// Library file, overrides storage.library_file
    #[arg(short, long)]
    library: Option<PathBuf>,

    /// Keep queue state in memory only
    #[arg(long)]
    ephemeral: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cadence=info,cadence_cli=info,cadence_playback=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.validate()?;

    let library_path = cli.library.unwrap_or_else(|| config.storage.library_file.clone());
    let library = Library::load(&library_path)
        .with_context(|| format!("Failed to load library from {}", library_path.display()))?;
    tracing::info!(
        path = %library_path.display(),
        collections = library.collections().len(),
        "Library loaded"
    );

    let store: Box<dyn PlayerStore> = match (&config.storage.state_file, cli.ephemeral) {
        (Some(path), false) => {
            tracing::info!(path = %path.display(), "Persisting player state");
            Box::new(JsonFileStore::new(path))
        }
        _ => Box::new(MemoryStore::new()),
    };

    let mut downloader =
        SimulatedDownloader::new(Duration::from_millis(config.simulation.download_delay_ms));
    for id in &config.simulation.failing_downloads {
        downloader = downloader.failing_on(id);
    }

    let backend = SimulatedBackend::new();
    let service = PlayerService::spawn(
        config.player_config(),
        Box::new(backend.clone()),
        Arc::new(downloader),
        store,
    );
    let handle = service.handle();
    if config.simulation.offline {
        handle.set_offline_mode(true)?;
    }

    let clock = clock::spawn_clock(
        backend,
        handle.clone(),
        Duration::from_millis(config.simulation.tick_interval_ms),
        config.simulation.speed,
    );

    let (_, mut events) = handle.subscribe().await?;
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if let Some(line) = shell::render_event(&event) {
                println!("{line}");
            }
        }
    });

    let shell = Shell::new(handle, library);
    println!("cadence ready, type `help` for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let command = match ShellLine::parse_line(&line) {
            Ok(command) => command,
            Err(err) => {
                let _ = err.print();
                continue;
            }
        };

        match shell.execute(command).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Print(output)) => print!("{output}"),
            Ok(Flow::Quit) => break,
            Err(err) => eprintln!("error: {err}"),
        }
    }

    clock.abort();
    service.shutdown().await;
    printer.abort();
    Ok(())
}
