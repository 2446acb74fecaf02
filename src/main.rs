mod cli;

use reelcache::{
    config::{self, Config, ConfigStore},
    conversion::{ConversionManager, ConversionOutcome},
    scanner,
};
use reelcache_av::{FfprobeProber, Prober, ToolPaths};
use reelcache_common::artifact::{self, ArtifactPathCodec, PostfixCodec};
use reelcache_common::kib_rounded;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "reelcache=trace,reelcache_av=trace,reelcache_common=debug".to_string()
        } else {
            "reelcache=debug,reelcache_av=debug".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Convert { paths } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(convert(&paths, config_path))
        }
        Commands::Path { source } => print_artifact_path(&source, config_path),
        Commands::ValidateArtifact { artifact } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(validate_artifact(&artifact, config_path))
        }
        Commands::Probe { file, json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_file(&file, json, config_path))
        }
        Commands::CheckTools => check_tools(config_path),
        Commands::Validate {
            config: validate_path,
        } => {
            let path = validate_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("reelcache {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Load the config and make both roots absolute so CLI paths can be
/// matched against them.
fn load_config(config_path: Option<&Path>) -> Result<(Config, Option<PathBuf>)> {
    let found = config::find_config(config_path);
    let mut config = config::load_config_or_default(found.as_deref())?;

    config.paths.source_root = absolute(&config.paths.source_root)?;
    config.paths.artifact_root = absolute(&config.paths.artifact_root)?;
    // Relative and absolute roots can only be compared once both are resolved.
    config::validate_config(&config)?;

    Ok((config, found))
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("Cannot resolve path {:?}", path))
}

fn path_codec(config: &Config) -> PostfixCodec {
    PostfixCodec::new(&config.paths.source_root, &config.paths.artifact_root)
}

async fn convert(paths: &[PathBuf], config_path: Option<&Path>) -> Result<()> {
    let (config, found) = load_config(config_path)?;

    let tools = ToolPaths::resolve(
        config.tools.ffmpeg_path.as_deref(),
        config.tools.ffprobe_path.as_deref(),
    )
    .context("ffmpeg and ffprobe are required for conversion")?;

    let paths = paths
        .iter()
        .map(|p| absolute(p))
        .collect::<Result<Vec<_>>>()?;
    let sources = scanner::collect_sources(&paths, &config.video_extensions);
    if sources.is_empty() {
        println!("No video files found.");
        return Ok(());
    }

    tracing::info!(
        count = sources.len(),
        profile = %config.transcoding.postfix(),
        concurrency = config.executor.concurrency,
        "Converting sources"
    );

    let store = Arc::new(ConfigStore::new(config, found));
    let manager = ConversionManager::from_config(store, &tools);

    let mut failed = 0usize;
    for (source, result) in manager.convert_all(sources).await {
        match result {
            Ok(ConversionOutcome::Cached(artifact)) => {
                println!("cached      {} -> {}", source.display(), artifact.display());
            }
            Ok(ConversionOutcome::Transcoded(artifact)) => {
                println!("transcoded  {} -> {}", source.display(), artifact.display());
            }
            Err(e) => {
                failed += 1;
                println!("failed      {}: {}", source.display(), e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} conversion(s) failed", failed);
    }
    Ok(())
}

fn print_artifact_path(source: &Path, config_path: Option<&Path>) -> Result<()> {
    let (config, _) = load_config(config_path)?;
    let source = absolute(source)?;

    let artifact = path_codec(&config)
        .derive_path(&source, &config.transcoding)
        .with_context(|| format!("Cannot derive artifact path for {:?}", source))?;

    println!("{}", artifact.display());
    Ok(())
}

async fn validate_artifact(artifact: &Path, config_path: Option<&Path>) -> Result<()> {
    let (config, _) = load_config(config_path)?;
    let artifact = absolute(artifact)?;
    let codec = path_codec(&config);

    if artifact::is_valid_artifact(&codec, &artifact, &config.transcoding).await {
        println!("✓ {} is valid", artifact.display());
        return Ok(());
    }

    println!("✗ {} is not valid", artifact.display());
    match codec.postfix_of(&artifact) {
        None => println!("  Not a reelcache artifact name"),
        Some(postfix) if postfix != config.transcoding.postfix() => {
            println!(
                "  Built for {}, current profile is {}",
                postfix,
                config.transcoding.postfix()
            );
        }
        Some(_) => println!("  Source file is missing or unreadable"),
    }
    anyhow::bail!("artifact is stale or orphaned");
}

async fn probe_file(file: &Path, json: bool, config_path: Option<&Path>) -> Result<()> {
    let (config, _) = load_config(config_path)?;
    let ffprobe = reelcache_av::tools::get_tool_path("ffprobe", config.tools.ffprobe_path.as_deref())?;
    let prober = FfprobeProber::new(ffprobe);

    let descriptor = prober
        .probe(file)
        .await
        .with_context(|| format!("Failed to probe {:?}", file))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&descriptor)?);
        return Ok(());
    }

    let profile = &config.transcoding;
    println!("File: {}", descriptor.path.display());
    println!("Bit rate: {} kbit/s", kib_rounded(descriptor.bit_rate));
    println!("Frame rate: {:.3} fps", descriptor.fps);
    println!("Height: {}p", descriptor.height);
    println!("\nCurrent profile: {}", profile.postfix());
    println!(
        "  Caps applied: bit rate {}, fps {}, resolution {}",
        descriptor.bit_rate > profile.bit_rate,
        descriptor.fps > f64::from(profile.fps),
        profile.resolution < descriptor.height
    );

    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let (config, _) = load_config(config_path)?;
    println!("Checking external tools...\n");

    let tools = reelcache_av::check_tools(
        config.tools.ffmpeg_path.as_deref(),
        config.tools.ffprobe_path.as_deref(),
    );
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install them to enable conversion.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Source root: {}", config.paths.source_root.display());
    println!("  Artifact root: {}", config.paths.artifact_root.display());
    println!("  Profile: {}", config.transcoding.postfix());
    println!("  Concurrency: {}", config.executor.concurrency);
    println!("  Video extensions: {}", config.video_extensions.join(", "));

    Ok(())
}
