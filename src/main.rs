use anyhow::Result;
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vidscribe::audio::{AudioAcquirer, YtDlpDownloader};
use vidscribe::captions::{CaptionFetcher, YtDlpCaptionSource};
use vidscribe::config::SpeechBackend;
use vidscribe::extractors::VideoId;
use vidscribe::output::{self, ArticleRecord};
use vidscribe::transcribe::{load_speech_model, SpeechModel, SpeechTranscriber, WhisperCli};
use vidscribe::utils::{check_dependencies, sanitize_filename};
use vidscribe::{
    extract_video_id, ArticleGenerator, CacheStore, Cli, Commands, Config, FileCache,
    GeminiClient, MemoryCache, OutputFormat, ScribeError, TranscriptionPipeline, WorkerPool,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<ScribeError>() {
                Some(e) => eprintln!("{} [{}] {}", style("Error:").red().bold(), e.kind(), e),
                None => eprintln!("{} {:#}", style("Error:").red().bold(), err),
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default_filter = if verbose {
        "vidscribe=debug"
    } else if quiet {
        "vidscribe=warn"
    } else {
        "vidscribe=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load().await?;
    let quiet = cli.quiet;

    match cli.command {
        Commands::Generate {
            url,
            language,
            output,
            format,
        } => {
            let video = parse_reference(&url)?;
            warn_missing_dependencies(&config).await;

            let language = language.unwrap_or_else(|| config.app.default_language.clone());
            let cache = build_cache(&config)?;
            let service = GeminiClient::from_config(&config.generator)?;
            let generator = ArticleGenerator::new(Arc::new(service), cache.clone(), &config.generator.model)
                .with_ttl(config.cache_ttl());
            let pipeline = build_pipeline(&config, cache)?;

            tracing::info!("Generating article for {}", video);

            let progress = spinner(quiet)?;
            let outcome = generate(&pipeline, &generator, &progress, &url, &language).await;
            progress.finish_and_clear();
            let record = outcome?;

            let content = output::render_article(&record, &format)?;
            match output {
                Some(path) => {
                    let path = resolve_output_path(path, &record, &format);
                    output::save_to_file(&content, &path)?;
                    println!("{} {}", style("Article saved to:").green(), path.display());
                }
                None => output::print_to_console(&content),
            }
        }
        Commands::Transcribe {
            url,
            language,
            format,
        } => {
            let video = parse_reference(&url)?;
            warn_missing_dependencies(&config).await;

            let language = language.unwrap_or_else(|| config.app.default_language.clone());
            let pipeline = build_pipeline(&config, build_cache(&config)?)?;

            tracing::info!("Fetching transcriptions for {}", video);

            let progress = spinner(quiet)?;
            progress.set_message("Fetching captions and transcribing audio...");
            let outcome = pipeline.get_transcriptions(&url, &language).await;
            progress.finish_and_clear();

            let pair = outcome?;
            output::print_to_console(&output::render_transcripts(&pair, &format)?);
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                println!("Configuration file: {}", Config::config_path()?.display());
                println!("Run `vidscribe config --show` to see the current values.");
            }
        }
        Commands::Cache { purge, clear } => {
            let cache = FileCache::open(config.cache_dir())?;
            if clear {
                let removed = cache.clear()?;
                println!("Removed {} cache entries from {}", removed, cache.dir().display());
            } else if purge {
                let removed = cache.purge_expired()?;
                println!("Purged {} expired cache entries from {}", removed, cache.dir().display());
            } else {
                println!("Cache directory: {}", cache.dir().display());
                println!("Use --purge to drop expired entries or --clear to drop everything.");
            }
        }
    }

    Ok(())
}

async fn generate(
    pipeline: &TranscriptionPipeline,
    generator: &ArticleGenerator,
    progress: &ProgressBar,
    url: &str,
    language: &str,
) -> Result<ArticleRecord> {
    progress.set_message("Fetching captions and transcribing audio...");
    let (title, pair) = futures_util::future::join(
        pipeline.fetch_title(url),
        pipeline.get_transcriptions(url, language),
    )
    .await;
    let pair = pair?;

    progress.set_message("Writing article...");
    let article = generator
        .generate_article(&pair.captions_text, &pair.whisper_text)
        .await?;

    let title = match title {
        Ok(title) => title,
        Err(e) => {
            tracing::warn!("Could not fetch video title: {:#}", e);
            "Untitled Video".to_string()
        }
    };

    Ok(ArticleRecord::new(&title, url, &article))
}

fn parse_reference(url: &str) -> Result<VideoId, ScribeError> {
    extract_video_id(url).ok_or_else(|| ScribeError::InvalidReference(url.to_string()))
}

/// Check for required external tools (non-fatal)
async fn warn_missing_dependencies(config: &Config) {
    let whisper = WhisperCli::new(&config.speech.model);
    let speech_cli = match config.speech.backend {
        SpeechBackend::WhisperCli => Some(whisper.command()),
        SpeechBackend::WhisperRs => None,
    };

    let missing = check_dependencies(speech_cli).await;
    if !missing.is_empty() {
        eprintln!("{}", style("⚠️  Dependency check warnings:").yellow());
        for dep in missing {
            eprintln!("   • {}", dep);
        }
        eprintln!("   (Continuing anyway - tools may be available)");
    }
}

fn build_cache(config: &Config) -> Result<Arc<dyn CacheStore>> {
    if config.cache.enabled {
        Ok(Arc::new(FileCache::open(config.cache_dir())?))
    } else {
        Ok(Arc::new(MemoryCache::new()))
    }
}

fn build_pipeline(config: &Config, cache: Arc<dyn CacheStore>) -> Result<TranscriptionPipeline> {
    let model = load_speech_model(&config.speech)?;
    tracing::debug!("Speech model: {}", model.name());

    let temp_dir = config.temp_dir();
    fs_err::create_dir_all(&temp_dir)?;

    let audio = AudioAcquirer::new(
        Arc::new(YtDlpDownloader::new()),
        temp_dir,
        config.app.media_root.clone(),
        config.app.deployment_mode,
    );

    Ok(TranscriptionPipeline::new(
        CaptionFetcher::new(Arc::new(YtDlpCaptionSource::new())),
        audio,
        SpeechTranscriber::new(model),
        cache,
        WorkerPool::new(config.worker_threads()),
    )
    .with_ttl(config.cache_ttl()))
}

fn spinner(quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    progress.enable_steady_tick(Duration::from_millis(100));
    Ok(progress)
}

/// A directory target gets a file named after the video title
fn resolve_output_path(path: PathBuf, record: &ArticleRecord, format: &OutputFormat) -> PathBuf {
    if path.is_dir() {
        let stem = sanitize_filename(&record.video_title);
        let stem = if stem.is_empty() { "article".to_string() } else { stem };
        path.join(format!("{}.{}", stem, format.extension()))
    } else {
        path
    }
}
