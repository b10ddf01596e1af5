mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use bilijean_core::streaming::{SourcePreferences, StreamingError};
use bilijean_core::{logging, Config, StreamingService};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "bilijean")]
#[command(about = "Resolve Bilibili links into pages and playable stream sources", long_about = None)]
struct Cli {
    /// Configuration file (toml, yaml or json)
    #[arg(long, global = true, env = "BILIJEAN_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the category and identifier a URL resolves to
    Classify { url: String },

    /// Print the normalized pages of a URL
    Pages { url: String },

    /// Print the negotiated video and audio source of a page
    Source {
        url: String,
        /// Page index among the selected pages (defaults to the first). Series extras number
        /// from 1 within their own section and cannot be chosen here.
        #[arg(long)]
        page: Option<u32>,
        #[command(flatten)]
        prefs: PreferenceArgs,
    },

    /// Download the video and audio streams of a page into a directory
    Download {
        url: String,
        dir: PathBuf,
        /// Page index among the selected pages (defaults to the first). Series extras number
        /// from 1 within their own section and cannot be chosen here.
        #[arg(long)]
        page: Option<u32>,
        #[command(flatten)]
        prefs: PreferenceArgs,
    },

    /// Check the configured session cookie
    Whoami,
}

/// Overrides for the configured playback preferences
#[derive(Args, Debug, Default)]
struct PreferenceArgs {
    /// Prefer the lowest video quality
    #[arg(long)]
    low_video: bool,

    /// Highest acceptable video quality id (e.g. 80 for 1080P)
    #[arg(long)]
    max_video_quality: Option<u32>,

    /// Prefer the oldest codec (AVC) over newer ones
    #[arg(long)]
    legacy_codec: bool,

    /// Highest acceptable codec id (7 AVC, 12 HEVC, 13 AV1)
    #[arg(long)]
    max_codec: Option<u32>,

    /// Prefer the lowest audio quality
    #[arg(long)]
    low_audio: bool,

    /// Highest acceptable audio id (e.g. 30280 for 192K)
    #[arg(long)]
    max_audio_quality: Option<u32>,
}

impl PreferenceArgs {
    fn apply(&self, mut prefs: SourcePreferences) -> SourcePreferences {
        if self.low_video {
            prefs.prefer_high_quality_video = false;
        }
        if self.legacy_codec {
            prefs.prefer_efficient_codec = false;
        }
        if self.low_audio {
            prefs.prefer_high_quality_audio = false;
        }
        prefs.max_video_quality = self.max_video_quality.or(prefs.max_video_quality);
        prefs.max_codec = self.max_codec.or(prefs.max_codec);
        prefs.max_audio_quality = self.max_audio_quality.or(prefs.max_audio_quality);
        prefs
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    let problems = config.validate();
    if !problems.is_empty() {
        for problem in &problems {
            eprintln!("Config validation error: {problem}");
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s)",
            problems.len()
        ));
    }

    logging::init_logging(&config.logging)?;
    debug!(command = ?cli.command, "bilijean starting");

    let service = StreamingService::from_config(&config.bilibili);
    let defaults = config.source_preferences();

    let result = match &cli.command {
        Command::Classify { url } => commands::classify(&service, url).await,
        Command::Pages { url } => commands::pages(&service, url).await,
        Command::Source { url, page, prefs } => {
            commands::source(&service, url, *page, &prefs.apply(defaults)).await
        }
        Command::Download { url, dir, page, prefs } => {
            commands::download(&service, url, dir, *page, &prefs.apply(defaults)).await
        }
        Command::Whoami => commands::whoami(&service).await,
    };

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) if e.downcast_ref::<StreamingError>().is_some_and(StreamingError::is_not_found) => {
            info!(error = %e, "Nothing to show");
            eprintln!("{e}");
            Ok(ExitCode::from(1))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source_flags() {
        let cli = Cli::try_parse_from([
            "bilijean",
            "source",
            "https://www.bilibili.com/video/BV1xx411c7mD",
            "--page",
            "2",
            "--low-video",
            "--max-audio-quality",
            "30280",
        ])
        .unwrap();
        let Command::Source { page, prefs, .. } = cli.command else {
            panic!("expected source command");
        };
        assert_eq!(page, Some(2));
        let prefs = prefs.apply(SourcePreferences::default());
        assert!(!prefs.prefer_high_quality_video);
        assert!(prefs.prefer_efficient_codec);
        assert_eq!(prefs.max_audio_quality, Some(30_280));
    }

    #[test]
    fn test_flags_keep_configured_caps() {
        let configured = SourcePreferences {
            max_codec: Some(12),
            ..SourcePreferences::default()
        };
        let prefs = PreferenceArgs::default().apply(configured.clone());
        assert_eq!(prefs, configured);
    }

    #[test]
    fn test_page_help_mentions_series_extras() {
        use clap::CommandFactory;

        let mut cmd = Cli::command();
        for name in ["source", "download"] {
            let sub = cmd.find_subcommand_mut(name).unwrap();
            let page = sub.get_arguments().find(|a| a.get_id() == "page").unwrap();
            let help = page.get_help().unwrap().to_string();
            assert!(help.contains("extras"), "{name}: {help}");
        }
    }

    #[test]
    fn test_download_requires_dir() {
        assert!(Cli::try_parse_from(["bilijean", "download", "https://b23.tv/abc"]).is_err());
        assert!(Cli::try_parse_from(["bilijean", "--config", "bilijean.toml", "whoami"]).is_ok());
    }
}
