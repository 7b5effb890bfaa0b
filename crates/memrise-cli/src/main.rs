use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use memrise_acquire::{Service, ServiceConfig};
use memrise_load::{spawn_load, LoadEvent, LoadOptions, MediaErrorPolicy};
use memrise_notes::{build_notes, update_notes, NoteOptions};

#[derive(Parser)]
#[command(name = "memrise")]
#[command(about = "Import Memrise community courses as flashcard notes")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_HASH"), ")"))]
struct Cli {
    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "info", value_enum)]
    log_level: LogLevel,

    /// Use UTC timestamps instead of local time
    #[arg(long, global = true)]
    utc: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(clap::Args)]
struct Credentials {
    /// Memrise username or email
    #[arg(long, env = "MEMRISE_USERNAME")]
    username: Option<String>,

    #[arg(long, env = "MEMRISE_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that a URL points at a community course and print its id
    CheckUrl {
        url: String,
    },

    /// Sign in and report whether the credentials were accepted
    Login {
        #[command(flatten)]
        credentials: Credentials,
    },

    /// Load a course and write it out as notes
    Fetch {
        /// Course page, e.g. https://community-courses.memrise.com/community/course/1234/basic-spanish/
        url: String,

        #[command(flatten)]
        credentials: Credentials,

        /// Output directory for notes.json, course.json and source.md. Notes
        /// from an earlier fetch into the same directory are updated in place.
        #[arg(short = 'O', long, default_value = ".")]
        output_dir: PathBuf,

        /// Where media files go (defaults to <output-dir>/media)
        #[arg(long)]
        media_dir: Option<PathBuf>,

        /// Keep remote media URLs instead of downloading
        #[arg(long)]
        no_media: bool,

        /// Download media again even when a file is already present
        #[arg(long)]
        refetch_media: bool,

        /// What a failed media download does to the load
        #[arg(long, value_enum)]
        on_media_error: OnMediaError,

        /// Minimum zero padding of level tags
        #[arg(long, default_value_t = 2)]
        level_tag_width: usize,

        /// Import every card as new instead of carrying review history over
        #[arg(long)]
        no_schedule: bool,
    },

    /// Resolve a video link to embeddable HTML
    Embed {
        url: String,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OnMediaError {
    /// Log it and carry on; the note leaves that file out
    Ignore,
    /// Stop the load
    Abort,
}

impl From<OnMediaError> for MediaErrorPolicy {
    fn from(value: OnMediaError) -> Self {
        match value {
            OnMediaError::Ignore => MediaErrorPolicy::Ignore,
            OnMediaError::Abort => MediaErrorPolicy::Abort,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Map log level, suppressing noisy HTML-parsing crates at debug/trace
    let level = match cli.log_level {
        LogLevel::Error => "error",
        LogLevel::Warn  => "warn",
        LogLevel::Info  => "info",
        LogLevel::Debug => "debug,selectors=warn,html5ever=warn",
        LogLevel::Trace => "trace,selectors=warn,html5ever=warn",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // Timestamp format: 2026-02-14 19:44:09.123 -08:00
    let time_format = "%Y-%m-%d %H:%M:%S%.3f %:z";

    if cli.utc {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_timer(tracing_subscriber::fmt::time::ChronoUtc::new(time_format.to_string()))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(time_format.to_string()))
            .init();
    }

    match cli.command {
        Commands::CheckUrl { url } => {
            let course_id = memrise_acquire::course_id_from_url(&url)?;
            println!("{course_id}");
        }
        Commands::Login { credentials } => {
            let service = Service::new(ServiceConfig::default())?;
            if !sign_in(&service, &credentials).await? {
                anyhow::bail!("Not logged in");
            }
        }
        Commands::Fetch {
            url,
            credentials,
            output_dir,
            media_dir,
            no_media,
            refetch_media,
            on_media_error,
            level_tag_width,
            no_schedule,
        } => {
            let course_id = memrise_acquire::course_id_from_url(&url)?;
            tracing::info!(course_id, url = %url, "Fetching course");

            let mut config = ServiceConfig::default();
            if !no_media {
                let media_dir = media_dir.unwrap_or_else(|| output_dir.join("media"));
                config = config.with_download_dir(media_dir);
            }
            let service = Arc::new(Service::new(config)?);
            if !sign_in(&service, &credentials).await? {
                tracing::warn!("Not logged in, levels may not be available");
            }

            let mut options = LoadOptions::new(on_media_error.into());
            options.download_media = !no_media;
            options.skip_existing_media = !refetch_media;

            let mut handle = spawn_load(Arc::clone(&service), course_id, options);
            let cancel = handle.cancellation_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, cancelling load");
                    cancel.cancel();
                }
            });

            let (mut levels, mut things) = (0u32, 0u32);
            let mut loaded = 0u32;
            while let Some(event) = handle.events.recv().await {
                match event {
                    LoadEvent::LevelCount(count) => levels = count,
                    LoadEvent::ThingCount(count) => things = count,
                    LoadEvent::LevelLoaded { index, found } => {
                        tracing::info!(level = index, levels, found, learnables = loaded, expected = things, "Level done");
                    }
                    LoadEvent::ThingLoaded { id } => {
                        loaded += 1;
                        tracing::trace!(id, "Learnable loaded");
                    }
                }
            }
            let course = handle.wait().await.context("loading course")?;
            tracing::info!(
                title = %course.title,
                levels = course.level_count(),
                learnables = course.learnable_count(),
                "Course loaded"
            );

            let options = NoteOptions {
                min_level_tag_width: level_tag_width,
                import_schedule: !no_schedule,
            };
            let today = chrono::Local::now().date_naive();
            let notes = build_notes(&course, &options, today);
            update_notes(&course, notes, &options, &url, &output_dir)?;
        }
        Commands::Embed { url } => {
            let service = Service::new(ServiceConfig::default())?;
            match service.load_embed_code(&url).await? {
                Some(html) => println!("{html}"),
                None => anyhow::bail!("No embed code for {url}"),
            }
        }
    }

    Ok(())
}

/// Log in when credentials were given, then report whether the session is
/// authenticated.
async fn sign_in(service: &Service, credentials: &Credentials) -> Result<bool> {
    match (&credentials.username, &credentials.password) {
        (Some(username), Some(password)) => Ok(service.login(username, password).await),
        (Some(_), None) | (None, Some(_)) => {
            anyhow::bail!("--username and --password must be given together")
        }
        (None, None) => Ok(service.is_logged_in().await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_requires_media_error_choice() {
        let url = "https://community-courses.memrise.com/community/course/1/x/";
        assert!(Cli::try_parse_from(["memrise", "fetch", url]).is_err());

        let cli = Cli::try_parse_from(["memrise", "fetch", url, "--on-media-error", "abort"]).unwrap();
        let Commands::Fetch { on_media_error, .. } = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(MediaErrorPolicy::from(on_media_error), MediaErrorPolicy::Abort);
    }

    #[tokio::test]
    async fn test_username_without_password_is_rejected() {
        let service = Service::new(ServiceConfig::default()).unwrap();
        let credentials = Credentials {
            username: Some("ana".to_string()),
            password: None,
        };
        assert!(sign_in(&service, &credentials).await.is_err());
    }
}
