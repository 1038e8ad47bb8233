use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use harmux::correlate::MissingPolicy;
use harmux::metadata::runs::AlbumPolicy;
use harmux::output::Materializer;
use harmux::output::ffmpeg::Ffmpeg;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "harmux", version, about = "Rebuild tagged music files from HAR captures")]
struct Cli {
    /// Config file (defaults to ~/.config/harmux/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// ffmpeg binary to run
    #[arg(long, global = true)]
    ffmpeg: Option<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum AlbumPolicyArg {
    /// Exactly one album run per track
    Strict,
    /// Last album run wins
    LastRun,
}

impl From<AlbumPolicyArg> for AlbumPolicy {
    fn from(arg: AlbumPolicyArg) -> Self {
        match arg {
            AlbumPolicyArg::Strict => AlbumPolicy::Strict,
            AlbumPolicyArg::LastRun => AlbumPolicy::LastRun,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild every played track found in the archives
    Rebuild {
        /// HAR files, or directories holding them (processed in the given order)
        #[arg(required = true)]
        archives: Vec<PathBuf>,

        /// Output root (defaults to config output_dir)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Show what would be written without running ffmpeg
        #[arg(long)]
        dry_run: bool,

        /// Skip tracks with no metadata or audio instead of aborting
        #[arg(long)]
        skip_missing: bool,

        /// How album runs reduce to one album
        #[arg(long, value_enum)]
        album_policy: Option<AlbumPolicyArg>,
    },

    /// Rebuild one directly served file, matched by its name in the URL
    Extract {
        /// File name as it appears in the request URL, e.g. 1364378750655873.mp4
        asset: String,

        /// HAR files, or directories holding them
        #[arg(required = true)]
        archives: Vec<PathBuf>,

        /// Output root (defaults to config output_dir)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show what the archives contain without writing anything
    Inspect {
        /// HAR files, or directories holding them
        #[arg(required = true)]
        archives: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = match &cli.config {
        Some(path) => harmux::config::AppConfig::load_from(path),
        None => harmux::config::AppConfig::load(),
    };
    let ffmpeg = Ffmpeg::new(cli.ffmpeg.unwrap_or_else(|| config.ffmpeg.clone()));

    match cli.command {
        Commands::Rebuild {
            archives,
            out,
            dry_run,
            skip_missing,
            album_policy,
        } => {
            let archives = expand(&archives)?;
            let out = out.unwrap_or_else(|| config.output_dir.clone());
            let materializer = Materializer::new(out, config.extension.clone(), ffmpeg);
            let options = harmux::pipeline::RebuildOptions {
                album_policy: album_policy.map(Into::into).unwrap_or(config.album_policy),
                missing: if skip_missing {
                    MissingPolicy::Skip
                } else {
                    config.on_missing
                },
                dry_run,
            };

            if dry_run {
                println!("DRY RUN: nothing will be written");
            }
            let result = harmux::pipeline::rebuild(&archives, &materializer, options)
                .context("Rebuild failed")?;

            for t in &result.tracks {
                println!("{:>3}  {}  ->  {}", t.track_number, t.label, t.path.display());
            }
            if !result.skipped.is_empty() {
                println!();
                println!("Skipped {} tracks:", result.skipped.len());
                for s in &result.skipped {
                    println!("  {}: {}", s.video_id, s.reason);
                }
            }
            println!();
            println!(
                "Rebuild complete: {} archives, {} tracks {}, {} skipped",
                result.archives,
                result.tracks.len(),
                if dry_run { "planned" } else { "written" },
                result.skipped.len()
            );
        }

        Commands::Extract {
            asset,
            archives,
            out,
        } => {
            let archives = expand(&archives)?;
            let out = out.unwrap_or_else(|| config.output_dir.clone());
            let materializer = Materializer::new(out, config.extension.clone(), ffmpeg);
            let path = harmux::pipeline::extract(&archives, &asset, &materializer)
                .with_context(|| format!("Extracting {asset} failed"))?;
            println!("Wrote {}", path.display());
        }

        Commands::Inspect { archives } => {
            let archives = expand(&archives)?;
            let state = harmux::pipeline::index(&archives).context("Indexing failed")?;

            println!("Archives:         {}", archives.len());
            println!("Entries:          {}", state.entries_seen);
            println!("Ignored entries:  {}", state.entries_ignored);
            println!("Player records:   {}", state.players().len());
            println!("Queue items:      {}", state.queue_len());
            println!();

            if !state.players().is_empty() {
                println!("Players:");
                for p in state.players() {
                    let file_id = p.stream.file_id().unwrap_or_else(|| "?".into());
                    println!("  {:<14} {:<30} {}", p.video_id, p.author, file_id);
                }
                println!();
            }

            if !state.chunks().is_empty() {
                println!("Files:");
                for (id, asset) in state.chunks().iter() {
                    println!(
                        "  {:<40} {:>5} chunks {:>10} bytes",
                        id,
                        asset.chunks(),
                        asset.len()
                    );
                }
            }
        }
    }

    Ok(())
}

fn expand(args: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let archives = harmux::har::expand_paths(args);
    if archives.is_empty() {
        anyhow::bail!("No .har files found in the given paths");
    }
    log::info!("{} archives to read", archives.len());
    Ok(archives)
}
