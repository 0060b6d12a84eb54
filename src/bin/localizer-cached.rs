//! Thin CLI over [`localizer_cache`], for ops tooling and manual testing
//! of a node's cache directory. Production task setup/teardown code links
//! against the library directly; this binary exists for standalone runs.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use localizer_cache::{
    ArtifactKind, CacheUri, DistributedCache, LocalFs, RemoteStat, UnsupportedExtractor,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "localizer-cached", about = "Node-local distributed file localization cache")]
struct Cli {
    /// Base directory under which all cache entries live.
    #[arg(long, default_value = "./localizer-cache")]
    base_dir: PathBuf,

    /// Name substituted for a URI's host when the URI omits one.
    #[arg(long, default_value = "localhost")]
    default_fs_host: String,

    /// Decimal byte budget for the base directory.
    #[arg(long, default_value_t = localizer_cache::localizer::DEFAULT_CACHE_SIZE_BYTES)]
    cache_size: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Localizes a single file or archive URI and prints the local path.
    Acquire {
        uri: String,
        #[arg(long)]
        archive: bool,
        #[arg(long)]
        expected_stamp: i64,
        #[arg(long)]
        work_dir: Option<PathBuf>,
        #[arg(long)]
        symlink: bool,
    },
    /// Releases one reference on a previously acquired URI.
    Release { uri: String },
    /// Sweeps every currently-idle entry out of the cache.
    Reclaim,
    /// Deletes every cache entry, regardless of refcounts.
    Purge,
    /// Projects every entry under a job's cache directory into a work
    /// directory as symlinks.
    ProjectAll { job_cache_dir: PathBuf, work_dir: PathBuf },
    /// Validates that a set of URIs carries pairwise-distinct fragments.
    CheckUris { uris: Vec<String> },
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cache = DistributedCache::new(
        cli.base_dir,
        cli.default_fs_host,
        Arc::new(LocalFs),
        Arc::new(UnsupportedExtractor),
    )
    .with_size_bound(cli.cache_size);

    match run(&cache, cli.command).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run(
    cache: &DistributedCache<LocalFs, UnsupportedExtractor>,
    command: Command,
) -> Result<(), localizer_cache::CacheError> {
    match command {
        Command::Acquire { uri, archive, expected_stamp, work_dir, symlink } => {
            let uri = CacheUri::parse(&uri)?;
            let kind = if archive { ArtifactKind::Archive } else { ArtifactKind::File };
            let remote_stat = RemoteStat { mtime: expected_stamp };
            let path = cache
                .acquire(&uri, kind, Some(remote_stat), expected_stamp, work_dir.as_deref(), symlink)
                .await?;
            println!("{}", path.display());
            Ok(())
        }
        Command::Release { uri } => {
            let uri = CacheUri::parse(&uri)?;
            cache.release(&uri).await
        }
        Command::Reclaim => cache.reclaim().await,
        Command::Purge => {
            cache.purge().await;
            Ok(())
        }
        Command::ProjectAll { job_cache_dir, work_dir } => {
            cache.project_all(&job_cache_dir, &work_dir).await
        }
        Command::CheckUris { uris } => {
            let parsed: Result<Vec<_>, _> = uris.iter().map(|u| CacheUri::parse(u)).collect();
            let parsed = parsed?;
            let ok = localizer_cache::check_uris(&parsed, &[]);
            println!("{ok}");
            Ok(())
        }
    }
}
