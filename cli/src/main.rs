mod cli;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail, ensure};
use clap::Parser;
use policy_codex_core::{
    ContentFormat, ContentSource, LoadedRuleset, PRIMARY_ORIGIN, RulesetBuilder, load_builtin,
};
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const MODS_DIR: &str = "mods";

/// Interactive browser for policy rulesets
#[derive(Debug, Parser)]
#[command(name = "policy-codex")]
#[command(about = "ポリシーツリーとユニーク文の検証・閲覧ツール", long_about = None)]
#[command(version)]
struct Cli {
    /// Ruleset directory; the embedded ruleset is used when none is found
    #[arg(env = "POLICY_CODEX_RULESET")]
    ruleset: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let loaded = match resolve_ruleset_dir(cli.ruleset)? {
        Some(dir) => {
            info!(dir = %dir.display(), "ルールセットディレクトリを使用します");
            load_dir(&dir)?
        }
        None => {
            info!("組み込みルールセットを使用します");
            load_builtin()?
        }
    };

    cli::run(&loaded)
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();
}

/// An explicit directory must exist; otherwise the conventional locations are tried.
fn resolve_ruleset_dir(explicit: Option<PathBuf>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.is_dir() {
            bail!("ルールセットディレクトリが存在しません: {}", path.display());
        }
        return Ok(Some(path));
    }

    let cwd = std::env::current_dir().context("カレントディレクトリの取得に失敗しました")?;
    let candidates = [
        cwd.join("config").join("policies"),
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("config")
            .join("policies"),
    ];
    Ok(candidates.into_iter().find(|path| path.is_dir()))
}

/// Files directly in `dir` form the primary source; each file under `mods/`
/// is a secondary source named after its file stem.
fn load_dir(dir: &Path) -> Result<LoadedRuleset> {
    let mut sources = Vec::new();
    for path in content_files(dir)? {
        sources.push(read_source(PRIMARY_ORIGIN, &path)?);
    }
    ensure!(
        !sources.is_empty(),
        "ルールセットディレクトリ直下にコンテンツファイルがありません (json/yaml/yml): {}",
        dir.display()
    );
    let mods = dir.join(MODS_DIR);
    if mods.is_dir() {
        for path in content_files(&mods)? {
            let origin = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or(MODS_DIR)
                .to_string();
            sources.push(read_source(origin, &path)?);
        }
    }
    RulesetBuilder::new()
        .with_sources(sources)
        .build()
        .with_context(|| format!("ルールセットの読み込みに失敗しました: {}", dir.display()))
}

fn content_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries = fs::read_dir(dir)
        .with_context(|| format!("ディレクトリを読み込めません: {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && ContentFormat::from_path(&path).is_some() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn read_source(origin: impl Into<String>, path: &Path) -> Result<ContentSource> {
    debug!(path = %path.display(), "コンテンツファイルを読み込みます");
    let body = fs::read_to_string(path)
        .with_context(|| format!("ファイルの読み込みに失敗しました: {}", path.display()))?;
    ContentSource::from_file(origin, path, body)
}
