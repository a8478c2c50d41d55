// Developer task runner - suppress style lints
#![allow(clippy::needless_borrow)]

use pagesim::config::Config;
use sha2::{Digest, Sha256};
use shell_escape::escape;
use std::borrow::Cow;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn run(cmd: &mut Command) -> anyhow::Result<()> {
    eprintln!("[RUN] {}", display_command(cmd));
    let status = cmd.status()?;
    if !status.success() {
        anyhow::bail!("command failed: {}", display_command(cmd));
    }
    Ok(())
}

/// Command line as it could be pasted into a shell
fn display_command(cmd: &Command) -> String {
    let mut parts = vec![escape(cmd.get_program().to_string_lossy()).into_owned()];
    for arg in cmd.get_args() {
        parts.push(escape(arg.to_string_lossy()).into_owned());
    }
    parts.join(" ")
}

fn cargo() -> Command {
    Command::new("cargo")
}

fn task_fmt() -> anyhow::Result<()> {
    run(cargo().args(["fmt", "--all"]))
}

fn task_fmt_check() -> anyhow::Result<()> {
    run(cargo().args(["fmt", "--all", "--", "--check"]))
}

fn task_clippy() -> anyhow::Result<()> {
    run(cargo().args([
        "clippy",
        "--workspace",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]))
}

fn task_test() -> anyhow::Result<()> {
    run(cargo().args(["test", "--workspace"]))
}

/// The core library must keep building without `std`
fn task_no_std() -> anyhow::Result<()> {
    run(cargo().args(["build", "-p", "pagesim", "--lib", "--no-default-features"]))
}

fn task_check() -> anyhow::Result<()> {
    task_fmt_check()?;
    task_clippy()?;
    task_no_std()?;
    task_test()
}

fn have(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

fn sha256_file(path: &Path) -> anyhow::Result<String> {
    let data = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    let digest = hasher.finalize();
    Ok(hex::encode(digest))
}

fn tool_version(cmd: &str) -> Option<String> {
    if !have(cmd) {
        return None;
    }
    let out = Command::new(cmd).arg("--version").output().ok()?;
    let s = String::from_utf8_lossy(&out.stdout)
        .lines()
        .next()
        .unwrap_or("")
        .to_string();
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

// ============================================================================
// Simulator state
// ============================================================================

/// Simulator config named by the task arguments
///
/// Accepts `--config <path>` and `--state-dir <dir>` and loads the config the
/// same way `pagesim` does, so relative paths resolve against the working
/// directory.
fn state_config(args: &[String]) -> anyhow::Result<Config> {
    let mut config_path = None;
    let mut state_dir = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                config_path = Some(PathBuf::from(&args[i + 1]));
                i += 1;
            }
            "--state-dir" if i + 1 < args.len() => {
                state_dir = Some(PathBuf::from(&args[i + 1]));
                i += 1;
            }
            other => anyhow::bail!("unknown argument: {}", other),
        }
        i += 1;
    }

    let mut config = Config::load(config_path.as_deref())?;
    if let Some(dir) = state_dir {
        config = config.with_state_dir(dir);
    }
    Ok(config)
}

/// One entry of `STATE_MANIFEST.json`
#[derive(Debug, serde::Serialize)]
struct BlobDigest {
    name: String,
    path: String,
    bytes: u64,
    sha256: String,
}

fn backing_pages(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut pages = vec![];
    if !dir.is_dir() {
        return Ok(pages);
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
            if name.starts_with("page_") && name.ends_with(".bin") {
                pages.push(path);
            }
        }
    }
    pages.sort();
    Ok(pages)
}

fn task_clean_state(args: &[String]) -> anyhow::Result<()> {
    let config = state_config(args)?;
    for file in [config.page_table_path(), config.physical_memory_path()] {
        if file.exists() {
            fs::remove_file(&file)?;
            eprintln!("[CLEAN] Removed {}", file.display());
        }
    }
    let backing_dir = config.backing_path();
    let pages = backing_pages(&backing_dir)?;
    for page in &pages {
        fs::remove_file(page)?;
    }
    eprintln!(
        "[CLEAN] Removed {} backing pages from {}",
        pages.len(),
        backing_dir.display()
    );
    Ok(())
}

fn digest_blobs(config: &Config) -> anyhow::Result<Vec<BlobDigest>> {
    let mut blobs = vec![
        ("page_table".to_string(), config.page_table_path()),
        ("physical_memory".to_string(), config.physical_memory_path()),
    ];
    for page in backing_pages(&config.backing_path())? {
        let name = page
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        blobs.push((name, page));
    }

    let mut list = vec![];
    for (name, path) in blobs {
        if path.exists() {
            list.push(BlobDigest {
                bytes: path.metadata()?.len(),
                sha256: sha256_file(&path)?,
                path: path.to_string_lossy().into_owned(),
                name,
            });
        }
    }
    Ok(list)
}

fn task_digest(args: &[String]) -> anyhow::Result<()> {
    let config = state_config(args)?;
    let list = digest_blobs(&config)?;
    for blob in &list {
        eprintln!("[DIGEST] {}  {}", blob.sha256, blob.name);
    }

    let manifest = serde_json::json!({
        "versions": {
            "rustc": tool_version("rustc"),
            "cargo": tool_version("cargo"),
        },
        "blobs": list,
        "meta": {
            "timestamp": std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).ok().map(|d| d.as_secs()),
            "xtask_version": env!("CARGO_PKG_VERSION"),
        }
    });
    fs::create_dir_all(&config.state_dir)?;
    let out = config.state_dir.join("STATE_MANIFEST.json");
    fs::write(&out, serde_json::to_vec_pretty(&manifest)?)?;
    eprintln!("[ARTIFACT] {}", out.display());
    Ok(())
}

fn print_help() {
    let example = escape(Cow::Borrowed("my config.toml"));
    eprintln!(
        "xtask commands:\n  fmt | fmt-check | clippy | test | no-std | check\n  clean-state [--config <path>] [--state-dir <dir>]   # remove snapshots and backing pages\n  digest [--config <path>] [--state-dir <dir>]        # write STATE_MANIFEST.json next to the snapshots\n\nExamples:\n  cargo run -p xtask -- check\n  cargo run -p xtask -- digest --config {}",
        example
    );
}

fn main() -> anyhow::Result<()> {
    let mut args = env::args().skip(1);
    let cmd = args.next().unwrap_or_else(|| "help".into());
    let rest: Vec<String> = args.collect();
    match cmd.as_str() {
        "fmt" => task_fmt(),
        "fmt-check" => task_fmt_check(),
        "clippy" => task_clippy(),
        "test" => task_test(),
        "no-std" => task_no_std(),
        "check" => task_check(),
        "clean-state" => task_clean_state(&rest),
        "digest" => task_digest(&rest),

        _ => {
            print_help();
            Ok(())
        }
    }
}
