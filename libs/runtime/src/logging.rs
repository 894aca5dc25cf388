use crate::config::{LoggingConfig, Section};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::filter::{FilterFn, Targets};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

use file_rotate::{
    compression::Compression,
    suffix::AppendCount,
    ContentLimit, FileRotate,
};

const DEFAULT_MAX_SIZE_MB: u64 = 100;
const DEFAULT_MAX_BACKUPS: usize = 3;

// -------- level helpers --------

fn parse_tracing_level(s: &str) -> Option<Level> {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" => None,
        _ => Some(Level::INFO),
    }
}

/// True if `target == name` or `target` starts with `name::`.
fn matches_crate_prefix(target: &str, name: &str) -> bool {
    target == name || (target.starts_with(name) && target[name.len()..].starts_with("::"))
}

// -------- rotating file writers --------

#[derive(Clone)]
struct RotWriter(Arc<Mutex<FileRotate<AppendCount>>>);

impl Write for RotWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.lock().flush()
    }
}

/// Writer that silently drops records that have no destination file.
struct MaybeWriter(Option<RotWriter>);

impl Write for MaybeWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.0 {
            Some(w) => w.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.0 {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }
}

/// Routes each record to the file of the subsystem owning its target,
/// falling back to the "default" file.
#[derive(Clone, Default)]
struct FileRouter {
    default: Option<RotWriter>,
    by_prefix: Vec<(String, RotWriter)>,
}

impl FileRouter {
    fn resolve(&self, target: &str) -> Option<RotWriter> {
        self.by_prefix
            .iter()
            .find(|(name, _)| matches_crate_prefix(target, name))
            .map(|(_, w)| w.clone())
            .or_else(|| self.default.clone())
    }
}

impl<'a> fmt::MakeWriter<'a> for FileRouter {
    type Writer = MaybeWriter;

    fn make_writer(&'a self) -> Self::Writer {
        MaybeWriter(self.default.clone())
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        MaybeWriter(self.resolve(meta.target()))
    }
}

/// Relative log paths are resolved against the server home directory.
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

fn create_rotating_writer(
    log_path: &Path,
    max_bytes: usize,
    max_backups: usize,
) -> std::io::Result<RotWriter> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let rot = FileRotate::new(
        log_path,
        AppendCount::new(max_backups),
        ContentLimit::BytesSurpassed(max_bytes),
        Compression::None,
        #[cfg(unix)]
        None,
    );

    Ok(RotWriter(Arc::new(Mutex::new(rot))))
}

fn writer_for_section(name: &str, section: &Section, base_dir: &Path) -> Option<RotWriter> {
    if section.file.trim().is_empty() {
        return None;
    }
    let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) * 1024 * 1024;
    let backups = section.max_backups.unwrap_or(DEFAULT_MAX_BACKUPS);
    let log_path = resolve_log_path(&section.file, base_dir);

    match create_rotating_writer(&log_path, max_bytes as usize, backups) {
        Ok(w) => Some(w),
        Err(e) => {
            eprintln!(
                "Failed to init log file for '{}': {} ({})",
                name,
                log_path.display(),
                e
            );
            None
        }
    }
}

// -------- filters --------

/// Explicit subsystems only; everything else is OFF.
fn explicit_targets<'a>(
    sections: impl Iterator<Item = (&'a String, &'a Section)>,
    pick: impl Fn(&Section) -> &str,
) -> Targets {
    let mut targets = Targets::new().with_default(LevelFilter::OFF);
    for (name, section) in sections {
        if let Some(level) = parse_tracing_level(pick(section)) {
            targets = targets.with_target(name.clone(), LevelFilter::from_level(level));
        }
    }
    targets
}

/// Everything that is NOT claimed by an explicit subsystem, up to `max_level`.
fn default_filter(
    claimed: Vec<String>,
    max_level: Level,
) -> FilterFn<impl Fn(&tracing::Metadata<'_>) -> bool> {
    FilterFn::new(move |meta: &tracing::Metadata<'_>| {
        let t = meta.target();
        !claimed.iter().any(|c| matches_crate_prefix(t, c)) && meta.level() <= &max_level
    })
}

// -------- public init --------

/// Install the global subscriber.
///
/// Console output is human readable; file output is JSON. Each non-"default"
/// key of `cfg` is a target prefix (e.g. "rewards") with its own levels and file.
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    // Bridge `log` records from dependencies (sqlx, hyper) into tracing.
    let _ = tracing_log::LogTracer::init();

    if cfg.is_empty() {
        let _ = fmt()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .try_init();
        return;
    }

    let explicit: HashMap<&String, &Section> =
        cfg.iter().filter(|(k, _)| k.as_str() != "default").collect();
    let claimed: Vec<String> = explicit.keys().map(|k| (*k).clone()).collect();
    let default_section = cfg.get("default");

    let mut router = FileRouter::default();
    for (name, section) in &explicit {
        if let Some(w) = writer_for_section(name, section, base_dir) {
            router.by_prefix.push(((*name).clone(), w));
        }
    }
    if let Some(section) = default_section {
        router.default = writer_for_section("default", section, base_dir);
    }

    let ansi = atty::is(atty::Stream::Stdout);

    let console_explicit = fmt::layer()
        .with_ansi(ansi)
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(explicit_targets(explicit.clone().into_iter(), |s| {
            s.console_level.as_str()
        }));

    let file_explicit = fmt::layer()
        .json()
        .with_ansi(false)
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(router.clone())
        .with_filter(explicit_targets(
            explicit
                .clone()
                .into_iter()
                .filter(|(_, s)| !s.file.trim().is_empty()),
            |s| s.file_level.as_str(),
        ));

    let console_default = default_section
        .and_then(|s| parse_tracing_level(&s.console_level))
        .map(|level| {
            fmt::layer()
                .with_ansi(ansi)
                .with_target(true)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_filter(default_filter(claimed.clone(), level))
        });

    let file_default = default_section
        .filter(|_| router.default.is_some())
        .and_then(|s| parse_tracing_level(&s.file_level))
        .map(|level| {
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_target(true)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_writer(router.clone())
                .with_filter(default_filter(claimed.clone(), level))
        });

    let _ = tracing_subscriber::registry()
        .with(console_explicit)
        .with(file_explicit)
        .with(console_default)
        .with(file_default)
        .try_init();
}
