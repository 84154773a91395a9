//! Background task for expiring synthesized audio files.

use echoaid_voice::is_generated_audio_file;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::time::sleep;

/// Deletes generated audio files in `dir` whose last modification is at
/// least `max_age` ago. Returns the number of files removed.
///
/// Only names produced by the synthesizer are considered; anything else in
/// the directory is left alone. A missing directory counts as empty.
///
/// # Errors
///
/// Returns an error only if the directory listing itself fails. Failures on
/// individual files are logged and skipped.
pub async fn sweep_expired_audio(dir: &Path, max_age: Duration) -> std::io::Result<usize> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let now = SystemTime::now();
    let mut removed = 0;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !is_generated_audio_file(name) {
            continue;
        }

        let metadata = match entry.metadata().await {
            Ok(m) if m.is_file() => m,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(file = name, error = %e, "failed to stat audio file");
                continue;
            }
        };

        // A clock step backwards makes mtime appear in the future; treat as fresh.
        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or(Duration::ZERO);
        if age < max_age {
            continue;
        }

        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(file = name, error = %e, "failed to delete expired audio file");
            }
        }
    }

    Ok(removed)
}

/// Starts a background task that periodically deletes expired audio files.
///
/// This task runs indefinitely. A `retention_seconds` of 0 disables it.
///
/// # Arguments
///
/// * `audio_dir` - Directory the synthesizer writes to.
/// * `retention_seconds` - Minimum age before a file is deleted.
/// * `interval_seconds` - Time in seconds to wait between sweeps.
pub async fn start_audio_retention_task(
    audio_dir: PathBuf,
    retention_seconds: u64,
    interval_seconds: u64,
) {
    if retention_seconds == 0 {
        tracing::warn!("audio retention disabled (retention=0), generated files accumulate");
        return;
    }

    let max_age = Duration::from_secs(retention_seconds);
    let interval = Duration::from_secs(interval_seconds.max(1));
    tracing::info!(
        retention_seconds,
        interval_seconds,
        path = %audio_dir.display(),
        "starting audio retention task"
    );

    loop {
        sleep(interval).await;

        match sweep_expired_audio(&audio_dir, max_age).await {
            Ok(count) => {
                if count > 0 {
                    tracing::info!(count, "deleted expired audio files");
                } else {
                    tracing::debug!("no expired audio files to delete");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to sweep audio directory");
            }
        }
    }
}
