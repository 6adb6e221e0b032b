//! Headless-browser screenshot capture and the screenshots directory.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::VisualError;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S%3f";
const DIFF_SUFFIX: &str = "_diff";
const WINDOW_SIZE: &str = "--window-size=1280,720";

/// `{slug}_{YYYYmmdd_HHMMSSmmm}.png`, millisecond resolution.
#[must_use]
pub fn screenshot_file_name(slug: &str, at: DateTime<Utc>) -> String {
    format!("{slug}_{}.png", at.format(TIMESTAMP_FORMAT))
}

/// `{slug}_{YYYYmmdd_HHMMSSmmm}_diff.png`
#[must_use]
pub fn diff_file_name(slug: &str, at: DateTime<Utc>) -> String {
    format!("{slug}_{}{DIFF_SUFFIX}.png", at.format(TIMESTAMP_FORMAT))
}

/// Capture timestamp encoded in a screenshot file name for `slug`.
///
/// Diff images and other competitors' files (including slugs that merely
/// share a prefix) yield `None`.
fn capture_time(file_name: &str, slug: &str) -> Option<NaiveDateTime> {
    let stamp = file_name
        .strip_prefix(slug)?
        .strip_prefix('_')?
        .strip_suffix(".png")?;
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()
}

/// Newest capture for `slug` in `dir`, skipping `exclude`.
///
/// # Errors
///
/// Returns [`VisualError::Io`] if the directory cannot be read. A missing
/// directory is treated as empty.
pub fn latest_screenshot(
    dir: &Path,
    slug: &str,
    exclude: Option<&Path>,
) -> Result<Option<PathBuf>, VisualError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(VisualError::io(dir, e)),
    };

    let mut newest: Option<(NaiveDateTime, PathBuf)> = None;
    for entry in entries {
        let entry = entry.map_err(|e| VisualError::io(dir, e))?;
        let path = entry.path();
        if exclude.is_some_and(|ex| ex == path) {
            continue;
        }
        let Some(taken) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| capture_time(n, slug))
        else {
            continue;
        };
        if newest.as_ref().is_none_or(|(best, _)| taken > *best) {
            newest = Some((taken, path));
        }
    }
    Ok(newest.map(|(_, path)| path))
}

/// Delete PNG files in `dir` last modified more than `keep_days` days ago.
/// Returns how many were removed.
///
/// # Errors
///
/// Returns [`VisualError::Io`] if the directory cannot be read or a file
/// cannot be removed. A missing directory removes nothing.
pub fn prune_screenshots(dir: &Path, keep_days: u32) -> Result<usize, VisualError> {
    let cutoff = SystemTime::now()
        .checked_sub(Duration::from_secs(u64::from(keep_days) * 86_400))
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(VisualError::io(dir, e)),
    };

    let mut removed = 0;
    for entry in entries {
        let entry = entry.map_err(|e| VisualError::io(dir, e))?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("png") {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .map_err(|e| VisualError::io(&path, e))?;
        if modified < cutoff {
            std::fs::remove_file(&path).map_err(|e| VisualError::io(&path, e))?;
            removed += 1;
        }
    }

    tracing::debug!(dir = %dir.display(), removed, keep_days, "pruned screenshots");
    Ok(removed)
}

/// Drives a Chromium-compatible browser in headless screenshot mode.
#[derive(Debug, Clone)]
pub struct ScreenshotCapturer {
    browser_bin: String,
    dir: PathBuf,
    timeout: Duration,
}

impl ScreenshotCapturer {
    #[must_use]
    pub fn new(browser_bin: impl Into<String>, dir: impl Into<PathBuf>, timeout_secs: u64) -> Self {
        Self {
            browser_bin: browser_bin.into(),
            dir: dir.into(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Check that the browser binary can be spawned.
    ///
    /// # Errors
    ///
    /// Returns [`VisualError::Unavailable`] when it cannot be run or exits non-zero.
    pub async fn probe(&self) -> Result<(), VisualError> {
        let output = tokio::process::Command::new(&self.browser_bin)
            .arg("--version")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| VisualError::Unavailable {
                reason: format!("cannot run {}: {e}", self.browser_bin),
            })?;
        if !output.status.success() {
            return Err(VisualError::Unavailable {
                reason: format!("{} --version exited with {}", self.browser_bin, output.status),
            });
        }
        Ok(())
    }

    /// Capture `url` into `{dir}/{slug}_{timestamp}.png` and return the path.
    ///
    /// # Errors
    ///
    /// - [`VisualError::Io`]: the screenshots directory cannot be created.
    /// - [`VisualError::Timeout`]: the browser did not finish in time.
    /// - [`VisualError::Capture`]: the browser could not be spawned, exited
    ///   non-zero, or wrote no file.
    pub async fn capture(
        &self,
        competitor: &str,
        slug: &str,
        url: &str,
        at: DateTime<Utc>,
    ) -> Result<PathBuf, VisualError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| VisualError::io(&self.dir, e))?;
        let path = self.dir.join(screenshot_file_name(slug, at));
        let capture_err = |reason: String| VisualError::Capture {
            competitor: competitor.to_string(),
            reason,
        };

        let screenshot_arg = format!("--screenshot={}", path.display());
        let run = tokio::process::Command::new(&self.browser_bin)
            .args([
                "--headless",
                "--disable-gpu",
                "--hide-scrollbars",
                WINDOW_SIZE,
                screenshot_arg.as_str(),
                url,
            ])
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| VisualError::Timeout {
                competitor: competitor.to_string(),
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| capture_err(format!("{} subprocess error: {e}", self.browser_bin)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(capture_err(format!(
                "browser exited with {}: {}",
                output.status,
                stderr.lines().last().unwrap_or_default()
            )));
        }
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(capture_err("browser wrote no screenshot".to_string()));
        }

        tracing::debug!(competitor, path = %path.display(), "screenshot captured");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, h, m, s).unwrap()
    }

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rivalwatch-{tag}-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn file_names_follow_slug_and_timestamp() {
        assert_eq!(screenshot_file_name("notion", at(9, 5, 7)), "notion_20260314_090507000.png");
        assert_eq!(diff_file_name("notion", at(9, 5, 7)), "notion_20260314_090507000_diff.png");

        let later = at(9, 5, 7) + chrono::Duration::milliseconds(42);
        assert_eq!(screenshot_file_name("notion", later), "notion_20260314_090507042.png");
    }

    #[test]
    fn captures_within_one_second_get_distinct_names() {
        let first = at(9, 5, 7) + chrono::Duration::milliseconds(120);
        let second = first + chrono::Duration::milliseconds(35);
        let (a, b) = (
            screenshot_file_name("notion", first),
            screenshot_file_name("notion", second),
        );
        assert_ne!(a, b);
        assert!(capture_time(&b, "notion").unwrap() > capture_time(&a, "notion").unwrap());
    }

    #[test]
    fn capture_time_rejects_diffs_and_prefix_collisions() {
        assert!(capture_time("notion_20260314_090507000.png", "notion").is_some());
        assert!(capture_time("notion_20260314_090507000_diff.png", "notion").is_none());
        assert!(capture_time("notion-mail_20260314_090507000.png", "notion").is_none());
        assert!(capture_time("notion_mail_20260314_090507000.png", "notion").is_none());
    }

    #[test]
    fn latest_screenshot_picks_newest_capture() {
        let dir = temp_dir("latest");
        for name in [
            screenshot_file_name("figma", at(8, 0, 0)),
            screenshot_file_name("figma", at(10, 0, 0)),
            diff_file_name("figma", at(11, 0, 0)),
            screenshot_file_name("slack", at(12, 0, 0)),
        ] {
            std::fs::write(dir.join(name), b"png").unwrap();
        }

        let latest = latest_screenshot(&dir, "figma", None).unwrap().unwrap();
        assert!(latest.ends_with("figma_20260314_100000000.png"));

        let excluded = latest_screenshot(&dir, "figma", Some(&latest)).unwrap().unwrap();
        assert!(excluded.ends_with("figma_20260314_080000000.png"));

        assert!(latest_screenshot(&dir, "asana", None).unwrap().is_none());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = std::env::temp_dir().join(format!("rivalwatch-missing-{}", uuid::Uuid::new_v4()));
        assert!(latest_screenshot(&dir, "figma", None).unwrap().is_none());
        assert_eq!(prune_screenshots(&dir, 30).unwrap(), 0);
    }

    #[test]
    fn prune_keeps_recent_files() {
        let dir = temp_dir("prune");
        std::fs::write(dir.join("linear_20260314_080000000.png"), b"png").unwrap();
        std::fs::write(dir.join("notes.txt"), b"keep").unwrap();

        assert_eq!(prune_screenshots(&dir, 30).unwrap(), 0);
        assert_eq!(prune_screenshots(&dir, 0).unwrap(), 1);
        assert!(dir.join("notes.txt").exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn missing_browser_is_unavailable() {
        let capturer = ScreenshotCapturer::new("rivalwatch-no-such-browser", temp_dir("probe"), 5);
        let err = capturer.probe().await.unwrap_err();
        assert!(matches!(err, VisualError::Unavailable { .. }));
        std::fs::remove_dir_all(capturer.dir()).unwrap();
    }

    #[tokio::test]
    async fn missing_browser_fails_capture() {
        let capturer = ScreenshotCapturer::new("rivalwatch-no-such-browser", temp_dir("capture"), 5);
        let err = capturer
            .capture("Linear", "linear", "https://linear.app/changelog", at(9, 0, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, VisualError::Capture { .. }), "got: {err:?}");
        std::fs::remove_dir_all(capturer.dir()).unwrap();
    }
}
