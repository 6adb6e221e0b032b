//! Pipeline runs with visual diff available, using a stand-in browser script
//! that copies a fixture PNG to the requested screenshot path.

#![cfg(unix)]

use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use image::{Rgb, RgbImage};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rivalwatch_core::{build_app_config, AppConfig, CompetitorConfig};
use rivalwatch_db::{Store, SummaryFilter};
use rivalwatch_pipeline::{Pipeline, PipelineState, RunControl};
use rivalwatch_visual::{ScreenshotCapturer, VisualDiff};

const CHANGELOG_HTML: &str = r"<html><body><main>
  <h2>Project Updates</h2>
  <p>Project updates can now be posted from the sidebar and shared to Slack.</p>
</main></body></html>";

fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("rivalwatch-{tag}-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Copies `fixture` to the `--screenshot=` path and appends one line to
/// `launches` per invocation.
fn copying_browser(dir: &Path, fixture: &Path, launches: &Path) -> PathBuf {
    let script = dir.join("stand-in-chromium");
    let body = format!(
        "#!/bin/sh\necho launch >> '{}'\nfor arg in \"$@\"; do\n  case \"$arg\" in\n    --screenshot=*) cp '{}' \"${{arg#--screenshot=}}\" ;;\n  esac\ndone\n",
        launches.display(),
        fixture.display()
    );
    std::fs::write(&script, body).unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script
}

fn failing_browser(dir: &Path) -> PathBuf {
    let script = dir.join("broken-chromium");
    std::fs::write(&script, "#!/bin/sh\necho 'no display' >&2\nexit 1\n").unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script
}

fn write_fixture(path: &Path, value: u8) {
    RgbImage::from_pixel(48, 27, Rgb([value; 3])).save(path).unwrap();
}

/// Offline, no webhook, `interval_ms` between outbound calls.
fn config(interval_ms: u64) -> AppConfig {
    let vars: HashMap<String, String> = HashMap::from([
        (
            "RIVALWATCH_MIN_REQUEST_INTERVAL_MS".to_string(),
            interval_ms.to_string(),
        ),
        ("RIVALWATCH_SCRAPER_REQUEST_TIMEOUT_SECS".to_string(), "2".to_string()),
    ]);
    build_app_config(|k| vars.get(k).cloned().ok_or(std::env::VarError::NotPresent))
        .expect("test config should be valid")
}

async fn serve_changelog(server: &MockServer) -> CompetitorConfig {
    Mock::given(method("GET"))
        .and(path("/linear/changelog"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(CHANGELOG_HTML),
        )
        .mount(server)
        .await;
    CompetitorConfig::new(
        "Linear",
        format!("{}/linear/changelog", server.uri()),
        "Project Management",
    )
}

async fn pipeline_with(config: &AppConfig, capturer: ScreenshotCapturer) -> Pipeline {
    Pipeline::from_app_config(config, Store::in_memory())
        .await
        .unwrap()
        .without_notifier()
        .with_visual(VisualDiff::with_engine(capturer, 0.1))
}

fn launch_count(launches: &Path) -> usize {
    std::fs::read_to_string(launches)
        .map(|log| log.lines().count())
        .unwrap_or(0)
}

#[tokio::test]
async fn second_run_stores_one_comparison() {
    let server = MockServer::start().await;
    let linear = serve_changelog(&server).await;
    let work = temp_dir("pipeline-visual");
    let fixture = work.join("fixture.png");
    let launches = work.join("launches.log");
    let browser = copying_browser(&work, &fixture, &launches);

    let capturer = ScreenshotCapturer::new(browser.display().to_string(), work.join("shots"), 5);
    let pipeline = pipeline_with(&config(0), capturer).await;

    write_fixture(&fixture, 0);
    let first = pipeline.run(std::slice::from_ref(&linear), &RunControl::new()).await;
    assert!(first.outcomes[0].comparison.is_none());

    write_fixture(&fixture, 255);
    let second = pipeline.run(std::slice::from_ref(&linear), &RunControl::new()).await;
    let comparison = second.outcomes[0]
        .comparison
        .as_ref()
        .expect("second run should compare against the first capture");
    assert!(comparison.significant);
    assert!(comparison.similarity < 0.1);

    let stored = pipeline
        .store()
        .list_comparisons(Some("Linear"), None)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(&stored[0], comparison);
    assert_eq!(launch_count(&launches), 2);

    std::fs::remove_dir_all(&work).unwrap();
}

#[tokio::test]
async fn browser_failure_still_stores_the_summary() {
    let server = MockServer::start().await;
    let linear = serve_changelog(&server).await;
    let work = temp_dir("pipeline-broken");
    let browser = failing_browser(&work);

    let capturer = ScreenshotCapturer::new(browser.display().to_string(), work.join("shots"), 5);
    let pipeline = pipeline_with(&config(0), capturer).await;
    let report = pipeline.run(&[linear], &RunControl::new()).await;

    let outcome = &report.outcomes[0];
    assert!(outcome.comparison.is_none());
    assert!(outcome.persisted);
    assert_eq!(outcome.trace.last(), Some(&PipelineState::Stored));

    let records = pipeline
        .store()
        .list_summaries(&SummaryFilter::default())
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].competitor, "Linear");
    assert!(pipeline
        .store()
        .list_comparisons(Some("Linear"), None)
        .await
        .unwrap()
        .is_empty());

    std::fs::remove_dir_all(&work).unwrap();
}

#[tokio::test]
async fn browser_launch_waits_for_the_extractor_gate() {
    let server = MockServer::start().await;
    let linear = serve_changelog(&server).await;
    let work = temp_dir("pipeline-gate");
    let fixture = work.join("fixture.png");
    let launches = work.join("launches.log");
    let browser = copying_browser(&work, &fixture, &launches);
    write_fixture(&fixture, 90);

    let interval = Duration::from_millis(400);
    let capturer = ScreenshotCapturer::new(browser.display().to_string(), work.join("shots"), 5);
    let pipeline = pipeline_with(&config(400), capturer).await;

    // The changelog fetch is the gate's first dispatch; the capture follows it.
    let started = Instant::now();
    let report = pipeline.run(&[linear], &RunControl::new()).await;
    let elapsed = started.elapsed();

    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(launch_count(&launches), 1);
    assert!(
        elapsed >= interval,
        "browser launched {elapsed:?} into the run, before the {interval:?} gate"
    );

    std::fs::remove_dir_all(&work).unwrap();
}
