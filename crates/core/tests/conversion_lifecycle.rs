//! End-to-end conversion runs against a temporary tree:
//! discovery, a batch through the mock converter, and the post-check.

use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use mp3cator_core::{
    testing::{
        fixtures::{list_relative, write_files},
        MockConverter,
    },
    BatchProcessor, BatchReport, Catalog, DeletionOutcome, OutputPolicy, PostCheck,
    ProcessorConfig,
};

struct Harness {
    dir: TempDir,
    converter: MockConverter,
}

impl Harness {
    async fn new(files: &[&str]) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        write_files(dir.path(), files);
        let converter = MockConverter::new();
        converter.set_write_outputs(true).await;
        Self { dir, converter }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    async fn convert(&self, policy: &OutputPolicy) -> BatchReport {
        let catalog = Catalog::new(self.root()).unwrap();
        let scan = catalog.identify_candidates("ogg", "mp3", policy).unwrap();
        let processor = BatchProcessor::new(
            ProcessorConfig::default().with_max_conversions(3),
            self.converter.clone(),
        );
        processor
            .run(scan.candidates, CancellationToken::new(), None)
            .await
    }

    fn post_check(&self, policy: OutputPolicy) -> PostCheck {
        PostCheck::new(self.root(), policy, "ogg", "mp3").unwrap()
    }
}

#[tokio::test]
async fn test_in_place_run_converges() {
    let h = Harness::new(&["a.ogg", "Album/01.ogg", "Album/02.ogg", "Album/02.mp3"]).await;

    let report = h.convert(&OutputPolicy::InPlace).await;
    assert_eq!(report.total, 2);
    assert_eq!(report.succeeded, 2);
    assert!(report.is_complete_success());

    assert_eq!(
        list_relative(h.root()),
        vec![
            "Album/01.mp3",
            "Album/01.ogg",
            "Album/02.mp3",
            "Album/02.ogg",
            "a.mp3",
            "a.ogg"
        ]
    );
    assert!(h.post_check(OutputPolicy::InPlace).verify().unwrap().is_empty());
}

#[tokio::test]
async fn test_second_run_has_nothing_to_do() {
    let h = Harness::new(&["one.ogg", "sub/two.ogg"]).await;

    h.convert(&OutputPolicy::InPlace).await;
    assert_eq!(h.converter.conversion_count().await, 2);

    let second = h.convert(&OutputPolicy::InPlace).await;
    assert_eq!(second.total, 0);
    assert_eq!(h.converter.conversion_count().await, 2);
}

#[tokio::test]
async fn test_restructure_run() {
    let h = Harness::new(&["My Album/01 - Intro.ogg", "My Album/Deep Cut.ogg"]).await;

    let report = h.convert(&OutputPolicy::Restructure).await;
    assert!(report.is_complete_success());

    let files = list_relative(h.root());
    assert!(files.contains(&"RS/myAlbum/01Intro.mp3".to_string()));
    assert!(files.contains(&"RS/myAlbum/deepCut.mp3".to_string()));
    assert!(files.contains(&"My Album/01 - Intro.ogg".to_string()));

    assert!(h
        .post_check(OutputPolicy::Restructure)
        .verify()
        .unwrap()
        .is_empty());
    // Nothing was written next to the sources.
    assert_eq!(h.post_check(OutputPolicy::InPlace).verify().unwrap().len(), 2);
}

#[tokio::test]
async fn test_custom_directory_run() {
    let h = Harness::new(&["Live/set.ogg", "top.ogg"]).await;
    let out = TempDir::new().unwrap();
    let policy = OutputPolicy::CustomDirectory(out.path().to_path_buf());

    let report = h.convert(&policy).await;
    assert_eq!(report.succeeded, 2);
    assert_eq!(list_relative(out.path()), vec!["Live/set.mp3", "top.mp3"]);

    let check = h.post_check(policy).run(false).unwrap();
    assert_eq!(check.source_count, 2);
    assert_eq!(check.target_count, 2);
    assert!(check.is_complete());
}

#[tokio::test]
async fn test_failure_blocks_deletion() {
    let h = Harness::new(&["good.ogg", "bad.ogg"]).await;
    h.converter
        .fail_on(h.root().join("bad.ogg"), "corrupt stream")
        .await;

    let report = h.convert(&OutputPolicy::InPlace).await;
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failures().count(), 1);

    let check = h.post_check(OutputPolicy::InPlace).run(true).unwrap();
    assert_eq!(check.unconverted, vec![h.root().join("bad.ogg")]);
    assert_eq!(
        check.deletion,
        DeletionOutcome::SkippedUnconverted { remaining: 1 }
    );
    assert!(h.root().join("good.ogg").exists());
    assert!(h.root().join("bad.ogg").exists());
}

#[tokio::test]
async fn test_complete_run_deletes_sources() {
    let h = Harness::new(&["x/1.ogg", "x/2.ogg", "3.ogg"]).await;

    h.convert(&OutputPolicy::InPlace).await;
    let check = h.post_check(OutputPolicy::InPlace).run(true).unwrap();

    assert_eq!(
        check.deletion,
        DeletionOutcome::Completed {
            deleted: 3,
            total: 3,
            failures: Vec::new(),
        }
    );
    assert_eq!(list_relative(h.root()), vec!["3.mp3", "x/1.mp3", "x/2.mp3"]);
}

#[tokio::test]
async fn test_cancelled_run_leaves_rest_for_next_time() {
    let files: Vec<String> = (0..8).map(|i| format!("track{i}.ogg")).collect();
    let refs: Vec<&str> = files.iter().map(String::as_str).collect();
    let h = Harness::new(&refs).await;
    h.converter.set_delay(Duration::from_millis(100)).await;

    let catalog = Catalog::new(h.root()).unwrap();
    let scan = catalog
        .identify_candidates("ogg", "mp3", &OutputPolicy::InPlace)
        .unwrap();
    let processor = BatchProcessor::new(
        ProcessorConfig::default().with_max_conversions(1),
        h.converter.clone(),
    );

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        trigger.cancel();
    });

    let report = processor.run(scan.candidates, cancel, None).await;
    assert!(report.cancelled);
    assert!(report.processed < 8);

    // The next scan only picks up what is still missing.
    h.converter.set_delay(Duration::ZERO).await;
    let resumed = h.convert(&OutputPolicy::InPlace).await;
    assert!(resumed.is_complete_success());
    assert!(h.post_check(OutputPolicy::InPlace).verify().unwrap().is_empty());
}
