//! End-to-end image download runs against a scripted editor and a mock CDN

mod common;

use chapter_harvest::{AcquisitionResult, Pipeline, RawAsset};
use common::{
    PNG_BYTES, ScriptedChapter, ScriptedSource, chapter_dirs, decorative, fail_upload, fast_config,
    serve_upload, uploaded, written_files,
};
use wiremock::MockServer;

const BOOK_URL: &str = "https://cdp.example.com/book/1";

async fn cdn_with(names: &[&str]) -> MockServer {
    let server = MockServer::start().await;
    for name in names {
        serve_upload(&server, name, PNG_BYTES).await;
    }
    server
}

#[tokio::test]
async fn writes_one_directory_per_chapter_with_deterministic_names() {
    let server = cdn_with(&["a.png", "b.jpg", "c.png"]).await;
    let base = server.uri();
    let mut source = ScriptedSource::new(vec![
        ScriptedChapter::new(
            "One",
            vec![uploaded(&base, "a.png"), decorative(&base), uploaded(&base, "b.jpg")],
        ),
        ScriptedChapter::new("Two", vec![]),
        ScriptedChapter::new(
            "Three",
            vec![RawAsset::url(format!("{base}/wp-content/uploads/c.png?resize=640%2C480"))],
        ),
    ]);
    let out = tempfile::tempdir().unwrap();

    let report = Pipeline::new(fast_config())
        .unwrap()
        .run_download(&mut source, BOOK_URL, "B01234", out.path())
        .await
        .unwrap();

    let root = out.path().join("B01234");
    assert_eq!(report.root, root);
    assert_eq!(
        written_files(&root),
        vec![
            "Chapter 1/B01234_1_0.png",
            "Chapter 1/B01234_1_1.jpg",
            "Chapter 3/B01234_3_0.png",
        ]
    );
    assert_eq!(chapter_dirs(&root), vec!["Chapter 1", "Chapter 2", "Chapter 3"]);
    assert_eq!(report.files_written(), 3);
    assert!(report.failures().is_empty());
    assert_eq!(source.visits(), vec![1, 2, 3]);
    assert_eq!(source.close_count, 1);
}

#[tokio::test]
async fn failed_fetch_is_recorded_against_its_ordinal_only() {
    let server = cdn_with(&["0.png", "1.png", "3.png"]).await;
    fail_upload(&server, "2.png", 404).await;
    let base = server.uri();
    let images = (0..4).map(|i| uploaded(&base, &format!("{i}.png"))).collect();
    let mut source = ScriptedSource::new(vec![ScriptedChapter::new("Only", images)]);
    let out = tempfile::tempdir().unwrap();

    let report = Pipeline::new(fast_config())
        .unwrap()
        .run_download(&mut source, BOOK_URL, "BK", out.path())
        .await
        .unwrap();

    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!((failures[0].unit, failures[0].ordinal), (1, 2));
    assert_eq!(failures[0].cause.status(), Some(404));

    let unit = &report.units[0];
    assert_eq!(unit.located, 4);
    assert_eq!(unit.succeeded(), unit.located - unit.failed());
    let ordinals: Vec<_> = unit.results.iter().map(AcquisitionResult::ordinal).collect();
    assert_eq!(ordinals, vec![0, 1, 2, 3]);

    assert_eq!(
        written_files(&report.root),
        vec!["Chapter 1/BK_1_0.png", "Chapter 1/BK_1_1.png", "Chapter 1/BK_1_3.png"]
    );
}

#[tokio::test]
async fn rerunning_the_same_book_targets_the_same_paths() {
    let server = cdn_with(&["x.png", "y.gif"]).await;
    let base = server.uri();
    let book = || {
        ScriptedSource::new(vec![ScriptedChapter::new(
            "Repeat",
            vec![uploaded(&base, "x.png"), uploaded(&base, "y.gif")],
        )])
    };
    let out = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(fast_config()).unwrap();

    let first = pipeline
        .run_download(&mut book(), BOOK_URL, "BK", out.path())
        .await
        .unwrap();
    let second = pipeline
        .run_download(&mut book(), BOOK_URL, "BK", out.path())
        .await
        .unwrap();

    let paths = |report: &chapter_harvest::DownloadReport| -> Vec<_> {
        report.units[0]
            .results
            .iter()
            .filter_map(|result| match result {
                AcquisitionResult::Written { path, .. } => Some(path.clone()),
                _ => None,
            })
            .collect()
    };
    assert_eq!(paths(&first), paths(&second));
    assert_eq!(paths(&first).len(), 2);
    assert_eq!(written_files(&first.root).len(), 2);
}

#[tokio::test]
async fn unwritable_book_directory_is_recorded_per_chapter() {
    let server = cdn_with(&["a.png"]).await;
    let base = server.uri();
    let mut source = ScriptedSource::new(vec![
        ScriptedChapter::new("One", vec![uploaded(&base, "a.png")]),
        ScriptedChapter::new("Two", vec![uploaded(&base, "a.png")]),
    ]);
    let out = tempfile::tempdir().unwrap();
    std::fs::write(out.path().join("BK"), b"a file, not a directory").unwrap();

    let report = Pipeline::new(fast_config())
        .unwrap()
        .run_download(&mut source, BOOK_URL, "BK", out.path())
        .await
        .unwrap();

    assert_eq!(report.failed_units().count(), 2);
    assert_eq!(report.files_written(), 0);
    assert_eq!(source.visits(), vec![1, 2]);
}

#[tokio::test]
async fn report_serializes_for_json_output() {
    let server = cdn_with(&["a.png"]).await;
    fail_upload(&server, "b.png", 500).await;
    let base = server.uri();
    let mut source = ScriptedSource::new(vec![ScriptedChapter::new(
        "One",
        vec![uploaded(&base, "a.png"), uploaded(&base, "b.png")],
    )]);
    let out = tempfile::tempdir().unwrap();

    let report = Pipeline::new(fast_config())
        .unwrap()
        .run_download(&mut source, BOOK_URL, "BK", out.path())
        .await
        .unwrap();

    let json = serde_json::to_value(&report).unwrap();
    let results = &json["units"][0]["results"];
    assert_eq!(results[0]["outcome"], "written");
    assert_eq!(results[1]["outcome"], "failed");
    assert!(results[1]["cause"].as_str().unwrap().contains("500"));
}
