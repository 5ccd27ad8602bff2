mod common;

use std::time::Duration;

use serde_json::json;

use birdcall_harvester::pipeline::DownloadOrchestrator;

use common::{RouteHttp, TraceSink, criteria, files_in, temp_root};

const LISTING: &str = "api/2/recordings";

fn recording(id: u32, species: &str, quality: &str) -> serde_json::Value {
    json!({
        "id": id.to_string(),
        "en": species,
        "q": quality,
        "loc": "Lake X",
        "rec": "Ann",
        "file": format!("https://xeno-canto.org/{id}/download"),
    })
}

fn page(num_pages: u32, recordings: Vec<serde_json::Value>) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "numRecordings": recordings.len().to_string(),
        "numPages": num_pages,
        "recordings": recordings,
    }))
    .unwrap()
}

#[test]
fn missing_scope_makes_no_requests() {
    let (_temp, root) = temp_root();
    let mut criteria = criteria(root.clone());
    criteria.xeno.country = None;
    let http = RouteHttp::new();
    let sink = TraceSink::default();

    let written = DownloadOrchestrator::new(&http).run_xeno_canto(&criteria, &sink);

    assert_eq!(written, 0);
    assert!(http.calls().is_empty());
    assert!(!root.as_std_path().exists());
    sink.assert_well_formed();
}

#[test]
fn keeps_best_three_of_twelve() {
    let (_temp, root) = temp_root();
    let qualities = ["C", "B", "A", "C", "A", "B", "D", "", "E", "A", "B", "C"];
    let recordings = qualities
        .iter()
        .enumerate()
        .map(|(index, quality)| recording(index as u32 + 1, "Common Loon", quality))
        .collect();
    let http = RouteHttp::new()
        .route(LISTING, 200, page(1, recordings))
        .route("/download", 200, b"ID3".to_vec());
    let sink = TraceSink::default();

    let written = DownloadOrchestrator::new(&http)
        .with_download_delay(Duration::ZERO)
        .run_xeno_canto(&criteria(root.clone()), &sink);

    assert_eq!(written, 3);
    assert_eq!(http.calls_matching(LISTING), 2);
    assert_eq!(http.calls_matching("/download"), 3);
    assert_eq!(
        files_in(&root.join("XC").join("Common Loon")),
        vec![
            "(A) Common Loon; Lake X; Ann; XC10.mp3",
            "(A) Common Loon; Lake X; Ann; XC3.mp3",
            "(A) Common Loon; Lake X; Ann; XC5.mp3",
        ]
    );
    sink.assert_well_formed();
}

#[test]
fn rerun_skips_existing_files() {
    let (_temp, root) = temp_root();
    let http = RouteHttp::new()
        .route(LISTING, 200, page(1, vec![recording(1, "Common Loon", "A")]))
        .route("/download", 200, b"ID3".to_vec());
    let orchestrator = DownloadOrchestrator::new(&http).with_download_delay(Duration::ZERO);
    let criteria = criteria(root);

    assert_eq!(orchestrator.run_xeno_canto(&criteria, &TraceSink::default()), 1);
    assert_eq!(orchestrator.run_xeno_canto(&criteria, &TraceSink::default()), 0);
    assert_eq!(http.calls_matching("/download"), 1);
}

#[test]
fn empty_catalog_returns_zero() {
    let (_temp, root) = temp_root();
    let http = RouteHttp::new().route(LISTING, 200, page(0, Vec::new()));
    let sink = TraceSink::default();

    let written = DownloadOrchestrator::new(&http).run_xeno_canto(&criteria(root), &sink);

    assert_eq!(written, 0);
    assert_eq!(http.calls().len(), 1);
    sink.assert_well_formed();
}

#[test]
fn unreachable_catalog_returns_zero() {
    let (_temp, root) = temp_root();
    let http = RouteHttp::new().unreachable(LISTING);
    let sink = TraceSink::default();

    let written = DownloadOrchestrator::new(&http).run_xeno_canto(&criteria(root), &sink);

    assert_eq!(written, 0);
    assert_eq!(http.calls().len(), 1);
    sink.assert_well_formed();
}

#[test]
fn failed_page_keeps_earlier_pages() {
    let (_temp, root) = temp_root();
    let http = RouteHttp::new()
        .route("page=2", 500, Vec::new())
        .route(
            LISTING,
            200,
            page(
                2,
                vec![
                    recording(1, "Common Loon", "A"),
                    recording(2, "Rusty Blackbird", "B"),
                ],
            ),
        )
        .route("/download", 200, b"ID3".to_vec());
    let sink = TraceSink::default();

    let written = DownloadOrchestrator::new(&http)
        .with_download_delay(Duration::ZERO)
        .run_xeno_canto(&criteria(root.clone()), &sink);

    assert_eq!(written, 2);
    assert_eq!(files_in(&root.join("XC")), vec!["Common Loon", "Rusty Blackbird"]);
    sink.assert_well_formed();
}

#[test]
fn failed_media_download_is_not_counted() {
    let (_temp, root) = temp_root();
    let http = RouteHttp::new()
        .route(
            LISTING,
            200,
            page(
                1,
                vec![
                    recording(1, "Common Loon", "A"),
                    recording(2, "Common Loon", "B"),
                ],
            ),
        )
        .route("/1/download", 503, Vec::new())
        .route("/download", 200, b"ID3".to_vec());

    let written = DownloadOrchestrator::new(&http)
        .with_download_delay(Duration::ZERO)
        .run_xeno_canto(&criteria(root.clone()), &TraceSink::default());

    assert_eq!(written, 1);
    assert_eq!(
        files_in(&root.join("XC").join("Common Loon")),
        vec!["(B) Common Loon; Lake X; Ann; XC2.mp3"]
    );
}

#[test]
fn record_repeated_across_pages_is_fetched_once() {
    let (_temp, root) = temp_root();
    let http = RouteHttp::new()
        .route(
            "page=2",
            200,
            page(
                2,
                vec![
                    recording(1, "Common Loon", "A"),
                    recording(2, "Common Loon", "B"),
                ],
            ),
        )
        .route(LISTING, 200, page(2, vec![recording(1, "Common Loon", "A")]))
        .route("/download", 200, b"ID3".to_vec());
    let mut criteria = criteria(root.clone());
    criteria.overwrite = true;

    let written = DownloadOrchestrator::new(&http)
        .with_download_delay(Duration::ZERO)
        .run_xeno_canto(&criteria, &TraceSink::default());

    assert_eq!(written, 2);
    assert_eq!(http.calls_matching("/1/download"), 1);
    assert_eq!(files_in(&root.join("XC").join("Common Loon")).len(), 2);
}

#[test]
fn record_without_url_keeps_its_slot() {
    let (_temp, root) = temp_root();
    let mut missing_url = recording(1, "Common Loon", "A");
    missing_url["file"] = serde_json::Value::Null;
    let http = RouteHttp::new()
        .route(
            LISTING,
            200,
            page(1, vec![missing_url, recording(2, "Common Loon", "B")]),
        )
        .route("/download", 200, b"ID3".to_vec());
    let mut criteria = criteria(root);
    criteria.xeno.max_per_species = 1;

    let written = DownloadOrchestrator::new(&http)
        .with_download_delay(Duration::ZERO)
        .run_xeno_canto(&criteria, &TraceSink::default());

    assert_eq!(written, 0);
    assert_eq!(http.calls_matching("/download"), 0);
}
