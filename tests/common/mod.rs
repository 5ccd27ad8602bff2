#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use camino::Utf8PathBuf;

use birdcall_harvester::config::{MacaulayCriteria, SearchCriteria, XenoCantoCriteria};
use birdcall_harvester::domain::QualityRank;
use birdcall_harvester::error::BirdcallError;
use birdcall_harvester::http::{HttpClient, HttpResponse};
use birdcall_harvester::progress::ProgressSink;

enum Reply {
    Status(u16, Vec<u8>),
    Unreachable,
}

/// In-memory transport. The first route whose pattern is a substring of the
/// URL answers; anything unrouted gets a 404.
#[derive(Default)]
pub struct RouteHttp {
    routes: Vec<(String, Reply)>,
    calls: Mutex<Vec<String>>,
}

impl RouteHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, pattern: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.routes
            .push((pattern.to_string(), Reply::Status(status, body.into())));
        self
    }

    pub fn unreachable(mut self, pattern: &str) -> Self {
        self.routes.push((pattern.to_string(), Reply::Unreachable));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_matching(&self, pattern: &str) -> usize {
        self.calls().iter().filter(|url| url.contains(pattern)).count()
    }
}

impl HttpClient for RouteHttp {
    fn get(&self, url: &str, _timeout: Option<Duration>) -> Result<HttpResponse, BirdcallError> {
        self.calls.lock().unwrap().push(url.to_string());
        let reply = self
            .routes
            .iter()
            .find(|(pattern, _)| url.contains(pattern.as_str()))
            .map(|(_, reply)| reply);
        match reply {
            Some(Reply::Status(status, body)) => Ok(HttpResponse {
                status: *status,
                body: body.clone(),
            }),
            Some(Reply::Unreachable) => Err(BirdcallError::upstream("mock", "connection refused")),
            None => Ok(HttpResponse {
                status: 404,
                body: Vec::new(),
            }),
        }
    }
}

/// Records every progress notification.
#[derive(Default)]
pub struct TraceSink(Mutex<Vec<f64>>);

impl TraceSink {
    pub fn trace(&self) -> Vec<f64> {
        self.0.lock().unwrap().clone()
    }

    pub fn assert_well_formed(&self) {
        let trace = self.trace();
        assert!(!trace.is_empty());
        assert!(
            trace.windows(2).all(|pair| pair[0] < pair[1]),
            "trace not increasing: {trace:?}"
        );
        assert_eq!(trace.iter().filter(|value| **value >= 1.0).count(), 1);
        assert_eq!(trace.last().copied(), Some(1.0));
    }
}

impl ProgressSink for TraceSink {
    fn notify(&self, fraction: f64) {
        self.0.lock().unwrap().push(fraction);
    }
}

pub fn criteria(root: Utf8PathBuf) -> SearchCriteria {
    SearchCriteria {
        download_root: root,
        overwrite: false,
        xeno: XenoCantoCriteria {
            location: None,
            country: Some("Brazil".to_string()),
            group: "birds".to_string(),
            better_than: Some(QualityRank::C),
            min_length_seconds: None,
            max_length_seconds: Some(300),
            max_per_species: 3,
        },
        macaulay: MacaulayCriteria {
            api_key: Some("k3y".to_string()),
            region_code: Some("US-NY".parse().unwrap()),
            backup_region_codes: vec!["US-NJ".parse().unwrap()],
            max_per_species: 3,
        },
    }
}

pub fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().join("calls")).unwrap();
    (temp, root)
}

pub fn files_in(dir: &Utf8PathBuf) -> Vec<String> {
    let mut names: Vec<String> = match std::fs::read_dir(dir.as_std_path()) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}
