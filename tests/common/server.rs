//! Mock RIDB server wiring and run configuration

use super::fixtures::campsite_page;
use ridb_dl::Config;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path of the campsite collection on the mock server
pub const CAMPSITES_PATH: &str = "/api/v1/campsites";

/// Path of one facility on the mock server
pub fn facility_path(id: &str) -> String {
    format!("/api/v1/facilities/{id}")
}

/// Configuration pointing at `server`, writing into `output_dir`, with fast retries
pub fn config_for(server: &MockServer, output_dir: &Path, page_size: u64) -> Config {
    let mut config = Config::default();
    config.api.base_url = format!("{}/api/v1", server.uri());
    config.api.api_key = Some("test-key".to_string());
    config.pagination.page_size = page_size;
    config.retry.initial_delay = Duration::from_millis(10);
    config.retry.max_delay = Duration::from_millis(50);
    config.retry.max_attempts = 3;
    config.output.dir = output_dir.to_path_buf();
    config
}

/// Mount the probe and every page of `campsites`, each expected exactly once
pub async fn mount_campsites(server: &MockServer, campsites: &[Value], page_size: usize) {
    mount_probe(server, campsites.len()).await;
    mount_pages(server, campsites, page_size, campsites.len()).await;
}

/// Mount the `limit=1` probe reporting `total`, expected exactly once
pub async fn mount_probe(server: &MockServer, total: usize) {
    Mock::given(method("GET"))
        .and(path(CAMPSITES_PATH))
        .and(query_param("limit", "1"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(campsite_page(&[], total, 1, 0)))
        .expect(1)
        .named("probe")
        .mount(server)
        .await;
}

/// Mount one mock per page of `campsites`, each expected exactly once
pub async fn mount_pages(server: &MockServer, campsites: &[Value], page_size: usize, total: usize) {
    for offset in (0..campsites.len()).step_by(page_size) {
        let end = (offset + page_size).min(campsites.len());
        Mock::given(method("GET"))
            .and(path(CAMPSITES_PATH))
            .and(query_param("limit", page_size.to_string()))
            .and(query_param("offset", offset.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(campsite_page(
                &campsites[offset..end],
                total,
                page_size,
                offset,
            )))
            .expect(1)
            .named(format!("page at offset {offset}"))
            .mount(server)
            .await;
    }
}

/// Mount a facility body, expected to be fetched exactly once with `full=true`
pub async fn mount_facility(server: &MockServer, id: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(facility_path(id)))
        .and(query_param("full", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .named(format!("facility {id}"))
        .mount(server)
        .await;
}

/// Every file in `dir`
pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(_) => Vec::new(),
    }
}

/// Parse a CSV file into its header and rows keyed by column
pub fn read_csv(path: &Path) -> (Vec<String>, Vec<HashMap<String, String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|row| {
            let row = row.unwrap();
            headers
                .iter()
                .cloned()
                .zip(row.iter().map(String::from))
                .collect()
        })
        .collect();
    (headers, rows)
}
