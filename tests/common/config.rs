//! Test configuration helpers pointing an exporter at a mock service

use std::path::Path;
use std::time::Duration;

use foreclosure_export::{Config, PaginationConfig};
use wiremock::MockServer;

/// Path the mock feature service answers queries on
pub const QUERY_PATH: &str = "/arcgis/rest/services/Foreclosures/FeatureServer/0/query";

/// Build a configuration that queries `server` and writes under `output_root`
pub fn mock_service_config(
    server: &MockServer,
    output_root: &Path,
    pagination: PaginationConfig,
) -> Config {
    let mut config = Config::default();
    config.service.query_url = format!("{}{}", server.uri(), QUERY_PATH);
    config.service.request_timeout = Duration::from_secs(10);
    config.pagination = pagination;
    config.output.dir = output_root.join("data");
    config
}

/// Offsets the mock server was queried with, sorted
pub async fn requested_offsets(server: &MockServer) -> Vec<u64> {
    let mut offsets: Vec<u64> = server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|request| {
            request
                .url
                .query_pairs()
                .find(|(key, _)| key == "resultOffset")
                .and_then(|(_, value)| value.parse().ok())
        })
        .collect();
    offsets.sort_unstable();
    offsets
}
