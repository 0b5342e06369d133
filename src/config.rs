//! Configuration types for foreclosure-export
//!
//! Every value has a default matching the published Louisville Metro foreclosures layer,
//! so `Config::default()` is a complete, runnable configuration. All structs are
//! deserializable with per-field defaults, which lets tests and embedders override only
//! what they need (for example a tiny `max_pages` against a mock server).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Remote feature service settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Full URL of the layer's `query` endpoint
    #[serde(default = "default_query_url")]
    pub query_url: String,

    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: Duration,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            query_url: default_query_url(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Page sizing and worker pool settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Records requested per page (default: 1000)
    #[serde(default = "default_page_size")]
    pub page_size: u64,

    /// Concurrent fetch workers (default: 5)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Hard upper bound on pages dispatched (default: 300)
    ///
    /// Guards against runaway pagination on a service of unknown size.
    /// `page_size * max_pages` is the largest number of rows a run can return.
    #[serde(default = "default_max_pages")]
    pub max_pages: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            workers: default_workers(),
            max_pages: default_max_pages(),
        }
    }
}

impl PaginationConfig {
    /// Offsets for every page up to the safety limit, in dispatch order
    pub fn offsets(&self) -> impl Iterator<Item = u64> + use<> {
        let page_size = self.page_size;
        (0..self.max_pages).map(move |page| page * page_size)
    }

    /// Offset of the final page the safety limit allows
    pub fn last_offset(&self) -> Option<u64> {
        self.max_pages.checked_sub(1).map(|page| page * self.page_size)
    }
}

/// Output location settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory the CSV is written into, created if missing (default: "data")
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// File name of the CSV inside `dir`
    #[serde(default = "default_output_file")]
    pub file_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            file_name: default_output_file(),
        }
    }
}

impl OutputConfig {
    /// Full path of the output file
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

/// Ordered output columns and the subset rendered as timestamps
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Column names in output order
    #[serde(default = "default_columns")]
    pub columns: Vec<String>,

    /// Columns holding epoch-millisecond timestamps
    #[serde(default = "default_timestamp_columns")]
    pub timestamp_columns: Vec<String>,
}

impl Default for ColumnSchema {
    fn default() -> Self {
        Self {
            columns: default_columns(),
            timestamp_columns: default_timestamp_columns(),
        }
    }
}

impl ColumnSchema {
    /// Build a schema from column names and timestamp column names
    pub fn new<C, T>(columns: C, timestamp_columns: T) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            timestamp_columns: timestamp_columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of columns, which is also the number of cells in every row
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the schema has no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Whether `field` is rendered as a timestamp
    pub fn is_timestamp(&self, field: &str) -> bool {
        self.timestamp_columns.iter().any(|c| c == field)
    }
}

/// Main configuration for an export run
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote service settings
    #[serde(default)]
    pub service: ServiceConfig,

    /// Pagination and concurrency settings
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Output location
    #[serde(default)]
    pub output: OutputConfig,

    /// Output columns
    #[serde(default)]
    pub schema: ColumnSchema,
}

impl Config {
    /// Check the configuration for values that would make a run meaningless
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.service.query_url).map_err(|e| {
            Error::config(
                "service.query_url",
                format!("invalid URL '{}': {}", self.service.query_url, e),
            )
        })?;

        if self.service.request_timeout.is_zero() {
            return Err(Error::config(
                "service.request_timeout",
                "request timeout must be greater than zero",
            ));
        }
        if self.pagination.page_size == 0 {
            return Err(Error::config(
                "pagination.page_size",
                "page size must be at least 1",
            ));
        }
        if self.pagination.workers == 0 {
            return Err(Error::config(
                "pagination.workers",
                "worker count must be at least 1",
            ));
        }
        if self.pagination.max_pages == 0 {
            return Err(Error::config(
                "pagination.max_pages",
                "page limit must be at least 1",
            ));
        }
        if self
            .pagination
            .last_offset()
            .and_then(|last| last.checked_add(self.pagination.page_size))
            .is_none()
        {
            return Err(Error::config(
                "pagination.max_pages",
                "page_size * max_pages overflows the offset range",
            ));
        }
        if self.output.file_name.is_empty() {
            return Err(Error::config(
                "output.file_name",
                "output file name must not be empty",
            ));
        }
        if self.schema.is_empty() {
            return Err(Error::config(
                "schema.columns",
                "at least one output column is required",
            ));
        }
        if let Some(unknown) = self
            .schema
            .timestamp_columns
            .iter()
            .find(|c| !self.schema.columns.contains(c))
        {
            return Err(Error::config(
                "schema.timestamp_columns",
                format!("timestamp column '{}' is not an output column", unknown),
            ));
        }
        Ok(())
    }
}

fn default_query_url() -> String {
    "https://services1.arcgis.com/79kfd2K6fskCAkyg/arcgis/rest/services/Louisville_Metro_KY_Property_Foreclosures/FeatureServer/0/query".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    concat!("foreclosure-export/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_page_size() -> u64 {
    1000
}

fn default_workers() -> usize {
    5
}

fn default_max_pages() -> u64 {
    300
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_output_file() -> String {
    "Louisville_Metro_KY_-_Property_Foreclosures.csv".to_string()
}

fn default_columns() -> Vec<String> {
    [
        "House_Nr",
        "Dir",
        "Street_Name",
        "St_Type",
        "Post_Dir",
        "Zip",
        "L_S",
        "CD",
        "Neighborhood",
        "Full_Parcel_ID",
        "Census_Tract",
        "Action_Filed",
        "Case_",
        "Case_Style",
        "Sale_Date",
        "Sale_Price",
        "Purchaser",
        "ObjectId",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_timestamp_columns() -> Vec<String> {
    vec!["Action_Filed".to_string(), "Sale_Date".to_string()]
}
