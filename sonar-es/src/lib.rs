//! sonar-es - Instrumented facade over an Elasticsearch cluster
//!
//! Application code talks to the cluster only through [`EsClient`]. Every
//! operation is built by a single-use request builder, turned into an
//! immutable [`OperationDescriptor`], and executed by one interceptor that
//! times it, logs it and normalizes its failure.
//!
//! # Architecture
//!
//! - **Client**: factory method per operation kind, start/stop lifecycle, convenience operations
//! - **Request**: builders with eager validation and a single terminal `execute`
//! - **Descriptor**: tagged description of one request (kind, target, payload)
//! - **Interceptor**: timing, slow-request warnings on the `es` log target, metrics, error normalization
//! - **Transport**: pluggable driver; `HttpTransport` speaks the REST API over reqwest
//! - **Testing**: `FakeTransport` and `LogCapture` for callers' tests
//!
//! # Example
//!
//! ```no_run
//! use sonar_es::{EsClient, EsClientConfig, RequestBuilder};
//!
//! # async fn run() -> sonar_es::Result<()> {
//! let client = EsClient::connect(&EsClientConfig::default())?;
//! client.prepare_refresh(&["issues"])?.execute().await?;
//! let latest = client.get_max_field_value("issues", "issue", "updatedAt").await?;
//! println!("latest update: {}", latest);
//! client.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod descriptor;
pub mod error;
pub mod interceptor;
pub mod metrics;
pub mod query;
pub mod request;
pub mod response;
pub mod testing;
pub mod transport;

mod client;
mod lifecycle;

pub use client::EsClient;
pub use config::EsClientConfig;
pub use descriptor::{OperationDescriptor, OperationKind, Payload, Priority, Target};
pub use error::{ErrorKind, EsError, Result};
pub use interceptor::LOG_TARGET;
pub use query::{Aggregation, BoolQuery, Query, RangeQuery, Sort, SortOrder};
pub use request::{BuilderState, RequestBuilder, DEFAULT_MAX_RESULT_WINDOW};
pub use response::ClusterHealthStatus;
pub use transport::{HttpTransport, Transport, TransportError};
