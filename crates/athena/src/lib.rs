pub mod aws;
pub mod backend;
pub mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod paginate;
pub mod poller;
pub mod reshape;
pub mod types;
pub mod usage;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use aws::AwsAthenaBackend;
pub use backend::QueryBackend;
pub use batch::{normalize_ids, trim_quotes, BATCH_CEILING};
pub use client::AthenaClient;
pub use config::{load_dotenv, AthenaConfig, CredentialsSource};
pub use error::AthenaError;
pub use poller::Poller;
pub use reshape::{is_header_row, reshape, reshape_page};
pub use types::{
    EncryptionConfig, EncryptionOption, ExecutionContext, ExecutionHandle, ExecutionState,
    ExecutionStatistics, ExecutionStatus, QueryInput, QueryOverrides, QueryRequest, Record,
    ResultConfig, ResultPage,
};
pub use usage::{
    bytes_to_size, bytes_to_tb, format_cost, millis_to_minutes, tb_to_dollars, UsageSummary,
    DOLLARS_PER_TB,
};
