mod objects;
mod types;

pub use objects::S3Fetcher;
pub use types::AwsConfig;
