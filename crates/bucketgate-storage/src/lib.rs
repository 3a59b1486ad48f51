pub mod local;
pub mod provider;
pub mod readiness;
pub mod s3;
