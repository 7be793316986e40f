// src/cert/mod.rs
pub mod ca;
pub mod error;
pub mod openssl;
pub mod operations;
pub mod policy;
pub mod types;
pub mod verification;

pub use operations::CertificateOperations;
