pub mod engine;
pub mod error;
pub mod history;
pub mod policy;
