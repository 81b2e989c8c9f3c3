pub mod aggregation;
pub mod branch_comparison;
pub mod deviation;
pub mod error;
pub mod export;
pub mod pattern;
pub mod service;
