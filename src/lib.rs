pub mod aggregation;
pub mod bridge;
pub mod config;
pub mod congestion;
pub mod engine;
pub mod errors;
pub mod global_variables;
pub mod monitoring;
pub mod preemption;
pub mod scheduler;
pub mod shared_data;
pub mod signal;
pub mod topology;
