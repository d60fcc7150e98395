pub mod config;
pub mod credentials;
pub mod github;
pub mod matcher;
pub mod report;
pub mod scan;
pub mod targets;
