pub mod archive;
pub mod batch;
pub mod bridge;
pub mod classify;
pub mod cli;
pub mod config;
pub mod fonts;
pub mod job;
pub mod machine;
pub mod report;
pub mod supervisor;
pub mod util;
