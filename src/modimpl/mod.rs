pub mod config;
pub mod documentfilter;
pub mod error;
pub mod filecandidate;
pub mod healthserver;
pub mod healthstatus;
pub mod logging;
pub mod readiness;
pub mod runreport;
pub mod scheduler;
pub mod sink;
pub mod source;
pub mod transferpipeline;

#[cfg(test)]
pub mod testing;
