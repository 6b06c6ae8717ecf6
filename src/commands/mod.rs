//! CLI commands for attain

pub mod check;
pub mod dispatch;
pub mod likert;
pub mod profile;
pub mod run;
