//! Attain Core Library
//!
//! Outcome attainment for accreditation reporting: student grades are scored
//! against course outcomes on a 1-5 Likert scale, then rolled up through
//! weighted mappings to program and institutional outcomes.

pub mod aggregate;
pub mod config;
pub mod criteria;
pub mod error;
pub mod format;
pub mod likert;
pub mod logging;
pub mod mapping;
pub mod outcome;
pub mod pipeline;
pub mod profile;
pub mod rollup;
pub mod score;
pub mod sink;
pub mod table;
pub mod text;
