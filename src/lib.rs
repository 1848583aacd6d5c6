//! Scorekeep - collect, score and compare quality reports
//!
//! Runs a set of audit plugins, folds their results into weighted groups and
//! categories, persists the report in several formats, and can replay the
//! collection across git history or diff two reports for a review comment.

pub mod cli;
pub mod collector;
pub mod comment;
pub mod compare;
pub mod config;
pub mod error;
pub mod git;
pub mod logging;
pub mod models;
pub mod persist;
pub mod reporters;
pub mod runner;
pub mod scoring;
pub mod upload;

pub use error::{CoreError, CoreResult};
