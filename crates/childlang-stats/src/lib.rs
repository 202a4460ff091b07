//! childlang-stats: analysis pipeline for the child bilingual language study.
//!
//! This crate loads the fixed-schema participant table, computes descriptive
//! statistics, runs t-tests and correlations, fits nested OLS models over
//! standardized predictors, and extracts residual series for squared partial
//! correlations and their scatterplots.
//!
//! Every stage is a pure function of the loaded `Dataset` plus the study
//! constants in `config`; `pipeline::run_analysis` executes them in order.
pub mod config;
pub mod data_handling;
pub mod descriptive;
pub mod error;
pub mod hypothesis;
pub mod io;
pub mod partial;
pub mod pipeline;
pub mod preprocessing;
pub mod regression;
pub mod report;
