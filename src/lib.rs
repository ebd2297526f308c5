//! Web traffic analysis over clickstream event logs.
//!
//! The pipeline loads a CSV event log into an [`models::EventTable`],
//! aggregates it into a [`models::Metrics`] snapshot, renders a chart and
//! recommendations from that snapshot, and assembles a PDF report.
//!
//! ```no_run
//! use std::path::Path;
//! use weblog_report::fonts::FontSet;
//! use weblog_report::pipeline::{PipelineOptions, ReportPipeline};
//!
//! let pipeline = ReportPipeline::new(PipelineOptions::default(), FontSet::builtin());
//! let output = pipeline.run(Path::new("events.csv"))?;
//! output.document.save(Path::new("analysis_report.pdf"))?;
//! # Ok::<(), weblog_report::Error>(())
//! ```

pub mod analysis;
pub mod chart;
pub mod cli;
pub mod config;
pub mod error;
pub mod fonts;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod report;

pub use error::{Error, Result};
