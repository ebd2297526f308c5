//! Report generation modules.

pub mod generator;
pub mod layout;
mod pdf;

pub use generator::{generate_json_report, ReportAssembler, ReportDocument, ReportSettings};
pub use layout::PageSetup;
