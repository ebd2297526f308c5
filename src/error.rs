//! Error types for the analytics and report pipeline.

use thiserror::Error;

/// Main error type for weblog-report.
#[derive(Error, Debug)]
pub enum Error {
    /// The event log is missing a required column or holds a value that
    /// cannot be parsed. Loading aborts; no partial table is returned.
    #[error("data format error: {0}")]
    DataFormat(String),

    /// A derived metric was requested over zero qualifying rows.
    #[error("empty aggregate: {0}")]
    EmptyAggregate(String),

    /// Chart rendering or document assembly failed. No output was produced.
    #[error("render error in {stage}: {message}")]
    Render { stage: &'static str, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a render error for the given pipeline stage.
    pub fn render(stage: &'static str, message: impl Into<String>) -> Self {
        Error::Render {
            stage,
            message: message.into(),
        }
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        let message = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(io) => Error::Io(io),
            _ => Error::DataFormat(message),
        }
    }
}

/// Result type alias for weblog-report.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error_message() {
        let err = Error::render("chart", "backend failed");
        assert_eq!(err.to_string(), "render error in chart: backend failed");
    }

    #[test]
    fn test_csv_error_maps_to_data_format() {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader("a,b\nc\n".as_bytes());
        let err = reader
            .records()
            .find_map(|r| r.err())
            .expect("uneven rows should fail");

        assert!(matches!(Error::from(err), Error::DataFormat(_)));
    }
}
