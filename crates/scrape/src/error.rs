// ABOUTME: Error types for the scraping engine: ExtractError for extractor calls and ScrapeError for the pipeline.
// ABOUTME: Provides categorized errors with convenience constructors and boolean helpers.

use std::fmt;

/// The root category of an extraction failure, independent of selector context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SelectorNotFound,
    AmbiguousMatch,
    AttributeMissing,
    EmptyValue,
    UnparseableDate,
    InvalidSpec,
    TypeMismatch,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::SelectorNotFound => "selector not found",
            ErrorKind::AmbiguousMatch => "ambiguous match",
            ErrorKind::AttributeMissing => "attribute missing",
            ErrorKind::EmptyValue => "empty value",
            ErrorKind::UnparseableDate => "unparseable date",
            ErrorKind::InvalidSpec => "invalid spec",
            ErrorKind::TypeMismatch => "type mismatch",
        };
        write!(f, "{}", s)
    }
}

/// Error raised by a single extractor call or by the DSL compiler.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtractError {
    #[error("'{selector}' not found")]
    SelectorNotFound { selector: String },

    #[error("'{selector}' matched {count} elements, expected one")]
    AmbiguousMatch { selector: String, count: usize },

    #[error("'{selector}' has no attribute '{attr}'")]
    AttributeMissing { selector: String, attr: String },

    #[error("'{selector}' has an empty value")]
    EmptyValue { selector: String },

    #[error("unparseable date: {input:?}")]
    UnparseableDate { input: String },

    #[error("invalid extractor spec: {reason}")]
    InvalidSpec { reason: String },

    #[error("field '{field}': expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("within '{selector}' > {source}")]
    Within {
        selector: String,
        #[source]
        source: Box<ExtractError>,
    },
}

impl ExtractError {
    pub fn not_found(selector: impl Into<String>) -> Self {
        ExtractError::SelectorNotFound {
            selector: selector.into(),
        }
    }

    pub fn ambiguous(selector: impl Into<String>, count: usize) -> Self {
        ExtractError::AmbiguousMatch {
            selector: selector.into(),
            count,
        }
    }

    pub fn invalid_spec(reason: impl Into<String>) -> Self {
        ExtractError::InvalidSpec {
            reason: reason.into(),
        }
    }

    /// Wrap this error with the selector of the enclosing composite extractor.
    pub fn within(self, selector: impl Into<String>) -> Self {
        ExtractError::Within {
            selector: selector.into(),
            source: Box::new(self),
        }
    }

    /// Root category, looking through any `Within` context layers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::SelectorNotFound { .. } => ErrorKind::SelectorNotFound,
            ExtractError::AmbiguousMatch { .. } => ErrorKind::AmbiguousMatch,
            ExtractError::AttributeMissing { .. } => ErrorKind::AttributeMissing,
            ExtractError::EmptyValue { .. } => ErrorKind::EmptyValue,
            ExtractError::UnparseableDate { .. } => ErrorKind::UnparseableDate,
            ExtractError::InvalidSpec { .. } => ErrorKind::InvalidSpec,
            ExtractError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            ExtractError::Within { source, .. } => source.kind(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::SelectorNotFound
    }

    pub fn is_ambiguous(&self) -> bool {
        self.kind() == ErrorKind::AmbiguousMatch
    }

    pub fn is_unparseable_date(&self) -> bool {
        self.kind() == ErrorKind::UnparseableDate
    }

    pub fn is_invalid_spec(&self) -> bool {
        self.kind() == ErrorKind::InvalidSpec
    }

    /// True for errors describing the document's content rather than the
    /// extractor configuration.
    pub fn is_data_error(&self) -> bool {
        !matches!(
            self.kind(),
            ErrorKind::InvalidSpec | ErrorKind::TypeMismatch
        )
    }
}

/// Error codes representing different categories of pipeline failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidInput,
    Fetch,
    Extract,
    Registry,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::InvalidInput => "invalid input",
            ErrorCode::Fetch => "fetch error",
            ErrorCode::Extract => "extraction error",
            ErrorCode::Registry => "registry error",
        };
        write!(f, "{}", s)
    }
}

/// The main error type for scraping, fetching and registry operations.
#[derive(Debug, thiserror::Error)]
pub struct ScrapeError {
    pub code: ErrorCode,
    pub url: String,
    pub op: String,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "brinfo: {} {}: {}", self.op, self.url, self.code)?;
        if let Some(ref src) = self.source {
            write!(f, ": {}", src)?;
        }
        Ok(())
    }
}

impl ScrapeError {
    /// Create an InvalidInput error.
    pub fn invalid_input(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self {
            code: ErrorCode::InvalidInput,
            url: url.into(),
            op: op.into(),
            source,
        }
    }

    /// Create a Fetch error.
    pub fn fetch(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self {
            code: ErrorCode::Fetch,
            url: url.into(),
            op: op.into(),
            source,
        }
    }

    /// Create an Extract error from an extractor failure.
    pub fn extract(url: impl Into<String>, op: impl Into<String>, err: ExtractError) -> Self {
        Self {
            code: ErrorCode::Extract,
            url: url.into(),
            op: op.into(),
            source: Some(anyhow::Error::new(err)),
        }
    }

    /// Create a Registry error.
    pub fn registry(op: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self {
            code: ErrorCode::Registry,
            url: String::new(),
            op: op.into(),
            source,
        }
    }

    pub fn is_invalid_input(&self) -> bool {
        self.code == ErrorCode::InvalidInput
    }

    pub fn is_fetch(&self) -> bool {
        self.code == ErrorCode::Fetch
    }

    pub fn is_extract(&self) -> bool {
        self.code == ErrorCode::Extract
    }

    pub fn is_registry(&self) -> bool {
        self.code == ErrorCode::Registry
    }

    /// The underlying extractor error, when this is an Extract error.
    pub fn extract_error(&self) -> Option<&ExtractError> {
        self.source
            .as_ref()
            .and_then(|e| e.downcast_ref::<ExtractError>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_keeps_root_kind() {
        let err = ExtractError::not_found("time.pub")
            .within("article")
            .within("html");
        assert_eq!(err.kind(), ErrorKind::SelectorNotFound);
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "within 'html' > within 'article' > 'time.pub' not found"
        );
    }

    #[test]
    fn test_data_error_classification() {
        assert!(ExtractError::ambiguous("p", 2).is_data_error());
        assert!(ExtractError::UnparseableDate {
            input: "ontem".into()
        }
        .is_data_error());
        assert!(!ExtractError::invalid_spec("bad modifier").is_data_error());
    }

    #[test]
    fn test_scrape_error_display_and_downcast() {
        let err = ScrapeError::extract(
            "https://www.gov.br/x",
            "Run",
            ExtractError::not_found("h1"),
        );
        assert!(err.is_extract());
        assert!(!err.is_fetch());
        assert_eq!(
            err.to_string(),
            "brinfo: Run https://www.gov.br/x: extraction error: 'h1' not found"
        );
        assert!(err.extract_error().map(|e| e.is_not_found()).unwrap_or(false));
    }

    #[test]
    fn test_registry_error_has_no_url() {
        let err = ScrapeError::registry("Register", Some(anyhow::anyhow!("duplicate host")));
        assert!(err.is_registry());
        assert_eq!(err.url, "");
    }
}
