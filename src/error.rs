//! Rich diagnostic error types for docfacet.
//!
//! Only the fallible edges of the crate carry typed errors: the remote query
//! capability ([`SourceError`]) and the configuration file ([`ConfigError`]).
//! Everything downstream of the library fetcher is total by construction, so
//! these errors are recovered and logged long before they could reach the
//! filter pipeline.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for docfacet.
///
/// Each variant wraps a subsystem-specific error, preserving the diagnostic
/// chain (error codes, help text) through to the host.
#[derive(Debug, Error, Diagnostic)]
pub enum DocfacetError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

/// Convenience alias for top-level results.
pub type DocfacetResult<T> = std::result::Result<T, DocfacetError>;

// ---------------------------------------------------------------------------
// Source errors
// ---------------------------------------------------------------------------

/// Errors raised by a [`LibrarySource`](crate::source::LibrarySource).
#[derive(Debug, Error, Diagnostic)]
pub enum SourceError {
    #[error("request to \"{url}\" failed: {message}")]
    #[diagnostic(
        code(docfacet::source::request),
        help(
            "The remote library could not be reached. Check that the site url is \
             correct and that the HTTP client carries valid credentials."
        )
    )]
    Request { url: String, message: String },

    #[error("\"{url}\" answered with HTTP {status}")]
    #[diagnostic(
        code(docfacet::source::status),
        help(
            "A 400 on the enhanced query usually means one of the extra metadata \
             columns does not exist in this library; the standard query is retried \
             automatically."
        )
    )]
    Status { url: String, status: u16 },

    #[error("could not decode response from \"{url}\": {message}")]
    #[diagnostic(
        code(docfacet::source::decode),
        help("The remote service returned a payload that is not the expected JSON shape.")
    )]
    Decode { url: String, message: String },

    #[error("library \"{library_id}\" is unavailable in \"{group}\"")]
    #[diagnostic(
        code(docfacet::source::unavailable),
        help("The library id is unknown to this source, or the source refused the query.")
    )]
    Unavailable { group: String, library_id: String },
}

/// Convenience alias for source results.
pub type SourceResult<T> = std::result::Result<T, SourceError>;

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors from reading or writing a [`BrowserConfig`](crate::config::BrowserConfig).
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read browser config: {path}")]
    #[diagnostic(
        code(docfacet::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse browser config: {path}: {message}")]
    #[diagnostic(
        code(docfacet::config::parse),
        help("Check the TOML syntax. Presets need both `label` and `query`.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write browser config: {path}")]
    #[diagnostic(
        code(docfacet::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for config results.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
