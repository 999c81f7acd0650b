//! Authorization error types

use std::io;
use thiserror::Error;

/// Result type for auth operations
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur while loading tokens
#[derive(Debug, Error)]
pub enum AuthError {
    /// Failed to read tokens file
    #[error("failed to read tokens file '{path}': {source}")]
    IoError {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Invalid line format in tokens file
    #[error("invalid format at line {line}: {message}")]
    ParseError {
        /// Line number (1-based)
        line: usize,
        /// Error message
        message: String,
    },

    /// Empty token ID
    #[error("empty token ID at line {line}")]
    EmptyToken {
        /// Line number (1-based)
        line: usize,
    },

    /// Token ID declared twice
    #[error("duplicate token ID at line {line}")]
    DuplicateToken {
        /// Line number (1-based)
        line: usize,
    },

    /// Secret already assigned to another token
    #[error("duplicate token secret at line {line}")]
    DuplicateSecret {
        /// Line number (1-based)
        line: usize,
    },
}

impl AuthError {
    /// Create an IoError
    pub fn io_error(path: impl Into<String>, source: io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }

    /// Create a ParseError
    pub fn parse_error(line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            line,
            message: message.into(),
        }
    }

    /// Create an EmptyToken error
    pub fn empty_token(line: usize) -> Self {
        Self::EmptyToken { line }
    }

    /// Create a DuplicateToken error
    pub fn duplicate_token(line: usize) -> Self {
        Self::DuplicateToken { line }
    }

    /// Create a DuplicateSecret error
    pub fn duplicate_secret(line: usize) -> Self {
        Self::DuplicateSecret { line }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error() {
        let err = AuthError::io_error(
            "/path/to/tokens.conf",
            io::Error::new(io::ErrorKind::NotFound, "file not found"),
        );
        assert!(err.to_string().contains("/path/to/tokens.conf"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_parse_error() {
        let err = AuthError::parse_error(5, "whitespace inside token");
        assert!(err.to_string().contains("line 5"));
        assert!(err.to_string().contains("whitespace"));
    }

    #[test]
    fn test_line_errors() {
        assert!(AuthError::empty_token(2).to_string().contains("line 2"));
        assert!(AuthError::duplicate_token(7).to_string().contains("duplicate token ID"));
        assert!(AuthError::duplicate_secret(9).to_string().contains("secret"));
    }
}
