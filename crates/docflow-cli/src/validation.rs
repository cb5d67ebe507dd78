//! Local admission rules for submitted files
//!
//! Nothing here touches the network. A file that fails these checks is never
//! registered and therefore never uploaded.

use crate::error::ValidationError;
use crate::record::FileSource;

pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;
pub const DEFAULT_MAX_FILES: usize = 20;

pub const DEFAULT_ACCEPTED_TYPES: &[&str] = &[
    "application/pdf",
    "image/png",
    "image/jpeg",
    "image/tiff",
    "text/plain",
    "text/csv",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOptions {
    /// MIME types; `type/*` accepts any subtype
    pub accepted_types: Vec<String>,
    pub max_file_size: u64,
    pub max_files: usize,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            accepted_types: DEFAULT_ACCEPTED_TYPES.iter().map(|t| t.to_string()).collect(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_files: DEFAULT_MAX_FILES,
        }
    }
}

impl ValidationOptions {
    pub fn accepts_type(&self, content_type: &str) -> bool {
        let Ok(candidate) = content_type.parse::<mime::Mime>() else {
            return false;
        };

        self.accepted_types.iter().any(|accepted| {
            match accepted.trim().parse::<mime::Mime>() {
                Ok(pattern) if pattern.subtype() == mime::STAR => {
                    pattern.type_() == candidate.type_()
                },
                Ok(pattern) => pattern.essence_str() == candidate.essence_str(),
                Err(_) => false,
            }
        })
    }
}

/// Per-file checks: type membership, non-empty, size ceiling
pub fn validate(file: &FileSource, options: &ValidationOptions) -> Result<(), ValidationError> {
    if !options.accepts_type(file.content_type()) {
        return Err(ValidationError::UnsupportedType {
            file: file.name().to_string(),
            content_type: file.content_type().to_string(),
            accepted: options.accepted_types.join(", "),
        });
    }

    if file.size() == 0 {
        return Err(ValidationError::Empty {
            file: file.name().to_string(),
        });
    }

    if file.size() > options.max_file_size {
        return Err(ValidationError::TooLarge {
            file: file.name().to_string(),
            size: file.size(),
            max: options.max_file_size,
        });
    }

    Ok(())
}

/// Batch-level count check
///
/// `registered` is the number of records already in the batch. When the
/// submission would push the total past `max_files`, the whole submission is
/// refused and the error names the first file that does not fit.
pub fn check_batch_limit(
    registered: usize,
    files: &[FileSource],
    options: &ValidationOptions,
) -> Result<(), ValidationError> {
    if registered + files.len() <= options.max_files {
        return Ok(());
    }

    let offending = options.max_files.saturating_sub(registered);
    let first_offending = files
        .get(offending)
        .or_else(|| files.first())
        .map(|f| f.name().to_string())
        .unwrap_or_default();

    Err(ValidationError::TooManyFiles {
        registered,
        submitted: files.len(),
        max: options.max_files,
        first_offending,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn file(name: &str, content_type: &str, size: usize) -> FileSource {
        FileSource::from_bytes(name, content_type, vec![0u8; size])
    }

    #[test]
    fn test_default_options_accept_pdf() {
        let options = ValidationOptions::default();
        assert!(validate(&file("a.pdf", "application/pdf", 10), &options).is_ok());
        assert!(validate(&file("a.csv", "text/csv", 10), &options).is_ok());
    }

    #[test]
    fn test_unsupported_type_is_rejected() {
        let options = ValidationOptions::default();
        let err = validate(&file("setup.exe", "application/octet-stream", 10), &options)
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedType { .. }));
        assert!(err.to_string().contains("setup.exe"));
    }

    #[test]
    fn test_wildcard_and_parameters() {
        let options = ValidationOptions {
            accepted_types: vec!["image/*".to_string(), "text/plain".to_string()],
            ..Default::default()
        };
        assert!(options.accepts_type("image/webp"));
        assert!(options.accepts_type("text/plain; charset=utf-8"));
        assert!(!options.accepts_type("application/pdf"));
        assert!(!options.accepts_type("not a mime"));
    }

    #[test]
    fn test_size_limits() {
        let options = ValidationOptions {
            max_file_size: 100,
            ..Default::default()
        };
        assert!(validate(&file("a.pdf", "application/pdf", 100), &options).is_ok());
        assert!(matches!(
            validate(&file("a.pdf", "application/pdf", 101), &options),
            Err(ValidationError::TooLarge { size: 101, max: 100, .. })
        ));
        assert!(matches!(
            validate(&file("a.pdf", "application/pdf", 0), &options),
            Err(ValidationError::Empty { .. })
        ));
    }

    #[test]
    fn test_batch_limit_names_first_offending_file() {
        let options = ValidationOptions {
            max_files: 3,
            ..Default::default()
        };
        let files: Vec<_> = ["a.pdf", "b.pdf", "c.pdf"]
            .iter()
            .map(|n| file(n, "application/pdf", 1))
            .collect();

        assert!(check_batch_limit(0, &files, &options).is_ok());

        match check_batch_limit(2, &files, &options).unwrap_err() {
            ValidationError::TooManyFiles {
                registered,
                submitted,
                max,
                first_offending,
            } => {
                assert_eq!((registered, submitted, max), (2, 3, 3));
                assert_eq!(first_offending, "b.pdf");
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_batch_limit_when_already_full() {
        let options = ValidationOptions {
            max_files: 1,
            ..Default::default()
        };
        let files = vec![file("z.pdf", "application/pdf", 1)];
        let err = check_batch_limit(5, &files, &options).unwrap_err();
        assert!(err.to_string().contains("'z.pdf'"));
    }
}
