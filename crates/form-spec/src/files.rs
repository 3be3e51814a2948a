use thiserror::Error;

use crate::answers::FileAttachment;
use crate::spec::question::QuestionSpec;

/// A single entry of a question's `accept` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptPattern {
    /// `.pdf`, matched against the file name extension.
    Extension(String),
    /// `application/pdf`, matched exactly against the MIME type.
    Mime(String),
    /// `image/*`, holds the part before `/*`.
    MimePrefix(String),
    /// Anything else is kept for display but never matches.
    Other(String),
}

impl AcceptPattern {
    pub fn parse(raw: &str) -> Option<Self> {
        let pattern = raw.trim().to_lowercase();
        if pattern.is_empty() {
            return None;
        }
        let parsed = if pattern.starts_with('.') {
            AcceptPattern::Extension(pattern)
        } else if let Some(prefix) = pattern.strip_suffix("/*") {
            AcceptPattern::MimePrefix(prefix.to_string())
        } else if pattern.contains('/') && !pattern.contains('*') {
            AcceptPattern::Mime(pattern)
        } else {
            AcceptPattern::Other(pattern)
        };
        Some(parsed)
    }

    pub fn matches(&self, file: &FileAttachment) -> bool {
        match self {
            AcceptPattern::Extension(ext) => file
                .extension()
                .is_some_and(|file_ext| ext.strip_prefix('.') == Some(file_ext.as_str())),
            AcceptPattern::Mime(mime) => file.mime_type.to_lowercase() == *mime,
            AcceptPattern::MimePrefix(prefix) => file.mime_type.to_lowercase().starts_with(prefix),
            AcceptPattern::Other(_) => false,
        }
    }

    /// Human-readable label shown in violation messages.
    pub fn display_name(&self) -> String {
        match self {
            AcceptPattern::Extension(ext) => ext.clone(),
            AcceptPattern::MimePrefix(prefix) if prefix == "image" => "imágenes".into(),
            AcceptPattern::MimePrefix(prefix) if prefix == "video" => "videos".into(),
            AcceptPattern::MimePrefix(prefix) => format!("{prefix}/*"),
            AcceptPattern::Mime(mime) if mime == "application/pdf" => "PDF".into(),
            AcceptPattern::Mime(mime) => mime.clone(),
            AcceptPattern::Other(raw) => raw.clone(),
        }
    }
}

/// Splits a comma separated accept list into patterns.
pub fn parse_accept(accept: &str) -> Vec<AcceptPattern> {
    accept.split(',').filter_map(AcceptPattern::parse).collect()
}

/// Comma separated display names for the question's accepted types.
pub fn allowed_type_names(question: &QuestionSpec) -> String {
    parse_accept(question.accept_or_default())
        .iter()
        .map(AcceptPattern::display_name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Reasons a file batch is refused.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FileViolation {
    #[error("Solo se permite un archivo")]
    TooManyForSingle,
    #[error("El archivo \"{file}\" no es un tipo permitido. Tipos permitidos: {allowed}")]
    TypeNotAllowed { file: String, allowed: String },
    #[error("El archivo \"{file}\" pesa {size_mb:.2} MB y supera el máximo de {max_mb} MB")]
    TooLarge {
        file: String,
        size_mb: f64,
        max_mb: f64,
    },
    #[error("Solo puedes adjuntar hasta {max} archivos ({selected} ya seleccionados)")]
    LimitExceeded { max: usize, selected: usize },
}

/// Checks a batch of files against the question's type, size and multiplicity
/// rules. An empty result means the batch is acceptable.
pub fn validate_files(files: &[FileAttachment], question: &QuestionSpec) -> Vec<FileViolation> {
    if files.is_empty() {
        return Vec::new();
    }

    if !question.multiple && files.len() > 1 {
        return vec![FileViolation::TooManyForSingle];
    }

    let patterns = parse_accept(question.accept_or_default());
    let max_mb = question.max_size_mb();
    let max_bytes = max_mb * 1024.0 * 1024.0;

    let mut violations = Vec::new();
    for file in files {
        if !patterns.iter().any(|pattern| pattern.matches(file)) {
            violations.push(FileViolation::TypeNotAllowed {
                file: file.name.clone(),
                allowed: allowed_type_names(question),
            });
        }

        if file.size as f64 > max_bytes {
            violations.push(FileViolation::TooLarge {
                file: file.name.clone(),
                size_mb: file.size as f64 / (1024.0 * 1024.0),
                max_mb,
            });
        }
    }
    violations
}

/// Enforces the running `maxFiles` total across successive picks.
pub fn check_selection_limit(
    selected: usize,
    incoming: usize,
    question: &QuestionSpec,
) -> Result<(), FileViolation> {
    let max = question.max_files_allowed();
    if selected + incoming > max {
        return Err(FileViolation::LimitExceeded { max, selected });
    }
    Ok(())
}
