use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use form_spec::{AnswerAction, AnswerStore, FileAttachment, Form, QuestionType, answers_from_json};
use serde_json::Value;
use thiserror::Error;

/// `<question_id>=<path>` as given to `--file`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileArg {
    pub question_id: String,
    pub path: PathBuf,
}

impl FromStr for FileArg {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.split_once('=') {
            Some((id, path)) if !id.trim().is_empty() && !path.is_empty() => Ok(FileArg {
                question_id: id.trim().to_string(),
                path: PathBuf::from(path),
            }),
            _ => Err(format!("expected <question_id>=<path>, got '{raw}'")),
        }
    }
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("form has no question with id '{0}'")]
    UnknownQuestion(String),
    #[error("question '{id}' is a {kind} question and cannot take files")]
    NotAFileQuestion { id: String, kind: &'static str },
}

const MIME_BY_EXTENSION: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("mov", "video/quicktime"),
    ("txt", "text/plain"),
    ("csv", "text/csv"),
    ("json", "application/json"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("zip", "application/zip"),
];

/// MIME type from the file extension; empty when unknown.
pub fn guess_mime(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    MIME_BY_EXTENSION
        .iter()
        .find(|(known, _)| *known == extension)
        .map_or("", |(_, mime)| *mime)
}

pub fn read_json(path: &Path) -> Result<Value, Box<dyn std::error::Error>> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn load_form(path: &Path) -> Result<Form, Box<dyn std::error::Error>> {
    Ok(serde_json::from_value(read_json(path)?)?)
}

pub fn load_attachment(path: &Path) -> Result<FileAttachment, Box<dyn std::error::Error>> {
    let data = fs::read(path)?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(FileAttachment::new(name, guess_mime(path), data))
}

/// Builds a store from an optional answers file plus `--file` selections.
/// Files for the same question are selected together, in argument order.
/// Rejected selections end up in the store's file errors.
pub fn build_store(
    form: &Form,
    answers: Option<&Path>,
    files: &[FileArg],
) -> Result<AnswerStore, Box<dyn std::error::Error>> {
    let mut store = AnswerStore::new();
    if let Some(path) = answers {
        for (question_id, value) in answers_from_json(&read_json(path)?)? {
            store.apply(AnswerAction::SetAnswer { question_id, value });
        }
    }

    let mut grouped: Vec<(&str, Vec<FileAttachment>)> = Vec::new();
    for arg in files {
        let attachment = load_attachment(&arg.path)?;
        match grouped.iter_mut().find(|(id, _)| *id == arg.question_id) {
            Some((_, selected)) => selected.push(attachment),
            None => grouped.push((arg.question_id.as_str(), vec![attachment])),
        }
    }

    for (question_id, files) in grouped {
        let question = form
            .find_question(question_id)
            .ok_or_else(|| InputError::UnknownQuestion(question_id.to_string()))?;
        if question.kind != QuestionType::File {
            return Err(InputError::NotAFileQuestion {
                id: question_id.to_string(),
                kind: question.kind.as_str(),
            }
            .into());
        }
        store.apply(AnswerAction::SetFiles { question, files });
    }
    Ok(store)
}
