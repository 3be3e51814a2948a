use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::files::{check_selection_limit, validate_files};
use crate::spec::question::{QuestionSpec, QuestionType};
use crate::validate::{FieldErrors, validate};
use crate::walk::active_questions;

/// Current answers keyed by question id.
pub type Answers = BTreeMap<String, AnswerValue>;

/// A file picked for a file question. The bytes travel out-of-band and are
/// never part of the JSON representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAttachment {
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    /// Bytes.
    pub size: u64,
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl FileAttachment {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size: data.len() as u64,
            data,
        }
    }

    /// Lowercased text after the last `.` of the name.
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit_once('.')
            .map(|(_, extension)| extension.to_lowercase())
    }
}

/// Value stored for a question; the variant follows the question type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    Choices(Vec<String>),
    Files(Vec<FileAttachment>),
}

impl AnswerValue {
    /// Empty strings and empty lists count as unanswered.
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Text(text) => text.is_empty(),
            AnswerValue::Choices(choices) => choices.is_empty(),
            AnswerValue::Files(files) => files.is_empty(),
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(text: &str) -> Self {
        AnswerValue::Text(text.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(text: String) -> Self {
        AnswerValue::Text(text)
    }
}

impl From<Vec<String>> for AnswerValue {
    fn from(choices: Vec<String>) -> Self {
        AnswerValue::Choices(choices)
    }
}

/// Reads an answers object, dropping `null` entries. Numbers and booleans are
/// kept as their text form. Anything other than an object yields no answers.
pub fn answers_from_json(value: &Value) -> Result<Answers, serde_json::Error> {
    let Some(map) = value.as_object() else {
        return Ok(Answers::new());
    };
    map.iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(id, value)| Ok((id.clone(), answer_from_json(id, value)?)))
        .collect()
}

fn answer_from_json(id: &str, value: &Value) -> Result<AnswerValue, serde_json::Error> {
    match value {
        Value::Number(number) => Ok(AnswerValue::Text(number.to_string())),
        Value::Bool(flag) => Ok(AnswerValue::Text(flag.to_string())),
        other => AnswerValue::deserialize(other).map_err(|err| {
            serde_json::Error::custom(format!("invalid answer for question '{id}': {err}"))
        }),
    }
}

/// State transitions accepted by [`AnswerStore::apply`].
#[derive(Debug, Clone)]
pub enum AnswerAction<'q> {
    SetAnswer {
        question_id: String,
        value: AnswerValue,
    },
    /// One file-picker invocation for `question`. Refused unless it is a file
    /// question.
    SetFiles {
        question: &'q QuestionSpec,
        files: Vec<FileAttachment>,
    },
    RemoveFile {
        question_id: String,
        index: usize,
    },
    Touch {
        question_id: String,
    },
    Reset,
}

/// In-memory state of one form-filling session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerStore {
    pub answers: Answers,
    pub errors: FieldErrors,
    pub touched: BTreeMap<String, bool>,
    pub file_errors: BTreeMap<String, Vec<String>>,
    pub selected_files: BTreeMap<String, Vec<FileAttachment>>,
}

impl AnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one action. Returns `false` when the action was refused or had
    /// nothing to act on; refusals are recorded in the error maps.
    pub fn apply(&mut self, action: AnswerAction<'_>) -> bool {
        match action {
            AnswerAction::SetAnswer { question_id, value } => {
                self.errors.remove(&question_id);
                self.touched.insert(question_id.clone(), true);
                self.answers.insert(question_id, value);
                true
            }
            AnswerAction::SetFiles { question, files } => self.select_files(question, files),
            AnswerAction::RemoveFile { question_id, index } => {
                self.remove_file(&question_id, index)
            }
            AnswerAction::Touch { question_id } => {
                self.touched.insert(question_id, true);
                true
            }
            AnswerAction::Reset => {
                *self = Self::default();
                true
            }
        }
    }

    fn select_files(&mut self, question: &QuestionSpec, files: Vec<FileAttachment>) -> bool {
        if question.kind != QuestionType::File {
            return false;
        }
        if files.is_empty() {
            return true;
        }

        let violations = validate_files(&files, question);
        if !violations.is_empty() {
            self.file_errors.insert(
                question.id.clone(),
                violations.iter().map(ToString::to_string).collect(),
            );
            return false;
        }

        let selected = self
            .selected_files
            .get(&question.id)
            .map_or(0, Vec::len);
        if let Err(violation) = check_selection_limit(selected, files.len(), question) {
            self.file_errors
                .insert(question.id.clone(), vec![violation.to_string()]);
            return false;
        }

        let merged = self.selected_files.entry(question.id.clone()).or_default();
        merged.extend(files);
        self.answers
            .insert(question.id.clone(), AnswerValue::Files(merged.clone()));
        self.file_errors.remove(&question.id);
        self.errors.remove(&question.id);
        self.touched.insert(question.id.clone(), true);
        true
    }

    fn remove_file(&mut self, question_id: &str, index: usize) -> bool {
        let Some(selected) = self.selected_files.get_mut(question_id) else {
            return false;
        };
        if index >= selected.len() {
            return false;
        }
        selected.remove(index);
        self.file_errors.remove(question_id);

        if selected.is_empty() {
            self.selected_files.remove(question_id);
            self.answers.remove(question_id);
        } else {
            let remaining = AnswerValue::Files(selected.clone());
            self.answers.insert(question_id.to_string(), remaining);
        }
        true
    }

    /// Runs the field validator over the active tree, stores the resulting
    /// errors and marks every active question as touched.
    pub fn validate_form(&mut self, questions: &[QuestionSpec]) -> bool {
        let errors = validate(questions, &self.answers);
        for node in active_questions(questions, &self.answers) {
            self.touched.insert(node.question.id.clone(), true);
        }
        self.errors = errors;
        self.errors.is_empty()
    }

    pub fn has_file_answers(&self) -> bool {
        self.answers
            .values()
            .any(|value| matches!(value, AnswerValue::Files(files) if !files.is_empty()))
    }

    pub fn is_touched(&self, question_id: &str) -> bool {
        self.touched.get(question_id).copied().unwrap_or(false)
    }
}
