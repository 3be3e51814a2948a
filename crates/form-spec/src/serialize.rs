//! Conversion of id-keyed answers into the title-keyed payload sent to the
//! responses service, plus the typed bodies of the submission calls.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::answers::{AnswerValue, Answers, FileAttachment};
use crate::spec::form::Form;
use crate::spec::question::{QuestionSpec, QuestionType};
use crate::walk::{QuestionVisitor, VisitedQuestion, walk};

pub const CONTEXT_KEY: &str = "_contexto";
pub const CONTEXT_FIELDS_KEY: &str = "camposContextuales";

/// Answers keyed by question title. Titles are not unique, so a later
/// question with the same title replaces an earlier one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedAnswers {
    pub by_title: Map<String, Value>,
    /// Sub-form answers grouped by their `|`-joined option path.
    pub contextual: BTreeMap<String, Map<String, Value>>,
}

impl MappedAnswers {
    /// `{ <title>: value, _contexto: { camposContextuales: {...} } }`, with an
    /// empty `_contexto` when no sub-form was answered.
    pub fn to_value(&self) -> Value {
        let mut root = self.by_title.clone();
        let mut context = Map::new();
        if !self.contextual.is_empty() {
            let fields = self
                .contextual
                .iter()
                .map(|(path, answers)| (path.clone(), Value::Object(answers.clone())))
                .collect();
            context.insert(CONTEXT_FIELDS_KEY.into(), Value::Object(fields));
        }
        root.insert(CONTEXT_KEY.into(), Value::Object(context));
        Value::Object(root)
    }
}

fn answer_to_value(value: &AnswerValue) -> Value {
    match value {
        AnswerValue::Text(text) => Value::String(text.clone()),
        AnswerValue::Choices(choices) => {
            Value::Array(choices.iter().cloned().map(Value::String).collect())
        }
        AnswerValue::Files(files) => Value::String(
            files
                .iter()
                .map(|file| file.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        ),
    }
}

struct TitleMapper<'s> {
    answers: &'s Answers,
    mapped: MappedAnswers,
}

impl<'a> QuestionVisitor<'a> for TitleMapper<'_> {
    fn visit(&mut self, node: &VisitedQuestion<'a>) {
        let Some(answer) = self
            .answers
            .get(&node.question.id)
            .filter(|answer| !answer.is_empty())
        else {
            return;
        };

        let title = node.question.title.clone();
        let value = answer_to_value(answer);
        if let Some(path) = node.context_path() {
            self.mapped
                .contextual
                .entry(path)
                .or_default()
                .insert(title.clone(), value.clone());
        }
        self.mapped.by_title.insert(title, value);
    }
}

/// Maps the answers of every active question onto its title.
pub fn map_answers_to_titles(questions: &[QuestionSpec], answers: &Answers) -> MappedAnswers {
    let mut mapper = TitleMapper {
        answers,
        mapped: MappedAnswers::default(),
    };
    walk(questions, answers, &mut mapper);
    mapper.mapped
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Drops top-level entries that are `null`, `""`, `[]` or `{}`.
pub fn clean_answers(value: &Value) -> Map<String, Value> {
    value
        .as_object()
        .map(|map| {
            map.iter()
                .filter(|(_, value)| !is_blank(value))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
        .unwrap_or_default()
}

/// A file waiting to be uploaded, labelled with its question's title.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAttachment {
    pub question_title: String,
    pub file: FileAttachment,
}

/// Every file of every active file question, in walk order.
pub fn collect_attachments(questions: &[QuestionSpec], answers: &Answers) -> Vec<PendingAttachment> {
    let mut pending = Vec::new();
    walk(questions, answers, &mut |node: &VisitedQuestion<'_>| {
        if node.question.kind != QuestionType::File {
            return;
        }
        if let Some(AnswerValue::Files(files)) = answers.get(&node.question.id) {
            pending.extend(files.iter().map(|file| PendingAttachment {
                question_title: node.question.title.clone(),
                file: file.clone(),
            }));
        }
    });
    pending
}

/// `data:<mime>;base64,<bytes>`.
pub fn to_data_url(file: &FileAttachment) -> String {
    let mime = if file.mime_type.is_empty() {
        "application/octet-stream"
    } else {
        file.mime_type.as_str()
    };
    format!("data:{mime};base64,{}", STANDARD.encode(&file.data))
}

/// Body of `POST /respuestas`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePayload {
    pub form_id: String,
    pub form_title: String,
    pub responses: Map<String, Value>,
    pub mail: Option<String>,
    pub submitted_at: String,
    pub user: Option<Value>,
    /// Always empty; files are uploaded one by one afterwards.
    pub adjuntos: Vec<Value>,
}

impl ResponsePayload {
    pub fn build(
        form: &Form,
        answers: &Answers,
        mail: Option<String>,
        user: Option<Value>,
        submitted_at: String,
    ) -> Self {
        let mapped = map_answers_to_titles(&form.questions, answers);
        Self {
            form_id: form.id.clone(),
            form_title: form.title.clone(),
            responses: clean_answers(&mapped.to_value()),
            mail,
            submitted_at,
            user,
            adjuntos: Vec::new(),
        }
    }
}

/// The `adjunto` object of an attachment upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentBody {
    pub pregunta: String,
    pub file_name: String,
    pub file_data: String,
    pub mime_type: String,
    pub size: u64,
}

impl AttachmentBody {
    pub fn from_pending(pending: &PendingAttachment, file_data: String) -> Self {
        Self {
            pregunta: pending.question_title.clone(),
            file_name: pending.file.name.clone(),
            file_data,
            mime_type: pending.file.mime_type.clone(),
            size: pending.file.size,
        }
    }
}

/// Body of `POST /respuestas/{responseId}/adjuntos`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentUpload {
    /// Id of the created response record.
    pub form_id: String,
    pub adjunto: AttachmentBody,
    pub index: usize,
    pub total: usize,
}
