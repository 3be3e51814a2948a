use serde_json::{Map, Value, json};

use crate::{
    answers::{AnswerStore, AnswerValue},
    files::allowed_type_names,
    spec::{form::Form, question::QuestionType},
    validate::validate,
    walk::active_questions,
};

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// At least one active question still fails validation.
    NeedInput,
    /// The form can be submitted.
    Complete,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::NeedInput => "need_input",
            RenderStatus::Complete => "complete",
        }
    }
}

/// Progress counters over the active questions.
#[derive(Debug, Clone)]
pub struct RenderProgress {
    pub answered: usize,
    pub total: usize,
}

/// File rules shown next to a file widget.
#[derive(Debug, Clone)]
pub struct RenderFileRules {
    pub allowed_types: String,
    pub max_size_mb: f64,
    pub multiple: bool,
    pub max_files: usize,
}

/// Describes a single active question for render outputs.
#[derive(Debug, Clone)]
pub struct RenderQuestion {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub kind: QuestionType,
    pub required: bool,
    pub depth: usize,
    pub context_path: Option<String>,
    pub current_value: Option<Value>,
    /// Only reported for touched questions.
    pub error: Option<String>,
    pub file_errors: Vec<String>,
    pub options: Vec<String>,
    pub file_rules: Option<RenderFileRules>,
}

/// Collected payload used by both text and JSON renderers.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub form_id: String,
    pub form_title: String,
    pub category: Option<String>,
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub status: RenderStatus,
    pub progress: RenderProgress,
    pub questions: Vec<RenderQuestion>,
}

fn current_value(value: &AnswerValue) -> Value {
    match value {
        AnswerValue::Files(files) => Value::Array(
            files
                .iter()
                .map(|file| Value::String(file.name.clone()))
                .collect(),
        ),
        other => serde_json::to_value(other).unwrap_or(Value::Null),
    }
}

/// Build the renderer payload from the form and the current answer store.
pub fn build_render_payload(form: &Form, store: &AnswerStore) -> RenderPayload {
    let visited = active_questions(&form.questions, &store.answers);
    let pending = validate(&form.questions, &store.answers);

    let answered = visited
        .iter()
        .filter(|node| {
            store
                .answers
                .get(&node.question.id)
                .is_some_and(|answer| !answer.is_empty())
        })
        .count();
    let total = visited.len();

    let questions = visited
        .iter()
        .map(|node| {
            let question = node.question;
            let file_rules = (question.kind == QuestionType::File).then(|| RenderFileRules {
                allowed_types: allowed_type_names(question),
                max_size_mb: question.max_size_mb(),
                multiple: question.multiple,
                max_files: question.max_files_allowed(),
            });
            RenderQuestion {
                id: question.id.clone(),
                title: question.title.clone(),
                description: question.description.clone(),
                kind: question.kind,
                required: question.required,
                depth: node.depth,
                context_path: node.context_path(),
                current_value: store.answers.get(&question.id).map(current_value),
                error: store
                    .is_touched(&question.id)
                    .then(|| store.errors.get(&question.id).cloned())
                    .flatten(),
                file_errors: store
                    .file_errors
                    .get(&question.id)
                    .cloned()
                    .unwrap_or_default(),
                options: question
                    .options
                    .iter()
                    .map(|option| option.text().to_string())
                    .collect(),
                file_rules,
            }
        })
        .collect::<Vec<_>>();

    let status = if pending.is_empty() {
        RenderStatus::Complete
    } else {
        RenderStatus::NeedInput
    };

    RenderPayload {
        form_id: form.id.clone(),
        form_title: form.title.clone(),
        category: form.category.clone(),
        primary_color: form.primary_color.clone(),
        secondary_color: form.secondary_color.clone(),
        status,
        progress: RenderProgress { answered, total },
        questions,
    }
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let questions = payload
        .questions
        .iter()
        .map(|question| {
            let mut map = Map::new();
            map.insert("id".into(), Value::String(question.id.clone()));
            map.insert("title".into(), Value::String(question.title.clone()));
            map.insert(
                "description".into(),
                question
                    .description
                    .clone()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            );
            map.insert("type".into(), Value::String(question.kind.as_str().into()));
            map.insert("required".into(), Value::Bool(question.required));
            map.insert("depth".into(), json!(question.depth));
            if let Some(path) = &question.context_path {
                map.insert("context".into(), Value::String(path.clone()));
            }
            if let Some(current_value) = &question.current_value {
                map.insert("current_value".into(), current_value.clone());
            }
            if !question.options.is_empty() {
                map.insert("options".into(), json!(question.options));
            }
            if let Some(rules) = &question.file_rules {
                map.insert(
                    "file_rules".into(),
                    json!({
                        "allowed_types": rules.allowed_types,
                        "max_size_mb": rules.max_size_mb,
                        "multiple": rules.multiple,
                        "max_files": rules.max_files,
                    }),
                );
            }
            if let Some(error) = &question.error {
                map.insert("error".into(), Value::String(error.clone()));
            }
            if !question.file_errors.is_empty() {
                map.insert("file_errors".into(), json!(question.file_errors));
            }
            Value::Object(map)
        })
        .collect::<Vec<_>>();

    json!({
        "form_id": payload.form_id,
        "form_title": payload.form_title,
        "category": payload.category,
        "theme": {
            "primary": payload.primary_color,
            "secondary": payload.secondary_color,
        },
        "status": payload.status.as_str(),
        "progress": {
            "answered": payload.progress.answered,
            "total": payload.progress.total,
        },
        "questions": questions,
    })
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Form: {} ({})", payload.form_title, payload.form_id));
    if let Some(category) = &payload.category {
        lines.push(format!("Category: {}", category));
    }
    lines.push(format!(
        "Status: {} ({}/{})",
        payload.status.as_str(),
        payload.progress.answered,
        payload.progress.total
    ));

    lines.push("Questions:".to_string());
    for question in &payload.questions {
        let indent = "  ".repeat(question.depth + 1);
        let mut entry = format!(
            "{}- {} [{}] ({})",
            indent,
            question.title,
            question.kind.as_str(),
            question.id
        );
        if question.required {
            entry.push_str(" *");
        }
        if let Some(current_value) = &question.current_value {
            entry.push_str(&format!(" = {}", value_to_display(current_value)));
        }
        lines.push(entry);

        if let Some(description) = &question.description {
            lines.push(format!("{}  {}", indent, description));
        }
        if !question.options.is_empty() {
            lines.push(format!("{}  Options: {}", indent, question.options.join(" / ")));
        }
        if let Some(rules) = &question.file_rules {
            lines.push(format!(
                "{}  Files: {} (max {} MB, up to {})",
                indent, rules.allowed_types, rules.max_size_mb, rules.max_files
            ));
        }
        if let Some(error) = &question.error {
            lines.push(format!("{}  ! {}", indent, error));
        }
        for file_error in &question.file_errors {
            lines.push(format!("{}  ! {}", indent, file_error));
        }
    }

    lines.join("\n")
}

fn value_to_display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_to_display)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}
