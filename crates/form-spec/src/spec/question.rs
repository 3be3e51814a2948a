use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Accept list used when a file question does not declare one.
pub const DEFAULT_ACCEPT: &str = ".pdf,application/pdf";
/// Maximum size in megabytes used when a file question does not declare one.
pub const DEFAULT_MAX_SIZE_MB: f64 = 0.5;
/// File limit for questions that accept several files.
pub const DEFAULT_MAX_FILES: usize = 4;

/// Supported question data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Text,
    Number,
    Date,
    Time,
    Email,
    Rut,
    File,
    SingleChoice,
    MultipleChoice,
}

impl QuestionType {
    /// Only choice questions may carry options and sub-forms.
    pub fn is_choice(self) -> bool {
        matches!(self, QuestionType::SingleChoice | QuestionType::MultipleChoice)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::Text => "text",
            QuestionType::Number => "number",
            QuestionType::Date => "date",
            QuestionType::Time => "time",
            QuestionType::Email => "email",
            QuestionType::Rut => "rut",
            QuestionType::File => "file",
            QuestionType::SingleChoice => "single_choice",
            QuestionType::MultipleChoice => "multiple_choice",
        }
    }
}

/// Option with an optional conditional sub-form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DetailedOption {
    pub text: String,
    #[serde(default)]
    pub has_subform: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subform_questions: Vec<QuestionSpec>,
}

/// One answer option of a choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ChoiceOption {
    Label(String),
    Detailed(DetailedOption),
}

impl ChoiceOption {
    pub fn text(&self) -> &str {
        match self {
            ChoiceOption::Label(text) => text,
            ChoiceOption::Detailed(option) => &option.text,
        }
    }

    /// Nested questions revealed while this option is selected.
    pub fn subform(&self) -> Option<&[QuestionSpec]> {
        match self {
            ChoiceOption::Detailed(option)
                if option.has_subform && !option.subform_questions.is_empty() =>
            {
                Some(&option.subform_questions)
            }
            _ => None,
        }
    }
}

impl From<&str> for ChoiceOption {
    fn from(text: &str) -> Self {
        ChoiceOption::Label(text.to_string())
    }
}

/// Definition of a single question inside a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ChoiceOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept: Option<String>,
    /// Megabytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<f64>,
    #[serde(default)]
    pub multiple: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_files: Option<usize>,
}

impl QuestionSpec {
    /// Creates a bare question; file rules and options start empty.
    pub fn new(id: impl Into<String>, kind: QuestionType, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            title: title.into(),
            description: None,
            required: false,
            options: Vec::new(),
            accept: None,
            max_size: None,
            multiple: false,
            max_files: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_options(mut self, options: Vec<ChoiceOption>) -> Self {
        self.options = options;
        self
    }

    pub fn accept_or_default(&self) -> &str {
        self.accept
            .as_deref()
            .filter(|accept| !accept.trim().is_empty())
            .unwrap_or(DEFAULT_ACCEPT)
    }

    pub fn max_size_mb(&self) -> f64 {
        self.max_size
            .filter(|size| *size > 0.0)
            .unwrap_or(DEFAULT_MAX_SIZE_MB)
    }

    pub fn max_files_allowed(&self) -> usize {
        if self.multiple {
            self.max_files.unwrap_or(DEFAULT_MAX_FILES)
        } else {
            1
        }
    }
}
