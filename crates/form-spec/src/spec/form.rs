use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::question::QuestionSpec;

/// Top-level form definition served by `GET /forms/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_color: Option<String>,
    #[serde(default)]
    pub questions: Vec<QuestionSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Form {
    pub fn new(id: impl Into<String>, title: impl Into<String>, questions: Vec<QuestionSpec>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            category: None,
            response_time: None,
            author: None,
            primary_color: None,
            secondary_color: None,
            questions,
            status: None,
            section: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Looks a question up by id anywhere in the tree, including sub-forms
    /// whose owning option is not selected.
    pub fn find_question(&self, id: &str) -> Option<&QuestionSpec> {
        find_in(&self.questions, id)
    }
}

fn find_in<'a>(questions: &'a [QuestionSpec], id: &str) -> Option<&'a QuestionSpec> {
    questions.iter().find_map(|question| {
        if question.id == id {
            return Some(question);
        }
        question
            .options
            .iter()
            .filter_map(|option| option.subform())
            .find_map(|subform| find_in(subform, id))
    })
}
