use std::collections::BTreeMap;

use crate::answers::{AnswerValue, Answers};
use crate::files::validate_files;
use crate::spec::question::{QuestionSpec, QuestionType};
use crate::walk::{QuestionVisitor, VisitedQuestion, walk};

/// Question id to a single human-readable message.
pub type FieldErrors = BTreeMap<String, String>;

pub const REQUIRED_MESSAGE: &str = "Este campo es obligatorio";
/// Detailed reasons are kept in the store's file error channel.
pub const FILE_ERROR_MESSAGE: &str = "Revisa los archivos adjuntos";

struct FieldValidator<'s> {
    answers: &'s Answers,
    errors: FieldErrors,
}

impl<'a> QuestionVisitor<'a> for FieldValidator<'_> {
    fn visit(&mut self, node: &VisitedQuestion<'a>) {
        let question = node.question;
        let answer = self.answers.get(&question.id);

        if question.required && answer.is_none_or(AnswerValue::is_empty) {
            self.errors
                .insert(question.id.clone(), REQUIRED_MESSAGE.to_string());
            return;
        }

        if question.kind == QuestionType::File
            && let Some(AnswerValue::Files(files)) = answer
            && !validate_files(files, question).is_empty()
        {
            self.errors
                .insert(question.id.clone(), FILE_ERROR_MESSAGE.to_string());
        }
    }
}

/// Validates the active question tree. An empty map means the form can be
/// submitted. Sub-form errors share the flat id namespace of the root.
pub fn validate(questions: &[QuestionSpec], answers: &Answers) -> FieldErrors {
    let mut validator = FieldValidator {
        answers,
        errors: FieldErrors::new(),
    };
    walk(questions, answers, &mut validator);
    validator.errors
}
