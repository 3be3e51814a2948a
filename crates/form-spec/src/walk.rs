//! Activation-aware traversal of a question tree.
//!
//! Rendering, validation and serialization all fold over the same walk: every
//! root question is visited, and the sub-form of a choice option is entered only
//! while that option is selected in the current answers.

use std::collections::HashSet;

use crate::answers::{AnswerValue, Answers};
use crate::spec::question::{QuestionSpec, QuestionType};

/// A question reached during a walk, with its position in the active tree.
#[derive(Debug, Clone)]
pub struct VisitedQuestion<'a> {
    pub question: &'a QuestionSpec,
    pub depth: usize,
    pub index: usize,
    /// Selected option texts from the root down to this question's sub-form.
    pub context: Vec<&'a str>,
}

impl VisitedQuestion<'_> {
    pub fn in_subform(&self) -> bool {
        !self.context.is_empty()
    }

    /// `|`-joined option chain, `None` for root questions.
    pub fn context_path(&self) -> Option<String> {
        self.in_subform().then(|| self.context.join("|"))
    }
}

/// Per-node callback driven by [`walk`].
pub trait QuestionVisitor<'a> {
    fn visit(&mut self, node: &VisitedQuestion<'a>);
}

impl<'a, F> QuestionVisitor<'a> for F
where
    F: FnMut(&VisitedQuestion<'a>),
{
    fn visit(&mut self, node: &VisitedQuestion<'a>) {
        self(node)
    }
}

/// Whether `option_text` is currently selected for a choice question.
pub fn is_option_selected(
    question: &QuestionSpec,
    option_text: &str,
    answer: Option<&AnswerValue>,
) -> bool {
    match (question.kind, answer) {
        (QuestionType::SingleChoice, Some(AnswerValue::Text(selected))) => selected == option_text,
        (QuestionType::MultipleChoice, Some(AnswerValue::Choices(selected))) => {
            selected.iter().any(|choice| choice == option_text)
        }
        _ => false,
    }
}

/// Sub-forms of `question` whose owning option is selected, paired with the
/// option text.
pub fn active_subforms<'a, 'b>(
    question: &'a QuestionSpec,
    answer: Option<&'b AnswerValue>,
) -> impl Iterator<Item = (&'a str, &'a [QuestionSpec])> + use<'a, 'b> {
    question
        .options
        .iter()
        .filter(move |_| question.kind.is_choice())
        .filter_map(|option| option.subform().map(|subform| (option.text(), subform)))
        .filter(move |(text, _)| is_option_selected(question, text, answer))
}

/// Visits every active question depth-first in declaration order.
///
/// Nodes are deduplicated per pass on `(depth, index, id)`, so a repeated raw
/// id at the same position of two sibling sub-forms is only visited once.
pub fn walk<'a, V>(questions: &'a [QuestionSpec], answers: &Answers, visitor: &mut V)
where
    V: QuestionVisitor<'a> + ?Sized,
{
    let mut seen = HashSet::new();
    let mut context = Vec::new();
    walk_level(questions, answers, 0, &mut context, &mut seen, visitor);
}

fn walk_level<'a, V>(
    questions: &'a [QuestionSpec],
    answers: &Answers,
    depth: usize,
    context: &mut Vec<&'a str>,
    seen: &mut HashSet<(usize, usize, &'a str)>,
    visitor: &mut V,
) where
    V: QuestionVisitor<'a> + ?Sized,
{
    for (index, question) in questions.iter().enumerate() {
        if !seen.insert((depth, index, question.id.as_str())) {
            continue;
        }

        visitor.visit(&VisitedQuestion {
            question,
            depth,
            index,
            context: context.clone(),
        });

        for (option, subform) in active_subforms(question, answers.get(&question.id)) {
            context.push(option);
            walk_level(subform, answers, depth + 1, context, seen, visitor);
            context.pop();
        }
    }
}

/// Collects the active questions in visit order.
pub fn active_questions<'a>(
    questions: &'a [QuestionSpec],
    answers: &Answers,
) -> Vec<VisitedQuestion<'a>> {
    let mut visited = Vec::new();
    walk(questions, answers, &mut |node: &VisitedQuestion<'a>| {
        visited.push(node.clone())
    });
    visited
}
