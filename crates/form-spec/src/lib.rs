#![allow(missing_docs)]

pub mod answers;
pub mod files;
pub mod render;
pub mod serialize;
pub mod spec;
pub mod validate;
pub mod walk;

pub use answers::{AnswerAction, AnswerStore, AnswerValue, Answers, FileAttachment, answers_from_json};
pub use files::{AcceptPattern, FileViolation, check_selection_limit, parse_accept, validate_files};
pub use render::{
    RenderPayload, RenderProgress, RenderQuestion, RenderStatus, build_render_payload,
    render_json_ui, render_text,
};
pub use serialize::{
    AttachmentBody, AttachmentUpload, MappedAnswers, PendingAttachment, ResponsePayload,
    clean_answers, collect_attachments, map_answers_to_titles, to_data_url,
};
pub use spec::{ChoiceOption, DetailedOption, Form, QuestionSpec, QuestionType};
pub use validate::{FILE_ERROR_MESSAGE, FieldErrors, REQUIRED_MESSAGE, validate};
pub use walk::{QuestionVisitor, VisitedQuestion, active_questions, is_option_selected, walk};
