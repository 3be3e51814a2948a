pub mod form;
pub mod question;

pub use form::Form;
pub use question::{
    ChoiceOption, DEFAULT_ACCEPT, DEFAULT_MAX_FILES, DEFAULT_MAX_SIZE_MB, DetailedOption,
    QuestionSpec, QuestionType,
};
