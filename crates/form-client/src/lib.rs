#![allow(missing_docs)]

pub mod api;
pub mod config;
pub mod error;
pub mod session;
pub mod submit;

pub use api::{FormsApi, HttpFormsApi};
pub use config::{ClientConfig, ConfigError};
pub use error::ClientError;
pub use session::{Session, UserProfile};
pub use submit::{FormFill, SubmissionReport, Submitter};
