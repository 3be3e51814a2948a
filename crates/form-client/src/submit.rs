//! Two-phase submission: the answer payload first, then each attachment on
//! its own request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use form_spec::{
    AnswerAction, AnswerStore, AttachmentBody, AttachmentUpload, Form, PendingAttachment,
    ResponsePayload, collect_attachments, to_data_url,
};
use futures::future::join_all;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};

use crate::api::FormsApi;
use crate::config::DEFAULT_UPLOAD_DELAY_MS;
use crate::error::ClientError;
use crate::session::{Session, UserProfile};

/// One form-filling session: the fetched form plus the user's answers.
#[derive(Debug, Clone)]
pub struct FormFill {
    pub form: Form,
    pub store: AnswerStore,
    pub backup_email: Option<String>,
    pub user: Option<UserProfile>,
    /// Non-fatal problems met while opening the form, for display.
    pub notices: Vec<String>,
}

impl FormFill {
    pub fn new(form: Form) -> Self {
        Self {
            form,
            store: AnswerStore::new(),
            backup_email: None,
            user: None,
            notices: Vec::new(),
        }
    }

    /// Fetches the form and resolves the submitting user. A failed user lookup
    /// does not prevent filling the form.
    pub async fn open<A>(api: &A, form_id: &str, session: &Session) -> Result<Self, ClientError>
    where
        A: FormsApi + ?Sized,
    {
        let form = api.get_form(form_id).await?;
        let mut fill = Self::new(form);
        fill.user = session.user.clone();

        if fill.user.is_none()
            && let Some(mail) = &session.email
        {
            match api.resolve_user(mail).await {
                Ok(user) => fill.user = Some(user),
                Err(err) => {
                    warn!(mail = %mail, error = %err, "could not resolve submitting user");
                    fill.notices
                        .push(format!("No se pudo obtener la información del usuario: {err}"));
                }
            }
        }
        Ok(fill)
    }

    pub fn apply(&mut self, action: AnswerAction<'_>) -> bool {
        self.store.apply(action)
    }
}

/// Outcome of a submission whose base payload was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReport {
    pub response_id: String,
    pub uploaded: usize,
    /// Names of files that could not be encoded or uploaded.
    pub failed_attachments: Vec<String>,
}

struct SubmittingGuard<'a>(&'a AtomicBool);

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drives submissions against a [`FormsApi`], refusing overlapping attempts.
pub struct Submitter<A> {
    api: A,
    upload_delay: Duration,
    submitting: AtomicBool,
}

impl<A: FormsApi> Submitter<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            upload_delay: Duration::from_millis(DEFAULT_UPLOAD_DELAY_MS),
            submitting: AtomicBool::new(false),
        }
    }

    /// Pause between consecutive attachment uploads.
    pub fn with_upload_delay(mut self, delay: Duration) -> Self {
        self.upload_delay = delay;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst)
    }

    /// Validates and submits `fill`. On success the answer store and backup
    /// email are cleared; on any error before the response record exists the
    /// answers are left untouched so the user can retry.
    pub async fn submit(&self, fill: &mut FormFill) -> Result<SubmissionReport, ClientError> {
        if self.submitting.swap(true, Ordering::SeqCst) {
            return Err(ClientError::AlreadySubmitting);
        }
        let _guard = SubmittingGuard(&self.submitting);

        if !fill.store.validate_form(&fill.form.questions) {
            return Err(ClientError::Validation(fill.store.errors.clone()));
        }

        let user = fill.user.as_ref().map(serde_json::to_value).transpose()?;
        let payload = ResponsePayload::build(
            &fill.form,
            &fill.store.answers,
            fill.backup_email.clone(),
            user,
            submitted_at(),
        );

        info!(form_id = %fill.form.id, "submitting response");
        let response_id = self.api.create_response(&payload).await?;
        info!(form_id = %fill.form.id, response_id = %response_id, "response created");

        let mut report = SubmissionReport {
            response_id,
            uploaded: 0,
            failed_attachments: Vec::new(),
        };

        if fill.store.has_file_answers() {
            let pending = collect_attachments(&fill.form.questions, &fill.store.answers);
            self.upload_attachments(pending, &mut report).await;
        }

        fill.store.apply(AnswerAction::Reset);
        fill.backup_email = None;
        Ok(report)
    }

    async fn upload_attachments(&self, pending: Vec<PendingAttachment>, report: &mut SubmissionReport) {
        let encoded = encode_all(pending).await;
        let total = encoded.len();
        info!(response_id = %report.response_id, total, "uploading attachments");

        for (index, item) in encoded.into_iter().enumerate() {
            if index > 0 && !self.upload_delay.is_zero() {
                tokio::time::sleep(self.upload_delay).await;
            }

            let (pending, file_data) = match item {
                Ok(encoded) => encoded,
                Err(name) => {
                    report.failed_attachments.push(name);
                    continue;
                }
            };

            let upload = AttachmentUpload {
                form_id: report.response_id.clone(),
                adjunto: AttachmentBody::from_pending(&pending, file_data),
                index,
                total,
            };
            match self.api.upload_attachment(&report.response_id, &upload).await {
                Ok(()) => report.uploaded += 1,
                Err(err) => {
                    warn!(
                        file = %pending.file.name,
                        index,
                        total,
                        error = %err,
                        "attachment upload failed, skipping"
                    );
                    report.failed_attachments.push(pending.file.name.clone());
                }
            }
        }
    }
}

/// Converts every file to a data URL concurrently. A file whose encoding task
/// fails is reported by name.
async fn encode_all(pending: Vec<PendingAttachment>) -> Vec<Result<(PendingAttachment, String), String>> {
    let tasks = pending.into_iter().map(|item| {
        let name = item.file.name.clone();
        async move {
            tokio::task::spawn_blocking(move || {
                let data = to_data_url(&item.file);
                (item, data)
            })
            .await
            .map_err(|err| {
                warn!(file = %name, error = %err, "attachment encoding failed, skipping");
                name
            })
        }
    });
    join_all(tasks).await
}

fn submitted_at() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}
