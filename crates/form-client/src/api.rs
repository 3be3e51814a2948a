//! REST collaborator used by the submission flow.

use async_trait::async_trait;
use form_spec::{AttachmentUpload, Form, ResponsePayload};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::session::{Session, UserProfile};

/// Endpoints of the forms service consumed by a fill session.
#[async_trait]
pub trait FormsApi: Send + Sync {
    /// `GET /forms/{id}`.
    async fn get_form(&self, form_id: &str) -> Result<Form, ClientError>;

    /// `POST /respuestas`; returns the `_id` of the created record.
    async fn create_response(&self, payload: &ResponsePayload) -> Result<String, ClientError>;

    /// `POST /respuestas/{responseId}/adjuntos`.
    async fn upload_attachment(
        &self,
        response_id: &str,
        upload: &AttachmentUpload,
    ) -> Result<(), ClientError>;

    /// `GET /auth/{mail}`.
    async fn resolve_user(&self, mail: &str) -> Result<UserProfile, ClientError>;
}

/// [`FormsApi`] over HTTP with bearer authentication.
pub struct HttpFormsApi {
    base_url: Url,
    client: Client,
    token: Option<String>,
    login_path: String,
}

impl HttpFormsApi {
    pub fn new(base_url: Url, session: &Session, login_path: impl Into<String>) -> Self {
        Self {
            base_url,
            client: Client::new(),
            token: session.token.clone(),
            login_path: login_path.into(),
        }
    }

    pub fn from_config(config: &ClientConfig, session: &Session) -> Result<Self, ClientError> {
        Ok(Self::new(config.base_url()?, session, config.login_path.clone()))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidBaseUrl)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, url: &Url) -> Result<reqwest::Response, ClientError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized {
                login_path: self.login_path.clone(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                path: url.path().to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ClientError> {
        let url = self.endpoint(segments)?;
        debug!("GET {}", url);
        let response = self.send(self.client.get(url.clone()), &url).await?;
        Ok(response.json().await?)
    }
}

/// The created record id is `_id`; some deployments answer with `id`.
fn extract_response_id(body: &Value) -> Option<String> {
    ["_id", "id"]
        .iter()
        .filter_map(|key| body.get(*key))
        .find_map(|value| match value {
            Value::String(id) if !id.is_empty() => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        })
}

#[async_trait]
impl FormsApi for HttpFormsApi {
    async fn get_form(&self, form_id: &str) -> Result<Form, ClientError> {
        self.get_json(&["forms", form_id]).await
    }

    async fn create_response(&self, payload: &ResponsePayload) -> Result<String, ClientError> {
        let url = self.endpoint(&["respuestas"])?;
        debug!("POST {}", url);
        let response = self
            .send(self.client.post(url.clone()).json(payload), &url)
            .await?;
        let body: Value = response.json().await?;
        extract_response_id(&body).ok_or(ClientError::MissingResponseId)
    }

    async fn upload_attachment(
        &self,
        response_id: &str,
        upload: &AttachmentUpload,
    ) -> Result<(), ClientError> {
        let url = self.endpoint(&["respuestas", response_id, "adjuntos"])?;
        debug!("POST {} ({}/{})", url, upload.index + 1, upload.total);
        self.send(self.client.post(url.clone()).json(upload), &url)
            .await?;
        Ok(())
    }

    async fn resolve_user(&self, mail: &str) -> Result<UserProfile, ClientError> {
        self.get_json(&["auth", mail]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use form_spec::{AnswerValue, Answers, AttachmentBody, QuestionSpec, QuestionType};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(base: &str) -> HttpFormsApi {
        HttpFormsApi::new(Url::parse(base).unwrap(), &Session::new("t"), "/login")
    }

    #[test]
    fn endpoints_extend_base_path() {
        let api = client_for("https://acme.api.example.com/v1/");
        assert_eq!(
            api.endpoint(&["respuestas", "r-1", "adjuntos"]).unwrap().as_str(),
            "https://acme.api.example.com/v1/respuestas/r-1/adjuntos"
        );
        let bare = client_for("https://acme.api.example.com");
        assert_eq!(
            bare.endpoint(&["forms", "f1"]).unwrap().as_str(),
            "https://acme.api.example.com/forms/f1"
        );
    }

    #[test]
    fn endpoint_segments_are_escaped() {
        let api = client_for("https://api.example.com");
        assert_eq!(
            api.endpoint(&["auth", "ana maria@example.com"]).unwrap().as_str(),
            "https://api.example.com/auth/ana%20maria@example.com"
        );
    }

    #[test]
    fn response_id_prefers_underscore_id() {
        assert_eq!(
            extract_response_id(&json!({ "_id": "abc", "id": "other" })).as_deref(),
            Some("abc")
        );
        assert_eq!(extract_response_id(&json!({ "id": 7 })).as_deref(), Some("7"));
        assert!(extract_response_id(&json!({ "_id": "" })).is_none());
        assert!(extract_response_id(&json!({ "ok": true })).is_none());
    }

    fn server_api(server: &MockServer, prefix: &str) -> HttpFormsApi {
        let base = format!("{}{}", server.uri(), prefix);
        HttpFormsApi::new(Url::parse(&base).unwrap(), &Session::new("secreto"), "/login")
    }

    fn sample_payload() -> ResponsePayload {
        let form = Form::new(
            "form-1",
            "Contacto",
            vec![QuestionSpec::new("q-nombre", QuestionType::Text, "Nombre")],
        );
        let mut answers = Answers::new();
        answers.insert("q-nombre".into(), AnswerValue::Text("Ana".into()));
        ResponsePayload::build(&form, &answers, None, None, "2024-05-01T12:00:00Z".into())
    }

    #[tokio::test]
    async fn get_form_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forms/form-1"))
            .and(header("authorization", "Bearer secreto"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_id": "form-1",
                "title": "Contacto",
                "questions": [{ "id": "q-nombre", "type": "text", "title": "Nombre" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let form = server_api(&server, "").get_form("form-1").await.expect("form");
        assert_eq!(form.id, "form-1");
        assert_eq!(form.questions.len(), 1);
    }

    #[tokio::test]
    async fn unauthorized_carries_login_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forms/form-1"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = server_api(&server, "").get_form("form-1").await.unwrap_err();
        match err {
            ClientError::Unauthorized { login_path } => assert_eq!(login_path, "/login"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn other_failures_report_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/auth/ana@example.com"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = server_api(&server, "/v1/")
            .resolve_user("ana@example.com")
            .await
            .unwrap_err();
        match err {
            ClientError::Status { path, status, body } => {
                assert_eq!(path, "/v1/auth/ana@example.com");
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn resolve_user_decodes_profile() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/ana@example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_id": "u-1",
                "nombre": "Ana",
                "empresa": "Acme"
            })))
            .mount(&server)
            .await;

        let user = server_api(&server, "")
            .resolve_user("ana@example.com")
            .await
            .expect("user");
        assert_eq!(user.id, "u-1");
        assert_eq!(user.company.as_deref(), Some("Acme"));
    }

    #[tokio::test]
    async fn create_response_posts_payload_and_returns_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/respuestas"))
            .and(header("authorization", "Bearer secreto"))
            .and(body_partial_json(json!({
                "formId": "form-1",
                "formTitle": "Contacto",
                "responses": { "Nombre": "Ana" },
                "adjuntos": []
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "_id": "resp-9" })))
            .expect(1)
            .mount(&server)
            .await;

        let id = server_api(&server, "")
            .create_response(&sample_payload())
            .await
            .expect("created");
        assert_eq!(id, "resp-9");
    }

    #[tokio::test]
    async fn create_response_without_id_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/respuestas"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .mount(&server)
            .await;

        let err = server_api(&server, "")
            .create_response(&sample_payload())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::MissingResponseId));
    }

    #[tokio::test]
    async fn upload_targets_response_attachments() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/respuestas/resp-9/adjuntos"))
            .and(body_partial_json(json!({
                "formId": "resp-9",
                "index": 1,
                "total": 2,
                "adjunto": { "pregunta": "Adjunto", "fileName": "cv.pdf" }
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let upload = AttachmentUpload {
            form_id: "resp-9".into(),
            adjunto: AttachmentBody {
                pregunta: "Adjunto".into(),
                file_name: "cv.pdf".into(),
                file_data: "data:application/pdf;base64,AQ==".into(),
                mime_type: "application/pdf".into(),
                size: 1,
            },
            index: 1,
            total: 2,
        };
        server_api(&server, "")
            .upload_attachment("resp-9", &upload)
            .await
            .expect("uploaded");
    }
}
