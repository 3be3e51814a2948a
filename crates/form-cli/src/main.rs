mod inputs;

use clap::{Parser, Subcommand, ValueEnum};
use form_client::{
    ClientConfig, ClientError, FormFill, FormsApi, HttpFormsApi, Session, Submitter,
};
use form_spec::{AnswerStore, Form, build_render_payload, render_json_ui, render_text};
use inputs::{FileArg, build_store, load_form};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Dynamic form CLI",
    long_about = "Fetches forms from the forms service, renders and validates answers locally, and submits responses with their attachments"
)]
struct Cli {
    /// Client configuration TOML (API bases, tenants, upload delay).
    #[arg(long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RenderMode {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Download a form definition and print it as JSON.
    Fetch {
        /// Id of the form to fetch.
        #[arg(long, value_name = "FORM_ID")]
        form: String,
        /// Host the form is served on; its first label selects the tenant.
        #[arg(long)]
        host: Option<String>,
    },
    /// Render the active questions of a local form definition.
    Render {
        /// Path to the form JSON.
        #[arg(long, value_name = "FORM")]
        form_file: PathBuf,
        /// Optional JSON file with answers keyed by question id.
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        /// Attach a file to a question, as `<question_id>=<path>`.
        #[arg(long = "file", value_name = "QUESTION=PATH")]
        files: Vec<FileArg>,
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Validate answers against a local form definition.
    Validate {
        /// Path to the form JSON.
        #[arg(long, value_name = "FORM")]
        form_file: PathBuf,
        /// Optional JSON file with answers keyed by question id.
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        /// Attach a file to a question, as `<question_id>=<path>`.
        #[arg(long = "file", value_name = "QUESTION=PATH")]
        files: Vec<FileArg>,
    },
    /// Fetch a form, apply answers and submit the response.
    Submit {
        /// Id of the form to answer.
        #[arg(long, value_name = "FORM_ID")]
        form: String,
        /// Optional JSON file with answers keyed by question id.
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        /// Attach a file to a question, as `<question_id>=<path>`.
        #[arg(long = "file", value_name = "QUESTION=PATH")]
        files: Vec<FileArg>,
        /// Mail of the signed-in user, used to resolve the user record.
        #[arg(long)]
        email: Option<String>,
        /// Contact mail sent with the response.
        #[arg(long)]
        backup_email: Option<String>,
        /// Host the form is served on; its first label selects the tenant.
        #[arg(long)]
        host: Option<String>,
    },
    /// Print the JSON schema of form definitions.
    Schema,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Command::Fetch { form, host } => {
            let config = ClientConfig::load(cli.config.as_deref())?;
            run_fetch(&config, &form, host.as_deref()).await
        }
        Command::Render {
            form_file,
            answers,
            files,
            format,
        } => run_render(&form_file, answers.as_deref(), &files, format),
        Command::Validate {
            form_file,
            answers,
            files,
        } => run_validate(&form_file, answers.as_deref(), &files),
        Command::Submit {
            form,
            answers,
            files,
            email,
            backup_email,
            host,
        } => {
            let config = ClientConfig::load(cli.config.as_deref())?;
            let request = SubmitRequest {
                form_id: form,
                answers,
                files,
                email,
                backup_email,
                host,
            };
            run_submit(&config, request).await
        }
        Command::Schema => run_schema(),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn session_for(config: &ClientConfig, email: Option<String>) -> Session {
    Session {
        token: config.token.clone(),
        email,
        user: None,
    }
}

fn api_for(config: &ClientConfig, session: &Session, host: Option<&str>) -> CliResult<HttpFormsApi> {
    let api = match host {
        Some(host) => HttpFormsApi::new(
            config.resolve_base_url(host)?,
            session,
            config.login_path.clone(),
        ),
        None => HttpFormsApi::from_config(config, session)?,
    };
    info!(base_url = %api.base_url(), "using forms service");
    Ok(api)
}

async fn run_fetch(config: &ClientConfig, form_id: &str, host: Option<&str>) -> CliResult<()> {
    let session = session_for(config, None);
    let api = api_for(config, &session, host)?;
    let form = api.get_form(form_id).await.map_err(explain)?;
    println!("{}", serde_json::to_string_pretty(&form)?);
    Ok(())
}

fn run_render(
    form_path: &Path,
    answers: Option<&Path>,
    files: &[FileArg],
    format: RenderMode,
) -> CliResult<()> {
    let form = load_form(form_path)?;
    let store = build_store(&form, answers, files)?;
    let payload = build_render_payload(&form, &store);
    match format {
        RenderMode::Text => println!("{}", render_text(&payload)),
        RenderMode::Json => println!("{}", serde_json::to_string_pretty(&render_json_ui(&payload))?),
    }
    Ok(())
}

fn run_validate(form_path: &Path, answers: Option<&Path>, files: &[FileArg]) -> CliResult<()> {
    let form = load_form(form_path)?;
    let mut store = build_store(&form, answers, files)?;
    let valid = store.validate_form(&form.questions) && store.file_errors.is_empty();
    println!(
        "Validation result: {}",
        if valid { "valid" } else { "invalid" }
    );
    describe_errors(&form, &store);

    if valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_errors(form: &Form, store: &AnswerStore) {
    let title_of = |id: &str| {
        form.find_question(id)
            .map(|question| question.title.clone())
            .unwrap_or_else(|| id.to_string())
    };
    if !store.errors.is_empty() {
        println!("Errors:");
        for (id, message) in &store.errors {
            println!("  {} ({}) - {}", title_of(id), id, message);
        }
    }
    if !store.file_errors.is_empty() {
        println!("File errors:");
        for (id, messages) in &store.file_errors {
            for message in messages {
                println!("  {} ({}) - {}", title_of(id), id, message);
            }
        }
    }
}

struct SubmitRequest {
    form_id: String,
    answers: Option<PathBuf>,
    files: Vec<FileArg>,
    email: Option<String>,
    backup_email: Option<String>,
    host: Option<String>,
}

async fn run_submit(config: &ClientConfig, request: SubmitRequest) -> CliResult<()> {
    let session = session_for(config, request.email);
    let api = api_for(config, &session, request.host.as_deref())?;

    let mut fill = FormFill::open(&api, &request.form_id, &session)
        .await
        .map_err(explain)?;
    for notice in &fill.notices {
        println!("Notice: {}", notice);
    }
    fill.store = build_store(&fill.form, request.answers.as_deref(), &request.files)?;
    fill.backup_email = request.backup_email;

    if !fill.store.file_errors.is_empty() {
        println!("Validation result: invalid");
        describe_errors(&fill.form, &fill.store);
        return Err("validation failed".into());
    }

    let submitter = Submitter::new(api).with_upload_delay(config.upload_delay());
    match submitter.submit(&mut fill).await {
        Ok(report) => {
            println!("Response created: {}", report.response_id);
            println!("Attachments uploaded: {}", report.uploaded);
            if !report.failed_attachments.is_empty() {
                println!(
                    "Attachments not uploaded: {}",
                    report.failed_attachments.join(", ")
                );
            }
            Ok(())
        }
        Err(ClientError::Validation(_)) => {
            println!("Validation result: invalid");
            describe_errors(&fill.form, &fill.store);
            Err("validation failed".into())
        }
        Err(err) => Err(explain(err)),
    }
}

/// Adds a sign-in hint to session failures.
fn explain(err: ClientError) -> Box<dyn std::error::Error> {
    if let ClientError::Unauthorized { login_path } = &err {
        return format!("{err}; set FORMFLOW_TOKEN after signing in at {login_path}").into();
    }
    err.into()
}

fn run_schema() -> CliResult<()> {
    let schema = schemars::schema_for!(Form);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explain_adds_login_hint() {
        let err = explain(ClientError::Unauthorized {
            login_path: "/login".into(),
        });
        assert!(err.to_string().contains("FORMFLOW_TOKEN"));
        assert!(err.to_string().contains("/login"));

        let other = explain(ClientError::MissingResponseId);
        assert_eq!(
            other.to_string(),
            "response body did not include the created record id"
        );
    }

    #[test]
    fn api_base_follows_host_tenant() {
        let config = ClientConfig::from_toml_str(
            r#"
default_api_base = "https://api.example.com/"

[tenants]
acme = "https://acme.api.example.com/"
"#,
        )
        .unwrap();
        let session = Session::new("t");

        let default = api_for(&config, &session, None).unwrap();
        assert_eq!(default.base_url().as_str(), "https://api.example.com/");
        let tenant = api_for(&config, &session, Some("acme.forms.example.com")).unwrap();
        assert_eq!(tenant.base_url().as_str(), "https://acme.api.example.com/");
        assert!(api_for(&ClientConfig::default(), &session, None).is_err());
    }
}
