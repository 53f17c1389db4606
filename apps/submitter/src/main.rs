//! Fieldloom session submitter.
//!
//! Replays one recorded edit session against the live reference data and
//! submits the reconciled payload once.

#![forbid(unsafe_code)]

mod session_draft;

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use fieldloom_application::{FieldSchemaGateway, RoleEditorService, StepFormEditorService};
use fieldloom_core::{AppError, AppResult};
use fieldloom_infrastructure::{
    ApiClient, HttpFieldSchemaGateway, HttpRoleManagementGateway, HttpStepFormGateway,
    InMemoryFieldSchemaGateway,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::session_draft::{RoleSessionDraft, StepFormSessionDraft};

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionKind {
    Role,
    StepForm,
}

impl SessionKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Role => "role",
            Self::StepForm => "step_form",
        }
    }
}

impl FromStr for SessionKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "role" => Ok(Self::Role),
            "step_form" | "step-form" => Ok(Self::StepForm),
            other => Err(AppError::Validation(format!(
                "unknown session kind '{other}', expected 'role' or 'step_form'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
struct SubmitterConfig {
    api_base_url: String,
    api_token: Option<String>,
    http_timeout_secs: u64,
    session_kind: SessionKind,
    session_file: PathBuf,
    schema_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = SubmitterConfig::load()?;
    let client = ApiClient::new(
        config.api_base_url.as_str(),
        config.api_token.clone(),
        Duration::from_secs(config.http_timeout_secs),
    )?;

    info!(
        api_base_url = %config.api_base_url,
        session_kind = config.session_kind.as_str(),
        session_file = %config.session_file.display(),
        "fieldloom-submitter started"
    );

    let result = match config.session_kind {
        SessionKind::Role => submit_role(&config, client).await,
        SessionKind::StepForm => submit_step_form(&config, client).await,
    };

    if let Err(error) = &result {
        warn!(
            session_kind = config.session_kind.as_str(),
            error = %error,
            "session submit failed"
        );
    }
    result
}

async fn submit_role(config: &SubmitterConfig, client: ApiClient) -> AppResult<()> {
    let draft: RoleSessionDraft = read_json_file(config.session_file.as_path()).await?;
    let gateway = Arc::new(HttpRoleManagementGateway::new(client));
    let service = RoleEditorService::new(gateway.clone(), gateway);

    let mut session = service.open_session().await?;
    draft.apply(&mut session)?;
    let request = service.submit(&session, &draft.role).await?;

    info!(
        role_name = %request.name,
        permission_count = request.permissions.len(),
        "role created"
    );
    Ok(())
}

async fn submit_step_form(config: &SubmitterConfig, client: ApiClient) -> AppResult<()> {
    let draft: StepFormSessionDraft = read_json_file(config.session_file.as_path()).await?;
    let schema_gateway: Arc<dyn FieldSchemaGateway> = match &config.schema_file {
        Some(schema_file) => {
            let raw: Value = read_json_file(schema_file.as_path()).await?;
            Arc::new(InMemoryFieldSchemaGateway::from_value(raw)?)
        }
        None => Arc::new(HttpFieldSchemaGateway::new(client.clone())),
    };
    let service =
        StepFormEditorService::new(schema_gateway, Arc::new(HttpStepFormGateway::new(client)));

    let mut session = service.open_session(draft.step_id.as_str()).await?;
    draft.apply(&mut session)?;
    let fields = service.submit(&session).await?;

    info!(
        step_id = session.step_id(),
        field_count = fields.len(),
        "step form fields saved"
    );
    Ok(())
}

async fn read_json_file<T: DeserializeOwned>(path: &Path) -> AppResult<T> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|error| {
        AppError::Validation(format!("failed to read '{}': {error}", path.display()))
    })?;

    serde_json::from_str(contents.as_str()).map_err(|error| {
        AppError::Validation(format!("invalid JSON in '{}': {error}", path.display()))
    })
}

impl SubmitterConfig {
    fn load() -> AppResult<Self> {
        let api_base_url = parse_base_url(
            env::var("FIELDLOOM_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_owned())
                .as_str(),
        )?;
        let api_token = optional_env("FIELDLOOM_API_TOKEN");
        let http_timeout_secs = parse_env_u64("FIELDLOOM_HTTP_TIMEOUT_SECS", 15)?;
        let session_kind = required_env("FIELDLOOM_SESSION_KIND")?.parse::<SessionKind>()?;
        let session_file = PathBuf::from(required_env("FIELDLOOM_SESSION_FILE")?);
        let schema_file = optional_env("FIELDLOOM_SCHEMA_FILE").map(PathBuf::from);

        if http_timeout_secs == 0 {
            return Err(AppError::Validation(
                "FIELDLOOM_HTTP_TIMEOUT_SECS must be greater than zero".to_owned(),
            ));
        }

        if schema_file.is_some() && session_kind != SessionKind::StepForm {
            warn!("FIELDLOOM_SCHEMA_FILE is ignored for role sessions");
        }

        Ok(Self {
            api_base_url,
            api_token,
            http_timeout_secs,
            session_kind,
            session_file,
            schema_file,
        })
    }
}

fn parse_base_url(value: &str) -> AppResult<String> {
    let url = Url::parse(value.trim()).map_err(|error| {
        AppError::Validation(format!(
            "invalid FIELDLOOM_API_BASE_URL value '{value}': {error}"
        ))
    })?;

    Ok(url.as_str().trim_end_matches('/').to_owned())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> AppResult<String> {
    optional_env(name).ok_or_else(|| AppError::Validation(format!("{name} is required")))
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    match env::var(name) {
        Ok(value) => value.trim().parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::{SessionKind, parse_base_url};

    #[test]
    fn session_kind_parses_known_values() {
        assert_eq!("role".parse::<SessionKind>().ok(), Some(SessionKind::Role));
        assert_eq!(
            " step_form ".parse::<SessionKind>().ok(),
            Some(SessionKind::StepForm)
        );
        assert!("permissions".parse::<SessionKind>().is_err());
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        assert_eq!(
            parse_base_url("https://erp.example.com/api/").ok(),
            Some("https://erp.example.com/api".to_owned())
        );
        assert!(parse_base_url("erp.example.com").is_err());
    }
}
