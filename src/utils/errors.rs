use reqwest::StatusCode;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

use crate::services::interview_workflow::TransitionError;

const SESSION_EXPIRED: &str = "Session expirée, veuillez vous reconnecter";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation failed")]
    ValidationError(HashMap<String, Vec<String>>),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("Email ou mot de passe incorrect")]
    InvalidCredentials,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    UnsupportedMediaType(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("Erreur serveur: {0}")]
    InternalServerError(String),
    #[error("Erreur réseau: {0}")]
    Network(String),
    #[error("Timeout: {0}")]
    Timeout(String),
    #[error("Réponse invalide: {0}")]
    Decode(String),
    #[error("Stockage local: {0}")]
    Storage(String),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Coarse grouping used to pick the message shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Session,
    Authentication,
    Network,
    Timeout,
    Server,
    Permission,
    NotFound,
    Validation,
    File,
    Workflow,
    Unknown,
}

impl ErrorCategory {
    /// Substring matching on a raw message, for errors whose variant says
    /// nothing useful (backend `detail` strings, generic 4xx).
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();

        if lower.contains("session expirée") || lower.contains("session expiree") {
            ErrorCategory::Session
        } else if lower.contains("réseau") || lower.contains("reseau") || lower.contains("network")
        {
            ErrorCategory::Network
        } else if lower.contains("timeout") || lower.contains("délai") {
            ErrorCategory::Timeout
        } else if lower.contains("serveur") || lower.contains("server") {
            ErrorCategory::Server
        } else {
            ErrorCategory::Unknown
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ErrorCategory::Session => "Votre session a expiré. Veuillez vous reconnecter.",
            ErrorCategory::Authentication => "Email ou mot de passe incorrect.",
            ErrorCategory::Network => "Erreur réseau. Vérifiez votre connexion internet.",
            ErrorCategory::Timeout => {
                "Le serveur met trop de temps à répondre. Veuillez réessayer."
            }
            ErrorCategory::Server => "Erreur serveur. Veuillez réessayer plus tard.",
            ErrorCategory::Permission => {
                "Vous n'avez pas les droits nécessaires pour effectuer cette action."
            }
            ErrorCategory::NotFound => "Élément introuvable.",
            ErrorCategory::Validation => "Veuillez corriger les champs indiqués.",
            ErrorCategory::File => "Fichier invalide.",
            ErrorCategory::Workflow => "Cette action n'est pas possible dans l'état actuel.",
            ErrorCategory::Unknown => "Une erreur inattendue est survenue. Veuillez réessayer.",
        }
    }
}

impl AppError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::ValidationError(_) => ErrorCategory::Validation,
            AppError::Unauthorized(_) => ErrorCategory::Session,
            AppError::InvalidCredentials => ErrorCategory::Authentication,
            AppError::Forbidden(_) => ErrorCategory::Permission,
            AppError::NotFound(_) => ErrorCategory::NotFound,
            AppError::Network(_) => ErrorCategory::Network,
            AppError::Timeout(_) => ErrorCategory::Timeout,
            AppError::InternalServerError(_) => ErrorCategory::Server,
            AppError::UnsupportedMediaType(_) | AppError::PayloadTooLarge(_) => {
                ErrorCategory::File
            }
            AppError::Transition(_) => ErrorCategory::Workflow,
            other => ErrorCategory::classify(&other.to_string()),
        }
    }

    /// French message suitable for a toast description.
    pub fn user_message(&self) -> String {
        match self {
            AppError::UnsupportedMediaType(msg) | AppError::PayloadTooLarge(msg) => msg.clone(),
            AppError::Transition(err) => err.to_string(),
            AppError::ValidationError(errors) if errors.len() == 1 => errors
                .values()
                .flat_map(|messages| messages.first())
                .next()
                .cloned()
                .unwrap_or_else(|| ErrorCategory::Validation.message().to_string()),
            _ => self.category().message().to_string(),
        }
    }

    /// Builds an error from a non-success HTTP status and its raw body.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let message = parsed.as_ref().and_then(extract_message);

        match status {
            StatusCode::BAD_REQUEST => match parsed.as_ref().and_then(extract_field_errors) {
                Some(fields) if message.is_none() => AppError::ValidationError(fields),
                _ => AppError::BadRequest(message.unwrap_or_else(|| "Requête invalide".to_string())),
            },
            StatusCode::UNAUTHORIZED => {
                AppError::Unauthorized(message.unwrap_or_else(|| SESSION_EXPIRED.to_string()))
            }
            StatusCode::FORBIDDEN => {
                AppError::Forbidden(message.unwrap_or_else(|| "Accès refusé".to_string()))
            }
            StatusCode::NOT_FOUND => {
                AppError::NotFound(message.unwrap_or_else(|| "Ressource introuvable".to_string()))
            }
            StatusCode::CONFLICT => {
                AppError::Conflict(message.unwrap_or_else(|| "Conflit".to_string()))
            }
            StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge(
                message.unwrap_or_else(|| "Fichier trop volumineux".to_string()),
            ),
            StatusCode::UNSUPPORTED_MEDIA_TYPE => AppError::UnsupportedMediaType(
                message.unwrap_or_else(|| "Type de fichier non supporté".to_string()),
            ),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                AppError::Timeout(message.unwrap_or_else(|| status.to_string()))
            }
            s if s.is_server_error() => {
                AppError::InternalServerError(message.unwrap_or_else(|| s.to_string()))
            }
            s => AppError::BadRequest(message.unwrap_or_else(|| s.to_string())),
        }
    }

    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Self::from_status(status, &body)
    }

    pub fn session_expired() -> Self {
        AppError::Unauthorized(SESSION_EXPIRED.to_string())
    }

    pub fn field(field: &str, message: &str) -> Self {
        let mut errors = HashMap::new();
        errors.insert(field.to_string(), vec![message.to_string()]);
        AppError::ValidationError(errors)
    }
}

fn extract_message(value: &Value) -> Option<String> {
    ["detail", "error", "message"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

fn extract_field_errors(value: &Value) -> Option<HashMap<String, Vec<String>>> {
    let object = value.as_object()?;
    let mut errors = HashMap::new();

    for (field, messages) in object {
        let messages: Vec<String> = match messages {
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Value::String(msg) => vec![msg.clone()],
            _ => continue,
        };
        if !messages.is_empty() {
            errors.insert(field.clone(), messages);
        }
    }

    if errors.is_empty() {
        None
    } else {
        Some(errors)
    }
}

/// Flattens `validator` output into field → messages.
pub fn field_messages(errors: &validator::ValidationErrors) -> HashMap<String, Vec<String>> {
    let mut error_map = HashMap::new();

    for (field, field_errors) in errors.field_errors() {
        let messages: Vec<String> = field_errors
            .iter()
            .map(|error| {
                error
                    .message
                    .as_ref()
                    .map(|msg| msg.to_string())
                    .unwrap_or_else(|| format!("Valeur invalide pour le champ '{}'", field))
            })
            .collect();
        error_map.insert(field.to_string(), messages);
    }

    error_map
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::ValidationError(field_messages(&errors))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            AppError::Timeout(error.to_string())
        } else if error.is_decode() {
            AppError::Decode(error.to_string())
        } else if let Some(status) = error.status() {
            AppError::from_status(status, "")
        } else {
            AppError::Network(error.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        AppError::Decode(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        AppError::Storage(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_matches_french_substrings() {
        assert_eq!(
            ErrorCategory::classify("Session expirée, veuillez vous reconnecter"),
            ErrorCategory::Session
        );
        assert_eq!(
            ErrorCategory::classify("Erreur réseau inattendue"),
            ErrorCategory::Network
        );
        assert_eq!(ErrorCategory::classify("Request TIMEOUT"), ErrorCategory::Timeout);
        assert_eq!(
            ErrorCategory::classify("Erreur interne du serveur"),
            ErrorCategory::Server
        );
        assert_eq!(ErrorCategory::classify("quelque chose"), ErrorCategory::Unknown);
    }

    #[test]
    fn unauthorized_without_body_reads_as_expired_session() {
        let err = AppError::from_status(StatusCode::UNAUTHORIZED, "");
        assert!(matches!(err, AppError::Unauthorized(_)));
        assert_eq!(err.category(), ErrorCategory::Session);
        assert_eq!(err.user_message(), ErrorCategory::Session.message());
    }

    #[test]
    fn bad_request_with_field_map_becomes_validation_error() {
        let body = r#"{"email": ["Adresse email invalide"], "telephone": "Requis"}"#;
        match AppError::from_status(StatusCode::BAD_REQUEST, body) {
            AppError::ValidationError(fields) => {
                assert_eq!(fields["email"], vec!["Adresse email invalide".to_string()]);
                assert_eq!(fields["telephone"], vec!["Requis".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn bad_request_with_detail_keeps_message() {
        let err = AppError::from_status(StatusCode::BAD_REQUEST, r#"{"detail": "Erreur serveur"}"#);
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "Erreur serveur"));
        assert_eq!(err.category(), ErrorCategory::Server);
    }

    #[test]
    fn server_errors_and_gateway_timeouts() {
        let err = AppError::from_status(StatusCode::BAD_GATEWAY, "<html>");
        assert_eq!(err.category(), ErrorCategory::Server);

        let err = AppError::from_status(StatusCode::GATEWAY_TIMEOUT, "");
        assert_eq!(err.category(), ErrorCategory::Timeout);
    }

    #[test]
    fn single_field_validation_surfaces_its_message() {
        let err = AppError::field("suggested_date", "La date suggérée est requise");
        assert_eq!(err.user_message(), "La date suggérée est requise");
    }

    #[test]
    fn file_errors_keep_their_specific_message() {
        let err = AppError::PayloadTooLarge("Le fichier cv dépasse 10 Mo".to_string());
        assert_eq!(err.category(), ErrorCategory::File);
        assert_eq!(err.user_message(), "Le fichier cv dépasse 10 Mo");
    }
}
