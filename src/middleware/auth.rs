use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::RwLock,
};

use crate::{
    models::user::{User, UserRole},
    utils::{errors::AppError, jwt::read_claims},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

/// Persistence for the access/refresh pair.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Option<AuthTokens>;
    fn save(&self, tokens: &AuthTokens) -> Result<(), AppError>;
    fn clear(&self) -> Result<(), AppError>;
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<Option<AuthTokens>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: AuthTokens) -> Self {
        Self {
            tokens: RwLock::new(Some(tokens)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<AuthTokens> {
        self.tokens.read().ok().and_then(|tokens| tokens.clone())
    }

    fn save(&self, tokens: &AuthTokens) -> Result<(), AppError> {
        let mut guard = self
            .tokens
            .write()
            .map_err(|_| AppError::Storage("token lock poisoned".to_string()))?;
        *guard = Some(tokens.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), AppError> {
        let mut guard = self
            .tokens
            .write()
            .map_err(|_| AppError::Storage("token lock poisoned".to_string()))?;
        *guard = None;
        Ok(())
    }
}

/// JSON file holding the tokens between CLI runs.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<AuthTokens> {
        let content = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&content) {
            Ok(tokens) => Some(tokens),
            Err(e) => {
                tracing::warn!("Ignoring unreadable token file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn save(&self, tokens: &AuthTokens) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(tokens)?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        // Owner-only: the file holds a refresh token.
        #[cfg(unix)]
        std::os::unix::fs::OpenOptionsExt::mode(&mut options, 0o600);

        let mut file = options.open(&self.path)?;
        // `mode` only applies on creation; tighten files left by older runs.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    fn clear(&self) -> Result<(), AppError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Identity of the signed-in user, taken from the access token claims or,
/// failing that, from the user record returned at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
    pub role: UserRole,
}

impl AuthUser {
    pub fn from_tokens(tokens: &AuthTokens) -> Option<Self> {
        let claims = read_claims(&tokens.access).ok();

        let user_id = claims
            .as_ref()
            .map(|c| c.user_id)
            .or_else(|| tokens.user.as_ref().map(|u| u.id))?;
        let role = claims
            .as_ref()
            .and_then(|c| c.role.as_deref())
            .and_then(UserRole::parse)
            .or_else(|| tokens.user.as_ref().map(|u| u.role))?;

        Some(Self { user_id, role })
    }

    pub fn role_str(&self) -> &'static str {
        self.role.as_str()
    }
}

pub fn with_bearer(request: RequestBuilder, tokens: Option<&AuthTokens>) -> RequestBuilder {
    match tokens {
        Some(tokens) => request.bearer_auth(&tokens.access),
        None => request,
    }
}
