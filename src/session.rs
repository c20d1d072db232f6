use crate::error::AuthError;
use crate::models::Credentials;
use crate::service::Authenticator;
use std::path::{Path, PathBuf};

/// Where login credentials come from. A credentials file wins over an
/// explicit email and password.
#[derive(Debug, Clone, Default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub credentials_path: Option<PathBuf>,
}

impl LoginRequest {
    pub fn credentials(&self) -> Result<Credentials, AuthError> {
        if let Some(path) = &self.credentials_path {
            return load_credentials(path);
        }

        match (self.email.as_deref(), self.password.as_deref()) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => Ok(Credentials {
                email: email.to_owned(),
                password: password.to_owned(),
            }),
            _ => Err(AuthError::MissingCredentials),
        }
    }

    /// An email without a password or credentials file to go with it.
    pub fn needs_password(&self) -> bool {
        self.credentials_path.is_none()
            && self.password.as_deref().map_or(true, str::is_empty)
            && self.email.as_deref().map_or(false, |email| !email.is_empty())
    }
}

pub fn load_credentials(path: &Path) -> Result<Credentials, AuthError> {
    log::debug!("Loading credentials from {:?}", path);

    let malformed = |reason: String| AuthError::MalformedCredentials {
        path: path.to_path_buf(),
        reason,
    };

    let contents = std::fs::read_to_string(path).map_err(|e| malformed(e.to_string()))?;
    let credentials: Credentials = serde_json::from_str(&contents).map_err(|e| malformed(e.to_string()))?;

    if credentials.email.is_empty() || credentials.password.is_empty() {
        return Err(malformed(String::from("email and password must not be empty")));
    }

    Ok(credentials)
}

/// In-memory login state of one facade.
#[derive(Debug, Default)]
pub struct Session {
    current: Option<Credentials>,
}

impl Session {
    pub fn is_logged_in(&self) -> bool {
        self.current.is_some()
    }

    pub fn email(&self) -> Option<&str> {
        self.current.as_ref().map(|c| c.email.as_str())
    }

    pub fn require(&self) -> Result<(), AuthError> {
        if self.is_logged_in() {
            Ok(())
        } else {
            Err(AuthError::NotLoggedIn)
        }
    }

    /// Logs in through `service`. Any failure leaves the session logged out.
    /// Logging in again with the credentials of the current session does
    /// not reach the service.
    pub async fn login<A>(&mut self, service: &A, request: &LoginRequest) -> Result<(), AuthError>
    where
        A: Authenticator + ?Sized,
    {
        let credentials = match request.credentials() {
            Ok(credentials) => credentials,
            Err(e) => {
                self.current = None;
                return Err(e);
            }
        };

        if self.current.as_ref() == Some(&credentials) {
            log::debug!("Already logged in as {}", credentials.email);
            return Ok(());
        }

        self.current = None;

        service.login(&credentials).await?;

        log::info!("Logged in as {}", credentials.email);
        self.current = Some(credentials);

        Ok(())
    }
}
