use std::fmt;

/// Bearer credential for the connected YouTube account. Lives in memory only.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading characters for on-screen confirmation, never the full token.
    pub fn preview(&self) -> String {
        let head: String = self.0.chars().take(20).collect();
        format!("{}...", head)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    NotAuthenticated,
    Authenticated,
    DecodeFailed,
    Failed(String),
}

impl AuthStatus {
    pub fn message(&self) -> String {
        match self {
            AuthStatus::NotAuthenticated => "Not authenticated".to_string(),
            AuthStatus::Authenticated => "Successfully authenticated with YouTube!".to_string(),
            AuthStatus::DecodeFailed => {
                "Authentication successful but token decode failed".to_string()
            }
            AuthStatus::Failed(reason) => format!("Authentication failed: {}", reason),
        }
    }
}

#[derive(Debug)]
pub struct Session {
    credential: Option<Credential>,
    status: AuthStatus,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            credential: None,
            status: AuthStatus::NotAuthenticated,
        }
    }
}

impl Session {
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn status(&self) -> &AuthStatus {
        &self.status
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }

    pub fn sign_in(&mut self, credential: Credential) {
        self.credential = Some(credential);
        self.status = AuthStatus::Authenticated;
    }

    /// Records a failed or absent sign-in. Any previous credential is dropped.
    pub fn reject(&mut self, status: AuthStatus) {
        self.credential = None;
        self.status = status;
    }

    pub fn clear(&mut self) {
        *self = Session::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_anonymous() {
        let session = Session::default();
        assert!(!session.is_authenticated());
        assert_eq!(session.status(), &AuthStatus::NotAuthenticated);
    }

    #[test]
    fn test_sign_in_then_clear() {
        let mut session = Session::default();
        session.sign_in(Credential::new("abc123"));
        assert!(session.is_authenticated());
        assert_eq!(session.credential().map(Credential::as_str), Some("abc123"));

        session.clear();
        assert!(session.credential().is_none());
        assert_eq!(session.status(), &AuthStatus::NotAuthenticated);
    }

    #[test]
    fn test_reject_drops_credential() {
        let mut session = Session::default();
        session.sign_in(Credential::new("abc123"));
        session.reject(AuthStatus::Failed("access_denied".to_string()));
        assert!(!session.is_authenticated());
        assert_eq!(
            session.status().message(),
            "Authentication failed: access_denied"
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let credential = Credential::new("super-secret-token");
        assert!(!format!("{:?}", credential).contains("super-secret"));
    }

    #[test]
    fn test_preview_truncates() {
        let credential = Credential::new("ya29.a0AfH6SMBxxxxxxxxxxxxxxxxxxxx");
        assert_eq!(credential.preview(), "ya29.a0AfH6SMBxxxxxx...");
    }
}
