//! Classifies the URL the sign-in redirect landed on.
//!
//! After `/login` completes in the browser, the API sends the user back to the
//! application root with either `success=true&token=<base64>` or
//! `error=<reason>`. The terminal client receives that URL from the command
//! line or from the paste prompt and treats it as a page load.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use reqwest::Url;
use tracing::{debug, info, warn};

use crate::errors::TokenDecodeError;
use crate::session::{AuthStatus, Credential};

const LENIENT_PADDING: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT_PADDING);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT_PADDING);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectOutcome {
    Authenticated(Credential),
    DecodeFailed(TokenDecodeError),
    AuthError {
        error: String,
        reason: Option<String>,
    },
    Anonymous,
}

impl RedirectOutcome {
    pub fn auth_status(&self) -> AuthStatus {
        match self {
            RedirectOutcome::Authenticated(_) => AuthStatus::Authenticated,
            RedirectOutcome::DecodeFailed(_) => AuthStatus::DecodeFailed,
            RedirectOutcome::AuthError { error, reason } => match reason {
                Some(reason) => AuthStatus::Failed(format!("{} ({})", error, reason)),
                None => AuthStatus::Failed(error.clone()),
            },
            RedirectOutcome::Anonymous => AuthStatus::NotAuthenticated,
        }
    }

    /// Whether the redirect parameters were consumed and must be stripped.
    pub fn consumes_query(&self) -> bool {
        !matches!(self, RedirectOutcome::Anonymous)
    }
}

/// The client's notion of "the current page URL".
#[derive(Debug, Clone)]
pub struct Location {
    current: Url,
}

impl Location {
    pub fn new(current: Url) -> Self {
        Self { current }
    }

    pub fn current(&self) -> &Url {
        &self.current
    }

    /// Drops the query string in place, leaving scheme, host and path.
    pub fn replace_state(&mut self) {
        self.current.set_query(None);
        self.current.set_fragment(None);
    }
}

pub fn parse_redirect(url: &Url) -> RedirectOutcome {
    let mut success = None;
    let mut token = None;
    let mut error = None;
    let mut reason = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "success" => success = Some(value.into_owned()),
            "token" => token = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "reason" => reason = Some(value.into_owned()),
            _ => {}
        }
    }

    if success.as_deref() == Some("true")
        && let Some(token) = token.filter(|t| !t.is_empty())
    {
        return match decode_token(&token) {
            Ok(credential) => RedirectOutcome::Authenticated(credential),
            Err(e) => RedirectOutcome::DecodeFailed(e),
        };
    }

    match error.filter(|e| !e.is_empty()) {
        Some(error) => RedirectOutcome::AuthError {
            error,
            reason: reason.filter(|r| !r.is_empty()),
        },
        None => RedirectOutcome::Anonymous,
    }
}

/// Parses the redirect parameters of `location` and strips them when consumed.
pub fn load_page(location: &mut Location) -> RedirectOutcome {
    let outcome = parse_redirect(location.current());

    match &outcome {
        RedirectOutcome::Authenticated(_) => info!("Sign-in redirect carried a valid token"),
        RedirectOutcome::DecodeFailed(e) => warn!(error = %e, "Sign-in token could not be decoded"),
        RedirectOutcome::AuthError { error, .. } => {
            warn!(auth_error = %error, "Sign-in redirect reported an error")
        }
        RedirectOutcome::Anonymous => debug!("No sign-in parameters on page load"),
    }

    if outcome.consumes_query() {
        location.replace_state();
    }

    outcome
}

pub fn decode_token(raw: &str) -> Result<Credential, TokenDecodeError> {
    // Form decoding turns '+' into ' '; base64 never contains spaces.
    let cleaned = raw.trim().replace(' ', "+");

    let bytes = STANDARD_LENIENT
        .decode(&cleaned)
        .or_else(|_| URL_SAFE_LENIENT.decode(&cleaned))
        .map_err(|_| TokenDecodeError::InvalidBase64)?;

    let token = String::from_utf8(bytes).map_err(|_| TokenDecodeError::InvalidUtf8)?;
    if token.is_empty() {
        return Err(TokenDecodeError::Empty);
    }

    Ok(Credential::new(token))
}
