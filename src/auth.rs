use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, InvalidHeaderValue};

/// Credentials attached to every request a client sends.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Credential {
    #[default]
    None,
    Basic {
        username: String,
        password: String,
    },
    Token(String),
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::None => f.write_str("None"),
            Credential::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Credential::Token(_) => f.write_str("Token(***)"),
        }
    }
}

impl Credential {
    pub fn headers(&self) -> Result<HeaderMap, InvalidHeaderValue> {
        let mut headers = HeaderMap::new();
        let value = match self {
            Credential::None => return Ok(headers),
            Credential::Basic { username, password } => {
                let encoded = STANDARD.encode(format!("{}:{}", username, password));
                format!("Basic {}", encoded)
            }
            Credential::Token(token) => format!("Bearer {}", token.trim()),
        };
        let mut value = HeaderValue::from_str(&value)?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }
}
