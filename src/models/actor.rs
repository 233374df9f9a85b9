//! Identity of the caller, read from a bearer token issued elsewhere

use serde::{Deserialize, Serialize};

use super::device::Actor;

/// JWT claims accepted by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorClaims {
    /// Subject (user id in the issuing system)
    pub sub: String,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    pub exp: i64,
}

impl ActorClaims {
    /// Parse and verify a HS256 token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn actor(&self) -> Actor {
        Actor {
            id: Some(self.sub.clone()),
            name: self.name.clone().or_else(|| Some(self.sub.clone())),
        }
    }
}
