use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fs;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::models::SessionCapabilities;

/// JWT service sealing session capabilities into RS256 tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    session_expiry_minutes: i64,
}

/// Claims carried by a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (principal ID)
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Permission tags; `*` for superadmin
    #[serde(default)]
    pub perm: Vec<String>,
    /// Resource-scope tags
    #[serde(default)]
    pub site: Vec<String>,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl SessionClaims {
    pub fn into_capabilities(self) -> Result<SessionCapabilities, anyhow::Error> {
        let principal_id = Uuid::parse_str(&self.sub)
            .map_err(|e| anyhow::anyhow!("Invalid subject in session token: {}", e))?;
        Ok(SessionCapabilities {
            principal_id,
            role: self.role,
            permissions: self.perm.into_iter().collect(),
            resource_scopes: self.site.into_iter().collect(),
        })
    }
}

/// Token response returned to client
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SessionToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl JwtService {
    /// Create a new JWT service by loading RSA keys from files
    pub fn new(config: &JwtConfig) -> Result<Self, anyhow::Error> {
        let private_key_pem = fs::read_to_string(&config.private_key_path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read private key from {}: {}",
                config.private_key_path,
                e
            )
        })?;

        let public_key_pem = fs::read_to_string(&config.public_key_path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read public key from {}: {}",
                config.public_key_path,
                e
            )
        })?;

        let service = Self::from_pem(&private_key_pem, &public_key_pem, config.session_expiry_minutes)?;
        tracing::info!("JWT service initialized with RS256 keys");
        Ok(service)
    }

    pub fn from_pem(private_key_pem: &str, public_key_pem: &str, session_expiry_minutes: i64) -> Result<Self, anyhow::Error> {
        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(|e| anyhow::anyhow!("Failed to parse private key: {}", e))?;

        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| anyhow::anyhow!("Failed to parse public key: {}", e))?;

        Ok(Self {
            encoding_key,
            decoding_key,
            session_expiry_minutes,
        })
    }

    /// Issue a session token for a capability set
    pub fn issue_session_token(&self, caps: &SessionCapabilities) -> Result<SessionToken, anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::minutes(self.session_expiry_minutes);

        let claims = SessionClaims {
            sub: caps.principal_id.to_string(),
            role: caps.role.clone(),
            perm: caps.permissions.iter().cloned().collect(),
            site: caps.resource_scopes.iter().cloned().collect(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let header = Header::new(Algorithm::RS256);
        let token = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode session token: {}", e))?;

        Ok(SessionToken {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: self.session_expiry_seconds(),
        })
    }

    /// Validate and decode a session token
    pub fn validate_session_token(&self, token: &str) -> Result<SessionClaims, anyhow::Error> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;

        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| anyhow::anyhow!("Invalid session token: {}", e))?;

        Ok(token_data.claims)
    }

    /// Validate a token and recover its capability set
    pub fn session_capabilities(&self, token: &str) -> Result<SessionCapabilities, anyhow::Error> {
        self.validate_session_token(token)?.into_capabilities()
    }

    pub fn session_expiry_seconds(&self) -> i64 {
        self.session_expiry_minutes * 60
    }
}
