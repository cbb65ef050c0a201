use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const EXTERNAL_ACCOUNT_TYPE: &str = "external_account";
pub const AUDIENCE: &str = "replit";
pub const SUBJECT_TOKEN_TYPE: &str = "access_token";
pub const SUBJECT_TOKEN_FIELD_NAME: &str = "access_token";

/// Credentials descriptor in the `external_account` format understood by `gcloud-auth`.
///
/// The subject token is read from the sidecar's credential endpoint and exchanged for an
/// access token at the sidecar's token endpoint. Nothing here talks to the network itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalAccountCredentials {
    #[serde(rename = "type")]
    pub tp: String,
    pub audience: String,
    pub subject_token_type: String,
    pub token_url: String,
    pub credential_source: CredentialSource,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSource {
    pub url: String,
    /// Always serialized, `gcloud-auth` refuses url sources without headers.
    pub headers: HashMap<String, String>,
    pub format: Format,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Format {
    #[serde(rename = "type")]
    pub tp: String,
    pub subject_token_field_name: String,
}

impl ExternalAccountCredentials {
    pub fn new(credential_url: impl Into<String>, token_url: impl Into<String>) -> Self {
        Self {
            tp: EXTERNAL_ACCOUNT_TYPE.to_string(),
            audience: AUDIENCE.to_string(),
            subject_token_type: SUBJECT_TOKEN_TYPE.to_string(),
            token_url: token_url.into(),
            credential_source: CredentialSource {
                url: credential_url.into(),
                headers: HashMap::new(),
                format: Format {
                    tp: "json".to_string(),
                    subject_token_field_name: SUBJECT_TOKEN_FIELD_NAME.to_string(),
                },
            },
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use crate::Sidecar;

    #[test]
    fn test_credentials_json() {
        let credentials = Sidecar::new("http://0.0.0.0:1106").credentials();
        let value: Value = serde_json::from_str(&credentials.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "external_account",
                "audience": "replit",
                "subject_token_type": "access_token",
                "token_url": "http://0.0.0.0:1106/token",
                "credential_source": {
                    "url": "http://0.0.0.0:1106/credential",
                    "headers": {},
                    "format": {
                        "type": "json",
                        "subject_token_field_name": "access_token"
                    }
                }
            })
        );
    }
}
