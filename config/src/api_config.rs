use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Serde helpers for reading a plain string into a [`SecretString`].
mod secret_string {
    use secrecy::SecretString;
    use serde::{
        Deserialize as _,
        Deserializer,
    };

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(SecretString::new(s.into()))
    }
}

/// Connection settings for the OpenAIRE graph API and its token endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct ApiConfig {
    pub base_url: Url,
    pub auth_url: Url,
    #[serde(default)]
    pub client_id: String,
    #[serde(default = "empty_secret", deserialize_with = "secret_string::deserialize")]
    pub client_secret: SecretString,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn empty_secret() -> SecretString {
    SecretString::new(String::new().into())
}

fn default_timeout_secs() -> u64 {
    30
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The base URL with a trailing slash so that endpoint names can be joined onto it.
    pub fn normalized_base_url(&self) -> Url {
        let mut url = self.base_url.clone();
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        url
    }
}
