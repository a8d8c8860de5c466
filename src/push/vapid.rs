use base64::{URL_SAFE_NO_PAD, encode_config};
use jwt_simple::prelude::ES256KeyPair;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use crate::config;
use crate::types::push::VapidConfig;

pub const PRIVATE_KEY_ENV: &str = "OFFLINE_SHELL_VAPID_PRIVATE_KEY";
pub const PUBLIC_KEY_ENV: &str = "OFFLINE_SHELL_VAPID_PUBLIC_KEY";
pub const SUBJECT_ENV: &str = "OFFLINE_SHELL_VAPID_SUBJECT";

/// An ES256 key pair, both halves URL-safe base64 without padding.
#[derive(Debug, Clone)]
pub struct VapidCredentials {
    pub private_key: String,
    pub public_key: String,
}

impl VapidCredentials {
    pub fn generate() -> Result<Self, web_push::WebPushError> {
        Self::generate_with_rng(&mut OsRng)
    }

    pub(crate) fn generate_with_rng<R: RngCore + CryptoRng>(
        rng: &mut R,
    ) -> Result<Self, web_push::WebPushError> {
        let private_key = encode_config(random_key_pair(rng).to_bytes(), URL_SAFE_NO_PAD);
        let public_key = derive_public_key(&private_key)?;
        Ok(Self {
            private_key,
            public_key,
        })
    }

    /// Lines for an env file, in the order the front reads them.
    pub fn env_lines(&self, subject: &str) -> [String; 3] {
        [
            format!("{PRIVATE_KEY_ENV}=\"{}\"", self.private_key),
            format!("{PUBLIC_KEY_ENV}=\"{}\"", self.public_key),
            format!("{SUBJECT_ENV}=\"{subject}\""),
        ]
    }
}

#[derive(Debug, Clone)]
pub enum VapidConfigStatus {
    Missing,
    /// Names of the settings still unset.
    Incomplete(Vec<&'static str>),
    /// All settings present but unusable together.
    Invalid(String),
    Ready(VapidConfig),
}

/// Blank values count as unset. A public key that does not belong to the
/// private key is rejected here, since pages would subscribe with a key the
/// sender cannot sign for.
pub fn load_vapid_config(config: &config::AppConfig) -> VapidConfigStatus {
    let settings = [
        (PRIVATE_KEY_ENV, setting(&config.vapid_private_key)),
        (PUBLIC_KEY_ENV, setting(&config.vapid_public_key)),
        (SUBJECT_ENV, setting(&config.vapid_subject)),
    ];
    let missing: Vec<&'static str> = settings
        .iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| *name)
        .collect();
    if missing.len() == settings.len() {
        return VapidConfigStatus::Missing;
    }
    let [
        (_, Some(private_key)),
        (_, Some(public_key)),
        (_, Some(subject)),
    ] = settings
    else {
        return VapidConfigStatus::Incomplete(missing);
    };

    match derive_public_key(&private_key) {
        Ok(derived) if derived == public_key => VapidConfigStatus::Ready(VapidConfig {
            private_key,
            public_key,
            subject,
        }),
        Ok(_) => VapidConfigStatus::Invalid(format!(
            "{PUBLIC_KEY_ENV} does not belong to {PRIVATE_KEY_ENV}"
        )),
        Err(err) => {
            VapidConfigStatus::Invalid(format!("{PRIVATE_KEY_ENV} is not a usable key: {err}"))
        }
    }
}

fn setting(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn derive_public_key(private_key: &str) -> Result<String, web_push::WebPushError> {
    let public_key =
        web_push::VapidSignatureBuilder::from_base64_no_sub(private_key, URL_SAFE_NO_PAD)?
            .get_public_key();
    Ok(encode_config(public_key, URL_SAFE_NO_PAD))
}

/// Not every 32-byte string is a valid P-256 scalar; draw until one is.
fn random_key_pair<R: RngCore + CryptoRng>(rng: &mut R) -> ES256KeyPair {
    let mut key_bytes = [0u8; 32];
    loop {
        rng.fill_bytes(&mut key_bytes);
        if let Ok(key_pair) = ES256KeyPair::from_bytes(&key_bytes) {
            return key_pair;
        }
    }
}
