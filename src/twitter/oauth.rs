//! OAuth 1.0a request signing (HMAC-SHA1).

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha1::Sha1;

use crate::config::Credentials;
use crate::error::{Error, Result};

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 unreserved characters stay as-is, everything else is escaped.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";
const NONCE_LEN: usize = 32;

/// Percent-encode a string as OAuth requires (RFC 3986 unreserved set)
pub fn percent_encode(s: &str) -> String {
    utf8_percent_encode(s, OAUTH_ENCODE_SET).to_string()
}

/// Signs requests on behalf of one user token.
#[derive(Clone)]
pub struct OAuthSigner {
    consumer_key: String,
    consumer_secret: String,
    token: String,
    token_secret: String,
}

impl std::fmt::Debug for OAuthSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthSigner").finish_non_exhaustive()
    }
}

impl OAuthSigner {
    pub fn new(credentials: &Credentials) -> Self {
        Self {
            consumer_key: credentials.consumer_key.clone(),
            consumer_secret: credentials.consumer_secret.clone(),
            token: credentials.access_token.clone(),
            token_secret: credentials.access_token_secret.clone(),
        }
    }

    /// Build the `Authorization` header value for a request.
    ///
    /// `params` are the query string and url-encoded form parameters of the
    /// request; multipart bodies must not be passed.
    pub fn authorization_header(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
    ) -> Result<String> {
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(NONCE_LEN)
            .map(char::from)
            .collect();
        let timestamp = chrono::Utc::now().timestamp().to_string();

        self.authorization_header_with(method, url, params, &nonce, &timestamp)
    }

    /// Deterministic variant of [`authorization_header`](Self::authorization_header).
    pub fn authorization_header_with(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
        nonce: &str,
        timestamp: &str,
    ) -> Result<String> {
        let oauth_params = self.oauth_params(nonce, timestamp);

        let mut all_params: Vec<(String, String)> = params.to_vec();
        all_params.extend(oauth_params.iter().cloned());
        let signature = self.signature(method, url, &all_params)?;

        let mut header_params = oauth_params;
        header_params.push(("oauth_signature".to_string(), signature));
        header_params.sort();

        let auth_string = header_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(format!("OAuth {}", auth_string))
    }

    fn oauth_params(&self, nonce: &str, timestamp: &str) -> Vec<(String, String)> {
        vec![
            ("oauth_consumer_key".to_string(), self.consumer_key.clone()),
            ("oauth_nonce".to_string(), nonce.to_string()),
            ("oauth_signature_method".to_string(), SIGNATURE_METHOD.to_string()),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
            ("oauth_token".to_string(), self.token.clone()),
            ("oauth_version".to_string(), OAUTH_VERSION.to_string()),
        ]
    }

    /// HMAC-SHA1 signature over the signature base string, base64 encoded.
    /// `params` must already contain the oauth_* parameters.
    pub fn signature(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
    ) -> Result<String> {
        let base_string = signature_base_string(method, url, params);
        let signing_key = format!(
            "{}&{}",
            percent_encode(&self.consumer_secret),
            percent_encode(&self.token_secret)
        );

        let mut mac = HmacSha1::new_from_slice(signing_key.as_bytes())
            .map_err(|e| Error::InvalidArgument(format!("Invalid signing key: {}", e)))?;
        mac.update(base_string.as_bytes());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }
}

/// Sorted, encoded `k=v&k=v` parameter string.
pub fn parameter_string(params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();

    encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// `METHOD&enc(base_url)&enc(parameter_string)`; query and fragment are
/// stripped from the url, their parameters belong in `params`.
pub fn signature_base_string(method: &str, url: &str, params: &[(String, String)]) -> String {
    let base_url = url.split(['?', '#']).next().unwrap_or(url);
    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(base_url),
        percent_encode(&parameter_string(params))
    )
}
