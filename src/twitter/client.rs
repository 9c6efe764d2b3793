//! Signed Twitter REST and streaming client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::models::{
    MediaUpload, StatusUpdateParams, StreamFilterParams, Tweet, User, VerifyParams,
};
use super::oauth::OAuthSigner;
use super::stream::FilterStream;
use super::TwitterApi;
use crate::config::{Credentials, Endpoints};
use crate::error::{Error, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Media is sent in APPEND segments of at most this many bytes.
pub const UPLOAD_CHUNK_SIZE: usize = 1024 * 1024;

/// Authenticated Twitter client. Cheap to share behind an `Arc`; never
/// mutated after construction.
#[derive(Debug, Clone)]
pub struct TwitterClient {
    http: Client,
    signer: OAuthSigner,
    endpoints: Endpoints,
}

impl TwitterClient {
    /// Build the signed transport. No network call is made.
    pub fn new(credentials: &Credentials, endpoints: Endpoints) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::Authentication(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            signer: OAuthSigner::new(credentials),
            endpoints,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn url(base: &str, path: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), path)
    }

    /// Request builder carrying the OAuth header. `params` are the query or
    /// url-encoded form parameters that will be attached by the caller.
    fn signed(
        &self,
        method: Method,
        url: &str,
        params: &[(String, String)],
    ) -> Result<RequestBuilder> {
        let header = self.signer.authorization_header(method.as_str(), url, params)?;
        Ok(self.http.request(method, url).header(AUTHORIZATION, header))
    }

    /// Confirm the credentials are live and return the account they belong to.
    pub async fn verify_credentials(&self, params: &VerifyParams) -> Result<User> {
        let url = Self::url(&self.endpoints.api_base, "account/verify_credentials.json");
        let query = params.query();

        let response = self
            .signed(Method::GET, &url, &query)?
            .query(&query)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                Error::Authentication(format!("verify_credentials request failed: {}", e))
            })?;

        decode_json(response, Error::Authentication, "verify_credentials").await
    }

    /// Open the filtered real-time stream. The returned stream owns a
    /// background reader task.
    pub async fn filter_stream(&self, params: &StreamFilterParams) -> Result<FilterStream> {
        let url = Self::url(&self.endpoints.stream_base, "statuses/filter.json");
        let form = params.form();

        let response = self
            .signed(Method::POST, &url, &form)?
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::StreamOpen(format!("filter request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::StreamOpen(format!("Twitter API error {}: {}", status, text)));
        }

        info!(track = ?params.track, "Filtered stream connected");
        Ok(FilterStream::spawn(response.bytes_stream()))
    }

    async fn upload_init(
        &self,
        total_bytes: usize,
        media_type: &str,
        media_category: &str,
    ) -> Result<MediaUpload> {
        let url = Self::url(&self.endpoints.upload_base, "media/upload.json");
        let form = vec![
            ("command".to_string(), "INIT".to_string()),
            ("total_bytes".to_string(), total_bytes.to_string()),
            ("media_type".to_string(), media_type.to_string()),
            ("media_category".to_string(), media_category.to_string()),
        ];

        let response = self
            .signed(Method::POST, &url, &form)?
            .form(&form)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| Error::Upload(format!("INIT request failed: {}", e)))?;

        decode_json(response, Error::Upload, "media INIT").await
    }

    async fn upload_append(
        &self,
        media_id: &str,
        segment_index: usize,
        chunk: &[u8],
    ) -> Result<()> {
        let url = Self::url(&self.endpoints.upload_base, "media/upload.json");

        // multipart bodies are not part of the signature
        let form = Form::new()
            .text("command", "APPEND")
            .text("media_id", media_id.to_string())
            .text("segment_index", segment_index.to_string())
            .part("media", Part::bytes(chunk.to_vec()).file_name("media"));

        let response = self
            .signed(Method::POST, &url, &[])?
            .multipart(form)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| Error::Upload(format!("APPEND request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Upload(format!(
                "APPEND segment {} error {}: {}",
                segment_index, status, text
            )));
        }
        Ok(())
    }

    async fn upload_finalize(&self, media_id: &str) -> Result<MediaUpload> {
        let url = Self::url(&self.endpoints.upload_base, "media/upload.json");
        let form = vec![
            ("command".to_string(), "FINALIZE".to_string()),
            ("media_id".to_string(), media_id.to_string()),
        ];

        let response = self
            .signed(Method::POST, &url, &form)?
            .form(&form)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| Error::Upload(format!("FINALIZE request failed: {}", e)))?;

        decode_json(response, Error::Upload, "media FINALIZE").await
    }
}

#[async_trait]
impl TwitterApi for TwitterClient {
    async fn upload_media(
        &self,
        data: Vec<u8>,
        media_type: &str,
        media_category: &str,
    ) -> Result<MediaUpload> {
        if data.is_empty() {
            return Err(Error::Upload("media is empty".to_string()));
        }

        let init = self.upload_init(data.len(), media_type, media_category).await?;
        let media_id = if init.media_id_string.is_empty() {
            init.media_id.to_string()
        } else {
            init.media_id_string.clone()
        };
        debug!(%media_id, bytes = data.len(), "Media upload initialized");

        for (index, chunk) in data.chunks(UPLOAD_CHUNK_SIZE).enumerate() {
            self.upload_append(&media_id, index, chunk).await?;
        }

        let mut finalized = self.upload_finalize(&media_id).await?;
        if finalized.expires_after_secs.is_none() {
            finalized.expires_after_secs = init.expires_after_secs;
        }
        Ok(finalized)
    }

    async fn update_status(&self, status: &str, params: &StatusUpdateParams) -> Result<Tweet> {
        let url = Self::url(&self.endpoints.api_base, "statuses/update.json");
        let form = params.form(status);

        let response = self
            .signed(Method::POST, &url, &form)?
            .form(&form)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| Error::ReplySubmit(format!("statuses/update request failed: {}", e)))?;

        decode_json(response, Error::ReplySubmit, "statuses/update").await
    }
}

/// Build the client and verify the credentials against the API.
pub async fn authenticate(
    credentials: &Credentials,
    endpoints: Endpoints,
) -> Result<TwitterClient> {
    let client = TwitterClient::new(credentials, endpoints)?;
    let user = client.verify_credentials(&VerifyParams::default()).await?;
    info!(screen_name = %user.screen_name, id = user.id, "Twitter credentials verified");
    Ok(client)
}

async fn decode_json<T: DeserializeOwned>(
    response: Response,
    to_error: fn(String) -> Error,
    what: &str,
) -> Result<T> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| to_error(format!("Failed to read {} response: {}", what, e)))?;

    if !status.is_success() {
        return Err(to_error(format!("Twitter API error {}: {}", status, text)));
    }

    serde_json::from_str(&text)
        .map_err(|e| to_error(format!("Invalid {} response: {}", what, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::twitter::StreamMessage;
    use httpmock::prelude::*;
    use serde_json::json;

    fn test_client(server: &MockServer) -> TwitterClient {
        TwitterClient::new(
            &Credentials::new("ck", "cs", "at", "ats"),
            Endpoints::single(server.base_url()),
        )
        .unwrap()
    }

    fn user_json() -> serde_json::Value {
        json!({"id": 1, "id_str": "1", "screen_name": "caze_bot", "name": "Caze"})
    }

    #[tokio::test]
    async fn verify_credentials_returns_user() {
        let server = MockServer::start_async().await;
        let verify_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/account/verify_credentials.json")
                .query_param("include_email", "true")
                .query_param("skip_status", "true")
                .header_exists("authorization");
            then.status(200).json_body(user_json());
        });

        let user = test_client(&server)
            .verify_credentials(&VerifyParams::default())
            .await
            .unwrap();

        verify_mock.assert_calls(1);
        assert_eq!(user.screen_name, "caze_bot");
    }

    #[tokio::test]
    async fn verify_credentials_rejection_is_authentication_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/account/verify_credentials.json");
            then.status(401).body(r#"{"errors":[{"code":32,"message":"Could not authenticate you."}]}"#);
        });

        let err = test_client(&server)
            .verify_credentials(&VerifyParams::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Authentication(ref m) if m.contains("401")));
    }

    #[tokio::test]
    async fn authenticate_verifies_before_returning_client() {
        let server = MockServer::start_async().await;
        let verify_mock = server.mock(|when, then| {
            when.method(GET).path("/account/verify_credentials.json");
            then.status(200).json_body(user_json());
        });

        let client = authenticate(
            &Credentials::new("ck", "cs", "at", "ats"),
            Endpoints::single(server.base_url()),
        )
        .await
        .unwrap();

        verify_mock.assert_calls(1);
        assert_eq!(client.endpoints().api_base, server.base_url());
    }

    #[tokio::test]
    async fn authenticate_unreachable_host_fails() {
        // nothing listens on port 1
        let result = authenticate(
            &Credentials::new("", "", "", ""),
            Endpoints::single("http://127.0.0.1:1"),
        )
        .await;
        assert!(matches!(result, Err(Error::Authentication(_))));
    }

    #[tokio::test]
    async fn upload_media_runs_init_append_finalize() {
        let server = MockServer::start_async().await;
        let init_mock = server.mock(|when, then| {
            when.method(POST).path("/media/upload.json").is_true(|req| {
                let body = String::from_utf8_lossy(req.body().as_ref());
                body.contains("command=INIT")
                    && body.contains("total_bytes=4")
                    && body.contains("media_category=tweet_image")
            });
            then.status(202).json_body(json!({
                "media_id": 999,
                "media_id_string": "999",
                "expires_after_secs": 86400
            }));
        });
        let append_mock = server.mock(|when, then| {
            when.method(POST).path("/media/upload.json").is_true(|req| {
                let body = String::from_utf8_lossy(req.body().as_ref());
                body.contains("APPEND") && body.contains("name=\"media\"")
            });
            then.status(204);
        });
        let finalize_mock = server.mock(|when, then| {
            when.method(POST).path("/media/upload.json").is_true(|req| {
                let body = String::from_utf8_lossy(req.body().as_ref());
                body.contains("command=FINALIZE") && body.contains("media_id=999")
            });
            then.status(201).json_body(json!({
                "media_id": 999,
                "media_id_string": "999",
                "size": 4,
                "image": {"image_type": "image/jpeg", "w": 1, "h": 1}
            }));
        });

        let upload = test_client(&server)
            .upload_media(vec![0xff, 0xd8, 0xff, 0xe0], "image/jpeg", "tweet_image")
            .await
            .unwrap();

        init_mock.assert_calls(1);
        append_mock.assert_calls(1);
        finalize_mock.assert_calls(1);
        assert_eq!(upload.media_id, 999);
        // expiry from INIT is carried over when FINALIZE omits it
        assert_eq!(upload.expires_after_secs, Some(86400));
    }

    #[tokio::test]
    async fn upload_media_server_error_is_upload_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/media/upload.json");
            then.status(500).body("boom");
        });

        let err = test_client(&server)
            .upload_media(vec![1, 2, 3], "image/jpeg", "tweet_image")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upload(ref m) if m.contains("500")));
    }

    #[tokio::test]
    async fn upload_empty_media_is_rejected_locally() {
        let server = MockServer::start_async().await;
        let err = test_client(&server)
            .upload_media(Vec::new(), "image/jpeg", "tweet_image")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upload(_)));
    }

    #[tokio::test]
    async fn update_status_posts_reply_form() {
        let server = MockServer::start_async().await;
        let update_mock = server.mock(|when, then| {
            when.method(POST).path("/statuses/update.json").is_true(|req| {
                let body = String::from_utf8_lossy(req.body().as_ref());
                body.contains("status=%40alice")
                    && body.contains("in_reply_to_status_id=12345")
                    && body.contains("media_ids=999")
            });
            then.status(200).json_body(json!({
                "id": 555,
                "id_str": "555",
                "text": "@alice",
                "in_reply_to_status_id": 12345,
                "user": user_json()
            }));
        });

        let params = StatusUpdateParams {
            in_reply_to_status_id: Some(12345),
            media_ids: vec![999],
        };
        let reply = test_client(&server)
            .update_status("@alice", &params)
            .await
            .unwrap();

        update_mock.assert_calls(1);
        assert_eq!(reply.id, 555);
        assert_eq!(reply.in_reply_to_status_id, Some(12345));
    }

    #[tokio::test]
    async fn update_status_invalid_json_is_reply_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/statuses/update.json");
            then.status(200).body("not-json");
        });

        let err = test_client(&server)
            .update_status("@alice", &StatusUpdateParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ReplySubmit(_)));
    }

    #[tokio::test]
    async fn filter_stream_delivers_messages() {
        let server = MockServer::start_async().await;
        let filter_mock = server.mock(|when, then| {
            when.method(POST).path("/statuses/filter.json").is_true(|req| {
                let body = String::from_utf8_lossy(req.body().as_ref());
                body.contains("track=%40caze_bot") && body.contains("stall_warnings=true")
            });
            then.status(200).body(
                "\r\n{\"id\":1,\"id_str\":\"1\",\"text\":\"@caze_bot hi\",\"user\":{\"id\":2,\"screen_name\":\"alice\"}}\r\n",
            );
        });

        let params = StreamFilterParams {
            track: vec!["@caze_bot".into()],
            stall_warnings: true,
        };
        let mut stream = test_client(&server).filter_stream(&params).await.unwrap();
        let mut messages = stream.take_messages().unwrap();

        let first = messages.recv().await.unwrap();
        assert!(matches!(first, StreamMessage::Tweet(ref t) if t.author() == "alice"));
        // body ended, channel closes
        assert!(messages.recv().await.is_none());

        filter_mock.assert_calls(1);
        stream.stop().await;
    }

    #[tokio::test]
    async fn filter_stream_rejection_is_stream_open_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/statuses/filter.json");
            then.status(420).body("Enhance Your Calm");
        });

        let result = test_client(&server)
            .filter_stream(&StreamFilterParams::default())
            .await;
        assert!(matches!(result, Err(Error::StreamOpen(ref m)) if m.contains("420")));
    }
}
