use crate::errors::ApiError;
use crate::logger::generate_request_id;
use crate::models::{
    AbTest, CreateTestRequest, CreateTestResponse, ServerErrorBody, TestsResponse, Video,
    VideosResponse,
};
use crate::session::Credential;
use reqwest::{Client, RequestBuilder, Response};
use std::time::{Duration, Instant};

pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("ytab-cli/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Where the user starts the OAuth redirect. The response is never read
    /// by this client; the browser follows it.
    pub fn login_url(&self) -> String {
        format!("{}/login", self.base_url)
    }

    /// Unauthenticated liveness check against the API root.
    pub async fn probe(&self) -> Result<serde_json::Value, ApiError> {
        let url = format!("{}/", self.base_url);
        let response = self.send("GET", &url, self.client.get(&url)).await?;
        response
            .json::<serde_json::Value>()
            .await
            .map_err(ApiError::from)
    }

    pub async fn list_videos(&self, credential: &Credential) -> Result<Vec<Video>, ApiError> {
        let url = format!("{}/videos", self.base_url);
        let request = authorized(self.client.get(&url), credential);
        let response = self.send("GET", &url, request).await?;

        let videos_response: VideosResponse = response
            .json()
            .await
            .map_err(ApiError::from)?;
        Ok(videos_response.videos)
    }

    pub async fn list_tests(&self, credential: &Credential) -> Result<Vec<AbTest>, ApiError> {
        let url = format!("{}/tests", self.base_url);
        let request = authorized(self.client.get(&url), credential);
        let response = self.send("GET", &url, request).await?;

        let tests_response: TestsResponse = response
            .json()
            .await
            .map_err(ApiError::from)?;
        Ok(tests_response.into_tests())
    }

    /// Creates a test. The created test is returned when the server echoes it
    /// back; callers refresh the list either way.
    pub async fn create_test(
        &self,
        credential: &Credential,
        payload: &CreateTestRequest,
    ) -> Result<Option<AbTest>, ApiError> {
        let url = format!("{}/tests", self.base_url);
        let request = authorized(self.client.post(&url), credential).json(payload);
        let response = self.send("POST", &url, request).await?;

        let body = response.text().await.map_err(ApiError::from)?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        Ok(serde_json::from_str::<CreateTestResponse>(&body)
            .ok()
            .map(CreateTestResponse::into_test))
    }

    async fn send(
        &self,
        method: &str,
        url: &str,
        request: RequestBuilder,
    ) -> Result<Response, ApiError> {
        let request_id = generate_request_id();
        let started = Instant::now();
        crate::log_api_request!(method, url, request_id.as_str());

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let err = ApiError::from(e);
                crate::log_api_error!(
                    request_id.as_str(),
                    err,
                    started.elapsed().as_millis() as u64
                );
                return Err(err);
            }
        };

        let status = response.status();
        crate::log_api_response!(
            request_id.as_str(),
            status.as_u16(),
            started.elapsed().as_millis() as u64
        );

        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ServerErrorBody>()
            .await
            .ok()
            .and_then(ServerErrorBody::into_message);

        let err = ApiError::Status {
            status: status.as_u16(),
            message,
        };
        crate::log_api_error!(
            request_id.as_str(),
            err,
            started.elapsed().as_millis() as u64
        );
        Err(err)
    }
}

fn authorized(request: RequestBuilder, credential: &Credential) -> RequestBuilder {
    request.bearer_auth(credential.as_str())
}
