use arml_core::{Entity, EntityId, EntityKind, sort::SortState};
use log::{debug, warn};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    api::{ApiError, ApiResult, EntityApi},
    config::ClientConfig,
};

/// `EntityApi` over the backend's JSON REST endpoints.
#[derive(Clone)]
pub struct RestClient {
    http_url: String,
    http_client: reqwest::Client,
    token: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct ProblemResponse {
    title: Option<String>,
    detail: Option<String>,
    message: Option<String>,
}

impl RestClient {
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            http_url: config.base_url.trim_end_matches('/').to_string(),
            http_client,
            token: config.token.clone(),
        })
    }

    fn url(&self, kind: EntityKind, id: Option<EntityId>) -> String {
        match id {
            Some(id) => format!("{}/{}/{}", self.http_url, kind.endpoint(), id),
            None => format!("{}/{}", self.http_url, kind.endpoint()),
        }
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        debug!("REST request {} {}", method, url);
        let request = self.http_client.request(method, url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn with_body<E: Entity>(request: RequestBuilder, entity: &E) -> ApiResult<RequestBuilder> {
        let body = serde_json::to_string(entity)?;
        Ok(request
            .header("Content-Type", "application/json")
            .body(body))
    }

    async fn send(request: RequestBuilder) -> ApiResult<String> {
        let resp = request.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if status.is_success() {
            return Ok(text);
        }
        let message = problem_message(&text);
        warn!("Backend responded with {}: {}", status, message);
        Err(match status {
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            StatusCode::BAD_REQUEST => ApiError::BadRequest(message),
            other => ApiError::Server {
                status: other.as_u16(),
                message,
            },
        })
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> ApiResult<T> {
        let json = Self::send(request).await?;
        Ok(serde_json::from_str(&json)?)
    }
}

fn problem_message(body: &str) -> String {
    let problem: ProblemResponse = serde_json::from_str(body).unwrap_or_default();
    let parts: Vec<String> = [problem.title, problem.detail, problem.message]
        .into_iter()
        .flatten()
        .collect();
    if parts.is_empty() {
        body.trim().to_string()
    } else {
        parts.join(" - ")
    }
}

#[async_trait::async_trait]
impl<E: Entity> EntityApi<E> for RestClient {
    async fn list(&self, sort: Option<&SortState>) -> ApiResult<Vec<E>> {
        let mut request = self.request(Method::GET, self.url(E::KIND, None));
        if let Some(sort) = sort {
            request = request.query(&[("sort", sort.param())]);
        }
        Self::send_json(request).await
    }

    async fn get(&self, id: EntityId) -> ApiResult<E> {
        Self::send_json(self.request(Method::GET, self.url(E::KIND, Some(id)))).await
    }

    async fn create(&self, entity: &E) -> ApiResult<E> {
        let request = self.request(Method::POST, self.url(E::KIND, None));
        Self::send_json(Self::with_body(request, entity)?).await
    }

    async fn update(&self, entity: &E) -> ApiResult<E> {
        let Some(id) = entity.id() else {
            return Err(ApiError::BadRequest("Invalid id".to_string()));
        };
        let request = self.request(Method::PUT, self.url(E::KIND, Some(id)));
        Self::send_json(Self::with_body(request, entity)?).await
    }

    async fn delete(&self, id: EntityId) -> ApiResult<()> {
        Self::send(self.request(Method::DELETE, self.url(E::KIND, Some(id)))).await?;
        Ok(())
    }
}
