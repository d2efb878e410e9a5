use std::env;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use mathquest_core::model::{
    Level, LevelId, PlacementQuestion, QuestionRecord, QuizQuestion, SublevelId,
};

use super::{Backend, ProgressUpdate, QuizSubmission, SubmissionReceipt};
use crate::error::BackendError;

#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_token: Option<String>,
}

impl BackendConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: None,
        }
    }

    /// `MATHQUEST_API_URL` (required) and `MATHQUEST_API_TOKEN` (optional).
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("MATHQUEST_API_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        let api_token = env::var("MATHQUEST_API_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());
        Some(Self {
            base_url,
            api_token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// JSON-over-HTTP backend.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    config: Option<BackendConfig>,
}

impl HttpBackend {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(BackendConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<BackendConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    fn config(&self) -> Result<&BackendConfig, BackendError> {
        self.config.as_ref().ok_or(BackendError::Disabled)
    }

    fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, BackendError> {
        let config = self.config()?;
        Ok(match &config.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = self.authorize(request)?.send().await?;
        if !response.status().is_success() {
            return Err(BackendError::HttpStatus(response.status()));
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let url = self.config()?.url(path);
        let response = self.send(self.client.get(url)).await?;
        response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn fetch_levels(&self) -> Result<Vec<Level>, BackendError> {
        self.get_json("levels").await
    }

    async fn fetch_practice_questions(
        &self,
        level_id: LevelId,
        sublevel_id: SublevelId,
    ) -> Result<Vec<QuestionRecord>, BackendError> {
        self.get_json(&format!("levels/{level_id}/sublevels/{sublevel_id}/questions"))
            .await
    }

    async fn fetch_quiz_questions(
        &self,
        level_id: LevelId,
    ) -> Result<Vec<QuizQuestion>, BackendError> {
        self.get_json(&format!("levels/{level_id}/quiz")).await
    }

    async fn fetch_placement_questions(&self) -> Result<Vec<PlacementQuestion>, BackendError> {
        self.get_json("placement").await
    }

    async fn submit_quiz_result(
        &self,
        submission: &QuizSubmission,
    ) -> Result<SubmissionReceipt, BackendError> {
        let url = self.config()?.url("results");
        let response = self.send(self.client.post(url).json(submission)).await?;
        response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn update_learner_progress(&self, update: &ProgressUpdate) -> Result<(), BackendError> {
        let url = self
            .config()?
            .url(&format!("learners/{}/progress", update.learner_id));
        self.send(self.client.put(url).json(update)).await?;
        Ok(())
    }
}
