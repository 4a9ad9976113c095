//! Course catalog client.
//!
//! The catalog is the read-only source of truth for programs and courses.
//! Provisioning resolves the purchased program (and its course titles)
//! before writing anything, so an unknown program fails the request cleanly.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// A sellable program: a titled bundle of courses.
#[derive(Debug, Clone, Deserialize)]
pub struct Program {
    pub id: String,
    pub title: String,
    pub course_ids: Vec<String>,
}

/// A single course within a program.
#[derive(Debug, Clone, Deserialize)]
pub struct Course {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("program not found: {0}")]
    ProgramNotFound(String),
    #[error("course not found: {0}")]
    CourseNotFound(String),
    #[error("catalog request failed: {0}")]
    Request(String),
}

/// Read access to the course catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn get_program(&self, program_id: &str) -> Result<Program, CatalogError>;
    async fn get_course(&self, course_id: &str) -> Result<Course, CatalogError>;
}

/// Catalog client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpCatalog {
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, CatalogError> {
        let response = self
            .client
            .get(self.endpoint(path))
            .send()
            .await
            .map_err(|err| CatalogError::Request(err.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(CatalogError::Request(format!(
                "catalog returned {}",
                response.status()
            )));
        }

        let body = response
            .json::<T>()
            .await
            .map_err(|err| CatalogError::Request(format!("malformed catalog response: {err}")))?;
        Ok(Some(body))
    }
}

#[async_trait]
impl Catalog for HttpCatalog {
    async fn get_program(&self, program_id: &str) -> Result<Program, CatalogError> {
        self.fetch(&format!("v1/programs/{program_id}"))
            .await?
            .ok_or_else(|| CatalogError::ProgramNotFound(program_id.to_string()))
    }

    async fn get_course(&self, course_id: &str) -> Result<Course, CatalogError> {
        self.fetch(&format!("v1/courses/{course_id}"))
            .await?
            .ok_or_else(|| CatalogError::CourseNotFound(course_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn catalog(server: &MockServer) -> HttpCatalog {
        HttpCatalog::new(reqwest::Client::new(), Url::parse(&server.uri()).unwrap())
    }

    #[tokio::test]
    async fn test_get_program() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/programs/prog-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "prog-1",
                "title": "Barista Fundamentals",
                "course_ids": ["course-1", "course-2"]
            })))
            .mount(&server)
            .await;

        let program = catalog(&server).get_program("prog-1").await.unwrap();
        assert_eq!(program.title, "Barista Fundamentals");
        assert_eq!(program.course_ids.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_program_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/programs/prog-missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = catalog(&server)
            .get_program("prog-missing")
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::ProgramNotFound(id) if id == "prog-missing"));
    }

    #[tokio::test]
    async fn test_catalog_outage_is_request_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/courses/course-1"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = catalog(&server).get_course("course-1").await.unwrap_err();
        assert!(matches!(err, CatalogError::Request(_)));
    }
}
