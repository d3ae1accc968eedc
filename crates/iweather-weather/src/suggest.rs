//! Place autocomplete: suggest locations from partially typed text.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

use crate::error::GeocodeError;

/// One autocomplete candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSuggestion {
    pub description: String,
    pub place_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AutocompleteResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
    status: String,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    description: String,
    place_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PlacesClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PlacesClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, GeocodeError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Suggest locations matching `query`.
    ///
    /// Blank input short-circuits to an empty list without a request.
    #[instrument(skip(self), level = "info")]
    pub async fn suggest_locations(
        &self,
        query: &str,
    ) -> Result<Vec<LocationSuggestion>, GeocodeError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}?input={}&key={}",
            self.base_url,
            urlencoding::encode(query),
            urlencoding::encode(&self.api_key)
        );

        let response = self.client.get(&url).send().await.map_err(|e| {
            tracing::warn!("Autocomplete request failed: {}", e);
            GeocodeError::Network(e)
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Autocomplete returned status {}", status);
            return Err(GeocodeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let body: AutocompleteResponse = serde_json::from_slice(&bytes).map_err(|e| {
            tracing::warn!("Autocomplete JSON error: {}", e);
            GeocodeError::Json(e)
        })?;

        match body.status.as_str() {
            "OK" | "ZERO_RESULTS" => {}
            other => {
                return Err(GeocodeError::Api {
                    status: other.to_string(),
                    message: body.error_message.unwrap_or_default(),
                })
            }
        }

        Ok(body
            .predictions
            .into_iter()
            .map(|p| LocationSuggestion {
                description: p.description,
                place_id: p.place_id,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> PlacesClient {
        PlacesClient::new(
            &format!("{}/autocomplete/json", server.uri()),
            "places_key",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_suggest_locations() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/autocomplete/json"))
            .and(query_param("input", "Lago"))
            .and(query_param("key", "places_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "OK",
                "predictions": [
                    { "description": "Lagos, Nigeria", "place_id": "abc" },
                    { "description": "Lagos, Portugal", "place_id": "def" }
                ]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let suggestions = client(&mock_server).suggest_locations("Lago").await.unwrap();

        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].description, "Lagos, Nigeria");
        assert_eq!(suggestions[1].place_id.as_deref(), Some("def"));
    }

    #[tokio::test]
    async fn test_zero_results() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/autocomplete/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ZERO_RESULTS",
                "predictions": []
            })))
            .mount(&mock_server)
            .await;

        let suggestions = client(&mock_server).suggest_locations("zzzz").await.unwrap();
        assert!(suggestions.is_empty());
    }

    #[tokio::test]
    async fn test_api_status_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/autocomplete/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "REQUEST_DENIED",
                "error_message": "The provided API key is invalid."
            })))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server).suggest_locations("Paris").await;
        match result {
            Err(GeocodeError::Api { status, message }) => {
                assert_eq!(status, "REQUEST_DENIED");
                assert!(message.contains("API key"));
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_http_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server).suggest_locations("Paris").await;
        assert!(matches!(result, Err(GeocodeError::Status { status: 502, .. })));
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server).suggest_locations("Paris").await;
        assert!(matches!(result, Err(GeocodeError::Json(_))));
    }

    #[tokio::test]
    async fn test_blank_query_skips_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let suggestions = client(&mock_server).suggest_locations("   ").await.unwrap();
        assert!(suggestions.is_empty());
    }
}
