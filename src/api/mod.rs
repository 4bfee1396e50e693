use std::time::Duration;

use reqwest::{
    header::{
        HeaderValue,
        AUTHORIZATION,
    },
    Client,
    Method,
    Url,
};
use serde::{
    de::DeserializeOwned,
    Deserialize,
};
use tracing::{
    debug,
    warn,
};

use crate::{
    core::{
        http::http_client,
        Deck,
        FlashdeckError,
    },
    settings::ApiSettings,
};

pub mod types;

pub use types::{
    ApplyRequest,
    ApplyResponse,
    ChatRequest,
    Command,
    DeckSnapshot,
    NewDeck,
    ProposalPacket,
    SnapshotCard,
};

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// Authenticated JSON client for the study backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, FlashdeckError> {
        let client = http_client(settings.timeout_secs.map(Duration::from_secs))?;
        Self::with_client(client, &settings.base_url, settings.token.clone())
    }

    pub fn with_client(
        client: Client,
        base_url: &str,
        token: Option<String>,
    ) -> Result<Self, FlashdeckError> {
        // Url::join drops the last segment unless the base ends in a slash.
        let normalized =
            if base_url.ends_with('/') { base_url.to_string() } else { format!("{base_url}/") };
        let base_url = Url::parse(&normalized)
            .map_err(|e| FlashdeckError::InvalidUrl(format!("{base_url}: {e}")))?;
        let token = token.filter(|t| !t.trim().is_empty());

        Ok(Self { client, base_url, token })
    }

    fn endpoint(&self, path: &str) -> Result<Url, FlashdeckError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| FlashdeckError::InvalidUrl(format!("{path}: {e}")))
    }

    async fn make_request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, FlashdeckError> {
        let url = self.endpoint(path)?;
        debug!(%method, %url, "sending request");

        let mut request = self.client.request(method.clone(), url);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = failure_message(status.as_u16(), &text);
            warn!(%method, path, status = status.as_u16(), %message, "request failed");
            return Err(FlashdeckError::Api { status: status.as_u16(), message });
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(serde_json::from_value(serde_json::Value::Null)?);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn list_decks(&self) -> Result<Vec<Deck>, FlashdeckError> {
        self.make_request(Method::GET, "decks/me", None).await
    }

    pub async fn get_deck(&self, deck_id: u64) -> Result<Deck, FlashdeckError> {
        self.make_request(Method::GET, &format!("decks/{deck_id}"), None).await
    }

    /// Replaces the stored deck wholesale. The caller is responsible for filtering blank cards.
    pub async fn update_deck(&self, deck: &Deck) -> Result<Deck, FlashdeckError> {
        let body = serde_json::to_value(deck)?;
        self.make_request(Method::PUT, &format!("decks/{}", deck.id), Some(body)).await
    }

    pub async fn delete_deck(&self, deck_id: u64) -> Result<(), FlashdeckError> {
        let _: serde_json::Value =
            self.make_request(Method::DELETE, &format!("decks/{deck_id}"), None).await?;
        Ok(())
    }

    pub async fn chat(
        &self,
        message: &str,
        deck_snapshot: &DeckSnapshot,
    ) -> Result<ProposalPacket, FlashdeckError> {
        let body = serde_json::to_value(ChatRequest { message, deck_snapshot })?;
        self.make_request(Method::POST, "flashcards/chat", Some(body)).await
    }

    pub async fn apply(
        &self,
        proposal_id: &str,
        accepted_indexes: &[usize],
        deck_snapshot: &DeckSnapshot,
    ) -> Result<ApplyResponse, FlashdeckError> {
        let body =
            serde_json::to_value(ApplyRequest { proposal_id, accepted_indexes, deck_snapshot })?;
        self.make_request(Method::POST, "flashcards/apply", Some(body)).await
    }
}

/// Picks the text a failed response should surface: the backend's `detail` string when
/// present, otherwise the status and raw body.
fn failure_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { detail: serde_json::Value::String(detail) }) => detail,
        Ok(ErrorBody { detail }) => format!("HTTP {status}: {detail}"),
        Err(_) if body.trim().is_empty() => format!("HTTP {status}"),
        Err(_) => format!("HTTP {status}: {}", body.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::with_client(Client::new(), base, None).unwrap()
    }

    #[test]
    fn endpoints_join_under_base_path() {
        let api = client("http://localhost:8000/api");
        assert_eq!(api.endpoint("decks/3").unwrap().as_str(), "http://localhost:8000/api/decks/3");
        assert_eq!(
            api.endpoint("/flashcards/chat").unwrap().as_str(),
            "http://localhost:8000/api/flashcards/chat"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = ApiClient::with_client(Client::new(), "not a url", None).unwrap_err();
        assert!(matches!(err, FlashdeckError::InvalidUrl(_)));
    }

    #[test]
    fn blank_token_is_treated_as_absent() {
        let api = ApiClient::with_client(Client::new(), "http://x/", Some("  ".into())).unwrap();
        assert!(api.token.is_none());
    }

    #[test]
    fn failure_message_prefers_detail_string() {
        assert_eq!(
            failure_message(400, r#"{"detail": "ID 9 not in deck"}"#),
            "ID 9 not in deck"
        );
        assert_eq!(failure_message(502, ""), "HTTP 502");
        assert_eq!(failure_message(500, "boom"), "HTTP 500: boom");
        assert!(failure_message(422, r#"{"detail": [{"loc": ["body"]}]}"#).starts_with("HTTP 422: "));
    }

    #[tokio::test]
    async fn delete_deck_accepts_no_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/decks/4")
            .match_header("authorization", "Bearer tok")
            .with_status(204)
            .create_async()
            .await;

        let api = ApiClient::with_client(Client::new(), &server.url(), Some("tok".into())).unwrap();
        api.delete_deck(4).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn delete_deck_accepts_a_json_message() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/decks/4")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message": "Deck deleted successfully"}"#)
            .create_async()
            .await;

        client(&server.url()).delete_deck(4).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn delete_deck_surfaces_detail_on_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/decks/9")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail": "Deck not found"}"#)
            .create_async()
            .await;

        let err = client(&server.url()).delete_deck(9).await.unwrap_err();
        assert!(matches!(err, FlashdeckError::Api { status: 404, .. }));
        assert_eq!(err.to_string(), "Deck not found");
    }
}
