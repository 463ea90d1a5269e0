use crate::models::{DeclineRecord, Profile, Role};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when talking to the data store
#[derive(Debug, Error)]
pub enum SupabaseError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: invalid service key")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Supabase REST (PostgREST) client
///
/// Handles all reads from the app's data store:
/// - Fetching single profiles
/// - Querying the candidate pool
/// - Fetching existing relationships (permanent exclusions)
/// - Fetching recent declines (temporary exclusions)
pub struct SupabaseClient {
    base_url: String,
    service_key: String,
    client: Client,
    tables: SupabaseTables,
}

/// Table names in the data store
#[derive(Debug, Clone)]
pub struct SupabaseTables {
    pub profiles: String,
    pub connections: String,
    pub declines: String,
}

/// Relationship row; only the two participant ids are selected.
#[derive(Debug, Deserialize)]
struct ConnectionRow {
    sponsor_id: String,
    sponsee_id: String,
}

impl SupabaseClient {
    /// Create a new client against a Supabase project
    pub fn new(base_url: String, service_key: String, tables: SupabaseTables) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url,
            service_key,
            client,
            tables,
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!(
            "{}/rest/v1/{}",
            self.base_url.trim_end_matches('/'),
            table
        )
    }

    async fn get_rows<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<Vec<T>, SupabaseError> {
        tracing::debug!("Fetching: {}", url);

        let response = self
            .client
            .get(url)
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(SupabaseError::Unauthorized);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Data store request failed: {} - {}", status, body);
            return Err(SupabaseError::ApiError(format!(
                "Request failed with status {}",
                status
            )));
        }

        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| SupabaseError::InvalidResponse(format!("Failed to parse rows: {}", e)))
    }

    /// Get a single profile by id
    pub async fn get_profile(&self, id: &str) -> Result<Profile, SupabaseError> {
        let url = format!(
            "{}?id=eq.{}&select=*",
            self.table_url(&self.tables.profiles),
            urlencoding::encode(id)
        );

        let rows: Vec<Profile> = self.get_rows(&url).await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| SupabaseError::NotFound(format!("Profile not found: {}", id)))
    }

    /// Query the candidate pool for a requester: complementary roles,
    /// soft-deleted profiles excluded. Program filtering is left to the
    /// scorer, which credits exact program matches.
    pub async fn get_candidate_pool(
        &self,
        requester_role: Role,
    ) -> Result<Vec<Profile>, SupabaseError> {
        let roles = match requester_role {
            Role::Sponsor => "sponsee,both",
            Role::Sponsee => "sponsor,both",
            Role::Both => "sponsor,sponsee,both",
        };

        let url = format!(
            "{}?role=in.({})&is_deleted=eq.false&select=*",
            self.table_url(&self.tables.profiles),
            roles
        );

        let profiles: Vec<Profile> = self.get_rows(&url).await?;
        tracing::debug!("Queried {} candidates", profiles.len());

        Ok(profiles)
    }

    /// Get candidate ids with an existing active or pending relationship
    /// to the requester
    pub async fn get_relationships(
        &self,
        requester_id: &str,
    ) -> Result<Vec<String>, SupabaseError> {
        let encoded = urlencoding::encode(requester_id);
        let filter = format!("(sponsor_id.eq.{},sponsee_id.eq.{})", encoded, encoded);

        let url = format!(
            "{}?or={}&status=in.(active,pending)&select=sponsor_id,sponsee_id",
            self.table_url(&self.tables.connections),
            urlencoding::encode(&filter)
        );

        let rows: Vec<ConnectionRow> = self.get_rows(&url).await?;

        let ids = rows
            .into_iter()
            .map(|row| {
                if row.sponsor_id == requester_id {
                    row.sponsee_id
                } else {
                    row.sponsor_id
                }
            })
            .collect();

        Ok(ids)
    }

    /// Get the requester's declines recorded after `since`
    pub async fn get_recent_declines(
        &self,
        requester_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<DeclineRecord>, SupabaseError> {
        let url = format!(
            "{}?requester_id=eq.{}&declined_at=gt.{}&select=candidate_id,declined_at",
            self.table_url(&self.tables.declines),
            urlencoding::encode(requester_id),
            urlencoding::encode(&since.to_rfc3339())
        );

        self.get_rows(&url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_tables() -> SupabaseTables {
        SupabaseTables {
            profiles: "profiles".to_string(),
            connections: "connections".to_string(),
            declines: "declines".to_string(),
        }
    }

    #[test]
    fn test_client_creation() {
        let client = SupabaseClient::new(
            "https://project.supabase.co".to_string(),
            "service_key".to_string(),
            test_tables(),
        );

        assert_eq!(client.base_url, "https://project.supabase.co");
        assert_eq!(
            client.table_url("profiles"),
            "https://project.supabase.co/rest/v1/profiles"
        );
    }

    #[tokio::test]
    async fn test_get_profile_parses_row() {
        let mut server = mockito::Server::new_async().await;
        let body = serde_json::json!([{
            "id": "u1",
            "role": "sponsor",
            "program": "AA",
            "city": "Denver",
            "state": "CO",
            "latitude": 39.7392,
            "longitude": -104.9903,
            "sobriety_date": "2018-03-01",
            "approach": "One day at a time",
            "availability": ["Weekday Evenings"],
            "is_deleted": false
        }]);

        let mock = server
            .mock("GET", "/rest/v1/profiles")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let client = SupabaseClient::new(server.url(), "key".to_string(), test_tables());
        let profile = client.get_profile("u1").await.unwrap();

        mock.assert_async().await;
        assert_eq!(profile.id, "u1");
        assert_eq!(profile.role, Role::Sponsor);
        assert_eq!(profile.program.as_deref(), Some("AA"));
        assert!(!profile.is_deleted);
    }

    #[tokio::test]
    async fn test_get_profile_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rest/v1/profiles")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let client = SupabaseClient::new(server.url(), "key".to_string(), test_tables());
        let result = client.get_profile("missing").await;

        assert!(matches!(result, Err(SupabaseError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unauthorized_status_mapped() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rest/v1/profiles")
            .match_query(mockito::Matcher::Any)
            .with_status(401)
            .with_body("{}")
            .create_async()
            .await;

        let client = SupabaseClient::new(server.url(), "bad_key".to_string(), test_tables());
        let result = client.get_candidate_pool(Role::Sponsee).await;

        assert!(matches!(result, Err(SupabaseError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_relationships_pick_other_party() {
        let mut server = mockito::Server::new_async().await;
        let body = serde_json::json!([
            { "sponsor_id": "u1", "sponsee_id": "other_a" },
            { "sponsor_id": "other_b", "sponsee_id": "u1" }
        ]);
        let _mock = server
            .mock("GET", "/rest/v1/connections")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let client = SupabaseClient::new(server.url(), "key".to_string(), test_tables());
        let ids = client.get_relationships("u1").await.unwrap();

        assert_eq!(ids, vec!["other_a", "other_b"]);
    }
}
