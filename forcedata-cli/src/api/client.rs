//! REST client for Salesforce schema introspection
//!
//! Covers only the describe surface the mapping pipeline needs. The client
//! consumes an already-issued access token; login flows live outside this
//! tool.

use std::future::Future;

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::models::{GlobalDescribe, ObjectDescribe};

/// Salesforce REST API version used for describe calls
const API_VERSION: &str = "v59.0";

/// Maximum object names per detailed-describe request
const DESCRIBE_CHUNK_SIZE: usize = 100;

/// Schema introspection seam, so the mapping pipeline can run against a
/// canned schema in tests
#[async_trait]
pub trait SchemaIntrospect {
    /// List every object type in the org
    async fn describe_global(&self) -> Result<GlobalDescribe>;

    /// Detailed describes for the named types, in request order. Must accept
    /// any number of names and always return one describe per resolvable
    /// name.
    async fn describe_sobjects(&self, names: &[String]) -> Result<Vec<ObjectDescribe>>;
}

/// HTTP client bound to one org
pub struct SalesforceClient {
    http: reqwest::Client,
    instance_url: String,
    access_token: String,
}

impl SalesforceClient {
    pub fn new(instance_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        SalesforceClient {
            http: reqwest::Client::new(),
            instance_url: instance_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/services/data/{}/{}",
            self.instance_url, API_VERSION, path
        )
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Request to {} returned {}: {}", url, status, body);
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to decode response from {}", url))
    }

    async fn describe_one(&self, name: &str) -> Result<ObjectDescribe> {
        self.get_json(&format!(
            "sobjects/{}/describe",
            urlencoding::encode(name)
        ))
        .await
        .with_context(|| format!("Describe of {} failed", name))
    }
}

#[async_trait]
impl SchemaIntrospect for SalesforceClient {
    async fn describe_global(&self) -> Result<GlobalDescribe> {
        self.get_json("sobjects")
            .await
            .context("Global describe failed")
    }

    async fn describe_sobjects(&self, names: &[String]) -> Result<Vec<ObjectDescribe>> {
        describe_in_chunks(names, |name| self.describe_one(name)).await
    }
}

/// Fan out describes over chunks of names. Every chunk is issued up front
/// and awaited as one combined result; the output preserves input order.
async fn describe_in_chunks<'a, Fut>(
    names: &'a [String],
    describe: impl Fn(&'a String) -> Fut,
) -> Result<Vec<ObjectDescribe>>
where
    Fut: Future<Output = Result<ObjectDescribe>>,
{
    let chunk_futures: Vec<_> = names
        .chunks(DESCRIBE_CHUNK_SIZE)
        .map(|chunk| futures::future::try_join_all(chunk.iter().map(&describe)))
        .collect();
    let batches = futures::future::try_join_all(chunk_futures).await?;
    Ok(batches.into_iter().flatten().collect())
}
