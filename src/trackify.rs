use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::{header::CONTENT_TYPE, Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;

#[cfg(test)]
use mockall::automock;

use crate::catalog::{Project, Task};
use crate::config::Config;
use crate::time_entry::TimeEntry;

/// time entryを永続化するリポジトリ。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TimeEntryRepository {
    /// 全てのtime entryを取得する。
    async fn list_time_entries(&self) -> Result<Vec<TimeEntry>>;

    /// time entryを作成し、idが払い出されたtime entryを返す。
    async fn create_time_entry(&self, entry: &TimeEntry) -> Result<TimeEntry>;

    /// 指定したidのtime entryを置き換える。
    async fn update_time_entry(&self, id: &str, entry: &TimeEntry) -> Result<TimeEntry>;

    /// 指定したidのtime entryを削除する。
    async fn delete_time_entry(&self, id: &str) -> Result<()>;
}

/// projectとtaskを参照するリポジトリ。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CatalogRepository {
    async fn list_projects(&self) -> Result<Vec<Project>>;

    async fn list_tasks(&self) -> Result<Vec<Task>>;
}

/// Trackify APIと通信するためのクライアント。
///
/// # Examples
///
/// ```
/// let client = TrackifyClient::new(&Config::from_env()?);
/// let time_entries = client.list_time_entries().await?;
/// ```
pub struct TrackifyClient {
    client: Client,
    api_url: String,
    api_token: Option<String>,
}

impl TrackifyClient {
    /// 新しい`TrackifyClient`を返す。
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_url: config.api_url.clone(),
            api_token: config.api_token.clone(),
        }
    }

    /// 認証情報を付与したリクエストを作成する。
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.api_url, path);
        debug!("{} {}", method, url);
        let builder = self
            .client
            .request(method, url)
            .header(CONTENT_TYPE, "application/json");
        match &self.api_token {
            Some(token) => builder.basic_auth(token, Some("api_token")),
            None => builder,
        }
    }

    /// リクエストを送信し、レスポンスをデシリアライズする。
    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        builder
            .send()
            .await
            .with_context(|| format!("Failed to send request to Trackify API at {}", self.api_url))?
            .error_for_status()
            .context("Request returned an error status")?
            .json::<T>()
            .await
            .context("Failed to deserialize response")
    }
}

#[async_trait]
impl TimeEntryRepository for TrackifyClient {
    async fn list_time_entries(&self) -> Result<Vec<TimeEntry>> {
        let entries: Vec<TimeEntry> = self
            .send_json(self.request(Method::GET, "timeEntries"))
            .await
            .context("Failed to fetch time entries")?;
        info!("length of time entries: {}", entries.len());

        Ok(entries)
    }

    async fn create_time_entry(&self, entry: &TimeEntry) -> Result<TimeEntry> {
        // idはサーバーに払い出させる
        let body = TimeEntry {
            id: String::new(),
            ..entry.clone()
        };
        self.send_json(self.request(Method::POST, "timeEntries").json(&body))
            .await
            .context("Failed to create time entry")
    }

    async fn update_time_entry(&self, id: &str, entry: &TimeEntry) -> Result<TimeEntry> {
        self.send_json(
            self.request(Method::PUT, &format!("timeEntries/{}", id))
                .json(entry),
        )
        .await
        .with_context(|| format!("Failed to update time entry: {}", id))
    }

    async fn delete_time_entry(&self, id: &str) -> Result<()> {
        self.request(Method::DELETE, &format!("timeEntries/{}", id))
            .send()
            .await
            .with_context(|| format!("Failed to send request to Trackify API at {}", self.api_url))?
            .error_for_status()
            .with_context(|| format!("Failed to delete time entry: {}", id))?;

        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for TrackifyClient {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.send_json(self.request(Method::GET, "projects"))
            .await
            .context("Failed to fetch projects")
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        self.send_json(self.request(Method::GET, "tasks"))
            .await
            .context("Failed to fetch tasks")
    }
}
