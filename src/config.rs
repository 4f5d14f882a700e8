use std::{env, path::PathBuf};

use anyhow::{bail, Context, Result};

/// Trackify APIの既定のURL。
pub const DEFAULT_API_URL: &str = "https://trackify-backend-ylhf.onrender.com";

/// 環境変数から読み込む設定。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Trackify APIのURL。末尾の`/`は含まない
    pub api_url: String,
    /// 設定されている場合はBasic認証でAPIに送る
    pub api_token: Option<String>,
    /// ログファイルを出力するディレクトリ
    pub log_dir: PathBuf,
}

impl Config {
    /// 環境変数から設定を読み込む。
    ///
    /// * `TRACKIFY_API_URL` - APIのURL。未設定の場合は`DEFAULT_API_URL`
    /// * `TRACKIFY_API_TOKEN` - APIトークン
    /// * `TRACKIFY_LOG_DIR` - ログの出力先。未設定の場合はキャッシュディレクトリ配下
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 任意の参照関数から設定を読み込む。
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("TRACKIFY_API_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = api_url.trim().trim_end_matches('/').to_string();
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            bail!("TRACKIFY_API_URL must start with http:// or https://: {}", api_url);
        }

        let api_token = lookup("TRACKIFY_API_TOKEN").filter(|token| !token.is_empty());

        let log_dir = match lookup("TRACKIFY_LOG_DIR").filter(|dir| !dir.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::cache_dir()
                .context("Failed to find cache directory, set TRACKIFY_LOG_DIR")?
                .join("trackify"),
        };

        Ok(Self {
            api_url,
            api_token,
            log_dir,
        })
    }
}
