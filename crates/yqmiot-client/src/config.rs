//! セッション設定

use alloc::string::{String, ToString};

use serde::Deserialize;
use yqmiot_supervisor::{Backoff, RETRY_CAP, RETRY_UNIT_MS};

use crate::error::ClientError;

/// デフォルトの接続先
pub const DEFAULT_URL: &str = "ws://v1.yqmiot.com:27881/ws";

/// セッション設定
///
/// JSON から読み込める。省略したキーはデフォルト値になる。
///
/// ```json
/// { "url": "ws://192.168.1.10:27881/ws", "retry_unit_ms": 1000, "retry_cap": 30 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// トランスポートの接続先 URL
    pub url: String,
    /// バックオフの基本単位（ミリ秒）
    pub retry_unit_ms: u64,
    /// バックオフ倍率の上限（1 以上）
    pub retry_cap: u64,
}

impl SessionConfig {
    /// JSON テキストから設定を読み込む
    ///
    /// # エラー
    /// - `ClientError::Config`: JSON が不正、または値が範囲外
    pub fn from_json(text: &str) -> Result<Self, ClientError> {
        let config: SessionConfig =
            serde_json::from_str(text).map_err(|e| ClientError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 値の範囲を検証する
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.url.is_empty() {
            return Err(ClientError::Config("url must not be empty".to_string()));
        }
        if self.retry_cap == 0 {
            return Err(ClientError::Config("retry_cap must be at least 1".to_string()));
        }
        Ok(())
    }

    /// この設定のバックオフ
    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.retry_unit_ms, self.retry_cap)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            url: DEFAULT_URL.to_string(),
            retry_unit_ms: RETRY_UNIT_MS,
            retry_cap: RETRY_CAP,
        }
    }
}
