//! yqmiot-transport エラー型

use alloc::string::String;

/// トランスポート層のエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// 接続を開始できなかった
    #[error("Failed to open connection: {0}")]
    OpenFailed(String),
    /// 接続が開いていない
    #[error("Connection is not open")]
    NotOpen,
    /// フレームの送信に失敗した
    #[error("Failed to send frame: {0}")]
    SendFailed(String),
}
