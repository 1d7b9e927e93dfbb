//! yqmiot-proto エラー型

use alloc::string::String;

/// エンベロープのデコードエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// JSON として解析できない
    #[error("Malformed frame: {0}")]
    Malformed(String),
    /// トップレベルがオブジェクト（map）ではない
    #[error("Frame is not a JSON object")]
    NotAnObject,
    /// フィールドが存在するが型・範囲が不正（例: "d" が文字列）
    #[error("Invalid envelope field: {0}")]
    InvalidField(String),
}
