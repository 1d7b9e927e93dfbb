//! yqmiot-client エラー型

use alloc::string::String;

/// セッション構築時のエラー
///
/// 接続中のエラー（切断、デコード失敗、ログイン失敗）はここには現れない。
/// それらは状態遷移・統計・ログで観測する。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// 未知のログイン方式（0 = nid + token, 1 = token のみ）
    #[error("Invalid login type: {0} (expected 0 or 1)")]
    InvalidLoginType(u32),
    /// 設定の解析・検証に失敗
    #[error("Invalid config: {0}")]
    Config(String),
}
