//! セッション統計

use yqmiot_supervisor::ConnectionState;

/// セッション統計情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// 現在の接続状態
    pub state: ConnectionState,
    /// 現在の再試行カウンタ
    pub retry_count: u32,
    /// トランスポートに渡したフレーム数（ログインを含む）
    pub frames_sent: u64,
    /// 未接続のため破棄したフレーム数
    pub frames_dropped: u64,
    /// 受信したフレーム数
    pub frames_received: u64,
    /// デコードできずに捨てたフレーム数
    pub decode_errors: u64,
    /// ログイン失敗の応答数
    pub login_failures: u64,
}

/// セッション内部のカウンタ
#[derive(Debug, Clone, Default)]
pub(crate) struct Counters {
    pub(crate) frames_sent: u64,
    pub(crate) frames_dropped: u64,
    pub(crate) frames_received: u64,
    pub(crate) decode_errors: u64,
    pub(crate) login_failures: u64,
}
