//! 接続スーパーバイザ状態機械
//!
//! 接続・再試行・トランスポートイベントのうち「次に何をするか」の判断だけを持つ。
//! 保留中の接続試行は常に 1 つだけで、新しい予定は前の予定を上書きする。

use crate::backoff::Backoff;

/// セッションの接続状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// 停止中。`connect()` されるまで何もしない
    #[default]
    Closed,
    /// 接続中（トランスポート接続待ち、ログイン応答待ち、再試行待ちを含む）
    Connecting,
    /// ログイン済み。パケットの送信が可能
    Connected,
}

impl ConnectionState {
    /// wire/JS 向けの数値表現（0 = Closed, 1 = Connecting, 2 = Connected）
    pub fn as_u8(self) -> u8 {
        match self {
            ConnectionState::Closed => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
        }
    }

    /// ログイン済みか
    #[inline]
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// 停止中か
    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self, ConnectionState::Closed)
    }
}

impl core::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConnectionState::Closed => write!(f, "Closed"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
        }
    }
}

/// 接続スーパーバイザ
///
/// 時刻は外部から `poll_attempt(now_ms)` で注入される。`connect()` など時刻を受け取らない操作は、
/// 最後に観測した時刻を基準に予定を立てる（待ち時間 0 なら次の tick で即実行）。
#[derive(Debug, Clone)]
pub struct ConnectionSupervisor {
    /// 現在の状態
    state: ConnectionState,
    /// 連続失敗回数（バックオフの指数）
    retry_count: u32,
    /// 次の接続試行の予定時刻（ミリ秒）。`None` なら予定なし
    deadline_ms: Option<u64>,
    /// 最後に観測した時刻（ミリ秒）
    now_ms: u64,
    /// バックオフ設定
    backoff: Backoff,
}

impl ConnectionSupervisor {
    /// 新しいスーパーバイザを生成する（初期状態は Closed）
    pub fn new(backoff: Backoff) -> Self {
        ConnectionSupervisor {
            state: ConnectionState::Closed,
            retry_count: 0,
            deadline_ms: None,
            now_ms: 0,
            backoff,
        }
    }

    /// 現在の状態
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// 現在の再試行カウンタ
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// 次の接続試行の予定時刻
    pub fn deadline_ms(&self) -> Option<u64> {
        self.deadline_ms
    }

    /// 接続を開始する
    ///
    /// Closed の場合のみ有効。再試行カウンタをリセットし、即時の接続試行を予定する。
    ///
    /// # 戻り値
    /// 状態が変化した場合 `true`。Closed 以外では何もせず `false`。
    pub fn connect(&mut self) -> bool {
        if !self.state.is_closed() {
            return false;
        }
        self.state = ConnectionState::Connecting;
        self.retry_count = 0;
        self.schedule(0);
        true
    }

    /// 接続を終了する
    ///
    /// Connecting / Connected から Closed へ遷移し、保留中の予定を破棄する。
    ///
    /// # 戻り値
    /// 呼び出し側がトランスポートを閉じるべき場合 `true`。既に Closed なら `false`。
    pub fn close(&mut self) -> bool {
        if self.state.is_closed() {
            return false;
        }
        self.state = ConnectionState::Closed;
        self.deadline_ms = None;
        true
    }

    /// 時刻を進め、接続試行の予定時刻に達していれば予定を消費する
    ///
    /// # 戻り値
    /// 今 `Transport::open` を 1 回呼ぶべきなら `true`
    pub fn poll_attempt(&mut self, now_ms: u64) -> bool {
        self.now_ms = self.now_ms.max(now_ms);

        if self.state != ConnectionState::Connecting {
            return false;
        }
        match self.deadline_ms {
            Some(deadline) if deadline <= self.now_ms => {
                self.deadline_ms = None;
                true
            }
            _ => false,
        }
    }

    /// `Transport::open` が即時に失敗した
    ///
    /// # 戻り値
    /// 次の試行までの待ち時間（ミリ秒）
    pub fn open_failed(&mut self) -> u64 {
        self.schedule_retry()
    }

    /// トランスポートの Opened イベント
    ///
    /// # 戻り値
    /// ログインを送信すべきなら `true`（Connecting の場合のみ）
    pub fn on_opened(&mut self) -> bool {
        if self.state != ConnectionState::Connecting {
            return false;
        }
        self.retry_count = 0;
        // 保留中の試行は破棄する
        self.deadline_ms = None;
        true
    }

    /// トランスポートの Closed イベント
    ///
    /// - Connecting: バックオフ後の再試行を予定する
    /// - Connected: Connecting に戻し、カウンタをリセットして即時再接続を予定する
    /// - Closed: 何もしない
    ///
    /// # 戻り値
    /// 予定した再試行までの待ち時間。予定しなかった場合は `None`
    pub fn on_closed(&mut self) -> Option<u64> {
        match self.state {
            ConnectionState::Connecting => Some(self.schedule_retry()),
            ConnectionState::Connected => {
                self.state = ConnectionState::Connecting;
                self.retry_count = 0;
                self.schedule(0);
                Some(0)
            }
            ConnectionState::Closed => None,
        }
    }

    /// ログイン成功の応答を受けた
    ///
    /// # 戻り値
    /// Connected へ遷移した場合 `true`
    pub fn login_succeeded(&mut self) -> bool {
        if self.state != ConnectionState::Connecting {
            return false;
        }
        self.state = ConnectionState::Connected;
        self.deadline_ms = None;
        true
    }

    // ===== Private メソッド =====

    /// バックオフに従って再試行を予定し、カウンタを進める
    fn schedule_retry(&mut self) -> u64 {
        let delay = self.backoff.delay_ms(self.retry_count);
        self.retry_count = self.retry_count.saturating_add(1);
        self.schedule(delay);
        tracing::debug!(delay_ms = delay, retry_count = self.retry_count, "wait before retry");
        delay
    }

    /// 最後に観測した時刻から `delay_ms` 後に接続試行を予定する（前の予定は上書き）
    fn schedule(&mut self, delay_ms: u64) {
        self.deadline_ms = Some(self.now_ms.saturating_add(delay_ms));
    }
}

impl Default for ConnectionSupervisor {
    fn default() -> Self {
        Self::new(Backoff::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_closed() {
        let sup = ConnectionSupervisor::default();
        assert_eq!(sup.state(), ConnectionState::Closed);
        assert_eq!(sup.deadline_ms(), None);
    }

    #[test]
    fn test_connect_schedules_immediate_attempt() {
        let mut sup = ConnectionSupervisor::default();
        assert!(sup.connect());
        assert_eq!(sup.state(), ConnectionState::Connecting);
        assert_eq!(sup.retry_count(), 0);

        // 待ち時間 0 なので最初の tick で試行する
        assert!(sup.poll_attempt(0));
        // 予定は消費済み
        assert!(!sup.poll_attempt(0));
    }

    #[test]
    fn test_connect_only_from_closed() {
        let mut sup = ConnectionSupervisor::default();
        assert!(sup.connect());
        assert!(!sup.connect(), "Connecting 中の connect は無視されるべき");
    }

    #[test]
    fn test_backoff_on_repeated_open_failure() {
        let mut sup = ConnectionSupervisor::default();
        sup.connect();

        let mut now = 1000;
        let mut delays = [0u64; 7];
        for delay in delays.iter_mut() {
            assert!(sup.poll_attempt(now));
            *delay = sup.open_failed();

            // 予定時刻の直前では試行しない
            assert!(!sup.poll_attempt(now + *delay - 1));
            now += *delay;
        }
        assert_eq!(delays, [1000, 2000, 4000, 8000, 16000, 30000, 30000]);
        assert_eq!(sup.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_closed_while_connecting_backs_off() {
        let mut sup = ConnectionSupervisor::default();
        sup.connect();
        assert!(sup.poll_attempt(500));

        assert_eq!(sup.on_closed(), Some(1000));
        assert_eq!(sup.on_closed(), Some(2000));
        assert_eq!(sup.deadline_ms(), Some(2500));
        assert_eq!(sup.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_opened_resets_retry_and_requests_login() {
        let mut sup = ConnectionSupervisor::default();
        sup.connect();
        sup.poll_attempt(0);
        sup.open_failed();
        sup.open_failed();
        assert_eq!(sup.retry_count(), 2);

        assert!(sup.on_opened());
        assert_eq!(sup.retry_count(), 0);
        assert_eq!(sup.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_opened_cancels_pending_attempt() {
        let mut sup = ConnectionSupervisor::default();
        sup.connect();
        assert!(sup.poll_attempt(100));

        // 前の接続の遅れた Closed が再試行を予定する
        assert_eq!(sup.on_closed(), Some(1000));
        assert_eq!(sup.deadline_ms(), Some(1100));

        assert!(sup.on_opened());
        assert_eq!(sup.deadline_ms(), None, "Opened 後に保留中の試行が残ってはならない");
        assert!(!sup.poll_attempt(5000));
    }

    #[test]
    fn test_login_success_then_disconnect_reconnects_immediately() {
        let mut sup = ConnectionSupervisor::default();
        sup.connect();
        sup.poll_attempt(0);
        sup.on_opened();
        assert!(sup.login_succeeded());
        assert_eq!(sup.state(), ConnectionState::Connected);

        sup.poll_attempt(10_000);
        assert_eq!(sup.on_closed(), Some(0));
        assert_eq!(sup.state(), ConnectionState::Connecting);
        assert_eq!(sup.retry_count(), 0);
        assert!(sup.poll_attempt(10_000), "即時再接続されるべき");

        // 2 回目以降の失敗はまたバックオフ
        assert_eq!(sup.on_closed(), Some(1000));
    }

    #[test]
    fn test_close_from_any_state() {
        let mut sup = ConnectionSupervisor::default();
        assert!(!sup.close(), "Closed からの close は何もしない");

        sup.connect();
        assert!(sup.close());
        assert_eq!(sup.state(), ConnectionState::Closed);
        assert_eq!(sup.deadline_ms(), None);
        assert!(!sup.poll_attempt(u64::MAX), "close 後は試行しない");

        sup.connect();
        sup.poll_attempt(0);
        sup.on_opened();
        sup.login_succeeded();
        assert!(sup.close());
        assert!(!sup.close(), "二重 close は一度と同じ");
        assert_eq!(sup.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_events_ignored_when_closed() {
        let mut sup = ConnectionSupervisor::default();
        assert!(!sup.on_opened());
        assert_eq!(sup.on_closed(), None);
        assert!(!sup.login_succeeded());
        assert_eq!(sup.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_time_does_not_go_backwards() {
        let mut sup = ConnectionSupervisor::default();
        sup.connect();
        sup.poll_attempt(5000);
        sup.open_failed();
        // 古い時刻を渡しても予定は前倒しされない
        assert!(!sup.poll_attempt(100));
        assert_eq!(sup.deadline_ms(), Some(6000));
        assert!(sup.poll_attempt(6000));
    }
}
