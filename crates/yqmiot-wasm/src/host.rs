//! JS ホスト側トランスポート
//!
//! WebSocket は JS 側が持つ。`HostTransport` はセッションからの操作を
//! アクションとして記録し、JS から届いたイベントをキューに積むだけ。

use alloc::collections::VecDeque;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use yqmiot_client::{Transport, TransportError, TransportEvent};

/// JS ホストに実行してもらう操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostAction {
    /// WebSocket を開く
    Open(String),
    /// テキストフレームを送る
    Send(String),
    /// WebSocket を閉じる
    Close,
}

impl HostAction {
    /// JS オブジェクトの `op` フィールド
    pub fn op(&self) -> &'static str {
        match self {
            HostAction::Open(_) => "open",
            HostAction::Send(_) => "send",
            HostAction::Close => "close",
        }
    }
}

/// 操作を記録するトランスポート
#[derive(Debug, Default)]
pub struct HostTransport {
    /// JS に渡していないアクション
    actions: Vec<HostAction>,
    /// JS から届いたイベント（到着順）
    events: VecDeque<TransportEvent>,
    /// ホストが Opened を報告してから Closed / close までの間 `true`
    open: bool,
}

impl HostTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 記録済みのアクションを取り出す
    pub fn take_actions(&mut self) -> Vec<HostAction> {
        core::mem::take(&mut self.actions)
    }

    /// ホストの WebSocket が開いた
    pub fn push_opened(&mut self) {
        self.open = true;
        self.events.push_back(TransportEvent::Opened);
    }

    /// ホストの WebSocket が閉じた（接続失敗を含む）
    pub fn push_closed(&mut self) {
        self.open = false;
        self.events.push_back(TransportEvent::Closed);
    }

    /// ホストがテキストフレームを受信した
    pub fn push_message(&mut self, text: String) {
        self.events.push_back(TransportEvent::Message(text));
    }
}

impl Transport for HostTransport {
    fn open(&mut self, url: &str) -> Result<(), TransportError> {
        self.actions.push(HostAction::Open(url.to_string()));
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
        self.actions.push(HostAction::Close);
    }

    fn send_text(&mut self, frame: &str) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::NotOpen);
        }
        self.actions.push(HostAction::Send(frame.to_string()));
        Ok(())
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        self.events.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yqmiot_client::{ConnectionState, LoginParams, Session};

    #[test]
    fn test_actions_follow_session_lifecycle() {
        let mut session = Session::with_default_config(HostTransport::new());
        session.begin(LoginParams::node(42, "tok"));
        session.tick(0);
        assert_eq!(
            session.transport_mut().take_actions(),
            alloc::vec![HostAction::Open(String::from(yqmiot_client::DEFAULT_URL))]
        );

        session.transport_mut().push_opened();
        session.tick(0);
        let actions = session.transport_mut().take_actions();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].op(), "send");

        session.transport_mut().push_message(String::from(r#"{"i":65535,"c":1,"v":{"$err":0}}"#));
        session.tick(0);
        assert_eq!(session.state(), ConnectionState::Connected);

        session.close();
        assert_eq!(session.transport_mut().take_actions(), alloc::vec![HostAction::Close]);
    }

    #[test]
    fn test_send_rejected_before_host_opened() {
        let mut transport = HostTransport::new();
        assert_eq!(transport.send_text("{}"), Err(TransportError::NotOpen));
        assert!(transport.take_actions().is_empty());
    }

    #[test]
    fn test_events_are_fifo() {
        let mut transport = HostTransport::new();
        transport.push_opened();
        transport.push_message(String::from("a"));
        transport.push_closed();
        assert_eq!(transport.poll_event(), Some(TransportEvent::Opened));
        assert_eq!(transport.poll_event(), Some(TransportEvent::Message(String::from("a"))));
        assert_eq!(transport.poll_event(), Some(TransportEvent::Closed));
        assert_eq!(transport.poll_event(), None);
    }
}
