//! インメモリトランスポート
//!
//! ネットワークを使わずにセッションを駆動するための実装。
//! [`MemoryTransport`] をセッションに渡し、[`MemoryPeer`] 側からイベントを注入したり
//! 送信済みフレームを検査したりする。両者は同じ内部状態を共有する。
//!
//! ## 使い方
//!
//! ```
//! use yqmiot_transport::{MemoryTransport, Transport, TransportEvent};
//!
//! let (mut transport, peer) = MemoryTransport::pair();
//! transport.open("ws://localhost/ws").unwrap();
//! peer.push_opened();
//! assert_eq!(transport.poll_event(), Some(TransportEvent::Opened));
//!
//! transport.send_text("{\"c\":4,\"v\":null}").unwrap();
//! assert_eq!(peer.sent().len(), 1);
//! ```

use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;

use crate::{Transport, TransportError, TransportEvent};

/// トランスポートとピアで共有する状態
#[derive(Debug, Default)]
struct MemoryState {
    /// 接続が開いているか（`push_opened` 〜 `push_closed`/`close` の間）
    open: bool,
    /// セッションに配送待ちのイベント
    inbound: VecDeque<TransportEvent>,
    /// セッションが送信したフレーム
    sent: Vec<String>,
    /// `open` に渡された URL（呼び出し順）
    open_urls: Vec<String>,
    /// `close` が呼ばれた回数
    close_calls: usize,
    /// 次の N 回の `open` を即時失敗させる
    fail_opens: u32,
}

/// セッションに渡す側のインメモリトランスポート
#[derive(Debug)]
pub struct MemoryTransport {
    state: Rc<RefCell<MemoryState>>,
}

/// テストコード側のハンドル
#[derive(Debug, Clone)]
pub struct MemoryPeer {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryTransport {
    /// 状態を共有するトランスポートとピアのペアを生成する
    pub fn pair() -> (MemoryTransport, MemoryPeer) {
        let state = Rc::new(RefCell::new(MemoryState::default()));
        (
            MemoryTransport {
                state: Rc::clone(&state),
            },
            MemoryPeer { state },
        )
    }
}

impl Transport for MemoryTransport {
    fn open(&mut self, url: &str) -> Result<(), TransportError> {
        let mut state = self.state.borrow_mut();
        state.open_urls.push(url.to_string());

        if state.fail_opens > 0 {
            state.fail_opens -= 1;
            return Err(TransportError::OpenFailed(url.to_string()));
        }
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.state.borrow_mut();
        state.open = false;
        state.close_calls += 1;
    }

    fn send_text(&mut self, frame: &str) -> Result<(), TransportError> {
        let mut state = self.state.borrow_mut();
        if !state.open {
            return Err(TransportError::NotOpen);
        }
        state.sent.push(frame.to_string());
        Ok(())
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        self.state.borrow_mut().inbound.pop_front()
    }
}

impl MemoryPeer {
    /// 接続確立を通知する
    pub fn push_opened(&self) {
        let mut state = self.state.borrow_mut();
        state.open = true;
        state.inbound.push_back(TransportEvent::Opened);
    }

    /// 切断（または接続失敗）を通知する
    pub fn push_closed(&self) {
        let mut state = self.state.borrow_mut();
        state.open = false;
        state.inbound.push_back(TransportEvent::Closed);
    }

    /// テキストフレームを配送する
    pub fn push_text(&self, text: &str) {
        self.state
            .borrow_mut()
            .inbound
            .push_back(TransportEvent::Message(text.to_string()));
    }

    /// 次の `count` 回の `open` を即時失敗させる
    pub fn fail_next_opens(&self, count: u32) {
        self.state.borrow_mut().fail_opens = count;
    }

    /// 送信済みフレームのコピー
    pub fn sent(&self) -> Vec<String> {
        self.state.borrow().sent.clone()
    }

    /// 送信済みフレームを取り出し、記録をクリアする
    pub fn take_sent(&self) -> Vec<String> {
        core::mem::take(&mut self.state.borrow_mut().sent)
    }

    /// `open` が呼ばれた回数
    pub fn open_calls(&self) -> usize {
        self.state.borrow().open_urls.len()
    }

    /// 最後に `open` に渡された URL
    pub fn last_open_url(&self) -> Option<String> {
        self.state.borrow().open_urls.last().cloned()
    }

    /// `close` が呼ばれた回数
    pub fn close_calls(&self) -> usize {
        self.state.borrow().close_calls
    }

    /// 接続が開いているか
    pub fn is_open(&self) -> bool {
        self.state.borrow().open
    }

    /// 配送待ちイベントの数
    pub fn pending_events(&self) -> usize {
        self.state.borrow().inbound.len()
    }
}
