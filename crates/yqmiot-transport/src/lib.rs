//! # yqmiot-transport
//!
//! トランスポート層の抽象化。
//!
//! 実際の接続（通常は WebSocket）はこのクレートの外にあり、
//! セッションは [`Transport`] トレイト越しにしか触らない。
//!
//! ## ライフサイクル
//!
//! ```text
//! open(url) ──Ok──▶ (非同期) TransportEvent::Opened
//!     │                        │
//!     └─Err (即時失敗)          ├─▶ TransportEvent::Message(text) ...
//!                              └─▶ TransportEvent::Closed
//! ```
//!
//! `open` が `Ok` を返しても接続完了ではない。完了は `Opened` イベントで通知される。
//! 接続に失敗した場合や切断された場合は `Closed` イベントが届く。

#![no_std]
extern crate alloc;

pub mod error;
pub mod memory;

pub use error::TransportError;
pub use memory::{MemoryPeer, MemoryTransport};

use alloc::string::String;

/// トランスポートから上がってくるイベント
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// 接続が確立した
    Opened,
    /// 接続が閉じた（接続失敗を含む）
    Closed,
    /// テキストフレームを受信した
    Message(String),
}

/// 双方向テキストチャンネル
///
/// すべてのメソッドはノンブロッキングであること。
/// イベントは `poll_event` で到着順に取り出す。
pub trait Transport {
    /// 接続を開始する
    ///
    /// 開始すらできない場合（アドレス解決失敗など）は即座に `Err` を返す。
    fn open(&mut self, url: &str) -> Result<(), TransportError>;

    /// 接続を閉じる
    fn close(&mut self);

    /// テキストフレームを 1 つ送信する
    fn send_text(&mut self, frame: &str) -> Result<(), TransportError>;

    /// 到着済みのイベントを 1 つ取り出す。無ければ `None`
    fn poll_event(&mut self) -> Option<TransportEvent>;
}
