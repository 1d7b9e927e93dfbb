//! # yqmiot-client
//!
//! YQMIOT デバイスクライアント：ログイン・自動再接続・受信ディスパッチ・特性レジストリ。
//!
//! ## 全体像
//!
//! ```text
//! アプリ ──API──▶ Session ──send_text──▶ Transport ──▶ サーバー
//!   ▲               │  ▲                    │
//!   └──callback─────┘  └────poll_event──────┘
//! ```
//!
//! すべての処理は `Session::tick(now_ms)` の中で同期的に進む。
//! コールバックは tick 中に呼ばれ、その間は次のフレームを処理しない。
//!
//! ## 使用例
//!
//! ```
//! use yqmiot_client::{ConnectionState, LoginParams, MemoryTransport, Session};
//!
//! let (transport, peer) = MemoryTransport::pair();
//! let mut session = Session::with_default_config(transport);
//!
//! session.begin(LoginParams::node(42, "tok"));
//! session.tick(0); // open を試みる
//!
//! peer.push_opened();
//! session.tick(0); // ログインを送信
//! assert_eq!(peer.take_sent(), vec![r#"{"c":2,"v":{"nid":42,"token":"tok","type":0}}"#]);
//!
//! peer.push_text(r#"{"i":65535,"c":1,"v":{"$err":0}}"#);
//! session.tick(0);
//! assert_eq!(session.state(), ConnectionState::Connected);
//! ```

#![no_std]
extern crate alloc;

pub mod callbacks;
pub mod config;
mod dispatch;
pub mod error;
pub mod login;
pub mod session;
pub mod stats;

pub use callbacks::{PacketCallback, WriteCallback};
pub use config::{SessionConfig, DEFAULT_URL};
pub use error::ClientError;
pub use login::LoginParams;
pub use session::Session;
pub use stats::SessionStats;

pub use yqmiot_proto::{Command, Envelope, Map, Value, LOGIN_REQUEST_ID, NID_IOTSRV};
pub use yqmiot_registry::{
    Characteristic, CharacteristicFlags, CharacteristicKind, HandleRegistry, RegistryError,
};
pub use yqmiot_supervisor::ConnectionState;
pub use yqmiot_transport::{MemoryPeer, MemoryTransport, Transport, TransportError, TransportEvent};
