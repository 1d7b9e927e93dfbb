//! # yqmiot-wasm
//!
//! wasm-bindgen エクスポート：WebSocket を持つ JS ホストから呼び出す公開 API。
//!
//! ## 使用方法（TypeScript）
//!
//! ```typescript
//! import { YqmiotClient, init_panic_hook } from './yqmiot-wasm-pkg/yqmiot_wasm';
//!
//! // パニック時のスタックトレースを有効化（開発時）
//! init_panic_hook();
//!
//! const client = new YqmiotClient();
//! client.onCall((dst, src, id, cmd, valJson) => pending.push({ src, id }));
//! client.begin(0, 42, "device-token");
//!
//! let ws: WebSocket | null = null;
//! const run = (actions) => {
//!     for (const a of actions) {
//!         if (a.op === "open") {
//!             ws = new WebSocket(a.url);
//!             ws.onopen = () => client.transportOpened();
//!             ws.onmessage = (ev) => client.transportMessage(ev.data);
//!             ws.onclose = () => client.transportClosed();
//!         } else if (a.op === "send") {
//!             ws?.send(a.data);
//!         } else if (a.op === "close") {
//!             ws?.close();
//!         }
//!     }
//! };
//!
//! // 定期タイマー（50ms ごと）
//! setInterval(() => run(client.tick(Date.now())), 50);
//! ```

use wasm_bindgen::prelude::*;

pub mod client;
pub mod host;

pub use client::YqmiotClient;
pub use host::{HostAction, HostTransport};

/// パニック時にブラウザコンソールにスタックトレースを出力する
///
/// 開発時に必ず呼び出すこと。本番ビルドでは feature flag で無効化可能。
#[wasm_bindgen]
pub fn init_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

extern crate alloc;
