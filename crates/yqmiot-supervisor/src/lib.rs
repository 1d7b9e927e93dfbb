//! # yqmiot-supervisor
//!
//! 接続ライフサイクルの状態機械（接続・再試行・バックオフ）。
//!
//! I/O は持たない。スーパーバイザは「いつ接続を試みるか」「ログインを送るか」を判断し、
//! 実際のトランスポート操作は呼び出し側（`yqmiot-client` のセッション）が行う。
//!
//! ## 状態遷移
//!
//! ```text
//! Closed ──connect()──▶ Connecting ──ログイン成功──▶ Connected
//!   ▲                    │  ▲   │                     │
//!   │                    │  │   └─切断/open 失敗: バックオフ後に再試行
//!   │                    │  └──────────切断: 即時再接続 (retry=0)─┘
//!   └──────close()───────┴────────────────────────────┘
//! ```
//!
//! ## 再試行ポリシー
//!
//! - 待ち時間 = `min(2^retry_count, 30) * 1000` ms（1s, 2s, 4s, 8s, 16s, 30s, 30s, ...）
//! - ログイン失敗では再試行しない。サーバー側からの切断でのみ再接続する
//! - 確立済みの接続が切れた場合は 1 回だけ即時に再接続し、以降の失敗でまたバックオフする

#![no_std]

pub mod backoff;
pub mod supervisor;

pub use backoff::Backoff;
pub use supervisor::{ConnectionState, ConnectionSupervisor};

/// バックオフの基本単位（ミリ秒）
pub const RETRY_UNIT_MS: u64 = 1000;

/// バックオフ倍率の上限（`RETRY_UNIT_MS` の何倍まで待つか）
pub const RETRY_CAP: u64 = 30;
