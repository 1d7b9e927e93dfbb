//! # yqmiot-proto
//!
//! YQMIOT プロトコルのエンベロープ定義と JSON コーデック。
//!
//! ## エンベロープの役割
//!
//! デバイスとサーバー（および他ノード）の間でやり取りされる全メッセージは、
//! 一つの JSON オブジェクト（エンベロープ）に格納される：
//! - `d` / `s`: 宛先ノード ID / 送信元ノード ID（`d` は宛先のないパケットでのみ省略、`s` はサブネット中継時のみ）
//! - `i`: 要求 ID（0 = 返信不要、`0xFFFF` = ログイン応答専用）
//! - `c`: コマンドコード（[`Command`]）
//! - `h`: ハンドル（Read/Write のみ意味を持つ）
//! - `v`: コマンド固有のペイロード（任意の JSON 値）
//!
//! ## Wire Format
//!
//! ```text
//! { "d": 42, "i": 3, "c": 1, "v": 0 }
//! ```
//!
//! 欠けているフィールドはゼロ値として扱う。コーデックはステートレスで I/O を持たない。

#![no_std]
extern crate alloc;

pub mod command;
pub mod envelope;
pub mod error;

pub use command::Command;
pub use envelope::{Envelope, LoginResponse};
pub use error::DecodeError;

pub use serde_json::{Map, Value};

/// ログイン応答の相関に使う予約要求 ID
///
/// 通常の要求 ID 空間と重なるため、アプリケーションの要求 ID としては発行しない。
pub const LOGIN_REQUEST_ID: u32 = 0xFFFF;

/// IoT ハブ（メインサービス）のノード ID
pub const NID_IOTSRV: u32 = 0x7fff_fe00;

/// Android / iOS 通知プッシュサービス（未割り当て）
pub const NID_NOTIFY: u32 = 0x0000_0000;

/// メールサービス（未割り当て）
pub const NID_EMAIL: u32 = 0x0000_0000;

/// SMS サービス（未割り当て）
pub const NID_SMS: u32 = 0x0000_0000;
