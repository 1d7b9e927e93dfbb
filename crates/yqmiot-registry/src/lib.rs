//! # yqmiot-registry
//!
//! ハンドルで指定される「特性」（characteristic）のレジストリ。
//!
//! 他ノードからの Write（将来は Read）に答えるための値置き場。
//! 特性は組み込みアプリが登録し、セッションが排他的に所有する。
//!
//! ```text
//! Write {h: 7, i: 3, v: 5}
//!   └─▶ lookup(7) ─▶ AUTO_REPLY なら set_value(7, 5) して Response {i: 3, v: 0}
//! ```

#![no_std]
extern crate alloc;

pub mod characteristic;
pub mod error;
pub mod registry;

pub use characteristic::{Characteristic, CharacteristicFlags, CharacteristicKind};
pub use error::RegistryError;
pub use registry::HandleRegistry;
