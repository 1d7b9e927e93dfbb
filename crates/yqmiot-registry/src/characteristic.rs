//! 特性（characteristic）の定義

use alloc::string::String;

use bitflags::bitflags;
use serde_json::Value;

/// 特性の種類
///
/// 意味づけのためのタグで、コア側では種類による振る舞いの違いはない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CharacteristicKind {
    /// 無効な種類
    #[default]
    Invalid,
    /// 属性
    Property,
    /// 設定
    Config,
    /// イベント
    Event,
    /// メソッド
    Method,
}

impl CharacteristicKind {
    /// 数値コード（0 = Invalid, 1 = Property, 2 = Config, 3 = Event, 4 = Method）
    pub fn code(self) -> u8 {
        match self {
            CharacteristicKind::Invalid => 0,
            CharacteristicKind::Property => 1,
            CharacteristicKind::Config => 2,
            CharacteristicKind::Event => 3,
            CharacteristicKind::Method => 4,
        }
    }

    /// 数値コードから種類を得る。範囲外は `Invalid`
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => CharacteristicKind::Property,
            2 => CharacteristicKind::Config,
            3 => CharacteristicKind::Event,
            4 => CharacteristicKind::Method,
            _ => CharacteristicKind::Invalid,
        }
    }
}

bitflags! {
    /// 特性のフラグ
    ///
    /// - bit 0: AUTO_REPLY - Write を受けたら値を反映して成功 (0) を自動返信する
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CharacteristicFlags: u32 {
        /// Write を自動で反映・返信する
        const AUTO_REPLY = 1 << 0;
    }
}

/// レジストリの 1 エントリ
#[derive(Debug, Clone, PartialEq)]
pub struct Characteristic {
    /// ハンドル（レジストリ内で一意）
    pub handle: u32,
    /// 種類
    pub kind: CharacteristicKind,
    /// フラグ
    pub flags: CharacteristicFlags,
    /// 説明（任意）
    pub description: String,
    /// 現在値
    pub value: Value,
}

impl Characteristic {
    /// フラグなし・値 null の特性を生成する
    pub fn new(handle: u32, kind: CharacteristicKind) -> Self {
        Characteristic {
            handle,
            kind,
            flags: CharacteristicFlags::empty(),
            description: String::new(),
            value: Value::Null,
        }
    }

    /// フラグを設定する
    pub fn with_flags(mut self, flags: CharacteristicFlags) -> Self {
        self.flags = flags;
        self
    }

    /// 初期値を設定する
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = value;
        self
    }

    /// 説明を設定する
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = String::from(description);
        self
    }

    /// Write を自動返信するか
    pub fn is_auto_reply(&self) -> bool {
        self.flags.contains(CharacteristicFlags::AUTO_REPLY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let chr = Characteristic::new(7, CharacteristicKind::Property)
            .with_flags(CharacteristicFlags::AUTO_REPLY)
            .with_value(json!(0))
            .with_description("relay");

        assert_eq!(chr.handle, 7);
        assert_eq!(chr.kind, CharacteristicKind::Property);
        assert!(chr.is_auto_reply());
        assert_eq!(chr.value, json!(0));
        assert_eq!(chr.description, "relay");
    }

    #[test]
    fn test_default_has_no_auto_reply() {
        let chr = Characteristic::new(1, CharacteristicKind::Method);
        assert!(!chr.is_auto_reply());
        assert_eq!(chr.value, Value::Null);
    }

    #[test]
    fn test_kind_codes() {
        for code in 0..=4u8 {
            assert_eq!(CharacteristicKind::from_code(code).code(), code);
        }
        assert_eq!(CharacteristicKind::from_code(200), CharacteristicKind::Invalid);
    }
}
