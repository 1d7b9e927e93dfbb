//! ハンドルレジストリ実装

use alloc::collections::BTreeMap;

use serde_json::Value;

use crate::characteristic::Characteristic;
use crate::error::RegistryError;

/// ハンドル → 特性 の順序付きマップ
///
/// ## 責任
/// - ハンドルによる O(log n) の検索
/// - 現在値の取得・更新
///
/// ## 注意
/// 未登録ハンドルへの `set_value` は黙って挿入せず `UnknownHandle` を返す。
/// 値を置くには先に `register` すること。
#[derive(Debug, Clone, Default)]
pub struct HandleRegistry {
    chars: BTreeMap<u32, Characteristic>,
}

impl HandleRegistry {
    /// 空のレジストリを生成する
    pub fn new() -> Self {
        HandleRegistry {
            chars: BTreeMap::new(),
        }
    }

    /// 特性を登録する
    ///
    /// 同じハンドルが既にあれば置き換え、古いエントリを返す。
    pub fn register(&mut self, chr: Characteristic) -> Option<Characteristic> {
        self.chars.insert(chr.handle, chr)
    }

    /// 特性の登録を解除する
    pub fn unregister(&mut self, handle: u32) -> Option<Characteristic> {
        self.chars.remove(&handle)
    }

    /// ハンドルで特性を検索する
    pub fn lookup(&self, handle: u32) -> Option<&Characteristic> {
        self.chars.get(&handle)
    }

    /// 現在値を返す
    pub fn get_value(&self, handle: u32) -> Option<&Value> {
        self.chars.get(&handle).map(|chr| &chr.value)
    }

    /// 現在値を更新する
    ///
    /// # エラー
    /// - `RegistryError::UnknownHandle`: 未登録のハンドル
    pub fn set_value(&mut self, handle: u32, value: Value) -> Result<(), RegistryError> {
        let chr = self
            .chars
            .get_mut(&handle)
            .ok_or(RegistryError::UnknownHandle(handle))?;
        chr.value = value;
        Ok(())
    }

    /// ハンドルが登録済みか
    pub fn contains(&self, handle: u32) -> bool {
        self.chars.contains_key(&handle)
    }

    /// 登録数
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// 空か
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// ハンドルの昇順に特性を列挙する
    pub fn iter(&self) -> impl Iterator<Item = &Characteristic> {
        self.chars.values()
    }
}
