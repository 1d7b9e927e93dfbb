//! yqmiot-registry エラー型

/// レジストリ操作のエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// 登録されていないハンドル
    #[error("Unknown handle: {0}")]
    UnknownHandle(u32),
}
