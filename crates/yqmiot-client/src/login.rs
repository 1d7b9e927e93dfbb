//! ログインパラメータ

use alloc::string::String;

use serde_json::{json, Value};

use crate::error::ClientError;

/// ログイン方式と認証情報
#[derive(Clone, PartialEq, Eq)]
pub enum LoginParams {
    /// login_type 0: ノード ID + トークン
    NodeToken { nid: u32, token: String },
    /// login_type 1: トークンのみ
    Token { token: String },
}

impl LoginParams {
    /// ノード ID + トークン方式
    pub fn node(nid: u32, token: &str) -> Self {
        LoginParams::NodeToken {
            nid,
            token: String::from(token),
        }
    }

    /// トークンのみ方式
    pub fn token(token: &str) -> Self {
        LoginParams::Token {
            token: String::from(token),
        }
    }

    /// 数値の login_type から組み立てる（token 方式では `nid` は無視される）
    ///
    /// # エラー
    /// - `ClientError::InvalidLoginType`: 0, 1 以外
    pub fn from_raw(login_type: u32, nid: u32, token: &str) -> Result<Self, ClientError> {
        match login_type {
            0 => Ok(LoginParams::node(nid, token)),
            1 => Ok(LoginParams::token(token)),
            other => Err(ClientError::InvalidLoginType(other)),
        }
    }

    /// 数値の login_type
    pub fn login_type(&self) -> u32 {
        match self {
            LoginParams::NodeToken { .. } => 0,
            LoginParams::Token { .. } => 1,
        }
    }

    /// 自ノード ID（token 方式では分からないので `None`）
    pub fn nid(&self) -> Option<u32> {
        match self {
            LoginParams::NodeToken { nid, .. } => Some(*nid),
            LoginParams::Token { .. } => None,
        }
    }

    /// ログインエンベロープの `v` に入れる値
    pub fn to_value(&self) -> Value {
        match self {
            LoginParams::NodeToken { nid, token } => json!({
                "type": 0,
                "nid": nid,
                "token": token,
            }),
            LoginParams::Token { token } => json!({
                "type": 1,
                "token": token,
            }),
        }
    }
}

// トークンはログに出さない
impl core::fmt::Debug for LoginParams {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LoginParams::NodeToken { nid, .. } => f
                .debug_struct("NodeToken")
                .field("nid", nid)
                .field("token", &"***")
                .finish(),
            LoginParams::Token { .. } => f.debug_struct("Token").field("token", &"***").finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn test_node_token_value() {
        let login = LoginParams::node(42, "tok");
        assert_eq!(login.login_type(), 0);
        assert_eq!(login.nid(), Some(42));
        assert_eq!(login.to_value(), json!({"type": 0, "nid": 42, "token": "tok"}));
    }

    #[test]
    fn test_token_only_value() {
        let login = LoginParams::token("tok");
        assert_eq!(login.login_type(), 1);
        assert_eq!(login.nid(), None);
        assert_eq!(login.to_value(), json!({"type": 1, "token": "tok"}));
    }

    #[test]
    fn test_from_raw() {
        assert_eq!(LoginParams::from_raw(0, 7, "a").unwrap(), LoginParams::node(7, "a"));
        assert_eq!(LoginParams::from_raw(1, 7, "a").unwrap(), LoginParams::token("a"));
        assert_eq!(
            LoginParams::from_raw(2, 7, "a"),
            Err(ClientError::InvalidLoginType(2))
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let text = format!("{:?}", LoginParams::node(1, "secret-token"));
        assert!(!text.contains("secret-token"));
        assert!(text.contains("nid"));
    }
}
