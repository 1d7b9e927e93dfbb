//! エンベロープとその JSON エンコード/デコード

use alloc::string::{String, ToString};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::command::Command;
use crate::error::DecodeError;
use crate::LOGIN_REQUEST_ID;

/// YQMIOT の送受信単位
///
/// 整数フィールドはすべて 0 がデフォルト。エンコード時、`s` `i` `h` は 0 なら省略し、
/// `c` と `v` は常に書き出す。`d` は宛先を持つパケットでは 0 でも書き出し、
/// 宛先のないパケット（ログイン・レポート）では省略する。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Envelope {
    /// 宛先ノード ID（`None` = `d` なし）
    #[serde(rename = "d", default, skip_serializing_if = "Option::is_none")]
    pub dst: Option<u32>,
    /// 送信元ノード ID（サブネット中継時のみ）
    #[serde(rename = "s", default, skip_serializing_if = "is_zero")]
    pub src: u32,
    /// 要求 ID（0 = 返信不要）
    #[serde(rename = "i", default, skip_serializing_if = "is_zero")]
    pub id: u32,
    /// コマンドコード（表にないコードもそのまま保持する）
    #[serde(rename = "c", default)]
    pub cmd: u32,
    /// ハンドル（Read/Write のみ）
    #[serde(rename = "h", default, skip_serializing_if = "is_zero")]
    pub hdl: u32,
    /// コマンド固有のペイロード
    #[serde(rename = "v", default)]
    pub val: Value,
}

fn is_zero(v: &u32) -> bool {
    *v == 0
}

/// エンベロープの構築・エンコード・デコードユーティリティ
impl Envelope {
    /// 宛先ノードへのパケットを組み立てる
    pub fn packet(dst: u32, cmd: Command, val: Value) -> Self {
        Envelope {
            dst: Some(dst),
            cmd: cmd.code(),
            val,
            ..Default::default()
        }
    }

    /// サブネット中継用（送信元ノードを明示する）パケットを組み立てる
    pub fn relayed(dst: u32, src: u32, cmd: Command, val: Value) -> Self {
        Envelope {
            src,
            ..Envelope::packet(dst, cmd, val)
        }
    }

    /// `id` に対応づけた Response を組み立てる
    pub fn response(dst: u32, id: u32, val: Value) -> Self {
        Envelope {
            id,
            ..Envelope::packet(dst, Command::Response, val)
        }
    }

    /// ハンドル付きのパケット（Read/Write）を組み立てる
    pub fn with_handle(dst: u32, cmd: Command, hdl: u32, val: Value) -> Self {
        Envelope {
            hdl,
            ..Envelope::packet(dst, cmd, val)
        }
    }

    /// ログインパケットを組み立てる（宛先なし）
    ///
    /// # 引数
    /// - `val`: `{"type": .., "nid": .., "token": ..}` 形式のログイン値
    pub fn login(val: Value) -> Self {
        Envelope::unaddressed(Command::Login, val)
    }

    /// 宛先なしのパケット（EventReport / PropsReport など、サーバーが配送先を決めるもの）
    pub fn unaddressed(cmd: Command, val: Value) -> Self {
        Envelope {
            cmd: cmd.code(),
            val,
            ..Default::default()
        }
    }

    /// JSON テキストからエンベロープをデコードする
    ///
    /// # エラー
    /// - `DecodeError::Malformed`: JSON として不正
    /// - `DecodeError::NotAnObject`: トップレベルがオブジェクトではない
    /// - `DecodeError::InvalidField`: 整数フィールドの型・範囲が不正
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| DecodeError::Malformed(e.to_string()))?;

        if !value.is_object() {
            return Err(DecodeError::NotAnObject);
        }

        serde_json::from_value(value).map_err(|e| DecodeError::InvalidField(e.to_string()))
    }

    /// エンベロープを JSON テキストにエンコードする
    pub fn encode(&self) -> String {
        // 文字列キーと Value のみで構成されるため失敗しない
        serde_json::to_string(self).expect("Envelope encode should not fail")
    }

    /// 宛先ノード ID（`d` が無ければ 0）
    pub fn dst_or_zero(&self) -> u32 {
        self.dst.unwrap_or(0)
    }

    /// 既知のコマンドなら `Some`
    pub fn command(&self) -> Option<Command> {
        Command::from_code(self.cmd)
    }

    /// ログイン応答（`c == Response` かつ `i == 0xFFFF`）か
    pub fn is_login_response(&self) -> bool {
        self.cmd == Command::Response.code() && self.id == LOGIN_REQUEST_ID
    }
}

/// ログイン応答の値 `{"$err": int, "$msg": string}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginResponse {
    /// エラーコード（0 = 成功）
    pub err: i64,
    /// エラーメッセージ（無い場合は空文字列）
    pub msg: String,
}

impl LoginResponse {
    /// ログイン応答の値を解釈する
    ///
    /// `$err` が無い場合は 0（成功）とみなす。整数以外が入っている場合は -1 とする。
    pub fn from_value(val: &Value) -> Self {
        let err = match val.get("$err") {
            None | Some(Value::Null) => 0,
            Some(v) => v.as_i64().unwrap_or(-1),
        };
        let msg = val
            .get("$msg")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        LoginResponse { err, msg }
    }

    /// ログイン成功か
    pub fn is_success(&self) -> bool {
        self.err == 0
    }
}
