//! YqmiotClient wasm-bindgen エクスポート
//!
//! JS ホスト（ブラウザ / Node.js）から呼び出す YQMIOT クライアントの主エントリポイント。
//! WebSocket は JS 側が持ち、このクラスはセッションとホストの間でアクションとイベントを受け渡す。

extern crate alloc;

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use js_sys::{Array, Function, Object, Reflect};
use wasm_bindgen::prelude::*;

use yqmiot_client::{
    Characteristic, CharacteristicFlags, CharacteristicKind, Command, LoginParams, Map, Session,
    SessionConfig, Value,
};

use crate::host::{HostAction, HostTransport};

/// YQMIOT クライアントセッション
///
/// ## ホストとのやり取り
///
/// ```text
/// JS ホスト                          YqmiotClient
///   setInterval ──tick(now)──────────▶ Session::tick
///               ◀──[{op:"open",url}]──  HostTransport のアクション
///   ws.onopen  ──transportOpened()───▶ イベントキュー（次の tick で処理）
///   ws.onmessage ─transportMessage()─▶ 〃
///   ws.onclose ──transportClosed()───▶ 〃
/// ```
///
/// ## スレッド安全性
///
/// WASM はシングルスレッドのため、`!Send + !Sync` で問題ない。
#[wasm_bindgen]
pub struct YqmiotClient {
    session: Session<HostTransport>,
}

#[wasm_bindgen]
impl YqmiotClient {
    /// クライアントを初期化する
    ///
    /// # 引数
    /// - `config_json`: 設定 JSON（省略時はデフォルト）
    ///   例: `{"url":"ws://192.168.1.10:27881/ws","retry_unit_ms":1000,"retry_cap":30}`
    ///
    /// # エラー
    /// - 設定 JSON の解析・検証失敗
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<YqmiotClient, JsError> {
        let config = match config_json {
            Some(text) => SessionConfig::from_json(&text).map_err(to_js_error)?,
            None => SessionConfig::default(),
        };
        Ok(YqmiotClient {
            session: Session::new(HostTransport::new(), config),
        })
    }

    /// ログインパラメータを設定して接続を開始する
    ///
    /// # 引数
    /// - `login_type`: 0 = nid + token, 1 = token のみ
    ///
    /// # エラー
    /// - 未知の `login_type`
    #[wasm_bindgen]
    pub fn begin(&mut self, login_type: u32, nid: u32, token: &str) -> Result<(), JsError> {
        let login = LoginParams::from_raw(login_type, nid, token).map_err(to_js_error)?;
        self.session.begin(login);
        Ok(())
    }

    /// 接続を開始する（ログインパラメータは前回の `begin` のもの）
    #[wasm_bindgen]
    pub fn connect(&mut self) {
        self.session.connect();
    }

    /// 接続を終了する
    #[wasm_bindgen]
    pub fn close(&mut self) {
        self.session.close();
    }

    /// 定期タイマー tick
    ///
    /// `setInterval` から定期的に呼び出す。予定された接続試行を行い、
    /// `transport*` で届いたイベントを処理する。
    ///
    /// # 戻り値
    /// ホストが実行すべきアクションの配列
    /// (`{op:"open",url}` / `{op:"send",data}` / `{op:"close"}`)
    #[wasm_bindgen]
    pub fn tick(&mut self, now_ms: f64) -> Result<Array, JsError> {
        self.session.tick(now_ms as u64);
        self.take_actions()
    }

    /// 溜まっているアクションを取り出す（`close` や送信 API の直後に使う）
    #[wasm_bindgen(js_name = "takeActions")]
    pub fn take_actions(&mut self) -> Result<Array, JsError> {
        actions_to_js(self.session.transport_mut().take_actions())
    }

    /// ホストの WebSocket が開いた
    #[wasm_bindgen(js_name = "transportOpened")]
    pub fn transport_opened(&mut self) {
        self.session.transport_mut().push_opened();
    }

    /// ホストの WebSocket が閉じた（接続失敗を含む）
    #[wasm_bindgen(js_name = "transportClosed")]
    pub fn transport_closed(&mut self) {
        self.session.transport_mut().push_closed();
    }

    /// ホストがテキストフレームを受信した
    #[wasm_bindgen(js_name = "transportMessage")]
    pub fn transport_message(&mut self, text: String) {
        self.session.transport_mut().push_message(text);
    }

    /// 接続状態（0 = Closed, 1 = Connecting, 2 = Connected）
    #[wasm_bindgen(js_name = "getState")]
    pub fn get_state(&self) -> u8 {
        self.session.state().as_u8()
    }

    // ===== 送信 API（値は JSON テキスト） =====

    /// # エラー
    /// - 未知のコマンドコード
    /// - `val_json` が JSON として不正
    #[wasm_bindgen(js_name = "sendPacket")]
    pub fn send_packet(&mut self, dst: u32, cmd: u32, val_json: &str) -> Result<bool, JsError> {
        let cmd = Command::from_code(cmd)
            .ok_or_else(|| JsError::new(&format!("Unknown command code: {}", cmd)))?;
        Ok(self.session.send_packet(dst, cmd, parse_value(val_json).map_err(to_js_error)?))
    }

    #[wasm_bindgen]
    pub fn reply(&mut self, dst: u32, id: u32, val_json: &str) -> Result<bool, JsError> {
        Ok(self.session.reply(dst, id, parse_value(val_json).map_err(to_js_error)?))
    }

    /// # エラー
    /// - `fields_json` が JSON オブジェクトではない
    #[wasm_bindgen(js_name = "reportEvent")]
    pub fn report_event(&mut self, name: &str, fields_json: Option<String>) -> Result<bool, JsError> {
        let fields = match fields_json {
            Some(text) => Some(parse_object(&text).map_err(to_js_error)?),
            None => None,
        };
        Ok(self.session.report_event(name, fields))
    }

    #[wasm_bindgen(js_name = "reportProps")]
    pub fn report_props(&mut self, val_json: &str) -> Result<bool, JsError> {
        Ok(self.session.report_props(parse_value(val_json).map_err(to_js_error)?))
    }

    #[wasm_bindgen]
    pub fn write(&mut self, dst: u32, hdl: u32, val_json: &str) -> Result<bool, JsError> {
        Ok(self.session.write(dst, hdl, parse_value(val_json).map_err(to_js_error)?))
    }

    #[wasm_bindgen]
    pub fn read(&mut self, dst: u32, hdl: u32) -> bool {
        self.session.read(dst, hdl)
    }

    /// # 戻り値
    /// 送信できた場合は要求 ID、未接続なら `undefined`
    #[wasm_bindgen]
    pub fn call(&mut self, dst: u32, val_json: &str) -> Result<Option<u32>, JsError> {
        Ok(self.session.call(dst, parse_value(val_json).map_err(to_js_error)?))
    }

    // ===== 特性レジストリ =====

    /// 特性を登録する（同じハンドルは置き換え）
    ///
    /// # 引数
    /// - `kind`: 0 = Invalid, 1 = Property, 2 = Config, 3 = Event, 4 = Method
    /// - `flags`: ビット 0 = AUTO_REPLY
    #[wasm_bindgen(js_name = "registerCharacteristic")]
    pub fn register_characteristic(
        &mut self,
        handle: u32,
        kind: u8,
        flags: u32,
        value_json: Option<String>,
        description: Option<String>,
    ) -> Result<(), JsError> {
        let mut chr = Characteristic::new(handle, CharacteristicKind::from_code(kind))
            .with_flags(CharacteristicFlags::from_bits_truncate(flags));
        if let Some(text) = value_json {
            chr = chr.with_value(parse_value(&text).map_err(to_js_error)?);
        }
        if let Some(text) = description {
            chr = chr.with_description(&text);
        }
        self.session.register_characteristic(chr);
        Ok(())
    }

    #[wasm_bindgen(js_name = "unregisterCharacteristic")]
    pub fn unregister_characteristic(&mut self, handle: u32) -> bool {
        self.session.unregister_characteristic(handle).is_some()
    }

    /// # エラー
    /// - 未登録のハンドル
    #[wasm_bindgen(js_name = "setValue")]
    pub fn set_value(&mut self, handle: u32, val_json: &str) -> Result<(), JsError> {
        self.session
            .set_value(handle, parse_value(val_json).map_err(to_js_error)?)
            .map_err(to_js_error)
    }

    /// 特性の現在値（JSON テキスト）。未登録なら `undefined`
    #[wasm_bindgen(js_name = "getValue")]
    pub fn get_value(&self, handle: u32) -> Option<String> {
        self.session.get_value(handle).map(Value::to_string)
    }

    // ===== コールバック（JS 関数、値は JSON テキスト） =====

    /// `f(dst, src, id, cmd, valJson)`
    #[wasm_bindgen(js_name = "onCall")]
    pub fn on_call(&mut self, f: Function) {
        self.session.on_call(packet_callback(f));
    }

    #[wasm_bindgen(js_name = "onCallResponse")]
    pub fn on_call_response(&mut self, f: Function) {
        self.session.on_call_response(packet_callback(f));
    }

    #[wasm_bindgen(js_name = "onEventReport")]
    pub fn on_event_report(&mut self, f: Function) {
        self.session.on_event_report(packet_callback(f));
    }

    #[wasm_bindgen(js_name = "onPropsReport")]
    pub fn on_props_report(&mut self, f: Function) {
        self.session.on_props_report(packet_callback(f));
    }

    #[wasm_bindgen(js_name = "onSetConfig")]
    pub fn on_set_config(&mut self, f: Function) {
        self.session.on_set_config(packet_callback(f));
    }

    #[wasm_bindgen(js_name = "onGetConfig")]
    pub fn on_get_config(&mut self, f: Function) {
        self.session.on_get_config(packet_callback(f));
    }

    #[wasm_bindgen(js_name = "onSubnodePacket")]
    pub fn on_subnode_packet(&mut self, f: Function) {
        self.session.on_subnode_packet(packet_callback(f));
    }

    /// `f(src, hdl, valJson)`
    #[wasm_bindgen(js_name = "onWrite")]
    pub fn on_write(&mut self, f: Function) {
        self.session.on_write(move |src: u32, hdl: u32, val: &Value| {
            let result = f.call3(
                &JsValue::NULL,
                &JsValue::from(src),
                &JsValue::from(hdl),
                &JsValue::from_str(&val.to_string()),
            );
            if let Err(e) = result {
                tracing::warn!(error = ?e, "write callback threw");
            }
        });
    }

    /// セッション統計を JSON 文字列で返す
    ///
    /// # 戻り値
    /// JSON 文字列:
    /// ```json
    /// {
    ///   "state": 2,
    ///   "retry_count": 0,
    ///   "frames_sent": 12,
    ///   "frames_dropped": 1,
    ///   "frames_received": 9,
    ///   "decode_errors": 0,
    ///   "login_failures": 0
    /// }
    /// ```
    #[wasm_bindgen(js_name = "getStats")]
    pub fn get_stats(&self) -> String {
        let stats = self.session.stats();
        serde_json::json!({
            "state": stats.state.as_u8(),
            "retry_count": stats.retry_count,
            "frames_sent": stats.frames_sent,
            "frames_dropped": stats.frames_dropped,
            "frames_received": stats.frames_received,
            "decode_errors": stats.decode_errors,
            "login_failures": stats.login_failures,
        })
        .to_string()
    }
}

/// アクション列を `{op, url?, data?}` オブジェクトの配列に変換する
fn actions_to_js(actions: Vec<HostAction>) -> Result<Array, JsError> {
    let result = Array::new();
    for action in actions {
        let obj = Object::new();
        set_field(&obj, "op", &JsValue::from_str(action.op()))?;
        match &action {
            HostAction::Open(url) => set_field(&obj, "url", &JsValue::from_str(url))?,
            HostAction::Send(data) => set_field(&obj, "data", &JsValue::from_str(data))?,
            HostAction::Close => {}
        }
        result.push(&obj);
    }
    Ok(result)
}

fn set_field(obj: &Object, key: &str, value: &JsValue) -> Result<(), JsError> {
    Reflect::set(obj, &JsValue::from_str(key), value)
        .map_err(|e| JsError::new(&format!("Failed to build action: {:?}", e)))?;
    Ok(())
}

/// JS 関数をパケット系コールバックに包む
fn packet_callback(f: Function) -> impl FnMut(u32, u32, u32, u32, &Value) + 'static {
    move |dst: u32, src: u32, id: u32, cmd: u32, val: &Value| {
        let args = Array::of5(
            &JsValue::from(dst),
            &JsValue::from(src),
            &JsValue::from(id),
            &JsValue::from(cmd),
            &JsValue::from_str(&val.to_string()),
        );
        if let Err(e) = f.apply(&JsValue::NULL, &args) {
            tracing::warn!(error = ?e, cmd, "packet callback threw");
        }
    }
}

fn parse_value(text: &str) -> Result<Value, String> {
    serde_json::from_str(text).map_err(|e| format!("Invalid JSON value: {}", e))
}

fn parse_object(text: &str) -> Result<Map<String, Value>, String> {
    match parse_value(text)? {
        Value::Object(map) => Ok(map),
        other => Err(format!("Expected a JSON object, got: {}", other)),
    }
}

fn to_js_error(e: impl core::fmt::Display) -> JsError {
    JsError::new(&e.to_string())
}
