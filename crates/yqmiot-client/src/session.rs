//! YQMIOT デバイスセッション
//!
//! ログインパラメータ・接続スーパーバイザ・ハンドルレジストリ・コールバックを束ね、
//! トランスポートからのイベントとアプリからの API 呼び出しを処理する。

use alloc::boxed::Box;
use alloc::string::String;

use serde_json::{Map, Value};
use yqmiot_proto::{Command, Envelope, LOGIN_REQUEST_ID};
use yqmiot_registry::{Characteristic, HandleRegistry, RegistryError};
use yqmiot_supervisor::{ConnectionState, ConnectionSupervisor};
use yqmiot_transport::{Transport, TransportEvent};

use crate::callbacks::Callbacks;
use crate::config::SessionConfig;
use crate::login::LoginParams;
use crate::stats::{Counters, SessionStats};

/// YQMIOT クライアントセッション
///
/// ## 内部アーキテクチャ
///
/// ```text
/// Session
///   ├── Transport            (yqmiot-transport) - 注入された双方向チャンネル
///   ├── ConnectionSupervisor (yqmiot-supervisor) - 接続・再試行・バックオフ
///   ├── Envelope             (yqmiot-proto) - JSON エンコード/デコード
///   ├── HandleRegistry       (yqmiot-registry) - Write に答える特性
///   └── Callbacks            - イベント種別ごとに 1 つ
/// ```
///
/// ## スレッド安全性
///
/// シングルスレッドの協調動作を前提とする。すべての操作はノンブロッキングで、
/// 時間経過は `tick(now_ms)` でのみ進む。コールバックが `Send` でないため `Session` も `Send` ではない。
pub struct Session<T: Transport> {
    /// 設定
    config: SessionConfig,
    /// トランスポート
    transport: T,
    /// 接続状態機械
    supervisor: ConnectionSupervisor,
    /// ログインパラメータ（`begin` で設定）
    login: Option<LoginParams>,
    /// 特性レジストリ
    pub(crate) registry: HandleRegistry,
    /// コールバック
    pub(crate) callbacks: Callbacks,
    /// 最後に発行した要求 ID
    last_request_id: u32,
    /// 統計カウンタ
    pub(crate) counters: Counters,
}

impl<T: Transport> Session<T> {
    /// セッションを生成する（初期状態は Closed）
    pub fn new(transport: T, config: SessionConfig) -> Self {
        let supervisor = ConnectionSupervisor::new(config.backoff());
        Session {
            config,
            transport,
            supervisor,
            login: None,
            registry: HandleRegistry::new(),
            callbacks: Callbacks::default(),
            last_request_id: 0,
            counters: Counters::default(),
        }
    }

    /// デフォルト設定でセッションを生成する
    pub fn with_default_config(transport: T) -> Self {
        Self::new(transport, SessionConfig::default())
    }

    // ===== ライフサイクル =====

    /// ログインパラメータを設定して接続を開始する
    ///
    /// Closed の場合のみ有効。それ以外では何もしない（`state()` で確認すること）。
    pub fn begin(&mut self, login: LoginParams) {
        if !self.supervisor.state().is_closed() {
            tracing::debug!(state = %self.supervisor.state(), "begin ignored: session is not closed");
            return;
        }
        tracing::info!(url = %self.config.url, login = ?login, "begin");
        self.login = Some(login);
        self.connect();
    }

    /// 接続を開始する
    ///
    /// Closed の場合のみ有効。接続試行は次の `tick` で行われる。
    /// 以後 `close` されるまで、切断されても接続を維持しようとする。
    pub fn connect(&mut self) {
        if self.supervisor.connect() {
            tracing::info!("connect scheduled");
        }
    }

    /// 接続を終了する
    ///
    /// 接続・ログイン・再試行待ちのいずれであっても中断し、Closed にする。
    /// Closed での呼び出しは何もしない（トランスポートの close も呼ばない）。
    pub fn close(&mut self) {
        if self.supervisor.close() {
            self.transport.close();
            tracing::info!("session closed");
        }
    }

    /// 協調スケジューリングの tick
    ///
    /// 1. 接続試行の予定時刻に達していれば `Transport::open` を 1 回呼ぶ
    /// 2. トランスポートに溜まったイベントを到着順にすべて処理する
    ///
    /// # 引数
    /// - `now_ms`: 現在時刻（単調増加のミリ秒）
    pub fn tick(&mut self, now_ms: u64) {
        if self.supervisor.poll_attempt(now_ms) {
            self.attempt_open();
        }

        while let Some(event) = self.transport.poll_event() {
            self.handle_transport_event(event);
        }
    }

    /// 現在の接続状態
    pub fn state(&self) -> ConnectionState {
        self.supervisor.state()
    }

    /// 現在のログインパラメータ
    pub fn login_params(&self) -> Option<&LoginParams> {
        self.login.as_ref()
    }

    /// 設定
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// 次の接続試行の予定時刻（ミリ秒）
    pub fn next_attempt_ms(&self) -> Option<u64> {
        self.supervisor.deadline_ms()
    }

    /// 統計情報
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            state: self.supervisor.state(),
            retry_count: self.supervisor.retry_count(),
            frames_sent: self.counters.frames_sent,
            frames_dropped: self.counters.frames_dropped,
            frames_received: self.counters.frames_received,
            decode_errors: self.counters.decode_errors,
            login_failures: self.counters.login_failures,
        }
    }

    /// トランスポートへの参照
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// トランスポートへの可変参照（ホスト側からイベントを注入する場合など）
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // ===== 送信 API（Connected 以外では破棄） =====

    /// 指定ノードへパケットを送る
    ///
    /// # 戻り値
    /// トランスポートに渡せた場合 `true`。未接続で破棄した場合や送信エラーは `false`。
    pub fn send_packet(&mut self, dst: u32, cmd: Command, val: Value) -> bool {
        self.send_envelope(&Envelope::packet(dst, cmd, val))
    }

    /// 送信元を明示してパケットを送る（サブネット中継用）
    pub fn send_packet_from(&mut self, dst: u32, cmd: Command, val: Value, src: u32) -> bool {
        self.send_envelope(&Envelope::relayed(dst, src, cmd, val))
    }

    /// 指定ノードからの要求 `id` に返信する
    pub fn reply(&mut self, dst: u32, id: u32, val: Value) -> bool {
        self.send_envelope(&Envelope::response(dst, id, val))
    }

    /// イベントを報告する
    ///
    /// `fields` に `$name` を追加して EventReport として送る。
    pub fn report_event(&mut self, name: &str, fields: Option<Map<String, Value>>) -> bool {
        let mut fields = fields.unwrap_or_default();
        fields.insert(String::from("$name"), Value::String(String::from(name)));
        self.send_envelope(&Envelope::unaddressed(Command::EventReport, Value::Object(fields)))
    }

    /// 属性を報告する
    pub fn report_props(&mut self, val: Value) -> bool {
        self.send_envelope(&Envelope::unaddressed(Command::PropsReport, val))
    }

    /// 他ノードの特性に書き込む
    pub fn write(&mut self, dst: u32, hdl: u32, val: Value) -> bool {
        self.send_envelope(&Envelope::with_handle(dst, Command::Write, hdl, val))
    }

    /// 他ノードの特性を読み取る（応答は call-response コールバックに届く）
    pub fn read(&mut self, dst: u32, hdl: u32) -> bool {
        self.send_envelope(&Envelope::with_handle(dst, Command::Read, hdl, Value::Null))
    }

    /// 他ノードを呼び出す
    ///
    /// 新しい要求 ID を発行して Call を送る。応答は call-response コールバックに届く。
    ///
    /// # 戻り値
    /// 送信できた場合はその要求 ID
    pub fn call(&mut self, dst: u32, val: Value) -> Option<u32> {
        if !self.state().is_connected() {
            self.drop_frame(Command::Call.code());
            return None;
        }
        let id = self.next_request_id();
        let env = Envelope {
            id,
            ..Envelope::packet(dst, Command::Call, val)
        };
        self.send_envelope(&env).then_some(id)
    }

    // ===== 特性レジストリ =====

    /// 特性を登録する（同じハンドルがあれば置き換えて古いものを返す）
    pub fn register_characteristic(&mut self, chr: Characteristic) -> Option<Characteristic> {
        self.registry.register(chr)
    }

    /// 特性の登録を解除する
    pub fn unregister_characteristic(&mut self, handle: u32) -> Option<Characteristic> {
        self.registry.unregister(handle)
    }

    /// 特性の現在値を更新する
    pub fn set_value(&mut self, handle: u32, value: Value) -> Result<(), RegistryError> {
        self.registry.set_value(handle, value)
    }

    /// 特性の現在値
    pub fn get_value(&self, handle: u32) -> Option<&Value> {
        self.registry.get_value(handle)
    }

    /// レジストリへの参照
    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    // ===== コールバック登録（置き換え） =====

    /// Call 受信
    pub fn on_call(&mut self, callback: impl FnMut(u32, u32, u32, u32, &Value) + 'static) {
        self.callbacks.call = Some(Box::new(callback));
    }

    /// 通常の Response 受信（ログイン応答を除く）
    pub fn on_call_response(&mut self, callback: impl FnMut(u32, u32, u32, u32, &Value) + 'static) {
        self.callbacks.call_response = Some(Box::new(callback));
    }

    /// EventReport 受信
    pub fn on_event_report(&mut self, callback: impl FnMut(u32, u32, u32, u32, &Value) + 'static) {
        self.callbacks.event_report = Some(Box::new(callback));
    }

    /// PropsReport 受信
    pub fn on_props_report(&mut self, callback: impl FnMut(u32, u32, u32, u32, &Value) + 'static) {
        self.callbacks.props_report = Some(Box::new(callback));
    }

    /// SetConfig 受信
    pub fn on_set_config(&mut self, callback: impl FnMut(u32, u32, u32, u32, &Value) + 'static) {
        self.callbacks.set_config = Some(Box::new(callback));
    }

    /// GetConfig 受信
    pub fn on_get_config(&mut self, callback: impl FnMut(u32, u32, u32, u32, &Value) + 'static) {
        self.callbacks.get_config = Some(Box::new(callback));
    }

    /// 自ノード以外を宛先とするパケット（サブネット配下のノード宛て）
    pub fn on_subnode_packet(&mut self, callback: impl FnMut(u32, u32, u32, u32, &Value) + 'static) {
        self.callbacks.subnode_packet = Some(Box::new(callback));
    }

    /// Write 受信 `(src, hdl, val)`
    pub fn on_write(&mut self, callback: impl FnMut(u32, u32, &Value) + 'static) {
        self.callbacks.write = Some(Box::new(callback));
    }

    // ===== Private メソッド =====

    /// 予定された接続試行を 1 回行う
    fn attempt_open(&mut self) {
        tracing::info!(url = %self.config.url, "connect to server");
        if let Err(e) = self.transport.open(&self.config.url) {
            tracing::warn!(error = %e, "connect failed");
            self.supervisor.open_failed();
        }
    }

    /// トランスポートイベントを処理する
    fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => {
                if self.supervisor.on_opened() {
                    tracing::info!("connect success, login ...");
                    self.send_login();
                }
            }
            TransportEvent::Closed => {
                let was = self.supervisor.state();
                if let Some(delay_ms) = self.supervisor.on_closed() {
                    tracing::warn!(state = %was, delay_ms, "connection closed");
                }
            }
            TransportEvent::Message(text) => self.on_data(&text),
        }
    }

    /// ログインエンベロープを送る（Connected チェックを経由しない唯一の送信）
    fn send_login(&mut self) {
        let Some(login) = self.login.as_ref() else {
            tracing::warn!("no login parameters; call begin() instead of connect()");
            return;
        };
        let frame = Envelope::login(login.to_value()).encode();
        self.write_frame(&frame);
    }

    /// Connected の場合のみエンベロープを送る
    pub(crate) fn send_envelope(&mut self, env: &Envelope) -> bool {
        if !self.state().is_connected() {
            self.drop_frame(env.cmd);
            return false;
        }
        self.write_frame(&env.encode())
    }

    /// フレームをトランスポートに渡す
    fn write_frame(&mut self, frame: &str) -> bool {
        match self.transport.send_text(frame) {
            Ok(()) => {
                self.counters.frames_sent += 1;
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "send failed");
                false
            }
        }
    }

    /// 未接続のため送信を破棄する（キューには積まない）
    fn drop_frame(&mut self, cmd: u32) {
        self.counters.frames_dropped += 1;
        tracing::debug!(cmd, state = %self.supervisor.state(), "not connected, frame dropped");
    }

    /// 次の要求 ID（0 とログイン予約 ID は使わない）
    fn next_request_id(&mut self) -> u32 {
        loop {
            self.last_request_id = self.last_request_id.wrapping_add(1);
            if self.last_request_id != 0 && self.last_request_id != LOGIN_REQUEST_ID {
                return self.last_request_id;
            }
        }
    }

    /// ログイン応答を受けた
    pub(crate) fn login_response(&mut self, success: bool) -> bool {
        if success {
            self.supervisor.login_succeeded()
        } else {
            self.counters.login_failures += 1;
            false
        }
    }

    /// 自ノード ID（nid + token 方式の場合のみ分かる）
    pub(crate) fn own_nid(&self) -> Option<u32> {
        self.login.as_ref().and_then(LoginParams::nid)
    }

    #[cfg(test)]
    pub(crate) fn set_last_request_id(&mut self, id: u32) {
        self.last_request_id = id;
    }
}
