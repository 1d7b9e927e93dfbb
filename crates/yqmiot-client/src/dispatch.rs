//! 受信パケットのディスパッチ
//!
//! 1 フレームずつ同期的に処理する。返信を含めて処理し終えるまで次のフレームは読まない。

use serde_json::Value;
use yqmiot_proto::{Command, Envelope, LoginResponse};
use yqmiot_transport::Transport;

use crate::callbacks::PacketCallback;
use crate::session::Session;

impl<T: Transport> Session<T> {
    /// 受信したテキストフレームを処理する
    ///
    /// デコードできないフレームは捨てる（ログのみ、再試行なし）。
    pub(crate) fn on_data(&mut self, text: &str) {
        self.counters.frames_received += 1;

        let env = match Envelope::decode(text) {
            Ok(env) => env,
            Err(e) => {
                self.counters.decode_errors += 1;
                tracing::warn!(error = %e, "recv data error, frame discarded");
                return;
            }
        };
        tracing::debug!(dst = env.dst_or_zero(), src = env.src, id = env.id, cmd = env.cmd, "recv packet");

        // ログイン応答は通常の要求管理を通さない
        if env.is_login_response() {
            self.on_login_response(&env.val);
            return;
        }

        if self.route_to_subnode(&env) {
            return;
        }

        match env.command() {
            Some(Command::Call) => emit(&mut self.callbacks.call, &env),
            Some(Command::Response) => emit(&mut self.callbacks.call_response, &env),
            Some(Command::EventReport) => emit(&mut self.callbacks.event_report, &env),
            Some(Command::PropsReport) => emit(&mut self.callbacks.props_report, &env),
            Some(Command::SetConfig) => emit(&mut self.callbacks.set_config, &env),
            Some(Command::GetConfig) => emit(&mut self.callbacks.get_config, &env),
            Some(Command::Write) => self.on_write_request(env),
            // 他デバイスからの疎通確認（予約）
            Some(Command::Ping) => {}
            // サーバーからの切断通知（予約、サーバー側未実装）
            Some(Command::Close) => {}
            _ => tracing::debug!(cmd = env.cmd, "unhandled command ignored"),
        }
    }

    /// ログイン応答 `{"$err": int, "$msg": string}`
    ///
    /// 失敗しても再試行は予定しない。サーバーが切断するまで Connecting のまま待つ。
    fn on_login_response(&mut self, val: &Value) {
        let resp = LoginResponse::from_value(val);
        if resp.is_success() {
            if self.login_response(true) {
                tracing::info!("login success");
            }
        } else {
            self.login_response(false);
            tracing::warn!(err = resp.err, msg = %resp.msg, "login failed");
        }
    }

    /// 自ノード以外が宛先なら subnode コールバックに渡す
    ///
    /// 自ノード ID が分かる（nid + token 方式）かつコールバックが登録済みの場合のみ。
    fn route_to_subnode(&mut self, env: &Envelope) -> bool {
        let Some(own_nid) = self.own_nid() else {
            return false;
        };
        let dst = env.dst_or_zero();
        if dst == 0 || dst == own_nid {
            return false;
        }
        match self.callbacks.subnode_packet.as_mut() {
            Some(callback) => {
                callback(dst, env.src, env.id, env.cmd, &env.val);
                true
            }
            None => false,
        }
    }

    /// Write 要求
    ///
    /// - 登録済み: AUTO_REPLY なら値を反映して成功 (0) を返信し、フラグに関わらず write コールバックを呼ぶ
    /// - 未登録: 要求 ID があれば失敗 (-1) を返信する。コールバックは呼ばない
    fn on_write_request(&mut self, env: Envelope) {
        let auto_reply = match self.registry.lookup(env.hdl) {
            Some(chr) => chr.is_auto_reply(),
            None => {
                tracing::debug!(hdl = env.hdl, src = env.src, "write to unknown handle");
                if env.id != 0 {
                    self.reply(env.src, env.id, Value::from(-1));
                }
                return;
            }
        };

        if auto_reply {
            if let Err(e) = self.registry.set_value(env.hdl, env.val.clone()) {
                tracing::warn!(error = %e, "auto-reply write not applied");
            }
            if env.id != 0 {
                self.reply(env.src, env.id, Value::from(0));
            }
        }

        if let Some(callback) = self.callbacks.write.as_mut() {
            callback(env.src, env.hdl, &env.val);
        }
    }
}

/// 登録済みならコールバックを呼ぶ
fn emit(slot: &mut Option<PacketCallback>, env: &Envelope) {
    if let Some(callback) = slot.as_mut() {
        callback(env.dst_or_zero(), env.src, env.id, env.cmd, &env.val);
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    use serde_json::json;
    use yqmiot_registry::{Characteristic, CharacteristicFlags, CharacteristicKind};
    use yqmiot_supervisor::ConnectionState;
    use yqmiot_transport::{MemoryPeer, MemoryTransport};

    use super::*;
    use crate::LoginParams;

    type Seen = Rc<RefCell<Vec<(u32, u32, u32, u32, Value)>>>;

    fn connected(login: LoginParams) -> (Session<MemoryTransport>, MemoryPeer) {
        let (transport, peer) = MemoryTransport::pair();
        let mut session = Session::with_default_config(transport);
        session.begin(login);
        session.tick(0);
        peer.push_opened();
        peer.push_text(r#"{"i":65535,"c":1,"v":{"$err":0}}"#);
        session.tick(0);
        assert_eq!(session.state(), ConnectionState::Connected);
        peer.take_sent();
        (session, peer)
    }

    fn recorder() -> (Seen, impl FnMut(u32, u32, u32, u32, &Value) + 'static) {
        let seen: Seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, move |dst: u32, src: u32, id: u32, cmd: u32, val: &Value| {
            sink.borrow_mut().push((dst, src, id, cmd, val.clone()));
        })
    }

    #[test]
    fn test_routes_each_command_to_its_slot() {
        let (mut session, peer) = connected(LoginParams::token("t"));
        let (calls, on_call) = recorder();
        let (responses, on_response) = recorder();
        let (events, on_event) = recorder();
        let (props, on_props) = recorder();
        let (sets, on_set) = recorder();
        let (gets, on_get) = recorder();
        session.on_call(on_call);
        session.on_call_response(on_response);
        session.on_event_report(on_event);
        session.on_props_report(on_props);
        session.on_set_config(on_set);
        session.on_get_config(on_get);

        peer.push_text(r#"{"d":1,"s":2,"i":3,"c":7,"v":"call"}"#);
        peer.push_text(r#"{"i":4,"c":1,"v":"resp"}"#);
        peer.push_text(r#"{"c":6,"v":"event"}"#);
        peer.push_text(r#"{"c":5,"v":"props"}"#);
        peer.push_text(r#"{"c":9,"v":"set"}"#);
        peer.push_text(r#"{"c":8,"v":"get"}"#);
        session.tick(10);

        assert_eq!(calls.borrow().as_slice(), &[(1, 2, 3, 7, json!("call"))]);
        assert_eq!(responses.borrow().as_slice(), &[(0, 0, 4, 1, json!("resp"))]);
        assert_eq!(events.borrow().len(), 1);
        assert_eq!(props.borrow().len(), 1);
        assert_eq!(sets.borrow()[0].4, json!("set"));
        assert_eq!(gets.borrow()[0].4, json!("get"));
    }

    #[test]
    fn test_reserved_and_unknown_commands_are_ignored() {
        let (mut session, peer) = connected(LoginParams::token("t"));
        let (calls, on_call) = recorder();
        session.on_call(on_call);

        peer.push_text(r#"{"c":4}"#);
        peer.push_text(r#"{"c":3}"#);
        peer.push_text(r#"{"c":0}"#);
        peer.push_text(r#"{"c":10,"h":1}"#);
        peer.push_text(r#"{"c":250}"#);
        session.tick(10);

        assert!(calls.borrow().is_empty());
        assert!(peer.sent().is_empty());
        assert_eq!(session.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_callback_replacement() {
        let (mut session, peer) = connected(LoginParams::token("t"));
        let (first, on_first) = recorder();
        let (second, on_second) = recorder();
        session.on_call(on_first);
        session.on_call(on_second);

        peer.push_text(r#"{"c":7,"v":1}"#);
        session.tick(10);

        assert!(first.borrow().is_empty(), "置き換えられたコールバックは呼ばれない");
        assert_eq!(second.borrow().len(), 1);
    }

    #[test]
    fn test_undecodable_frames_are_discarded() {
        let (mut session, peer) = connected(LoginParams::token("t"));
        let (calls, on_call) = recorder();
        session.on_call(on_call);

        peer.push_text("not json");
        peer.push_text("[1,2]");
        peer.push_text(r#"{"c":"seven"}"#);
        peer.push_text(r#"{"c":7,"v":"after"}"#);
        session.tick(10);

        // 後続のフレームは処理され続ける
        assert_eq!(calls.borrow().len(), 1);
        assert_eq!(session.stats().decode_errors, 3);
        assert_eq!(session.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_write_without_auto_reply_invokes_callback_only() {
        let (mut session, peer) = connected(LoginParams::token("t"));
        session.register_characteristic(
            Characteristic::new(8, CharacteristicKind::Config).with_value(json!("old")),
        );
        let writes: Rc<RefCell<Vec<(u32, u32, Value)>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&writes);
        session.on_write(move |src, hdl, val| sink.borrow_mut().push((src, hdl, val.clone())));

        peer.push_text(r#"{"s":5,"c":11,"h":8,"i":2,"v":"new"}"#);
        session.tick(10);

        assert!(peer.sent().is_empty(), "AUTO_REPLY なしでは自動返信しない");
        assert_eq!(session.get_value(8), Some(&json!("old")), "値はアプリが反映する");
        assert_eq!(writes.borrow().as_slice(), &[(5, 8, json!("new"))]);
    }

    #[test]
    fn test_write_unknown_handle_without_id_is_silent() {
        let (mut session, peer) = connected(LoginParams::token("t"));
        peer.push_text(r#"{"s":5,"c":11,"h":99,"v":1}"#);
        session.tick(10);
        assert!(peer.sent().is_empty());
    }

    #[test]
    fn test_auto_reply_without_id_applies_silently() {
        let (mut session, peer) = connected(LoginParams::token("t"));
        session.register_characteristic(
            Characteristic::new(7, CharacteristicKind::Property)
                .with_flags(CharacteristicFlags::AUTO_REPLY)
                .with_value(json!(0)),
        );
        peer.push_text(r#"{"s":5,"c":11,"h":7,"v":9}"#);
        session.tick(10);

        assert_eq!(session.get_value(7), Some(&json!(9)));
        assert!(peer.sent().is_empty(), "id = 0 は返信不要");
    }

    #[test]
    fn test_subnode_routing_requires_known_nid() {
        let (mut session, peer) = connected(LoginParams::node(42, "t"));
        let (subnode, on_subnode) = recorder();
        let (calls, on_call) = recorder();
        session.on_subnode_packet(on_subnode);
        session.on_call(on_call);

        peer.push_text(r#"{"d":77,"c":7,"v":1}"#);
        peer.push_text(r#"{"d":42,"c":7,"v":2}"#);
        peer.push_text(r#"{"c":7,"v":3}"#);
        session.tick(10);

        assert_eq!(subnode.borrow().as_slice(), &[(77, 0, 0, 7, json!(1))]);
        assert_eq!(calls.borrow().len(), 2);
    }

    #[test]
    fn test_subnode_routing_disabled_for_token_login() {
        let (mut session, peer) = connected(LoginParams::token("t"));
        let (subnode, on_subnode) = recorder();
        let (calls, on_call) = recorder();
        session.on_subnode_packet(on_subnode);
        session.on_call(on_call);

        peer.push_text(r#"{"d":77,"c":7,"v":1}"#);
        session.tick(10);

        assert!(subnode.borrow().is_empty());
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn test_login_response_not_forwarded_to_call_response() {
        let (mut session, peer) = connected(LoginParams::token("t"));
        let (responses, on_response) = recorder();
        session.on_call_response(on_response);

        peer.push_text(r#"{"i":65535,"c":1,"v":{"$err":0}}"#);
        session.tick(10);

        assert!(responses.borrow().is_empty());
        assert_eq!(session.state(), ConnectionState::Connected);
    }
}
