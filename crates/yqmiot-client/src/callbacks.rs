//! コールバックスロット
//!
//! 各イベントにつきコールバックは高々 1 つ。登録すると前のものを置き換える（追加ではない）。
//! コールバックはディスパッチ中に同期的に呼ばれる。セッション自体は借用できないので、
//! 返信が必要な場合はアプリ側で記録しておき `tick` から戻った後に `reply` する。

use alloc::boxed::Box;

use serde_json::Value;

/// パケット系コールバック `(dst, src, id, cmd, val)`
pub type PacketCallback = Box<dyn FnMut(u32, u32, u32, u32, &Value)>;

/// Write コールバック `(src, hdl, val)`
pub type WriteCallback = Box<dyn FnMut(u32, u32, &Value)>;

/// イベント種別ごとのスロット
#[derive(Default)]
pub(crate) struct Callbacks {
    pub(crate) call: Option<PacketCallback>,
    pub(crate) call_response: Option<PacketCallback>,
    pub(crate) event_report: Option<PacketCallback>,
    pub(crate) props_report: Option<PacketCallback>,
    pub(crate) set_config: Option<PacketCallback>,
    pub(crate) get_config: Option<PacketCallback>,
    pub(crate) subnode_packet: Option<PacketCallback>,
    pub(crate) write: Option<WriteCallback>,
}
