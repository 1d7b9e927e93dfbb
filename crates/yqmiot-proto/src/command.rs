//! コマンドコード表
//!
//! AUTH=2 / NOTIFY=12 を含む旧番号体系は扱わない。ここにある表だけが正規。

/// エンベロープの `c` フィールドに入るコマンド
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Command {
    /// 無効コマンド
    Invalid = 0,
    /// 返信（`i` で要求と対応づける）
    Response = 1,
    /// ログイン
    Login = 2,
    /// サーバーからの切断通知（予約、未実装）
    Close = 3,
    /// 他デバイスからの疎通確認（予約）
    Ping = 4,
    /// 属性レポート
    PropsReport = 5,
    /// イベントレポート
    EventReport = 6,
    /// 呼び出し
    Call = 7,
    /// 設定取得
    GetConfig = 8,
    /// 設定変更
    SetConfig = 9,
    /// 特性の読み取り（予約）
    Read = 10,
    /// 特性への書き込み
    Write = 11,
}

impl Command {
    /// wire 上のコード値
    pub fn code(self) -> u32 {
        self as u32
    }

    /// コード値から Command を得る。表にないコードは `None`
    pub fn from_code(code: u32) -> Option<Self> {
        let cmd = match code {
            0 => Command::Invalid,
            1 => Command::Response,
            2 => Command::Login,
            3 => Command::Close,
            4 => Command::Ping,
            5 => Command::PropsReport,
            6 => Command::EventReport,
            7 => Command::Call,
            8 => Command::GetConfig,
            9 => Command::SetConfig,
            10 => Command::Read,
            11 => Command::Write,
            _ => return None,
        };
        Some(cmd)
    }
}

impl From<Command> for u32 {
    fn from(cmd: Command) -> Self {
        cmd.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_wire_table() {
        assert_eq!(Command::Response.code(), 1);
        assert_eq!(Command::Login.code(), 2);
        assert_eq!(Command::PropsReport.code(), 5);
        assert_eq!(Command::EventReport.code(), 6);
        assert_eq!(Command::Call.code(), 7);
        assert_eq!(Command::Write.code(), 11);
    }

    #[test]
    fn test_from_code_covers_table() {
        for code in 0..=11u32 {
            let cmd = Command::from_code(code).expect("表の範囲内のコード");
            assert_eq!(cmd.code(), code);
        }
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(Command::from_code(12), None);
        assert_eq!(Command::from_code(u32::MAX), None);
    }
}
