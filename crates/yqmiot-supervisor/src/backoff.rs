//! 指数バックオフ

use crate::{RETRY_CAP, RETRY_UNIT_MS};

/// 上限付き指数バックオフ
///
/// `delay = min(2^retry_count, cap) * unit_ms`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// 基本単位（ミリ秒）
    unit_ms: u64,
    /// 倍率の上限
    cap: u64,
}

impl Backoff {
    /// 基本単位と倍率上限を指定して生成する
    pub const fn new(unit_ms: u64, cap: u64) -> Self {
        Backoff { unit_ms, cap }
    }

    /// `retry_count` 回目の再試行までの待ち時間（ミリ秒）
    ///
    /// `retry_count` がどれだけ大きくてもオーバーフローせず、上限で飽和する。
    pub fn delay_ms(&self, retry_count: u32) -> u64 {
        let factor = 1u64
            .checked_shl(retry_count)
            .unwrap_or(u64::MAX)
            .min(self.cap);
        factor.saturating_mul(self.unit_ms)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::new(RETRY_UNIT_MS, RETRY_CAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sequence() {
        let backoff = Backoff::default();
        let delays: [u64; 8] = core::array::from_fn(|i| backoff.delay_ms(i as u32));
        assert_eq!(
            delays,
            [1000, 2000, 4000, 8000, 16000, 30000, 30000, 30000]
        );
    }

    #[test]
    fn test_saturates_for_huge_counts() {
        let backoff = Backoff::default();
        assert_eq!(backoff.delay_ms(63), 30_000);
        assert_eq!(backoff.delay_ms(64), 30_000);
        assert_eq!(backoff.delay_ms(u32::MAX), 30_000);
    }

    #[test]
    fn test_non_decreasing() {
        let backoff = Backoff::default();
        let mut prev = 0;
        for retry in 0..100 {
            let delay = backoff.delay_ms(retry);
            assert!(delay >= prev, "待ち時間は単調非減少であるべき");
            prev = delay;
        }
    }

    #[test]
    fn test_custom_unit_and_cap() {
        let backoff = Backoff::new(10, 4);
        assert_eq!(backoff.delay_ms(0), 10);
        assert_eq!(backoff.delay_ms(1), 20);
        assert_eq!(backoff.delay_ms(2), 40);
        assert_eq!(backoff.delay_ms(3), 40);
    }
}
