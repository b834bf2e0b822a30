//! Lamport 論理時計

use std::sync::atomic::{AtomicU64, Ordering};

/// Lamport 論理時計
///
/// ローカルでは単調増加し、タイムスタンプ付きメッセージを受信すると
/// `max(local, received) + 1` に進みます。
#[derive(Debug, Default)]
pub struct LamportClock {
    value: AtomicU64,
}

impl LamportClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// 現在値
    pub fn current(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }

    /// ローカルイベント: 1 進めて新しい値を返す
    pub fn tick(&self) -> u64 {
        self.advance(|local| local.saturating_add(1))
    }

    /// 受信イベント: `max(local, received) + 1` に進めて新しい値を返す
    pub fn witness(&self, received: u64) -> u64 {
        self.advance(|local| local.max(received).saturating_add(1))
    }

    fn advance(&self, step: impl Fn(u64) -> u64) -> u64 {
        let previous = match self
            .value
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |local| Some(step(local)))
        {
            Ok(previous) | Err(previous) => previous,
        };
        step(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_is_strictly_increasing() {
        // テスト項目: tick のたびに値が 1 ずつ増える
        // given (前提条件):
        let clock = LamportClock::new();

        // when (操作):
        let first = clock.tick();
        let second = clock.tick();

        // then (期待する結果):
        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(clock.current(), 2);
    }

    #[test]
    fn test_witness_jumps_past_larger_timestamp() {
        // テスト項目: 受信したタイムスタンプがローカルより大きい場合は max + 1 になる
        // given (前提条件):
        let clock = LamportClock::new();
        clock.tick();

        // when (操作):
        let value = clock.witness(10);

        // then (期待する結果):
        assert_eq!(value, 11);
        assert_eq!(clock.tick(), 12);
    }

    #[test]
    fn test_witness_with_smaller_timestamp_still_advances() {
        // テスト項目: 受信したタイムスタンプが小さくてもローカルは 1 進む
        // given (前提条件):
        let clock = LamportClock::new();
        for _ in 0..5 {
            clock.tick();
        }

        // when (操作):
        let value = clock.witness(2);

        // then (期待する結果):
        assert_eq!(value, 6);
    }

    #[test]
    fn test_witness_saturates_instead_of_overflowing() {
        // テスト項目: 異常に大きいタイムスタンプを受信してもパニックしない
        // given (前提条件):
        let clock = LamportClock::new();

        // when (操作):
        let value = clock.witness(u64::MAX);

        // then (期待する結果):
        assert_eq!(value, u64::MAX);
    }
}
