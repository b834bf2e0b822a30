//! ラウンドのタイムアウト管理
//!
//! タイムアウトはクロージャではなくデータ（期限・ルーム・ラウンド ID）として
//! min-heap に積みます。発火時にはストア上のラウンド ID と照合し、
//! 一致しなければ何もしません（キャンセルではなく失効で扱う）。

use std::{cmp::Reverse, collections::BinaryHeap};

use super::{RoomId, RoundId};

/// ラウンドの期限
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RoundDeadline {
    /// 発火時刻（Unix ミリ秒）
    pub fire_at: i64,
    pub room_id: RoomId,
    pub round_id: RoundId,
}

/// 期限の早い順に取り出せるタイマーキュー
#[derive(Debug, Default)]
pub struct RoundTimers {
    heap: BinaryHeap<Reverse<RoundDeadline>>,
}

impl RoundTimers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, deadline: RoundDeadline) {
        self.heap.push(Reverse(deadline));
    }

    /// `now_millis` までに期限を迎えたものを早い順に取り出す
    pub fn pop_due(&mut self, now_millis: i64) -> Vec<RoundDeadline> {
        let mut due = Vec::new();
        while self
            .heap
            .peek()
            .is_some_and(|Reverse(next)| next.fire_at <= now_millis)
        {
            if let Some(Reverse(deadline)) = self.heap.pop() {
                due.push(deadline);
            }
        }
        due
    }

    pub fn next_fire_at(&self) -> Option<i64> {
        self.heap.peek().map(|Reverse(next)| next.fire_at)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
