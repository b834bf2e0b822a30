//! エンティティ
//!
//! 共有ストアに保存されるルームの構成要素と、ローカル接続のハンドルを定義します。

use super::value_object::{ConnectionId, RoundId, UserName};

/// ルームの参加者
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub name: UserName,
    pub score: u32,
}

impl Participant {
    /// スコア 0 の参加者を作成
    pub fn new(name: UserName) -> Self {
        Self { name, score: 0 }
    }
}

/// チャット履歴の 1 件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub name: UserName,
    pub message: String,
}

/// 描画ストローク
///
/// 座標ペアをフラットに並べた `points` と、曲線の張り `tension`。
/// 履歴は追記のみで、順に再生するとキャンバスが再構成されます。
#[derive(Debug, Clone, PartialEq)]
pub struct DrawingStroke {
    pub points: Vec<f64>,
    pub tension: f64,
}

/// 進行中のラウンド
///
/// 出題者と答えは常に組で存在します（片方だけが設定されることはない）。
/// `started_at` は開始したノードの壁時計（Unix ミリ秒）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveRound {
    pub drawer: UserName,
    pub answer: String,
    pub round_id: RoundId,
    pub started_at: i64,
}

impl ActiveRound {
    /// 開始から `timeout_millis` 以上経っているか
    ///
    /// 開始したノードが停止してタイマーが失われたラウンドを、
    /// 他のノードが終わらせてよいかの判定に使います。
    pub fn is_expired(&self, now_millis: i64, timeout_millis: i64) -> bool {
        now_millis.saturating_sub(self.started_at) >= timeout_millis
    }

    pub fn is_drawer(&self, name: &UserName) -> bool {
        &self.drawer == name
    }

    /// 大文字小文字を区別せずに答えと比較
    pub fn is_correct_guess(&self, guess: &str) -> bool {
        guess.to_lowercase() == self.answer
    }
}

/// ローカルに接続しているクライアントのハンドル
///
/// 認証済みのユーザー名と、送信チャンネルを引くための接続 ID の組。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub user_name: UserName,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, user_name: UserName) -> Self {
        Self { id, user_name }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(value: &str) -> UserName {
        UserName::new(value.to_string()).unwrap()
    }

    #[test]
    fn test_correct_guess_is_case_insensitive() {
        // テスト項目: 答えとの比較は大文字小文字を区別しない
        // given (前提条件):
        let round = ActiveRound {
            drawer: name("alice"),
            answer: "cat".to_string(),
            round_id: RoundId::new_random(),
            started_at: 0,
        };

        // when (操作) / then (期待する結果):
        assert!(round.is_correct_guess("CAT"));
        assert!(round.is_correct_guess("Cat"));
        assert!(!round.is_correct_guess("cats"));
        assert!(!round.is_correct_guess(" cat"));
    }

    #[test]
    fn test_is_drawer() {
        let round = ActiveRound {
            drawer: name("alice"),
            answer: "cat".to_string(),
            round_id: RoundId::new_random(),
            started_at: 0,
        };

        assert!(round.is_drawer(&name("alice")));
        assert!(!round.is_drawer(&name("bob")));
    }

    #[test]
    fn test_round_expiry_boundary() {
        // テスト項目: 開始からちょうど期限の時刻で期限切れになる
        // given (前提条件):
        let round = ActiveRound {
            drawer: name("alice"),
            answer: "cat".to_string(),
            round_id: RoundId::new_random(),
            started_at: 1_000,
        };

        // when (操作) / then (期待する結果):
        assert!(!round.is_expired(1_000, 300));
        assert!(!round.is_expired(1_299, 300));
        assert!(round.is_expired(1_300, 300));
        // 時計が巻き戻っても期限切れにはならない
        assert!(!round.is_expired(900, 300));
    }
}
