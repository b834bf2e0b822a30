//! お題の単語
//!
//! 辞書の供給元は外部の関心事なので trait で抽象化し、
//! 組み込みの単語リストを持つ [`Dictionary`] を既定の実装とします。

use rand::seq::SliceRandom;

use super::DictionaryError;

/// お題の供給元
pub trait WordSource: Send + Sync {
    fn random_word(&self) -> String;
}

const BUILTIN_WORDS: &[&str] = &[
    "apple", "airplane", "anchor", "banana", "bicycle", "bridge", "butterfly", "cactus",
    "camera", "candle", "castle", "cat", "clock", "cloud", "crown", "dinosaur", "dog",
    "dolphin", "dragon", "drum", "elephant", "envelope", "feather", "fish", "flower",
    "giraffe", "guitar", "hammer", "helicopter", "house", "igloo", "island", "kite",
    "ladder", "lighthouse", "lion", "moon", "mountain", "mushroom", "octopus", "owl",
    "penguin", "piano", "pizza", "rainbow", "robot", "rocket", "scissors", "snowman",
    "spider", "star", "sun", "telescope", "tent", "tree", "umbrella", "volcano",
    "whale", "windmill", "zebra",
];

/// 単語リストからランダムに選ぶ辞書
#[derive(Debug, Clone)]
pub struct Dictionary {
    words: Vec<String>,
}

impl Dictionary {
    /// 単語リストから辞書を作成。空白のみの行は除外し、小文字に揃える
    pub fn new(words: Vec<String>) -> Result<Self, DictionaryError> {
        let words: Vec<String> = words
            .into_iter()
            .map(|word| word.trim().to_lowercase())
            .filter(|word| !word.is_empty())
            .collect();
        if words.is_empty() {
            return Err(DictionaryError::Empty);
        }
        Ok(Self { words })
    }

    /// 改行区切りのテキストから辞書を作成
    pub fn from_text(text: &str) -> Result<Self, DictionaryError> {
        Self::new(text.lines().map(str::to_string).collect())
    }

    /// 組み込みの単語リスト
    pub fn builtin() -> Self {
        Self {
            words: BUILTIN_WORDS.iter().map(|word| word.to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl WordSource for Dictionary {
    fn random_word(&self) -> String {
        self.words
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| BUILTIN_WORDS[0].to_string())
    }
}
