//! ドメイン層
//!
//! 値オブジェクト・エンティティ・純粋な状態機械（論理時計、メンバーシップ、
//! 相互排他エンジン、ラウンドタイマー、ローカルルームインデックス）と、
//! 外部の協調者（共有ストア・バス・クライアント送信）の trait を定義します。

pub mod entity;
pub mod error;
pub mod lamport;
pub mod membership;
pub mod message_bus;
pub mod message_pusher;
pub mod mutual_exclusion;
pub mod repository;
pub mod room_index;
pub mod round_timer;
pub mod value_object;
pub mod word;

pub use entity::{ActiveRound, ChatEntry, ConnectionHandle, DrawingStroke, Participant};
pub use error::{BusError, DictionaryError, MessagePushError, StoreError, ValueObjectError};
pub use lamport::LamportClock;
pub use membership::NodeMembership;
pub use message_bus::{BusChannel, BusSubscription, MessageBus};
pub use message_pusher::{MessagePusher, PusherChannel};
pub use mutual_exclusion::{
    DeferredGrant, MutualExclusion, PeerRequestDecision, PendingRequest, Requester,
};
pub use repository::SharedStore;
pub use room_index::LocalRoomIndex;
pub use round_timer::{RoundDeadline, RoundTimers};
pub use value_object::{
    ConnectionId, ConnectionIdFactory, NodeId, RoomId, RoomIdFactory, RoundId, UserName,
};
pub use word::{Dictionary, WordSource};

#[cfg(test)]
pub use repository::MockSharedStore;
