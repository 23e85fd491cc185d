//! TCP bytestream context: sequence/ack mapping under in-path byte
//! insertion/removal, modification lists, and retransmission buffering
//! (spec.md §1 item 3, §3, §4.7).
//!
//! One [`ByteStreamMaintainer`] exists per direction of a TCP connection.
//! Elements that rewrite payload bytes in place accumulate their edits
//! into a [`ModificationList`] and [`ModificationList::commit`] it into
//! the maintainer once per packet; a [`RetransmitRing`] holds the
//! post-modification bytes so a retransmission can be served without
//! re-deriving them from the original stream.

pub mod maintainer;
pub mod modlist;
pub mod retransmit;
pub mod seqno;

pub use maintainer::{ByteStreamMaintainer, TcpMaintainerError, PRUNE_THRESHOLD};
pub use modlist::ModificationList;
pub use retransmit::{RetransmitError, RetransmitRing};
pub use seqno::{seq_leq, seq_lt, SeqNo};
