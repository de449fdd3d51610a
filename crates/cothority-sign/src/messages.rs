//! Wire messages for one collective-signing round.

use cothority_core::NodeIndex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SignMessage {
    /// Root asks every node to commit to signing `message`.
    CommitRequest { message: Vec<u8> },
    /// A node's round-1 nonce commitment, sent to the root.
    Commit {
        signer: NodeIndex,
        commitment: Vec<u8>,
    },
    /// Root publishes the full commitment set once everyone has committed.
    SigningPackage {
        message: Vec<u8>,
        commitments: Vec<(NodeIndex, Vec<u8>)>,
    },
    /// A node's round-2 signature share, sent to the root.
    PartialSignature { signer: NodeIndex, share: Vec<u8> },
}
