//! Status enums.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// Orders start as `Created`; the POS relay moves them to `Sent` once the
/// POS system has accepted the delivery. Failed relays leave the order at
/// `Created`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Created,
    Sent,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Sent => write!(f, "sent"),
        }
    }
}
