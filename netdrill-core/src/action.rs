//! The fixed action vocabulary understood by the execution engine

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Action tags a script may reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionTag {
    Discovery,
    Payments,
    #[serde(rename = "zkapp-txs")]
    ZkappTxs,
    LoadKeys,
    StopDaemon,
    Restart,
    Wait,
    FundKeys,
    Join,
    Sample,
    Except,
    Rotate,
    SetZkappSoftLimit,
}

impl ActionTag {
    /// Get the wire name of the action
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionTag::Discovery => "discovery",
            ActionTag::Payments => "payments",
            ActionTag::ZkappTxs => "zkapp-txs",
            ActionTag::LoadKeys => "load-keys",
            ActionTag::StopDaemon => "stop-daemon",
            ActionTag::Restart => "restart",
            ActionTag::Wait => "wait",
            ActionTag::FundKeys => "fund-keys",
            ActionTag::Join => "join",
            ActionTag::Sample => "sample",
            ActionTag::Except => "except",
            ActionTag::Rotate => "rotate",
            ActionTag::SetZkappSoftLimit => "set-zkapp-soft-limit",
        }
    }

    /// Get every action tag
    pub fn all() -> &'static [ActionTag] {
        &[
            ActionTag::Discovery,
            ActionTag::Payments,
            ActionTag::ZkappTxs,
            ActionTag::LoadKeys,
            ActionTag::StopDaemon,
            ActionTag::Restart,
            ActionTag::Wait,
            ActionTag::FundKeys,
            ActionTag::Join,
            ActionTag::Sample,
            ActionTag::Except,
            ActionTag::Rotate,
            ActionTag::SetZkappSoftLimit,
        ]
    }

    /// Output names the action may emit
    ///
    /// `sample` emits one group per ratio; only the first two are listed.
    pub fn output_names(&self) -> &'static [&'static str] {
        match self {
            ActionTag::Discovery | ActionTag::Payments | ActionTag::ZkappTxs => &["participant"],
            ActionTag::LoadKeys => &["key"],
            ActionTag::Join | ActionTag::Except => &["group"],
            ActionTag::Sample => &["group1", "group2"],
            ActionTag::StopDaemon
            | ActionTag::Restart
            | ActionTag::Wait
            | ActionTag::FundKeys
            | ActionTag::Rotate
            | ActionTag::SetZkappSoftLimit => &[],
        }
    }
}

impl fmt::Display for ActionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActionTag {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionTag::all()
            .iter()
            .copied()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| ModelError::UnknownTag(s.to_string()))
    }
}
