// 7.0 settlement.rs: the engine never moves value. every buy, sell and claim queues an
// instruction for the custody layer (a chain, a database ledger) which drains the queue,
// executes the transfer and retries on its side keyed by `SettlementId`.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::fixed::Fixed;
use crate::types::{AccountId, IntentId, MarketId, Timestamp};

// Per-market instruction sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SettlementId(pub u64);

// Why value moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementReason {
    SharePurchase,
    ShareSale,
    Payout,
}

// Types of settlements the engine can produce
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SettlementInstruction {
    // Take `amount` from the account into the market's pool
    Collect {
        id: SettlementId,
        market_id: MarketId,
        account_id: AccountId,
        amount: Fixed,
        reason: SettlementReason,
        intent_id: Option<IntentId>,
        created_at: Timestamp,
    },

    // Pay `amount` out of the market's pool to the account
    Deliver {
        id: SettlementId,
        market_id: MarketId,
        account_id: AccountId,
        amount: Fixed,
        reason: SettlementReason,
        intent_id: Option<IntentId>,
        created_at: Timestamp,
    },
}

impl SettlementInstruction {
    pub fn id(&self) -> SettlementId {
        match self {
            SettlementInstruction::Collect { id, .. } | SettlementInstruction::Deliver { id, .. } => *id,
        }
    }

    pub fn account_id(&self) -> AccountId {
        match self {
            SettlementInstruction::Collect { account_id, .. }
            | SettlementInstruction::Deliver { account_id, .. } => *account_id,
        }
    }

    // Signed flow seen from the account: negative when collected, positive when delivered
    pub fn account_flow(&self) -> Fixed {
        match self {
            SettlementInstruction::Collect { amount, .. } => -*amount,
            SettlementInstruction::Deliver { amount, .. } => *amount,
        }
    }
}

// Pending instructions for one market, in emission order
#[derive(Debug, Clone)]
pub struct SettlementQueue {
    market_id: MarketId,
    next_id: u64,
    pending: VecDeque<SettlementInstruction>,
}

impl SettlementQueue {
    pub fn new(market_id: MarketId) -> Self {
        Self {
            market_id,
            next_id: 1,
            pending: VecDeque::new(),
        }
    }

    fn next_id(&mut self) -> SettlementId {
        let id = SettlementId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn collect(
        &mut self,
        account_id: AccountId,
        amount: Fixed,
        reason: SettlementReason,
        intent_id: Option<IntentId>,
        created_at: Timestamp,
    ) -> SettlementId {
        let id = self.next_id();
        self.pending.push_back(SettlementInstruction::Collect {
            id,
            market_id: self.market_id,
            account_id,
            amount,
            reason,
            intent_id,
            created_at,
        });
        id
    }

    pub fn deliver(
        &mut self,
        account_id: AccountId,
        amount: Fixed,
        reason: SettlementReason,
        intent_id: Option<IntentId>,
        created_at: Timestamp,
    ) -> SettlementId {
        let id = self.next_id();
        self.pending.push_back(SettlementInstruction::Deliver {
            id,
            market_id: self.market_id,
            account_id,
            amount,
            reason,
            intent_id,
            created_at,
        });
        id
    }

    // Hand over up to `max` instructions, oldest first
    pub fn drain(&mut self, max: usize) -> Vec<SettlementInstruction> {
        let count = max.min(self.pending.len());
        self.pending.drain(..count).collect()
    }

    pub fn pending(&self) -> impl Iterator<Item = &SettlementInstruction> {
        self.pending.iter()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    // Calculate net flows per account for validation
    pub fn net_flows(&self) -> HashMap<AccountId, Fixed> {
        let mut flows = HashMap::new();
        for instruction in &self.pending {
            let flow = flows.entry(instruction.account_id()).or_insert(Fixed::ZERO);
            *flow = *flow + instruction.account_flow();
        }
        flows
    }
}
