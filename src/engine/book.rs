// 8.1: everything one market owns. the engine keeps each book behind its own lock, so
// mutations on one market serialize while other markets proceed.

use super::results::TradeReceipt;
use crate::events::{EventLog, EventPayload, MarketOpenedEvent};
use crate::market::Market;
use crate::position::Position;
use crate::settlement::SettlementQueue;
use crate::types::{AccountId, IntentId, Timestamp};
use std::collections::{HashMap, VecDeque};

#[derive(Debug)]
pub struct MarketBook {
    pub(super) market: Market,
    pub(super) positions: HashMap<AccountId, Position>,
    pub(super) events: EventLog,
    pub(super) settlements: SettlementQueue,
    /// receipts of applied intents, keyed by caller id
    pub(super) intents: HashMap<IntentId, TradeReceipt>,
    intent_order: VecDeque<IntentId>,
    max_intents: usize,
}

impl MarketBook {
    pub(super) fn open(market: Market, max_events: usize, max_intents: usize) -> Self {
        let mut events = EventLog::new(market.id, max_events);
        events.emit(
            market.opened_at,
            EventPayload::MarketOpened(MarketOpenedEvent {
                question: market.question.clone(),
                initial_liquidity: market.initial_liquidity,
                closes_at: market.closes_at,
            }),
        );

        Self {
            settlements: SettlementQueue::new(market.id),
            market,
            positions: HashMap::new(),
            events,
            intents: HashMap::new(),
            intent_order: VecDeque::new(),
            max_intents: max_intents.max(1),
        }
    }

    /// Stores the receipt for a retried intent, forgetting the oldest past `max_intents`
    pub(super) fn remember_intent(&mut self, intent_id: IntentId, receipt: TradeReceipt) {
        if self.intents.insert(intent_id, receipt).is_none() {
            self.intent_order.push_back(intent_id);
        }
        while self.intent_order.len() > self.max_intents {
            if let Some(oldest) = self.intent_order.pop_front() {
                self.intents.remove(&oldest);
            }
        }
    }

    pub fn position(&self, account_id: AccountId) -> Option<&Position> {
        self.positions.get(&account_id)
    }

    /// Existing position, or a fresh empty one that is not stored yet
    pub(super) fn position_or_empty(&self, account_id: AccountId, now: Timestamp) -> Position {
        self.positions
            .get(&account_id)
            .cloned()
            .unwrap_or_else(|| Position::new(account_id, self.market.id, now))
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }
}
