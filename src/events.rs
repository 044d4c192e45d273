// 6.0: every state change produces an event. read-side collaborators (caches, UIs, indexers)
// poll a market's log by sequence id instead of being pushed to. the EventPayload enum lists
// all event types.

use crate::fixed::Fixed;
use crate::types::{AccountId, Direction, IntentId, MarketId, Outcome, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Per-market sequence number. strictly increasing, starts at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub market_id: MarketId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, market_id: MarketId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            market_id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    // Lifecycle events
    MarketOpened(MarketOpenedEvent),
    MarketResolved(MarketResolvedEvent),

    // Trade events
    SharesPurchased(TradeEvent),
    SharesSold(TradeEvent),
    TradeRejected(TradeRejectedEvent),

    // Payout events
    Claimed(ClaimedEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketOpenedEvent {
    pub question: String,
    pub initial_liquidity: Fixed,
    pub closes_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketResolvedEvent {
    pub outcome: Outcome,
    pub pool_total: Fixed,
    pub winning_shares: Fixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub account_id: AccountId,
    pub outcome: Outcome,
    pub shares: Fixed,
    /// cost for purchases, proceeds for sales
    pub amount: Fixed,
    pub fee: Fixed,
    pub pool_yes: Fixed,
    pub pool_no: Fixed,
    pub probability_yes: Decimal,
    pub intent_id: Option<IntentId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRejectedEvent {
    pub account_id: AccountId,
    pub outcome: Outcome,
    pub direction: Direction,
    pub shares: Fixed,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimedEvent {
    pub account_id: AccountId,
    pub amount: Fixed,
}

// 6.1: bounded per-market log. oldest events are dropped once `max_events` is exceeded;
// ids keep counting so a reader can tell it fell behind.
#[derive(Debug, Clone)]
pub struct EventLog {
    market_id: MarketId,
    events: VecDeque<Event>,
    next_id: u64,
    max_events: usize,
}

impl EventLog {
    pub fn new(market_id: MarketId, max_events: usize) -> Self {
        Self {
            market_id,
            events: VecDeque::new(),
            next_id: 1,
            max_events: max_events.max(1),
        }
    }

    pub fn emit(&mut self, timestamp: Timestamp, payload: EventPayload) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        self.events
            .push_back(Event::new(id, self.market_id, timestamp, payload));

        while self.events.len() > self.max_events {
            self.events.pop_front();
        }
        id
    }

    /// Events with id greater than `cursor`, oldest first. `None` reads from the start.
    pub fn since(&self, cursor: Option<EventId>) -> Vec<Event> {
        let after = cursor.map(|c| c.0).unwrap_or(0);
        self.events
            .iter()
            .filter(|e| e.id.0 > after)
            .cloned()
            .collect()
    }

    pub fn recent(&self, count: usize) -> Vec<Event> {
        let start = self.events.len().saturating_sub(count);
        self.events.iter().skip(start).cloned().collect()
    }

    pub fn last_id(&self) -> Option<EventId> {
        self.events.back().map(|e| e.id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
