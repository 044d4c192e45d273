// 8.0 engine/core.rs: main engine. holds every market book, the clock and the id counter.

use super::book::MarketBook;
use super::config::EngineConfig;
use super::results::{EngineError, OpenMarket};
use crate::clock::{Clock, SystemClock};
use crate::events::{Event, EventId};
use crate::market::{validate_question, Market};
use crate::fixed::Fixed;
use crate::settlement::SettlementInstruction;
use crate::types::{AccountId, MarketId, Timestamp};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/** 8.1: main engine struct. the outer lock only guards the market map */
#[derive(Debug)]
pub struct Engine {
    pub(super) config: EngineConfig,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) markets: RwLock<HashMap<MarketId, Arc<RwLock<MarketBook>>>>,
    pub(super) next_market_id: AtomicU64,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            markets: RwLock::new(HashMap::new()),
            next_market_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub(super) fn book(&self, market_id: MarketId) -> Result<Arc<RwLock<MarketBook>>, EngineError> {
        self.markets
            .read()
            .get(&market_id)
            .cloned()
            .ok_or(EngineError::MarketNotFound(market_id))
    }

    // 8.2: seed equal pools. rejects bad liquidity, a close time not in the future, or a
    // question out of bounds.
    pub fn open_market(&self, request: OpenMarket) -> Result<Market, EngineError> {
        let now = self.now();

        validate_question(&request.question)?;
        if !request.initial_liquidity.is_positive() {
            return Err(EngineError::InvalidParameter(format!(
                "initial liquidity must be positive, got {}",
                request.initial_liquidity
            )));
        }
        if request.initial_liquidity > self.config.max_initial_liquidity {
            return Err(EngineError::InvalidParameter(format!(
                "initial liquidity {} above maximum {}",
                request.initial_liquidity, self.config.max_initial_liquidity
            )));
        }
        if request.closes_at <= now {
            return Err(EngineError::InvalidParameter(format!(
                "close time {} is not after {}",
                request.closes_at, now
            )));
        }
        let params = request.params.unwrap_or(self.config.market_defaults);
        params.validate()?;

        let market_id = MarketId(self.next_market_id.fetch_add(1, Ordering::SeqCst));
        let market = Market::new(
            market_id,
            request.question,
            request.initial_liquidity,
            request.closes_at,
            params,
            now,
        );
        let snapshot = market.clone();
        let book = MarketBook::open(market, self.config.max_events, self.config.max_intents);
        self.markets
            .write()
            .insert(market_id, Arc::new(RwLock::new(book)));

        info!(
            market_id = %market_id,
            liquidity = %snapshot.initial_liquidity,
            closes_at = %snapshot.closes_at,
            "Market opened"
        );
        Ok(snapshot)
    }

    /// Consistent copy of one market
    pub fn market(&self, market_id: MarketId) -> Result<Market, EngineError> {
        let book = self.book(market_id)?;
        let market = book.read().market.clone();
        Ok(market)
    }

    /// All markets, ordered by id
    pub fn markets(&self) -> Vec<Market> {
        let books: Vec<_> = self.markets.read().values().cloned().collect();
        let mut markets: Vec<Market> = books.iter().map(|b| b.read().market.clone()).collect();
        markets.sort_by_key(|m| m.id);
        markets
    }

    pub fn market_count(&self) -> usize {
        self.markets.read().len()
    }

    /// Events after `cursor` (all retained events for `None`)
    pub fn events_since(&self, market_id: MarketId, cursor: Option<EventId>) -> Result<Vec<Event>, EngineError> {
        let book = self.book(market_id)?;
        let events = book.read().events.since(cursor);
        Ok(events)
    }

    pub fn recent_events(&self, market_id: MarketId, count: usize) -> Result<Vec<Event>, EngineError> {
        let book = self.book(market_id)?;
        let events = book.read().events.recent(count);
        Ok(events)
    }

    /// Hand pending instructions to the custody layer, oldest first
    pub fn drain_settlements(&self, market_id: MarketId, max: usize) -> Result<Vec<SettlementInstruction>, EngineError> {
        let book = self.book(market_id)?;
        let drained = book.write().settlements.drain(max);
        Ok(drained)
    }

    pub fn pending_settlements(&self, market_id: MarketId) -> Result<Vec<SettlementInstruction>, EngineError> {
        let book = self.book(market_id)?;
        let pending = book.read().settlements.pending().cloned().collect();
        Ok(pending)
    }

    /// Net undrained flow per account: positive is owed to the account
    pub fn pending_net_flows(&self, market_id: MarketId) -> Result<HashMap<AccountId, Fixed>, EngineError> {
        let book = self.book(market_id)?;
        let flows = book.read().settlements.net_flows();
        Ok(flows)
    }
}
