//! Trade execution and read-only pricing.

use super::book::MarketBook;
use super::core::Engine;
use super::results::{EngineError, TradeIntent, TradeReceipt};
use crate::curve::CurveQuote;
use crate::events::{EventPayload, TradeEvent, TradeRejectedEvent};
use crate::fixed::Fixed;
use crate::position::{increase_position, reduce_position};
use crate::settlement::SettlementReason;
use crate::types::{Direction, MarketId, Outcome, Timestamp};
use rust_decimal::Decimal;
use tracing::{debug, warn};

impl Engine {
    /// Buy or sell shares of one outcome. validate, price and apply happen under the
    /// market's write lock, so the whole trade lands or nothing does.
    pub fn trade(&self, market_id: MarketId, intent: TradeIntent) -> Result<TradeReceipt, EngineError> {
        let book = self.book(market_id)?;
        let mut book = book.write();
        let now = self.now();

        match execute_trade(&mut book, &intent, now, self.config.remember_intents) {
            Ok(receipt) => {
                debug!(
                    market_id = %market_id,
                    account_id = %receipt.account_id,
                    outcome = %receipt.outcome,
                    direction = %receipt.direction,
                    shares = %receipt.shares,
                    amount = %receipt.amount,
                    probability_yes = %receipt.probability_yes,
                    replayed = receipt.replayed,
                    "Trade executed"
                );
                Ok(receipt)
            }
            Err(err) => {
                warn!(
                    market_id = %market_id,
                    account_id = %intent.account,
                    direction = %intent.direction,
                    error = %err,
                    "Trade rejected"
                );
                // Emit rejection event for audit
                book.events.emit(
                    now,
                    EventPayload::TradeRejected(TradeRejectedEvent {
                        account_id: intent.account,
                        outcome: intent.outcome,
                        direction: intent.direction,
                        shares: intent.shares,
                        reason: err.to_string(),
                    }),
                );
                Err(err)
            }
        }
    }

    /// What buying `shares` would cost right now, fee included. nothing is applied.
    pub fn quote_buy(&self, market_id: MarketId, outcome: Outcome, shares: Fixed) -> Result<CurveQuote, EngineError> {
        self.quote(market_id, outcome, Direction::Buy, shares)
    }

    /// What selling `shares` would pay right now, fee deducted. nothing is applied.
    pub fn quote_sell(&self, market_id: MarketId, outcome: Outcome, shares: Fixed) -> Result<CurveQuote, EngineError> {
        self.quote(market_id, outcome, Direction::Sell, shares)
    }

    fn quote(
        &self,
        market_id: MarketId,
        outcome: Outcome,
        direction: Direction,
        shares: Fixed,
    ) -> Result<CurveQuote, EngineError> {
        let book = self.book(market_id)?;
        let book = book.read();
        book.market.params.validate_shares(shares)?;
        Ok(book.market.quote(outcome, direction, shares)?)
    }

    /// Pool ratio for `outcome`
    pub fn implied_probability(&self, market_id: MarketId, outcome: Outcome) -> Result<Decimal, EngineError> {
        let book = self.book(market_id)?;
        let probability = book.read().market.implied_probability(outcome);
        Ok(probability)
    }

    /// Curve price of one more share of `outcome`
    pub fn marginal_price(&self, market_id: MarketId, outcome: Outcome) -> Result<Decimal, EngineError> {
        let book = self.book(market_id)?;
        let book = book.read();
        let market = &book.market;
        Ok(market
            .lmsr()
            .marginal_price(market.total_shares_yes(), market.total_shares_no(), outcome)?)
    }
}

// 8.3: checks run in a fixed order so callers see the same error for the same state.
fn execute_trade(
    book: &mut MarketBook,
    intent: &TradeIntent,
    now: Timestamp,
    remember_intents: bool,
) -> Result<TradeReceipt, EngineError> {
    if let Some(intent_id) = intent.intent_id.filter(|_| remember_intents) {
        if let Some(stored) = book.intents.get(&intent_id) {
            if stored.account_id != intent.account
                || stored.outcome != intent.outcome
                || stored.direction != intent.direction
                || stored.shares != intent.shares
            {
                return Err(EngineError::InvalidParameter(format!(
                    "intent {} already used for a different trade",
                    intent_id.0
                )));
            }
            return Ok(TradeReceipt {
                replayed: true,
                ..stored.clone()
            });
        }
    }

    let market_id = book.market.id;
    if !book.market.accepts_trades_at(now) {
        return Err(EngineError::MarketClosed(market_id));
    }
    book.market.params.validate_shares(intent.shares)?;
    if intent.limit.is_negative() {
        return Err(EngineError::InvalidParameter(format!(
            "limit must not be negative, got {}",
            intent.limit
        )));
    }

    let position = book.position_or_empty(intent.account, now);
    if intent.direction == Direction::Sell {
        let held = position.shares(intent.outcome);
        if intent.shares > held {
            return Err(EngineError::InsufficientShares {
                outcome: intent.outcome,
                held,
                requested: intent.shares,
            });
        }
    }

    let quote = book.market.quote(intent.outcome, intent.direction, intent.shares)?;
    let slipped = match intent.direction {
        Direction::Buy => quote.amount > intent.limit,
        Direction::Sell => quote.amount < intent.limit,
    };
    if slipped {
        return Err(EngineError::SlippageExceeded {
            amount: quote.amount,
            limit: intent.limit,
        });
    }

    // nothing below can fail
    book.market.apply_quote(&quote);
    let next = match intent.direction {
        Direction::Buy => {
            book.settlements.collect(
                intent.account,
                quote.amount,
                SettlementReason::SharePurchase,
                intent.intent_id,
                now,
            );
            increase_position(&position, intent.outcome, intent.shares, quote.amount, now)
        }
        Direction::Sell => {
            book.settlements.deliver(
                intent.account,
                quote.amount,
                SettlementReason::ShareSale,
                intent.intent_id,
                now,
            );
            reduce_position(&position, intent.outcome, intent.shares, quote.amount, now).new_position
        }
    };
    book.positions.insert(intent.account, next);

    let market = &book.market;
    let receipt = TradeReceipt {
        market_id,
        account_id: intent.account,
        outcome: intent.outcome,
        direction: intent.direction,
        shares: intent.shares,
        amount: quote.amount,
        fee: quote.fee,
        average_price: quote.average_price(),
        pool_yes: market.pool_yes(),
        pool_no: market.pool_no(),
        probability_yes: market.implied_probability(Outcome::Yes),
        executed_at: now,
        intent_id: intent.intent_id,
        replayed: false,
    };

    let trade = TradeEvent {
        account_id: intent.account,
        outcome: intent.outcome,
        shares: intent.shares,
        amount: quote.amount,
        fee: quote.fee,
        pool_yes: receipt.pool_yes,
        pool_no: receipt.pool_no,
        probability_yes: receipt.probability_yes,
        intent_id: intent.intent_id,
    };
    let payload = match intent.direction {
        Direction::Buy => EventPayload::SharesPurchased(trade),
        Direction::Sell => EventPayload::SharesSold(trade),
    };
    book.events.emit(now, payload);

    if let Some(intent_id) = intent.intent_id.filter(|_| remember_intents) {
        book.remember_intent(intent_id, receipt.clone());
    }
    Ok(receipt)
}
