//! End-to-end market lifecycle tests.
//!
//! Open, trade, resolve and claim through the engine, checking the error paths
//! and what the event log and settlement queue record along the way.

use binary_amm::*;
use rust_decimal_macros::dec;
use std::sync::Arc;

const CLOSES_AT: i64 = 86_400_000;

struct Harness {
    engine: Engine,
    clock: Arc<ManualClock>,
    market: MarketId,
}

impl Harness {
    fn new(liquidity: i64) -> Self {
        Self::with_params(liquidity, MarketParams::default())
    }

    fn with_params(liquidity: i64, params: MarketParams) -> Self {
        let clock = Arc::new(ManualClock::new(Timestamp::from_millis(0)));
        let engine = Engine::with_clock(EngineConfig::default(), clock.clone());
        let market = engine
            .open_market(
                OpenMarket::new(
                    "Will the referendum pass with a majority?",
                    Fixed::from_int(liquidity),
                    Timestamp::from_millis(CLOSES_AT),
                )
                .with_params(params),
            )
            .unwrap()
            .id;
        Self { engine, clock, market }
    }

    fn buy(&self, account: u64, outcome: Outcome, shares: i64) -> Result<TradeReceipt, EngineError> {
        self.engine.trade(
            self.market,
            TradeIntent::buy(AccountId(account), outcome, Fixed::from_int(shares), Fixed::from_int(1_000_000_000)),
        )
    }

    fn sell(&self, account: u64, outcome: Outcome, shares: i64) -> Result<TradeReceipt, EngineError> {
        self.engine
            .trade(self.market, TradeIntent::sell(AccountId(account), outcome, Fixed::from_int(shares), Fixed::ZERO))
    }

    fn close(&self) {
        self.clock.set(Timestamp::from_millis(CLOSES_AT));
    }
}

#[test]
fn test_reference_scenario() {
    let h = Harness::new(1000);
    let alice = 1;
    let bob = 2;

    // buy 100 YES: probability rises above one half
    let receipt = h.buy(alice, Outcome::Yes, 100).unwrap();
    assert!(receipt.probability_yes > dec!(0.5));
    assert!(receipt.amount.is_positive());
    h.buy(bob, Outcome::No, 20).unwrap();

    // sell more than held
    let err = h.sell(alice, Outcome::Yes, 200).unwrap_err();
    assert!(matches!(err, EngineError::InsufficientShares { .. }));

    // resolve before close
    let err = h.engine.resolve(h.market, Outcome::Yes).unwrap_err();
    assert!(matches!(err, EngineError::MarketStillOpen { .. }));

    // resolve after close: once
    h.close();
    h.engine.resolve(h.market, Outcome::Yes).unwrap();
    assert_eq!(
        h.engine.resolve(h.market, Outcome::Yes),
        Err(EngineError::AlreadyResolved(h.market))
    );

    // winners are paid, NO-only holders hold nothing claimable
    let payout = h.engine.claim(h.market, AccountId(alice)).unwrap();
    assert_eq!(payout, Fixed::from_int(100));
    assert!(matches!(
        h.engine.claim(h.market, AccountId(bob)),
        Err(EngineError::NoPosition { .. })
    ));
}

#[test]
fn test_lmsr_reference_cost() {
    let h = Harness::new(1000);
    let receipt = h.buy(1, Outcome::Yes, 100).unwrap();

    // 1000 * ln((e^0.1 + 1) / 2) = 51.2494795136...
    let cost = receipt.amount.value();
    assert!(cost > dec!(51.2494795136) && cost < dec!(51.2494795137), "cost {}", cost);
    // marginal price after the trade: e^0.1 / (e^0.1 + 1)
    let price = h.engine.marginal_price(h.market, Outcome::Yes).unwrap();
    assert!(price > dec!(0.52497918) && price < dec!(0.52497919), "price {}", price);
}

#[test]
fn test_trade_after_close_is_rejected() {
    let h = Harness::new(1000);
    h.buy(1, Outcome::Yes, 10).unwrap();
    h.close();

    assert_eq!(h.buy(1, Outcome::Yes, 10), Err(EngineError::MarketClosed(h.market)));
    assert_eq!(h.sell(1, Outcome::Yes, 10), Err(EngineError::MarketClosed(h.market)));

    h.engine.resolve(h.market, Outcome::No).unwrap();
    assert_eq!(h.buy(1, Outcome::No, 10), Err(EngineError::MarketClosed(h.market)));
}

#[test]
fn test_claim_before_resolution() {
    let h = Harness::new(1000);
    h.buy(1, Outcome::Yes, 10).unwrap();
    assert_eq!(
        h.engine.claim(h.market, AccountId(1)),
        Err(EngineError::MarketNotResolved(h.market))
    );
}

#[test]
fn test_unknown_market_everywhere() {
    let h = Harness::new(1000);
    let missing = MarketId(999);
    let intent = TradeIntent::buy(AccountId(1), Outcome::Yes, Fixed::ONE, Fixed::from_int(10));

    assert_eq!(h.engine.trade(missing, intent), Err(EngineError::MarketNotFound(missing)));
    assert_eq!(h.engine.resolve(missing, Outcome::Yes), Err(EngineError::MarketNotFound(missing)));
    assert_eq!(h.engine.claim(missing, AccountId(1)), Err(EngineError::MarketNotFound(missing)));
    assert!(h.engine.valuation(missing, AccountId(1)).is_err());
    assert!(h.engine.quote_buy(missing, Outcome::Yes, Fixed::ONE).is_err());
}

#[test]
fn test_trade_size_rules() {
    let params = MarketParams {
        min_trade_shares: Fixed::ONE,
        max_trade_shares: Fixed::from_int(500),
        lot_size: Fixed::ONE,
        ..MarketParams::default()
    };
    let h = Harness::with_params(1000, params);

    assert!(matches!(h.buy(1, Outcome::Yes, 0), Err(EngineError::InvalidParameter(_))));
    assert!(matches!(h.buy(1, Outcome::Yes, 501), Err(EngineError::InvalidParameter(_))));
    let fractional = TradeIntent::buy(AccountId(1), Outcome::Yes, Fixed::new(dec!(2.5)), Fixed::from_int(100));
    assert!(matches!(h.engine.trade(h.market, fractional), Err(EngineError::InvalidParameter(_))));
    assert!(h.buy(1, Outcome::Yes, 500).is_ok());
}

#[test]
fn test_probability_band_rejects_extreme_trades() {
    let h = Harness::new(100);
    // 1000 shares on depth 100 would price YES at 1 / (1 + e^-10) > 0.9999
    let err = h.buy(1, Outcome::Yes, 1000).unwrap_err();
    assert!(matches!(err, EngineError::InsufficientLiquidity(_)));

    // nothing was applied
    let market = h.engine.market(h.market).unwrap();
    assert_eq!(market.total_shares_yes(), Fixed::ZERO);
    assert_eq!(market.pool_total(), Fixed::from_int(200));
    assert!(h.engine.position(h.market, AccountId(1)).unwrap().is_none());
}

#[test]
fn test_buys_far_past_the_band_are_still_liquidity_errors() {
    // 100000 shares on depth 1000 and 100 shares on depth 1: gap / b of 100
    for (liquidity, shares) in [(1000, 100_000), (1, 100), (1, 1_000_000)] {
        let h = Harness::new(liquidity);
        let err = h.buy(1, Outcome::Yes, shares).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientLiquidity(_)), "{liquidity}/{shares}: {err}");
        let quoted = h.engine.quote_buy(h.market, Outcome::No, Fixed::from_int(shares));
        assert!(matches!(quoted, Err(EngineError::InsufficientLiquidity(_))));
        assert_eq!(h.engine.market(h.market).unwrap().pool_total(), Fixed::from_int(2 * liquidity));
    }
}

#[test]
fn test_partial_sell_releases_basis_pro_rata() {
    let h = Harness::new(1000);
    let bought = h.buy(1, Outcome::No, 80).unwrap();
    let sold = h.sell(1, Outcome::No, 20).unwrap();

    let position = h.engine.position(h.market, AccountId(1)).unwrap().unwrap();
    assert_eq!(position.shares_no(), Fixed::from_int(60));
    let released = bought.amount - position.cost_basis();
    // a quarter of the holding carries a quarter of the basis (rounded down)
    let expected = bought.amount.value() / dec!(4);
    assert!((released.value() - expected).abs() < dec!(0.000000000000000002));
    assert_eq!(position.realized_pnl, sold.amount - released);
}

#[test]
fn test_fee_stays_in_pools() {
    let params = MarketParams {
        fee: Bps::new(200), // 2%
        ..MarketParams::default()
    };
    let h = Harness::with_params(1000, params);
    let receipt = h.buy(1, Outcome::Yes, 100).unwrap();

    assert!(receipt.fee.is_positive());
    let market = h.engine.market(h.market).unwrap();
    assert_eq!(market.fees_collected, receipt.fee);
    assert_eq!(market.pool_total(), Fixed::from_int(2000) + receipt.amount);

    // gross of 51.249... at 2%
    assert!(receipt.fee.value() > dec!(1.0249) && receipt.fee.value() < dec!(1.0250));
}

#[test]
fn test_events_mirror_mutations() {
    let h = Harness::new(1000);
    h.buy(1, Outcome::Yes, 50).unwrap();
    h.sell(1, Outcome::Yes, 10).unwrap();
    let _ = h.sell(1, Outcome::Yes, 100);
    h.close();
    h.engine.resolve(h.market, Outcome::Yes).unwrap();
    h.engine.claim(h.market, AccountId(1)).unwrap();

    let events = h.engine.events_since(h.market, None).unwrap();
    let kinds: Vec<&str> = events
        .iter()
        .map(|e| match e.payload {
            EventPayload::MarketOpened(_) => "opened",
            EventPayload::SharesPurchased(_) => "purchased",
            EventPayload::SharesSold(_) => "sold",
            EventPayload::TradeRejected(_) => "rejected",
            EventPayload::MarketResolved(_) => "resolved",
            EventPayload::Claimed(_) => "claimed",
        })
        .collect();
    assert_eq!(kinds, vec!["opened", "purchased", "sold", "rejected", "resolved", "claimed"]);

    // ids strictly increase and the cursor skips what was read
    assert!(events.windows(2).all(|w| w[0].id < w[1].id));
    let tail = h.engine.events_since(h.market, Some(events[3].id)).unwrap();
    assert_eq!(tail.len(), 2);

    match &events.last().unwrap().payload {
        EventPayload::Claimed(claimed) => assert_eq!(claimed.amount, Fixed::from_int(40)),
        other => panic!("unexpected payload {:?}", other),
    }
}

#[test]
fn test_settlements_balance_the_pools() {
    let h = Harness::new(1000);
    h.buy(1, Outcome::Yes, 100).unwrap();
    h.buy(2, Outcome::No, 60).unwrap();
    h.sell(2, Outcome::No, 15).unwrap();
    h.close();
    h.engine.resolve(h.market, Outcome::No).unwrap();
    let payout = h.engine.claim(h.market, AccountId(2)).unwrap();
    assert_eq!(h.engine.market(h.market).unwrap().outstanding_liability(), Fixed::ZERO);

    // loser only paid in, winner paid in, sold some back, then collected the payout
    let flows = h.engine.pending_net_flows(h.market).unwrap();
    assert!(flows[&AccountId(1)].is_negative());
    assert_eq!(payout, Fixed::from_int(45));
    let pending_net: Fixed = flows.values().sum();
    let pending_total: Fixed = h
        .engine
        .pending_settlements(h.market)
        .unwrap()
        .iter()
        .map(|i| i.account_flow())
        .sum();
    assert_eq!(pending_net, pending_total);

    let instructions = h.engine.drain_settlements(h.market, usize::MAX).unwrap();
    assert!(h.engine.pending_net_flows(h.market).unwrap().is_empty());
    assert_eq!(instructions.len(), 4);
    assert!(h.engine.pending_settlements(h.market).unwrap().is_empty());

    // what accounts paid in minus what they took out is what the pools gained
    let net_in: Fixed = instructions.iter().map(|i| -i.account_flow()).sum();
    let market = h.engine.market(h.market).unwrap();
    assert_eq!(net_in, market.pool_total() - market.total_claimed - Fixed::from_int(2000));
}

#[test]
fn test_intent_is_applied_once() {
    let h = Harness::new(1000);
    let intent = TradeIntent::buy(AccountId(1), Outcome::Yes, Fixed::from_int(25), Fixed::from_int(100))
        .with_id(IntentId(42));

    let first = h.engine.trade(h.market, intent).unwrap();
    let replay = h.engine.trade(h.market, intent).unwrap();
    assert!(replay.replayed);
    assert_eq!(replay.amount, first.amount);
    assert_eq!(replay.executed_at, first.executed_at);

    let position = h.engine.position(h.market, AccountId(1)).unwrap().unwrap();
    assert_eq!(position.shares_yes(), Fixed::from_int(25));
    assert_eq!(h.engine.pending_settlements(h.market).unwrap().len(), 1);
}

#[test]
fn test_intent_cache_can_be_disabled() {
    let clock = Arc::new(ManualClock::new(Timestamp::from_millis(0)));
    let config = EngineConfig {
        remember_intents: false,
        ..EngineConfig::default()
    };
    let engine = Engine::with_clock(config, clock);
    let id = engine
        .open_market(OpenMarket::new(
            "Will the referendum pass with a majority?",
            Fixed::from_int(1000),
            Timestamp::from_millis(CLOSES_AT),
        ))
        .unwrap()
        .id;
    let intent = TradeIntent::buy(AccountId(1), Outcome::Yes, Fixed::from_int(5), Fixed::from_int(100))
        .with_id(IntentId(1));

    engine.trade(id, intent).unwrap();
    let second = engine.trade(id, intent).unwrap();
    assert!(!second.replayed);
    assert_eq!(engine.market(id).unwrap().total_shares_yes(), Fixed::from_int(10));
}

#[test]
fn test_intent_cache_forgets_oldest_first() {
    let clock = Arc::new(ManualClock::new(Timestamp::from_millis(0)));
    let config = EngineConfig {
        max_intents: 2,
        ..EngineConfig::default()
    };
    let engine = Engine::with_clock(config, clock);
    let id = engine
        .open_market(OpenMarket::new(
            "Will the referendum pass with a majority?",
            Fixed::from_int(1000),
            Timestamp::from_millis(CLOSES_AT),
        ))
        .unwrap()
        .id;
    let intent = |n: u64| {
        TradeIntent::buy(AccountId(1), Outcome::Yes, Fixed::ONE, Fixed::from_int(100)).with_id(IntentId(n))
    };

    for n in 1..=3 {
        assert!(!engine.trade(id, intent(n)).unwrap().replayed);
    }
    // 2 and 3 are still held, 1 was evicted and applies again
    assert!(engine.trade(id, intent(3)).unwrap().replayed);
    assert!(engine.trade(id, intent(2)).unwrap().replayed);
    assert!(!engine.trade(id, intent(1)).unwrap().replayed);
    assert_eq!(engine.market(id).unwrap().total_shares_yes(), Fixed::from_int(4));
}

#[test]
fn test_valuation_through_resolution() {
    let h = Harness::new(1000);
    h.buy(1, Outcome::Yes, 100).unwrap();
    h.buy(1, Outcome::No, 30).unwrap();

    let open = h.engine.valuation(h.market, AccountId(1)).unwrap();
    assert!(open.value_yes.is_positive() && open.value_no.is_positive());
    assert_eq!(open.current_value, open.value_yes + open.value_no);

    h.close();
    h.engine.resolve(h.market, Outcome::No).unwrap();
    let resolved = h.engine.valuation(h.market, AccountId(1)).unwrap();
    assert_eq!(resolved.value_yes, Fixed::ZERO);
    assert_eq!(resolved.value_no, Fixed::from_int(30));
    assert_eq!(resolved.claimable, Fixed::from_int(30));
    assert_eq!(resolved.unrealized_pnl, Fixed::from_int(30) - resolved.cost_basis);

    h.engine.claim(h.market, AccountId(1)).unwrap();
    let claimed = h.engine.valuation(h.market, AccountId(1)).unwrap();
    assert_eq!(claimed.current_value, Fixed::ZERO);
    assert_eq!(claimed.realized_pnl, Fixed::from_int(30) - resolved.cost_basis);
    assert_eq!(h.engine.unrealized_pnl(h.market, AccountId(1)).unwrap(), Fixed::ZERO);
}

#[test]
fn test_markets_are_independent() {
    let h = Harness::new(1000);
    let other = h
        .engine
        .open_market(OpenMarket::new(
            "Will the second market stay untouched?",
            Fixed::from_int(500),
            Timestamp::from_millis(CLOSES_AT),
        ))
        .unwrap()
        .id;

    h.buy(1, Outcome::Yes, 100).unwrap();
    let untouched = h.engine.market(other).unwrap();
    assert_eq!(untouched.pool_total(), Fixed::from_int(1000));
    assert_eq!(untouched.trade_count, 0);
    assert_eq!(h.engine.markets().len(), 2);
}
