//! Binary market maker simulation.
//!
//! Runs scripted market lifecycles against the engine: trading against the curve,
//! resolution, payouts, and the instructions left for a custody layer.

use anyhow::{Context, Result};
use binary_amm::*;
use clap::{Parser, ValueEnum};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Binary AMM simulation - scripted market lifecycles.
#[derive(Parser, Debug)]
#[command(name = "binary-amm-sim")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Preset used when no settings file is given
    #[arg(long, value_enum, default_value_t = Preset::Development)]
    environment: Preset,

    /// Log level directive (overrides settings)
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Seed liquidity for each scripted market
    #[arg(long, default_value = "1000")]
    liquidity: Decimal,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Preset {
    Development,
    Testnet,
    Mainnet,
}

impl From<Preset> for Environment {
    fn from(preset: Preset) -> Self {
        match preset {
            Preset::Development => Environment::Development,
            Preset::Testnet => Environment::Testnet,
            Preset::Mainnet => Environment::Mainnet,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => Environment::from(cli.environment).settings(),
    };
    if let Some(level) = &cli.log_level {
        settings.logging.level = level.clone();
    }
    if cli.json_logs {
        settings.logging.format = "json".into();
    }
    settings.validate()?;
    settings.logging.init()?;

    let liquidity = Fixed::new(cli.liquidity);
    info!(environment = ?settings.environment, liquidity = %liquidity, "Simulation starting");

    println!("Binary Market Maker Simulation");
    println!("LMSR pools, fixed-point ledger, one-way resolution\n");

    scenario_1_full_lifecycle(&settings, liquidity)?;
    scenario_2_round_trip_with_fee(&settings, liquidity)?;
    scenario_3_price_walk(&settings, liquidity)?;
    scenario_4_custody_handoff(&settings, liquidity)?;

    println!("\nAll simulations completed successfully.");
    Ok(())
}

const HOUR: i64 = 3_600_000;

fn engine(settings: &Settings) -> (Engine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Timestamp::now()));
    (Engine::with_clock(settings.engine.clone(), clock.clone()), clock)
}

fn open(engine: &Engine, question: &str, liquidity: Fixed) -> Result<MarketId> {
    let closes_at = engine.now().plus_hours(24);
    let market = engine.open_market(OpenMarket::new(question, liquidity, closes_at))?;
    Ok(market.id)
}

fn print_pools(engine: &Engine, id: MarketId) -> Result<()> {
    let market = engine.market(id)?;
    println!(
        "  Pools: YES {} / NO {} (total {}), P(YES) = {}",
        market.pool_yes().value().round_dp(4),
        market.pool_no().value().round_dp(4),
        market.pool_total().value().round_dp(4),
        market.implied_probability(Outcome::Yes).round_dp(6)
    );
    Ok(())
}

fn no_limit() -> Fixed {
    Fixed::from_int(1_000_000_000)
}

/// Open, trade, fail on bad requests, resolve, pay out.
fn scenario_1_full_lifecycle(settings: &Settings, liquidity: Fixed) -> Result<()> {
    println!("Scenario 1: Full Lifecycle\n");

    let (engine, clock) = engine(settings);
    let id = open(&engine, "Will the city marathon record fall this year?", liquidity)?;
    let alice = AccountId(1);
    let bob = AccountId(2);
    print_pools(&engine, id)?;

    let receipt = engine.trade(id, TradeIntent::buy(alice, Outcome::Yes, Fixed::from_int(100), no_limit()))?;
    println!(
        "  Alice buys 100 YES for {} (avg {})",
        receipt.amount.value().round_dp(6),
        receipt.average_price.round_dp(6)
    );
    let receipt = engine.trade(id, TradeIntent::buy(bob, Outcome::No, Fixed::from_int(40), no_limit()))?;
    println!("  Bob buys 40 NO for {}", receipt.amount.value().round_dp(6));
    print_pools(&engine, id)?;

    match engine.trade(id, TradeIntent::sell(alice, Outcome::Yes, Fixed::from_int(200), Fixed::ZERO)) {
        Err(e) => println!("  Alice tries to sell 200 YES: {}", e),
        Ok(_) => println!("  Alice sold 200 YES unexpectedly"),
    }
    match engine.resolve(id, Outcome::Yes) {
        Err(e) => println!("  Early resolve: {}", e),
        Ok(_) => println!("  Early resolve succeeded unexpectedly"),
    }

    let value = engine.valuation(id, alice)?;
    println!(
        "  Alice marked value {} against basis {} (unrealized {})",
        value.current_value.value().round_dp(6),
        value.cost_basis.value().round_dp(6),
        value.unrealized_pnl.value().round_dp(6)
    );

    clock.advance(25 * HOUR);
    engine.resolve(id, Outcome::Yes)?;
    println!("\n  Market resolved YES");
    if let Err(e) = engine.resolve(id, Outcome::No) {
        println!("  Second resolve: {}", e);
    }

    let payout = engine.claim(id, alice)?;
    println!("  Alice claims {}", payout);
    if let Err(e) = engine.claim(id, alice) {
        println!("  Alice claims again: {}", e);
    }
    if let Err(e) = engine.claim(id, bob) {
        println!("  Bob claims: {}", e);
    }

    let realized = engine.valuation(id, alice)?.realized_pnl;
    println!("  Alice realized P&L: {}", realized.value().round_dp(6));
    if let Some(residual) = engine.residual_liquidity(id)? {
        println!("  Residual liquidity after winners: {}", residual.value().round_dp(6));
    }
    println!();
    Ok(())
}

/// Buy then sell the same shares: the fee and rounding stay in the pools.
fn scenario_2_round_trip_with_fee(settings: &Settings, liquidity: Fixed) -> Result<()> {
    println!("Scenario 2: Round Trip With Fee\n");

    let (engine, _) = engine(settings);
    let params = MarketParams {
        fee: Bps::new(100), // 1%
        ..settings.engine.market_defaults
    };
    let closes_at = engine.now().plus_hours(24);
    let id = engine
        .open_market(
            OpenMarket::new("Will the new bridge open before summer?", liquidity, closes_at)
                .with_params(params),
        )?
        .id;
    let carol = AccountId(3);

    let bought = engine.trade(id, TradeIntent::buy(carol, Outcome::No, Fixed::from_int(250), no_limit()))?;
    let sold = engine.trade(id, TradeIntent::sell(carol, Outcome::No, Fixed::from_int(250), Fixed::ZERO))?;
    println!("  Cost:     {} (fee {})", bought.amount.value().round_dp(6), bought.fee.value().round_dp(6));
    println!("  Proceeds: {} (fee {})", sold.amount.value().round_dp(6), sold.fee.value().round_dp(6));
    println!("  Kept by the pools: {}", (bought.amount - sold.amount).value().round_dp(6));
    print_pools(&engine, id)?;
    println!();
    Ok(())
}

/// Keep buying YES until the curve refuses to move further.
fn scenario_3_price_walk(settings: &Settings, liquidity: Fixed) -> Result<()> {
    println!("Scenario 3: Price Walk To The Band\n");

    let (engine, _) = engine(settings);
    let id = open(&engine, "Will the rocket reach orbit on the first attempt?", liquidity)?;
    let whale = AccountId(4);
    let step = liquidity.checked_div_down(Fixed::from_int(2)).unwrap_or(Fixed::ONE);

    for round in 1..=40 {
        match engine.trade(id, TradeIntent::buy(whale, Outcome::Yes, step, no_limit())) {
            Ok(receipt) => {
                if round % 4 == 0 {
                    println!(
                        "  Round {:>2}: P(YES) = {}, paid {}",
                        round,
                        receipt.probability_yes.round_dp(6),
                        receipt.amount.value().round_dp(4)
                    );
                }
            }
            Err(e) => {
                println!("  Round {:>2}: {}", round, e);
                break;
            }
        }
    }
    let probability = engine.implied_probability(id, Outcome::Yes)?;
    println!("  Final P(YES) = {} (stays below 1)", probability.round_dp(6));
    println!();
    Ok(())
}

/// What the custody layer sees: instructions and events, drained by cursor.
fn scenario_4_custody_handoff(settings: &Settings, liquidity: Fixed) -> Result<()> {
    println!("Scenario 4: Custody Handoff\n");

    let (engine, clock) = engine(settings);
    let id = open(&engine, "Will the festival sell out in a week?", liquidity)?;
    let dave = AccountId(5);

    let intent = TradeIntent::buy(dave, Outcome::Yes, Fixed::new(dec!(12.5)), no_limit()).with_id(IntentId(1));
    engine.trade(id, intent)?;
    let retry = engine.trade(id, intent)?;
    println!("  Retried intent replayed: {}", retry.replayed);

    clock.advance(25 * HOUR);
    engine.resolve(id, Outcome::Yes)?;
    engine.claim(id, dave)?;

    for (account, flow) in engine.pending_net_flows(id)? {
        println!("  Net flow for {}: {}", account, flow.value().round_dp(6));
    }
    for instruction in engine.drain_settlements(id, usize::MAX)? {
        println!(
            "  Settlement #{}: {} flow {}",
            instruction.id().0,
            instruction.account_id(),
            instruction.account_flow().value().round_dp(6)
        );
    }
    for event in engine.events_since(id, None)? {
        let kind = match &event.payload {
            EventPayload::MarketOpened(_) => "market_opened",
            EventPayload::MarketResolved(_) => "market_resolved",
            EventPayload::SharesPurchased(_) => "shares_purchased",
            EventPayload::SharesSold(_) => "shares_sold",
            EventPayload::TradeRejected(_) => "trade_rejected",
            EventPayload::Claimed(_) => "claimed",
        };
        println!("  Event #{}: {}", event.id.0, kind);
    }
    Ok(())
}
