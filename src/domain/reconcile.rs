//! Position reconciliation: converge broker holdings onto the target symbol.
//!
//! Three states are possible on each run:
//! - already holding the target: nothing to do
//! - flat: buy the target by notional
//! - holding the other tradable symbol: sell all of it, then buy the target
//!
//! The sell always uses the quantity the broker reports at decision time.
//! Sell and buy are submitted in that order but are not synchronised; the
//! venue handles them independently.

use crate::domain::error::DualmomError;
use crate::domain::order::{OrderAck, OrderRequest, TimeInForce};
use crate::domain::position::Position;
use crate::domain::signal::AssetPair;
use crate::ports::broker_port::BrokerPort;
use tracing::{info, warn};

/// Share of account equity committed to the target position.
pub const DEFAULT_CAPITAL_FRACTION: f64 = 0.10;

#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    pub capital_fraction: f64,
    pub time_in_force: TimeInForce,
    /// Abort instead of warning when holdings outside the pair are found.
    pub strict_universe: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            capital_fraction: DEFAULT_CAPITAL_FRACTION,
            time_in_force: TimeInForce::Day,
            strict_universe: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HoldingState {
    HoldingTarget,
    Flat,
    HoldingOther { symbol: String, quantity: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderIntent {
    NoOp,
    Buy(OrderRequest),
    Switch {
        sell: OrderRequest,
        buy: OrderRequest,
    },
}

impl OrderIntent {
    /// Orders in submission order.
    pub fn orders(&self) -> Vec<&OrderRequest> {
        match self {
            OrderIntent::NoOp => Vec::new(),
            OrderIntent::Buy(buy) => vec![buy],
            OrderIntent::Switch { sell, buy } => vec![sell, buy],
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, OrderIntent::NoOp)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilePlan {
    pub target: String,
    pub state: HoldingState,
    pub intent: OrderIntent,
    /// Open positions outside the tradable pair; never traded.
    pub unmanaged: Vec<Position>,
}

pub fn plan_orders(
    positions: &[Position],
    pair: &AssetPair,
    target: &str,
    notional: f64,
    time_in_force: TimeInForce,
) -> Result<ReconcilePlan, DualmomError> {
    if !pair.contains(target) {
        return Err(DualmomError::InvalidTarget {
            symbol: target.to_string(),
        });
    }
    if !notional.is_finite() || notional <= 0.0 {
        return Err(DualmomError::Capital {
            reason: format!("target notional must be positive, got {notional}"),
        });
    }

    let (held, unmanaged): (Vec<&Position>, Vec<&Position>) = positions
        .iter()
        .filter(|p| p.is_open())
        .partition(|p| pair.contains(&p.symbol));

    if held.len() > 1 || held.iter().any(|p| !p.is_long()) {
        return Err(DualmomError::ReconciliationMismatch {
            symbols: held.iter().map(|p| p.symbol.clone()).collect(),
        });
    }

    let (state, intent) = match held.first() {
        Some(p) if p.symbol == target => (HoldingState::HoldingTarget, OrderIntent::NoOp),
        None => (
            HoldingState::Flat,
            OrderIntent::Buy(OrderRequest::buy_notional(target, notional, time_in_force)),
        ),
        Some(p) => (
            HoldingState::HoldingOther {
                symbol: p.symbol.clone(),
                quantity: p.quantity,
            },
            OrderIntent::Switch {
                sell: OrderRequest::sell_quantity(&p.symbol, p.quantity, time_in_force),
                buy: OrderRequest::buy_notional(target, notional, time_in_force),
            },
        ),
    };

    Ok(ReconcilePlan {
        target: target.to_string(),
        state,
        intent,
        unmanaged: unmanaged.into_iter().cloned().collect(),
    })
}

#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub equity: f64,
    pub notional: f64,
    pub plan: ReconcilePlan,
    /// Empty on a dry run or a no-op.
    pub acks: Vec<OrderAck>,
}

/// Read equity and positions from `broker`, plan, and submit unless `dry_run`.
pub fn reconcile(
    broker: &dyn BrokerPort,
    pair: &AssetPair,
    target: &str,
    config: &ExecutionConfig,
    dry_run: bool,
) -> Result<ReconcileOutcome, DualmomError> {
    let equity = broker.get_account_equity()?;
    if !equity.is_finite() || equity <= 0.0 {
        return Err(DualmomError::Capital {
            reason: format!("account equity must be positive, got {equity}"),
        });
    }
    let notional = equity * config.capital_fraction;

    let positions = broker.get_positions()?;
    let plan = plan_orders(&positions, pair, target, notional, config.time_in_force)?;

    if !plan.unmanaged.is_empty() {
        let symbols: Vec<String> = plan.unmanaged.iter().map(|p| p.symbol.clone()).collect();
        if config.strict_universe {
            return Err(DualmomError::ReconciliationMismatch { symbols });
        }
        warn!(symbols = ?symbols, "ignoring holdings outside the tradable pair");
    }

    match &plan.state {
        HoldingState::HoldingTarget => {
            info!(symbol = target, "already holding target, nothing to do")
        }
        HoldingState::Flat => info!(symbol = target, notional, "no position, buying target"),
        HoldingState::HoldingOther { symbol, quantity } => {
            info!(from = %symbol, quantity = *quantity, to = target, notional, "switching position")
        }
    }

    let mut acks = Vec::new();
    if !dry_run {
        for order in plan.intent.orders() {
            let ack = broker.submit_market_order(order)?;
            info!(order = %order, id = %ack.id, status = %ack.status, "order submitted");
            acks.push(ack);
        }
    }

    Ok(ReconcileOutcome {
        equity,
        notional,
        plan,
        acks,
    })
}
