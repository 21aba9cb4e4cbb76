//! Market order requests sent to the broker.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

/// Either a dollar amount to invest or an explicit share quantity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeSpec {
    Notional(f64),
    Quantity(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeInForce {
    #[default]
    Day,
    Gtc,
    Opg,
    Cls,
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeInForce::Day => "day",
            TimeInForce::Gtc => "gtc",
            TimeInForce::Opg => "opg",
            TimeInForce::Cls => "cls",
        }
    }
}

impl FromStr for TimeInForce {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day" => Ok(TimeInForce::Day),
            "gtc" => Ok(TimeInForce::Gtc),
            "opg" => Ok(TimeInForce::Opg),
            "cls" => Ok(TimeInForce::Cls),
            other => Err(format!("unknown time in force '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub size: SizeSpec,
    pub time_in_force: TimeInForce,
}

impl OrderRequest {
    pub fn buy_notional(symbol: &str, notional: f64, time_in_force: TimeInForce) -> Self {
        Self {
            symbol: symbol.to_string(),
            side: OrderSide::Buy,
            size: SizeSpec::Notional(notional),
            time_in_force,
        }
    }

    pub fn sell_quantity(symbol: &str, quantity: f64, time_in_force: TimeInForce) -> Self {
        Self {
            symbol: symbol.to_string(),
            side: OrderSide::Sell,
            size: SizeSpec::Quantity(quantity),
            time_in_force,
        }
    }
}

impl fmt::Display for OrderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.size {
            SizeSpec::Notional(n) => write!(
                f,
                "{} {} ${:.2} ({})",
                self.side.as_str(),
                self.symbol,
                n,
                self.time_in_force.as_str()
            ),
            SizeSpec::Quantity(q) => write!(
                f,
                "{} {} x{} ({})",
                self.side.as_str(),
                self.symbol,
                q,
                self.time_in_force.as_str()
            ),
        }
    }
}

/// Broker acknowledgement of a submitted order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderAck {
    pub id: String,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_in_force_parse() {
        assert_eq!("day".parse::<TimeInForce>(), Ok(TimeInForce::Day));
        assert_eq!(" GTC ".parse::<TimeInForce>(), Ok(TimeInForce::Gtc));
        assert!("ioc".parse::<TimeInForce>().is_err());
        assert_eq!(TimeInForce::default(), TimeInForce::Day);
    }

    #[test]
    fn display_notional_and_quantity() {
        let buy = OrderRequest::buy_notional("QQQ", 1000.0, TimeInForce::Day);
        assert_eq!(buy.to_string(), "buy QQQ $1000.00 (day)");

        let sell = OrderRequest::sell_quantity("SPY", 5.0, TimeInForce::Day);
        assert_eq!(sell.to_string(), "sell SPY x5 (day)");
    }
}
