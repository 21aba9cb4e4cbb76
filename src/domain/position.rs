//! Broker-reported holdings.

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    /// Share quantity; fractional when the position was opened by notional.
    pub quantity: f64,
}

impl Position {
    pub fn new(symbol: impl Into<String>, quantity: f64) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
        }
    }

    pub fn is_open(&self) -> bool {
        self.quantity != 0.0
    }

    pub fn is_long(&self) -> bool {
        self.quantity > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_and_long() {
        let p = Position::new("SPY", 5.0);
        assert!(p.is_open());
        assert!(p.is_long());
    }

    #[test]
    fn zero_quantity_is_closed() {
        let p = Position::new("SPY", 0.0);
        assert!(!p.is_open());
        assert!(!p.is_long());
    }

    #[test]
    fn fractional_quantity() {
        let p = Position::new("QQQ", 2.3417);
        assert!(p.is_long());
        assert!((p.quantity - 2.3417).abs() < f64::EPSILON);
    }
}
