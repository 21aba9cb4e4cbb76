//! Brokerage account port trait.
//!
//! One instance is used for the whole of a decision run so that equity,
//! positions and order submission all see the same account. The account is
//! assumed to have no other writer while a run is in progress.

use crate::domain::error::DualmomError;
use crate::domain::order::{OrderAck, OrderRequest};
use crate::domain::position::Position;

pub trait BrokerPort {
    fn get_positions(&self) -> Result<Vec<Position>, DualmomError>;

    fn get_account_equity(&self) -> Result<f64, DualmomError>;

    fn submit_market_order(&self, order: &OrderRequest) -> Result<OrderAck, DualmomError>;
}
