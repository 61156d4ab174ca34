mod funds;
mod ledger;
mod limit;
mod money;
mod transaction;
mod wallet;

pub use funds::*;
pub use ledger::*;
pub use limit::*;
pub use money::*;
pub use transaction::*;
pub use wallet::*;
