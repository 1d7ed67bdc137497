#[cfg(test)]
#[allow(dead_code)]
pub mod contracts;

#[cfg(test)]
#[allow(dead_code)]
pub mod ledger;
pub use ledger::*;

#[cfg(test)]
#[allow(dead_code)]
pub mod mock_vm;
pub use mock_vm::*;

#[cfg(test)]
#[allow(dead_code)]
pub mod setup;
pub use setup::*;
