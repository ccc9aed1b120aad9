pub mod confirmation_gate;
pub mod credit_ledger;
pub mod navigator;
