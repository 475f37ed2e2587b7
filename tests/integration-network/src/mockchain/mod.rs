//! Integration tests which exercise contract deployment and execution on a mock chain.

mod basic_wallet;
mod counter_contract;
mod counter_contract_no_auth;
mod counter_contract_rust_auth;
mod cycle_helpers;
mod helpers;
