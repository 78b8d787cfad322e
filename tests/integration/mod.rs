//! Integration tests for the agent catalog client


mod batch_install;
mod cli_contracts;
mod ledger_store;
mod update_check;
