//! # aqar-cli — Back-Office Command-Line Interface
//!
//! Terminal access to the pricing engine for consultants and back-office
//! staff working outside the web front end.
//!
//! ## Subcommands
//!
//! - `calc` — evaluate a payment plan request against the acceptance
//!   thresholds and print the decision
//! - `plan` — generate the full dated schedule with written amounts,
//!   ready for document bindings
//!
//! ## Crate Policy
//!
//! - Argument parsing is separated from business logic.
//! - Handlers delegate to `aqar-service`; no pricing math lives here.
//! - Output is JSON on stdout so the commands compose in scripts.

pub mod calc;
pub mod plan;
