//! Order Engine - admin order lifecycle for a plant shop
//!
//! # Overview
//!
//! Orders are created at checkout and then managed by an administrator:
//!
//! - **Status** (`orders::state_machine`): transitions, with cancellation
//!   gated behind an explicit confirmation
//! - **Inventory** (`orders::inventory`): stock returned exactly once per
//!   cancelled order
//! - **Ledger** (`orders::ledger`): append-only item-set versions and
//!   finalization
//! - **Pricing** (`pricing`): subtotal, flat discount, GST and PST
//! - **Notifications** (`notification`): confirmation and invoice emails
//!   with in-flight protection and a manual email queue
//!
//! # Module Structure
//!
//! ```text
//! order-engine/src/
//! ├── common/        # Logging
//! ├── core/          # Config, event bus
//! ├── notification/  # Email dispatch, send lock, pending queue
//! ├── orders/        # Storage, repository, state machine, ledger, manager
//! └── pricing/       # Money validation, totals
//! ```

pub mod common;
pub mod core;
pub mod notification;
pub mod orders;
pub mod pricing;

#[cfg(test)]
mod test_support;

// Re-exports
pub use crate::core::{Config, EventBus};
pub use orders::{OrderError, OrderResult, OrderStorage, OrdersManager};

// Re-export logger functions
pub use common::logger::{cleanup_old_logs, init_logger, init_logger_with_file};

/// Load `.env`, then initialize logging from [`Config`]
///
/// File logging is enabled in production only.
pub fn setup_environment() -> anyhow::Result<Config> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    let log_dir = config.log_dir();
    if config.is_production() {
        std::fs::create_dir_all(&log_dir)?;
        init_logger_with_file(
            &config.log_level,
            config.log_json,
            log_dir.to_str(),
        )?;
    } else {
        init_logger(&config.log_level, config.log_json)?;
    }

    Ok(config)
}

pub fn print_banner() {
    println!(
        r#"
   ____          __
  / __ \_______/ /__ _____
 / /_/ / __/ _  / -_) __/
 \____/_/  \_,_/\__/_/
   ___           _
  / _ \___  ___ (_)__  ___
 / ___/ _ \/ _ \/ / _ \/ -_)
/_/   \___/_//_/_/_//_/\__/
    "#
    );
}
