//! Headless register entry point.
//!
//! Boots the register state the same way a front end would and prints the
//! current status as JSON: drawer, cart and floor.

use serde_json::json;
use tracing::info;

use till_register::commands::{cart, cashier, table};
use till_register::state::ConfigState;
use till_register::{init_tracing, AppContext};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    info!("Starting Till POS register");

    let config = ConfigState::from_env();
    let ctx = AppContext::bootstrap(config).await?;

    let drawer = cashier::get_cashier(&ctx.register).await;
    let cart = cart::get_cart(&ctx.register).await;
    let floor = table::list_tables(&ctx.tables).await;

    let status = json!({
        "store": ctx.config.store_name,
        "terminal": ctx.config.terminal_id,
        "cashierOpen": drawer.is_open,
        "cashInDrawer": ctx.config.format_currency(drawer.cash_in_drawer),
        "cart": cart.totals,
        "tables": floor,
    });
    println!("{}", serde_json::to_string_pretty(&status)?);

    ctx.db.inner().close().await;
    Ok(())
}
