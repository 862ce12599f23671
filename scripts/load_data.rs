//! Load data script for obras_hub
//!
//! Writes the demo identity (admin@construcao.com / admin123, company 1) and
//! the sample portfolio of 4 projects and 5 works into Sled, then prints the
//! resulting dashboard summary.
//! Run: cargo run --bin load_data

use tracing::info;

use obras_hub::config::StoreConfig;
use obras_hub::portfolio::Portfolio;
use obras_hub::seed;
use obras_hub::storage::SledStorage;
use obras_hub::telemetry::init_cli_tracing;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_cli_tracing();
    let config = StoreConfig::from_env()?;

    let storage = SledStorage::open(&config.data_dir)?;
    let identity = seed::seed_demo(&storage, config.bcrypt_cost)?;
    info!(email = %identity.email, tenant = identity.tenant_id, "demo identity stored");

    let portfolio = Portfolio::load(&storage, identity.tenant_id)?;
    let summary = portfolio.summary();
    info!(
        projects = summary.total_projects,
        works = portfolio.works().len(),
        active_works = summary.active_works,
        "portfolio ready"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
