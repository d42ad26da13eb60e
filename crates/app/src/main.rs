use anyhow::Context;

mod controller;
mod sync;

use controller::Controller;
use sync::{Synchronizer, DEFAULT_DEBOUNCE};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let project_dirs = directories::ProjectDirs::from("br", "rateio", "Rateio")
        .context("diretório de dados indisponível")?;
    let data_dir = project_dirs.data_dir().to_path_buf();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("criando {}", data_dir.display()))?;

    let db_path = data_dir.join("rateio.db");
    let db = rateio_storage::create_db(&db_path)
        .await
        .with_context(|| format!("abrindo {}", db_path.display()))?;

    let user = std::env::var("RATEIO_USER").unwrap_or_else(|_| "local".to_string());
    let state = rateio_storage::load_state(&db, &user).await?;
    tracing::info!(user = %user, months = state.month_order.len(), "estado carregado");

    let sync = Synchronizer::spawn(db.clone(), user.clone(), DEFAULT_DEBOUNCE);
    let ctl = Controller::new(state, sync);

    print_report(&ctl);

    ctl.shutdown().await;
    Ok(())
}

fn print_report(ctl: &Controller) {
    let totals = rateio_core::summary::month_totals(ctl.state());
    for month in &ctl.state().month_order {
        if let Some(total) = totals.get(month) {
            println!("{month}: {total}");
        }
    }

    let consolidated = ctl.consolidated();
    if consolidated.month_count > 0 {
        println!(
            "Total em {} meses: {} (média {})",
            consolidated.month_count, consolidated.total_spent, consolidated.monthly_average
        );
        for cat in &consolidated.categories {
            println!("  {}: {} ({:.1}%)", cat.category, cat.total, cat.percent);
        }
    }
}
