use clap::Subcommand;
use mintel_core::RequestStatus;
use sqlx::PgPool;

#[derive(Debug, Subcommand)]
pub enum RequestsCommands {
    /// List recent requests, newest first
    List {
        /// pending, processing, completed or failed
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value = "20")]
        limit: i64,
    },
}

pub(crate) async fn run(command: RequestsCommands, pool: &PgPool) -> anyhow::Result<()> {
    match command {
        RequestsCommands::List { status, limit } => {
            let status = status
                .as_deref()
                .map(str::parse::<RequestStatus>)
                .transpose()?;
            list(pool, status, limit.clamp(1, 200)).await
        }
    }
}

async fn list(pool: &PgPool, status: Option<RequestStatus>, limit: i64) -> anyhow::Result<()> {
    let rows = mintel_db::list_research_requests(pool, status, limit).await?;
    if rows.is_empty() {
        println!("no research requests found");
        return Ok(());
    }

    println!(
        "{:<38}{:<11}{:<6}{:<12}{:<18}ERROR",
        "ID", "PLATFORM", "DAYS", "STATUS", "CREATED"
    );
    for row in &rows {
        let error = row.error_message.as_deref().map_or_else(String::new, |e| {
            if e.chars().count() > 60 {
                format!("{}...", e.chars().take(60).collect::<String>())
            } else {
                e.to_string()
            }
        });
        println!(
            "{:<38}{:<11}{:<6}{:<12}{:<18}{}",
            row.id,
            row.platform,
            row.timeframe_days,
            row.status,
            row.created_at.format("%Y-%m-%d %H:%M"),
            error
        );
    }
    Ok(())
}
