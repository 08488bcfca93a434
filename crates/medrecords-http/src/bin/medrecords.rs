//! Command-line front end.
//!
//! ```text
//! medrecords [PATH] [KEYWORD]
//! medrecords /PDG6U51W
//! medrecords /PDG6U51W/analysis "صورة دم"
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use medrecords_core::config::{self, ClientConfig};
use medrecords_core::{MedRecordsClient, Route};
use medrecords_http::HttpBackend;

fn print_usage() {
    eprintln!("usage: medrecords [PATH] [KEYWORD]");
    eprintln!("  /{{patientId}}                 dashboard");
    eprintln!("  /{{patientId}}/{{kind}}          records of a kind (analysis, scan, prescription)");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env().context("Failed to read configuration")?;
    tracing::debug!(api = %config.api_base_url, "starting {} {}", config::APP_NAME, config::APP_VERSION);

    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "/".to_string());
    let keyword = args.next();

    let mut route = Route::parse(&path);
    if let Some(target) = route.redirect(&config) {
        route = target;
    }

    let backend = Arc::new(HttpBackend::new(&config).context("Failed to build HTTP client")?);
    let client = MedRecordsClient::new(config, backend);

    match route {
        Route::Dashboard { patient_id } => {
            let view = client.dashboard(&patient_id).await;
            match &view.patient {
                Some(info) => println!("{} ({}), {}", info.name, info.age, info.address),
                None => println!("{patient_id}"),
            }
            for kind in medrecords_core::RecordKind::ALL {
                match view.counts.get(kind) {
                    Some(count) => println!("{}: {}", kind.collection_label(), count),
                    None => println!("{}: -", kind.collection_label()),
                }
            }
            if let Some(visit) = &view.last_visit {
                let date = visit
                    .date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default();
                println!("{} | {} | {}", visit.doctor_name, visit.specialty, date);
            }
            for notice in &view.notices {
                eprintln!("{}", notice.message);
            }
        }
        Route::List { patient_id, kind } => {
            let list = client.record_list(kind, patient_id);
            list.load(keyword.as_deref(), None).await?;
            let view = list.view()?;
            if view.records.is_empty() {
                println!("لا توجد {}", kind.collection_label());
            }
            for record in &view.records {
                let id = record.id.as_ref().map(|id| id.to_string()).unwrap_or_default();
                let date = record
                    .created_on()
                    .map(|d| d.to_string())
                    .unwrap_or_default();
                println!(
                    "{}\t{}\t{}\t{}\t{} file(s)",
                    id,
                    date,
                    record.title,
                    record.doctor_name,
                    record.attachments.len()
                );
            }
        }
        Route::Root | Route::NotFound | Route::Add { .. } | Route::Edit { .. } => {
            print_usage();
        }
    }

    Ok(())
}
