mod cli;

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use congregate_client::schema::{RegistrationMode, fields};
use congregate_client::session::HttpTokenRefresher;
use congregate_client::ui::{TracingNavigator, TracingNotifier};
use congregate_client::views::{EventsView, LoadOutcome, RegistrationView, SubmitOutcome};
use congregate_client::{ClientConfig, RequestPipeline, SessionGuard};
use congregate_datasets::{Datasets, TableKind};
use congregate_types::api::TokenPair;

use cli::{Cli, Command, RegisterArgs, SessionArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "congregate=debug,congregate_client=debug,congregate_datasets=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env()?;

    let datasets = Arc::new(match &config.dataset_dir {
        Some(dir) => Datasets::load_dir(dir)?,
        None => Datasets::embedded()?,
    });

    match cli.command {
        Command::Lookup { table, codes } if codes.is_empty() => {
            list_table(&datasets, table.into());
            Ok(())
        }
        Command::Lookup { table, codes } => {
            println!("{}", datasets.table(table.into()).resolve_joined_labels(codes.as_slice()));
            Ok(())
        }
        Command::Events(args) => list_events(config, datasets, args).await,
        Command::Register(args) => register(config, args).await,
    }
}

/// Prints a whole table. COOLs are grouped by category the way the
/// registration picker shows them.
fn list_table(datasets: &Datasets, kind: TableKind) {
    let table = datasets.table(kind);
    println!("{} ({} entries)", table.kind(), table.len());
    if kind != TableKind::Cool {
        for record in table.records() {
            println!("  {:<6} {}", record.code, record.label);
        }
        return;
    }
    for (category, members) in table.grouped_by_category() {
        let code = datasets.category_code(category).unwrap_or("-");
        println!("{} [{}]", category, code);
        for record in members {
            println!(
                "  {:<6} {} ({})",
                record.code,
                record.label,
                record.extra("campus").unwrap_or(""),
            );
        }
    }
}

fn pipeline(config: ClientConfig) -> (Arc<SessionGuard>, Arc<RequestPipeline>) {
    let client = reqwest::Client::new();
    let refresher = Arc::new(HttpTokenRefresher::new(
        client.clone(),
        &config.api_base_url,
        &config.api_key,
    ));
    let session = Arc::new(SessionGuard::new(
        refresher,
        Arc::new(TracingNavigator),
        config.refresh_skew,
    ));
    let pipeline = Arc::new(RequestPipeline::new(client, config, session.clone()));
    (session, pipeline)
}

async fn list_events(config: ClientConfig, datasets: Arc<Datasets>, args: SessionArgs) -> anyhow::Result<()> {
    let (session, pipeline) = pipeline(config);
    session.establish(TokenPair {
        access_token: args.access_token,
        refresh_token: args.refresh_token,
    });

    let mut view = EventsView::new(
        pipeline,
        datasets,
        Arc::new(TracingNotifier),
        Arc::new(TracingNavigator),
    );
    match view.load().await {
        LoadOutcome::Loaded(0) => println!("No events found."),
        LoadOutcome::Loaded(_) => {
            for card in view.cards() {
                println!("{} [{}]", card.title, card.badge);
                println!("  {}", card.description);
                if let Some(window) = &card.registration_window {
                    println!(
                        "  Registration: {} - {}",
                        window.opens.as_deref().unwrap_or("-"),
                        window.closes.as_deref().unwrap_or("-"),
                    );
                }
                if let Some(primary) = &card.primary {
                    println!("  {}{}", primary.label, if primary.enabled { "" } else { " (disabled)" });
                }
            }
        }
        outcome => anyhow::bail!("could not load events: {:?}", outcome),
    }
    Ok(())
}

async fn register(config: ClientConfig, args: RegisterArgs) -> anyhow::Result<()> {
    let (_session, pipeline) = pipeline(config);
    let mut view = RegistrationView::new(pipeline, Arc::new(TracingNotifier), Arc::new(TracingNavigator));

    let form = &mut view.form;
    form.set_text(fields::NAME, args.name);
    form.set_text(fields::EMAIL, args.email);
    form.set_text(fields::PHONE_NUMBER, args.phone);
    form.set_text(fields::PLACE_OF_BIRTH, args.place_of_birth);
    form.set_date(fields::DATE_OF_BIRTH, args.date_of_birth);
    form.set_text(fields::PASSWORD, args.password);
    if args.worker {
        form.set_mode(RegistrationMode::Worker);
    }
    if let Some(gender) = args.gender {
        form.set_text(fields::GENDER, gender);
    }
    if let Some(status) = args.marital_status {
        form.set_text(fields::MARITAL_STATUS, status);
    }
    if let Some(department) = &args.department {
        form.select_department(department);
    }
    if let Some(campus) = &args.campus {
        form.select_campus(campus);
    }
    if let Some(cool) = args.cool {
        form.select_cool(cool);
    }
    if let Some(kkj) = args.kkj {
        form.set_text(fields::KKJ, kkj);
    }
    form.set_flag(fields::KOM, args.kom);
    form.set_flag(fields::BAPTIS, args.baptized);

    match view.submit().await {
        SubmitOutcome::Registered => {
            info!("Registered, continue at the login page");
            Ok(())
        }
        SubmitOutcome::Invalid(errors) => {
            for error in &errors {
                eprintln!("{}", error);
            }
            anyhow::bail!("{} field(s) invalid", errors.len())
        }
        outcome => anyhow::bail!("registration did not complete: {:?}", outcome),
    }
}
