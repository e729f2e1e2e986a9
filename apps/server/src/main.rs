use anyhow::Context;
use carelink_api::build_router;
use carelink_config::{load as load_config, AppConfig};
use carelink_database::{initialize_database, CreatePatientRequest, Gender, Role};
use carelink_runtime::{telemetry, BackendServices};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "carelink-backend")]
#[command(about = "CareLink COVID-19 community backend (serves by default)")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP and WebSocket server
    Serve,
    /// Apply database migrations and exit
    Migrate,
    /// Create an administrator account
    CreateAdmin {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "30")]
        age: String,
        #[arg(long, default_value = "Male", value_parser = parse_gender)]
        gender: Gender,
    },
}

fn parse_gender(value: &str) -> Result<Gender, String> {
    match value.to_ascii_lowercase().as_str() {
        "male" => Ok(Gender::Male),
        "female" => Ok(Gender::Female),
        other => Err(format!("unknown gender `{other}`, expected Male or Female")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    telemetry::init_tracing().context("failed to initialise tracing")?;
    let config = load_config().context("failed to load configuration")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(&config).await,
        Commands::Migrate => migrate(&config).await,
        Commands::CreateAdmin {
            name,
            email,
            password,
            age,
            gender,
        } => {
            let request = CreatePatientRequest {
                name,
                email,
                password,
                role: Some(Role::Admin),
                age,
                blood_group: None,
                is_previously_diagnosed: false,
                address: None,
                gender: Some(gender),
                phone_number: None,
            };
            create_admin(&config, request).await
        }
    }
}

async fn run_server(config: &AppConfig) -> anyhow::Result<()> {
    info!("starting CareLink backend");

    let services = BackendServices::initialise(config)
        .await
        .context("failed to initialise backend services")?;
    let _ = services.warm_stats();

    let app = build_router(services.app_state());

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(carelink_runtime::shutdown_signal())
        .await
        .context("http server error")?;

    info!("backend shut down");
    Ok(())
}

async fn migrate(config: &AppConfig) -> anyhow::Result<()> {
    let pool = initialize_database(&config.database)
        .await
        .context("failed to migrate database")?;
    pool.close().await;

    println!("Database at {} is up to date", config.database.url);
    Ok(())
}

async fn create_admin(config: &AppConfig, request: CreatePatientRequest) -> anyhow::Result<()> {
    let services = BackendServices::initialise(config)
        .await
        .context("failed to initialise backend services")?;

    let admin = services
        .authenticator
        .create_patient(&request, Role::Admin)
        .await
        .context("failed to create administrator")?;

    info!(admin = %admin.public_id, "administrator created");
    println!("Created admin {} <{}> with id {}", admin.name, admin.email, admin.public_id);
    Ok(())
}
