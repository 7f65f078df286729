use std::fs;
use std::sync::Arc;

use anyhow::bail;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use notehall::auth::{MIN_PASSWORD_LEN, PasswordHasher};
use notehall::config::ServerConfig;
use notehall::server::{AppState, create_router};
use notehall::store::{SqliteStore, Store};
use notehall::types::User;

#[derive(Parser)]
#[command(name = "notehall")]
#[command(about = "A marketplace server for handwritten study notes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "8080")]
        port: u16,

        /// Data directory for database and note content
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Public base URL for external access (e.g., "https://notes.example.com")
        #[arg(long)]
        public_base_url: Option<String>,

        /// Browser origin allowed to call the API with credentials. Repeatable.
        #[arg(long)]
        allowed_origin: Vec<String>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create database and first admin account)
    Init {
        /// Data directory for database and note content
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Admin email (prompted if omitted)
        #[arg(long)]
        email: Option<String>,

        /// Admin password (prompted if omitted)
        #[arg(long)]
        password: Option<String>,

        /// Fail instead of prompting when email or password is missing
        #[arg(long)]
        non_interactive: bool,
    },
}

fn prompt_email() -> anyhow::Result<String> {
    let email = inquire::Text::new("Admin email:")
        .with_validator(|input: &str| {
            if input.trim().is_empty() || !input.contains('@') {
                Err("Please provide a valid email".into())
            } else {
                Ok(inquire::validator::Validation::Valid)
            }
        })
        .prompt()?;
    Ok(email)
}

fn prompt_password() -> anyhow::Result<String> {
    let password = inquire::Password::new("Admin password:")
        .with_validator(move |input: &str| {
            if input.len() < MIN_PASSWORD_LEN {
                Err(format!("Password must be at least {MIN_PASSWORD_LEN} characters").into())
            } else {
                Ok(inquire::validator::Validation::Valid)
            }
        })
        .prompt()?;
    Ok(password)
}

fn run_init(
    data_dir: String,
    email: Option<String>,
    password: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let data_path: std::path::PathBuf = data_dir.into();
    fs::create_dir_all(&data_path)?;

    let db_path = data_path.join("notehall.db");
    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;

    if store.has_admin_user()? {
        bail!("Server already initialized. An admin account exists in the database.");
    }

    let email = match email {
        Some(email) => email,
        None if non_interactive => bail!("--email is required with --non-interactive"),
        None => prompt_email()?,
    };
    let email = email.trim().to_lowercase();

    let password = match password {
        Some(password) => password,
        None if non_interactive => bail!("--password is required with --non-interactive"),
        None => prompt_password()?,
    };
    if password.len() < MIN_PASSWORD_LEN {
        bail!("Password must be at least {MIN_PASSWORD_LEN} characters");
    }

    let now = Utc::now();
    let admin = User {
        id: Uuid::new_v4().to_string(),
        name: "Admin".to_string(),
        email: email.clone(),
        password_hash: PasswordHasher::new().hash(&password)?,
        is_admin: true,
        profile_image: None,
        created_at: now,
        updated_at: now,
    };
    store.create_user(&admin)?;

    println!();
    println!("========================================");
    println!("Created admin account '{email}'.");
    println!("Database written to: {}", db_path.display());
    println!("========================================");
    println!();

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("notehall=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                email,
                password,
                non_interactive,
            } => {
                run_init(data_dir, email, password, non_interactive)?;
            }
        },
        Commands::Serve {
            host,
            port,
            data_dir,
            public_base_url,
            allowed_origin,
        } => {
            let config = ServerConfig {
                host,
                port,
                data_dir: data_dir.into(),
                public_base_url,
                allowed_origins: allowed_origin,
            };

            let store = SqliteStore::new(config.db_path())?;
            store.initialize()?;
            if !store.has_admin_user()? {
                bail!(
                    "Server not initialized. Run 'notehall admin init' first to create the database and admin account."
                );
            }

            if let Some(base_url) = &config.public_base_url {
                info!("Public base URL: {base_url}");
            }

            let state = Arc::new(AppState::new(Arc::new(store), &config.data_dir));

            let app = create_router(state, &config.allowed_origins);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
