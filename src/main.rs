use anyhow::Context;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use metube::api::{AppState, create_router};
use metube::config::Config;
use metube::controller::{SEARCH_EXAMPLES, SearchController, SearchOutcome, UpsellPrompt};
use metube::data_models::Identity;
use metube::session::{SessionStore, encode_demo_credential};
use metube::storage::FileStore;
use metube::synthesizer::{GeminiBackend, Synthesizer};

#[derive(Parser)]
#[command(name = "metube", about = "Search videos in any language")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API and the static UI
    Serve {
        #[arg(long)]
        addr: Option<SocketAddr>,
    },
    /// Run a single search
    Search { query: String },
    /// Interactive search session; the free-search counter lives as long as the shell
    Shell,
    /// Sign in with a provider credential
    SignIn { credential: String },
    /// Print an unsigned credential for local testing
    DemoCredential {
        name: String,
        email: String,
        #[arg(long, default_value = "")]
        picture: String,
    },
    SignOut,
    Subscribe,
    /// Show identity and subscription
    Status,
    /// List example queries
    Examples,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber, then bridge log crate -> tracing
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;

    let cli = Cli::parse();
    let config = Config::from_env().context("invalid configuration")?;

    let store = FileStore::open(&config.storage_path).with_context(|| {
        format!(
            "failed to open local storage at {}",
            config.storage_path.display()
        )
    })?;
    let session = Arc::new(SessionStore::new(Box::new(store)));

    match cli.command {
        Command::Serve { addr } => serve(&config, session, addr).await?,
        Command::Search { query } => {
            let controller = build_controller(&config, session);
            print_outcome(controller.submit(&query).await);
        }
        Command::Shell => shell(&config, session).await?,
        Command::SignIn { credential } => {
            let identity = session.sign_in(&credential)?;
            print_identity(&identity);
        }
        Command::DemoCredential {
            name,
            email,
            picture,
        } => {
            println!(
                "{}",
                encode_demo_credential(&Identity::new(name, email, picture))
            );
        }
        Command::SignOut => {
            session.sign_out()?;
            println!("Signed out.");
        }
        Command::Subscribe => {
            session.subscribe()?;
            println!("Subscribed to MeTube Premium. (This is a demo. Your account won't be charged.)");
        }
        Command::Status => {
            match session.current_identity() {
                Some(identity) => print_identity(&identity),
                None => println!("Not signed in."),
            }
            println!("Subscribed: {}", session.is_subscribed());
            if !config.sign_in_enabled() {
                println!("Google Sign-In is disabled (placeholder client id).");
            }
        }
        Command::Examples => {
            for example in SEARCH_EXAMPLES {
                println!("{:<10} {}", example.lang, example.query);
            }
        }
    }
    Ok(())
}

fn build_controller(config: &Config, session: Arc<SessionStore>) -> SearchController<GeminiBackend> {
    SearchController::new(
        Synthesizer::new(GeminiBackend::from_config(config)),
        session,
        config.free_search_limit,
        config.subscription_price,
    )
}

async fn serve(
    config: &Config,
    session: Arc<SessionStore>,
    addr: Option<SocketAddr>,
) -> anyhow::Result<()> {
    let state = Arc::new(AppState {
        controller: build_controller(config, session),
        google_client_id: config.google_client_id.clone(),
        sign_in_enabled: config.sign_in_enabled(),
    });
    let app = create_router(state.clone());

    let addr = addr.unwrap_or(config.bind_addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("MeTube listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    state.controller.shutdown();
    Ok(())
}

async fn shell(config: &Config, session: Arc<SessionStore>) -> anyhow::Result<()> {
    let controller = build_controller(config, session);
    println!("Type a query in any language. Commands: /examples /home /subscribe /sign-out /quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/examples" => {
                for example in SEARCH_EXAMPLES {
                    println!("{:<10} {}", example.lang, example.query);
                }
            }
            "/home" => controller.go_home(),
            "/subscribe" => match controller.accept_upsell() {
                Ok(()) => println!("Subscribed. Searches are now unlimited."),
                Err(e) => println!("{e}"),
            },
            "/sign-out" => {
                controller.session().sign_out()?;
                println!("Signed out.");
            }
            query => {
                print_outcome(controller.submit(query).await);
                let view = controller.view();
                if !view.subscribed {
                    println!(
                        "{} of {} free searches left",
                        view.searches_left,
                        controller.limit()
                    );
                }
            }
        }
    }

    controller.shutdown();
    Ok(())
}

fn print_outcome(outcome: SearchOutcome) {
    match outcome {
        SearchOutcome::Completed(result) => {
            println!(
                "Detected Language: {}. Showing results for: \"{}\"",
                result.detected_language, result.translated_query
            );
            if result.items.is_empty() {
                println!("No results found. Try searching for something else.");
            }
            for (idx, video) in result.items.iter().enumerate() {
                println!("{:>2}. {}", idx + 1, video.title);
                println!(
                    "    {} · {} · {}",
                    video.channel_name, video.view_count_label, video.age_label
                );
                println!("    {}", video.thumbnail_url);
            }
        }
        SearchOutcome::Blocked(UpsellPrompt::SignInRequired) => {
            println!(
                "You've used all your free searches. Please sign in to continue or subscribe for unlimited access."
            );
        }
        SearchOutcome::Blocked(UpsellPrompt::Upgrade { price }) => {
            println!(
                "Upgrade to MeTube Premium for unlimited translations - ${price}/month. \
                 (This is a demo. Your account won't be charged.)"
            );
        }
        SearchOutcome::Failed(message) => eprintln!("{message}"),
        SearchOutcome::Busy => println!("A search is already running."),
        SearchOutcome::Ignored => {}
    }
}

fn print_identity(identity: &Identity) {
    println!("Signed in as {} <{}>", identity.name, identity.email);
}
