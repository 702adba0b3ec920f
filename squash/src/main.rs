use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::{cookie::Key, App, HttpServer};
use clap::Parser;
use tracing::level_filters::LevelFilter;

/// SQuaSH, metrics dashboard API for continuous integration
#[derive(Parser, Debug)]
#[command(name = "SQuaSH")]
#[command(about = "Science Quality and Reliability Harness API", long_about = None)]
struct Args {
    /// Hashed password
    #[arg(long, short, env = "SQUASH_PASSWORD")]
    password: String,

    /// Path to the SQLite database
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// Silence all output
    #[arg(long, short)]
    quiet: bool,

    /// Verbose mode (-v, -vv, -vvv, etc)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn max_level(quiet: bool, verbose: u8) -> LevelFilter {
    match (quiet, verbose) {
        (true, _) => LevelFilter::OFF,
        (false, 0) => LevelFilter::WARN,
        (false, 1) => LevelFilter::INFO,
        (false, 2) => LevelFilter::DEBUG,
        (false, _) => LevelFilter::TRACE,
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(max_level(args.quiet, args.verbose))
        .with_writer(std::io::stderr)
        .init();

    // Initialize SQuaSH's state
    squash_core::init(&args.password, &args.database_url);
    tracing::info!("listening on {}:{}", args.host, args.port);

    // Sessions do not survive a restart
    let key = Key::generate();

    // Run actix server
    HttpServer::new(move || {
        App::new()
            .wrap(SessionMiddleware::new(
                CookieSessionStore::default(),
                key.clone(),
            ))
            .configure(squash::api::config)
    })
    .bind((args.host.as_str(), args.port))?
    .run()
    .await
}
