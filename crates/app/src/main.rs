use std::fmt;
use std::sync::Arc;

use itetude_core::aggregate::{CatalogFilter, Choice};
use itetude_core::model::{PathId, ResourceId, UserId, category_by_id};
use services::{AppServices, Clock, PermissionErrorEvent, SessionAuth};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

const DEFAULT_DB_URL: &str = "sqlite:itetude.sqlite3?mode=rwc";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingTarget { command: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidDbUrl { raw: String },
    InvalidUser { raw: String },
    InvalidFilter { flag: &'static str, raw: String },
    SignedOut { command: &'static str },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingTarget { command } => write!(f, "{command} requires an id"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidUser { raw } => write!(f, "invalid --user value: {raw}"),
            ArgsError::InvalidFilter { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::SignedOut { command } => {
                write!(f, "{command} needs a user (--user or ITETUDE_USER)")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- dashboard      [--query <text>]");
    eprintln!("  cargo run -p app -- catalog <slug> [--difficulty <d>] [--weight <w>]");
    eprintln!("                                     [--language <l>]");
    eprintln!("  cargo run -p app -- path <path_id>");
    eprintln!("  cargo run -p app -- certifications");
    eprintln!("  cargo run -p app -- stats           (admins only)");
    eprintln!("  cargo run -p app -- feedback        (admins only)");
    eprintln!("  cargo run -p app -- favorite <resource_id>");
    eprintln!("  cargo run -p app -- done <resource_id>");
    eprintln!("  cargo run -p app -- reset <path_id>");
    eprintln!();
    eprintln!("Common options:");
    eprintln!("  --db <sqlite_url>   (default: {DEFAULT_DB_URL})");
    eprintln!("  --user <uid>        signed-in user");
    eprintln!();
    eprintln!("Filters take a label (e.g. \"Avancé\", \"Plume\") or \"all\".");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  ITETUDE_DB_URL, ITETUDE_USER, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Dashboard { query: String },
    Catalog { slug: String, filter: CatalogFilter },
    Path { id: PathId },
    Certifications,
    Stats,
    Feedback,
    Favorite { resource: ResourceId },
    Done { resource: ResourceId },
    Reset { path: PathId },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Dashboard { .. } => "dashboard",
            Command::Catalog { .. } => "catalog",
            Command::Path { .. } => "path",
            Command::Certifications => "certifications",
            Command::Stats => "stats",
            Command::Feedback => "feedback",
            Command::Favorite { .. } => "favorite",
            Command::Done { .. } => "done",
            Command::Reset { .. } => "reset",
        }
    }
}

#[derive(Debug)]
struct Args {
    db_url: String,
    user: Option<UserId>,
    command: Command,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("ITETUDE_DB_URL").unwrap_or_else(|_| DEFAULT_DB_URL.into());
        let mut user = std::env::var("ITETUDE_USER")
            .ok()
            .and_then(|value| value.parse::<UserId>().ok());

        let name = args.next().unwrap_or_else(|| "dashboard".into());
        if matches!(name.as_str(), "--help" | "-h") {
            print_usage();
            std::process::exit(0);
        }

        let mut target: Option<String> = None;
        let mut query = String::new();
        let mut filter = CatalogFilter::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--user" => {
                    let value = require_value(&mut args, "--user")?;
                    let parsed = value
                        .parse::<UserId>()
                        .map_err(|_| ArgsError::InvalidUser { raw: value.clone() })?;
                    user = Some(parsed);
                }
                "--query" => query = require_value(&mut args, "--query")?,
                "--difficulty" => {
                    let value = require_value(&mut args, "--difficulty")?;
                    filter.difficulty = value.parse().map_err(|_| ArgsError::InvalidFilter {
                        flag: "--difficulty",
                        raw: value.clone(),
                    })?;
                }
                "--weight" => {
                    let value = require_value(&mut args, "--weight")?;
                    filter.data_weight = value.parse().map_err(|_| ArgsError::InvalidFilter {
                        flag: "--weight",
                        raw: value.clone(),
                    })?;
                }
                "--language" => {
                    let value = require_value(&mut args, "--language")?;
                    filter.language = value.parse().unwrap_or(Choice::All);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ if !arg.starts_with("--") && target.is_none() => target = Some(arg),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let require =
            |command: &'static str| target.clone().ok_or(ArgsError::MissingTarget { command });
        let command = match name.as_str() {
            "dashboard" => Command::Dashboard { query },
            "catalog" => Command::Catalog {
                slug: require("catalog")?,
                filter,
            },
            "path" => Command::Path {
                id: PathId::new(require("path")?),
            },
            "certifications" => Command::Certifications,
            "stats" => Command::Stats,
            "feedback" => Command::Feedback,
            "favorite" => Command::Favorite {
                resource: ResourceId::new(require("favorite")?),
            },
            "done" => Command::Done {
                resource: ResourceId::new(require("done")?),
            },
            "reset" => Command::Reset {
                path: PathId::new(require("reset")?),
            },
            _ => return Err(ArgsError::UnknownCommand(name)),
        };

        Ok(Self {
            db_url,
            user,
            command,
        })
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,services=info,storage=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// Permission failures arrive on the emitter channel, never as return values.
fn print_denials(events: &mut broadcast::Receiver<PermissionErrorEvent>) {
    while let Ok(event) = events.try_recv() {
        eprintln!("{event}");
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse(std::env::args().skip(1)).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    init_tracing();
    tracing::debug!(db = %args.db_url, command = args.command.name(), "starting");

    let auth = Arc::new(match args.user.clone() {
        Some(user) => SessionAuth::signed_in(user),
        None => SessionAuth::new(),
    });
    let app = AppServices::new_sqlite(&args.db_url, Clock::default(), auth).await?;
    let mut denials = app.permission_errors().subscribe();

    let signed_in = || {
        args.user.clone().ok_or(ArgsError::SignedOut {
            command: args.command.name(),
        })
    };

    match &args.command {
        Command::Dashboard { query } => {
            let inputs = app.dashboard_feed()?.refresh().await;
            let view = inputs.view(query);
            if let Some(results) = view.search {
                println!("Search \"{query}\":");
                for resource in results.resources {
                    println!("  [resource] {} ({})", resource.title(), resource.id());
                }
                for path in results.paths {
                    println!("  [path] {} ({})", path.title(), path.id());
                }
            } else {
                println!("Favorites:");
                for resource in view.favorites {
                    println!("  {} ({})", resource.title(), resource.id());
                }
                println!("Learning paths:");
                for started in view.paths {
                    println!(
                        "  {} {}/{} ({:.0}%)",
                        started.path.title(),
                        started.completed_steps,
                        started.total_steps,
                        started.progress
                    );
                }
            }
        }
        Command::Catalog { slug, filter } => {
            match app.catalog().category_resources(slug, filter).await? {
                Some(resources) => {
                    for resource in resources {
                        println!(
                            "{:<24} {:<14} {:<8} {:<10} {}",
                            resource.id(),
                            resource.difficulty(),
                            resource.data_weight(),
                            resource.language(),
                            resource.title()
                        );
                    }
                }
                None => eprintln!("no category with slug {slug}"),
            }
        }
        Command::Path { id } => {
            let progress = app.progress().sync().await;
            match app.catalog().path_page(id, &progress).await? {
                Some(page) => {
                    let detail = page.detail();
                    println!(
                        "{} ({}%, {}/{})",
                        detail.path.title(),
                        detail.progress_percent,
                        detail.completed_steps,
                        detail.total_steps
                    );
                    for step in &detail.steps {
                        let mark = if step.completed { 'x' } else { ' ' };
                        println!("  {}. [{mark}] {}", step.order, step.resource.title());
                    }
                }
                None => eprintln!("no learning path {id}"),
            }
        }
        Command::Certifications => {
            for listing in app.catalog().list_certifications().await? {
                let cert = &listing.certification;
                let category = category_by_id(cert.category_id()).map_or("?", |c| c.name);
                println!(
                    "{:<40} {:<20} {:<16}{}",
                    cert.title(),
                    cert.issuing_body(),
                    category,
                    if listing.expired { " (expirée)" } else { "" }
                );
            }
        }
        Command::Stats => {
            let stats = app.admin_feed().await?.refresh().await;
            println!("Users: {}", stats.user_count());
            println!("Favorites: {}", stats.favorites.total);
            for path in &stats.paths {
                println!(
                    "  {:<40} completed by {}",
                    path.title(),
                    stats.completions_for(path.id())
                );
            }
            for (resource, count) in stats.resources_by_favorites().into_iter().take(10) {
                println!("  {count:>4} {}", resource.title());
            }
        }
        Command::Feedback => {
            for report in app.feedback().list().await? {
                println!(
                    "{} [{}] {} {}: {}",
                    report.created_at.format("%Y-%m-%d %H:%M"),
                    report.status.label(),
                    report.kind.label(),
                    report.submitter.name.as_deref().unwrap_or("anonyme"),
                    report.message
                );
            }
        }
        Command::Favorite { resource } => {
            signed_in()?;
            app.progress().toggle_favorite(resource).await;
            println!("favorite: {}", app.progress().is_favorite(resource));
        }
        Command::Done { resource } => {
            signed_in()?;
            app.progress().toggle_resource_completed(resource).await;
            println!("completed: {}", app.progress().is_completed(resource));
        }
        Command::Reset { path } => {
            signed_in()?;
            let progress = app.progress().sync().await;
            match app.catalog().path_page(path, &progress).await? {
                Some(page) => {
                    let targets = page.detail().reset_targets();
                    app.progress().reset_path_progress(&targets).await;
                    println!("reset {} resources", targets.len());
                }
                None => eprintln!("no learning path {path}"),
            }
        }
    }

    print_denials(&mut denials);
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
