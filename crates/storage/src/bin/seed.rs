use std::fmt;

use chrono::{DateTime, Duration, Utc};
use itetude_core::model::{
    CategoryId, CertificationDraft, CertificationStatus, DataWeight, Difficulty, PathDraft,
    ProgressFields, ProgressStatus, ResourceDraft, ResourceId, UserId,
};
use storage::mapping::{
    ADMINS, CERTIFICATIONS, LEARNING_PATHS, PROGRESS, RESOURCES, USERS, encode_certification,
    encode_path, encode_progress, encode_resource,
};
use storage::{CollectionPath, Storage, WriteBatch};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    user: Option<UserId>,
    admin: Option<UserId>,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidUser { raw: String },
    InvalidAdmin { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidUser { raw } => write!(f, "invalid --user value: {raw}"),
            ArgsError::InvalidAdmin { raw } => write!(f, "invalid --admin value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("ITETUDE_DB_URL")
            .unwrap_or_else(|_| "sqlite:itetude.sqlite3?mode=rwc".into());
        let mut user = std::env::var("ITETUDE_USER")
            .ok()
            .and_then(|value| value.parse::<UserId>().ok());
        let mut admin: Option<UserId> = None;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
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
                "--admin" => {
                    let value = require_value(&mut args, "--admin")?;
                    let parsed = value
                        .parse::<UserId>()
                        .map_err(|_| ArgsError::InvalidAdmin { raw: value.clone() })?;
                    admin = Some(parsed);
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            user,
            admin,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:itetude.sqlite3?mode=rwc)");
    eprintln!("  --user <uid>              Also seed sample progress for this user");
    eprintln!("  --admin <uid>             Grant this user access to the admin pages");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  ITETUDE_DB_URL, ITETUDE_USER");
}

fn resource(
    title: &str,
    url: &str,
    weight: DataWeight,
    difficulty: Difficulty,
    category: u32,
    language: &str,
) -> ResourceDraft {
    ResourceDraft {
        title: title.into(),
        url: url.into(),
        description: None,
        language: language.into(),
        data_weight: weight,
        difficulty,
        category_id: CategoryId::new(category),
        author: None,
    }
}

fn sample_resources() -> Vec<(&'static str, ResourceDraft)> {
    vec![
        (
            "mdn-html",
            resource(
                "Les bases du HTML",
                "https://developer.mozilla.org/fr/docs/Learn/HTML",
                DataWeight::Plume,
                Difficulty::Beginner,
                1,
                "Français",
            ),
        ),
        (
            "mdn-css",
            resource(
                "Premiers pas en CSS",
                "https://developer.mozilla.org/fr/docs/Learn/CSS",
                DataWeight::Standard,
                Difficulty::Beginner,
                1,
                "Français",
            ),
        ),
        (
            "js-info",
            resource(
                "The Modern JavaScript Tutorial",
                "https://javascript.info/",
                DataWeight::Standard,
                Difficulty::Intermediate,
                1,
                "Anglais",
            ),
        ),
        (
            "owasp-top10",
            resource(
                "OWASP Top 10",
                "https://owasp.org/www-project-top-ten/",
                DataWeight::Plume,
                Difficulty::Intermediate,
                2,
                "Anglais",
            ),
        ),
        (
            "tcp-ip-video",
            resource(
                "Le modèle TCP/IP en vidéo",
                "https://www.youtube.com/watch?v=tcpip",
                DataWeight::Flux,
                Difficulty::Beginner,
                4,
                "Français",
            ),
        ),
    ]
}

fn sample_path() -> PathDraft {
    PathDraft {
        title: "Devenir développeur web".into(),
        description: Some("Du HTML au JavaScript moderne.".into()),
        category_id: CategoryId::new(1),
        difficulty: Difficulty::Beginner,
        resource_ids: ["mdn-html", "mdn-css", "js-info"]
            .into_iter()
            .map(ResourceId::new)
            .collect(),
    }
}

fn sample_certification(now: DateTime<Utc>) -> CertificationDraft {
    CertificationDraft {
        title: "CCNA".into(),
        issuing_body: "Cisco".into(),
        url: "https://www.cisco.com/site/us/en/learn/training-certifications/certifications/enterprise/ccna/index.html".into(),
        logo_url: "https://www.cisco.com/favicon.ico".into(),
        description: Some("Fondamentaux des réseaux d'entreprise.".into()),
        category_id: CategoryId::new(4),
        difficulty: Difficulty::Intermediate,
        issued_at: Some(now - Duration::days(365)),
        expires_at: Some(now + Duration::days(3 * 365)),
        language: "Anglais".into(),
        status: CertificationStatus::Paid,
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let resources = CollectionPath::parse(RESOURCES)?;
    let paths = CollectionPath::parse(LEARNING_PATHS)?;
    let certifications = CollectionPath::parse(CERTIFICATIONS)?;

    let samples = sample_resources();
    let mut batch = WriteBatch::new();
    for (id, draft) in &samples {
        let draft = draft.clone().validate()?;
        batch.merge(resources.doc(id)?, encode_resource(&draft, Some(now))?);
    }
    batch.merge(
        paths.doc("web-debutant")?,
        encode_path(&sample_path(), Some(now))?,
    );
    batch.merge(
        certifications.doc("ccna")?,
        encode_certification(&sample_certification(now).validate()?, Some(now))?,
    );

    if let Some(user) = &args.user {
        let progress = CollectionPath::parse(USERS)?
            .doc(user.as_str())?
            .collection(PROGRESS)?;
        batch.merge(
            progress.doc("mdn-html")?,
            encode_progress(
                ProgressFields {
                    status: ProgressStatus::Completed,
                    is_favorite: true,
                },
                now,
            )?,
        );
        batch.merge(
            progress.doc("owasp-top10")?,
            encode_progress(
                ProgressFields {
                    status: ProgressStatus::NotStarted,
                    is_favorite: true,
                },
                now,
            )?,
        );
    }

    if let Some(admin) = &args.admin {
        batch.merge(CollectionPath::parse(ADMINS)?.doc(admin.as_str())?, Default::default());
    }

    storage.documents.commit(batch).await?;

    println!(
        "Seeded {} resources, 1 learning path and 1 certification into {}{}",
        samples.len(),
        args.db_url,
        args.user
            .map(|u| format!(" (with progress for {u})"))
            .unwrap_or_default()
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
