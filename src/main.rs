mod calendar;
mod config;
mod error;
mod matching;
mod materialize;
mod models;
mod naming;
mod photos;
mod prompt;
mod service;
mod service_clients;
mod session;
#[cfg(test)]
mod testing;
mod transfer;
mod uploads;

use crate::calendar::CalendarClient;
use crate::config::AppConfig;
use crate::models::Access;
use crate::photos::{CreateAlbum, PhotosClient, PhotosOptions, UploadReport};
use crate::prompt::ConsolePrompter;
use crate::service_clients::local::LocalStore;
use crate::session::LoginRequest;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

/// Command line access to photo albums and calendars.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// directory holding the default/<run mode>/local config files
    #[arg(long, default_value = "config", global = true)]
    config_dir: String,

    /// email to log in with
    #[arg(long, global = true)]
    email: Option<String>,

    /// password to log in with, asked for on the terminal when missing
    #[arg(long, global = true)]
    password: Option<String>,

    /// JSON file containing the email and password to log in with
    #[arg(long, global = true)]
    credentials: Option<PathBuf>,

    /// user whose albums are used
    #[arg(long, global = true)]
    user: Option<String>,

    /// never ask for confirmation, tags or a password
    #[arg(long, global = true)]
    no_prompt: bool,

    /// match titles as regular expressions anchored at the start
    #[arg(long, global = true)]
    regex: bool,

    #[command(subcommand)]
    service: ServiceCommand,
}

#[derive(Debug, Subcommand)]
enum ServiceCommand {
    /// photo album tasks
    #[command(subcommand)]
    Photos(PhotosTask),

    /// calendar tasks
    #[command(subcommand)]
    Calendar(CalendarTask),
}

#[derive(Debug, Subcommand)]
enum PhotosTask {
    /// List albums
    List {
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Create an album
    Create(CreateArgs),

    /// Post photos to the albums with a title
    Post {
        #[arg(short, long)]
        title: String,

        #[arg(long, default_value = "")]
        tags: String,

        #[arg(required = true)]
        photos: Vec<PathBuf>,
    },

    /// Download albums
    Get {
        #[arg(short, long)]
        title: Option<String>,

        /// destination directory, the configured download directory if missing
        #[arg(short, long)]
        dest: Option<PathBuf>,
    },

    /// Delete albums with a title
    Delete {
        #[arg(short, long)]
        title: String,

        /// delete when the prompt is answered with nothing
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Debug, Args)]
struct CreateArgs {
    #[arg(short, long)]
    title: String,

    #[arg(short, long, default_value = "")]
    summary: String,

    /// album date as MM/DD/YYYY
    #[arg(short, long)]
    date: Option<String>,

    #[arg(short, long, value_enum, default_value_t = Access::Public)]
    access: Access,

    /// tags added to every photo, e.g. "Islands, Vacation"
    #[arg(long, default_value = "")]
    tags: String,

    photos: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct EventFilter {
    #[arg(short, long)]
    title: Option<String>,

    /// full text search on titles and content
    #[arg(short, long)]
    query: Option<String>,
}

#[derive(Debug, Subcommand)]
enum CalendarTask {
    /// List events on the primary calendar
    List {
        #[command(flatten)]
        filter: EventFilter,

        /// YYYY-MM-DD, YYYY-MM-DD,YYYY-MM-DD or ,YYYY-MM-DD
        #[arg(short, long)]
        date: Option<String>,

        #[arg(long)]
        delimiter: Option<String>,

        /// comma separated fields to print
        style: Option<String>,
    },

    /// List events for today
    Today {
        #[command(flatten)]
        filter: EventFilter,

        #[arg(long)]
        delimiter: Option<String>,

        style: Option<String>,
    },

    /// Add an event with quick add text
    Add { text: String },

    /// Delete events from the primary calendar
    Delete {
        #[command(flatten)]
        filter: EventFilter,

        #[arg(short, long)]
        date: Option<String>,

        #[arg(short, long)]
        yes: bool,
    },
}

/// Flags win over the configuration. The configured credentials file is only
/// used when no credentials were given on the command line.
fn login_request(cli: &Cli, config: &AppConfig) -> LoginRequest {
    let flags_given = cli.credentials.is_some() || cli.email.is_some() || cli.password.is_some();

    let credentials_path = match &cli.credentials {
        Some(path) => Some(path.clone()),
        None if flags_given => None,
        None => config.credentials_path.as_ref().map(PathBuf::from),
    };

    LoginRequest {
        email: cli.email.clone().or_else(|| config.email.clone()),
        password: cli.password.clone(),
        credentials_path,
    }
}

fn print_upload_report(report: &UploadReport) {
    println!("Uploaded {} of {} photos", report.succeeded(), report.len());
}

async fn run_photos(task: PhotosTask, mut client: PhotosClient, config: &AppConfig, user: &str) -> Result<()> {
    match task {
        PhotosTask::List { title } => {
            let albums = client.get_albums(user, title.as_deref()).await?;

            if albums.is_empty() {
                println!("No albums found");
            }

            for album in albums {
                println!("{}{}{}", album.title, config.delimiter, album.access);
            }
        }
        PhotosTask::Create(args) => {
            let (album, report) = client
                .create_album(CreateAlbum {
                    title: args.title,
                    summary: args.summary,
                    date: args.date,
                    access: args.access,
                    photos: args.photos,
                    tags: args.tags,
                })
                .await?;

            println!("Created album {}", album.title);

            if let Some(report) = report {
                print_upload_report(&report);
            }
        }
        PhotosTask::Post { title, tags, photos } => {
            for (album, report) in client.post_photos(user, &title, &photos, &tags).await? {
                print!("{}: ", album.title);
                print_upload_report(&report);
            }
        }
        PhotosTask::Get { title, dest } => {
            let base = dest.unwrap_or_else(|| PathBuf::from(&config.download_directory));

            for download in client.download_albums(&base, user, title.as_deref()).await? {
                match download.result {
                    Ok(materialized) => println!(
                        "Downloaded {} of {} photos from {} to {}",
                        materialized.report.succeeded(),
                        materialized.report.len(),
                        download.album.title,
                        materialized.path.display()
                    ),
                    Err(e) => println!("Failed to download album {}: {}", download.album.title, e),
                }
            }
        }
        PhotosTask::Delete { title, yes } => {
            client.delete_albums(&title, yes || config.delete_by_default).await?;
        }
    }

    Ok(())
}

async fn run_calendar(task: CalendarTask, mut client: CalendarClient, config: &AppConfig) -> Result<()> {
    match task {
        CalendarTask::List { filter, date, delimiter, style } => {
            list_events(&client, config, date, filter, delimiter, style).await?;
        }
        CalendarTask::Today { filter, delimiter, style } => {
            let today = calendar::today_range(chrono::Local::now().date_naive());
            list_events(&client, config, Some(today), filter, delimiter, style).await?;
        }
        CalendarTask::Add { text } => {
            let event = client.quick_add_event(&text).await?;
            println!("Added event {}", event.title);
        }
        CalendarTask::Delete { filter, date, yes } => {
            if filter.title.is_none() && filter.query.is_none() {
                anyhow::bail!("deleting events requires --title or --query");
            }

            let events = client
                .get_events(date.as_deref(), filter.title.as_deref(), filter.query.as_deref())
                .await?;
            client.delete_events(events, yes || config.delete_by_default).await?;
        }
    }

    Ok(())
}

async fn list_events(
    client: &CalendarClient,
    config: &AppConfig,
    date: Option<String>,
    filter: EventFilter,
    delimiter: Option<String>,
    style: Option<String>,
) -> Result<()> {
    let events = client
        .get_events(date.as_deref(), filter.title.as_deref(), filter.query.as_deref())
        .await?;
    let style: Vec<String> = match style {
        Some(style) => style.split(',').map(|s| s.trim().to_owned()).collect(),
        None => config.list_style(),
    };
    let delimiter = delimiter.unwrap_or_else(|| config.delimiter.clone());

    for event in events {
        println!("{}", calendar::entry_to_string(&event, &style, &delimiter));
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::new(&cli.config_dir).context("failed to load configuration")?;

    // Initialize env_logger based on config.log_level
    env_logger::Builder::new()
        .filter_level(config.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    info!("Starting googlecl");

    let store = Arc::new(LocalStore::new(&config).with_context(|| {
        format!("failed to open store directory {}", config.store_directory)
    })?);
    let mut request = login_request(&cli, &config);

    if request.needs_password() && !cli.no_prompt {
        let prompt = format!("Password for {}: ", request.email.as_deref().unwrap_or_default());
        request.password = Some(rpassword::prompt_password(&prompt).context("failed to read password")?);
    }

    let user = cli.user.clone().unwrap_or_else(|| config.user.clone());
    let use_regex = cli.regex || config.use_regex;

    match cli.service {
        ServiceCommand::Photos(task) => {
            let mut client = PhotosClient::new(
                store,
                Box::new(ConsolePrompter),
                PhotosOptions {
                    prompt_for_tags: config.prompt_for_tags && !cli.no_prompt,
                    prompt_for_delete: config.prompt_for_delete && !cli.no_prompt,
                    allowed_extensions: config.allowed_extensions.clone(),
                    use_regex,
                },
            );
            client.login(&request).await.context("login failed")?;
            info!("Logged in as {}", client.account().unwrap_or_default());

            run_photos(task, client, &config, &user).await?;
        }
        ServiceCommand::Calendar(task) => {
            let mut client = CalendarClient::new(
                store,
                Box::new(ConsolePrompter),
                config.prompt_for_delete && !cli.no_prompt,
            )
            .with_regex(use_regex);
            client.login(&request).await.context("login failed")?;
            info!("Logged in as {}", client.account().unwrap_or_default());

            run_calendar(task, client, &config).await?;
        }
    }

    info!("googlecl finished");

    Ok(())
}
