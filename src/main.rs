use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use krishi_setu::error::{ModalError, ValidationError};
use krishi_setu::listing::{ListingModal, ListingStore, PreviewStore, Scope};
use krishi_setu::models::{FieldKind, Listing, OwnerRef, Profile, Role, BUSINESS_TYPES};
use krishi_setu::{
    ClientConfig, ClientError, FileSession, HttpListingApi, HttpProfileApi, ImageFile, ListingApi,
    ProfileManager, ProfileUpdate, SessionContext,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "krishi-setu", version, about = "Browse and manage Krishi Setu marketplace posts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the fields and statuses a role's posts use
    Fields { role: Role },
    /// List posts (everyone's, or only yours with --mine)
    List {
        role: Role,
        #[arg(long)]
        mine: bool,
        #[arg(long)]
        search: Option<String>,
    },
    /// Create a post
    Create {
        role: Role,
        /// Field assignment, e.g. --set title="Harvest Job"
        #[arg(long = "set", value_parser = parse_assignment)]
        set: Vec<(String, String)>,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Edit one of your posts
    Update {
        role: Role,
        id: String,
        #[arg(long = "set", value_parser = parse_assignment)]
        set: Vec<(String, String)>,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Delete one of your posts
    Delete {
        role: Role,
        id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Show your profile as the backend has it
    Whoami,
    /// Edit your profile
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        mobile: Option<String>,
        #[arg(long)]
        location: Option<String>,
        /// Replaces the current list; repeat for several (Farmer, Driver, Buyer, Seller)
        #[arg(long = "business-type")]
        business_types: Vec<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        picture: Option<PathBuf>,
    },
    /// Forget the stored login
    Logout,
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got \"{raw}\""))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env()?;
    let session = Arc::new(
        FileSession::load(&config.session_file).context("Failed to load session")?,
    );

    match cli.command {
        Command::Fields { role } => print_fields(role),
        Command::Whoami => {
            if session.token().is_none() {
                println!("Not logged in");
                return Ok(());
            }
            let profiles = open_profiles(&config, session)?;
            match profiles.load().await {
                Ok(profile) => print_profile(&profile, &config),
                Err(ClientError::Auth(_)) => println!("Session expired, please log in again"),
                Err(err) => return Err(err.into()),
            }
        }
        Command::Profile {
            name,
            mobile,
            location,
            business_types,
            password,
            picture,
        } => {
            let profiles = open_profiles(&config, session)?;
            let current = profiles.load().await?;

            let mut update = ProfileUpdate::from_profile(&current);
            if let Some(name) = name {
                update.name = name;
            }
            if let Some(mobile) = mobile {
                update.mobile = mobile;
            }
            if let Some(location) = location {
                update.location = location;
            }
            if !business_types.is_empty() {
                update.business_types = business_types;
            }
            update.password = password;
            if let Some(path) = picture {
                let file = ImageFile::from_path(&path)
                    .await
                    .with_context(|| format!("Failed to read image {}", path.display()))?;
                update.picture = Some(file);
            }

            match profiles.save(&update).await {
                Ok(profile) => print_profile(&profile, &config),
                Err(ClientError::Validation(ValidationError::Fields(errors))) => {
                    for (field, message) in &errors {
                        eprintln!("  {field}: {message}");
                    }
                    bail!("Profile not saved: fix the fields above");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Command::Logout => {
            session.invalidate();
            info!("👋 Logged out");
        }
        Command::List { role, mine, search } => {
            let store = open_store(&config, session, role)?;
            let scope = if mine { Scope::Mine } else { Scope::All };
            store.fetch(scope).await?;

            let listings = store.search(search.as_deref().unwrap_or(""));
            info!("Found {} {} posts", listings.len(), role);
            for (i, listing) in listings.iter().enumerate() {
                print_listing(i + 1, role, listing, &config);
            }
        }
        Command::Create { role, set, image } => {
            let store = open_store(&config, session, role)?;
            let mut modal = new_modal(role, &config);
            modal.open(None)?;
            fill(&mut modal, &set, image).await?;

            let listing = submit(&mut modal, &store).await?;
            print_listing(1, role, &listing, &config);
        }
        Command::Update { role, id, set, image } => {
            let store = open_store(&config, session, role)?;
            store.fetch_mine().await?;
            let Some(existing) = store.get(&id) else {
                bail!("No {} post with id {} among your posts", role, id);
            };

            let mut modal = new_modal(role, &config);
            modal.open(Some(&existing))?;
            fill(&mut modal, &set, image).await?;

            let listing = submit(&mut modal, &store).await?;
            print_listing(1, role, &listing, &config);
        }
        Command::Delete { role, id, yes } => {
            let store = open_store(&config, session, role)?;
            store.fetch_mine().await?;
            if store.get(&id).is_none() {
                bail!("No {} post with id {} among your posts", role, id);
            }

            let request = store.request_delete(&id);
            let confirmed = yes || ask(request.prompt()).await?;
            match request.resolve(confirmed).await? {
                Some(confirmation) => println!(
                    "{}",
                    confirmation
                        .message
                        .unwrap_or_else(|| format!("Deleted {}", confirmation.id))
                ),
                None => println!("Cancelled"),
            }
        }
    }

    Ok(())
}

fn open_store(config: &ClientConfig, session: Arc<FileSession>, role: Role) -> Result<ListingStore> {
    let api: Arc<dyn ListingApi> = Arc::new(HttpListingApi::new(config, session)?);
    Ok(ListingStore::with_tracing(role, api))
}

fn open_profiles(config: &ClientConfig, session: Arc<FileSession>) -> Result<ProfileManager> {
    let api = Arc::new(HttpProfileApi::new(config, session.clone())?);
    Ok(ProfileManager::with_tracing(api, session))
}

fn new_modal(role: Role, config: &ClientConfig) -> ListingModal {
    ListingModal::new(role.schema(), PreviewStore::new(), config.asset_base_url.clone())
}

async fn fill(modal: &mut ListingModal, set: &[(String, String)], image: Option<PathBuf>) -> Result<()> {
    let form = modal.form_mut().context("Modal is not open")?;
    for (name, value) in set {
        form.set_field(name, value.clone())?;
    }

    if let Some(path) = image {
        let file = ImageFile::from_path(&path)
            .await
            .with_context(|| format!("Failed to read image {}", path.display()))?;
        form.set_image(Some(file)).await?;
    }
    Ok(())
}

async fn submit(modal: &mut ListingModal, store: &ListingStore) -> Result<Listing> {
    match modal.submit_to(store).await {
        Ok(listing) => Ok(listing),
        Err(ModalError::Validation(ValidationError::Fields(errors))) => {
            for (field, message) in &errors {
                eprintln!("  {field}: {message}");
            }
            bail!("{} not submitted: fix the fields above", modal.schema().noun);
        }
        Err(err) => Err(err.into()),
    }
}

async fn ask(prompt: &str) -> Result<bool> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(format!("{prompt} [y/N] ").as_bytes()).await?;
    stdout.flush().await?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await
        .context("Failed to read confirmation")?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn print_fields(role: Role) {
    let schema = role.schema();
    println!("{} ({})", schema.noun, role.collection());
    for field in schema.fields {
        let kind = match field.kind {
            FieldKind::Text => "text".to_string(),
            FieldKind::TextArea => "long text".to_string(),
            FieldKind::Number { min: Some(min) } => format!("number >= {min}"),
            FieldKind::Number { min: None } => "number".to_string(),
        };
        let required = if field.required { ", required" } else { "" };
        println!("  {:<16} {} [{}{}]  {}", field.name, field.label, kind, required, field.placeholder);
    }
    println!("  {:<16} one of: {}", "status", schema.statuses.join(", "));
}

fn print_listing(n: usize, role: Role, listing: &Listing, config: &ClientConfig) {
    let schema = role.schema();
    println!("{}. {} [{}]", n, listing.headline(schema), listing.status);
    for field in schema.fields.iter().filter(|f| f.name != schema.headline) {
        let value = listing.field_text(field.name);
        if !value.is_empty() {
            println!("   {}: {}", field.label, value);
        }
    }
    if let Some(path) = &listing.image_url {
        println!("   Image: {}", config.asset_url(path));
    }
    let owner = listing.user.as_ref().and_then(OwnerRef::name).unwrap_or("Unknown");
    match listing.created_at {
        Some(at) => println!("   Posted by {} on {}", owner, at.format("%Y-%m-%d")),
        None => println!("   Posted by {}", owner),
    }
    if let Some(id) = listing.id() {
        println!("   ID: {}", id);
    }
    println!();
}

fn print_profile(profile: &Profile, config: &ClientConfig) {
    println!("{} <{}>", profile.name, profile.email);
    if !profile.mobile.is_empty() {
        println!("   Mobile: {}", profile.mobile);
    }
    if !profile.location.is_empty() {
        println!("   Location: {}", profile.location);
    }
    let types = if profile.business_type.is_empty() {
        format!("none (choose from {})", BUSINESS_TYPES.join(", "))
    } else {
        profile.business_type.join(", ")
    };
    println!("   Business: {}", types);
    if let Some(path) = &profile.profile_picture {
        println!("   Picture: {}", config.asset_url(path));
    }
}
