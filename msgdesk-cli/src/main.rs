//! Msgdesk CLI - command-line front end for the message service
//!
//! Logs in, keeps the session in a file between runs and offers the message
//! operations the current role allows.

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use msgdesk_client::{
    ApiError, Capability, Client, FileTokenStorage, ListPage, ListQuery, Message, MessageForm,
    PageItem, Permissions, SortDirection, SortField,
};
use msgdesk_core::{
    init_logging, log_operation_error, log_operation_start, log_operation_success,
    performance::measure_async, ClientConfig, LoggingConfig, Navigator, PAGE_SIZE_OPTIONS,
};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "msgdesk")]
#[command(about = "Manage messages on a message service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and keep the session for later commands
    Login {
        username: String,

        /// Password; prompted for when omitted
        #[arg(short, long)]
        password: Option<String>,
    },

    /// End the session
    Logout,

    /// Show the current user and what they may do
    Whoami {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Work with messages
    Messages {
        #[command(subcommand)]
        action: MessageCommands,
    },

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Initialize default configuration
        #[arg(long)]
        init: bool,

        /// Set a configuration value (key=value format)
        #[arg(long)]
        set: Option<String>,

        /// Get a configuration value
        #[arg(long)]
        get: Option<String>,

        /// Validate current configuration
        #[arg(long)]
        validate: bool,
    },
}

#[derive(Subcommand)]
enum MessageCommands {
    /// List messages, one page at a time
    List {
        /// Only messages whose code or content contains this text
        #[arg(short, long)]
        search: Option<String>,

        /// Sort by id, code or content
        #[arg(long, default_value = "id")]
        sort: SortField,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        /// Page number, starting at 1
        #[arg(long, default_value = "1")]
        page: usize,

        /// Messages per page (10, 25, 50 or 100)
        #[arg(long)]
        page_size: Option<usize>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one message
    Get {
        id: i64,

        #[arg(long)]
        json: bool,
    },

    /// Create a message
    Create { code: String, content: String },

    /// Change code and/or content of a message
    Update {
        id: i64,

        #[arg(long)]
        code: Option<String>,

        #[arg(long)]
        content: Option<String>,
    },

    /// Delete a message
    Delete {
        id: i64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Tells the user to log in again; a terminal cannot switch views
struct CliNavigator;

impl Navigator for CliNavigator {
    fn redirect_to_login(&self) {
        eprintln!("Your session has ended. Run `msgdesk login <username>` to sign in again.");
    }
}

#[derive(Serialize)]
struct WhoamiOutput {
    username: String,
    role: String,
    permissions: Permissions,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<ApiError>() {
            Some(api_error) => eprintln!("Error: {}", api_error.user_message()),
            None => eprintln!("Error: {:#}", e),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut logging_config = LoggingConfig::default();
    if cli.verbose {
        logging_config.level = "debug".to_string();
        logging_config.filter_directives = vec![
            "msgdesk=debug".to_string(),
            "msgdesk_core=debug".to_string(),
            "msgdesk_client=debug".to_string(),
        ];
    }
    init_logging(&logging_config).map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    info!("Starting msgdesk CLI v{}", env!("CARGO_PKG_VERSION"));

    let config_path = cli.config.as_ref();
    match cli.command {
        Commands::Config {
            show,
            init,
            set,
            get,
            validate,
        } => handle_config(config_path, show, init, set, get, validate),
        Commands::Login { username, password } => {
            let (_, client) = connect(config_path)?;
            let password = match password {
                Some(password) => password,
                None => prompt("Password: ")?,
            };
            handle_login(&client, &username, &password).await
        }
        Commands::Logout => {
            let (_, client) = connect(config_path)?;
            client.logout().await;
            println!("Logged out");
            Ok(())
        }
        Commands::Whoami { json } => {
            let (_, client) = connect(config_path)?;
            handle_whoami(&client, json).await
        }
        Commands::Messages { action } => {
            let (config, client) = connect(config_path)?;
            handle_messages(action, &client, &config).await
        }
    }
}

async fn handle_login(client: &Client, username: &str, password: &str) -> anyhow::Result<()> {
    log_operation_start!("login", username = username);

    match client.login(username, password).await {
        Ok(()) => {
            log_operation_success!("login", username = username);
            let granted = client.current_permissions().await?;
            println!("Logged in as {}", username);
            if granted.is_read_only {
                println!("Your role has read-only access");
            }
            Ok(())
        }
        Err(e) => {
            log_operation_error!("login", e);
            Err(e.into())
        }
    }
}

async fn handle_whoami(client: &Client, json: bool) -> anyhow::Result<()> {
    if !client.session().is_authenticated() {
        println!("Not logged in");
        return Ok(());
    }

    let user = client.current_user().await?;
    let permissions = Permissions::for_user(Some(&user));

    if json {
        let output = WhoamiOutput {
            username: user.username,
            role: user.role,
            permissions,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("User: {}", user.username);
    println!("Role: {}", user.role);
    if permissions.is_read_only {
        println!("Access: read-only");
    } else {
        let allowed: Vec<String> = permissions
            .capabilities()
            .iter()
            .map(ToString::to_string)
            .collect();
        println!("Access: {}", allowed.join(", "));
    }
    Ok(())
}

async fn handle_messages(
    action: MessageCommands,
    client: &Client,
    config: &ClientConfig,
) -> anyhow::Result<()> {
    let messages = client.messages();

    match action {
        MessageCommands::List {
            search,
            sort,
            desc,
            page,
            page_size,
            json,
        } => {
            let page_size = page_size.unwrap_or(config.ui.page_size);
            if !PAGE_SIZE_OPTIONS.contains(&page_size) {
                bail!("Page size must be one of {:?}", PAGE_SIZE_OPTIONS);
            }

            let all = measure_async("list_messages", messages.list()).await?;

            let mut query = ListQuery::with_page_size(page_size);
            query.set_search(search.unwrap_or_default());
            query.sort_field = sort;
            query.sort_direction = if desc {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            };
            query.page = page;

            let result = query.apply(&all);
            debug!(
                total = result.total_items,
                page = result.page,
                "Prepared message page"
            );

            if json {
                println!("{}", serde_json::to_string_pretty(&result.items)?);
            } else {
                print_page(&result);
            }
        }
        MessageCommands::Get { id, json } => {
            let message = messages.get(id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&message)?);
            } else {
                print_message(&message);
            }
        }
        MessageCommands::Create { code, content } => {
            require(client, Capability::Create).await?;
            let created = messages.create(MessageForm::new(code, content)).await?;
            println!("Created message {} ({})", created.id, created.code);
        }
        MessageCommands::Update { id, code, content } => {
            require(client, Capability::Edit).await?;
            if code.is_none() && content.is_none() {
                bail!("Nothing to change; pass --code and/or --content");
            }

            let existing = messages.get(id).await?;
            let mut form = MessageForm::from_message(&existing);
            if let Some(code) = code {
                form.code = code;
            }
            if let Some(content) = content {
                form.content = content;
            }

            let updated = messages.update(id, form).await?;
            println!("Updated message {} ({})", updated.id, updated.code);
        }
        MessageCommands::Delete { id, yes } => {
            require(client, Capability::Delete).await?;
            if !yes {
                let message = messages.get(id).await?;
                let answer = prompt(&format!(
                    "Delete message {} ({})? This cannot be undone. [y/N] ",
                    message.id, message.code
                ))?;
                if !matches!(answer.trim(), "y" | "Y" | "yes") {
                    println!("Cancelled");
                    return Ok(());
                }
            }
            messages.delete(id).await?;
            println!("Deleted message {}", id);
        }
    }

    Ok(())
}

/// Refuse locally when the role does not offer `capability`
async fn require(client: &Client, capability: Capability) -> anyhow::Result<()> {
    if !client.session().is_authenticated() {
        bail!("Not logged in. Run `msgdesk login <username>` first.");
    }
    let granted = client.current_permissions().await?;
    if !granted.allows(capability) {
        bail!("Your role does not allow you to {} messages", capability);
    }
    Ok(())
}

fn print_page(page: &ListPage) {
    if page.total_items == 0 {
        println!("No messages found");
        return;
    }

    println!("{:>6}  {:<20}  CONTENT", "ID", "CODE");
    for message in &page.items {
        println!(
            "{:>6}  {:<20}  {}",
            message.id,
            truncate(&message.code, 20),
            truncate(&message.content, 60)
        );
    }

    println!();
    println!(
        "Showing {}-{} of {}",
        page.start_item, page.end_item, page.total_items
    );
    if page.total_pages > 1 {
        let links: Vec<String> = page
            .page_window()
            .into_iter()
            .map(|item| match item {
                PageItem::Page(n) if n == page.page => format!("[{}]", n),
                other => other.to_string(),
            })
            .collect();
        println!("Pages: {}", links.join(" "));
    }
}

fn print_message(message: &Message) {
    println!("ID:      {}", message.id);
    println!("Code:    {}", message.code);
    println!("Content: {}", message.content);
    if let Some(created) = message.created_at {
        println!("Created: {}", created.format("%Y-%m-%d %H:%M"));
    }
    if let Some(updated) = message.updated_at {
        println!("Updated: {}", updated.format("%Y-%m-%d %H:%M"));
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{}", label);
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Load configuration and build a client whose session lives in the session file
fn connect(config_path: Option<&PathBuf>) -> anyhow::Result<(ClientConfig, Client)> {
    let config = load_config(config_path)?;
    let session_file = config.session_file_path();
    debug!("Using session file {:?}", session_file);

    let storage = Arc::new(FileTokenStorage::new(session_file));
    let client = Client::new(&config, storage, Arc::new(CliNavigator))
        .context("Failed to create API client")?;
    Ok((config, client))
}

/// Load configuration from `--config` or the first default location that exists
fn load_config(config_path: Option<&PathBuf>) -> anyhow::Result<ClientConfig> {
    let config = if let Some(path) = config_path {
        info!("Loading configuration from {:?}", path);
        ClientConfig::from_file(path)?
    } else {
        let default_paths = [
            dirs::config_dir().map(|d| d.join("msgdesk").join("config.toml")),
            dirs::home_dir().map(|d| d.join(".msgdesk").join("config.toml")),
            Some(PathBuf::from("msgdesk.toml")),
        ];

        match default_paths.into_iter().flatten().find(|p| p.exists()) {
            Some(path) => {
                info!("Loading configuration from {:?}", path);
                ClientConfig::from_file(&path)?
            }
            None => {
                info!("No configuration file found, using defaults");
                ClientConfig::default()
            }
        }
    };

    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

fn handle_config(
    config_path: Option<&PathBuf>,
    show: bool,
    init: bool,
    set: Option<String>,
    get: Option<String>,
    validate: bool,
) -> anyhow::Result<()> {
    if init {
        let path = match config_path {
            Some(path) => path.clone(),
            None => default_config_path()?,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        ClientConfig::default().save_to_file(&path)?;
        println!("Configuration initialized at: {:?}", path);
    }

    if show {
        let config = load_config(config_path)?;
        println!("{}", toml::to_string_pretty(&config)?);
    }

    if validate {
        let config = load_config(config_path)?;
        println!("Configuration is valid (api.base_url = {})", config.api.base_url);
    }

    if let Some(key_value) = set {
        let Some((key, value)) = key_value.split_once('=') else {
            bail!("Invalid format. Use key=value, e.g. --set ui.page_size=25");
        };
        let path = match config_path {
            Some(path) => path.clone(),
            None => default_config_path()?,
        };
        set_config_value(&path, key.trim(), value.trim())?;
        println!("Set {} = {}", key.trim(), value.trim());
    }

    if let Some(key) = get {
        let config = load_config(config_path)?;
        println!("{} = {}", key, get_config_value(&config, &key)?);
    }

    Ok(())
}

fn default_config_path() -> anyhow::Result<PathBuf> {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|d| d.join(".config")))
        .map(|d| d.join("msgdesk").join("config.toml"))
        .ok_or_else(|| anyhow!("Could not determine a configuration directory"))
}

fn set_config_value(path: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let mut config = if path.exists() {
        ClientConfig::from_file(path)?
    } else {
        ClientConfig::default()
    };

    let parts: Vec<&str> = key.split('.').collect();
    match parts.as_slice() {
        ["api", "base_url"] => config.api.base_url = value.to_string(),
        ["api", "timeout_seconds"] => {
            config.api.timeout_seconds = value
                .parse()
                .with_context(|| format!("Invalid integer value: {}", value))?;
        }
        ["api", "user_agent"] => config.api.user_agent = value.to_string(),
        ["storage", "session_file"] => config.storage.session_file = value.to_string(),
        ["ui", "page_size"] => {
            config.ui.page_size = value
                .parse()
                .with_context(|| format!("Invalid integer value: {}", value))?;
        }
        _ => bail!("Unknown configuration key: {} (use --show to list keys)", key),
    }

    config.validate()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    config.save_to_file(path)?;
    Ok(())
}

fn get_config_value(config: &ClientConfig, key: &str) -> anyhow::Result<String> {
    let parts: Vec<&str> = key.split('.').collect();
    let value = match parts.as_slice() {
        ["api", "base_url"] => config.api.base_url.clone(),
        ["api", "timeout_seconds"] => config.api.timeout_seconds.to_string(),
        ["api", "user_agent"] => config.api.user_agent.clone(),
        ["storage", "session_file"] => config.storage.session_file.clone(),
        ["ui", "page_size"] => config.ui.page_size.to_string(),
        _ => bail!("Unknown configuration key: {} (use --show to list keys)", key),
    };
    Ok(value)
}
