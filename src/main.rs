use anyhow::{Context, Result};
use boxmeta::config::Config;
use boxmeta::metadata::{instance, query, template};
use boxmeta::{BoxClient, Credentials, Direction, Field, FieldOperation, ItemKind, MetadataQuery};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Box metadata templates, instances and queries from the command line
#[derive(Parser, Debug)]
#[command(name = "boxmeta", version, about, long_about = None)]
struct Args {
    /// Access token (overrides BOX_ACCESS_TOKEN and the config file)
    #[arg(long, global = true)]
    token: Option<String>,

    /// API root (overrides BOX_API_BASE_URL and the config file)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage metadata templates
    #[command(subcommand)]
    Template(TemplateCommand),

    /// Read metadata instances on files and folders
    #[command(subcommand)]
    Metadata(MetadataCommand),

    /// Execute a metadata query and print every result
    Query(QueryArgs),

    /// Show or change the saved configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the saved configuration with the token masked
    Show,
    /// Save a value (access_token, base_url or default_scope)
    Set { key: String, value: String },
    /// Remove a saved value
    Unset { key: String },
}

#[derive(Subcommand, Debug)]
enum TemplateCommand {
    /// Fetch a template by key
    Get {
        template_key: String,
        #[arg(long)]
        scope: Option<String>,
    },
    /// Fetch a template by id
    GetId { id: String },
    /// Create a template
    Create {
        template_key: String,
        #[arg(long)]
        display_name: String,
        #[arg(long)]
        scope: Option<String>,
        #[arg(long)]
        hidden: bool,
        /// JSON file holding an array of fields
        #[arg(long)]
        fields_file: Option<PathBuf>,
    },
    /// Apply field operations from a JSON file
    Update {
        template_key: String,
        #[arg(long)]
        scope: Option<String>,
        /// JSON file holding an array of operations
        #[arg(long)]
        operations_file: PathBuf,
    },
    /// Delete a template
    Delete {
        template_key: String,
        #[arg(long)]
        scope: Option<String>,
    },
    /// List templates in a scope
    List {
        #[arg(long)]
        scope: Option<String>,
        #[arg(long, default_value_t = template::DEFAULT_LIST_LIMIT)]
        limit: u32,
    },
}

#[derive(Subcommand, Debug)]
enum MetadataCommand {
    /// Fetch one template instance from an item
    Get {
        kind: ItemKind,
        item_id: String,
        template: String,
        #[arg(long)]
        scope: Option<String>,
    },
    /// Fetch every instance on an item
    All {
        kind: ItemKind,
        item_id: String,
        /// Restrict returned values (e.g. /firstName)
        #[arg(long = "field")]
        fields: Vec<String>,
    },
}

#[derive(clap::Args, Debug)]
struct QueryArgs {
    /// Template to query, as scope.templateKey
    #[arg(long)]
    from: String,
    #[arg(long)]
    ancestor_folder_id: String,
    /// Filter expression with :name placeholders
    #[arg(long)]
    query: String,
    /// Placeholder binding name=value; values that parse as JSON are sent as JSON
    #[arg(long = "param", value_parser = parse_param)]
    params: Vec<(String, Value)>,
    #[arg(long)]
    index_name: Option<String>,
    /// Sort order as field_key:asc or field_key:desc
    #[arg(long = "order-by", value_parser = parse_order_by)]
    order_by: Vec<(String, Direction)>,
    #[arg(long, default_value_t = query::DEFAULT_QUERY_LIMIT)]
    limit: u32,
    #[arg(long)]
    marker: Option<String>,
    /// Extra field to return with each item
    #[arg(long = "field")]
    fields: Vec<String>,
    /// Stop after this many results
    #[arg(long)]
    max_items: Option<usize>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("boxmeta started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("boxmeta").join("boxmeta.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".boxmeta").join("boxmeta.log");
    }
    PathBuf::from("boxmeta.log")
}

fn parse_param(raw: &str) -> std::result::Result<(String, Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))?;
    let name = name.trim().trim_start_matches(':');
    if name.is_empty() {
        return Err("parameter name must not be empty".to_string());
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((name.to_string(), value))
}

fn parse_order_by(raw: &str) -> std::result::Result<(String, Direction), String> {
    match raw.rsplit_once(':') {
        Some((key, direction)) if !key.is_empty() => Ok((key.to_string(), direction.parse()?)),
        _ => Ok((raw.to_string(), Direction::Asc)),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    if let Command::Config(cmd) = args.command {
        return run_config(cmd);
    }

    let config = Config::load();
    let credentials = Credentials::resolve(args.token.as_deref(), config.access_token.as_deref())
        .context("Failed to resolve credentials")?;
    let base_url = args
        .base_url
        .clone()
        .unwrap_or_else(|| config.effective_base_url());
    let client = BoxClient::with_base_url(credentials, &base_url)
        .context("Failed to create API client")?;

    tracing::info!("Using API root: {}", client.base_url());

    match args.command {
        Command::Template(cmd) => run_template(&client, &config, cmd).await,
        Command::Metadata(cmd) => run_metadata(&client, &config, cmd).await,
        Command::Query(query_args) => run_query(&client, query_args).await,
        Command::Config(cmd) => run_config(cmd),
    }
}

fn run_config(cmd: ConfigCommand) -> Result<()> {
    let mut config = Config::load();

    match cmd {
        ConfigCommand::Show => return print_json(&config.redacted()),
        ConfigCommand::Set { key, value } => config.set(&key, &value)?,
        ConfigCommand::Unset { key } => config.unset(&key)?,
    }

    config.save().context("Failed to save configuration")?;
    if let Some(path) = Config::config_path() {
        tracing::info!("Saved configuration to {:?}", path);
        eprintln!("Saved {:?}", path);
    }
    Ok(())
}

async fn run_template(client: &BoxClient, config: &Config, cmd: TemplateCommand) -> Result<()> {
    let scope_or_default = |scope: Option<String>| scope.unwrap_or_else(|| config.effective_scope());

    match cmd {
        TemplateCommand::Get {
            template_key,
            scope,
        } => {
            let scope = scope_or_default(scope);
            let template = template::get_metadata_template(client, &template_key, Some(&scope))
                .await
                .with_context(|| format!("Failed to get template {}/{}", scope, template_key))?;
            print_json(&template)
        }
        TemplateCommand::GetId { id } => {
            let template = template::get_metadata_template_by_id(client, &id)
                .await
                .with_context(|| format!("Failed to get template {}", id))?;
            print_json(&template)
        }
        TemplateCommand::Create {
            template_key,
            display_name,
            scope,
            hidden,
            fields_file,
        } => {
            let fields: Vec<Field> = match fields_file {
                Some(path) => read_json(&path)?,
                None => Vec::new(),
            };
            let scope = scope_or_default(scope);
            let template = template::create_metadata_template(
                client,
                &scope,
                &template_key,
                &display_name,
                hidden,
                &fields,
            )
            .await
            .with_context(|| format!("Failed to create template {}/{}", scope, template_key))?;
            print_json(&template)
        }
        TemplateCommand::Update {
            template_key,
            scope,
            operations_file,
        } => {
            let operations: Vec<FieldOperation> = read_json(&operations_file)?;
            let scope = scope_or_default(scope);
            let template =
                template::update_metadata_template(client, &scope, &template_key, &operations)
                    .await
                    .with_context(|| {
                        format!("Failed to update template {}/{}", scope, template_key)
                    })?;
            print_json(&template)
        }
        TemplateCommand::Delete {
            template_key,
            scope,
        } => {
            let scope = scope_or_default(scope);
            template::delete_metadata_template(client, &scope, &template_key)
                .await
                .with_context(|| format!("Failed to delete template {}/{}", scope, template_key))?;
            eprintln!("Deleted {}/{}", scope, template_key);
            Ok(())
        }
        TemplateCommand::List { scope, limit } => {
            let scope = scope_or_default(scope);
            let mut templates = template::list_templates(client, &scope, limit)
                .await
                .with_context(|| format!("Failed to list templates in {}", scope))?;
            while let Some(template) = templates.next().await {
                println!("{}", serde_json::to_string(&template?)?);
            }
            Ok(())
        }
    }
}

async fn run_metadata(client: &BoxClient, config: &Config, cmd: MetadataCommand) -> Result<()> {
    match cmd {
        MetadataCommand::Get {
            kind,
            item_id,
            template,
            scope,
        } => {
            let scope = scope.unwrap_or_else(|| config.effective_scope());
            let metadata = instance::get_metadata(client, kind, &item_id, &template, &scope)
                .await
                .with_context(|| format!("Failed to get {} metadata on {} {}", template, kind, item_id))?;
            print_json(&metadata)
        }
        MetadataCommand::All {
            kind,
            item_id,
            fields,
        } => {
            let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
            let mut all = instance::get_all_metadata(client, kind, &item_id, &fields)
                .await
                .with_context(|| format!("Failed to list metadata on {} {}", kind, item_id))?;
            while let Some(metadata) = all.next().await {
                println!("{}", serde_json::to_string(&metadata?)?);
            }
            Ok(())
        }
    }
}

async fn run_query(client: &BoxClient, args: QueryArgs) -> Result<()> {
    let mut metadata_query =
        MetadataQuery::new(&args.from, &args.query, &args.ancestor_folder_id).limit(args.limit);
    for (name, value) in args.params {
        metadata_query = metadata_query.query_param(&name, value);
    }
    if let Some(index_name) = &args.index_name {
        metadata_query = metadata_query.index_name(index_name);
    }
    for (field_key, direction) in &args.order_by {
        metadata_query = metadata_query.order_by(field_key, *direction);
    }
    if let Some(marker) = &args.marker {
        metadata_query = metadata_query.marker(marker);
    }
    metadata_query = metadata_query.fields(&args.fields);

    let mut results = query::execute_query(client, metadata_query)
        .await
        .context("Failed to execute metadata query")?;

    let mut printed = 0usize;
    while args.max_items.map_or(true, |max| printed < max) {
        let Some(item) = results.next().await else {
            break;
        };
        println!("{}", serde_json::to_string(&item?)?);
        printed += 1;
    }

    tracing::info!("Printed {} item(s)", printed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("arg=Templ Name").unwrap(),
            ("arg".to_string(), Value::String("Templ Name".to_string()))
        );
        assert_eq!(
            parse_param(":amount=100").unwrap(),
            ("amount".to_string(), serde_json::json!(100))
        );
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=x").is_err());
    }

    #[test]
    fn test_parse_order_by() {
        assert_eq!(
            parse_order_by("amount:desc").unwrap(),
            ("amount".to_string(), Direction::Desc)
        );
        assert_eq!(
            parse_order_by("amount").unwrap(),
            ("amount".to_string(), Direction::Asc)
        );
        assert!(parse_order_by("amount:sideways").is_err());
    }

    #[test]
    fn test_cli_parses_query_command() {
        let args = Args::try_parse_from([
            "boxmeta",
            "query",
            "--from",
            "enterprise_67890.relayWorkflowInformation",
            "--ancestor-folder-id",
            "0",
            "--query",
            "templateName >= :arg",
            "--param",
            "arg=Templ Name",
            "--limit",
            "2",
        ])
        .unwrap();

        match args.command {
            Command::Query(q) => {
                assert_eq!(q.limit, 2);
                assert_eq!(q.params.len(), 1);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_query_requires_expression() {
        let result = Args::try_parse_from([
            "boxmeta",
            "query",
            "--from",
            "enterprise_67890.catalogImages",
            "--ancestor-folder-id",
            "0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parses_config_set() {
        let args =
            Args::try_parse_from(["boxmeta", "config", "set", "default_scope", "enterprise_67890"])
                .unwrap();
        match args.command {
            Command::Config(ConfigCommand::Set { key, value }) => {
                assert_eq!(key, "default_scope");
                assert_eq!(value, "enterprise_67890");
            }
            other => panic!("unexpected command {:?}", other),
        }

        let args = Args::try_parse_from(["boxmeta", "config", "show"]).unwrap();
        assert!(matches!(args.command, Command::Config(ConfigCommand::Show)));
    }

    #[test]
    fn test_cli_parses_metadata_kind() {
        let args = Args::try_parse_from(["boxmeta", "metadata", "all", "file", "12345"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Metadata(MetadataCommand::All {
                kind: ItemKind::File,
                ..
            })
        ));
    }
}
