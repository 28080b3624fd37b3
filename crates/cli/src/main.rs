use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use lakescope_api::MockApi;
use lakescope_core::columns::render_table;
use lakescope_core::prelude::*;
use lakescope_picker::{render_text, MillerColumns, PickerConfig};
use lakescope_plugins::blueprint::{blueprint_connection_columns, Blueprint};
use lakescope_plugins::{builtin_registry, initial_values, validate_connection, FieldIssue, FieldSpec, PluginConfig, PluginKey};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "lakescopectl", version, about = "lakescope CLI")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the scope picker against a JSON fixture and print its columns
    Browse {
        /// Fixture file: {"connections": {"conn-1": [nodes...]}}
        fixture: PathBuf,
        /// Connection id inside the fixture
        #[arg(long = "connection", default_value = "conn-1")]
        connection: String,
        /// Open these expandable nodes, one column deeper each
        #[arg(long = "drill", value_delimiter = ',')]
        drill: Vec<ScopeId>,
        /// Click these leaves after loading
        #[arg(long = "select", value_delimiter = ',')]
        select: Vec<ScopeId>,
        /// Ids handed in as already used elsewhere
        #[arg(long = "disable", value_delimiter = ',')]
        disable: Vec<ScopeId>,
        /// Ids selected before any node is loaded
        #[arg(long = "preselect", value_delimiter = ',')]
        preselect: Vec<ScopeId>,
        /// Root pages to load before drilling
        #[arg(long = "pages", default_value_t = 1)]
        pages: usize,
    },
    /// List built-in data source plugins
    Plugins,
    /// Show the connection form of a plugin
    Fields {
        /// Plugin key, e.g. "tapd"
        plugin: String,
    },
    /// Check connection values against a plugin's form
    Validate {
        plugin: String,
        /// JSON object of field values
        #[arg(long = "values")]
        values: PathBuf,
    },
    /// Render the data connections table of a blueprint file
    Blueprint {
        file: PathBuf,
    },
}

/// Logs go to stderr so `-o json` output stays parseable.
fn init_tracing() {
    let directives = std::env::var("LAKESCOPE_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&directives)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

/// Picker counters are exported only when `LAKESCOPE_METRICS_ADDR` names a socket.
fn init_metrics() {
    let Ok(addr) = std::env::var("LAKESCOPE_METRICS_ADDR") else { return };
    let sock = match addr.parse::<std::net::SocketAddr>() {
        Ok(sock) => sock,
        Err(e) => {
            warn!(addr = %addr, error = %e, "cli: LAKESCOPE_METRICS_ADDR is not host:port, metrics off");
            return;
        }
    };
    match metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(sock).install() {
        Ok(_) => info!(addr = %sock, "cli: picker metrics exported"),
        Err(e) => warn!(addr = %sock, error = %e, "cli: metrics exporter not installed"),
    }
}

/// Minimal item for an id the caller only knows by key.
fn placeholder(conn: &ConnectionId, id: &ScopeId) -> ScopeItem {
    ScopeItem {
        connection_id: conn.clone(),
        board_id: id.clone(),
        name: id.to_string(),
        self_url: String::new(),
        kind: String::new(),
        project_id: None,
    }
}

fn plugin_config(key: &str) -> Result<&'static PluginConfig> {
    let key = PluginKey::from_str(key)?;
    builtin_registry().get(key).ok_or_else(|| anyhow!("plugin {} is not registered", key))
}

fn plugin_columns() -> Vec<ColumnDef<PluginConfig>> {
    vec![
        ColumnDef::new("plugin", "Plugin", 10).index(&["plugin"]),
        ColumnDef::new("name", "Name", 12).index(&["name"]),
        ColumnDef::new("type", "Type", 10).index(&["type"]),
        ColumnDef::new("beta", "Beta", 4)
            .align(Align::Center)
            .render(|p: &PluginConfig| if p.is_beta { "yes".into() } else { String::new() }),
        ColumnDef::new("entities", "Entities", 24).index(&["entities"]),
    ]
}

fn field_columns() -> Vec<ColumnDef<FieldSpec>> {
    vec![
        ColumnDef::new("key", "Key", 18).index(&["key"]),
        ColumnDef::new("label", "Label", 22).index(&["label"]),
        ColumnDef::new("type", "Type", 10).index(&["type"]),
        ColumnDef::new("required", "Req", 3)
            .align(Align::Center)
            .render(|f: &FieldSpec| if f.required { "*".into() } else { String::new() }),
        ColumnDef::new("placeholder", "Placeholder", 40).index(&["placeholder"]),
    ]
}

fn issue_columns() -> Vec<ColumnDef<FieldIssue>> {
    vec![
        ColumnDef::new("key", "Field", 18).index(&["key"]),
        ColumnDef::new("error", "Problem", 36).index(&["error"]),
        ColumnDef::new("hint", "Hint", 40).index(&["hint"]),
    ]
}

struct BrowseArgs {
    fixture: PathBuf,
    connection: String,
    drill: Vec<ScopeId>,
    select: Vec<ScopeId>,
    disable: Vec<ScopeId>,
    preselect: Vec<ScopeId>,
    pages: usize,
}

async fn browse(args: BrowseArgs, output: Output) -> Result<()> {
    let api = Arc::new(MockApi::load(&args.fixture)?);
    let cfg = PickerConfig::from_env();
    info!(fixture = %args.fixture.display(), page_size = cfg.page_size, "cli: browse");
    let conn = ConnectionId::new(args.connection);
    let mut picker = MillerColumns::new(api, cfg)
        .on_change_items(|items| info!(emitted = items.len(), "cli: browse selection changed"));

    if !args.disable.is_empty() {
        let items: Vec<ScopeItem> = args.disable.iter().map(|id| placeholder(&conn, id)).collect();
        picker.set_disabled_items(Some(items.as_slice()));
    }
    if !args.preselect.is_empty() {
        let items: Vec<ScopeItem> = args.preselect.iter().map(|id| placeholder(&conn, id)).collect();
        picker.set_selected_items(Some(items.as_slice()));
    }

    picker.set_connection(conn.clone());
    picker.settle().await;
    for _ in 1..args.pages.max(1) {
        if !picker.load_more(0) {
            break;
        }
        picker.settle().await;
    }
    for id in args.drill.iter() {
        let column = picker.source().column_count() - 1;
        picker.click(column, id).with_context(|| format!("drilling into {}", id))?;
        picker.settle().await;
    }
    for id in args.select.iter() {
        let column = (0..picker.source().column_count())
            .find(|c| picker.source().node(*c, id).is_some())
            .ok_or_else(|| anyhow!("node {} is not loaded in any open column", id))?;
        picker.click(column, id).with_context(|| format!("selecting {}", id))?;
    }

    let view = picker.view();
    match output {
        Output::Human => {
            print!("{}", render_text(&view));
            println!("selected ids: {}", picker.selection().selected_ids().iter().map(|i| i.to_string()).collect::<Vec<_>>().join(", "));
            for item in view.selected.iter() {
                println!("  {} • {} • {}", item.connection_id, item.board_id, item.name);
            }
        }
        Output::Json => println!("{}", serde_json::to_string_pretty(&view)?),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    match cli.command {
        Commands::Browse { fixture, connection, drill, select, disable, preselect, pages } => {
            browse(BrowseArgs { fixture, connection, drill, select, disable, preselect, pages }, cli.output).await?;
        }
        Commands::Plugins => {
            let rows: Vec<PluginConfig> = builtin_registry().iter().cloned().collect();
            match cli.output {
                Output::Human => print!("{}", render_table(&plugin_columns(), &rows)),
                Output::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
            }
        }
        Commands::Fields { plugin } => {
            let cfg = plugin_config(&plugin)?;
            match cli.output {
                Output::Human => {
                    print!("{}", render_table(&field_columns(), &cfg.connection.fields));
                    println!("initial values: {}", serde_json::Value::Object(initial_values(cfg)));
                }
                Output::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "fields": cfg.connection.fields,
                        "initialValues": initial_values(cfg),
                    }))?
                ),
            }
        }
        Commands::Validate { plugin, values } => {
            let cfg = plugin_config(&plugin)?;
            let raw = std::fs::read(&values).with_context(|| format!("reading {}", values.display()))?;
            let values: serde_json::Value = serde_json::from_slice(&raw).context("parsing values")?;
            let issues = validate_connection(cfg, &values);
            match cli.output {
                Output::Human if issues.is_empty() => println!("{}: ok", cfg.name),
                Output::Human => print!("{}", render_table(&issue_columns(), &issues)),
                Output::Json => println!("{}", serde_json::to_string_pretty(&issues)?),
            }
            if !issues.is_empty() {
                bail!("{} issue(s) in {} connection values", issues.len(), cfg.name);
            }
        }
        Commands::Blueprint { file } => {
            let bp = Blueprint::load(&file)?;
            info!(name = %bp.name, connections = bp.connections.len(), "cli: blueprint loaded");
            match cli.output {
                Output::Human => {
                    println!("{}", bp.name);
                    print!("{}", render_table(&blueprint_connection_columns(), &bp.connections));
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&bp)?),
            }
        }
    }
    Ok(())
}
