use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use remedy_rs::remedy::condition::{compile, validate_rql, RQL_SYNTAX_HELP};
use remedy_rs::remedy::config::{Builder, RemedyLoader};
use remedy_rs::remedy::TriggerOutcome;

/// Environment variable naming the default configuration file
const CONFIG_ENV: &str = "REMEDY_CONFIG";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate an RQL query and list its conditions
    Validate {
        /// The query to validate
        #[arg(short, long)]
        query: String,
    },
    /// Print the canonical form of an RQL query
    Compile {
        /// The query to normalize
        #[arg(short, long)]
        query: String,
    },
    /// Print the RQL syntax guide
    Syntax,
    /// Load a configuration file and validate every rule
    Check {
        /// Path to the configuration file (defaults to $REMEDY_CONFIG)
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Replay newline-delimited JSON events through the engine
    Run {
        /// Path to the configuration file (defaults to $REMEDY_CONFIG)
        #[arg(short, long)]
        config: Option<String>,

        /// Path to the events file
        #[arg(short, long)]
        events: String,
    },
}

fn config_path(arg: Option<String>) -> anyhow::Result<String> {
    match arg.or_else(|| std::env::var(CONFIG_ENV).ok()) {
        Some(path) => Ok(path),
        None => bail!("No configuration file given; pass --config or set {}", CONFIG_ENV),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Validate { query } => {
            let result = validate_rql(&query);
            if result.valid() {
                println!("Valid query");
            } else {
                println!("Invalid query");
            }
            for condition in result.conditions() {
                println!(
                    "  condition: {} {} \"{}\"",
                    condition.field, condition.operator, condition.value
                );
            }
            if !result.logic.is_empty() {
                let logic: Vec<String> = result.logic.iter().map(|op| op.to_string()).collect();
                println!("  logic: {}", logic.join(", "));
            }
            for error in &result.errors {
                println!("  error: {}", error);
            }
            if !result.valid() {
                std::process::exit(1);
            }
        }
        Commands::Compile { query } => {
            let root = validate_rql(&query).into_result()?;
            println!("{}", compile(&root));
        }
        Commands::Syntax => {
            println!("{}", RQL_SYNTAX_HELP);
        }
        Commands::Check { config } => {
            let path = config_path(config)?;
            let builder = Builder::from_file(&path)
                .with_context(|| format!("Failed to load configuration '{}'", path))?;
            let engine = builder.build().await?;

            for rule in engine.rules().await {
                println!(
                    "{:<24} {:<10} {:<17} {}",
                    rule.id,
                    format!("{:?}", rule.definition.priority).to_lowercase(),
                    rule.status(),
                    rule.definition.name
                );
            }
            println!("Configuration '{}' is valid", path);
        }
        Commands::Run { config, events } => {
            let path = config_path(config)?;
            let engine = Builder::from_file(&path)
                .with_context(|| format!("Failed to load configuration '{}'", path))?
                .build()
                .await?;
            let events = RemedyLoader::new()
                .load_events(&events)
                .with_context(|| format!("Failed to read events '{}'", events))?;

            log::info!("Replaying {} events", events.len());
            for (idx, event) in events.iter().enumerate() {
                for trigger in engine.handle_event(event).await {
                    let summary = match &trigger.outcome {
                        TriggerOutcome::NotMatched | TriggerOutcome::Disabled => continue,
                        TriggerOutcome::Inert(status) => format!("inert ({})", status),
                        TriggerOutcome::Silenced { until } => format!("silenced until {}", until),
                        TriggerOutcome::Fired(execution) => {
                            let verification = execution
                                .verification
                                .as_ref()
                                .map(|v| format!(", verification {:?}", v.status))
                                .unwrap_or_default();
                            format!(
                                "fired: remediation {:?} steps {:?}{}",
                                execution.remediation.status,
                                execution.remediation.executed_steps(),
                                verification
                            )
                        }
                    };
                    println!("event {} -> rule {}: {}", idx + 1, trigger.rule_id, summary);
                }
            }
        }
    }

    Ok(())
}
