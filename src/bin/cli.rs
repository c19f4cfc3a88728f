use clap::{Parser, Subcommand};
use gl_mcp::{
    config::Settings,
    mcp::roles::parse_role_list,
    providers::register_all_providers,
    AppState,
};

#[derive(Parser)]
#[command(name = "gl-mcp-cli")]
#[command(about = "Inspect the GL MCP gateway configuration", long_about = None)]
struct Cli {
    /// Comma-separated roles to initialize providers with (defaults to PROVIDER_ROLES)
    #[arg(short, long, global = true)]
    roles: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize providers and print their availability
    Providers,

    /// Print the tools that would be exposed
    Tools {
        /// Include tool descriptions
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let settings = Settings::from_env()?;
    let roles = cli
        .roles
        .as_deref()
        .map(parse_role_list)
        .or_else(|| settings.provider_roles.clone());

    let state = AppState::from_settings(settings)?;
    register_all_providers(&state.providers, &state.settings);
    let results = state.providers.initialize_all(roles.as_deref()).await;

    match cli.command {
        Commands::Providers => {
            if results.is_empty() {
                println!("No providers registered.");
                return Ok(());
            }

            println!("{:<20} {:<12} {}", "Provider", "Status", "Required role");
            println!("{}", "-".repeat(50));
            for (name, available) in &results {
                let required_role = state
                    .providers
                    .get_provider(name)
                    .and_then(|p| p.required_role().map(str::to_string))
                    .unwrap_or_else(|| "-".to_string());
                let status = if *available { "available" } else { "unavailable" };
                println!("{:<20} {:<12} {}", name, status, required_role);
            }
        }
        Commands::Tools { verbose } => {
            let tools = state.tools.list_for(roles.as_deref());
            if tools.is_empty() {
                println!("No tools available.");
                return Ok(());
            }

            println!("Total: {} tools", tools.len());
            for tool in tools {
                if verbose {
                    println!("{}\n    {}", tool.name, tool.description);
                } else {
                    println!("{}", tool.name);
                }
            }
        }
    }

    Ok(())
}
