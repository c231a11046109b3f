//! sitegraph - builds the content graph of a site and exposes it through
//! GraphQL and a generated route manifest.

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde_json::Value;
use sitegraph::{
    App,
    cli::{Cli, Commands},
    config::AppConfig,
    logger,
    plugins::{ConfigPagesPlugin, JsonSourcePlugin},
};
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    logger::set_quiet(config.build.quiet);

    let mut app = App::new(config.clone());
    app.use_plugin(JsonSourcePlugin::new(config.source.dir.clone()))?
        .use_plugin(ConfigPagesPlugin::new(config.pages.clone()))?;
    app.bootstrap().await?;

    match &cli.command {
        Commands::Routes => {
            app.write_routes()?;
        }
        Commands::Schema => {
            let schema = app.schema().context("Schema was not compiled")?;
            print!("{}", schema.sdl());
        }
        Commands::Query { doc, variables } => {
            let variables = match variables {
                Some(text) => serde_json::from_str(text).context("--variables must be valid JSON")?,
                None => Value::Object(Default::default()),
            };
            let response = app.graphql(doc, variables).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            if !response.is_ok() {
                bail!("Query returned {} errors", response.messages().len());
            }
        }
    }

    Ok(())
}

/// Load and validate configuration from CLI arguments
fn load_config(cli: &Cli) -> Result<AppConfig> {
    let root = cli.root.as_deref().unwrap_or(Path::new("./"));
    let config_path = root.join(&cli.config);

    let mut config = if config_path.exists() {
        AppConfig::from_path(&config_path)?
    } else {
        AppConfig::default()
    };
    config.update_with_cli(cli);
    config.validate()?;

    Ok(config)
}
