use checkin_atlas::{boundary, config, data, processing, render, server};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the check-in map image
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Serve the rendered map for viewing in a browser
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Render { config } => {
            println!("Rendering map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            // 1. Load check-ins and the boundary backdrop
            let checkins = data::load_checkins(&app_config.input.checkins)?;
            let source = boundary::BoundarySource::from_config(&app_config.boundary)?;
            let regions = source.load().await?;

            // 2. Load edges and keep only pairs where both users checked in
            let edges = data::load_edges(&app_config.input.edges)?;
            let users = processing::user_set(&checkins);
            let edges = processing::filter_edges(edges, &users);

            // 3. Resolve edge endpoints through the coordinate index
            let index = processing::coordinate_index(&checkins);

            // 4. Compose and write the figure
            let map = render::render_map(&app_config.render, &regions, &checkins, &edges, &index)?;
            render::write_map(&app_config.render, &map)?;

            println!("Render complete!");
        }
        Commands::Serve { config } => {
            println!("Serving map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;
            server::start_server(app_config).await?;
        }
    }

    Ok(())
}
