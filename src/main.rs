use clap::{Args, Parser, Subcommand};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use metamorph::config::Settings;
use metamorph::core::db::{self, AnyStore, Project, ProjectQuery, ProjectStore};
use metamorph::core::export::{self, ExportFormat};
use metamorph::core::map::{HttpMapProvider, MapGate, MapStatus, StaticMapProvider};
use metamorph::core::metrics::{self, ImpactReport};
use metamorph::core::region::MIN_REGION_POINTS;
use metamorph::core::terrain::DEFAULT_GRID_SIZE;
use metamorph::{
    Coordinate, MockGenerator, Priority, RandomTerrain, Scenario, ScenarioStatus, TerrainRecord,
    TerrainStats, Wizard, server, telemetry,
};

#[derive(Parser)]
#[command(name = "metamorph")]
#[command(about = "Plan urban green zones and manage saved projects")]
struct Cli {
    /// TOML settings file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Base URL of a remote project store
    #[arg(long, value_name = "URL", global = true)]
    store_url: Option<String>,

    /// Local SQLite project database
    #[arg(long, value_name = "FILE", global = true)]
    database: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the project API over the configured store
    Serve {
        #[arg(long, value_name = "ADDR")]
        bind: Option<SocketAddr>,
    },
    /// Run the analysis wizard for one region
    Plan(PlanArgs),
    /// List saved projects, newest first
    List {
        /// Only names containing this text
        #[arg(long)]
        query: Option<String>,
        /// Only regions containing this text
        #[arg(long)]
        region: Option<String>,
        #[arg(long, value_enum)]
        status: Option<ScenarioStatus>,
    },
    /// Show one project and its impact report
    Show { id: Uuid },
    /// Mark a draft project as completed
    Approve { id: Uuid },
    /// Mark a draft project as shared and print its summary
    Share { id: Uuid },
    /// Delete a project
    Delete { id: Uuid },
    /// Export a project as JSON or GeoJSON
    Export {
        id: Uuid,
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        /// Write into this directory instead of stdout
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
    },
}

#[derive(Args)]
struct PlanArgs {
    /// Region name
    #[arg(long)]
    name: String,

    /// Polygon vertex as `lat,lng`; repeat at least three times
    #[arg(long = "point", value_name = "LAT,LNG", required = true)]
    points: Vec<Coordinate>,

    /// Green space target in percent (10-50)
    #[arg(long)]
    target: Option<u8>,

    #[arg(long, value_enum)]
    priority: Option<Priority>,

    /// Seed for reproducible terrain and scenarios
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value = "")]
    author: String,

    /// Comment to attach to the scenario
    #[arg(long)]
    comment: Option<String>,

    /// Save the finished scenario to the project store
    #[arg(long)]
    save: bool,

    /// Write the scenario as JSON into this directory
    #[arg(long, value_name = "DIR")]
    export: Option<PathBuf>,

    /// Print the share summary
    #[arg(long)]
    share: bool,
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(url) = &cli.store_url {
        settings.store.url = Some(url.clone());
    } else if let Some(database) = &cli.database {
        settings.store.url = None;
        settings.store.database = Some(database.clone());
    }
    if cli.verbose {
        settings.log.filter = "debug".to_string();
    }
    Ok(settings)
}

async fn wait_for_map(settings: &Settings) -> anyhow::Result<()> {
    let mut gate = MapGate::new(settings.map_timeout());
    let status = match &settings.map.provider_url {
        Some(url) => gate.wait(&HttpMapProvider::new(url.clone())).await,
        None => gate.wait(&StaticMapProvider).await,
    };
    if let MapStatus::Failed(err) = status {
        anyhow::bail!("{}", err);
    }
    Ok(())
}

fn print_terrain(terrain: &TerrainRecord) {
    println!("\n=== Terrain ===");
    println!("Elevation: {:.1} m", terrain.elevation);
    println!("Slope: {:.1}°", terrain.slope);
    println!("Soil: {}", terrain.soil_type);
    println!("Water: {}", if terrain.water_presence { "present" } else { "absent" });
    let suits: Vec<_> = terrain.suitable_zones().iter().map(|z| z.as_str()).collect();
    if !suits.is_empty() {
        println!("Suits: {}", suits.join(", "));
    }
}

fn print_terrain_stats(stats: &TerrainStats) {
    println!("Grid samples: {}", stats.samples);
    println!(
        "  mean elevation {:.1} m, mean slope {:.1}°, water {:.1}%",
        stats.mean_elevation, stats.mean_slope, stats.water_coverage
    );
    let soils: Vec<String> = stats
        .soil_distribution
        .iter()
        .map(|(soil, pct)| format!("{} {:.0}%", soil, pct))
        .collect();
    if !soils.is_empty() {
        println!("  soils: {}", soils.join(", "));
    }
}

fn print_scenario(scenario: &Scenario) {
    println!("\n=== {} ===", scenario.name);
    println!("Status: {}", scenario.status);
    println!("Coverage: {}%", scenario.coverage_percent);
    println!("Sustainability: {}", scenario.sustainability_score);
    println!("Accessibility: {}", scenario.accessibility_score);
    println!("Population served: {}", scenario.population_served);
    println!("\nGreen zones ({}):", scenario.zone_count());
    for zone in &scenario.green_zones {
        println!("  {} [{}] {:.0} m2", zone.name, zone.zone_type, zone.area);
    }
    if !scenario.comments.is_empty() {
        println!("\nComments:");
        for comment in &scenario.comments {
            println!("  {}: {}", comment.author, comment.text);
        }
    }
}

fn print_report(report: &ImpactReport) {
    println!("\n=== Impact ===");
    println!("Total green area: {:.0} m2", report.total_green_area);
    println!("Geometric coverage: {:.1}%", report.geometric_coverage);
    println!("Zone diversity: {:.1}", report.zone_diversity);
    println!("Environmental score: {:.1}", report.environmental.score());
    println!(
        "  air quality {:.1}, carbon {:.1}, biodiversity {:.1}",
        report.environmental.air_quality,
        report.environmental.carbon_sequestration,
        report.environmental.biodiversity
    );
    println!(
        "  water {:.1}, heat island {:.1}, noise {:.1}",
        report.environmental.water_management,
        report.environmental.heat_island_reduction,
        report.environmental.noise_reduction
    );
    println!("Social score: {:.1}", report.social.score());
    println!(
        "  access {:.1}, recreation {:.1}, health {:.1}, cohesion {:.1}",
        report.social.community_access,
        report.social.recreation,
        report.social.health_benefits,
        report.social.social_cohesion
    );
    println!(
        "  property value {:.1}, equity {:.1}",
        report.social.property_value_impact, report.social.equity_distribution
    );
    println!("\nRecommendations:");
    for line in report
        .recommendations
        .iter()
        .chain(&report.environmental_recommendations)
    {
        println!("  - {}", line);
    }
    println!("\nCommunity benefits:");
    for line in &report.community_benefits {
        println!("  - {}", line);
    }
}

fn print_project_line(project: &Project) -> anyhow::Result<()> {
    println!(
        "{}  {:<9}  {}  {}  ({})",
        project.id,
        project.status,
        project.created_date.format(&Rfc3339)?,
        project.name,
        project.region_label
    );
    Ok(())
}

async fn plan(settings: &Settings, args: PlanArgs) -> anyhow::Result<()> {
    wait_for_map(settings).await?;

    let mut analysis = settings.analysis_settings();
    if let Some(target) = args.target {
        analysis.target_percent = target;
    }
    if let Some(priority) = args.priority {
        analysis.priority = priority;
    }
    let (terrain_source, generator) = match args.seed {
        Some(seed) => (RandomTerrain::seeded(seed), MockGenerator::seeded(seed)),
        None => (RandomTerrain::new(), MockGenerator::new()),
    };

    let mut wizard = Wizard::new(analysis);
    println!("{}", wizard.step());
    wizard.start_drawing();
    for point in &args.points {
        wizard.add_point(*point);
    }
    if !wizard.finish_drawing() {
        anyhow::bail!("A region needs at least {} points", MIN_REGION_POINTS);
    }
    wizard.set_name(args.name.as_str());
    anyhow::ensure!(wizard.next(), "The region needs a name");

    println!("{}", wizard.step());
    wizard.import_terrain(&terrain_source).await?;
    if let Some(terrain) = wizard.terrain() {
        print_terrain(terrain);
    }
    if let Some(region) = wizard.region() {
        let samples = terrain_source.sample_grid(region, DEFAULT_GRID_SIZE);
        print_terrain_stats(&TerrainStats::of(&samples));
    }
    wizard.next();

    println!("\n{}", wizard.step());
    let mut updates = wizard.progress_updates();
    let printer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let pct = *updates.borrow_and_update();
            if pct > 0 {
                println!("  processing... {}%", pct);
            }
            if pct >= 100 {
                break;
            }
        }
    });
    match wizard.run_analysis(&generator).await {
        Ok(true) => {
            let _ = printer.await;
        }
        other => {
            printer.abort();
            other?;
            anyhow::bail!("Analysis could not start");
        }
    }
    wizard.next();

    println!("\n{}", wizard.step());
    if let Some(scenario) = wizard.scenario() {
        print_scenario(scenario);
        print_report(&metrics::assess(scenario));
    }
    wizard.next();

    println!("\n{}", wizard.step());
    if let Some(text) = &args.comment {
        wizard.add_comment(&args.author, text);
    }
    if let Some(scenario) = wizard.scenario() {
        if let Some(dir) = &args.export {
            let path = export::write_json(dir, &scenario.name, scenario)?;
            println!("Exported to {:?}", path);
        }
        if args.share {
            println!("{}", export::share_text(scenario)?);
        }
    }

    if args.save {
        let store = settings.open_store().await?;
        match wizard.save(&store).await {
            Ok(project) => println!("Saved project {}", project.id),
            Err(err) => {
                let message = err.to_string();
                let session = err.into_session();
                if let (Some(scenario), None) = (session.scenario(), &args.export) {
                    eprintln!("Scenario kept:\n{}", export::to_pretty_json(scenario)?);
                }
                anyhow::bail!(message);
            }
        }
    }
    Ok(())
}

async fn serve(settings: &Settings, bind: Option<SocketAddr>) -> anyhow::Result<()> {
    let store = Arc::new(settings.open_store().await?);
    let addr = bind.unwrap_or(settings.server.bind);
    let (bound, server) = server::serve(store.clone(), addr, async {
        let _ = tokio::signal::ctrl_c().await;
    })?;
    println!("Listening on http://{}", bound);
    server.await;
    if let AnyStore::Local(db) = store.as_ref() {
        db.close().await?;
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = load_settings(&cli)?;
    telemetry::init(&settings.log);

    match cli.command {
        Command::Serve { bind } => serve(&settings, bind).await,
        Command::Plan(args) => plan(&settings, args).await,
        Command::List {
            query,
            region,
            status,
        } => {
            let store = settings.open_store().await?;
            let filter = ProjectQuery {
                query,
                region,
                status,
            };
            let projects = if filter.is_empty() {
                store.list_projects().await?
            } else {
                store.search_projects(&filter).await?
            };
            if projects.is_empty() {
                println!("No saved projects.");
            }
            for project in &projects {
                print_project_line(project)?;
            }
            Ok(())
        }
        Command::Show { id } => {
            let store = settings.open_store().await?;
            let project = store.get_project(id).await?;
            print_project_line(&project)?;
            print_scenario(&project.scenario);
            print_report(&metrics::assess(&project.scenario));
            Ok(())
        }
        Command::Approve { id } => {
            let store = settings.open_store().await?;
            let project = store.get_project(id).await?;
            let project = db::approve(&store, &project).await?;
            print_project_line(&project)
        }
        Command::Share { id } => {
            let store = settings.open_store().await?;
            let project = store.get_project(id).await?;
            let project = db::share(&store, &project).await?;
            print_project_line(&project)?;
            println!("{}", export::share_text(&project.scenario)?);
            Ok(())
        }
        Command::Delete { id } => {
            let store = settings.open_store().await?;
            store.delete_project(id).await?;
            println!("Deleted project {}", id);
            Ok(())
        }
        Command::Export { id, format, out } => {
            let store = settings.open_store().await?;
            let project = store.get_project(id).await?;
            match out {
                Some(dir) => {
                    let path = export::write_export(&dir, &project, format)?;
                    println!("Exported to {:?}", path);
                }
                None => println!(
                    "{}",
                    export::to_pretty_json(&export::render(&project, format)?)?
                ),
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}
