//! Shiptrack CLI - track shipments between geographic points.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use shiptrack_core::{
    CoordinateInput, LocationInput, NewShipment, Shipment, ShipmentFilter, ShipmentPatch,
    ShipmentStatus, SortField, SortOrder,
};
use shiptrack_manager::{BasicShipmentManager, ManagerConfig, ShipmentManager};
use shiptrack_progress::{EtaSummary, LocationUpdate, TrackingConfig};
use shiptrack_storage::JsonStorage;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shiptrack")]
#[command(about = "Track shipments between geographic points", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Storage path for shipment data
    #[arg(short, long, global = true, env = "SHIPTRACK_STORAGE", default_value = ".shiptrack")]
    storage: PathBuf,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Reports this close to the destination count as arrival (km)
    #[arg(long, global = true, env = "SHIPTRACK_ARRIVAL_RADIUS_KM", default_value_t = 5.0)]
    arrival_radius_km: f64,

    /// Speed assumed when projecting arrival times (km/h)
    #[arg(long, global = true, env = "SHIPTRACK_CRUISING_SPEED_KMH", default_value_t = 50.0)]
    cruising_speed_kmh: f64,

    /// Slowest speed used for remaining-time estimates (km/h)
    #[arg(long, global = true, env = "SHIPTRACK_MIN_SPEED_KMH", default_value_t = 20.0)]
    min_speed_kmh: f64,
}

impl Cli {
    fn tracking(&self) -> TrackingConfig {
        TrackingConfig {
            arrival_radius_km: self.arrival_radius_km,
            cruising_speed_kmh: self.cruising_speed_kmh,
            min_speed_kmh: self.min_speed_kmh,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new shipment
    Create {
        /// Container ID
        #[arg(long)]
        container: String,
        /// Cargo description
        #[arg(long)]
        cargo: String,
        /// Cargo weight
        #[arg(long)]
        weight: f64,
        /// Starting location name
        #[arg(long)]
        from_name: String,
        /// Starting latitude
        #[arg(long, allow_negative_numbers = true)]
        from_lat: f64,
        /// Starting longitude
        #[arg(long, allow_negative_numbers = true)]
        from_lon: f64,
        /// Destination name
        #[arg(long)]
        to_name: String,
        /// Destination latitude
        #[arg(long, allow_negative_numbers = true)]
        to_lat: f64,
        /// Destination longitude
        #[arg(long, allow_negative_numbers = true)]
        to_lon: f64,
    },
    /// List shipments
    List {
        /// Filter by status
        #[arg(long)]
        status: Option<ShipmentStatus>,
        /// Field to sort by
        #[arg(long, default_value = "created_at")]
        sort_by: SortField,
        /// Sort order (asc or desc)
        #[arg(long, default_value = "desc")]
        order: SortOrder,
    },
    /// Show shipment details
    Show {
        /// Shipment ID or record key
        id: String,
    },
    /// Report the current location of a shipment
    Report {
        /// Shipment ID or record key
        id: String,
        /// Location name
        #[arg(long)]
        name: String,
        /// Latitude
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        /// Longitude
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
    },
    /// Show arrival estimate and journey progress
    Eta {
        /// Shipment ID or record key
        id: String,
    },
    /// Force a shipment status
    SetStatus {
        /// Shipment ID or record key
        id: String,
        /// pending, in-transit, delayed or delivered
        status: String,
    },
    /// Edit shipment details
    Update {
        /// Shipment ID or record key
        id: String,
        /// New container ID
        #[arg(long)]
        container: Option<String>,
        /// New cargo description
        #[arg(long)]
        cargo: Option<String>,
        /// New cargo weight
        #[arg(long)]
        weight: Option<f64>,
        /// New destination name
        #[arg(long, requires_all = ["to_lat", "to_lon"])]
        to_name: Option<String>,
        /// New destination latitude
        #[arg(long, requires = "to_name", allow_negative_numbers = true)]
        to_lat: Option<f64>,
        /// New destination longitude
        #[arg(long, requires = "to_name", allow_negative_numbers = true)]
        to_lon: Option<f64>,
    },
    /// Delete a shipment
    Delete {
        /// Shipment ID or record key
        id: String,
    },
    /// Show storage health and shipment counts
    Status,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Logs go to stderr so JSON on stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let storage = JsonStorage::open(&cli.storage).await?;
    let manager = BasicShipmentManager::with_config(
        storage,
        ManagerConfig {
            tracking: cli.tracking(),
        },
    )?;
    debug!("Using storage at {}", cli.storage.display());

    let outcome = run(&manager, cli.command, cli.json).await;
    manager.close().await?;
    outcome
}

async fn run(
    manager: &BasicShipmentManager<JsonStorage>,
    command: Commands,
    json: bool,
) -> Result<()> {
    match command {
        Commands::Create {
            container,
            cargo,
            weight,
            from_name,
            from_lat,
            from_lon,
            to_name,
            to_lat,
            to_lon,
        } => {
            let shipment = manager
                .create(NewShipment {
                    container_id: container,
                    current_location: LocationInput::new(from_name, from_lat, from_lon),
                    destination: LocationInput::new(to_name, to_lat, to_lon),
                    cargo,
                    weight,
                })
                .await?;
            emit(json, &shipment, print_shipment)?;
        }
        Commands::List {
            status,
            sort_by,
            order,
        } => {
            let filter = ShipmentFilter {
                status,
                sort_by,
                order,
            };
            let shipments = manager.list(&filter).await?;
            emit(json, &shipments, print_shipment_list)?;
        }
        Commands::Show { id } => {
            let shipment = manager.get(&id).await?;
            emit(json, &shipment, print_shipment)?;
        }
        Commands::Report { id, name, lat, lon } => {
            let update = manager
                .report_location(&id, LocationInput::new(name, lat, lon))
                .await?;
            emit(json, &update, print_update)?;
        }
        Commands::Eta { id } => {
            let summary = manager.summarize(&id).await?;
            emit(json, &summary, print_summary)?;
        }
        Commands::SetStatus { id, status } => {
            let shipment = manager.set_status(&id, &status).await?;
            emit(json, &shipment, print_shipment)?;
        }
        Commands::Update {
            id,
            container,
            cargo,
            weight,
            to_name,
            to_lat,
            to_lon,
        } => {
            let patch = ShipmentPatch {
                container_id: container,
                cargo,
                weight,
                destination: to_name.map(|name| LocationInput {
                    name,
                    coordinates: Some(CoordinateInput {
                        latitude: to_lat,
                        longitude: to_lon,
                    }),
                }),
            };
            ensure_changes(&patch)?;
            let shipment = manager.update_details(&id, patch).await?;
            emit(json, &shipment, print_shipment)?;
        }
        Commands::Delete { id } => {
            let key = manager.delete(&id).await?;
            emit(json, &serde_json::json!({ "key": key }), |_| {
                println!("Deleted shipment {}", key)
            })?;
        }
        Commands::Status => {
            let healthy = manager.health_check().await;
            let counts = manager.status_counts().await?;
            let report = serde_json::json!({
                "storage": if healthy { "ok" } else { "unavailable" },
                "counts": counts
                    .iter()
                    .map(|(status, n)| (status.as_str(), *n))
                    .collect::<BTreeMap<_, _>>(),
            });
            emit(json, &report, |_| {
                println!("Shiptrack Status");
                println!("  Storage: {}", if healthy { "ok" } else { "unavailable" });
                for (status, count) in &counts {
                    println!("  {}: {}", format_status(*status), count);
                }
            })?;
        }
    }

    Ok(())
}

fn ensure_changes(patch: &ShipmentPatch) -> Result<()> {
    if patch.is_empty() {
        bail!("Nothing to update: pass --container, --cargo, --weight or --to-name");
    }
    Ok(())
}

/// Print `value` as pretty JSON, or hand it to a text printer.
fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text(value);
    }
    Ok(())
}

fn format_status(status: ShipmentStatus) -> &'static str {
    match status {
        ShipmentStatus::Pending => "⏳ Pending",
        ShipmentStatus::InTransit => "🚚 In transit",
        ShipmentStatus::Delayed => "⚠️ Delayed",
        ShipmentStatus::Delivered => "✅ Delivered",
    }
}

fn print_shipment(shipment: &Shipment) {
    println!("Shipment: {}", shipment.shipment_id);
    println!("  Key: {}", shipment.key);
    println!("  Container: {}", shipment.container_id);
    println!("  Cargo: {} ({})", shipment.cargo, shipment.weight);
    println!("  Status: {}", format_status(shipment.status));
    println!(
        "  Current: {} ({:.4}, {:.4})",
        shipment.current_location.name,
        shipment.current_location.coordinates.latitude,
        shipment.current_location.coordinates.longitude
    );
    println!(
        "  Destination: {} ({:.4}, {:.4})",
        shipment.destination.name,
        shipment.destination.coordinates.latitude,
        shipment.destination.coordinates.longitude
    );
    println!("  ETA: {}", shipment.estimated_arrival.to_rfc3339());
    println!("  Waypoints: {}", shipment.route.len());
    println!("  Updated: {}", shipment.updated_at.to_rfc3339());
}

fn print_shipment_list(shipments: &Vec<Shipment>) {
    if shipments.is_empty() {
        println!("No shipments found");
        return;
    }
    println!("Shipments ({}):", shipments.len());
    for s in shipments {
        println!(
            "  {} [{}] {} -> {} ({})",
            s.shipment_id,
            s.container_id,
            s.current_location.name,
            s.destination.name,
            format_status(s.status)
        );
    }
}

fn print_update(update: &LocationUpdate) {
    print_shipment(&update.shipment);
    println!("  Distance to destination: {:.2} km", update.distance_to_destination);
    println!("  Distance covered: {:.2} km", update.total_distance_covered);
    if update.at_destination {
        println!("  Arrived at destination");
    }
}

fn print_summary(summary: &EtaSummary) {
    println!("Arrival estimate: {}", summary.estimated_arrival.to_rfc3339());
    println!("  Status: {}", format_status(summary.status));
    println!("  Current: {}", summary.current_location.name);
    println!("  Destination: {}", summary.destination.name);
    println!("  Progress: {}%", summary.progress_percentage);
    println!(
        "  Distance: {:.2} km remaining of {:.2} km",
        summary.distance_remaining, summary.total_journey_distance
    );
    println!("  Covered: {:.2} km", summary.total_distance_covered);
    println!("  Average speed: {} km/h", summary.average_speed);
    println!("  Remaining: {} h", summary.estimated_remaining_hours);
}
