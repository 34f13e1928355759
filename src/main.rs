use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{ArgGroup, Parser, Subcommand};
use tracing::info;
use uuid::Uuid;

mod config;
mod db;
mod error;
mod finance;
mod models;
mod report;
mod solar;
mod telemetry;

use config::Config;
use models::{Coordinates, EnvironmentalConditions, FinancialParameters, Orientation, RoofProfile};

#[derive(Parser)]
#[command(name = "solar-audit")]
#[command(about = "Residential solar potential and ROI audits", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a demo property with conditions and financials
    Seed,
    /// Register a property and its roof profile
    AddProperty {
        #[arg(long)]
        address: String,
        #[arg(long, allow_hyphen_values = true)]
        latitude: f64,
        #[arg(long, allow_hyphen_values = true)]
        longitude: f64,
        #[arg(long)]
        timezone: String,
        /// Usable roof area in square meters
        #[arg(long)]
        roof_area: f64,
        /// Roof pitch in degrees
        #[arg(long)]
        tilt: f64,
        #[arg(long)]
        orientation: Orientation,
        /// Fraction of output lost to shade, 0 to 1
        #[arg(long, default_value_t = 0.0)]
        shading: f64,
    },
    /// Import properties from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Record a conditions snapshot for a property
    #[command(group(
        ArgGroup::new("sunlight")
            .args(["irradiance", "cloud_cover"])
            .multiple(true)
            .required(true)
    ))]
    RecordConditions {
        #[arg(long)]
        property_id: Uuid,
        /// Measured irradiance in W/m2
        #[arg(long)]
        irradiance: Option<f64>,
        /// Cloud cover percentage; irradiance is estimated when not measured
        #[arg(long)]
        cloud_cover: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        temperature: Option<f64>,
        #[arg(long)]
        humidity: Option<f64>,
    },
    /// Attach photo metadata to a property
    AddPhoto {
        #[arg(long)]
        property_id: Uuid,
        #[arg(long)]
        photo_type: String,
        #[arg(long)]
        file_name: String,
        #[arg(long, allow_hyphen_values = true)]
        gps_latitude: f64,
        #[arg(long, allow_hyphen_values = true)]
        gps_longitude: f64,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Record financial parameters; the newest record is used for projections
    AddFinancials {
        #[arg(long)]
        property_id: Uuid,
        /// Electricity price per kWh
        #[arg(long)]
        electricity_rate: f64,
        #[arg(long)]
        cost_per_watt: f64,
        #[arg(long, default_value_t = 0.0)]
        incentives: f64,
        /// Annual loan rate in percent
        #[arg(long, default_value_t = 0.0)]
        financing_rate: f64,
        #[arg(long, default_value_t = 0)]
        financing_term: u32,
        #[arg(long, default_value_t = 0.0)]
        maintenance: f64,
        /// Yearly electricity price growth as a fraction
        #[arg(long, default_value_t = 0.03)]
        escalation: f64,
    },
    /// Estimate annual production for a property
    Estimate {
        #[arg(long)]
        property_id: Uuid,
    },
    /// Project savings and ROI year by year
    Project {
        #[arg(long)]
        property_id: Uuid,
        #[arg(long)]
        years: Option<u32>,
    },
    /// Compute a fixed-rate loan payment
    Amortize {
        #[arg(long, allow_hyphen_values = true)]
        principal: f64,
        /// Annual rate in percent
        #[arg(long)]
        rate: f64,
        /// Term in years
        #[arg(long)]
        term: u32,
    },
    /// Write the comprehensive audit report as JSON
    Report {
        #[arg(long)]
        property_id: Uuid,
        #[arg(long)]
        years: Option<u32>,
        #[arg(long, default_value = "report.json")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    telemetry::init_tracing(config.log_json);

    if let Commands::Amortize {
        principal,
        rate,
        term,
    } = cli.command
    {
        let schedule = finance::amortize(principal, rate, term)?;
        println!("Monthly payment: ${:.2}", schedule.monthly_payment);
        println!("Total paid: ${:.2}", schedule.total_paid);
        println!("Total interest: ${:.2}", schedule.total_interest);
        return Ok(());
    }

    let pool = db::connect(&config).await?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let property_id = db::seed(&pool).await?;
            println!("Seed data inserted for property {property_id}.");
        }
        Commands::AddProperty {
            address,
            latitude,
            longitude,
            timezone,
            roof_area,
            tilt,
            orientation,
            shading,
        } => {
            let roof = RoofProfile {
                area_m2: roof_area,
                tilt_angle_degrees: tilt,
                orientation,
                shading_factor: shading,
            };
            let coordinates = Coordinates {
                latitude,
                longitude,
            };
            let id = db::insert_property(&pool, &address, coordinates, &timezone, &roof).await?;
            println!("Property {id} added.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_properties_csv(&pool, &csv).await?;
            println!("Inserted {inserted} properties from {}.", csv.display());
        }
        Commands::RecordConditions {
            property_id,
            irradiance,
            cloud_cover,
            temperature,
            humidity,
        } => {
            let conditions = match (irradiance, cloud_cover) {
                (Some(irradiance), cloud_cover) => EnvironmentalConditions {
                    solar_irradiance_w_m2: Some(irradiance),
                    temperature_c: temperature,
                    humidity_pct: humidity,
                    cloud_cover_pct: cloud_cover,
                },
                (None, Some(cloud_cover)) => {
                    EnvironmentalConditions::from_cloud_cover(temperature, humidity, cloud_cover)?
                }
                (None, None) => anyhow::bail!("either --irradiance or --cloud-cover is required"),
            };
            db::insert_measurement(&pool, property_id, &conditions).await?;
            println!(
                "Conditions recorded for property {property_id} (irradiance {:.1} W/m2).",
                conditions.solar_irradiance_w_m2.unwrap_or_default()
            );
        }
        Commands::AddPhoto {
            property_id,
            photo_type,
            file_name,
            gps_latitude,
            gps_longitude,
            notes,
        } => {
            let gps = Coordinates {
                latitude: gps_latitude,
                longitude: gps_longitude,
            };
            let id = db::insert_photo(
                &pool,
                property_id,
                &photo_type,
                &file_name,
                gps,
                notes.as_deref(),
            )
            .await?;
            println!("Photo {id} recorded.");
        }
        Commands::AddFinancials {
            property_id,
            electricity_rate,
            cost_per_watt,
            incentives,
            financing_rate,
            financing_term,
            maintenance,
            escalation,
        } => {
            let params = FinancialParameters {
                electricity_rate_per_kwh: electricity_rate,
                install_cost_per_watt: cost_per_watt,
                incentives,
                financing_rate_pct: financing_rate,
                financing_term_years: financing_term,
                annual_maintenance_cost: maintenance,
                annual_price_escalation_pct: escalation,
            };
            db::insert_financials(&pool, property_id, &params).await?;
            println!("Financial parameters recorded for property {property_id}.");
        }
        Commands::Estimate { property_id } => {
            let property = db::fetch_property(&pool, property_id).await?;
            let measurement = db::fetch_latest_measurement(&pool, property_id).await?;
            let potential = solar::assess(
                &property.roof,
                measurement.as_ref().map(|record| &record.conditions),
            )?;
            println!("Solar potential for {}:", property.address);
            println!("- Irradiance: {:.1} W/m2", potential.irradiance_w_m2);
            println!(
                "- Orientation efficiency ({}): {:.2}",
                property.roof.orientation, potential.orientation_efficiency
            );
            println!("- Tilt efficiency: {:.3}", potential.tilt_efficiency);
            println!(
                "- Annual production: {:.2} kWh",
                potential.annual_potential_kwh
            );
        }
        Commands::Project { property_id, years } => {
            let horizon = years.unwrap_or(config.horizon_years);
            let property = db::fetch_property(&pool, property_id).await?;
            let measurement = db::fetch_latest_measurement(&pool, property_id).await?;
            let financials = db::fetch_latest_financials(&pool, property_id).await?;

            info!(%property_id, horizon, "projecting financials");
            let potential = solar::assess(
                &property.roof,
                measurement.as_ref().map(|record| &record.conditions),
            )?;
            let analysis = finance::project(
                property_id,
                financials.as_ref().map(|record| &record.params),
                potential.annual_potential_kwh,
                horizon,
            )?;

            print!("{}", report::render_summary(&property.address, &analysis));
            println!();
            print!("{}", report::render_yearly_table(&analysis));
        }
        Commands::Report {
            property_id,
            years,
            out,
        } => {
            let horizon = years.unwrap_or(config.horizon_years);
            let property = db::fetch_property(&pool, property_id).await?;
            let measurement = db::fetch_latest_measurement(&pool, property_id).await?;
            let photos = db::fetch_photos(&pool, property_id).await?;
            let financials = db::fetch_latest_financials(&pool, property_id).await?;

            let audit = report::build_report(
                &property,
                measurement.as_ref(),
                &photos,
                financials.as_ref(),
                horizon,
                Utc::now(),
            )?;
            let json = serde_json::to_string_pretty(&audit)?;
            std::fs::write(&out, json)
                .with_context(|| format!("failed to write {}", out.display()))?;
            info!(%property_id, path = %out.display(), "report written");
            println!("Report written to {}.", out.display());
        }
        // Answered above without a database.
        Commands::Amortize { .. } => {}
    }

    Ok(())
}
