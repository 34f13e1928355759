use anyhow::Context;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::error::AuditError;
use crate::models::{
    Coordinates, EnvironmentalConditions, FinancialParameters, FinancialRecord,
    MeasurementRecord, Orientation, PhotoRecord, PropertyCsvRow, PropertyRecord, RoofProfile,
};

pub async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(config.database_url()?)
        .await
        .context("failed to connect to Postgres")?;
    debug!(max_connections = config.max_connections, "database pool ready");
    Ok(pool)
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

const SEED_PROPERTY_ID: &str = "7b1f3c52-95d4-4c4e-9d8a-2f0f5a3c6e11";
const SEED_FINANCIALS_ID: &str = "c4a2e9d0-3b7f-4f61-8e25-91d6b0a7f342";
const SEED_MEASUREMENT_ID: &str = "5e8d7c1a-0f3b-4a9e-b6d2-43c1f8e9a075";

pub async fn seed(pool: &PgPool) -> anyhow::Result<Uuid> {
    let property_id = Uuid::parse_str(SEED_PROPERTY_ID)?;
    let roof = RoofProfile {
        area_m2: 100.0,
        tilt_angle_degrees: 30.0,
        orientation: Orientation::S,
        shading_factor: 0.1,
    };

    sqlx::query(
        r#"
        INSERT INTO solar_audit.properties
        (id, address, latitude, longitude, timezone, roof_area_m2, tilt_angle_degrees,
         orientation, shading_factor, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(property_id)
    .bind("123 Sun Street, Solar City, SC 12345")
    .bind(34.0007)
    .bind(-81.0348)
    .bind("America/New_York")
    .bind(roof.area_m2)
    .bind(roof.tilt_angle_degrees)
    .bind(roof.orientation.as_str())
    .bind(roof.shading_factor)
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO solar_audit.financial_data
        (id, property_id, electricity_rate_per_kwh, install_cost_per_watt, incentives,
         financing_rate_pct, financing_term_years, annual_maintenance_cost,
         annual_price_escalation_pct, recorded_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(Uuid::parse_str(SEED_FINANCIALS_ID)?)
    .bind(property_id)
    .bind(0.12)
    .bind(2.75)
    .bind(5000.0)
    .bind(4.5)
    .bind(20_i32)
    .bind(200.0)
    .bind(0.03)
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO solar_audit.measurements
        (id, property_id, solar_irradiance_w_m2, temperature_c, humidity_pct,
         cloud_cover_pct, recorded_at)
        VALUES ($1, $2, $3, $4, $5, $6, now())
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(Uuid::parse_str(SEED_MEASUREMENT_ID)?)
    .bind(property_id)
    .bind(775.0)
    .bind(24.5)
    .bind(58.0)
    .bind(30.0)
    .execute(pool)
    .await?;

    Ok(property_id)
}

pub async fn insert_property(
    pool: &PgPool,
    address: &str,
    coordinates: Coordinates,
    timezone: &str,
    roof: &RoofProfile,
) -> anyhow::Result<Uuid> {
    coordinates.validate()?;
    roof.validate()?;
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO solar_audit.properties
        (id, address, latitude, longitude, timezone, roof_area_m2, tilt_angle_degrees,
         orientation, shading_factor, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
        "#,
    )
    .bind(id)
    .bind(address)
    .bind(coordinates.latitude)
    .bind(coordinates.longitude)
    .bind(timezone)
    .bind(roof.area_m2)
    .bind(roof.tilt_angle_degrees)
    .bind(roof.orientation.as_str())
    .bind(roof.shading_factor)
    .execute(pool)
    .await?;

    info!(property_id = %id, address, "property added");
    Ok(id)
}

pub async fn insert_measurement(
    pool: &PgPool,
    property_id: Uuid,
    conditions: &EnvironmentalConditions,
) -> anyhow::Result<Uuid> {
    conditions.validate()?;
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO solar_audit.measurements
        (id, property_id, solar_irradiance_w_m2, temperature_c, humidity_pct,
         cloud_cover_pct, recorded_at)
        VALUES ($1, $2, $3, $4, $5, $6, now())
        "#,
    )
    .bind(id)
    .bind(property_id)
    .bind(conditions.solar_irradiance_w_m2)
    .bind(conditions.temperature_c)
    .bind(conditions.humidity_pct)
    .bind(conditions.cloud_cover_pct)
    .execute(pool)
    .await?;

    info!(%property_id, measurement_id = %id, "conditions recorded");
    Ok(id)
}

pub async fn insert_photo(
    pool: &PgPool,
    property_id: Uuid,
    photo_type: &str,
    file_name: &str,
    gps: Coordinates,
    notes: Option<&str>,
) -> anyhow::Result<Uuid> {
    gps.validate()?;
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO solar_audit.photos
        (id, property_id, photo_type, file_name, gps_latitude, gps_longitude, notes, recorded_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, now())
        "#,
    )
    .bind(id)
    .bind(property_id)
    .bind(photo_type)
    .bind(file_name)
    .bind(gps.latitude)
    .bind(gps.longitude)
    .bind(notes)
    .execute(pool)
    .await?;

    info!(%property_id, photo_id = %id, photo_type, "photo metadata recorded");
    Ok(id)
}

pub async fn insert_financials(
    pool: &PgPool,
    property_id: Uuid,
    params: &FinancialParameters,
) -> anyhow::Result<Uuid> {
    params.validate()?;
    let term = i32::try_from(params.financing_term_years).context("financing term too large")?;
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO solar_audit.financial_data
        (id, property_id, electricity_rate_per_kwh, install_cost_per_watt, incentives,
         financing_rate_pct, financing_term_years, annual_maintenance_cost,
         annual_price_escalation_pct, recorded_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
        "#,
    )
    .bind(id)
    .bind(property_id)
    .bind(params.electricity_rate_per_kwh)
    .bind(params.install_cost_per_watt)
    .bind(params.incentives)
    .bind(params.financing_rate_pct)
    .bind(term)
    .bind(params.annual_maintenance_cost)
    .bind(params.annual_price_escalation_pct)
    .execute(pool)
    .await?;

    info!(%property_id, financials_id = %id, "financial parameters recorded");
    Ok(id)
}

fn property_from_row(row: &PgRow) -> anyhow::Result<PropertyRecord> {
    let orientation: String = row.try_get("orientation")?;
    let orientation = orientation.parse::<Orientation>().map_err(|err| {
        AuditError::DependencyUnavailable(format!("stored property has bad orientation: {err}"))
    })?;

    Ok(PropertyRecord {
        id: row.try_get("id")?,
        address: row.try_get("address")?,
        coordinates: Coordinates {
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
        },
        timezone: row.try_get("timezone")?,
        roof: RoofProfile {
            area_m2: row.try_get("roof_area_m2")?,
            tilt_angle_degrees: row.try_get("tilt_angle_degrees")?,
            orientation,
            shading_factor: row.try_get("shading_factor")?,
        },
        created_at: row.try_get("created_at")?,
    })
}

pub async fn fetch_property(pool: &PgPool, property_id: Uuid) -> anyhow::Result<PropertyRecord> {
    let row = sqlx::query(
        r#"
        SELECT id, address, latitude, longitude, timezone, roof_area_m2,
               tilt_angle_degrees, orientation, shading_factor, created_at
        FROM solar_audit.properties
        WHERE id = $1
        "#,
    )
    .bind(property_id)
    .fetch_optional(pool)
    .await?
    .with_context(|| format!("property {property_id} not found"))?;

    property_from_row(&row)
}

pub async fn fetch_latest_measurement(
    pool: &PgPool,
    property_id: Uuid,
) -> anyhow::Result<Option<MeasurementRecord>> {
    let row = sqlx::query(
        r#"
        SELECT id, solar_irradiance_w_m2, temperature_c, humidity_pct,
               cloud_cover_pct, recorded_at
        FROM solar_audit.measurements
        WHERE property_id = $1
        ORDER BY recorded_at DESC
        LIMIT 1
        "#,
    )
    .bind(property_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    Ok(Some(MeasurementRecord {
        id: row.try_get("id")?,
        conditions: EnvironmentalConditions {
            solar_irradiance_w_m2: row.try_get("solar_irradiance_w_m2")?,
            temperature_c: row.try_get("temperature_c")?,
            humidity_pct: row.try_get("humidity_pct")?,
            cloud_cover_pct: row.try_get("cloud_cover_pct")?,
        },
        recorded_at: row.try_get("recorded_at")?,
    }))
}

/// Latest record by timestamp; earlier rows are kept as history.
pub async fn fetch_latest_financials(
    pool: &PgPool,
    property_id: Uuid,
) -> anyhow::Result<Option<FinancialRecord>> {
    let row = sqlx::query(
        r#"
        SELECT id, electricity_rate_per_kwh, install_cost_per_watt, incentives,
               financing_rate_pct, financing_term_years, annual_maintenance_cost,
               annual_price_escalation_pct, recorded_at
        FROM solar_audit.financial_data
        WHERE property_id = $1
        ORDER BY recorded_at DESC
        LIMIT 1
        "#,
    )
    .bind(property_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let term: i32 = row.try_get("financing_term_years")?;
    let financing_term_years = u32::try_from(term).map_err(|_| {
        AuditError::DependencyUnavailable(format!("stored financing term is negative: {term}"))
    })?;

    Ok(Some(FinancialRecord {
        id: row.try_get("id")?,
        params: FinancialParameters {
            electricity_rate_per_kwh: row.try_get("electricity_rate_per_kwh")?,
            install_cost_per_watt: row.try_get("install_cost_per_watt")?,
            incentives: row.try_get("incentives")?,
            financing_rate_pct: row.try_get("financing_rate_pct")?,
            financing_term_years,
            annual_maintenance_cost: row.try_get("annual_maintenance_cost")?,
            annual_price_escalation_pct: row.try_get("annual_price_escalation_pct")?,
        },
        recorded_at: row.try_get("recorded_at")?,
    }))
}

pub async fn fetch_photos(pool: &PgPool, property_id: Uuid) -> anyhow::Result<Vec<PhotoRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT id, photo_type, file_name, gps_latitude, gps_longitude, notes, recorded_at
        FROM solar_audit.photos
        WHERE property_id = $1
        ORDER BY recorded_at
        "#,
    )
    .bind(property_id)
    .fetch_all(pool)
    .await?;

    let mut photos = Vec::with_capacity(rows.len());
    for row in rows {
        photos.push(PhotoRecord {
            id: row.try_get("id")?,
            photo_type: row.try_get("photo_type")?,
            file_name: row.try_get("file_name")?,
            gps: Coordinates {
                latitude: row.try_get("gps_latitude")?,
                longitude: row.try_get("gps_longitude")?,
            },
            notes: row.try_get("notes")?,
            recorded_at: row.try_get("recorded_at")?,
        });
    }

    Ok(photos)
}

pub async fn import_properties_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for (index, result) in reader.deserialize::<PropertyCsvRow>().enumerate() {
        let line = index + 2;
        let row = result.with_context(|| format!("malformed row at line {line}"))?;
        let (address, coordinates, timezone, roof) = row
            .into_parts()
            .with_context(|| format!("invalid property at line {line}"))?;
        insert_property(pool, &address, coordinates, &timezone, &roof).await?;
        inserted += 1;
    }

    Ok(inserted)
}
