use anyhow::{Context, Result};
use sea_orm::sea_query::Condition;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::entities::readings;
use crate::parser::{Comparison, NumericField, SearchFilter};

/// Device scope for a query. Privileged callers see everything;
/// everyone else is restricted to the devices they own.
#[derive(Debug, Clone)]
pub enum DeviceScope {
    All,
    Owned(Vec<String>),
}

/// Fully validated readings query: the API layer has already checked
/// the sort column against the allow-list and clamped pagination.
#[derive(Debug, Clone)]
pub struct ReadingsQuery {
    pub scope: DeviceScope,
    pub filter: Option<SearchFilter>,
    pub device: Option<String>,
    pub sort_by: readings::Column,
    pub ascending: bool,
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Default)]
pub struct NewReading {
    pub device_id: String,
    pub ts: String,
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub lux: Option<f64>,
    pub sound: Option<f64>,
    pub co2_ppm: Option<f64>,
}

pub struct ReadingRepository {
    conn: DatabaseConnection,
}

impl ReadingRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Ingestion path; also used by tests to seed samples.
    pub async fn insert(&self, reading: NewReading) -> Result<readings::Model> {
        let active = readings::ActiveModel {
            device_id: Set(reading.device_id),
            ts: Set(reading.ts),
            temperature_c: Set(reading.temperature_c),
            humidity_pct: Set(reading.humidity_pct),
            lux: Set(reading.lux),
            sound: Set(reading.sound),
            co2_ppm: Set(reading.co2_ppm),
            ..Default::default()
        };

        let model = active.insert(&self.conn).await?;
        Ok(model)
    }

    pub async fn distinct_devices(&self, scope: &DeviceScope) -> Result<Vec<String>> {
        let mut query = readings::Entity::find()
            .select_only()
            .column(readings::Column::DeviceId)
            .distinct()
            .order_by_asc(readings::Column::DeviceId);

        if let DeviceScope::Owned(devices) = scope {
            query = query.filter(readings::Column::DeviceId.is_in(devices.clone()));
        }

        let devices = query
            .into_tuple::<String>()
            .all(&self.conn)
            .await
            .context("Failed to list devices")?;

        Ok(devices)
    }

    pub async fn latest(&self, device_id: &str) -> Result<Option<readings::Model>> {
        let reading = readings::Entity::find()
            .filter(readings::Column::DeviceId.eq(device_id))
            .order_by_desc(readings::Column::Ts)
            .one(&self.conn)
            .await
            .context("Failed to query latest reading")?;

        Ok(reading)
    }

    /// Readings newer than `hours` ago, ascending by timestamp.
    pub async fn history(&self, device_id: &str, hours: i64) -> Result<Vec<readings::Model>> {
        let cutoff = (chrono::Utc::now() - chrono::Duration::hours(hours)).to_rfc3339();

        let readings = readings::Entity::find()
            .filter(readings::Column::DeviceId.eq(device_id))
            .filter(readings::Column::Ts.gt(cutoff))
            .order_by_asc(readings::Column::Ts)
            .all(&self.conn)
            .await
            .context("Failed to query reading history")?;

        Ok(readings)
    }

    /// Filtered, sorted, paginated page plus the total match count for
    /// pagination metadata.
    pub async fn query(&self, params: &ReadingsQuery) -> Result<(Vec<readings::Model>, u64)> {
        let mut condition = Condition::all();

        if let DeviceScope::Owned(devices) = &params.scope {
            condition = condition.add(readings::Column::DeviceId.is_in(devices.clone()));
        }
        if let Some(device) = &params.device {
            condition = condition.add(readings::Column::DeviceId.eq(device.clone()));
        }
        if let Some(filter) = &params.filter {
            condition = condition.add(filter_condition(filter));
        }

        let mut query = readings::Entity::find().filter(condition);
        query = if params.ascending {
            query.order_by_asc(params.sort_by)
        } else {
            query.order_by_desc(params.sort_by)
        };

        let paginator = query.paginate(&self.conn, params.limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(params.page - 1).await?;

        Ok((items, total))
    }

    pub async fn count(&self) -> Result<u64> {
        let count = readings::Entity::find().count(&self.conn).await?;
        Ok(count)
    }
}

fn filter_condition(filter: &SearchFilter) -> Condition {
    match filter {
        SearchFilter::Device(value) => {
            Condition::all().add(readings::Column::DeviceId.contains(value.clone()))
        }
        // RFC 3339 timestamps start with the calendar date.
        SearchFilter::DateEquals(date) => {
            Condition::all().add(readings::Column::Ts.starts_with(date.clone()))
        }
        SearchFilter::TsContains(value) => {
            Condition::all().add(readings::Column::Ts.contains(value.clone()))
        }
        SearchFilter::Numeric { field, cmp } => {
            let column = numeric_column(*field);
            match *cmp {
                Comparison::Eq(v) => Condition::all().add(column.eq(v)),
                Comparison::Gt(v) => Condition::all().add(column.gt(v)),
                Comparison::Lt(v) => Condition::all().add(column.lt(v)),
                Comparison::Ge(v) => Condition::all().add(column.gte(v)),
                Comparison::Le(v) => Condition::all().add(column.lte(v)),
                Comparison::Between(low, high) => Condition::all()
                    .add(column.gte(low))
                    .add(column.lte(high)),
            }
        }
    }
}

const fn numeric_column(field: NumericField) -> readings::Column {
    match field {
        NumericField::TemperatureC => readings::Column::TemperatureC,
        NumericField::HumidityPct => readings::Column::HumidityPct,
        NumericField::Lux => readings::Column::Lux,
        NumericField::Sound => readings::Column::Sound,
        NumericField::Co2Ppm => readings::Column::Co2Ppm,
    }
}
