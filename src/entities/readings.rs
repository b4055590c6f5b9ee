use sea_orm::entity::prelude::*;
use serde::Serialize;

/// One sensor sample. Created by ingestion, never mutated.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "readings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub device_id: String,

    /// RFC 3339 timestamp; lexicographic order is chronological.
    pub ts: String,

    pub temperature_c: Option<f64>,

    pub humidity_pct: Option<f64>,

    pub lux: Option<f64>,

    pub sound: Option<f64>,

    pub co2_ppm: Option<f64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
