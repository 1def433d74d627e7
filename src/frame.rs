//! DataFrame adapter
//!
//! Reads the reach attribute table handed over by the geospatial
//! collaborator into a [`NetworkModel`], and exports run results back to
//! DataFrames. Column names are mapped through [`ColumnConfig`]; defaults
//! follow the ArcHydro field names (HydroID, NextDownID, ...).

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::complementarity::ComplementarityTable;
use crate::network::{NetworkModel, Reach, ReachId, SubBasinId};
use crate::pipeline::RunReport;

/// Source column names. Id, downstream and length columns are required;
/// covariate columns absent from the frame read as null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub id: String,
    /// Downstream reach id; null or non-positive marks an outlet
    pub downstream: String,
    pub sub_basin: Option<String>,
    pub coarse_reach: Option<String>,
    pub length: String,
    pub drainage_area: String,
    pub mean_flow: String,
    pub slope: String,
    pub channel_width: String,
    pub depth: String,
    pub velocity: String,
    pub valley_width: String,
    pub vwi: String,
    pub barrier: String,
    /// Columns carried into each reach's extra covariates
    pub extra: Vec<String>,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            id: "HydroID".to_string(),
            downstream: "NextDownID".to_string(),
            sub_basin: Some("SubBasinID".to_string()),
            coarse_reach: None,
            length: "Shape_Length".to_string(),
            drainage_area: "DrainArea".to_string(),
            mean_flow: "MeanFlow".to_string(),
            slope: "Avg_Slope".to_string(),
            channel_width: "ChanWidth".to_string(),
            depth: "Depth".to_string(),
            velocity: "Velocity".to_string(),
            valley_width: "VallWidth".to_string(),
            vwi: "VWI".to_string(),
            barrier: "Barrier".to_string(),
            extra: Vec::new(),
        }
    }
}

/// Columns projected and cast before reading
struct Projection {
    ids: Vec<String>,
    values: Vec<String>,
}

impl ColumnConfig {
    fn id_columns(&self) -> Vec<&str> {
        let mut cols = vec![self.id.as_str(), self.downstream.as_str()];
        cols.extend(self.sub_basin.as_deref());
        cols.extend(self.coarse_reach.as_deref());
        cols
    }

    fn value_columns(&self) -> Vec<&str> {
        let mut cols = vec![
            self.length.as_str(),
            self.drainage_area.as_str(),
            self.mean_flow.as_str(),
            self.slope.as_str(),
            self.channel_width.as_str(),
            self.depth.as_str(),
            self.velocity.as_str(),
            self.valley_width.as_str(),
            self.vwi.as_str(),
            self.barrier.as_str(),
        ];
        cols.extend(self.extra.iter().map(String::as_str));
        cols
    }

    fn projection(&self, df: &DataFrame) -> Result<Projection> {
        for required in [&self.id, &self.downstream, &self.length] {
            if df.get_column_index(required).is_none() {
                anyhow::bail!(
                    "Missing required column '{}'. Available columns: {:?}",
                    required,
                    df.get_column_names()
                );
            }
        }
        let present = |name: &&str| df.get_column_index(name).is_some();
        Ok(Projection {
            ids: self.id_columns().into_iter().filter(present).map(String::from).collect(),
            values: self.value_columns().into_iter().filter(present).map(String::from).collect(),
        })
    }
}

fn i64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
    Ok(df
        .column(name)
        .with_context(|| format!("Column '{}' not found", name))?
        .i64()
        .with_context(|| format!("Column '{}' is not integer type", name))?
        .into_iter()
        .collect())
}

fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    if df.get_column_index(name).is_none() {
        return Ok(vec![None; df.height()]);
    }
    Ok(df
        .column(name)
        .with_context(|| format!("Column '{}' not found", name))?
        .f64()
        .with_context(|| format!("Column '{}' is not float type", name))?
        .into_iter()
        .collect())
}

/// Build a validated network from a reach attribute table
pub fn network_from_frame(df: &DataFrame, columns: &ColumnConfig) -> Result<NetworkModel> {
    let projection = columns.projection(df)?;

    let mut exprs: Vec<Expr> = projection
        .ids
        .iter()
        .map(|name| col(name.as_str()).cast(DataType::Int64))
        .collect();
    exprs.extend(
        projection
            .values
            .iter()
            .map(|name| col(name.as_str()).cast(DataType::Float64)),
    );

    let table = df
        .clone()
        .lazy()
        .select(&exprs)
        .collect()
        .with_context(|| "Failed to project reach attribute table")?;

    let ids = i64_values(&table, &columns.id)?;
    let downstream = i64_values(&table, &columns.downstream)?;
    let optional_ids = |name: Option<&String>| -> Result<Vec<Option<i64>>> {
        match name {
            Some(n) if table.get_column_index(n).is_some() => i64_values(&table, n),
            _ => Ok(vec![None; table.height()]),
        }
    };
    let sub_basins = optional_ids(columns.sub_basin.as_ref())?;
    let coarse = optional_ids(columns.coarse_reach.as_ref())?;

    let length = f64_values(&table, &columns.length)?;
    let drainage_area = f64_values(&table, &columns.drainage_area)?;
    let mean_flow = f64_values(&table, &columns.mean_flow)?;
    let slope = f64_values(&table, &columns.slope)?;
    let channel_width = f64_values(&table, &columns.channel_width)?;
    let depth = f64_values(&table, &columns.depth)?;
    let velocity = f64_values(&table, &columns.velocity)?;
    let valley_width = f64_values(&table, &columns.valley_width)?;
    let vwi = f64_values(&table, &columns.vwi)?;
    let barrier = f64_values(&table, &columns.barrier)?;
    let extra = columns
        .extra
        .iter()
        .filter(|name| table.get_column_index(name).is_some())
        .map(|name| Ok((name.clone(), f64_values(&table, name)?)))
        .collect::<Result<Vec<_>>>()?;

    let null_lengths = length.iter().filter(|l| l.is_none()).count();
    if null_lengths > 0 {
        tracing::warn!(
            "{} of {} reaches have a null '{}'; they add no habitat length",
            null_lengths,
            table.height(),
            columns.length
        );
    }

    let mut reaches = Vec::with_capacity(table.height());
    for i in 0..table.height() {
        let id = ids[i].with_context(|| format!("Null '{}' at row {}", columns.id, i))?;
        reaches.push(Reach {
            id: ReachId(id),
            downstream: downstream[i].filter(|&d| d > 0).map(ReachId),
            sub_basin: sub_basins[i].map(SubBasinId),
            coarse_reach: coarse[i].map(ReachId),
            length_m: length[i].unwrap_or(0.0),
            drainage_area_km2: drainage_area[i],
            mean_flow_cms: mean_flow[i],
            slope_pct: slope[i],
            channel_width_m: channel_width[i],
            depth_m: depth[i],
            velocity_ms: velocity[i],
            valley_width_m: valley_width[i],
            vwi: vwi[i],
            barrier: barrier[i].is_some_and(|b| b != 0.0),
            extra: extra
                .iter()
                .map(|(name, values)| (name.clone(), values[i]))
                .collect(),
        });
    }

    tracing::debug!(
        "Read {} reaches ({} value columns, {} extra)",
        reaches.len(),
        projection.values.len(),
        extra.len()
    );

    let network = NetworkModel::new(reaches)
        .with_context(|| "Reach table is not a valid drainage network")?;
    Ok(network)
}

/// Per-reach results: connectivity plus one HIP column per scored profile
///
/// Columns: `HydroID`, `Barrier_Down`, `MGD_short`, `MGD_long`, then
/// `HIP <profile>` for each profile in key order.
pub fn reach_results_frame(report: &RunReport) -> Result<DataFrame> {
    let ids: Vec<i64> = report.network.reaches().iter().map(|r| r.id.0).collect();
    let conn = &report.reach_connectivity;

    let mut columns = vec![
        Column::from(Series::new("HydroID".into(), ids)),
        Column::from(Series::new(
            "Barrier_Down".into(),
            conn.iter().map(|c| c.barrier_downstream).collect::<Vec<bool>>(),
        )),
        Column::from(Series::new(
            "MGD_short".into(),
            conn.iter().map(|c| c.mgd_short_range).collect::<Vec<u32>>(),
        )),
        Column::from(Series::new(
            "MGD_long".into(),
            conn.iter().map(|c| c.mgd_long_range).collect::<Vec<u32>>(),
        )),
    ];
    for (key, table) in &report.hip {
        let name = format!("HIP {}", key);
        columns.push(Column::from(Series::new(name.into(), table.values().collect::<Vec<f64>>())));
    }

    DataFrame::new(columns).with_context(|| "Failed to build reach results frame")
}

/// One row per sub-basin
pub fn complementarity_frame(table: &ComplementarityTable) -> Result<DataFrame> {
    let rows = &table.indices;
    df! {
        "SubBasinID" => rows.iter().map(|r| r.sub_basin.0).collect::<Vec<i64>>(),
        "Spawn_Km" => rows.iter().map(|r| r.spawning_km).collect::<Vec<f64>>(),
        "Rear_Km" => rows.iter().map(|r| r.rearing_km).collect::<Vec<f64>>(),
        "HCI_S" => rows.iter().map(|r| i32::from(r.spawning_index)).collect::<Vec<i32>>(),
        "HCI_R" => rows.iter().map(|r| i32::from(r.rearing_index)).collect::<Vec<i32>>(),
        "HCI" => rows.iter().map(|r| i32::from(r.hci)).collect::<Vec<i32>>()
    }
    .with_context(|| "Failed to build complementarity frame")
}
