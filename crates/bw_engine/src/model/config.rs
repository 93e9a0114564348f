//! ModelConfig - MoE model configuration and preset normalization

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ensure_positive, EstimateError, Result};
use crate::supply::{UtilizationPolicy, UtilizationSource, UtilizationTable};

/// Architectural dimensions used by the first-principles weight model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub d_model: u64,
    pub n_heads: u64,
    pub n_kv_heads: u64,
    pub d_head: u64,
    pub num_layers: u64,
    /// Intermediate width of a single expert FFN.
    pub d_ff: u64,
    pub vocab_size: u64,
    /// Storage width of one parameter in bytes (2.0 for BF16, 0.5 for 4-bit).
    pub bytes_per_param: f64,
}

impl Dimensions {
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("d_model", self.d_model),
            ("n_heads", self.n_heads),
            ("n_kv_heads", self.n_kv_heads),
            ("d_head", self.d_head),
            ("num_layers", self.num_layers),
            ("d_ff", self.d_ff),
            ("vocab_size", self.vocab_size),
        ];
        for (field, value) in fields {
            if value == 0 {
                return Err(EstimateError::invalid(field, "must be at least 1"));
            }
        }
        ensure_positive("bytes_per_param", self.bytes_per_param)?;
        Ok(())
    }
}

/// Where the per-step weight traffic figures come from.
///
/// Calibrated sizes always win over dimensions; a preset carrying both is
/// normalized to `Calibrated`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WeightSource {
    /// Derive every transfer from the architecture.
    FirstPrinciples(Dimensions),
    /// Measured per-expert and non-expert transfer sizes, in GB. The
    /// non-expert size is always positive so every step moves some bytes.
    Calibrated {
        expert_size_gb: f64,
        rest_shared_gb: f64,
    },
}

/// Immutable, validated description of one MoE model.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModelConfig {
    pub name: String,
    pub num_experts: u32,
    pub top_k: u32,
    pub weights: WeightSource,
    /// Measured sustainable bandwidth utilization per batch size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utilization: Option<UtilizationTable>,
}

impl ModelConfig {
    pub fn first_principles(
        name: impl Into<String>,
        dims: Dimensions,
        num_experts: u32,
        top_k: u32,
    ) -> Result<Self> {
        dims.validate()?;
        let config = Self {
            name: name.into(),
            num_experts,
            top_k,
            weights: WeightSource::FirstPrinciples(dims),
            utilization: None,
        };
        config.validate_routing()?;
        Ok(config)
    }

    pub fn calibrated(
        name: impl Into<String>,
        num_experts: u32,
        top_k: u32,
        expert_size_gb: f64,
        rest_shared_gb: f64,
    ) -> Result<Self> {
        let config = Self {
            name: name.into(),
            num_experts,
            top_k,
            weights: WeightSource::Calibrated {
                expert_size_gb: ensure_non_negative("expert_size_gb", expert_size_gb)?,
                rest_shared_gb: ensure_positive("rest_shared_gb", rest_shared_gb)?,
            },
            utilization: None,
        };
        config.validate_routing()?;
        Ok(config)
    }

    pub fn with_utilization(mut self, table: UtilizationTable) -> Self {
        self.utilization = Some(table);
        self
    }

    pub fn is_calibrated(&self) -> bool {
        matches!(self.weights, WeightSource::Calibrated { .. })
    }

    /// Utilization used for supply at a given batch size.
    ///
    /// An explicit override applies to every batch size; otherwise the model's
    /// measured table is consulted with `fallback_percent` for misses.
    pub fn utilization_source(
        &self,
        override_percent: Option<f64>,
        policy: UtilizationPolicy,
        fallback_percent: f64,
    ) -> UtilizationSource<'_> {
        match (override_percent, &self.utilization) {
            (Some(percent), _) => UtilizationSource::Fixed(percent),
            (None, Some(table)) => UtilizationSource::Table {
                table,
                policy,
                fallback_percent,
            },
            (None, None) => UtilizationSource::Fixed(fallback_percent),
        }
    }

    fn validate_routing(&self) -> Result<()> {
        if self.num_experts == 0 {
            return Err(EstimateError::invalid("num_experts", "must be at least 1"));
        }
        if self.top_k == 0 || self.top_k > self.num_experts {
            return Err(EstimateError::invalid(
                "top_k",
                format!(
                    "must satisfy 1 <= top_k <= num_experts ({}), got {}",
                    self.num_experts, self.top_k
                ),
            ));
        }
        Ok(())
    }
}

fn ensure_non_negative(field: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(EstimateError::invalid(
            field,
            format!("must be a non-negative finite size, got {value}"),
        ))
    }
}

/// Flat on-disk model preset.
///
/// Dimensional fields are optional so calibrated presets may omit them.
/// Field aliases accept the short names used by published config tables.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ModelRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub d_model: Option<u64>,
    #[serde(default)]
    pub n_heads: Option<u64>,
    #[serde(default, alias = "n_kv")]
    pub n_kv_heads: Option<u64>,
    #[serde(default)]
    pub d_head: Option<u64>,
    #[serde(default, alias = "L", alias = "n_layers")]
    pub num_layers: Option<u64>,
    #[serde(default)]
    pub d_ff: Option<u64>,
    #[serde(alias = "E")]
    pub num_experts: u32,
    #[serde(alias = "k")]
    pub top_k: u32,
    #[serde(default, alias = "V")]
    pub vocab_size: Option<u64>,
    #[serde(default, alias = "P")]
    pub bytes_per_param: Option<f64>,
    #[serde(default, alias = "expertSize", skip_serializing_if = "Option::is_none")]
    pub expert_size_gb: Option<f64>,
    #[serde(default, alias = "restShared", skip_serializing_if = "Option::is_none")]
    pub rest_shared_gb: Option<f64>,
    #[serde(default, alias = "smbuMap", skip_serializing_if = "Option::is_none")]
    pub utilization_by_batch: Option<BTreeMap<u64, f64>>,
}

impl ModelRecord {
    /// Normalize into a validated [`ModelConfig`]; `key` names the preset when
    /// the record carries no display name.
    pub fn into_config(self, key: &str) -> Result<ModelConfig> {
        let name = self.name.clone().unwrap_or_else(|| key.to_string());

        let config = match (self.expert_size_gb, self.rest_shared_gb) {
            (Some(expert_size_gb), Some(rest_shared_gb)) => ModelConfig::calibrated(
                name,
                self.num_experts,
                self.top_k,
                expert_size_gb,
                rest_shared_gb,
            )?,
            (Some(_), None) | (None, Some(_)) => {
                return Err(EstimateError::Catalog(format!(
                    "model `{key}` sets only one of expert_size_gb / rest_shared_gb"
                )));
            }
            (None, None) => {
                let dims = self.dimensions(key)?;
                ModelConfig::first_principles(name, dims, self.num_experts, self.top_k)?
            }
        };

        match self.utilization_by_batch {
            Some(map) => Ok(config.with_utilization(UtilizationTable::new(map)?)),
            None => Ok(config),
        }
    }

    fn dimensions(&self, key: &str) -> Result<Dimensions> {
        let require = |field: &str, value: Option<u64>| {
            value.ok_or_else(|| {
                EstimateError::Catalog(format!(
                    "model `{key}` has no calibrated sizes and is missing `{field}`"
                ))
            })
        };
        Ok(Dimensions {
            d_model: require("d_model", self.d_model)?,
            n_heads: require("n_heads", self.n_heads)?,
            n_kv_heads: require("n_kv_heads", self.n_kv_heads)?,
            d_head: require("d_head", self.d_head)?,
            num_layers: require("num_layers", self.num_layers)?,
            d_ff: require("d_ff", self.d_ff)?,
            vocab_size: require("vocab_size", self.vocab_size)?,
            bytes_per_param: self.bytes_per_param.ok_or_else(|| {
                EstimateError::Catalog(format!(
                    "model `{key}` has no calibrated sizes and is missing `bytes_per_param`"
                ))
            })?,
        })
    }
}
