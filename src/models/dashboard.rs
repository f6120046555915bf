use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Aggregates served by `/rh/kpi-globaux/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KpiGlobaux {
    #[serde(default)]
    pub total_demandes: u64,
    #[serde(default)]
    pub demandes_en_attente: u64,
    #[serde(default)]
    pub demandes_acceptees: u64,
    #[serde(default)]
    pub demandes_refusees: u64,
    #[serde(default)]
    pub entretiens_planifies: u64,
    #[serde(default)]
    pub offres_actives: u64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl KpiGlobaux {
    /// Share of decided applications that were accepted, in percent.
    pub fn taux_acceptation(&self) -> Option<f64> {
        let decided = self.demandes_acceptees + self.demandes_refusees;
        if decided == 0 {
            None
        } else {
            Some(self.demandes_acceptees as f64 * 100.0 / decided as f64)
        }
    }
}

/// Row counts served by `/admin/database/stats/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseStats {
    #[serde(default)]
    pub tables: BTreeMap<String, u64>,
    #[serde(default)]
    pub database_size: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl DatabaseStats {
    pub fn total_rows(&self) -> u64 {
        self.tables.values().sum()
    }
}
