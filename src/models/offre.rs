use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffreStage {
    pub id: i64,
    #[serde(default)]
    pub reference: Option<String>,
    pub titre: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub filiale: Option<String>,
    #[serde(default)]
    pub type_stage: Option<String>,
    #[serde(default)]
    pub date_debut: Option<NaiveDate>,
    #[serde(default)]
    pub date_fin: Option<NaiveDate>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl OffreStage {
    pub fn is_pfe(&self) -> bool {
        self.type_stage
            .as_deref()
            .map(|t| t.eq_ignore_ascii_case("pfe"))
            .unwrap_or(false)
    }

    /// Case-insensitive match on title, reference and description.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.titre.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
            || self
                .reference
                .as_deref()
                .map(|r| r.to_lowercase().contains(&query))
                .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offre(titre: &str, reference: Option<&str>) -> OffreStage {
        OffreStage {
            id: 1,
            reference: reference.map(str::to_string),
            titre: titre.to_string(),
            description: "Développement d'une plateforme interne".to_string(),
            filiale: None,
            type_stage: Some("PFE".to_string()),
            date_debut: None,
            date_fin: None,
            is_active: true,
            created_at: None,
        }
    }

    #[test]
    fn search_covers_title_reference_and_description() {
        let o = offre("Ingénieur Data", Some("PFE-2026-014"));
        assert!(o.matches("data"));
        assert!(o.matches("pfe-2026"));
        assert!(o.matches("PLATEFORME"));
        assert!(o.matches("  "));
        assert!(!o.matches("mobile"));
        assert!(o.is_pfe());
    }
}
