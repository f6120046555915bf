use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::interview::InterviewRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandeStatus {
    Pending,
    InterviewScheduled,
    InterviewCompleted,
    Approved,
    Rejected,
    #[serde(other)]
    Unknown,
}

impl DemandeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DemandeStatus::Approved | DemandeStatus::Rejected)
    }

    pub fn label(&self) -> &'static str {
        match self {
            DemandeStatus::Pending => "En attente",
            DemandeStatus::InterviewScheduled => "Entretien planifié",
            DemandeStatus::InterviewCompleted => "Entretien effectué",
            DemandeStatus::Approved => "Acceptée",
            DemandeStatus::Rejected => "Refusée",
            DemandeStatus::Unknown => "Inconnu",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Demande {
    pub id: i64,
    pub nom: String,
    pub prenom: String,
    pub email: String,
    #[serde(default)]
    pub telephone: String,
    #[serde(default)]
    pub institut: Option<String>,
    #[serde(default)]
    pub specialite: Option<String>,
    #[serde(default)]
    pub niveau_etude: Option<String>,
    #[serde(default)]
    pub type_stage: Option<String>,
    #[serde(default)]
    pub date_debut: Option<NaiveDate>,
    #[serde(default)]
    pub date_fin: Option<NaiveDate>,
    pub status: DemandeStatus,
    #[serde(default)]
    pub is_binome: bool,
    #[serde(default)]
    pub nom_binome: Option<String>,
    #[serde(default)]
    pub prenom_binome: Option<String>,
    #[serde(default)]
    pub email_binome: Option<String>,
    #[serde(default)]
    pub pfe_reference: Option<String>,
    #[serde(default)]
    pub offer_ids: Vec<i64>,
    #[serde(default)]
    pub cv: Option<String>,
    #[serde(default)]
    pub lettre_motivation: Option<String>,
    #[serde(default)]
    pub demande_stage: Option<String>,
    #[serde(default)]
    pub raison_refus: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub interview_requests: Vec<InterviewRequest>,
}

impl Demande {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.prenom, self.nom)
    }

    pub fn binome_name(&self) -> Option<String> {
        if !self.is_binome {
            return None;
        }
        match (&self.prenom_binome, &self.nom_binome) {
            (Some(prenom), Some(nom)) => Some(format!("{} {}", prenom, nom)),
            _ => None,
        }
    }

    /// Later requests supersede earlier ones.
    pub fn current_interview(&self) -> Option<&InterviewRequest> {
        self.interview_requests.iter().max_by_key(|r| r.id)
    }

    pub fn find_interview(&self, interview_id: i64) -> Option<&InterviewRequest> {
        self.interview_requests.iter().find(|r| r.id == interview_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::interview::InterviewStatus;

    #[test]
    fn unknown_status_is_tolerated() {
        let raw = r#"{"id": 1, "nom": "Ben Ali", "prenom": "Sami", "email": "s@x.tn", "status": "archived"}"#;
        let demande: Demande = serde_json::from_str(raw).unwrap();
        assert_eq!(demande.status, DemandeStatus::Unknown);
        assert!(demande.current_interview().is_none());
    }

    #[test]
    fn latest_interview_request_wins() {
        let raw = r#"{
            "id": 1, "nom": "Trabelsi", "prenom": "Amira", "email": "a@x.tn",
            "status": "interview_scheduled",
            "interview_requests": [
                {"id": 4, "demande": 1, "status": "VALIDATED", "proposed_date": "2026-11-10", "proposed_time": "10:00"},
                {"id": 2, "demande": 1, "status": "REVISION_REQUESTED", "proposed_date": "2026-11-03", "proposed_time": "09:00",
                 "suggested_date": "2026-11-10", "suggested_time": "10:00"}
            ]
        }"#;
        let demande: Demande = serde_json::from_str(raw).unwrap();
        let current = demande.current_interview().unwrap();
        assert_eq!(current.id, 4);
        assert_eq!(current.status, InterviewStatus::Validated);
        assert!(!demande.status.is_terminal());
        assert!(demande.find_interview(2).is_some());
    }
}
