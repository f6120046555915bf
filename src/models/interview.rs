use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::time_format;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterviewStatus {
    PendingTuteur,
    Validated,
    RevisionRequested,
}

impl InterviewStatus {
    pub fn label(&self) -> &'static str {
        match self {
            InterviewStatus::PendingTuteur => "En attente du tuteur",
            InterviewStatus::Validated => "Validé",
            InterviewStatus::RevisionRequested => "Nouvelle date proposée",
        }
    }
}

impl fmt::Display for InterviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw = match self {
            InterviewStatus::PendingTuteur => "PENDING_TUTEUR",
            InterviewStatus::Validated => "VALIDATED",
            InterviewStatus::RevisionRequested => "REVISION_REQUESTED",
        };
        f.write_str(raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewMode {
    #[default]
    #[serde(alias = "onsite", alias = "sur_site")]
    Presentiel,
    #[serde(alias = "online", alias = "visio")]
    EnLigne,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Venue {
    OnSite { location: String },
    Online { meeting_link: String },
}

impl Venue {
    pub fn mode(&self) -> InterviewMode {
        match self {
            Venue::OnSite { .. } => InterviewMode::Presentiel,
            Venue::Online { .. } => InterviewMode::EnLigne,
        }
    }
}

/// A date, time and place for an interview, as proposed by RH.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub venue: Venue,
}

/// A tutor's counter-proposal. Venue is not negotiable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterProposal {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewRequest {
    pub id: i64,
    #[serde(alias = "demande_id")]
    pub demande: i64,
    #[serde(default, alias = "tuteur_id")]
    pub tuteur: Option<i64>,
    #[serde(default, alias = "filiale_id")]
    pub filiale: Option<i64>,
    pub status: InterviewStatus,
    pub proposed_date: NaiveDate,
    #[serde(with = "time_format")]
    pub proposed_time: NaiveTime,
    #[serde(default)]
    pub mode: InterviewMode,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub meeting_link: Option<String>,
    #[serde(default)]
    pub suggested_date: Option<NaiveDate>,
    #[serde(default, with = "time_format::option")]
    pub suggested_time: Option<NaiveTime>,
    #[serde(default)]
    pub tuteur_comment: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl InterviewRequest {
    pub fn new(id: i64, demande: i64, tuteur: Option<i64>, proposal: &Proposal) -> Self {
        let mut request = Self {
            id,
            demande,
            tuteur,
            filiale: None,
            status: InterviewStatus::PendingTuteur,
            proposed_date: proposal.date,
            proposed_time: proposal.time,
            mode: InterviewMode::Presentiel,
            location: None,
            meeting_link: None,
            suggested_date: None,
            suggested_time: None,
            tuteur_comment: None,
            created_at: None,
        };
        request.set_proposal(proposal);
        request
    }

    pub fn proposal(&self) -> Proposal {
        let venue = match self.mode {
            InterviewMode::EnLigne => Venue::Online {
                meeting_link: self.meeting_link.clone().unwrap_or_default(),
            },
            InterviewMode::Presentiel => Venue::OnSite {
                location: self.location.clone().unwrap_or_default(),
            },
        };
        Proposal {
            date: self.proposed_date,
            time: self.proposed_time,
            venue,
        }
    }

    pub fn set_proposal(&mut self, proposal: &Proposal) {
        self.proposed_date = proposal.date;
        self.proposed_time = proposal.time;
        self.mode = proposal.venue.mode();
        match &proposal.venue {
            Venue::OnSite { location } => {
                self.location = Some(location.clone());
                self.meeting_link = None;
            }
            Venue::Online { meeting_link } => {
                self.meeting_link = Some(meeting_link.clone());
                self.location = None;
            }
        }
    }

    pub fn suggestion(&self) -> Option<CounterProposal> {
        match (self.suggested_date, self.suggested_time) {
            (Some(date), Some(time)) => Some(CounterProposal {
                date,
                time,
                comment: self.tuteur_comment.clone(),
            }),
            _ => None,
        }
    }

    /// The confirmed slot. `None` until the interview is `VALIDATED`, including
    /// while a counter-proposal is pending.
    pub fn agreed_slot(&self) -> Option<Proposal> {
        match self.status {
            InterviewStatus::Validated => Some(self.proposal()),
            _ => None,
        }
    }

    pub fn is_awaiting_tutor(&self) -> bool {
        self.status == InterviewStatus::PendingTuteur
    }

    pub fn is_awaiting_rh(&self) -> bool {
        self.status == InterviewStatus::RevisionRequested
    }
}
