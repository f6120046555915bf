use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::{
    api::ApiClient,
    models::{
        interview::{InterviewMode, InterviewRequest, Proposal, Venue},
        time_format,
    },
    services::interview_workflow::{ActionKind, InterviewAction, Party},
    utils::{errors::AppError, logger::LOGGER},
};

#[derive(Debug, Serialize)]
struct SlotBody<'a> {
    proposed_date: NaiveDate,
    #[serde(with = "time_format")]
    proposed_time: NaiveTime,
    mode: InterviewMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    meeting_link: Option<&'a str>,
}

impl<'a> From<&'a Proposal> for SlotBody<'a> {
    fn from(proposal: &'a Proposal) -> Self {
        let (location, meeting_link) = match &proposal.venue {
            Venue::OnSite { location } => (Some(location.as_str()), None),
            Venue::Online { meeting_link } => (None, Some(meeting_link.as_str())),
        };
        Self {
            proposed_date: proposal.date,
            proposed_time: proposal.time,
            mode: proposal.venue.mode(),
            location,
            meeting_link,
        }
    }
}

#[derive(Debug, Serialize)]
struct ProposeBody<'a> {
    demande_id: i64,
    tuteur_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    filiale_id: Option<i64>,
    #[serde(flatten)]
    slot: SlotBody<'a>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum TutorResponseBody<'a> {
    Accept,
    ProposeNewTime {
        suggested_date: NaiveDate,
        #[serde(with = "time_format")]
        suggested_time: NaiveTime,
        #[serde(skip_serializing_if = "Option::is_none")]
        comment: Option<&'a str>,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum RhResponseBody<'a> {
    Accept,
    Reject,
    Repropose {
        proposed_date: NaiveDate,
        #[serde(with = "time_format")]
        proposed_time: NaiveTime,
        mode: InterviewMode,
        #[serde(skip_serializing_if = "Option::is_none")]
        location: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        meeting_link: Option<&'a str>,
    },
}

fn wrong_side(action: &InterviewAction) -> AppError {
    AppError::BadRequest(format!(
        "Action « {} » envoyée au mauvais point d'accès",
        action.kind().label()
    ))
}

impl ApiClient {
    pub async fn list_interviews(&self) -> Result<Vec<InterviewRequest>, AppError> {
        self.get_list("interviews/").await
    }

    /// RH schedules an interview for an application.
    pub async fn propose_interview(
        &self,
        demande_id: i64,
        tuteur_id: i64,
        filiale_id: Option<i64>,
        proposal: &Proposal,
    ) -> Result<InterviewRequest, AppError> {
        let body = ProposeBody {
            demande_id,
            tuteur_id,
            filiale_id,
            slot: SlotBody::from(proposal),
        };
        let created: InterviewRequest = self.post_json("interviews/propose/", &body).await?;

        LOGGER.log_business_event(
            "interview_proposed",
            None,
            HashMap::from([
                ("interview_id".to_string(), Value::from(created.id)),
                ("demande_id".to_string(), Value::from(demande_id)),
            ]),
        );

        Ok(created)
    }

    /// `POST /interviews/{id}/tuteur-respond/`: accept or counter-propose.
    pub async fn tuteur_respond(&self, interview_id: i64, action: &InterviewAction) -> Result<(), AppError> {
        let body = match action {
            InterviewAction::Accept => TutorResponseBody::Accept,
            InterviewAction::ProposeNewTime(counter) => TutorResponseBody::ProposeNewTime {
                suggested_date: counter.date,
                suggested_time: counter.time,
                comment: counter.comment.as_deref(),
            },
            other => return Err(wrong_side(other)),
        };

        self.post_action(&format!("interviews/{}/tuteur-respond/", interview_id), &body)
            .await?;
        log_transition(interview_id, action.kind());
        Ok(())
    }

    /// `POST /interviews/{id}/proposal-response/`: RH settles a counter-proposal.
    pub async fn rh_proposal_response(
        &self,
        interview_id: i64,
        action: &InterviewAction,
    ) -> Result<(), AppError> {
        let body = match action {
            InterviewAction::AcceptSuggestion => RhResponseBody::Accept,
            InterviewAction::RejectSuggestion => RhResponseBody::Reject,
            InterviewAction::Repropose(proposal) => {
                let slot = SlotBody::from(proposal);
                RhResponseBody::Repropose {
                    proposed_date: slot.proposed_date,
                    proposed_time: slot.proposed_time,
                    mode: slot.mode,
                    location: slot.location,
                    meeting_link: slot.meeting_link,
                }
            }
            other => return Err(wrong_side(other)),
        };

        self.post_action(
            &format!("interviews/{}/proposal-response/", interview_id),
            &body,
        )
        .await?;
        log_transition(interview_id, action.kind());
        Ok(())
    }

    /// Routes an action to the endpoint of the side that performs it.
    pub async fn respond_to_interview(
        &self,
        interview_id: i64,
        action: &InterviewAction,
    ) -> Result<(), AppError> {
        match action.kind().actor() {
            Party::Tutor => self.tuteur_respond(interview_id, action).await,
            _ => self.rh_proposal_response(interview_id, action).await,
        }
    }
}

fn log_transition(interview_id: i64, kind: ActionKind) {
    LOGGER.log_business_event(
        "interview_transition",
        None,
        HashMap::from([
            ("interview_id".to_string(), Value::from(interview_id)),
            ("action".to_string(), Value::from(format!("{:?}", kind))),
        ]),
    );
}
