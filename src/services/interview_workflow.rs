//! Interview negotiation between RH, tutor and candidate.
//!
//! RH proposes a slot, the tutor accepts it or suggests another one, and RH
//! settles a suggestion by accepting it, rejecting it or proposing afresh.
//! Everything here is pure: the backend performs the real transition, this
//! module decides locally whether an action makes sense and what follows it.

use std::collections::HashMap;
use thiserror::Error;
use validator::Validate;

use crate::{
    models::{
        demande::DemandeStatus,
        interview::{CounterProposal, InterviewMode, InterviewRequest, InterviewStatus, Proposal, Venue},
        parse_date, parse_time,
        user::UserRole,
    },
    utils::errors::{field_messages, AppError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Party {
    Candidate,
    Tutor,
    Rh,
}

impl Party {
    /// Admins act on the RH side of the negotiation.
    pub fn from_role(role: UserRole) -> Self {
        match role {
            UserRole::Rh | UserRole::Admin => Party::Rh,
            UserRole::Tuteur => Party::Tutor,
            UserRole::Candidat => Party::Candidate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Accept,
    ProposeNewTime,
    AcceptSuggestion,
    RejectSuggestion,
    Repropose,
}

impl ActionKind {
    pub fn actor(&self) -> Party {
        match self {
            ActionKind::Accept | ActionKind::ProposeNewTime => Party::Tutor,
            ActionKind::AcceptSuggestion | ActionKind::RejectSuggestion | ActionKind::Repropose => {
                Party::Rh
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::Accept => "accepter l'entretien",
            ActionKind::ProposeNewTime => "proposer une autre date",
            ActionKind::AcceptSuggestion => "accepter la date suggérée",
            ActionKind::RejectSuggestion => "refuser la date suggérée",
            ActionKind::Repropose => "proposer un nouveau créneau",
        }
    }

    fn allowed_from(&self) -> InterviewStatus {
        match self {
            ActionKind::Accept | ActionKind::ProposeNewTime => InterviewStatus::PendingTuteur,
            _ => InterviewStatus::RevisionRequested,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterviewAction {
    Accept,
    ProposeNewTime(CounterProposal),
    AcceptSuggestion,
    RejectSuggestion,
    Repropose(Proposal),
}

impl InterviewAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            InterviewAction::Accept => ActionKind::Accept,
            InterviewAction::ProposeNewTime(_) => ActionKind::ProposeNewTime,
            InterviewAction::AcceptSuggestion => ActionKind::AcceptSuggestion,
            InterviewAction::RejectSuggestion => ActionKind::RejectSuggestion,
            InterviewAction::Repropose(_) => ActionKind::Repropose,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterviewEvent {
    Confirmed,
    NewTimeSuggested,
    SuggestionAccepted,
    SuggestionRejected,
    Reproposed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    Notify { recipient: Party, event: InterviewEvent },
    AdvanceDemande(DemandeStatus),
    RefetchDemandes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: InterviewStatus,
    pub to: InterviewStatus,
    pub effects: Vec<SideEffect>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Impossible de {} : l'entretien est « {} »", .action.label(), .status.label())]
    InvalidState {
        status: InterviewStatus,
        action: ActionKind,
    },
    #[error("Le rôle {role} ne permet pas de {}", .action.label())]
    Forbidden { role: UserRole, action: ActionKind },
}

pub fn transition(
    status: InterviewStatus,
    role: UserRole,
    action: &InterviewAction,
) -> Result<Transition, TransitionError> {
    let kind = action.kind();

    if Party::from_role(role) != kind.actor() {
        return Err(TransitionError::Forbidden { role, action: kind });
    }
    if status != kind.allowed_from() {
        return Err(TransitionError::InvalidState { status, action: kind });
    }

    let (to, mut effects) = match kind {
        ActionKind::Accept => (
            InterviewStatus::Validated,
            vec![
                notify(Party::Candidate, InterviewEvent::Confirmed),
                SideEffect::AdvanceDemande(DemandeStatus::InterviewScheduled),
            ],
        ),
        ActionKind::ProposeNewTime => (
            InterviewStatus::RevisionRequested,
            vec![notify(Party::Rh, InterviewEvent::NewTimeSuggested)],
        ),
        ActionKind::AcceptSuggestion => (
            InterviewStatus::Validated,
            vec![
                notify(Party::Tutor, InterviewEvent::SuggestionAccepted),
                notify(Party::Candidate, InterviewEvent::Confirmed),
                SideEffect::AdvanceDemande(DemandeStatus::InterviewScheduled),
            ],
        ),
        ActionKind::RejectSuggestion => (
            InterviewStatus::PendingTuteur,
            vec![notify(Party::Tutor, InterviewEvent::SuggestionRejected)],
        ),
        ActionKind::Repropose => (
            InterviewStatus::PendingTuteur,
            vec![notify(Party::Tutor, InterviewEvent::Reproposed)],
        ),
    };
    effects.push(SideEffect::RefetchDemandes);

    Ok(Transition {
        from: status,
        to,
        effects,
    })
}

fn notify(recipient: Party, event: InterviewEvent) -> SideEffect {
    SideEffect::Notify { recipient, event }
}

/// Actions the given role may take on an interview in this status.
pub fn available_actions(status: InterviewStatus, role: UserRole) -> Vec<ActionKind> {
    let party = Party::from_role(role);
    [
        ActionKind::Accept,
        ActionKind::ProposeNewTime,
        ActionKind::AcceptSuggestion,
        ActionKind::RejectSuggestion,
        ActionKind::Repropose,
    ]
    .into_iter()
    .filter(|kind| kind.actor() == party && kind.allowed_from() == status)
    .collect()
}

impl InterviewRequest {
    /// Applies an action to this record. Suggestion fields are only ever set
    /// while the request is `REVISION_REQUESTED`; an accepted suggestion
    /// becomes the proposed slot.
    pub fn apply(
        &mut self,
        role: UserRole,
        action: &InterviewAction,
    ) -> Result<Vec<SideEffect>, TransitionError> {
        let step = transition(self.status, role, action)?;

        match action {
            InterviewAction::Accept => {}
            InterviewAction::ProposeNewTime(counter) => {
                self.suggested_date = Some(counter.date);
                self.suggested_time = Some(counter.time);
                self.tuteur_comment = counter.comment.clone();
            }
            InterviewAction::AcceptSuggestion => {
                if let Some(counter) = self.suggestion() {
                    self.proposed_date = counter.date;
                    self.proposed_time = counter.time;
                }
                self.clear_suggestion();
            }
            InterviewAction::RejectSuggestion => self.clear_suggestion(),
            InterviewAction::Repropose(proposal) => {
                self.set_proposal(proposal);
                self.clear_suggestion();
            }
        }

        self.status = step.to;
        Ok(step.effects)
    }

    fn clear_suggestion(&mut self) {
        self.suggested_date = None;
        self.suggested_time = None;
    }
}

/// Raw inputs of the RH scheduling form.
#[derive(Debug, Clone, Default, Validate)]
pub struct ProposalForm {
    #[validate(length(min = 1, message = "La date de l'entretien est requise"))]
    pub date: String,
    #[validate(length(min = 1, message = "L'heure de l'entretien est requise"))]
    pub time: String,
    pub mode: InterviewMode,
    pub location: String,
    #[validate(url(message = "Le lien de réunion doit être une URL valide"))]
    pub meeting_link: Option<String>,
}

impl ProposalForm {
    pub fn parse(&self) -> Result<Proposal, AppError> {
        let mut errors = match self.validate() {
            Ok(()) => HashMap::new(),
            Err(e) => field_messages(&e),
        };

        let date = parse_or_flag(&mut errors, "date", &self.date, parse_date, "Date invalide");
        let time = parse_or_flag(&mut errors, "time", &self.time, parse_time, "Heure invalide");

        let venue = match self.mode {
            InterviewMode::Presentiel => {
                let location = self.location.trim();
                if location.is_empty() {
                    push(&mut errors, "location", "Le lieu est requis pour un entretien présentiel");
                }
                Venue::OnSite {
                    location: location.to_string(),
                }
            }
            InterviewMode::EnLigne => {
                let link = self.meeting_link.as_deref().unwrap_or("").trim();
                if link.is_empty() {
                    push(&mut errors, "meeting_link", "Le lien de réunion est requis en ligne");
                }
                Venue::Online {
                    meeting_link: link.to_string(),
                }
            }
        };

        match (date, time) {
            (Some(date), Some(time)) if errors.is_empty() => Ok(Proposal { date, time, venue }),
            _ => Err(AppError::ValidationError(errors)),
        }
    }
}

/// Builds the tutor's counter-proposal from the modal inputs. Both date and
/// time are mandatory.
pub fn counter_proposal(date: &str, time: &str, comment: &str) -> Result<CounterProposal, AppError> {
    let mut errors = HashMap::new();

    let date = if date.trim().is_empty() {
        push(&mut errors, "suggested_date", "La date suggérée est requise");
        None
    } else {
        parse_or_flag(&mut errors, "suggested_date", date, parse_date, "Date suggérée invalide")
    };
    let time = if time.trim().is_empty() {
        push(&mut errors, "suggested_time", "L'heure suggérée est requise");
        None
    } else {
        parse_or_flag(&mut errors, "suggested_time", time, parse_time, "Heure suggérée invalide")
    };

    match (date, time) {
        (Some(date), Some(time)) => {
            let comment = comment.trim();
            Ok(CounterProposal {
                date,
                time,
                comment: (!comment.is_empty()).then(|| comment.to_string()),
            })
        }
        _ => Err(AppError::ValidationError(errors)),
    }
}

fn parse_or_flag<T>(
    errors: &mut HashMap<String, Vec<String>>,
    field: &str,
    raw: &str,
    parse: fn(&str) -> Option<T>,
    message: &str,
) -> Option<T> {
    if raw.trim().is_empty() {
        return None;
    }
    let parsed = parse(raw);
    if parsed.is_none() {
        push(errors, field, message);
    }
    parsed
}

fn push(errors: &mut HashMap<String, Vec<String>>, field: &str, message: &str) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use proptest::prelude::*;

    fn proposal(day: u32, hour: u32) -> Proposal {
        Proposal {
            date: NaiveDate::from_ymd_opt(2026, 11, day).unwrap(),
            time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            venue: Venue::OnSite {
                location: "Siège".to_string(),
            },
        }
    }

    fn counter(day: u32, hour: u32) -> CounterProposal {
        CounterProposal {
            date: NaiveDate::from_ymd_opt(2026, 11, day).unwrap(),
            time: NaiveTime::from_hms_opt(hour, 30, 0).unwrap(),
            comment: Some("Réunion le matin".to_string()),
        }
    }

    fn pending() -> InterviewRequest {
        InterviewRequest::new(1, 10, Some(3), &proposal(4, 9))
    }

    #[test]
    fn tutor_accept_validates_and_notifies_candidate() {
        let step = transition(InterviewStatus::PendingTuteur, UserRole::Tuteur, &InterviewAction::Accept)
            .unwrap();
        assert_eq!(step.to, InterviewStatus::Validated);
        assert!(step.effects.contains(&SideEffect::Notify {
            recipient: Party::Candidate,
            event: InterviewEvent::Confirmed
        }));
        assert!(step
            .effects
            .contains(&SideEffect::AdvanceDemande(DemandeStatus::InterviewScheduled)));
        assert_eq!(step.effects.last(), Some(&SideEffect::RefetchDemandes));
    }

    #[test]
    fn tutor_counter_proposal_requests_revision_and_notifies_rh() {
        let mut request = pending();
        let effects = request
            .apply(UserRole::Tuteur, &InterviewAction::ProposeNewTime(counter(5, 14)))
            .unwrap();

        assert_eq!(request.status, InterviewStatus::RevisionRequested);
        assert_eq!(request.suggested_date, NaiveDate::from_ymd_opt(2026, 11, 5));
        assert_eq!(request.tuteur_comment.as_deref(), Some("Réunion le matin"));
        assert!(effects.contains(&SideEffect::Notify {
            recipient: Party::Rh,
            event: InterviewEvent::NewTimeSuggested
        }));
    }

    #[test]
    fn rh_accepting_suggestion_promotes_it() {
        let mut request = pending();
        request
            .apply(UserRole::Tuteur, &InterviewAction::ProposeNewTime(counter(5, 14)))
            .unwrap();
        request
            .apply(UserRole::Rh, &InterviewAction::AcceptSuggestion)
            .unwrap();

        assert_eq!(request.status, InterviewStatus::Validated);
        assert_eq!(request.proposed_date, NaiveDate::from_ymd_opt(2026, 11, 5).unwrap());
        assert_eq!(request.proposed_time, NaiveTime::from_hms_opt(14, 30, 0).unwrap());
        assert!(request.suggestion().is_none());
        let slot = request.agreed_slot().unwrap();
        assert_eq!(slot.date, NaiveDate::from_ymd_opt(2026, 11, 5).unwrap());
    }

    #[test]
    fn rh_reject_keeps_original_slot_and_returns_to_tutor() {
        let mut request = pending();
        request
            .apply(UserRole::Tuteur, &InterviewAction::ProposeNewTime(counter(5, 14)))
            .unwrap();
        let effects = request
            .apply(UserRole::Admin, &InterviewAction::RejectSuggestion)
            .unwrap();

        assert_eq!(request.status, InterviewStatus::PendingTuteur);
        assert_eq!(request.proposed_date, NaiveDate::from_ymd_opt(2026, 11, 4).unwrap());
        assert!(request.suggestion().is_none());
        assert!(effects.contains(&SideEffect::Notify {
            recipient: Party::Tutor,
            event: InterviewEvent::SuggestionRejected
        }));
    }

    #[test]
    fn rh_repropose_replaces_slot() {
        let mut request = pending();
        request
            .apply(UserRole::Tuteur, &InterviewAction::ProposeNewTime(counter(5, 14)))
            .unwrap();
        let mut online = proposal(8, 11);
        online.venue = Venue::Online {
            meeting_link: "https://meet.example.com/xyz".to_string(),
        };
        request
            .apply(UserRole::Rh, &InterviewAction::Repropose(online))
            .unwrap();

        assert_eq!(request.status, InterviewStatus::PendingTuteur);
        assert_eq!(request.mode, InterviewMode::EnLigne);
        assert!(request.location.is_none());
        assert_eq!(request.proposed_date, NaiveDate::from_ymd_opt(2026, 11, 8).unwrap());
    }

    #[test]
    fn wrong_role_is_forbidden() {
        let err = transition(InterviewStatus::PendingTuteur, UserRole::Rh, &InterviewAction::Accept)
            .unwrap_err();
        assert!(matches!(err, TransitionError::Forbidden { .. }));

        let err = transition(
            InterviewStatus::RevisionRequested,
            UserRole::Candidat,
            &InterviewAction::AcceptSuggestion,
        )
        .unwrap_err();
        assert!(matches!(err, TransitionError::Forbidden { .. }));
    }

    #[test]
    fn validated_is_terminal() {
        for (role, action) in [
            (UserRole::Tuteur, InterviewAction::Accept),
            (UserRole::Tuteur, InterviewAction::ProposeNewTime(counter(6, 10))),
            (UserRole::Rh, InterviewAction::AcceptSuggestion),
            (UserRole::Rh, InterviewAction::RejectSuggestion),
            (UserRole::Rh, InterviewAction::Repropose(proposal(9, 10))),
        ] {
            let err = transition(InterviewStatus::Validated, role, &action).unwrap_err();
            assert!(matches!(err, TransitionError::InvalidState { .. }));
        }
    }

    #[test]
    fn failed_apply_leaves_record_untouched() {
        let mut request = pending();
        let before = request.clone();
        assert!(request
            .apply(UserRole::Rh, &InterviewAction::AcceptSuggestion)
            .is_err());
        assert_eq!(request.status, before.status);
        assert_eq!(request.proposed_date, before.proposed_date);
    }

    #[test]
    fn available_actions_per_role() {
        assert_eq!(
            available_actions(InterviewStatus::PendingTuteur, UserRole::Tuteur),
            vec![ActionKind::Accept, ActionKind::ProposeNewTime]
        );
        assert!(available_actions(InterviewStatus::PendingTuteur, UserRole::Rh).is_empty());
        assert_eq!(
            available_actions(InterviewStatus::RevisionRequested, UserRole::Admin).len(),
            3
        );
        assert!(available_actions(InterviewStatus::Validated, UserRole::Tuteur).is_empty());
    }

    #[test]
    fn counter_proposal_requires_date_and_time() {
        match counter_proposal("", "", "") {
            Err(AppError::ValidationError(errors)) => {
                assert!(errors.contains_key("suggested_date"));
                assert!(errors.contains_key("suggested_time"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(counter_proposal("2026-11-05", " ", "").is_err());
        assert!(counter_proposal("05/11/2026", "10:00", "").is_err());

        let ok = counter_proposal("2026-11-05", "10:00", "  ").unwrap();
        assert!(ok.comment.is_none());
    }

    #[test]
    fn proposal_form_checks_venue() {
        let form = ProposalForm {
            date: "2026-11-04".to_string(),
            time: "09:00".to_string(),
            mode: InterviewMode::EnLigne,
            location: String::new(),
            meeting_link: None,
        };
        match form.parse() {
            Err(AppError::ValidationError(errors)) => assert!(errors.contains_key("meeting_link")),
            other => panic!("unexpected {:?}", other),
        }

        let form = ProposalForm {
            meeting_link: Some("pas une url".to_string()),
            ..form
        };
        assert!(form.parse().is_err());

        let form = ProposalForm {
            meeting_link: Some("https://meet.example.com/abc".to_string()),
            ..form
        };
        let proposal = form.parse().unwrap();
        assert_eq!(proposal.venue.mode(), InterviewMode::EnLigne);
    }

    fn any_action() -> impl Strategy<Value = (UserRole, InterviewAction)> {
        prop_oneof![
            Just((UserRole::Tuteur, InterviewAction::Accept)),
            (1u32..28, 8u32..18).prop_map(|(d, h)| (
                UserRole::Tuteur,
                InterviewAction::ProposeNewTime(counter(d, h))
            )),
            Just((UserRole::Rh, InterviewAction::AcceptSuggestion)),
            Just((UserRole::Rh, InterviewAction::RejectSuggestion)),
            (1u32..28, 8u32..18)
                .prop_map(|(d, h)| (UserRole::Rh, InterviewAction::Repropose(proposal(d, h)))),
            Just((UserRole::Candidat, InterviewAction::Accept)),
        ]
    }

    proptest! {
        #[test]
        fn suggestion_present_iff_revision_requested(actions in prop::collection::vec(any_action(), 0..20)) {
            let mut request = pending();
            for (role, action) in &actions {
                let _ = request.apply(*role, action);
                let has_suggestion = request.suggested_date.is_some() || request.suggested_time.is_some();
                prop_assert_eq!(has_suggestion, request.status == InterviewStatus::RevisionRequested);
            }
        }
    }
}
