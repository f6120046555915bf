use std::sync::Arc;

use crate::{
    api::ApiClient,
    handlers::report_error,
    models::{
        demande::Demande,
        interview::{InterviewRequest, InterviewStatus},
        user::UserRole,
    },
    services::{
        interview_workflow::{
            available_actions, counter_proposal, transition, ActionKind, InterviewAction,
            ProposalForm,
        },
        notification::{Notifier, Toast},
    },
    utils::errors::AppError,
};

/// The interview dialog opened from an application row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterviewModal {
    pub interview_id: i64,
    pub demande_id: i64,
    pub status: InterviewStatus,
    pub suggested_date: String,
    pub suggested_time: String,
    pub comment: String,
}

/// Interview negotiation screen shared by tutors and RH. State only changes
/// through the backend: each action is followed by a refetch of the
/// applications, never by a local edit.
pub struct InterviewPanel {
    client: ApiClient,
    notifier: Arc<dyn Notifier>,
    role: UserRole,
    pub demandes: Vec<Demande>,
    modal: Option<InterviewModal>,
    loading: bool,
}

impl InterviewPanel {
    pub fn new(client: ApiClient, notifier: Arc<dyn Notifier>, role: UserRole) -> Self {
        Self {
            client,
            notifier,
            role,
            demandes: Vec::new(),
            modal: None,
            loading: false,
        }
    }

    /// Uses the role of the signed-in user.
    pub fn for_current_user(client: ApiClient, notifier: Arc<dyn Notifier>) -> Result<Self, AppError> {
        let user = client.current_user().ok_or_else(AppError::session_expired)?;
        Ok(Self::new(client, notifier, user.role))
    }

    pub fn role(&self) -> UserRole {
        self.role
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn modal(&self) -> Option<&InterviewModal> {
        self.modal.as_ref()
    }

    pub fn interview(&self, interview_id: i64) -> Option<&InterviewRequest> {
        self.demandes
            .iter()
            .find_map(|d| d.find_interview(interview_id))
    }

    /// Current interviews on which this role has something to do.
    pub fn awaiting_me(&self) -> Vec<&InterviewRequest> {
        self.demandes
            .iter()
            .filter(|d| !d.status.is_terminal())
            .filter_map(Demande::current_interview)
            .filter(|i| !available_actions(i.status, self.role).is_empty())
            .collect()
    }

    pub fn actions_for(&self, interview_id: i64) -> Vec<ActionKind> {
        self.interview(interview_id)
            .map(|i| available_actions(i.status, self.role))
            .unwrap_or_default()
    }

    pub async fn refresh(&mut self) -> Result<(), AppError> {
        self.loading = true;
        let result = self.client.list_demandes().await;
        self.loading = false;

        match result {
            Ok(demandes) => {
                self.demandes = demandes;
                Ok(())
            }
            Err(err) => {
                report_error(self.notifier.as_ref(), "load_demandes", &err);
                Err(err)
            }
        }
    }

    pub fn open(&mut self, interview_id: i64) -> Result<&mut InterviewModal, AppError> {
        let interview = self
            .interview(interview_id)
            .ok_or_else(|| AppError::NotFound(format!("Entretien {} introuvable", interview_id)))?;

        let modal = InterviewModal {
            interview_id,
            demande_id: interview.demande,
            status: interview.status,
            suggested_date: String::new(),
            suggested_time: String::new(),
            comment: String::new(),
        };
        Ok(self.modal.insert(modal))
    }

    pub fn close(&mut self) {
        self.modal = None;
    }

    /// Tutor confirms the proposed slot.
    pub async fn accept(&mut self) -> Result<(), AppError> {
        self.perform(
            InterviewAction::Accept,
            Toast::success("Entretien accepté", "Le candidat sera informé de la date retenue."),
        )
        .await
    }

    /// Tutor suggests another slot. Date and time are checked before any
    /// request is sent; on failure the dialog stays open.
    pub async fn propose_new_time(&mut self) -> Result<(), AppError> {
        let modal = self.current_modal()?;
        let missing = modal.suggested_date.trim().is_empty() || modal.suggested_time.trim().is_empty();
        let counter = match counter_proposal(&modal.suggested_date, &modal.suggested_time, &modal.comment) {
            Ok(counter) => counter,
            Err(err) if missing => {
                self.notifier.notify(Toast::error(
                    "Champs requis",
                    "Veuillez renseigner la date et l'heure suggérées.",
                ));
                return Err(err);
            }
            Err(err) => {
                report_error(self.notifier.as_ref(), "propose_new_time", &err);
                return Err(err);
            }
        };

        self.perform(
            InterviewAction::ProposeNewTime(counter),
            Toast::success("Nouvelle date proposée", "Le service RH a été notifié."),
        )
        .await
    }

    pub async fn accept_suggestion(&mut self) -> Result<(), AppError> {
        self.perform(
            InterviewAction::AcceptSuggestion,
            Toast::success("Date acceptée", "Le tuteur et le candidat ont été notifiés."),
        )
        .await
    }

    pub async fn reject_suggestion(&mut self) -> Result<(), AppError> {
        self.perform(
            InterviewAction::RejectSuggestion,
            Toast::success("Suggestion refusée", "Le créneau initial est maintenu."),
        )
        .await
    }

    pub async fn repropose(&mut self, form: &ProposalForm) -> Result<(), AppError> {
        let proposal = form.parse().map_err(|err| {
            report_error(self.notifier.as_ref(), "repropose", &err);
            err
        })?;

        self.perform(
            InterviewAction::Repropose(proposal),
            Toast::success("Nouveau créneau envoyé", "Le tuteur a été notifié."),
        )
        .await
    }

    /// RH schedules a first interview for an application.
    pub async fn schedule(
        &mut self,
        demande_id: i64,
        tuteur_id: i64,
        filiale_id: Option<i64>,
        form: &ProposalForm,
    ) -> Result<InterviewRequest, AppError> {
        if !matches!(self.role, UserRole::Rh | UserRole::Admin) {
            let err = AppError::Forbidden("Seul le service RH planifie les entretiens".to_string());
            report_error(self.notifier.as_ref(), "schedule", &err);
            return Err(err);
        }

        let result = match form.parse() {
            Ok(proposal) => {
                self.loading = true;
                let created = self
                    .client
                    .propose_interview(demande_id, tuteur_id, filiale_id, &proposal)
                    .await;
                self.loading = false;
                created
            }
            Err(err) => Err(err),
        };

        match result {
            Ok(created) => {
                self.notifier.notify(Toast::success(
                    "Entretien proposé",
                    "Le tuteur doit maintenant confirmer le créneau.",
                ));
                self.refetch_after_action().await;
                Ok(created)
            }
            Err(err) => {
                report_error(self.notifier.as_ref(), "schedule", &err);
                Err(err)
            }
        }
    }

    fn current_modal(&self) -> Result<&InterviewModal, AppError> {
        self.modal
            .as_ref()
            .ok_or_else(|| AppError::BadRequest("Aucun entretien sélectionné".to_string()))
    }

    async fn perform(&mut self, action: InterviewAction, success: Toast) -> Result<(), AppError> {
        let (interview_id, status) = {
            let modal = self.current_modal()?;
            (modal.interview_id, modal.status)
        };

        if let Err(err) = transition(status, self.role, &action) {
            let err = AppError::from(err);
            report_error(self.notifier.as_ref(), "interview_transition", &err);
            return Err(err);
        }

        self.loading = true;
        let result = self.client.respond_to_interview(interview_id, &action).await;
        self.loading = false;

        match result {
            Ok(()) => {
                self.notifier.notify(success);
                self.modal = None;
                self.refetch_after_action().await;
                Ok(())
            }
            Err(err) => {
                report_error(self.notifier.as_ref(), "interview_transition", &err);
                Err(err)
            }
        }
    }

    async fn refetch_after_action(&mut self) {
        if let Err(err) = self.refresh().await {
            tracing::warn!("Refetch after interview action failed: {}", err);
        }
    }
}
