use std::sync::Arc;

use crate::{
    api::ApiClient,
    handlers::report_error,
    models::demande::{Demande, DemandeStatus},
    services::{
        application_wizard::ApplicationWizard,
        notification::{Notifier, Toast},
    },
    utils::errors::AppError,
};

/// Sends a completed wizard. Nothing goes over the network until every step
/// validates; the wizard is then left on the first invalid step.
pub async fn submit_application(
    client: &ApiClient,
    notifier: &dyn Notifier,
    wizard: &mut ApplicationWizard,
) -> Result<Demande, AppError> {
    let submission = match wizard.submission() {
        Ok(submission) => submission,
        Err(err) => {
            report_error(notifier, "submit_application", &err);
            return Err(err);
        }
    };

    match client.create_demande(&submission).await {
        Ok(demande) => {
            notifier.notify(Toast::success(
                "Candidature envoyée",
                "Votre demande de stage a bien été enregistrée.",
            ));
            Ok(demande)
        }
        Err(err) => {
            report_error(notifier, "submit_application", &err);
            Err(err)
        }
    }
}

/// RH view of the received applications.
pub struct ApplicationsPage {
    client: ApiClient,
    notifier: Arc<dyn Notifier>,
    pub demandes: Vec<Demande>,
    loading: bool,
}

impl ApplicationsPage {
    pub fn new(client: ApiClient, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            client,
            notifier,
            demandes: Vec::new(),
            loading: false,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
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

    pub fn by_status(&self, status: DemandeStatus) -> Vec<&Demande> {
        self.demandes.iter().filter(|d| d.status == status).collect()
    }

    pub async fn approve(&mut self, id: i64) -> Result<(), AppError> {
        let result = self.client.approve_demande(id).await;
        self.finish(
            "approve_demande",
            result,
            Toast::success("Demande acceptée", "Le candidat a été notifié."),
        )
        .await
    }

    pub async fn reject(&mut self, id: i64, raison: &str) -> Result<(), AppError> {
        let result = self.client.reject_demande(id, raison).await;
        self.finish(
            "reject_demande",
            result,
            Toast::success("Demande refusée", "Le candidat a été notifié."),
        )
        .await
    }

    async fn finish(
        &mut self,
        action: &str,
        result: Result<(), AppError>,
        success: Toast,
    ) -> Result<(), AppError> {
        match result {
            Ok(()) => {
                self.notifier.notify(success);
                if let Err(err) = self.refresh().await {
                    tracing::warn!("Refetch after {} failed: {}", action, err);
                }
                Ok(())
            }
            Err(err) => {
                report_error(self.notifier.as_ref(), action, &err);
                Err(err)
            }
        }
    }
}
