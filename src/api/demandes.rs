use reqwest::{
    multipart::{Form, Part},
    Method,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::{
    api::ApiClient,
    models::demande::Demande,
    services::application_wizard::DemandeSubmission,
    utils::{errors::AppError, logger::LOGGER},
};

#[derive(Debug, Serialize)]
struct RejectBody<'a> {
    raison: &'a str,
}

fn submission_form(submission: &DemandeSubmission) -> Result<Form, AppError> {
    let mut form = Form::new();

    for (name, value) in submission.text_fields() {
        form = form.text(name, value);
    }

    for (field, attachment) in &submission.documents {
        let part = Part::bytes(attachment.data.clone())
            .file_name(attachment.file_name.clone())
            .mime_str(attachment.content_type.essence_str())?;
        form = form.part(*field, part);
    }

    Ok(form)
}

impl ApiClient {
    pub async fn list_demandes(&self) -> Result<Vec<Demande>, AppError> {
        self.get_list("demandes/").await
    }

    pub async fn get_demande(&self, id: i64) -> Result<Demande, AppError> {
        self.get_json(&format!("demandes/{}/", id)).await
    }

    /// `POST /demandes/create/` as `multipart/form-data`.
    pub async fn create_demande(&self, submission: &DemandeSubmission) -> Result<Demande, AppError> {
        let response = self
            .send(Method::POST, "demandes/create/", |r| {
                Ok(r.multipart(submission_form(submission)?))
            })
            .await?;
        let demande: Demande = response.json().await?;

        LOGGER.log_business_event(
            "demande_submitted",
            None,
            HashMap::from([
                ("demande_id".to_string(), Value::from(demande.id)),
                ("binome".to_string(), Value::from(submission.binome.is_some())),
                ("documents".to_string(), Value::from(submission.documents.len())),
            ]),
        );

        Ok(demande)
    }

    pub async fn approve_demande(&self, id: i64) -> Result<(), AppError> {
        self.post_action(&format!("demandes/{}/approve/", id), &serde_json::json!({}))
            .await
    }

    pub async fn reject_demande(&self, id: i64, raison: &str) -> Result<(), AppError> {
        if raison.trim().is_empty() {
            return Err(AppError::field("raison", "La raison du refus est requise"));
        }
        self.post_action(
            &format!("demandes/{}/reject/", id),
            &RejectBody {
                raison: raison.trim(),
            },
        )
        .await
    }
}
