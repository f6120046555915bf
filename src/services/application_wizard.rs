use regex::Regex;
use std::{collections::HashMap, sync::OnceLock};
use validator::{Validate, ValidationError};

use crate::{
    models::parse_date,
    services::file_validation::{validate_file, Attachment, MAX_FILE_SIZE},
    utils::errors::{field_messages, AppError},
};

fn phone_regex() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"^\+?[0-9][0-9 .()-]{6,18}[0-9]$").expect("phone pattern"))
}

fn validate_phone(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() || phone_regex().is_match(value.trim()) {
        Ok(())
    } else {
        let mut error = ValidationError::new("phone");
        error.message = Some("Numéro de téléphone invalide".into());
        Err(error)
    }
}

fn validate_iso_date(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() || parse_date(value).is_some() {
        Ok(())
    } else {
        let mut error = ValidationError::new("date");
        error.message = Some("Date invalide (AAAA-MM-JJ)".into());
        Err(error)
    }
}

#[derive(Debug, Clone, Default, Validate)]
pub struct PersonalInfo {
    #[validate(length(min = 1, message = "Le nom est requis"))]
    pub nom: String,
    #[validate(length(min = 1, message = "Le prénom est requis"))]
    pub prenom: String,
    #[validate(email(message = "Adresse email invalide"))]
    pub email: String,
    #[validate(
        length(min = 1, message = "Le téléphone est requis"),
        custom = "validate_phone"
    )]
    pub telephone: String,
}

impl PersonalInfo {
    fn trimmed(&self) -> Self {
        Self {
            nom: self.nom.trim().to_string(),
            prenom: self.prenom.trim().to_string(),
            email: self.email.trim().to_string(),
            telephone: self.telephone.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Validate)]
pub struct AcademicInfo {
    #[validate(length(min = 1, message = "L'établissement est requis"))]
    pub institut: String,
    #[validate(length(min = 1, message = "La spécialité est requise"))]
    pub specialite: String,
    #[validate(length(min = 1, message = "Le niveau d'étude est requis"))]
    pub niveau_etude: String,
    #[validate(length(min = 1, message = "Le type de stage est requis"))]
    pub type_stage: String,
    #[validate(
        length(min = 1, message = "La date de début est requise"),
        custom = "validate_iso_date"
    )]
    pub date_debut: String,
    #[validate(
        length(min = 1, message = "La date de fin est requise"),
        custom = "validate_iso_date"
    )]
    pub date_fin: String,
}

impl AcademicInfo {
    fn trimmed(&self) -> Self {
        Self {
            institut: self.institut.trim().to_string(),
            specialite: self.specialite.trim().to_string(),
            niveau_etude: self.niveau_etude.trim().to_string(),
            type_stage: self.type_stage.trim().to_string(),
            date_debut: self.date_debut.trim().to_string(),
            date_fin: self.date_fin.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Documents {
    pub cv: Option<Attachment>,
    pub lettre_motivation: Option<Attachment>,
    pub demande_stage: Option<Attachment>,
    pub cv_binome: Option<Attachment>,
    pub lettre_motivation_binome: Option<Attachment>,
    pub demande_stage_binome: Option<Attachment>,
}

impl Documents {
    fn required(&self, is_binome: bool) -> Vec<(&'static str, Option<&Attachment>)> {
        let mut fields = vec![
            ("cv", self.cv.as_ref()),
            ("lettre_motivation", self.lettre_motivation.as_ref()),
            ("demande_stage", self.demande_stage.as_ref()),
        ];
        if is_binome {
            fields.extend([
                ("cv_binome", self.cv_binome.as_ref()),
                ("lettre_motivation_binome", self.lettre_motivation_binome.as_ref()),
                ("demande_stage_binome", self.demande_stage_binome.as_ref()),
            ]);
        }
        fields
    }
}

/// A PFE application targets one project by reference; any other
/// application picks one or more published offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfferSelection {
    Pfe { reference: String },
    Offres(Vec<i64>),
}

impl Default for OfferSelection {
    fn default() -> Self {
        OfferSelection::Offres(Vec::new())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApplicationForm {
    pub personal: PersonalInfo,
    pub academic: AcademicInfo,
    pub is_binome: bool,
    pub binome: PersonalInfo,
    pub documents: Documents,
    pub selection: OfferSelection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WizardStep {
    PersonalInfo,
    Academic,
    Documents,
    Selection,
}

impl WizardStep {
    pub const ALL: [WizardStep; 4] = [
        WizardStep::PersonalInfo,
        WizardStep::Academic,
        WizardStep::Documents,
        WizardStep::Selection,
    ];

    pub fn number(&self) -> usize {
        match self {
            WizardStep::PersonalInfo => 1,
            WizardStep::Academic => 2,
            WizardStep::Documents => 3,
            WizardStep::Selection => 4,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            WizardStep::PersonalInfo => "Informations personnelles",
            WizardStep::Academic => "Parcours académique",
            WizardStep::Documents => "Documents",
            WizardStep::Selection => "Choix du stage",
        }
    }

    fn next(&self) -> Option<WizardStep> {
        Self::ALL.get(self.number()).copied()
    }

    fn previous(&self) -> Option<WizardStep> {
        self.number().checked_sub(2).and_then(|i| Self::ALL.get(i).copied())
    }
}

/// Validated data ready to be sent as `multipart/form-data`.
#[derive(Debug, Clone)]
pub struct DemandeSubmission {
    pub candidate: PersonalInfo,
    pub academic: AcademicInfo,
    pub binome: Option<PersonalInfo>,
    pub documents: Vec<(&'static str, Attachment)>,
    pub selection: OfferSelection,
}

impl DemandeSubmission {
    /// Text parts in sending order; `offer_ids` repeats once per offer.
    pub fn text_fields(&self) -> Vec<(String, String)> {
        let mut fields: Vec<(String, String)> = vec![
            ("nom".to_string(), self.candidate.nom.clone()),
            ("prenom".to_string(), self.candidate.prenom.clone()),
            ("email".to_string(), self.candidate.email.clone()),
            ("telephone".to_string(), self.candidate.telephone.clone()),
            ("institut".to_string(), self.academic.institut.clone()),
            ("specialite".to_string(), self.academic.specialite.clone()),
            ("niveau_etude".to_string(), self.academic.niveau_etude.clone()),
            ("type_stage".to_string(), self.academic.type_stage.clone()),
            ("date_debut".to_string(), self.academic.date_debut.clone()),
            ("date_fin".to_string(), self.academic.date_fin.clone()),
            ("is_binome".to_string(), self.binome.is_some().to_string()),
        ];

        if let Some(binome) = &self.binome {
            fields.extend([
                ("nom_binome".to_string(), binome.nom.clone()),
                ("prenom_binome".to_string(), binome.prenom.clone()),
                ("email_binome".to_string(), binome.email.clone()),
                ("telephone_binome".to_string(), binome.telephone.clone()),
            ]);
        }

        match &self.selection {
            OfferSelection::Pfe { reference } => {
                fields.push(("pfe_reference".to_string(), reference.clone()));
            }
            OfferSelection::Offres(ids) => {
                fields.extend(ids.iter().map(|id| ("offer_ids".to_string(), id.to_string())));
            }
        }

        fields
    }
}

/// Linear, four-step application form. Moving forward requires the current
/// step to be valid; moving back never does.
#[derive(Debug, Clone)]
pub struct ApplicationWizard {
    step: WizardStep,
    pub form: ApplicationForm,
    max_upload_bytes: u64,
}

impl Default for ApplicationWizard {
    fn default() -> Self {
        Self::new(MAX_FILE_SIZE)
    }
}

impl ApplicationWizard {
    pub fn new(max_upload_bytes: u64) -> Self {
        Self {
            step: WizardStep::PersonalInfo,
            form: ApplicationForm::default(),
            max_upload_bytes,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn is_last_step(&self) -> bool {
        self.step.next().is_none()
    }

    /// Advances when the current step is valid. On the last step this only
    /// validates.
    pub fn next(&mut self) -> Result<WizardStep, AppError> {
        self.validate_step(self.step)?;
        if let Some(next) = self.step.next() {
            self.step = next;
        }
        Ok(self.step)
    }

    pub fn previous(&mut self) -> WizardStep {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
        }
        self.step
    }

    pub fn validate_step(&self, step: WizardStep) -> Result<(), AppError> {
        let errors = match step {
            WizardStep::PersonalInfo => self.personal_errors(),
            WizardStep::Academic => self.academic_errors(),
            WizardStep::Documents => return self.validate_documents(),
            WizardStep::Selection => self.selection_errors(),
        };

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::ValidationError(errors))
        }
    }

    /// Re-checks every step; on failure the wizard moves back to the first
    /// invalid one.
    pub fn submission(&mut self) -> Result<DemandeSubmission, AppError> {
        for step in WizardStep::ALL {
            if let Err(err) = self.validate_step(step) {
                self.step = step;
                return Err(err);
            }
        }

        let form = &self.form;
        let documents = form
            .documents
            .required(form.is_binome)
            .into_iter()
            .filter_map(|(field, attachment)| attachment.map(|a| (field, a.clone())))
            .collect();

        Ok(DemandeSubmission {
            candidate: form.personal.trimmed(),
            academic: form.academic.trimmed(),
            binome: form.is_binome.then(|| form.binome.trimmed()),
            documents,
            selection: match &form.selection {
                OfferSelection::Pfe { reference } => OfferSelection::Pfe {
                    reference: reference.trim().to_string(),
                },
                OfferSelection::Offres(ids) => {
                    let mut ids = ids.clone();
                    ids.sort_unstable();
                    ids.dedup();
                    OfferSelection::Offres(ids)
                }
            },
        })
    }

    fn personal_errors(&self) -> HashMap<String, Vec<String>> {
        match self.form.personal.trimmed().validate() {
            Ok(()) => HashMap::new(),
            Err(e) => field_messages(&e),
        }
    }

    fn academic_errors(&self) -> HashMap<String, Vec<String>> {
        let academic = self.form.academic.trimmed();
        let mut errors = match academic.validate() {
            Ok(()) => HashMap::new(),
            Err(e) => field_messages(&e),
        };

        if let (Some(debut), Some(fin)) = (parse_date(&academic.date_debut), parse_date(&academic.date_fin)) {
            if fin <= debut {
                errors
                    .entry("date_fin".to_string())
                    .or_default()
                    .push("La date de fin doit être postérieure à la date de début".to_string());
            }
        }

        if self.form.is_binome {
            if let Err(e) = self.form.binome.trimmed().validate() {
                for (field, messages) in field_messages(&e) {
                    errors.insert(format!("{}_binome", field), messages);
                }
            }
        }

        errors
    }

    /// Missing documents and rejected files are reported together. A single
    /// rejected file with nothing missing keeps its own error kind.
    fn validate_documents(&self) -> Result<(), AppError> {
        let mut errors = HashMap::new();
        let mut rejected = Vec::new();

        for (field, attachment) in self.form.documents.required(self.form.is_binome) {
            match attachment {
                Some(attachment) => {
                    if let Err(err) = validate_file(field, attachment, self.max_upload_bytes) {
                        errors.insert(field.to_string(), vec![err.user_message()]);
                        rejected.push(err);
                    }
                }
                None => {
                    errors.insert(field.to_string(), vec!["Ce document est requis".to_string()]);
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 && rejected.len() == 1 {
            Err(rejected.remove(0))
        } else {
            Err(AppError::ValidationError(errors))
        }
    }

    fn selection_errors(&self) -> HashMap<String, Vec<String>> {
        let mut errors = HashMap::new();
        match &self.form.selection {
            OfferSelection::Pfe { reference } if reference.trim().is_empty() => {
                errors.insert(
                    "pfe_reference".to_string(),
                    vec!["La référence du sujet PFE est requise".to_string()],
                );
            }
            OfferSelection::Offres(ids) if ids.is_empty() => {
                errors.insert(
                    "offer_ids".to_string(),
                    vec!["Sélectionnez au moins une offre".to_string()],
                );
            }
            _ => {}
        }
        errors
    }
}
