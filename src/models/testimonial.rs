use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Testimonial {
    pub id: i64,
    pub auteur: String,
    #[serde(default)]
    pub poste: Option<String>,
    pub contenu: String,
    pub note: u8,
    #[serde(default)]
    pub approuve: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct NewTestimonial {
    #[validate(length(min = 10, max = 1000, message = "Le témoignage doit contenir entre 10 et 1000 caractères"))]
    pub contenu: String,
    #[validate(range(min = 1, max = 5, message = "La note doit être comprise entre 1 et 5"))]
    pub note: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poste: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_content_and_out_of_range_note() {
        let testimonial = NewTestimonial {
            contenu: "Top".to_string(),
            note: 6,
            poste: None,
        };
        let errors = testimonial.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("contenu"));
        assert!(fields.contains_key("note"));
    }

    #[test]
    fn accepts_reasonable_testimonial() {
        let testimonial = NewTestimonial {
            contenu: "Un encadrement sérieux et des missions concrètes.".to_string(),
            note: 5,
            poste: Some("Stagiaire PFE".to_string()),
        };
        assert!(testimonial.validate().is_ok());
    }
}
