use validator::Validate;

use crate::{
    api::ApiClient,
    models::testimonial::{NewTestimonial, Testimonial},
    utils::errors::AppError,
};

impl ApiClient {
    pub async fn list_testimonials(&self) -> Result<Vec<Testimonial>, AppError> {
        self.get_list("testimonials/").await
    }

    pub async fn create_testimonial(&self, testimonial: &NewTestimonial) -> Result<Testimonial, AppError> {
        testimonial.validate()?;
        self.post_json("testimonials/create/", testimonial).await
    }
}
