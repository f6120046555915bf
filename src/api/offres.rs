use crate::{api::ApiClient, models::offre::OffreStage, utils::errors::AppError};

impl ApiClient {
    pub async fn list_offres(&self) -> Result<Vec<OffreStage>, AppError> {
        self.get_list("offres-stage/").await
    }
}
