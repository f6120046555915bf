use crate::{
    api::ApiClient,
    models::dashboard::{DatabaseStats, KpiGlobaux},
    utils::errors::AppError,
};

impl ApiClient {
    /// RH overview counters.
    pub async fn rh_kpi_globaux(&self) -> Result<KpiGlobaux, AppError> {
        self.get_json("rh/kpi-globaux/").await
    }

    pub async fn admin_database_stats(&self) -> Result<DatabaseStats, AppError> {
        self.get_json("admin/database/stats/").await
    }
}
