use crate::dto::HealthRes;

/// Health service shared by every Stash server binary.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    /// Check health without creating an instance.
    ///
    /// # Returns
    /// A `HealthRes` indicating the service is healthy.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "Stash is alive".into(),
        }
    }
}
