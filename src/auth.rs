use axum_extra::headers::authorization::Basic;

use crate::config::Settings;
use crate::error::ApiError;

/// Basic-auth gate: both configured strings must match exactly.
pub fn verify(settings: &Settings, credentials: &Basic) -> Result<(), ApiError> {
    if credentials.username() != settings.api_username
        || credentials.password() != settings.api_password
    {
        return Err(ApiError::Unauthorized);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum_extra::headers::Authorization;

    use super::*;

    fn settings() -> Settings {
        Settings {
            api_username: "user".to_string(),
            api_password: "pass".to_string(),
            experiment_id: "1".to_string(),
            run_id: "abc".to_string(),
            port: 8000,
            model_path: String::new(),
            features_path: String::new(),
            demographics_path: String::new(),
            log_path: String::new(),
            full_log_path: String::new(),
        }
    }

    #[test]
    fn accepts_matching_credentials() {
        let auth = Authorization::basic("user", "pass").0;
        assert!(verify(&settings(), &auth).is_ok());
    }

    #[test]
    fn rejects_wrong_password() {
        let auth = Authorization::basic("user", "wrong").0;
        assert!(matches!(
            verify(&settings(), &auth),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn rejects_wrong_username() {
        let auth = Authorization::basic("admin", "pass").0;
        assert!(matches!(
            verify(&settings(), &auth),
            Err(ApiError::Unauthorized)
        ));
    }
}
