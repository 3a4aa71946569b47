use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::role::Role;
use crate::models::TokenType;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub email: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

/// Decodes a bearer access token into an `AuthUser`.
pub fn authenticate(header: Option<&str>, secret: &str) -> Result<AuthUser, ApiError> {
    let token = header
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("Missing token".into()))?;

    let claims =
        verify_token(token, secret).map_err(|_| ApiError::Unauthorized("Invalid token".into()))?;

    if claims.token_type != TokenType::Access {
        return Err(ApiError::Unauthorized("Access token required".into()));
    }

    let role =
        Role::from_id(claims.role).ok_or_else(|| ApiError::Unauthorized("Invalid role".into()))?;

    Ok(AuthUser {
        user_id: claims.user_id,
        email: claims.sub,
        role,
        employee_id: claims.employee_id,
    })
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // set by the auth middleware on protected routes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let Some(config) = req.app_data::<Data<Config>>() else {
            return ready(Err(ApiError::Internal));
        };

        let header = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok());

        ready(authenticate(header, &config.jwt_secret))
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(ApiError::forbidden("Admin only"))
        }
    }

    pub fn require_hr_or_admin(&self) -> Result<(), ApiError> {
        if matches!(self.role, Role::Admin | Role::Hr) {
            Ok(())
        } else {
            Err(ApiError::forbidden("HR/Admin only"))
        }
    }

    /// Recognition devices push events; admins may replay them by hand.
    pub fn require_device_or_admin(&self) -> Result<(), ApiError> {
        if self.role == Role::Admin || self.role.is_device() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Device/Admin only"))
        }
    }

    /// Employee record linked to this user.
    pub fn require_employee(&self) -> Result<u64, ApiError> {
        self.employee_id
            .ok_or_else(|| ApiError::forbidden("No employee profile"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{TokenSubject, generate_access_token, generate_refresh_token};

    fn subject(role: Role) -> TokenSubject {
        TokenSubject {
            user_id: 1,
            email: "a@b.uz".into(),
            role: role.id(),
            employee_id: None,
        }
    }

    #[test]
    fn accepts_access_tokens_only() {
        let access = generate_access_token(&subject(Role::Hr), "s", 60).unwrap();
        let user = authenticate(Some(&format!("Bearer {access}")), "s").unwrap();
        assert_eq!(user.role, Role::Hr);

        let (refresh, _) = generate_refresh_token(&subject(Role::Hr), "s", 60).unwrap();
        assert!(authenticate(Some(&format!("Bearer {refresh}")), "s").is_err());
    }

    #[test]
    fn rejects_missing_or_malformed_header() {
        assert!(matches!(authenticate(None, "s"), Err(ApiError::Unauthorized(_))));
        assert!(matches!(
            authenticate(Some("Token abc"), "s"),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn role_guards() {
        let user = |role| AuthUser {
            user_id: 1,
            email: "a@b.uz".into(),
            role,
            employee_id: None,
        };

        assert!(user(Role::Admin).require_admin().is_ok());
        assert!(user(Role::Hr).require_admin().is_err());
        assert!(user(Role::Hr).require_hr_or_admin().is_ok());
        assert!(user(Role::Employee).require_hr_or_admin().is_err());
        assert!(user(Role::System).require_device_or_admin().is_ok());
        assert!(user(Role::Hr).require_device_or_admin().is_err());
        assert!(user(Role::Employee).require_employee().is_err());
    }
}
