use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::{validate_jwt, AuthError};
use crate::database::models::{Role, User};
use crate::database::USERS;
use crate::error::{ApiError, NOT_AUTHORIZED};
use crate::state::AppState;

/// The authenticated caller, attached to the request by `protect`
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

/// Bearer-token authentication; resolves the token subject to a live user
pub async fn protect(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_jwt_from_headers(&headers).map_err(|reason| {
        tracing::debug!("Rejected request: {}", reason);
        ApiError::unauthorized(NOT_AUTHORIZED)
    })?;

    let claims = validate_jwt(&token, &state.config.security).map_err(|e| match e {
        AuthError::InvalidToken(reason) => {
            tracing::debug!("Rejected token: {}", reason);
            ApiError::unauthorized(NOT_AUTHORIZED)
        }
        other => ApiError::from(other),
    })?;

    // Tokens outlive accounts; a deleted user is not authenticated
    let row = state
        .repository(&USERS)
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthorized(NOT_AUTHORIZED))?;
    let user = User::from_row(row)?;

    tracing::debug!(user_id = %user.id, role = %user.role, "Authenticated request");
    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Role gate for routes behind `protect`
pub fn authorize(user: &User, roles: &[Role]) -> Result<(), ApiError> {
    if roles.contains(&user.role) {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "User role {} is not authorized to access this route",
            user.role
        )))
    }
}

/// Middleware form of `authorize(&[Role::Admin])`
pub async fn admin_only(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| ApiError::unauthorized(NOT_AUTHORIZED))?;
    authorize(&user.0, &[Role::Admin])?;
    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, &'static str> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or("Missing Authorization header")?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format")?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        Some(_) => Err("Empty JWT token"),
        None => Err("Authorization header must use Bearer token format"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
    use chrono::Utc;
    use uuid::Uuid;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Jane".into(),
            email: "jane@gmail.com".into(),
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(extract_jwt_from_headers(&headers("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn rejects_missing_or_malformed_headers() {
        assert!(extract_jwt_from_headers(&HeaderMap::new()).is_err());
        assert!(extract_jwt_from_headers(&headers("Basic dXNlcjpwYXNz")).is_err());
        assert!(extract_jwt_from_headers(&headers("Bearer   ")).is_err());
    }

    #[test]
    fn authorize_names_the_rejected_role() {
        assert!(authorize(&user(Role::Admin), &[Role::Admin]).is_ok());
        assert!(authorize(&user(Role::Publisher), &[Role::Publisher, Role::Admin]).is_ok());

        let err = authorize(&user(Role::User), &[Role::Admin]).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.message(), "User role user is not authorized to access this route");
    }
}
