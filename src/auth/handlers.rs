use axum::{
    extract::{FromRef, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::instrument;

use crate::{
    auth::{
        dto::{LoginRequest, PublicUser, RegisterRequest},
        extractors::{session_token, AuthUser},
        services::AuthService,
    },
    config::SessionConfig,
    error::{ApiJson, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/user", get(get_me))
}

fn session_cookie(cfg: &SessionConfig, token: String) -> Cookie<'static> {
    Cookie::build((cfg.cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(cfg.cookie_secure)
        .max_age(cfg.ttl())
        .build()
}

fn cleared_cookie(cfg: &SessionConfig) -> Cookie<'static> {
    Cookie::build((cfg.cookie_name.clone(), "")).path("/").build()
}

#[instrument(skip_all, fields(username = %payload.username))]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, CookieJar, Json<PublicUser>)> {
    let auth = AuthService::from_ref(&state);
    let done = auth.register(&payload.username, &payload.password).await?;
    let jar = jar.add(session_cookie(&state.config.session, done.session.token));
    Ok((StatusCode::CREATED, jar, Json(done.user.into())))
}

#[instrument(skip_all, fields(username = %payload.username))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<(CookieJar, Json<PublicUser>)> {
    let auth = AuthService::from_ref(&state);
    let done = auth.login(&payload.username, &payload.password).await?;
    let jar = jar.add(session_cookie(&state.config.session, done.session.token));
    Ok((jar, Json(done.user.into())))
}

#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> AppResult<(StatusCode, CookieJar)> {
    let cfg = &state.config.session;
    let token = session_token(&headers, &cfg.cookie_name);
    AuthService::from_ref(&state)
        .logout(token.as_deref())
        .await?;
    Ok((StatusCode::NO_CONTENT, jar.remove(cleared_cookie(cfg))))
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<PublicUser> {
    Json(user.into())
}

#[cfg(test)]
mod me_tests {
    use super::*;
    use time::OffsetDateTime;

    #[test]
    fn test_me_response_serialization() {
        let response = PublicUser {
            id: 42,
            username: "aki".to_string(),
            created_at: OffsetDateTime::UNIX_EPOCH,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["id"], 42);
        assert_eq!(json["username"], "aki");
        assert_eq!(json["createdAt"], "1970-01-01T00:00:00Z");
        assert!(json.get("passwordHash").is_none());
    }

    #[test]
    fn session_cookie_attributes() {
        let cfg = SessionConfig::default();
        let cookie = session_cookie(&cfg, "tok".into());
        assert_eq!(cookie.name(), "anime_cards_sid");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(7)));
    }
}
