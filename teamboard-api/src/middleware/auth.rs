/// Bearer token authentication layer
///
/// Resolves the `Authorization` header through
/// [`teamboard_shared::auth::middleware::authenticate`] and stores the
/// resulting [`AuthContext`] in the request extensions, where handlers pick
/// it up with `Extension<AuthContext>`.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use teamboard_shared::auth::middleware::{authenticate, AuthContext};

use crate::app::AppState;
use crate::error::ApiError;

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header_value = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let auth: AuthContext = authenticate(&state.db, state.jwt_secret(), header_value).await?;

    tracing::Span::current().record("user_id", tracing::field::display(auth.user_id));
    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}
