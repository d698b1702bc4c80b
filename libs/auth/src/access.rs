use axum::{extract::Request, http, middleware::Next, response::Response};

use crate::claims::Claims;

/// Lets a request through only when the resolved caller holds an admin role
pub async fn admin_middleware(request: Request, next: Next) -> Response {
    let ok = match request.extensions().get::<Claims>() {
        Some(claims) => claims.role.is_admin(),
        None => false,
    };

    if !ok {
        let mut response = Response::new("Don't permission".into());
        *response.status_mut() = http::StatusCode::FORBIDDEN;
        return response;
    }

    next.run(request).await
}
