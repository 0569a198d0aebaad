//! HTTP handlers for the checkout endpoints.
//!
//! These connect Axum routes to the application layer handlers. Checkout
//! endpoints answer HTTP 200 with a `{success, data}` envelope even on
//! application errors; only the redirect callback uses HTTP status codes,
//! since its consumer is the shopper's browser, not the checkout script.

use std::sync::Arc;

use axum::extract::{Json, Query, State};
use axum::response::{IntoResponse, Redirect};
use axum::http::StatusCode;
use tracing::error;

use crate::application::{
    CallbackError, CallbackHandler, CallbackRequest, CheckoutError, CompleteOrderHandler,
    CreateOrderHandler, SessionStore, ValidateCheckoutHandler,
};
use crate::config::StorefrontConfig;
use crate::domain::RequestSigner;
use crate::ports::{OrderStore, PaymentProxy};

use super::dto::{
    ApiResponse, CallbackParams, CompleteOrderRequest, CompleteOrderResponse, CreateOrderRequest,
    CreateOrderResponse, ErrorData, ValidateCheckoutRequest, ValidateResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state, cloned per request.
#[derive(Clone)]
pub struct CheckoutAppState {
    pub store: Arc<dyn OrderStore>,
    pub proxy: Arc<dyn PaymentProxy>,
    pub sessions: Arc<SessionStore>,
    pub signer: Arc<RequestSigner>,
    pub storefront: StorefrontConfig,
}

impl CheckoutAppState {
    pub fn validate_handler(&self) -> ValidateCheckoutHandler {
        ValidateCheckoutHandler::new(self.sessions.clone())
    }

    pub fn create_order_handler(&self) -> CreateOrderHandler {
        CreateOrderHandler::new(
            self.store.clone(),
            self.proxy.clone(),
            self.sessions.clone(),
            self.storefront.clone(),
        )
    }

    pub fn complete_order_handler(&self) -> CompleteOrderHandler {
        CompleteOrderHandler::new(
            self.store.clone(),
            self.proxy.clone(),
            self.sessions.clone(),
            self.storefront.clone(),
        )
    }

    pub fn callback_handler(&self) -> CallbackHandler {
        CallbackHandler::new(
            self.store.clone(),
            self.signer.clone(),
            self.storefront.clone(),
        )
    }
}

fn failure(error: &CheckoutError) -> Json<ApiResponse<ErrorData>> {
    let errors = match error {
        CheckoutError::Validation { outcome } => Some(outcome.errors.clone()),
        _ => None,
    };
    Json(ApiResponse {
        success: false,
        data: ErrorData {
            message: error.user_message(),
            errors,
        },
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /checkout/validate
pub async fn validate_checkout(
    State(state): State<CheckoutAppState>,
    Json(request): Json<ValidateCheckoutRequest>,
) -> impl IntoResponse {
    match state
        .validate_handler()
        .handle(&request.session_id, &request.nonce, &request.form)
        .await
    {
        Ok(outcome) => Json(ApiResponse::ok(ValidateResponse::from(outcome))).into_response(),
        Err(e) => failure(&e).into_response(),
    }
}

/// POST /checkout/create-order
pub async fn create_order(
    State(state): State<CheckoutAppState>,
    Json(request): Json<CreateOrderRequest>,
) -> impl IntoResponse {
    match state
        .create_order_handler()
        .handle(&request.session_id, &request.nonce, &request.form)
        .await
    {
        Ok(created) => Json(ApiResponse::ok(CreateOrderResponse {
            order_id: created.order_id,
            order_key: created.order_key,
            proxy_data: created.proxy_data,
        }))
        .into_response(),
        Err(e) => failure(&e).into_response(),
    }
}

/// POST /checkout/complete-order
pub async fn complete_order(
    State(state): State<CheckoutAppState>,
    Json(request): Json<CompleteOrderRequest>,
) -> impl IntoResponse {
    match state
        .complete_order_handler()
        .handle(
            &request.session_id,
            &request.nonce,
            request.order_id,
            &request.paypal_order_id,
            request.transaction_id.as_deref(),
        )
        .await
    {
        Ok(completed) => Json(ApiResponse::ok(CompleteOrderResponse {
            redirect: completed.redirect,
        }))
        .into_response(),
        Err(e) => failure(&e).into_response(),
    }
}

/// GET /checkout/callback
///
/// Hit by the shopper's browser on redirect back from the payment service,
/// so the response is a redirect rather than JSON.
pub async fn payment_callback(
    State(state): State<CheckoutAppState>,
    Query(params): Query<CallbackParams>,
) -> impl IntoResponse {
    match state
        .callback_handler()
        .handle(CallbackRequest {
            order_id: params.order_id,
            status: params.status,
            hash: params.hash,
        })
        .await
    {
        Ok(outcome) => Redirect::to(&outcome.redirect).into_response(),
        Err(CallbackError::Forbidden) => StatusCode::FORBIDDEN.into_response(),
        Err(CallbackError::NotFound(_)) => StatusCode::NOT_FOUND.into_response(),
        Err(CallbackError::Store(e)) => {
            error!(error = %e, "callback store failure");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
