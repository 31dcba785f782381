//! Orders API client (UI layer → cipherbook server).

use alloy_primitives::U256;
use reqwest::Client;
use url::Url;

use super::{ClientError, parse_response};
use crate::objects::{
    AdoptOrderRequest, OrderResponse, PlaceMarketOrderRequest, StatusUpdateResponse, SwapRequest,
    TerminalStatus, TrackOrderRequest, TrackTransactionRequest, TransactionSubmitted,
    UpdateStatusRequest,
};

/// Typed HTTP client for the `/api/v1` order and swap endpoints.
#[derive(Debug, Clone)]
pub struct OrdersClient {
    http: Client,
    base_url: Url,
}

impl OrdersClient {
    /// Create a new `OrdersClient` for the server at `base_url`.
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `GET /api/v1/orders`
    pub async fn list_orders(&self) -> Result<Vec<OrderResponse>, ClientError> {
        let url = self.base_url.join("/api/v1/orders")?;
        parse_response(self.http.get(url).send().await?).await
    }

    /// `GET /api/v1/orders/executing`
    pub async fn list_executing_orders(&self) -> Result<Vec<OrderResponse>, ClientError> {
        let url = self.base_url.join("/api/v1/orders/executing")?;
        parse_response(self.http.get(url).send().await?).await
    }

    /// `GET /api/v1/orders/{id}`
    pub async fn get_order(&self, id: &str) -> Result<OrderResponse, ClientError> {
        let url = self.base_url.join(&format!("/api/v1/orders/{id}"))?;
        parse_response(self.http.get(url).send().await?).await
    }

    /// `POST /api/v1/orders` – encrypt-then-submit happens client side; this
    /// hands the encrypted input to the server for submission and tracking.
    pub async fn place_market_order(
        &self,
        request: &PlaceMarketOrderRequest,
    ) -> Result<TransactionSubmitted, ClientError> {
        let url = self.base_url.join("/api/v1/orders")?;
        parse_response(self.http.post(url).json(request).send().await?).await
    }

    /// `POST /api/v1/orders/track`
    pub async fn track_order(
        &self,
        request: &TrackOrderRequest,
    ) -> Result<OrderResponse, ClientError> {
        let url = self.base_url.join("/api/v1/orders/track")?;
        parse_response(self.http.post(url).json(request).send().await?).await
    }

    /// `POST /api/v1/orders/adopt`
    pub async fn adopt_order(
        &self,
        request: &AdoptOrderRequest,
    ) -> Result<OrderResponse, ClientError> {
        let url = self.base_url.join("/api/v1/orders/adopt")?;
        parse_response(self.http.post(url).json(request).send().await?).await
    }

    /// `PUT /api/v1/orders/{id}/status`
    pub async fn update_order_status(
        &self,
        id: &str,
        status: TerminalStatus,
    ) -> Result<StatusUpdateResponse, ClientError> {
        let url = self.base_url.join(&format!("/api/v1/orders/{id}/status"))?;
        let body = UpdateStatusRequest { status };
        parse_response(self.http.put(url).json(&body).send().await?).await
    }

    /// `PUT /api/v1/orders/by-handle/{handle}/status`
    pub async fn update_order_status_by_handle(
        &self,
        handle: U256,
        status: TerminalStatus,
    ) -> Result<StatusUpdateResponse, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/orders/by-handle/{handle}/status"))?;
        let body = UpdateStatusRequest { status };
        parse_response(self.http.put(url).json(&body).send().await?).await
    }

    /// `POST /api/v1/swaps`
    pub async fn swap(&self, request: &SwapRequest) -> Result<TransactionSubmitted, ClientError> {
        let url = self.base_url.join("/api/v1/swaps")?;
        parse_response(self.http.post(url).json(request).send().await?).await
    }

    /// `POST /api/v1/swaps/track`
    pub async fn track_transaction(
        &self,
        request: &TrackTransactionRequest,
    ) -> Result<TransactionSubmitted, ClientError> {
        let url = self.base_url.join("/api/v1/swaps/track")?;
        parse_response(self.http.post(url).json(request).send().await?).await
    }

    /// `POST /api/v1/flush`
    pub async fn flush_order(&self) -> Result<TransactionSubmitted, ClientError> {
        let url = self.base_url.join("/api/v1/flush")?;
        parse_response(self.http.post(url).send().await?).await
    }
}
