use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::domain::repository::PaymentGateway;
use crate::domain::types::{GatewayPayment, Preference, PreferenceRequest};
use crate::error::TicketsServiceError;

/// Path the gateway posts payment notifications to, relative to the public base URL.
pub const NOTIFICATION_PATH: &str = "/payments/gateway/notifications";

#[derive(Debug, Serialize)]
struct CreatePreferenceBody<'a> {
    notification_url: &'a str,
    external_reference: &'a str,
    items: Vec<PreferenceItemBody<'a>>,
    back_urls: BackUrls<'a>,
}

#[derive(Debug, Serialize)]
struct PreferenceItemBody<'a> {
    id: &'a str,
    title: &'a str,
    description: &'a str,
    quantity: u32,
    unit_price: i64,
    currency_id: &'static str,
}

#[derive(Debug, Serialize)]
struct BackUrls<'a> {
    success: &'a str,
    failure: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatePreferenceResponse {
    init_point: String,
    external_reference: String,
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    status: String,
    #[serde(default)]
    external_reference: Option<String>,
}

#[derive(Clone)]
pub struct MercadoPagoGateway {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    notification_url: String,
    success_url: String,
    failure_url: String,
}

pub struct MercadoPagoSettings {
    pub base_url: String,
    pub access_token: String,
    pub public_base_url: String,
    pub success_url: String,
    pub failure_url: String,
    pub timeout: Duration,
}

impl MercadoPagoGateway {
    pub fn new(settings: MercadoPagoSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("build gateway http client")?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_owned(),
            access_token: settings.access_token,
            notification_url: format!(
                "{}{NOTIFICATION_PATH}",
                settings.public_base_url.trim_end_matches('/')
            ),
            success_url: settings.success_url,
            failure_url: settings.failure_url,
        })
    }
}

impl PaymentGateway for MercadoPagoGateway {
    async fn create_preference(
        &self,
        request: &PreferenceRequest,
    ) -> Result<Preference, TicketsServiceError> {
        let body = CreatePreferenceBody {
            notification_url: &self.notification_url,
            external_reference: &request.external_reference,
            items: request
                .items
                .iter()
                .map(|item| PreferenceItemBody {
                    id: &item.id,
                    title: &item.title,
                    description: &item.description,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    currency_id: "CLP",
                })
                .collect(),
            back_urls: BackUrls {
                success: &self.success_url,
                failure: &self.failure_url,
            },
        };

        let response: CreatePreferenceResponse = self
            .client
            .post(format!("{}/checkout/preferences", self.base_url))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .context("create gateway preference")
            .map_err(TicketsServiceError::upstream)?
            .json()
            .await
            .context("decode gateway preference")
            .map_err(TicketsServiceError::upstream)?;

        tracing::debug!(
            order_id = request.order_id,
            reference = %response.external_reference,
            "gateway preference created"
        );
        Ok(Preference {
            redirect_url: response.init_point,
            external_reference: response.external_reference,
        })
    }

    async fn get_payment(&self, payment_id: &str) -> Result<GatewayPayment, TicketsServiceError> {
        let response: PaymentResponse = self
            .client
            .get(format!("{}/v1/payments/{payment_id}", self.base_url))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .with_context(|| format!("fetch gateway payment {payment_id}"))
            .map_err(TicketsServiceError::upstream)?
            .json()
            .await
            .context("decode gateway payment")
            .map_err(TicketsServiceError::upstream)?;

        let external_reference = response
            .external_reference
            .filter(|r| !r.is_empty())
            .ok_or_else(|| {
                TicketsServiceError::upstream(anyhow::anyhow!(
                    "gateway payment {payment_id} has no external reference"
                ))
            })?;
        Ok(GatewayPayment {
            status: response.status,
            external_reference,
        })
    }
}
