//! Mock payment gateway for tests.
//!
//! Records every call so handlers can be asserted against: how many
//! customers were created, what metadata rode on the session request, which
//! cancel flag was last set.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::ports::{
    CheckoutSessionRequest, CheckoutSessionResponse, CreateCustomerRequest, CustomerResponse,
    PaymentError, PaymentProvider, PortalSessionResponse, ProviderSubscription,
};

/// In-memory `PaymentProvider` with call recording and failure injection.
pub struct MockPaymentGateway {
    fail_all: bool,
    customers: Mutex<Vec<CreateCustomerRequest>>,
    sessions: Mutex<Vec<CheckoutSessionRequest>>,
    cancel_flags: Mutex<Vec<(String, bool)>>,
    portal_return_urls: Mutex<Vec<String>>,
    deleted_customers: Mutex<Vec<String>>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self {
            fail_all: false,
            customers: Mutex::new(Vec::new()),
            sessions: Mutex::new(Vec::new()),
            cancel_flags: Mutex::new(Vec::new()),
            portal_return_urls: Mutex::new(Vec::new()),
            deleted_customers: Mutex::new(Vec::new()),
        }
    }

    /// A gateway whose every call fails, for error-path tests.
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::new()
        }
    }

    pub fn customers_created(&self) -> usize {
        self.customers.lock().unwrap().len()
    }

    pub fn sessions_created(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn last_session_request(&self) -> Option<CheckoutSessionRequest> {
        self.sessions.lock().unwrap().last().cloned()
    }

    pub fn last_cancel_flag(&self) -> Option<(String, bool)> {
        self.cancel_flags.lock().unwrap().last().cloned()
    }

    pub fn last_portal_return_url(&self) -> Option<String> {
        self.portal_return_urls.lock().unwrap().last().cloned()
    }

    pub fn customers_deleted(&self) -> usize {
        self.deleted_customers.lock().unwrap().len()
    }

    fn check_failure(&self) -> Result<(), PaymentError> {
        if self.fail_all {
            Err(PaymentError::Provider("simulated provider failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentGateway {
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<CustomerResponse, PaymentError> {
        self.check_failure()?;
        let mut customers = self.customers.lock().unwrap();
        let email = request.email.clone();
        customers.push(request);
        Ok(CustomerResponse {
            id: format!("cus_mock_{}", customers.len()),
            email: Some(email),
        })
    }

    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSessionResponse, PaymentError> {
        self.check_failure()?;
        let mut sessions = self.sessions.lock().unwrap();
        sessions.push(request);
        let id = format!("cs_mock_{}", sessions.len());
        Ok(CheckoutSessionResponse {
            url: format!("https://checkout.stripe.com/c/pay/{}", id),
            id,
        })
    }

    async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
        cancel: bool,
    ) -> Result<ProviderSubscription, PaymentError> {
        self.check_failure()?;
        self.cancel_flags
            .lock()
            .unwrap()
            .push((subscription_id.to_string(), cancel));
        Ok(ProviderSubscription {
            id: subscription_id.to_string(),
            status: "active".to_string(),
            cancel_at_period_end: cancel,
            current_period_end: Some(1706745600),
        })
    }

    async fn create_portal_session(
        &self,
        _customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSessionResponse, PaymentError> {
        self.check_failure()?;
        self.portal_return_urls
            .lock()
            .unwrap()
            .push(return_url.to_string());
        Ok(PortalSessionResponse {
            id: "bps_mock_1".to_string(),
            url: "https://billing.stripe.com/session/bps_mock_1".to_string(),
        })
    }

    async fn delete_customer(&self, customer_id: &str) -> Result<(), PaymentError> {
        self.check_failure()?;
        self.deleted_customers
            .lock()
            .unwrap()
            .push(customer_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::PlanType;
    use crate::domain::foundation::UserId;

    #[tokio::test]
    async fn records_calls_in_order() {
        let gateway = MockPaymentGateway::new();

        gateway
            .create_customer(CreateCustomerRequest {
                user_id: UserId::new("u1").unwrap(),
                email: "a@b.c".to_string(),
            })
            .await
            .unwrap();
        gateway
            .create_checkout_session(CheckoutSessionRequest {
                customer_id: "cus_mock_1".to_string(),
                plan_type: PlanType::Steady,
                user_id: UserId::new("u1").unwrap(),
                success_url: "s".to_string(),
                cancel_url: "c".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(gateway.customers_created(), 1);
        assert_eq!(gateway.sessions_created(), 1);
        assert_eq!(
            gateway.last_session_request().unwrap().plan_type,
            PlanType::Steady
        );
    }

    #[tokio::test]
    async fn failing_gateway_rejects_everything() {
        let gateway = MockPaymentGateway::failing();
        let result = gateway.delete_customer("cus_1").await;
        assert!(matches!(result, Err(PaymentError::Provider(_))));
        assert_eq!(gateway.customers_deleted(), 0);
    }
}
