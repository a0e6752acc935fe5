//! Legal consent gate.
//!
//! A customer may only create a booking request after accepting the current
//! version of the legal terms. Acceptance of an older version reads as
//! [`LegalConsentState::NotAgreed`], which forces re-acceptance whenever the
//! terms change.

use crate::error::{BookingError, Result};
use crate::types::{BookingState, ConsentRecord, CustomerId, LegalConsentState};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Whether a booking may be created: the booking is still `Idle` and the
/// customer has agreed to the current terms.
#[must_use]
pub const fn can_create_booking(state: BookingState, consent: LegalConsentState) -> bool {
    matches!(state, BookingState::Idle) && matches!(consent, LegalConsentState::Agreed)
}

/// Per-customer record of accepted terms.
#[derive(Debug)]
pub struct LegalConsentGate {
    current_version: String,
    records: RwLock<HashMap<CustomerId, ConsentRecord>>,
}

impl LegalConsentGate {
    /// Gate that requires `current_version` of the terms.
    pub fn new(current_version: impl Into<String>) -> Self {
        Self {
            current_version: current_version.into(),
            records: RwLock::new(HashMap::new()),
        }
    }

    /// The terms version customers must accept.
    #[must_use]
    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    /// Record that `customer` accepted `version` of the terms.
    ///
    /// Replaces any earlier acceptance.
    ///
    /// # Errors
    ///
    /// [`BookingError::PreconditionFailed`] if `version` is blank.
    pub fn agree_legal_terms(
        &self,
        customer: &CustomerId,
        version: &str,
        text: &str,
        agreed_at: DateTime<Utc>,
    ) -> Result<ConsentRecord> {
        if version.trim().is_empty() {
            return Err(BookingError::precondition("terms version must not be empty"));
        }

        let record = ConsentRecord {
            version: version.to_string(),
            text: text.to_string(),
            agreed_at,
        };

        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(customer.clone(), record.clone());

        if version == self.current_version {
            tracing::info!(customer = %customer, version, "Legal terms accepted");
        } else {
            tracing::warn!(
                customer = %customer,
                version,
                current = %self.current_version,
                "Outdated terms version accepted; customer remains not agreed"
            );
        }

        Ok(record)
    }

    /// Consent state of `customer` against the current terms.
    #[must_use]
    pub fn consent_state(&self, customer: &CustomerId) -> LegalConsentState {
        if self.current_record(customer).is_some() {
            LegalConsentState::Agreed
        } else {
            LegalConsentState::NotAgreed
        }
    }

    /// The customer's acceptance, if it covers the current terms.
    #[must_use]
    pub fn current_record(&self, customer: &CustomerId) -> Option<ConsentRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(customer)
            .filter(|record| record.version == self.current_version)
            .cloned()
    }
}
