use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::ledger::StoreError;

use super::number;
use super::types::{FormDetails, FormRecord, NewForm};

/// Default bound on request-number allocation attempts.
pub const DEFAULT_NUMBER_ATTEMPTS: u32 = 5;

/// One store for all four form kinds. The kind lives in the detail bag, so
/// the lifecycle flags and the uniqueness namespace are shared instead of
/// duplicated four ways.
#[async_trait]
pub trait FormStore: Send + Sync {
    /// Insert a form, assigning a fresh request number for its kind.
    async fn create(&self, new_form: NewForm) -> Result<FormRecord, StoreError>;

    /// Replace the detail bag. Allowed only while the form is still a
    /// draft (both lifecycle flags false).
    async fn update_details(
        &self,
        id: Uuid,
        details: FormDetails,
    ) -> Result<FormRecord, StoreError>;

    async fn find(&self, id: Uuid) -> Result<Option<FormRecord>, StoreError>;

    async fn find_by_request_number(
        &self,
        request_number: &str,
    ) -> Result<Option<FormRecord>, StoreError>;

    /// Flag mutations. Pure: no side effects beyond this store; the
    /// coordinator owns everything else.
    async fn mark_under_review(&self, id: Uuid) -> Result<FormRecord, StoreError>;
    async fn mark_approved(&self, id: Uuid) -> Result<FormRecord, StoreError>;
    async fn mark_rejected(&self, id: Uuid) -> Result<FormRecord, StoreError>;

    async fn list(&self) -> Result<Vec<FormRecord>, StoreError>;
}

pub struct InMemoryFormStore {
    forms: Mutex<HashMap<String, FormRecord>>,
    max_number_attempts: u32,
}

impl Default for InMemoryFormStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryFormStore {
    pub fn new() -> Self {
        Self {
            forms: Mutex::new(HashMap::new()),
            max_number_attempts: DEFAULT_NUMBER_ATTEMPTS,
        }
    }

    pub fn with_max_number_attempts(attempts: u32) -> Self {
        Self {
            forms: Mutex::new(HashMap::new()),
            max_number_attempts: attempts,
        }
    }

    async fn mutate_flags<F>(&self, id: Uuid, apply: F) -> Result<FormRecord, StoreError>
    where
        F: FnOnce(&mut FormRecord),
    {
        let mut forms = self.forms.lock().await;
        let form = forms
            .values_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| StoreError::NotFound {
                request_number: id.to_string(),
            })?;
        apply(form);
        form.updated_at = Utc::now();
        Ok(form.clone())
    }
}

#[async_trait]
impl FormStore for InMemoryFormStore {
    async fn create(&self, new_form: NewForm) -> Result<FormRecord, StoreError> {
        let kind = new_form.details.kind();
        let mut forms = self.forms.lock().await;

        let mut attempt = 0;
        let request_number = loop {
            if attempt >= self.max_number_attempts {
                return Err(StoreError::RequestNumberExhausted {
                    kind,
                    attempts: self.max_number_attempts,
                });
            }
            let candidate = number::generate(kind, Utc::now(), attempt);
            if !forms.contains_key(&candidate) {
                break candidate;
            }
            warn!(
                candidate = %candidate,
                attempt = attempt,
                "Request number collision, retrying"
            );
            attempt += 1;
        };

        let now = Utc::now();
        let form = FormRecord {
            id: Uuid::new_v4(),
            request_number: request_number.clone(),
            requester_user_id: new_form.requester_user_id,
            ship_id: new_form.ship_id,
            purpose: new_form.purpose,
            description: new_form.description,
            details: new_form.details,
            is_under_review: false,
            is_approved: false,
            created_at: now,
            updated_at: now,
        };
        info!(
            request_number = %form.request_number,
            kind = %kind,
            requester = %form.requester_user_id,
            "Created specialized form"
        );
        forms.insert(request_number, form.clone());
        Ok(form)
    }

    async fn update_details(
        &self,
        id: Uuid,
        details: FormDetails,
    ) -> Result<FormRecord, StoreError> {
        let mut forms = self.forms.lock().await;
        let form = forms
            .values_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| StoreError::NotFound {
                request_number: id.to_string(),
            })?;

        if form.is_under_review || form.is_approved {
            return Err(StoreError::InvalidState {
                request_number: form.request_number.clone(),
            });
        }
        if details.kind() != form.details.kind() {
            return Err(StoreError::Validation {
                reason: format!(
                    "form {} is a {} request and cannot change kind",
                    form.request_number,
                    form.kind().label()
                ),
            });
        }

        form.details = details;
        form.updated_at = Utc::now();
        Ok(form.clone())
    }

    async fn find(&self, id: Uuid) -> Result<Option<FormRecord>, StoreError> {
        let forms = self.forms.lock().await;
        Ok(forms.values().find(|f| f.id == id).cloned())
    }

    async fn find_by_request_number(
        &self,
        request_number: &str,
    ) -> Result<Option<FormRecord>, StoreError> {
        let forms = self.forms.lock().await;
        Ok(forms.get(request_number).cloned())
    }

    async fn mark_under_review(&self, id: Uuid) -> Result<FormRecord, StoreError> {
        self.mutate_flags(id, |form| {
            form.is_under_review = true;
            form.is_approved = false;
        })
        .await
    }

    async fn mark_approved(&self, id: Uuid) -> Result<FormRecord, StoreError> {
        self.mutate_flags(id, |form| {
            form.is_under_review = false;
            form.is_approved = true;
        })
        .await
    }

    async fn mark_rejected(&self, id: Uuid) -> Result<FormRecord, StoreError> {
        self.mutate_flags(id, |form| {
            form.is_under_review = false;
            form.is_approved = false;
        })
        .await
    }

    async fn list(&self) -> Result<Vec<FormRecord>, StoreError> {
        let forms = self.forms.lock().await;
        let mut all: Vec<FormRecord> = forms.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }
}
