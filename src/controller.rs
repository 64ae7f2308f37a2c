//! Registration page state machine.
//!
//! The controller owns the form data and keeps the totals in step with it:
//! every accepted edit recomputes the whole [`PricingResult`] before the call
//! returns, and the newest snapshot is published on a `watch` channel.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::RegistrationConfig;
use crate::error::ControllerError;
use crate::present::{PriceAdapter, SlotSource};
use crate::transport::{ConfigSource, SubmissionSink, TransportError};
use crate::types::{Camper, FormData, PricingResult, RuleSet, Submission, SubmissionReceipt};

/// Name of the display slot showing the registration total.
pub const TOTAL_SLOT: &str = "total";

/// Phase of the registration page, without its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Fetching,
    Loaded,
    Submitting,
    Submitted,
    SubmissionError,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Fetching => write!(f, "fetching"),
            Status::Loaded => write!(f, "loaded"),
            Status::Submitting => write!(f, "submitting"),
            Status::Submitted => write!(f, "submitted"),
            Status::SubmissionError => write!(f, "submission error"),
        }
    }
}

/// Everything a loaded page holds.
#[derive(Debug, Clone)]
pub struct Session {
    pub config: RegistrationConfig,
    pub rules: Arc<RuleSet>,
    pub form_data: FormData,
    pub totals: Arc<PricingResult>,
    pub adapter: PriceAdapter,
    /// Revision of the last applied edit.
    pub revision: u64,
}

#[derive(Debug)]
pub enum RegistrationState {
    Fetching,
    Loaded(Session),
    Submitting(Session),
    Submitted(Session),
    SubmissionError(Session),
}

impl RegistrationState {
    #[must_use]
    pub fn status(&self) -> Status {
        match self {
            RegistrationState::Fetching => Status::Fetching,
            RegistrationState::Loaded(_) => Status::Loaded,
            RegistrationState::Submitting(_) => Status::Submitting,
            RegistrationState::Submitted(_) => Status::Submitted,
            RegistrationState::SubmissionError(_) => Status::SubmissionError,
        }
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match self {
            RegistrationState::Fetching => None,
            RegistrationState::Loaded(s)
            | RegistrationState::Submitting(s)
            | RegistrationState::Submitted(s)
            | RegistrationState::SubmissionError(s) => Some(s),
        }
    }
}

/// What subscribers see after each recomputation.
#[derive(Debug, Clone, Default)]
pub struct PricingSnapshot {
    pub revision: u64,
    pub totals: Arc<PricingResult>,
    pub camper_count: usize,
}

/// A recalculation handed off to run elsewhere. Carries everything needed
/// to compute the result, and the revision it was taken at.
#[derive(Debug, Clone)]
pub struct RecalcTicket {
    revision: u64,
    rules: Arc<RuleSet>,
    form_data: FormData,
}

impl RecalcTicket {
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn form_data(&self) -> &FormData {
        &self.form_data
    }

    /// Run the pricing pass this ticket stands for.
    pub fn compute(&self) -> PricingResult {
        self.rules.price(&self.form_data)
    }
}

/// Drives one registration page from fetch to submission.
#[derive(Debug)]
pub struct RegistrationController {
    event_id: String,
    state: RegistrationState,
    publisher: watch::Sender<PricingSnapshot>,
}

impl RegistrationController {
    /// A controller waiting for its configuration.
    #[must_use]
    pub fn new(event_id: &str) -> Self {
        let (publisher, _) = watch::channel(PricingSnapshot::default());
        Self {
            event_id: event_id.to_owned(),
            state: RegistrationState::Fetching,
            publisher,
        }
    }

    #[must_use]
    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    #[must_use]
    pub fn state(&self) -> &RegistrationState {
        &self.state
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.state.status()
    }

    #[must_use]
    pub fn form_data(&self) -> Option<&FormData> {
        self.state.session().map(|s| &s.form_data)
    }

    #[must_use]
    pub fn totals(&self) -> Option<Arc<PricingResult>> {
        self.state.session().map(|s| Arc::clone(&s.totals))
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.state.session().map_or(0, |s| s.revision)
    }

    #[must_use]
    pub fn rules(&self) -> Option<Arc<RuleSet>> {
        self.state.session().map(|s| Arc::clone(&s.rules))
    }

    /// Receiver that always holds the newest pricing snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PricingSnapshot> {
        self.publisher.subscribe()
    }

    /// Display tokens for the current totals. Empty while fetching.
    #[must_use]
    pub fn prices(&self) -> IndexMap<String, Option<String>> {
        self.state
            .session()
            .map(|s| s.adapter.render(&s.totals))
            .unwrap_or_default()
    }

    /// Fetch the configuration and load it.
    ///
    /// # Errors
    ///
    /// A transport failure leaves the controller in `Fetching`; it is not
    /// retried. See [`finish_fetch`](Self::finish_fetch) for the rest.
    pub async fn load(&mut self, source: &dyn ConfigSource) -> Result<(), ControllerError> {
        self.expect_status("load", &[Status::Fetching])?;
        match source.fetch_config(&self.event_id).await {
            Ok(config) => self.finish_fetch(config),
            Err(e) => {
                error!(event_id = %self.event_id, error = %e, "failed to fetch registration config");
                Err(e.into())
            }
        }
    }

    /// Compile the configuration, start with one empty camper and compute
    /// the initial totals.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Compile`] if the pricing logic is rejected,
    /// leaving the controller in `Fetching`.
    pub fn finish_fetch(&mut self, config: RegistrationConfig) -> Result<(), ControllerError> {
        self.expect_status("load", &[Status::Fetching])?;
        let rules = Arc::new(RuleSet::from_config(&config)?);
        let adapter = PriceAdapter::from_pricing(&config.pricing).slot(TOTAL_SLOT, SlotSource::Total);
        let form_data = FormData::with_default_camper();
        let totals = Arc::new(rules.price(&form_data));
        let revision = self.publisher.borrow().revision + 1;
        self.publish(revision, &totals, form_data.camper_count());
        info!(
            event_id = %self.event_id,
            camper_rules = rules.camper_rules().len(),
            registration_rules = rules.registration_rules().len(),
            defects = rules.defects().len(),
            "registration loaded"
        );
        self.state = RegistrationState::Loaded(Session {
            config,
            rules,
            form_data,
            totals,
            adapter,
            revision,
        });
        Ok(())
    }

    /// Replace the form data and recompute the totals.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidTransition`] unless `Loaded`.
    pub fn on_form_data_change(
        &mut self,
        form_data: FormData,
    ) -> Result<Arc<PricingResult>, ControllerError> {
        let session = self.loaded_session("edit")?;
        session.revision += 1;
        session.totals = Arc::new(session.rules.price(&form_data));
        session.form_data = form_data;
        let (revision, totals, count) = (
            session.revision,
            Arc::clone(&session.totals),
            session.form_data.camper_count(),
        );
        debug!(revision, campers = count, total = %totals.total, "recomputed totals");
        self.publish(revision, &totals, count);
        Ok(totals)
    }

    /// Apply a batch of edits to a copy of the form and recompute once.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidTransition`] unless `Loaded`.
    pub fn edit(
        &mut self,
        f: impl FnOnce(&mut FormData),
    ) -> Result<Arc<PricingResult>, ControllerError> {
        let mut form_data = self.loaded_session("edit")?.form_data.clone();
        f(&mut form_data);
        self.on_form_data_change(form_data)
    }

    /// Append an empty camper.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidTransition`] unless `Loaded`.
    pub fn add_camper(&mut self) -> Result<Arc<PricingResult>, ControllerError> {
        self.edit(|form| form.campers.push(Camper::new()))
    }

    /// Remove the camper at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::NoSuchCamper`] for an index out of range.
    pub fn remove_camper(&mut self, index: usize) -> Result<Arc<PricingResult>, ControllerError> {
        let count = self.loaded_session("edit")?.form_data.camper_count();
        if index >= count {
            return Err(ControllerError::NoSuchCamper { index, count });
        }
        self.edit(|form| {
            form.campers.remove(index);
        })
    }

    /// Hand the current form off for recalculation elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidTransition`] unless `Loaded`.
    pub fn begin_recalculation(&mut self) -> Result<RecalcTicket, ControllerError> {
        let session = self.loaded_session("recalculate")?;
        Ok(RecalcTicket {
            revision: session.revision,
            rules: Arc::clone(&session.rules),
            form_data: session.form_data.clone(),
        })
    }

    /// Apply a result computed for `ticket`. Returns `false`, leaving the
    /// totals untouched, when the form changed since the ticket was taken or
    /// the page is no longer editable.
    pub fn complete_recalculation(&mut self, ticket: &RecalcTicket, result: PricingResult) -> bool {
        let RegistrationState::Loaded(session) = &mut self.state else {
            debug!(revision = ticket.revision, "dropping recalculation, page not editable");
            return false;
        };
        if ticket.revision != session.revision {
            debug!(
                ticket = ticket.revision,
                current = session.revision,
                "dropping superseded recalculation"
            );
            return false;
        }
        session.totals = Arc::new(result);
        let (revision, totals, count) = (
            session.revision,
            Arc::clone(&session.totals),
            session.form_data.camper_count(),
        );
        self.publish(revision, &totals, count);
        true
    }

    /// Move to `Submitting` and return the payload to send.
    ///
    /// Returns `Ok(None)` while a submission is already pending. A failed
    /// submission is final for this page; retrying means loading a new one.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidTransition`] while fetching or once
    /// a submission has finished.
    pub fn begin_submit(&mut self) -> Result<Option<Submission>, ControllerError> {
        match std::mem::replace(&mut self.state, RegistrationState::Fetching) {
            RegistrationState::Loaded(session) => {
                let submission = Submission {
                    form_data: session.form_data.clone(),
                    pricing_results: session.totals.as_ref().clone(),
                };
                info!(event_id = %self.event_id, total = %submission.pricing_results.total, "submitting registration");
                self.state = RegistrationState::Submitting(session);
                Ok(Some(submission))
            }
            RegistrationState::Submitting(session) => {
                debug!(event_id = %self.event_id, "submission already pending");
                self.state = RegistrationState::Submitting(session);
                Ok(None)
            }
            other => {
                let status = other.status();
                self.state = other;
                Err(ControllerError::InvalidTransition {
                    action: "submit",
                    status,
                })
            }
        }
    }

    /// Record the outcome of the pending submission. A receipt with a
    /// non-success status counts as a failed submission.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidTransition`] unless `Submitting`.
    pub fn finish_submit(
        &mut self,
        outcome: Result<SubmissionReceipt, TransportError>,
    ) -> Result<Status, ControllerError> {
        let session = match std::mem::replace(&mut self.state, RegistrationState::Fetching) {
            RegistrationState::Submitting(session) => session,
            other => {
                let status = other.status();
                self.state = other;
                return Err(ControllerError::InvalidTransition {
                    action: "finish submission",
                    status,
                });
            }
        };
        self.state = match outcome {
            Ok(receipt) if receipt.is_success() => {
                info!(event_id = %self.event_id, status = receipt.status, "registration submitted");
                RegistrationState::Submitted(session)
            }
            Ok(receipt) => {
                warn!(event_id = %self.event_id, status = receipt.status, body = %receipt.body, "registration rejected");
                RegistrationState::SubmissionError(session)
            }
            Err(e) => {
                error!(event_id = %self.event_id, error = %e, "registration submission failed");
                RegistrationState::SubmissionError(session)
            }
        };
        Ok(self.status())
    }

    /// Submit the registration: [`begin_submit`](Self::begin_submit), send,
    /// then [`finish_submit`](Self::finish_submit).
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidTransition`] while fetching or once
    /// a submission has finished. Transport failures are reported through the
    /// returned status, not as errors.
    pub async fn submit(&mut self, sink: &dyn SubmissionSink) -> Result<Status, ControllerError> {
        let Some(submission) = self.begin_submit()? else {
            return Ok(self.status());
        };
        let outcome = sink.submit(&self.event_id, &submission).await;
        self.finish_submit(outcome)
    }

    fn loaded_session(&mut self, action: &'static str) -> Result<&mut Session, ControllerError> {
        match &mut self.state {
            RegistrationState::Loaded(session) => Ok(session),
            other => Err(ControllerError::InvalidTransition {
                action,
                status: other.status(),
            }),
        }
    }

    fn expect_status(&self, action: &'static str, allowed: &[Status]) -> Result<(), ControllerError> {
        let status = self.status();
        if allowed.contains(&status) {
            Ok(())
        } else {
            Err(ControllerError::InvalidTransition { action, status })
        }
    }

    /// Publish unless a newer revision is already out.
    fn publish(&self, revision: u64, totals: &Arc<PricingResult>, camper_count: usize) {
        self.publisher.send_if_modified(|current| {
            if revision < current.revision {
                return false;
            }
            *current = PricingSnapshot {
                revision,
                totals: Arc::clone(totals),
                camper_count,
            };
            true
        });
    }
}
