#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # NasNet Validation
//!
//! Risk-based, multi-stage validation of router configuration changes
//! before they are applied.
//!
//! A change passes through up to seven ordered stages. The risk level of
//! the change decides which stages run; the `schema` and `syntax` stages
//! run in-process and the rest go to a [`Validator`] in one batched call.
//!
//! - [`ValidationPipeline`]: orchestrates a run and supports [`abort`](ValidationPipeline::abort)
//! - [`StageName`] and [`StageStatus`]: the stage catalog and its state machine
//! - [`RiskLevel`] and [`RiskTable`]: which stages each risk level selects
//! - [`PipelineResult`]: aggregated outcome, with findings grouped per field
//! - [`PipelineObserver`], [`Callbacks`] and [`EventBus`]: stage lifecycle notification
//! - [`StageEngine`]: an in-process [`Validator`] built from per-stage checks
//! - [`FieldRules`]: declarative local schema rules
//! - [`map_to_form_errors`]: one [`FormError`] per field for form rendering

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod form;
pub mod issue;
pub mod local;
pub mod pipeline;
pub mod remote;
pub mod result;
pub mod risk;
pub mod rules;
mod run;
pub mod selector;
pub mod stage;
pub mod transition;

pub use config::PipelineConfig;
pub use engine::{StageCheck, StageEngine};
pub use error::{PipelineError, ServiceError};
pub use event::{Callbacks, EventBus, EventSubscriber, PipelineEvent, PipelineObserver};
pub use form::{FieldErrorSink, FormError, apply_form_errors, map_to_form_errors};
pub use issue::{Severity, VALIDATION_ERROR, ValidationError};
pub use local::{AcceptAll, FieldViolation, SchemaValidator, run_local};
pub use pipeline::{PipelineBuilder, ValidationInput, ValidationPipeline};
pub use remote::{UnavailableValidator, ValidationRequest, ValidationResponse, Validator};
pub use result::{PipelineResult, StageResult};
pub use risk::{RiskLevel, RiskTable};
pub use rules::{FieldFormat, FieldKind, FieldRule, FieldRules};
pub use selector::select_stages;
pub use stage::{STAGE_COUNT, StageName, StageStatus};

/// Serde helper for `Option<Duration>` serialized as milliseconds.
pub(crate) mod serde_duration_opt {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    /// Serialize an `Option<Duration>` as an optional integer of milliseconds.
    pub fn serialize<S: Serializer>(duration: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match duration {
            Some(d) => (d.as_millis() as u64).serialize(s),
            None => s.serialize_none(),
        }
    }

    /// Deserialize an optional integer of milliseconds into `Option<Duration>`.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let opt: Option<u64> = Option::deserialize(d)?;
        Ok(opt.map(Duration::from_millis))
    }
}
