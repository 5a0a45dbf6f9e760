//! Per-call diagnostics and the optional sink that receives them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::exponential::FitReport;
use crate::histogram::HistogramReport;
use crate::ratio::RatioReport;

/// Report produced by one corrector invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum Diagnostics {
    Ratio(RatioReport),
    Exponential(FitReport),
    Histogram(HistogramReport),
}

impl Diagnostics {
    /// Goodness of fit, present only for exponential corrections.
    pub fn r_squared(&self) -> Option<f64> {
        match self {
            Diagnostics::Exponential(report) => Some(report.r_squared),
            _ => None,
        }
    }
}

type SinkFn = dyn Fn(&Diagnostics) + Send + Sync;

/// Callback receiving each correction's diagnostics.
///
/// The default sink drops reports. Cloning shares the callback.
#[derive(Clone, Default)]
pub struct DiagnosticsSink {
    callback: Option<Arc<SinkFn>>,
}

impl DiagnosticsSink {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Diagnostics) + Send + Sync + 'static,
    {
        Self {
            callback: Some(Arc::new(callback)),
        }
    }

    pub fn is_some(&self) -> bool {
        self.callback.is_some()
    }

    /// Forward `diagnostics` to the callback if set.
    pub(crate) fn report(&self, diagnostics: &Diagnostics) {
        if let Some(callback) = self.callback.as_ref() {
            callback(diagnostics);
        }
    }
}

impl std::fmt::Debug for DiagnosticsSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.callback {
            None => write!(f, "DiagnosticsSink::None"),
            Some(_) => write!(f, "DiagnosticsSink::Some(...)"),
        }
    }
}
