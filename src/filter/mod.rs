use crate::artifacts::EngineMetadata;
use crate::extract::normalize_safe_output_type;
use crate::run::DownloadResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FirewallFilter {
    #[default]
    Any,
    OnlyWith,
    OnlyWithout,
}

impl FirewallFilter {
    /// Builds the filter from the two mutually exclusive switches.
    pub fn from_flags(only_with: bool, only_without: bool) -> Result<Self, String> {
        match (only_with, only_without) {
            (true, true) => Err("firewall and no-firewall filters are mutually exclusive".to_string()),
            (true, false) => Ok(Self::OnlyWith),
            (false, true) => Ok(Self::OnlyWithout),
            (false, false) => Ok(Self::Any),
        }
    }
}

/// Post-download filters. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFilters {
    pub engine: Option<String>,
    pub exclude_staged: bool,
    pub firewall: FirewallFilter,
    pub safe_output_type: Option<String>,
    pub label: Option<String>,
}

impl RunFilters {
    pub fn needs_labels(&self) -> bool {
        self.label.as_deref().is_some_and(|label| !label.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    Accept,
    Reject(String),
}

impl FilterDecision {
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// Applies [`RunFilters`] in a fixed order: engine, staged, firewall,
/// safe-output type, label. The first failing filter decides.
#[derive(Debug, Clone, Default)]
pub struct FilterPipeline {
    filters: RunFilters,
}

impl FilterPipeline {
    pub fn new(filters: RunFilters) -> Self {
        Self { filters }
    }

    pub fn filters(&self) -> &RunFilters {
        &self.filters
    }

    pub fn evaluate(&self, result: &DownloadResult) -> FilterDecision {
        let metadata = result.metadata.as_ref();

        if let Some(decision) = self.check_engine(result, metadata) {
            return decision;
        }
        if self.filters.exclude_staged && metadata.is_some_and(|m| m.staged) {
            return FilterDecision::Reject("staged run excluded".to_string());
        }
        if let Some(decision) = self.check_firewall(metadata) {
            return decision;
        }
        if let Some(decision) = self.check_safe_output_type(result) {
            return decision;
        }
        if let Some(decision) = self.check_label(result) {
            return decision;
        }
        FilterDecision::Accept
    }

    fn check_engine(
        &self,
        result: &DownloadResult,
        metadata: Option<&EngineMetadata>,
    ) -> Option<FilterDecision> {
        let wanted = self.filters.engine.as_deref()?.trim();
        if wanted.is_empty() {
            return None;
        }
        let actual = metadata
            .map(|m| m.engine_id.trim())
            .filter(|id| !id.is_empty())
            .or_else(|| result.engine.map(|engine| engine.as_str()))
            .unwrap_or("");
        (actual != wanted).then(|| {
            FilterDecision::Reject(format!("engine `{actual}` does not match `{wanted}`"))
        })
    }

    fn check_firewall(&self, metadata: Option<&EngineMetadata>) -> Option<FilterDecision> {
        let enabled = metadata.is_some_and(EngineMetadata::firewall_enabled);
        match self.filters.firewall {
            FirewallFilter::Any => None,
            FirewallFilter::OnlyWith if !enabled => {
                Some(FilterDecision::Reject("run has no firewall".to_string()))
            }
            FirewallFilter::OnlyWithout if enabled => {
                Some(FilterDecision::Reject("run has a firewall".to_string()))
            }
            FirewallFilter::OnlyWith | FirewallFilter::OnlyWithout => None,
        }
    }

    fn check_safe_output_type(&self, result: &DownloadResult) -> Option<FilterDecision> {
        let wanted = self.filters.safe_output_type.as_deref()?;
        let wanted = normalize_safe_output_type(wanted);
        if wanted.is_empty() {
            return None;
        }
        let found = result
            .safe_output_types
            .iter()
            .any(|kind| normalize_safe_output_type(kind) == wanted);
        (!found).then(|| FilterDecision::Reject(format!("no `{wanted}` safe output")))
    }

    fn check_label(&self, result: &DownloadResult) -> Option<FilterDecision> {
        let wanted = self.filters.label.as_deref()?.trim();
        if wanted.is_empty() {
            return None;
        }
        let found = result
            .run
            .labels
            .iter()
            .any(|label| label.trim().eq_ignore_ascii_case(wanted));
        (!found).then(|| FilterDecision::Reject(format!("label `{wanted}` not present")))
    }
}
